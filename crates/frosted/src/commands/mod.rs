pub mod config;
pub mod list;
pub mod render;
pub mod tags;
pub mod watch;

use std::sync::Arc;

use anyhow::{Context, Result};
use frosted_pages::{load_dir, Pageset};

use config::ConfigFile;

/// Load the configured content directory.
fn load_pageset(config: &ConfigFile) -> Result<Pageset> {
    let registry = Arc::new(config.registry());
    load_dir(&config.content.dir, registry)
        .with_context(|| format!("Failed to load {}", config.content.dir.display()))
}
