//! Print the tag list.

use anyhow::Result;

use super::config::ConfigFile;

/// Run the tags command.
pub async fn run(config: &ConfigFile) -> Result<()> {
    let mut set = super::load_pageset(config)?;

    let tags = set.tags().to_vec();
    for tag in &tags {
        let count = set.tag_subset(tag)?.listed().len();
        println!("{}\t{}", tag, count);
    }

    Ok(())
}
