//! Frosted CLI - inspect and watch a tree of frosted pages.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

mod commands;

use commands::list::Order;

#[derive(Parser)]
#[command(name = "frosted")]
#[command(about = "Render, list and watch Markdown pages with embedded metadata")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to frosted.toml config file
    #[arg(short, long, default_value = "frosted.toml")]
    config: PathBuf,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a single file and print its meta and HTML as JSON
    Render {
        /// File to render
        file: PathBuf,
    },

    /// List pages in the content directory
    List {
        /// Sort order
        #[arg(short, long, value_enum, default_value_t = Order::Path)]
        order: Order,

        /// Only pages with this tag
        #[arg(short, long)]
        tag: Option<String>,

        /// Only pages whose path starts with this prefix
        #[arg(short, long)]
        prefix: Option<String>,

        /// Strip this from page paths before matching --prefix
        #[arg(long, default_value = "", requires = "prefix")]
        trim: String,

        /// Print page summaries as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print every tag used by a listed page
    Tags,

    /// Keep pages loaded and refresh them as files change
    Watch,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = commands::config::load_config(&cli.config)?;

    match cli.command {
        Commands::Render { file } => {
            commands::render::run(&config, &file).await?;
        }
        Commands::List {
            order,
            tag,
            prefix,
            trim,
            json,
        } => {
            let filter = commands::list::Filter { tag, prefix, trim };
            commands::list::run(&config, order, filter, json).await?;
        }
        Commands::Tags => {
            commands::tags::run(&config).await?;
        }
        Commands::Watch => {
            commands::watch::run(&config).await?;
        }
    }

    Ok(())
}
