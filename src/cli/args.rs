//! CLI argument parsing using clap.

use clap::{
    Parser, Subcommand,
    builder::styling::{AnsiColor, Effects, Styles},
};
use std::path::PathBuf;

fn clap_cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

/// Retrieval-augmented generation router
#[derive(Parser)]
#[command(
    name = "ragrouter",
    version = env!("CARGO_PKG_VERSION"),
    about = "RAG router for PDF uploads and document questions",
    long_about = "Accepts PDF uploads and questions over HTTP, backed by a hybrid-search database and a hosted language model.",
    styles = clap_cargo_style()
)]
pub struct Cli {
    /// Path to custom settings.toml file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server
    #[command(
        about = "Start the HTTP server",
        after_help = "Examples:\n  ragrouter serve\n  ragrouter serve --bind 127.0.0.1:9000\n  RAG_SEARCH__MATCH_COUNT=5 ragrouter serve"
    )]
    Serve {
        /// Address to bind (overrides server.bind)
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Show current configuration settings
    #[command(about = "Display active settings with secrets redacted")]
    Config,

    /// Initialize project
    #[command(about = "Write .ragrouter/settings.toml with default configuration")]
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// List models available to the configured API key
    #[command(about = "List generative models supporting a generation method")]
    Models {
        /// Generation method to filter on
        #[arg(long, default_value = "generateContent")]
        method: String,
    },
}
