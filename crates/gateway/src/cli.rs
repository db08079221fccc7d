//! CLI definition for the `megachat` binary.

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "megachat", about = "Local-first conversational AI orchestration service")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the HTTP server (the default when no subcommand is given).
    Serve(ServeArgs),
    /// Print the version.
    Version,
}

#[derive(Args, Clone)]
pub struct ServeArgs {
    /// Listen address.
    #[arg(long, default_value = "127.0.0.1:8787")]
    pub addr: String,

    /// Artifact directory holding MEGACHAT state.
    #[arg(long, default_value = "./data")]
    pub artifact_dir: String,

    /// Enable outbound network access for providers.
    #[arg(long)]
    pub net: bool,

    /// Allowed provider domains (repeatable). Empty means any host when
    /// --net is set.
    #[arg(long = "allow-domain")]
    pub allow_domains: Vec<String>,
}
