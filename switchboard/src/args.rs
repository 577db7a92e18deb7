use std::path::PathBuf;

use clap::Parser;

/// Switchboard LLM request router
#[derive(Debug, Parser)]
#[command(name = "switchboard", about = "Route prompts to the best available model by intent")]
pub struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "switchboard.toml", env = "SWITCHBOARD_CONFIG")]
    pub config: PathBuf,

    /// Print text as it is generated instead of a JSON response
    #[arg(long, conflicts_with = "status")]
    pub stream: bool,

    /// Print backend health and queue statistics, then exit
    #[arg(long)]
    pub status: bool,

    /// Prompt to route; words are joined with spaces
    #[arg(required_unless_present = "status")]
    pub prompt: Vec<String>,
}
