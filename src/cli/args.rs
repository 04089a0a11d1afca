use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "meetvault",
    about = "Meeting transcript capture, analytics, and delivery service"
)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<CliCommand>,
}

#[derive(Subcommand)]
pub enum CliCommand {
    /// Print version information
    Version,
    /// Export one meeting from history to a transcript file
    Export(ExportArgs),
    /// Re-run startup recovery on the stored capture state
    Recover,
}

#[derive(Args)]
pub struct ExportArgs {
    /// History index of the meeting (0 = oldest)
    #[arg(long)]
    pub index: i64,
}
