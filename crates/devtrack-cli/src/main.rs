//! `devtrack` — CLI front-end for the attach/detach daemon core.

mod attach;
mod binary;
mod daemon;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "devtrack", about = "Developer-productivity tracker CLI")]
struct Cli {
    /// Named instance (default instance if omitted).
    #[arg(long, global = true)]
    name: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Daemon lifecycle management.
    Daemon(daemon::DaemonArgs),
    /// Attach to a running daemon and stream updates.
    Attach(attach::AttachArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let name = cli.name.or_else(|| std::env::var("CSD_DEVTRACK_INSTANCE").ok()).unwrap_or_default();

    match cli.command {
        Command::Daemon(args) => daemon::run(args, &name).await,
        Command::Attach(args) => attach::run(args, &name).await,
    }
}
