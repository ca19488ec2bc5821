use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod notifier;

#[derive(Parser)]
#[command(name = "wander", version, about = "Know when to turn around")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a new journey now and follow it
    Start(commands::start::StartArgs),
    /// Follow the last journey again, keeping its original start time
    Resume(commands::start::ResumeArgs),
    /// Evaluate a journey at a given instant without running a session
    Check(commands::check::CheckArgs),
    /// Show the last journey
    Last {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

/// Logs go to stderr so stdout stays machine-readable.
fn init_tracing() {
    let filter = EnvFilter::try_from_env("WANDER_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Start(args) => commands::start::run_start(args),
        Commands::Resume(args) => commands::start::run_resume(args),
        Commands::Check(args) => commands::check::run(args),
        Commands::Last { json } => commands::last::run(json),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
