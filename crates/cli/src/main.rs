//! Sunnyside CLI — the main entry point.
//!
//! Commands:
//! - `chat`    — Ask the forecaster, once or interactively
//! - `tools`   — Print the tool schemas advertised to the model
//! - `threads` — List stored conversation threads
//! - `config`  — Show, locate or initialize the configuration

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "sunnyside",
    about = "Sunnyside — a weather forecaster who speaks in puns",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with the forecaster
    Chat {
        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,

        /// Conversation thread to continue (a new one is started if omitted)
        #[arg(short, long)]
        thread: Option<String>,

        /// User on whose behalf tools run
        #[arg(short, long, default_value = "1")]
        user_id: String,
    },

    /// Print the registered tool schemas as JSON
    Tools,

    /// List conversation threads in the configured memory backend
    Threads,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration (API keys redacted)
    Show,

    /// Print the configuration file path
    Path,

    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so answers on stdout stay clean
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Chat {
            message,
            thread,
            user_id,
        } => commands::chat::run(message, thread, user_id, cli.verbose).await?,
        Commands::Tools => commands::tools::run()?,
        Commands::Threads => commands::threads::run().await?,
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config_cmd::show()?,
            ConfigAction::Path => commands::config_cmd::path(),
            ConfigAction::Init { force } => commands::config_cmd::init(force)?,
        },
    }

    Ok(())
}
