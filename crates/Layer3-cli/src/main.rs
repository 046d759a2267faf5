//! Sprig CLI - Main entry point

mod commands;

use clap::{Parser, Subcommand};
use sprig_foundation::SprigConfig;
use sprig_instance::InstanceManager;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Sprig - run branches, tags, commits, and PRs as disposable background instances
#[derive(Parser, Debug)]
#[command(name = "sprig")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Launch an instance from a git source
    Run {
        /// Branch to run (same as --branch)
        source: Option<String>,

        /// Branch to check out
        #[arg(short, long)]
        branch: Option<String>,

        /// Tag to check out
        #[arg(short, long)]
        tag: Option<String>,

        /// Commit hash to check out
        #[arg(short = 'C', long)]
        commit: Option<String>,

        /// GitHub pull request URL to check out
        #[arg(short = 'r', long)]
        pr: Option<String>,

        /// Remote to fetch PR refs through
        #[arg(short = 'R', long)]
        remote: Option<String>,

        /// Command to run in the workspace
        #[arg(short, long)]
        command: Option<String>,

        /// Port the instance is expected to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Local repository to clone from (defaults to the current directory)
        #[arg(long)]
        repo: Option<std::path::PathBuf>,

        /// Run detached in the background
        #[arg(short, long)]
        detached: bool,
    },
    /// List instances
    List,
    /// Stop a running instance by id
    Stop {
        /// Instance id
        id: String,
    },
    /// Stop all running instances
    StopAll {
        /// Only stop instances whose workspace directory matches this name
        #[arg(short, long)]
        project: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.debug { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let config = SprigConfig::load().unwrap_or_else(|e| {
        eprintln!("Warning: failed to load config: {e}");
        SprigConfig::default()
    });
    let manager = InstanceManager::from_config(&config)?;

    match args.command {
        Command::Run {
            source,
            branch,
            tag,
            commit,
            pr,
            remote,
            command,
            port,
            repo,
            detached,
        } => {
            commands::run(
                &manager,
                sprig_instance::SourceOptions {
                    positional: source,
                    branch,
                    tag,
                    commit,
                    pr,
                    remote,
                },
                repo,
                command,
                port,
                detached,
            )
            .await
        }
        Command::List => commands::list(&manager).await,
        Command::Stop { id } => commands::stop(&manager, &id).await,
        Command::StopAll { project } => commands::stop_all(&manager, project.as_deref()).await,
    }
}
