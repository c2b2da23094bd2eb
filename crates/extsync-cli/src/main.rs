mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::config::ConfigSubcommand;
use cmd::SourceOverride;
use extsync_core::paths;
use extsync_core::sync::SyncOptions;
use extsync_core::types::Platform;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "extsync",
    about = "Keep AI-assistant extensions (commands, rules, tools, hooks) in sync across projects",
    version,
    propagate_version = true
)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    /// Base URL extensions are published under (overrides config.yaml)
    #[arg(long, global = true, env = "EXTSYNC_SOURCE_URL")]
    source_url: Option<String>,

    /// Local directory holding extensions (overrides config.yaml)
    #[arg(long, global = true, env = "EXTSYNC_SOURCE_DIR", conflicts_with = "source_url")]
    source_dir: Option<PathBuf>,

    /// Do not run extension post-update commands
    #[arg(long, global = true)]
    no_post_update: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one synchronization cycle
    Sync {
        /// Ignore the auto-update flag and the cooldown
        #[arg(long)]
        force: bool,
        /// Only sync extensions installed for this platform (claude, cursor)
        #[arg(long)]
        platform: Option<Platform>,
    },

    /// Install an extension into a project and apply it now
    Install {
        /// Extension name as published at the source
        name: String,
        /// Target platform (claude, cursor)
        #[arg(long)]
        platform: Platform,
        /// Project root (default: auto-detect from .git/)
        #[arg(long)]
        project: Option<PathBuf>,
    },

    /// Show installed extensions
    Status,

    /// Show or change settings
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli) {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let state_dir = paths::state_dir()?;
    let overrides = SourceOverride {
        url: cli.source_url,
        dir: cli.source_dir,
    };
    let post_update = !cli.no_post_update;

    match cli.command {
        Commands::Sync { force, platform } => {
            let config = cmd::load_config(&state_dir, &overrides)?;
            cmd::sync::run(
                &state_dir,
                &config,
                SyncOptions { force, platform },
                post_update,
                cli.json,
            )
        }
        Commands::Install {
            name,
            platform,
            project,
        } => {
            let config = cmd::load_config(&state_dir, &overrides)?;
            let project = root::resolve_project(project.as_deref());
            cmd::install::run(
                &state_dir,
                &config,
                &name,
                platform,
                &project,
                post_update,
                cli.json,
            )
        }
        Commands::Status => cmd::status::run(&state_dir, cli.json),
        Commands::Config { subcommand } => cmd::config::run(&state_dir, subcommand, cli.json),
    }
}
