mod cmd_history;
mod cmd_log;
mod cmd_read;
mod cmd_watch;
mod cmd_write;

use anyhow::{Context, Result};
use artifact_store::{Actor, ArtifactStore, StoreConfig};
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "artifacts")]
#[command(about = "Read, write, and inspect versioned design artifacts")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Project root that owns the artifacts
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    /// Backup snapshots retained per artifact
    #[arg(long, global = true)]
    max_backups: Option<usize>,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,

    /// Increase log verbosity (logs go to stderr)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print an artifact's content
    Read {
        /// Artifact path, relative to the root
        path: String,
    },
    /// Write an artifact; reads content from stdin
    Write {
        /// Artifact path, relative to the root
        path: String,

        /// Who is making the change (user or agent)
        #[arg(long, default_value = "user")]
        actor: Actor,

        /// Free-text reason recorded in the audit log
        #[arg(long, default_value = "")]
        reason: String,

        /// Tool call that caused the change
        #[arg(long)]
        tool_call_id: Option<String>,

        /// Do not snapshot the previous content
        #[arg(long)]
        no_snapshot: bool,
    },
    /// List retained backup snapshots of an artifact
    History {
        /// Artifact path, relative to the root
        path: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Restore an artifact from a backup snapshot
    Restore {
        /// Artifact path, relative to the root
        path: String,

        /// Snapshot version, as listed by `history`
        version: String,

        #[arg(long, default_value = "user")]
        actor: Actor,

        /// Reason recorded in the audit log (default: "restore <version>")
        #[arg(long, default_value = "")]
        reason: String,

        /// Tool call that caused the restore
        #[arg(long)]
        tool_call_id: Option<String>,
    },
    /// Print the audit log
    Log {
        /// Only records for this artifact
        #[arg(long)]
        artifact: Option<String>,

        /// Output as NDJSON
        #[arg(long)]
        json: bool,
    },
    /// Stream change events as NDJSON until interrupted
    Watch,
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn store_config(cli: &Cli) -> StoreConfig {
    let mut config = StoreConfig::new(&cli.root);
    if let Some(max) = cli.max_backups {
        config = config.with_max_backups(max);
    }
    config
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let store = ArtifactStore::open(store_config(&cli))
        .await
        .with_context(|| format!("Failed to open store at {:?}", cli.root))?;

    match cli.command {
        Commands::Read { path } => cmd_read::run(&store, &path).await,
        Commands::Write {
            path,
            actor,
            reason,
            tool_call_id,
            no_snapshot,
        } => {
            let args = cmd_write::WriteArgs {
                path,
                actor,
                reason,
                tool_call_id,
                no_snapshot,
            };
            cmd_write::run(&store, args, cli.pretty).await
        }
        Commands::History { path, json } => cmd_history::run_list(&store, &path, json).await,
        Commands::Restore {
            path,
            version,
            actor,
            reason,
            tool_call_id,
        } => {
            let args = cmd_write::WriteArgs {
                path,
                actor,
                reason,
                tool_call_id,
                no_snapshot: false,
            };
            cmd_history::run_restore(&store, &args, &version, cli.pretty).await
        }
        Commands::Log { artifact, json } => cmd_log::run(&store, artifact, json).await,
        Commands::Watch => cmd_watch::run(&store).await,
    }
}
