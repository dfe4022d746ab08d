//! scalegate — operator entry point for the scaling guardrail engine.
//!
//! # Usage
//!
//! ```text
//! scalegate register api --replicas 3
//! scalegate propose api --replicas 2 --reason "draining idle capacity" --utilization 25
//! scalegate history --limit 20
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "scalegate",
    about = "Guarded replica scaling with cooldowns, audit and rollback",
    version,
    propagate_version = true
)]
struct Cli {
    /// Configuration file.
    #[arg(long, global = true, default_value = "scalegate.toml")]
    config: PathBuf,

    /// Override `[storage].data_dir`.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Propose a new replica count for a deployment.
    Propose {
        /// Deployment name.
        deployment: String,
        /// Desired replica count.
        #[arg(short, long)]
        replicas: u32,
        /// Namespace (default: `[control_plane].namespace`).
        #[arg(short, long)]
        namespace: Option<String>,
        /// Why this change is safe. Required for scale-down.
        #[arg(long)]
        reason: Option<String>,
        /// Observed utilization percentage of the deployment.
        #[arg(long)]
        utilization: Option<f64>,
    },
    /// Show recent audit entries, oldest first.
    History {
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },
    /// Show the latest pre-mutation snapshot.
    Snapshot {
        /// Show every retained snapshot, newest first.
        #[arg(long)]
        all: bool,
    },
    /// Propose every workload in the latest snapshot back to its captured count.
    Rollback {
        /// Justification recorded for each proposal.
        #[arg(long)]
        reason: String,
    },
    /// List deployments and their replica counts.
    Workloads {
        #[arg(short, long)]
        namespace: Option<String>,
    },
    /// Register a deployment with the local control plane.
    Register {
        deployment: String,
        #[arg(short, long)]
        replicas: u32,
        #[arg(short, long)]
        namespace: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn,scalegate=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let ctx = commands::Context::load(&cli.config, cli.data_dir)?;

    let ok = match cli.command {
        Command::Propose {
            deployment,
            replicas,
            namespace,
            reason,
            utilization,
        } => {
            commands::propose::propose(&ctx, namespace, deployment, replicas, reason, utilization)
                .await?
        }
        Command::History { limit } => commands::history::history(&ctx, limit)?,
        Command::Snapshot { all } => commands::snapshot::snapshot(&ctx, all)?,
        Command::Rollback { reason } => commands::rollback::rollback(&ctx, &reason).await?,
        Command::Workloads { namespace } => commands::workloads::workloads(&ctx, namespace).await?,
        Command::Register {
            deployment,
            replicas,
            namespace,
        } => commands::register::register(&ctx, namespace, deployment, replicas)?,
    };

    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}
