mod settings;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use etcd_backup::etcd_backup_client::GatewayConnector;
use etcd_backup::{BackupCoordinator, BackupError, FileSink, StaticMembers};
use settings::Settings;

#[derive(Parser)]
#[command(name = "etcd-backup", about = "Back up an etcd cluster from its most advanced member")]
struct Cli {
    /// Settings file (TOML).
    #[arg(short, long, default_value = "etcd-backup.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Back up if the cluster moved past the latest stored backup.
    Save,

    /// Back up unconditionally under `<prefix>/`.
    SaveWithPrefix {
        /// Destination prefix, relative to the backup directory.
        #[arg(long)]
        prefix: String,
    },

    /// Print the revision of the latest stored backup.
    Latest,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if let Some(backup) = err.downcast_ref::<BackupError>() {
                if backup.is_fatal() {
                    tracing::error!(phase = %backup.phase(), "{backup}");
                    return ExitCode::from(2);
                }
                tracing::error!(phase = %backup.phase(), "backup attempt failed: {backup}");
            } else {
                tracing::error!("{err:#}");
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let settings = Settings::load(&cli.config)?;
    let coordinator = build_coordinator(&settings)?;

    match cli.command {
        Command::Save => {
            let last = coordinator.latest_backup_revision().await?;
            match coordinator.save_snap(last).await? {
                Some(status) => println!("{}", serde_json::to_string_pretty(&status)?),
                None => eprintln!("no change since revision {last}"),
            }
        }

        Command::SaveWithPrefix { prefix } => {
            let path = coordinator.save_snap_with_prefix(&prefix).await?;
            println!("{path}");
        }

        Command::Latest => {
            println!("{}", coordinator.latest_backup_revision().await?);
        }
    }

    Ok(())
}

fn build_coordinator(settings: &Settings) -> anyhow::Result<BackupCoordinator> {
    let connector = match &settings.api_prefix {
        Some(prefix) => GatewayConnector::new().api_prefix(prefix),
        None => GatewayConnector::new(),
    };

    let coordinator = BackupCoordinator::new(
        settings.cluster.clone(),
        settings.namespace.clone(),
        Arc::new(StaticMembers::new(settings.members())),
        Arc::new(connector),
        Arc::new(FileSink::new(settings.backup_dir.clone())),
    )
    .with_config(settings.backup_config());

    Ok(match settings.tls_config()? {
        Some(tls) => coordinator.with_tls(tls),
        None => coordinator,
    })
}
