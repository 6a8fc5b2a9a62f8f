use std::future::Future;
use std::path::{Path, PathBuf};

use clap::Subcommand;
use tracing::{error, info, warn};

use mirror_application::commands::{
    enrich_labels, reconcile, refresh_users, run_sync_until, sync_single_event,
};
use mirror_application::queries::validate_store;
use mirror_application::AppError;
use mirror_domain::{EventId, ReconcileOutcome};
use mirror_infrastructure::AppConfig;

use crate::context::AppContext;

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Incremental sync of every finished container for the configured game
    Sync,
    /// Fetch one event outside its container's normal flow
    FetchEvent {
        event_id: u64,
        /// Refetch even when the event ledger already lists it
        #[arg(long)]
        force: bool,
    },
    /// Compare the container index with the event directories on disk
    Reconcile {
        /// Append missing index entries instead of only reporting them
        #[arg(long)]
        apply: bool,
    },
    /// Read-only integrity check of the whole store
    Validate {
        /// Write the JSON report here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Create users referenced by stored events, optionally refreshing known ones
    RefreshUsers {
        #[arg(long)]
        refresh_existing: bool,
    },
    /// Classify events whose labels are still empty
    EnrichLabels {
        /// Reclassify every event, not only unlabeled ones
        #[arg(long)]
        force: bool,
    },
}

impl Command {
    pub fn needs_remote(&self) -> bool {
        match self {
            Command::Sync | Command::FetchEvent { .. } | Command::RefreshUsers { .. } => true,
            Command::Reconcile { apply } => *apply,
            Command::Validate { .. } | Command::EnrichLabels { .. } => false,
        }
    }
}

pub async fn run(config_path: Option<&str>, command: Command) -> Result<(), AppError> {
    let config = AppConfig::load(config_path)
        .await
        .map_err(|err| AppError::Configuration(format!("{:#}", err)))?;
    if command.needs_remote() {
        config
            .require_api_token()
            .map_err(|err| AppError::Configuration(err.to_string()))?;
    }
    let context = AppContext::new(config).await?;
    execute(&context, command, shutdown_signal()).await
}

pub async fn execute<F>(context: &AppContext, command: Command, shutdown: F) -> Result<(), AppError>
where
    F: Future<Output = ()>,
{
    let state = &context.state;
    match command {
        Command::Sync => {
            let report = run_sync_until(state, shutdown).await?;
            if report.interrupted {
                warn!("sync {} interrupted, rerun to continue", report.run_id);
            }
            emit(&report, None).await
        }
        Command::FetchEvent { event_id, force } => {
            let report = sync_single_event(state, EventId(event_id), force).await?;
            emit(&report, None).await
        }
        Command::Reconcile { apply } => {
            let report = reconcile(state, apply).await?;
            match report.outcome {
                ReconcileOutcome::Clean => info!("index and store agree"),
                ReconcileOutcome::DriftFound(count) => {
                    warn!("{} drift entries found (rerun with --apply to repair)", count)
                }
                ReconcileOutcome::Repaired(count) => info!("{} index entries repaired", count),
            }
            for entry in &report.unrepairable {
                error!("needs operator action: {}", entry);
            }
            emit(&report, None).await
        }
        Command::Validate { output } => {
            let report = validate_store(state).await?;
            emit(&report, output.as_deref()).await?;
            if report.summary.passed {
                info!(
                    "validation passed: {} issue(s) across {} event(s)",
                    report.summary.total, report.summary.events_checked
                );
                Ok(())
            } else {
                Err(AppError::Integrity(report.summary.total))
            }
        }
        Command::RefreshUsers { refresh_existing } => {
            let report = refresh_users(state, refresh_existing).await?;
            emit(&report, None).await
        }
        Command::EnrichLabels { force } => {
            let report = enrich_labels(state, force).await?;
            emit(&report, None).await
        }
    }
}

/// Pretty JSON to `output`, or stdout when none is given.
async fn emit<T: serde::Serialize>(report: &T, output: Option<&Path>) -> Result<(), AppError> {
    let mut text = serde_json::to_string_pretty(report).map_err(anyhow::Error::from)?;
    text.push('\n');
    match output {
        Some(path) => {
            tokio::fs::write(path, text)
                .await
                .map_err(|err| anyhow::anyhow!("failed to write {}: {}", path.display(), err))?;
            info!("report written to {}", path.display());
        }
        None => print!("{}", text),
    }
    Ok(())
}

pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!("ctrl-c handler unavailable: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!("sigterm handler unavailable: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown requested");
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Cli {
        #[command(subcommand)]
        command: Command,
    }

    fn parse(args: &[&str]) -> Command {
        Cli::try_parse_from(std::iter::once("tournament-mirror").chain(args.iter().copied()))
            .expect("parse")
            .command
    }

    #[test]
    fn subcommands_parse_with_flags() {
        assert_eq!(parse(&["sync"]), Command::Sync);
        assert_eq!(
            parse(&["fetch-event", "999", "--force"]),
            Command::FetchEvent {
                event_id: 999,
                force: true
            }
        );
        assert_eq!(parse(&["reconcile"]), Command::Reconcile { apply: false });
        assert_eq!(
            parse(&["validate", "--output", "report.json"]),
            Command::Validate {
                output: Some(PathBuf::from("report.json"))
            }
        );
        assert_eq!(
            parse(&["refresh-users", "--refresh-existing"]),
            Command::RefreshUsers {
                refresh_existing: true
            }
        );
        assert!(Cli::try_parse_from(["tournament-mirror", "fetch-event", "abc"]).is_err());
    }

    #[test]
    fn only_remote_commands_need_a_token() {
        assert!(Command::Sync.needs_remote());
        assert!(Command::Reconcile { apply: true }.needs_remote());
        assert!(!Command::Reconcile { apply: false }.needs_remote());
        assert!(!Command::Validate { output: None }.needs_remote());
        assert!(!Command::EnrichLabels { force: false }.needs_remote());
    }
}
