//! nucleusd - Entry Point
//!
//! Command-line surface for the nucleus deployment core: deploy a change
//! set, roll one back, list backups, or watch fleet health.

use std::collections::HashMap;
use std::env;
use std::sync::Arc;
use std::time::Duration;

use nucleus_core::audit::FileAuditSink;
use nucleus_core::backup::store::{BackupStore, FileBackupStore};
use nucleus_core::connector::http::{HttpTransport, RetryPolicy};
use nucleus_core::connector::nucleus::NucleusConnector;
use nucleus_core::connector::{CodebaseQuery, ConnectorObserver, PlatformConnector};
use nucleus_core::deploy::orchestrator::Orchestrator;
use nucleus_core::errors::CoreError;
use nucleus_core::filesys::file::File;
use nucleus_core::logs::{init_logging, LogOptions};
use nucleus_core::models::connection::NucleusDescriptor;
use nucleus_core::models::deployment::DeployRequest;
use nucleus_core::signing::RequestSigner;
use nucleus_core::storage::layout::StorageLayout;
use nucleus_core::storage::settings::Settings;
use nucleus_core::utils::version_info;
use nucleus_core::workers::health;

use secrecy::SecretString;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    let mut cli_args: HashMap<String, String> = HashMap::new();

    for arg in args.iter().skip(1) {
        if let Some((key, value)) = arg.split_once('=') {
            // Handle --key=value format
            let clean_key = key.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), value.to_string());
        } else if arg.starts_with("--") {
            // Handle standalone flags like --version
            let clean_key = arg.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), "true".to_string());
        }
    }

    // Print version and exit
    if cli_args.contains_key("version") {
        println!("{}", serde_json::to_string_pretty(&version_info()).unwrap());
        return;
    }

    let layout = match cli_args.get("config") {
        Some(base) => StorageLayout::new(base.as_str()),
        None => StorageLayout::default(),
    };

    let settings_file = layout.settings_file();
    let settings = if settings_file.exists().await {
        match settings_file.read_json::<Settings>().await {
            Ok(settings) => settings,
            Err(e) => {
                eprintln!("Unable to read settings file: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        Settings::default()
    };

    // Prepare storage before logging so the file layer has a directory to
    // write into. Running without the layout still works, stdout-only.
    let file_logging = match layout.setup().await {
        Ok(()) => true,
        Err(e) => {
            eprintln!(
                "Warning: could not prepare storage at {:?}: {}",
                layout.base_dir, e
            );
            false
        }
    };

    let log_options = LogOptions {
        log_level: settings.log_level.clone(),
        log_dir: file_logging.then(|| layout.logs_dir().path().to_path_buf()),
        ..Default::default()
    };
    let _log_guard = match init_logging(log_options) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            None
        }
    };

    match run(&cli_args, &layout, settings).await {
        Ok(success) => {
            if !success {
                std::process::exit(1);
            }
        }
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    }
}

async fn run(
    cli_args: &HashMap<String, String>,
    layout: &StorageLayout,
    settings: Settings,
) -> Result<bool, CoreError> {
    let signer = settings
        .signing_secret
        .as_deref()
        .map(|secret| RequestSigner::new(SecretString::from(secret.to_string())));

    let transport = HttpTransport::new(
        Duration::from_secs(settings.connector.timeout_secs),
        RetryPolicy {
            attempts: settings.connector.retry_attempts,
            backoff: Duration::from_secs(settings.connector.retry_backoff_secs),
        },
        signer,
    )?;

    let connector = Arc::new(
        NucleusConnector::new(transport).with_observer(Arc::new(LogObserver)),
    );
    let store: Arc<dyn BackupStore> = Arc::new(FileBackupStore::new(layout.backups_dir()));
    let audit = Arc::new(FileAuditSink::new(layout.audit_file()));

    // Establish configured connections; an unreachable nucleus is reported
    // but does not stop the others.
    for entry in &settings.nuclei {
        let descriptor = NucleusDescriptor {
            id: entry.id.clone(),
            name: entry.name.clone(),
            category: entry.category,
            base_url: entry.base_url.clone(),
            credential: entry
                .credential
                .as_deref()
                .map(|c| SecretString::from(c.to_string())),
        };
        if let Err(e) = connector.connect(descriptor).await {
            warn!("{}", e);
        }
    }

    let orchestrator = Orchestrator::new(connector.clone(), store.clone(), audit);

    if let Some(request_path) = cli_args.get("deploy") {
        let request: DeployRequest = File::new(request_path.as_str()).read_json().await?;
        let result = orchestrator.deploy(&request).await;
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(result.success);
    }

    if let Some(backup_id) = cli_args.get("rollback") {
        let deployment_id = cli_args
            .get("deployment")
            .map(|s| s.as_str())
            .unwrap_or("manual");
        let result = orchestrator.rollback(deployment_id, backup_id).await;
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(result.success);
    }

    if cli_args.contains_key("status") {
        let connections = connector.list_connections().await;
        println!("{}", serde_json::to_string_pretty(&connections)?);
        return Ok(true);
    }

    if cli_args.contains_key("list-backups") {
        let nucleus_id = cli_args.get("nucleus").map(|s| s.as_str());
        let records = store.list(nucleus_id).await?;
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(true);
    }

    if let Some(repository) = cli_args.get("listing") {
        let nucleus_id = cli_args
            .get("nucleus")
            .ok_or_else(|| CoreError::ValidationError("--listing requires --nucleus".to_string()))?;
        let query = CodebaseQuery {
            branch: cli_args.get("branch").cloned(),
            ..Default::default()
        };
        let listing = connector
            .fetch_codebase(nucleus_id, repository, &query)
            .await?;
        println!("{}", serde_json::to_string_pretty(&listing)?);
        return Ok(true);
    }

    if cli_args.contains_key("watch") {
        if !settings.health.enable {
            warn!("Health worker disabled in settings, nothing to watch");
            return Ok(true);
        }

        let options = health::Options {
            interval: Duration::from_secs(settings.health.interval_secs),
            ..Default::default()
        };
        info!("Watching fleet health every {}s...", settings.health.interval_secs);
        health::run(
            &options,
            connector.as_ref(),
            tokio::time::sleep,
            Box::pin(await_shutdown_signal()),
        )
        .await;
        return Ok(true);
    }

    println!("Usage: nucleusd [--config=<dir>]");
    println!("  --version                 print version information");
    println!("  --deploy=<request.json>   run a deployment request");
    println!("  --rollback=<backup-id> [--deployment=<id>]");
    println!("                            restore files from a backup");
    println!("  --status                  list tracked connections");
    println!("  --list-backups [--nucleus=<id>]");
    println!("  --listing=<repository> --nucleus=<id> [--branch=<name>]");
    println!("                            fetch a codebase listing");
    println!("  --watch                   run periodic fleet health checks");
    Ok(true)
}

/// Forwards connection notifications to the log stream; a dashboard would
/// plug in here instead.
struct LogObserver;

impl ConnectorObserver for LogObserver {
    fn on_connected(&self, nucleus_id: &str) {
        info!("Nucleus {} connected", nucleus_id);
    }

    fn on_disconnected(&self, nucleus_id: &str) {
        info!("Nucleus {} disconnected", nucleus_id);
    }

    fn on_liveness_changed(&self, nucleus_id: &str, liveness: nucleus_core::models::connection::Liveness) {
        warn!("Nucleus {} liveness changed to {:?}", nucleus_id, liveness);
    }
}

async fn await_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate()).unwrap();
        let mut sigint = signal(SignalKind::interrupt()).unwrap();

        tokio::select! {
            _ = sigterm.recv() => {
                info!("SIGTERM received, shutting down...");
            }
            _ = sigint.recv() => {
                info!("SIGINT received, shutting down...");
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl+C received, shutting down...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
        info!("Ctrl+C received, shutting down...");
    }
}
