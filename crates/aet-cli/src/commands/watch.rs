//! `aet watch`: the long-running intake loop.

use aet_broker_alpaca::AlpacaFactory;
use aet_pipeline::{run_watch, Pipeline, Watcher};
use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

use super::load_config;

pub async fn watch(config_paths: &[String], root: Option<PathBuf>, once: bool) -> Result<()> {
    let (cfg, loaded) = load_config(config_paths, root)?;
    info!(
        config_hash = %loaded.config_hash,
        root = %cfg.paths.root.display(),
        "config loaded"
    );

    let factory = Arc::new(AlpacaFactory::new(cfg.broker.clone(), cfg.dispatch.timeout()));
    let mut pipeline = Pipeline::new(&cfg, factory)?;

    let report = pipeline.reconcile()?;
    if !report.flagged.is_empty() {
        warn!(
            flagged = report.flagged.len(),
            "files left in processing need manual review before resubmission"
        );
    }

    let mut watcher = Watcher::new(pipeline.dirs().incoming.clone(), &cfg.watcher);

    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("shutdown requested; finishing current file");
        let _ = tx.send(true);
    });

    let stats = run_watch(&mut pipeline, &mut watcher, rx, once).await?;

    println!("reconcile_inspected={}", report.inspected);
    println!("reconcile_completed={}", report.completed.len());
    println!("reconcile_flagged={}", report.flagged.len());
    println!("processed={}", stats.processed);
    println!("successful={}", stats.successful);
    println!("failed={}", stats.failed);
    println!("duplicates={}", stats.duplicates);
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "ctrl-c handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
