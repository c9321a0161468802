use anyhow::Result;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use kube_resource_auditor::config::load_config;
use kube_resource_auditor::logging::init_tracing;
use kube_resource_auditor::kubernetes::{ensure_metrics_available, ClientManager, KubeInventory};
use kube_resource_auditor::monitor::Monitor;
use kube_resource_auditor::slack::{NotificationSink, SlackNotifier};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cfg = load_config()?;
    info!(
        interval = ?cfg.poll_interval,
        excluded_namespace = %cfg.excluded_namespace,
        "configuration loaded"
    );

    let clients = ClientManager::new();
    let client = clients.client().await?;

    // Check metrics API availability early (fail fast if requested)
    if let Err(e) = ensure_metrics_available(&client).await {
        if cfg.fail_if_no_metrics {
            return Err(e);
        }
        warn!(error = %e, "Metrics API unavailable; usage snapshots will be missing");
    }

    let slack = SlackNotifier::from_config(&cfg)?;
    if !slack.enabled() {
        info!("Slack token or channel not set, messages will be logged");
    }

    let monitor = Monitor::from_config(&cfg, Arc::new(KubeInventory::new(client)), Arc::new(slack));

    let shutdown = CancellationToken::new();
    tokio::spawn(wait_for_signal(shutdown.clone()));
    monitor.run(shutdown).await;

    Ok(())
}

async fn wait_for_signal(shutdown: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => info!("SIGINT received"),
                    _ = term.recv() => info!("SIGTERM received"),
                }
            }
            Err(e) => {
                warn!(error = %e, "Unable to install SIGTERM handler");
                let _ = tokio::signal::ctrl_c().await;
                info!("SIGINT received");
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        info!("SIGINT received");
    }
    shutdown.cancel();
}
