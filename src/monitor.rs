use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::collector::InventoryCollector;
use crate::evaluator::evaluate;
use crate::inventory::InventorySource;
use crate::report::{CycleReport, CycleSummary};
use crate::slack::NotificationSink;
use crate::types::Config;

/// Drives the evaluator over the whole cluster on a fixed cadence.
pub struct Monitor {
    inventory: Arc<dyn InventorySource>,
    sink: Arc<dyn NotificationSink>,
    poll_interval: Duration,
    excluded_namespace: String,
}

impl Monitor {
    pub fn new(
        inventory: Arc<dyn InventorySource>,
        sink: Arc<dyn NotificationSink>,
        poll_interval: Duration,
        excluded_namespace: impl Into<String>,
    ) -> Self {
        Self {
            inventory,
            sink,
            poll_interval,
            excluded_namespace: excluded_namespace.into(),
        }
    }

    pub fn from_config(
        cfg: &Config,
        inventory: Arc<dyn InventorySource>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        Self::new(inventory, sink, cfg.poll_interval, cfg.excluded_namespace.clone())
    }

    /// Run cycles until `shutdown` is cancelled.
    ///
    /// The first cycle starts one interval after the call. Ticks that fire
    /// while a cycle is running are dropped, and cancellation is only
    /// observed between cycles.
    pub async fn run(&self, shutdown: CancellationToken) {
        info!(
            interval_secs = self.poll_interval.as_secs_f64(),
            excluded_namespace = %self.excluded_namespace,
            slack_enabled = self.sink.enabled(),
            "Starting resource compliance monitor"
        );

        let Some(first_tick) = Instant::now().checked_add(self.poll_interval) else {
            error!(
                interval_secs = self.poll_interval.as_secs_f64(),
                "Poll interval is out of range, monitor not started"
            );
            return;
        };
        let mut ticker = interval_at(first_tick, self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    info!("Shutting down resource compliance monitor");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.run_cycle().await {
                        error!(error = %e, "Error retrieving pod info");
                    }
                }
            }
        }
    }

    /// One poll, evaluate and notify pass.
    pub async fn run_cycle(&self) -> Result<CycleSummary> {
        let mut report = CycleReport::new();
        let collection = InventoryCollector::new(self.inventory.as_ref(), &self.excluded_namespace)
            .collect()
            .await?;
        report.containers_skipped = collection.skipped;

        let sink_enabled = self.sink.enabled();
        for container in &collection.containers {
            report.containers_evaluated += 1;
            for message in evaluate(container) {
                report.record(&message);
                if !sink_enabled {
                    report.buffer(message);
                    continue;
                }
                match self.sink.send(&message.to_string()).await {
                    Ok(()) => report.delivered += 1,
                    Err(e) => {
                        error!(
                            namespace = %container.namespace,
                            pod = %container.pod,
                            container = %container.container,
                            error = %e,
                            "Failed to send Slack notification"
                        );
                        report.delivery_failures += 1;
                    }
                }
            }
        }

        let summary = report.summary();
        if !sink_enabled && summary.has_messages() {
            info!(messages = ?report.buffered_lines(), "Resource(s) need adjusting");
        }

        info!(
            started_at = %report.started_at.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            evaluated = summary.containers_evaluated,
            skipped = summary.containers_skipped,
            alerts = summary.alert_count,
            warnings = summary.warning_count,
            messages = summary.total_messages(),
            delivered = summary.delivered_count,
            failed_deliveries = summary.delivery_failure_count,
            "Compliance cycle complete"
        );
        Ok(summary)
    }
}
