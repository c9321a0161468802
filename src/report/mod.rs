use chrono::{DateTime, Utc};

use crate::types::Message;

/// Everything observed during one poll cycle. Dropped when the cycle ends.
#[derive(Debug)]
pub struct CycleReport {
    pub started_at: DateTime<Utc>,
    pub containers_evaluated: usize,
    pub containers_skipped: usize,
    pub alerts: usize,
    pub warnings: usize,
    pub delivered: usize,
    pub delivery_failures: usize,
    /// Messages held back because the sink is not enabled
    pub buffered: Vec<Message>,
}

impl CycleReport {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            containers_evaluated: 0,
            containers_skipped: 0,
            alerts: 0,
            warnings: 0,
            delivered: 0,
            delivery_failures: 0,
            buffered: Vec::new(),
        }
    }

    pub fn record(&mut self, message: &Message) {
        if message.is_alert() {
            self.alerts += 1;
        } else {
            self.warnings += 1;
        }
    }

    pub fn buffer(&mut self, message: Message) {
        self.buffered.push(message);
    }

    pub fn buffered_lines(&self) -> Vec<String> {
        self.buffered.iter().map(|m| m.to_string()).collect()
    }

    pub fn summary(&self) -> CycleSummary {
        CycleSummary {
            containers_evaluated: self.containers_evaluated,
            containers_skipped: self.containers_skipped,
            alert_count: self.alerts,
            warning_count: self.warnings,
            delivered_count: self.delivered,
            delivery_failure_count: self.delivery_failures,
            buffered_count: self.buffered.len(),
        }
    }
}

impl Default for CycleReport {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleSummary {
    pub containers_evaluated: usize,
    pub containers_skipped: usize,
    pub alert_count: usize,
    pub warning_count: usize,
    pub delivered_count: usize,
    pub delivery_failure_count: usize,
    pub buffered_count: usize,
}

impl CycleSummary {
    pub fn total_messages(&self) -> usize {
        self.alert_count + self.warning_count
    }

    pub fn has_messages(&self) -> bool {
        self.total_messages() > 0
    }
}
