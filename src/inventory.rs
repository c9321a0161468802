use anyhow::Result;
use async_trait::async_trait;

use crate::types::{PodInventory, UsageSample};

/// Source of the workloads to audit and their live usage.
#[async_trait]
pub trait InventorySource: Send + Sync {
    /// List every pod outside `exclude_namespace` along with its containers' declared resources.
    async fn list_pods(&self, exclude_namespace: &str) -> Result<Vec<PodInventory>>;

    /// Fetch per-container usage samples for one pod.
    async fn get_usage(&self, namespace: &str, pod: &str) -> Result<Vec<UsageSample>>;
}
