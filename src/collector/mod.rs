use anyhow::Result;
use tracing::{debug, error};

use crate::inventory::InventorySource;
use crate::types::ContainerInfo;

/// Gathers one cycle's worth of container data from an inventory source.
pub struct InventoryCollector<'a> {
    source: &'a dyn InventorySource,
    exclude_namespace: &'a str,
}

impl<'a> InventoryCollector<'a> {
    pub fn new(source: &'a dyn InventorySource, exclude_namespace: &'a str) -> Self {
        Self { source, exclude_namespace }
    }

    /// List pods and attach usage to each container.
    ///
    /// A listing failure aborts the collection. A usage failure only drops
    /// the affected container, which is counted in `skipped`.
    pub async fn collect(&self) -> Result<Collection> {
        let pods = self.source.list_pods(self.exclude_namespace).await?;

        let mut collection = Collection::default();
        for pod in pods {
            for container in pod.containers {
                debug!(
                    namespace = %pod.namespace,
                    pod = %pod.name,
                    container = %container.name,
                    "getting metrics"
                );
                match self.source.get_usage(&pod.namespace, &pod.name).await {
                    Ok(usage) => collection.containers.push(ContainerInfo {
                        pod: pod.name.clone(),
                        namespace: pod.namespace.clone(),
                        container: container.name,
                        resources: container.resources,
                        usage,
                    }),
                    Err(e) => {
                        error!(
                            namespace = %pod.namespace,
                            pod = %pod.name,
                            container = %container.name,
                            error = %e,
                            "Error getting metrics"
                        );
                        collection.skipped += 1;
                    }
                }
            }
        }
        Ok(collection)
    }
}

/// Containers ready for evaluation
#[derive(Debug, Default)]
pub struct Collection {
    pub containers: Vec<ContainerInfo>,
    pub skipped: usize,
}
