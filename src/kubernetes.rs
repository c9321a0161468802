use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Pod;
use kube::{api::ListParams, Api, Client};
use serde::Deserialize;
use std::collections::HashMap;
use tokio::sync::OnceCell;
use tracing::{error, info};

use crate::inventory::InventorySource;
use crate::parsing::{bytes_to_mebibytes, parse_cpu_to_millicores, parse_memory_to_bytes};
use crate::types::{ContainerSpec, PodInventory, ResourceSpec, UsageSample};

/// Creates the cluster client on first use and hands out clones afterwards.
#[derive(Default)]
pub struct ClientManager {
    client: OnceCell<Client>,
}

impl ClientManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn client(&self) -> Result<Client> {
        let client = self
            .client
            .get_or_try_init(|| async {
                let client = Client::try_default().await.map_err(|e| {
                    error!(error = %e, "Unable to create Kubernetes client");
                    anyhow!("Kubernetes config error: {}", e)
                })?;
                info!("Successfully created Kubernetes client");
                Ok::<_, anyhow::Error>(client)
            })
            .await?;
        Ok(client.clone())
    }
}

#[derive(Debug, Deserialize)]
pub struct ContainerMetrics {
    pub name: String,
    #[serde(default)]
    pub usage: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
pub struct PodMetrics {
    #[serde(default)]
    pub containers: Vec<ContainerMetrics>,
}

#[derive(Debug, Deserialize)]
pub struct PodMetricsList {
    pub items: Vec<serde_json::Value>,
}

/// Inventory backed by the Kubernetes API and the metrics.k8s.io aggregated API.
pub struct KubeInventory {
    client: Client,
}

impl KubeInventory {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl InventorySource for KubeInventory {
    async fn list_pods(&self, exclude_namespace: &str) -> Result<Vec<PodInventory>> {
        let pod_api: Api<Pod> = Api::all(self.client.clone());
        let params = ListParams::default().fields(&format!("metadata.namespace!={}", exclude_namespace));
        let pods = pod_api.list(&params).await.context("Cannot get pods")?;
        Ok(pods
            .items
            .iter()
            .filter_map(|pod| pod_inventory(pod, exclude_namespace))
            .collect())
    }

    async fn get_usage(&self, namespace: &str, pod: &str) -> Result<Vec<UsageSample>> {
        use http::Request as HttpRequest;
        let path = format!("/apis/metrics.k8s.io/v1beta1/namespaces/{}/pods/{}", namespace, pod);
        let req = HttpRequest::builder()
            .method("GET")
            .uri(path)
            .body(Vec::new())
            .map_err(|e| anyhow!("build request: {}", e))?;
        let metrics: PodMetrics = self.client.request(req).await?;
        Ok(usage_samples(metrics))
    }
}

/// Query the metrics API once so a missing metrics-server shows up at startup.
pub async fn ensure_metrics_available(client: &Client) -> Result<()> {
    use http::Request as HttpRequest;
    let req = HttpRequest::builder()
        .method("GET")
        .uri("/apis/metrics.k8s.io/v1beta1/pods?limit=1")
        .body(Vec::new())
        .map_err(|e| anyhow!("build request: {}", e))?;
    let _: PodMetricsList = client
        .request(req)
        .await
        .context("metrics.k8s.io API is not available")?;
    Ok(())
}

pub fn pod_inventory(pod: &Pod, exclude_namespace: &str) -> Option<PodInventory> {
    let name = pod.metadata.name.clone()?;
    let namespace = pod.metadata.namespace.clone().unwrap_or_default();
    if namespace == exclude_namespace {
        return None;
    }
    let containers = pod
        .spec
        .as_ref()
        .map(|spec| {
            spec.containers
                .iter()
                .map(|c| ContainerSpec {
                    name: c.name.clone(),
                    resources: ResourceSpec::from_requirements(c.resources.as_ref()),
                })
                .collect()
        })
        .unwrap_or_default();
    Some(PodInventory { name, namespace, containers })
}

pub fn usage_samples(metrics: PodMetrics) -> Vec<UsageSample> {
    metrics
        .containers
        .into_iter()
        .map(|c| {
            let read = |key: &str, parse: fn(&str) -> Option<i64>| {
                c.usage.get(key).and_then(|q| parse(q)).unwrap_or(0)
            };
            UsageSample {
                cpu_millicores: read("cpu", parse_cpu_to_millicores),
                memory_mebibytes: bytes_to_mebibytes(read("memory", parse_memory_to_bytes)),
                ephemeral_storage_bytes: read("ephemeral-storage", parse_memory_to_bytes),
                name: c.name,
            }
        })
        .collect()
}
