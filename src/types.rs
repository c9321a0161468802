use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use k8s_openapi::api::core::v1::ResourceRequirements;
use k8s_openapi::apimachinery::pkg::api::resource::Quantity as KubeQuantity;
use serde::{Deserialize, Serialize};

use crate::quantity::Quantity;

pub const RESOURCE_CPU: &str = "cpu";
pub const RESOURCE_MEMORY: &str = "memory";

/// Resource types that are always checked for presence.
pub const CANONICAL_RESOURCES: [&str; 2] = [RESOURCE_CPU, RESOURCE_MEMORY];

#[derive(Debug, Clone)]
pub struct Config {
    pub poll_interval: Duration,
    pub excluded_namespace: String,
    pub slack_token: Option<String>,
    pub slack_channel: Option<String>,
    pub slack_api_url: String,
    pub fail_if_no_metrics: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Alert,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Alert => f.write_str("ALERT"),
            Severity::Warning => f.write_str("WARNING"),
        }
    }
}

/// A classified finding produced by the evaluator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub severity: Severity,
    pub resource: String,
    pub body: String,
}

impl Message {
    pub fn alert(resource: &str, body: String) -> Self {
        Self { severity: Severity::Alert, resource: resource.to_string(), body }
    }

    pub fn warning(resource: &str, body: String) -> Self {
        Self { severity: Severity::Warning, resource: resource.to_string(), body }
    }

    pub fn is_alert(&self) -> bool {
        self.severity == Severity::Alert
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.severity, self.body)
    }
}

/// Point-in-time usage of one container, as reported by the metrics API.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct UsageSample {
    pub name: String,
    pub cpu_millicores: i64,
    pub memory_mebibytes: i64,
    pub ephemeral_storage_bytes: i64,
}

impl fmt::Display for UsageSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} cpu={}m memory={}Mi ephemeral-storage={}B",
            self.name, self.cpu_millicores, self.memory_mebibytes, self.ephemeral_storage_bytes
        )
    }
}

pub fn format_usage(samples: &[UsageSample]) -> String {
    let parts: Vec<String> = samples.iter().map(|s| s.to_string()).collect();
    format!("[{}]", parts.join(", "))
}

/// Declared limits and requests of a container, keyed by resource type.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ResourceSpec {
    pub limits: BTreeMap<String, Quantity>,
    pub requests: BTreeMap<String, Quantity>,
}

impl ResourceSpec {
    pub fn from_requirements(req: Option<&ResourceRequirements>) -> Self {
        match req {
            Some(r) => Self {
                limits: convert_list(r.limits.as_ref()),
                requests: convert_list(r.requests.as_ref()),
            },
            None => Self::default(),
        }
    }

    pub fn with_limit(mut self, resource: &str, quantity: &str) -> Self {
        self.limits.insert(resource.to_string(), Quantity::new(quantity));
        self
    }

    pub fn with_request(mut self, resource: &str, quantity: &str) -> Self {
        self.requests.insert(resource.to_string(), Quantity::new(quantity));
        self
    }
}

fn convert_list(list: Option<&BTreeMap<String, KubeQuantity>>) -> BTreeMap<String, Quantity> {
    list.map(|m| {
        m.iter()
            .map(|(name, q)| (name.clone(), Quantity::new(&q.0)))
            .collect()
    })
    .unwrap_or_default()
}

/// Everything the evaluator needs about one container for one cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerInfo {
    pub pod: String,
    pub namespace: String,
    pub container: String,
    pub resources: ResourceSpec,
    pub usage: Vec<UsageSample>,
}

#[derive(Debug, Clone)]
pub struct ContainerSpec {
    pub name: String,
    pub resources: ResourceSpec,
}

#[derive(Debug, Clone)]
pub struct PodInventory {
    pub name: String,
    pub namespace: String,
    pub containers: Vec<ContainerSpec>,
}

#[derive(Serialize)]
pub struct SlackPostMessage<'a> {
    pub channel: &'a str,
    pub text: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct SlackApiResponse {
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
}
