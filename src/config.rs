use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::time::Duration;
use crate::parsing::parse_duration;
use crate::types::Config;

pub const DEFAULT_POLL_INTERVAL: &str = "120s";
pub const DEFAULT_EXCLUDED_NAMESPACE: &str = "kube-system";
pub const DEFAULT_SLACK_CHANNEL: &str = "k8s-alerts";
pub const DEFAULT_SLACK_API_URL: &str = "https://slack.com/api";
/// Upper bound for `DURATION_SECONDS` (one week).
pub const MAX_POLL_INTERVAL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Trait for abstracting environment variable access
pub trait EnvironmentProvider {
    fn get_var(&self, key: &str) -> Option<String>;
}

/// Production implementation using std::env
pub struct SystemEnvironment;

impl EnvironmentProvider for SystemEnvironment {
    fn get_var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// Mock implementation for testing
#[derive(Debug, Default)]
pub struct MockEnvironment {
    vars: HashMap<String, String>,
}

impl MockEnvironment {
    pub fn new() -> Self {
        Self {
            vars: HashMap::new(),
        }
    }

    pub fn set_var<K, V>(&mut self, key: K, value: V) -> &mut Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.vars.insert(key.into(), value.into());
        self
    }

    pub fn with_var<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.set_var(key, value);
        self
    }
}

impl EnvironmentProvider for MockEnvironment {
    fn get_var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }
}

pub fn load_config() -> Result<Config> {
    load_config_with_env(&SystemEnvironment)
}

pub fn load_config_with_env<E: EnvironmentProvider>(env: &E) -> Result<Config> {
    let raw_interval = env.get_var("DURATION_SECONDS")
        .unwrap_or_else(|| DEFAULT_POLL_INTERVAL.to_string());
    let poll_interval = parse_duration(&raw_interval)
        .ok_or_else(|| anyhow!("Invalid DURATION_SECONDS: {:?}", raw_interval))?;
    // tokio intervals panic on a zero period
    if poll_interval.is_zero() {
        return Err(anyhow!("DURATION_SECONDS must be greater than zero"));
    }
    if poll_interval > MAX_POLL_INTERVAL {
        return Err(anyhow!(
            "DURATION_SECONDS must not exceed {}h, got {:?}",
            MAX_POLL_INTERVAL.as_secs() / 3600,
            raw_interval
        ));
    }

    let excluded_namespace = non_empty(env.get_var("EXCLUDED_NAMESPACE"))
        .unwrap_or_else(|| DEFAULT_EXCLUDED_NAMESPACE.to_string());

    let slack_token = non_empty(env.get_var("SLACK_TOKEN"));
    let slack_channel = match env.get_var("SLACK_CHANNEL") {
        Some(v) => non_empty(Some(v)),
        None => Some(DEFAULT_SLACK_CHANNEL.to_string()),
    };
    let slack_api_url = non_empty(env.get_var("SLACK_API_URL"))
        .unwrap_or_else(|| DEFAULT_SLACK_API_URL.to_string())
        .trim_end_matches('/')
        .to_string();

    let fail_if_no_metrics = env.get_var("FAIL_IF_NO_METRICS")
        .map(|v| matches!(v.as_str(), "1" | "true" | "TRUE" | "True"))
        .unwrap_or(false);

    Ok(Config {
        poll_interval,
        excluded_namespace,
        slack_token,
        slack_channel,
        slack_api_url,
        fail_if_no_metrics,
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
