use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use kube_resource_auditor::{
    evaluate, load_config_with_env, ContainerInfo, ContainerSpec, InventorySource, Message,
    Monitor, MockEnvironment, NotificationSink, NotifyError, PodInventory, ResourceSpec, Severity,
    UsageSample,
};

struct FakeInventory {
    pods: Vec<PodInventory>,
    fail_listing: bool,
    fail_usage_call: Option<usize>,
    list_calls: AtomicUsize,
    usage_calls: AtomicUsize,
    excluded_seen: Mutex<Vec<String>>,
    first_listing_delay: Option<Duration>,
    listed_at: Mutex<Vec<tokio::time::Instant>>,
}

impl FakeInventory {
    fn new(pods: Vec<PodInventory>) -> Self {
        Self {
            pods,
            fail_listing: false,
            fail_usage_call: None,
            list_calls: AtomicUsize::new(0),
            usage_calls: AtomicUsize::new(0),
            excluded_seen: Mutex::new(Vec::new()),
            first_listing_delay: None,
            listed_at: Mutex::new(Vec::new()),
        }
    }

    fn slow_first_listing(mut self, delay: Duration) -> Self {
        self.first_listing_delay = Some(delay);
        self
    }

    fn failing_listing() -> Self {
        Self { fail_listing: true, ..Self::new(Vec::new()) }
    }

    fn failing_usage_on_call(mut self, call: usize) -> Self {
        self.fail_usage_call = Some(call);
        self
    }
}

#[async_trait]
impl InventorySource for FakeInventory {
    async fn list_pods(&self, exclude_namespace: &str) -> Result<Vec<PodInventory>> {
        let call = self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.listed_at.lock().unwrap().push(tokio::time::Instant::now());
        self.excluded_seen.lock().unwrap().push(exclude_namespace.to_string());
        if let (0, Some(delay)) = (call, self.first_listing_delay) {
            tokio::time::sleep(delay).await;
        }
        if self.fail_listing {
            return Err(anyhow!("connection refused"));
        }
        Ok(self.pods.clone())
    }

    async fn get_usage(&self, _namespace: &str, pod: &str) -> Result<Vec<UsageSample>> {
        let call = self.usage_calls.fetch_add(1, Ordering::SeqCst);
        if Some(call) == self.fail_usage_call {
            return Err(anyhow!("metrics not available yet"));
        }
        Ok(vec![UsageSample {
            name: format!("{}-main", pod),
            cpu_millicores: 50,
            memory_mebibytes: 32,
            ephemeral_storage_bytes: 0,
        }])
    }
}

#[derive(Default)]
struct RecordingSink {
    enabled: bool,
    fail: bool,
    sent: Mutex<Vec<String>>,
}

impl RecordingSink {
    fn enabled() -> Self {
        Self { enabled: true, ..Default::default() }
    }

    fn disabled() -> Self {
        Self::default()
    }

    fn broken() -> Self {
        Self { enabled: true, fail: true, ..Default::default() }
    }

    fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    fn enabled(&self) -> bool {
        self.enabled
    }

    async fn send(&self, text: &str) -> Result<(), NotifyError> {
        if self.fail {
            return Err(NotifyError::Api("invalid_auth".to_string()));
        }
        self.sent.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

fn complete_spec() -> ResourceSpec {
    ResourceSpec::default()
        .with_limit("cpu", "500m")
        .with_request("cpu", "250m")
        .with_limit("memory", "512Mi")
        .with_request("memory", "256Mi")
}

fn pod(name: &str, namespace: &str, containers: Vec<(&str, ResourceSpec)>) -> PodInventory {
    PodInventory {
        name: name.to_string(),
        namespace: namespace.to_string(),
        containers: containers
            .into_iter()
            .map(|(n, resources)| ContainerSpec { name: n.to_string(), resources })
            .collect(),
    }
}

fn container(resources: ResourceSpec) -> ContainerInfo {
    ContainerInfo {
        pod: "checkout-5c6b".to_string(),
        namespace: "shop".to_string(),
        container: "app".to_string(),
        resources,
        usage: Vec::new(),
    }
}

fn count(messages: &[Message], severity: Severity) -> usize {
    messages.iter().filter(|m| m.severity == severity).count()
}

#[test]
fn test_limit_below_request_scenario() {
    let spec = ResourceSpec::default().with_limit("cpu", "100m").with_request("cpu", "200m");
    let messages = evaluate(&container(spec));

    // limits pass ALERT, requests pass ALERT, then memory limit + request warnings
    assert_eq!(messages.len(), 4);
    assert_eq!(messages[0].severity, Severity::Alert);
    assert_eq!(messages[0].resource, "cpu");
    assert!(messages[0].body.contains("exceeding its request limit"));
    assert_eq!(messages[1].severity, Severity::Alert);
    assert!(messages[1].body.contains("exceeding its limit"));
    assert!(messages[2].body.contains("no memory limit set"));
    assert!(messages[3].body.contains("no memory request set"));
    assert!(!messages.iter().any(|m| m.body.contains("no cpu")));
}

#[test]
fn test_empty_spec_yields_four_warnings() {
    let messages = evaluate(&container(ResourceSpec::default()));
    assert_eq!(count(&messages, Severity::Warning), 4);
    assert_eq!(count(&messages, Severity::Alert), 0);
    assert!(messages[0].body.contains("no cpu limit set. Current state: []"));
    assert!(messages[1].body.contains("no cpu request set"));
    assert!(messages[2].body.contains("no memory limit set"));
    assert!(messages[3].body.contains("no memory request set"));
}

#[test]
fn test_non_canonical_absent_resource_is_ignored() {
    let messages = evaluate(&container(complete_spec()));
    assert!(messages.iter().all(|m| m.resource != "nvidia.com/gpu"));
    assert!(messages.is_empty());
}

#[test]
fn test_one_sided_key_warns_exactly_once() {
    let spec = complete_spec().with_request("ephemeral-storage", "2Gi");
    let messages = evaluate(&container(spec));
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].severity, Severity::Warning);
    assert_eq!(messages[0].resource, "ephemeral-storage");
    assert!(messages[0].body.contains("request set but no limit defined. Current usage: 2Gi"));
}

#[test]
fn test_evaluation_is_repeatable() {
    let spec = ResourceSpec::default()
        .with_limit("cpu", "1")
        .with_request("cpu", "2")
        .with_limit("hugepages-2Mi", "4Mi")
        .with_request("example.com/foo", "3");
    let info = container(spec);
    let first: Vec<String> = evaluate(&info).iter().map(|m| m.to_string()).collect();
    let second: Vec<String> = evaluate(&info).iter().map(|m| m.to_string()).collect();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_cycle_delivers_every_message_when_sink_enabled() {
    let inventory = Arc::new(FakeInventory::new(vec![
        pod("web-0", "shop", vec![("app", ResourceSpec::default()), ("proxy", complete_spec())]),
    ]));
    let sink = Arc::new(RecordingSink::enabled());
    let monitor = Monitor::new(inventory.clone(), sink.clone(), Duration::from_secs(60), "kube-system");

    let summary = monitor.run_cycle().await.unwrap();

    assert_eq!(summary.containers_evaluated, 2);
    assert_eq!(summary.warning_count, 4);
    assert_eq!(summary.delivered_count, 4);
    assert_eq!(summary.buffered_count, 0);
    let sent = sink.sent();
    assert_eq!(sent.len(), 4);
    assert!(sent[0].starts_with("WARNING: Container app of pod web-0 in namespace shop has no cpu limit set."));
    assert!(sent[0].contains("web-0-main cpu=50m memory=32Mi"));
    assert_eq!(inventory.excluded_seen.lock().unwrap().as_slice(), ["kube-system"]);
}

#[tokio::test]
async fn test_cycle_buffers_when_sink_disabled() {
    let inventory = Arc::new(FakeInventory::new(vec![
        pod("web-0", "shop", vec![("app", ResourceSpec::default())]),
        pod("db-0", "data", vec![("postgres", complete_spec().with_limit("memory", "128Mi"))]),
    ]));
    let sink = Arc::new(RecordingSink::disabled());
    let monitor = Monitor::new(inventory, sink.clone(), Duration::from_secs(60), "kube-system");

    let summary = monitor.run_cycle().await.unwrap();

    assert!(sink.sent().is_empty());
    assert_eq!(summary.delivered_count, 0);
    assert_eq!(summary.alert_count, 2);
    assert_eq!(summary.warning_count, 4);
    assert_eq!(summary.buffered_count, 6);

    // buffers never carry over into the next cycle
    let again = monitor.run_cycle().await.unwrap();
    assert_eq!(again.buffered_count, 6);
}

#[tokio::test]
async fn test_usage_failure_skips_only_that_container() {
    let inventory = Arc::new(
        FakeInventory::new(vec![pod(
            "batch-0",
            "jobs",
            vec![
                ("first", ResourceSpec::default()),
                ("second", ResourceSpec::default()),
                ("third", ResourceSpec::default()),
            ],
        )])
        .failing_usage_on_call(1),
    );
    let sink = Arc::new(RecordingSink::enabled());
    let monitor = Monitor::new(inventory.clone(), sink.clone(), Duration::from_secs(60), "kube-system");

    let summary = monitor.run_cycle().await.unwrap();

    assert_eq!(inventory.usage_calls.load(Ordering::SeqCst), 3);
    assert_eq!(summary.containers_evaluated, 2);
    assert_eq!(summary.containers_skipped, 1);
    let sent = sink.sent();
    assert_eq!(sent.len(), 8);
    assert!(sent.iter().any(|m| m.contains("Container first ")));
    assert!(sent.iter().any(|m| m.contains("Container third ")));
    assert!(!sent.iter().any(|m| m.contains("Container second ")));
}

#[tokio::test]
async fn test_listing_failure_skips_the_cycle() {
    let inventory = Arc::new(FakeInventory::failing_listing());
    let sink = Arc::new(RecordingSink::enabled());
    let monitor = Monitor::new(inventory.clone(), sink.clone(), Duration::from_secs(60), "kube-system");

    let result = monitor.run_cycle().await;

    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("connection refused"));
    assert_eq!(inventory.usage_calls.load(Ordering::SeqCst), 0);
    assert!(sink.sent().is_empty());
}

#[tokio::test]
async fn test_delivery_failure_is_counted_not_fatal() {
    let inventory = Arc::new(FakeInventory::new(vec![
        pod("web-0", "shop", vec![("app", ResourceSpec::default())]),
    ]));
    let sink = Arc::new(RecordingSink::broken());
    let monitor = Monitor::new(inventory, sink, Duration::from_secs(60), "kube-system");

    let summary = monitor.run_cycle().await.unwrap();

    assert_eq!(summary.delivery_failure_count, 4);
    assert_eq!(summary.delivered_count, 0);
    assert_eq!(summary.buffered_count, 0);
}

#[tokio::test(start_paused = true)]
async fn test_loop_keeps_ticking_after_listing_failures() {
    let inventory = Arc::new(FakeInventory::failing_listing());
    let sink = Arc::new(RecordingSink::enabled());
    let monitor = Arc::new(Monitor::new(inventory.clone(), sink, Duration::from_secs(10), "kube-system"));

    let shutdown = CancellationToken::new();
    let handle = {
        let monitor = monitor.clone();
        let shutdown = shutdown.clone();
        tokio::spawn(async move { monitor.run(shutdown).await })
    };

    tokio::time::sleep(Duration::from_secs(35)).await;
    shutdown.cancel();
    handle.await.unwrap();

    assert_eq!(inventory.list_calls.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn test_ticks_missed_during_slow_cycle_are_dropped() {
    let inventory = Arc::new(
        FakeInventory::new(vec![pod("web", "default", vec![("app", complete_spec())])])
            .slow_first_listing(Duration::from_secs(25)),
    );
    let sink = Arc::new(RecordingSink::enabled());
    let monitor = Arc::new(Monitor::new(inventory.clone(), sink, Duration::from_secs(10), "kube-system"));

    let started = tokio::time::Instant::now();
    let shutdown = CancellationToken::new();
    let handle = {
        let monitor = monitor.clone();
        let shutdown = shutdown.clone();
        tokio::spawn(async move { monitor.run(shutdown).await })
    };

    tokio::time::sleep(Duration::from_secs(62)).await;
    shutdown.cancel();
    handle.await.unwrap();

    // The ticks due at 20s and 30s collapse into one cycle at 35s, then the
    // schedule realigns to multiples of the interval.
    let offsets: Vec<u64> = inventory
        .listed_at
        .lock()
        .unwrap()
        .iter()
        .map(|t| (*t - started).as_secs())
        .collect();
    assert_eq!(offsets, vec![10, 35, 40, 50, 60]);
}

#[tokio::test(start_paused = true)]
async fn test_out_of_range_interval_does_not_start() {
    let inventory = Arc::new(FakeInventory::new(Vec::new()));
    let sink = Arc::new(RecordingSink::enabled());
    let monitor = Monitor::new(inventory.clone(), sink, Duration::MAX, "kube-system");

    let finished = tokio::time::timeout(Duration::from_secs(5), monitor.run(CancellationToken::new())).await;

    assert!(finished.is_ok());
    assert_eq!(inventory.list_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_before_first_tick_runs_no_cycle() {
    let inventory = Arc::new(FakeInventory::new(Vec::new()));
    let sink = Arc::new(RecordingSink::enabled());
    let monitor = Monitor::new(inventory.clone(), sink, Duration::from_secs(120), "kube-system");

    let shutdown = CancellationToken::new();
    shutdown.cancel();
    monitor.run(shutdown).await;

    assert_eq!(inventory.list_calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_config_drives_monitor_settings() {
    let env = MockEnvironment::new()
        .with_var("DURATION_SECONDS", "1m30s")
        .with_var("EXCLUDED_NAMESPACE", "infra");
    let config = load_config_with_env(&env).unwrap();
    assert_eq!(config.poll_interval, Duration::from_secs(90));
    assert_eq!(config.excluded_namespace, "infra");
    assert!(config.slack_token.is_none());
}
