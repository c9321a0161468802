// Public modules
pub mod types;
pub mod quantity;
pub mod config;
pub mod parsing;
pub mod evaluator;
pub mod inventory;
pub mod kubernetes;
pub mod collector;
pub mod slack;
pub mod report;
pub mod monitor;
pub mod logging;

// Re-export commonly used items
pub use types::*;
pub use quantity::{Decimal, Quantity};
pub use config::{load_config, load_config_with_env, EnvironmentProvider, SystemEnvironment, MockEnvironment};
pub use parsing::{parse_cpu_to_millicores, parse_memory_to_bytes, parse_quantity, parse_duration};
pub use evaluator::evaluate;
pub use inventory::InventorySource;
pub use kubernetes::{ensure_metrics_available, ClientManager, KubeInventory};
pub use collector::{Collection, InventoryCollector};
pub use slack::{NotificationSink, NotifyError, SlackNotifier};
pub use report::{CycleReport, CycleSummary};
pub use monitor::Monitor;
pub use logging::init_tracing;
