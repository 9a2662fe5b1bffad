pub mod config;
pub mod error;
pub mod metrics;
pub mod scenario;

pub use config::{LabConfig, ModelConfig, ModelConfigOverride, RunConfig};
pub use error::{ParseIssue, ValidationError};
pub use metrics::{
    LinkRates, Metric, MetricOrigin, PacketCounts, PartialMetrics, ResultRecord, ScenarioMetrics,
};
pub use scenario::{
    CLIENT_COUNTS, Mobility, ScenarioGrid, ScenarioKey, TrafficMix, validate_client_count,
};
