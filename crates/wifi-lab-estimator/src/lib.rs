pub mod accounting;
pub mod adapter;
pub mod estimator;
pub mod source;

pub use accounting::account_packets;
pub use adapter::{FlowDump, FlowRecord, FlowSummary, summarize_flows};
pub use estimator::PerformanceEstimator;
pub use source::{FlowMonitorSource, MetricSource, SourceDescriptor, SyntheticSource, derive_seed};
