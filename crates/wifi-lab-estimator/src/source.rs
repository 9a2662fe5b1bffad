use crate::accounting::account_packets;
use crate::adapter::{FlowDump, summarize_flows};
use crate::estimator::PerformanceEstimator;
use anyhow::Result;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::path::PathBuf;
use tracing::debug;
use wifi_lab_abstract::{
    MetricOrigin, ModelConfig, ResultRecord, RunConfig, ScenarioKey, ScenarioMetrics,
};

/// Anything able to produce a complete result record for a scenario.
///
/// Implementations hold no mutable state, so one instance can serve any
/// number of scenarios in parallel.
pub trait MetricSource: Send + Sync {
    fn origin(&self) -> MetricOrigin;

    fn measure(&self, key: &ScenarioKey) -> Result<ResultRecord>;
}

/// Describes how to build a metric source.
#[derive(Debug, Clone)]
pub enum SourceDescriptor {
    Synthetic { model: ModelConfig, run: RunConfig },
    FlowMonitor { dump_dir: PathBuf, duration_secs: f64 },
}

impl SourceDescriptor {
    pub fn build(self) -> Result<Box<dyn MetricSource>> {
        Ok(match self {
            SourceDescriptor::Synthetic { model, run } => {
                run.validate(&model)?;
                Box::new(SyntheticSource::new(model, run))
            }
            SourceDescriptor::FlowMonitor {
                dump_dir,
                duration_secs,
            } => Box::new(FlowMonitorSource::new(dump_dir, duration_secs)),
        })
    }
}

/// Mixes the base seed with the scenario name so every scenario draws from
/// its own stream, independent of execution order.
pub fn derive_seed(base: u64, key: &ScenarioKey) -> u64 {
    let mut hash = base ^ 0x9E37_79B9_7F4A_7C15;
    for byte in key.canonical_name().bytes() {
        hash = hash.wrapping_mul(0x0100_0000_01B3).wrapping_add(u64::from(byte));
    }
    hash
}

pub struct SyntheticSource {
    estimator: PerformanceEstimator,
    run: RunConfig,
}

impl SyntheticSource {
    pub fn new(model: ModelConfig, run: RunConfig) -> Self {
        Self {
            estimator: PerformanceEstimator::new(model),
            run,
        }
    }

    pub fn estimator(&self) -> &PerformanceEstimator {
        &self.estimator
    }
}

impl MetricSource for SyntheticSource {
    fn origin(&self) -> MetricOrigin {
        MetricOrigin::Synthetic
    }

    fn measure(&self, key: &ScenarioKey) -> Result<ResultRecord> {
        let seed = derive_seed(self.run.seed, key);
        let mut rng = StdRng::seed_from_u64(seed);
        let rates = self.estimator.estimate(key, &mut rng);
        let packets = account_packets(
            self.estimator.config(),
            key.traffic(),
            &rates,
            self.run.duration_secs,
        );
        debug!(scenario = %key, seed, ?rates, ?packets, "synthetic estimate");
        Ok(ResultRecord {
            key: *key,
            metrics: ScenarioMetrics::new(rates, packets),
            origin: MetricOrigin::Synthetic,
            duration_secs: self.run.duration_secs,
        })
    }
}

/// Reads `{dump_dir}/{canonical name}.flows.json` for each scenario.
pub struct FlowMonitorSource {
    dump_dir: PathBuf,
    duration_secs: f64,
}

impl FlowMonitorSource {
    pub fn new(dump_dir: impl Into<PathBuf>, duration_secs: f64) -> Self {
        Self {
            dump_dir: dump_dir.into(),
            duration_secs,
        }
    }

    pub fn dump_path(&self, key: &ScenarioKey) -> PathBuf {
        self.dump_dir.join(format!("{}.flows.json", key.canonical_name()))
    }
}

impl MetricSource for FlowMonitorSource {
    fn origin(&self) -> MetricOrigin {
        MetricOrigin::FlowMonitor
    }

    fn measure(&self, key: &ScenarioKey) -> Result<ResultRecord> {
        let dump = FlowDump::from_path(&self.dump_path(key))?;
        let summary = summarize_flows(&dump.flows);
        debug!(
            scenario = %key,
            flows = summary.flow_count,
            throughput_flows = summary.throughput_flows,
            delay_flows = summary.delay_flows,
            "flow monitor summary"
        );
        Ok(ResultRecord {
            key: *key,
            metrics: summary.metrics,
            origin: MetricOrigin::FlowMonitor,
            duration_secs: self.duration_secs,
        })
    }
}
