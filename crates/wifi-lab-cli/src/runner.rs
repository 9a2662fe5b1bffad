use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};
use wifi_lab_abstract::ScenarioKey;
use wifi_lab_estimator::MetricSource;
use wifi_lab_results::ResultStore;

#[derive(Debug, Default)]
pub struct SweepReport {
    pub written: Vec<(ScenarioKey, PathBuf)>,
    pub failed: Vec<(ScenarioKey, String)>,
}

impl SweepReport {
    pub fn total(&self) -> usize {
        self.written.len() + self.failed.len()
    }
}

/// Measures every key and stores its record, at most `jobs` at a time.
///
/// Scenarios share nothing but the source and the store; each task writes
/// only its own record. A failing scenario is reported, not fatal.
pub async fn run_sweep(
    source: Arc<dyn MetricSource>,
    store: Arc<ResultStore>,
    keys: Vec<ScenarioKey>,
    jobs: usize,
) -> Result<SweepReport> {
    let total = keys.len();
    let permits = Arc::new(Semaphore::new(jobs.max(1)));
    let mut join_set = JoinSet::new();

    info!(total, jobs, origin = %source.origin(), "starting sweep");
    for key in keys {
        let source = Arc::clone(&source);
        let store = Arc::clone(&store);
        let permits = Arc::clone(&permits);
        join_set.spawn(async move {
            let _permit = permits.acquire_owned().await?;
            let outcome = tokio::task::spawn_blocking(move || -> Result<PathBuf> {
                let record = source.measure(&key)?;
                Ok(store.write(&record)?)
            })
            .await?;
            anyhow::Ok((key, outcome))
        });
    }

    let mut report = SweepReport::default();
    while let Some(joined) = join_set.join_next().await {
        let (key, outcome) = joined.context("sweep task panicked")??;
        match outcome {
            Ok(path) => {
                report.written.push((key, path));
                info!(scenario = %key, done = report.total(), total, "scenario stored");
            }
            Err(err) => {
                warn!(scenario = %key, error = %format!("{err:#}"), "scenario failed");
                report.failed.push((key, format!("{err:#}")));
            }
        }
    }

    report.written.sort_by_key(|(key, _)| *key);
    report.failed.sort_by_key(|(key, _)| *key);
    Ok(report)
}
