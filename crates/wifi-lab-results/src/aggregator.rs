use crate::artifact::{ParsedRecord, parse_artifact};
use crate::store::{ARTIFACT_EXTENSION, ResultStore, StoreError};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use wifi_lab_abstract::{Metric, PartialMetrics, ScenarioGrid, ScenarioKey, ValidationError};

/// Scenario metrics indexed by structured key, in listing order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResultTable {
    rows: BTreeMap<ScenarioKey, PartialMetrics>,
}

impl ResultTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: ScenarioKey, metrics: impl Into<PartialMetrics>) {
        self.rows.insert(key, metrics.into());
    }

    pub fn get(&self, key: &ScenarioKey) -> Option<&PartialMetrics> {
        self.rows.get(key)
    }

    /// `None` both when the scenario is absent and when the field is.
    pub fn value(&self, key: &ScenarioKey, metric: Metric) -> Option<f64> {
        self.rows.get(key).and_then(|m| m.value(metric))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ScenarioKey, &PartialMetrics)> {
        self.rows.iter()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = ParsedRecord>,
    {
        let mut table = Self::new();
        for record in records {
            table.insert(record.key, record.metrics);
        }
        table
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScanOutcome {
    /// Every recognized artifact, complete or not. Absent fields stay absent.
    pub table: ResultTable,
    pub complete_count: usize,
    pub partial: Vec<ParsedRecord>,
    /// Directory entries whose names do not follow the canonical key grammar.
    pub ignored: Vec<PathBuf>,
}

impl ScanOutcome {
    pub fn partial_count(&self) -> usize {
        self.partial.len()
    }

    /// Grid scenarios with no stored artifact at all.
    pub fn missing(&self, grid: &ScenarioGrid) -> Result<Vec<ScenarioKey>, ValidationError> {
        Ok(grid
            .keys()?
            .into_iter()
            .filter(|key| self.table.get(key).is_none())
            .collect())
    }
}

/// Reads every artifact in the store in one pass.
///
/// Per-record problems never fail the scan: unreadable or malformed artifacts
/// become partial records, and a root that does not exist yet yields an empty
/// outcome. Only a failure to list an existing directory is an error.
pub fn scan(store: &ResultStore) -> Result<ScanOutcome, StoreError> {
    let root = store.root();
    let entries = match fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            warn!(root = %root.display(), "result directory does not exist");
            return Ok(ScanOutcome::default());
        }
        Err(e) => {
            return Err(StoreError::Io {
                action: "list",
                path: root.to_path_buf(),
                source: e,
            });
        }
    };

    let mut outcome = ScanOutcome::default();
    let mut paths: Vec<PathBuf> = entries.filter_map(|e| e.ok().map(|e| e.path())).collect();
    paths.sort();

    for path in paths {
        let Some(key) = recognize(&path) else {
            // temporary files from in-flight writes are hidden and skipped quietly
            let hidden = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with('.'));
            if !hidden {
                debug!(path = %path.display(), "ignoring unrecognized entry");
                outcome.ignored.push(path);
            }
            continue;
        };

        let record = match fs::read_to_string(&path) {
            Ok(text) => parse_artifact(key, &text),
            Err(e) => ParsedRecord::unreadable(key, e.to_string()),
        };

        if record.is_complete() {
            outcome.complete_count += 1;
        } else {
            for issue in &record.issues {
                warn!(scenario = %key, %issue, "partial record");
            }
            outcome.partial.push(record.clone());
        }
        outcome.table.insert(record.key, record.metrics);
    }

    info!(
        complete = outcome.complete_count,
        partial = outcome.partial.len(),
        ignored = outcome.ignored.len(),
        "scanned result store"
    );
    Ok(outcome)
}

fn recognize(path: &Path) -> Option<ScenarioKey> {
    if path.extension()?.to_str()? != ARTIFACT_EXTENSION || !path.is_file() {
        return None;
    }
    ScenarioKey::parse_canonical(path.file_stem()?.to_str()?)
}
