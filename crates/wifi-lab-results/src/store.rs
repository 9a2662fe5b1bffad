use crate::artifact::{ParsedRecord, parse_artifact, render_artifact};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tracing::debug;
use wifi_lab_abstract::{ResultRecord, ScenarioKey};

pub const ARTIFACT_EXTENSION: &str = "txt";

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to {action} {}: {source}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl StoreError {
    fn io(action: &'static str, path: &Path, source: io::Error) -> Self {
        StoreError::Io {
            action,
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Directory holding one artifact per scenario, named by the canonical key.
///
/// Distinct keys map to distinct files, so writers of different scenarios
/// never contend. Writes land in a hidden temporary file that is renamed over
/// the target, replacing the whole record at once.
#[derive(Debug, Clone)]
pub struct ResultStore {
    root: PathBuf,
}

impl ResultStore {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| StoreError::io("create", &root, e))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, key: &ScenarioKey) -> PathBuf {
        self.root.join(format!("{}.{ARTIFACT_EXTENSION}", key.canonical_name()))
    }

    /// Replaces the stored record for `record.key`.
    pub fn write(&self, record: &ResultRecord) -> Result<PathBuf, StoreError> {
        let target = self.path_for(&record.key);
        let temp = self.root.join(format!(
            ".{}.{}.{}.tmp",
            record.key.canonical_name(),
            std::process::id(),
            TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));

        fs::write(&temp, render_artifact(record)).map_err(|e| StoreError::io("write", &temp, e))?;
        if let Err(e) = fs::rename(&temp, &target) {
            let _ = fs::remove_file(&temp);
            return Err(StoreError::io("replace", &target, e));
        }
        debug!(path = %target.display(), "stored result");
        Ok(target)
    }

    /// `Ok(None)` when the scenario has never been stored.
    pub fn read(&self, key: &ScenarioKey) -> Result<Option<ParsedRecord>, StoreError> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(text) => Ok(Some(parse_artifact(*key, &text))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::io("read", &path, e)),
        }
    }

    pub fn contains(&self, key: &ScenarioKey) -> bool {
        self.path_for(key).is_file()
    }
}
