pub mod aggregator;
pub mod artifact;
pub mod export;
pub mod stats;
pub mod store;

pub use aggregator::{ResultTable, ScanOutcome, scan};
pub use artifact::{ParsedRecord, parse_artifact, render_artifact};
pub use export::{render_csv, render_markdown, write_csv, write_json, write_markdown};
pub use stats::{DerivedSummary, DerivedValue, UndefinedReason, summarize};
pub use store::{ResultStore, StoreError};
