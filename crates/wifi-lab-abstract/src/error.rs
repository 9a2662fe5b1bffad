use serde::Serialize;
use thiserror::Error;

/// A scenario parameter outside its domain. Always fatal.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("unsupported client count {0}; expected one of 1, 2, 4, 8, 16, 32")]
    ClientCount(u32),
    #[error("unknown mobility '{0}'; expected 'static' or 'mobile'")]
    Mobility(String),
    #[error("unknown traffic mix '{0}'; expected 'cbr', 'tcp' or 'mixed'")]
    TrafficMix(String),
    #[error("simulation duration {duration}s must be finite and longer than the {offset}s startup offset")]
    Duration { duration: f64, offset: f64 },
    #[error("scenario grid dimension '{0}' is empty")]
    EmptyGrid(&'static str),
}

/// A problem found while reading a stored result artifact.
///
/// Issues never abort a scan; the affected field is left absent and the
/// record is reported as partial.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParseIssue {
    #[error("field '{field}' is missing")]
    MissingField { field: &'static str },
    #[error("field '{field}' has unreadable value '{raw}'")]
    InvalidNumber { field: &'static str, raw: String },
    #[error("field '{field}' value {value} is outside its domain")]
    OutOfDomain { field: &'static str, value: f64 },
    #[error("packet counts disagree: sent {sent} != received {received} + lost {lost}")]
    InconsistentPackets { sent: u64, received: u64, lost: u64 },
    #[error("artifact could not be read: {reason}")]
    Unreadable { reason: String },
}
