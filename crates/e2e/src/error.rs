//! Error types for the verification harness
//!
//! Only two conditions bubble up as hard failures: an unresolvable device
//! model and a run in which every unit failed. Everything else degrades to a
//! logged warning plus a recorded outcome so a partially-functional device
//! keeps producing signal.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum E2eError {
    /// Unknown or unresolvable device model. Fatal; never retried.
    #[error(transparent)]
    Capability(#[from] kronos_common::Error),

    /// The expected number of structural elements never rendered within
    /// bounded retries. Non-fatal by default; the caller decides severity.
    #[error("structural timeout: expected {expected} {what}, saw {actual} after {attempts} attempts")]
    StructuralTimeout {
        what: String,
        expected: usize,
        actual: usize,
        attempts: u32,
    },

    /// No extraction tier produced validated data for a field the device's
    /// capability record guarantees.
    #[error("no extraction strategy yielded data for required field '{0}'")]
    ExtractionEmpty(String),

    /// Every unit in the run failed. Hard failure carrying all reasons.
    #[error("all {count} test units failed:\n{reasons}")]
    AllUnitsFailed { count: usize, reasons: String },

    #[error("device unreachable at {url} after {attempts} attempts")]
    DeviceUnreachable { url: String, attempts: usize },

    #[error("Playwright not found. Install with: npx playwright install")]
    PlaywrightNotFound,

    #[error("driver error: {0}")]
    Driver(String),

    #[error("snapshot parse error: {0}")]
    SnapshotParse(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type E2eResult<T> = Result<T, E2eError>;

impl E2eError {
    /// True for the fatal conditions that must stop the session.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            E2eError::Capability(kronos_common::Error::UnknownModel(_))
                | E2eError::AllUnitsFailed { .. }
        )
    }
}
