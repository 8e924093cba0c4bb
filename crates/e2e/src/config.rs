//! Harness configuration
//!
//! Loaded from a YAML file (device address, browser, retry knobs) so one
//! binary drives any bench device. All durations here are BASE values; the
//! runner scales operation timeouts by the resolved model's multiplier.
//! Structural poll intervals are exempt from scaling.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{E2eError, E2eResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// Device management UI base URL, e.g. "https://192.168.1.50".
    pub base_url: String,

    /// Skip resolution and force a model id. Test benches only.
    #[serde(default)]
    pub model_override: Option<String>,

    #[serde(default = "default_browser")]
    pub browser: String,

    #[serde(default = "default_true")]
    pub headless: bool,

    /// Output directory for run reports.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Structural table polling.
    #[serde(default)]
    pub table_wait: PollConfig,

    /// Extraction snapshot retries.
    #[serde(default)]
    pub extraction_retry: PollConfig,

    /// Base settle time after a form action, before scaling (ms).
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,

    /// Device reachability probing.
    #[serde(default)]
    pub probe: ProbeConfig,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PollConfig {
    pub attempts: u32,
    pub interval_ms: u64,
}

impl PollConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            attempts: 5,
            interval_ms: 3000,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ProbeConfig {
    pub attempts: usize,
    pub interval_ms: u64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            attempts: 10,
            interval_ms: 2000,
        }
    }
}

fn default_browser() -> String {
    "chromium".to_string()
}

fn default_true() -> bool {
    true
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("test-results")
}

fn default_settle_ms() -> u64 {
    1000
}

impl HarnessConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            model_override: None,
            browser: default_browser(),
            headless: true,
            output_dir: default_output_dir(),
            table_wait: PollConfig::default(),
            extraction_retry: PollConfig::default(),
            settle_ms: default_settle_ms(),
            probe: ProbeConfig::default(),
        }
    }

    pub fn from_yaml(yaml: &str) -> E2eResult<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> E2eResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    fn validate(&self) -> E2eResult<()> {
        if self.base_url.is_empty() {
            return Err(E2eError::Config("base_url must not be empty".to_string()));
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(E2eError::Config(format!(
                "base_url must be http(s), got '{}'",
                self.base_url
            )));
        }
        Ok(())
    }
}
