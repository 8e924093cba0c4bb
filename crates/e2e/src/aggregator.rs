//! Partial-failure-tolerant unit execution
//!
//! Units run strictly in generation order; the device UI is one state
//! machine and is not safe for concurrent interaction. Each unit's failure is
//! isolated and recorded; one bad output/signal combination on a
//! partially-functional device must not mask results for the rest of the
//! matrix. Only an all-units-failed run escalates to a hard error.

use std::future::Future;

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use kronos_common::TestUnit;

use crate::error::{E2eError, E2eResult};

/// Derived run classification. Not stored; computed from the outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Classification {
    /// No failures (including the zero-unit clean skip).
    CleanPass,
    /// Some units passed, some failed. Reported degraded, not fatal.
    Partial,
    /// Every unit failed.
    AllFailed,
}

/// Collected results of one aggregated run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunOutcome {
    pub passed: Vec<TestUnit>,
    pub failed: Vec<(TestUnit, String)>,
}

impl RunOutcome {
    pub fn classification(&self) -> Classification {
        if self.failed.is_empty() {
            Classification::CleanPass
        } else if self.passed.is_empty() {
            Classification::AllFailed
        } else {
            Classification::Partial
        }
    }

    pub fn total(&self) -> usize {
        self.passed.len() + self.failed.len()
    }

    /// One line per failure, for logs and the all-failed hard error.
    pub fn failure_summary(&self) -> String {
        self.failed
            .iter()
            .map(|(unit, reason)| format!("- {}: {}", unit.label(), reason))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ExecutionAggregator;

impl ExecutionAggregator {
    /// Execute every unit in order, isolating failures.
    ///
    /// Severity policy: all failed -> [`E2eError::AllUnitsFailed`] carrying
    /// every reason; mixed -> warn-level degraded report, `Ok`; no failures
    /// -> `Ok`.
    pub async fn run<F, Fut>(&self, units: Vec<TestUnit>, mut executor: F) -> E2eResult<RunOutcome>
    where
        F: FnMut(TestUnit) -> Fut,
        Fut: Future<Output = E2eResult<()>>,
    {
        let mut outcome = RunOutcome::default();

        for unit in units {
            match executor(unit.clone()).await {
                Ok(()) => {
                    info!("✓ {}", unit.label());
                    outcome.passed.push(unit);
                }
                Err(e) => {
                    error!("✗ {} - {}", unit.label(), e);
                    outcome.failed.push((unit, e.to_string()));
                }
            }
        }

        info!(
            "Unit results: {} passed, {} failed of {}",
            outcome.passed.len(),
            outcome.failed.len(),
            outcome.total()
        );

        match outcome.classification() {
            Classification::AllFailed => Err(E2eError::AllUnitsFailed {
                count: outcome.failed.len(),
                reasons: outcome.failure_summary(),
            }),
            Classification::Partial => {
                warn!(
                    "Degraded run: {} of {} units failed\n{}",
                    outcome.failed.len(),
                    outcome.total(),
                    outcome.failure_summary()
                );
                Ok(outcome)
            }
            Classification::CleanPass => Ok(outcome),
        }
    }
}
