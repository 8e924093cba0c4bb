//! Capability-driven test-matrix generation
//!
//! Expands "every output × every supported signal" (and the analogous
//! "every PTP interface") into concrete units, so one test body covers all
//! model variants without per-model duplication. Generation is deterministic:
//! ascending entity index, then dropdown order of options, so repeated runs
//! are diffable.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::capability::CapabilityRecord;

/// One concrete (entity, option) combination to exercise.
///
/// Created at run start, consumed exactly once by the aggregator, discarded
/// after the result is recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestUnit {
    /// The configurable entity: an output index ("3") or an interface ("eth1").
    pub entity: String,

    /// The option to apply: a signal type ("PPS") or a feature ("ptp").
    pub option: String,

    /// Model the unit was generated for.
    pub device_model: String,
}

impl TestUnit {
    /// Stable human-readable name used in logs and failure reasons.
    pub fn label(&self) -> String {
        format!("{}_{}_{}", self.device_model, self.entity, self.option)
    }
}

/// One unit per (output, signal) pair the record supports.
///
/// `max_outputs == 0` or an output with no signal types yields no units for
/// it; that is a clean skip for the caller, not an error.
pub fn generate_output_matrix(record: &CapabilityRecord) -> Vec<TestUnit> {
    let mut units = Vec::new();

    for output in 1..=record.max_outputs {
        for signal in record.signals_for(output) {
            units.push(TestUnit {
                entity: output.to_string(),
                option: signal.clone(),
                device_model: record.model_id.clone(),
            });
        }
    }

    debug!(
        "Generated {} output/signal units for {}",
        units.len(),
        record.model_id
    );
    units
}

/// One unit per PTP-capable interface. Empty on models without PTP.
pub fn generate_ptp_matrix(record: &CapabilityRecord) -> Vec<TestUnit> {
    record
        .ptp_interfaces
        .iter()
        .map(|iface| TestUnit {
            entity: iface.clone(),
            option: "ptp".to_string(),
            device_model: record.model_id.clone(),
        })
        .collect()
}
