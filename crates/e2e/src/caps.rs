//! Capability trait interfaces
//!
//! Feature availability is expressed as trait implementations checked at the
//! call site, instead of reflective probing of page objects. A consumer that
//! needs performance validation takes `&impl SupportsPerformanceValidation`;
//! types without the capability simply never satisfy the bound.

use std::time::Duration;

use kronos_common::{CapabilityRecord, PerformanceBaseline};

/// Implemented by anything that carries timing baselines for named
/// operations.
pub trait SupportsPerformanceValidation {
    fn baseline_for(&self, operation: &str) -> Option<PerformanceBaseline>;

    /// Whether an observed duration stays within the worst case for the
    /// operation. `None` when no baseline exists for it.
    fn within_worst_case(&self, operation: &str, observed: Duration) -> Option<bool> {
        self.baseline_for(operation)
            .map(|b| observed <= b.worst_case)
    }
}

impl SupportsPerformanceValidation for CapabilityRecord {
    fn baseline_for(&self, operation: &str) -> Option<PerformanceBaseline> {
        self.baseline(operation).copied()
    }
}
