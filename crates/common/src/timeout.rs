//! Device-aware timeout scaling
//!
//! Every operation timeout in the harness goes through [`TimeoutScaler`] so
//! that slower model variants get proportionally longer waits. Structural
//! render polls (table waits) do NOT use this; their intervals are fixed.

use std::time::Duration;

use crate::capability::CapabilityRegistry;
use crate::error::Result;

/// Pure multiplier over the registry. No side effects; the only failure mode
/// is an unknown model propagated from lookup.
#[derive(Debug, Clone, Copy)]
pub struct TimeoutScaler<'a> {
    registry: &'a CapabilityRegistry,
}

impl<'a> TimeoutScaler<'a> {
    pub fn new(registry: &'a CapabilityRegistry) -> Self {
        Self { registry }
    }

    /// Scale a base duration by the model's timeout multiplier.
    pub fn scale(&self, base: Duration, model_id: &str) -> Result<Duration> {
        let record = self.registry.lookup(model_id)?;
        Ok(base.mul_f64(record.timeout_multiplier))
    }

    /// Millisecond convenience wrapper for call sites that carry raw ms.
    pub fn scale_ms(&self, base_ms: u64, model_id: &str) -> Result<u64> {
        self.scale(Duration::from_millis(base_ms), model_id)
            .map(|d| d.as_millis() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::CapabilityRegistry;
    use crate::error::Error;

    #[test]
    fn scales_by_registered_multiplier_for_all_models() {
        let registry = CapabilityRegistry::builtin();
        let scaler = TimeoutScaler::new(&registry);
        let base = Duration::from_millis(4000);

        for model in registry.models() {
            let record = registry.lookup(model).unwrap();
            let scaled = scaler.scale(base, model).unwrap();
            assert_eq!(scaled, base.mul_f64(record.timeout_multiplier));
        }
    }

    #[test]
    fn slow_variant_doubles() {
        let registry = CapabilityRegistry::builtin();
        let scaler = TimeoutScaler::new(&registry);

        let ms = scaler.scale_ms(5000, "KRONOS-3R-HVXX-TCXO-44A").unwrap();
        assert_eq!(ms, 10_000);

        let ms = scaler.scale_ms(5000, "KRONOS-2R-HVXX-A2F").unwrap();
        assert_eq!(ms, 5000);
    }

    #[test]
    fn unknown_model_propagates() {
        let registry = CapabilityRegistry::builtin();
        let scaler = TimeoutScaler::new(&registry);

        let err = scaler.scale(Duration::from_secs(1), "XYZ-000").unwrap_err();
        assert_eq!(err, Error::UnknownModel("XYZ-000".to_string()));
    }
}
