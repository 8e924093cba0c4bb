//! Device model resolution
//!
//! Everything downstream (timeout scaling, matrix generation, section
//! expectations) keys off the resolved model identifier, so resolution runs
//! once per session, is cached, and fails fast. Repeated resolution failure
//! means the UI structure changed; no amount of polling fixes that.

use tracing::{debug, info, warn};

use kronos_common::{CapabilityRegistry, Error as CapabilityError};

use crate::error::{E2eError, E2eResult};
use crate::extract::FieldSpec;
use crate::snapshot::PageSnapshot;

/// Product name every device page title carries.
pub const PRODUCT_NAME: &str = "Kronos";

#[derive(Debug, Default)]
pub struct ModelResolver {
    resolved: Option<String>,
}

impl ModelResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached model id, if a previous resolve succeeded.
    pub fn cached(&self) -> Option<&str> {
        self.resolved.as_deref()
    }

    /// Resolve the device model from a dashboard snapshot.
    ///
    /// Order: the "Model Number" row of the device-info table, then a scan of
    /// every table cell for a registered id, then the page-title series
    /// marker (accepted only when it names the series of exactly one
    /// registered model). Unresolvable pages are fatal.
    pub fn resolve(
        &mut self,
        snapshot: &PageSnapshot,
        registry: &CapabilityRegistry,
    ) -> E2eResult<String> {
        if let Some(model) = &self.resolved {
            return Ok(model.clone());
        }

        let model = self.resolve_uncached(snapshot, registry)?;
        info!("Resolved device model: {}", model);
        self.resolved = Some(model.clone());
        Ok(model)
    }

    fn resolve_uncached(
        &self,
        snapshot: &PageSnapshot,
        registry: &CapabilityRegistry,
    ) -> E2eResult<String> {
        let field = FieldSpec::hardware_model();

        // Tier 1: the designated device-info row.
        if let Some(raw) = snapshot.field_from_table(field.table_index, field.labels) {
            let candidate = raw.trim();
            if registry.contains(candidate) {
                return Ok(candidate.to_string());
            }
            warn!(
                "Device-info table reports unregistered model '{}', trying fallbacks",
                candidate
            );
        } else {
            debug!("Device-info table has no model row, trying fallbacks");
        }

        // Tier 2: a registered id anywhere in the tables (some firmware
        // builds move the row or merge cells).
        for model in registry.models() {
            let hit = snapshot
                .tables
                .iter()
                .flatten()
                .flatten()
                .any(|cell| cell.contains(model));
            if hit {
                debug!("Found registered model '{}' by table scan", model);
                return Ok(model.to_string());
            }
        }

        // Tier 3: page-title series marker, cross-checked against the
        // registry. Only unambiguous when a single model has that series.
        if snapshot.title.contains(PRODUCT_NAME) {
            for series in [kronos_common::Series::Two, kronos_common::Series::Three] {
                if !snapshot.title.contains(series.title_marker()) {
                    continue;
                }
                let candidates = registry.models_in_series(series);
                match candidates.as_slice() {
                    [only] => {
                        debug!(
                            "Resolved '{}' from title series marker '{}'",
                            only.model_id,
                            series.title_marker()
                        );
                        return Ok(only.model_id.clone());
                    }
                    _ => {
                        warn!(
                            "Title marker '{}' matches {} registered models, unresolvable",
                            series.title_marker(),
                            candidates.len()
                        );
                    }
                }
            }
        }

        Err(E2eError::Capability(CapabilityError::UnknownModel(format!(
            "unresolved from page (title: '{}')",
            snapshot.title
        ))))
    }
}
