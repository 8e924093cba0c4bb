//! Session orchestration
//!
//! One [`Harness`] run is one device session: probe reachability, wait for
//! the dashboard structure, resolve the model, then drive the
//! capability-derived verification suites and write a JSON report. All
//! operation timeouts are scaled by the resolved model's multiplier;
//! structural poll intervals are not.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use kronos_common::{
    generate_output_matrix, generate_ptp_matrix, CapabilityRecord, CapabilityRegistry, TestUnit,
    TimeoutScaler,
};

use crate::aggregator::{Classification, ExecutionAggregator, RunOutcome};
use crate::caps::SupportsPerformanceValidation;
use crate::config::HarnessConfig;
use crate::device::DeviceProbe;
use crate::error::{E2eError, E2eResult};
use crate::extract::{require_present, AdaptiveExtractor, FieldSpec};
use crate::playwright::{Browser, PlaywrightDriver, UiAction};
use crate::resolver::ModelResolver;
use crate::snapshot::{PageSnapshot, DASHBOARD_TABLE_COUNT, SATELLITE_TABLE};
use crate::waiter::TableWaiter;

/// Dashboard tables required for any extraction at all. Fewer than this and
/// the session cannot proceed; exactly this many is a degraded-but-usable
/// render.
const MIN_DASHBOARD_TABLES: usize = 3;

/// Status fields extracted from the dashboard, keyed by field name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusReport {
    pub fields: BTreeMap<String, String>,
    pub satellite_rows: usize,
    pub login_within_baseline: Option<bool>,
}

/// Full record of one harness session, serialized to the output directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub device_model: String,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub dashboard_tables: usize,
    pub degraded_dashboard: bool,
    pub http_redirect_ok: Option<bool>,
    pub status: StatusReport,
    pub outputs: RunOutcome,
    pub outputs_classification: Classification,
    pub ptp: RunOutcome,
    pub ptp_classification: Classification,
}

pub struct Harness {
    config: HarnessConfig,
    registry: CapabilityRegistry,
    driver: PlaywrightDriver,
    resolver: ModelResolver,
    extractor: AdaptiveExtractor,
    waiter: TableWaiter,
}

impl Harness {
    pub fn new(config: HarnessConfig) -> E2eResult<Self> {
        let browser = Browser::parse(&config.browser)?;
        let driver = PlaywrightDriver::new(config.base_url.clone(), browser, config.headless)?;

        let extractor = AdaptiveExtractor::new(
            config.extraction_retry.attempts,
            config.extraction_retry.interval(),
        );
        let waiter = TableWaiter::new(config.table_wait.attempts, config.table_wait.interval());

        Ok(Self {
            config,
            registry: CapabilityRegistry::builtin(),
            driver,
            resolver: ModelResolver::new(),
            extractor,
            waiter,
        })
    }

    pub fn with_registry(mut self, registry: CapabilityRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Run the full verification session and write the report.
    pub async fn run(&mut self) -> E2eResult<RunReport> {
        let started_at = Utc::now();
        let start = Instant::now();

        let probe = DeviceProbe::new(self.config.base_url.clone()).with_attempts(
            self.config.probe.attempts,
            Duration::from_millis(self.config.probe.interval_ms),
        );
        probe.wait_until_reachable().await?;

        let (dashboard, table_count) = self.wait_for_dashboard().await?;
        let degraded = table_count < DASHBOARD_TABLE_COUNT;
        if degraded {
            warn!(
                "Dashboard rendered {} of {} tables; continuing degraded",
                table_count, DASHBOARD_TABLE_COUNT
            );
        }

        let model = self.resolve_model(&dashboard)?;
        let record = self.registry.lookup(&model)?.clone();

        let scaler = TimeoutScaler::new(&self.registry);
        let settle = scaler.scale(self.config.settle(), &model)?;
        info!(
            "Session for {} (settle {} ms, multiplier {})",
            model,
            settle.as_millis(),
            record.timeout_multiplier
        );

        let http_redirect_ok = self.check_http_redirect(&probe, &record).await;

        let status = self.run_status_suite(&record, start.elapsed()).await?;

        let outputs = self.run_output_suite(&record, settle).await?;
        let outputs_classification = outputs.classification();

        let ptp = self.run_ptp_suite(&record, settle).await?;
        let ptp_classification = ptp.classification();

        let report = RunReport {
            device_model: model,
            started_at,
            duration_ms: start.elapsed().as_millis() as u64,
            dashboard_tables: table_count,
            degraded_dashboard: degraded,
            http_redirect_ok,
            status,
            outputs,
            outputs_classification,
            ptp,
            ptp_classification,
        };

        let path = self.write_report(&report)?;
        info!("Report written to: {}", path.display());
        Ok(report)
    }

    /// Poll the dashboard until the expected table structure renders.
    ///
    /// Returns the last captured snapshot with its table count. Fewer than
    /// [`MIN_DASHBOARD_TABLES`] is fatal; a missing satellite table only
    /// degrades the session.
    async fn wait_for_dashboard(&self) -> E2eResult<(PageSnapshot, usize)> {
        let driver = &self.driver;
        let latest: Mutex<Option<PageSnapshot>> = Mutex::new(None);
        let slot = &latest;

        let count = self
            .waiter
            .await_count(
                move || async move {
                    match driver.snapshot("/").await {
                        Ok(snapshot) => {
                            let n = snapshot.table_count();
                            *slot.lock().unwrap() = Some(snapshot);
                            n
                        }
                        Err(e) => {
                            warn!("Dashboard capture failed: {}", e);
                            0
                        }
                    }
                },
                DASHBOARD_TABLE_COUNT,
            )
            .await;

        if count < MIN_DASHBOARD_TABLES {
            return Err(E2eError::StructuralTimeout {
                what: "dashboard tables".to_string(),
                expected: DASHBOARD_TABLE_COUNT,
                actual: count,
                attempts: self.config.table_wait.attempts,
            });
        }

        let snapshot = latest.into_inner().unwrap_or(None).unwrap_or_default();
        Ok((snapshot, count))
    }

    fn resolve_model(&mut self, dashboard: &PageSnapshot) -> E2eResult<String> {
        if let Some(forced) = &self.config.model_override {
            // Overrides still go through the registry so an unknown id fails
            // the same way resolution would.
            self.registry.lookup(forced)?;
            info!("Model override in effect: {}", forced);
            return Ok(forced.clone());
        }

        self.resolver.resolve(dashboard, &self.registry)
    }

    /// Compare observed HTTP behavior against the record's declaration.
    /// Mismatch is a warning; the check itself failing is ignorable noise.
    async fn check_http_redirect(
        &self,
        probe: &DeviceProbe,
        record: &CapabilityRecord,
    ) -> Option<bool> {
        match probe.detects_https_redirect().await {
            Ok(observed) => {
                if observed != record.http_redirect {
                    warn!(
                        "HTTP redirect mismatch for {}: declared {}, observed {}",
                        record.model_id, record.http_redirect, observed
                    );
                }
                Some(observed == record.http_redirect)
            }
            Err(e) => {
                warn!("HTTP redirect probe failed: {}", e);
                None
            }
        }
    }

    /// Extract dashboard status with retry. GNSS state is guaranteed by
    /// every capability record; the rest are optional.
    async fn run_status_suite(
        &self,
        record: &CapabilityRecord,
        elapsed_to_dashboard: Duration,
    ) -> E2eResult<StatusReport> {
        let driver = &self.driver;
        let capture = move || async move { driver.snapshot("/").await };

        let gnss = self
            .extractor
            .extract_with_retry(&FieldSpec::gnss_state(), capture)
            .await?;
        let gnss = require_present(gnss, &FieldSpec::gnss_state())?;

        let snapshot = driver.snapshot("/").await?;
        let mut fields = self.extractor.extract_fields(
            &snapshot,
            &[
                FieldSpec::satellite_count(),
                FieldSpec::utc_time(),
                FieldSpec::time_source(),
                FieldSpec::identifier(),
                FieldSpec::location(),
                FieldSpec::contact(),
            ],
        );
        if let Some(value) = gnss.value() {
            fields.insert("gnss_state".to_string(), value.to_string());
        }

        let satellite_rows = self
            .extractor
            .extract_rows(&snapshot, SATELLITE_TABLE)
            .rows()
            .map(|r| r.len())
            .unwrap_or(0);

        let login_within_baseline =
            record.within_worst_case("status_login", elapsed_to_dashboard);
        if login_within_baseline == Some(false) {
            warn!(
                "Dashboard took {} ms, over the {} worst case",
                elapsed_to_dashboard.as_millis(),
                record.model_id
            );
        }

        Ok(StatusReport {
            fields,
            satellite_rows,
            login_within_baseline,
        })
    }

    /// Exercise every (output, signal) unit the record supports.
    async fn run_output_suite(
        &self,
        record: &CapabilityRecord,
        settle: Duration,
    ) -> E2eResult<RunOutcome> {
        let units = generate_output_matrix(record);
        if units.is_empty() {
            info!("No configurable outputs on {}; skipping", record.model_id);
            return Ok(RunOutcome::default());
        }

        let driver = &self.driver;
        ExecutionAggregator
            .run(units, move |unit| async move {
                verify_output_unit(driver, record, &unit, settle).await
            })
            .await
    }

    /// Verify the PTP page lists every PTP-capable interface.
    async fn run_ptp_suite(
        &self,
        record: &CapabilityRecord,
        settle: Duration,
    ) -> E2eResult<RunOutcome> {
        let units = generate_ptp_matrix(record);
        if units.is_empty() {
            return Ok(RunOutcome::default());
        }
        if !record.has_section("ptp") {
            warn!(
                "{} lists PTP interfaces but no ptp section; skipping",
                record.model_id
            );
            return Ok(RunOutcome::default());
        }

        let driver = &self.driver;
        ExecutionAggregator
            .run(units, move |unit| async move {
                let snapshot = driver
                    .run(&[
                        UiAction::Goto("/ptp".to_string()),
                        UiAction::Settle(settle),
                    ])
                    .await?;

                let mentioned = snapshot
                    .tables
                    .iter()
                    .flatten()
                    .flatten()
                    .chain(snapshot.texts.iter())
                    .any(|text| text.contains(&unit.entity));
                if !mentioned {
                    return Err(E2eError::Driver(format!(
                        "PTP page does not mention interface {}",
                        unit.entity
                    )));
                }
                Ok(())
            })
            .await
    }

    fn write_report(&self, report: &RunReport) -> E2eResult<PathBuf> {
        std::fs::create_dir_all(&self.config.output_dir)?;
        let path = self.config.output_dir.join("run-report.json");
        let json = serde_json::to_string_pretty(report)?;
        std::fs::write(&path, json)?;
        Ok(path)
    }
}

/// Apply one output/signal combination and verify the UI reflects it.
///
/// Selects `signal{N}`, waits out the scaled settle, then checks the select
/// took the value and that exactly the expected time-reference radios for
/// that signal are visible.
async fn verify_output_unit(
    driver: &PlaywrightDriver,
    record: &CapabilityRecord,
    unit: &TestUnit,
    settle: Duration,
) -> E2eResult<()> {
    let select_name = format!("signal{}", unit.entity);

    let snapshot = driver
        .run(&[
            UiAction::Goto("/config".to_string()),
            UiAction::Select {
                name: select_name.clone(),
                value: unit.option.clone(),
            },
            UiAction::Settle(settle),
        ])
        .await?;

    let control = snapshot
        .control(&select_name)
        .ok_or_else(|| E2eError::Driver(format!("control '{}' not found", select_name)))?;
    if control.value.as_deref() != Some(unit.option.as_str()) {
        return Err(E2eError::Driver(format!(
            "select '{}' holds {:?} after choosing '{}'",
            select_name, control.value, unit.option
        )));
    }

    let expected_refs = record.expected_time_refs(&unit.option);
    for time_ref in ["UTC", "LOCAL"] {
        let key = format!("time{}={}", unit.entity, time_ref);
        let expected = expected_refs.contains(&time_ref);
        let visible = snapshot.control_visible(&key);
        if expected != visible {
            return Err(E2eError::Driver(format!(
                "time reference '{}' visibility is {} for signal '{}', expected {}",
                key, visible, unit.option, expected
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::ControlState;

    fn configured_snapshot(signal: &str, refs: &[&str]) -> PageSnapshot {
        let mut snapshot = PageSnapshot::new("Kronos Series 3 Configuration");
        snapshot.set_control(
            "signal3",
            ControlState {
                value: Some(signal.to_string()),
                visible: true,
            },
        );
        for time_ref in refs {
            snapshot.set_control(
                format!("time3={time_ref}"),
                ControlState {
                    value: None,
                    visible: true,
                },
            );
        }
        snapshot
    }

    #[test]
    fn min_table_threshold_leaves_room_for_degraded_renders() {
        assert!(MIN_DASHBOARD_TABLES < DASHBOARD_TABLE_COUNT);
    }

    #[test]
    fn pps_expects_local_only_radio() {
        // The verification rule the executor applies, checked against the
        // snapshot shape the driver produces.
        let registry = CapabilityRegistry::builtin();
        let record = registry.lookup("KRONOS-3R-HVLV-TCXO-A2F").unwrap();

        let snapshot = configured_snapshot("PPS", &["LOCAL"]);
        let refs = record.expected_time_refs("PPS");
        for time_ref in ["UTC", "LOCAL"] {
            let visible = snapshot.control_visible(&format!("time3={time_ref}"));
            assert_eq!(visible, refs.contains(&time_ref), "{time_ref}");
        }

        // A UTC radio showing up for PPS is the mismatch the executor flags.
        let wrong = configured_snapshot("PPS", &["UTC", "LOCAL"]);
        assert!(wrong.control_visible("time3=UTC"));
        assert!(!refs.contains(&"UTC"));
    }

    #[test]
    fn report_serializes_round_trip() {
        let report = RunReport {
            device_model: "KRONOS-2R-HVXX-A2F".to_string(),
            started_at: Utc::now(),
            duration_ms: 1234,
            dashboard_tables: 4,
            degraded_dashboard: false,
            http_redirect_ok: Some(true),
            status: StatusReport {
                fields: BTreeMap::from([("gnss_state".to_string(), "LOCKED".to_string())]),
                satellite_rows: 9,
                login_within_baseline: Some(true),
            },
            outputs: RunOutcome::default(),
            outputs_classification: Classification::CleanPass,
            ptp: RunOutcome::default(),
            ptp_classification: Classification::CleanPass,
        };

        let json = serde_json::to_string(&report).unwrap();
        let parsed: RunReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.device_model, report.device_model);
        assert_eq!(parsed.status.satellite_rows, 9);
    }
}
