//! Device capability records and the registry that owns them
//!
//! Every Kronos model variant the harness knows about is described by one
//! [`CapabilityRecord`]: hardware series, output/signal layout, network and
//! PTP interface lists, available configuration sections, and the timing
//! behavior observed during device exploration. The registry is built once
//! at startup and injected by reference everywhere; nothing mutates it after
//! construction.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Hardware generation. Determines page layout and feature set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Series {
    #[serde(rename = "2")]
    Two,
    #[serde(rename = "3")]
    Three,
}

impl Series {
    /// The marker substring the device puts in its page title,
    /// e.g. "Kronos Series 3".
    pub fn title_marker(&self) -> &'static str {
        match self {
            Series::Two => "Series 2",
            Series::Three => "Series 3",
        }
    }

    pub fn as_u8(&self) -> u8 {
        match self {
            Series::Two => 2,
            Series::Three => 3,
        }
    }
}

/// Expected timing for one named operation (status login, config unlock, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerformanceBaseline {
    pub typical: Duration,
    pub worst_case: Duration,
}

impl PerformanceBaseline {
    pub fn new(typical: Duration, worst_case: Duration) -> Self {
        Self { typical, worst_case }
    }
}

/// Everything the harness knows about one device model.
///
/// Immutable once loaded. Invariants (checked by [`CapabilityRecord::validate`]):
/// every PTP interface appears in `network_interfaces`, every output index in
/// `output_signal_map` lies in `1..=max_outputs`, and the timeout multiplier
/// is positive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilityRecord {
    /// Unique hardware model string, e.g. "KRONOS-3R-HVLV-TCXO-A2F".
    pub model_id: String,

    pub series: Series,

    /// Multiplier applied to every operation timeout on this model.
    /// Slower variants (recorded unlock/navigation timeouts) carry 2.0,
    /// PTP/multi-interface variants 1.5, the rest 1.0.
    pub timeout_multiplier: f64,

    pub session_timeout_minutes: u32,

    /// Configuration sections the web UI exposes ("snmp", "ptp", ...).
    pub available_sections: BTreeSet<String>,

    /// Number of physical signal outputs.
    pub max_outputs: u8,

    /// Signal types selectable per output, keyed by 1-based output index.
    /// Option order matches the device's dropdown order.
    pub output_signal_map: BTreeMap<u8, Vec<String>>,

    /// All network interfaces, in the order the network page lists them.
    pub network_interfaces: Vec<String>,

    /// Interfaces with a PTP panel. Always a subset of `network_interfaces`.
    pub ptp_interfaces: BTreeSet<String>,

    pub gnss_constellations: BTreeSet<String>,

    /// Whether the device force-redirects HTTP to HTTPS.
    pub http_redirect: bool,

    /// Expected timing per operation name.
    pub performance_baselines: BTreeMap<String, PerformanceBaseline>,
}

impl CapabilityRecord {
    /// Signal types available on one output. Empty for out-of-range indices.
    pub fn signals_for(&self, output: u8) -> &[String] {
        self.output_signal_map
            .get(&output)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn supports_ptp(&self) -> bool {
        !self.ptp_interfaces.is_empty()
    }

    pub fn has_section(&self, section: &str) -> bool {
        self.available_sections.contains(section)
    }

    /// Time-reference radios expected to be visible for a signal type.
    ///
    /// Observed rule: IRIG-B codes and OFF show both UTC and LOCAL,
    /// PPS/PPM show only LOCAL.
    pub fn expected_time_refs(&self, signal: &str) -> &'static [&'static str] {
        match signal {
            "PPS" | "PPM" => &["LOCAL"],
            _ => &["UTC", "LOCAL"],
        }
    }

    pub fn baseline(&self, operation: &str) -> Option<&PerformanceBaseline> {
        self.performance_baselines.get(operation)
    }

    /// Check record invariants.
    pub fn validate(&self) -> Result<()> {
        if self.timeout_multiplier <= 0.0 {
            return Err(Error::InvalidRecord {
                model: self.model_id.clone(),
                reason: format!("non-positive timeout multiplier {}", self.timeout_multiplier),
            });
        }

        for iface in &self.ptp_interfaces {
            if !self.network_interfaces.contains(iface) {
                return Err(Error::InvalidRecord {
                    model: self.model_id.clone(),
                    reason: format!("ptp interface {iface} not in network interface list"),
                });
            }
        }

        for output in self.output_signal_map.keys() {
            if *output == 0 || *output > self.max_outputs {
                return Err(Error::InvalidRecord {
                    model: self.model_id.clone(),
                    reason: format!(
                        "output index {output} outside 1..={}",
                        self.max_outputs
                    ),
                });
            }
        }

        Ok(())
    }
}

/// Immutable model-id -> capability database.
///
/// Built once via [`CapabilityRegistry::builtin`] (or from explicit records in
/// tests) and passed by reference to every consumer. Safe to share across
/// sessions without locking.
#[derive(Debug, Clone)]
pub struct CapabilityRegistry {
    records: BTreeMap<String, CapabilityRecord>,
}

impl CapabilityRegistry {
    /// Build a registry from explicit records, validating each.
    pub fn from_records(records: Vec<CapabilityRecord>) -> Result<Self> {
        let mut map = BTreeMap::new();
        for record in records {
            record.validate()?;
            map.insert(record.model_id.clone(), record);
        }
        Ok(Self { records: map })
    }

    /// The fixed catalog of known Kronos models.
    ///
    /// The catalog changes far less often than test runs, so it lives in the
    /// binary rather than external config; adding a model means adding a
    /// record here.
    pub fn builtin() -> Self {
        let records = vec![
            kronos_record(RecordSpec {
                model_id: "KRONOS-2R-HVXX-A2F",
                series: Series::Two,
                timeout_multiplier: 1.0,
                max_outputs: 4,
                network_interfaces: &["eth0"],
                ptp_interfaces: &[],
                http_redirect: false,
            }),
            kronos_record(RecordSpec {
                model_id: "KRONOS-2P-HV-2",
                series: Series::Two,
                timeout_multiplier: 1.0,
                max_outputs: 4,
                network_interfaces: &["eth0"],
                ptp_interfaces: &[],
                http_redirect: true,
            }),
            kronos_record(RecordSpec {
                model_id: "KRONOS-3R-HVLV-TCXO-A2F",
                series: Series::Three,
                timeout_multiplier: 1.5,
                max_outputs: 6,
                network_interfaces: &["eth0", "eth1", "eth2", "eth3"],
                ptp_interfaces: &["eth1", "eth2", "eth3"],
                http_redirect: false,
            }),
            kronos_record(RecordSpec {
                model_id: "KRONOS-3R-HVXX-TCXO-44A",
                series: Series::Three,
                timeout_multiplier: 2.0,
                max_outputs: 6,
                network_interfaces: &["eth0", "eth1", "eth3"],
                ptp_interfaces: &["eth1", "eth3"],
                http_redirect: false,
            }),
            kronos_record(RecordSpec {
                model_id: "KRONOS-3R-HVXX-TCXO-A2X",
                series: Series::Three,
                timeout_multiplier: 2.0,
                max_outputs: 6,
                network_interfaces: &["eth0", "eth1", "eth2", "eth3", "eth4"],
                ptp_interfaces: &["eth1", "eth3"],
                http_redirect: false,
            }),
        ];

        // Builtin data is validated by tests; from_records cannot fail here.
        Self::from_records(records).unwrap_or_else(|e| {
            unreachable!("builtin capability catalog failed validation: {e}")
        })
    }

    /// Look up a model. Fails with [`Error::UnknownModel`] if absent.
    pub fn lookup(&self, model_id: &str) -> Result<&CapabilityRecord> {
        self.records
            .get(model_id)
            .ok_or_else(|| Error::UnknownModel(model_id.to_string()))
    }

    pub fn contains(&self, model_id: &str) -> bool {
        self.records.contains_key(model_id)
    }

    /// All registered model identifiers, sorted.
    pub fn models(&self) -> Vec<&str> {
        self.records.keys().map(String::as_str).collect()
    }

    /// Records belonging to one hardware series.
    pub fn models_in_series(&self, series: Series) -> Vec<&CapabilityRecord> {
        self.records
            .values()
            .filter(|r| r.series == series)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

struct RecordSpec {
    model_id: &'static str,
    series: Series,
    timeout_multiplier: f64,
    max_outputs: u8,
    network_interfaces: &'static [&'static str],
    ptp_interfaces: &'static [&'static str],
    http_redirect: bool,
}

/// Signal sets shared by the whole product line: outputs 1-2 carry the
/// modulated IRIG-B12x codes, outputs 3 and up the unmodulated IRIG-B00x
/// codes plus pulse rates.
fn signal_map(max_outputs: u8) -> BTreeMap<u8, Vec<String>> {
    let low_band = ["OFF", "IRIG-B120", "IRIG-B122", "IRIG-B124", "IRIG-B126"];
    let high_band = [
        "OFF", "IRIG-B000", "IRIG-B002", "IRIG-B004", "IRIG-B006", "PPS", "PPM",
    ];

    (1..=max_outputs)
        .map(|output| {
            let signals: &[&str] = if output <= 2 { &low_band } else { &high_band };
            (output, signals.iter().map(|s| s.to_string()).collect())
        })
        .collect()
}

fn standard_sections(series: Series) -> BTreeSet<String> {
    let mut sections: BTreeSet<String> = [
        "general", "network", "time", "gnss", "outputs", "display", "snmp", "syslog",
        "access", "contact",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();

    if series == Series::Three {
        sections.insert("ptp".to_string());
    }

    sections
}

/// Timing expectations common to the product line, from exploration data.
fn standard_baselines() -> BTreeMap<String, PerformanceBaseline> {
    let secs =
        |t: f64, w: f64| PerformanceBaseline::new(Duration::from_secs_f64(t), Duration::from_secs_f64(w));

    [
        ("status_login", secs(2.5, 5.0)),
        ("config_unlock", secs(1.5, 3.0)),
        ("section_navigation", secs(1.5, 3.0)),
        ("satellite_first_cycle", secs(10.0, 30.0)),
        ("satellite_second_cycle", secs(10.0, 30.0)),
    ]
    .into_iter()
    .map(|(name, baseline)| (name.to_string(), baseline))
    .collect()
}

fn kronos_record(spec: RecordSpec) -> CapabilityRecord {
    CapabilityRecord {
        model_id: spec.model_id.to_string(),
        series: spec.series,
        timeout_multiplier: spec.timeout_multiplier,
        session_timeout_minutes: 30,
        available_sections: standard_sections(spec.series),
        max_outputs: spec.max_outputs,
        output_signal_map: signal_map(spec.max_outputs),
        network_interfaces: spec
            .network_interfaces
            .iter()
            .map(|s| s.to_string())
            .collect(),
        ptp_interfaces: spec.ptp_interfaces.iter().map(|s| s.to_string()).collect(),
        gnss_constellations: ["GPS", "Galileo", "GLONASS", "BeiDou"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        http_redirect: spec.http_redirect,
        performance_baselines: standard_baselines(),
    }
}
