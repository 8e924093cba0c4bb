//! Multi-tier adaptive extraction
//!
//! Reading structured state out of the non-semantic device UI takes layered
//! strategies of decreasing specificity:
//!
//! 1. **Primary**: parse the field's positional table into (label, value)
//!    rows and match recognized labels.
//! 2. **Fallback**: read an id-anchored element specific to the field
//!    (stable on Series 3 pages, absent on some Series 2 layouts).
//! 3. **Pattern**: scan free text for a field keyword next to a
//!    value-shaped token.
//!
//! Every tier's candidate is checked by the field's value-shape validator; an
//! invalid candidate means "tier failed", not "found but wrong", and the
//! chain advances. A fully exhausted chain yields an empty result, which is a
//! legitimate outcome for optionally-absent fields and an error only for
//! fields the capability record guarantees. That call is the caller's.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{E2eError, E2eResult};
use crate::snapshot::PageSnapshot;

/// GNSS receiver states the device reports.
pub const GNSS_STATES: [&str; 6] = [
    "LOCKED",
    "ACQUIRING",
    "SEARCHING",
    "NOTIME",
    "LOWQUALITY",
    "UNKNOWN",
];

/// Active time sources the device can report on the time table.
pub const TIME_SOURCES: [&str; 8] = [
    "GPS", "GNSS", "NTP", "PTP", "PPS", "NETWORK", "LOCAL", "HOLDOVER",
];

/// Which tier produced a result. Diagnostic, not a correctness gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Confidence {
    Primary,
    Fallback,
    Pattern,
}

/// Extracted payload: a single field value, or rows for tabular requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExtractedData {
    Value(String),
    Rows(Vec<Vec<String>>),
}

/// Outcome of one extraction request.
///
/// "Field absent" and "field present but blank" both terminate as an empty
/// result; neither is an error at this layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub data: Option<ExtractedData>,
    pub confidence: Option<Confidence>,
}

impl ExtractionResult {
    pub fn empty() -> Self {
        Self {
            data: None,
            confidence: None,
        }
    }

    fn found(value: String, confidence: Confidence) -> Self {
        Self {
            data: Some(ExtractedData::Value(value)),
            confidence: Some(confidence),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_none()
    }

    pub fn value(&self) -> Option<&str> {
        match &self.data {
            Some(ExtractedData::Value(v)) => Some(v),
            _ => None,
        }
    }

    pub fn rows(&self) -> Option<&[Vec<String>]> {
        match &self.data {
            Some(ExtractedData::Rows(r)) => Some(r),
            _ => None,
        }
    }
}

/// Shape a candidate value must have to count as extracted.
///
/// Validators are deliberately strict: accepting any non-trivial string here
/// would mask extraction bugs behind plausible-looking garbage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueShape {
    /// Exactly one of [`GNSS_STATES`], after trim and uppercase.
    GnssState,
    /// Non-negative integer <= 50, optionally in `used/tracked` form.
    SatelliteCount,
    /// `HH:MM:SS`.
    TimeOfDay,
    /// One of a fixed token set, case-insensitive.
    Token(&'static [&'static str]),
    /// Any non-blank text (free-form identifier/location/contact fields).
    NonEmptyText,
}

impl ValueShape {
    pub fn validate(&self, raw: &str) -> bool {
        let value = raw.trim();
        if value.is_empty() {
            return false;
        }

        match self {
            ValueShape::GnssState => GNSS_STATES.contains(&value.to_uppercase().as_str()),
            ValueShape::SatelliteCount => {
                static RE: OnceLock<Regex> = OnceLock::new();
                let re = RE.get_or_init(|| {
                    Regex::new(r"^(\d{1,2})(?:\s*/\s*(\d{1,2}))?$").expect("static regex")
                });
                match re.captures(value) {
                    Some(caps) => caps
                        .iter()
                        .skip(1)
                        .flatten()
                        .all(|m| m.as_str().parse::<u8>().map(|n| n <= 50).unwrap_or(false)),
                    None => false,
                }
            }
            ValueShape::TimeOfDay => {
                static RE: OnceLock<Regex> = OnceLock::new();
                let re = RE
                    .get_or_init(|| Regex::new(r"^\d{2}:\d{2}:\d{2}$").expect("static regex"));
                re.is_match(value)
            }
            ValueShape::Token(tokens) => tokens.iter().any(|t| t.eq_ignore_ascii_case(value)),
            ValueShape::NonEmptyText => true,
        }
    }
}

/// Per-field extraction plan: where each tier looks and what shape the value
/// must have.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    /// Positional index of the owning table.
    pub table_index: usize,
    /// Recognized row labels for the primary tier.
    pub labels: &'static [&'static str],
    /// Element ids for the fallback tier.
    pub anchors: &'static [&'static str],
    /// Keywords for the pattern tier.
    pub keywords: &'static [&'static str],
    pub shape: ValueShape,
}

impl FieldSpec {
    pub const fn gnss_state() -> Self {
        Self {
            name: "gnss_state",
            table_index: crate::snapshot::GNSS_TABLE,
            labels: &["gnss state", "gnss", "state", "status"],
            anchors: &["gnssState"],
            keywords: &["gnss", "state", "status"],
            shape: ValueShape::GnssState,
        }
    }

    pub const fn satellite_count() -> Self {
        Self {
            name: "satellite_count",
            table_index: crate::snapshot::GNSS_TABLE,
            labels: &["used / tracked", "used", "tracked", "sv"],
            anchors: &["usedVis"],
            keywords: &["satellites", "svs", "tracked"],
            shape: ValueShape::SatelliteCount,
        }
    }

    pub const fn utc_time() -> Self {
        Self {
            name: "utc_time",
            table_index: crate::snapshot::TIME_TABLE,
            labels: &["utc"],
            anchors: &["utcTime"],
            keywords: &["utc"],
            shape: ValueShape::TimeOfDay,
        }
    }

    pub const fn time_source() -> Self {
        Self {
            name: "time_source",
            table_index: crate::snapshot::TIME_TABLE,
            labels: &["time source", "sync source", "source"],
            anchors: &["timeSource"],
            keywords: &["source", "sync"],
            shape: ValueShape::Token(&TIME_SOURCES),
        }
    }

    pub const fn hardware_model() -> Self {
        Self {
            name: "hardware_model",
            table_index: crate::snapshot::DEVICE_INFO_TABLE,
            labels: &["model number", "hardware model", "model"],
            anchors: &["modelNumber"],
            keywords: &["model"],
            shape: ValueShape::NonEmptyText,
        }
    }

    pub const fn identifier() -> Self {
        Self {
            name: "identifier",
            table_index: crate::snapshot::DEVICE_INFO_TABLE,
            labels: &["identifier"],
            anchors: &["identifier"],
            keywords: &["identifier"],
            shape: ValueShape::NonEmptyText,
        }
    }

    pub const fn location() -> Self {
        Self {
            name: "location",
            table_index: crate::snapshot::DEVICE_INFO_TABLE,
            labels: &["location"],
            anchors: &["location"],
            keywords: &["location"],
            shape: ValueShape::NonEmptyText,
        }
    }

    pub const fn contact() -> Self {
        Self {
            name: "contact",
            table_index: crate::snapshot::DEVICE_INFO_TABLE,
            labels: &["contact"],
            anchors: &["contact"],
            keywords: &["contact"],
            shape: ValueShape::NonEmptyText,
        }
    }
}

/// The fallback-chain extractor. Stateless apart from its retry policy.
#[derive(Debug, Clone, Copy)]
pub struct AdaptiveExtractor {
    max_attempts: u32,
    retry_interval: Duration,
}

impl AdaptiveExtractor {
    pub fn new(max_attempts: u32, retry_interval: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            retry_interval,
        }
    }

    /// Run the tier chain against one captured snapshot.
    ///
    /// Tiers short-circuit: a validated primary hit never consults the
    /// fallback or pattern tiers.
    pub fn extract(&self, snapshot: &PageSnapshot, field: &FieldSpec) -> ExtractionResult {
        if let Some(value) = self.primary(snapshot, field) {
            debug!("Field '{}' extracted via primary table tier", field.name);
            return ExtractionResult::found(value, Confidence::Primary);
        }

        if let Some(value) = self.fallback(snapshot, field) {
            debug!("Field '{}' extracted via anchor fallback tier", field.name);
            return ExtractionResult::found(value, Confidence::Fallback);
        }

        if let Some(value) = self.pattern(snapshot, field) {
            debug!("Field '{}' extracted via pattern tier", field.name);
            return ExtractionResult::found(value, Confidence::Pattern);
        }

        debug!("Field '{}': all extraction tiers exhausted", field.name);
        ExtractionResult::empty()
    }

    /// Extract several fields from one snapshot into a name -> value map.
    /// Empty fields are simply absent from the map.
    pub fn extract_fields(
        &self,
        snapshot: &PageSnapshot,
        fields: &[FieldSpec],
    ) -> BTreeMap<String, String> {
        let mut out = BTreeMap::new();
        for field in fields {
            if let Some(value) = self.extract(snapshot, field).value() {
                out.insert(field.name.to_string(), value.to_string());
            }
        }
        out
    }

    /// Tabular extraction: all rows of a positional table, minus the header
    /// row when one is present.
    pub fn extract_rows(&self, snapshot: &PageSnapshot, table_index: usize) -> ExtractionResult {
        match snapshot.table(table_index) {
            Some(table) if !table.is_empty() => ExtractionResult {
                data: Some(ExtractedData::Rows(table.clone())),
                confidence: Some(Confidence::Primary),
            },
            _ => ExtractionResult::empty(),
        }
    }

    /// Re-capture and re-extract until a tier yields data or attempts run
    /// out. Rendering is asynchronous; an empty early snapshot is common.
    pub async fn extract_with_retry<F, Fut>(
        &self,
        field: &FieldSpec,
        mut capture: F,
    ) -> E2eResult<ExtractionResult>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = E2eResult<PageSnapshot>>,
    {
        let mut last = ExtractionResult::empty();

        for attempt in 1..=self.max_attempts {
            let snapshot = capture().await?;
            last = self.extract(&snapshot, field);
            if !last.is_empty() {
                return Ok(last);
            }

            if attempt < self.max_attempts {
                debug!(
                    "Field '{}' empty on attempt {}/{}, retrying",
                    field.name, attempt, self.max_attempts
                );
                tokio::time::sleep(self.retry_interval).await;
            }
        }

        warn!(
            "Field '{}' still empty after {} attempt(s)",
            field.name, self.max_attempts
        );
        Ok(last)
    }

    fn primary(&self, snapshot: &PageSnapshot, field: &FieldSpec) -> Option<String> {
        let value = snapshot.field_from_table(field.table_index, field.labels)?;
        self.validated(field, value)
    }

    fn fallback(&self, snapshot: &PageSnapshot, field: &FieldSpec) -> Option<String> {
        field
            .anchors
            .iter()
            .filter_map(|id| snapshot.anchor(id))
            .find_map(|value| self.validated(field, value))
    }

    fn pattern(&self, snapshot: &PageSnapshot, field: &FieldSpec) -> Option<String> {
        for text in &snapshot.texts {
            let lower = text.to_lowercase();
            if !field.keywords.iter().any(|k| lower.contains(&k.to_lowercase())) {
                continue;
            }

            // "Label: value" is the common shape; otherwise look for a
            // value-shaped token inside the text.
            if let Some((_, rhs)) = text.split_once(':') {
                if let Some(value) = self.validated(field, rhs) {
                    if !self.echoes_label(field, &value) {
                        return Some(value);
                    }
                }
            }

            // Free-form fields get no token scan: a bare word next to a
            // keyword is usually the field's own label, not a value.
            if matches!(field.shape, ValueShape::NonEmptyText) {
                continue;
            }

            if let Some(value) = text
                .split_whitespace()
                .find_map(|token| self.validated(field, token))
            {
                return Some(value);
            }
        }

        None
    }

    /// True when a free-form candidate is just the field's own label or
    /// keyword bouncing back from the page text.
    fn echoes_label(&self, field: &FieldSpec, value: &str) -> bool {
        matches!(field.shape, ValueShape::NonEmptyText)
            && field
                .labels
                .iter()
                .chain(field.keywords)
                .any(|l| l.eq_ignore_ascii_case(value))
    }

    fn validated(&self, field: &FieldSpec, raw: &str) -> Option<String> {
        let value = raw.trim();
        field.shape.validate(value).then(|| value.to_string())
    }
}

impl Default for AdaptiveExtractor {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(1))
    }
}

/// Promote an empty result to an error for fields the capability record
/// guarantees. The extractor itself never makes this call.
pub fn require_present(result: ExtractionResult, field: &FieldSpec) -> E2eResult<ExtractionResult> {
    if result.is_empty() {
        Err(E2eError::ExtractionEmpty(field.name.to_string()))
    } else {
        Ok(result)
    }
}
