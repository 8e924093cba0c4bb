//! Structured snapshot of a rendered device page
//!
//! The device UI has no semantic markup: four positional tables, a product
//! title, id-anchored status spans, and name-addressed form controls. A
//! [`PageSnapshot`] is everything the extraction pipeline needs from one
//! rendered state, captured as plain data so the decision logic stays pure
//! and testable without a browser.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{E2eError, E2eResult};

/// Positional table indices on the dashboard.
pub const TIME_TABLE: usize = 0;
pub const GNSS_TABLE: usize = 1;
pub const DEVICE_INFO_TABLE: usize = 2;
pub const SATELLITE_TABLE: usize = 3;

/// Number of top-level tables a fully rendered dashboard shows.
pub const DASHBOARD_TABLE_COUNT: usize = 4;

/// State of one named form control (`select` value or radio visibility).
///
/// Radio options are keyed `"{name}={value}"`, e.g. `"time3=UTC"`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlState {
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub visible: bool,
}

/// One captured page state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageSnapshot {
    #[serde(default)]
    pub title: String,

    /// Tables in document order, each a list of rows of cell texts.
    #[serde(default)]
    pub tables: Vec<Vec<Vec<String>>>,

    /// Text content of elements that carry an `id` attribute.
    #[serde(default)]
    pub anchors: BTreeMap<String, String>,

    /// Trimmed text of text-bearing elements, for the pattern tier.
    #[serde(default)]
    pub texts: Vec<String>,

    /// Named form controls.
    #[serde(default)]
    pub controls: BTreeMap<String, ControlState>,
}

impl PageSnapshot {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    /// Parse a snapshot from the driver's JSON payload.
    pub fn from_json(json: &str) -> E2eResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| E2eError::SnapshotParse(format!("invalid snapshot payload: {e}")))
    }

    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    pub fn table(&self, index: usize) -> Option<&Vec<Vec<String>>> {
        self.tables.get(index)
    }

    /// Find a value cell in a positional table by label.
    ///
    /// A row matches when its first cell contains any of the given labels,
    /// case-insensitively; the value is the second cell. Returns `None` for
    /// missing tables, rows, or value cells.
    pub fn field_from_table(&self, index: usize, labels: &[&str]) -> Option<&str> {
        let table = self.table(index)?;

        for row in table {
            let (label_cell, rest) = match row.split_first() {
                Some(split) => split,
                None => continue,
            };
            let label_lower = label_cell.trim().to_lowercase();
            if labels.iter().any(|l| label_lower.contains(&l.to_lowercase())) {
                if let Some(value) = rest.first() {
                    return Some(value.trim());
                }
            }
        }

        None
    }

    pub fn anchor(&self, id: &str) -> Option<&str> {
        self.anchors.get(id).map(|s| s.trim())
    }

    pub fn control(&self, name: &str) -> Option<&ControlState> {
        self.controls.get(name)
    }

    /// Whether a named control is present and visible.
    pub fn control_visible(&self, name: &str) -> bool {
        self.control(name).map(|c| c.visible).unwrap_or(false)
    }

    // Builder-style helpers. The driver fills snapshots via serde; these are
    // for synthetic snapshots in fixtures and tests.

    pub fn push_table(&mut self, rows: Vec<Vec<String>>) -> &mut Self {
        self.tables.push(rows);
        self
    }

    pub fn set_anchor(&mut self, id: impl Into<String>, text: impl Into<String>) -> &mut Self {
        self.anchors.insert(id.into(), text.into());
        self
    }

    pub fn push_text(&mut self, text: impl Into<String>) -> &mut Self {
        self.texts.push(text.into());
        self
    }

    pub fn set_control(&mut self, name: impl Into<String>, state: ControlState) -> &mut Self {
        self.controls.insert(name.into(), state);
        self
    }
}

/// Convenience for building label/value rows.
pub fn kv_rows(pairs: &[(&str, &str)]) -> Vec<Vec<String>> {
    pairs
        .iter()
        .map(|(label, value)| vec![label.to_string(), value.to_string()])
        .collect()
}
