//! Extraction and resolution over synthetic page snapshots
//!
//! Covers the snapshot-to-decision path without a browser: degraded Series 2
//! layouts, anchor-only pages, and pages with nothing usable at all.

use kronos_common::CapabilityRegistry;
use kronos_e2e::extract::{require_present, ExtractedData};
use kronos_e2e::snapshot::{kv_rows, SATELLITE_TABLE};
use kronos_e2e::{AdaptiveExtractor, Confidence, E2eError, FieldSpec, ModelResolver, PageSnapshot};

/// Full dashboard as a Series 3 device renders it.
fn series3_dashboard() -> PageSnapshot {
    let mut snapshot = PageSnapshot::new("Kronos Series 3 Status");
    snapshot.push_table(kv_rows(&[
        ("UTC", "10:20:30"),
        ("Local", "12:20:30"),
        ("Time source", "GNSS"),
    ]));
    snapshot.push_table(kv_rows(&[
        ("GNSS state", "LOCKED"),
        ("Used / tracked SVs", "12/14"),
    ]));
    snapshot.push_table(kv_rows(&[
        ("Model Number", "KRONOS-3R-HVLV-TCXO-A2F"),
        ("Identifier", "lab-bench-3"),
        ("Location", "Rack 7"),
    ]));
    snapshot.push_table(vec![
        vec!["Id".into(), "C/No".into()],
        vec!["12".into(), "44".into()],
        vec!["25".into(), "38".into()],
    ]);
    snapshot
}

/// Series 2 layout: no device-info anchors, status only in free text.
fn degraded_series2_page() -> PageSnapshot {
    let mut snapshot = PageSnapshot::new("Kronos Series 2 Status");
    snapshot.push_table(kv_rows(&[("UTC", "10:20:30")]));
    snapshot.push_table(vec![vec!["Receiver".into()]]);
    snapshot.push_table(kv_rows(&[("Model Number", "KRONOS-2P-HV-2")]));
    snapshot.push_text("GNSS status ACQUIRING");
    snapshot.push_text("Satellites: 7/9");
    snapshot
}

#[test]
fn full_dashboard_extracts_all_status_fields_at_primary_confidence() {
    let extractor = AdaptiveExtractor::default();
    let snapshot = series3_dashboard();

    for field in [
        FieldSpec::gnss_state(),
        FieldSpec::satellite_count(),
        FieldSpec::utc_time(),
        FieldSpec::time_source(),
        FieldSpec::identifier(),
        FieldSpec::location(),
    ] {
        let result = extractor.extract(&snapshot, &field);
        assert_eq!(result.confidence, Some(Confidence::Primary), "{}", field.name);
    }

    let fields = extractor.extract_fields(
        &snapshot,
        &[FieldSpec::gnss_state(), FieldSpec::satellite_count()],
    );
    assert_eq!(fields["gnss_state"], "LOCKED");
    assert_eq!(fields["satellite_count"], "12/14");
}

#[test]
fn degraded_page_falls_through_to_pattern_tier() {
    let extractor = AdaptiveExtractor::default();
    let snapshot = degraded_series2_page();

    let state = extractor.extract(&snapshot, &FieldSpec::gnss_state());
    assert_eq!(state.value(), Some("ACQUIRING"));
    assert_eq!(state.confidence, Some(Confidence::Pattern));

    let count = extractor.extract(&snapshot, &FieldSpec::satellite_count());
    assert_eq!(count.value(), Some("7/9"));
    assert_eq!(count.confidence, Some(Confidence::Pattern));
}

#[test]
fn anchor_only_page_uses_fallback_tier() {
    let mut snapshot = PageSnapshot::new("Kronos Series 3 Status");
    snapshot.set_anchor("gnssState", "SEARCHING");
    snapshot.set_anchor("usedVis", "3/11");

    let extractor = AdaptiveExtractor::default();

    let state = extractor.extract(&snapshot, &FieldSpec::gnss_state());
    assert_eq!(state.value(), Some("SEARCHING"));
    assert_eq!(state.confidence, Some(Confidence::Fallback));

    let count = extractor.extract(&snapshot, &FieldSpec::satellite_count());
    assert_eq!(count.value(), Some("3/11"));
    assert_eq!(count.confidence, Some(Confidence::Fallback));
}

#[test]
fn guaranteed_field_missing_everywhere_is_an_extraction_error() {
    let mut snapshot = PageSnapshot::new("Kronos Series 3 Status");
    // A page with tables but no GNSS data anywhere.
    snapshot.push_table(kv_rows(&[("UTC", "10:20:30")]));

    let result = AdaptiveExtractor::default().extract(&snapshot, &FieldSpec::gnss_state());
    assert!(result.is_empty());

    let err = require_present(result, &FieldSpec::gnss_state()).unwrap_err();
    assert!(matches!(err, E2eError::ExtractionEmpty(_)));
    assert!(!err.is_fatal());
}

#[test]
fn garbage_values_never_pass_validation_regardless_of_tier() {
    let mut snapshot = PageSnapshot::new("Kronos Series 3 Status");
    snapshot.push_table(kv_rows(&[("UTC", "soon")]));
    snapshot.push_table(kv_rows(&[("GNSS state", "ONLINE")]));
    snapshot.set_anchor("gnssState", "ON LINE");
    snapshot.push_text("GNSS status nominal");

    let extractor = AdaptiveExtractor::default();
    assert!(extractor.extract(&snapshot, &FieldSpec::gnss_state()).is_empty());
    assert!(extractor.extract(&snapshot, &FieldSpec::utc_time()).is_empty());
}

#[test]
fn satellite_rows_extract_as_tabular_data() {
    let extractor = AdaptiveExtractor::default();
    let result = extractor.extract_rows(&series3_dashboard(), SATELLITE_TABLE);

    match result.data {
        Some(ExtractedData::Rows(rows)) => {
            assert_eq!(rows.len(), 3);
            assert_eq!(rows[1][0], "12");
        }
        other => panic!("expected rows, got {other:?}"),
    }

    // Missing table is an empty result, not an error.
    assert!(extractor
        .extract_rows(&degraded_series2_page(), SATELLITE_TABLE)
        .is_empty());
}

#[test]
fn resolver_handles_each_builtin_model_dashboard() {
    let registry = CapabilityRegistry::builtin();

    for model in registry.models() {
        let record = registry.lookup(model).unwrap();
        let mut snapshot = PageSnapshot::new(format!("{} Status", record.series.title_marker()));
        snapshot.push_table(kv_rows(&[("UTC", "10:20:30")]));
        snapshot.push_table(kv_rows(&[("GNSS state", "LOCKED")]));
        snapshot.push_table(kv_rows(&[("Model Number", model)]));

        let mut resolver = ModelResolver::new();
        assert_eq!(resolver.resolve(&snapshot, &registry).unwrap(), model);
    }
}

#[test]
fn resolver_and_extractor_disagree_cleanly_on_foreign_pages() {
    // A page from some other product: resolution is fatal, extraction of the
    // GNSS table still works on its own terms.
    let mut snapshot = PageSnapshot::new("Acme NTP Server");
    snapshot.push_table(kv_rows(&[("UTC", "10:20:30")]));
    snapshot.push_table(kv_rows(&[("GNSS state", "LOCKED")]));

    let registry = CapabilityRegistry::builtin();
    let err = ModelResolver::new().resolve(&snapshot, &registry).unwrap_err();
    assert!(err.is_fatal());

    let state = AdaptiveExtractor::default().extract(&snapshot, &FieldSpec::gnss_state());
    assert_eq!(state.value(), Some("LOCKED"));
    assert_eq!(state.confidence, Some(Confidence::Primary));
}
