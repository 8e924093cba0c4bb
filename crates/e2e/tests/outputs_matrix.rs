//! Matrix generation wired through the aggregator
//!
//! End-to-end over the pure path: capability record -> unit matrix ->
//! ordered execution with partial-failure isolation, using simulated
//! executors in place of the browser.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use kronos_common::{
    generate_output_matrix, generate_ptp_matrix, CapabilityRegistry, TimeoutScaler,
};
use kronos_e2e::{Classification, E2eError, ExecutionAggregator};

#[tokio::test]
async fn full_matrix_for_a_builtin_model_passes_cleanly() {
    let registry = CapabilityRegistry::builtin();
    let record = registry.lookup("KRONOS-2R-HVXX-A2F").unwrap();

    let units = generate_output_matrix(record);
    // Outputs 1-2 carry 5 options each, the rest 7.
    let expected: usize = (1..=record.max_outputs)
        .map(|o| record.signals_for(o).len())
        .sum();
    assert_eq!(units.len(), expected);

    let outcome = ExecutionAggregator
        .run(units, |_| async { Ok(()) })
        .await
        .unwrap();

    assert_eq!(outcome.classification(), Classification::CleanPass);
    assert_eq!(outcome.total(), expected);
}

#[tokio::test]
async fn one_dead_output_degrades_but_preserves_other_results() {
    let registry = CapabilityRegistry::builtin();
    let record = registry.lookup("KRONOS-3R-HVLV-TCXO-A2F").unwrap();
    let units = generate_output_matrix(record);
    let total = units.len();

    // Output 2 rejects everything, as a flaky BNC connector would.
    let outcome = ExecutionAggregator
        .run(units, |unit| async move {
            if unit.entity == "2" {
                Err(E2eError::Driver("select never applied".to_string()))
            } else {
                Ok(())
            }
        })
        .await
        .unwrap();

    assert_eq!(outcome.classification(), Classification::Partial);
    assert_eq!(
        outcome.failed.len(),
        record.signals_for(2).len(),
        "only output 2's units fail"
    );
    assert_eq!(outcome.total(), total);
    assert!(outcome.failed.iter().all(|(u, _)| u.entity == "2"));
}

#[tokio::test]
async fn fully_dead_device_fails_hard_with_every_unit_reason() {
    let registry = CapabilityRegistry::builtin();
    let record = registry.lookup("KRONOS-2P-HV-2").unwrap();
    let units = generate_output_matrix(record);
    let total = units.len();

    let err = ExecutionAggregator
        .run(units, |unit| async move {
            Err(E2eError::Driver(format!("no response for {}", unit.label())))
        })
        .await
        .unwrap_err();

    assert!(err.is_fatal());
    match err {
        E2eError::AllUnitsFailed { count, reasons } => {
            assert_eq!(count, total);
            assert_eq!(reasons.lines().count(), total);
        }
        other => panic!("expected AllUnitsFailed, got {other}"),
    }
}

#[tokio::test]
async fn execution_follows_generation_order_across_outputs() {
    let registry = CapabilityRegistry::builtin();
    let record = registry.lookup("KRONOS-2R-HVXX-A2F").unwrap();
    let units = generate_output_matrix(record);
    let expected_labels: Vec<String> = units.iter().map(|u| u.label()).collect();

    let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
    let sink = seen.clone();

    ExecutionAggregator
        .run(units, move |unit| {
            let sink = sink.clone();
            async move {
                sink.lock().unwrap().push(unit.label());
                Ok(())
            }
        })
        .await
        .unwrap();

    assert_eq!(*seen.lock().unwrap(), expected_labels);
}

#[tokio::test]
async fn ptp_matrix_runs_only_on_ptp_capable_models() {
    let registry = CapabilityRegistry::builtin();
    let executed = Arc::new(AtomicUsize::new(0));

    for model in registry.models() {
        let record = registry.lookup(model).unwrap();
        let units = generate_ptp_matrix(record);
        assert_eq!(units.len(), record.ptp_interfaces.len(), "{model}");

        let counter = executed.clone();
        ExecutionAggregator
            .run(units, move |_| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            })
            .await
            .unwrap();
    }

    let total_ptp: usize = registry
        .models()
        .iter()
        .map(|m| registry.lookup(m).unwrap().ptp_interfaces.len())
        .sum();
    assert_eq!(executed.load(Ordering::SeqCst), total_ptp);
}

#[test]
fn scaled_timeouts_follow_the_matrix_model() {
    // The settle applied between select and verify is the scaled one; check
    // the scaling a unit's device_model implies for every builtin record.
    let registry = CapabilityRegistry::builtin();
    let scaler = TimeoutScaler::new(&registry);
    let base = Duration::from_secs(5);

    for model in registry.models() {
        let record = registry.lookup(model).unwrap();
        let units = generate_output_matrix(record);
        if units.is_empty() {
            continue;
        }

        let scaled = scaler.scale(base, &units[0].device_model).unwrap();
        assert_eq!(scaled, base.mul_f64(record.timeout_multiplier), "{model}");
    }
}
