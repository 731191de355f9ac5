//! Statistical and contract properties of the operation simulator.

use spansim_lib::core::{OperationKind, OperationRequest, Outcome, ParamValue, ServiceName};
use spansim_lib::simulator::{OperationSimulator, PolicyTable, Randomness};

fn seeded_simulator(seed: u64) -> OperationSimulator {
    OperationSimulator::new(
        ServiceName::new("property-test".to_string()).unwrap(),
        PolicyTable::new(),
        Randomness::seeded(seed),
    )
}

#[test]
fn all_supported_kinds_never_error() {
    let simulator = seeded_simulator(1);
    for kind in OperationKind::ALL {
        for _ in 0..200 {
            let result = simulator.simulate(&OperationRequest::new(kind));
            assert!(result.is_ok(), "{} must not error", kind);
        }
    }
}

#[test]
fn latency_stays_within_configured_range() {
    let simulator = seeded_simulator(2);
    for kind in OperationKind::ALL {
        let policy = simulator.policy().get(kind).unwrap().clone();
        for _ in 0..1_000 {
            let result = simulator.simulate(&OperationRequest::new(kind)).unwrap();
            assert!(result.latency_ms >= policy.latency_min_ms);
            assert!(result.latency_ms <= policy.latency_max_ms);
        }
    }
}

#[test]
fn trade_buy_failure_rate_converges() {
    let simulator = seeded_simulator(3);
    let expected = simulator
        .policy()
        .get(OperationKind::TradeBuy)
        .unwrap()
        .failure_probability;

    let n = 20_000;
    let request = OperationRequest::new(OperationKind::TradeBuy);
    let failures = (0..n)
        .filter(|_| {
            simulator
                .simulate(&request)
                .unwrap()
                .outcome
                .is_failure()
        })
        .count();

    let rate = failures as f64 / n as f64;
    // Three-sigma band for a binomial at p=0.1, n=20k is ~0.0064
    assert!(
        (rate - expected).abs() < 0.01,
        "empirical rate {} too far from configured {}",
        rate,
        expected
    );
}

#[test]
fn consecutive_calls_are_independent() {
    let simulator = seeded_simulator(4);
    let request = OperationRequest::new(OperationKind::TradeSell);

    let outcomes: Vec<bool> = (0..20_000)
        .map(|_| simulator.simulate(&request).unwrap().outcome.is_failure())
        .collect();

    let overall = outcomes.iter().filter(|f| **f).count() as f64 / outcomes.len() as f64;

    // Failure rate conditioned on the previous call having failed should
    // match the unconditioned rate if calls share no state
    let mut after_failure = 0usize;
    let mut failures_after_failure = 0usize;
    for pair in outcomes.windows(2) {
        if pair[0] {
            after_failure += 1;
            if pair[1] {
                failures_after_failure += 1;
            }
        }
    }
    let conditional = failures_after_failure as f64 / after_failure as f64;

    assert!(
        (conditional - overall).abs() < 0.03,
        "conditional rate {} diverges from overall {}",
        conditional,
        overall
    );
}

#[test]
fn identical_seeds_replay_identical_streams() {
    let a = seeded_simulator(99);
    let b = seeded_simulator(99);
    let request = OperationRequest::new(OperationKind::SloLatency);

    for _ in 0..500 {
        let ra = a.simulate(&request).unwrap();
        let rb = b.simulate(&request).unwrap();
        assert_eq!(ra.latency_ms, rb.latency_ms);
        assert_eq!(ra.outcome, rb.outcome);
    }
}

#[test]
fn slo_latency_scenario() {
    let simulator = seeded_simulator(5);
    let threshold = simulator.policy().slo_threshold_ms();

    let mut saw_breach = false;
    let mut saw_pass = false;

    for _ in 0..500 {
        let result = simulator
            .simulate(&OperationRequest::new(OperationKind::SloLatency))
            .unwrap();

        assert_eq!(result.outcome, Outcome::Success);
        assert!((100..=2000).contains(&result.latency_ms));

        let check = result.event("threshold_check").expect("threshold_check event present");
        let breached = check
            .attributes
            .get("breached")
            .and_then(ParamValue::as_bool)
            .expect("breached is a bool");
        assert_eq!(breached, result.latency_ms > threshold);

        saw_breach |= breached;
        saw_pass |= !breached;
    }

    // The 100..=2000 range straddles the 500ms default threshold, so both
    // sides must appear over 500 draws
    assert!(saw_breach && saw_pass);
}

#[test]
fn unsupported_kind_produces_no_result() {
    let table = PolicyTable::new()
        .with_overrides(&Default::default(), &["event".to_string()], 500)
        .unwrap();
    let simulator = OperationSimulator::new(
        ServiceName::new("property-test".to_string()).unwrap(),
        table,
        Randomness::seeded(6),
    );

    let result = simulator.simulate(&OperationRequest::new(OperationKind::Event));
    let err = result.unwrap_err();
    assert!(err.is_client_error());
    assert_eq!(err.category(), "validation");
}

#[test]
fn concurrent_callers_need_no_coordination() {
    use std::sync::Arc;
    use std::thread;

    let simulator = Arc::new(seeded_simulator(7));
    let mut handles = Vec::new();

    for _ in 0..8 {
        let simulator = Arc::clone(&simulator);
        handles.push(thread::spawn(move || {
            let request = OperationRequest::new(OperationKind::Distributed);
            for _ in 0..1_000 {
                let result = simulator.simulate(&request).unwrap();
                assert!((20..=400).contains(&result.latency_ms));
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }
}
