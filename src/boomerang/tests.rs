use crate::boomerang::boomerang_state::Phase;
use crate::boomerang::switch_loop::{next_lower, validate_switch};
use crate::boomerang::{
    BoomerangEndpoints, BoomerangSearch, BoomerangState, BoomerangStatistics, IterationResult,
    search_boomerang,
};
use crate::characteristic::{Characteristic, Difference};
use crate::cipher::Paradigm;
use crate::search_config::SearchConfig;
use crate::test_utils::{Oracle, ToyCipher, ToyTrail, init_logger, toy_config, toy_config_shared};
use computation_process::Stateful;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

/// Upper trails span two rounds and lower trails one, so the oracle never confuses them.
fn boomerang_config(oracle: Arc<Oracle>) -> SearchConfig {
    let mut config = toy_config_shared(oracle);
    config.upper_rounds = 2;
    config
}

fn upper(weight: usize, input: u128, output: u128) -> ToyTrail {
    ToyTrail::new(2, weight, &[("X0", input), ("X1", 0x0300), ("X2", output)])
}

/// One upper trail `0x0100 -> 0x0010` and two lower trails ending in `0x1000`. The upper
/// output only activates an odd nibble, so both switches have probability one.
fn boomerang_oracle() -> Oracle {
    Oracle::new(vec![
        upper(2, 0x0100, 0x0010),
        ToyTrail::new(1, 1, &[("X0", 0x0001), ("X1", 0x1000), ("w0", 0x1)]),
        ToyTrail::new(1, 2, &[("X0", 0x0002), ("X1", 0x1000), ("w0", 0x3)]),
    ])
}

fn trail(input: u128, output: u128) -> Characteristic {
    let mut values = BTreeMap::new();
    values.insert("X0".to_string(), Difference(input));
    values.insert("X1".to_string(), Difference(output));
    Characteristic::new(1, 16, vec!["X".to_string(), "w".to_string()], values)
}

#[test]
fn test_boomerang_search_end_to_end() {
    init_logger();
    let oracle = Arc::new(boomerang_oracle());
    let config = boomerang_config(oracle.clone());

    let report = search_boomerang(&config).unwrap();
    // (2^-2)^2 * (2^-1)^2 * 1 + (2^-2)^2 * (2^-2)^2 * 1
    assert_eq!(report.probability, 0.0625 * 0.25 + 0.0625 * 0.0625);
    assert_eq!(report.termination, IterationResult::UpperExhausted);
    assert_eq!(report.input, Some(Difference(0x0100)));
    assert_eq!(report.output, Some(Difference(0x1000)));
    assert_eq!(
        report.statistics,
        BoomerangStatistics {
            upper_trails: 1,
            lower_trails: 2,
            switches_accepted: 2,
            switches_rejected: 0,
        }
    );

    // The upper face is clustered once, each lower trail once.
    let counts = oracle.counts.lock().unwrap();
    assert_eq!(counts.len(), 2 + 2 + 2);
}

#[test]
fn test_iterations() {
    init_logger();
    let config = boomerang_config(Arc::new(boomerang_oracle()));
    let state = BoomerangState::new(&config).unwrap();
    let results: Vec<IterationResult> = BoomerangSearch::configure(config, state)
        .map(|it| it.unwrap().unwrap().result)
        .collect();
    // Both lower trails are processed inside the lower window, then the lower search is
    // exhausted, which moves on to the (non-existent) next upper trail.
    assert_eq!(
        results,
        vec![IterationResult::NoLowerTrail, IterationResult::UpperExhausted]
    );
}

#[test]
fn test_upper_trail_finished_by_lower_window() {
    init_logger();
    let oracle = Oracle::new(vec![
        upper(2, 0x0100, 0x0010),
        ToyTrail::new(1, 4, &[("X0", 0x0001), ("X1", 0x1000), ("w0", 0xf)]),
        ToyTrail::new(1, 5, &[("X0", 0x0002), ("X1", 0x1000), ("w0", 0x1f)]),
    ]);
    let mut config = boomerang_config(Arc::new(oracle));
    // Starting weight 4 is not below the 4 nibbles, so the window only admits weight 4.
    config.lower_weight = 4;
    config.lower_limit = 16;

    let state = BoomerangState::new(&config).unwrap();
    let iterations: Vec<_> = BoomerangSearch::configure(config, state)
        .map(|it| it.unwrap().unwrap())
        .collect();
    assert_eq!(iterations.len(), 2);
    let IterationResult::Probability(probability) = iterations[0].result else {
        panic!("expected a finished upper trail, got {:?}", iterations[0].result);
    };
    // Both lower trails were found (weights 4 and 5), the window closed after the second.
    assert_eq!(iterations[0].statistics.lower_trails, 2);
    assert_eq!(
        probability,
        0.0625 * 0.0625 * 0.0625 * 1.0 + 0.0625 * 0.03125 * 0.03125
    );
    assert_eq!(iterations[1].result, IterationResult::UpperExhausted);
    assert_eq!(iterations[1].probability, probability);
}

#[test]
fn test_first_switch_admits_only_full_connectivity() {
    init_logger();
    // The upper output activates nibble 0 with difference 1, which is wired to nibble 3.
    // table[1][2] = 4 is excluded until the end point is pinned, table[1][1] = 16 is not.
    let oracle = Arc::new(Oracle::new(vec![
        upper(1, 0x0100, 0x0001),
        ToyTrail::new(1, 1, &[("X0", 0x2000), ("X1", 0x0020), ("w0", 0x1)]),
        ToyTrail::new(1, 3, &[("X0", 0x1000), ("X1", 0x0020), ("w0", 0x7)]),
    ]));
    let config = boomerang_config(oracle.clone());

    let report = search_boomerang(&config).unwrap();
    assert_eq!(report.output, Some(Difference(0x0020)));
    assert_eq!(report.statistics.switches_rejected, 0);
    assert_eq!(report.statistics.switches_accepted, 2);
    // (2^-1)^2 * (2^-3)^2 * 1 + (2^-1)^2 * (2^-1)^2 * 1/4
    assert_eq!(report.probability, 0.25 * 0.015625 + 0.25 * 0.25 * 0.25);

    let decisions = oracle.decisions.lock().unwrap();
    let lower: Vec<_> = decisions.iter().filter(|q| !q.excluded.is_empty()).collect();
    let quarter = ("X0".to_string(), Some((15, 12)), 0x2);
    assert!(lower.first().unwrap().excluded.contains(&quarter));
    assert!(!lower.last().unwrap().excluded.contains(&quarter));
    assert!(lower.iter().all(|q| q.excluded.contains(&("X0".to_string(), None, 0x0001))));
}

#[test]
fn test_transient_zero_cluster_is_retried() {
    init_logger();
    let oracle = Arc::new(boomerang_oracle());
    oracle.zero_counts_before_answer.store(1, Ordering::SeqCst);
    let config = boomerang_config(oracle.clone());

    let report = search_boomerang(&config).unwrap();
    assert_eq!(report.probability, 0.0625 * 0.25 + 0.0625 * 0.0625);
    // The first upper clustering pass (two weights) is repeated.
    assert_eq!(oracle.counts.lock().unwrap().len(), 2 + 2 + 2 + 2);
}

#[test]
fn test_time_limit_reports_timeout() {
    init_logger();
    let oracle = Arc::new(boomerang_oracle());
    let mut config = boomerang_config(oracle.clone());
    config.time_limit = Some(Duration::ZERO);

    let report = search_boomerang(&config).unwrap();
    assert_eq!(report.termination, IterationResult::TimedOut);
    assert_eq!(report.probability, 0.0);
    assert!(oracle.decisions.lock().unwrap().is_empty());
}

#[test]
fn test_rejects_unsupported_paradigm() {
    let mut config = toy_config(Oracle::default());
    config.model = Arc::new(ToyCipher {
        paradigm: Paradigm::Spn,
        ..ToyCipher::gfn()
    });
    assert!(search_boomerang(&config).is_err());
}

#[test]
fn test_lower_exhausted_twice_blocks_upper_once() {
    init_logger();
    let config = toy_config(Oracle::default());
    let mut state = BoomerangState::new(&config).unwrap();
    let upper = trail(0x0100, 0x0010);
    state.accept_upper(&config, upper.clone(), 2);
    state.accept_lower(trail(0x0001, 0x1000), 1);
    assert_eq!(state.blocked_lower.len(), 1);

    state.lower_exhausted();
    state.lower_exhausted();
    assert_eq!(state.blocked_upper, vec![upper]);
    assert!(state.blocked_lower.is_empty());

    // Without a current upper trail, the machine goes back to the upper search.
    next_lower(&config, &mut state).unwrap();
    assert!(matches!(state.phase, Phase::Idle));
}

#[test]
fn test_finish_upper_raises_upper_weight() {
    let mut config = toy_config(Oracle::default());
    config.lower_weight = 4;
    let mut state = BoomerangState::new(&config).unwrap();
    state.accept_upper(&config, trail(0x0100, 0x0010), 3);
    state.accept_lower(trail(0x0001, 0x1000), 5);
    assert!(!state.lower_window_open(&config));

    let result = next_lower(&config, &mut state).unwrap();
    assert_eq!(result, Some(IterationResult::Probability(0.0)));
    assert_eq!(state.upper_weight, 3);
    assert_eq!(state.blocked_upper.len(), 1);
    assert!(state.blocked_lower.is_empty());
}

#[test]
fn test_rejected_switch_searches_next_lower() {
    let config = toy_config(Oracle::default());
    let mut state = BoomerangState::new(&config).unwrap();
    // table[1][4] = 0
    state.accept_upper(&config, trail(0x0100, 0x0001), 1);
    state.accept_lower(trail(0x4000, 0x0020), 1);

    validate_switch(&config, &mut state).unwrap();
    assert!(matches!(state.phase, Phase::NextLower));
    assert_eq!(state.statistics.switches_rejected, 1);
    assert_eq!(state.endpoints, BoomerangEndpoints::default());
    assert_eq!(state.blocked_lower.len(), 1);
}

#[test]
fn test_accepted_switch_pins_endpoints_once() {
    let config = toy_config(Oracle::default());
    let mut state = BoomerangState::new(&config).unwrap();
    state.accept_upper(&config, trail(0x0100, 0x0001), 1);
    state.accept_lower(trail(0x1000, 0x0020), 1);
    validate_switch(&config, &mut state).unwrap();
    assert!(matches!(state.phase, Phase::ClusterUpper(_)));
    assert_eq!(state.endpoints.get("X0"), Some(Difference(0x0100)));
    assert_eq!(state.endpoints.get("X1"), Some(Difference(0x0020)));

    // A second pair never overwrites the pinned end points.
    state.accept_lower(trail(0x1000, 0x0040), 1);
    validate_switch(&config, &mut state).unwrap();
    assert_eq!(state.endpoints.get("X1"), Some(Difference(0x0020)));

    let mut endpoints = state.endpoints.clone();
    assert!(!endpoints.pin("X0", Difference(0x1)));
    endpoints.clear();
    assert!(endpoints.pin("X0", Difference(0x1)));
}

#[test]
fn test_accumulate_formula() {
    let config = toy_config(Oracle::default());
    let mut state = BoomerangState::new(&config).unwrap();
    let contribution = state.accumulate(0.5, 0.25, 0.5);
    assert_eq!(contribution, 0.25 * 0.0625 * 0.5);
    state.accumulate(0.5, 0.25, 0.5);
    assert_eq!(state.probability, 2.0 * contribution);
    assert_eq!(state.statistics.switches_accepted, 2);
}

#[test]
fn test_cleared_endpoints_are_pinned_again() {
    let config = toy_config(Oracle::default());
    let mut state = BoomerangState::new(&config).unwrap();
    state.accept_upper(&config, trail(0x0100, 0x0001), 1);
    state.accept_lower(trail(0x1000, 0x0020), 1);
    validate_switch(&config, &mut state).unwrap();
    assert_eq!(state.endpoints.get("X1"), Some(Difference(0x0020)));

    // Starting an independent boomerang from the same state.
    state.endpoints.clear();
    assert!(!state.endpoints.is_pinned("X0"));
    state.accept_upper(&config, trail(0x0200, 0x0001), 1);
    state.accept_lower(trail(0x1000, 0x0040), 1);
    validate_switch(&config, &mut state).unwrap();
    assert_eq!(state.endpoints.get("X0"), Some(Difference(0x0200)));
    assert_eq!(state.endpoints.get("X1"), Some(Difference(0x0040)));
}
