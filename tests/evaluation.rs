use qpong::ml::Features;
use qpong::{
    AgentError, Approximator, DefaultApproximator, EvaluationConfig, EvaluationHarness,
    ValueFunction,
};

/// Ignores the state and always prefers standing still.
struct Idle;

impl ValueFunction for Idle {
    fn predict(&self, features: &Features) -> f64 {
        -f64::from(features[7].abs())
    }
}

#[test]
fn seeded_runs_are_reproducible() {
    let harness = EvaluationHarness::new(EvaluationConfig::default()).expect("harness");
    let snapshot = DefaultApproximator::default().snapshot();
    let first = harness.run(&snapshot).expect("first run");
    let second = harness.run(&snapshot).expect("second run");
    assert_eq!(first, second);
    assert_eq!(first.episodes.len(), 75);
}

#[test]
fn summary_respects_hit_cap_and_threshold() {
    let config = EvaluationConfig {
        episodes: 20,
        hit_cap: 4,
        hit_threshold: 2,
        ..EvaluationConfig::default()
    };
    let report = EvaluationHarness::new(config)
        .expect("harness")
        .run(&Idle)
        .expect("run");
    let summary = report.summary;
    assert!(summary.max_hits <= 4);
    assert!(summary.min_hits <= summary.max_hits);
    assert!(summary.mean_hits >= summary.min_hits as f64);
    assert!(summary.mean_hits <= summary.max_hits as f64);
    assert!((0.0..=100.0).contains(&summary.pct_above_threshold));
    assert!(summary.mean_miss_distance >= 0.0);
    for episode in &report.episodes {
        // Either the paddle let the ball through or the cap cut the rally.
        assert_eq!(episode.miss_distance.is_none(), episode.hits == 4);
    }
}

#[test]
fn stationary_paddle_misses_measure_positive_distance() {
    let config = EvaluationConfig {
        episodes: 10,
        ..EvaluationConfig::default()
    };
    let report = EvaluationHarness::new(config)
        .expect("harness")
        .run(&Idle)
        .expect("run");
    let missed: Vec<f64> = report
        .episodes
        .iter()
        .filter_map(|episode| episode.miss_distance)
        .collect();
    assert!(!missed.is_empty());
    assert!(missed.iter().all(|distance| *distance > 0.0));
}

#[test]
fn zero_episode_config_is_rejected() {
    let config = EvaluationConfig {
        episodes: 0,
        ..EvaluationConfig::default()
    };
    assert!(matches!(
        EvaluationHarness::new(config),
        Err(AgentError::InvalidConfiguration(_))
    ));
}
