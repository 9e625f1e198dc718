use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::board::{BALL_DIAMETER, Board, PADDLE_HEIGHT};
use crate::controllers::{PolicyParameters, QPaddleController};
use crate::error::AgentError;
use crate::ml::ValueFunction;
use crate::side::Side;
use crate::state::BoardState;

pub const EVALUATION_EPISODES: usize = 75;
pub const EVALUATION_HIT_CAP: usize = 30;
pub const HIT_THRESHOLD: usize = 25;

const DEFAULT_SEED: u64 = 0xE7A1_5EED_0B5E_55ED;
const AGENT_SEED_SALT: u64 = 0x9E37_79B9;

/// Settings for scoring a frozen value function.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EvaluationConfig {
    pub width: f64,
    pub height: f64,
    pub episodes: usize,
    pub hit_cap: usize,
    /// Exploration during evaluation. Pass `0.0` for a purely greedy agent.
    pub epsilon: f64,
    /// Episodes with strictly more hits than this count as "long rallies".
    pub hit_threshold: usize,
    pub seed: u64,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            width: 300.0,
            height: 200.0,
            episodes: EVALUATION_EPISODES,
            hit_cap: EVALUATION_HIT_CAP,
            epsilon: 0.0,
            hit_threshold: HIT_THRESHOLD,
            seed: DEFAULT_SEED,
        }
    }
}

impl EvaluationConfig {
    pub fn validate(&self) -> Result<(), AgentError> {
        if self.episodes == 0 {
            return Err(AgentError::InvalidConfiguration(
                "evaluation needs at least one episode",
            ));
        }
        if self.hit_cap == 0 {
            return Err(AgentError::InvalidConfiguration(
                "evaluation episodes need a hit cap",
            ));
        }
        Ok(())
    }
}

/// Result of one evaluation episode.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EpisodeRecord {
    pub hits: usize,
    /// Gap to the paddle when the ball got past it, `None` if the episode hit the cap.
    pub miss_distance: Option<f64>,
    pub steps: usize,
}

/// Aggregate statistics used to rank snapshots. Lower miss distance is better.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EvaluationSummary {
    pub median_hits: f64,
    pub mean_hits: f64,
    pub min_hits: usize,
    pub max_hits: usize,
    pub pct_above_threshold: f64,
    pub mean_miss_distance: f64,
}

impl EvaluationSummary {
    /// Every hit counts as a miss of distance zero in the distance average.
    pub fn from_episodes(
        episodes: &[EpisodeRecord],
        hit_threshold: usize,
    ) -> Result<Self, AgentError> {
        if episodes.is_empty() {
            return Err(AgentError::EmptySampleSet);
        }
        let mut hits: Vec<usize> = episodes.iter().map(|episode| episode.hits).collect();
        hits.sort_unstable();
        let count = hits.len();
        let median_hits = if count % 2 == 1 {
            hits[count / 2] as f64
        } else {
            (hits[count / 2 - 1] + hits[count / 2]) as f64 / 2.0
        };
        let mean_hits = hits.iter().sum::<usize>() as f64 / count as f64;
        let above = hits.iter().filter(|&&h| h > hit_threshold).count();

        let mut distances = Vec::new();
        for episode in episodes {
            if let Some(distance) = episode.miss_distance {
                distances.push(distance);
            }
            distances.extend(std::iter::repeat(0.0).take(episode.hits));
        }
        if distances.is_empty() {
            return Err(AgentError::EmptySampleSet);
        }
        let mean_miss_distance = distances.iter().sum::<f64>() / distances.len() as f64;

        Ok(Self {
            median_hits,
            mean_hits,
            min_hits: hits[0],
            max_hits: hits[count - 1],
            pct_above_threshold: above as f64 * 100.0 / count as f64,
            mean_miss_distance,
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct EvaluationReport {
    pub episodes: Vec<EpisodeRecord>,
    pub summary: EvaluationSummary,
}

/// Plays fixed-length greedy episodes on an isolated left-only board.
pub struct EvaluationHarness {
    config: EvaluationConfig,
}

impl EvaluationHarness {
    pub fn new(config: EvaluationConfig) -> Result<Self, AgentError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &EvaluationConfig {
        &self.config
    }

    pub fn run<V: ValueFunction>(&self, value: &V) -> Result<EvaluationReport, AgentError> {
        let config = &self.config;
        let mut board = Board::builder(config.width, config.height)
            .with_paddles(true, false)
            .with_seed(config.seed)
            .build()?;
        let params = PolicyParameters::evaluation(config.epsilon).with_hit_cap(config.hit_cap);
        let mut agent = QPaddleController::new(
            board.state(),
            Side::Left,
            params,
            value,
            StdRng::seed_from_u64(config.seed ^ AGENT_SEED_SALT),
        )?;

        let mut episodes = Vec::with_capacity(config.episodes);
        for episode in 0..config.episodes {
            let mut steps = 0usize;
            while !board.is_done() {
                board.step_with(&mut [&mut agent]);
                steps += 1;
            }
            let state = board.state();
            let miss_distance = state
                .who_lost
                .is(Side::Left)
                .then(|| miss_distance(state, Side::Left));
            log::trace!(
                "evaluation episode {episode}: {} hits in {steps} steps",
                agent.hit_count()
            );
            episodes.push(EpisodeRecord {
                hits: agent.hit_count(),
                miss_distance,
                steps,
            });
            board.reset();
            agent.start_episode(board.state());
        }

        let summary = EvaluationSummary::from_episodes(&episodes, config.hit_threshold)?;
        Ok(EvaluationReport { episodes, summary })
    }
}

/// Vertical gap between the ball and the nearer edge of the paddle it passed.
pub fn miss_distance(state: &BoardState, side: Side) -> f64 {
    let paddle_y = state.paddle(side).y;
    let ball_y = state.ball.position.y;
    if ball_y + BALL_DIAMETER <= paddle_y {
        (paddle_y - ball_y - BALL_DIAMETER).abs()
    } else {
        (ball_y - paddle_y - PADDLE_HEIGHT).abs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn record(hits: usize, miss_distance: Option<f64>) -> EpisodeRecord {
        EpisodeRecord {
            hits,
            miss_distance,
            steps: 0,
        }
    }

    #[test]
    fn summary_counts_hits_as_zero_distance() {
        let episodes = [record(3, Some(12.0)), record(0, Some(4.0)), record(30, None)];
        let summary = EvaluationSummary::from_episodes(&episodes, 25).expect("summary");
        assert_eq!(summary.median_hits, 3.0);
        assert_eq!(summary.mean_hits, 11.0);
        assert_eq!(summary.min_hits, 0);
        assert_eq!(summary.max_hits, 30);
        assert!((summary.pct_above_threshold - 100.0 / 3.0).abs() < 1e-12);
        assert_eq!(summary.mean_miss_distance, 16.0 / 35.0);
    }

    #[test]
    fn even_count_median_averages_middle_pair() {
        let episodes = [
            record(1, Some(1.0)),
            record(4, Some(1.0)),
            record(2, Some(1.0)),
            record(9, Some(1.0)),
        ];
        let summary = EvaluationSummary::from_episodes(&episodes, 25).expect("summary");
        assert_eq!(summary.median_hits, 3.0);
        assert_eq!(summary.pct_above_threshold, 0.0);
    }

    #[test]
    fn empty_collections_are_errors() {
        assert!(matches!(
            EvaluationSummary::from_episodes(&[], 25),
            Err(AgentError::EmptySampleSet)
        ));
        assert!(matches!(
            EvaluationSummary::from_episodes(&[record(0, None)], 25),
            Err(AgentError::EmptySampleSet)
        ));
    }

    #[rstest]
    #[case(100.0, 80.0, 12.0)]
    #[case(100.0, 92.0, 0.0)]
    #[case(100.0, 160.0, 10.0)]
    #[case(100.0, 130.0, 20.0)]
    fn miss_distance_measures_from_near_edge(
        #[case] paddle_y: f64,
        #[case] ball_y: f64,
        #[case] expected: f64,
    ) {
        let board = Board::builder(300.0, 200.0)
            .with_paddles(true, false)
            .with_seed(1)
            .build()
            .expect("board");
        let mut state = board.snapshot();
        state.left.y = paddle_y;
        state.ball.position.y = ball_y;
        assert_eq!(miss_distance(&state, Side::Left), expected);
    }

    #[test]
    fn rejects_degenerate_configs() {
        let config = EvaluationConfig {
            episodes: 0,
            ..EvaluationConfig::default()
        };
        assert!(EvaluationHarness::new(config).is_err());
        let config = EvaluationConfig {
            hit_cap: 0,
            ..EvaluationConfig::default()
        };
        assert!(EvaluationHarness::new(config).is_err());
    }
}
