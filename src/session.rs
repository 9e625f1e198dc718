use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::board::Board;
use crate::controllers::{PolicyParameters, QPaddleController};
use crate::error::AgentError;
use crate::evaluation::{EvaluationConfig, EvaluationHarness, EvaluationSummary, HIT_THRESHOLD};
use crate::ml::Approximator;
use crate::side::Side;

const DEFAULT_SEED: u64 = 0x5EED_0F_9A11;
const AGENT_SEED_SALT: u64 = 0xA6E7_7EED;

/// Everything the training driver needs besides the approximator itself.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    pub width: f64,
    pub height: f64,
    pub max_episodes: usize,
    pub episodes_per_batch: usize,
    pub max_epsilon: f64,
    pub min_epsilon: f64,
    /// Episodes over which epsilon decays linearly from max to min.
    pub epsilon_episodes: usize,
    pub gamma: f64,
    pub hit_cap: usize,
    pub train_iterations: usize,
    /// Batches between numbered backups. `0` disables backups.
    pub backup_every: usize,
    pub evaluation_episodes: usize,
    pub evaluation_hit_cap: usize,
    pub seed: u64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            width: 300.0,
            height: 200.0,
            max_episodes: 40_000,
            episodes_per_batch: 10,
            max_epsilon: 0.9,
            min_epsilon: 0.0,
            epsilon_episodes: 10_000,
            gamma: 0.9,
            hit_cap: 10,
            train_iterations: 1,
            backup_every: 1_000,
            evaluation_episodes: 75,
            evaluation_hit_cap: 30,
            seed: DEFAULT_SEED,
        }
    }
}

impl TrainingConfig {
    pub fn validate(&self) -> Result<(), AgentError> {
        if self.episodes_per_batch == 0 {
            return Err(AgentError::InvalidConfiguration(
                "episodes_per_batch must be positive",
            ));
        }
        if self.hit_cap == 0 {
            return Err(AgentError::InvalidConfiguration(
                "training episodes need a hit cap",
            ));
        }
        for epsilon in [self.max_epsilon, self.min_epsilon] {
            if !(0.0..=1.0).contains(&epsilon) {
                return Err(AgentError::InvalidConfiguration(
                    "epsilon bounds must be between 0 and 1",
                ));
            }
        }
        self.evaluation().validate()?;
        self.policy().validate()
    }

    pub fn policy(&self) -> PolicyParameters {
        PolicyParameters::training(self.max_epsilon, self.gamma, self.train_iterations)
            .with_hit_cap(self.hit_cap)
    }

    pub fn evaluation(&self) -> EvaluationConfig {
        EvaluationConfig {
            width: self.width,
            height: self.height,
            episodes: self.evaluation_episodes,
            hit_cap: self.evaluation_hit_cap,
            epsilon: 0.0,
            hit_threshold: HIT_THRESHOLD,
            seed: self.seed,
        }
    }
}

/// Epsilon to use after `episode` (1-based) has finished.
pub fn annealed_epsilon(config: &TrainingConfig, episode: usize) -> f64 {
    if episode + 1 < config.epsilon_episodes {
        let slope =
            (config.min_epsilon - config.max_epsilon) / (config.epsilon_episodes - 1) as f64;
        slope * episode as f64 + config.max_epsilon
    } else {
        config.min_epsilon
    }
}

/// One row of the training table.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub batch: usize,
    pub epsilon: f64,
    /// Fit error of the commit. NaN for the untrained baseline.
    pub error: f64,
    pub summary: EvaluationSummary,
    /// The snapshot beat every earlier one on mean miss distance.
    pub improved: bool,
    /// This batch is due for a numbered backup.
    pub backup: bool,
}

pub struct TrainingOutcome<S> {
    pub best_batch: usize,
    pub best_snapshot: S,
    pub history: Vec<BatchReport>,
}

/// Episodic training loop on a left-only board with periodic greedy evaluation.
pub struct TrainingSession<A: Approximator> {
    config: TrainingConfig,
    board: Board,
    agent: QPaddleController<A, StdRng>,
    evaluator: EvaluationHarness,
}

impl<A: Approximator> TrainingSession<A> {
    pub fn new(config: TrainingConfig, approximator: A) -> Result<Self, AgentError> {
        config.validate()?;
        let board = Board::builder(config.width, config.height)
            .with_paddles(true, false)
            .with_seed(config.seed)
            .build()?;
        let agent = QPaddleController::new(
            board.state(),
            Side::Left,
            config.policy(),
            approximator,
            StdRng::seed_from_u64(config.seed ^ AGENT_SEED_SALT),
        )?;
        let evaluator = EvaluationHarness::new(config.evaluation())?;
        Ok(Self {
            config,
            board,
            agent,
            evaluator,
        })
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    pub fn agent(&self) -> &QPaddleController<A, StdRng> {
        &self.agent
    }

    /// Runs every configured episode.
    ///
    /// `on_batch` sees the untrained baseline as batch 0 and then every
    /// committed batch together with the snapshot that was evaluated. An
    /// error from the callback stops the run.
    pub fn run<F>(&mut self, mut on_batch: F) -> Result<TrainingOutcome<A::Snapshot>, AgentError>
    where
        F: FnMut(&BatchReport, &A::Snapshot) -> Result<(), AgentError>,
    {
        let baseline = self.agent.snapshot();
        let summary = self.evaluator.run(&baseline)?.summary;
        let report = BatchReport {
            batch: 0,
            epsilon: self.agent.epsilon(),
            error: f64::NAN,
            summary,
            improved: true,
            backup: self.config.backup_every > 0,
        };
        log::info!(
            "batch 0 (untrained): mean miss distance {:.3}",
            summary.mean_miss_distance
        );
        on_batch(&report, &baseline)?;

        let mut best_batch = 0;
        let mut best_distance = summary.mean_miss_distance;
        let mut best_snapshot = baseline;
        let mut history = vec![report];
        let mut batch = 1;

        for episode in 1..=self.config.max_episodes {
            let mut steps = 0usize;
            while !self.board.is_done() {
                self.board.step_with(&mut [&mut self.agent]);
                steps += 1;
            }
            log::trace!(
                "episode {episode}: {} hits in {steps} steps",
                self.agent.hit_count()
            );
            self.board.reset();
            self.agent.start_episode(self.board.state());

            if episode % self.config.episodes_per_batch == 0 {
                let error = self.agent.commit_batch()?;
                let snapshot = self.agent.snapshot();
                let summary = self.evaluator.run(&snapshot)?.summary;
                let improved = summary.mean_miss_distance < best_distance;
                let report = BatchReport {
                    batch,
                    epsilon: self.agent.epsilon(),
                    error,
                    summary,
                    improved,
                    backup: self.config.backup_every > 0 && batch % self.config.backup_every == 0,
                };
                log::info!(
                    "batch {batch}: epsilon {:.3}, error {:.3}, mean miss distance {:.3}{}",
                    report.epsilon,
                    error,
                    summary.mean_miss_distance,
                    if improved { " (best)" } else { "" }
                );
                on_batch(&report, &snapshot)?;
                if improved {
                    best_batch = batch;
                    best_distance = summary.mean_miss_distance;
                    best_snapshot = snapshot;
                }
                history.push(report);
                batch += 1;
            }

            self.agent
                .set_epsilon(annealed_epsilon(&self.config, episode));
        }

        Ok(TrainingOutcome {
            best_batch,
            best_snapshot,
            history,
        })
    }
}
