use std::path::Path;

use burn::tensor::backend::AutodiffBackend;
use rand::Rng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::board::{BALL_DIAMETER, PADDLE_HEIGHT, StepOutcome};
use crate::controller::{Decision, PaddleController};
use crate::error::AgentError;
use crate::ml::{
    ACTIONS, ActionSample, Approximator, NeuralApproximator, SampleSet, StateEncoder,
    ValueFunction,
};
use crate::side::Side;
use crate::state::BoardState;

pub const DEFAULT_HIT_CAP: usize = 2;
pub const HIT_REWARD: f64 = 10.0;
pub const MISS_PENALTY: f64 = 0.5;

/// Hyperparameters of an epsilon-greedy Q agent.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PolicyParameters {
    /// Probability of taking a random action. Usually annealed by the driver.
    pub epsilon: f64,
    pub gamma: f64,
    /// Optimizer iterations per batch commit.
    pub train_iterations: usize,
    /// Hits after which an episode is cut short. `0` disables the cap.
    pub hit_cap: usize,
    /// Record samples. When false the agent only plays.
    pub training: bool,
}

impl PolicyParameters {
    pub fn training(epsilon: f64, gamma: f64, train_iterations: usize) -> Self {
        Self {
            epsilon,
            gamma,
            train_iterations,
            hit_cap: DEFAULT_HIT_CAP,
            training: true,
        }
    }

    pub fn evaluation(epsilon: f64) -> Self {
        Self {
            epsilon,
            gamma: 0.0,
            train_iterations: 0,
            hit_cap: DEFAULT_HIT_CAP,
            training: false,
        }
    }

    pub fn with_hit_cap(mut self, hit_cap: usize) -> Self {
        self.hit_cap = hit_cap;
        self
    }

    pub fn validate(&self) -> Result<(), AgentError> {
        if !(0.0..=1.0).contains(&self.epsilon) {
            return Err(AgentError::InvalidConfiguration(
                "epsilon must be between 0 and 1",
            ));
        }
        if !self.gamma.is_finite() {
            return Err(AgentError::InvalidConfiguration("gamma must be finite"));
        }
        Ok(())
    }
}

impl Default for PolicyParameters {
    fn default() -> Self {
        Self::training(0.0, 0.9, 1)
    }
}

/// Epsilon-greedy paddle agent over a joint Q(s, a) value function.
///
/// Every observed step yields one training sample for the *previous*
/// state/action pair, bootstrapped from the value of the action chosen now.
/// The exploring branch bootstraps from the single random action it drew,
/// while the exploiting branch bootstraps from the best action it found.
pub struct QPaddleController<V, R = StdRng> {
    side: Side,
    value: V,
    samples: SampleSet,
    params: PolicyParameters,
    last_state: BoardState,
    last_action: f64,
    hits: usize,
    actions: [f64; ACTIONS.len()],
    rng: R,
}

impl<V: ValueFunction, R: Rng> QPaddleController<V, R> {
    pub fn new(
        state: &BoardState,
        side: Side,
        params: PolicyParameters,
        value: V,
        rng: R,
    ) -> Result<Self, AgentError> {
        params.validate()?;
        Ok(Self {
            side,
            value,
            samples: SampleSet::new(),
            params,
            last_state: state.clone(),
            last_action: state.paddle(side).acceleration,
            hits: 0,
            actions: ACTIONS,
            rng,
        })
    }

    /// Re-anchors the agent on a freshly reset board. Samples are kept.
    pub fn start_episode(&mut self, state: &BoardState) {
        self.last_state = state.clone();
        self.last_action = state.paddle(self.side).acceleration;
        self.hits = 0;
    }

    pub fn epsilon(&self) -> f64 {
        self.params.epsilon
    }

    pub fn set_epsilon(&mut self, epsilon: f64) {
        self.params.epsilon = epsilon;
    }

    pub fn hit_count(&self) -> usize {
        self.hits
    }

    pub fn set_hit_cap(&mut self, hit_cap: usize) {
        self.params.hit_cap = hit_cap;
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    pub fn samples(&self) -> &SampleSet {
        &self.samples
    }

    pub fn value(&self) -> &V {
        &self.value
    }

    fn reward(&mut self, state: &BoardState, outcome: StepOutcome) -> f64 {
        if state.done {
            if state.who_lost.is(self.side) {
                let paddle_y = state.paddle(self.side).y;
                let offset =
                    paddle_y - state.ball.position.y + PADDLE_HEIGHT / 2.0 - BALL_DIAMETER / 2.0;
                return -MISS_PENALTY * offset.abs();
            }
            return 0.0;
        }
        if outcome.hit(self.side) {
            self.hits += 1;
            return HIT_REWARD;
        }
        0.0
    }

    fn q(&self, state: &BoardState, action: f64) -> f64 {
        self.value.predict(&StateEncoder::encode(state, self.side, action))
    }

    /// Returns the chosen action and the value used as its bootstrap.
    fn select_action(&mut self, state: &BoardState) -> (f64, f64) {
        if self.rng.r#gen::<f64>() < self.params.epsilon {
            let index = self.rng.gen_range(0..self.actions.len());
            let action = self.actions[index];
            return (action, self.q(state, action));
        }
        self.actions.shuffle(&mut self.rng);
        let mut best: Option<(f64, f64)> = None;
        for action in self.actions {
            let q = self.q(state, action);
            match best {
                Some((_, best_q)) if q <= best_q || q.is_nan() => {}
                None if q.is_nan() => {}
                _ => best = Some((action, q)),
            }
        }
        best.unwrap_or_else(|| {
            let action = self.actions[0];
            (action, self.q(state, action))
        })
    }

    fn record(&mut self, reward: f64, next_q: f64) {
        let features = StateEncoder::encode(&self.last_state, self.side, self.last_action);
        self.samples
            .push(ActionSample::new(features, reward + self.params.gamma * next_q));
    }
}

impl<A: Approximator, R: Rng> QPaddleController<A, R> {
    /// Fits the approximator on everything gathered since the last commit.
    ///
    /// The sample set is emptied whether or not fitting succeeds.
    pub fn commit_batch(&mut self) -> Result<f64, AgentError> {
        let samples = std::mem::take(&mut self.samples);
        if samples.is_empty() {
            return Err(AgentError::EmptySampleSet);
        }
        self.value.train_batch(&samples, self.params.train_iterations)
    }

    pub fn save_approximator(&self, path: &Path) -> Result<(), AgentError> {
        self.value.save(path)
    }

    pub fn snapshot(&self) -> A::Snapshot {
        self.value.snapshot()
    }
}

impl<B: AutodiffBackend, R: Rng> QPaddleController<NeuralApproximator<B>, R> {
    /// Agent over a saved network, or over a freshly initialised one when no path is given.
    pub fn from_checkpoint(
        state: &BoardState,
        side: Side,
        params: PolicyParameters,
        checkpoint: Option<&Path>,
        rng: R,
    ) -> Result<Self, AgentError> {
        let value = match checkpoint {
            Some(path) => NeuralApproximator::load(path)?,
            None => NeuralApproximator::default(),
        };
        Self::new(state, side, params, value, rng)
    }
}

impl<V: ValueFunction, R: Rng> PaddleController for QPaddleController<V, R> {
    fn side(&self) -> Side {
        self.side
    }

    fn decide(&mut self, state: &BoardState, outcome: StepOutcome) -> Decision {
        let reward = self.reward(state, outcome);
        let cap_reached = self.params.hit_cap > 0 && self.hits >= self.params.hit_cap;
        let terminal = state.done || cap_reached;

        if self.params.training && terminal {
            self.record(reward, 0.0);
            return Decision {
                acceleration: None,
                end_episode: cap_reached,
            };
        }

        let (action, next_q) = self.select_action(state);
        if self.params.training {
            self.record(reward, next_q);
            self.last_state = state.clone();
            self.last_action = action;
        }
        Decision {
            acceleration: Some(action),
            end_episode: cap_reached,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    use crate::side::Loser;
    use crate::state::{BallState, PaddleState, Vec2};

    /// Scores each action with a fixed value, ignoring the state.
    #[derive(Clone, Copy)]
    struct ActionTable([f64; 3]);

    impl ValueFunction for ActionTable {
        fn predict(&self, features: &crate::ml::Features) -> f64 {
            let index = ACTIONS
                .iter()
                .position(|&action| action as f32 == features[7])
                .expect("known action");
            self.0[index]
        }
    }

    struct Recording {
        table: ActionTable,
        fitted: Vec<usize>,
    }

    impl ValueFunction for Recording {
        fn predict(&self, features: &crate::ml::Features) -> f64 {
            self.table.predict(features)
        }
    }

    impl Approximator for Recording {
        type Snapshot = ActionTable;

        fn train_batch(
            &mut self,
            samples: &SampleSet,
            _iterations: usize,
        ) -> Result<f64, AgentError> {
            self.fitted.push(samples.len());
            Ok(0.125)
        }

        fn snapshot(&self) -> ActionTable {
            self.table
        }

        fn save(&self, _path: &Path) -> Result<(), AgentError> {
            Ok(())
        }
    }

    fn board_state() -> BoardState {
        BoardState {
            width: 300.0,
            height: 200.0,
            left: PaddleState::centered(true, 200.0),
            right: PaddleState::centered(false, 200.0),
            ball: BallState {
                position: Vec2::new(120.0, 60.0),
                velocity: Vec2::new(-4.0, 3.0),
                acceleration: Vec2::ZERO,
            },
            done: false,
            who_lost: Loser::None,
            left_score: 0,
            right_score: 0,
        }
    }

    fn agent<V: ValueFunction>(params: PolicyParameters, value: V) -> QPaddleController<V> {
        QPaddleController::new(
            &board_state(),
            Side::Left,
            params,
            value,
            StdRng::seed_from_u64(9),
        )
        .expect("agent")
    }

    const HIT: StepOutcome = StepOutcome {
        left_hit: true,
        right_hit: false,
    };

    #[test]
    fn greedy_branch_picks_highest_value_and_bootstraps_from_it() {
        let params = PolicyParameters::training(0.0, 0.9, 1);
        let mut agent = agent(params, ActionTable([1.0, 2.0, 3.0]));
        let decision = agent.decide(&board_state(), HIT);
        assert_eq!(decision.acceleration, Some(0.25));
        assert!(!decision.end_episode);
        let sample = agent.samples().samples()[0];
        assert!((f64::from(sample.target) - (HIT_REWARD + 0.9 * 3.0)).abs() < 1e-5);
        assert_eq!(agent.hit_count(), 1);
    }

    #[test]
    fn exploring_branch_bootstraps_from_the_drawn_action() {
        let table = ActionTable([-1.0, 5.0, 2.0]);
        let mut agent = agent(PolicyParameters::training(1.0, 0.5, 1), table);
        for _ in 0..12 {
            let decision = agent.decide(&board_state(), StepOutcome::default());
            let action = decision.acceleration.expect("action");
            let index = ACTIONS.iter().position(|&a| a == action).unwrap();
            let target = agent.samples().samples().last().unwrap().target;
            assert!((f64::from(target) - 0.5 * table.0[index]).abs() < 1e-6);
        }
    }

    #[test]
    fn loss_on_own_side_is_penalised_by_distance() {
        let params = PolicyParameters::training(0.0, 0.9, 1);
        let mut agent = agent(params, ActionTable([0.0; 3]));
        let mut state = board_state();
        state.done = true;
        state.who_lost = Loser::Left;
        state.left.y = 100.0;
        state.ball.position.y = 20.0;
        let decision = agent.decide(&state, StepOutcome::default());
        assert_eq!(decision.acceleration, None);
        assert_eq!(agent.sample_count(), 1);
        assert_eq!(agent.samples().samples()[0].target, -50.5);
    }

    #[test]
    fn opponent_loss_gives_no_reward() {
        let params = PolicyParameters::training(0.0, 0.9, 1);
        let mut agent = agent(params, ActionTable([7.0; 3]));
        let mut state = board_state();
        state.done = true;
        state.who_lost = Loser::Right;
        agent.decide(&state, HIT);
        assert_eq!(agent.samples().samples()[0].target, 0.0);
        assert_eq!(agent.hit_count(), 0);
    }

    #[test]
    fn hit_cap_truncates_on_the_capping_hit() {
        let params = PolicyParameters::training(0.0, 0.9, 1).with_hit_cap(2);
        let mut agent = agent(params, ActionTable([0.0, 1.0, 0.0]));
        let first = agent.decide(&board_state(), HIT);
        assert!(!first.end_episode);
        let second = agent.decide(&board_state(), HIT);
        assert!(second.end_episode);
        assert_eq!(second.acceleration, None);
        assert_eq!(agent.samples().samples()[1].target, HIT_REWARD as f32);
    }

    #[test]
    fn evaluation_mode_records_nothing_but_still_steers() {
        let params = PolicyParameters::evaluation(0.0);
        let mut agent = agent(params, ActionTable([3.0, 1.0, 2.0]));
        let mut state = board_state();
        assert_eq!(
            agent.decide(&state, StepOutcome::default()).acceleration,
            Some(-0.25)
        );
        state.done = true;
        state.who_lost = Loser::Left;
        assert_eq!(
            agent.decide(&state, StepOutcome::default()).acceleration,
            Some(-0.25)
        );
        assert_eq!(agent.sample_count(), 0);
    }

    #[test]
    fn samples_reference_the_previous_state_and_action() {
        let params = PolicyParameters::training(0.0, 0.9, 1);
        let mut agent = agent(params, ActionTable([0.0, 0.0, 1.0]));
        let mut first = board_state();
        first.ball.position.x = 111.0;
        agent.decide(&first, StepOutcome::default());
        let mut second = board_state();
        second.ball.position.x = 107.0;
        agent.decide(&second, StepOutcome::default());
        let samples = agent.samples().samples();
        assert_eq!(samples[0].features[3], 120.0);
        assert_eq!(samples[0].features[7], 0.0);
        assert_eq!(samples[1].features[3], 111.0);
        assert_eq!(samples[1].features[7], 0.25);
    }

    #[test]
    fn nan_values_fall_back_to_first_shuffled_action() {
        let params = PolicyParameters::evaluation(0.0);
        let mut agent = agent(params, ActionTable([f64::NAN; 3]));
        let decision = agent.decide(&board_state(), StepOutcome::default());
        assert!(decision.acceleration.is_some());
    }

    #[test]
    fn commit_batch_trains_on_everything_and_clears() {
        let recording = Recording {
            table: ActionTable([0.0; 3]),
            fitted: Vec::new(),
        };
        let mut agent = agent(PolicyParameters::training(0.5, 0.9, 4), recording);
        assert!(matches!(agent.commit_batch(), Err(AgentError::EmptySampleSet)));
        for _ in 0..5 {
            agent.decide(&board_state(), StepOutcome::default());
        }
        agent.start_episode(&board_state());
        agent.decide(&board_state(), StepOutcome::default());
        assert_eq!(agent.sample_count(), 6);
        assert_eq!(agent.commit_batch().expect("commit"), 0.125);
        assert_eq!(agent.sample_count(), 0);
        assert_eq!(agent.value().fitted, vec![6]);
    }

    #[test]
    fn start_episode_resets_hits() {
        let params = PolicyParameters::training(0.0, 0.9, 1).with_hit_cap(0);
        let mut agent = agent(params, ActionTable([0.0; 3]));
        agent.decide(&board_state(), HIT);
        agent.decide(&board_state(), HIT);
        assert_eq!(agent.hit_count(), 2);
        agent.start_episode(&board_state());
        assert_eq!(agent.hit_count(), 0);
        assert_eq!(agent.sample_count(), 2);
    }

    #[test]
    fn raised_hit_cap_applies_mid_episode() {
        let params = PolicyParameters::training(0.0, 0.9, 1).with_hit_cap(0);
        let mut agent = agent(params, ActionTable([0.0; 3]));
        assert!(!agent.decide(&board_state(), HIT).end_episode);
        assert!(!agent.decide(&board_state(), HIT).end_episode);
        agent.set_hit_cap(3);
        let capped = agent.decide(&board_state(), HIT);
        assert!(capped.end_episode);
        assert_eq!(capped.acceleration, None);
        assert_eq!(agent.hit_count(), 3);
    }

    #[test]
    fn lowered_hit_cap_ends_on_the_next_step() {
        let params = PolicyParameters::evaluation(0.0).with_hit_cap(10);
        let mut agent = agent(params, ActionTable([0.0, 1.0, 0.0]));
        agent.decide(&board_state(), HIT);
        agent.decide(&board_state(), HIT);
        agent.set_hit_cap(2);
        let decision = agent.decide(&board_state(), StepOutcome::default());
        assert!(decision.end_episode);
        assert_eq!(decision.acceleration, Some(0.0));
    }

    #[test]
    fn saved_approximator_reloads_with_the_same_values() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("agent.bin");
        let agent = agent(
            PolicyParameters::training(0.1, 0.9, 1),
            crate::DefaultApproximator::default(),
        );
        agent.save_approximator(&path).expect("save");

        let restored = crate::DefaultApproximator::load(&path).expect("load");
        let state = board_state();
        for action in ACTIONS {
            let features = StateEncoder::encode(&state, Side::Left, action);
            assert_eq!(restored.predict(&features), agent.value().predict(&features));
        }
        assert_eq!(restored.metadata(), agent.value().metadata());
    }

    #[test]
    fn rejects_out_of_range_epsilon() {
        let result = QPaddleController::new(
            &board_state(),
            Side::Left,
            PolicyParameters::training(1.5, 0.9, 1),
            ActionTable([0.0; 3]),
            StdRng::seed_from_u64(1),
        );
        assert!(matches!(result, Err(AgentError::InvalidConfiguration(_))));
    }
}
