use std::f64::consts::PI;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::controller::{Decision, PaddleController};
use crate::error::BoardError;
use crate::side::{Loser, Side};
use crate::state::{BallState, BoardState, PaddleState, Vec2};

pub const PADDLE_WIDTH: f64 = 10.0;
pub const PADDLE_HEIGHT: f64 = 50.0;
pub const BALL_DIAMETER: f64 = 8.0;
pub const PADDLE_MAX_SPEED: f64 = 5.0;
/// Fraction of speed lost when a paddle runs into either end of its track.
pub const PADDLE_WALL_SPEED_LOSS: f64 = 1.0;
pub const BALL_SPEED: f64 = 5.0;
pub const DT: f64 = 1.0;

const SPAWN_MIN_ANGLE: f64 = 2.0 * PI / 3.0;
const SPAWN_MAX_ANGLE: f64 = 4.0 * PI / 3.0;

/// Paddle contacts registered during one step.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct StepOutcome {
    pub left_hit: bool,
    pub right_hit: bool,
}

impl StepOutcome {
    pub fn hit(&self, side: Side) -> bool {
        match side {
            Side::Left => self.left_hit,
            Side::Right => self.right_hit,
        }
    }
}

/// Passive observer notified after every simulated step.
pub trait StepListener {
    fn on_step(&mut self, state: &BoardState, outcome: StepOutcome);
}

impl<F> StepListener for F
where
    F: FnMut(&BoardState, StepOutcome),
{
    fn on_step(&mut self, state: &BoardState, outcome: StepOutcome) {
        self(state, outcome)
    }
}

/// Configuration required to bootstrap a board.
#[derive(Clone, Copy, Debug)]
pub struct BoardConfig {
    pub width: f64,
    pub height: f64,
    pub left_paddle: bool,
    pub right_paddle: bool,
    /// Seed for ball placement. `None` draws from OS entropy.
    pub seed: Option<u64>,
}

impl BoardConfig {
    pub fn new(
        width: f64,
        height: f64,
        left_paddle: bool,
        right_paddle: bool,
    ) -> Result<Self, BoardError> {
        let config = Self {
            width,
            height,
            left_paddle,
            right_paddle,
            seed: None,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), BoardError> {
        if !self.width.is_finite() || self.width <= 0.0 {
            return Err(BoardError::InvalidConfiguration("width must be positive"));
        }
        if !self.height.is_finite() || self.height <= 0.0 {
            return Err(BoardError::InvalidConfiguration("height must be positive"));
        }
        Ok(())
    }
}

/// Builder that enables seeded boards for tests and reproducible training.
pub struct BoardBuilder {
    config: BoardConfig,
}

impl BoardBuilder {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            config: BoardConfig {
                width,
                height,
                left_paddle: true,
                right_paddle: true,
                seed: None,
            },
        }
    }

    pub fn with_paddles(mut self, left: bool, right: bool) -> Self {
        self.config.left_paddle = left;
        self.config.right_paddle = right;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    pub fn build(self) -> Result<Board, BoardError> {
        Board::from_config(self.config)
    }
}

/// Deterministic, step-driven two-paddle physics engine.
pub struct Board {
    state: BoardState,
    listeners: Vec<Box<dyn StepListener>>,
    rng: StdRng,
}

impl Board {
    /// Board with unseeded randomness.
    pub fn new(
        width: f64,
        height: f64,
        left_paddle: bool,
        right_paddle: bool,
    ) -> Result<Self, BoardError> {
        Self::from_config(BoardConfig::new(width, height, left_paddle, right_paddle)?)
    }

    pub fn builder(width: f64, height: f64) -> BoardBuilder {
        BoardBuilder::new(width, height)
    }

    pub fn from_config(config: BoardConfig) -> Result<Self, BoardError> {
        config.validate()?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let placeholder = BallState {
            position: Vec2::ZERO,
            velocity: Vec2::ZERO,
            acceleration: Vec2::ZERO,
        };
        let mut board = Board {
            state: BoardState {
                width: config.width,
                height: config.height,
                left: PaddleState::centered(config.left_paddle, config.height),
                right: PaddleState::centered(config.right_paddle, config.height),
                ball: placeholder,
                done: false,
                who_lost: Loser::None,
                left_score: 0,
                right_score: 0,
            },
            listeners: Vec::new(),
            rng,
        };
        board.randomize_ball();
        Ok(board)
    }

    pub fn state(&self) -> &BoardState {
        &self.state
    }

    /// Copy of the full simulation state without the registered listeners.
    pub fn snapshot(&self) -> BoardState {
        self.state.clone()
    }

    pub fn width(&self) -> f64 {
        self.state.width
    }

    pub fn height(&self) -> f64 {
        self.state.height
    }

    pub fn has_paddle(&self, side: Side) -> bool {
        self.state.has_paddle(side)
    }

    pub fn paddle(&self, side: Side) -> &PaddleState {
        self.state.paddle(side)
    }

    pub fn ball(&self) -> &BallState {
        &self.state.ball
    }

    pub fn is_done(&self) -> bool {
        self.state.done
    }

    pub fn who_lost(&self) -> Loser {
        self.state.who_lost
    }

    pub fn score(&self, side: Side) -> u32 {
        self.state.score(side)
    }

    /// Commands a paddle. Acceleration is the only input a live episode accepts.
    pub fn set_paddle_acceleration(&mut self, side: Side, acceleration: f64) {
        self.state.paddle_mut(side).acceleration = acceleration;
    }

    /// Freezes the board without assigning a loser.
    pub fn end_episode(&mut self) {
        self.state.done = true;
    }

    pub fn apply_decision(&mut self, side: Side, decision: Decision) {
        if decision.end_episode {
            self.end_episode();
        }
        if let Some(acceleration) = decision.acceleration {
            self.set_paddle_acceleration(side, acceleration);
        }
    }

    pub fn add_listener<L>(&mut self, listener: L)
    where
        L: StepListener + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    /// Advances the simulation by `DT`.
    ///
    /// Returns `None` without touching anything when the board is already
    /// terminal. A loss on the left short-circuits the right-hand check.
    pub fn step(&mut self) -> Option<StepOutcome> {
        if self.state.done {
            return None;
        }
        let mut outcome = StepOutcome::default();
        let height = self.state.height;

        for paddle in [&mut self.state.left, &mut self.state.right] {
            clamp_speed(paddle);
            bounce_off_track_ends(paddle, height);
            paddle.velocity += paddle.acceleration * DT;
            paddle.y += paddle.velocity * DT;
        }

        let ball = self.state.ball;
        if ball.position.x < PADDLE_WIDTH {
            if self.blocks(Side::Left) {
                self.state.ball.velocity.x = -self.state.ball.velocity.x;
                outcome.left_hit = true;
            } else {
                self.record_loss(Side::Left);
                self.notify(outcome);
                return Some(outcome);
            }
        }

        if ball.position.x + BALL_DIAMETER > self.state.width - PADDLE_WIDTH {
            if self.blocks(Side::Right) {
                self.state.ball.velocity.x = -self.state.ball.velocity.x;
                outcome.right_hit = true;
            } else {
                self.record_loss(Side::Right);
                self.notify(outcome);
                return Some(outcome);
            }
        }

        let ball = &mut self.state.ball;
        if ball.position.y <= 0.0 || ball.position.y >= height - BALL_DIAMETER {
            ball.velocity.y = -ball.velocity.y;
        }
        if ball.position.x <= 0.0 || ball.position.x >= self.state.width - BALL_DIAMETER {
            ball.velocity.x = -ball.velocity.x;
        }
        ball.velocity.x += ball.acceleration.x * DT;
        ball.velocity.y += ball.acceleration.y * DT;
        ball.position.x += ball.velocity.x * DT;
        ball.position.y += ball.velocity.y * DT;

        self.notify(outcome);
        Some(outcome)
    }

    /// Runs one step, then lets each controller react in order.
    ///
    /// Controllers are skipped when the board was already terminal.
    pub fn step_with(
        &mut self,
        controllers: &mut [&mut dyn PaddleController],
    ) -> Option<StepOutcome> {
        let outcome = self.step()?;
        for controller in controllers.iter_mut() {
            let decision = controller.decide(&self.state, outcome);
            self.apply_decision(controller.side(), decision);
        }
        Some(outcome)
    }

    /// Re-centers both paddles and re-spawns the ball. Scores are kept.
    pub fn reset(&mut self) {
        let height = self.state.height;
        self.state.left = PaddleState::centered(self.state.left.present, height);
        self.state.right = PaddleState::centered(self.state.right.present, height);
        self.randomize_ball();
        self.state.done = false;
        self.state.who_lost = Loser::None;
    }

    pub fn reset_scores(&mut self) {
        self.state.left_score = 0;
        self.state.right_score = 0;
    }

    /// Spawns the ball right of center heading into the leftward cone
    /// `[2PI/3, 4PI/3]`, which favors training the left paddle.
    pub fn randomize_ball(&mut self) {
        let width = self.state.width;
        let height = self.state.height;
        let x = width / 2.0 + self.rng.r#gen::<f64>() * (width / 2.0 - BALL_DIAMETER - PADDLE_WIDTH);
        let y = self.rng.r#gen::<f64>() * (height - BALL_DIAMETER);
        let angle =
            SPAWN_MIN_ANGLE + self.rng.r#gen::<f64>() * (SPAWN_MAX_ANGLE - SPAWN_MIN_ANGLE);
        self.state.ball = BallState {
            position: Vec2::new(x, y),
            velocity: Vec2::new(BALL_SPEED * angle.cos(), BALL_SPEED * angle.sin()),
            acceleration: Vec2::ZERO,
        };
    }

    fn blocks(&self, side: Side) -> bool {
        let paddle = self.state.paddle(side);
        if !paddle.present {
            return true;
        }
        let ball_y = self.state.ball.position.y;
        ball_y + BALL_DIAMETER >= paddle.y && ball_y <= paddle.y + PADDLE_HEIGHT
    }

    fn record_loss(&mut self, side: Side) {
        self.state.done = true;
        self.state.who_lost = side.as_loser();
        let winner = side.opponent();
        if self.state.has_paddle(winner) {
            match winner {
                Side::Left => self.state.left_score += 1,
                Side::Right => self.state.right_score += 1,
            }
        }
    }

    fn notify(&mut self, outcome: StepOutcome) {
        for listener in self.listeners.iter_mut() {
            listener.on_step(&self.state, outcome);
        }
    }
}

fn clamp_speed(paddle: &mut PaddleState) {
    if paddle.velocity >= PADDLE_MAX_SPEED {
        paddle.velocity = PADDLE_MAX_SPEED;
    } else if paddle.velocity <= -PADDLE_MAX_SPEED {
        paddle.velocity = -PADDLE_MAX_SPEED;
    }
}

fn bounce_off_track_ends(paddle: &mut PaddleState, height: f64) {
    let limit = height - PADDLE_HEIGHT + 1.0;
    if paddle.y < 0.0 {
        paddle.y = 0.0;
        paddle.velocity *= -(1.0 - PADDLE_WALL_SPEED_LOSS);
    }
    if paddle.y > limit {
        paddle.y = limit;
        paddle.velocity *= -(1.0 - PADDLE_WALL_SPEED_LOSS);
    }
}
