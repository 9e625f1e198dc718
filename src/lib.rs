//! Pong physics engine with a self-training Q-learning paddle agent.

pub mod board;
pub mod controller;
pub mod controllers;
pub mod error;
pub mod evaluation;
pub mod logging;
pub mod ml;
pub mod session;
pub mod side;
pub mod state;
pub mod visualize;

pub use crate::board::{
    BALL_DIAMETER, BALL_SPEED, Board, BoardBuilder, BoardConfig, DT, PADDLE_HEIGHT,
    PADDLE_MAX_SPEED, PADDLE_WALL_SPEED_LOSS, PADDLE_WIDTH, StepListener, StepOutcome,
};
pub use crate::controller::{Decision, PaddleController};
pub use crate::controllers::{Direction, HumanController, PolicyParameters, QPaddleController};
pub use crate::error::{AgentError, BoardError};
pub use crate::evaluation::{
    EpisodeRecord, EvaluationConfig, EvaluationHarness, EvaluationReport, EvaluationSummary,
};
pub use crate::ml::{
    ACTIONS, Approximator, DefaultApproximator, DefaultSnapshot, NeuralApproximator, SampleSet,
    StateEncoder, ValueFunction, ValueSnapshot,
};
pub use crate::session::{BatchReport, TrainingConfig, TrainingOutcome, TrainingSession};
pub use crate::side::{Loser, Side};
pub use crate::state::{BallState, BoardState, PaddleState, Vec2};
pub use crate::visualize::{VisualOptions, format_report, render_board, report_header};
