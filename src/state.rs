use std::f64::consts::{FRAC_PI_2, PI};

use serde::{Deserialize, Serialize};

use crate::board::PADDLE_HEIGHT;
use crate::side::{Loser, Side};

/// Plain 2D vector used for ball kinematics.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn length(self) -> f64 {
        self.x.hypot(self.y)
    }
}

/// Vertical kinematics of one paddle.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PaddleState {
    pub present: bool,
    pub y: f64,
    pub velocity: f64,
    pub acceleration: f64,
}

impl PaddleState {
    /// Paddle parked at the vertical center of a track of the given height.
    pub fn centered(present: bool, height: f64) -> Self {
        Self {
            present,
            y: (height - PADDLE_HEIGHT) / 2.0,
            velocity: 0.0,
            acceleration: 0.0,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BallState {
    pub position: Vec2,
    pub velocity: Vec2,
    pub acceleration: Vec2,
}

/// Complete, listener-free copy of a board.
///
/// Agents keep one of these as their "previous state"; it carries everything
/// the engine simulates but nothing that is wired to the outside world.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoardState {
    pub width: f64,
    pub height: f64,
    pub left: PaddleState,
    pub right: PaddleState,
    pub ball: BallState,
    pub done: bool,
    pub who_lost: Loser,
    pub left_score: u32,
    pub right_score: u32,
}

impl BoardState {
    pub fn paddle(&self, side: Side) -> &PaddleState {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }

    pub fn paddle_mut(&mut self, side: Side) -> &mut PaddleState {
        match side {
            Side::Left => &mut self.left,
            Side::Right => &mut self.right,
        }
    }

    pub fn has_paddle(&self, side: Side) -> bool {
        self.paddle(side).present
    }

    pub fn score(&self, side: Side) -> u32 {
        match side {
            Side::Left => self.left_score,
            Side::Right => self.right_score,
        }
    }

    /// Largest admissible paddle Y (the track is one unit taller than the board allows).
    pub fn paddle_limit(&self) -> f64 {
        self.height - PADDLE_HEIGHT + 1.0
    }

    /// Heading of the ball in radians, or `None` while it is not moving.
    ///
    /// Leftward headings are reported in `(PI/2, 3PI/2)`, except for a purely
    /// horizontal leftward ball which reports `-PI`.
    pub fn ball_angle(&self) -> Option<f64> {
        let Vec2 { x, y } = self.ball.velocity;
        if x == 0.0 {
            return if y > 0.0 {
                Some(FRAC_PI_2)
            } else if y < 0.0 {
                Some(-FRAC_PI_2)
            } else {
                None
            };
        }
        if y == 0.0 {
            return Some(if x > 0.0 { 0.0 } else { -PI });
        }
        let raw = (y / x).atan();
        Some(if x > 0.0 { raw } else { raw + PI })
    }
}
