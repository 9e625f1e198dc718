use crate::board::StepOutcome;
use crate::controller::{Decision, PaddleController};
use crate::side::Side;
use crate::state::BoardState;

pub const ACCELERATION_MAGNITUDE: f64 = 0.25;

/// Direction a human is currently holding.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Direction {
    Up,
    Down,
}

/// Paddle driven by press/release input from whatever front end owns the keyboard.
#[derive(Clone, Debug)]
pub struct HumanController {
    side: Side,
    acceleration: f64,
}

impl HumanController {
    pub fn new(side: Side) -> Self {
        Self {
            side,
            acceleration: 0.0,
        }
    }

    pub fn press(&mut self, direction: Direction) {
        self.acceleration = match direction {
            Direction::Up => -ACCELERATION_MAGNITUDE,
            Direction::Down => ACCELERATION_MAGNITUDE,
        };
    }

    pub fn release(&mut self) {
        self.acceleration = 0.0;
    }

    pub fn acceleration(&self) -> f64 {
        self.acceleration
    }
}

impl PaddleController for HumanController {
    fn side(&self) -> Side {
        self.side
    }

    fn decide(&mut self, _state: &BoardState, _outcome: StepOutcome) -> Decision {
        Decision::accelerate(self.acceleration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Board;

    #[test]
    fn held_key_drives_paddle() {
        let mut board = Board::builder(300.0, 200.0)
            .with_paddles(true, true)
            .with_seed(3)
            .build()
            .expect("board");
        let mut human = HumanController::new(Side::Right);
        human.press(Direction::Up);
        board.step_with(&mut [&mut human]);
        assert_eq!(board.paddle(Side::Right).acceleration, -ACCELERATION_MAGNITUDE);
        human.release();
        board.step_with(&mut [&mut human]);
        assert_eq!(board.paddle(Side::Right).acceleration, 0.0);
    }
}
