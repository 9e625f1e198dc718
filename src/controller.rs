use crate::board::StepOutcome;
use crate::side::Side;
use crate::state::BoardState;

/// What a controller wants done to its paddle after observing a step.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Decision {
    /// New commanded acceleration, or `None` to leave the current one in place.
    pub acceleration: Option<f64>,
    /// Freeze the board so the driver treats the episode as finished.
    pub end_episode: bool,
}

impl Decision {
    pub fn accelerate(acceleration: f64) -> Self {
        Self {
            acceleration: Some(acceleration),
            end_episode: false,
        }
    }
}

/// Interface for anything that steers a paddle.
pub trait PaddleController {
    fn side(&self) -> Side;

    fn decide(&mut self, state: &BoardState, outcome: StepOutcome) -> Decision;
}
