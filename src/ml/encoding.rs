use burn::tensor::{Tensor, TensorData, backend::Backend};

use crate::side::Side;
use crate::state::BoardState;

/// Paddle accelerations an agent may command.
pub const ACTIONS: [f64; 3] = [-0.25, 0.0, 0.25];

/// Own paddle (Y, velocity, acceleration), ball (X, Y, velocity X, velocity Y), action.
pub const FEATURES: usize = 8;

pub type Features = [f32; FEATURES];

pub struct StateEncoder;

impl StateEncoder {
    /// Joint state/action input for the value function, in raw board units.
    pub fn encode(state: &BoardState, side: Side, action: f64) -> Features {
        let paddle = state.paddle(side);
        let ball = &state.ball;
        [
            paddle.y as f32,
            paddle.velocity as f32,
            paddle.acceleration as f32,
            ball.position.x as f32,
            ball.position.y as f32,
            ball.velocity.x as f32,
            ball.velocity.y as f32,
            action as f32,
        ]
    }

    pub fn encode_tensor<B>(features: &Features) -> Tensor<B, 2>
    where
        B: Backend,
        B::Device: Default,
    {
        let data = TensorData::from([*features]);
        Tensor::<B, 2>::from_data(data, &B::Device::default())
    }

    pub fn batch_tensor<B>(rows: &[Features]) -> Tensor<B, 2>
    where
        B: Backend,
        B::Device: Default,
    {
        let flat: Vec<f32> = rows.iter().flat_map(|row| row.iter().copied()).collect();
        Tensor::<B, 2>::from_data(
            TensorData::new(flat, [rows.len(), FEATURES]),
            &B::Device::default(),
        )
    }
}
