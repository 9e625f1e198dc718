use burn::module::Module;
use burn::nn::{Linear, LinearConfig};
use burn::tensor::Tensor;
use burn::tensor::activation::relu;
use burn::tensor::backend::Backend;

use super::encoding::FEATURES;
use crate::error::AgentError;

/// Hidden layer widths of the default value network.
pub const DEFAULT_HIDDEN: [usize; 6] = [21, 14, 7, 5, 4, 3];

/// Scalar Q(s, a) regressor: a tapering MLP with a linear output.
#[derive(Module, Debug)]
pub struct ValueNetwork<B: Backend> {
    stack: Vec<Linear<B>>,
    output: Linear<B>,
}

impl<B> ValueNetwork<B>
where
    B: Backend,
    B::Device: Default,
{
    /// Builds a freshly initialised network. Every hidden width must be non-zero.
    pub fn new(hidden: &[usize]) -> Result<Self, AgentError> {
        if hidden.is_empty() || hidden.contains(&0) {
            return Err(AgentError::InvalidConfiguration(
                "value network needs non-empty hidden layers",
            ));
        }
        Ok(Self::build(hidden))
    }

    pub fn default() -> Self {
        Self::build(&DEFAULT_HIDDEN)
    }

    fn build(hidden: &[usize]) -> Self {
        let device = B::Device::default();
        let mut stack = Vec::with_capacity(hidden.len());
        let mut input_size = FEATURES;
        for &width in hidden {
            stack.push(LinearConfig::new(input_size, width).init(&device));
            input_size = width;
        }
        let output = LinearConfig::new(input_size, 1)
            .with_bias(false)
            .init(&device);
        Self { stack, output }
    }

    /// `[batch, FEATURES]` in, `[batch, 1]` out.
    pub fn forward(&self, input: Tensor<B, 2>) -> Tensor<B, 2> {
        let mut activations = input;
        for layer in &self.stack {
            activations = symmetric_log(layer.forward(activations));
        }
        self.output.forward(activations)
    }
}

/// `sign(x) * ln(1 + |x|)`, written with `relu` so both halves stay differentiable.
fn symmetric_log<B: Backend>(x: Tensor<B, 2>) -> Tensor<B, 2> {
    let positive = relu(x.clone()).add_scalar(1.0).log();
    let negative = relu(-x).add_scalar(1.0).log();
    positive - negative
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::tensor::TensorData;
    use burn_ndarray::NdArray;

    type Backend = NdArray<f32>;

    #[test]
    fn forward_produces_one_value_per_row() {
        let network = ValueNetwork::<Backend>::default();
        let input = Tensor::<Backend, 2>::zeros([4, FEATURES], &Default::default());
        let output = network.forward(input);
        assert_eq!(output.shape().dims, [4, 1]);
    }

    #[test]
    fn empty_or_zero_width_layers_are_rejected() {
        assert!(matches!(
            ValueNetwork::<Backend>::new(&[]),
            Err(AgentError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            ValueNetwork::<Backend>::new(&[8, 0, 4]),
            Err(AgentError::InvalidConfiguration(_))
        ));
        assert!(ValueNetwork::<Backend>::new(&[8, 4]).is_ok());
    }

    #[test]
    fn symmetric_log_is_odd() {
        let input = Tensor::<Backend, 2>::from_data(
            TensorData::from([[-(std::f32::consts::E - 1.0), 0.0, std::f32::consts::E - 1.0]]),
            &Default::default(),
        );
        let values = symmetric_log(input)
            .into_data()
            .to_vec::<f32>()
            .expect("tensor conversion");
        assert!((values[0] + 1.0).abs() < 1e-5);
        assert!(values[1].abs() < 1e-6);
        assert!((values[2] - 1.0).abs() < 1e-5);
    }
}
