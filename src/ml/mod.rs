use burn_autodiff::Autodiff;
use burn_ndarray::NdArray;

pub mod approximator;
pub mod checkpoint;
pub mod encoding;
pub mod network;
pub mod training;

pub use approximator::{Approximator, ValueFunction};
pub use checkpoint::{NetworkMetadata, ValueCheckpoint, ValueSnapshot};
pub use encoding::{ACTIONS, FEATURES, Features, StateEncoder};
pub use network::{DEFAULT_HIDDEN, ValueNetwork};
pub use training::{
    ActionSample, DEFAULT_LEARNING_RATE, NeuralApproximator, SampleSet, ValueBatch,
};

pub type TrainBackend = Autodiff<NdArray<f32>>;
pub type InferenceBackend = NdArray<f32>;
pub type DefaultApproximator = NeuralApproximator<TrainBackend>;
pub type DefaultSnapshot = ValueSnapshot<InferenceBackend>;
