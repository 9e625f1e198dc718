use std::path::Path;

use burn::module::AutodiffModule;
use burn::optim::adaptor::OptimizerAdaptor;
use burn::optim::{Adam, AdamConfig, GradientsParams, LearningRate, Optimizer};
use burn::tensor::backend::{AutodiffBackend, Backend};
use burn::tensor::{Tensor, TensorData};

use super::approximator::{Approximator, ValueFunction};
use super::checkpoint::{NetworkMetadata, ValueCheckpoint, ValueSnapshot, predict_with};
use super::encoding::{FEATURES, Features, StateEncoder};
use super::network::{DEFAULT_HIDDEN, ValueNetwork};
use crate::error::AgentError;

pub const DEFAULT_LEARNING_RATE: f64 = 1.0e-3;

/// One labelled transition: Q(s, a) should move towards `target`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ActionSample {
    pub features: Features,
    pub target: f32,
}

impl ActionSample {
    pub fn new(features: Features, target: f64) -> Self {
        Self {
            features,
            target: target as f32,
        }
    }
}

/// Samples accumulated between two batch commits. Order carries no meaning.
#[derive(Default, Clone, Debug)]
pub struct SampleSet {
    samples: Vec<ActionSample>,
}

impl SampleSet {
    pub fn new() -> Self {
        Self {
            samples: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[ActionSample] {
        &self.samples
    }

    pub fn push(&mut self, sample: ActionSample) {
        self.samples.push(sample);
    }
}

impl From<Vec<ActionSample>> for SampleSet {
    fn from(samples: Vec<ActionSample>) -> Self {
        Self { samples }
    }
}

#[derive(Debug)]
pub struct ValueBatch<B: Backend> {
    pub features: Tensor<B, 2>,
    pub targets: Tensor<B, 2>,
}

impl<B: Backend> ValueBatch<B> {
    pub fn from_samples(samples: &[ActionSample]) -> Self {
        assert!(
            !samples.is_empty(),
            "cannot construct a value batch from an empty sample slice"
        );
        let rows: Vec<Features> = samples.iter().map(|sample| sample.features).collect();
        let targets: Vec<f32> = samples.iter().map(|sample| sample.target).collect();
        let features = StateEncoder::batch_tensor::<B>(&rows);
        let targets = Tensor::<B, 2>::from_data(
            TensorData::new(targets, [samples.len(), 1]),
            &B::Device::default(),
        );
        Self { features, targets }
    }

    pub fn sample_count(&self) -> usize {
        self.features.shape().dims[0]
    }
}

/// Burn-backed Q(s, a) regressor trained with full-batch Adam on squared error.
pub struct NeuralApproximator<B: AutodiffBackend> {
    model: ValueNetwork<B>,
    optimizer: OptimizerAdaptor<Adam, ValueNetwork<B>, B>,
    learning_rate: LearningRate,
    inference: ValueNetwork<B::InnerBackend>,
    metadata: NetworkMetadata,
}

impl<B: AutodiffBackend> NeuralApproximator<B> {
    pub fn new(hidden: &[usize], learning_rate: f64) -> Result<Self, AgentError> {
        let metadata = NetworkMetadata::new(hidden.to_vec(), learning_rate);
        Ok(Self::from_model(ValueNetwork::new(hidden)?, metadata))
    }

    pub fn from_model(model: ValueNetwork<B>, metadata: NetworkMetadata) -> Self {
        let inference = model.valid();
        Self {
            model,
            optimizer: AdamConfig::new().init(),
            learning_rate: metadata.learning_rate,
            inference,
            metadata,
        }
    }

    /// Resumes from a checkpoint. The optimizer state starts fresh.
    pub fn load(path: &Path) -> Result<Self, AgentError> {
        let checkpoint = ValueCheckpoint::read(path)?;
        let model = checkpoint.restore::<B>()?;
        Ok(Self::from_model(model, checkpoint.metadata))
    }

    pub fn metadata(&self) -> &NetworkMetadata {
        &self.metadata
    }

    pub fn train_step(&mut self, batch: &ValueBatch<B>) -> f32 {
        let loss = Self::loss(&self.model, batch);
        let value = Self::tensor_to_f32(loss.clone());
        let grads = loss.backward();
        let grads = GradientsParams::from_grads(grads, &self.model);
        let model = self.model.clone();
        self.model = self.optimizer.step(self.learning_rate, model, grads);
        value
    }

    pub fn evaluate(&self, batch: &ValueBatch<B>) -> f32 {
        Self::tensor_to_f32(Self::loss(&self.model, batch))
    }

    fn loss(model: &ValueNetwork<B>, batch: &ValueBatch<B>) -> Tensor<B, 1> {
        let predictions = model.forward(batch.features.clone());
        let error = predictions - batch.targets.clone();
        (error.clone() * error).mean()
    }

    fn tensor_to_f32(tensor: Tensor<B, 1>) -> f32 {
        tensor
            .detach()
            .into_data()
            .to_vec::<f32>()
            .map(|mut values| values.pop().unwrap_or(f32::NAN))
            .unwrap_or(f32::NAN)
    }
}

impl<B: AutodiffBackend> Default for NeuralApproximator<B> {
    fn default() -> Self {
        let metadata = NetworkMetadata::new(DEFAULT_HIDDEN.to_vec(), DEFAULT_LEARNING_RATE);
        Self::from_model(ValueNetwork::default(), metadata)
    }
}

impl<B: AutodiffBackend> ValueFunction for NeuralApproximator<B> {
    fn predict(&self, features: &Features) -> f64 {
        predict_with(&self.inference, features)
    }
}

impl<B: AutodiffBackend> Approximator for NeuralApproximator<B> {
    type Snapshot = ValueSnapshot<B::InnerBackend>;

    fn train_batch(&mut self, samples: &SampleSet, iterations: usize) -> Result<f64, AgentError> {
        if samples.is_empty() {
            return Err(AgentError::EmptySampleSet);
        }
        let batch = ValueBatch::<B>::from_samples(samples.samples());
        let mut error = if iterations == 0 {
            self.evaluate(&batch)
        } else {
            f32::NAN
        };
        for _ in 0..iterations {
            error = self.train_step(&batch);
        }
        self.inference = self.model.valid();
        self.metadata.batches_trained += 1;
        self.metadata.samples_trained += samples.len();
        log::debug!(
            "fitted {} samples over {} iterations (error {:.6})",
            batch.sample_count(),
            iterations,
            error
        );
        Ok(f64::from(error))
    }

    fn snapshot(&self) -> Self::Snapshot {
        ValueSnapshot::new(self.inference.clone(), self.metadata.clone())
    }

    fn save(&self, path: &Path) -> Result<(), AgentError> {
        ValueCheckpoint::capture(&self.inference, self.metadata.clone())?.write(path)
    }
}
