use std::fs;
use std::path::Path;

use burn::module::Module;
use burn::record::{BinBytesRecorder, FullPrecisionSettings, Recorder};
use burn::tensor::backend::Backend;
use serde::{Deserialize, Serialize};

use super::approximator::ValueFunction;
use super::encoding::{FEATURES, Features, StateEncoder};
use super::network::{ValueNetwork, ValueNetworkRecord};
use crate::error::AgentError;

/// Shape and provenance of a saved value network.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NetworkMetadata {
    pub hidden: Vec<usize>,
    pub learning_rate: f64,
    pub batches_trained: usize,
    pub samples_trained: usize,
}

impl NetworkMetadata {
    pub fn new(hidden: Vec<usize>, learning_rate: f64) -> Self {
        Self {
            hidden,
            learning_rate,
            batches_trained: 0,
            samples_trained: 0,
        }
    }
}

/// On-disk form: bincode envelope around Burn's binary record.
#[derive(Serialize, Deserialize)]
pub struct ValueCheckpoint {
    pub metadata: NetworkMetadata,
    pub weights: Vec<u8>,
}

impl ValueCheckpoint {
    pub fn capture<B: Backend>(
        network: &ValueNetwork<B>,
        metadata: NetworkMetadata,
    ) -> Result<Self, AgentError> {
        let record = network.clone().into_record();
        let weights = BinBytesRecorder::<FullPrecisionSettings>::new().record(record, ())?;
        Ok(Self { metadata, weights })
    }

    pub fn restore<B: Backend>(&self) -> Result<ValueNetwork<B>, AgentError> {
        let network = ValueNetwork::<B>::new(&self.metadata.hidden)?;
        let device = B::Device::default();
        let record = BinBytesRecorder::<FullPrecisionSettings>::new()
            .load::<<ValueNetwork<B> as Module<B>>::Record>(self.weights.clone(), &device)?;
        if !record_matches(&record, &self.metadata.hidden) {
            return Err(AgentError::InvalidConfiguration(
                "checkpoint weights do not match metadata",
            ));
        }
        Ok(network.load_record(record))
    }

    pub fn write(&self, path: &Path) -> Result<(), AgentError> {
        let bytes = bincode::serde::encode_to_vec(self, bincode::config::standard())?;
        fs::write(path, bytes)?;
        Ok(())
    }

    pub fn read(path: &Path) -> Result<Self, AgentError> {
        let bytes = fs::read(path)?;
        let (checkpoint, _): (ValueCheckpoint, usize) =
            bincode::serde::decode_from_slice(&bytes, bincode::config::standard())?;
        Ok(checkpoint)
    }
}

/// Frozen, inference-only value network.
#[derive(Clone, Debug)]
pub struct ValueSnapshot<B: Backend> {
    network: ValueNetwork<B>,
    metadata: NetworkMetadata,
}

impl<B: Backend> ValueSnapshot<B> {
    pub fn new(network: ValueNetwork<B>, metadata: NetworkMetadata) -> Self {
        Self { network, metadata }
    }

    pub fn load(path: &Path) -> Result<Self, AgentError> {
        let checkpoint = ValueCheckpoint::read(path)?;
        let network = checkpoint.restore::<B>()?;
        Ok(Self::new(network, checkpoint.metadata))
    }

    pub fn save(&self, path: &Path) -> Result<(), AgentError> {
        ValueCheckpoint::capture(&self.network, self.metadata.clone())?.write(path)
    }

    pub fn metadata(&self) -> &NetworkMetadata {
        &self.metadata
    }
}

impl<B: Backend> ValueFunction for ValueSnapshot<B> {
    fn predict(&self, features: &Features) -> f64 {
        predict_with(&self.network, features)
    }
}

/// Layer count and every `[d_input, d_output]` weight shape agree with `hidden`.
fn record_matches<B: Backend>(record: &ValueNetworkRecord<B>, hidden: &[usize]) -> bool {
    if record.stack.len() != hidden.len() {
        return false;
    }
    let mut input_size = FEATURES;
    for (layer, &width) in record.stack.iter().zip(hidden) {
        if layer.weight.val().dims() != [input_size, width] {
            return false;
        }
        input_size = width;
    }
    record.output.weight.val().dims() == [input_size, 1]
}

pub(crate) fn predict_with<B: Backend>(network: &ValueNetwork<B>, features: &Features) -> f64 {
    let input = StateEncoder::encode_tensor::<B>(features);
    network
        .forward(input)
        .into_data()
        .to_vec::<f32>()
        .ok()
        .and_then(|values| values.first().copied())
        .map(f64::from)
        .unwrap_or(f64::NAN)
}
