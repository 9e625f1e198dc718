use std::path::Path;

use super::encoding::Features;
use super::training::SampleSet;
use crate::error::AgentError;

/// Anything that can score a joint state/action feature vector.
pub trait ValueFunction {
    fn predict(&self, features: &Features) -> f64;
}

impl<T: ValueFunction + ?Sized> ValueFunction for &T {
    fn predict(&self, features: &Features) -> f64 {
        (**self).predict(features)
    }
}

/// A value function that can be fitted in batches and frozen into snapshots.
pub trait Approximator: ValueFunction {
    /// Immutable copy of the current fit. Later training never alters it.
    type Snapshot: ValueFunction + Clone;

    /// Fits the whole sample set `iterations` times and returns the final error.
    fn train_batch(&mut self, samples: &SampleSet, iterations: usize) -> Result<f64, AgentError>;

    fn snapshot(&self) -> Self::Snapshot;

    fn save(&self, path: &Path) -> Result<(), AgentError>;
}
