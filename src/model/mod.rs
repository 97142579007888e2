//! Model capability traits for the active-learning loop.
//!
//! The loop driver never sees a concrete model type. A model participates
//! by implementing the independent capabilities it actually has:
//! [`Trainable`] for fitting on the labelled set, [`Evaluable`] for held-out
//! evaluation, [`UncertaintySampler`] for stochastic multi-sample pool
//! inference, and [`Restorable`] for the weight-reset policy. Each
//! capability is testable on its own, and fixtures in tests implement only
//! what they need plus trivial stubs for the rest.

pub mod softmax;

use anyhow::Result;
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::config::ReplicationMode;

pub use softmax::{ClassifierConfig, SoftmaxClassifier, WeightsSnapshot};

/// Loss and accuracy for one fit or evaluation pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub loss: f32,
    pub accuracy: f32,
}

impl Metrics {
    pub fn new(loss: f32, accuracy: f32) -> Self {
        Self { loss, accuracy }
    }
}

/// Stochastic prediction outputs for a single pool item.
///
/// One row per stochastic forward pass, one column per class; rows are
/// probability distributions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionSamples {
    pub probs: Array2<f32>,
}

impl PredictionSamples {
    pub fn new(probs: Array2<f32>) -> Self {
        Self { probs }
    }

    /// Number of stochastic passes captured.
    pub fn num_samples(&self) -> usize {
        self.probs.nrows()
    }

    /// Number of classes in each distribution.
    pub fn num_classes(&self) -> usize {
        self.probs.ncols()
    }

    /// Mean predictive distribution across the stochastic passes.
    pub fn mean_probs(&self) -> Array1<f32> {
        let n = self.probs.nrows().max(1) as f32;
        self.probs.sum_axis(Axis(0)) / n
    }

    /// Most likely class for each stochastic pass.
    pub fn sample_argmaxes(&self) -> Vec<usize> {
        self.probs
            .rows()
            .into_iter()
            .map(|row| {
                row.iter()
                    .enumerate()
                    .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
                    .map(|(idx, _)| idx)
                    .unwrap_or(0)
            })
            .collect()
    }
}

/// Models that can be fit on a labelled sample set.
pub trait Trainable<S> {
    /// Fit on the given labelled samples, returning metrics for the pass.
    fn fit(&mut self, labelled: &[&S]) -> Result<Metrics>;
}

/// Models that can be scored against a held-out sample set.
pub trait Evaluable<S> {
    /// Evaluate on the given held-out samples without updating weights.
    fn evaluate(&self, held_out: &[&S]) -> Result<Metrics>;
}

/// Models that support stochastic multi-sample prediction over a pool.
pub trait UncertaintySampler<S> {
    /// Run `mc_iterations` stochastic forward passes over every pool item,
    /// returning one [`PredictionSamples`] per item in pool order.
    fn sample_predictions(
        &self,
        pool: &[&S],
        mc_iterations: usize,
        replication: ReplicationMode,
    ) -> Result<Vec<PredictionSamples>>;
}

/// Models whose weights can be captured and restored in memory.
///
/// Backs the loop's weight-reset policy: the driver snapshots the freshly
/// initialized model once and restores it before each step's fit.
pub trait Restorable {
    type Snapshot: Clone;

    /// Capture the current weights.
    fn snapshot(&self) -> Self::Snapshot;

    /// Replace the current weights with a previously captured snapshot.
    fn restore(&mut self, snapshot: &Self::Snapshot);
}
