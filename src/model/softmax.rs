//! Reference classifier for active-learning experiments
//!
//! Implements a single-layer softmax classifier over flat feature vectors.
//! Stochastic multi-sample prediction perturbs the inputs with seeded
//! uniform noise, so repeated passes disagree more where the decision
//! boundary is close.

use anyhow::{bail, Result};
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::checkpoint::{require_version, CheckpointError, Checkpointable};
use crate::config::ReplicationMode;
use crate::data::FeatureSample;
use crate::model::{
    Evaluable, Metrics, PredictionSamples, Restorable, Trainable, UncertaintySampler,
};

const CLASSIFIER_CHECKPOINT_VERSION: u32 = 1;

/// Configuration for the classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Length of the input feature vectors
    pub feature_dim: usize,
    /// Number of output classes
    pub num_classes: usize,
    /// Number of passes over the labelled set per fit call
    pub epochs_per_fit: usize,
    /// Minibatch size
    pub batch_size: usize,
    /// SGD learning rate
    pub learning_rate: f32,
    /// Half-width of the uniform input perturbation used for stochastic prediction
    pub noise_level: f32,
    /// Random seed for weight initialization and perturbation
    pub seed: u64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            feature_dim: 32,
            num_classes: 10,
            epochs_per_fit: 5,
            batch_size: 16,
            learning_rate: 0.05,
            noise_level: 0.05,
            seed: 42,
        }
    }
}

/// In-memory capture of the classifier weights
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeightsSnapshot {
    pub w: Array2<f32>,
    pub b: Array1<f32>,
}

/// Gradients for one minibatch
#[derive(Debug, Clone)]
pub struct Gradients {
    pub dw: Array2<f32>,
    pub db: Array1<f32>,
}

#[derive(Serialize, Deserialize)]
struct ClassifierCheckpoint {
    version: u32,
    config: ClassifierConfig,
    weights: WeightsSnapshot,
}

/// Single-layer softmax classifier: Input → Output (Softmax)
pub struct SoftmaxClassifier {
    config: ClassifierConfig,
    w: Array2<f32>, // [num_classes, feature_dim]
    b: Array1<f32>, // [num_classes]
}

impl SoftmaxClassifier {
    /// Create a new classifier with seeded Xavier initialization
    pub fn new(config: ClassifierConfig) -> Self {
        let mut rng = StdRng::seed_from_u64(config.seed);

        let w_scale = (2.0 / config.feature_dim as f32).sqrt();
        let w = Array2::from_shape_fn((config.num_classes, config.feature_dim), |_| {
            (rng.gen::<f32>() - 0.5) * 2.0 * w_scale
        });

        let b = Array1::zeros(config.num_classes);

        Self { config, w, b }
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Softmax activation
    fn softmax(x: &Array1<f32>) -> Array1<f32> {
        let max = x.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
        let exp: Array1<f32> = x.mapv(|v| (v - max).exp());
        let sum: f32 = exp.sum();
        exp / sum
    }

    /// Forward pass - predict class probabilities
    pub fn forward(&self, features: &Array1<f32>) -> Array1<f32> {
        let logits = self.w.dot(features) + &self.b;
        Self::softmax(&logits)
    }

    /// Predict the most likely class
    pub fn predict(&self, features: &Array1<f32>) -> usize {
        let probs = self.forward(features);
        probs
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(idx, _)| idx)
            .unwrap_or(0)
    }

    /// Compute cross-entropy loss and gradients for a batch
    fn compute_loss(&self, batch: &[&FeatureSample]) -> (f32, Gradients) {
        let batch_size = batch.len();

        let mut dw = Array2::zeros(self.w.dim());
        let mut db = Array1::zeros(self.b.dim());
        let mut total_loss = 0.0;

        for sample in batch {
            let probs = self.forward(&sample.features);

            let loss = -probs[sample.label].max(1e-12).ln();
            total_loss += loss;

            // Derivative of softmax + cross-entropy
            let mut dz = probs;
            dz[sample.label] -= 1.0;

            for c in 0..self.config.num_classes {
                for d in 0..self.config.feature_dim {
                    dw[[c, d]] += dz[c] * sample.features[d];
                }
                db[c] += dz[c];
            }
        }

        let batch_size_f32 = batch_size.max(1) as f32;
        dw /= batch_size_f32;
        db /= batch_size_f32;
        let avg_loss = total_loss / batch_size_f32;

        (avg_loss, Gradients { dw, db })
    }

    /// Update weights using gradients
    fn update_weights(&mut self, gradients: &Gradients, learning_rate: f32) {
        self.w = &self.w - &(&gradients.dw * learning_rate);
        self.b = &self.b - &(&gradients.db * learning_rate);
    }

    fn check_dims(&self, samples: &[&FeatureSample], context: &str) -> Result<()> {
        for sample in samples {
            if sample.features.len() != self.config.feature_dim {
                bail!(
                    "feature dimension mismatch in {}: expected {}, got {}",
                    context,
                    self.config.feature_dim,
                    sample.features.len()
                );
            }
            if sample.label >= self.config.num_classes {
                bail!(
                    "label {} out of range in {}: classifier has {} classes",
                    sample.label,
                    context,
                    self.config.num_classes
                );
            }
        }
        Ok(())
    }

    /// Deterministic perturbation source for one stochastic pass.
    fn perturbation_rng(&self, iteration: usize) -> StdRng {
        StdRng::seed_from_u64(self.config.seed + (iteration as u64 + 1) * 7919)
    }

    fn sample_in_memory(&self, pool: &[&FeatureSample], mc_iterations: usize) -> Vec<Array2<f32>> {
        let n = pool.len();
        let d = self.config.feature_dim;

        // All replicas stacked iteration-major into one matrix pass.
        let mut stacked = Array2::zeros((mc_iterations * n, d));
        for t in 0..mc_iterations {
            let mut rng = self.perturbation_rng(t);
            for (i, sample) in pool.iter().enumerate() {
                for dim in 0..d {
                    let noise =
                        rng.gen::<f32>() * self.config.noise_level * 2.0 - self.config.noise_level;
                    stacked[[t * n + i, dim]] = sample.features[dim] + noise;
                }
            }
        }

        let logits = stacked.dot(&self.w.t()) + &self.b;
        let mut per_item = vec![Array2::zeros((mc_iterations, self.config.num_classes)); n];
        for t in 0..mc_iterations {
            for i in 0..n {
                let probs = Self::softmax(&logits.row(t * n + i).to_owned());
                per_item[i].row_mut(t).assign(&probs);
            }
        }
        per_item
    }

    fn sample_sequential(&self, pool: &[&FeatureSample], mc_iterations: usize) -> Vec<Array2<f32>> {
        let n = pool.len();
        let d = self.config.feature_dim;

        let mut per_item = vec![Array2::zeros((mc_iterations, self.config.num_classes)); n];
        for t in 0..mc_iterations {
            // Same draw order as the stacked path, so both modes agree.
            let mut rng = self.perturbation_rng(t);
            for (i, sample) in pool.iter().enumerate() {
                let mut noisy = sample.features.clone();
                for dim in 0..d {
                    let noise =
                        rng.gen::<f32>() * self.config.noise_level * 2.0 - self.config.noise_level;
                    noisy[dim] += noise;
                }
                let probs = self.forward(&noisy);
                per_item[i].row_mut(t).assign(&probs);
            }
        }
        per_item
    }
}

impl Trainable<FeatureSample> for SoftmaxClassifier {
    fn fit(&mut self, labelled: &[&FeatureSample]) -> Result<Metrics> {
        if labelled.is_empty() {
            bail!("cannot fit on an empty labelled set");
        }
        self.check_dims(labelled, "fit")?;

        let mut final_loss = 0.0;

        for epoch in 0..self.config.epochs_per_fit {
            // Simple deterministic shuffle based on epoch
            let mut indices: Vec<usize> = (0..labelled.len()).collect();
            indices.sort_by_key(|&i| (i + epoch * 997) % labelled.len());

            let mut epoch_loss = 0.0;
            let mut num_batches = 0;

            for batch_start in (0..labelled.len()).step_by(self.config.batch_size) {
                let batch_end = (batch_start + self.config.batch_size).min(labelled.len());
                let batch: Vec<&FeatureSample> = indices[batch_start..batch_end]
                    .iter()
                    .map(|&i| labelled[i])
                    .collect();

                let (loss, gradients) = self.compute_loss(&batch);
                epoch_loss += loss;
                num_batches += 1;

                self.update_weights(&gradients, self.config.learning_rate);
            }

            final_loss = if num_batches > 0 {
                epoch_loss / num_batches as f32
            } else {
                0.0
            };
        }

        let accuracy = compute_accuracy(self, labelled);
        Ok(Metrics::new(final_loss, accuracy))
    }
}

impl Evaluable<FeatureSample> for SoftmaxClassifier {
    fn evaluate(&self, held_out: &[&FeatureSample]) -> Result<Metrics> {
        if held_out.is_empty() {
            return Ok(Metrics::new(0.0, 0.0));
        }
        self.check_dims(held_out, "evaluate")?;

        let (loss, _) = self.compute_loss(held_out);
        let accuracy = compute_accuracy(self, held_out);
        Ok(Metrics::new(loss, accuracy))
    }
}

impl UncertaintySampler<FeatureSample> for SoftmaxClassifier {
    fn sample_predictions(
        &self,
        pool: &[&FeatureSample],
        mc_iterations: usize,
        replication: ReplicationMode,
    ) -> Result<Vec<PredictionSamples>> {
        if pool.is_empty() {
            return Ok(Vec::new());
        }
        if mc_iterations == 0 {
            bail!("mc_iterations must be >= 1 for stochastic prediction");
        }
        self.check_dims(pool, "sample_predictions")?;

        let per_item = match replication {
            ReplicationMode::InMemory => self.sample_in_memory(pool, mc_iterations),
            ReplicationMode::Sequential => self.sample_sequential(pool, mc_iterations),
        };

        Ok(per_item.into_iter().map(PredictionSamples::new).collect())
    }
}

impl Restorable for SoftmaxClassifier {
    type Snapshot = WeightsSnapshot;

    fn snapshot(&self) -> WeightsSnapshot {
        WeightsSnapshot {
            w: self.w.clone(),
            b: self.b.clone(),
        }
    }

    fn restore(&mut self, snapshot: &WeightsSnapshot) {
        self.w = snapshot.w.clone();
        self.b = snapshot.b.clone();
    }
}

impl Checkpointable for SoftmaxClassifier {
    fn save_checkpoint<P: AsRef<std::path::Path>>(&self, path: P) -> Result<(), CheckpointError> {
        let checkpoint = ClassifierCheckpoint {
            version: CLASSIFIER_CHECKPOINT_VERSION,
            config: self.config.clone(),
            weights: self.snapshot(),
        };
        Self::write_snapshot(&checkpoint, path)
    }

    fn load_checkpoint<P: AsRef<std::path::Path>>(path: P) -> Result<Self, CheckpointError> {
        let checkpoint: ClassifierCheckpoint = Self::read_snapshot(path)?;
        require_version(CLASSIFIER_CHECKPOINT_VERSION, checkpoint.version)?;

        let expected = (
            checkpoint.config.num_classes,
            checkpoint.config.feature_dim,
        );
        if checkpoint.weights.w.dim() != expected {
            return Err(CheckpointError::InvalidFormat(format!(
                "Weight shape mismatch: expected {:?}, found {:?}",
                expected,
                checkpoint.weights.w.dim()
            )));
        }
        if checkpoint.weights.b.len() != checkpoint.config.num_classes {
            return Err(CheckpointError::InvalidFormat(format!(
                "Bias length mismatch: expected {}, found {}",
                checkpoint.config.num_classes,
                checkpoint.weights.b.len()
            )));
        }

        let mut classifier = SoftmaxClassifier::new(checkpoint.config);
        classifier.restore(&checkpoint.weights);
        Ok(classifier)
    }
}

/// Compute accuracy on a sample set
fn compute_accuracy(classifier: &SoftmaxClassifier, samples: &[&FeatureSample]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let correct = samples
        .iter()
        .filter(|sample| classifier.predict(&sample.features) == sample.label)
        .count();

    correct as f32 / samples.len() as f32
}
