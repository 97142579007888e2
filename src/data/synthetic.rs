//! Synthetic classification dataset for experiments and tests
//!
//! Provides a simple multi-class task with deterministic per-class
//! prototypes plus noise. Each sample is a flat feature vector.

use ndarray::Array1;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

/// A single sample: feature vector plus class label
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureSample {
    pub features: Array1<f32>,
    pub label: usize,
}

/// Configuration for dataset generation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyntheticConfig {
    /// Number of classes
    pub num_classes: usize,
    /// Length of each feature vector
    pub feature_dim: usize,
    /// Half-width of the uniform noise added per coordinate
    pub noise_level: f32,
    /// Samples generated per class
    pub samples_per_class: usize,
    /// Random seed for reproducibility
    pub seed: u64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            num_classes: 10,
            feature_dim: 32,
            noise_level: 0.1,
            samples_per_class: 100,
            seed: 42,
        }
    }
}

/// Canonical feature prototype for a class: strong signal on the
/// coordinates congruent to the class index, silence elsewhere.
pub fn class_prototype(class: usize, num_classes: usize, feature_dim: usize) -> Array1<f32> {
    Array1::from_shape_fn(feature_dim, |d| {
        if d % num_classes == class {
            1.0
        } else {
            0.0
        }
    })
}

/// Synthetic classification dataset
pub struct SyntheticDataset {
    pub samples: Vec<FeatureSample>,
    pub config: SyntheticConfig,
}

impl SyntheticDataset {
    /// Generate a dataset from the given config. Samples are shuffled,
    /// so any prefix mixes classes.
    pub fn generate(config: SyntheticConfig) -> Self {
        let mut rng = StdRng::seed_from_u64(config.seed);
        let mut samples =
            Vec::with_capacity(config.num_classes * config.samples_per_class);

        for class in 0..config.num_classes {
            let prototype = class_prototype(class, config.num_classes, config.feature_dim);

            for _ in 0..config.samples_per_class {
                let features = prototype.mapv(|v| {
                    let noise = rng.gen_range(-config.noise_level..=config.noise_level);
                    (v + noise).clamp(0.0, 1.0)
                });
                samples.push(FeatureSample {
                    features,
                    label: class,
                });
            }
        }

        samples.shuffle(&mut rng);

        Self { samples, config }
    }

    /// Split off a held-out set, keeping `train_ratio` of the samples
    /// on the training side. Consumes the dataset; the generation-time
    /// shuffle guarantees both halves mix classes. A ratio at or above
    /// 1.0 keeps every sample on the training side.
    pub fn split(self, train_ratio: f32) -> (Vec<FeatureSample>, Vec<FeatureSample>) {
        let cut = ((self.samples.len() as f32 * train_ratio) as usize).min(self.samples.len());
        let (train, held_out) = self.samples.split_at(cut);
        (train.to_vec(), held_out.to_vec())
    }

    /// Number of samples across all classes
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True when no samples were generated
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_prototype_is_class_specific() {
        let a = class_prototype(0, 4, 16);
        let b = class_prototype(1, 4, 16);
        assert_eq!(a[0], 1.0);
        assert_eq!(a[1], 0.0);
        assert_eq!(b[1], 1.0);
        assert_ne!(a, b);
    }

    #[test]
    fn test_dataset_generation() {
        let config = SyntheticConfig {
            num_classes: 5,
            feature_dim: 8,
            noise_level: 0.05,
            samples_per_class: 12,
            seed: 7,
        };

        let dataset = SyntheticDataset::generate(config);
        assert_eq!(dataset.len(), 60);

        let seen: HashSet<usize> = dataset.samples.iter().map(|s| s.label).collect();
        assert_eq!(seen.len(), 5);
    }

    #[test]
    fn test_generation_is_deterministic() {
        let config = SyntheticConfig {
            samples_per_class: 5,
            ..Default::default()
        };

        let a = SyntheticDataset::generate(config.clone());
        let b = SyntheticDataset::generate(config);
        for (x, y) in a.samples.iter().zip(b.samples.iter()) {
            assert_eq!(x.label, y.label);
            assert_eq!(x.features, y.features);
        }
    }

    #[test]
    fn test_features_stay_in_unit_range() {
        let config = SyntheticConfig {
            noise_level: 0.5,
            samples_per_class: 20,
            ..Default::default()
        };

        let dataset = SyntheticDataset::generate(config);
        for sample in &dataset.samples {
            for &value in sample.features.iter() {
                assert!((0.0..=1.0).contains(&value));
            }
        }
    }

    #[test]
    fn test_dataset_split() {
        let config = SyntheticConfig {
            samples_per_class: 10,
            ..Default::default()
        };

        let dataset = SyntheticDataset::generate(config);
        let before = dataset.len();

        let (train, held_out) = dataset.split(0.8);
        assert_eq!(train.len() + held_out.len(), before);
        assert_eq!(train.len(), (before as f32 * 0.8) as usize);
    }

    #[test]
    fn test_split_ratio_above_one_keeps_everything() {
        let dataset = SyntheticDataset::generate(SyntheticConfig {
            samples_per_class: 4,
            ..Default::default()
        });
        let total = dataset.len();

        let (train, held_out) = dataset.split(1.5);
        assert_eq!(train.len(), total);
        assert!(held_out.is_empty());
    }

    #[test]
    fn test_shuffled_prefix_mixes_classes() {
        let dataset = SyntheticDataset::generate(SyntheticConfig::default());
        let prefix: HashSet<usize> =
            dataset.samples[..50].iter().map(|s| s.label).collect();
        assert!(prefix.len() > 1);
    }
}
