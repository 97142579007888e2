//! Dataset partition and synthetic data generation for active learning.

pub mod active_set;
pub mod synthetic;

pub use active_set::{ActiveDataset, PartitionSnapshot};
pub use synthetic::{FeatureSample, SyntheticConfig, SyntheticDataset};
