//! # Active Learning Core
//!
//! A deterministic Rust engine for pool-based active learning. A model is
//! fitted on a small labelled set, scores the unlabelled pool with
//! Monte-Carlo uncertainty sampling, and a heuristic ranks the pool so the
//! most informative items are labelled next. The loop repeats until a step
//! budget is reached or the pool runs dry.
//!
//! ## Quick Start
//!
//! ```rust
//! use active_learning_core::{
//!     ActiveDataset, ActiveLoop, ClassifierConfig, HParams, PredictiveEntropy,
//!     SoftmaxClassifier, SyntheticConfig, SyntheticDataset, Termination,
//! };
//!
//! // A small synthetic labelling problem
//! let data = SyntheticDataset::generate(SyntheticConfig {
//!     num_classes: 4,
//!     feature_dim: 16,
//!     samples_per_class: 30,
//!     ..SyntheticConfig::default()
//! });
//! let (pool, held_out) = data.split(0.8);
//!
//! let model = SoftmaxClassifier::new(ClassifierConfig {
//!     feature_dim: 16,
//!     num_classes: 4,
//!     epochs_per_fit: 2,
//!     ..ClassifierConfig::default()
//! });
//!
//! let hparams = HParams {
//!     query_size: 20,
//!     mc_iterations: 5,
//!     step_budget: 3,
//!     initial_labelled: 10,
//!     ..HParams::default()
//! };
//!
//! let mut active = ActiveLoop::new(
//!     model,
//!     PredictiveEntropy,
//!     ActiveDataset::new(pool),
//!     held_out,
//!     hparams,
//! )
//! .unwrap()
//! .with_log_every(50);
//!
//! let report = active.run().unwrap();
//! assert_eq!(report.termination, Termination::BudgetReached);
//! assert_eq!(report.steps.len(), 3);
//! ```
//!
//! ## Core Modules
//!
//! - [`config`] - Loop hyperparameters via TOML
//! - [`data`] - Labelled/pool partition and synthetic datasets
//! - [`model`] - Capability traits and the softmax baseline
//! - [`heuristics`] - Uncertainty ranking strategies
//! - [`driver`] - The active-learning state machine
//! - [`logging`] - JSON line-delimited step logging

pub mod checkpoint;
pub mod config;
pub mod data;
pub mod driver;
pub mod error;
pub mod heuristics;
pub mod logging;
pub mod model;

pub use checkpoint::{CheckpointError, Checkpointable};
pub use config::{ConfigError, HParams, ReplicationMode};
pub use data::{
    ActiveDataset, FeatureSample, PartitionSnapshot, SyntheticConfig, SyntheticDataset,
};
pub use driver::{ActiveLoop, LoopReport, LoopState, StepOutcome, StepRecord, Termination};
pub use error::{LoopError, LoopResult};
pub use heuristics::{
    margin_uncertainty, predictive_entropy, rank_by_scores, variation_ratio, Heuristic, Margin,
    PredictiveEntropy, RandomRank, VariationRatio,
};
pub use logging::{StepLogEntry, StepLogger};
pub use model::softmax::{ClassifierConfig, SoftmaxClassifier, WeightsSnapshot};
pub use model::{Evaluable, Metrics, PredictionSamples, Restorable, Trainable, UncertaintySampler};
