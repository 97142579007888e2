//! Loop configuration management via TOML files.
//!
//! This module provides hyperparameter parsing from TOML format with sensible
//! defaults and fail-fast validation before the loop starts.

use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use toml::Value;

use crate::error::{LoopError, LoopResult};

/// How multi-sample pool inference is executed.
///
/// `InMemory` replicates the pool batch across all stochastic samples in one
/// stacked matrix pass; `Sequential` runs one stochastic pass at a time. Both
/// modes produce identical probabilities for the same seed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplicationMode {
    InMemory,
    Sequential,
}

impl FromStr for ReplicationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in_memory" => Ok(ReplicationMode::InMemory),
            "sequential" => Ok(ReplicationMode::Sequential),
            other => Err(format!(
                "unknown replication mode '{}' (expected 'in_memory' or 'sequential')",
                other
            )),
        }
    }
}

/// Immutable hyperparameter record for one active-learning run.
///
/// Created once at startup, validated before the loop starts, read-only
/// thereafter.
///
/// # Examples
///
/// ```
/// use active_learning_core::HParams;
///
/// // Load from file, falling back to defaults
/// let hparams = HParams::load_from_file("config/active_loop.toml")
///     .unwrap_or_else(|_| HParams::default());
///
/// println!("query size: {}, budget: {}", hparams.query_size, hparams.step_budget);
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct HParams {
    /// Minibatch size used when fitting the model
    pub batch_size: usize,
    /// SGD learning rate
    pub learning_rate: f32,
    /// Number of pool items labelled per step (`k`)
    pub query_size: usize,
    /// Number of stochastic forward passes per pool item
    pub mc_iterations: usize,
    /// Execution mode for multi-sample inference
    pub replication: ReplicationMode,
    /// Maximum number of active-learning steps (`N`)
    pub step_budget: usize,
    /// Number of items labelled uniformly at random before the first step
    pub initial_labelled: usize,
    /// Restore the initial weights before each step's fit
    pub reset_weights: bool,
    /// Random seed for deterministic initialization and selection
    pub seed: u64,
}

impl HParams {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(&path)?;
        Self::from_str(&contents)
    }

    pub fn from_str(toml_str: &str) -> Result<Self, ConfigError> {
        let value: Value =
            toml::from_str(toml_str).map_err(|err| ConfigError::Parse(err.to_string()))?;
        let table = value
            .get("active_loop")
            .and_then(|v| v.as_table())
            .cloned()
            .unwrap_or_default();

        let batch_size = table
            .get("batch_size")
            .and_then(|v| v.as_integer())
            .map(|v| v.max(0) as usize)
            .unwrap_or_else(default_batch_size);

        let learning_rate = table
            .get("learning_rate")
            .and_then(|v| v.as_float())
            .map(|v| v as f32)
            .unwrap_or_else(default_learning_rate);

        let query_size = table
            .get("query_size")
            .and_then(|v| v.as_integer())
            .map(|v| v.max(0) as usize)
            .unwrap_or_else(default_query_size);

        let mc_iterations = table
            .get("mc_iterations")
            .and_then(|v| v.as_integer())
            .map(|v| v.max(0) as usize)
            .unwrap_or_else(default_mc_iterations);

        let replication = table
            .get("replication")
            .and_then(|v| v.as_str())
            .map(ReplicationMode::from_str)
            .transpose()
            .map_err(ConfigError::Parse)?
            .unwrap_or(ReplicationMode::InMemory);

        let step_budget = table
            .get("step_budget")
            .and_then(|v| v.as_integer())
            .map(|v| v.max(0) as usize)
            .unwrap_or_else(default_step_budget);

        let initial_labelled = table
            .get("initial_labelled")
            .and_then(|v| v.as_integer())
            .map(|v| v.max(0) as usize)
            .unwrap_or_else(default_initial_labelled);

        let reset_weights = table
            .get("reset_weights")
            .and_then(|v| v.as_bool())
            .unwrap_or(true);

        let seed = table
            .get("seed")
            .and_then(|v| v.as_integer())
            .map(|v| v as u64)
            .unwrap_or(42);

        let hparams = Self {
            batch_size,
            learning_rate,
            query_size,
            mc_iterations,
            replication,
            step_budget,
            initial_labelled,
            reset_weights,
            seed,
        };
        hparams
            .validate()
            .map_err(|err| ConfigError::Parse(err.to_string()))?;
        Ok(hparams)
    }

    /// Check every hyperparameter against its valid range.
    ///
    /// Called by the TOML loaders and again by the loop driver, so
    /// hand-built records fail just as fast as parsed ones.
    pub fn validate(&self) -> LoopResult<()> {
        if self.batch_size == 0 {
            return Err(LoopError::invalid_config(
                "batch_size",
                self.batch_size.to_string(),
                "must be >= 1",
            ));
        }
        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return Err(LoopError::invalid_config(
                "learning_rate",
                self.learning_rate.to_string(),
                "must be positive and finite",
            ));
        }
        if self.query_size == 0 {
            return Err(LoopError::invalid_config(
                "query_size",
                self.query_size.to_string(),
                "must be >= 1",
            ));
        }
        if self.mc_iterations == 0 {
            return Err(LoopError::invalid_config(
                "mc_iterations",
                self.mc_iterations.to_string(),
                "must be >= 1",
            ));
        }
        if self.step_budget == 0 {
            return Err(LoopError::invalid_config(
                "step_budget",
                self.step_budget.to_string(),
                "must be >= 1",
            ));
        }
        if self.initial_labelled == 0 {
            return Err(LoopError::invalid_config(
                "initial_labelled",
                self.initial_labelled.to_string(),
                "must be >= 1 so the first fit has labelled data",
            ));
        }
        Ok(())
    }
}

impl Default for HParams {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            learning_rate: default_learning_rate(),
            query_size: default_query_size(),
            mc_iterations: default_mc_iterations(),
            replication: ReplicationMode::InMemory,
            step_budget: default_step_budget(),
            initial_labelled: default_initial_labelled(),
            reset_weights: true,
            seed: 42,
        }
    }
}

fn default_batch_size() -> usize {
    16
}

fn default_learning_rate() -> f32 {
    0.05
}

fn default_query_size() -> usize {
    100
}

fn default_mc_iterations() -> usize {
    20
}

fn default_step_budget() -> usize {
    100
}

fn default_initial_labelled() -> usize {
    10
}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(err) => write!(f, "config I/O failed: {}", err),
            ConfigError::Parse(err) => write!(f, "config parse failed: {}", err),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(value: std::io::Error) -> Self {
        ConfigError::Io(value)
    }
}
