//! Labelled/pool partition over a fixed dataset
//!
//! An [`ActiveDataset`] wraps an ordered collection of samples and tracks
//! which of them are labelled. The partition is exhaustive and disjoint:
//! every item is on exactly one side at all times. Labelling is monotonic;
//! an item, once labelled, never returns to the pool.

use std::path::Path;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::checkpoint::{require_version, CheckpointError, Checkpointable};
use crate::error::{LoopError, LoopResult};

const PARTITION_CHECKPOINT_VERSION: u32 = 1;

/// Serializable snapshot of the partition state.
///
/// Captures only the membership mask, not the samples; intended for
/// resuming a run on a freshly constructed dataset of the same length.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartitionSnapshot {
    pub version: u32,
    pub labelled: Vec<bool>,
}

impl Checkpointable for PartitionSnapshot {
    fn save_checkpoint<P: AsRef<Path>>(&self, path: P) -> Result<(), CheckpointError> {
        Self::write_snapshot(self, path)
    }

    fn load_checkpoint<P: AsRef<Path>>(path: P) -> Result<Self, CheckpointError> {
        let snapshot: PartitionSnapshot = Self::read_snapshot(path)?;
        require_version(PARTITION_CHECKPOINT_VERSION, snapshot.version)?;
        Ok(snapshot)
    }
}

/// A dataset split into a labelled set and an unlabelled pool.
///
/// Pool indices used by [`ActiveDataset::label`] are positions in the
/// current pool ordering: unlabelled items in ascending original-index
/// order. This matches the ordering of [`ActiveDataset::pool_samples`],
/// so a ranking computed over pool outputs can be consumed directly.
pub struct ActiveDataset<S> {
    samples: Vec<S>,
    labelled: Vec<bool>,
}

impl<S> ActiveDataset<S> {
    /// Creates a partition with every sample in the pool.
    pub fn new(samples: Vec<S>) -> Self {
        let labelled = vec![false; samples.len()];
        Self { samples, labelled }
    }

    /// Total number of samples on both sides of the partition.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check if the dataset holds no samples at all.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Number of labelled samples.
    pub fn labelled_len(&self) -> usize {
        self.labelled.iter().filter(|&&flag| flag).count()
    }

    /// Number of samples remaining in the pool.
    pub fn pool_len(&self) -> usize {
        self.len() - self.labelled_len()
    }

    /// Labelled samples in ascending original-index order.
    pub fn labelled_samples(&self) -> Vec<&S> {
        self.samples
            .iter()
            .zip(self.labelled.iter())
            .filter_map(|(sample, &flag)| flag.then_some(sample))
            .collect()
    }

    /// Pool samples in ascending original-index order.
    ///
    /// This ordering defines the pool indices accepted by [`Self::label`].
    pub fn pool_samples(&self) -> Vec<&S> {
        self.samples
            .iter()
            .zip(self.labelled.iter())
            .filter_map(|(sample, &flag)| (!flag).then_some(sample))
            .collect()
    }

    /// Original (absolute) indices of the pool items, ascending.
    pub fn pool_indices(&self) -> Vec<usize> {
        self.labelled
            .iter()
            .enumerate()
            .filter_map(|(idx, &flag)| (!flag).then_some(idx))
            .collect()
    }

    /// Original (absolute) indices of the labelled items, ascending.
    pub fn labelled_indices(&self) -> Vec<usize> {
        self.labelled
            .iter()
            .enumerate()
            .filter_map(|(idx, &flag)| flag.then_some(idx))
            .collect()
    }

    /// Labels `count` pool items chosen uniformly at random.
    ///
    /// Labels fewer when the pool is smaller than `count`. Returns the
    /// number of items actually labelled.
    pub fn label_randomly(&mut self, count: usize, rng: &mut StdRng) -> usize {
        let pool = self.pool_indices();
        let take = count.min(pool.len());
        if take < count {
            tracing::debug!(
                requested = count,
                available = pool.len(),
                "random labelling clamped to pool size"
            );
        }

        let chosen: Vec<usize> = pool.choose_multiple(rng, take).copied().collect();
        for idx in chosen {
            self.labelled[idx] = true;
        }
        take
    }

    /// Labels the given pool positions, moving them to the labelled set.
    ///
    /// Positions are interpreted against the pool ordering as of this call;
    /// duplicates collapse to a single labelling. Any out-of-range position
    /// rejects the whole operation and the partition is left untouched.
    /// Returns the number of items actually labelled.
    pub fn label(&mut self, pool_positions: &[usize]) -> LoopResult<usize> {
        let pool = self.pool_indices();
        for &position in pool_positions {
            if position >= pool.len() {
                return Err(LoopError::pool_index_out_of_range(position, pool.len()));
            }
        }

        let mut labelled_now = 0;
        for &position in pool_positions {
            let absolute = pool[position];
            if !self.labelled[absolute] {
                self.labelled[absolute] = true;
                labelled_now += 1;
            }
        }
        Ok(labelled_now)
    }

    /// Verifies the partition is exhaustive and disjoint.
    ///
    /// With the mask representation this reduces to the two sides summing
    /// to the dataset length; kept as an explicit check for tests and
    /// snapshot restoration.
    pub fn partition_is_consistent(&self) -> bool {
        self.labelled.len() == self.samples.len()
            && self.labelled_len() + self.pool_len() == self.len()
    }

    /// Captures the current membership mask.
    pub fn partition_snapshot(&self) -> PartitionSnapshot {
        PartitionSnapshot {
            version: PARTITION_CHECKPOINT_VERSION,
            labelled: self.labelled.clone(),
        }
    }

    /// Replaces the membership mask from a snapshot.
    ///
    /// The snapshot must carry the current schema version and one flag per
    /// sample; anything else is rejected and the partition is untouched.
    pub fn apply_partition_snapshot(&mut self, snapshot: &PartitionSnapshot) -> LoopResult<()> {
        if snapshot.version != PARTITION_CHECKPOINT_VERSION {
            return Err(LoopError::invalid_config(
                "partition_snapshot.version",
                snapshot.version.to_string(),
                format!("expected version {}", PARTITION_CHECKPOINT_VERSION),
            ));
        }
        if snapshot.labelled.len() != self.samples.len() {
            return Err(LoopError::count_mismatch(
                self.samples.len(),
                snapshot.labelled.len(),
                "partition snapshot mask",
            ));
        }

        self.labelled.clone_from(&snapshot.labelled);
        Ok(())
    }
}
