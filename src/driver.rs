//! Active-learning loop driver.
//!
//! Orchestrates repeated train/evaluate/select cycles over an
//! [`ActiveDataset`] until a stopping condition. The driver is an explicit
//! state machine: each step moves through `Training`, `Evaluating`, and
//! `Selecting`, and the machine enters `Exhausted` when the step budget is
//! reached or the pool can no longer supply a full query. The machine is
//! synchronous; one step fully completes before the next begins, and only
//! the driver mutates the partition, only between model phases.

use std::time::Instant;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;

use crate::config::HParams;
use crate::data::ActiveDataset;
use crate::error::{LoopError, LoopResult};
use crate::heuristics::Heuristic;
use crate::logging::{StepLogEntry, StepLogger};
use crate::model::{Evaluable, Metrics, Restorable, Trainable, UncertaintySampler};

/// Phase of the loop state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum LoopState {
    Training,
    Evaluating,
    Selecting,
    Exhausted,
}

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Termination {
    /// The step counter reached the configured budget.
    BudgetReached,
    /// A step labelled fewer items than requested; the pool is spent.
    PoolExhausted,
}

/// Metrics and partition movement for one completed step.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepRecord {
    /// 1-based step number
    pub step: usize,
    pub train: Metrics,
    pub eval: Metrics,
    /// Query size requested for this step
    pub requested: usize,
    /// Items actually labelled this step
    pub labelled_now: usize,
    /// Labelled-set size after the step
    pub labelled_total: usize,
    /// Pool size after the step
    pub pool_remaining: usize,
    pub elapsed_ms: u128,
}

/// Result of driving the machine one step forward.
#[derive(Debug, Clone)]
pub enum StepOutcome {
    /// One full step completed; the machine may have more work.
    Stepped(StepRecord),
    /// The machine was already exhausted; nothing happened.
    Finished(Termination),
}

/// Complete run summary.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoopReport {
    pub hparams: HParams,
    pub steps: Vec<StepRecord>,
    pub termination: Termination,
    pub final_eval: Option<Metrics>,
    pub total_elapsed_ms: u128,
}

/// Active-learning loop over a model, a heuristic, and a dataset partition.
///
/// The model participates purely through its capability traits; the driver
/// never names a concrete model type.
pub struct ActiveLoop<M, H, S>
where
    M: Restorable,
{
    model: M,
    heuristic: H,
    dataset: ActiveDataset<S>,
    held_out: Vec<S>,
    hparams: HParams,
    state: LoopState,
    steps_completed: usize,
    termination: Option<Termination>,
    initial_weights: Option<M::Snapshot>,
    logger: StepLogger,
}

impl<M, H, S> ActiveLoop<M, H, S>
where
    M: Trainable<S> + Evaluable<S> + UncertaintySampler<S> + Restorable,
    H: Heuristic,
{
    /// Builds a loop and seeds the initial random labelling.
    ///
    /// Fails fast on invalid hyperparameters or an empty dataset. When the
    /// dataset already carries labelled items (say from a restored
    /// partition snapshot), the random seeding is skipped.
    pub fn new(
        model: M,
        heuristic: H,
        mut dataset: ActiveDataset<S>,
        held_out: Vec<S>,
        hparams: HParams,
    ) -> LoopResult<Self> {
        hparams.validate()?;
        if dataset.is_empty() {
            return Err(LoopError::empty_collection("dataset"));
        }

        let initial_weights = hparams.reset_weights.then(|| model.snapshot());

        if dataset.labelled_len() == 0 {
            let mut rng = StdRng::seed_from_u64(hparams.seed);
            let labelled = dataset.label_randomly(hparams.initial_labelled, &mut rng);
            tracing::info!(
                labelled,
                pool = dataset.pool_len(),
                "seeded initial labelled set"
            );
        }

        Ok(Self {
            model,
            heuristic,
            dataset,
            held_out,
            hparams,
            state: LoopState::Training,
            steps_completed: 0,
            termination: None,
            initial_weights,
            logger: StepLogger::new(1),
        })
    }

    /// Replaces the journal sampling interval of the step logger.
    pub fn with_log_every(mut self, log_every: usize) -> Self {
        self.logger = StepLogger::new(log_every);
        self
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn steps_completed(&self) -> usize {
        self.steps_completed
    }

    pub fn termination(&self) -> Option<Termination> {
        self.termination
    }

    pub fn hparams(&self) -> &HParams {
        &self.hparams
    }

    pub fn dataset(&self) -> &ActiveDataset<S> {
        &self.dataset
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn log_entries(&self) -> &[StepLogEntry] {
        self.logger.entries()
    }

    /// Drives the machine through one full step: train, evaluate, select,
    /// label.
    ///
    /// An empty pool is not an error at any step, including the first: the
    /// step still trains and evaluates, labels nothing, and the machine
    /// enters `Exhausted`. Model failures in any phase propagate as fatal.
    pub fn step(&mut self) -> LoopResult<StepOutcome> {
        if let Some(termination) = self.termination {
            return Ok(StepOutcome::Finished(termination));
        }

        let step_start = Instant::now();
        let step = self.steps_completed + 1;

        self.state = LoopState::Training;
        if let Some(snapshot) = &self.initial_weights {
            self.model.restore(snapshot);
        }
        let labelled = self.dataset.labelled_samples();
        let train = self
            .model
            .fit(&labelled)
            .map_err(|err| LoopError::model_failure("fit", err))?;

        self.state = LoopState::Evaluating;
        let held_out: Vec<&S> = self.held_out.iter().collect();
        let eval = self
            .model
            .evaluate(&held_out)
            .map_err(|err| LoopError::model_failure("evaluate", err))?;

        self.state = LoopState::Selecting;
        let requested = self.hparams.query_size;
        let selection = {
            let pool = self.dataset.pool_samples();
            if pool.is_empty() {
                Vec::new()
            } else {
                let outputs = self
                    .model
                    .sample_predictions(
                        &pool,
                        self.hparams.mc_iterations,
                        self.hparams.replication,
                    )
                    .map_err(|err| LoopError::model_failure("sample_predictions", err))?;
                if outputs.len() != pool.len() {
                    return Err(LoopError::count_mismatch(
                        pool.len(),
                        outputs.len(),
                        "pool predictions",
                    ));
                }

                let ranking = self.heuristic.rank(&outputs);
                validate_ranking(&ranking, pool.len())?;
                ranking.into_iter().take(requested).collect()
            }
        };
        let labelled_now = self.dataset.label(&selection)?;

        self.steps_completed += 1;
        let record = StepRecord {
            step,
            train,
            eval,
            requested,
            labelled_now,
            labelled_total: self.dataset.labelled_len(),
            pool_remaining: self.dataset.pool_len(),
            elapsed_ms: step_start.elapsed().as_millis(),
        };

        // Termination checks drive the machine out of Selecting.
        if labelled_now < requested {
            self.state = LoopState::Exhausted;
            self.termination = Some(Termination::PoolExhausted);
        } else if self.steps_completed >= self.hparams.step_budget {
            self.state = LoopState::Exhausted;
            self.termination = Some(Termination::BudgetReached);
        } else {
            self.state = LoopState::Training;
        }

        tracing::info!(
            step = record.step,
            train_loss = record.train.loss,
            eval_accuracy = record.eval.accuracy,
            labelled = record.labelled_total,
            pool = record.pool_remaining,
            "completed active-learning step"
        );

        let _ = self.logger.record(StepLogEntry {
            sequence: 0,
            step: record.step,
            train_loss: record.train.loss,
            train_accuracy: record.train.accuracy,
            eval_loss: record.eval.loss,
            eval_accuracy: record.eval.accuracy,
            requested: record.requested,
            labelled_now: record.labelled_now,
            labelled_total: record.labelled_total,
            pool_remaining: record.pool_remaining,
            timestamp_ms: StepLogger::timestamp_now(),
        });

        Ok(StepOutcome::Stepped(record))
    }

    /// Runs the machine until it is exhausted, collecting one record per
    /// completed step.
    pub fn run(&mut self) -> LoopResult<LoopReport> {
        let run_start = Instant::now();
        tracing::info!(
            heuristic = self.heuristic.name(),
            query_size = self.hparams.query_size,
            step_budget = self.hparams.step_budget,
            "starting active-learning run"
        );
        let mut steps = Vec::new();

        let termination = loop {
            match self.step()? {
                StepOutcome::Stepped(record) => steps.push(record),
                StepOutcome::Finished(termination) => break termination,
            }
        };

        tracing::info!(
            steps = steps.len(),
            termination = ?termination,
            labelled = self.dataset.labelled_len(),
            pool = self.dataset.pool_len(),
            "active-learning run finished"
        );

        let final_eval = steps.last().map(|record| record.eval);
        Ok(LoopReport {
            hparams: self.hparams.clone(),
            steps,
            termination,
            final_eval,
            total_elapsed_ms: run_start.elapsed().as_millis(),
        })
    }
}

/// A ranking must be a permutation of the pool positions.
fn validate_ranking(ranking: &[usize], pool_len: usize) -> LoopResult<()> {
    if ranking.len() != pool_len {
        return Err(LoopError::count_mismatch(
            pool_len,
            ranking.len(),
            "heuristic ranking",
        ));
    }

    let mut seen = vec![false; pool_len];
    for &idx in ranking {
        if idx >= pool_len {
            return Err(LoopError::invalid_ranking(format!(
                "index {} out of range for pool of {}",
                idx, pool_len
            )));
        }
        if seen[idx] {
            return Err(LoopError::invalid_ranking(format!(
                "index {} appears more than once",
                idx
            )));
        }
        seen[idx] = true;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReplicationMode;
    use crate::heuristics::PredictiveEntropy;
    use crate::model::PredictionSamples;
    use anyhow::{bail, Result};
    use ndarray::Array2;

    /// Fixed-output model over opaque samples; uniform predictions make
    /// every ranking a pure tie-break.
    struct StubModel {
        fail_fit: bool,
    }

    impl StubModel {
        fn new() -> Self {
            Self { fail_fit: false }
        }

        fn failing() -> Self {
            Self { fail_fit: true }
        }
    }

    impl Trainable<u32> for StubModel {
        fn fit(&mut self, labelled: &[&u32]) -> Result<Metrics> {
            if self.fail_fit {
                bail!("fit failure injected");
            }
            if labelled.is_empty() {
                bail!("cannot fit on an empty labelled set");
            }
            Ok(Metrics::new(0.5, 0.5))
        }
    }

    impl Evaluable<u32> for StubModel {
        fn evaluate(&self, _held_out: &[&u32]) -> Result<Metrics> {
            Ok(Metrics::new(0.4, 0.6))
        }
    }

    impl UncertaintySampler<u32> for StubModel {
        fn sample_predictions(
            &self,
            pool: &[&u32],
            mc_iterations: usize,
            _replication: ReplicationMode,
        ) -> Result<Vec<PredictionSamples>> {
            Ok(pool
                .iter()
                .map(|_| {
                    PredictionSamples::new(Array2::from_elem((mc_iterations, 2), 0.5))
                })
                .collect())
        }
    }

    impl Restorable for StubModel {
        type Snapshot = ();

        fn snapshot(&self) {}

        fn restore(&mut self, _snapshot: &()) {}
    }

    fn hparams(query_size: usize, step_budget: usize, initial_labelled: usize) -> HParams {
        HParams {
            query_size,
            step_budget,
            initial_labelled,
            mc_iterations: 3,
            ..HParams::default()
        }
    }

    fn quiet_loop(
        dataset_len: usize,
        hp: HParams,
    ) -> ActiveLoop<StubModel, PredictiveEntropy, u32> {
        let dataset = ActiveDataset::new((0..dataset_len as u32).collect());
        ActiveLoop::new(StubModel::new(), PredictiveEntropy, dataset, vec![1, 2, 3], hp)
            .unwrap()
            .with_log_every(1_000_000)
    }

    #[test]
    fn test_new_seeds_initial_labelling() {
        let active = quiet_loop(50, hparams(10, 5, 5));
        assert_eq!(active.dataset().labelled_len(), 5);
        assert_eq!(active.dataset().pool_len(), 45);
        assert_eq!(active.state(), LoopState::Training);
        assert_eq!(active.termination(), None);
    }

    #[test]
    fn test_new_rejects_invalid_hparams() {
        let dataset: ActiveDataset<u32> = ActiveDataset::new((0..10).collect());
        let result = ActiveLoop::new(
            StubModel::new(),
            PredictiveEntropy,
            dataset,
            Vec::new(),
            hparams(0, 5, 5),
        );
        assert!(matches!(
            result,
            Err(LoopError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn test_new_rejects_empty_dataset() {
        let dataset: ActiveDataset<u32> = ActiveDataset::new(Vec::new());
        let result = ActiveLoop::new(
            StubModel::new(),
            PredictiveEntropy,
            dataset,
            Vec::new(),
            hparams(10, 5, 5),
        );
        assert!(matches!(result, Err(LoopError::EmptyCollection { .. })));
    }

    #[test]
    fn test_step_labels_full_query() {
        let mut active = quiet_loop(50, hparams(10, 5, 5));
        let outcome = active.step().unwrap();

        match outcome {
            StepOutcome::Stepped(record) => {
                assert_eq!(record.step, 1);
                assert_eq!(record.labelled_now, 10);
                assert_eq!(record.labelled_total, 15);
                assert_eq!(record.pool_remaining, 35);
            }
            StepOutcome::Finished(_) => panic!("machine finished prematurely"),
        }
        assert_eq!(active.state(), LoopState::Training);
        assert_eq!(active.steps_completed(), 1);
    }

    #[test]
    fn test_partial_final_step_exhausts_pool() {
        // 12 items, 5 seeded, query of 10: the first step can only label 7.
        let mut active = quiet_loop(12, hparams(10, 5, 5));
        let outcome = active.step().unwrap();

        match outcome {
            StepOutcome::Stepped(record) => {
                assert_eq!(record.labelled_now, 7);
                assert_eq!(record.pool_remaining, 0);
            }
            StepOutcome::Finished(_) => panic!("machine finished prematurely"),
        }
        assert_eq!(active.state(), LoopState::Exhausted);
        assert_eq!(active.termination(), Some(Termination::PoolExhausted));

        // Further steps observe completion without touching the model.
        match active.step().unwrap() {
            StepOutcome::Finished(termination) => {
                assert_eq!(termination, Termination::PoolExhausted)
            }
            StepOutcome::Stepped(_) => panic!("exhausted machine stepped"),
        }
    }

    #[test]
    fn test_budget_termination() {
        let mut active = quiet_loop(100, hparams(1, 3, 5));
        let report = active.run().unwrap();

        assert_eq!(report.steps.len(), 3);
        assert_eq!(report.termination, Termination::BudgetReached);
        assert_eq!(active.state(), LoopState::Exhausted);
        assert_eq!(active.dataset().labelled_len(), 8);
    }

    #[test]
    fn test_labelled_grows_by_min_of_query_and_pool() {
        let mut active = quiet_loop(37, hparams(10, 100, 5));
        let report = active.run().unwrap();

        let mut expected_labelled = 5;
        let mut expected_pool = 32;
        for record in &report.steps {
            let moved = record.requested.min(expected_pool);
            expected_labelled += moved;
            expected_pool -= moved;
            assert_eq!(record.labelled_now, moved);
            assert_eq!(record.labelled_total, expected_labelled);
            assert_eq!(record.pool_remaining, expected_pool);
        }
        assert_eq!(report.termination, Termination::PoolExhausted);
    }

    #[test]
    fn test_empty_pool_first_step_still_trains() {
        // Every item seeded: the first step has nothing to select.
        let mut active = quiet_loop(5, hparams(10, 5, 5));
        assert_eq!(active.dataset().pool_len(), 0);

        let outcome = active.step().unwrap();
        match outcome {
            StepOutcome::Stepped(record) => {
                assert_eq!(record.labelled_now, 0);
                assert_eq!(record.labelled_total, 5);
                // Train and eval phases still ran.
                assert!((record.train.loss - 0.5).abs() < 1e-6);
                assert!((record.eval.accuracy - 0.6).abs() < 1e-6);
            }
            StepOutcome::Finished(_) => panic!("boundary step must still run"),
        }
        assert_eq!(active.termination(), Some(Termination::PoolExhausted));
    }

    #[test]
    fn test_model_failure_aborts_run() {
        let dataset = ActiveDataset::new((0..20u32).collect());
        let mut active = ActiveLoop::new(
            StubModel::failing(),
            PredictiveEntropy,
            dataset,
            Vec::new(),
            hparams(5, 5, 5),
        )
        .unwrap()
        .with_log_every(1_000_000);

        let err = active.run().unwrap_err();
        assert!(matches!(err, LoopError::ModelFailure { .. }));
        assert!(err.to_string().contains("fit"));
    }

    #[test]
    fn test_step_records_are_buffered() {
        let mut active = quiet_loop(30, hparams(5, 2, 5));
        active.run().unwrap();
        assert_eq!(active.log_entries().len(), 2);
        assert_eq!(active.log_entries()[0].step, 1);
        assert_eq!(active.log_entries()[1].sequence, 2);
    }

    #[test]
    fn test_validate_ranking_rejects_short_ranking() {
        let err = validate_ranking(&[0, 1], 3).unwrap_err();
        assert!(matches!(err, LoopError::CountMismatch { .. }));
    }

    #[test]
    fn test_validate_ranking_rejects_duplicates() {
        let err = validate_ranking(&[0, 1, 1], 3).unwrap_err();
        assert!(matches!(err, LoopError::InvalidRanking { .. }));
    }

    #[test]
    fn test_validate_ranking_rejects_out_of_range() {
        let err = validate_ranking(&[0, 1, 5], 3).unwrap_err();
        assert!(matches!(err, LoopError::InvalidRanking { .. }));
    }
}
