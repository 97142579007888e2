//! Uncertainty heuristics for pool ranking
//!
//! A [`Heuristic`] turns per-item stochastic prediction outputs into an
//! ordering of the pool: most informative items first. Ranking is by
//! descending score with a stable tie-break on the original pool index;
//! NaN scores order below every numeric score so a degenerate output can
//! never float to the top of the selection.

use std::cmp::Ordering;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rayon::prelude::*;

use crate::model::PredictionSamples;

/// Ranks pool items by estimated value of labelling them.
pub trait Heuristic {
    /// Order pool indices by descending uncertainty.
    ///
    /// The returned indices are positions into `outputs` (pool positions),
    /// every position appearing exactly once.
    fn rank(&self, outputs: &[PredictionSamples]) -> Vec<usize>;

    /// Human-readable heuristic name for reports and logs.
    fn name(&self) -> &str {
        "UnknownHeuristic"
    }
}

/// Order indices by descending score, breaking ties by ascending index.
///
/// NaN scores sort after all numeric scores, preserving their relative
/// index order.
pub fn rank_by_scores(scores: &[f32]) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..scores.len()).collect();
    indices.sort_by(|&a, &b| match (scores[a].is_nan(), scores[b].is_nan()) {
        (true, true) => a.cmp(&b),
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => scores[b]
            .partial_cmp(&scores[a])
            .unwrap_or(Ordering::Equal)
            .then(a.cmp(&b)),
    });
    indices
}

/// Entropy of the mean predictive distribution, in nats.
pub fn predictive_entropy(samples: &PredictionSamples) -> f32 {
    samples
        .mean_probs()
        .iter()
        .map(|&p| {
            if p > 0.0 {
                -p * p.max(1e-12).ln()
            } else {
                0.0
            }
        })
        .sum()
}

/// One minus the gap between the top two mean probabilities.
///
/// Close calls between the two leading classes score near 1.
pub fn margin_uncertainty(samples: &PredictionSamples) -> f32 {
    let mean = samples.mean_probs();
    let mut top = f32::NEG_INFINITY;
    let mut second = f32::NEG_INFINITY;
    for &p in mean.iter() {
        if p > top {
            second = top;
            top = p;
        } else if p > second {
            second = p;
        }
    }
    if second.is_finite() {
        1.0 - (top - second)
    } else {
        0.0
    }
}

/// One minus the frequency of the modal predicted class across passes.
pub fn variation_ratio(samples: &PredictionSamples) -> f32 {
    let argmaxes = samples.sample_argmaxes();
    if argmaxes.is_empty() {
        return 0.0;
    }

    let mut counts = vec![0usize; samples.num_classes()];
    for &class in &argmaxes {
        counts[class] += 1;
    }
    let modal = counts.into_iter().max().unwrap_or(0);
    1.0 - modal as f32 / argmaxes.len() as f32
}

/// Ranks by entropy of the mean predictive distribution.
#[derive(Debug, Clone, Copy, Default)]
pub struct PredictiveEntropy;

impl Heuristic for PredictiveEntropy {
    fn rank(&self, outputs: &[PredictionSamples]) -> Vec<usize> {
        let scores: Vec<f32> = outputs.par_iter().map(predictive_entropy).collect();
        rank_by_scores(&scores)
    }

    fn name(&self) -> &str {
        "PredictiveEntropy"
    }
}

/// Ranks by the closeness of the top two mean probabilities.
#[derive(Debug, Clone, Copy, Default)]
pub struct Margin;

impl Heuristic for Margin {
    fn rank(&self, outputs: &[PredictionSamples]) -> Vec<usize> {
        let scores: Vec<f32> = outputs.par_iter().map(margin_uncertainty).collect();
        rank_by_scores(&scores)
    }

    fn name(&self) -> &str {
        "Margin"
    }
}

/// Ranks by disagreement of the per-pass predicted classes.
#[derive(Debug, Clone, Copy, Default)]
pub struct VariationRatio;

impl Heuristic for VariationRatio {
    fn rank(&self, outputs: &[PredictionSamples]) -> Vec<usize> {
        let scores: Vec<f32> = outputs.par_iter().map(variation_ratio).collect();
        rank_by_scores(&scores)
    }

    fn name(&self) -> &str {
        "VariationRatio"
    }
}

/// Seeded uniform shuffle baseline.
///
/// The permutation is derived from the seed and the pool size, so a given
/// call is deterministic while successive loop steps (with their shrinking
/// pools) still see fresh orderings.
#[derive(Debug, Clone, Copy)]
pub struct RandomRank {
    pub seed: u64,
}

impl RandomRank {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }
}

impl Heuristic for RandomRank {
    fn rank(&self, outputs: &[PredictionSamples]) -> Vec<usize> {
        let mut indices: Vec<usize> = (0..outputs.len()).collect();
        let mut rng = StdRng::seed_from_u64(self.seed + outputs.len() as u64);
        indices.shuffle(&mut rng);
        indices
    }

    fn name(&self) -> &str {
        "RandomRank"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn output_with_rows(rows: &[Vec<f32>]) -> PredictionSamples {
        let classes = rows[0].len();
        let flat: Vec<f32> = rows.iter().flatten().copied().collect();
        PredictionSamples::new(Array2::from_shape_vec((rows.len(), classes), flat).unwrap())
    }

    fn uniform_output(classes: usize) -> PredictionSamples {
        let p = 1.0 / classes as f32;
        output_with_rows(&[vec![p; classes]])
    }

    fn peaked_output(classes: usize, class: usize) -> PredictionSamples {
        let mut row = vec![0.01; classes];
        row[class] = 1.0 - 0.01 * (classes - 1) as f32;
        output_with_rows(&[row])
    }

    #[test]
    fn test_rank_by_scores_descending() {
        let ranking = rank_by_scores(&[0.1, 0.9, 0.5]);
        assert_eq!(ranking, vec![1, 2, 0]);
    }

    #[test]
    fn test_rank_by_scores_breaks_ties_by_index() {
        let ranking = rank_by_scores(&[0.5, 0.5, 0.9, 0.5]);
        assert_eq!(ranking, vec![2, 0, 1, 3]);
    }

    #[test]
    fn test_rank_by_scores_puts_nan_last() {
        let ranking = rank_by_scores(&[f32::NAN, 0.2, f32::NAN, 0.8]);
        assert_eq!(ranking, vec![3, 1, 0, 2]);
    }

    #[test]
    fn test_entropy_uniform_beats_peaked() {
        let uniform = predictive_entropy(&uniform_output(4));
        let peaked = predictive_entropy(&peaked_output(4, 1));
        assert!(uniform > peaked);
        // Uniform over 4 classes is ln(4) nats.
        assert!((uniform - 4.0_f32.ln()).abs() < 1e-4);
    }

    #[test]
    fn test_margin_close_call_scores_high() {
        let close = margin_uncertainty(&output_with_rows(&[vec![0.45, 0.44, 0.11]]));
        let clear = margin_uncertainty(&output_with_rows(&[vec![0.9, 0.05, 0.05]]));
        assert!(close > clear);
    }

    #[test]
    fn test_variation_ratio_counts_disagreement() {
        let agreeing = output_with_rows(&[
            vec![0.9, 0.1],
            vec![0.8, 0.2],
            vec![0.7, 0.3],
            vec![0.6, 0.4],
        ]);
        assert_eq!(variation_ratio(&agreeing), 0.0);

        let split = output_with_rows(&[
            vec![0.9, 0.1],
            vec![0.9, 0.1],
            vec![0.1, 0.9],
            vec![0.1, 0.9],
        ]);
        assert!((variation_ratio(&split) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_entropy_heuristic_ranks_uncertain_first() {
        let outputs = vec![
            peaked_output(4, 0),
            uniform_output(4),
            peaked_output(4, 2),
        ];
        let ranking = PredictiveEntropy.rank(&outputs);
        assert_eq!(ranking[0], 1);
        assert_eq!(ranking.len(), 3);
    }

    #[test]
    fn test_heuristic_rankings_are_permutations() {
        let outputs: Vec<PredictionSamples> =
            (0..7).map(|c| peaked_output(8, c)).collect();

        for heuristic in [
            Box::new(PredictiveEntropy) as Box<dyn Heuristic>,
            Box::new(Margin),
            Box::new(VariationRatio),
            Box::new(RandomRank::new(3)),
        ] {
            let mut ranking = heuristic.rank(&outputs);
            ranking.sort_unstable();
            assert_eq!(ranking, (0..7).collect::<Vec<_>>(), "{}", heuristic.name());
        }
    }

    #[test]
    fn test_random_rank_is_deterministic() {
        let outputs: Vec<PredictionSamples> = (0..10).map(|_| uniform_output(3)).collect();
        let a = RandomRank::new(42).rank(&outputs);
        let b = RandomRank::new(42).rank(&outputs);
        let c = RandomRank::new(7).rank(&outputs);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
