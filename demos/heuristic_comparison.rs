//! Compares selection heuristics over the same synthetic problem.
//!
//! Each heuristic drives its own loop from identical seeds. The table at
//! the end shows held-out accuracy per step so the selection policies can
//! be read side by side.

use active_learning_core::{
    ActiveDataset, ActiveLoop, ClassifierConfig, FeatureSample, HParams, Heuristic, LoopReport,
    Margin, PredictiveEntropy, RandomRank, SoftmaxClassifier, SyntheticConfig, SyntheticDataset,
    VariationRatio,
};

fn run_one<H: Heuristic>(
    heuristic: H,
    pool: &[FeatureSample],
    held_out: &[FeatureSample],
    hparams: &HParams,
    classifier_config: &ClassifierConfig,
) -> Result<LoopReport, Box<dyn std::error::Error>> {
    let model = SoftmaxClassifier::new(classifier_config.clone());
    let mut active = ActiveLoop::new(
        model,
        heuristic,
        ActiveDataset::new(pool.to_vec()),
        held_out.to_vec(),
        hparams.clone(),
    )?
    .with_log_every(1_000);

    Ok(active.run()?)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("⚖️  Heuristic Comparison - Selection Policies Head to Head");
    println!("==========================================================\n");

    let hparams = HParams {
        query_size: 40,
        mc_iterations: 8,
        step_budget: 8,
        initial_labelled: 15,
        ..HParams::default()
    };
    let data_config = SyntheticConfig {
        num_classes: 6,
        feature_dim: 24,
        samples_per_class: 80,
        ..SyntheticConfig::default()
    };
    let classifier_config = ClassifierConfig {
        feature_dim: data_config.feature_dim,
        num_classes: data_config.num_classes,
        epochs_per_fit: 4,
        batch_size: hparams.batch_size,
        learning_rate: hparams.learning_rate,
        ..ClassifierConfig::default()
    };

    println!("📊 Generating dataset...");
    let data = SyntheticDataset::generate(data_config);
    let (pool, held_out) = data.split(0.8);
    println!("  Pool samples: {}", pool.len());
    println!("  Held-out samples: {}", held_out.len());
    println!();

    println!("🏃 Running loops...");
    let results = vec![
        (
            "entropy",
            run_one(PredictiveEntropy, &pool, &held_out, &hparams, &classifier_config)?,
        ),
        (
            "margin",
            run_one(Margin, &pool, &held_out, &hparams, &classifier_config)?,
        ),
        (
            "variation",
            run_one(VariationRatio, &pool, &held_out, &hparams, &classifier_config)?,
        ),
        (
            "random",
            run_one(
                RandomRank::new(hparams.seed),
                &pool,
                &held_out,
                &hparams,
                &classifier_config,
            )?,
        ),
    ];
    println!();

    // Accuracy table, one row per step
    println!("📈 Held-out accuracy by step:");
    print!("  Step |");
    for (name, _) in &results {
        print!(" {:>9} |", name);
    }
    println!(" Labelled");

    let max_steps = results
        .iter()
        .map(|(_, report)| report.steps.len())
        .max()
        .unwrap_or(0);
    for step in 0..max_steps {
        print!("  {:4} |", step + 1);
        for (_, report) in &results {
            match report.steps.get(step) {
                Some(record) => print!(" {:8.2}% |", record.eval.accuracy * 100.0),
                None => print!(" {:>9} |", "-"),
            }
        }
        let labelled = results[0]
            .1
            .steps
            .get(step)
            .map(|record| record.labelled_total)
            .unwrap_or(0);
        println!(" {:8}", labelled);
    }
    println!();

    println!("🏁 Final accuracy:");
    for (name, report) in &results {
        let accuracy = report.final_eval.map(|m| m.accuracy).unwrap_or(0.0);
        println!(
            "  {:>9}: {:6.2}%  ({:?}, {} steps)",
            name,
            accuracy * 100.0,
            report.termination,
            report.steps.len()
        );
    }
    println!();

    println!("✨ Done!");

    Ok(())
}
