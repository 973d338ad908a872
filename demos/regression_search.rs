//! Regression Search: random search + k-fold CV + early stopping
//!
//! Searches the multiplier of a `MultiplyByN -> Reshape -> LinearRegression`
//! pipeline, loads an AutoML config from JSON, then reloads the winning
//! pipeline from the cache folder for inference.
//!
//! Run with: RUST_LOG=info cargo run --example regression_search

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;
use trueno_automl::callbacks::EarlyStoppingCallback;
use trueno_automl::hyperparams::{HyperparameterDistribution, HyperparameterSpace};
use trueno_automl::metrics::{average_kfold_scores, mean_squared_error, ScoringFunction};
use trueno_automl::optimizer::RandomSearchHyperparameterOptimizer;
use trueno_automl::pipeline::{LinearRegression, MultiplyByN, Pipeline, Reshape};
use trueno_automl::repository::{HyperparamsRepository, InMemoryHyperparamsRepository};
use trueno_automl::tensor::Tensor;
use trueno_automl::validation::KFoldCrossValidationWrapper;
use trueno_automl::{AutoML, AutoMLConfig};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("=== Trueno-AutoML Regression Search ===\n");

    let cache = tempfile::tempdir().context("creating cache folder")?;
    let repo = InMemoryHyperparamsRepository::new(cache.path());

    let space = HyperparameterSpace::new()
        .with("multiply_by", HyperparameterDistribution::choice([1, 2, 3, 4]));
    let pipeline = Pipeline::new(vec![
        Box::new(MultiplyByN::new(1).with_hyperparams_space(space)?),
        Box::new(Reshape::new(&[-1, 1])),
        Box::new(LinearRegression::new()),
    ])?;

    let config: AutoMLConfig = serde_json::from_str(r#"{"n_trials": 6, "epochs": 8}"#)?;
    let kfold_mse = average_kfold_scores(ScoringFunction::mean_squared_error());

    let mut automl = AutoML::builder(pipeline, KFoldCrossValidationWrapper::new(3, kfold_mse).with_shuffle(7), &repo)
        .optimizer(RandomSearchHyperparameterOptimizer::with_seed(42))
        .scoring_function(kfold_mse)
        .refit_scoring_function(ScoringFunction::mean_squared_error())
        .metric("mae", average_kfold_scores(ScoringFunction::mean_absolute_error()))
        .callback(EarlyStoppingCallback::new(2, false)?)
        .config(config)
        .build()?;

    let x = Tensor::from((0..30).map(|v| v as f32).collect::<Vec<_>>());
    let y = x.map(|v| 4.0 * v + 3.0);
    let best = automl.fit(&x, &y)?;

    println!("Trials:");
    for trial in repo.trials() {
        println!(
            "  {}  epochs={:<2} best_mse={:.6}  {:?}",
            &trial.hash()[..12],
            trial.epochs().len(),
            trial.best_score(false).unwrap_or(f64::NAN),
            trial.status()
        );
    }

    println!("\nBest trial: {}", best.hash());
    for (key, value) in best.hyperparams().iter() {
        println!("  {key} = {value:?}");
    }
    println!("  refit mse: {:?}", best.refit_score());

    let model = repo.load_pipeline(best.hash())?;
    let predictions = model.transform(&x)?;
    println!("\nReloaded model mse: {:.6}", mean_squared_error(&y, &predictions)?);

    Ok(())
}
