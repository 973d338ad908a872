//! Repository tests: trial metadata, artifact files and reload from disk

use trueno_automl::hyperparams::{trial_hash, HyperparameterSamples};
use trueno_automl::pipeline::{LinearRegression, MultiplyByN, Pipeline, Reshape};
use trueno_automl::repository::{artifact, HyperparamsRepository, InMemoryHyperparamsRepository};
use trueno_automl::tensor::Tensor;
use trueno_automl::trial::{EpochRecord, TrialRecord, TrialStatus};
use trueno_automl::Error;

fn fitted_pipeline() -> Pipeline {
    let mut pipeline = Pipeline::new(vec![
        Box::new(MultiplyByN::new(2)),
        Box::new(Reshape::new(&[-1, 1])),
        Box::new(LinearRegression::new()),
    ])
    .unwrap();
    let x = Tensor::from(vec![0.0, 1.0, 2.0, 3.0, 4.0]);
    let y = x.map(|v| 3.0 * v + 1.0);
    pipeline.fit(&x, &y).unwrap();
    pipeline
}

// =============================================================================
// Trial records
// =============================================================================

#[test]
fn test_trial_record_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let repo = InMemoryHyperparamsRepository::new(dir.path());
    let hyperparams = HyperparameterSamples::new().with("MultiplyByN__multiply_by", 2);
    let hash = repo.trial_hash(&hyperparams);
    assert_eq!(hash, trial_hash(&hyperparams));

    let mut trial = TrialRecord::builder(hash.clone(), hyperparams)
        .validation_technique("validation_split")
        .build();
    trial.start();
    trial.push_epoch(EpochRecord::builder(0, 0.5).metric("mse", 0.5).build());
    trial.complete(TrialStatus::Success);
    repo.save_trial(&trial).unwrap();

    let loaded = repo.load_trial(&hash).unwrap();
    assert_eq!(loaded, trial);
    assert_eq!(repo.cache_folder(), dir.path());
}

#[test]
fn test_load_unknown_trial_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let repo = InMemoryHyperparamsRepository::new(dir.path());
    let err = repo.load_trial("0123abcd").unwrap_err();
    assert!(matches!(err, Error::TrialNotFound(hash) if hash == "0123abcd"));
}

// =============================================================================
// Artifacts
// =============================================================================

#[test]
fn test_save_twice_reload_equivalent() {
    let dir = tempfile::tempdir().unwrap();
    let repo = InMemoryHyperparamsRepository::new(dir.path());
    let pipeline = fitted_pipeline();

    let first = repo.save_pipeline("trial01", &pipeline).unwrap();
    let second = repo.save_pipeline("trial01", &pipeline).unwrap();
    assert_eq!(first.cas_hash(), second.cas_hash());
    assert_eq!(repo.artifact("trial01").unwrap().cas_hash(), second.cas_hash());

    let loaded = repo.load_pipeline("trial01").unwrap();
    assert_eq!(loaded.state(), pipeline.state());

    let x = Tensor::from(vec![5.0, 6.0]);
    let predicted = loaded.transform(&x).unwrap();
    assert!((predicted.as_slice()[0] - 16.0).abs() < 1e-3);
    assert!((predicted.as_slice()[1] - 19.0).abs() < 1e-3);
}

#[test]
fn test_artifact_record_describes_stored_file() {
    let dir = tempfile::tempdir().unwrap();
    let repo = InMemoryHyperparamsRepository::new(dir.path());
    let before = chrono::Utc::now();

    let record = repo.save_pipeline("trial02", &fitted_pipeline()).unwrap();

    let path = dir.path().join("trial02").join(artifact::PIPELINE_FILE);
    assert_eq!(record.trial_hash(), "trial02");
    assert_eq!(record.key(), artifact::PIPELINE_FILE);
    assert_eq!(record.size_bytes(), std::fs::metadata(&path).unwrap().len());
    assert!(record.created_at() >= before);
    assert!(record.created_at() <= chrono::Utc::now());
    assert_eq!(repo.artifact("trial02").unwrap(), record);
}

#[test]
fn test_reload_from_folder_without_metadata() {
    let dir = tempfile::tempdir().unwrap();
    {
        let repo = InMemoryHyperparamsRepository::new(dir.path());
        repo.save_pipeline("trial02", &fitted_pipeline()).unwrap();
    }

    let fresh = InMemoryHyperparamsRepository::new(dir.path());
    assert!(fresh.is_empty());
    assert!(matches!(fresh.artifact("trial02"), Err(Error::TrialNotFound(_))));

    let loaded = fresh.load_pipeline("trial02").unwrap();
    assert_eq!(loaded.state(), fitted_pipeline().state());
    let direct = artifact::load_pipeline(dir.path(), "trial02").unwrap();
    assert_eq!(direct.state(), loaded.state());
}

#[test]
fn test_corrupt_artifact_is_serialization_error() {
    let dir = tempfile::tempdir().unwrap();
    let folder = dir.path().join("trial03");
    std::fs::create_dir_all(&folder).unwrap();
    std::fs::write(folder.join(artifact::PIPELINE_FILE), b"{ not json").unwrap();

    let err = artifact::load_pipeline(dir.path(), "trial03").unwrap_err();
    assert!(matches!(err, Error::Serialization(_)));
}
