//! End-to-end vector build against a temporary embedded store.
//!
//! ```bash
//! cargo test --package profilyx-vector --test test_build_job
//! ```

use profilyx_common::config::BuildConfig;
use profilyx_common::records::Action;
use profilyx_db::{ActionRepository, ActionTypeWeightRepository, Database, VectorRepository};
use profilyx_vector::run_vector_build;
use std::sync::Arc;

async fn open_test_db(dir: &tempfile::TempDir) -> Arc<Database> {
    let db = Database::open(dir.path().join("profilyx.db"))
        .await
        .expect("open database");
    db.initialize().await.expect("initialize tables");
    Arc::new(db)
}

fn sample_actions() -> Vec<Action> {
    vec![
        Action::new("CHEMBL1", "T1", "INHIBITOR"),
        Action::new("CHEMBL1", "T2", "AGONIST"),
        Action::new("CHEMBL2", "T1", "AGONIST"),
        // Duplicate pair for CHEMBL2/T1 plus an unknown type to skip.
        Action::new("CHEMBL2", "T1", "ANTAGONIST"),
        Action::new("CHEMBL3", "T3", "NOT A MECHANISM"),
    ]
}

#[tokio::test(flavor = "multi_thread")]
async fn test_build_seeds_defaults_and_publishes_generation() {
    let dir = tempfile::tempdir().unwrap();
    let db = open_test_db(&dir).await;

    ActionRepository::new(db.clone())
        .insert_batch(&sample_actions())
        .await
        .unwrap();

    let config = BuildConfig {
        batch_size: 1,
        materialize_dense: true,
    };
    let report = run_vector_build(db.clone(), &config).await.unwrap();

    assert_eq!(report.generation, 1);
    // CHEMBL3's only action had an unknown type, so it is omitted.
    assert_eq!(report.vectors_written, 2);
    assert_eq!(report.summary.actions_skipped, 1);
    assert_eq!(report.summary.skipped_by_type["NOT A MECHANISM"], 1);
    // T3 still appears in the universe: it comes from the full relation.
    assert_eq!(report.target_universe, 3);
    assert!(report.dense_materialized);

    // The empty weight table was seeded with the built-in defaults.
    let weights = ActionTypeWeightRepository::new(db.clone())
        .load()
        .await
        .unwrap();
    assert_eq!(weights.len(), 29);

    let vectors = VectorRepository::new(db.clone());
    assert_eq!(vectors.count().await.unwrap(), 2);

    let stored = vectors.get("CHEMBL1").await.unwrap().unwrap();
    assert!(!stored.degenerate);
    assert!((stored.norm() - 1.0).abs() < 1e-5);
    assert!(vectors.get("CHEMBL3").await.unwrap().is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_rebuild_is_idempotent_and_replaces() {
    let dir = tempfile::tempdir().unwrap();
    let db = open_test_db(&dir).await;

    ActionRepository::new(db.clone())
        .insert_batch(&sample_actions())
        .await
        .unwrap();

    let config = BuildConfig::default();
    let first = run_vector_build(db.clone(), &config).await.unwrap();
    let second = run_vector_build(db.clone(), &config).await.unwrap();

    assert_eq!(first.vectors_written, second.vectors_written);
    assert_eq!(second.generation, 2);

    // Replaced, not appended.
    let vectors = VectorRepository::new(db.clone());
    assert_eq!(vectors.count().await.unwrap(), 2);

    let state = vectors.state().await.unwrap().unwrap();
    assert_eq!(state.generation, 2);
    assert!(!db.table_exists("molecular_vectors_g1").await.unwrap());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_custom_weights_are_respected() {
    let dir = tempfile::tempdir().unwrap();
    let db = open_test_db(&dir).await;

    ActionTypeWeightRepository::new(db.clone())
        .upsert_all(&[
            ("INHIBITOR".to_string(), 0.8),
            ("AGONIST".to_string(), 0.6),
        ])
        .await
        .unwrap();

    ActionRepository::new(db.clone())
        .insert_batch(&[
            Action::new("M1", "T1", "INHIBITOR"),
            Action::new("M1", "T2", "AGONIST"),
            Action::new("M2", "T1", "AGONIST"),
        ])
        .await
        .unwrap();

    let report = run_vector_build(db.clone(), &BuildConfig::default())
        .await
        .unwrap();
    assert_eq!(report.vectors_written, 2);

    let vectors = VectorRepository::new(db.clone());
    let m1 = vectors.get("M1").await.unwrap().unwrap();
    // 0.8/0.6 components give a norm of exactly 1, so the stored values are raw.
    assert!((m1.weights["T1"] - 0.8).abs() < 1e-5);
    assert!((m1.weights["T2"] - 0.6).abs() < 1e-5);

    let m2 = vectors.get("M2").await.unwrap().unwrap();
    assert!((m2.weights["T1"] - 1.0).abs() < 1e-5);
}
