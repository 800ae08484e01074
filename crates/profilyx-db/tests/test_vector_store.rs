//! End-to-end tests for the vector store against a temporary embedded database.
//!
//! ```bash
//! cargo test --package profilyx-db --test test_vector_store
//! ```

use profilyx_common::records::{Disease, DiseaseTarget, MolecularVector, Substance};
use profilyx_db::{
    Database, DiseaseRepository, DiseaseTargetRepository, SubstanceRepository, VectorRepository,
};
use std::collections::BTreeMap;
use std::sync::Arc;

async fn open_test_db(dir: &tempfile::TempDir) -> Arc<Database> {
    let db = Database::open(dir.path().join("profilyx.db"))
        .await
        .expect("open database");
    db.initialize().await.expect("initialize tables");
    Arc::new(db)
}

fn vector(id: &str, weights: &[(&str, f32)]) -> MolecularVector {
    let weights: BTreeMap<String, f32> =
        weights.iter().map(|(t, w)| (t.to_string(), *w)).collect();
    let degenerate = weights.values().all(|w| *w == 0.0);
    MolecularVector {
        chembl_id: id.to_string(),
        weights,
        degenerate,
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_initialize_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let db = open_test_db(&dir).await;

    // Second initialize must not fail or clobber anything.
    db.initialize().await.unwrap();

    let stats = db.stats().await.unwrap();
    assert_eq!(stats.substances, 0);
    assert_eq!(stats.actions, 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_sparse_generation_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let db = open_test_db(&dir).await;
    let vectors = VectorRepository::new(db.clone());

    assert!(vectors.state().await.unwrap().is_none());

    let writer = vectors.begin_generation().await.unwrap();
    assert_eq!(writer.generation(), 1);

    let v1 = vector("CHEMBL1", &[("T1", 0.8), ("T2", 0.6)]);
    let v2 = vector("CHEMBL2", &[("T1", 1.0)]);
    writer.write_batch(&[v1.clone()]).await.unwrap();
    writer.write_batch(&[v2.clone()]).await.unwrap();

    let state = writer
        .commit(vec!["T1".to_string(), "T2".to_string()])
        .await
        .unwrap();
    assert_eq!(state.generation, 1);

    assert_eq!(vectors.count().await.unwrap(), 2);
    let stored = vectors.get("CHEMBL1").await.unwrap().expect("CHEMBL1 stored");
    assert_eq!(stored, v1);

    let all = vectors.load_all().await.unwrap();
    assert_eq!(all.len(), 2);

    assert!(vectors.get("CHEMBL999").await.unwrap().is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_batch_retry_upserts_on_chembl_id() {
    let dir = tempfile::tempdir().unwrap();
    let db = open_test_db(&dir).await;
    let vectors = VectorRepository::new(db.clone());

    let writer = vectors.begin_generation().await.unwrap();
    let batch = vec![vector("CHEMBL1", &[("T1", 1.0)])];

    // Replaying a batch (as a crash-recovery retry would) must not duplicate rows.
    writer.write_batch(&batch).await.unwrap();
    writer.write_batch(&batch).await.unwrap();
    writer.commit(vec!["T1".to_string()]).await.unwrap();

    assert_eq!(vectors.count().await.unwrap(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_dense_layout_round_trips_and_checks_universe() {
    let dir = tempfile::tempdir().unwrap();
    let db = open_test_db(&dir).await;
    let vectors = VectorRepository::new(db.clone());

    let targets = vec!["T1".to_string(), "T2".to_string()];
    let built = vec![
        vector("CHEMBL1", &[("T1", 0.8), ("T2", 0.6)]),
        vector("CHEMBL2", &[("T1", 1.0)]),
    ];

    let mut writer = vectors.begin_generation().await.unwrap();
    writer.write_batch(&built).await.unwrap();
    writer
        .materialize_dense(&targets, &built, 1)
        .await
        .unwrap();
    writer.commit(targets.clone()).await.unwrap();

    // Both layouts must read back the same vectors.
    let mut sparse = vectors.load_all().await.unwrap();
    let mut dense = vectors.load_dense(&targets).await.unwrap();
    sparse.sort_by(|a, b| a.chembl_id.cmp(&b.chembl_id));
    dense.sort_by(|a, b| a.chembl_id.cmp(&b.chembl_id));
    assert_eq!(sparse, dense);

    // A grown target universe must be rejected, not silently realigned.
    let grown = vec!["T1".to_string(), "T2".to_string(), "T3".to_string()];
    let err = vectors.load_dense(&grown).await.unwrap_err();
    assert!(matches!(
        err,
        profilyx_db::DbError::SchemaMismatch { built: 2, current: 3 }
    ));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_rebuild_swaps_generation() {
    let dir = tempfile::tempdir().unwrap();
    let db = open_test_db(&dir).await;
    let vectors = VectorRepository::new(db.clone());

    let writer = vectors.begin_generation().await.unwrap();
    writer
        .write_batch(&[vector("CHEMBL1", &[("T1", 1.0)])])
        .await
        .unwrap();
    writer.commit(vec!["T1".to_string()]).await.unwrap();

    let writer = vectors.begin_generation().await.unwrap();
    assert_eq!(writer.generation(), 2);
    writer
        .write_batch(&[vector("CHEMBL2", &[("T2", 1.0)])])
        .await
        .unwrap();
    writer.commit(vec!["T2".to_string()]).await.unwrap();

    // The rebuild replaced, not merged.
    assert_eq!(vectors.count().await.unwrap(), 1);
    assert!(vectors.get("CHEMBL1").await.unwrap().is_none());
    assert!(vectors.get("CHEMBL2").await.unwrap().is_some());

    // The superseded generation's table was retired.
    assert!(!db.table_exists("molecular_vectors_g1").await.unwrap());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_degenerate_vector_survives_storage() {
    let dir = tempfile::tempdir().unwrap();
    let db = open_test_db(&dir).await;
    let vectors = VectorRepository::new(db.clone());

    let writer = vectors.begin_generation().await.unwrap();
    writer
        .write_batch(&[vector("CHEMBL9", &[("T1", 0.0), ("T2", 0.0)])])
        .await
        .unwrap();
    writer.commit(vec![]).await.unwrap();

    let stored = vectors.get("CHEMBL9").await.unwrap().unwrap();
    assert!(stored.degenerate);
    assert_eq!(stored.norm(), 0.0);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_substance_search_matches_id_name_and_trade_name() {
    let dir = tempfile::tempdir().unwrap();
    let db = open_test_db(&dir).await;
    let substances = SubstanceRepository::new(db.clone());

    substances
        .insert_batch(&[
            Substance {
                chembl_id: "CHEMBL25".to_string(),
                name: Some("ASPIRIN".to_string()),
                trade_names: vec!["Ecotrin".to_string()],
                synonyms: vec![],
                description: None,
            },
            Substance {
                chembl_id: "CHEMBL1201496".to_string(),
                name: Some("GEFITINIB".to_string()),
                trade_names: vec!["Iressa".to_string()],
                synonyms: vec![],
                description: None,
            },
        ])
        .await
        .unwrap();

    let by_id = substances.search("CHEMBL25").await.unwrap();
    assert_eq!(by_id.len(), 1);
    assert_eq!(by_id[0].chembl_id, "CHEMBL25");

    // Partial, case-insensitive name match.
    let by_name = substances.search("aspir").await.unwrap();
    assert_eq!(by_name.len(), 1);

    // Partial trade-name match.
    let by_trade = substances.search("iressa").await.unwrap();
    assert_eq!(by_trade.len(), 1);
    assert_eq!(by_trade[0].chembl_id, "CHEMBL1201496");

    assert!(substances.search("no such drug").await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_disease_lookup_and_targets() {
    let dir = tempfile::tempdir().unwrap();
    let db = open_test_db(&dir).await;
    let diseases = DiseaseRepository::new(db.clone());
    let links = DiseaseTargetRepository::new(db.clone());

    diseases
        .insert_batch(&[
            Disease {
                disease_id: "EFO_0000305".to_string(),
                name: "breast carcinoma".to_string(),
                description: Some("carcinoma of the breast".to_string()),
            },
            Disease {
                disease_id: "EFO_0001071".to_string(),
                name: "lung carcinoma".to_string(),
                description: None,
            },
        ])
        .await
        .unwrap();

    links
        .insert_batch(&[
            DiseaseTarget {
                disease_id: "EFO_0000305".to_string(),
                target_id: "ENSG00000141736".to_string(),
            },
            DiseaseTarget {
                disease_id: "EFO_0000305".to_string(),
                target_id: "ENSG00000146648".to_string(),
            },
        ])
        .await
        .unwrap();

    let found = diseases.find_by_id("EFO_0000305").await.unwrap();
    assert_eq!(found.unwrap().name, "breast carcinoma");

    let matches = diseases.search("CARCINOMA").await.unwrap();
    assert_eq!(matches.len(), 2);

    let targets = links.targets_for("EFO_0000305").await.unwrap();
    assert_eq!(targets.len(), 2);
    assert!(targets.contains("ENSG00000141736"));

    let empty = links.targets_for("EFO_0001071").await.unwrap();
    assert!(empty.is_empty());
}
