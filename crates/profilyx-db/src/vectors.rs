//! Vector store.
//!
//! Persists molecular vectors in two round-trip-equivalent layouts:
//!
//! - *Sparse-encoded*: `(chembl_id, vector)` where `vector` is a JSON keyed
//!   map target → weight. Decoding yields exactly the map that was encoded.
//! - *Dense materialized*: `(chembl_id, <one Float32 column per target>)`
//!   covering the target universe observed at build time, 0.0-filled.
//!
//! Writes are generational: a build creates `molecular_vectors_g{N}` (and
//! optionally `vector_array_g{N}`), loads it in bounded batches, then commits
//! by replacing the single pointer row in `vector_meta`. Readers resolve the
//! pointer first, so a crash mid-build never exposes a partial generation.
//! Batch writes upsert on `chembl_id`, making a retried batch idempotent.
//!
//! The dense layout's column set is fixed at creation time. Reads verify the
//! recorded target universe against the caller's; a mismatch is a
//! [`DbError::SchemaMismatch`] and requires a rebuild, never an in-place
//! schema change.

use crate::database::Database;
use crate::error::{DbError, Result};
use crate::schema::{
    dense_table_name, sparse_table_name, VectorState, META_KEY_VECTOR_STATE, TABLE_VECTOR_META,
};
use crate::schema_arrow::{
    dense_record_to_vector, dense_schema, meta_to_batch, record_to_vector, sparse_vector_schema,
    vectors_to_dense_batch, vectors_to_sparse_batch,
};
use arrow_array::{RecordBatchIterator, StringArray};
use futures::StreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use profilyx_common::records::MolecularVector;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Read-side handle over the published vector generation.
#[derive(Clone)]
pub struct VectorRepository {
    db: Arc<Database>,
}

impl VectorRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// The currently published generation, if any build has committed.
    pub async fn state(&self) -> Result<Option<VectorState>> {
        let table = self
            .db
            .connection()
            .open_table(TABLE_VECTOR_META)
            .execute()
            .await?;

        let mut stream = table
            .query()
            .only_if(format!("key = '{}'", META_KEY_VECTOR_STATE))
            .execute()
            .await?;

        if let Some(batch) = stream.next().await {
            let batch = batch?;
            if batch.num_rows() > 0 {
                let value = batch
                    .column(1)
                    .as_any()
                    .downcast_ref::<StringArray>()
                    .ok_or_else(|| DbError::Arrow("meta value is not Utf8".to_string()))?
                    .value(0)
                    .to_string();
                return Ok(Some(serde_json::from_str(&value)?));
            }
        }

        Ok(None)
    }

    async fn active_state(&self) -> Result<VectorState> {
        self.state().await?.ok_or(DbError::NoActiveGeneration)
    }

    /// Start a new generation. The previous generation (if any) stays live
    /// until [`GenerationWriter::commit`] flips the pointer.
    pub async fn begin_generation(&self) -> Result<GenerationWriter> {
        let generation = match self.state().await? {
            Some(state) => state.generation + 1,
            None => 1,
        };

        let sparse_table = sparse_table_name(generation);

        // A crashed earlier attempt may have left a table under this name.
        self.db.drop_table_if_exists(&sparse_table).await?;
        self.db
            .create_empty_table(&sparse_table, sparse_vector_schema())
            .await?;

        info!(generation, table = %sparse_table, "Started vector generation");

        Ok(GenerationWriter {
            db: self.db.clone(),
            generation,
            sparse_table,
            dense_table: None,
        })
    }

    /// Fetch one vector by molecule ID from the sparse layout.
    pub async fn get(&self, chembl_id: &str) -> Result<Option<MolecularVector>> {
        let state = self.active_state().await?;

        let table = self
            .db
            .connection()
            .open_table(&state.sparse_table)
            .execute()
            .await?;

        let escaped = chembl_id.replace('\'', "''");

        let mut stream = table
            .query()
            .only_if(format!("chembl_id = '{}'", escaped))
            .execute()
            .await?;

        if let Some(batch) = stream.next().await {
            let batch = batch?;
            if batch.num_rows() > 0 {
                return Ok(Some(record_to_vector(&batch, 0)?));
            }
        }

        Ok(None)
    }

    /// Load every stored vector from the sparse layout.
    pub async fn load_all(&self) -> Result<Vec<MolecularVector>> {
        let state = self.active_state().await?;

        let table = self
            .db
            .connection()
            .open_table(&state.sparse_table)
            .execute()
            .await?;

        let mut stream = table.query().execute().await?;

        let mut vectors = Vec::new();
        while let Some(batch) = stream.next().await {
            let batch = batch?;
            for i in 0..batch.num_rows() {
                vectors.push(record_to_vector(&batch, i)?);
            }
        }

        Ok(vectors)
    }

    /// Load the dense matrix, verifying the recorded target universe against
    /// the caller's current one first.
    pub async fn load_dense(&self, current_targets: &[String]) -> Result<Vec<MolecularVector>> {
        let state = self.active_state().await?;
        let dense_table = state
            .dense_table
            .as_deref()
            .ok_or_else(|| DbError::TableNotFound("no dense layout in this generation".into()))?;

        if state.targets != current_targets {
            warn!(
                built = state.targets.len(),
                current = current_targets.len(),
                "Dense layout target universe does not match"
            );
            return Err(DbError::SchemaMismatch {
                built: state.targets.len(),
                current: current_targets.len(),
            });
        }

        let table = self
            .db
            .connection()
            .open_table(dense_table)
            .execute()
            .await?;

        let mut stream = table.query().execute().await?;

        let mut vectors = Vec::new();
        while let Some(batch) = stream.next().await {
            let batch = batch?;
            for i in 0..batch.num_rows() {
                vectors.push(dense_record_to_vector(&batch, i)?);
            }
        }

        Ok(vectors)
    }

    /// Count vectors in the published generation.
    pub async fn count(&self) -> Result<u64> {
        let state = self.active_state().await?;
        let table = self
            .db
            .connection()
            .open_table(&state.sparse_table)
            .execute()
            .await?;
        Ok(table.count_rows(None).await? as u64)
    }
}

/// Write-side handle for one in-flight generation.
pub struct GenerationWriter {
    db: Arc<Database>,
    generation: u64,
    sparse_table: String,
    dense_table: Option<String>,
}

impl GenerationWriter {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Write one bounded batch into the sparse layout. Each call commits
    /// independently; a retry after a failure upserts on `chembl_id`.
    pub async fn write_batch(&self, vectors: &[MolecularVector]) -> Result<()> {
        if vectors.is_empty() {
            return Ok(());
        }

        let table = self
            .db
            .connection()
            .open_table(&self.sparse_table)
            .execute()
            .await?;

        let record = vectors_to_sparse_batch(vectors)?;
        let schema = record.schema();
        let iter = RecordBatchIterator::new(vec![Ok(record)], schema);

        let mut builder = table.merge_insert(&["chembl_id"]);
        builder.when_matched_update_all(None);
        builder.when_not_matched_insert_all();
        builder.execute(Box::new(iter)).await?;

        debug!(
            generation = self.generation,
            rows = vectors.len(),
            "Wrote sparse vector batch"
        );
        Ok(())
    }

    /// Materialize the dense layout for this generation against a fixed
    /// target universe, loading in `batch_size` chunks.
    pub async fn materialize_dense(
        &mut self,
        targets: &[String],
        vectors: &[MolecularVector],
        batch_size: usize,
    ) -> Result<()> {
        let dense_table = dense_table_name(self.generation);

        self.db.drop_table_if_exists(&dense_table).await?;
        self.db
            .create_empty_table(&dense_table, dense_schema(targets))
            .await?;

        let table = self
            .db
            .connection()
            .open_table(&dense_table)
            .execute()
            .await?;

        let batch_size = batch_size.max(1);
        for chunk in vectors.chunks(batch_size) {
            let record = vectors_to_dense_batch(targets, chunk)?;
            let schema = record.schema();
            let iter = RecordBatchIterator::new(vec![Ok(record)], schema);
            table.add(iter).execute().await?;
        }

        info!(
            generation = self.generation,
            rows = vectors.len(),
            columns = targets.len() + 1,
            "Materialized dense vector layout"
        );

        self.dense_table = Some(dense_table);
        Ok(())
    }

    /// Publish this generation: atomically replace the pointer row, then
    /// retire the previous generation's tables.
    pub async fn commit(self, targets: Vec<String>) -> Result<VectorState> {
        let repo = VectorRepository::new(self.db.clone());
        let previous = repo.state().await?;

        let state = VectorState {
            generation: self.generation,
            sparse_table: self.sparse_table.clone(),
            dense_table: self.dense_table.clone(),
            targets,
            built_at: chrono::Utc::now(),
        };

        let table = self
            .db
            .connection()
            .open_table(TABLE_VECTOR_META)
            .execute()
            .await?;

        let record = meta_to_batch(META_KEY_VECTOR_STATE, &serde_json::to_string(&state)?)?;
        let schema = record.schema();
        let iter = RecordBatchIterator::new(vec![Ok(record)], schema);

        let mut builder = table.merge_insert(&["key"]);
        builder.when_matched_update_all(None);
        builder.when_not_matched_insert_all();
        builder.execute(Box::new(iter)).await?;

        info!(generation = state.generation, "Published vector generation");

        // Retire the superseded tables. Best effort: the pointer has already
        // flipped, so a failure here only leaks disk.
        if let Some(previous) = previous {
            if let Err(e) = self.db.drop_table_if_exists(&previous.sparse_table).await {
                warn!(table = %previous.sparse_table, error = %e, "Failed to retire old generation");
            }
            if let Some(old_dense) = previous.dense_table {
                if let Err(e) = self.db.drop_table_if_exists(&old_dense).await {
                    warn!(table = %old_dense, error = %e, "Failed to retire old dense table");
                }
            }
        }

        Ok(state)
    }
}
