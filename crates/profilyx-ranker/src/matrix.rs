//! Precomputed neighbor ranks.
//!
//! The all-pairs similarity computation is O(n²) in the number of molecules,
//! so it streams one reference molecule at a time and persists each
//! molecule's top-k neighbor list in bounded batches — the full n×n matrix
//! never exists in memory or on disk.

use crate::similarity::rank_vectors;
use anyhow::{Context, Result};
use arrow_array::RecordBatchIterator;
use futures::StreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use profilyx_db::schema_arrow::{rank_schema, ranks_to_batch, record_to_rank};
use profilyx_db::{Database, NeighborRank, VectorRepository, TABLE_SIMILARITY_RANKS};
use std::sync::Arc;
use tracing::info;

async fn flush(db: &Database, buffer: &mut Vec<NeighborRank>) -> Result<()> {
    if buffer.is_empty() {
        return Ok(());
    }

    let table = db
        .connection()
        .open_table(TABLE_SIMILARITY_RANKS)
        .execute()
        .await
        .context("opening similarity_ranks")?;

    let record = ranks_to_batch(buffer).context("encoding neighbor ranks")?;
    let schema = record.schema();
    let iter = RecordBatchIterator::new(vec![Ok(record)], schema);
    table
        .add(iter)
        .execute()
        .await
        .context("writing neighbor rank batch")?;

    buffer.clear();
    Ok(())
}

/// Recompute and persist the top-`k_neighbors` neighbor list for every
/// stored molecule. Replaces any previous ranks. Returns the number of rows
/// written.
pub async fn build_rank_matrix(
    db: Arc<Database>,
    k_neighbors: usize,
    batch_size: usize,
) -> Result<u64> {
    let vectors = VectorRepository::new(db.clone())
        .load_all()
        .await
        .context("loading vector pool")?;

    // Rebuilds replace: start from an empty table.
    db.drop_table_if_exists(TABLE_SIMILARITY_RANKS)
        .await
        .context("dropping previous ranks")?;
    db.create_empty_table(TABLE_SIMILARITY_RANKS, rank_schema())
        .await
        .context("recreating similarity_ranks")?;

    let batch_size = batch_size.max(1);
    let mut buffer: Vec<NeighborRank> = Vec::with_capacity(batch_size);
    let mut written: u64 = 0;

    for vector in &vectors {
        let ranked = rank_vectors(vector, &vectors, k_neighbors, false);
        for (position, (neighbor_id, score)) in ranked.into_iter().enumerate() {
            buffer.push(NeighborRank {
                chembl_id: vector.chembl_id.clone(),
                neighbor_id,
                rank: position as i64 + 1,
                score,
            });
            written += 1;
            if buffer.len() >= batch_size {
                flush(&db, &mut buffer).await?;
            }
        }
    }
    flush(&db, &mut buffer).await?;

    info!(
        molecules = vectors.len(),
        rows = written,
        "Neighbor rank matrix rebuilt"
    );
    Ok(written)
}

/// Read back one molecule's persisted neighbor list, ordered by rank.
pub async fn load_neighbors(db: &Database, chembl_id: &str) -> Result<Vec<NeighborRank>> {
    let table = db
        .connection()
        .open_table(TABLE_SIMILARITY_RANKS)
        .execute()
        .await
        .context("opening similarity_ranks")?;

    let escaped = chembl_id.replace('\'', "''");

    let mut stream = table
        .query()
        .only_if(format!("chembl_id = '{}'", escaped))
        .execute()
        .await
        .context("querying neighbor ranks")?;

    let mut neighbors = Vec::new();
    while let Some(batch) = stream.next().await {
        let batch = batch.context("reading neighbor rank batch")?;
        for i in 0..batch.num_rows() {
            neighbors.push(record_to_rank(&batch, i).context("decoding neighbor rank")?);
        }
    }

    neighbors.sort_by_key(|n| n.rank);
    Ok(neighbors)
}
