//! Action repository.
//!
//! Read/write access to the mechanism-of-action relation the vector builder
//! consumes.

use crate::database::Database;
use crate::error::Result;
use crate::schema_arrow::{actions_to_batch, record_to_action};
use futures::StreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use profilyx_common::records::Action;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Repository for action records.
#[derive(Clone)]
pub struct ActionRepository {
    db: Arc<Database>,
}

impl ActionRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Insert a batch of action records.
    pub async fn insert_batch(&self, actions: &[Action]) -> Result<()> {
        if actions.is_empty() {
            return Ok(());
        }

        let table = self
            .db
            .connection()
            .open_table(crate::schema::TABLE_ACTIONS)
            .execute()
            .await?;

        let record = actions_to_batch(actions)?;
        let schema = record.schema();
        let iter = arrow_array::RecordBatchIterator::new(vec![Ok(record)], schema);

        table.add(iter).execute().await?;
        Ok(())
    }

    /// Fetch the full action relation.
    pub async fn all(&self) -> Result<Vec<Action>> {
        let table = self
            .db
            .connection()
            .open_table(crate::schema::TABLE_ACTIONS)
            .execute()
            .await?;

        let mut stream = table.query().execute().await?;

        let mut actions = Vec::new();
        while let Some(batch) = stream.next().await {
            let batch = batch?;
            for i in 0..batch.num_rows() {
                actions.push(record_to_action(&batch, i)?);
            }
        }

        Ok(actions)
    }

    /// All actions for one molecule.
    pub async fn find_by_molecule(&self, chembl_id: &str) -> Result<Vec<Action>> {
        let table = self
            .db
            .connection()
            .open_table(crate::schema::TABLE_ACTIONS)
            .execute()
            .await?;

        let escaped = chembl_id.replace('\'', "''");

        let mut stream = table
            .query()
            .only_if(format!("chembl_id = '{}'", escaped))
            .execute()
            .await?;

        let mut actions = Vec::new();
        while let Some(batch) = stream.next().await {
            let batch = batch?;
            for i in 0..batch.num_rows() {
                actions.push(record_to_action(&batch, i)?);
            }
        }

        Ok(actions)
    }

    /// The distinct target IDs observed across the whole relation, sorted.
    /// This is the target universe a dense vector generation is built against.
    pub async fn distinct_targets(&self) -> Result<Vec<String>> {
        let actions = self.all().await?;
        let targets: BTreeSet<String> = actions.into_iter().map(|a| a.target_id).collect();
        Ok(targets.into_iter().collect())
    }

    /// Count total action records.
    pub async fn count(&self) -> Result<u64> {
        let table = self
            .db
            .connection()
            .open_table(crate::schema::TABLE_ACTIONS)
            .execute()
            .await?;
        Ok(table.count_rows(None).await? as u64)
    }
}
