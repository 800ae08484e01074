//! Action-type weight repository.
//!
//! The weight table is small and static; it is replaced wholesale via upsert
//! and read in full before a build.

use crate::database::Database;
use crate::error::Result;
use crate::schema_arrow::{record_to_weight, weights_to_batch};
use futures::StreamExt;
use lancedb::query::ExecutableQuery;
use std::collections::HashMap;
use std::sync::Arc;

/// Repository for the action-type → weight lookup.
#[derive(Clone)]
pub struct ActionTypeWeightRepository {
    db: Arc<Database>,
}

impl ActionTypeWeightRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Upsert the full weight table. Existing action types are updated,
    /// new ones inserted; types absent from `weights` are left untouched.
    pub async fn upsert_all(&self, weights: &[(String, f32)]) -> Result<()> {
        if weights.is_empty() {
            return Ok(());
        }

        let table = self
            .db
            .connection()
            .open_table(crate::schema::TABLE_ACTION_TYPE_WEIGHTS)
            .execute()
            .await?;

        let record = weights_to_batch(weights)?;
        let schema = record.schema();
        let iter = arrow_array::RecordBatchIterator::new(vec![Ok(record)], schema);

        let mut builder = table.merge_insert(&["action_type"]);
        builder.when_matched_update_all(None);
        builder.when_not_matched_insert_all();
        builder.execute(Box::new(iter)).await?;

        Ok(())
    }

    /// Load the full lookup.
    pub async fn load(&self) -> Result<HashMap<String, f32>> {
        let table = self
            .db
            .connection()
            .open_table(crate::schema::TABLE_ACTION_TYPE_WEIGHTS)
            .execute()
            .await?;

        let mut stream = table.query().execute().await?;

        let mut weights = HashMap::new();
        while let Some(batch) = stream.next().await {
            let batch = batch?;
            for i in 0..batch.num_rows() {
                let (action_type, weight) = record_to_weight(&batch, i)?;
                weights.insert(action_type, weight);
            }
        }

        Ok(weights)
    }
}
