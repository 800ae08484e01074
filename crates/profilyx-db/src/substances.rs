//! Substance repository.
//!
//! Provides lookups over molecule display metadata, including the text
//! search used for reference-compound resolution.

use crate::database::Database;
use crate::error::Result;
use crate::schema_arrow::{record_to_substance, substances_to_batch};
use futures::StreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use profilyx_common::records::Substance;
use std::sync::Arc;

/// Repository for substance metadata.
#[derive(Clone)]
pub struct SubstanceRepository {
    db: Arc<Database>,
}

impl SubstanceRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Insert a batch of substances.
    pub async fn insert_batch(&self, substances: &[Substance]) -> Result<()> {
        if substances.is_empty() {
            return Ok(());
        }

        let table = self
            .db
            .connection()
            .open_table(crate::schema::TABLE_SUBSTANCES)
            .execute()
            .await?;

        let record = substances_to_batch(substances)?;
        let schema = record.schema();
        let iter = arrow_array::RecordBatchIterator::new(vec![Ok(record)], schema);

        table.add(iter).execute().await?;
        Ok(())
    }

    /// Find a substance by its exact ChEMBL ID.
    pub async fn find_by_id(&self, chembl_id: &str) -> Result<Option<Substance>> {
        let table = self
            .db
            .connection()
            .open_table(crate::schema::TABLE_SUBSTANCES)
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
                return Ok(Some(record_to_substance(&batch, 0)?));
            }
        }

        Ok(None)
    }

    /// Resolve free text against substances: an exact ChEMBL ID, a
    /// case-insensitive partial name match, or a partial trade-name match.
    /// Returns every hit; disambiguation is the caller's concern.
    pub async fn search(&self, text: &str) -> Result<Vec<Substance>> {
        let table = self
            .db
            .connection()
            .open_table(crate::schema::TABLE_SUBSTANCES)
            .execute()
            .await?;

        let escaped = text.replace('\'', "''");

        let filter = format!(
            "chembl_id = '{}' OR name ILIKE '%{}%' OR trade_names ILIKE '%{}%'",
            escaped, escaped, escaped
        );

        let mut stream = table.query().only_if(filter).execute().await?;

        let mut substances = Vec::new();
        while let Some(batch) = stream.next().await {
            let batch = batch?;
            for i in 0..batch.num_rows() {
                substances.push(record_to_substance(&batch, i)?);
            }
        }

        Ok(substances)
    }

    /// Count total substances.
    pub async fn count(&self) -> Result<u64> {
        let table = self
            .db
            .connection()
            .open_table(crate::schema::TABLE_SUBSTANCES)
            .execute()
            .await?;
        Ok(table.count_rows(None).await? as u64)
    }
}
