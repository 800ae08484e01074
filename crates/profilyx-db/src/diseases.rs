//! Disease and disease-target repositories.
//!
//! Diseases carry the free-text searchable metadata used for resolution;
//! the disease-target relation supplies the filter predicate for
//! disease-restricted similarity.

use crate::database::Database;
use crate::error::Result;
use crate::schema_arrow::{
    disease_targets_to_batch, diseases_to_batch, record_to_disease, record_to_disease_target,
};
use futures::StreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use profilyx_common::records::{Disease, DiseaseTarget};
use std::collections::HashSet;
use std::sync::Arc;

/// Repository for disease metadata.
#[derive(Clone)]
pub struct DiseaseRepository {
    db: Arc<Database>,
}

impl DiseaseRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Insert a batch of diseases.
    pub async fn insert_batch(&self, diseases: &[Disease]) -> Result<()> {
        if diseases.is_empty() {
            return Ok(());
        }

        let table = self
            .db
            .connection()
            .open_table(crate::schema::TABLE_DISEASES)
            .execute()
            .await?;

        let record = diseases_to_batch(diseases)?;
        let schema = record.schema();
        let iter = arrow_array::RecordBatchIterator::new(vec![Ok(record)], schema);

        table.add(iter).execute().await?;
        Ok(())
    }

    /// Find a disease by its exact ID.
    pub async fn find_by_id(&self, disease_id: &str) -> Result<Option<Disease>> {
        let table = self
            .db
            .connection()
            .open_table(crate::schema::TABLE_DISEASES)
            .execute()
            .await?;

        let escaped = disease_id.replace('\'', "''");

        let mut stream = table
            .query()
            .only_if(format!("disease_id = '{}'", escaped))
            .execute()
            .await?;

        if let Some(batch) = stream.next().await {
            let batch = batch?;
            if batch.num_rows() > 0 {
                return Ok(Some(record_to_disease(&batch, 0)?));
            }
        }

        Ok(None)
    }

    /// Case-insensitive fragment search over name and description.
    pub async fn search(&self, text: &str) -> Result<Vec<Disease>> {
        let table = self
            .db
            .connection()
            .open_table(crate::schema::TABLE_DISEASES)
            .execute()
            .await?;

        let escaped = text.replace('\'', "''");

        let filter = format!(
            "name ILIKE '%{}%' OR description ILIKE '%{}%'",
            escaped, escaped
        );

        let mut stream = table.query().only_if(filter).execute().await?;

        let mut diseases = Vec::new();
        while let Some(batch) = stream.next().await {
            let batch = batch?;
            for i in 0..batch.num_rows() {
                diseases.push(record_to_disease(&batch, i)?);
            }
        }

        Ok(diseases)
    }

    /// Count total diseases.
    pub async fn count(&self) -> Result<u64> {
        let table = self
            .db
            .connection()
            .open_table(crate::schema::TABLE_DISEASES)
            .execute()
            .await?;
        Ok(table.count_rows(None).await? as u64)
    }
}

/// Repository for the disease→target relation.
#[derive(Clone)]
pub struct DiseaseTargetRepository {
    db: Arc<Database>,
}

impl DiseaseTargetRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Insert a batch of disease-target links.
    pub async fn insert_batch(&self, links: &[DiseaseTarget]) -> Result<()> {
        if links.is_empty() {
            return Ok(());
        }

        let table = self
            .db
            .connection()
            .open_table(crate::schema::TABLE_DISEASE_TARGETS)
            .execute()
            .await?;

        let record = disease_targets_to_batch(links)?;
        let schema = record.schema();
        let iter = arrow_array::RecordBatchIterator::new(vec![Ok(record)], schema);

        table.add(iter).execute().await?;
        Ok(())
    }

    /// The distinct target IDs associated with a disease. An empty set is a
    /// valid outcome (disease known, no targets linked).
    pub async fn targets_for(&self, disease_id: &str) -> Result<HashSet<String>> {
        let table = self
            .db
            .connection()
            .open_table(crate::schema::TABLE_DISEASE_TARGETS)
            .execute()
            .await?;

        let escaped = disease_id.replace('\'', "''");

        let mut stream = table
            .query()
            .only_if(format!("disease_id = '{}'", escaped))
            .execute()
            .await?;

        let mut targets = HashSet::new();
        while let Some(batch) = stream.next().await {
            let batch = batch?;
            for i in 0..batch.num_rows() {
                targets.insert(record_to_disease_target(&batch, i)?.target_id);
            }
        }

        Ok(targets)
    }
}
