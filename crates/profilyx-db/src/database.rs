//! Database connection and table management.
//!
//! Provides a unified interface for LanceDB operations.

use crate::error::Result;
use crate::schema;
use crate::schema_arrow;
use arrow_array::RecordBatchIterator;
use arrow_schema::Schema;
use lancedb::connection::Connection;
use std::path::Path;
use std::sync::Arc;

/// Main database handle. Cheap to clone; repositories receive it explicitly
/// rather than reaching for process-wide state.
#[derive(Clone)]
pub struct Database {
    conn: Connection,
    path: String,
}

impl Database {
    /// Open or create a database at the specified path.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();

        if !path.as_ref().exists() {
            std::fs::create_dir_all(path.as_ref())?;
        }

        let conn = lancedb::connect(&path_str).execute().await?;

        Ok(Self {
            conn,
            path: path_str,
        })
    }

    /// Get the underlying connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Get the database path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Initialize the fixed tables, creating any that don't exist.
    ///
    /// Vector generation tables (`molecular_vectors_g{N}`, `vector_array_g{N}`)
    /// are created per build by [`crate::VectorRepository`] and are not
    /// bootstrapped here. LanceDB requires a schema to create a table, so each
    /// is created from an empty batch iterator.
    pub async fn initialize(&self) -> Result<()> {
        if !self.table_exists(schema::TABLE_SUBSTANCES).await? {
            self.create_empty_table(schema::TABLE_SUBSTANCES, schema_arrow::substance_schema())
                .await?;
        }

        if !self.table_exists(schema::TABLE_DISEASES).await? {
            self.create_empty_table(schema::TABLE_DISEASES, schema_arrow::disease_schema())
                .await?;
        }

        if !self.table_exists(schema::TABLE_DISEASE_TARGETS).await? {
            self.create_empty_table(
                schema::TABLE_DISEASE_TARGETS,
                schema_arrow::disease_target_schema(),
            )
            .await?;
        }

        if !self.table_exists(schema::TABLE_ACTIONS).await? {
            self.create_empty_table(schema::TABLE_ACTIONS, schema_arrow::action_schema())
                .await?;
        }

        if !self.table_exists(schema::TABLE_ACTION_TYPE_WEIGHTS).await? {
            self.create_empty_table(
                schema::TABLE_ACTION_TYPE_WEIGHTS,
                schema_arrow::weight_schema(),
            )
            .await?;
        }

        if !self.table_exists(schema::TABLE_VECTOR_META).await? {
            self.create_empty_table(schema::TABLE_VECTOR_META, schema_arrow::meta_schema())
                .await?;
        }

        if !self.table_exists(schema::TABLE_SIMILARITY_RANKS).await? {
            self.create_empty_table(schema::TABLE_SIMILARITY_RANKS, schema_arrow::rank_schema())
                .await?;
        }

        Ok(())
    }

    /// Check if a table exists.
    pub async fn table_exists(&self, name: &str) -> Result<bool> {
        let tables = self.conn.table_names().execute().await?;
        Ok(tables.contains(&name.to_string()))
    }

    /// Create a table from a schema with no initial rows.
    pub async fn create_empty_table(&self, name: &str, schema: Arc<Schema>) -> Result<()> {
        let empty_iter = RecordBatchIterator::new(vec![], schema);
        self.conn.create_table(name, empty_iter).execute().await?;
        Ok(())
    }

    /// Drop a table if it exists. Used when retiring old vector generations.
    pub async fn drop_table_if_exists(&self, name: &str) -> Result<()> {
        if self.table_exists(name).await? {
            self.conn.drop_table(name).await?;
        }
        Ok(())
    }

    /// Optimize all tables.
    pub async fn optimize(&self) -> Result<()> {
        let tables = self.conn.table_names().execute().await?;

        for table_name in tables {
            let table = self.conn.open_table(&table_name).execute().await?;
            table
                .optimize(lancedb::table::OptimizeAction::default())
                .await?;
        }

        Ok(())
    }

    async fn count_if_exists(&self, name: &str) -> Result<u64> {
        if self.table_exists(name).await? {
            let table = self.conn.open_table(name).execute().await?;
            Ok(table.count_rows(None).await? as u64)
        } else {
            Ok(0)
        }
    }

    /// Get table statistics.
    pub async fn stats(&self) -> Result<DatabaseStats> {
        Ok(DatabaseStats {
            substances: self.count_if_exists(schema::TABLE_SUBSTANCES).await?,
            diseases: self.count_if_exists(schema::TABLE_DISEASES).await?,
            disease_targets: self.count_if_exists(schema::TABLE_DISEASE_TARGETS).await?,
            actions: self.count_if_exists(schema::TABLE_ACTIONS).await?,
            action_type_weights: self
                .count_if_exists(schema::TABLE_ACTION_TYPE_WEIGHTS)
                .await?,
        })
    }
}

/// Database statistics.
#[derive(Debug, Clone, Default)]
pub struct DatabaseStats {
    pub substances: u64,
    pub diseases: u64,
    pub disease_targets: u64,
    pub actions: u64,
    pub action_type_weights: u64,
}
