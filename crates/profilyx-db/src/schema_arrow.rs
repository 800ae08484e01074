//! Arrow schema and conversion utilities for LanceDB.
//!
//! Write paths convert whole batches of typed records into a single
//! `RecordBatch`; read paths pull one typed record out of a batch row.
//! List-valued substance fields (trade names, synonyms) are stored as JSON
//! strings, as is the sparse vector payload.

use crate::error::{DbError, Result};
use crate::schema::NeighborRank;
use arrow_array::{Array, Float32Array, Int64Array, RecordBatch, StringArray};
use arrow_schema::{DataType, Field, Schema};
use profilyx_common::records::{Action, Disease, DiseaseTarget, MolecularVector, Substance};
use std::collections::BTreeMap;
use std::sync::Arc;

fn get_string(batch: &RecordBatch, col: usize, row: usize) -> Result<String> {
    let arr = batch
        .column(col)
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| DbError::Arrow(format!("column {col} is not Utf8")))?;
    Ok(arr.value(row).to_string())
}

fn get_opt_string(batch: &RecordBatch, col: usize, row: usize) -> Result<Option<String>> {
    let arr = batch
        .column(col)
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| DbError::Arrow(format!("column {col} is not Utf8")))?;
    if arr.is_null(row) {
        Ok(None)
    } else {
        Ok(Some(arr.value(row).to_string()))
    }
}

fn get_f32(batch: &RecordBatch, col: usize, row: usize) -> Result<f32> {
    let arr = batch
        .column(col)
        .as_any()
        .downcast_ref::<Float32Array>()
        .ok_or_else(|| DbError::Arrow(format!("column {col} is not Float32")))?;
    Ok(arr.value(row))
}

fn get_i64(batch: &RecordBatch, col: usize, row: usize) -> Result<i64> {
    let arr = batch
        .column(col)
        .as_any()
        .downcast_ref::<Int64Array>()
        .ok_or_else(|| DbError::Arrow(format!("column {col} is not Int64")))?;
    Ok(arr.value(row))
}

// =============================================================================
// Substance
// =============================================================================

pub fn substance_schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("chembl_id", DataType::Utf8, false),
        Field::new("name", DataType::Utf8, true),
        Field::new("trade_names", DataType::Utf8, true),
        Field::new("synonyms", DataType::Utf8, true),
        Field::new("description", DataType::Utf8, true),
    ]))
}

pub fn substances_to_batch(substances: &[Substance]) -> Result<RecordBatch> {
    let schema = substance_schema();

    let chembl_id = StringArray::from(
        substances.iter().map(|s| s.chembl_id.as_str()).collect::<Vec<_>>(),
    );
    let name = StringArray::from(
        substances.iter().map(|s| s.name.as_deref()).collect::<Vec<_>>(),
    );
    let trade_names = StringArray::from(
        substances
            .iter()
            .map(|s| serde_json::to_string(&s.trade_names))
            .collect::<std::result::Result<Vec<_>, _>>()?,
    );
    let synonyms = StringArray::from(
        substances
            .iter()
            .map(|s| serde_json::to_string(&s.synonyms))
            .collect::<std::result::Result<Vec<_>, _>>()?,
    );
    let description = StringArray::from(
        substances.iter().map(|s| s.description.as_deref()).collect::<Vec<_>>(),
    );

    RecordBatch::try_new(
        schema,
        vec![
            Arc::new(chembl_id) as Arc<dyn Array>,
            Arc::new(name),
            Arc::new(trade_names),
            Arc::new(synonyms),
            Arc::new(description),
        ],
    )
    .map_err(|e| DbError::Arrow(e.to_string()))
}

pub fn record_to_substance(batch: &RecordBatch, row: usize) -> Result<Substance> {
    let trade_names = match get_opt_string(batch, 2, row)? {
        Some(raw) => serde_json::from_str(&raw)?,
        None => Vec::new(),
    };
    let synonyms = match get_opt_string(batch, 3, row)? {
        Some(raw) => serde_json::from_str(&raw)?,
        None => Vec::new(),
    };
    Ok(Substance {
        chembl_id: get_string(batch, 0, row)?,
        name: get_opt_string(batch, 1, row)?,
        trade_names,
        synonyms,
        description: get_opt_string(batch, 4, row)?,
    })
}

// =============================================================================
// Disease / DiseaseTarget
// =============================================================================

pub fn disease_schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("disease_id", DataType::Utf8, false),
        Field::new("name", DataType::Utf8, false),
        Field::new("description", DataType::Utf8, true),
    ]))
}

pub fn diseases_to_batch(diseases: &[Disease]) -> Result<RecordBatch> {
    let schema = disease_schema();

    let disease_id = StringArray::from(
        diseases.iter().map(|d| d.disease_id.as_str()).collect::<Vec<_>>(),
    );
    let name = StringArray::from(diseases.iter().map(|d| d.name.as_str()).collect::<Vec<_>>());
    let description = StringArray::from(
        diseases.iter().map(|d| d.description.as_deref()).collect::<Vec<_>>(),
    );

    RecordBatch::try_new(
        schema,
        vec![
            Arc::new(disease_id) as Arc<dyn Array>,
            Arc::new(name),
            Arc::new(description),
        ],
    )
    .map_err(|e| DbError::Arrow(e.to_string()))
}

pub fn record_to_disease(batch: &RecordBatch, row: usize) -> Result<Disease> {
    Ok(Disease {
        disease_id: get_string(batch, 0, row)?,
        name: get_string(batch, 1, row)?,
        description: get_opt_string(batch, 2, row)?,
    })
}

pub fn disease_target_schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("disease_id", DataType::Utf8, false),
        Field::new("target_id", DataType::Utf8, false),
    ]))
}

pub fn disease_targets_to_batch(links: &[DiseaseTarget]) -> Result<RecordBatch> {
    let schema = disease_target_schema();

    let disease_id = StringArray::from(
        links.iter().map(|l| l.disease_id.as_str()).collect::<Vec<_>>(),
    );
    let target_id = StringArray::from(
        links.iter().map(|l| l.target_id.as_str()).collect::<Vec<_>>(),
    );

    RecordBatch::try_new(
        schema,
        vec![Arc::new(disease_id) as Arc<dyn Array>, Arc::new(target_id)],
    )
    .map_err(|e| DbError::Arrow(e.to_string()))
}

pub fn record_to_disease_target(batch: &RecordBatch, row: usize) -> Result<DiseaseTarget> {
    Ok(DiseaseTarget {
        disease_id: get_string(batch, 0, row)?,
        target_id: get_string(batch, 1, row)?,
    })
}

// =============================================================================
// Action
// =============================================================================

pub fn action_schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("chembl_id", DataType::Utf8, false),
        Field::new("target_id", DataType::Utf8, false),
        Field::new("action_type", DataType::Utf8, false),
    ]))
}

pub fn actions_to_batch(actions: &[Action]) -> Result<RecordBatch> {
    let schema = action_schema();

    let chembl_id = StringArray::from(
        actions.iter().map(|a| a.chembl_id.as_str()).collect::<Vec<_>>(),
    );
    let target_id = StringArray::from(
        actions.iter().map(|a| a.target_id.as_str()).collect::<Vec<_>>(),
    );
    let action_type = StringArray::from(
        actions.iter().map(|a| a.action_type.as_str()).collect::<Vec<_>>(),
    );

    RecordBatch::try_new(
        schema,
        vec![
            Arc::new(chembl_id) as Arc<dyn Array>,
            Arc::new(target_id),
            Arc::new(action_type),
        ],
    )
    .map_err(|e| DbError::Arrow(e.to_string()))
}

pub fn record_to_action(batch: &RecordBatch, row: usize) -> Result<Action> {
    Ok(Action {
        chembl_id: get_string(batch, 0, row)?,
        target_id: get_string(batch, 1, row)?,
        action_type: get_string(batch, 2, row)?,
    })
}

// =============================================================================
// Action-type weights
// =============================================================================

pub fn weight_schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("action_type", DataType::Utf8, false),
        Field::new("weight", DataType::Float32, false),
    ]))
}

pub fn weights_to_batch(weights: &[(String, f32)]) -> Result<RecordBatch> {
    let schema = weight_schema();

    let action_type = StringArray::from(
        weights.iter().map(|(t, _)| t.as_str()).collect::<Vec<_>>(),
    );
    let weight = Float32Array::from(weights.iter().map(|(_, w)| *w).collect::<Vec<_>>());

    RecordBatch::try_new(
        schema,
        vec![Arc::new(action_type) as Arc<dyn Array>, Arc::new(weight)],
    )
    .map_err(|e| DbError::Arrow(e.to_string()))
}

pub fn record_to_weight(batch: &RecordBatch, row: usize) -> Result<(String, f32)> {
    Ok((get_string(batch, 0, row)?, get_f32(batch, 1, row)?))
}

// =============================================================================
// Vector meta (generation pointer)
// =============================================================================

pub fn meta_schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("key", DataType::Utf8, false),
        Field::new("value", DataType::Utf8, false),
    ]))
}

pub fn meta_to_batch(key: &str, value: &str) -> Result<RecordBatch> {
    let schema = meta_schema();
    let key = StringArray::from(vec![key]);
    let value = StringArray::from(vec![value]);

    RecordBatch::try_new(schema, vec![Arc::new(key) as Arc<dyn Array>, Arc::new(value)])
        .map_err(|e| DbError::Arrow(e.to_string()))
}

// =============================================================================
// Sparse vectors
// =============================================================================

pub fn sparse_vector_schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("chembl_id", DataType::Utf8, false),
        Field::new("vector", DataType::Utf8, false),
    ]))
}

pub fn vectors_to_sparse_batch(vectors: &[MolecularVector]) -> Result<RecordBatch> {
    let schema = sparse_vector_schema();

    let chembl_id = StringArray::from(
        vectors.iter().map(|v| v.chembl_id.as_str()).collect::<Vec<_>>(),
    );
    let vector = StringArray::from(
        vectors
            .iter()
            .map(|v| serde_json::to_string(&v.weights))
            .collect::<std::result::Result<Vec<_>, _>>()?,
    );

    RecordBatch::try_new(
        schema,
        vec![Arc::new(chembl_id) as Arc<dyn Array>, Arc::new(vector)],
    )
    .map_err(|e| DbError::Arrow(e.to_string()))
}

pub fn record_to_vector(batch: &RecordBatch, row: usize) -> Result<MolecularVector> {
    let chembl_id = get_string(batch, 0, row)?;
    let weights: BTreeMap<String, f32> = serde_json::from_str(&get_string(batch, 1, row)?)?;
    let degenerate = weights.values().all(|w| *w == 0.0);
    Ok(MolecularVector {
        chembl_id,
        weights,
        degenerate,
    })
}

// =============================================================================
// Dense layout (one Float32 column per target)
// =============================================================================

pub fn dense_schema(targets: &[String]) -> Arc<Schema> {
    let mut fields = vec![Field::new("chembl_id", DataType::Utf8, false)];
    for target in targets {
        fields.push(Field::new(target, DataType::Float32, false));
    }
    Arc::new(Schema::new(fields))
}

/// Materialize a batch of sparse vectors against a fixed target universe,
/// filling 0.0 for every absent molecule-target pair.
pub fn vectors_to_dense_batch(
    targets: &[String],
    vectors: &[MolecularVector],
) -> Result<RecordBatch> {
    let schema = dense_schema(targets);

    let mut columns: Vec<Arc<dyn Array>> = Vec::with_capacity(targets.len() + 1);
    columns.push(Arc::new(StringArray::from(
        vectors.iter().map(|v| v.chembl_id.as_str()).collect::<Vec<_>>(),
    )));
    for target in targets {
        let values = Float32Array::from(
            vectors
                .iter()
                .map(|v| v.weights.get(target).copied().unwrap_or(0.0))
                .collect::<Vec<_>>(),
        );
        columns.push(Arc::new(values));
    }

    RecordBatch::try_new(schema, columns).map_err(|e| DbError::Arrow(e.to_string()))
}

/// Decode one dense row back into the canonical sparse form. Zero cells are
/// dropped (absent and 0.0 are indistinguishable in the dense layout); a row
/// with no nonzero cell decodes as a degenerate vector.
pub fn dense_record_to_vector(batch: &RecordBatch, row: usize) -> Result<MolecularVector> {
    let chembl_id = get_string(batch, 0, row)?;
    let schema = batch.schema();

    let mut weights = BTreeMap::new();
    for col in 1..batch.num_columns() {
        let value = get_f32(batch, col, row)?;
        if value != 0.0 {
            weights.insert(schema.field(col).name().clone(), value);
        }
    }
    let degenerate = weights.is_empty();
    Ok(MolecularVector {
        chembl_id,
        weights,
        degenerate,
    })
}

// =============================================================================
// Neighbor ranks
// =============================================================================

pub fn rank_schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("chembl_id", DataType::Utf8, false),
        Field::new("neighbor_id", DataType::Utf8, false),
        Field::new("rank", DataType::Int64, false),
        Field::new("score", DataType::Float32, false),
    ]))
}

pub fn ranks_to_batch(ranks: &[NeighborRank]) -> Result<RecordBatch> {
    let schema = rank_schema();

    let chembl_id = StringArray::from(
        ranks.iter().map(|r| r.chembl_id.as_str()).collect::<Vec<_>>(),
    );
    let neighbor_id = StringArray::from(
        ranks.iter().map(|r| r.neighbor_id.as_str()).collect::<Vec<_>>(),
    );
    let rank = Int64Array::from(ranks.iter().map(|r| r.rank).collect::<Vec<_>>());
    let score = Float32Array::from(ranks.iter().map(|r| r.score).collect::<Vec<_>>());

    RecordBatch::try_new(
        schema,
        vec![
            Arc::new(chembl_id) as Arc<dyn Array>,
            Arc::new(neighbor_id),
            Arc::new(rank),
            Arc::new(score),
        ],
    )
    .map_err(|e| DbError::Arrow(e.to_string()))
}

pub fn record_to_rank(batch: &RecordBatch, row: usize) -> Result<NeighborRank> {
    Ok(NeighborRank {
        chembl_id: get_string(batch, 0, row)?,
        neighbor_id: get_string(batch, 1, row)?,
        rank: get_i64(batch, 2, row)?,
        score: get_f32(batch, 3, row)?,
    })
}
