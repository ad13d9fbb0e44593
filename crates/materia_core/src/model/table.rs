//! Pivot table read model.

use crate::model::field::FieldValue;
use serde::{Deserialize, Serialize};

/// Row (material) x column (field) value grid.
///
/// Serializes as `{"columnNames": [...], "rows": [[value|null, ...]]}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PivotTable {
    pub column_names: Vec<String>,
    /// Every row has exactly `column_names.len()` cells.
    pub rows: Vec<Vec<Option<FieldValue>>>,
}

impl PivotTable {
    pub fn column_count(&self) -> usize {
        self.column_names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns one cell, `None` when out of range or unset.
    pub fn cell(&self, row: usize, column: usize) -> Option<&FieldValue> {
        self.rows.get(row)?.get(column)?.as_ref()
    }
}
