//! Pivot table projection over structure columns and material values.
//!
//! # Responsibility
//! - Materialize a row (material) x column (field) grid for the children of
//!   one owner material under one structure.
//!
//! # Invariants
//! - Every emitted row has exactly one cell per column; unset cells are `None`.
//! - Rows follow material `priority ASC, id ASC`; each material appears once.
//! - Localized columns only read values stored under the request locale.
//! - A structure without columns yields an empty, found table.

use crate::db::migrations::ensure_schema_ready;
use crate::model::field::{FieldId, FieldType, FieldValue};
use crate::model::locale::Locale;
use crate::model::material::MaterialId;
use crate::model::resolution::Resolution;
use crate::model::structure::StructureSelector;
use crate::model::table::PivotTable;
use crate::repo::error::RepoResult;
use crate::repo::field_repo::FIELDS_TABLE;
use crate::repo::material_repo::{MATERIALS_TABLE, MATERIAL_FIELDS_TABLE};
use crate::repo::query::{Condition, SelectQuery};
use crate::repo::structure_repo::{
    find_structure, table_columns, STRUCTURES_TABLE, STRUCTURE_FIELDS_TABLE,
    STRUCTURE_MATERIALS_TABLE,
};
use rusqlite::Connection;
use std::collections::{HashMap, HashSet};

/// Hook that may add conditions to the candidate row query.
///
/// The query selects from `materials m` joined to `structure_materials sm`.
pub type RowFilter<'f> = &'f dyn Fn(&mut SelectQuery);

/// Repository interface for pivot table projection.
pub trait TableRepository {
    fn build_table(
        &self,
        owner_id: MaterialId,
        selector: &StructureSelector,
        locale: &Locale,
        row_filter: Option<RowFilter<'_>>,
    ) -> RepoResult<Resolution<PivotTable>>;
}

/// SQLite-backed table repository.
pub struct SqliteTableRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTableRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema_ready(
            conn,
            &[
                STRUCTURES_TABLE,
                STRUCTURE_FIELDS_TABLE,
                STRUCTURE_MATERIALS_TABLE,
                FIELDS_TABLE,
                MATERIALS_TABLE,
                MATERIAL_FIELDS_TABLE,
            ],
        )?;
        Ok(Self { conn })
    }
}

struct Column {
    index: usize,
    field_type: FieldType,
}

impl TableRepository for SqliteTableRepository<'_> {
    fn build_table(
        &self,
        owner_id: MaterialId,
        selector: &StructureSelector,
        locale: &Locale,
        row_filter: Option<RowFilter<'_>>,
    ) -> RepoResult<Resolution<PivotTable>> {
        let Some(structure) = find_structure(self.conn, selector)? else {
            return Ok(Resolution::UnknownStructure(selector.clone()));
        };

        let fields = table_columns(self.conn, structure.id)?;
        if fields.is_empty() {
            return Ok(Resolution::Found(PivotTable::default()));
        }

        let mut column_names = Vec::with_capacity(fields.len());
        let mut columns: HashMap<FieldId, Column> = HashMap::with_capacity(fields.len());
        let mut localized = Vec::new();
        let mut unlocalized = Vec::new();
        for (index, field) in fields.into_iter().enumerate() {
            if field.is_localized {
                localized.push(field.id);
            } else {
                unlocalized.push(field.id);
            }
            columns.insert(
                field.id,
                Column {
                    index,
                    field_type: field.field_type,
                },
            );
            column_names.push(field.name);
        }

        let row_ids = candidate_rows(self.conn, owner_id, structure.id, row_filter)?;
        let column_count = column_names.len();
        let mut rows = vec![vec![None; column_count]; row_ids.len()];
        if row_ids.is_empty() {
            return Ok(Resolution::Found(PivotTable { column_names, rows }));
        }
        let row_index: HashMap<MaterialId, usize> = row_ids
            .iter()
            .enumerate()
            .map(|(index, id)| (*id, index))
            .collect();

        let mut values = SelectQuery::from("material_fields");
        values
            .select("material_id")
            .select("field_id")
            .select("Value")
            .select("numeric_value")
            .select("key_value")
            .where_eq("active", 1_i64)
            .where_in("material_id", row_ids.iter().copied())
            .filter(Condition::any(vec![
                Condition::all(vec![
                    Condition::is_in("field_id", localized),
                    Condition::eq("locale", locale.as_str().to_string()),
                ]),
                Condition::is_in("field_id", unlocalized),
            ]))
            .order_by("id ASC");

        values.for_each_row(self.conn, |row| {
            let material_id: MaterialId = row.get(0)?;
            let field_id: FieldId = row.get(1)?;
            let (Some(&row_at), Some(column)) = (row_index.get(&material_id), columns.get(&field_id))
            else {
                return Ok(());
            };
            if let Some(value) =
                FieldValue::from_slots(column.field_type, row.get(2)?, row.get(3)?, row.get(4)?)
            {
                rows[row_at][column.index] = Some(value);
            }
            Ok(())
        })?;

        Ok(Resolution::Found(PivotTable { column_names, rows }))
    }
}

/// Ids of active children of `owner_id` actively linked to the structure.
fn candidate_rows(
    conn: &Connection,
    owner_id: MaterialId,
    structure_id: i64,
    row_filter: Option<RowFilter<'_>>,
) -> RepoResult<Vec<MaterialId>> {
    let mut query = SelectQuery::from("materials m");
    query
        .select("m.id")
        .join("INNER JOIN structure_materials sm ON sm.material_id = m.id")
        .where_eq("m.parent_id", owner_id)
        .where_eq("m.active", 1_i64)
        .where_eq("sm.structure_id", structure_id)
        .where_eq("sm.active", 1_i64)
        .order_by("m.priority ASC")
        .order_by("m.id ASC");
    if let Some(filter) = row_filter {
        filter(&mut query);
    }

    let mut seen = HashSet::new();
    Ok(query
        .fetch_ids(conn)?
        .into_iter()
        .filter(|id| seen.insert(*id))
        .collect())
}
