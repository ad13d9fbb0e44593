//! Field schema repository and field type resolution.
//!
//! # Responsibility
//! - Persist and load field schema rows.
//! - Resolve a field id into the descriptor used to filter and read values.
//!
//! # Invariants
//! - An unknown field id resolves to `None`, never to an error.

use crate::db::migrations::{ensure_schema_ready, TableRequirement};
use crate::model::field::{Field, FieldDescriptor, FieldId, FieldType, NewField};
use crate::repo::error::{bool_to_int, int_to_bool, RepoResult};
use rusqlite::{params, Connection, OptionalExtension, Row};

pub(crate) const FIELDS_TABLE: TableRequirement = (
    "fields",
    &["id", "name", "type", "local", "priority", "options"],
);

const FIELD_SELECT_SQL: &str = "SELECT id, name, type, local, priority, options FROM fields";

/// Repository interface for field schema operations.
pub trait FieldRepository {
    fn create_field(&self, field: &NewField) -> RepoResult<FieldId>;
    fn get_field(&self, id: FieldId) -> RepoResult<Option<Field>>;
    fn field_by_name(&self, name: &str) -> RepoResult<Option<Field>>;
    /// Resolves declared type, locale sensitivity and value column.
    fn resolve_field(&self, id: FieldId) -> RepoResult<Option<FieldDescriptor>>;
}

/// SQLite-backed field repository.
pub struct SqliteFieldRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteFieldRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema_ready(conn, &[FIELDS_TABLE])?;
        Ok(Self { conn })
    }
}

impl FieldRepository for SqliteFieldRepository<'_> {
    fn create_field(&self, field: &NewField) -> RepoResult<FieldId> {
        self.conn.execute(
            "INSERT INTO fields (name, type, local, priority, options)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                field.name.as_str(),
                field.field_type.to_db(),
                bool_to_int(field.is_localized),
                field.priority,
                field.options.as_str(),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_field(&self, id: FieldId) -> RepoResult<Option<Field>> {
        load_field(self.conn, id)
    }

    fn field_by_name(&self, name: &str) -> RepoResult<Option<Field>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{FIELD_SELECT_SQL} WHERE name = ?1;"))?;
        let mut rows = stmt.query([name])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_field_row(row)?)),
            None => Ok(None),
        }
    }

    fn resolve_field(&self, id: FieldId) -> RepoResult<Option<FieldDescriptor>> {
        resolve_descriptor(self.conn, id)
    }
}

pub(crate) fn load_field(conn: &Connection, id: FieldId) -> RepoResult<Option<Field>> {
    let mut stmt = conn.prepare(&format!("{FIELD_SELECT_SQL} WHERE id = ?1;"))?;
    let mut rows = stmt.query([id])?;
    match rows.next()? {
        Some(row) => Ok(Some(parse_field_row(row)?)),
        None => Ok(None),
    }
}

pub(crate) fn resolve_descriptor(
    conn: &Connection,
    id: FieldId,
) -> RepoResult<Option<FieldDescriptor>> {
    let row: Option<(i64, i64)> = conn
        .query_row(
            "SELECT type, local FROM fields WHERE id = ?1;",
            [id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    let Some((type_code, local)) = row else {
        return Ok(None);
    };
    let field_type = FieldType::from_db(type_code);
    Ok(Some(FieldDescriptor {
        field_id: id,
        field_type,
        is_localized: int_to_bool(local, "fields.local")?,
        value_column: field_type.value_column(),
    }))
}

pub(crate) fn parse_field_row(row: &Row<'_>) -> RepoResult<Field> {
    Ok(Field {
        id: row.get("id")?,
        name: row.get("name")?,
        field_type: FieldType::from_db(row.get("type")?),
        is_localized: int_to_bool(row.get("local")?, "fields.local")?,
        priority: row.get("priority")?,
        options: row.get("options")?,
    })
}
