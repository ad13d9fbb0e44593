//! Structure repository: navigation nodes, table columns and material links.
//!
//! # Responsibility
//! - Persist structures and resolve them by id or alternate column.
//! - Own the structure -> field column join and the material links.
//!
//! # Invariants
//! - Table columns are ordered by `fields.priority ASC, fields.id ASC`.
//! - Attaching the same field twice is a no-op.

use crate::db::migrations::{ensure_schema_ready, TableRequirement};
use crate::model::field::{Field, FieldId};
use crate::model::material::MaterialId;
use crate::model::structure::{NavigationLink, Structure, StructureId, StructureSelector};
use crate::repo::error::{int_to_bool, RepoResult};
use crate::repo::field_repo::{parse_field_row, FIELDS_TABLE};
use crate::repo::material_repo::{ensure_material_exists, MATERIALS_TABLE};
use rusqlite::types::Value;
use rusqlite::{params, Connection, Row};

pub(crate) const STRUCTURES_TABLE: TableRequirement =
    ("structures", &["id", "name", "url", "active"]);
pub(crate) const STRUCTURE_FIELDS_TABLE: TableRequirement =
    ("structure_fields", &["structure_id", "field_id"]);
pub(crate) const STRUCTURE_MATERIALS_TABLE: TableRequirement = (
    "structure_materials",
    &["id", "structure_id", "material_id", "active", "priority"],
);

/// Repository interface for structure operations.
pub trait StructureRepository {
    fn create_structure(&self, name: &str, url: &str) -> RepoResult<StructureId>;
    /// Looks a structure up by id, name or url. Inactive structures match too.
    fn find_structure(&self, selector: &StructureSelector) -> RepoResult<Option<Structure>>;
    /// Adds `field_id` as a table column of the structure.
    fn attach_field(&self, structure_id: StructureId, field_id: FieldId) -> RepoResult<()>;
    /// Lists the structure's column fields in display order.
    fn table_columns(&self, structure_id: StructureId) -> RepoResult<Vec<Field>>;
    /// Creates an active navigation link and returns its id.
    fn link_material(
        &self,
        structure_id: StructureId,
        material_id: MaterialId,
        priority: i64,
    ) -> RepoResult<i64>;
    /// Lists every link (active or not) of one material.
    fn navigation_links(&self, material_id: MaterialId) -> RepoResult<Vec<NavigationLink>>;
}

/// SQLite-backed structure repository.
pub struct SqliteStructureRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteStructureRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema_ready(
            conn,
            &[
                STRUCTURES_TABLE,
                STRUCTURE_FIELDS_TABLE,
                STRUCTURE_MATERIALS_TABLE,
                FIELDS_TABLE,
                MATERIALS_TABLE,
            ],
        )?;
        Ok(Self { conn })
    }
}

impl StructureRepository for SqliteStructureRepository<'_> {
    fn create_structure(&self, name: &str, url: &str) -> RepoResult<StructureId> {
        self.conn.execute(
            "INSERT INTO structures (name, url, active) VALUES (?1, ?2, 1);",
            params![name, url],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn find_structure(&self, selector: &StructureSelector) -> RepoResult<Option<Structure>> {
        find_structure(self.conn, selector)
    }

    fn attach_field(&self, structure_id: StructureId, field_id: FieldId) -> RepoResult<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO structure_fields (structure_id, field_id)
             VALUES (?1, ?2);",
            params![structure_id, field_id],
        )?;
        Ok(())
    }

    fn table_columns(&self, structure_id: StructureId) -> RepoResult<Vec<Field>> {
        table_columns(self.conn, structure_id)
    }

    fn link_material(
        &self,
        structure_id: StructureId,
        material_id: MaterialId,
        priority: i64,
    ) -> RepoResult<i64> {
        ensure_material_exists(self.conn, material_id)?;
        self.conn.execute(
            "INSERT INTO structure_materials (structure_id, material_id, active, priority)
             VALUES (?1, ?2, 1, ?3);",
            params![structure_id, material_id, priority],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn navigation_links(&self, material_id: MaterialId) -> RepoResult<Vec<NavigationLink>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, structure_id, material_id, active, priority
             FROM structure_materials
             WHERE material_id = ?1
             ORDER BY priority ASC, id ASC;",
        )?;
        let mut rows = stmt.query([material_id])?;
        let mut links = Vec::new();
        while let Some(row) = rows.next()? {
            links.push(NavigationLink {
                id: row.get("id")?,
                structure_id: row.get("structure_id")?,
                material_id: row.get("material_id")?,
                is_active: int_to_bool(row.get("active")?, "structure_materials.active")?,
                priority: row.get("priority")?,
            });
        }
        Ok(links)
    }
}

pub(crate) fn find_structure(
    conn: &Connection,
    selector: &StructureSelector,
) -> RepoResult<Option<Structure>> {
    let (column, key) = match selector {
        StructureSelector::Id(id) => ("id", Value::Integer(*id)),
        StructureSelector::Name(name) => ("name", Value::Text(name.clone())),
        StructureSelector::Url(url) => ("url", Value::Text(url.clone())),
    };

    let mut stmt = conn.prepare(&format!(
        "SELECT id, name, url, active
         FROM structures
         WHERE {column} = ?1
         ORDER BY id ASC
         LIMIT 1;"
    ))?;
    let mut rows = stmt.query([key])?;
    match rows.next()? {
        Some(row) => Ok(Some(parse_structure_row(row)?)),
        None => Ok(None),
    }
}

pub(crate) fn table_columns(conn: &Connection, structure_id: StructureId) -> RepoResult<Vec<Field>> {
    let mut stmt = conn.prepare(
        "SELECT
            f.id AS id,
            f.name AS name,
            f.type AS type,
            f.local AS local,
            f.priority AS priority,
            f.options AS options
         FROM structure_fields sf
         INNER JOIN fields f ON f.id = sf.field_id
         WHERE sf.structure_id = ?1
         ORDER BY f.priority ASC, f.id ASC;",
    )?;
    let mut rows = stmt.query([structure_id])?;
    let mut fields = Vec::new();
    while let Some(row) = rows.next()? {
        fields.push(parse_field_row(row)?);
    }
    Ok(fields)
}

fn parse_structure_row(row: &Row<'_>) -> RepoResult<Structure> {
    Ok(Structure {
        id: row.get("id")?,
        name: row.get("name")?,
        url: row.get("url")?,
        is_active: int_to_bool(row.get("active")?, "structures.active")?,
    })
}
