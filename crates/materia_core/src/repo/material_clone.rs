//! Deep copy of a material and the rows that reference it.
//!
//! # Responsibility
//! - Copy the base material row, then its navigation links, attribute
//!   values (minus excluded fields) and gallery rows onto the new id.
//!
//! # Invariants
//! - Copied rows never keep a reference to the source material.
//! - Gallery rows bound to a copied value row follow it to the copy; rows
//!   bound to an excluded value lose the binding.
//! - In `BestEffort` mode nothing is compensated on failure; the error
//!   reports how far the copy got.
//! - `Atomic` inside a caller's open transaction scopes the copy to a
//!   savepoint; the caller's transaction stays open either way.

use crate::model::field::FieldId;
use crate::model::material::MaterialId;
use crate::repo::error::{RepoError, RepoResult};
use crate::repo::material_repo::{ensure_material_exists, CloneMode};
use log::warn;
use rusqlite::{params, Connection, Transaction, TransactionBehavior};
use std::collections::HashMap;

#[derive(Debug, Default)]
struct CloneProgress {
    clone_id: Option<MaterialId>,
    copied_rows: usize,
}

pub(crate) fn copy_material(
    conn: &Connection,
    source_id: MaterialId,
    excluded_field_ids: &[FieldId],
    mode: CloneMode,
) -> RepoResult<MaterialId> {
    ensure_material_exists(conn, source_id)?;
    let mut progress = CloneProgress::default();

    match mode {
        CloneMode::Atomic if !conn.is_autocommit() => {
            let savepoint = CopySavepoint::open(conn)?;
            let copied = copy_graph(conn, source_id, excluded_field_ids, &mut progress)
                .and_then(|clone_id| {
                    savepoint.release()?;
                    Ok(clone_id)
                });
            copied.map_err(|cause| partial_failure(source_id, &progress, true, cause))
        }
        CloneMode::Atomic => {
            let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
            let copied = copy_graph(&tx, source_id, excluded_field_ids, &mut progress)
                .and_then(|clone_id| {
                    tx.commit()?;
                    Ok(clone_id)
                });
            // An uncommitted transaction rolls back when dropped.
            copied.map_err(|cause| partial_failure(source_id, &progress, true, cause))
        }
        CloneMode::BestEffort => copy_graph(conn, source_id, excluded_field_ids, &mut progress)
            .map_err(|cause| partial_failure(source_id, &progress, false, cause)),
    }
}

/// Savepoint over a borrowed connection; rolls back unless released.
struct CopySavepoint<'conn> {
    conn: &'conn Connection,
    released: bool,
}

impl<'conn> CopySavepoint<'conn> {
    fn open(conn: &'conn Connection) -> RepoResult<Self> {
        conn.execute_batch("SAVEPOINT material_copy;")?;
        Ok(Self {
            conn,
            released: false,
        })
    }

    fn release(mut self) -> RepoResult<()> {
        self.conn.execute_batch("RELEASE material_copy;")?;
        self.released = true;
        Ok(())
    }
}

impl Drop for CopySavepoint<'_> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(err) = self
            .conn
            .execute_batch("ROLLBACK TO material_copy; RELEASE material_copy;")
        {
            warn!(
                "event=material_copy module=material status=error phase=savepoint_rollback error={err}"
            );
        }
    }
}

fn partial_failure(
    source_id: MaterialId,
    progress: &CloneProgress,
    rolled_back: bool,
    cause: RepoError,
) -> RepoError {
    RepoError::PartialClone {
        source_id,
        clone_id: if rolled_back { None } else { progress.clone_id },
        copied_rows: progress.copied_rows,
        rolled_back,
        cause: Box::new(cause),
    }
}

fn copy_graph(
    conn: &Connection,
    source_id: MaterialId,
    excluded_field_ids: &[FieldId],
    progress: &mut CloneProgress,
) -> RepoResult<MaterialId> {
    conn.execute(
        "INSERT INTO materials (parent_id, name, url, active, published, priority)
         SELECT parent_id, name, url, active, published, priority
         FROM materials
         WHERE id = ?1;",
        [source_id],
    )?;
    let clone_id = conn.last_insert_rowid();
    progress.clone_id = Some(clone_id);
    progress.copied_rows += 1;

    copy_navigation_links(conn, source_id, clone_id, progress)?;
    let value_ids = copy_field_values(conn, source_id, clone_id, excluded_field_ids, progress)?;
    copy_gallery(conn, source_id, clone_id, &value_ids, progress)?;

    Ok(clone_id)
}

fn copy_navigation_links(
    conn: &Connection,
    source_id: MaterialId,
    clone_id: MaterialId,
    progress: &mut CloneProgress,
) -> RepoResult<()> {
    let mut stmt = conn.prepare(
        "SELECT structure_id, active, priority
         FROM structure_materials
         WHERE material_id = ?1
         ORDER BY id ASC;",
    )?;
    let links = stmt
        .query_map([source_id], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, i64>(2)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    for (structure_id, active, priority) in links {
        conn.execute(
            "INSERT INTO structure_materials (structure_id, material_id, active, priority)
             VALUES (?1, ?2, ?3, ?4);",
            params![structure_id, clone_id, active, priority],
        )?;
        progress.copied_rows += 1;
    }
    Ok(())
}

/// Copies value rows and returns `source row id -> copied row id`.
fn copy_field_values(
    conn: &Connection,
    source_id: MaterialId,
    clone_id: MaterialId,
    excluded_field_ids: &[FieldId],
    progress: &mut CloneProgress,
) -> RepoResult<HashMap<i64, i64>> {
    let mut stmt = conn.prepare(
        "SELECT id, field_id, locale, active, Value, numeric_value, key_value
         FROM material_fields
         WHERE material_id = ?1
         ORDER BY id ASC;",
    )?;
    let rows = stmt
        .query_map([source_id], |row| {
            Ok(ValueRow {
                id: row.get(0)?,
                field_id: row.get(1)?,
                locale: row.get(2)?,
                active: row.get(3)?,
                text: row.get(4)?,
                numeric: row.get(5)?,
                key: row.get(6)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut copied = HashMap::new();
    for row in rows
        .into_iter()
        .filter(|row| !excluded_field_ids.contains(&row.field_id))
    {
        conn.execute(
            "INSERT INTO material_fields (
                material_id,
                field_id,
                locale,
                active,
                Value,
                numeric_value,
                key_value
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                clone_id,
                row.field_id,
                row.locale,
                row.active,
                row.text,
                row.numeric,
                row.key
            ],
        )?;
        copied.insert(row.id, conn.last_insert_rowid());
        progress.copied_rows += 1;
    }
    Ok(copied)
}

fn copy_gallery(
    conn: &Connection,
    source_id: MaterialId,
    clone_id: MaterialId,
    value_ids: &HashMap<i64, i64>,
    progress: &mut CloneProgress,
) -> RepoResult<()> {
    let mut stmt = conn.prepare(
        "SELECT material_field_id, src, priority
         FROM gallery
         WHERE material_id = ?1
         ORDER BY id ASC;",
    )?;
    let images = stmt
        .query_map([source_id], |row| {
            Ok((
                row.get::<_, Option<i64>>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    for (material_field_id, src, priority) in images {
        let remapped = material_field_id.and_then(|id| value_ids.get(&id).copied());
        conn.execute(
            "INSERT INTO gallery (material_id, material_field_id, src, priority)
             VALUES (?1, ?2, ?3, ?4);",
            params![clone_id, remapped, src, priority],
        )?;
        progress.copied_rows += 1;
    }
    Ok(())
}

struct ValueRow {
    id: i64,
    field_id: FieldId,
    locale: String,
    active: i64,
    text: Option<String>,
    numeric: Option<f64>,
    key: Option<i64>,
}
