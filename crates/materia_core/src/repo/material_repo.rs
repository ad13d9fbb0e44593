//! Material repository: identifier resolution, loading and attribute values.
//!
//! # Responsibility
//! - Narrow material id sets by attribute value and navigation membership.
//! - Load material records for a resolved id set.
//! - Read and upsert typed attribute values and gallery rows.
//!
//! # Invariants
//! - Attribute rows with `active = 0` are invisible to every read.
//! - Id resolution never errors for unknown fields or empty matches; those
//!   are `Resolution` tags.
//! - A present-but-empty restriction set short-circuits to `Empty`.

use crate::db::migrations::{ensure_schema_ready, TableRequirement};
use crate::model::field::{FieldDescriptor, FieldId, FieldValue};
use crate::model::locale::Locale;
use crate::model::material::{
    GalleryImage, Material, MaterialId, MaterialIdSet, MaterialVisibility, NewMaterial,
};
use crate::model::resolution::Resolution;
use crate::model::structure::StructureId;
use crate::repo::error::{bool_to_int, int_to_bool, RepoError, RepoResult};
use crate::repo::field_repo::{load_field, resolve_descriptor, FIELDS_TABLE};
use crate::repo::material_clone;
use crate::repo::query::SelectQuery;
use crate::repo::structure_repo::STRUCTURE_MATERIALS_TABLE;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};

pub(crate) const MATERIALS_TABLE: TableRequirement = (
    "materials",
    &[
        "id",
        "parent_id",
        "name",
        "url",
        "active",
        "published",
        "priority",
        "created_at",
        "updated_at",
    ],
);
pub(crate) const MATERIAL_FIELDS_TABLE: TableRequirement = (
    "material_fields",
    &[
        "id",
        "material_id",
        "field_id",
        "locale",
        "active",
        "Value",
        "numeric_value",
        "key_value",
    ],
);
pub(crate) const GALLERY_TABLE: TableRequirement = (
    "gallery",
    &["id", "material_id", "material_field_id", "src", "priority"],
);

const MATERIAL_COLUMNS: &[&str] = &[
    "id",
    "parent_id",
    "name",
    "url",
    "active",
    "published",
    "priority",
    "created_at",
    "updated_at",
];

/// How `copy_material` persists the copied rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CloneMode {
    /// One immediate transaction; any failure rolls the whole copy back.
    ///
    /// Inside an open transaction the copy runs under a savepoint instead,
    /// so a failure undoes only the copy.
    #[default]
    Atomic,
    /// Rows persist one by one; a failure leaves the partial copy in place.
    BestEffort,
}

/// Repository interface for material operations.
pub trait MaterialRepository {
    fn create_material(&self, material: &NewMaterial) -> RepoResult<MaterialId>;
    fn get_material(&self, id: MaterialId) -> RepoResult<Option<Material>>;
    /// Type and localization of a field, `None` when the field is unknown.
    fn resolve_field(&self, field_id: FieldId) -> RepoResult<Option<FieldDescriptor>>;
    /// Ids of materials holding `value` in the field's value column.
    fn ids_by_field_value(
        &self,
        field_id: FieldId,
        value: &FieldValue,
        restrict_to: Option<&MaterialIdSet>,
    ) -> RepoResult<Resolution<MaterialIdSet>>;
    /// Ids of materials actively linked to the structure.
    fn ids_by_navigation_id(
        &self,
        structure_id: StructureId,
        restrict_to: Option<&MaterialIdSet>,
    ) -> RepoResult<Resolution<MaterialIdSet>>;
    /// Loads materials in `ids`, ordered by `priority ASC, id ASC`.
    fn load_materials(
        &self,
        ids: &MaterialIdSet,
        visibility: MaterialVisibility,
    ) -> RepoResult<Vec<Material>>;
    /// Loads materials whose `url` equals one of `urls`.
    fn materials_by_url(&self, urls: &[&str]) -> RepoResult<Vec<Material>>;
    /// Upserts the canonical active value row for (material, field, locale).
    ///
    /// Returns the `material_fields.id` written.
    fn set_field_value(
        &self,
        material_id: MaterialId,
        field_id: FieldId,
        value: &FieldValue,
        locale: &Locale,
    ) -> RepoResult<i64>;
    fn field_value(
        &self,
        material_id: MaterialId,
        field_id: FieldId,
        locale: &Locale,
    ) -> RepoResult<Resolution<FieldValue>>;
    /// Label of the select option matching the material's key value.
    fn select_text(
        &self,
        material_id: MaterialId,
        field_id: FieldId,
        locale: &Locale,
    ) -> RepoResult<Resolution<String>>;
    fn add_gallery_image(
        &self,
        material_id: MaterialId,
        material_field_id: Option<i64>,
        src: &str,
        priority: i64,
    ) -> RepoResult<i64>;
    /// Lists gallery images, optionally only those of one gallery field.
    fn gallery_images(
        &self,
        material_id: MaterialId,
        field_id: Option<FieldId>,
    ) -> RepoResult<Vec<GalleryImage>>;
    /// Deep-copies a material with its links, values and gallery rows.
    fn copy_material(
        &self,
        source_id: MaterialId,
        excluded_field_ids: &[FieldId],
        mode: CloneMode,
    ) -> RepoResult<MaterialId>;
}

/// SQLite-backed material repository.
pub struct SqliteMaterialRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteMaterialRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema_ready(
            conn,
            &[
                MATERIALS_TABLE,
                MATERIAL_FIELDS_TABLE,
                FIELDS_TABLE,
                STRUCTURE_MATERIALS_TABLE,
                GALLERY_TABLE,
            ],
        )?;
        Ok(Self { conn })
    }
}

impl MaterialRepository for SqliteMaterialRepository<'_> {
    fn create_material(&self, material: &NewMaterial) -> RepoResult<MaterialId> {
        self.conn.execute(
            "INSERT INTO materials (parent_id, name, url, active, published, priority)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                material.parent_id,
                material.name.as_str(),
                material.url.as_str(),
                bool_to_int(material.is_active),
                bool_to_int(material.is_published),
                material.priority,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_material(&self, id: MaterialId) -> RepoResult<Option<Material>> {
        let mut query = material_select();
        query.where_eq("id", id);
        let mut found = None;
        query.for_each_row(self.conn, |row| {
            found = Some(parse_material_row(row)?);
            Ok(())
        })?;
        Ok(found)
    }

    fn resolve_field(&self, field_id: FieldId) -> RepoResult<Option<FieldDescriptor>> {
        resolve_descriptor(self.conn, field_id)
    }

    fn ids_by_field_value(
        &self,
        field_id: FieldId,
        value: &FieldValue,
        restrict_to: Option<&MaterialIdSet>,
    ) -> RepoResult<Resolution<MaterialIdSet>> {
        let Some(descriptor) = resolve_descriptor(self.conn, field_id)? else {
            return Ok(Resolution::UnknownField(field_id));
        };
        if restrict_to.is_some_and(|ids| ids.is_empty()) {
            return Ok(Resolution::Empty);
        }
        // A value that cannot live in the declared column cannot match.
        let Some(typed) = value.coerce_to(descriptor.field_type) else {
            return Ok(Resolution::Empty);
        };

        let mut query = SelectQuery::from("material_fields");
        query
            .select("material_id")
            .where_eq("active", 1_i64)
            .where_eq("field_id", field_id)
            .where_eq(descriptor.value_column, typed.to_sql());
        if let Some(ids) = restrict_to {
            query.where_in("material_id", ids.iter().copied());
        }

        let ids = query.fetch_ids(self.conn)?.into_iter().collect();
        Ok(Resolution::from_ids(ids))
    }

    fn ids_by_navigation_id(
        &self,
        structure_id: StructureId,
        restrict_to: Option<&MaterialIdSet>,
    ) -> RepoResult<Resolution<MaterialIdSet>> {
        if restrict_to.is_some_and(|ids| ids.is_empty()) {
            return Ok(Resolution::Empty);
        }

        let mut query = SelectQuery::from("structure_materials");
        query
            .select("material_id")
            .where_eq("structure_id", structure_id)
            .where_eq("active", 1_i64);
        if let Some(ids) = restrict_to {
            query.where_in("material_id", ids.iter().copied());
        }

        let ids = query.fetch_ids(self.conn)?.into_iter().collect();
        Ok(Resolution::from_ids(ids))
    }

    fn load_materials(
        &self,
        ids: &MaterialIdSet,
        visibility: MaterialVisibility,
    ) -> RepoResult<Vec<Material>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut query = material_select();
        query.where_in("id", ids.iter().copied());
        if visibility == MaterialVisibility::ActivePublished {
            query.where_eq("active", 1_i64).where_eq("published", 1_i64);
        }
        query.order_by("priority ASC").order_by("id ASC");
        collect_materials(self.conn, &query)
    }

    fn materials_by_url(&self, urls: &[&str]) -> RepoResult<Vec<Material>> {
        if urls.is_empty() {
            return Ok(Vec::new());
        }

        let mut query = material_select();
        query
            .where_in("url", urls.iter().map(|url| url.to_string()))
            .order_by("priority ASC")
            .order_by("id ASC");
        collect_materials(self.conn, &query)
    }

    fn set_field_value(
        &self,
        material_id: MaterialId,
        field_id: FieldId,
        value: &FieldValue,
        locale: &Locale,
    ) -> RepoResult<i64> {
        let descriptor =
            resolve_descriptor(self.conn, field_id)?.ok_or(RepoError::UnknownField(field_id))?;
        ensure_material_exists(self.conn, material_id)?;
        let typed = value.coerce_to(descriptor.field_type).ok_or_else(|| {
            RepoError::ValueTypeMismatch {
                field_id,
                expected: descriptor.field_type,
                value: value.to_string(),
            }
        })?;

        let (text, numeric, key) = match &typed {
            FieldValue::Text(text) => (Some(text.as_str()), None, None),
            FieldValue::Numeric(number) => (None, Some(*number), None),
            FieldValue::Key(key) => (None, None, Some(*key)),
        };
        let storage_locale = descriptor.storage_locale(locale);

        let mut query = value_row_query(material_id, &descriptor, locale);
        query.select("id");
        let existing = query.fetch_ids(self.conn)?.first().copied();

        let row_id = match existing {
            Some(row_id) => {
                self.conn.execute(
                    "UPDATE material_fields
                     SET locale = ?2, Value = ?3, numeric_value = ?4, key_value = ?5
                     WHERE id = ?1;",
                    params![row_id, storage_locale, text, numeric, key],
                )?;
                row_id
            }
            None => {
                self.conn.execute(
                    "INSERT INTO material_fields (
                        material_id,
                        field_id,
                        locale,
                        active,
                        Value,
                        numeric_value,
                        key_value
                    ) VALUES (?1, ?2, ?3, 1, ?4, ?5, ?6);",
                    params![material_id, field_id, storage_locale, text, numeric, key],
                )?;
                self.conn.last_insert_rowid()
            }
        };

        self.conn.execute(
            "UPDATE materials
             SET updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            [material_id],
        )?;
        Ok(row_id)
    }

    fn field_value(
        &self,
        material_id: MaterialId,
        field_id: FieldId,
        locale: &Locale,
    ) -> RepoResult<Resolution<FieldValue>> {
        let Some(descriptor) = resolve_descriptor(self.conn, field_id)? else {
            return Ok(Resolution::UnknownField(field_id));
        };

        let mut query = value_row_query(material_id, &descriptor, locale);
        query
            .select("Value")
            .select("numeric_value")
            .select("key_value");
        let mut slots: Option<(Option<String>, Option<f64>, Option<i64>)> = None;
        query.for_each_row(self.conn, |row| {
            if slots.is_none() {
                slots = Some((row.get(0)?, row.get(1)?, row.get(2)?));
            }
            Ok(())
        })?;

        let value = slots.and_then(|(text, numeric, key)| {
            FieldValue::from_slots(descriptor.field_type, text, numeric, key)
        });
        Ok(match value {
            Some(value) => Resolution::Found(value),
            None => Resolution::Empty,
        })
    }

    fn select_text(
        &self,
        material_id: MaterialId,
        field_id: FieldId,
        locale: &Locale,
    ) -> RepoResult<Resolution<String>> {
        let Some(field) = load_field(self.conn, field_id)? else {
            return Ok(Resolution::UnknownField(field_id));
        };
        let value = match self.field_value(material_id, field_id, locale)?.found_or_retag() {
            Ok(value) => value,
            Err(other) => return Ok(other),
        };

        Ok(match field.option_label(&value.to_string()) {
            Some(label) => Resolution::Found(label),
            None => Resolution::Empty,
        })
    }

    fn add_gallery_image(
        &self,
        material_id: MaterialId,
        material_field_id: Option<i64>,
        src: &str,
        priority: i64,
    ) -> RepoResult<i64> {
        ensure_material_exists(self.conn, material_id)?;
        self.conn.execute(
            "INSERT INTO gallery (material_id, material_field_id, src, priority)
             VALUES (?1, ?2, ?3, ?4);",
            params![material_id, material_field_id, src, priority],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn gallery_images(
        &self,
        material_id: MaterialId,
        field_id: Option<FieldId>,
    ) -> RepoResult<Vec<GalleryImage>> {
        let (sql, binds): (&str, Vec<Value>) = match field_id {
            Some(field_id) => (
                "SELECT id, material_id, material_field_id, src, priority
                 FROM gallery
                 WHERE material_id = ?1
                   AND material_field_id IN (
                     SELECT id
                     FROM material_fields
                     WHERE material_id = ?1
                       AND field_id = ?2
                       AND active = 1
                   )
                 ORDER BY priority ASC, id ASC;",
                vec![Value::Integer(material_id), Value::Integer(field_id)],
            ),
            None => (
                "SELECT id, material_id, material_field_id, src, priority
                 FROM gallery
                 WHERE material_id = ?1
                 ORDER BY priority ASC, id ASC;",
                vec![Value::Integer(material_id)],
            ),
        };

        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params_from_iter(binds))?;
        let mut images = Vec::new();
        while let Some(row) = rows.next()? {
            images.push(GalleryImage {
                id: row.get("id")?,
                material_id: row.get("material_id")?,
                material_field_id: row.get("material_field_id")?,
                src: row.get("src")?,
                priority: row.get("priority")?,
            });
        }
        Ok(images)
    }

    fn copy_material(
        &self,
        source_id: MaterialId,
        excluded_field_ids: &[FieldId],
        mode: CloneMode,
    ) -> RepoResult<MaterialId> {
        material_clone::copy_material(self.conn, source_id, excluded_field_ids, mode)
    }
}

fn material_select() -> SelectQuery {
    let mut query = SelectQuery::from("materials");
    for column in MATERIAL_COLUMNS {
        query.select(*column);
    }
    query
}

fn collect_materials(conn: &Connection, query: &SelectQuery) -> RepoResult<Vec<Material>> {
    let mut materials = Vec::new();
    query.for_each_row(conn, |row| {
        materials.push(parse_material_row(row)?);
        Ok(())
    })?;
    Ok(materials)
}

/// Active value rows of one cell, newest first.
///
/// Unlocalized fields match their rows under any stored locale tag.
fn value_row_query(
    material_id: MaterialId,
    descriptor: &FieldDescriptor,
    locale: &Locale,
) -> SelectQuery {
    let mut query = SelectQuery::from("material_fields");
    query
        .where_eq("material_id", material_id)
        .where_eq("field_id", descriptor.field_id)
        .where_eq("active", 1_i64);
    if descriptor.is_localized {
        query.where_eq("locale", locale.as_str().to_string());
    }
    query.order_by("id DESC");
    query
}

pub(crate) fn ensure_material_exists(conn: &Connection, id: MaterialId) -> RepoResult<()> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM materials WHERE id = ?1);",
        [id],
        |row| row.get(0),
    )?;
    if exists == 0 {
        return Err(RepoError::NotFound(id));
    }
    Ok(())
}

fn parse_material_row(row: &Row<'_>) -> RepoResult<Material> {
    Ok(Material {
        id: row.get("id")?,
        parent_id: row.get("parent_id")?,
        name: row.get("name")?,
        url: row.get("url")?,
        is_active: int_to_bool(row.get("active")?, "materials.active")?,
        is_published: int_to_bool(row.get("published")?, "materials.published")?,
        priority: row.get("priority")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
