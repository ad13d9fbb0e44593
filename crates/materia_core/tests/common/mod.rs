#![allow(dead_code)]

use materia_core::{
    FieldId, FieldRepository, FieldType, Locale, MaterialId, MaterialRepository, NewField,
    NewMaterial, SqliteFieldRepository, SqliteMaterialRepository, SqliteStructureRepository,
    StructureId, StructureRepository,
};
use rusqlite::Connection;

/// Owner material with two children laid out in one table structure.
///
/// - `color`: text, unlocalized, first column.
/// - `weight`: numeric, localized, second column.
/// - `first`: color "Red", weight 5 at "en".
/// - `second`: color "Blue" only.
pub struct Catalog {
    pub owner: MaterialId,
    pub structure: StructureId,
    pub color: FieldId,
    pub weight: FieldId,
    pub first: MaterialId,
    pub second: MaterialId,
}

pub fn en() -> Locale {
    Locale::new("en")
}

pub fn create_field(
    conn: &Connection,
    name: &str,
    field_type: FieldType,
    is_localized: bool,
    priority: i64,
) -> FieldId {
    let repo = SqliteFieldRepository::try_new(conn).unwrap();
    let mut field = NewField::new(name, field_type);
    field.is_localized = is_localized;
    field.priority = priority;
    repo.create_field(&field).unwrap()
}

pub fn create_child(conn: &Connection, owner: MaterialId, name: &str, priority: i64) -> MaterialId {
    let repo = SqliteMaterialRepository::try_new(conn).unwrap();
    let mut material = NewMaterial::new(name);
    material.parent_id = Some(owner);
    material.url = format!("/{}", name.to_ascii_lowercase());
    material.priority = priority;
    repo.create_material(&material).unwrap()
}

pub fn seed_catalog(conn: &Connection) -> Catalog {
    let materials = SqliteMaterialRepository::try_new(conn).unwrap();
    let structures = SqliteStructureRepository::try_new(conn).unwrap();

    let owner = materials.create_material(&NewMaterial::new("Catalog")).unwrap();
    let color = create_field(conn, "Field10Name", FieldType::Text, false, 0);
    let weight = create_field(conn, "Field11Name", FieldType::Numeric, true, 1);

    let structure = structures.create_structure("Products", "/products").unwrap();
    structures.attach_field(structure, color).unwrap();
    structures.attach_field(structure, weight).unwrap();

    let first = create_child(conn, owner, "First", 0);
    let second = create_child(conn, owner, "Second", 1);
    structures.link_material(structure, first, 0).unwrap();
    structures.link_material(structure, second, 1).unwrap();

    materials
        .set_field_value(first, color, &"Red".into(), &en())
        .unwrap();
    materials
        .set_field_value(first, weight, &5.0.into(), &en())
        .unwrap();
    materials
        .set_field_value(second, color, &"Blue".into(), &en())
        .unwrap();

    Catalog {
        owner,
        structure,
        color,
        weight,
        first,
        second,
    }
}

pub fn count_rows(conn: &Connection, sql: &str, material_id: MaterialId) -> i64 {
    conn.query_row(sql, [material_id], |row| row.get(0))
        .unwrap()
}
