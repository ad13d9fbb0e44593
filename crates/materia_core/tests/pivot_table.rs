mod common;

use common::{create_child, create_field, en, seed_catalog};
use materia_core::db::open_db_in_memory;
use materia_core::{
    FieldType, FieldValue, Locale, PivotTable, Resolution, SelectQuery, SqliteStructureRepository,
    SqliteTableRepository, StructureRepository, StructureSelector, TableService,
};
use rusqlite::Connection;
use serde_json::json;

fn service(conn: &Connection) -> TableService<SqliteTableRepository<'_>> {
    TableService::new(SqliteTableRepository::try_new(conn).unwrap())
}

fn text(value: &str) -> Option<FieldValue> {
    Some(FieldValue::Text(value.to_string()))
}

#[test]
fn builds_rows_in_column_order_with_null_gaps() {
    let conn = open_db_in_memory().unwrap();
    let catalog = seed_catalog(&conn);

    let table = service(&conn)
        .build_table(catalog.owner, &catalog.structure.into(), &en())
        .unwrap()
        .found()
        .unwrap();

    assert_eq!(table.column_names, vec!["Field10Name", "Field11Name"]);
    assert_eq!(
        table.rows,
        vec![
            vec![text("Red"), Some(FieldValue::Numeric(5.0))],
            vec![text("Blue"), None],
        ]
    );
    assert_eq!(
        serde_json::to_value(&table).unwrap(),
        json!({
            "columnNames": ["Field10Name", "Field11Name"],
            "rows": [["Red", 5.0], ["Blue", null]],
        })
    );
}

#[test]
fn localized_columns_follow_request_locale() {
    let conn = open_db_in_memory().unwrap();
    let catalog = seed_catalog(&conn);

    let table = service(&conn)
        .build_table(catalog.owner, &catalog.structure.into(), &Locale::new("de"))
        .unwrap()
        .found()
        .unwrap();

    // The unlocalized color column is locale independent.
    assert_eq!(table.rows, vec![vec![text("Red"), None], vec![text("Blue"), None]]);
}

#[test]
fn structure_resolves_by_name_and_url() {
    let conn = open_db_in_memory().unwrap();
    let catalog = seed_catalog(&conn);
    let service = service(&conn);

    let by_id = service
        .build_table(catalog.owner, &catalog.structure.into(), &en())
        .unwrap();
    let by_name = service
        .build_table(
            catalog.owner,
            &StructureSelector::Name("Products".to_string()),
            &en(),
        )
        .unwrap();
    let by_url = service
        .build_table(
            catalog.owner,
            &StructureSelector::Url("/products".to_string()),
            &en(),
        )
        .unwrap();
    assert!(by_id.is_found());
    assert_eq!(by_name, by_id);
    assert_eq!(by_url, by_id);
}

#[test]
fn unknown_structure_is_tagged() {
    let conn = open_db_in_memory().unwrap();
    let catalog = seed_catalog(&conn);
    let selector = StructureSelector::Name("Nope".to_string());

    let table = service(&conn)
        .build_table(catalog.owner, &selector, &en())
        .unwrap();
    assert_eq!(table, Resolution::UnknownStructure(selector));
}

#[test]
fn structure_without_columns_yields_empty_table() {
    let conn = open_db_in_memory().unwrap();
    let catalog = seed_catalog(&conn);
    let structures = SqliteStructureRepository::try_new(&conn).unwrap();
    let bare = structures.create_structure("Bare", "/bare").unwrap();
    structures.link_material(bare, catalog.first, 0).unwrap();

    let table = service(&conn)
        .build_table(catalog.owner, &bare.into(), &en())
        .unwrap();
    assert_eq!(table, Resolution::Found(PivotTable::default()));
}

#[test]
fn rows_cover_linked_active_children_once() {
    let conn = open_db_in_memory().unwrap();
    let catalog = seed_catalog(&conn);
    let structures = SqliteStructureRepository::try_new(&conn).unwrap();

    let blank = create_child(&conn, catalog.owner, "Blank", 2);
    structures.link_material(catalog.structure, blank, 0).unwrap();
    // A second link must not duplicate the row.
    structures
        .link_material(catalog.structure, catalog.first, 9)
        .unwrap();

    let hidden = create_child(&conn, catalog.owner, "Hidden", 3);
    structures.link_material(catalog.structure, hidden, 0).unwrap();
    conn.execute("UPDATE materials SET active = 0 WHERE id = ?1;", [hidden])
        .unwrap();

    create_child(&conn, catalog.owner, "Unlinked", 4);
    let stranger = create_child(&conn, blank, "Stranger", 0);
    structures
        .link_material(catalog.structure, stranger, 0)
        .unwrap();

    let table = service(&conn)
        .build_table(catalog.owner, &catalog.structure.into(), &en())
        .unwrap()
        .found()
        .unwrap();

    assert_eq!(table.rows.len(), 3);
    assert!(table.rows.iter().all(|row| row.len() == table.column_count()));
    assert_eq!(table.rows[2], vec![None, None]);
}

#[test]
fn columns_follow_field_priority() {
    let conn = open_db_in_memory().unwrap();
    let catalog = seed_catalog(&conn);
    let structures = SqliteStructureRepository::try_new(&conn).unwrap();
    let badge = create_field(&conn, "Badge", FieldType::Text, false, -5);
    structures.attach_field(catalog.structure, badge).unwrap();

    let table = service(&conn)
        .build_table(catalog.owner, &catalog.structure.into(), &en())
        .unwrap()
        .found()
        .unwrap();

    assert_eq!(
        table.column_names,
        vec!["Badge", "Field10Name", "Field11Name"]
    );
    assert_eq!(table.cell(0, 1), text("Red").as_ref());
    assert_eq!(table.cell(0, 0), None);
}

#[test]
fn empty_declared_slot_falls_back_to_other_slots() {
    let conn = open_db_in_memory().unwrap();
    let catalog = seed_catalog(&conn);
    conn.execute(
        "UPDATE material_fields
         SET Value = NULL, numeric_value = 7.5
         WHERE material_id = ?1 AND field_id = ?2;",
        [catalog.second, catalog.color],
    )
    .unwrap();

    let table = service(&conn)
        .build_table(catalog.owner, &catalog.structure.into(), &en())
        .unwrap()
        .found()
        .unwrap();
    assert_eq!(table.cell(1, 0), Some(&FieldValue::Numeric(7.5)));
}

#[test]
fn row_filter_narrows_candidate_rows() {
    let conn = open_db_in_memory().unwrap();
    let catalog = seed_catalog(&conn);
    let only_second = |query: &mut SelectQuery| {
        query.where_eq("m.url", "/second".to_string());
    };

    let table = service(&conn)
        .build_table_filtered(
            catalog.owner,
            &catalog.structure.into(),
            &en(),
            Some(&only_second),
        )
        .unwrap()
        .found()
        .unwrap();
    assert_eq!(table.rows, vec![vec![text("Blue"), None]]);
}

#[test]
fn owner_without_children_yields_found_table_without_rows() {
    let conn = open_db_in_memory().unwrap();
    let catalog = seed_catalog(&conn);

    let table = service(&conn)
        .build_table(catalog.first, &catalog.structure.into(), &en())
        .unwrap()
        .found()
        .unwrap();
    assert_eq!(table.column_count(), 2);
    assert!(table.is_empty());
}
