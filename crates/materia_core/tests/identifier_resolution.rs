mod common;

use common::{create_child, create_field, seed_catalog};
use materia_core::db::open_db_in_memory;
use materia_core::{
    FieldRepository, FieldType, FieldValue, MaterialIdSet, MaterialRepository, MaterialService,
    Resolution, SqliteFieldRepository, SqliteMaterialRepository, SqliteStructureRepository,
    StructureRepository,
};

#[test]
fn field_value_lookup_returns_distinct_matching_ids() {
    let conn = open_db_in_memory().unwrap();
    let catalog = seed_catalog(&conn);
    let repo = SqliteMaterialRepository::try_new(&conn).unwrap();

    let red = repo
        .ids_by_field_value(catalog.color, &"Red".into(), None)
        .unwrap();
    assert_eq!(red, Resolution::Found(MaterialIdSet::from([catalog.first])));

    let green = repo
        .ids_by_field_value(catalog.color, &"Green".into(), None)
        .unwrap();
    assert_eq!(green, Resolution::Empty);
}

#[test]
fn unknown_field_is_tagged_not_empty() {
    let conn = open_db_in_memory().unwrap();
    seed_catalog(&conn);
    let repo = SqliteMaterialRepository::try_new(&conn).unwrap();

    let resolved = repo.ids_by_field_value(999, &"Red".into(), None).unwrap();
    assert_eq!(resolved, Resolution::UnknownField(999));
    assert!(resolved.is_not_applicable());
}

#[test]
fn lookup_filters_on_declared_value_column() {
    let conn = open_db_in_memory().unwrap();
    let catalog = seed_catalog(&conn);
    let repo = SqliteMaterialRepository::try_new(&conn).unwrap();

    // weight is numeric and stored at "en"; numeric lookups ignore locale.
    let by_number = repo
        .ids_by_field_value(catalog.weight, &FieldValue::Numeric(5.0), None)
        .unwrap();
    assert_eq!(
        by_number,
        Resolution::Found(MaterialIdSet::from([catalog.first]))
    );

    let by_text = repo
        .ids_by_field_value(catalog.weight, &"5".into(), None)
        .unwrap();
    assert_eq!(by_text, by_number);

    let not_a_number = repo
        .ids_by_field_value(catalog.weight, &"five".into(), None)
        .unwrap();
    assert_eq!(not_a_number, Resolution::Empty);
}

#[test]
fn restriction_narrows_and_empty_restriction_short_circuits() {
    let conn = open_db_in_memory().unwrap();
    let catalog = seed_catalog(&conn);
    let repo = SqliteMaterialRepository::try_new(&conn).unwrap();
    let third = create_child(&conn, catalog.owner, "Third", 2);
    repo
        .set_field_value(third, catalog.color, &"Red".into(), &common::en())
        .unwrap();

    let all_red = repo
        .ids_by_field_value(catalog.color, &"Red".into(), None)
        .unwrap();
    assert_eq!(
        all_red,
        Resolution::Found(MaterialIdSet::from([catalog.first, third]))
    );

    let only_third = MaterialIdSet::from([third, catalog.second]);
    let restricted = repo
        .ids_by_field_value(catalog.color, &"Red".into(), Some(&only_third))
        .unwrap();
    assert_eq!(restricted, Resolution::Found(MaterialIdSet::from([third])));

    let empty = MaterialIdSet::new();
    assert_eq!(
        repo.ids_by_field_value(catalog.color, &"Red".into(), Some(&empty))
            .unwrap(),
        Resolution::Empty
    );
    assert_eq!(
        repo.ids_by_navigation_id(catalog.structure, Some(&empty))
            .unwrap(),
        Resolution::Empty
    );
}

#[test]
fn restriction_sets_larger_than_the_parameter_limit_resolve() {
    let conn = open_db_in_memory().unwrap();
    let catalog = seed_catalog(&conn);
    let repo = SqliteMaterialRepository::try_new(&conn).unwrap();
    let wide: MaterialIdSet = (1..=40_000).collect();

    assert_eq!(
        repo.ids_by_field_value(catalog.color, &"Red".into(), Some(&wide))
            .unwrap(),
        Resolution::Found(MaterialIdSet::from([catalog.first]))
    );
    assert_eq!(
        repo.ids_by_navigation_id(catalog.structure, Some(&wide))
            .unwrap(),
        Resolution::Found(MaterialIdSet::from([catalog.first, catalog.second]))
    );
    let loaded = repo
        .load_materials(&wide, materia_core::MaterialVisibility::Any)
        .unwrap();
    assert_eq!(loaded.len(), 3);
}

#[test]
fn inactive_values_and_links_are_invisible() {
    let conn = open_db_in_memory().unwrap();
    let catalog = seed_catalog(&conn);
    let repo = SqliteMaterialRepository::try_new(&conn).unwrap();

    conn.execute(
        "UPDATE material_fields SET active = 0 WHERE material_id = ?1;",
        [catalog.second],
    )
    .unwrap();
    conn.execute(
        "UPDATE structure_materials SET active = 0 WHERE material_id = ?1;",
        [catalog.first],
    )
    .unwrap();

    assert_eq!(
        repo.ids_by_field_value(catalog.color, &"Blue".into(), None)
            .unwrap(),
        Resolution::Empty
    );
    assert_eq!(
        repo.ids_by_navigation_id(catalog.structure, None).unwrap(),
        Resolution::Found(MaterialIdSet::from([catalog.second]))
    );
}

#[test]
fn navigation_then_field_value_intersects() {
    let conn = open_db_in_memory().unwrap();
    let catalog = seed_catalog(&conn);
    let structures = SqliteStructureRepository::try_new(&conn).unwrap();
    let materials = SqliteMaterialRepository::try_new(&conn).unwrap();

    // Red but not linked to the structure.
    let loose = create_child(&conn, catalog.owner, "Loose", 5);
    materials
        .set_field_value(loose, catalog.color, &"Red".into(), &common::en())
        .unwrap();
    let other = structures.create_structure("Archive", "/archive").unwrap();
    structures.link_material(other, loose, 0).unwrap();

    let service = MaterialService::new(SqliteMaterialRepository::try_new(&conn).unwrap());
    let linked = service
        .ids_by_navigation_id(catalog.structure, None)
        .unwrap()
        .found()
        .unwrap();
    assert_eq!(linked, MaterialIdSet::from([catalog.first, catalog.second]));

    let red_and_linked = service
        .ids_by_field_value(catalog.color, "Red", Some(&linked))
        .unwrap();
    assert_eq!(
        red_and_linked,
        Resolution::Found(MaterialIdSet::from([catalog.first]))
    );
}

#[test]
fn key_fields_match_integer_values() {
    let conn = open_db_in_memory().unwrap();
    let catalog = seed_catalog(&conn);
    let fields = SqliteFieldRepository::try_new(&conn).unwrap();
    let materials = SqliteMaterialRepository::try_new(&conn).unwrap();
    let size = create_field(&conn, "size", FieldType::Key, false, 3);

    let descriptor = fields.resolve_field(size).unwrap().unwrap();
    assert_eq!(descriptor.value_column, "key_value");
    assert!(!descriptor.is_localized);

    materials
        .set_field_value(catalog.second, size, &FieldValue::Key(2), &common::en())
        .unwrap();
    assert_eq!(
        materials
            .ids_by_field_value(size, &"2".into(), None)
            .unwrap(),
        Resolution::Found(MaterialIdSet::from([catalog.second]))
    );
    assert_eq!(
        materials
            .ids_by_field_value(size, &FieldValue::Numeric(2.5), None)
            .unwrap(),
        Resolution::Empty
    );
}
