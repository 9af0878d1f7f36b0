//! End-to-end scenarios: batches, persistence and reopening.

use chrono::{DateTime, TimeDelta};
use std::fs;
use std::sync::Arc;
use std::thread;
use tabula_codec::{FormatKind, Row, Value, ValueType};
use tabula_core::{
    Config, CoreError, Database, EntityKind, EnumToOrdinalConverter, Model, Property, RowIntent,
    StoreCache, TableMatching,
};
use tabula_storage::EncryptionKey;
use tempfile::TempDir;
use uuid::Uuid;

fn blog_model() -> Arc<Model> {
    Arc::new(
        Model::builder()
            .entity(
                EntityKind::builder("Blog")
                    .property(Property::new("Id", ValueType::Int32).generated_on_add())
                    .property(Property::new("Name", ValueType::Text))
                    .property(Property::new("Version", ValueType::Int32).concurrency_token())
                    .key(["Id"]),
            )
            .build()
            .unwrap(),
    )
}

fn blog(id: i32, name: &str, version: i32) -> Row {
    vec![Value::Int32(id), Value::from(name), Value::Int32(version)]
}

fn rows_of(db: &Database, kind: &str) -> Vec<Row> {
    let kind = db.model().kind(kind).unwrap();
    db.tables(&kind).into_iter().flat_map(|t| t.rows).collect()
}

#[test]
fn created_row_survives_reopen_in_every_format() {
    for format in FormatKind::ALL {
        let dir = TempDir::new().unwrap();
        let config = Config::new().location(dir.path()).format(format);
        let model = Arc::new(
            Model::builder()
                .entity(
                    EntityKind::builder("Item")
                        .property(Property::new("id", ValueType::Int32))
                        .property(Property::new("name", ValueType::Text))
                        .key(["id"]),
                )
                .build()
                .unwrap(),
        );
        let item = model.kind("Item").unwrap();

        let db = Database::open(Arc::clone(&model), config.clone());
        db.save_changes(&[RowIntent::added(&item, vec![Value::Int32(1), Value::from("a")])])
            .unwrap();

        let reopened = Database::open(model, config);
        assert_eq!(
            rows_of(&reopened, "Item"),
            vec![vec![Value::Int32(1), Value::from("a")]],
            "format {format}"
        );
        assert!(dir.path().join(format!("Item.{}", format.extension())).exists());
    }
}

#[test]
fn ensure_created_applies_seeds_once() {
    let dir = TempDir::new().unwrap();
    let model = Arc::new(
        Model::builder()
            .entity(
                EntityKind::builder("Blog")
                    .property(Property::new("Id", ValueType::Int32))
                    .property(Property::new("Name", ValueType::Text))
                    .key(["Id"])
                    .seed(vec![Value::Int32(1), Value::from("first")])
                    .seed(vec![Value::Int32(2), Value::from("second")]),
            )
            .build()
            .unwrap(),
    );
    let db = Database::open(model, Config::new().location(dir.path()));

    assert!(db.ensure_created().unwrap());
    assert!(!db.ensure_created().unwrap());
    assert_eq!(rows_of(&db, "Blog").len(), 2);
}

#[test]
fn conflicting_updates_in_one_batch() {
    let dir = TempDir::new().unwrap();
    let model = blog_model();
    let kind = model.kind("Blog").unwrap();
    let db = Database::open(Arc::clone(&model), Config::new().location(dir.path()));
    db.save_changes(&[RowIntent::added(&kind, blog(1, "a", 1))]).unwrap();

    let first = RowIntent::modified(&kind, blog(1, "b", 2))
        .with_original(2, Value::Int32(1))
        .mark_all_modified();
    let second = RowIntent::modified(&kind, blog(1, "c", 2))
        .with_original(2, Value::Int32(1))
        .mark_all_modified();
    let err = db.save_changes(&[first, second]).unwrap_err();

    match &err {
        CoreError::BatchAborted { applied, .. } => assert_eq!(*applied, 1),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(err.as_concurrency_conflict().unwrap().column_names(), vec!["Version"]);
    assert_eq!(rows_of(&db, "Blog"), vec![blog(1, "b", 2)]);

    // the applied half was saved
    let reopened = Database::open(model, Config::new().location(dir.path()));
    assert_eq!(rows_of(&reopened, "Blog"), vec![blog(1, "b", 2)]);
}

#[test]
fn update_and_delete_of_absent_key() {
    let dir = TempDir::new().unwrap();
    let model = blog_model();
    let kind = model.kind("Blog").unwrap();
    let db = Database::open(model, Config::new().location(dir.path()).sensitive_logging(true));
    db.save_changes(&[RowIntent::added(&kind, blog(1, "a", 1))]).unwrap();

    let err = db
        .save_changes(&[RowIntent::deleted(&kind, blog(7, "x", 1))])
        .unwrap_err();
    assert!(err.is_concurrency_conflict());
    assert!(err.to_string().contains("for key {7}"));

    let err = db
        .save_changes(&[RowIntent::modified(&kind, blog(7, "x", 1)).mark_all_modified()])
        .unwrap_err();
    assert!(err.is_concurrency_conflict());
    assert_eq!(rows_of(&db, "Blog"), vec![blog(1, "a", 1)]);
}

#[test]
fn generated_keys_continue_after_reopen() {
    let dir = TempDir::new().unwrap();
    let config = Config::new().location(dir.path()).format(FormatKind::Csv);
    let model = blog_model();
    let kind = model.kind("Blog").unwrap();

    let db = Database::open(Arc::clone(&model), config.clone());
    let seeded: Vec<_> = [5, 12, 3]
        .into_iter()
        .map(|id| RowIntent::added(&kind, blog(id, "x", 1)))
        .collect();
    db.save_changes(&seeded).unwrap();

    let db = Database::open(model, config);
    db.save_changes(&[RowIntent::added(&kind, vec![Value::Null, Value::from("new"), Value::Int32(1)])])
        .unwrap();
    let generator = db.store().integer_value_generator(&kind, "Id").unwrap();
    assert_eq!(generator.current(), 13);
    assert!(rows_of(&db, "Blog").contains(&blog(13, "new", 1)));
}

#[test]
fn concurrent_batches_share_one_store() {
    let dir = TempDir::new().unwrap();
    let model = blog_model();
    let kind = model.kind("Blog").unwrap();
    let db = Database::open(model, Config::new().location(dir.path()));

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let db = db.clone();
            let kind = Arc::clone(&kind);
            thread::spawn(move || {
                for i in 0..25 {
                    let row = vec![Value::Null, Value::from(format!("{t}-{i}")), Value::Int32(1)];
                    db.save_changes(&[RowIntent::added(&kind, row)]).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let rows = rows_of(&db, "Blog");
    assert_eq!(rows.len(), 100);
    let ids: Vec<_> = rows.iter().map(|r| r[0].clone()).collect();
    assert_eq!(ids.first(), Some(&Value::Int32(1)));
    assert_eq!(ids.last(), Some(&Value::Int32(100)));
}

#[test]
fn encrypted_tables_need_the_key() {
    let dir = TempDir::new().unwrap();
    let key = EncryptionKey::derive_from_password(b"correct horse", b"tabula-test-salt").unwrap();
    let config = Config::new().location(dir.path()).encryption_key(key);
    let model = blog_model();
    let kind = model.kind("Blog").unwrap();

    let db = Database::open(Arc::clone(&model), config.clone());
    db.save_changes(&[RowIntent::added(&kind, blog(1, "secret-name", 1))])
        .unwrap();

    let raw = fs::read(dir.path().join("Blog.json")).unwrap();
    assert!(!String::from_utf8_lossy(&raw).contains("secret-name"));

    let reopened = Database::open(Arc::clone(&model), config);
    assert_eq!(rows_of(&reopened, "Blog"), vec![blog(1, "secret-name", 1)]);

    let wrong_key = Config::new()
        .location(dir.path())
        .encryption_key(EncryptionKey::generate());
    let locked_out = Database::open(model, wrong_key);
    assert!(rows_of(&locked_out, "Blog").is_empty());
}

#[test]
fn corrupt_file_loads_empty_and_is_replaced_on_save() {
    let dir = TempDir::new().unwrap();
    let model = blog_model();
    let kind = model.kind("Blog").unwrap();
    let path = dir.path().join("Blog.json");
    fs::write(&path, "[{\"Id\": ").unwrap();

    let db = Database::open(model, Config::new().location(dir.path()));
    assert!(rows_of(&db, "Blog").is_empty());

    db.save_changes(&[RowIntent::added(&kind, blog(1, "a", 1))]).unwrap();
    let content = fs::read_to_string(&path).unwrap();
    assert!(content.contains("\"Name\": \"a\""));
}

#[test]
fn namespace_and_sanitized_table_names() {
    let dir = TempDir::new().unwrap();
    let model = Arc::new(
        Model::builder()
            .entity(
                EntityKind::builder("Order")
                    .table("Sales/Orders")
                    .property(Property::new("Id", ValueType::Int64))
                    .key(["Id"]),
            )
            .build()
            .unwrap(),
    );
    let order = model.kind("Order").unwrap();
    let config = Config::new()
        .location(dir.path())
        .namespace("shop")
        .format(FormatKind::Tsv);
    let db = Database::open(model, config);
    db.save_changes(&[RowIntent::added(&order, vec![Value::Int64(1)])]).unwrap();

    assert!(dir.path().join("shop").join("Sales_Orders.tsv").exists());
    assert!(db.exists().unwrap());
    assert!(db.ensure_deleted().unwrap());
    assert!(!db.exists().unwrap());
}

#[test]
fn name_matching_shares_tables() {
    let dir = TempDir::new().unwrap();
    let model = Arc::new(
        Model::builder()
            .entity(
                EntityKind::builder("Customer")
                    .table("People")
                    .property(Property::new("Id", ValueType::Int32))
                    .property(Property::new("Name", ValueType::Text))
                    .key(["Id"]),
            )
            .entity(
                EntityKind::builder("Supplier")
                    .table("People")
                    .property(Property::new("Id", ValueType::Int32))
                    .property(Property::new("Name", ValueType::Text))
                    .key(["Id"]),
            )
            .build()
            .unwrap(),
    );
    let customer = model.kind("Customer").unwrap();
    let supplier = model.kind("Supplier").unwrap();
    let config = Config::new()
        .location(dir.path())
        .table_matching(TableMatching::ByName);
    let db = Database::open(model, config);

    db.save_changes(&[RowIntent::added(&customer, vec![Value::Int32(1), Value::from("c")])])
        .unwrap();
    let err = db
        .save_changes(&[RowIntent::added(&supplier, vec![Value::Int32(1), Value::from("s")])])
        .unwrap_err();
    assert!(err.is_duplicate_key());
    assert_eq!(db.tables(&supplier)[0].rows.len(), 1);
}

#[test]
fn derived_kinds_are_listed_with_their_base() {
    let dir = TempDir::new().unwrap();
    let model = Arc::new(
        Model::builder()
            .entity(
                EntityKind::builder("Animal")
                    .property(Property::new("Id", ValueType::Int32))
                    .property(Property::new("Name", ValueType::Text))
                    .key(["Id"])
                    .abstract_kind(),
            )
            .entity(
                EntityKind::builder("Dog")
                    .derives_from("Animal")
                    .property(Property::new("Breed", ValueType::Text)),
            )
            .entity(EntityKind::builder("Cat").derives_from("Animal"))
            .build()
            .unwrap(),
    );
    let animal = model.kind("Animal").unwrap();
    let dog = model.kind("Dog").unwrap();
    let cat = model.kind("Cat").unwrap();
    let db = Database::open(Arc::clone(&model), Config::new().location(dir.path()));

    db.save_changes(&[
        RowIntent::added(&dog, vec![Value::Int32(1), Value::from("Rex"), Value::from("collie")]),
        RowIntent::added(&cat, vec![Value::Int32(1), Value::from("Tom")]),
    ])
    .unwrap();

    let snapshots = db.tables(&animal);
    let names: Vec<_> = snapshots.iter().map(|s| s.kind.name()).collect();
    assert_eq!(names, vec!["Dog", "Cat"]);
    assert!(snapshots.iter().all(|s| s.rows.len() == 1));

    let err = db
        .save_changes(&[RowIntent::added(&animal, vec![Value::Int32(2), Value::from("x")])])
        .unwrap_err();
    assert!(matches!(err.root_cause(), CoreError::InvalidOperation { .. }));
}

#[test]
fn rich_values_round_trip_through_files() {
    let status = ValueType::enumeration("Status", ["Draft", "Published", "Archived"]);
    let ValueType::Enum(status_enum) = status.clone() else {
        unreachable!()
    };
    let model = Arc::new(
        Model::builder()
            .entity(
                EntityKind::builder("Doc")
                    .property(Property::new("Id", ValueType::Uuid))
                    .property(Property::new("Status", status).converter(EnumToOrdinalConverter::new(status_enum)))
                    .property(Property::new("At", ValueType::DateTimeOffset))
                    .property(Property::new("Took", ValueType::Duration))
                    .property(Property::new("Score", ValueType::nullable(ValueType::Float64)))
                    .property(Property::new(
                        "Tags",
                        ValueType::array(ValueType::nullable(ValueType::Int32)),
                    ))
                    .property(Property::new("Flag", ValueType::Bool))
                    .key(["Id"]),
            )
            .build()
            .unwrap(),
    );
    let doc = model.kind("Doc").unwrap();
    let row = vec![
        Value::Uuid(Uuid::new_v4()),
        Value::Enum("Published".into()),
        Value::DateTimeOffset(DateTime::parse_from_rfc3339("2024-02-29T23:59:58+09:00").unwrap()),
        Value::Duration(TimeDelta::try_hours(26).unwrap() + TimeDelta::try_milliseconds(5).unwrap()),
        Value::Null,
        Value::Array(vec![Value::Int32(3), Value::Null, Value::Int32(-1)]),
        Value::Bool(true),
    ];

    for format in FormatKind::ALL {
        let dir = TempDir::new().unwrap();
        let config = Config::new().location(dir.path()).format(format);
        let db = Database::open(Arc::clone(&model), config.clone());
        db.save_changes(&[RowIntent::added(&doc, row.clone())]).unwrap();

        let reopened = Database::open(Arc::clone(&model), config);
        assert_eq!(rows_of(&reopened, "Doc"), vec![row.clone()], "format {format}");
    }
}

#[test]
fn cached_databases_see_each_others_changes() {
    let dir = TempDir::new().unwrap();
    let cache = StoreCache::new();
    let model = blog_model();
    let kind = model.kind("Blog").unwrap();
    let config = Config::new().location(dir.path());

    let writer = Database::open_cached(&cache, &model, &config);
    let reader = Database::open_cached(&cache, &model, &config);
    writer
        .save_changes(&[RowIntent::added(&kind, blog(1, "shared", 1))])
        .unwrap();
    assert_eq!(rows_of(&reader, "Blog"), vec![blog(1, "shared", 1)]);
    assert_eq!(cache.len(), 1);
}
