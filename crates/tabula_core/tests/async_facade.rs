//! The async facade runs batches on the blocking pool.

#![cfg(feature = "async")]

use std::sync::Arc;
use tabula_codec::{Value, ValueType};
use tabula_core::{Config, Database, EntityKind, Model, Property, RowIntent};
use tempfile::TempDir;

fn model() -> Arc<Model> {
    Arc::new(
        Model::builder()
            .entity(
                EntityKind::builder("Event")
                    .property(Property::new("Id", ValueType::Int64).generated_on_add())
                    .property(Property::new("Name", ValueType::Text))
                    .key(["Id"]),
            )
            .build()
            .unwrap(),
    )
}

#[tokio::test]
async fn save_changes_async_applies_the_batch() {
    let dir = TempDir::new().unwrap();
    let model = model();
    let event = model.kind("Event").unwrap();
    let db = Database::open(Arc::clone(&model), Config::new().location(dir.path()));

    let count = db
        .save_changes_async(vec![
            RowIntent::added(&event, vec![Value::Null, Value::from("start")]),
            RowIntent::added(&event, vec![Value::Null, Value::from("stop")]),
        ])
        .await
        .unwrap();
    assert_eq!(count, 2);

    let reopened = Database::open(model, Config::new().location(dir.path()));
    let snapshots = reopened.tables(&event);
    assert_eq!(snapshots[0].rows[1], vec![Value::Int64(2), Value::from("stop")]);
}

#[tokio::test]
async fn errors_come_back_through_the_future() {
    let dir = TempDir::new().unwrap();
    let model = model();
    let event = model.kind("Event").unwrap();
    let db = Database::open(model, Config::new().location(dir.path()));

    let row = vec![Value::Int64(1), Value::from("once")];
    let err = db
        .save_changes_async(vec![
            RowIntent::added(&event, row.clone()),
            RowIntent::added(&event, row),
        ])
        .await
        .unwrap_err();
    assert!(err.is_duplicate_key());
}
