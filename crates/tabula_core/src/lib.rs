//! # Tabula Core
//!
//! Embedded file-backed table store.
//!
//! Every entity kind of a [`Model`] is held in memory as a table of rows
//! keyed by primary key, and persisted as one file per table in the format
//! chosen by the [`Config`]. Changes arrive as batches of [`RowIntent`]s.
//!
//! This crate provides:
//! - Entity kinds with typed properties, keys, inheritance and seed rows
//! - Create, update and delete with optimistic concurrency tokens
//! - Integer value generation for key columns
//! - Value converters and comparers per property
//! - A store lock serializing batches, and a process-wide store cache
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use tabula_codec::{Value, ValueType};
//! use tabula_core::{Config, Database, EntityKind, Model, Property, RowIntent};
//!
//! let dir = tempfile::tempdir().unwrap();
//! let model = Arc::new(
//!     Model::builder()
//!         .entity(
//!             EntityKind::builder("Blog")
//!                 .property(Property::new("Id", ValueType::Int32).generated_on_add())
//!                 .property(Property::new("Url", ValueType::Text))
//!                 .property(Property::new("Version", ValueType::Int32).concurrency_token())
//!                 .key(["Id"]),
//!         )
//!         .build()
//!         .unwrap(),
//! );
//! let blog = model.kind("Blog").unwrap();
//! let db = Database::open(Arc::clone(&model), Config::new().location(dir.path()));
//!
//! db.save_changes(&[RowIntent::added(
//!     &blog,
//!     vec![Value::Null, Value::from("https://example.com"), Value::Int32(1)],
//! )])
//! .unwrap();
//!
//! // stale token: the caller read version 0
//! let stale = RowIntent::modified(&blog, vec![Value::Int32(1), Value::from("x"), Value::Int32(2)])
//!     .with_original(2, Value::Int32(0))
//!     .mark_all_modified();
//! let err = db.save_changes(&[stale]).unwrap_err();
//! assert!(err.is_concurrency_conflict());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod cache;
mod compare;
mod config;
mod convert;
mod database;
mod error;
mod generator;
mod intent;
mod model;
mod store;
mod table;

pub use cache::StoreCache;
pub use compare::{CaseInsensitiveTextComparer, StructuralComparer, ValueComparer};
pub use config::{Config, TableMatching, DEFAULT_BASE_DIR};
pub use convert::{BoolToIntConverter, EnumToOrdinalConverter, FnConverter, RowConverter, ValueConverter};
pub use database::Database;
pub use error::{ConcurrencyConflict, ConflictKind, ConflictingColumn, CoreError, CoreResult};
pub use generator::IntegerValueGenerator;
pub use intent::{IntentState, RowIntent};
pub use model::{
    EntityKind, EntityKindBuilder, EntityKindId, Model, ModelBuilder, Property, ValueGenerated,
};
pub use store::{Store, TableSnapshot};
pub use table::{LoadOutcome, Table};

// Re-export the crates callers need to describe rows and storage.
pub use tabula_codec;
pub use tabula_storage;
