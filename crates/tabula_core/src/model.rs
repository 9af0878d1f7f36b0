//! Entity kinds and their properties.
//!
//! A [`Model`] is the metadata the store works from: which entity kinds
//! exist, their ordered properties, primary keys, inheritance and seed
//! rows. Models are immutable once built.
//!
//! ```
//! use tabula_codec::{Value, ValueType};
//! use tabula_core::{EntityKind, Model, Property};
//!
//! let model = Model::builder()
//!     .entity(
//!         EntityKind::builder("Blog")
//!             .property(Property::new("Id", ValueType::Int32).generated_on_add())
//!             .property(Property::new("Url", ValueType::Text))
//!             .key(["Id"])
//!             .seed(vec![Value::Int32(1), Value::from("https://example.com")]),
//!     )
//!     .build()
//!     .unwrap();
//!
//! let blog = model.kind("Blog").unwrap();
//! assert_eq!(blog.table_name(), "Blog");
//! assert_eq!(blog.key_positions(), &[0]);
//! ```

use crate::compare::{StructuralComparer, ValueComparer};
use crate::convert::ValueConverter;
use crate::error::{CoreError, CoreResult};
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tabula_codec::{Column, Key, Row, RowLayout, Value, ValueType};

static NEXT_KIND_ID: AtomicU32 = AtomicU32::new(1);

/// Opaque identity of an entity kind.
///
/// Ids are unique within the process, including across models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityKindId(u32);

impl EntityKindId {
    fn next() -> Self {
        Self(NEXT_KIND_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw id.
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for EntityKindId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "kind#{}", self.0)
    }
}

/// When the store generates a property's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValueGenerated {
    /// The caller always supplies the value.
    #[default]
    Never,
    /// An integer value is generated when a row is added without one.
    OnAdd,
}

/// A column of an entity kind.
#[derive(Debug, Clone)]
pub struct Property {
    name: String,
    value_type: ValueType,
    concurrency_token: bool,
    generated: ValueGenerated,
    converter: Option<Arc<dyn ValueConverter>>,
    comparer: Arc<dyn ValueComparer>,
}

impl Property {
    /// Creates a plain property.
    pub fn new(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            value_type,
            concurrency_token: false,
            generated: ValueGenerated::Never,
            converter: None,
            comparer: Arc::new(StructuralComparer),
        }
    }

    /// Marks the property as a concurrency token.
    #[must_use]
    pub fn concurrency_token(mut self) -> Self {
        self.concurrency_token = true;
        self
    }

    /// Generates the value when a row is added without one.
    #[must_use]
    pub fn generated_on_add(mut self) -> Self {
        self.generated = ValueGenerated::OnAdd;
        self
    }

    /// Stores the property through `converter`.
    #[must_use]
    pub fn converter(mut self, converter: impl ValueConverter + 'static) -> Self {
        self.converter = Some(Arc::new(converter));
        self
    }

    /// Compares and snapshots values with `comparer`.
    #[must_use]
    pub fn comparer(mut self, comparer: impl ValueComparer + 'static) -> Self {
        self.comparer = Arc::new(comparer);
        self
    }

    /// Returns the property name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the domain type.
    #[must_use]
    pub fn value_type(&self) -> &ValueType {
        &self.value_type
    }

    /// Returns the type the property is stored as.
    #[must_use]
    pub fn provider_type(&self) -> ValueType {
        match &self.converter {
            Some(converter) if self.value_type.is_nullable() => {
                ValueType::nullable(converter.provider_type())
            }
            Some(converter) => converter.provider_type(),
            None => self.value_type.clone(),
        }
    }

    /// Returns whether the property is a concurrency token.
    #[must_use]
    pub fn is_concurrency_token(&self) -> bool {
        self.concurrency_token
    }

    /// Returns the value generation strategy.
    #[must_use]
    pub fn value_generated(&self) -> ValueGenerated {
        self.generated
    }

    /// Returns the converter, if any.
    #[must_use]
    pub fn value_converter(&self) -> Option<&Arc<dyn ValueConverter>> {
        self.converter.as_ref()
    }

    /// Returns the comparer.
    #[must_use]
    pub fn value_comparer(&self) -> &dyn ValueComparer {
        self.comparer.as_ref()
    }
}

/// A record type: ordered properties, a primary key and a table.
#[derive(Debug)]
pub struct EntityKind {
    id: EntityKindId,
    name: String,
    table_name: String,
    properties: Vec<Property>,
    key: Vec<usize>,
    base: Option<EntityKindId>,
    is_abstract: bool,
    seed: Vec<Row>,
    layout: RowLayout,
    provider_layout: RowLayout,
}

impl EntityKind {
    /// Starts describing an entity kind called `name`.
    pub fn builder(name: impl Into<String>) -> EntityKindBuilder {
        EntityKindBuilder::new(name)
    }

    /// Returns the kind's identity.
    #[must_use]
    pub fn id(&self) -> EntityKindId {
        self.id
    }

    /// Returns the kind name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the name of the table (and file) holding the kind's rows.
    #[must_use]
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Returns the properties, inherited ones first.
    #[must_use]
    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    /// Returns the property called `name`.
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Returns the position of the property called `name`.
    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.properties.iter().position(|p| p.name == name)
    }

    /// Returns the position of the property called `name`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnknownColumn`] if there is no such property.
    pub fn require_position(&self, name: &str) -> CoreResult<usize> {
        self.position(name)
            .ok_or_else(|| CoreError::unknown_column(&self.name, name))
    }

    /// Returns the positions of the key properties.
    #[must_use]
    pub fn key_positions(&self) -> &[usize] {
        &self.key
    }

    /// Returns the base kind, if this kind derives from one.
    #[must_use]
    pub fn base(&self) -> Option<EntityKindId> {
        self.base
    }

    /// Returns whether the kind is abstract. Abstract kinds have no table.
    #[must_use]
    pub fn is_abstract(&self) -> bool {
        self.is_abstract
    }

    /// Returns the rows added by `ensure_created`.
    #[must_use]
    pub fn seed_rows(&self) -> &[Row] {
        &self.seed
    }

    /// Returns the layout of domain rows.
    #[must_use]
    pub fn layout(&self) -> &RowLayout {
        &self.layout
    }

    /// Returns the layout rows are stored with, after conversion.
    #[must_use]
    pub fn provider_layout(&self) -> &RowLayout {
        &self.provider_layout
    }

    /// Builds the key of a domain row.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidRow`] if the row has the wrong number
    /// of values.
    pub fn key_of(&self, row: &Row) -> CoreResult<Key> {
        self.layout
            .key_of(row)
            .map_err(|e| CoreError::invalid_row(&self.name, e.to_string()))
    }
}

/// Describes an entity kind for [`ModelBuilder::entity`].
#[derive(Debug, Clone)]
pub struct EntityKindBuilder {
    name: String,
    table_name: Option<String>,
    properties: Vec<Property>,
    key: Vec<String>,
    base: Option<String>,
    is_abstract: bool,
    seed: Vec<Row>,
}

impl EntityKindBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table_name: None,
            properties: Vec::new(),
            key: Vec::new(),
            base: None,
            is_abstract: false,
            seed: Vec::new(),
        }
    }

    /// Stores the kind in the table called `name` instead of the kind name.
    #[must_use]
    pub fn table(mut self, name: impl Into<String>) -> Self {
        self.table_name = Some(name.into());
        self
    }

    /// Adds a property.
    #[must_use]
    pub fn property(mut self, property: Property) -> Self {
        self.properties.push(property);
        self
    }

    /// Sets the primary key, by property name.
    #[must_use]
    pub fn key<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.key = names.into_iter().map(Into::into).collect();
        self
    }

    /// Derives from a kind declared earlier. Properties and key are
    /// inherited. The table name is not.
    #[must_use]
    pub fn derives_from(mut self, base: impl Into<String>) -> Self {
        self.base = Some(base.into());
        self
    }

    /// Marks the kind as abstract.
    #[must_use]
    pub fn abstract_kind(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    /// Adds a seed row, one value per property including inherited ones.
    #[must_use]
    pub fn seed(mut self, row: Row) -> Self {
        self.seed.push(row);
        self
    }

    fn build(self, base: Option<&EntityKind>) -> CoreResult<EntityKind> {
        let mut properties = base.map(|b| b.properties.clone()).unwrap_or_default();
        for property in self.properties {
            if properties.iter().any(|p| p.name == property.name) {
                return Err(CoreError::invalid_model(format!(
                    "{} declares property {} twice",
                    self.name, property.name
                )));
            }
            properties.push(property);
        }
        if properties.is_empty() {
            return Err(CoreError::invalid_model(format!("{} has no properties", self.name)));
        }

        let key = if self.key.is_empty() {
            base.map(|b| b.key.clone()).unwrap_or_default()
        } else {
            self.key
                .iter()
                .map(|k| {
                    properties
                        .iter()
                        .position(|p| p.name == *k)
                        .ok_or_else(|| CoreError::unknown_column(&self.name, k))
                })
                .collect::<CoreResult<Vec<_>>>()?
        };
        if key.is_empty() {
            return Err(CoreError::invalid_model(format!("{} has no key", self.name)));
        }

        for (i, property) in properties.iter().enumerate() {
            if property.generated == ValueGenerated::OnAdd && !property.value_type.is_integer() {
                return Err(CoreError::invalid_model(format!(
                    "{}.{} is generated but not an integer",
                    self.name, property.name
                )));
            }
            if key.contains(&i) && property.value_type.is_nullable() {
                return Err(CoreError::invalid_model(format!(
                    "key property {}.{} is nullable",
                    self.name, property.name
                )));
            }
        }

        for row in &self.seed {
            validate_row(&self.name, &properties, row)?;
            // a seed must carry its key, or reopening would seed it again
            if let Some(&column) = key.iter().find(|&&i| {
                properties[i].generated == ValueGenerated::OnAdd && needs_generated_value(&row[i])
            }) {
                return Err(CoreError::invalid_row(
                    &self.name,
                    format!("seed row leaves generated key {} unset", properties[column].name),
                ));
            }
        }

        let layout = RowLayout::new(
            properties
                .iter()
                .map(|p| Column::new(p.name.clone(), p.value_type.clone()))
                .collect(),
            key.clone(),
        )?;
        let provider_layout = RowLayout::new(
            properties
                .iter()
                .map(|p| Column::new(p.name.clone(), p.provider_type()))
                .collect(),
            key.clone(),
        )?;

        let table_name = self.table_name.unwrap_or_else(|| self.name.clone());

        Ok(EntityKind {
            id: EntityKindId::next(),
            name: self.name,
            table_name,
            properties,
            key,
            base: base.map(|b| b.id),
            is_abstract: self.is_abstract,
            seed: self.seed,
            layout,
            provider_layout,
        })
    }
}

/// Whether a generated column's value is a placeholder for the next
/// generated value.
pub(crate) fn needs_generated_value(value: &Value) -> bool {
    value.is_null() || value.as_i64() == Some(0)
}

/// Checks that a row has one value of the right type per property.
pub(crate) fn validate_row(entity: &str, properties: &[Property], row: &Row) -> CoreResult<()> {
    if row.len() != properties.len() {
        return Err(CoreError::invalid_row(
            entity,
            format!("expected {} values, got {}", properties.len(), row.len()),
        ));
    }
    for (property, value) in properties.iter().zip(row) {
        if !property.value_type.accepts(value) {
            return Err(CoreError::invalid_row(
                entity,
                format!(
                    "{} expects {}, got {}",
                    property.name,
                    property.value_type,
                    value.type_name()
                ),
            ));
        }
    }
    Ok(())
}

/// The set of entity kinds a store serves.
#[derive(Debug, Default)]
pub struct Model {
    kinds: Vec<Arc<EntityKind>>,
}

impl Model {
    /// Starts building a model.
    #[must_use]
    pub fn builder() -> ModelBuilder {
        ModelBuilder::default()
    }

    /// Returns every kind in declaration order.
    #[must_use]
    pub fn kinds(&self) -> &[Arc<EntityKind>] {
        &self.kinds
    }

    /// Returns the kind called `name`.
    #[must_use]
    pub fn kind(&self, name: &str) -> Option<Arc<EntityKind>> {
        self.kinds.iter().find(|k| k.name == name).cloned()
    }

    /// Returns the kind with identity `id`.
    #[must_use]
    pub fn kind_by_id(&self, id: EntityKindId) -> Option<Arc<EntityKind>> {
        self.kinds.iter().find(|k| k.id == id).cloned()
    }

    /// Returns the kinds that have a table.
    pub fn concrete_kinds(&self) -> impl Iterator<Item = &Arc<EntityKind>> {
        self.kinds.iter().filter(|k| !k.is_abstract)
    }

    /// Returns `kind` and every kind deriving from it, directly or not.
    #[must_use]
    pub fn derived_inclusive(&self, kind: &EntityKind) -> Vec<Arc<EntityKind>> {
        // bases are always declared before derived kinds
        let mut family = vec![kind.id];
        let mut result = Vec::new();
        for candidate in &self.kinds {
            let member = candidate.id == kind.id
                || candidate.base.is_some_and(|b| family.contains(&b));
            if member {
                if candidate.id != kind.id {
                    family.push(candidate.id);
                }
                result.push(Arc::clone(candidate));
            }
        }
        result
    }
}

/// Builds a [`Model`].
#[derive(Debug, Default)]
pub struct ModelBuilder {
    kinds: Vec<EntityKindBuilder>,
}

impl ModelBuilder {
    /// Adds an entity kind.
    #[must_use]
    pub fn entity(mut self, kind: EntityKindBuilder) -> Self {
        self.kinds.push(kind);
        self
    }

    /// Validates the kinds and builds the model.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidModel`] or [`CoreError::UnknownColumn`]
    /// if a kind is inconsistent, a base kind is not declared before its
    /// derived kinds, or two kinds share a name.
    pub fn build(self) -> CoreResult<Model> {
        let mut kinds: Vec<Arc<EntityKind>> = Vec::with_capacity(self.kinds.len());
        for builder in self.kinds {
            if kinds.iter().any(|k| k.name == builder.name) {
                return Err(CoreError::invalid_model(format!(
                    "entity kind {} declared twice",
                    builder.name
                )));
            }
            let base = match &builder.base {
                Some(base_name) => Some(
                    kinds
                        .iter()
                        .find(|k| k.name == *base_name)
                        .cloned()
                        .ok_or_else(|| {
                            CoreError::invalid_model(format!(
                                "base kind {base_name} of {} must be declared first",
                                builder.name
                            ))
                        })?,
                ),
                None => None,
            };
            kinds.push(Arc::new(builder.build(base.as_deref())?));
        }
        Ok(Model { kinds })
    }
}
