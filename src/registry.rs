use crate::exemplify::{ExampleMode, Exemplifier};
use crate::schema::{Schema, SchemaId};
use crate::validator::{ValidationOptions, ValidationResult, Validator};
use serde_json::Value;
use std::collections::HashMap;
use std::ops::Index;

/// The memoization key of a built node.
///
/// The same URI built with different `required`, `readonly` or `example`
/// overrides, or with different options, yields different nodes. The example
/// is kept in its serialized form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct SchemaKey {
    pub(crate) uri: String,
    pub(crate) required: Option<Vec<String>>,
    pub(crate) read_only: Option<bool>,
    pub(crate) example: Option<String>,
    pub(crate) options: ValidationOptions,
}

impl SchemaKey {
    /// The key of `uri` built without overrides.
    pub(crate) fn plain(uri: impl Into<String>, options: &ValidationOptions) -> Self {
        SchemaKey {
            uri: uri.into(),
            required: None,
            read_only: None,
            example: None,
            options: options.clone(),
        }
    }
}

/// Owns every node of one or more schema graphs.
///
/// Nodes live in an arena and refer to each other by
/// [`SchemaId`](../schema/struct.SchemaId.html). A registry is filled by a
/// [`Builder`](../builder/struct.Builder.html) and is read-only afterwards, so
/// it can be shared between threads for validation and exemplification.
#[derive(Debug, Default, Clone)]
pub struct Registry {
    schemas: Vec<Schema>,
    index: HashMap<SchemaKey, SchemaId>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a node by handle, if it belongs to this registry.
    pub fn get(&self, id: SchemaId) -> Option<&Schema> {
        self.schemas.get(id.0)
    }

    /// The number of nodes in the arena.
    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// Find the node built for `uri` with default overrides and the given
    /// options.
    pub fn lookup(&self, uri: &str, options: &ValidationOptions) -> Option<SchemaId> {
        self.index.get(&SchemaKey::plain(uri, options)).copied()
    }

    /// Validate `instance` against the node `id`.
    pub fn validate(&self, id: SchemaId, instance: &Value) -> ValidationResult {
        Validator::new(self).validate(id, instance)
    }

    /// Validate `instance`, first writing defaults into it when the node was
    /// built with `set_defaults_when_validating`.
    pub fn validate_mut(&self, id: SchemaId, instance: &mut Value) -> ValidationResult {
        Validator::new(self).validate_mut(id, instance)
    }

    /// Generate an example value for the node `id`.
    pub fn exemplify(&self, id: SchemaId, mode: ExampleMode) -> Value {
        Exemplifier::new(self).exemplify(id, mode)
    }

    pub(crate) fn get_key(&self, key: &SchemaKey) -> Option<SchemaId> {
        self.index.get(key).copied()
    }

    pub(crate) fn insert_key(&mut self, key: SchemaKey, id: SchemaId) {
        self.index.insert(key, id);
    }

    pub(crate) fn remove_key(&mut self, key: &SchemaKey) {
        self.index.remove(key);
    }

    /// Reserve a slot for a node that is about to be inflated.
    pub(crate) fn reserve(&mut self) -> SchemaId {
        self.schemas.push(Schema::default());
        SchemaId(self.schemas.len() - 1)
    }

    pub(crate) fn set(&mut self, id: SchemaId, schema: Schema) {
        self.schemas[id.0] = schema;
    }

    pub(crate) fn schema_mut(&mut self, id: SchemaId) -> &mut Schema {
        &mut self.schemas[id.0]
    }

    /// Drop every node from `len` onwards.
    pub(crate) fn truncate(&mut self, len: usize) {
        self.schemas.truncate(len);
    }
}

impl Index<SchemaId> for Registry {
    type Output = Schema;

    fn index(&self, id: SchemaId) -> &Schema {
        &self.schemas[id.0]
    }
}
