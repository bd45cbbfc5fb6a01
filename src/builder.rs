//! Build schema graphs out of raw definitions.
//!
//! A [`Builder`](struct.Builder.html) fetches schema documents through a
//! [`SchemaLoader`](../loader/trait.SchemaLoader.html) and inflates them into
//! the nodes of a [`Registry`](../registry/struct.Registry.html), resolving
//! `$ref`, `extends` and `id` along the way.
//!
//! Every node is registered under its key before its keywords are inflated,
//! so a reference back to a node that is still being built resolves to that
//! node's handle. This is what makes recursive schemas terminate.

use crate::errors::{Result, SchemaError};
use crate::format::Format;
use crate::loader::{FileLoader, SchemaLoader};
use crate::registry::{Registry, SchemaKey};
use crate::schema::{
    Additional, Dependency, Items, PatternProperty, Schema, SchemaId, Type, TypeRef, TypeSpec,
};
use crate::serde::SerdeSchema;
use crate::validator::ValidationOptions;
use indexmap::IndexMap;
use json_pointer::JsonPointer;
use regex::Regex;
use serde_json::Value;
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::mem;
use tracing::{debug, trace};
use url::Url;

/// Resolves schema locators into nodes of a registry.
///
/// ```
/// use jsv::{Builder, MemoryLoader};
/// use serde_json::json;
///
/// let mut loader = MemoryLoader::new();
/// loader.insert("http://example.com/point", r#"{
///     "type": "object",
///     "properties": {
///         "x": { "type": "integer" },
///         "y": { "type": "integer" }
///     },
///     "required": ["x", "y"]
/// }"#);
///
/// let mut builder = Builder::with_loader(loader);
/// let point = builder.build("http://example.com/point").unwrap();
///
/// let registry = builder.registry();
/// assert!(registry.validate(point, &json!({"x": 1, "y": 2})).is_valid());
/// assert!(!registry.validate(point, &json!({"x": 1})).is_valid());
/// ```
pub struct Builder<L: SchemaLoader = FileLoader> {
    loader: L,
    options: ValidationOptions,
    registry: Registry,
    // Resolution scopes; an empty string means "no scope".
    scopes: Vec<String>,
    // Nodes currently being inflated, innermost last.
    current: Vec<SchemaId>,
    documents: HashMap<String, Value>,
    fixups: Vec<Fixup>,
    aliases: HashMap<SchemaId, SchemaId>,
    // Keys registered by the build in progress.
    journal: Vec<SchemaKey>,
    // Documents cached by the build in progress.
    published: Vec<String>,
    anonymous: usize,
}

/// Work deferred until a top-level build has inflated every node.
#[derive(Debug)]
enum Fixup {
    /// The slot was defined by a `$ref` and becomes a copy of its target.
    Alias(SchemaId, SchemaId),
    /// The keywords a referencing definition imposes on its target.
    Override(SchemaId, Overrides),
}

/// The keywords of a `$ref` definition that win over the referenced schema.
#[derive(Debug, Clone, Default, PartialEq)]
struct Overrides {
    required: Option<Vec<String>>,
    read_only: Option<bool>,
    example: Option<Value>,
}

impl Overrides {
    fn of(def: &SerdeSchema) -> Self {
        Overrides {
            required: def.required.clone(),
            read_only: def.readonly,
            example: def.example.clone(),
        }
    }

    fn is_empty(&self) -> bool {
        self.required.is_none() && self.read_only.is_none() && self.example.is_none()
    }

    fn key(&self, uri: &str, options: &ValidationOptions) -> SchemaKey {
        SchemaKey {
            uri: uri.to_owned(),
            required: self.required.clone(),
            read_only: self.read_only,
            example: self.example.as_ref().map(Value::to_string),
            options: options.clone(),
        }
    }

    fn apply(&self, schema: &mut Schema) {
        if let Some(required) = &self.required {
            schema.required = required.clone();
        }
        if let Some(read_only) = self.read_only {
            schema.read_only = read_only;
        }
        if let Some(example) = &self.example {
            schema.example = Some(example.clone());
        }
    }
}

impl Builder<FileLoader> {
    /// A builder that reads schemas from local files.
    pub fn new() -> Self {
        Self::with_loader(FileLoader)
    }
}

impl Default for Builder<FileLoader> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L: SchemaLoader> Builder<L> {
    pub fn with_loader(loader: L) -> Self {
        Builder {
            loader,
            options: ValidationOptions::default(),
            registry: Registry::new(),
            scopes: Vec::new(),
            current: Vec::new(),
            documents: HashMap::new(),
            fixups: Vec::new(),
            aliases: HashMap::new(),
            journal: Vec::new(),
            published: Vec::new(),
            anonymous: 0,
        }
    }

    /// Set the options baked into nodes built from now on.
    ///
    /// Nodes built earlier keep their options; building the same locator
    /// under different options yields a different node.
    pub fn set_options(&mut self, options: ValidationOptions) -> &mut Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &ValidationOptions {
        &self.options
    }

    /// Build the schema behind `locator`.
    ///
    /// The locator is a URI or a path understood by the loader, optionally
    /// followed by a JSON pointer fragment (`schema.json#/definitions/a`).
    /// Building the same locator twice yields the same handle.
    pub fn build(&mut self, locator: &str) -> Result<SchemaId> {
        self.build_top(locator, Overrides::default())
    }

    /// Build the schema behind `locator`, overriding its `required` names
    /// and its read-only marker.
    ///
    /// An empty `required` list and a `false` marker leave the schema's own
    /// values alone.
    pub fn build_with(&mut self, locator: &str, required: &[&str], read_only: bool) -> Result<SchemaId> {
        let overrides = Overrides {
            required: if required.is_empty() {
                None
            } else {
                Some(required.iter().map(|name| (*name).to_owned()).collect())
            },
            read_only: if read_only { Some(true) } else { None },
            example: None,
        };

        self.build_top(locator, overrides)
    }

    /// Build a schema from a definition that is already in memory.
    ///
    /// Each call gets a base URI of its own, so fragment references of
    /// different definitions never collide.
    pub fn inflate_value(&mut self, definition: &Value) -> Result<SchemaId> {
        let uri = format!("urn:jsv:document:{}", self.anonymous);
        self.anonymous += 1;
        self.documents.insert(uri.clone(), definition.clone());
        self.build(&uri).map_err(|err| {
            self.documents.remove(&uri);
            err
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn into_registry(self) -> Registry {
        self.registry
    }

    fn build_top(&mut self, locator: &str, overrides: Overrides) -> Result<SchemaId> {
        let mark = self.registry.len();

        let result = self.build_uri(locator, &overrides).map(|id| {
            if !overrides.is_empty() {
                self.fixups.push(Fixup::Override(id, overrides));
            }
            id
        });

        match result {
            Ok(id) => {
                self.finish();
                Ok(id)
            }
            Err(err) => {
                self.rollback(mark);
                Err(err)
            }
        }
    }

    fn finish(&mut self) {
        for fixup in mem::take(&mut self.fixups) {
            match fixup {
                Fixup::Alias(slot, target) => {
                    let target = self.follow_aliases(target);
                    if target != slot {
                        let schema = self.registry[target].clone();
                        self.registry.set(slot, schema);
                    }
                }
                Fixup::Override(id, overrides) => overrides.apply(self.registry.schema_mut(id)),
            }
        }

        self.aliases.clear();
        self.journal.clear();
        self.published.clear();
    }

    fn rollback(&mut self, mark: usize) {
        debug!(nodes = self.registry.len() - mark, "rolling back failed build");
        for key in mem::take(&mut self.journal) {
            self.registry.remove_key(&key);
        }
        for uri in mem::take(&mut self.published) {
            self.documents.remove(&uri);
        }

        self.registry.truncate(mark);
        self.fixups.clear();
        self.aliases.clear();
        self.scopes.clear();
        self.current.clear();
    }

    fn follow_aliases(&self, mut id: SchemaId) -> SchemaId {
        let mut seen = HashSet::new();
        while let Some(target) = self.aliases.get(&id) {
            if !seen.insert(id) {
                break;
            }
            id = *target;
        }
        id
    }

    fn register(&mut self, key: SchemaKey, id: SchemaId) {
        debug!(uri = %key.uri, id = id.index(), "registering schema");
        self.registry.insert_key(key.clone(), id);
        self.journal.push(key);
    }

    /// Cache `document` under `uri` unless a document is cached there already.
    fn publish(&mut self, uri: String, document: &Value) {
        if let Entry::Vacant(entry) = self.documents.entry(uri) {
            trace!(uri = %entry.key(), "caching schema document");
            self.published.push(entry.key().clone());
            entry.insert(document.clone());
        }
    }

    fn scope(&self) -> &str {
        self.scopes.last().map(String::as_str).unwrap_or("")
    }

    fn resolve_uri(&self, path: &str) -> String {
        let resolved = join_uri(self.scope(), path);
        match resolved.strip_suffix('#') {
            Some(stripped) => stripped.to_owned(),
            None => resolved,
        }
    }

    fn build_uri(&mut self, locator: &str, overrides: &Overrides) -> Result<SchemaId> {
        if let Some(typ) = Type::from_name(locator) {
            return Ok(self.builtin(typ, overrides));
        }

        let uri = self.resolve_uri(locator);
        let key = overrides.key(&uri, &self.options);
        if let Some(id) = self.registry.get_key(&key) {
            trace!(uri = %uri, id = id.index(), "reusing built schema");
            return Ok(id);
        }

        let (definition, scope) = self.fetch_definition(locator, &uri)?;

        self.scopes.push(scope);
        let result = self.inflate_fetched(key, &definition);
        self.scopes.pop();
        result
    }

    fn inflate_fetched(&mut self, key: SchemaKey, definition: &Value) -> Result<SchemaId> {
        let slot = self.registry.reserve();
        self.register(key.clone(), slot);

        if let Some(id) = definition.get("id").and_then(Value::as_str) {
            let id_key = SchemaKey {
                uri: self.resolve_uri(id),
                ..key
            };
            if self.registry.get_key(&id_key).is_none() {
                self.register(id_key, slot);
            }
        }

        self.inflate_into(definition, slot)?;
        Ok(slot)
    }

    /// A node holding nothing but a primitive type.
    fn builtin(&mut self, typ: Type, overrides: &Overrides) -> SchemaId {
        let key = overrides.key(typ.name(), &self.options);
        if let Some(id) = self.registry.get_key(&key) {
            return id;
        }

        let id = self.registry.reserve();
        let mut schema = Schema {
            typ: TypeSpec::Single(TypeRef::Named(typ)),
            options: self.options.clone(),
            ..Schema::default()
        };
        overrides.apply(&mut schema);
        self.registry.set(id, schema);
        self.register(key, id);
        id
    }

    /// Find the definition a resolved URI points at, along with the
    /// resolution scope of its document.
    fn fetch_definition(&mut self, locator: &str, uri: &str) -> Result<(Value, String)> {
        let (document_uri, fragment) = match uri.find('#') {
            Some(index) => (&uri[..index], Some(&uri[index..])),
            None => (uri, None),
        };

        let scope = self.scope().to_owned();
        let not_found = || SchemaError::NotFound {
            locator: locator.to_owned(),
            resolved: uri.to_owned(),
            scope: scope.clone(),
        };

        let document = match self.load_document(document_uri)? {
            Some(document) => document,
            None => return Err(not_found()),
        };

        let document_scope = match document.get("id").and_then(Value::as_str) {
            Some(id) => join_uri(document_uri, id),
            None => document_uri.to_owned(),
        };

        let definition = match fragment {
            Some(fragment) if fragment.len() > 1 => {
                let pointer = fragment
                    .parse::<JsonPointer<String, Vec<String>>>()
                    .map_err(|_| not_found())?;
                pointer.get(document).map_err(|_| not_found())?.clone()
            }
            _ => document.clone(),
        };

        if !definition.is_object() {
            return Err(SchemaError::NotAnObject {
                locator: uri.to_owned(),
            });
        }

        Ok((definition, document_scope))
    }

    fn load_document(&mut self, uri: &str) -> Result<Option<&Value>> {
        if !self.documents.contains_key(uri) {
            debug!(uri, "loading schema document");
            let text = self
                .loader
                .load_schema(uri)
                .map_err(|err| SchemaError::Load {
                    locator: uri.to_owned(),
                    message: err.to_string(),
                })?;

            let text = match text {
                Some(text) => text,
                None => return Ok(None),
            };

            let document: Value = serde_json::from_str(&text).map_err(|err| SchemaError::Parse {
                locator: uri.to_owned(),
                message: err.to_string(),
            })?;

            if let Some(id) = document.get("id").and_then(Value::as_str) {
                let id = join_uri(uri, id);
                self.publish(id, &document);
            }
            self.publish(uri.to_owned(), &document);
        }

        Ok(self.documents.get(uri))
    }

    /// Fill `slot` from a raw definition. A `$ref` definition turns the slot
    /// into an alias of its target.
    fn inflate_into(&mut self, raw: &Value, slot: SchemaId) -> Result<()> {
        if !raw.is_object() {
            return Err(SchemaError::NotAnObject {
                locator: self.scope().to_owned(),
            });
        }

        let def = SerdeSchema::from_value(raw)?;
        match &def.rxf {
            Some(rxf) => {
                let target = self.inflate_ref(rxf, &def)?;
                self.alias(slot, target);
                Ok(())
            }
            None => self.inflate_raw(raw, &def, slot),
        }
    }

    fn alias(&mut self, slot: SchemaId, target: SchemaId) {
        if slot != target {
            self.aliases.insert(slot, target);
            self.fixups.push(Fixup::Alias(slot, target));
        }
    }

    fn inflate_ref(&mut self, rxf: &str, def: &SerdeSchema) -> Result<SchemaId> {
        let overrides = Overrides::of(def);
        debug!(reference = rxf, scope = self.scope(), "resolving reference");

        if rxf == "#" && self.scope().is_empty() {
            let target = match self.current.last() {
                Some(id) => *id,
                None => {
                    return Err(SchemaError::NotFound {
                        locator: rxf.to_owned(),
                        resolved: rxf.to_owned(),
                        scope: String::new(),
                    })
                }
            };

            if overrides.is_empty() {
                return Ok(target);
            }

            let slot = self.registry.reserve();
            self.alias(slot, target);
            self.fixups.push(Fixup::Override(slot, overrides));
            return Ok(slot);
        }

        let target = self.build_uri(rxf, &overrides)?;
        if !overrides.is_empty() {
            self.fixups.push(Fixup::Override(target, overrides));
        }
        Ok(target)
    }

    /// Inflate a nested definition: a type name, a list of type names or a
    /// schema object.
    fn inflate(&mut self, raw: &Value) -> Result<SchemaId> {
        match raw {
            Value::String(name) => Ok(self.builtin(name.parse()?, &Overrides::default())),
            Value::Array(_) => {
                let typ = self.type_spec(raw, "type", None)?;
                let id = self.registry.reserve();
                let schema = Schema {
                    typ,
                    options: self.options.clone(),
                    ..Schema::default()
                };
                self.registry.set(id, schema);
                Ok(id)
            }
            Value::Object(_) => {
                let def = SerdeSchema::from_value(raw)?;
                if let Some(rxf) = &def.rxf {
                    return self.inflate_ref(rxf, &def);
                }

                let slot = match &def.id {
                    Some(id) => {
                        let key = SchemaKey::plain(self.resolve_uri(id), &self.options);
                        if let Some(existing) = self.registry.get_key(&key) {
                            trace!(uri = %key.uri, "reusing schema with the same id");
                            return Ok(existing);
                        }

                        let slot = self.registry.reserve();
                        self.register(key, slot);
                        slot
                    }
                    None => self.registry.reserve(),
                };

                self.inflate_raw(raw, &def, slot)?;
                Ok(slot)
            }
            _ => Err(SchemaError::NotAnObject {
                locator: self.scope().to_owned(),
            }),
        }
    }

    fn inflate_raw(&mut self, raw: &Value, def: &SerdeSchema, slot: SchemaId) -> Result<()> {
        let base = match &def.extends {
            Some(extends) => Some(self.extended(extends)?),
            None => None,
        };

        let mut schema = base.unwrap_or_default();
        schema.options = self.options.clone();

        let scope = match &def.id {
            Some(id) => {
                let id = self.resolve_uri(id);
                schema.id = Some(id.clone());
                self.publish(id.clone(), raw);
                id
            }
            None => self.scope().to_owned(),
        };

        self.scopes.push(scope);
        self.current.push(slot);
        let result = self.apply_keywords(def, slot, schema);
        self.current.pop();
        self.scopes.pop();

        self.registry.set(slot, result?);
        Ok(())
    }

    /// The base an `extends` definition is layered over.
    fn extended(&mut self, extends: &Value) -> Result<Schema> {
        let base = match extends {
            Value::String(locator) => self.build_uri(locator, &Overrides::default())?,
            Value::Object(_) => self.inflate(extends)?,
            _ => {
                return Err(SchemaError::InvalidKeyword {
                    keyword: "extends",
                    expected: "a URI or a schema",
                })
            }
        };

        let mut schema = self.registry[self.follow_aliases(base)].clone();
        for fixup in &self.fixups {
            if let Fixup::Override(id, overrides) = fixup {
                if *id == base {
                    overrides.apply(&mut schema);
                }
            }
        }

        schema.id = None;
        Ok(schema)
    }

    fn apply_keywords(&mut self, def: &SerdeSchema, slot: SchemaId, mut schema: Schema) -> Result<Schema> {
        if let Some(defs) = &def.defs {
            self.register_definitions(defs)?;
        }

        if def.title.is_some() {
            schema.title = def.title.clone();
        }
        if def.description.is_some() {
            schema.description = def.description.clone();
        }

        if let Some(typ) = &def.typ {
            schema.typ = self.type_spec(typ, "type", Some(slot))?;
        }
        if let Some(disallow) = &def.disallow {
            schema.disallow = Some(self.type_spec(disallow, "disallow", None)?);
        }

        if let Some(all_of) = &def.all_of {
            schema.all_of = self.schema_list(all_of, "allOf")?;
        }
        if let Some(any_of) = &def.any_of {
            schema.any_of = self.schema_list(any_of, "anyOf")?;
        }
        if let Some(one_of) = &def.one_of {
            schema.one_of = self.schema_list(one_of, "oneOf")?;
        }

        if let Some(props) = &def.props {
            schema.properties.clear();
            for (name, prop) in props {
                let id = self.inflate(prop)?;
                schema.properties.insert(name.clone(), id);
            }
        }

        if let Some(pattern_props) = &def.pattern_props {
            schema.pattern_properties.clear();
            for (pattern, prop) in pattern_props {
                let regex = compile(pattern)?;
                let id = self.inflate(prop)?;
                schema
                    .pattern_properties
                    .push(PatternProperty { regex, schema: id });
            }
        }

        if let Some(additional) = &def.additional_props {
            schema.additional_properties = self.additional(additional)?;
        }

        if let Some(items) = &def.items {
            schema.items = match items {
                Value::Array(tuple) => Items::Tuple(
                    tuple
                        .iter()
                        .map(|item| self.inflate(item))
                        .collect::<Result<_>>()?,
                ),
                _ => Items::Single(self.inflate(items)?),
            };
        }

        if let Some(additional) = &def.additional_items {
            schema.additional_items = self.additional(additional)?;
        }

        if let Some(required) = &def.required {
            schema.required = required.clone();
        }
        if let Some(read_only) = def.readonly {
            schema.read_only = read_only;
        }

        if let Some(dependencies) = &def.dependencies {
            schema.dependencies.clear();
            for (name, dependency) in dependencies {
                let dependency = self.dependency(dependency)?;
                schema.dependencies.insert(name.clone(), dependency);
            }
        }

        if def.minimum.is_some() {
            schema.minimum = def.minimum;
        }
        if def.maximum.is_some() {
            schema.maximum = def.maximum;
        }
        if let Some(exclusive) = def.exclusive_minimum {
            schema.exclusive_minimum = exclusive;
        }
        if let Some(exclusive) = def.exclusive_maximum {
            schema.exclusive_maximum = exclusive;
        }
        if let Some(divisor) = &def.divisible_by {
            if divisor.as_f64() == Some(0.0) {
                return Err(SchemaError::ZeroDivisor);
            }
            schema.divisible_by = Some(divisor.clone());
        }

        if def.min_length.is_some() {
            schema.min_length = def.min_length;
        }
        if def.max_length.is_some() {
            schema.max_length = def.max_length;
        }
        if let Some(pattern) = &def.pattern {
            schema.pattern = Some(compile(pattern)?);
        }

        if def.min_items.is_some() {
            schema.min_items = def.min_items;
        }
        if def.max_items.is_some() {
            schema.max_items = def.max_items;
        }
        if let Some(unique) = def.unique_items {
            schema.unique_items = unique;
        }

        if def.enumeration.is_some() {
            schema.enumeration = def.enumeration.clone();
        }
        if let Some(format) = &def.format {
            schema.format = Some(format.parse::<Format>()?);
        }

        if def.default.is_some() {
            schema.default = def.default.clone();
        }
        if def.example.is_some() {
            schema.example = def.example.clone();
        }
        if def.pattern_property_examples.is_some() {
            schema.pattern_property_examples = def.pattern_property_examples.clone();
        }
        if def.expandable.is_some() {
            schema.expandable = def.expandable;
        }

        Ok(schema)
    }

    /// Register every entry of `definitions` under
    /// `<scope>#/definitions/<name>`.
    fn register_definitions(&mut self, defs: &IndexMap<String, Value>) -> Result<()> {
        for (name, raw) in defs {
            let uri = self.resolve_uri(&format!("#/definitions/{}", name));
            let key = SchemaKey::plain(uri.clone(), &self.options);
            if self.registry.get_key(&key).is_some() {
                continue;
            }

            if !raw.is_object() {
                let id = self.inflate(raw)?;
                self.register(key, id);
                continue;
            }

            let slot = self.registry.reserve();
            self.register(key, slot);
            self.inflate_into(raw, slot)?;

            if !self.aliases.contains_key(&slot) {
                let schema = self.registry.schema_mut(slot);
                if schema.id.is_none() {
                    schema.id = Some(uri);
                }
            }
        }

        Ok(())
    }

    /// Interpret a `type` or `disallow` value. `this` is the node being
    /// built, which a `type` may not point back at.
    fn type_spec(&mut self, value: &Value, keyword: &'static str, this: Option<SchemaId>) -> Result<TypeSpec> {
        match value {
            Value::Array(members) => {
                if members.is_empty() {
                    return Err(SchemaError::InvalidKeyword {
                        keyword,
                        expected: "a non-empty list of types",
                    });
                }

                let mut refs = Vec::with_capacity(members.len());
                for member in members {
                    if member.is_array() {
                        return Err(SchemaError::InvalidKeyword {
                            keyword,
                            expected: "a list of type names and schemas",
                        });
                    }
                    refs.push(self.type_ref(member, keyword, this)?);
                }

                // Schema members are tried before type names.
                let (mut union, names): (Vec<_>, Vec<_>) = refs
                    .into_iter()
                    .partition(|member| matches!(member, TypeRef::Schema(_)));
                union.extend(names);
                Ok(TypeSpec::Union(union))
            }
            _ => Ok(TypeSpec::Single(self.type_ref(value, keyword, this)?)),
        }
    }

    fn type_ref(&mut self, value: &Value, keyword: &'static str, this: Option<SchemaId>) -> Result<TypeRef> {
        match value {
            Value::String(name) => Ok(TypeRef::Named(name.parse()?)),
            Value::Object(_) => {
                let id = self.inflate(value)?;
                if this.map(|this| self.follow_aliases(id) == this).unwrap_or(false) {
                    return Err(SchemaError::SelfReferentialType);
                }
                Ok(TypeRef::Schema(id))
            }
            _ => Err(SchemaError::InvalidKeyword {
                keyword,
                expected: "a type name, a schema or a list of them",
            }),
        }
    }

    fn schema_list(&mut self, members: &[Value], keyword: &'static str) -> Result<Vec<SchemaId>> {
        if members.is_empty() {
            return Err(SchemaError::EmptySchemaList { keyword });
        }

        members.iter().map(|member| self.inflate(member)).collect()
    }

    fn additional(&mut self, value: &Value) -> Result<Additional> {
        match value {
            Value::Bool(allowed) => Ok(Additional::Allowed(*allowed)),
            _ => Ok(Additional::Constrained(self.inflate(value)?)),
        }
    }

    fn dependency(&mut self, value: &Value) -> Result<Dependency> {
        let invalid = SchemaError::InvalidKeyword {
            keyword: "dependencies",
            expected: "a property name, a list of names or a schema",
        };

        match value {
            Value::String(name) => Ok(Dependency::Name(name.clone())),
            Value::Array(names) => names
                .iter()
                .map(|name| name.as_str().map(str::to_owned).ok_or_else(|| invalid.clone()))
                .collect::<Result<Vec<String>>>()
                .map(Dependency::Names),
            Value::Object(_) => Ok(Dependency::Schema(self.inflate(value)?)),
            _ => Err(invalid),
        }
    }
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|err| SchemaError::InvalidPattern {
        pattern: pattern.to_owned(),
        message: err.to_string(),
    })
}

/// Parse `s` as a URL, leaving Windows drive letters to be treated as paths.
fn parse_url(s: &str) -> Option<Url> {
    Url::parse(s).ok().filter(|url| url.scheme().len() > 1)
}

/// Resolve `path` against `scope`.
///
/// URL scopes follow the usual relative reference rules. Any other scope is
/// taken as a file path, and relative paths are joined onto its directory.
fn join_uri(scope: &str, path: &str) -> String {
    if scope.is_empty() {
        return path.to_owned();
    }
    if path == "#" {
        return scope.to_owned();
    }

    if let Some(base) = parse_url(scope) {
        return match base.join(path) {
            Ok(mut url) => {
                if !url.cannot_be_a_base() && url.path().contains("//") {
                    let mut collapsed = url.path().to_owned();
                    while collapsed.contains("//") {
                        collapsed = collapsed.replace("//", "/");
                    }
                    url.set_path(&collapsed);
                }
                url.into()
            }
            Err(_) => path.to_owned(),
        };
    }

    if parse_url(path).is_some() || path.starts_with('/') {
        return path.to_owned();
    }

    let document = scope.split('#').next().unwrap_or(scope);
    if path.starts_with('#') {
        return format!("{}{}", document, path);
    }

    let directory = match document.rfind('/') {
        Some(index) => &document[..=index],
        None => "",
    };
    format!("{}{}", directory, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::MemoryLoader;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn joins_uris() {
        assert_eq!(join_uri("", "a.json#"), "a.json#");
        assert_eq!(join_uri("http://x.com/a/b.json", "#"), "http://x.com/a/b.json");
        assert_eq!(join_uri("http://x.com/a/b.json", "c.json"), "http://x.com/a/c.json");
        assert_eq!(
            join_uri("http://x.com/a/b.json", "#/definitions/c"),
            "http://x.com/a/b.json#/definitions/c"
        );
        assert_eq!(join_uri("http://x.com/a/", "folder//c.json"), "http://x.com/a/folder/c.json");
        assert_eq!(
            join_uri("urn:jsv:document:0", "#/definitions/a"),
            "urn:jsv:document:0#/definitions/a"
        );
        assert_eq!(join_uri("schemas/a.json", "b.json"), "schemas/b.json");
        assert_eq!(join_uri("schemas/a.json#/x", "#/y"), "schemas/a.json#/y");
        assert_eq!(join_uri("schemas/a.json", "/abs/b.json"), "/abs/b.json");
        assert_eq!(join_uri("a.json", "http://x.com/b"), "http://x.com/b");
    }

    #[test]
    fn builtin_type_names() {
        let mut builder = Builder::with_loader(MemoryLoader::new());
        let string = builder.build("string").unwrap();
        assert_eq!(builder.build("string").unwrap(), string);

        let registry = builder.registry();
        assert!(registry.validate(string, &json!("a")).is_valid());
        assert!(!registry.validate(string, &json!(1)).is_valid());
    }

    #[test]
    fn type_unions_put_schemas_first() {
        let mut builder = Builder::with_loader(MemoryLoader::new());
        let id = builder
            .inflate_value(&json!({"type": ["string", {"type": "integer"}, "null"]}))
            .unwrap();

        let registry = builder.registry();
        match registry[id].schema_type() {
            TypeSpec::Union(members) => {
                assert!(matches!(members[0], TypeRef::Schema(_)));
                assert_eq!(members[1], TypeRef::Named(Type::String));
                assert_eq!(members[2], TypeRef::Named(Type::Null));
            }
            other => panic!("expected a union, got {:?}", other),
        }
    }

    #[test]
    fn self_referential_type() {
        let mut builder = Builder::with_loader(MemoryLoader::new());
        assert_eq!(
            builder.inflate_value(&json!({"type": {"$ref": "#"}})).unwrap_err(),
            SchemaError::SelfReferentialType
        );
    }

    #[test]
    fn failed_builds_leave_nothing_behind() {
        let mut builder = Builder::with_loader(MemoryLoader::new());
        builder.inflate_value(&json!({"type": "string"})).unwrap();
        let len = builder.registry().len();

        let err = builder
            .inflate_value(&json!({
                "properties": {"a": {"type": "integer"}},
                "definitions": {"b": {"type": "string"}},
                "divisibleBy": 0
            }))
            .unwrap_err();

        assert_eq!(err, SchemaError::ZeroDivisor);
        assert_eq!(builder.registry().len(), len);
        assert_eq!(
            builder
                .registry()
                .lookup("urn:jsv:document:1#/definitions/b", builder.options()),
            None
        );
    }
}
