//! In-memory schema representations.
//!
//! A [`Schema`](struct.Schema.html) is one node of a schema graph. Nodes
//! refer to each other through [`SchemaId`](struct.SchemaId.html) handles into
//! a [`Registry`](../registry/struct.Registry.html), so graphs may be cyclic: a
//! node may, directly or through others, refer back to itself.
//!
//! Nodes are only ever created by the [`Builder`](../builder/struct.Builder.html).
//! Once the builder hands a node out it is read-only.

use crate::errors::SchemaError;
use crate::format::Format;
use crate::validator::ValidationOptions;
use indexmap::IndexMap;
use regex::Regex;
use serde_json::{Map, Number, Value};
use std::fmt;
use std::str::FromStr;

/// An opaque handle to a node inside a [`Registry`](../registry/struct.Registry.html).
///
/// Two handles are equal exactly when they name the same node, which is how
/// shared (`$ref`-ed) nodes can be recognised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SchemaId(pub(crate) usize);

impl SchemaId {
    /// The arena index of this node.
    pub fn index(self) -> usize {
        self.0
    }
}

/// The primitive types recognised by `type` and `disallow`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Type {
    String,
    /// Any JSON number, integral or not.
    Number,
    /// Only numbers with an integer representation. `4.0` is not an integer.
    Integer,
    Boolean,
    Object,
    Array,
    Null,
    /// Matches every value.
    Any,
}

impl Type {
    /// The type name as written in a schema document.
    pub fn name(self) -> &'static str {
        match self {
            Type::String => "string",
            Type::Number => "number",
            Type::Integer => "integer",
            Type::Boolean => "boolean",
            Type::Object => "object",
            Type::Array => "array",
            Type::Null => "null",
            Type::Any => "any",
        }
    }

    /// Parse one of the eight bare type names.
    pub fn from_name(name: &str) -> Option<Type> {
        match name {
            "string" => Some(Type::String),
            "number" => Some(Type::Number),
            "integer" => Some(Type::Integer),
            "boolean" => Some(Type::Boolean),
            "object" => Some(Type::Object),
            "array" => Some(Type::Array),
            "null" => Some(Type::Null),
            "any" => Some(Type::Any),
            _ => None,
        }
    }

    /// Does the value's kind match this type?
    pub fn matches(self, value: &Value) -> bool {
        match self {
            Type::Any => true,
            Type::Null => value.is_null(),
            Type::String => value.is_string(),
            Type::Number => value.is_number(),
            Type::Integer => is_integer(value),
            Type::Boolean => value.is_boolean(),
            Type::Object => value.is_object(),
            Type::Array => value.is_array(),
        }
    }

    /// The concrete type of a value, as used in error messages.
    pub fn of(value: &Value) -> Type {
        match value {
            Value::Null => Type::Null,
            Value::Bool(_) => Type::Boolean,
            Value::Number(_) if is_integer(value) => Type::Integer,
            Value::Number(_) => Type::Number,
            Value::String(_) => Type::String,
            Value::Array(_) => Type::Array,
            Value::Object(_) => Type::Object,
        }
    }
}

impl FromStr for Type {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Type::from_name(s).ok_or_else(|| SchemaError::UnknownType { name: s.to_owned() })
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub(crate) fn is_integer(value: &Value) -> bool {
    value.is_i64() || value.is_u64()
}

/// One member of a `type` or `disallow` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeRef {
    /// A primitive type tag.
    Named(Type),
    /// A nested schema the value must satisfy.
    Schema(SchemaId),
}

/// The full value of a `type` or `disallow` keyword.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeSpec {
    Single(TypeRef),
    /// Matches if any member matches. Schema members come first.
    Union(Vec<TypeRef>),
}

impl Default for TypeSpec {
    fn default() -> Self {
        TypeSpec::Single(TypeRef::Named(Type::Any))
    }
}

impl TypeSpec {
    /// Is this the unconstrained `any` type?
    pub fn is_any(&self) -> bool {
        *self == TypeSpec::Single(TypeRef::Named(Type::Any))
    }

    /// The primitive tags named directly, ignoring schema members.
    pub fn named(&self) -> Vec<Type> {
        let members: &[TypeRef] = match self {
            TypeSpec::Single(member) => std::slice::from_ref(member),
            TypeSpec::Union(members) => members,
        };

        members
            .iter()
            .filter_map(|member| match member {
                TypeRef::Named(typ) => Some(*typ),
                TypeRef::Schema(_) => None,
            })
            .collect()
    }
}

/// The `items` keyword.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Items {
    Absent,
    /// Every element must satisfy the schema.
    Single(SchemaId),
    /// Element `i` must satisfy schema `i`.
    Tuple(Vec<SchemaId>),
}

impl Default for Items {
    fn default() -> Self {
        Items::Absent
    }
}

/// Policy for `additionalProperties` and `additionalItems`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Additional {
    Allowed(bool),
    Constrained(SchemaId),
}

impl Default for Additional {
    fn default() -> Self {
        Additional::Allowed(true)
    }
}

/// The value of one `dependencies` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dependency {
    /// A single sibling that must be present.
    Name(String),
    /// Siblings that must all be present.
    Names(Vec<String>),
    /// A schema the whole instance must satisfy.
    Schema(SchemaId),
}

/// A compiled `patternProperties` entry.
#[derive(Debug, Clone)]
pub struct PatternProperty {
    pub(crate) regex: Regex,
    pub(crate) schema: SchemaId,
}

impl PatternProperty {
    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }

    pub fn is_match(&self, name: &str) -> bool {
        self.regex.is_match(name)
    }

    pub fn schema(&self) -> SchemaId {
        self.schema
    }
}

/// One node of a schema graph.
///
/// Every keyword of the draft-03/04 vocabulary maps onto a field. Optional
/// keywords that accept `null` or `false` as meaningful values (`default` and
/// `example`) are stored as `Option<Value>`: `Some(Value::Null)` means "set to
/// null", `None` means "not set".
#[derive(Debug, Clone, Default)]
pub struct Schema {
    pub(crate) id: Option<String>,
    pub(crate) title: Option<String>,
    pub(crate) description: Option<String>,
    pub(crate) typ: TypeSpec,
    pub(crate) all_of: Vec<SchemaId>,
    pub(crate) any_of: Vec<SchemaId>,
    pub(crate) one_of: Vec<SchemaId>,
    pub(crate) properties: IndexMap<String, SchemaId>,
    pub(crate) pattern_properties: Vec<PatternProperty>,
    pub(crate) additional_properties: Additional,
    pub(crate) items: Items,
    pub(crate) additional_items: Additional,
    pub(crate) required: Vec<String>,
    pub(crate) read_only: bool,
    pub(crate) dependencies: IndexMap<String, Dependency>,
    pub(crate) minimum: Option<f64>,
    pub(crate) maximum: Option<f64>,
    pub(crate) exclusive_minimum: bool,
    pub(crate) exclusive_maximum: bool,
    pub(crate) divisible_by: Option<Number>,
    pub(crate) min_length: Option<u64>,
    pub(crate) max_length: Option<u64>,
    pub(crate) pattern: Option<Regex>,
    pub(crate) min_items: Option<u64>,
    pub(crate) max_items: Option<u64>,
    pub(crate) unique_items: bool,
    pub(crate) enumeration: Option<Vec<Value>>,
    pub(crate) format: Option<Format>,
    pub(crate) disallow: Option<TypeSpec>,
    pub(crate) default: Option<Value>,
    pub(crate) example: Option<Value>,
    pub(crate) pattern_property_examples: Option<Map<String, Value>>,
    pub(crate) expandable: Option<bool>,
    pub(crate) options: ValidationOptions,
}

impl Schema {
    /// The absolute URI this schema was identified by, if any.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// The `type` keyword. Absent `type` is reported as `any`.
    pub fn schema_type(&self) -> &TypeSpec {
        &self.typ
    }

    pub fn disallow(&self) -> Option<&TypeSpec> {
        self.disallow.as_ref()
    }

    pub fn all_of(&self) -> &[SchemaId] {
        &self.all_of
    }

    pub fn any_of(&self) -> &[SchemaId] {
        &self.any_of
    }

    pub fn one_of(&self) -> &[SchemaId] {
        &self.one_of
    }

    /// Declared properties, in declaration order.
    pub fn properties(&self) -> &IndexMap<String, SchemaId> {
        &self.properties
    }

    /// Pattern properties, in declaration order. The first match wins.
    pub fn pattern_properties(&self) -> &[PatternProperty] {
        &self.pattern_properties
    }

    pub fn additional_properties(&self) -> Additional {
        self.additional_properties
    }

    pub fn items(&self) -> &Items {
        &self.items
    }

    pub fn additional_items(&self) -> Additional {
        self.additional_items
    }

    /// Names of the properties an object instance must have.
    pub fn required(&self) -> &[String] {
        &self.required
    }

    pub fn is_required(&self, name: &str) -> bool {
        self.required.iter().any(|required| required == name)
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn dependencies(&self) -> &IndexMap<String, Dependency> {
        &self.dependencies
    }

    pub fn enumeration(&self) -> Option<&[Value]> {
        self.enumeration.as_deref()
    }

    pub fn format(&self) -> Option<Format> {
        self.format
    }

    /// The default value. `Some(&Value::Null)` is a real, null default.
    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    /// The explicit example, if one was given.
    pub fn example(&self) -> Option<&Value> {
        self.example.as_ref()
    }

    /// The options this node was built with.
    pub fn options(&self) -> &ValidationOptions {
        &self.options
    }

    /// The name used for this schema in union and combinator messages.
    pub(crate) fn display_name(&self) -> String {
        match (&self.id, &self.title) {
            (Some(id), _) => id.clone(),
            (None, Some(title)) => format!("{{{}}}", title),
            (None, None) => "$ref".to_owned(),
        }
    }

    /// The schema of the explicitly declared property `name`.
    pub(crate) fn property(&self, name: &str) -> Option<SchemaId> {
        self.properties.get(name).copied()
    }

    /// The schema governing property `name` of an object instance:
    /// declared property, else first matching pattern, else the additional
    /// property schema.
    pub(crate) fn schema_for_member(&self, name: &str) -> Option<SchemaId> {
        if let Some(id) = self.property(name) {
            return Some(id);
        }

        if let Some(pattern) = self.pattern_properties.iter().find(|p| p.is_match(name)) {
            return Some(pattern.schema);
        }

        match self.additional_properties {
            Additional::Constrained(id) => Some(id),
            Additional::Allowed(_) => None,
        }
    }

    /// The schema governing element `index` of an array instance.
    pub(crate) fn schema_for_item(&self, index: usize) -> Option<SchemaId> {
        match &self.items {
            Items::Absent => None,
            Items::Single(id) => Some(*id),
            Items::Tuple(ids) => match ids.get(index) {
                Some(id) => Some(*id),
                None => match self.additional_items {
                    Additional::Constrained(id) => Some(id),
                    Additional::Allowed(_) => None,
                },
            },
        }
    }

    /// Is `null` one of the enumerated values?
    pub(crate) fn enum_permits_null(&self) -> bool {
        self.enumeration
            .as_ref()
            .map(|values| values.iter().any(Value::is_null))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn integer_and_number_representations() {
        assert!(Type::Integer.matches(&json!(4)));
        assert!(Type::Integer.matches(&json!(-4)));
        assert!(!Type::Integer.matches(&json!(4.0)));
        assert!(!Type::Integer.matches(&json!("4")));
        assert!(Type::Number.matches(&json!(4)));
        assert!(Type::Number.matches(&json!(4.5)));
        assert_eq!(Type::of(&json!(4.0)), Type::Number);
        assert_eq!(Type::of(&json!(4)), Type::Integer);
    }

    #[test]
    fn type_names_round_trip() {
        for name in &[
            "string", "number", "integer", "boolean", "object", "array", "null", "any",
        ] {
            assert_eq!(name.parse::<Type>().unwrap().name(), *name);
        }
        assert!("float".parse::<Type>().is_err());
    }

    #[test]
    fn display_names() {
        let mut schema = Schema::default();
        assert_eq!(schema.display_name(), "$ref");
        schema.title = Some("Widget".to_owned());
        assert_eq!(schema.display_name(), "{Widget}");
        schema.id = Some("http://example.com/widget".to_owned());
        assert_eq!(schema.display_name(), "http://example.com/widget");
    }

    #[test]
    fn member_schema_lookup_order() {
        let mut schema = Schema::default();
        schema.properties.insert("a".to_owned(), SchemaId(1));
        schema.pattern_properties.push(PatternProperty {
            regex: Regex::new("^a").unwrap(),
            schema: SchemaId(2),
        });
        schema.pattern_properties.push(PatternProperty {
            regex: Regex::new("b$").unwrap(),
            schema: SchemaId(3),
        });
        schema.additional_properties = Additional::Constrained(SchemaId(4));

        assert_eq!(schema.schema_for_member("a"), Some(SchemaId(1)));
        assert_eq!(schema.schema_for_member("ab"), Some(SchemaId(2)));
        assert_eq!(schema.schema_for_member("cb"), Some(SchemaId(3)));
        assert_eq!(schema.schema_for_member("z"), Some(SchemaId(4)));
    }
}
