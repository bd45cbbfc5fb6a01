use crate::errors::{Result, SchemaError};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Number, Value};

/// A raw schema definition, as it appears in a schema document.
///
/// Keywords with exactly one legal shape are typed, so that a wrongly shaped
/// keyword is reported by deserialization. Keywords that accept several
/// shapes (a type name, a nested definition, a list of either, ...) are kept
/// as raw values and interpreted by the builder.
#[derive(Debug, PartialEq, Deserialize, Serialize, Default, Clone)]
pub struct SerdeSchema {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "$schema")]
    pub meta_schema: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "$ref")]
    pub rxf: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub extends: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "type")]
    pub typ: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub disallow: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "allOf")]
    pub all_of: Option<Vec<Value>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "anyOf")]
    pub any_of: Option<Vec<Value>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "oneOf")]
    pub one_of: Option<Vec<Value>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "definitions")]
    pub defs: Option<IndexMap<String, Value>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "properties")]
    pub props: Option<IndexMap<String, Value>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "patternProperties")]
    pub pattern_props: Option<IndexMap<String, Value>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "additionalProperties")]
    pub additional_props: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "additionalItems")]
    pub additional_items: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(alias = "readOnly")]
    pub readonly: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<IndexMap<String, Value>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "exclusiveMinimum")]
    pub exclusive_minimum: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "exclusiveMaximum")]
    pub exclusive_maximum: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "divisibleBy")]
    pub divisible_by: Option<Number>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "minLength")]
    pub min_length: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "maxLength")]
    pub max_length: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "minItems")]
    pub min_items: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "maxItems")]
    pub max_items: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "uniqueItems")]
    pub unique_items: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "enum")]
    pub enumeration: Option<Vec<Value>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default, deserialize_with = "present")]
    pub default: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default, deserialize_with = "present")]
    pub example: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "patternPropertyExamples")]
    pub pattern_property_examples: Option<Map<String, Value>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub expandable: Option<bool>,

    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

/// Keeps an explicit `null` as `Some(Value::Null)`, so it can be told apart
/// from an absent keyword.
fn present<'de, D>(deserializer: D) -> std::result::Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl SerdeSchema {
    /// Read a definition out of a JSON object, reporting the keyword path of
    /// any shape error.
    pub fn from_value(value: &Value) -> Result<SerdeSchema> {
        serde_path_to_error::deserialize(value).map_err(|err| SchemaError::InvalidDefinition {
            path: err.path().to_string(),
            message: err.inner().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn roundtrip_json() {
        let data = json!({
          "id": "http://example.com/foo",
          "$ref": "http://example.com/bar",
          "type": ["string", {"type": "integer"}],
          "definitions": {
            "a": {}
          },
          "properties": {
            "b": {},
            "a": {}
          },
          "required": ["a"],
          "readonly": true,
          "minimum": 4.0,
          "divisibleBy": 2,
          "enum": [1, "two", null],
          "default": null,
          "example": false,
          "extra": "foo"
        });

        let parsed = SerdeSchema::from_value(&data).expect("failed to parse json");
        assert_eq!(
            parsed,
            SerdeSchema {
                id: Some("http://example.com/foo".to_owned()),
                rxf: Some("http://example.com/bar".to_owned()),
                typ: Some(json!(["string", {"type": "integer"}])),
                defs: Some(vec![("a".to_owned(), json!({}))].into_iter().collect()),
                props: Some(
                    vec![("b".to_owned(), json!({})), ("a".to_owned(), json!({}))]
                        .into_iter()
                        .collect()
                ),
                required: Some(vec!["a".to_owned()]),
                readonly: Some(true),
                minimum: Some(4.0),
                divisible_by: Some(Number::from(2)),
                enumeration: Some(vec![json!(1), json!("two"), Value::Null]),
                default: Some(Value::Null),
                example: Some(json!(false)),
                extra: vec![("extra".to_owned(), json!("foo"))].into_iter().collect(),
                ..SerdeSchema::default()
            }
        );

        let round_trip = serde_json::to_value(&parsed).expect("failed to serialize json");
        assert_eq!(round_trip, data);
    }

    #[test]
    fn absent_default_is_not_null_default() {
        let parsed = SerdeSchema::from_value(&json!({"type": "string"})).unwrap();
        assert_eq!(parsed.default, None);
        assert_eq!(parsed.example, None);
    }

    #[test]
    fn shape_errors_carry_the_keyword_path() {
        match SerdeSchema::from_value(&json!({"minLength": "three"})) {
            Err(SchemaError::InvalidDefinition { path, .. }) => assert_eq!(path, "minLength"),
            other => panic!("unexpected result: {:?}", other),
        }

        assert!(SerdeSchema::from_value(&json!({"required": true})).is_err());
        assert!(SerdeSchema::from_value(&json!({"exclusiveMinimum": 1})).is_err());
    }
}
