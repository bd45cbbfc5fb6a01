use jsv::{AutoLoader, Builder, FileLoader, MemoryLoader, SchemaError, ValidationOptions};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::fs;
use url::Url;

fn memory(documents: &[(&str, Value)]) -> MemoryLoader {
    let mut loader = MemoryLoader::new();
    for (locator, document) in documents {
        loader.insert(*locator, document.to_string());
    }
    loader
}

fn paths(errors: &[jsv::ValidationError]) -> Vec<String> {
    errors.iter().map(|err| err.path()).collect()
}

#[test]
fn resolves_ids() {
    let loader = memory(&[
        (
            "http://example.com/schemas/root.json",
            json!({
                "id": "http://example.com/schemas/root.json",
                "properties": {
                    "other": {"$ref": "other.json"},
                    "nested": {
                        "id": "sub/",
                        "properties": {"x": {"$ref": "leaf.json"}}
                    }
                }
            }),
        ),
        ("http://example.com/schemas/other.json", json!({"type": "integer"})),
        ("http://example.com/schemas/sub/leaf.json", json!({"type": "string"})),
    ]);

    let mut builder = Builder::with_loader(loader);
    let root = builder.build("http://example.com/schemas/root.json").unwrap();
    let registry = builder.registry();

    assert!(registry
        .validate(root, &json!({"other": 1, "nested": {"x": "a"}}))
        .is_valid());

    let result = registry.validate(root, &json!({"nested": {"x": 1}}));
    assert_eq!(paths(result.errors()), vec!["#/nested/x"]);
}

#[test]
fn same_uri_same_node() {
    let loader = memory(&[
        (
            "http://example.com/root.json",
            json!({"properties": {"other": {"$ref": "other.json"}}}),
        ),
        ("http://example.com/other.json", json!({"type": "integer"})),
    ]);

    let mut builder = Builder::with_loader(loader);
    let root = builder.build("http://example.com/root.json").unwrap();
    assert_eq!(builder.build("http://example.com/root.json").unwrap(), root);
    assert_eq!(builder.build("http://example.com/root.json#").unwrap(), root);

    let other = builder.build("http://example.com/other.json").unwrap();
    assert_eq!(builder.registry()[root].properties()["other"], other);
    assert_eq!(
        builder
            .registry()
            .lookup("http://example.com/other.json", &ValidationOptions::default()),
        Some(other)
    );

    builder.set_options(ValidationOptions::lenient());
    let lenient = builder.build("http://example.com/root.json").unwrap();
    assert_ne!(lenient, root);
    assert!(builder.registry()[lenient].options().allows_missing_read_only());
}

#[test]
fn recursive_schema_reports_the_failing_level() {
    let mut builder = Builder::with_loader(MemoryLoader::new());
    let schema = builder
        .inflate_value(&json!({
            "properties": {
                "a": {"type": "string"},
                "b": {"$ref": "#"}
            },
            "additionalProperties": {"$ref": "#"},
            "required": ["a"]
        }))
        .unwrap();
    let registry = builder.registry();

    let nested = json!({"a": "x", "b": {"a": "y", "b": {"a": "z"}}});
    assert!(registry.validate(schema, &nested).is_valid());

    let result = registry.validate(schema, &json!({"a": "x", "b": {"a": 1}}));
    assert!(!result.is_valid());
    assert_eq!(paths(result.errors()), vec!["#/b/a"]);

    let result = registry.validate(schema, &json!({"a": "x", "c": {"a": "y", "c": {}}}));
    assert_eq!(paths(result.errors()), vec!["#/c/c"]);
    assert_eq!(
        result.errors()[0].message(),
        "Property 'a' is required and is not present."
    );
}

#[test]
fn cycles_between_documents() {
    let loader = memory(&[
        (
            "http://example.com/a.json",
            json!({"properties": {"b": {"$ref": "b.json"}}}),
        ),
        (
            "http://example.com/b.json",
            json!({"type": "object", "properties": {"a": {"$ref": "a.json"}}}),
        ),
    ]);

    let mut builder = Builder::with_loader(loader);
    let a = builder.build("http://example.com/a.json").unwrap();
    let b = builder.build("http://example.com/b.json").unwrap();
    let registry = builder.registry();

    assert_eq!(registry[a].properties()["b"], b);
    assert_eq!(registry[b].properties()["a"], a);

    assert!(registry.validate(a, &json!({"b": {"a": {"b": {}}}})).is_valid());
    let result = registry.validate(a, &json!({"b": {"a": {"b": 5}}}));
    assert_eq!(paths(result.errors()), vec!["#/b/a/b"]);
}

#[test]
fn extends_layers_over_its_base() {
    let loader = memory(&[
        (
            "http://example.com/base.json",
            json!({
                "type": "object",
                "properties": {"name": {"type": "string"}},
                "required": ["name"]
            }),
        ),
        (
            "http://example.com/closed.json",
            json!({"extends": {"$ref": "base.json"}, "additionalProperties": false}),
        ),
    ]);

    let mut builder = Builder::with_loader(loader);
    let closed = builder.build("http://example.com/closed.json").unwrap();
    let base = builder.build("http://example.com/base.json").unwrap();
    let registry = builder.registry();

    assert!(registry.validate(closed, &json!({"name": "x"})).is_valid());
    assert!(!registry.validate(closed, &json!({})).is_valid());
    assert!(!registry.validate(closed, &json!({"name": 1})).is_valid());
    assert!(!registry
        .validate(closed, &json!({"name": "x", "extra": 1}))
        .is_valid());

    assert!(registry
        .validate(base, &json!({"name": "x", "extra": 1}))
        .is_valid());
}

fn item_loader() -> MemoryLoader {
    memory(&[(
        "http://example.com/item.json",
        json!({
            "properties": {
                "id": {"type": "integer", "readonly": true},
                "name": {"type": "string"}
            },
            "required": ["id", "name"]
        }),
    )])
}

#[test]
fn missing_read_only_properties() {
    let mut builder = Builder::with_loader(item_loader());
    let strict = builder.build("http://example.com/item.json").unwrap();

    let mut options = ValidationOptions::new();
    options.allow_missing_read_only_properties(true);
    builder.set_options(options);
    let still_strict = builder.build("http://example.com/item.json").unwrap();

    builder.set_options(ValidationOptions::lenient());
    let lenient = builder.build("http://example.com/item.json").unwrap();

    let registry = builder.registry();
    let draft = json!({"name": "x"});
    assert!(!registry.validate(strict, &draft).is_valid());
    assert!(!registry.validate(still_strict, &draft).is_valid());
    assert!(registry.validate(lenient, &draft).is_valid());
    assert!(!registry.validate(lenient, &json!({"id": 1})).is_valid());
}

#[test]
fn references_override_required_and_readonly() {
    let mut builder = Builder::with_loader(MemoryLoader::new());
    builder.set_options(ValidationOptions::lenient());
    let schema = builder
        .inflate_value(&json!({
            "definitions": {
                "ident": {"type": "integer"},
                "pair": {"properties": {"x": {}, "y": {}}}
            },
            "properties": {
                "id": {"$ref": "#/definitions/ident", "readonly": true},
                "count": {"$ref": "#/definitions/ident"},
                "pair": {"$ref": "#/definitions/pair", "required": ["x"]}
            },
            "required": ["id", "count"]
        }))
        .unwrap();
    let registry = builder.registry();

    assert!(registry.validate(schema, &json!({"count": 1})).is_valid());
    assert!(!registry.validate(schema, &json!({"id": 1})).is_valid());
    assert!(!registry
        .validate(schema, &json!({"count": 1, "pair": {"y": 1}}))
        .is_valid());

    let pair = registry.lookup("urn:jsv:document:0#/definitions/pair", builder.options());
    let pair = pair.unwrap();
    assert!(registry[pair].required().is_empty());
    assert!(!registry[registry[schema].properties()["count"]].is_read_only());
}

#[test]
fn build_with_overrides() {
    let mut builder = Builder::with_loader(memory(&[(
        "http://example.com/thing.json",
        json!({"properties": {"a": {}, "b": {}}}),
    )]));

    let plain = builder.build("http://example.com/thing.json").unwrap();
    let required = builder
        .build_with("http://example.com/thing.json", &["a"], false)
        .unwrap();
    assert_ne!(plain, required);
    assert_eq!(
        builder.build_with("http://example.com/thing.json", &[], false).unwrap(),
        plain
    );

    let registry = builder.registry();
    assert!(registry.validate(plain, &json!({})).is_valid());
    assert!(!registry.validate(required, &json!({})).is_valid());
    assert!(registry[plain].required().is_empty());
}

#[test]
fn writes_defaults_when_asked() {
    let definition = json!({
        "properties": {
            "count": {"type": "integer", "default": 0},
            "tags": {"type": "array", "default": []},
            "nested": {"properties": {"flag": {"default": false}}}
        },
        "required": ["count"]
    });

    let mut builder = Builder::with_loader(MemoryLoader::new());
    let plain = builder.inflate_value(&definition).unwrap();

    let mut options = ValidationOptions::new();
    options.set_defaults_when_validating(true);
    builder.set_options(options);
    let defaulting = builder.inflate_value(&definition).unwrap();
    let registry = builder.registry();

    let mut instance = json!({"nested": {}});
    assert!(!registry.validate_mut(plain, &mut instance).is_valid());
    assert_eq!(instance, json!({"nested": {}}));

    assert!(registry.validate_mut(defaulting, &mut instance).is_valid());
    let expected = json!({"nested": {"flag": false}, "count": 0, "tags": []});
    assert_eq!(instance, expected);

    assert!(registry.validate_mut(defaulting, &mut instance).is_valid());
    assert_eq!(instance, expected);

    let mut present = json!({"count": 5, "nested": {"flag": true}});
    assert!(registry.validate_mut(defaulting, &mut present).is_valid());
    assert_eq!(present["count"], json!(5));
    assert_eq!(present["nested"]["flag"], json!(true));
}

#[test]
fn configuration_errors() {
    let mut builder = Builder::with_loader(MemoryLoader::new());
    let mut build = |definition: Value| builder.inflate_value(&definition).unwrap_err();

    assert_eq!(
        build(json!({"type": "strnig"})),
        SchemaError::UnknownType {
            name: "strnig".to_owned()
        }
    );
    assert_eq!(
        build(json!({"anyOf": []})),
        SchemaError::EmptySchemaList { keyword: "anyOf" }
    );
    assert_eq!(build(json!({"divisibleBy": 0})), SchemaError::ZeroDivisor);
    assert_eq!(
        build(json!({"format": "colour"})),
        SchemaError::UnknownFormat {
            format: "colour".to_owned()
        }
    );
    assert_eq!(
        build(json!({"type": {"$ref": "#"}})),
        SchemaError::SelfReferentialType
    );

    match build(json!({"patternProperties": {"(": {}}})) {
        SchemaError::InvalidPattern { pattern, .. } => assert_eq!(pattern, "("),
        other => panic!("unexpected error: {:?}", other),
    }
    match build(json!({"properties": {"a": {"minLength": "3"}}})) {
        SchemaError::InvalidDefinition { path, .. } => assert_eq!(path, "minLength"),
        other => panic!("unexpected error: {:?}", other),
    }
    match build(json!({"required": true})) {
        SchemaError::InvalidDefinition { path, .. } => assert_eq!(path, "required"),
        other => panic!("unexpected error: {:?}", other),
    }
    match build(json!({"extends": [{}]})) {
        SchemaError::InvalidKeyword { keyword, .. } => assert_eq!(keyword, "extends"),
        other => panic!("unexpected error: {:?}", other),
    }
    match build(json!({"dependencies": {"a": 5}})) {
        SchemaError::InvalidKeyword { keyword, .. } => assert_eq!(keyword, "dependencies"),
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(matches!(
        build(json!({"properties": {"a": 5}})),
        SchemaError::NotAnObject { .. }
    ));
}

#[test]
fn resolution_errors() {
    let mut loader = memory(&[
        ("http://example.com/list.json", json!([1, 2])),
        (
            "http://example.com/broken-ref.json",
            json!({"items": {"$ref": "missing.json"}}),
        ),
    ]);
    loader.insert("http://example.com/bad.json", "{not json");

    let mut builder = Builder::with_loader(loader);

    match builder.build("http://example.com/broken-ref.json").unwrap_err() {
        SchemaError::NotFound {
            locator,
            resolved,
            scope,
        } => {
            assert_eq!(locator, "missing.json");
            assert_eq!(resolved, "http://example.com/missing.json");
            assert_eq!(scope, "http://example.com/broken-ref.json");
        }
        other => panic!("unexpected error: {:?}", other),
    }

    assert!(matches!(
        builder.build("http://example.com/bad.json").unwrap_err(),
        SchemaError::Parse { .. }
    ));
    assert!(matches!(
        builder.build("http://example.com/list.json").unwrap_err(),
        SchemaError::NotAnObject { .. }
    ));
    assert!(matches!(
        builder
            .build("http://example.com/broken-ref.json#/definitions/nope")
            .unwrap_err(),
        SchemaError::NotFound { .. }
    ));
}

#[test]
fn failed_builds_are_rolled_back() {
    let loader = memory(&[
        ("http://example.com/good.json", json!({"type": "string"})),
        (
            "http://example.com/bad.json",
            json!({
                "properties": {
                    "good": {"$ref": "good.json"},
                    "bad": {"type": "strnig"}
                }
            }),
        ),
    ]);

    let mut builder = Builder::with_loader(loader);
    assert!(builder.build("http://example.com/bad.json").is_err());
    assert!(builder.registry().is_empty());
    assert_eq!(
        builder
            .registry()
            .lookup("http://example.com/good.json", builder.options()),
        None
    );

    let good = builder.build("http://example.com/good.json").unwrap();
    assert!(builder.registry().validate(good, &json!("x")).is_valid());
}

#[test]
fn failed_builds_forget_nested_ids() {
    let loader = memory(&[
        ("http://example.com/inner.json", json!({"type": "integer"})),
        (
            "http://example.com/bad.json",
            json!({
                "properties": {
                    "inner": {"id": "http://example.com/inner.json", "type": "string"},
                    "bad": {"type": "strnig"}
                }
            }),
        ),
    ]);

    let mut builder = Builder::with_loader(loader);
    assert!(builder.build("http://example.com/bad.json").is_err());

    let inner = builder.build("http://example.com/inner.json").unwrap();
    assert!(builder.registry().validate(inner, &json!(1)).is_valid());
    assert!(!builder.registry().validate(inner, &json!("x")).is_valid());
}

#[test]
fn resolves_relative_file_references() {
    let root = tempfile::tempdir().unwrap();
    fs::create_dir_all(root.path().join("defs")).unwrap();
    fs::write(
        root.path().join("root.json"),
        json!({"items": {"$ref": "defs/item.json"}}).to_string(),
    )
    .unwrap();
    fs::write(
        root.path().join("defs/item.json"),
        json!({"type": "integer", "maximum": 10}).to_string(),
    )
    .unwrap();

    let path = root.path().join("root.json");

    let mut builder = Builder::new();
    let by_path = builder.build(path.to_str().unwrap()).unwrap();
    let url = Url::from_file_path(&path).unwrap();
    let by_url = builder.build(url.as_str()).unwrap();
    let registry = builder.into_registry();

    for schema in [by_path, by_url].iter() {
        assert!(registry.validate(*schema, &json!([1, 2])).is_valid());
        assert!(!registry.validate(*schema, &json!([1, 20])).is_valid());
    }

    let mut builder = Builder::with_loader(FileLoader);
    match builder.build("/no/such/schema.json").unwrap_err() {
        SchemaError::NotFound { resolved, .. } => assert_eq!(resolved, "/no/such/schema.json"),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn auto_loader_maps_and_fetches() {
    let root = tempfile::tempdir().unwrap();
    fs::write(
        root.path().join("person.json"),
        json!({
            "properties": {
                "address": {"$ref": "address"},
                "avatar": {"$ref": "http://cdn.example.org/image.json"}
            }
        })
        .to_string(),
    )
    .unwrap();
    fs::write(
        root.path().join("address.json"),
        json!({"type": "string"}).to_string(),
    )
    .unwrap();

    let loader = AutoLoader::new("http://example.com/schemas/", root.path())
        .unwrap()
        .with_fetcher(|uri: &Url| -> Result<String, failure::Error> {
            assert_eq!(uri.as_str(), "http://cdn.example.org/image.json");
            Ok(json!({"type": "object"}).to_string())
        });

    let mut builder = Builder::with_loader(loader);
    let person = builder.build("http://example.com/schemas/person").unwrap();
    let registry = builder.registry();

    assert!(registry
        .validate(person, &json!({"address": "Main St", "avatar": {}}))
        .is_valid());
    assert!(!registry.validate(person, &json!({"avatar": "x"})).is_valid());

    let mut offline = Builder::with_loader(
        AutoLoader::new("http://example.com/schemas/", root.path()).unwrap(),
    );
    match offline.build("http://example.com/schemas/person").unwrap_err() {
        SchemaError::Load { locator, .. } => {
            assert_eq!(locator, "http://cdn.example.org/image.json")
        }
        other => panic!("unexpected error: {:?}", other),
    }
}
