//! Validate input data against schemas.
//!
//! This module contains logic related to *validation*, the process of taking a
//! piece of input data (called an "instance") and checking if it's valid
//! according to a schema.
//!
//! See the docs for [`Validator`](struct.Validator.html) for more.

use crate::registry::Registry;
use crate::schema::SchemaId;
use crate::vm;
use json_pointer::JsonPointer;
use serde_json::Value;
use url::form_urlencoded;

/// Validates instances against the schemas of one registry.
#[derive(Debug, Clone, Copy)]
pub struct Validator<'a> {
    registry: &'a Registry,
}

impl<'a> Validator<'a> {
    pub fn new(registry: &'a Registry) -> Self {
        Self { registry }
    }

    /// Validate an instance against a schema.
    ///
    /// Despite having "Error" in their name, the entries of the result are
    /// not Rust errors. A list of validation errors is the _successful_
    /// result of running `validate`. Neither the schema nor the instance is
    /// modified.
    pub fn validate(&self, schema: SchemaId, instance: &Value) -> ValidationResult {
        vm::validate(self.registry, schema, instance)
    }

    /// Validate an instance, first writing in the defaults of absent
    /// properties wherever the governing schema was built with
    /// [`set_defaults_when_validating`](struct.ValidationOptions.html#method.set_defaults_when_validating).
    ///
    /// Values already present are never overwritten, so validating the same
    /// instance again gives the same result.
    pub fn validate_mut(&self, schema: SchemaId, instance: &mut Value) -> ValidationResult {
        vm::apply_defaults(self.registry, schema, instance);
        vm::validate(self.registry, schema, instance)
    }
}

/// Options baked into every schema node when it is built.
///
/// `strict_mode` takes precedence over `allow_missing_read_only_properties`:
/// when both are set, missing read-only properties are still reported.
#[derive(Debug, Eq, PartialEq, Clone, Hash)]
pub struct ValidationOptions {
    strict_mode: bool,
    allow_missing_read_only_properties: bool,
    set_defaults_when_validating: bool,
}

impl ValidationOptions {
    /// Create a new, default `ValidationOptions` (strict mode only).
    pub fn new() -> Self {
        Self::default()
    }

    /// Options that tolerate missing read-only properties.
    pub fn lenient() -> Self {
        Self {
            strict_mode: false,
            allow_missing_read_only_properties: true,
            set_defaults_when_validating: false,
        }
    }

    /// Sets whether to use strict mode. Strict mode is on by default.
    pub fn strict_mode(&mut self, strict_mode: bool) -> &mut Self {
        self.strict_mode = strict_mode;
        self
    }

    /// Sets whether a required property may be missing when its schema is
    /// marked `readonly`. Ignored in strict mode.
    ///
    /// This supports submitting an object for creation without the fields a
    /// server fills in itself.
    pub fn allow_missing_read_only_properties(&mut self, allow: bool) -> &mut Self {
        self.allow_missing_read_only_properties = allow;
        self
    }

    /// Sets whether [`Validator::validate_mut`](struct.Validator.html#method.validate_mut)
    /// writes defaults into the instance.
    pub fn set_defaults_when_validating(&mut self, set_defaults: bool) -> &mut Self {
        self.set_defaults_when_validating = set_defaults;
        self
    }

    pub fn is_strict_mode(&self) -> bool {
        self.strict_mode
    }

    /// Whether missing read-only properties are tolerated, after applying
    /// the strict mode precedence rule.
    pub fn allows_missing_read_only(&self) -> bool {
        self.allow_missing_read_only_properties && !self.strict_mode
    }

    pub fn sets_defaults(&self) -> bool {
        self.set_defaults_when_validating
    }
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            strict_mode: true,
            allow_missing_read_only_properties: false,
            set_defaults_when_validating: false,
        }
    }
}

/// The outcome of validating one instance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationResult {
    valid: bool,
    errors: Vec<ValidationError>,
}

impl ValidationResult {
    pub(crate) fn new(valid: bool, errors: Vec<ValidationError>) -> Self {
        Self { valid, errors }
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// The problems found, in the order they were found.
    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<ValidationError> {
        self.errors
    }
}

/// Contains a single problem with an instance when evaluated against a schema.
///
/// Note that, despite its name, `ValidationError` is not an error in the usual
/// Rust sense. It is an ordinary struct, which happens to contain information
/// about why some data was unsatisfactory against a given schema.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationError {
    instance_tokens: Vec<String>,
    message: String,
}

impl ValidationError {
    pub fn new(instance_tokens: Vec<String>, message: String) -> ValidationError {
        ValidationError {
            instance_tokens,
            message,
        }
    }

    /// The location of the rejected value, as `#` for the root or `#/a/0/b`
    /// below it. Each token is form-urlencoded.
    pub fn path(&self) -> String {
        let mut path = String::from("#");
        for token in &self.instance_tokens {
            path.push('/');
            path.extend(form_urlencoded::byte_serialize(token.as_bytes()));
        }
        path
    }

    /// A pointer into the part of the instance (input) which was rejected.
    pub fn instance_path(&self) -> JsonPointer<String, Vec<String>> {
        JsonPointer::new(self.instance_tokens.clone())
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}
