//! An error type for schema construction and resolution.
//!
//! Only programmer/schema-author mistakes and unresolvable references end up
//! here. Problems with the data being validated are never Rust errors; they
//! are reported through [`ValidationResult`](../validator/struct.ValidationResult.html).

use failure::Fail;

/// Convenience alias used throughout the builder.
pub type Result<T> = std::result::Result<T, SchemaError>;

/// An enum of possible errors that can emerge while building a schema.
#[derive(Debug, Fail, PartialEq, Clone, Eq)]
pub enum SchemaError {
    /// No definition could be found for a locator.
    ///
    /// Raised when the loader reports the locator as absent, or when a JSON
    /// pointer fragment does not point at anything in its document.
    #[fail(
        display = "could not find schema at {} (resolved URI: {}, resolution scope: {})",
        locator, resolved, scope
    )]
    NotFound {
        locator: String,
        resolved: String,
        scope: String,
    },

    /// The loader itself failed.
    #[fail(display = "failed to load schema {}: {}", locator, message)]
    Load { locator: String, message: String },

    /// The loaded text is not JSON.
    #[fail(display = "schema {} is not valid JSON: {}", locator, message)]
    Parse { locator: String, message: String },

    /// A schema definition was found, but it is not a JSON object.
    #[fail(display = "schema definition at {} must be an object", locator)]
    NotAnObject { locator: String },

    /// A keyword had the wrong shape, as reported by deserialization.
    ///
    /// `path` is the dotted keyword path inside the offending definition.
    #[fail(display = "invalid schema definition at '{}': {}", path, message)]
    InvalidDefinition { path: String, message: String },

    /// A keyword had a value of the wrong shape.
    #[fail(display = "'{}' must be {}", keyword, expected)]
    InvalidKeyword {
        keyword: &'static str,
        expected: &'static str,
    },

    /// A `type` or `disallow` named something other than the eight types.
    #[fail(display = "the type \"{}\" is not recognised", name)]
    UnknownType { name: String },

    /// `format` named something outside of the fixed format table.
    #[fail(display = "{} is not a valid format", format)]
    UnknownFormat { format: String },

    /// `pattern` or a `patternProperties` key failed to compile.
    #[fail(display = "cannot compile pattern \"{}\": {}", pattern, message)]
    InvalidPattern { pattern: String, message: String },

    /// `allOf`, `anyOf` or `oneOf` was given an empty array.
    #[fail(display = "'{}' must have at least one element", keyword)]
    EmptySchemaList { keyword: &'static str },

    /// `divisibleBy` was zero.
    #[fail(display = "divisibleBy should not be 0")]
    ZeroDivisor,

    /// A schema used itself as its own `type`.
    #[fail(display = "reference type cannot be a link to self")]
    SelfReferentialType,
}
