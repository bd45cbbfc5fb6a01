//! `jsv` validates JSON data against [JSON Schema][json-schema] draft-03/04
//! schemas, and generates example data that satisfies them.
//!
//! Working with this crate happens in two phases. First, a
//! [`Builder`](builder/struct.Builder.html) resolves a schema, along with
//! everything it refers to through `$ref` and `extends`, into the nodes of a
//! [`Registry`](registry/struct.Registry.html). Then the registry is used,
//! read-only, to validate instances or to generate examples.
//!
//! # Validating data
//!
//! ```
//! use jsv::{Builder, ExampleMode};
//! use serde_json::json;
//! use failure::Error;
//!
//! fn main() -> Result<(), Error> {
//!     let mut builder = Builder::new();
//!     let person = builder.inflate_value(&json!({
//!         "type": "object",
//!         "properties": {
//!             "name": { "type": "string" },
//!             "age": { "type": "integer", "minimum": 0 },
//!             "phones": {
//!                 "type": "array",
//!                 "items": { "type": "string" }
//!             }
//!         },
//!         "required": ["name"]
//!     }))?;
//!
//!     let registry = builder.into_registry();
//!
//!     let input_ok = json!({
//!         "name": "John Doe",
//!         "age": 43,
//!         "phones": ["+44 1234567", "+44 2345678"]
//!     });
//!     assert!(registry.validate(person, &input_ok).is_valid());
//!
//!     // Each ValidationError holds the path to the bad part of the input.
//!     let input_bad = json!({
//!         "name": "John Doe",
//!         "phones": ["+44 1234567", 442345678]
//!     });
//!     let result = registry.validate(person, &input_bad);
//!     assert!(!result.is_valid());
//!     assert_eq!(result.errors().len(), 1);
//!     assert_eq!(result.errors()[0].path(), "#/phones/1");
//!
//!     // Any schema can produce an example of data it accepts.
//!     let example = registry.exemplify(person, ExampleMode::Maximal);
//!     assert!(registry.validate(person, &example).is_valid());
//!
//!     Ok(())
//! }
//! ```
//!
//! # Resolving schemas
//!
//! Schemas are fetched through a [`SchemaLoader`](loader/trait.SchemaLoader.html).
//! [`Builder::new`](builder/struct.Builder.html#method.new) reads local files;
//! [`MemoryLoader`](loader/struct.MemoryLoader.html) and
//! [`AutoLoader`](loader/struct.AutoLoader.html) cover in-memory documents and
//! URIs mapped onto a directory. Relative references are resolved against the
//! nearest enclosing `id`, or against the locator of the document they appear
//! in.
//!
//! Problems with a schema are reported as a
//! [`SchemaError`](errors/enum.SchemaError.html) when it is built. Problems
//! with an instance never are: they are part of the
//! [`ValidationResult`](validator/struct.ValidationResult.html).
//!
//! [json-schema]: http://json-schema.org

mod vm;

pub mod builder;
pub mod errors;
pub mod exemplify;
pub mod format;
pub mod loader;
pub mod registry;
pub mod schema;
pub mod serde;
pub mod validator;

pub use crate::builder::Builder;
pub use crate::errors::SchemaError;
pub use crate::exemplify::{ExampleMode, Exemplifier};
pub use crate::format::Format;
pub use crate::loader::{AutoLoader, Fetcher, FileLoader, MemoryLoader, SchemaLoader};
pub use crate::registry::Registry;
pub use crate::schema::{Additional, Dependency, Items, Schema, SchemaId, Type, TypeRef, TypeSpec};
pub use crate::serde::SerdeSchema;
pub use crate::validator::{ValidationError, ValidationOptions, ValidationResult, Validator};
