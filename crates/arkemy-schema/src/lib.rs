//! Arkemy Schema Registry
//!
//! Declarative description of the record variants in a unified dataset:
//! which fields each variant requires, which it may carry, and the type and
//! numeric bounds of every field. The definition is read from YAML so rules
//! change without recompiling.
//!
//! # Example
//!
//! ```rust
//! use arkemy_schema::SchemaRegistry;
//!
//! let registry = SchemaRegistry::builtin().unwrap();
//! assert_eq!(registry.discriminator(), "record_kind");
//!
//! let hours = registry.field("hours_used").unwrap();
//! let value = hours.coerce(Some("7,5")).unwrap();
//! assert_eq!(value.as_f64(), Some(7.5));
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod error;
pub mod field;
pub mod registry;

pub use error::{CoerceError, SchemaError, SchemaResult};
pub use field::{parse_date, BoundCheck, FieldSpec, FieldType, Value};
pub use registry::{
    RecordTypeSpec, SchemaDefinition, SchemaInfo, SchemaRegistry, SchemaSettings,
    ValidationSettings,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with the schema registry
    pub use crate::error::{CoerceError, SchemaError};
    pub use crate::field::{BoundCheck, FieldSpec, FieldType, Value};
    pub use crate::registry::SchemaRegistry;
}
