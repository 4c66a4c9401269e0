#![doc(html_root_url = "https://docs.rs/forge-options/0.1.0")]
//! Reflective configuration engine for a key-value storage library's options.
//!
//! Turns textual option strings (`key=value;key={nested=value}`) into live, typed configuration
//! trees and back, the same job the storage library's own `Configurable`/`GetOptionsFromString`
//! family performs in its native implementation -- re-architected here around typed accessors and
//! trait-object erasure instead of raw memory offsets.
//!
//! ```
//! use forge_options::{ConfigurableObject, InvocationContext, OptionRecord};
//! use forge_options_derive::ConfigurableOptions;
//!
//! #[derive(Debug, Clone, Default, ConfigurableOptions)]
//! struct CacheOptions {
//!     #[option(help = "cache capacity in bytes")]
//!     capacity: forge_options::ByteSize,
//!     #[option(help = "number of shards")]
//!     shard_count: u32,
//! }
//!
//! let mut record = OptionRecord::new(CacheOptions::default());
//! let ctx = InvocationContext::top_level();
//! record
//!     .configure_from_string("capacity=64M;shard_count=8", &ctx)
//!     .unwrap();
//! assert_eq!(record.get().shard_count, 8);
//! ```

pub mod configurable;
pub mod context;
pub mod descriptor;
pub mod error;
pub mod group;
pub mod lexer;
pub mod registry;
pub mod value;

pub use configurable::{ConfigurableObject, Customizable, IdentifiedRecord, LifecycleState, OptionRecord, PolymorphicField, PolymorphicSlot};
pub use context::{HostEnv, InfoLog, InvocationContext, NullLog, SanityLevel};
pub use descriptor::{
    ByteSize, DescriptorFlags, EnumTable, FieldAccess, FieldDescriptor, NestedOps, PolymorphicOps, PrimitiveCodable, TypeTag,
    VectorOps, Verification,
};
pub use error::{ConfigError, ConfigErrorKind, ConfigResult};
pub use group::{
    compare_fields, configure_one, configure_pairs, prepare_fields, serialize_fields, validate_fields, DescribeFields,
    StructField, Validate, VectorField,
};
pub use registry::{ObjectRegistry, Pattern, RegistrationId};
pub use value::{PrefixTransform, PrimitiveValue};

pub use forge_options_derive::ConfigurableOptions;

#[cfg(doctest)]
doc_comment::doctest!("../README.md");
