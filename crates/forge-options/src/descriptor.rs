//! Type metadata: the closed type-tag set, descriptor flags, verification kinds, and the typed
//! field accessors that replace the source library's raw record offsets.
//!
//! Every [`FieldDescriptor`] pairs a name with a [`FieldAccess`] variant that already knows how to
//! reach into `&R`/`&mut R` for its field — there is no `offsetof`-style pointer arithmetic
//! anywhere in this crate. Primitive fields carry plain function pointers (they're generated,
//! capture-free code from the derive macro, so `fn` is enough; no closure allocation needed).
//! Composite and polymorphic fields carry a boxed trait object because the element/child type
//! varies per field and needs to be erased to let `FieldDescriptor<R>` stay a single concrete type
//! for a given `R`.

use std::fmt;

use crate::{
    context::InvocationContext,
    error::{ConfigError, ConfigResult},
    value::PrimitiveValue,
};

/// Closed set of semantic types a descriptor can describe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum TypeTag {
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    Size,
    Double,
    Str,
    /// A string value whose contents must never be logged or displayed.
    Secret,
    /// A fixed string-to-value enum, generated by the derive macro for `#[option(enum)]` fields.
    /// Carries the Rust type name purely for diagnostics; the string table itself lives in the
    /// field's [`FieldAccess::Primitive`] codec.
    Enum(&'static str),
    /// A nested record addressable as `name` (whole struct) or `name.field` (sub-path).
    Struct(&'static str),
    /// An ordered sequence with an element-level codec.
    Vector(&'static str),
    /// An owned child object, not independently identified by a registry id.
    Configurable(&'static str),
    /// An owned child object constructed and re-constructed by registry id.
    Customizable(&'static str),
    /// Legacy string-encoded pointer type (fixed/capped prefix transforms and the like).
    PrefixTransform,
}

impl fmt::Display for TypeTag {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool => formatter.write_str("bool"),
            Self::I8 => formatter.write_str("i8"),
            Self::I16 => formatter.write_str("i16"),
            Self::I32 => formatter.write_str("i32"),
            Self::I64 => formatter.write_str("i64"),
            Self::U8 => formatter.write_str("u8"),
            Self::U16 => formatter.write_str("u16"),
            Self::U32 => formatter.write_str("u32"),
            Self::U64 => formatter.write_str("u64"),
            Self::Size => formatter.write_str("size"),
            Self::Double => formatter.write_str("double"),
            Self::Str => formatter.write_str("string"),
            Self::Secret => formatter.write_str("secret"),
            Self::Enum(name)
            | Self::Struct(name)
            | Self::Vector(name)
            | Self::Configurable(name)
            | Self::Customizable(name) => formatter.write_str(name),
            Self::PrefixTransform => formatter.write_str("prefix-transform"),
        }
    }
}

/// How a descriptor's value is verified / deserialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verification {
    #[default]
    Normal,
    ByName,
    ByNameAllowNull,
    ByNameAllowFromNull,
    Deprecated,
    Alias,
}

/// Set of one or more descriptor flags, stored as a `u16` bitset.
///
/// Mirrors the closed-bitset-with-named-constants pattern used for basic type sets elsewhere in
/// the reflective-config ecosystem this crate is drawn from: a thin newtype over an integer with
/// `const` single-bit values and `or`/`contains` combinators, rather than a full `bitflags!`
/// dependency the rest of the stack doesn't otherwise need.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DescriptorFlags(u16);

impl DescriptorFlags {
    pub const NONE: Self = Self(0);
    pub const MUTABLE: Self = Self(1 << 0);
    pub const POINTER: Self = Self(1 << 1);
    pub const SHARED: Self = Self(1 << 2);
    pub const UNIQUE: Self = Self(1 << 3);
    pub const ALLOW_NULL: Self = Self(1 << 4);
    pub const STRING_NONE: Self = Self(1 << 5);
    pub const STRING_SHALLOW: Self = Self(1 << 6);
    pub const DONT_PREPARE: Self = Self(1 << 7);
    pub const COMPARE_NEVER: Self = Self(1 << 8);
    pub const COMPARE_LOOSE: Self = Self(1 << 9);
    pub const COMPARE_EXACT: Self = Self(1 << 10);

    #[must_use]
    pub const fn or(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }

    pub const fn contains(self, needle: Self) -> bool {
        self.0 & needle.0 == needle.0
    }

    /// Checks the mutual-exclusivity invariant for ownership flags: at most one of
    /// `SHARED`/`UNIQUE`/`POINTER` may be set.
    pub const fn ownership_is_valid(self) -> bool {
        let set = [Self::SHARED, Self::UNIQUE, Self::POINTER];
        let mut count = 0;
        let mut i = 0;
        while i < set.len() {
            if self.contains(set[i]) {
                count += 1;
            }
            i += 1;
        }
        count <= 1
    }
}

impl fmt::Display for DescriptorFlags {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMED: &[(DescriptorFlags, &str)] = &[
            (DescriptorFlags::MUTABLE, "mutable"),
            (DescriptorFlags::POINTER, "pointer"),
            (DescriptorFlags::SHARED, "shared"),
            (DescriptorFlags::UNIQUE, "unique"),
            (DescriptorFlags::ALLOW_NULL, "allow-null"),
            (DescriptorFlags::STRING_NONE, "string-none"),
            (DescriptorFlags::STRING_SHALLOW, "string-shallow"),
            (DescriptorFlags::DONT_PREPARE, "dont-prepare"),
            (DescriptorFlags::COMPARE_NEVER, "compare-never"),
            (DescriptorFlags::COMPARE_LOOSE, "compare-loose"),
            (DescriptorFlags::COMPARE_EXACT, "compare-exact"),
        ];
        let mut first = true;
        for &(flag, name) in NAMED {
            if self.contains(flag) {
                if !first {
                    formatter.write_str(" | ")?;
                }
                formatter.write_str(name)?;
                first = false;
            }
        }
        if first {
            formatter.write_str("none")?;
        }
        Ok(())
    }
}

/// Primitive-value parse/serialize/approx-equal for a concrete Rust leaf type.
///
/// Implemented for every type a `#[derive(ConfigurableOptions)]` primitive field can resolve to;
/// the derive macro picks the impl via the field's Rust type and wires it into a
/// [`FieldAccess::Primitive`] accessor.
pub trait PrimitiveCodable: Sized + Clone + PartialEq + Send + Sync + 'static {
    fn tag() -> TypeTag;
    fn to_primitive(&self) -> PrimitiveValue;
    fn from_primitive(value: PrimitiveValue) -> ConfigResult<Self>;
    fn parse(token: &str) -> ConfigResult<Self>;
    fn serialize(&self) -> String;
    fn approx_eq(&self, other: &Self) -> bool {
        self == other
    }
}

macro_rules! impl_primitive_codable {
    ($ty:ty, $tag:expr, $variant:ident, $parse_fn:path) => {
        impl PrimitiveCodable for $ty {
            fn tag() -> TypeTag {
                $tag
            }

            fn to_primitive(&self) -> PrimitiveValue {
                PrimitiveValue::$variant(*self)
            }

            fn from_primitive(value: PrimitiveValue) -> ConfigResult<Self> {
                match value {
                    PrimitiveValue::$variant(v) => Ok(v),
                    other => Err(ConfigError::invalid_argument(format!(
                        "expected {}, got {other}",
                        stringify!($ty)
                    ))),
                }
            }

            fn parse(token: &str) -> ConfigResult<Self> {
                $parse_fn(token)
            }

            fn serialize(&self) -> String {
                PrimitiveValue::$variant(*self).to_string()
            }
        }
    };
}

impl_primitive_codable!(bool, TypeTag::Bool, Bool, crate::value::parse_bool);
impl_primitive_codable!(i8, TypeTag::I8, I8, crate::value::parse_i8);
impl_primitive_codable!(i16, TypeTag::I16, I16, crate::value::parse_i16);
impl_primitive_codable!(i32, TypeTag::I32, I32, crate::value::parse_i32);
impl_primitive_codable!(i64, TypeTag::I64, I64, crate::value::parse_i64);
impl_primitive_codable!(u8, TypeTag::U8, U8, crate::value::parse_u8);
impl_primitive_codable!(u16, TypeTag::U16, U16, crate::value::parse_u16);
impl_primitive_codable!(u32, TypeTag::U32, U32, crate::value::parse_u32);
impl_primitive_codable!(u64, TypeTag::U64, U64, crate::value::parse_u64);

/// A size/count in bytes. Distinct from `u64` only in its [`TypeTag`]; kept as a newtype (rather
/// than an attribute-driven reinterpretation of a bare `u64`) so descriptor tables can tell the
/// two apart without consulting field attributes at runtime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct ByteSize(pub u64);

impl PrimitiveCodable for ByteSize {
    fn tag() -> TypeTag {
        TypeTag::Size
    }

    fn to_primitive(&self) -> PrimitiveValue {
        PrimitiveValue::Size(self.0)
    }

    fn from_primitive(value: PrimitiveValue) -> ConfigResult<Self> {
        match value {
            PrimitiveValue::Size(v) => Ok(Self(v)),
            other => Err(ConfigError::invalid_argument(format!("expected size, got {other}"))),
        }
    }

    fn parse(token: &str) -> ConfigResult<Self> {
        crate::value::parse_u64(token).map(Self)
    }

    fn serialize(&self) -> String {
        PrimitiveValue::Size(self.0).to_string()
    }
}

impl PrimitiveCodable for f64 {
    fn tag() -> TypeTag {
        TypeTag::Double
    }

    fn to_primitive(&self) -> PrimitiveValue {
        PrimitiveValue::Double(*self)
    }

    fn from_primitive(value: PrimitiveValue) -> ConfigResult<Self> {
        match value {
            PrimitiveValue::Double(v) => Ok(v),
            other => Err(ConfigError::invalid_argument(format!("expected double, got {other}"))),
        }
    }

    fn parse(token: &str) -> ConfigResult<Self> {
        crate::value::parse_double(token)
    }

    fn serialize(&self) -> String {
        crate::value::serialize_double(*self)
    }

    fn approx_eq(&self, other: &Self) -> bool {
        (self - other).abs() <= crate::value::DOUBLE_EPSILON
    }
}

impl PrimitiveCodable for String {
    fn tag() -> TypeTag {
        TypeTag::Str
    }

    fn to_primitive(&self) -> PrimitiveValue {
        PrimitiveValue::Str(self.clone())
    }

    fn from_primitive(value: PrimitiveValue) -> ConfigResult<Self> {
        match value {
            PrimitiveValue::Str(v) => Ok(v),
            other => Err(ConfigError::invalid_argument(format!("expected string, got {other}"))),
        }
    }

    fn parse(token: &str) -> ConfigResult<Self> {
        Ok(token.to_owned())
    }

    fn serialize(&self) -> String {
        crate::value::escape_string(self)
    }
}

// `SecretString` deliberately does not implement `PrimitiveCodable`: `secrecy` withholds
// `PartialEq` from its secret types on purpose (to avoid accidental timing side-channels and
// `assert_eq!`-driven leaks), and `PrimitiveCodable` requires it. Secret fields are wired up by
// the derive macro directly against `PrimitiveValue::Secret` instead, bypassing the
// `PrimitiveCodable` indirection; see `crate::value::parse_secret`.

/// A field-local enum codec backing [`TypeTag::Enum`]: a fixed string &lt;-&gt; value table.
#[derive(Debug, Clone, Copy)]
pub struct EnumTable<T: 'static> {
    pub entries: &'static [(&'static str, T)],
}

impl<T: Copy + PartialEq + 'static> EnumTable<T> {
    pub fn parse(&self, token: &str) -> ConfigResult<T> {
        self.entries
            .iter()
            .find(|(name, _)| *name == token)
            .map(|(_, value)| *value)
            .ok_or_else(|| ConfigError::invalid_argument(format!("'{token}' is not a recognized value")))
    }

    pub fn serialize(&self, value: T) -> ConfigResult<&'static str> {
        self.entries
            .iter()
            .find(|(_, candidate)| *candidate == value)
            .map(|(name, _)| *name)
            .ok_or_else(|| ConfigError::invalid_argument("value has no registered name"))
    }
}

/// Object-safe erasure for nested-struct field access, letting [`FieldDescriptor<R>`] stay a
/// single concrete type regardless of the substruct type `S`.
pub trait NestedOps<R>: Send + Sync {
    fn configure_pairs(
        &self,
        record: &mut R,
        pairs: &[(String, String)],
        ctx: &InvocationContext,
    ) -> ConfigResult<Vec<String>>;
    fn configure_one(&self, record: &mut R, path: &str, value: &str, ctx: &InvocationContext) -> ConfigResult<()>;
    fn serialize(&self, record: &R, ctx: &InvocationContext) -> String;
    fn matches(&self, a: &R, b: &R, ctx: &InvocationContext) -> Result<(), String>;
    /// Recurses `Prepare` into any `Configurable`/`Customizable` descendants of this nested field.
    fn prepare(&self, record: &mut R, ctx: &InvocationContext) -> ConfigResult<()>;
    /// Recurses `Validate` into any `Configurable`/`Customizable` descendants of this nested field.
    fn validate(&self, record: &R, ctx: &InvocationContext) -> ConfigResult<()>;
}

/// Object-safe erasure for vector field access.
pub trait VectorOps<R>: Send + Sync {
    fn parse_and_set(&self, record: &mut R, text: &str, ctx: &InvocationContext) -> ConfigResult<()>;
    fn serialize(&self, record: &R, ctx: &InvocationContext) -> String;
    fn matches(&self, a: &R, b: &R) -> bool;
}

/// Object-safe erasure for a polymorphic (registry-constructed `Customizable`) child slot.
pub trait PolymorphicOps<R>: Send + Sync {
    fn configure(&self, record: &mut R, text: &str, ctx: &InvocationContext) -> ConfigResult<()>;
    /// `shallow`: when set, return only the child's identifier (per `StringShallow`); otherwise
    /// return its full `id=...;opt=...` option string for the caller to wrap in `{}`.
    fn serialize(&self, record: &R, ctx: &InvocationContext, shallow: bool) -> String;
    fn matches(&self, a: &R, b: &R, ctx: &InvocationContext) -> Result<(), String>;
    fn prepare(&self, record: &mut R, ctx: &InvocationContext) -> ConfigResult<()>;
    fn validate(&self, record: &R, ctx: &InvocationContext) -> ConfigResult<()>;
}

/// The typed accessor a [`FieldDescriptor`] carries in place of a raw record offset.
pub enum FieldAccess<R> {
    Primitive {
        get: fn(&R) -> PrimitiveValue,
        set: fn(&mut R, PrimitiveValue) -> ConfigResult<()>,
    },
    Struct(Box<dyn NestedOps<R>>),
    Vector(Box<dyn VectorOps<R>>),
    Polymorphic(Box<dyn PolymorphicOps<R>>),
    /// Fully overrides the tag's ordinary codec: the three closures from spec §3's Descriptor
    /// invariant are either all present (this variant) or all absent.
    Custom {
        parse: fn(&mut R, &str, &InvocationContext) -> ConfigResult<()>,
        serialize: fn(&R, &InvocationContext) -> String,
        equals: fn(&R, &R, &InvocationContext) -> bool,
    },
}

/// Immutable per-field metadata: name, aliases, help text, type tag, verification kind, flags,
/// and the typed accessor that replaces the source engine's record offset.
pub struct FieldDescriptor<R> {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub help: &'static str,
    pub tag: TypeTag,
    pub verification: Verification,
    pub flags: DescriptorFlags,
    pub access: FieldAccess<R>,
}

impl<R> fmt::Debug for FieldDescriptor<R> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("FieldDescriptor")
            .field("name", &self.name)
            .field("tag", &self.tag)
            .field("verification", &self.verification)
            .field("flags", &self.flags)
            .finish_non_exhaustive()
    }
}

impl<R> FieldDescriptor<R> {
    pub fn matches_name(&self, candidate: &str) -> bool {
        self.name == candidate || self.aliases.contains(&candidate)
    }

    pub fn is_deprecated(&self) -> bool {
        self.verification == Verification::Deprecated
    }

    pub fn is_alias(&self) -> bool {
        self.verification == Verification::Alias
    }

    /// Whether this descriptor participates in serialization/equality at all (deprecated and
    /// alias descriptors never do, per spec invariant).
    pub fn is_visible(&self) -> bool {
        !self.is_deprecated() && !self.is_alias() && !self.flags.contains(DescriptorFlags::STRING_NONE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_flags_combine_and_check_containment() {
        let flags = DescriptorFlags::MUTABLE.or(DescriptorFlags::COMPARE_LOOSE);
        assert!(flags.contains(DescriptorFlags::MUTABLE));
        assert!(flags.contains(DescriptorFlags::COMPARE_LOOSE));
        assert!(!flags.contains(DescriptorFlags::COMPARE_EXACT));
    }

    #[test]
    fn ownership_flags_are_mutually_exclusive() {
        assert!(DescriptorFlags::SHARED.ownership_is_valid());
        assert!(!DescriptorFlags::SHARED.or(DescriptorFlags::UNIQUE).ownership_is_valid());
    }

    #[test]
    fn display_lists_named_flags() {
        let flags = DescriptorFlags::MUTABLE.or(DescriptorFlags::ALLOW_NULL);
        let rendered = flags.to_string();
        assert!(rendered.contains("mutable"));
        assert!(rendered.contains("allow-null"));
    }

    #[test]
    fn primitive_codable_round_trips_through_primitive_value() {
        let value = 42i32;
        let primitive = value.to_primitive();
        assert_eq!(i32::from_primitive(primitive).unwrap(), value);
    }

    #[test]
    fn enum_table_parses_and_serializes() {
        #[derive(Debug, Clone, Copy, PartialEq)]
        enum Style {
            Level,
            Universal,
        }
        const TABLE: EnumTable<Style> = EnumTable {
            entries: &[("level", Style::Level), ("universal", Style::Universal)],
        };
        assert_eq!(TABLE.parse("universal").unwrap(), Style::Universal);
        assert_eq!(TABLE.serialize(Style::Level).unwrap(), "level");
        assert!(TABLE.parse("bogus").is_err());
    }

    #[test]
    fn deprecated_and_alias_descriptors_are_not_visible() {
        let deprecated = FieldDescriptor::<()> {
            name: "old",
            aliases: &[],
            help: "",
            tag: TypeTag::Bool,
            verification: Verification::Deprecated,
            flags: DescriptorFlags::NONE,
            access: FieldAccess::Primitive {
                get: |_| PrimitiveValue::Bool(false),
                set: |_, _| Ok(()),
            },
        };
        assert!(!deprecated.is_visible());
    }
}
