//! Generic descriptor-table algorithms: `ParseOption`/`SerializeOption`/`MatchesOption` from the
//! component design, implemented once against [`DescribeFields`] rather than once per generated
//! type.

use crate::{
    context::{InvocationContext, SanityLevel},
    descriptor::{DescriptorFlags, FieldAccess, FieldDescriptor, NestedOps, PrimitiveCodable, VectorOps, Verification},
    error::{ConfigError, ConfigResult},
    lexer,
};

/// A type with a static table of [`FieldDescriptor`]s describing its own fields.
///
/// Implemented by every `#[derive(ConfigurableOptions)]` struct; the table is produced once by
/// the derive macro and returned by reference, mirroring the `'static` metadata tables the
/// reflective-config ecosystem this crate is drawn from returns from its own describe traits.
pub trait DescribeFields: Sized + 'static {
    fn fields() -> &'static [FieldDescriptor<Self>];

    /// Cross-field invariants checked during `Validate`, beyond the per-descriptor checks implied
    /// by each field's own codec. Empty by default; the derive macro wires in whatever
    /// `#[option(validate = ...)]` attributes a struct declares.
    fn validations() -> &'static [&'static dyn Validate<Self>] {
        &[]
    }

    /// Finds the descriptor that owns `name`, resolving aliases and dotted sub-paths into nested
    /// `Struct`/`Configurable` fields (dotted paths into `Vector`/primitive fields are not
    /// resolvable this way and fall through to a plain field lookup).
    fn find(name: &str) -> Option<(&'static FieldDescriptor<Self>, Option<&str>)> {
        if let Some(direct) = Self::fields().iter().find(|d| d.matches_name(name)) {
            return Some((direct, None));
        }
        let (head, rest) = name.split_once('.')?;
        let parent = Self::fields().iter().find(|d| d.matches_name(head))?;
        matches!(parent.access, FieldAccess::Struct(_) | FieldAccess::Polymorphic(_))
            .then_some((parent, Some(rest)))
    }
}

/// A cross-field invariant checked during `Validate`, generalizing the validation hooks the
/// reflective-config ecosystem this crate is drawn from attaches to its own config metadata.
pub trait Validate<R>: Send + Sync {
    fn validate(&self, record: &R, ctx: &InvocationContext) -> ConfigResult<()>;
}

/// Recurses `Prepare` into every `Configurable`/`Customizable` descriptor reachable from `record`,
/// whether a direct field or nested inside a `Struct` field, skipping subtrees flagged
/// `DONT_PREPARE`. Idempotent: re-running after a prior success simply re-visits already-prepared
/// children, matching the component design's "may be called any number of times" contract.
pub fn prepare_fields<R: DescribeFields>(record: &mut R, ctx: &InvocationContext) -> ConfigResult<()> {
    for descriptor in R::fields() {
        if descriptor.flags.contains(DescriptorFlags::DONT_PREPARE) {
            continue;
        }
        match &descriptor.access {
            FieldAccess::Polymorphic(ops) => ops.prepare(record, ctx)?,
            FieldAccess::Struct(ops) => ops.prepare(record, ctx)?,
            _ => {}
        }
    }
    Ok(())
}

/// Recurses `Validate` into every `Configurable`/`Customizable` descriptor reachable from
/// `record`, then checks `R::validations()`. Read-only, as required by the component design.
pub fn validate_fields<R: DescribeFields>(record: &R, ctx: &InvocationContext) -> ConfigResult<()> {
    for descriptor in R::fields() {
        match &descriptor.access {
            FieldAccess::Polymorphic(ops) => ops.validate(record, ctx)?,
            FieldAccess::Struct(ops) => ops.validate(record, ctx)?,
            _ => {}
        }
    }
    for validation in R::validations() {
        validation.validate(record, ctx)?;
    }
    Ok(())
}

/// Applies every `(name, value)` pair to `record`'s descriptor table.
///
/// Unknown keys are either collected into the returned `Vec` (when `ctx.ignore_unknown_options()`)
/// or cause an immediate `InvalidArgument` failure, matching the fail-fast-unless-routed contract
/// from the component design. `PrepareOptions` is invoked afterward when
/// `ctx.invoke_prepare_options()` is set and the full pass succeeded -- callers that need the
/// `Configurable`-level ordering (apply then prepare) do that at the `ConfigurableObject` layer;
/// this function only implements the per-group apply loop.
pub fn configure_pairs<R: DescribeFields>(
    record: &mut R,
    pairs: &[(String, String)],
    ctx: &InvocationContext,
) -> ConfigResult<Vec<String>> {
    let mut unused = Vec::new();
    for (name, value) in pairs {
        if R::find(name).is_none() {
            if ctx.ignore_unknown_options() {
                unused.push(name.clone());
            } else {
                return Err(ConfigError::invalid_argument(format!("unknown option '{name}'")).with_option(name.clone()));
            }
            continue;
        }
        configure_one(record, name, value, ctx).map_err(|err| err.with_option(name.clone()))?;
    }
    Ok(unused)
}

/// Applies a single `(name, value)` pair, implementing the `ParseOption` algorithm from the
/// component design.
pub fn configure_one<R: DescribeFields>(
    record: &mut R,
    name: &str,
    value: &str,
    ctx: &InvocationContext,
) -> ConfigResult<()> {
    let Some((descriptor, rest)) = R::find(name) else {
        return Err(ConfigError::invalid_argument(format!("unknown option '{name}'")));
    };

    if descriptor.verification == Verification::Deprecated {
        return Ok(());
    }

    if matches!(
        descriptor.verification,
        Verification::ByName | Verification::ByNameAllowNull | Verification::ByNameAllowFromNull
    ) {
        return Err(ConfigError::not_supported("deserializing by-name is not supported"));
    }

    let unescaped;
    let value = if ctx.input_strings_escaped() && rest.is_none() {
        unescaped = crate::value::unescape_string(value)?;
        unescaped.as_str()
    } else {
        value
    };

    let inner_ctx = if descriptor.flags.contains(DescriptorFlags::DONT_PREPARE) {
        ctx.clone().with_invoke_prepare_options(false)
    } else {
        ctx.clone()
    };

    match &descriptor.access {
        FieldAccess::Custom { parse, .. } => parse(record, value, &inner_ctx),
        FieldAccess::Primitive { set, .. } if rest.is_none() => {
            let primitive = parse_primitive(descriptor, value)?;
            set(record, primitive)
        }
        FieldAccess::Primitive { .. } => Err(ConfigError::not_found(format!(
            "'{name}' does not address a nested field"
        ))),
        FieldAccess::Struct(ops) => match rest {
            Some(path) => ops.configure_one(record, path, value, &inner_ctx),
            None => {
                let embedded = inner_ctx.embedded();
                let pairs = lexer::string_to_map(value, embedded.delimiter())?;
                let unused = ops.configure_pairs(record, &pairs, &embedded)?;
                if !unused.is_empty() && !embedded.ignore_unknown_options() {
                    return Err(ConfigError::invalid_argument(format!(
                        "unknown nested field(s): {}",
                        unused.join(", ")
                    )));
                }
                Ok(())
            }
        },
        FieldAccess::Vector(ops) => ops.parse_and_set(record, value, &inner_ctx),
        FieldAccess::Polymorphic(ops) => match rest {
            Some(path) => {
                let text = format!("{path}={value}");
                ops.configure(record, &text, &inner_ctx)
            }
            None => {
                if value.is_empty() {
                    return Ok(());
                }
                if value.contains('=') {
                    let embedded = inner_ctx.clone().with_ignore_unknown_options(false).embedded();
                    ops.configure(record, value, &embedded)
                } else {
                    ops.configure(record, value, &inner_ctx)
                }
            }
        },
    }
}

fn parse_primitive<R>(
    descriptor: &FieldDescriptor<R>,
    value: &str,
) -> ConfigResult<crate::value::PrimitiveValue> {
    use crate::{descriptor::TypeTag, value::PrimitiveValue};
    match descriptor.tag {
        TypeTag::Bool => crate::value::parse_bool(value).map(PrimitiveValue::Bool),
        TypeTag::I8 => crate::value::parse_i8(value).map(PrimitiveValue::I8),
        TypeTag::I16 => crate::value::parse_i16(value).map(PrimitiveValue::I16),
        TypeTag::I32 => crate::value::parse_i32(value).map(PrimitiveValue::I32),
        TypeTag::I64 => crate::value::parse_i64(value).map(PrimitiveValue::I64),
        TypeTag::U8 => crate::value::parse_u8(value).map(PrimitiveValue::U8),
        TypeTag::U16 => crate::value::parse_u16(value).map(PrimitiveValue::U16),
        TypeTag::U32 => crate::value::parse_u32(value).map(PrimitiveValue::U32),
        TypeTag::U64 => crate::value::parse_u64(value).map(PrimitiveValue::U64),
        TypeTag::Size => crate::value::parse_u64(value).map(PrimitiveValue::Size),
        TypeTag::Double => crate::value::parse_double(value).map(PrimitiveValue::Double),
        TypeTag::Str => Ok(PrimitiveValue::Str(value.to_owned())),
        TypeTag::Secret => crate::value::parse_secret(value).map(PrimitiveValue::Secret),
        // The descriptor's `Primitive::set` accessor does the actual enum-table lookup; this layer
        // only forwards the raw token.
        TypeTag::Enum(_) => Ok(PrimitiveValue::Str(value.to_owned())),
        TypeTag::PrefixTransform => {
            crate::value::PrefixTransform::parse(value).map(PrimitiveValue::PrefixTransform)
        }
        other => Err(ConfigError::invalid_argument(format!(
            "'{other}' has no primitive codec"
        ))),
    }
}

/// Serializes every visible descriptor, joined with `ctx.delimiter()`, implementing
/// `GetOptionString`/`SerializeOption`.
pub fn serialize_fields<R: DescribeFields>(record: &R, ctx: &InvocationContext) -> String {
    let mut parts = Vec::new();
    for descriptor in R::fields() {
        if !descriptor.is_visible() {
            continue;
        }
        let rendered = match &descriptor.access {
            FieldAccess::Custom { serialize, .. } => serialize(record, ctx),
            FieldAccess::Primitive { get, .. } => get(record).to_string(),
            FieldAccess::Struct(ops) => {
                let embedded = ctx.embedded();
                format!("{{{}}}", ops.serialize(record, &embedded))
            }
            FieldAccess::Vector(ops) => ops.serialize(record, ctx),
            FieldAccess::Polymorphic(ops) => {
                let shallow = descriptor.flags.contains(DescriptorFlags::STRING_SHALLOW);
                let embedded = ctx.embedded();
                let rendered = ops.serialize(record, &embedded, shallow);
                if shallow {
                    rendered
                } else {
                    format!("{{{rendered}}}")
                }
            }
        };
        parts.push(format!("{}={rendered}", descriptor.name));
    }
    parts.join(&ctx.delimiter().to_string())
}

/// Structural equality over a descriptor table, implementing `MatchesOption`. Returns `Err` with
/// the dotted path of the first mismatching option.
pub fn compare_fields<R: DescribeFields>(
    a: &R,
    b: &R,
    ctx: &InvocationContext,
) -> Result<(), String> {
    for descriptor in R::fields() {
        if !descriptor.is_visible() || descriptor.flags.contains(DescriptorFlags::COMPARE_NEVER) {
            continue;
        }
        // A `CompareLoose` field is only held to its value unless the caller asked for an exact
        // match; at any looser sanity level it's accepted unconditionally. `CompareExact` and
        // unflagged fields are always checked, regardless of the context's sanity level.
        if descriptor.flags.contains(DescriptorFlags::COMPARE_LOOSE) && ctx.sanity_level() != SanityLevel::ExactMatch {
            continue;
        }
        let exact = descriptor.flags.contains(DescriptorFlags::COMPARE_EXACT);

        match &descriptor.access {
            FieldAccess::Custom { equals, .. } => {
                if !equals(a, b, ctx) {
                    return Err(descriptor.name.to_owned());
                }
            }
            FieldAccess::Primitive { get, .. } => {
                let equal = if exact { get(a) == get(b) } else { get(a).approx_eq(&get(b)) };
                if !equal {
                    return Err(descriptor.name.to_owned());
                }
            }
            FieldAccess::Struct(ops) => {
                ops.matches(a, b, &ctx.embedded())
                    .map_err(|path| format!("{}.{path}", descriptor.name))?;
            }
            FieldAccess::Vector(ops) => {
                if !ops.matches(a, b) {
                    return Err(descriptor.name.to_owned());
                }
            }
            FieldAccess::Polymorphic(ops) => {
                ops.matches(a, b, &ctx.embedded())
                    .map_err(|path| format!("{}.{path}", descriptor.name))?;
            }
        }
    }
    Ok(())
}

/// [`NestedOps`] implementation for a nested `S: DescribeFields` field reached through a pair of
/// accessor function pointers. Generated by the derive macro for every `#[option(struct)]` field.
pub struct StructField<R, S> {
    pub get: fn(&R) -> &S,
    pub get_mut: fn(&mut R) -> &mut S,
}

impl<R, S: DescribeFields> NestedOps<R> for StructField<R, S> {
    fn configure_pairs(
        &self,
        record: &mut R,
        pairs: &[(String, String)],
        ctx: &InvocationContext,
    ) -> ConfigResult<Vec<String>> {
        configure_pairs((self.get_mut)(record), pairs, ctx)
    }

    fn configure_one(&self, record: &mut R, path: &str, value: &str, ctx: &InvocationContext) -> ConfigResult<()> {
        configure_one((self.get_mut)(record), path, value, ctx)
    }

    fn serialize(&self, record: &R, ctx: &InvocationContext) -> String {
        serialize_fields((self.get)(record), ctx)
    }

    fn matches(&self, a: &R, b: &R, ctx: &InvocationContext) -> Result<(), String> {
        compare_fields((self.get)(a), (self.get)(b), ctx)
    }

    fn prepare(&self, record: &mut R, ctx: &InvocationContext) -> ConfigResult<()> {
        prepare_fields((self.get_mut)(record), ctx)
    }

    fn validate(&self, record: &R, ctx: &InvocationContext) -> ConfigResult<()> {
        validate_fields((self.get)(record), ctx)
    }
}

/// [`VectorOps`] implementation for a `Vec<E>` field of primitive elements, reached through a pair
/// of accessor function pointers. Generated by the derive macro for every `#[option(vector)]`
/// field.
pub struct VectorField<R, E> {
    pub get: fn(&R) -> &Vec<E>,
    pub get_mut: fn(&mut R) -> &mut Vec<E>,
    pub separator: char,
}

impl<R, E: PrimitiveCodable> VectorOps<R> for VectorField<R, E> {
    fn parse_and_set(&self, record: &mut R, text: &str, _ctx: &InvocationContext) -> ConfigResult<()> {
        let trimmed = text.trim();
        let mut elements = Vec::new();
        if !trimmed.is_empty() {
            let mut pos = 0usize;
            let mut trailing_empty = false;
            loop {
                match lexer::next_token(trimmed, self.separator, pos)? {
                    lexer::Token::Exhausted => break,
                    lexer::Token::Value { text, end } => {
                        elements.push(E::parse(text)?);
                        let consumed_trailing_sep = end == trimmed.len()
                            && end > 0
                            && self.separator.is_ascii()
                            && trimmed.as_bytes()[end - 1] == self.separator as u8;
                        pos = end;
                        if consumed_trailing_sep {
                            trailing_empty = true;
                        }
                        if pos >= trimmed.len() {
                            break;
                        }
                    }
                }
            }
            if trailing_empty {
                elements.push(E::parse("")?);
            }
        }
        *(self.get_mut)(record) = elements;
        Ok(())
    }

    fn serialize(&self, record: &R, _ctx: &InvocationContext) -> String {
        let elements = (self.get)(record);
        let rendered: Vec<String> = elements.iter().map(PrimitiveCodable::serialize).collect();
        let joined = rendered.join(&self.separator.to_string());
        if rendered.iter().any(|part| part.contains('=')) {
            format!("{{{joined}}}")
        } else {
            joined
        }
    }

    fn matches(&self, a: &R, b: &R) -> bool {
        let (left, right) = ((self.get)(a), (self.get)(b));
        left.len() == right.len() && left.iter().zip(right).all(|(x, y)| x.approx_eq(y))
    }
}
