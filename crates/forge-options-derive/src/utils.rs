//! Attribute parsing: turns a struct's `#[option(...)]` attributes and doc comments into the
//! typed model [`codegen`](crate::codegen) generates descriptor code from.

use proc_macro2::Ident;
use syn::{spanned::Spanned, Attribute, Data, DeriveInput, Expr, Field, Lit, LitStr, Path, Type};

/// Collapses a field or struct's `///` doc comments into a single help string, matching the
/// reflective-config ecosystem's own doc-to-help-text convention.
pub(crate) fn parse_docs(attrs: &[Attribute]) -> String {
    let mut docs = String::new();
    for attr in attrs {
        if !attr.meta.path().is_ident("doc") {
            continue;
        }
        let Ok(name_value) = attr.meta.require_name_value() else {
            continue;
        };
        let Expr::Lit(doc_literal) = &name_value.value else {
            continue;
        };
        let Lit::Str(text) = &doc_literal.lit else {
            continue;
        };
        let line = text.value();
        let line = line.trim();
        if line.is_empty() {
            if !docs.is_empty() {
                docs.push('\n');
            }
        } else {
            if !docs.is_empty() && !docs.ends_with(|ch: char| ch.is_ascii_whitespace()) {
                docs.push(' ');
            }
            docs.push_str(line);
        }
    }
    docs
}

/// Kind of composite wiring a field needs, beyond a plain [`PrimitiveCodable`](forge_options::PrimitiveCodable) leaf.
pub(crate) enum FieldKind {
    Primitive,
    /// A field that resolves to `PrimitiveValue::Secret` directly rather than through
    /// `PrimitiveCodable` (`secrecy`'s types withhold `PartialEq`, which that trait requires).
    Secret,
    /// `#[option(struct)]` or `#[option(configurable)]`: a nested `T: DescribeFields` field. The
    /// distinction is purely in the recorded [`TypeTag`](forge_options::TypeTag) -- both reach the
    /// field through the same [`StructField`](forge_options::StructField) accessor.
    Struct { is_configurable: bool },
    /// `#[option(vector(separator = '...'))]`: a `Vec<E: PrimitiveCodable>` field.
    Vector { separator: char },
    /// `#[option(polymorphic(namespace = "..."))]`: a `PolymorphicSlot` field.
    Polymorphic { namespace: LitStr },
    /// `#[option(enum_table = path::to::TABLE)]`: a primitive field backed by a fixed
    /// string&lt;-&gt;value lookup table instead of `PrimitiveCodable`.
    Enum { table: Path },
    /// `#[option(prefix_transform)]`: a field that resolves to `PrimitiveValue::PrefixTransform`
    /// directly, for the legacy `fixed:N`/`capped:N`/`rocksdb.*` spellings.
    PrefixTransform,
}

pub(crate) struct FieldModel {
    pub ident: Ident,
    pub ty: Type,
    pub docs: String,
    pub kind: FieldKind,
    pub rename: Option<String>,
    pub aliases: Vec<String>,
    pub deprecated: bool,
    pub flags: Vec<Ident>,
    pub custom: Option<CustomCodec>,
}

pub(crate) struct CustomCodec {
    pub parse: Path,
    pub serialize: Path,
    pub equals: Path,
}

impl FieldModel {
    pub fn name(&self) -> String {
        self.rename.clone().unwrap_or_else(|| self.ident.to_string())
    }
}

fn parse_field(field: &Field) -> syn::Result<FieldModel> {
    let ident = field
        .ident
        .clone()
        .ok_or_else(|| syn::Error::new_spanned(field, "only named fields are supported"))?;
    let ty = field.ty.clone();
    let docs = parse_docs(&field.attrs);

    let mut kind = FieldKind::Primitive;
    let mut rename = None;
    let mut aliases = Vec::new();
    let mut deprecated = false;
    let mut flags = Vec::new();
    let mut custom = None;
    let mut help_override = None;

    for attr in field.attrs.iter().filter(|attr| attr.path().is_ident("option")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") {
                rename = Some(meta.value()?.parse::<LitStr>()?.value());
            } else if meta.path.is_ident("alias") {
                aliases.push(meta.value()?.parse::<LitStr>()?.value());
            } else if meta.path.is_ident("help") {
                help_override = Some(meta.value()?.parse::<LitStr>()?.value());
            } else if meta.path.is_ident("deprecated") {
                deprecated = true;
            } else if meta.path.is_ident("struct") {
                kind = FieldKind::Struct { is_configurable: false };
            } else if meta.path.is_ident("configurable") {
                kind = FieldKind::Struct { is_configurable: true };
            } else if meta.path.is_ident("secret") {
                kind = FieldKind::Secret;
            } else if meta.path.is_ident("prefix_transform") {
                kind = FieldKind::PrefixTransform;
            } else if meta.path.is_ident("vector") {
                let mut separator = ':';
                if meta.input.peek(syn::token::Paren) {
                    let content;
                    syn::parenthesized!(content in meta.input);
                    while !content.is_empty() {
                        let key: Ident = content.parse()?;
                        content.parse::<syn::Token![=]>()?;
                        if key == "separator" {
                            let lit: syn::LitChar = content.parse()?;
                            separator = lit.value();
                        } else {
                            return Err(syn::Error::new(key.span(), "unsupported `vector` key"));
                        }
                        if content.is_empty() {
                            break;
                        }
                        content.parse::<syn::Token![,]>()?;
                    }
                }
                kind = FieldKind::Vector { separator };
            } else if meta.path.is_ident("polymorphic") {
                let content;
                syn::parenthesized!(content in meta.input);
                let key: Ident = content.parse()?;
                content.parse::<syn::Token![=]>()?;
                if key != "namespace" {
                    return Err(syn::Error::new(key.span(), "expected `namespace = \"...\"`"));
                }
                let namespace: LitStr = content.parse()?;
                kind = FieldKind::Polymorphic { namespace };
            } else if meta.path.is_ident("enum_table") {
                let table: Path = meta.value()?.parse()?;
                kind = FieldKind::Enum { table };
            } else if meta.path.is_ident("custom") {
                let content;
                syn::parenthesized!(content in meta.input);
                let mut parse_fn = None;
                let mut serialize_fn = None;
                let mut equals_fn = None;
                while !content.is_empty() {
                    let key: Ident = content.parse()?;
                    content.parse::<syn::Token![=]>()?;
                    let path: Path = content.parse()?;
                    if key == "parse" {
                        parse_fn = Some(path);
                    } else if key == "serialize" {
                        serialize_fn = Some(path);
                    } else if key == "equals" {
                        equals_fn = Some(path);
                    } else {
                        return Err(syn::Error::new(key.span(), "unsupported `custom` key"));
                    }
                    if content.is_empty() {
                        break;
                    }
                    content.parse::<syn::Token![,]>()?;
                }
                let (Some(parse), Some(serialize), Some(equals)) = (parse_fn, serialize_fn, equals_fn) else {
                    return Err(meta.error("`custom` requires `parse`, `serialize`, and `equals`"));
                };
                custom = Some(CustomCodec { parse, serialize, equals });
            } else if let Some(name) = meta.path.get_ident() {
                const FLAG_NAMES: &[&str] = &[
                    "mutable",
                    "pointer",
                    "shared",
                    "unique",
                    "allow_null",
                    "string_none",
                    "string_shallow",
                    "dont_prepare",
                    "compare_never",
                    "compare_loose",
                    "compare_exact",
                ];
                if FLAG_NAMES.iter().any(|flag| name == flag) {
                    flags.push(name.clone());
                } else {
                    return Err(meta.error(format!("unsupported `option` key `{name}`")));
                }
            } else {
                return Err(meta.error("unsupported `option` key"));
            }
            Ok(())
        })?;
    }

    Ok(FieldModel {
        ident,
        ty,
        docs: help_override.unwrap_or(docs),
        kind,
        rename,
        aliases,
        deprecated,
        flags,
        custom,
    })
}

pub(crate) struct ValidationModel {
    pub path: Path,
}

pub(crate) struct ContainerModel {
    pub ident: Ident,
    pub fields: Vec<FieldModel>,
    pub validations: Vec<ValidationModel>,
}

impl ContainerModel {
    pub fn parse(input: &DeriveInput) -> syn::Result<Self> {
        let Data::Struct(data) = &input.data else {
            return Err(syn::Error::new_spanned(input, "`ConfigurableOptions` only supports structs"));
        };
        let fields = data
            .fields
            .iter()
            .map(parse_field)
            .collect::<syn::Result<Vec<_>>>()?;

        let mut validations = Vec::new();
        for attr in input.attrs.iter().filter(|attr| attr.path().is_ident("option")) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("validate") {
                    let path: Path = meta.value()?.parse()?;
                    validations.push(ValidationModel { path });
                } else {
                    return Err(meta.error("unsupported container-level `option` key"));
                }
                Ok(())
            })?;
        }

        Ok(Self {
            ident: input.ident.clone(),
            fields,
            validations,
        })
    }
}
