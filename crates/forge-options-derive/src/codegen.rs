//! Generates the `DescribeFields` impl (and its static descriptor table) for a
//! `#[derive(ConfigurableOptions)]` struct.

use proc_macro2::TokenStream;
use quote::{format_ident, quote, quote_spanned};
use syn::{spanned::Spanned, GenericArgument, PathArguments, Type};

use crate::utils::{ContainerModel, FieldKind, FieldModel};

const CRATE: &str = "forge_options";

fn cr() -> TokenStream {
    let cr = syn::Ident::new(CRATE, proc_macro2::Span::call_site());
    quote!(::#cr)
}

/// Extracts `E` from a field declared as `Vec<E>`. Errors (at the call site's span) if the field
/// isn't syntactically a single-argument `Vec<...>`.
fn vector_element_type(ty: &Type) -> syn::Result<&Type> {
    if let Type::Path(path) = ty {
        if let Some(segment) = path.path.segments.last() {
            if segment.ident == "Vec" {
                if let PathArguments::AngleBracketed(args) = &segment.arguments {
                    if let Some(GenericArgument::Type(elem)) = args.args.first() {
                        return Ok(elem);
                    }
                }
            }
        }
    }
    Err(syn::Error::new(ty.span(), "`#[option(vector)]` fields must have type `Vec<E>`"))
}

/// Builds the `FieldDescriptor` literal for one field.
fn describe_field(struct_name: &syn::Ident, field: &FieldModel) -> syn::Result<TokenStream> {
    let cr = cr();
    let ident = &field.ident;
    let span = ident.span();
    let ty = &field.ty;
    let name = field.name();
    let help = &field.docs;
    let aliases = &field.aliases;
    let verification = if field.deprecated {
        quote!(#cr::Verification::Deprecated)
    } else {
        quote!(#cr::Verification::Normal)
    };
    let flags = flags_and_fold(field);

    if let Some(custom) = &field.custom {
        let parse = &custom.parse;
        let serialize = &custom.serialize;
        let equals = &custom.equals;
        return Ok(quote_spanned! {span=>
            #cr::FieldDescriptor {
                name: #name,
                aliases: &[#(#aliases),*],
                help: #help,
                tag: <#ty as #cr::PrimitiveCodable>::tag(),
                verification: #verification,
                flags: #flags,
                access: #cr::FieldAccess::Custom {
                    parse: #parse,
                    serialize: #serialize,
                    equals: #equals,
                },
            }
        });
    }

    match &field.kind {
        FieldKind::Primitive => Ok(quote_spanned! {span=>
            #cr::FieldDescriptor {
                name: #name,
                aliases: &[#(#aliases),*],
                help: #help,
                tag: <#ty as #cr::PrimitiveCodable>::tag(),
                verification: #verification,
                flags: #flags,
                access: #cr::FieldAccess::Primitive {
                    get: |record: &#struct_name| #cr::PrimitiveCodable::to_primitive(&record.#ident),
                    set: |record: &mut #struct_name, value| {
                        record.#ident = <#ty as #cr::PrimitiveCodable>::from_primitive(value)?;
                        ::core::result::Result::Ok(())
                    },
                },
            }
        }),
        FieldKind::Secret => Ok(quote_spanned! {span=>
            #cr::FieldDescriptor {
                name: #name,
                aliases: &[#(#aliases),*],
                help: #help,
                tag: #cr::TypeTag::Secret,
                verification: #verification,
                flags: #flags,
                access: #cr::FieldAccess::Primitive {
                    get: |record: &#struct_name| #cr::PrimitiveValue::Secret(record.#ident.clone()),
                    set: |record: &mut #struct_name, value| {
                        match value {
                            #cr::PrimitiveValue::Secret(secret) => {
                                record.#ident = secret;
                                ::core::result::Result::Ok(())
                            }
                            other => ::core::result::Result::Err(#cr::ConfigError::invalid_argument(
                                ::std::format!("expected secret, got {other}"),
                            )),
                        }
                    },
                },
            }
        }),
        FieldKind::Struct { is_configurable } => {
            let tag_name = quote!(::core::stringify!(#ty));
            let tag = if *is_configurable {
                quote!(#cr::TypeTag::Configurable(#tag_name))
            } else {
                quote!(#cr::TypeTag::Struct(#tag_name))
            };
            Ok(quote_spanned! {span=>
                #cr::FieldDescriptor {
                    name: #name,
                    aliases: &[#(#aliases),*],
                    help: #help,
                    tag: #tag,
                    verification: #verification,
                    flags: #flags,
                    access: #cr::FieldAccess::Struct(::std::boxed::Box::new(#cr::StructField {
                        get: |record: &#struct_name| &record.#ident,
                        get_mut: |record: &mut #struct_name| &mut record.#ident,
                    })),
                }
            })
        }
        FieldKind::Vector { separator } => {
            let elem = vector_element_type(ty)?;
            let elem_name = quote!(::core::stringify!(#elem));
            Ok(quote_spanned! {span=>
                #cr::FieldDescriptor {
                    name: #name,
                    aliases: &[#(#aliases),*],
                    help: #help,
                    tag: #cr::TypeTag::Vector(#elem_name),
                    verification: #verification,
                    flags: #flags,
                    access: #cr::FieldAccess::Vector(::std::boxed::Box::new(#cr::VectorField {
                        get: |record: &#struct_name| &record.#ident,
                        get_mut: |record: &mut #struct_name| &mut record.#ident,
                        separator: #separator,
                    })),
                }
            })
        }
        FieldKind::Polymorphic { namespace } => Ok(quote_spanned! {span=>
            #cr::FieldDescriptor {
                name: #name,
                aliases: &[#(#aliases),*],
                help: #help,
                tag: #cr::TypeTag::Customizable(#namespace),
                verification: #verification,
                flags: #flags,
                access: #cr::FieldAccess::Polymorphic(::std::boxed::Box::new(#cr::PolymorphicField {
                    get: |record: &#struct_name| &record.#ident,
                    get_mut: |record: &mut #struct_name| &mut record.#ident,
                    namespace: #namespace,
                })),
            }
        }),
        FieldKind::PrefixTransform => Ok(quote_spanned! {span=>
            #cr::FieldDescriptor {
                name: #name,
                aliases: &[#(#aliases),*],
                help: #help,
                tag: #cr::TypeTag::PrefixTransform,
                verification: #verification,
                flags: #flags,
                access: #cr::FieldAccess::Primitive {
                    get: |record: &#struct_name| #cr::PrimitiveValue::PrefixTransform(record.#ident),
                    set: |record: &mut #struct_name, value| {
                        match value {
                            #cr::PrimitiveValue::PrefixTransform(transform) => {
                                record.#ident = transform;
                                ::core::result::Result::Ok(())
                            }
                            other => ::core::result::Result::Err(#cr::ConfigError::invalid_argument(
                                ::std::format!("expected prefix transform, got {other}"),
                            )),
                        }
                    },
                },
            }
        }),
        FieldKind::Enum { table } => {
            let tag_name = quote!(::core::stringify!(#ty));
            Ok(quote_spanned! {span=>
                #cr::FieldDescriptor {
                    name: #name,
                    aliases: &[#(#aliases),*],
                    help: #help,
                    tag: #cr::TypeTag::Enum(#tag_name),
                    verification: #verification,
                    flags: #flags,
                    access: #cr::FieldAccess::Primitive {
                        get: |record: &#struct_name| #cr::PrimitiveValue::Str(
                            #table.serialize(record.#ident).unwrap_or_default().to_owned(),
                        ),
                        set: |record: &mut #struct_name, value| {
                            let token = match value {
                                #cr::PrimitiveValue::Str(token) => token,
                                other => return ::core::result::Result::Err(#cr::ConfigError::invalid_argument(
                                    ::std::format!("expected string, got {other}"),
                                )),
                            };
                            record.#ident = #table.parse(&token)?;
                            ::core::result::Result::Ok(())
                        },
                    },
                }
            })
        }
    }
}

fn flags_and_fold(field: &FieldModel) -> TokenStream {
    let cr = cr();
    if field.flags.is_empty() {
        return quote!(#cr::DescriptorFlags::NONE);
    }
    let mut iter = field.flags.iter();
    let first = iter.next().unwrap();
    let first_variant = format_ident!("{}", first.to_string().to_uppercase());
    let mut expr = quote!(#cr::DescriptorFlags::#first_variant);
    for flag in iter {
        let variant = format_ident!("{}", flag.to_string().to_uppercase());
        expr = quote!(#expr.or(#cr::DescriptorFlags::#variant));
    }
    expr
}

pub(crate) fn derive(model: &ContainerModel) -> syn::Result<TokenStream> {
    let cr = cr();
    let struct_name = &model.ident;
    let descriptors = model
        .fields
        .iter()
        .map(|field| describe_field(struct_name, field))
        .collect::<syn::Result<Vec<_>>>()?;

    let validations = &model.validations.iter().map(|v| &v.path).collect::<Vec<_>>();
    let validation_count = validations.len();
    let validations_impl = if validations.is_empty() {
        TokenStream::new()
    } else {
        quote! {
            fn validations() -> &'static [&'static dyn #cr::Validate<Self>] {
                static VALIDATIONS: [&(dyn #cr::Validate<#struct_name> + 'static); #validation_count] =
                    [#(&#validations),*];
                &VALIDATIONS
            }
        }
    };

    Ok(quote! {
        #[automatically_derived]
        impl #cr::DescribeFields for #struct_name {
            fn fields() -> &'static [#cr::FieldDescriptor<Self>] {
                static FIELDS: ::std::sync::OnceLock<::std::vec::Vec<#cr::FieldDescriptor<#struct_name>>> =
                    ::std::sync::OnceLock::new();
                FIELDS.get_or_init(|| ::std::vec![#(#descriptors),*])
            }

            #validations_impl
        }
    })
}
