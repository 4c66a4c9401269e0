#![doc(html_root_url = "https://docs.rs/forge-options-derive/0.1.0")]
#![recursion_limit = "128"]

extern crate proc_macro;

use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput};

mod codegen;
mod utils;

/// Generates a `DescribeFields` impl from a struct's fields and `#[option(...)]` attributes.
///
/// See the crate-level docs of `forge-options` for the supported attribute grammar.
#[proc_macro_derive(ConfigurableOptions, attributes(option))]
pub fn configurable_options(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let model = match utils::ContainerModel::parse(&input) {
        Ok(model) => model,
        Err(err) => return err.to_compile_error().into(),
    };
    match codegen::derive(&model) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}
