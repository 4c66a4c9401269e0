#![doc(html_root_url = "https://docs.rs/forge-options-commands/0.1.0")]
//! Terminal diagnostics for `forge-options`-based option sets: a `--help-options`-style dump of
//! a record's field descriptors, and a `--dump-options`-style dump of its resolved values.

pub use self::{
    debug::{print_debug, print_json, to_json},
    help::print_help,
};

mod debug;
mod help;

#[cfg(doctest)]
doc_comment::doctest!("../README.md");
