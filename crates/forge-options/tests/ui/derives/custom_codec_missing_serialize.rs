use forge_options::{ConfigError, InvocationContext};
use forge_options_derive::ConfigurableOptions;

fn parse_capacity(_record: &mut Options, _text: &str, _ctx: &InvocationContext) -> Result<(), ConfigError> {
    Ok(())
}

fn equal_capacity(_a: &Options, _b: &Options, _ctx: &InvocationContext) -> bool {
    true
}

#[derive(Debug, Clone, Default, ConfigurableOptions)]
struct Options {
    #[option(custom(parse = parse_capacity, equals = equal_capacity))]
    capacity: u32,
}

fn main() {}
