use forge_options_derive::ConfigurableOptions;

#[derive(Debug, Clone, ConfigurableOptions)]
enum Options {
    A,
    B,
}

fn main() {}
