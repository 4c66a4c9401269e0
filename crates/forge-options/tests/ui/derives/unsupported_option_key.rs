use forge_options_derive::ConfigurableOptions;

#[derive(Debug, Clone, Default, ConfigurableOptions)]
struct Options {
    #[option(this_is_not_a_real_key)]
    capacity: u32,
}

fn main() {}
