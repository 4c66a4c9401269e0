use forge_options_derive::ConfigurableOptions;

#[derive(Debug, Clone, Default, ConfigurableOptions)]
struct Options {
    #[option(vector)]
    shard_count: u32,
}

fn main() {}
