use forge_options::PolymorphicSlot;
use forge_options_derive::ConfigurableOptions;

#[derive(Debug, Clone, Default, ConfigurableOptions)]
struct Options {
    #[option(polymorphic)]
    backend: PolymorphicSlot,
}

fn main() {}
