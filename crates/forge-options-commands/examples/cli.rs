use anstream::AutoStream;
use clap::Parser;
use forge_options::{ConfigurableObject, InvocationContext, OptionRecord};
use forge_options_commands::{print_debug, print_help, print_json, to_json};
use forge_options_derive::ConfigurableOptions;

/// A sample cache-tuning option group, standing in for a real storage component's options.
#[derive(Debug, Clone, Default, ConfigurableOptions)]
pub struct CacheOptions {
    /// Cache capacity in bytes.
    capacity: forge_options::ByteSize,
    /// Number of shards the cache is split across.
    shard_count: u32,
    #[option(struct)]
    eviction: EvictionOptions,
}

#[derive(Debug, Clone, Default, ConfigurableOptions)]
pub struct EvictionOptions {
    /// Fraction of the cache reclaimed per eviction pass, in percent.
    batch_percent: u32,
    /// Whether eviction runs on a background thread.
    background: bool,
}

fn sample_record(text: &str) -> anyhow::Result<OptionRecord<CacheOptions>> {
    let mut record = OptionRecord::new(CacheOptions::default());
    let ctx = InvocationContext::top_level();
    record.configure_from_string(text, &ctx)?;
    Ok(record)
}

#[derive(Debug, Parser)]
enum Cli {
    /// Prints the option group's field descriptors.
    Help {
        /// Only print fields whose name contains this substring.
        #[arg(default_value = "")]
        filter: String,
    },
    /// Configures the option group from a `key=value;...` string and dumps its resolved values.
    Debug {
        /// Option string to apply before dumping, e.g. "capacity=64M;shard_count=8".
        #[arg(long, default_value = "capacity=64M;shard_count=8")]
        set: String,
    },
    /// Like `debug`, but emits the dump as JSON.
    Json {
        #[arg(long, default_value = "capacity=64M;shard_count=8")]
        set: String,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut out = AutoStream::auto(std::io::stderr());

    match cli {
        Cli::Help { filter } => {
            print_help::<CacheOptions>(&mut out, &filter)?;
        }
        Cli::Debug { set } => {
            let record = sample_record(&set)?;
            print_debug(record.get(), &InvocationContext::top_level(), &mut out)?;
        }
        Cli::Json { set } => {
            let record = sample_record(&set)?;
            let value = to_json(record.get(), &InvocationContext::top_level());
            print_json(&value, &mut out)?;
        }
    }
    Ok(())
}
