//! Command-line surface. One flat `clap::Parser` struct rather than the
//! teacher's flattened `CommonArgs`, since this agent has no plugin system
//! to layer options on top of.

use clap::Parser;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser, Clone, Debug)]
#[command(name = "ladder-agent", version = VERSION, about = "Pluggable autoscaling controller agent")]
pub struct Args {
    /// Path to the config file.
    #[arg(long = "config.file", env = "LADDER_CONFIG", default_value = "ladder.toml")]
    pub config_file: String,

    /// Enable debug-level logging regardless of RUST_LOG.
    #[arg(long = "debug", default_value_t = false)]
    pub debug: bool,

    /// Run every configured autoscaler in dry-run mode: decisions are
    /// computed and logged but `scale` is never called.
    #[arg(long = "dry.run", default_value_t = false)]
    pub dry_run: bool,

    /// Emit logs as JSON instead of the default text format.
    #[arg(long = "json.log", default_value_t = false)]
    pub json_log: bool,

    /// Address the HTTP control surface listens on; overrides the config
    /// file's `global.listen_address` when set.
    #[arg(long = "listen.address")]
    pub listen_address: Option<String>,
}
