//! cfstack-lookup cli interface

use cfstack_lookup::host::MergeBehavior;
use cfstack_lookup::lookup::ResolutionType;
use clap::{Parser, Subcommand, ValueEnum};
use std::fmt::Formatter;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (.yaml, .yml or .hcl)
    ///
    /// Without it all defaults apply and the hierarchy is empty.
    #[clap(short = 'c', long = "config", global(true))]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Look up a key in the configured hierarchy
    #[command(alias = "get")]
    Lookup(LookupCommand),

    /// Print debug information for development
    Dev(DevCommand),
}

#[derive(Parser, Debug)]
pub struct LookupCommand {
    #[clap(flatten)]
    pub scope: ScopeArgs,

    #[clap(flatten)]
    pub output: OutputArgs,

    /// Data source consulted before the hierarchy
    #[clap(short = 'o', long = "order-override")]
    pub order_override: Option<String>,

    /// Shape of the result
    #[arg(short = 'r', long = "resolution", value_enum, default_value_t)]
    pub resolution: ResolutionType,

    /// How hash answers are merged, overrides the configuration
    #[arg(short = 'm', long = "merge-behavior", value_enum)]
    pub merge_behavior: Option<MergeBehavior>,

    /// Key to look up
    pub key: String,
}

#[derive(Parser, Debug)]
pub struct ScopeArgs {
    /// Scope variable used for interpolation, as name=value
    #[clap(short = 's', long = "scope", value_parser = parse_variable)]
    pub variables: Vec<(String, String)>,

    /// Replace the configured hierarchy
    ///
    /// Can be specified multiple times, highest priority first.
    #[clap(short = 'H', long = "hierarchy")]
    pub hierarchy: Vec<String>,
}

fn parse_variable(variable: &str) -> Result<(String, String), String> {
    variable
        .split_once('=')
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .ok_or_else(|| format!("expected name=value, got {variable}"))
}

#[derive(Parser, Debug)]
pub struct OutputArgs {
    #[arg(short = 'F', long = "output-format", default_value_t)]
    pub format: OutputFormat,
}

#[derive(ValueEnum, Clone, Default, Debug)]
pub enum OutputFormat {
    Json,
    #[default]
    Yaml,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Json => f.write_str("json"),
            OutputFormat::Yaml => f.write_str("yaml"),
        }
    }
}

#[derive(Parser, Debug)]
pub struct DevCommand {
    #[command(subcommand)]
    pub command: DevSubCommand,
}

#[derive(Subcommand, Debug)]
pub enum DevSubCommand {
    /// Show the parsed configuration
    Config,
    /// Show the data sources a lookup would walk through
    Sources {
        #[clap(flatten)]
        scope: ScopeArgs,

        #[clap(short = 'o', long = "order-override")]
        order_override: Option<String>,
    },
    /// Show how a single locator is interpreted
    Resolve { locator: String },
}
