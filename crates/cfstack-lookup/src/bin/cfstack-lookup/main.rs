mod cli;

use cfstack_lookup::config::Config;
use cfstack_lookup::host::{Host, Scope};
use cfstack_lookup::locator::QueryTarget;
use cfstack_lookup::lookup::Backend;
use cfstack_lookup::value::Value;

fn main() {
    use clap::Parser;
    let cli = cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_env("CFSTACK_LOG"))
        .with_writer(std::io::stderr)
        .init();

    let command_result = match cli.command {
        cli::Command::Lookup(lookup_cli) => lookup(cli.config.as_deref(), lookup_cli),
        cli::Command::Dev(dev_cli) => dev(cli.config.as_deref(), dev_cli).map(|()| true),
    };

    match command_result {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            for error in e.chain() {
                eprintln!("{error}")
            }
            std::process::exit(2);
        }
    }
}

/// Returns whether an answer was found
pub fn lookup(config: Option<&std::path::Path>, cli: cli::LookupCommand) -> anyhow::Result<bool> {
    let mut config = load_config(config, &cli.scope)?;
    if let Some(merge_behavior) = cli.merge_behavior {
        config.merge_behavior = merge_behavior;
    }
    let backend = Backend::from_config(&config)?;

    let value = backend.lookup(
        &cli.key,
        &scope(&cli.scope),
        cli.order_override.as_deref(),
        cli.resolution,
    )?;

    let Some(value) = value else {
        tracing::info!(key=%cli.key, "no answer found");
        return Ok(false);
    };

    output(&cli.output, &value)?;
    Ok(true)
}

fn load_config(path: Option<&std::path::Path>, scope: &cli::ScopeArgs) -> anyhow::Result<Config> {
    let mut config = match path {
        Some(path) => Config::load_file(path)?,
        None => Config::default(),
    };

    if !scope.hierarchy.is_empty() {
        config.hierarchy = scope.hierarchy.clone();
    }

    anyhow::ensure!(
        !config.hierarchy.is_empty(),
        "No hierarchy configured, pass --config or --hierarchy"
    );

    Ok(config)
}

fn scope(args: &cli::ScopeArgs) -> Scope {
    args.variables
        .iter()
        .map(|(name, value)| (name.clone(), Value::from(value.as_str())))
        .collect()
}

fn output(output: &cli::OutputArgs, value: &Value) -> anyhow::Result<()> {
    match output.format {
        cli::OutputFormat::Yaml => serde_yaml::to_writer(std::io::stdout(), value)?,
        cli::OutputFormat::Json => {
            serde_json::to_writer_pretty(std::io::stdout(), value)?;
            println!();
        }
    };

    Ok(())
}

/// (cfstack-lookup) developer utilities
///
/// A quick way to expose internal structures for debugging purposes
pub fn dev(config: Option<&std::path::Path>, cli: cli::DevCommand) -> anyhow::Result<()> {
    let config = match config {
        Some(path) => Config::load_file(path)?,
        None => Config::default(),
    };

    match cli.command {
        cli::DevSubCommand::Config => println!("{config:#?}"),
        cli::DevSubCommand::Sources {
            scope: scope_args,
            order_override,
        } => {
            let mut config = config;
            if !scope_args.hierarchy.is_empty() {
                config.hierarchy = scope_args.hierarchy.clone();
            }

            let hierarchy = config.hierarchy();
            for source in hierarchy.datasources(&scope(&scope_args), order_override.as_deref()) {
                match QueryTarget::resolve(&source) {
                    Some(target) => println!("{source} => {target}"),
                    None => println!("{source} => (not a CloudFormation element)"),
                }
            }
        }
        cli::DevSubCommand::Resolve { locator } => {
            println!("{:#?}", QueryTarget::resolve(&locator))
        }
    }

    Ok(())
}
