mod check_cmd;
mod engine;
mod output;

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};
use cmdroute_commands::{Context, Registry, Resolver};
use cmdroute_config::{config_dir, config_file_path, load_and_prepare, EngineConfig};
use tracing::debug;

use output::{note_error, note_info, render_table, styled, BOLD, DIM};

#[derive(Parser)]
#[command(name = "cmdroute")]
#[command(about = "Resolve device command queries to templates and handlers")]
#[command(version)]
struct Cli {
    /// Config file (default: ~/.cmdroute/config.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Registry file, overriding the configured one
    #[arg(long, global = true)]
    registry: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct QueryArgs {
    /// The command to resolve, e.g. `show ip route vrf Blue`
    #[arg(required = true, num_args = 1..)]
    query: Vec<String>,

    #[command(flatten)]
    context: ContextArgs,

    /// Allow abbreviations and regex fragments
    #[arg(long)]
    fuzzy: bool,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct ContextArgs {
    /// Context value as `category=value`; repeat for priority order
    #[arg(short = 'c', long = "context", value_name = "CATEGORY=VALUE")]
    context: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a query to one template, its arguments and handler
    Resolve(QueryArgs),
    /// List every best-scoring template for a query
    Search(QueryArgs),
    /// List parameterless commands runnable in a context
    Commands {
        #[command(flatten)]
        context: ContextArgs,
    },
    /// Load the registry stack and print a summary
    Check,
}

fn main() {
    if let Err(e) = run() {
        note_error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| config_file_path(&config_dir()));
    let config = load_and_prepare(&config_path)?;
    cmdroute_logging::init_logger(config.log_level(), config.log_dir().as_deref())?;
    debug!(path = %config_path.display(), "Using config");

    let (registry, report) = engine::install(&config, cli.registry.as_deref())?;

    match cli.command {
        Commands::Resolve(args) => resolve(&config, Resolver::new(registry), args),
        Commands::Search(args) => search(&config, Resolver::new(registry), args),
        Commands::Commands { context } => {
            let context = parse_context(&context, &registry)?;
            let rows: Vec<Vec<String>> = registry
                .commands_for(&context)
                .into_iter()
                .map(|t| vec![t.to_string()])
                .collect();
            print!("{}", render_table(&["Command"], &rows));
            Ok(())
        }
        Commands::Check => {
            check_cmd::run(&config, &registry, &report);
            Ok(())
        }
    }
}

fn resolve(config: &EngineConfig, resolver: Resolver, args: QueryArgs) -> Result<()> {
    let context = parse_context(&args.context, resolver.registry())?;
    let resolver = resolver.with_options(config.match_options());
    let fuzzy = args.fuzzy || config.fuzzy.unwrap_or(false);
    let resolution = resolver.resolve(&args.query.join(" "), &context, fuzzy)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&resolution)?);
        return Ok(());
    }
    println!("{} {}", styled(BOLD, "template:"), resolution.template);
    println!("{} {}", styled(BOLD, "handler: "), resolution.handler);
    println!("{} {}", styled(BOLD, "command: "), resolution.command());
    for (name, value) in &resolution.arguments {
        println!("  {} = {}", styled(DIM, name), value);
    }
    Ok(())
}

fn search(config: &EngineConfig, resolver: Resolver, args: QueryArgs) -> Result<()> {
    let context = parse_context(&args.context, resolver.registry())?;
    let resolver = resolver.with_options(config.match_options());
    let fuzzy = args.fuzzy || config.fuzzy.unwrap_or(false);
    let scope = (!context.is_empty()).then_some(&context);
    let candidates = resolver.search(&args.query.join(" "), scope, fuzzy)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&candidates)?);
        return Ok(());
    }
    let rows: Vec<Vec<String>> = candidates
        .iter()
        .map(|c| {
            let arguments: Vec<String> =
                c.arguments.iter().map(|(k, v)| format!("{k}={v}")).collect();
            vec![c.template.to_string(), c.score.to_string(), arguments.join(" ")]
        })
        .collect();
    print!("{}", render_table(&["Template", "Score", "Arguments"], &rows));
    if candidates.len() > 1 {
        note_info(&format!("{} templates tie at the best score", candidates.len()));
    }
    Ok(())
}

fn parse_context(args: &ContextArgs, registry: &Registry) -> Result<Context> {
    let Some(context) = Context::from_pairs(&args.context) else {
        bail!("Context values must be given as CATEGORY=VALUE");
    };
    for entry in &args.context {
        if let Some((category, _)) = entry.split_once('=') {
            let category = category.trim();
            if !registry.categories().iter().any(|c| c == category) {
                bail!(
                    "Unknown context category '{category}'; expected one of: {}",
                    registry.categories().join(", ")
                );
            }
        }
    }
    Ok(context)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> Registry {
        Registry::new(["os", "platform"])
    }

    #[test]
    fn parses_cli() {
        let cli = Cli::try_parse_from([
            "cmdroute", "resolve", "show", "ip", "route", "-c", "os=iosxe", "-c", "os=ios", "--fuzzy",
        ])
        .unwrap();
        let Commands::Resolve(args) = cli.command else {
            panic!("expected resolve");
        };
        assert_eq!(args.query.join(" "), "show ip route");
        assert!(args.fuzzy);
        let ctx = parse_context(&args.context, &registry()).unwrap();
        assert_eq!(ctx.values("os"), ["iosxe", "ios"]);
    }

    #[test]
    fn query_is_required() {
        assert!(Cli::try_parse_from(["cmdroute", "resolve"]).is_err());
    }

    #[test]
    fn rejects_bad_context() {
        let args = ContextArgs {
            context: vec!["iosxe".to_string()],
        };
        assert!(parse_context(&args, &registry()).is_err());
        let args = ContextArgs {
            context: vec!["vendor=cisco".to_string()],
        };
        assert!(parse_context(&args, &registry()).is_err());
    }
}
