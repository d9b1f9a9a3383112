//! SPLICE CLI
//!
//! Boots an application directory, runs hot replacement against it and
//! inspects replacement source roots.

#![warn(missing_docs)]
#![warn(clippy::all)]

use clap::{Parser, Subcommand};
use color_eyre::eyre::{eyre, WrapErr};
use color_eyre::Result;
use console::style;
use splice_core::SpliceConfig;
use splice_engine::{Application, HotPatchReport, UnitOutcome};
use splice_scope::{HttpVerb, ScopeRegistry, TypeSpace};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "splice")]
#[command(about = "SPLICE - live component hot replacement", long_about = None)]
struct Cli {
    /// Log filter, overrides RUST_LOG
    #[arg(long, global = true)]
    log: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Boot an application and run one hot replacement
    Patch {
        /// Application directory
        #[arg(short, long)]
        app: PathBuf,
        /// Route to call before and after the run, as VERB:/path
        #[arg(short, long)]
        call: Vec<String>,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// List the routes of a booted application
    Routes {
        /// Application directory
        #[arg(short, long)]
        app: PathBuf,
    },
    /// List the replacement units under a source root
    Inspect {
        /// Source root
        #[arg(short, long)]
        source: PathBuf,
        /// Namespaces defined in the parent scope
        #[arg(long)]
        parent_namespace: Vec<String>,
    },
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    let filter = match &cli.log {
        Some(directives) => EnvFilter::new(directives),
        None => {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("splice=info"))
        }
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Patch { app, call, json } => patch(app, &call, json),
        Commands::Routes { app } => routes(app),
        Commands::Inspect {
            source,
            parent_namespace,
        } => inspect(source, parent_namespace),
    }
}

fn patch(dir: PathBuf, calls: &[String], json: bool) -> Result<()> {
    let calls = calls
        .iter()
        .map(|c| parse_call(c))
        .collect::<Result<Vec<_>>>()?;
    debug!(app = %dir.display(), calls = calls.len(), "booting application");
    let app = Application::boot(&dir).wrap_err_with(|| format!("booting {}", dir.display()))?;

    for (verb, path) in &calls {
        print_call("before", &app, *verb, path);
    }
    let report = app.patch()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    for (verb, path) in &calls {
        print_call("after", &app, *verb, path);
    }
    Ok(())
}

fn routes(dir: PathBuf) -> Result<()> {
    let app = Application::boot(&dir).wrap_err_with(|| format!("booting {}", dir.display()))?;
    for route in app.endpoints().routes() {
        let handler = app.endpoints().lookup(&route);
        match handler {
            Some(handler) => {
                println!("{:<24} {}::{}", route.to_string(), handler.object, handler.method);
            }
            None => println!("{}", route),
        }
    }
    Ok(())
}

fn inspect(source: PathBuf, parent_namespaces: Vec<String>) -> Result<()> {
    let mut config = SpliceConfig::new(&source);
    for ns in parent_namespaces {
        config = config.with_parent_scope_namespace(ns);
    }
    config.validate()?;

    let registry = ScopeRegistry::discover(&config, TypeSpace::new())?;
    println!("{} {}", style("source root").bold(), source.display());
    for unit in registry.units() {
        println!(
            "  {:<48} {:<18} {}",
            unit.name.to_string(),
            unit.category.to_string(),
            style(&unit.digest[..12.min(unit.digest.len())]).dim()
        );
    }
    for (name, error) in registry.rejected() {
        println!("  {:<48} {} {}", name.to_string(), style("rejected").red(), error);
    }
    Ok(())
}

fn parse_call(call: &str) -> Result<(HttpVerb, String)> {
    let (verb, path) = call
        .split_once(':')
        .ok_or_else(|| eyre!("route '{}' is not VERB:/path", call))?;
    let verb: HttpVerb = verb.parse()?;
    Ok((verb, path.to_string()))
}

fn print_call(stage: &str, app: &Application, verb: HttpVerb, path: &str) {
    match app.dispatch(verb, path) {
        Ok(body) => println!("{} {} {} -> {}", style(stage).cyan(), verb, path, body),
        Err(e) => println!("{} {} {} -> {}", style(stage).cyan(), verb, path, style(e).red()),
    }
}

fn print_report(report: &HotPatchReport) {
    if !report.enabled {
        println!("{}", style("hot replacement disabled").yellow());
        return;
    }
    println!(
        "{} {} ({})",
        style("run").bold(),
        report.run_id,
        report.source_root.display()
    );
    for unit in &report.units {
        let category = unit
            .category
            .map_or_else(|| "-".to_string(), |c| c.to_string());
        let outcome = match &unit.outcome {
            UnitOutcome::Replaced { object } => style(format!("replaced {}", object)).green(),
            UnitOutcome::Handled => style("handled".to_string()).green(),
            UnitOutcome::NoObject => style("no object".to_string()).yellow(),
            UnitOutcome::Skipped { reason } => style(format!("skipped: {}", reason)).red(),
        };
        println!("  {:<48} {:<18} {}", unit.name.to_string(), category, outcome);
    }
    for edge in &report.rewired {
        println!("  {} {} ({:?})", style("wired").dim(), edge.edge, edge.via);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_call() {
        let (verb, path) = parse_call("post:/users/add").unwrap();
        assert_eq!(verb, HttpVerb::Post);
        assert_eq!(path, "/users/add");
        assert!(parse_call("/users").is_err());
        assert!(parse_call("FETCH:/users").is_err());
    }

    #[test]
    fn test_cli_parses_patch() {
        let args = ["splice", "patch", "--app", "demo", "--call", "GET:/a", "--call", "GET:/b"];
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Commands::Patch { app, call, json } => {
                assert_eq!(app, PathBuf::from("demo"));
                assert_eq!(call, ["GET:/a", "GET:/b"]);
                assert!(!json);
            }
            _ => panic!("expected patch"),
        }
    }
}
