//! PIRA CLI - builds, runs and analyzes benchmark targets from a PIRA configuration

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;
use tabled::{Table, Tabled};
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use pira_core::application::{
    make_targets, AnalysisOutcome, Analyzer, Builder, ConfigurationLoader, LegacyConfigurationLoader,
    RunConfigurationGenerator, SimplifiedConfigurationLoader,
};
use pira_core::domain::{Configuration, ExtrapConfiguration, InstrumentConfig, InvocationConfiguration};
use pira_core::port::id_provider::UuidProvider;
use pira_core::port::time_provider::SystemTimeProvider;
use pira_core::port::{FunctorResolver, ShellExecutor};
use pira_infra_system::{ScriptFunctorResolver, SystemShell};

const DEFAULT_EXTRAP_DIR: &str = "~/pira-extrap";
const DEFAULT_EXTRAP_PREFIX: &str = "t";

#[derive(Parser)]
#[command(name = "pira")]
#[command(about = "PIRA benchmark orchestration", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file
    #[arg(long, global = true, env = "PIRA_CONFIG")]
    config: Option<String>,

    /// Configuration schema
    #[arg(long, global = true, value_enum, default_value_t = Schema::Auto)]
    schema: Schema,

    /// Log build and analysis commands instead of executing them.
    /// Active build functors are skipped; run generators still run,
    /// since their output is the run script path
    #[arg(long, global = true, env = "PIRA_DRY_RUN")]
    dry_run: bool,

    /// Repetitions per run configuration
    #[arg(long, global = true, default_value = "1")]
    repetitions: u32,

    /// Filter instrumentation at runtime instead of compile time
    #[arg(long, global = true)]
    runtime_filter: bool,

    /// Output directory for performance-model experiments
    #[arg(long, global = true, default_value = DEFAULT_EXTRAP_DIR)]
    extrap_dir: String,

    #[arg(long, global = true, default_value = DEFAULT_EXTRAP_PREFIX)]
    extrap_prefix: String,
}

#[derive(Clone, Copy, ValueEnum)]
enum Schema {
    Auto,
    Legacy,
    Simplified,
}

#[derive(Subcommand)]
enum Commands {
    /// Show builds, items and flavors
    Describe {
        /// Print the loaded model as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the expanded invocation arguments of one item
    Args {
        #[arg(short, long)]
        build: String,

        #[arg(short, long)]
        item: String,
    },

    /// Clean and build every (build, item, flavor)
    Build {
        /// Use the uninstrumented build functors
        #[arg(long)]
        no_instr: bool,
    },

    /// Generate the run matrix
    Runs,

    /// Run the analysis functor of every target
    Analyze {
        /// Refinement iteration; omit for the vanilla analysis
        #[arg(long)]
        iteration: Option<u32>,
    },
}

#[derive(Tabled)]
struct ItemRow {
    build: String,
    item: String,
    flavors: String,
    mode: String,
    functors: String,
    analyzer: String,
}

fn init_logging() -> Result<()> {
    let log_format = std::env::var("PIRA_LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("pira=info"))
        .context("Failed to create env filter")?;

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().pretty().with_writer(std::io::stderr))
                .init();
        }
    }
    Ok(())
}

fn load_configuration(cli: &Cli) -> Result<(PathBuf, Arc<Configuration>)> {
    let config = cli
        .config
        .as_deref()
        .context("No configuration file given (--config or PIRA_CONFIG)")?;
    let path = PathBuf::from(shellexpand::tilde(config).into_owned());
    let loaded = match cli.schema {
        Schema::Auto => ConfigurationLoader::detecting().load_conf(&path),
        Schema::Legacy => LegacyConfigurationLoader::legacy().load_conf(&path),
        Schema::Simplified => SimplifiedConfigurationLoader::simplified().load_conf(&path),
    };
    let config = loaded.with_context(|| format!("Failed to load {}", path.display()))?;
    Ok((path, config))
}

fn describe(config: &Configuration) -> Vec<ItemRow> {
    config
        .builds()
        .iter()
        .flat_map(|build| {
            build.items.iter().map(move |item| ItemRow {
                build: build.directory.clone(),
                item: item.name.clone(),
                flavors: item.flavors.join(", "),
                mode: item.mode.as_ref().map(|m| m.to_string()).unwrap_or_default(),
                functors: item.functors.builder.clone(),
                analyzer: item.analyzer_dir.clone(),
            })
        })
        .collect()
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging()?;
    let cli = Cli::parse();

    info!("PIRA v{} starting...", pira_core::VERSION);

    let (path, config) = load_configuration(&cli)?;
    let invocation = InvocationConfiguration::new(path.clone(), !cli.runtime_filter, cli.repetitions);
    let extrap = ExtrapConfiguration::new(
        shellexpand::tilde(&cli.extrap_dir).into_owned(),
        cli.extrap_prefix.clone(),
        String::new(),
    );

    // DI wiring
    let resolver: Arc<dyn FunctorResolver> = Arc::new(ScriptFunctorResolver::new());
    let shell: Arc<dyn ShellExecutor> = Arc::new(SystemShell::new(Arc::new(SystemTimeProvider)));

    match cli.command {
        Commands::Describe { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(&*config)?);
            } else {
                println!("{}", format!("{} ({})", path.display(), config.schema()).cyan().bold());
                println!();
                println!("{}", Table::new(describe(&config)));
            }
        }

        Commands::Args { build, item } => {
            for args in config.get_args(&build, &item)? {
                println!("{}", args);
            }
        }

        Commands::Build { no_instr } => {
            let builder = Builder::new(Arc::clone(&config), resolver, shell)
                .no_instrumentation(no_instr)
                .dry_run(cli.dry_run);
            let report = builder.build_all().await;

            for result in &report.results {
                match result {
                    Ok(outcome) => println!(
                        "  {} {} ({}) in {}",
                        "✓".green(),
                        outcome.item,
                        outcome.flavor,
                        outcome.build
                    ),
                    Err(e) => println!("  {} {}", "✗".red(), e),
                }
            }
            println!();
            println!(
                "  {} {} built, {} failed",
                "Summary:".bold(),
                report.succeeded(),
                report.failed()
            );

            if report.failed() > 0 {
                anyhow::bail!("{} target(s) failed to build", report.failed());
            }
        }

        Commands::Runs => {
            let generator = RunConfigurationGenerator::new(Arc::clone(&config), resolver)
                .with_invocation(&invocation)
                .with_extrap(&extrap);
            let runs = generator.generate_run_configurations().await?;

            for run in &runs {
                println!(
                    "({}, {}) -> {}",
                    run.benchmark,
                    run.flavor,
                    run.script.display()
                );
            }
            println!();
            println!("  {} {} run configurations", "✓".green(), runs.len());
        }

        Commands::Analyze { iteration } => {
            let analyzer = Analyzer::new(Arc::clone(&config), resolver, shell).dry_run(cli.dry_run);
            let instrument = match iteration {
                Some(n) => InstrumentConfig::instrumented(n),
                None => InstrumentConfig::vanilla(),
            };

            for target in make_targets(&config, &UuidProvider, &invocation) {
                let outcome = analyzer
                    .analyze(&target, &instrument)
                    .await
                    .with_context(|| format!("Analysis of {} ({}) failed", target.item, target.flavor))?;
                let detail = match outcome {
                    AnalysisOutcome::Command { command, .. } => command,
                    AnalysisOutcome::Delegated { output } => output,
                };
                println!("  {} {} ({}): {}", "✓".green(), target.item, target.flavor, detail);
                if let Some(instr_file) = target.runtime_instr_file() {
                    println!("    {} {}", "selection:".bold(), instr_file);
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_accepted_after_subcommand() {
        let cli = Cli::try_parse_from(["pira", "build", "--config", "x.json", "--dry-run", "--no-instr"])
            .unwrap();
        assert_eq!(cli.config.as_deref(), Some("x.json"));
        assert!(cli.dry_run);
        assert!(matches!(cli.command, Commands::Build { no_instr: true }));

        let cli = Cli::try_parse_from(["pira", "--config", "y.json", "runs", "--repetitions", "3"]).unwrap();
        assert_eq!(cli.config.as_deref(), Some("y.json"));
        assert_eq!(cli.repetitions, 3);
    }
}
