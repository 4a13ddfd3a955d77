use anyhow::{Context, Result};
use clap::Parser;
use st_auditbench::config::Config;
use st_auditbench::fixture::{self, LoadedSuite};
use st_auditbench::generator::{
    CannedReportGenerator, Depth, LlmReportGenerator, ProviderHealth, ReportGenerator,
};
use st_auditbench::runner::{EXIT_CONFIG, EXIT_OK, Harness, RunResult};
use st_auditbench::scoring::Scorer;
use st_auditbench::{LlmOverride, history, llm, output};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::warn;

fn make_llm_override(provider: Option<String>, model: Option<String>) -> Option<LlmOverride> {
    if provider.is_none() && model.is_none() {
        return None;
    }
    let provider = provider
        .map(|p| llm::Provider::from_name(&p))
        .unwrap_or_default();
    let model = model.unwrap_or_else(|| provider.default_model().to_string());
    Some(LlmOverride { provider, model })
}

#[derive(Parser)]
#[command(
    name = "st-auditbench",
    version,
    about = "Score AI-generated Solidity audit reports against expected-findings fixtures"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Generate a report per suite, score it, persist the run, and print the verdict
    Run {
        /// Path to config file
        #[arg(short, long, default_value = "auditbench.toml")]
        config: PathBuf,

        /// Fixture file or directory (overrides config)
        #[arg(short, long)]
        fixtures: Option<PathBuf>,

        /// Analysis depth requested from the generator
        #[arg(short, long, value_enum)]
        depth: Option<Depth>,

        /// Only run suites whose name contains this text (case-insensitive)
        #[arg(long)]
        filter: Option<String>,

        /// CI mode: failing verdict exits 1, no color
        #[arg(long)]
        ci: bool,

        /// Serve pre-generated reports from this directory instead of calling an LLM
        #[arg(long)]
        reports_dir: Option<PathBuf>,

        /// LLM provider override: anthropic, openrouter, openai
        #[arg(long)]
        provider: Option<String>,

        /// LLM model override
        #[arg(long)]
        model: Option<String>,

        /// Directory for run artifacts (overrides config)
        #[arg(long)]
        results_dir: Option<PathBuf>,

        /// Also write an HTML scorecard to this path
        #[arg(long)]
        html: Option<PathBuf>,
    },

    /// Score one saved report against a suite (no generator)
    Score {
        /// Fixture file or directory
        #[arg(short, long)]
        fixtures: PathBuf,

        /// Exact suite name
        #[arg(short, long)]
        suite: String,

        /// Markdown report to score
        #[arg(short, long)]
        report: PathBuf,

        /// Path to config file (for scoring windows)
        #[arg(short, long, default_value = "auditbench.toml")]
        config: PathBuf,
    },

    /// List persisted runs, oldest first
    History {
        /// Path to config file
        #[arg(short, long, default_value = "auditbench.toml")]
        config: PathBuf,

        /// Directory holding run artifacts (overrides config)
        #[arg(long)]
        results_dir: Option<PathBuf>,
    },
}

struct RunArgs {
    config: PathBuf,
    fixtures: Option<PathBuf>,
    depth: Option<Depth>,
    filter: Option<String>,
    ci: bool,
    reports_dir: Option<PathBuf>,
    llm_override: Option<LlmOverride>,
    results_dir: Option<PathBuf>,
    html: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("st_auditbench=info")),
        )
        .init();

    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let code = match dispatch(cli.command).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            EXIT_CONFIG
        }
    };
    std::process::exit(code);
}

async fn dispatch(command: Command) -> Result<i32> {
    match command {
        Command::Run {
            config,
            fixtures,
            depth,
            filter,
            ci,
            reports_dir,
            provider,
            model,
            results_dir,
            html,
        } => {
            run(RunArgs {
                config,
                fixtures,
                depth,
                filter,
                ci,
                reports_dir,
                llm_override: make_llm_override(provider, model),
                results_dir,
                html,
            })
            .await
        }
        Command::Score {
            fixtures,
            suite,
            report,
            config,
        } => score_one(&fixtures, &suite, &report, &config),
        Command::History {
            config,
            results_dir,
        } => {
            let cfg = Config::load_or_default(&config)?;
            let dir = results_dir.unwrap_or(cfg.harness.results_dir);
            let runs = history::load(&dir)?;
            print!("{}", output::render_history(&runs));
            Ok(EXIT_OK)
        }
    }
}

async fn run(args: RunArgs) -> Result<i32> {
    let cfg = Config::load_or_default(&args.config)?;
    let fixtures_path = args.fixtures.unwrap_or_else(|| cfg.harness.fixtures.clone());
    let depth = args.depth.unwrap_or(cfg.harness.depth);
    let results_dir = args.results_dir.unwrap_or_else(|| cfg.harness.results_dir.clone());

    let suites = fixture::load(&fixtures_path)?;
    let suites = fixture::filter_by_name(suites, args.filter.as_deref())?;

    let result = match &args.reports_dir {
        Some(dir) => {
            let generator = CannedReportGenerator::new(dir);
            run_with(&generator, &suites, depth, &cfg).await?
        }
        None => {
            let chain = cfg.llm.build_chain(args.llm_override.as_ref())?;
            let health = Arc::new(Mutex::new(ProviderHealth::default()));
            let generator = LlmReportGenerator::new(chain, health, cfg.llm.cooldown());
            run_with(&generator, &suites, depth, &cfg).await?
        }
    };

    if args.ci {
        colored::control::set_override(false);
    }
    print!("{}", output::render_console(&result));

    match history::save(&result, &results_dir) {
        Ok(path) => println!("\nResults saved to {}", path.display()),
        Err(e) => {
            warn!(error = %e, "failed to persist run result");
            eprintln!("warning: could not save results: {e}");
        }
    }
    if let Some(path) = &args.html {
        if let Err(e) = write_scorecard(&result, path) {
            warn!(error = %e, "failed to write scorecard");
            eprintln!("warning: could not write scorecard: {e:#}");
        }
    }

    Ok(result.exit_code(args.ci))
}

async fn run_with<G: ReportGenerator>(
    generator: &G,
    suites: &[LoadedSuite],
    depth: Depth,
    cfg: &Config,
) -> Result<RunResult> {
    let result = Harness::new(generator, depth)
        .with_scorer(Scorer::new(cfg.scoring))
        .with_min_report_chars(cfg.harness.min_report_chars)
        .run(suites)
        .await?;
    Ok(result)
}

fn write_scorecard(result: &RunResult, path: &Path) -> Result<()> {
    let html = output::render_scorecard(result)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, html).with_context(|| format!("write {}", path.display()))?;
    println!("Scorecard written to {}", path.display());
    Ok(())
}

fn score_one(fixtures: &Path, suite_name: &str, report: &Path, config: &Path) -> Result<i32> {
    let cfg = Config::load_or_default(config)?;
    let suites = fixture::load(fixtures)?;
    let loaded = suites
        .iter()
        .find(|s| s.name() == suite_name)
        .with_context(|| format!("no suite named '{suite_name}'"))?;
    let text = std::fs::read_to_string(report)
        .with_context(|| format!("read report {}", report.display()))?;

    let score = Scorer::new(cfg.scoring).score(&loaded.suite, &text);
    println!("{}", serde_json::to_string_pretty(&score)?);
    Ok(EXIT_OK)
}
