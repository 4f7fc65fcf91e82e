use std::path::PathBuf;
use std::sync::Arc;
use anyhow::{bail, Context};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use relcache::analysis::analyzer::Analyzer;
use relcache::cache::controller::CacheGrowthController;
use relcache::core::config::ExperimentConfig;
use relcache::eval::adapter::JoinEvaluatorAdapter;
use relcache::eval::join::{EdgeJoinEvaluator, SchemaDescription};
use relcache::eval::query::load_sample;
use relcache::relation::sqlite::SqliteStore;

const USAGE: &str = "usage: relcache <config.json> [--report <path>] [--debug]";

struct Args {
    config: PathBuf,
    report: Option<PathBuf>,
    debug: bool,
}

fn parse_args() -> anyhow::Result<Args> {
    let mut config = None;
    let mut report = None;
    let mut debug = false;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--debug" => debug = true,
            "--report" => match args.next() {
                Some(path) => report = Some(PathBuf::from(path)),
                None => bail!("--report needs a path\n{}", USAGE),
            },
            "-h" | "--help" => {
                println!("{}", USAGE);
                std::process::exit(0);
            }
            other if other.starts_with("--") => bail!("unknown option {}\n{}", other, USAGE),
            other if config.is_none() => config = Some(PathBuf::from(other)),
            other => bail!("unexpected argument {}\n{}", other, USAGE),
        }
    }

    let Some(config) = config else {
        bail!("missing configuration file\n{}", USAGE);
    };
    Ok(Args { config, report, debug })
}

fn main() -> anyhow::Result<()> {
    let args = parse_args()?;

    let default_filter = if args.debug { "relcache=debug" } else { "relcache=info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ExperimentConfig::load(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    let store = SqliteStore::open(&config.database_path)?;

    let schema = SchemaDescription::load(&store, &config)?;
    tracing::info!("Schema: {}", schema.describe());
    let queries = load_sample(&config.queries)?;
    tracing::info!("Evaluating {} queries per iteration", queries.len());

    let analyzer = Arc::new(Analyzer::for_config(config.stemming));
    let mut evaluator = JoinEvaluatorAdapter::new(
        schema,
        Box::new(EdgeJoinEvaluator::new(config.max_join_results)),
        queries,
        &config,
    )?;

    let report = {
        let mut controller = CacheGrowthController::from_config(&store, &config, analyzer)?;
        controller.run(&mut evaluator)?
    };
    let json = report.to_json()?;
    match &args.report {
        Some(path) => {
            std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
            tracing::info!("Report written to {}", path.display());
        }
        None => println!("{}", json),
    }

    store.close();
    Ok(())
}
