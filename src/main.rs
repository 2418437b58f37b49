use anyhow::{Context, Result};
use clap::Parser;
use slowtest::cli::{Cli, OutputFormat};
use slowtest::config::Config;
use slowtest::model::BuildId;
use slowtest::provider::ProblemLog;
use slowtest::regression::{DecisionPolicy, Detector};
use slowtest::report::DetectionSummary;
use slowtest::store::HistoryStore;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber; --debug forces TRACE, otherwise RUST_LOG
fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into())
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Run detection and print the report; returns true when slow tests were found
fn run(args: &Cli) -> Result<bool> {
    let config = Config::discover(args.config.as_deref())?;
    let params = config.effective_parameters(&args.overrides());
    let policy = DecisionPolicy::resolve(&params);

    let mut options = config.detector;
    if args.first_match {
        options.stop_at_first_regression = true;
    }

    let store = HistoryStore::from_file(&args.history)?;
    let build_id = BuildId(args.build);
    let current = store
        .build(build_id)
        .with_context(|| format!("Build {} not found in {}", build_id, args.history.display()))?;

    let detector = Detector::from_provider(&store).with_options(options);
    let mut problems = ProblemLog::new();
    let reports = detector.check_build(&policy, &current, &mut problems);
    tracing::debug!(
        "{} report(s), {} distinct problem(s) raised",
        reports.len(),
        problems.len()
    );

    let summary = DetectionSummary::new(build_id, policy.to_string(), reports, problems.len());
    match args.format {
        OutputFormat::Text => print!("{}", summary.to_report_string()),
        OutputFormat::Json => println!("{}", summary.to_json()?),
    }

    Ok(summary.has_regressions())
}

fn main() -> Result<ExitCode> {
    let args = Cli::parse();

    init_tracing(args.debug);

    let regressed = run(&args)?;
    if regressed && !args.no_fail {
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
