//! rowcast CLI entry point

use anyhow::{Context, Result};
use rowcast::config::cli::{Cli, Role};
use rowcast::config::roster::load_roster;
use rowcast::config::toml::build_config;
use rowcast::config::validator::{validate_config, validate_coordinator, validate_worker_role};
use rowcast::config::{Config, Roster};
use rowcast::output::json::{write_json_output, JsonDispatchReport, JsonWorkerReport};
use rowcast::output::text;
use rowcast::util::logging::init_logging;
use rowcast::{Coordinator, Matrix, WorkerService};

fn main() -> Result<()> {
    let cli = Cli::parse_args();
    init_logging(&cli.log_level)?;

    let config = build_config(&cli)?;
    validate_config(&config).context("Configuration validation failed")?;

    let roster = load_roster(&config.roster)?;
    tracing::debug!(workers = roster.len(), "roster loaded");

    match cli.role() {
        Role::Coordinator => run_coordinator(&cli, &config, &roster),
        Role::Worker => run_worker(&cli, &config, &roster),
    }
}

/// Generate the matrix, dispatch it and report per-worker results
fn run_coordinator(cli: &Cli, config: &Config, roster: &Roster) -> Result<()> {
    let matrix_size = validate_coordinator(config, cli.matrix_size, roster)
        .context("Configuration validation failed")?;

    text::print_coordinator_start(matrix_size, cli.port, roster.len(), config.dispatch.strategy);

    let matrix = Matrix::random(matrix_size, config.dispatch.seed);
    if config.output.print_matrix {
        text::print_matrix(&matrix);
    }

    let coordinator = Coordinator::new(config.dispatch.clone());
    let report = coordinator.dispatch(&matrix, &roster.workers)?;

    text::print_dispatch_report(&report);

    if let Some(ref path) = config.output.json_output {
        write_json_output(path, &JsonDispatchReport::from(&report), config.output.pretty_json)
            .with_context(|| format!("Failed to write JSON report to {}", path.display()))?;
        println!("JSON report written to {}", path.display());
    }

    if report.failed() > 0 {
        tracing::warn!(failed = report.failed(), "some workers did not acknowledge");
    }

    Ok(())
}

/// Serve exactly one coordinator session on the given port
fn run_worker(cli: &Cli, config: &Config, roster: &Roster) -> Result<()> {
    let coordinator = validate_worker_role(config, roster)
        .context("Configuration validation failed")?;

    let service = WorkerService::new(config.worker.clone(), Some(coordinator.clone()));
    let report = service.serve(cli.port)?;

    text::print_worker_report(&report, config.worker.preview_rows);

    if let Some(ref path) = config.output.json_output {
        write_json_output(path, &JsonWorkerReport::from(&report), config.output.pretty_json)
            .with_context(|| format!("Failed to write JSON report to {}", path.display()))?;
        println!("JSON report written to {}", path.display());
    }

    Ok(())
}
