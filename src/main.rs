use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use tune_reporting::cli::{Cli, Command, OutputArgs};
use tune_reporting::config::ReportingConfig;
use tune_reporting::export::{ExportHandle, ExportRecord, Job};
use tune_reporting::logging::init_logging;
use tune_reporting::management::{ReportFormat, ReportKind};
use tune_reporting::orchestrator::ReportExporter;
use tune_reporting::reports::{download_report, reader_for};
use tune_reporting::ui::{ExportProgress, print_preview};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = ReportingConfig::load(cli.config.as_deref())
        .context("failed to load configuration")?;
    cli.apply_overrides(&mut config);
    let exporter = ReportExporter::from_config(&config)?;

    match &cli.command {
        Command::Export {
            report,
            format,
            output,
            ..
        } => {
            let kind = ReportKind::from(*report);
            let params = cli
                .command
                .export_params()
                .context("export parameters missing")?;
            let job = exporter.submit(kind, &params).await?;
            info!(report = %kind, job_id = %job.job_id(), "Export submitted");
            deliver(&exporter, kind, job, (*format).into(), output).await
        }
        Command::Status { report, job_id } => {
            let kind = ReportKind::from(*report);
            let result = exporter
                .queue(kind)
                .client()
                .export_status(kind, job_id)
                .await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }
        Command::Fetch {
            report,
            job_id,
            format,
            output,
        } => {
            let kind = ReportKind::from(*report);
            deliver(&exporter, kind, Job::new(job_id.as_str()), (*format).into(), output).await
        }
    }
}

/// Poll `job` with a spinner, then save or print the artifact.
async fn deliver(
    exporter: &ReportExporter,
    kind: ReportKind,
    job: Job,
    format: ReportFormat,
    output: &OutputArgs,
) -> Result<()> {
    let handle = exporter.poll(kind, job)?;
    let record = wait_with_progress(exporter, &handle).await;
    handle.cancel();

    let url = record.outcome.clone().into_result()?;
    let body = download_report(exporter.queue(kind).client().http(), &url).await?;

    if let Some(path) = &output.output {
        write_artifact(path, &body)?;
        eprintln!("Saved {} bytes to {}", body.len(), path.display());
        return Ok(());
    }

    let records = reader_for(format).read(&body)?;
    match output.summary {
        Some(limit) => print_preview(&url, &records, limit),
        None => {
            for row in &records {
                println!("{}", serde_json::to_string(row)?);
            }
        }
    }
    Ok(())
}

async fn wait_with_progress(exporter: &ReportExporter, handle: &ExportHandle) -> ExportRecord {
    let job_id = handle.job().job_id();
    let max = handle.config().max_attempts;
    let progress = ExportProgress::start(job_id);
    let mut attempts = handle.progress();

    let finished = exporter.finish(handle);
    tokio::pin!(finished);

    let record = loop {
        tokio::select! {
            record = &mut finished => break record,
            changed = attempts.changed() => {
                if changed.is_err() {
                    break (&mut finished).await;
                }
                let attempt = *attempts.borrow_and_update();
                progress.attempt(job_id, attempt, max);
            }
        }
    };

    progress.complete(&record.outcome);
    if tracing::enabled!(tracing::Level::DEBUG) {
        progress.print_record(&record);
    }
    record
}

fn write_artifact(path: &Path, body: &[u8]) -> Result<()> {
    std::fs::write(path, body).with_context(|| format!("failed to write {}", path.display()))
}
