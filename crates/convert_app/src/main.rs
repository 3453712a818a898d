mod cli;
mod notifier;
mod settings_file;

use std::io::Write;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;
use convert_core::{ConversionRequest, MediaInfo, ProgressSnapshot};
use convert_engine::{EngineSettings, Orchestrator};
use log::LevelFilter;

use crate::cli::Cli;
use crate::notifier::TerminalNotifier;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    engine_logging::initialize(cli.log, level);

    let settings = settings_file::resolve(&cli)?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    runtime.block_on(run(cli.request(), settings))
}

async fn run(request: ConversionRequest, settings: EngineSettings) -> anyhow::Result<()> {
    let mut orchestrator = Orchestrator::from_settings(settings, Arc::new(TerminalNotifier))?;

    let quality = request.quality_label();
    let submission = match orchestrator.submit(request).await {
        Ok(submission) => submission,
        Err(failure) => {
            if let Some(info) = &failure.info {
                print_info(info, quality);
            }
            return Err(failure.into());
        }
    };
    print_info(&submission.info, quality);

    let outcome = tokio::select! {
        outcome = orchestrator.wait_for_terminal(print_progress) => Some(outcome),
        _ = tokio::signal::ctrl_c() => None,
    };
    let Some(outcome) = outcome else {
        orchestrator.cancel();
        bail!("cancelled");
    };
    match outcome {
        Some(Ok(_)) => {}
        Some(Err(err)) => return Err(err.into()),
        None => bail!("job {:?} stopped without a result", orchestrator.active_job()),
    }

    let saved = orchestrator.download().await?;
    println!("Saved {} ({} bytes)", saved.path.display(), saved.byte_len);
    Ok(())
}

fn print_info(info: &MediaInfo, quality: &str) {
    println!("{}", info.title);
    println!(
        "  by {} - {} - {} views - {}",
        info.uploader,
        info.duration_label(),
        info.view_count,
        quality
    );
}

fn print_progress(snapshot: &ProgressSnapshot) {
    let mut stdout = std::io::stdout();
    let _ = write!(stdout, "\r{:>3}% {:<60}", snapshot.progress(), snapshot.message);
    let _ = stdout.flush();
}
