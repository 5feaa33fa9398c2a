//! Wiring: configuration, backend, driver, completion record.

use crate::args::{CommonArgs, MergeArgs, TrainArgs};
use anyhow::Context;
use tunekit_core::backend::QUANTIZATION_PACKAGE;
use tunekit_core::{
    CompletionRecord, PythonBackend, TuneError, TunekitConfig, load_config, run_merge,
    run_training,
};

fn resolve_config(common: &CommonArgs) -> anyhow::Result<TunekitConfig> {
    let config =
        load_config(common.config.as_deref()).context("Failed to load configuration")?;
    Ok(config.with_python_override(common.python.clone()))
}

/// Log the worker-side traceback, if any, before the error propagates.
fn report(err: TuneError) -> anyhow::Error {
    if let Some(traceback) = err.traceback() {
        tracing::error!("Python traceback:\n{}", traceback);
    }
    anyhow::Error::new(err)
}

fn emit(record: &CompletionRecord) -> anyhow::Result<()> {
    let stdout = std::io::stdout();
    record
        .emit(&mut stdout.lock())
        .context("Failed to write completion record")
}

pub async fn train(args: TrainArgs) -> anyhow::Result<()> {
    let config = resolve_config(&args.common)?;
    let request = args.to_request();

    let extra: &[&str] = if request.use_4bit {
        &[QUANTIZATION_PACKAGE]
    } else {
        &[]
    };
    let mut backend = PythonBackend::launch(&config.python, extra)
        .await
        .map_err(report)
        .context("Failed to start the Python worker")?;

    let outcome = run_training(&mut backend, &request, &config.trainer_api).await;
    let shutdown = backend.shutdown().await;
    let record = outcome.map_err(report).context("Training failed")?;
    if let Err(e) = shutdown {
        tracing::warn!(error = %e, "Worker shutdown was not clean");
    }

    emit(&record)
}

pub async fn merge(args: MergeArgs) -> anyhow::Result<()> {
    let config = resolve_config(&args.common)?;
    let request = args.to_request();

    let mut backend = PythonBackend::launch(&config.python, &[])
        .await
        .map_err(report)
        .context("Failed to start the Python worker")?;

    let outcome = run_merge(&mut backend, &request).await;
    let shutdown = backend.shutdown().await;
    let record = outcome.map_err(report).context("Merge failed")?;
    if let Err(e) = shutdown {
        tracing::warn!(error = %e, "Worker shutdown was not clean");
    }

    emit(&record)
}
