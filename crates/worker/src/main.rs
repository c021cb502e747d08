use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;

use taskrelay_core::trace::LogTracer;
use taskrelay_store::{ResultWriter, TaskQueue};
use taskrelay_worker::metrics::LogMetrics;
use taskrelay_worker::startup::wait_for_store;
use taskrelay_worker::{StandardExecutor, WorkerConfig, WorkerLoop, WorkerSummary};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    init_tracing();

    let started = Instant::now();

    let config = match WorkerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Invalid worker configuration");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(
        concurrency = config.concurrency,
        service_name = %config.service_name,
        key_prefix = %config.key_prefix,
        "Worker starting",
    );

    let cancel = CancellationToken::new();
    tokio::spawn(shutdown_signal(cancel.clone()));

    let executor = Arc::new(StandardExecutor::new(config.slow_echo_delay));
    let tracer = Arc::new(LogTracer::new(config.service_name.clone()));
    let metrics = Arc::new(LogMetrics::default());

    // --- One store connection per loop so blocking dequeues don't queue up ---
    let mut loops = JoinSet::new();
    for index in 0..config.concurrency {
        let store = match wait_for_store(config.store_connect_attempts, || {
            taskrelay_store::connect(&config.redis_url, &config.key_prefix)
        })
        .await
        {
            Ok(store) => Arc::new(store),
            Err(e) => {
                tracing::error!(error = %e, "Worker failed to start");
                cancel.cancel();
                return ExitCode::FAILURE;
            }
        };

        let queue: Arc<dyn TaskQueue> = store.clone();
        let worker = WorkerLoop::new(
            queue,
            ResultWriter::new(store, config.result_ttl),
            executor.clone(),
        )
        .with_tracer(tracer.clone())
        .with_metrics(metrics.clone())
        .with_settings(config.settings());

        let cancel = cancel.clone();
        loops.spawn(async move { (index, worker.run(cancel).await) });
    }

    tracing::info!(
        startup_ms = started.elapsed().as_millis() as u64,
        "Worker ready",
    );

    // --- Wait for every loop; a fatal error in one stops the rest ---
    let mut totals = WorkerSummary::default();
    let mut fatal = false;
    while let Some(joined) = loops.join_next().await {
        match joined {
            Ok((index, Ok(summary))) => {
                tracing::debug!(index, processed = summary.processed, "Worker loop finished");
                totals.processed += summary.processed;
                totals.failed += summary.failed;
            }
            Ok((index, Err(e))) => {
                tracing::error!(index, error = %e, "Worker loop failed, shutting down");
                fatal = true;
                cancel.cancel();
            }
            Err(e) => {
                tracing::error!(error = %e, "Worker loop task panicked, shutting down");
                fatal = true;
                cancel.cancel();
            }
        }
    }

    tracing::info!(
        uptime_secs = started.elapsed().as_secs(),
        processed = totals.processed,
        failed = totals.failed,
        "Worker stopped",
    );

    if fatal {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

/// Install the global subscriber. `LOG_FORMAT=json` selects JSON output.
fn init_tracing() {
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "taskrelay_worker=debug,taskrelay_store=info".into()),
        )
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(tracing_subscriber::fmt::layer))
        .init();
}

/// Cancel `cancel` on SIGINT or SIGTERM.
async fn shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl-C, shutting down"),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }

    cancel.cancel();
}
