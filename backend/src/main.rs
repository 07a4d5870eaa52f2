//! Service entry-point: loads settings, starts the joke pipeline and serves
//! HTTP until a shutdown signal arrives.

mod server;

use ortho_config::OrthoConfig;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use laff::domain::{ExitReason, PipelineReport};
use laff::settings::{LaffSettings, LogMode};
use server::{ServerConfig, StartupError, build_http_state, build_pipeline, create_server};

/// Application bootstrap.
#[actix_web::main]
async fn main() -> Result<(), StartupError> {
    let settings = LaffSettings::load().map_err(|err| StartupError::Load {
        message: err.to_string(),
    })?;
    init_tracing(settings.log_mode()?);

    let pipeline = build_pipeline(&settings)?;
    let shutdown = CancellationToken::new();
    let config = ServerConfig::from(&settings);
    let bind_addr = config.bind_addr();
    let server = create_server(build_http_state(&pipeline, shutdown.clone()), config)?;
    let handle = server.handle();
    let mut serving = actix_web::rt::spawn(server);
    info!(%bind_addr, "serving jokes");

    let pipeline_cancel = shutdown.clone();
    let running = actix_web::rt::spawn(async move { pipeline.run(pipeline_cancel).await });

    let served = tokio::select! {
        () = shutdown_signal() => {
            info!("shutdown signal received");
            None
        }
        result = &mut serving => Some(result),
    };

    shutdown.cancel();
    handle.stop(true).await;
    let served = match served {
        Some(result) => result,
        None => serving.await,
    };
    log_report(&running.await?);
    served??;
    info!("shutdown complete");
    Ok(())
}

fn init_tracing(mode: LogMode) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(mode.default_directive()));
    let result = match mode {
        LogMode::Production => fmt().with_env_filter(filter).json().try_init(),
        LogMode::Development => fmt().with_env_filter(filter).pretty().try_init(),
    };
    if let Err(e) = result {
        warn!(error = %e, "tracing init failed");
    }
}

fn log_report(report: &PipelineReport) {
    for exit in &report.exits {
        match exit.reason {
            ExitReason::Cancelled => {
                info!(stage = %exit.stage, slot = exit.slot, "pipeline worker stopped");
            }
            ExitReason::ErrorThreshold { errors } => {
                warn!(
                    stage = %exit.stage,
                    slot = exit.slot,
                    errors,
                    "pipeline worker gave up after repeated failures"
                );
            }
            ExitReason::Aborted => {
                error!(stage = %exit.stage, slot = exit.slot, "pipeline worker aborted");
            }
        }
    }
}

#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(stream) => stream,
        Err(e) => {
            warn!(error = %e, "SIGTERM handler unavailable");
            ctrl_c().await;
            return;
        }
    };
    tokio::select! {
        () = ctrl_c() => {}
        _ = terminate.recv() => {}
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    ctrl_c().await;
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "ctrl-c handler unavailable");
        std::future::pending::<()>().await;
    }
}
