//! This server authenticates users by username and password and answers
//! successful logins with a signed JWT.
use std::sync::Arc;

use anyhow::Context;
use authlocal::{build_router, config::Settings, state::AppState};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Sets up logging. When a log directory is configured the returned guard
/// must be held until shutdown so buffered lines are flushed.
fn init_logging(settings: &Settings) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_new(&settings.log.filter).context("invalid log filter")?;

    match &settings.log.directory {
        Some(directory) => {
            let appender = tracing_appender::rolling::daily(directory, "server.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let subscriber = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(false)
                .with_ansi(false)
                .with_writer(writer)
                .finish();

            tracing::subscriber::set_global_default(subscriber)
                .context("failed to set global default")?;

            Ok(Some(guard))
        }
        None => {
            let subscriber = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(false)
                .finish();

            tracing::subscriber::set_global_default(subscriber)
                .context("failed to set global default")?;

            Ok(None)
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("failed to load server settings")?;
    let _guard = init_logging(&settings)?;

    let state = Arc::new(AppState::from_settings(&settings));
    let app = build_router(state);
    let addr = settings.server.addr();

    info!("listening on {}", addr);

    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await
        .context("server stopped unexpectedly")?;

    Ok(())
}
