use std::sync::Arc;
use std::time::Duration;

use aniflow_genai::{GeminiClient, GeminiConfig};
use aniflow_worker::{log_events, Studio, WorkerConfig};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "aniflow_worker=debug,aniflow_pipeline=info,aniflow_genai=info,aniflow_timeline=info"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = WorkerConfig::from_env(std::env::args().nth(1))?;
    let gemini = GeminiConfig::from_env()?;
    tracing::info!(
        story_model = %gemini.story_model,
        image_model = %gemini.image_model,
        pacing_ms = config.pacing.as_millis() as u64,
        tick_hz = config.tick_hz,
        "Loaded worker configuration",
    );

    let studio = Arc::new(Studio::new(Arc::new(GeminiClient::new(gemini)), &config));
    let cancel = CancellationToken::new();

    let logger_handle = tokio::spawn(log_events(studio.bus.subscribe(), cancel.clone()));
    let timeline = Arc::clone(&studio.timeline);
    let timeline_cancel = cancel.clone();
    let timeline_handle = tokio::spawn(async move { timeline.run(timeline_cancel).await });

    let work = async {
        let summary = studio.produce(&config).await?;
        tracing::info!(
            title = %summary.title,
            shots = summary.shots,
            images_ok = summary.images.succeeded(),
            images_failed = summary.images.failed(),
            narration_ok = summary.narration.as_ref().map_or(0, |r| r.succeeded()),
            total_duration = summary.total_duration,
            "Production finished",
        );
        if config.play_through {
            studio.play_through().await?;
        }
        anyhow::Ok(())
    };

    let result = tokio::select! {
        result = work => result,
        () = shutdown_signal() => Ok(()),
    };

    cancel.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(5), timeline_handle).await;
    let _ = tokio::time::timeout(Duration::from_secs(5), logger_handle).await;
    tracing::info!("Worker stopped");
    result
}

/// Wait for SIGINT or (on Unix) SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl-C handler");
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
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), shutting down");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, shutting down");
        }
    }
}
