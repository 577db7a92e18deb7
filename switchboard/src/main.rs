#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

mod args;

use args::Args;
use clap::Parser;
use futures_util::StreamExt;
use switchboard_config::{Config, TelemetryConfig};
use switchboard_llm::{DispatchInput, Dispatcher, LlmError, RelayEvent, RelayStream};
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = Config::load(&args.config)?;

    let telemetry = match &config.telemetry {
        Some(telemetry) => switchboard_telemetry::init(telemetry)?,
        None => switchboard_telemetry::init(&TelemetryConfig::default())?,
    };

    tracing::info!(config_path = %args.config.display(), "starting switchboard");

    let dispatcher = Dispatcher::from_config(&config)?;

    if args.status {
        println!("{}", serde_json::to_string_pretty(&dispatcher.status())?);
        return Ok(());
    }

    let shutdown = CancellationToken::new();
    let shutdown_clone = shutdown.clone();

    tokio::spawn(async move {
        shutdown_signal().await;
        shutdown_clone.cancel();
    });

    let input = DispatchInput::Prompt(args.prompt.join(" "));

    if args.stream {
        stream(&dispatcher, input, shutdown).await?;
    } else {
        tokio::select! {
            response = dispatcher.dispatch(input) => {
                println!("{}", serde_json::to_string_pretty(&response?)?);
            }
            () = shutdown.cancelled() => {
                tracing::warn!("interrupted before the response arrived");
            }
        }
    }

    if let Err(e) = telemetry.force_flush() {
        tracing::warn!(error = %e, "failed to flush telemetry");
    }

    tracing::info!("switchboard stopped");
    Ok(())
}

/// Write streamed text to stdout as it arrives
async fn stream(dispatcher: &Dispatcher, input: DispatchInput, shutdown: CancellationToken) -> anyhow::Result<()> {
    let Some(mut relay) = open_stream(dispatcher, input, &shutdown).await? else {
        tracing::warn!("interrupted before the stream opened");
        return Ok(());
    };
    let mut stdout = tokio::io::stdout();

    while let Some(event) = relay.next().await {
        match event {
            RelayEvent::Metadata {
                backend_id,
                category,
                attempt,
            } => {
                tracing::info!(backend = %backend_id, %category, attempt, "streaming");
            }
            RelayEvent::Content { content } => {
                stdout.write_all(content.as_bytes()).await?;
                stdout.flush().await?;
            }
            RelayEvent::Done => break,
        }
    }

    stdout.write_all(b"\n").await?;
    stdout.flush().await?;

    Ok(())
}

/// Open a stream, giving up with `None` once `shutdown` fires
///
/// Covers the retries and backoff that happen before the first byte.
async fn open_stream(
    dispatcher: &Dispatcher,
    input: DispatchInput,
    shutdown: &CancellationToken,
) -> Result<Option<RelayStream>, LlmError> {
    tokio::select! {
        biased;
        () = shutdown.cancelled() => Ok(None),
        relay = dispatcher.dispatch_streaming(input, shutdown.clone()) => relay.map(Some),
    }
}

/// Wait for a shutdown signal (`SIGINT` or `SIGTERM`)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
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
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }

    tracing::info!("shutdown signal received");
}
