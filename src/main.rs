use std::sync::Arc;

use critterwatch::notify::push::ChannelPushFeed;
use critterwatch::notify::stream::SseDetectionStream;
use critterwatch::render::TerminalRenderer;
use critterwatch::{Backend, HttpBackend, WatchClient, WatchConfig};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "critterwatch=debug,info".parse().expect("valid env filter")),
        )
        .init();

    let config = match WatchConfig::load().await {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{e}");
            std::process::exit(1);
        }
    };
    if let Err(e) = config.validate() {
        tracing::error!("invalid configuration: {e}");
        std::process::exit(1);
    }

    let backend: Arc<dyn Backend> = Arc::new(
        HttpBackend::new(&config.base_url, config.timeout()).expect("failed to create backend"),
    );
    let client = WatchClient::new(config.clone(), backend.clone());

    let _renderer = TerminalRenderer::start(client.store(), backend, client.subscribe());

    client.refresh_all().await;

    let _stream = if config.stream_enabled {
        let source = SseDetectionStream::new(&config.stream_url)
            .expect("failed to create stream source");
        Some(client.start_stream(Box::new(source)))
    } else {
        None
    };

    // The injector is where platform push glue would hand payloads in; the
    // watcher binary just keeps the feed open for the process lifetime.
    let _push_glue = if config.push_enabled {
        let (feed, injector) = ChannelPushFeed::new();
        Some((client.start_push(Box::new(feed)), injector))
    } else {
        None
    };

    tracing::info!("critterwatch started against {}", config.base_url);

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {e}");
    }
    tracing::info!("shutting down");
}
