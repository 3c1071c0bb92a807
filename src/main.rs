use anyhow::{bail, Context, Result};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use lynos::{
    art::HttpArtFetcher,
    config::Config,
    enrich::{Enricher, LyricsPolicy},
    lyrics::api::GeniusClient,
    server::{self, AppState},
    zone::sonos::SonosController,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("lynos=info")))
        .init();

    let config = Config::from_env()?;
    let Some(token) = config.genius_access_token.clone() else {
        bail!(
            "No Genius access token. Set GENIUS_ACCESS_TOKEN or add \
             [genius] client_access_token to the secrets file."
        );
    };

    let zones = SonosController::new(config.http_timeout, config.discovery_timeout)?;
    let lyrics = GeniusClient::new(token, config.http_timeout)?;
    let art = HttpArtFetcher::new(config.http_timeout)?;

    let policy = if config.lyrics_optional {
        LyricsPolicy::Optional
    } else {
        LyricsPolicy::Required
    };
    let enricher = Enricher::new(Arc::new(lyrics), Arc::new(art))
        .with_lyrics_attempts(config.lyrics_attempts)
        .with_lyrics_policy(policy);

    let app = server::router(AppState::new(Arc::new(zones), enricher));

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    info!("listening on http://{}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("failed to listen for ctrl_c: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!("failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutting down");
}
