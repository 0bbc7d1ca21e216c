pub mod api;
pub mod browse;
pub mod capture;
pub mod catalog;
pub mod config;
pub mod error;
pub mod middleware;
pub mod mood;
pub mod server;

#[cfg(test)]
mod testutil;

use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

use catalog::{CatalogClient, TmdbClient};
use mood::{HttpMoodClassifier, MoodClassifier};

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
    #[error(transparent)]
    Service(#[from] error::ServiceError),
    #[error("Server error: {0}")]
    Server(String),
}

/// Upstream clients built from the `tmdb` and `mood` config sections.
pub struct Clients {
    pub catalog: Arc<dyn CatalogClient>,
    pub classifier: Arc<dyn MoodClassifier>,
}

impl Clients {
    pub fn from_config(config: &config::Config) -> Result<Self, ServerError> {
        let catalog: Arc<dyn CatalogClient> = Arc::new(TmdbClient::new(&config.tmdb)?);
        let classifier: Arc<dyn MoodClassifier> = Arc::new(HttpMoodClassifier::new(&config.mood)?);
        Ok(Self { catalog, classifier })
    }
}

pub fn load_config(config_path: &str, debug_logs: bool) -> Result<config::Config, ServerError> {
    let mut config = config::Config::from_file(config_path)?;
    config.debug_logs = debug_logs;
    info!("Using config file: {}", config_path);
    Ok(config)
}

pub async fn run(config_path: &str, debug_logs: bool) -> Result<(), ServerError> {
    let config = load_config(config_path, debug_logs)?;
    if debug_logs {
        info!("Debug logging enabled");
    }
    info!("Catalog service at {}", config.tmdb.url);
    info!("Mood service at {}", config.mood.url);

    let clients = Clients::from_config(&config)?;

    let address = config.listen.address.as_deref().unwrap_or("[::]");
    let port = &config.listen.port;
    let addr: SocketAddr = format!("{}:{}", address, port)
        .parse()
        .map_err(|e| ServerError::Server(format!("Invalid address: {}", e)))?;

    let tls = match (&config.listen.tlscert, &config.listen.tlskey) {
        (Some(cert), Some(key)) => Some((cert.clone(), key.clone())),
        _ => None,
    };
    let refresh_interval = config.browse.refresh;

    let state = server::AppState::new(config, clients.catalog, clients.classifier);
    let browse = state.browse.clone();
    if refresh_interval > 0 {
        browse.clone().start_background_refresh(refresh_interval);
    }
    let app = server::build_router(state);

    let served = serve(app, addr, tls).await;
    browse.close();
    served
}

async fn serve(
    app: axum::Router,
    addr: SocketAddr,
    tls: Option<(String, String)>,
) -> Result<(), ServerError> {
    if let Some((cert_path, key_path)) = tls {
        info!("Loading TLS certificate from {}", cert_path);
        info!("Loading TLS key from {}", key_path);

        let tls_config = axum_server::tls_rustls::RustlsConfig::from_pem_file(&cert_path, &key_path)
            .await
            .map_err(|e| ServerError::Server(format!("Failed to load TLS config: {}", e)))?;

        info!("Serving HTTPS on {}", addr);

        let handle = axum_server::Handle::new();
        tokio::spawn({
            let handle = handle.clone();
            async move {
                shutdown_signal().await;
                handle.graceful_shutdown(Some(std::time::Duration::from_secs(10)));
            }
        });

        axum_server::bind_rustls(addr, tls_config)
            .handle(handle)
            .serve(app.into_make_service())
            .await
            .map_err(|e| ServerError::Server(format!("Server error: {}", e)))?;
    } else {
        info!("Serving HTTP on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Server(format!("Failed to bind: {}", e)))?;

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| ServerError::Server(format!("Server error: {}", e)))?;
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}
