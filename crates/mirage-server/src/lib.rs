mod auth;
mod health;

use std::net::SocketAddr;

use axum::Router;
use http::HeaderName;
use mirage_config::Config;
use tower_http::trace::TraceLayer;

/// Assembled server with all routes and middleware
pub struct Server {
    router: Router,
    listen_address: SocketAddr,
}

impl Server {
    /// Build the server from configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the image proxy cannot be initialized or the
    /// token header name is invalid
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let listen_address = config
            .server
            .listen_address
            .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 8080)));

        let imagegen_state = mirage_imagegen::build_server(config)?;

        let mut app = Router::new().route("/", axum::routing::get(health::root_handler));

        // Health check
        if config.server.health.enabled {
            app = app.route(&config.server.health.path, axum::routing::get(health::health_handler));
        }

        // Generation endpoints, gated by the shared secret when one is set
        let mut endpoints = mirage_imagegen::endpoint_router();

        if let Some(ref token) = config.auth.token {
            let header_name = HeaderName::try_from(config.auth.header_name.trim())
                .map_err(|e| anyhow::anyhow!("invalid auth.header_name: {e}"))?;
            let token = token.clone();

            endpoints = endpoints.layer(axum::middleware::from_fn(move |req, next| {
                let header_name = header_name.clone();
                let token = token.clone();
                async move { auth::token_middleware(header_name, token, req, next).await }
            }));

            tracing::debug!("token check enabled for generation endpoints");
        }

        app = app.merge(endpoints.with_state(imagegen_state.clone()));

        // Stored files
        app = app.merge(mirage_imagegen::files_router().with_state(imagegen_state));

        // Tracing
        app = app.layer(TraceLayer::new_for_http());

        Ok(Self {
            router: app,
            listen_address,
        })
    }

    /// Get the configured listen address
    #[must_use]
    pub const fn listen_address(&self) -> SocketAddr {
        self.listen_address
    }

    /// Override the listen address
    #[must_use]
    pub const fn with_listen_address(mut self, listen_address: SocketAddr) -> Self {
        self.listen_address = listen_address;
        self
    }

    /// Consume the server and return the inner router
    ///
    /// Useful for testing when the caller manages the listener
    pub fn into_router(self) -> Router {
        self.router
    }

    /// Start serving requests
    ///
    /// Blocks until the cancellation token is triggered.
    ///
    /// # Errors
    ///
    /// Returns an error if binding the TCP listener or serving fails
    pub async fn serve(self, shutdown: tokio_util::sync::CancellationToken) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.listen_address).await?;
        let local_addr = listener.local_addr()?;
        tracing::info!(%local_addr, "server listening");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                shutdown.cancelled().await;
                tracing::info!("graceful shutdown initiated");
            })
            .await?;

        Ok(())
    }
}
