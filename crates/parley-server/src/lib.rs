//! HTTP server assembling the chat routes and middleware

mod cors;
mod health;
mod request_context;

use std::net::SocketAddr;

use axum::Router;
use parley_chat::{ChatState, chat_router};
use parley_config::Config;
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
    /// Returns an error if the chat provider or function calling cannot be
    /// initialized
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let listen_address = config
            .server
            .listen_address
            .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

        let chat_state = ChatState::from_config(&config).await?;

        let mut app = chat_router(chat_state);

        if config.server.health.enabled {
            app = app.route(&config.server.health.path, axum::routing::get(health::health_handler));
        }

        // Innermost first
        let identity = config.server.identity.clone();
        app = app.layer(axum::middleware::from_fn(move |req, next| {
            request_context::request_context_middleware(identity.clone(), req, next)
        }));

        app = app.layer(TraceLayer::new_for_http());

        if let Some(ref cors_config) = config.server.cors {
            app = app.layer(cors::cors_layer(cors_config));
        }

        Ok(Self {
            router: app,
            listen_address,
        })
    }

    /// Configured listen address
    #[must_use]
    pub const fn listen_address(&self) -> SocketAddr {
        self.listen_address
    }

    /// Consume the server and return the inner router
    pub fn into_router(self) -> Router {
        self.router
    }

    /// Serve until the cancellation token fires
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
