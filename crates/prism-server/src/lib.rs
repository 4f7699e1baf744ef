#![allow(clippy::must_use_candidate)]

mod cors;
mod liveness;

use std::{any::Any, net::SocketAddr, sync::Arc, time::Instant};

use axum::{
    Json, Router,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use prism_config::Config;
use prism_imagegen::{ErrorBody, ErrorKind, ImageGenError};
use serde::Serialize;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};

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
    /// Returns an error if the image generation subsystem fails to initialize
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let listen_address = config.server.bind_address();
        let environment = config.server.environment;

        let imagegen_state = prism_imagegen::build_server(config)?;

        let mut app = Router::new();
        let mut endpoints: Vec<&'static str> = Vec::new();

        // Liveness
        let liveness_state = liveness::LivenessState {
            started: Instant::now(),
            environment,
            imagegen: Arc::clone(&imagegen_state),
        };
        let mut liveness = Router::new();
        if config.server.liveness.info {
            liveness = liveness.route("/", get(liveness::info_handler));
            endpoints.push("GET /");
        }
        if config.server.liveness.ping {
            liveness = liveness.route("/ping", get(liveness::ping_handler));
            endpoints.push("GET /ping");
        }
        app = app.merge(liveness.with_state(liveness_state));

        // Image generation routes
        app = app.merge(prism_imagegen::endpoint_router().with_state(imagegen_state));
        endpoints.extend_from_slice(prism_imagegen::ENDPOINTS);

        // Unknown routes, and known routes called with the wrong method
        let endpoints = Arc::new(endpoints);
        let wrong_method_endpoints = Arc::clone(&endpoints);
        app = app
            .method_not_allowed_fallback(move || not_found(Arc::clone(&wrong_method_endpoints)))
            .fallback(move || not_found(Arc::clone(&endpoints)));

        // Apply middleware layers (innermost first)

        // Panics become a structured 500
        app = app.layer(catch_panic_layer(environment.is_development()));

        // Tracing
        app = app.layer(TraceLayer::new_for_http());

        // CORS
        if let Some(ref cors_config) = config.server.cors {
            app = app.layer(cors::cors_layer(cors_config));
        }

        tracing::info!(
            environment = environment.as_str(),
            upstream = %config.imagegen.base_url,
            "server configured"
        );

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

    /// Override the address to bind to
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

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NotFoundBody<'a> {
    #[serde(flatten)]
    body: ErrorBody,
    available_endpoints: &'a [&'static str],
}

#[allow(clippy::unused_async)]
async fn not_found(endpoints: Arc<Vec<&'static str>>) -> Response {
    let body = NotFoundBody {
        body: ErrorBody::new(ErrorKind::NotFound, "Endpoint not found"),
        available_endpoints: endpoints.as_slice(),
    };

    (StatusCode::NOT_FOUND, Json(body)).into_response()
}

/// Turn handler panics into a structured 500
fn catch_panic_layer(
    expose_details: bool,
) -> CatchPanicLayer<impl Fn(Box<dyn Any + Send + 'static>) -> Response + Clone + Send + Sync + 'static> {
    CatchPanicLayer::custom(move |panic: Box<dyn Any + Send + 'static>| panic_response(&*panic, expose_details))
}

fn panic_response(panic: &(dyn Any + Send), expose_details: bool) -> Response {
    let message = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");

    tracing::error!(panic = message, "request handler panicked");

    ImageGenError::Unexpected {
        detail: expose_details.then(|| format!("handler panicked: {message}")),
    }
    .into_response()
}
