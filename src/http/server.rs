//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Fold the route table and chains into one endpoint
//! - Hand every request to that endpoint through an Axum fallback
//! - Serve plain HTTP or TLS until shutdown is signalled

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Request, State};
use axum::response::Response;
use axum_server::tls_rustls::RustlsConfig;
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use crate::handlers::AppState;
use crate::http::context::Context;
use crate::http::middleware::Endpoint;
use crate::http::routes::routes;

/// In-flight requests get this long to finish once TLS shutdown starts.
const TLS_DRAIN: Duration = Duration::from_secs(10);

/// HTTP server for the application.
pub struct HttpServer {
    app: axum::Router,
}

impl HttpServer {
    /// Build the server. Chains and routes are folded once, here.
    pub fn new(state: Arc<AppState>) -> Self {
        let app = Self::build_router(routes(&state));
        Self { app }
    }

    fn build_router(pipeline: Arc<dyn Endpoint>) -> axum::Router {
        axum::Router::new().fallback(dispatch).with_state(pipeline)
    }

    /// Serve plain HTTP on `listener` until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self.app.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Serve HTTPS on `addr` until `shutdown` fires.
    pub async fn run_tls(
        self,
        addr: SocketAddr,
        tls: RustlsConfig,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        tracing::info!(address = %addr, "HTTPS server starting");

        let handle = axum_server::Handle::new();
        let on_shutdown = handle.clone();
        tokio::spawn(async move {
            let _ = shutdown.recv().await;
            tracing::info!("Shutdown signal received");
            on_shutdown.graceful_shutdown(Some(TLS_DRAIN));
        });

        axum_server::bind_rustls(addr, tls)
            .handle(handle)
            .serve(self.app.into_make_service_with_connect_info::<SocketAddr>())
            .await?;

        tracing::info!("HTTPS server stopped");
        Ok(())
    }
}

/// Axum fallback: every request enters the pipeline here.
async fn dispatch(State(pipeline): State<Arc<dyn Endpoint>>, request: Request) -> Response {
    pipeline.call(Context::new(request)).await
}
