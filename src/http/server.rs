//! HTTP server setup.
//!
//! # Responsibilities
//! - Build the Axum router for the public, signed-in and dashboard surfaces
//! - Wire up middleware (tracing, request ID, timeout, body limit, headers)
//! - Serve on a plain or TLS listener until shutdown
//! - Apply configuration updates from the watcher while serving

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::HeaderName;
use axum::middleware;
use axum::routing::{get, post, put};
use axum::Router;
use axum_server::tls_rustls::RustlsConfig;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::watcher::apply_updates;
use crate::config::GuardConfig;
use crate::http::handlers::{self, auth, contact, dashboard};
use crate::http::middleware::{require_csrf, require_session, security_layer};
use crate::http::request::X_REQUEST_ID;
use crate::state::GuardState;

/// Grace period for in-flight TLS connections on shutdown.
const TLS_DRAIN_SECS: u64 = 10;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub guard: Arc<GuardState>,
}

/// HTTP server for the guard.
pub struct GuardServer {
    router: Router,
    guard: Arc<GuardState>,
}

impl GuardServer {
    pub fn new(guard: Arc<GuardState>) -> Self {
        let router = Self::build_router(AppState {
            guard: guard.clone(),
        });
        Self { router, guard }
    }

    /// The router with every layer applied, for in-process tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Build the Axum router with all middleware layers. Timeout and body
    /// limit are fixed when the router is built.
    #[allow(deprecated)]
    fn build_router(state: AppState) -> Router {
        let config = state.guard.config();
        let request_id = HeaderName::from_static(X_REQUEST_ID);

        let dashboard = Router::new()
            .route("/api/dashboard/announcements", get(dashboard::announcements))
            .route("/api/dashboard/grades", get(dashboard::grades))
            .route("/api/dashboard/schedule", get(dashboard::schedule))
            .route("/api/dashboard/activity", get(dashboard::activity))
            .route(
                "/api/dashboard/grade-requests",
                get(dashboard::latest_request).post(dashboard::create_request),
            )
            .route("/api/dashboard/profile", put(dashboard::profile))
            .route(
                "/api/dashboard/theme",
                get(dashboard::theme).put(dashboard::set_theme_preference),
            )
            .layer(middleware::from_fn_with_state(state.clone(), require_csrf));

        let signed_in = Router::new()
            .route("/api/auth/session", get(auth::session))
            .merge(dashboard)
            .layer(middleware::from_fn_with_state(state.clone(), require_session));

        let public = Router::new()
            .route("/health", get(handlers::health))
            .route("/api/csrf", get(handlers::issue_csrf))
            .route("/api/contact", post(contact::submit))
            .route("/api/auth/login", post(auth::login))
            .route("/api/auth/logout", post(auth::logout))
            .route("/api/auth/strength", post(auth::strength));

        Router::new()
            .merge(signed_in)
            .merge(public)
            .layer(middleware::from_fn_with_state(state.clone(), security_layer))
            .layer(RequestBodyLimitLayer::new(config.security.max_body_size))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::new(request_id.clone()))
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid))
            .with_state(state)
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        config_updates: mpsc::UnboundedReceiver<GuardConfig>,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        tokio::spawn(apply_updates(
            self.guard.clone(),
            config_updates,
            shutdown_rx.resubscribe(),
        ));

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
                tracing::info!("HTTP server draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Run the server over TLS on `addr`.
    pub async fn run_tls(
        self,
        addr: SocketAddr,
        tls: RustlsConfig,
        config_updates: mpsc::UnboundedReceiver<GuardConfig>,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        tracing::info!(address = %addr, "HTTPS server starting");

        tokio::spawn(apply_updates(
            self.guard.clone(),
            config_updates,
            shutdown_rx.resubscribe(),
        ));

        let handle = axum_server::Handle::new();
        let drain = handle.clone();
        tokio::spawn(async move {
            let _ = shutdown_rx.recv().await;
            tracing::info!("HTTPS server draining connections");
            drain.graceful_shutdown(Some(Duration::from_secs(TLS_DRAIN_SECS)));
        });

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum_server::bind_rustls(addr, tls)
            .handle(handle)
            .serve(app)
            .await?;

        tracing::info!("HTTPS server stopped");
        Ok(())
    }
}
