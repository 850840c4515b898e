//! Mistral relay - a minimal server-side chat-completion relay
//!
//! Browser clients post `{"messages": [...]}` to the relay; the relay adds the server-held
//! provider key, forwards the conversation to the upstream chat-completion endpoint with fixed
//! model parameters, and hands the upstream answer back with cross-origin headers for the front
//! end.

use axum::Router;
use axum::routing::any;
use std::sync::Arc;
use tracing::{info, instrument};

pub mod auth;
pub mod client;
pub mod cors;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod upstream;

use client::{HttpClient, HyperClient, PoolSettings};
use cors::CorsPolicy;
use handlers::relay_handler;
use upstream::Upstream;

/// Path the relay is served on.
pub const RELAY_PATH: &str = "/api/mistral-proxy";

/// The main application state containing the HTTP client and upstream configuration
#[derive(Clone, Debug)]
pub struct AppState<T: HttpClient> {
    pub http_client: T,
    pub upstream: Arc<Upstream>,
    pub cors: CorsPolicy,
}

impl AppState<HyperClient> {
    /// Create a new AppState with the default Hyper client
    pub fn new(upstream: Upstream, pool: &PoolSettings) -> Self {
        let http_client = client::create_hyper_client(pool);
        Self::with_client(upstream, http_client)
    }
}

impl<T: HttpClient> AppState<T> {
    /// Create a new AppState with a custom HTTP client (useful for testing)
    pub fn with_client(upstream: Upstream, http_client: T) -> Self {
        Self {
            http_client,
            upstream: Arc::new(upstream),
            cors: CorsPolicy::default(),
        }
    }

    /// Replace the cross-origin policy.
    pub fn with_cors(mut self, cors: CorsPolicy) -> Self {
        self.cors = cors;
        self
    }
}

/// Build the main router for the relay.
///
/// Every method on [`RELAY_PATH`] reaches the relay handler, which decides between preflight,
/// rejection and relaying. Cross-origin headers are added to every response.
#[instrument(skip(state))]
pub fn build_router<T: HttpClient + Clone + Send + Sync + 'static>(state: AppState<T>) -> Router {
    info!("Building router");
    let cors = state.cors.clone();
    let router = Router::new()
        .route(RELAY_PATH, any(relay_handler::<T>))
        .with_state(state);
    cors::with_cors(router, &cors)
}
