//! Shared handler state and the route table.

use std::sync::Arc;

use axum::{Router, routing::get};
use bindicator_core::{AddressPort, CollectionService, ResultCache};
use chrono_tz::Tz;
use tower_http::trace::TraceLayer;

use crate::routes;

/// State handed to every request.
#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) service: Arc<CollectionService>,
    pub(crate) addresses: Arc<dyn AddressPort>,
    /// Serialized response bodies keyed by request identity.
    pub(crate) responses: Arc<dyn ResultCache<String>>,
    pub(crate) timezone: Tz,
}

/// Build the router. Trailing slashes are trimmed before it sees a request.
pub(crate) fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/property", get(routes::missing_property_id))
        .route("/property/{id}", get(routes::property))
        .route("/addresses", get(routes::missing_postcode))
        .route("/addresses/{postcode}", get(routes::addresses))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
