//! HTTP handlers.

use axum::{
    extract::{Path, State},
    http::{Method, StatusCode, Uri, header},
    response::{IntoResponse, Response},
};
use bindicator_core::{ErrorKind, PortError, PropertyCollections, PropertyId, get_or_compute};
use tracing::{info, warn};

use crate::app::AppState;

/// A [`PortError`] rendered as a plain-text HTTP error.
#[derive(Debug)]
pub(crate) struct ApiError(PortError);

impl From<PortError> for ApiError {
    fn from(err: PortError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0.kind() {
            ErrorKind::NotFound | ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::Upstream => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.0.to_string()).into_response()
    }
}

pub(crate) async fn health() -> &'static str {
    "ok"
}

pub(crate) async fn missing_property_id() -> (StatusCode, &'static str) {
    (StatusCode::BAD_REQUEST, "URL did not include property_id")
}

pub(crate) async fn missing_postcode() -> (StatusCode, &'static str) {
    (StatusCode::BAD_REQUEST, "URL did not include postcode")
}

/// `GET /property/{id}`: next collection of every bin at the property.
pub(crate) async fn property(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let key = request_key(&method, &uri);
    let property = PropertyId(id);

    let body = get_or_compute(state.responses.as_ref(), &key, || async {
        let result = state.service.aggregate(&property).await?;
        info!(%property, bins = result.bins.len(), "aggregated property");
        let body = PropertyCollections::assemble(result, &state.timezone);
        serde_json::to_string(&body).map_err(|err| PortError::Internal(err.to_string()))
    })
    .await
    .inspect_err(|err| warn!(%property, error = %err, "aggregation failed"))?;

    Ok(json(body))
}

/// `GET /addresses/{postcode}`: addresses within a served postcode.
pub(crate) async fn addresses(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    Path(postcode): Path<String>,
) -> Result<Response, ApiError> {
    let key = request_key(&method, &uri);

    let body = get_or_compute(state.responses.as_ref(), &key, || async {
        let addresses = state.addresses.search(&postcode).await?;
        serde_json::to_string(&addresses).map_err(|err| PortError::Internal(err.to_string()))
    })
    .await
    .inspect_err(|err| warn!(%postcode, error = %err, "address search failed"))?;

    Ok(json(body))
}

fn json(body: String) -> Response {
    ([(header::CONTENT_TYPE, "application/json")], body).into_response()
}

/// Identity of a request for the response cache: method, path without a
/// trailing slash, and query pairs in sorted order.
fn request_key(method: &Method, uri: &Uri) -> String {
    let path = uri.path();
    let path = if path.len() > 1 {
        path.trim_end_matches('/')
    } else {
        path
    };

    let mut pairs: Vec<&str> = uri
        .query()
        .unwrap_or_default()
        .split('&')
        .filter(|pair| !pair.is_empty())
        .collect();
    pairs.sort_unstable();

    if pairs.is_empty() {
        format!("{method} {path}")
    } else {
        format!("{method} {path}?{}", pairs.join("&"))
    }
}
