//! Pixel route configuration.

use crate::api::handlers::{not_found_handler, pixel_handler};
use crate::api::middleware::tracing;
use crate::state::PixelState;
use axum::{Router, routing::any};

/// Routes serving pixels under `path`.
///
/// # Endpoints
///
/// - `{path}/{token}` - Tracking pixel, for every method
/// - anything else    - `404 Not Found` with an empty body
///
/// `path` must already be validated (see [`crate::TrackerConfig::validate`]).
pub fn pixel_routes(state: PixelState, path: &str) -> Router {
    Router::new()
        .route(&format!("{path}/{{token}}"), any(pixel_handler))
        .fallback(not_found_handler)
        .with_state(state)
        .layer(tracing::layer())
}
