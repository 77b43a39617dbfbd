//! Handler for tracking pixel requests.

use axum::{
    extract::{ConnectInfo, Path, Request, State, rejection::PathRejection},
    http::{HeaderMap, Method, StatusCode, header},
    response::{IntoResponse, Response},
};
use std::net::SocketAddr;
use tracing::debug;

use crate::domain::open_event::OpenEvent;
use crate::state::PixelState;

/// 1x1 transparent GIF89a.
pub const PIXEL_GIF: &[u8] = &[
    0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x01, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00,
    0x00, 0xff, 0xff, 0xff, 0x21, 0xf9, 0x04, 0x01, 0x00, 0x00, 0x00, 0x00, 0x2c, 0x00, 0x00,
    0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00, 0x02, 0x01, 0x44, 0x00, 0x3b,
];

const NO_CACHE: &str = "no-store, no-cache, must-revalidate, max-age=0";

/// Serves the tracking pixel and reports the open.
///
/// # Endpoint
///
/// `{path}/{token}`, any method
///
/// # Request Flow
///
/// 1. Reject traversal-looking tokens with 404, before decoding
/// 2. Decode the token into an identifier
/// 3. On success, queue an [`OpenEvent`] with the request time, remote
///    address and `User-Agent`, keyed by the client connection so callbacks
///    for one connection run in order (`HEAD` requests are not opens)
/// 4. Return `200 image/gif` with the pixel
///
/// # Errors
///
/// None are surfaced: undecodable tokens still get the pixel so mail
/// clients never render a broken image. Dispatch is fire-and-forget.
pub async fn pixel_handler(
    State(state): State<PixelState>,
    token: Result<Path<String>, PathRejection>,
    request: Request,
) -> Response {
    let token = match token {
        Ok(Path(token)) => token,
        Err(rejection) => {
            debug!("Unreadable pixel token: {}", rejection);
            metrics::counter!("mail_tracker_invalid_tokens_total").increment(1);
            return pixel_response();
        }
    };

    if is_traversal(&token) {
        return StatusCode::NOT_FOUND.into_response();
    }

    let Some(id) = state.codec.decode(&token) else {
        debug!(token = %token, "Pixel requested with an unknown token");
        metrics::counter!("mail_tracker_invalid_tokens_total").increment(1);
        return pixel_response();
    };

    if *request.method() == Method::HEAD {
        return pixel_response();
    }

    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let headers = request.headers();

    let event = OpenEvent::new(
        id,
        remote_address(headers, peer, state.behind_proxy),
        headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok()),
    );

    debug!(id = %event.id, remote = %event.remote_address, "Pixel opened");
    metrics::counter!("mail_tracker_opens_total").increment(1);
    state.dispatcher.dispatch(peer, event);

    pixel_response()
}

/// Answers any path outside the pixel route. No body, so nothing leaks.
pub async fn not_found_handler() -> StatusCode {
    StatusCode::NOT_FOUND
}

fn pixel_response() -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "image/gif"),
            (header::CACHE_CONTROL, NO_CACHE),
            (header::PRAGMA, "no-cache"),
            (header::EXPIRES, "0"),
        ],
        PIXEL_GIF,
    )
        .into_response()
}

/// True for tokens no link could contain: `.`/`..` segments, separators,
/// or an empty segment.
fn is_traversal(token: &str) -> bool {
    token.is_empty() || token.contains("..") || token.contains(['/', '\\']) || token == "."
}

/// Remote address of the mail client.
///
/// Behind a trusted proxy, the first `X-Forwarded-For` hop (or `X-Real-IP`)
/// wins over the socket peer.
fn remote_address(headers: &HeaderMap, peer: Option<SocketAddr>, behind_proxy: bool) -> String {
    if behind_proxy {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty());

        let real_ip = headers
            .get("x-real-ip")
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty());

        if let Some(addr) = forwarded.or(real_ip) {
            return addr.to_string();
        }
    }

    peer.map(|addr| addr.ip().to_string()).unwrap_or_default()
}
