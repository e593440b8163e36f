//! Request tracing middleware

use std::time::Instant;

use axum::{
    extract::Request,
    http::HeaderValue,
    middleware::Next,
    response::Response,
};
use tracing::Instrument;
use uuid::Uuid;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Log each request inside a span tagged with a fresh request id
pub async fn request_tracing(request: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let span = tracing::info_span!("request", %request_id, %method, %path);
    let start = Instant::now();

    let mut response = next.run(request).instrument(span.clone()).await;

    let duration_ms = start.elapsed().as_millis() as u64;
    let status = response.status().as_u16();
    let _entered = span.enter();

    if response.status().is_server_error() {
        tracing::error!(status, duration_ms, "Request completed with error");
    } else if response.status().is_client_error() {
        tracing::warn!(status, duration_ms, "Request completed with client error");
    } else {
        tracing::info!(status, duration_ms, "Request completed");
    }

    if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    response
}
