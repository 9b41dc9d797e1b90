//! Response construction.
//!
//! # Responsibilities
//! - Turn a `RedirectDecision` into an HTTP response
//! - 302 with `Location` for redirects, 404 plain text otherwise
//!
//! # Design Decisions
//! - Clients never see load or parse errors, only a redirect or a 404
//! - Destinations are sent verbatim; the loader already rejected values
//!   that cannot be header values

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::routing::RedirectDecision;

pub const NOT_FOUND_BODY: &str = "not found\n";

impl IntoResponse for RedirectDecision {
    fn into_response(self) -> Response {
        let status = self.status();
        match self.destination().map(|dest| HeaderValue::from_bytes(dest.as_bytes())) {
            Some(Ok(location)) => (status, [(header::LOCATION, location)]).into_response(),
            Some(Err(_)) => {
                tracing::error!(status = %status, "Destination is not a valid header value");
                not_found()
            }
            None => not_found(),
        }
    }
}

fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        NOT_FOUND_BODY,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn found_sets_location() {
        let response = RedirectDecision::Found("http://example.com/foo".into()).into_response();
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()[header::LOCATION], "http://example.com/foo");
    }

    #[test]
    fn default_redirect_sets_location() {
        let response = RedirectDecision::DefaultRedirect("http://fallback.test".into()).into_response();
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()[header::LOCATION], "http://fallback.test");
    }

    #[tokio::test]
    async fn not_found_is_plain_text() {
        let response = RedirectDecision::NotFound.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.headers().get(header::LOCATION).is_none());

        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"not found\n");
    }
}
