//! Response header assembly for object and preflight responses.

use axum::http::header::{self, HeaderMap, HeaderName, HeaderValue};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use reelgate_core::{CACHE_MAX_AGE_SECS, PREFLIGHT_MAX_AGE_SECS, ServedRange, content_type_for};
use reelgate_storage::ObjectMeta;

pub const ALLOWED_METHODS: &str = "GET, HEAD, OPTIONS";
pub const PREFLIGHT_ALLOW_HEADERS: &str = "Range, Content-Type";
pub const OBJECT_ALLOW_HEADERS: &str = "Range";
pub const EXPOSE_HEADERS: &str = "Content-Length, Content-Range, Accept-Ranges";

/// Response to any `OPTIONS` request.
pub fn preflight_response() -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOWED_METHODS),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(PREFLIGHT_ALLOW_HEADERS),
    );
    headers.insert(
        header::ACCESS_CONTROL_MAX_AGE,
        HeaderValue::from(PREFLIGHT_MAX_AGE_SECS),
    );
    (StatusCode::NO_CONTENT, headers).into_response()
}

/// CORS headers carried by every object response.
pub fn apply_cors(headers: &mut HeaderMap) {
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOWED_METHODS),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(OBJECT_ALLOW_HEADERS),
    );
    headers.insert(
        header::ACCESS_CONTROL_EXPOSE_HEADERS,
        HeaderValue::from_static(EXPOSE_HEADERS),
    );
}

/// Insert a header whose value came from storage. Values that are not valid
/// header text are dropped.
fn insert_text(headers: &mut HeaderMap, name: HeaderName, value: &str) {
    match HeaderValue::from_str(value) {
        Ok(value) => {
            headers.insert(name, value);
        }
        Err(_) => tracing::warn!(header = %name, "dropping invalid stored header value"),
    }
}

/// Headers for a full (`range == None`) or partial object response.
pub fn object_headers(path: &str, meta: &ObjectMeta, range: Option<ServedRange>) -> HeaderMap {
    let mut headers = HeaderMap::new();

    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(content_type_for(path)),
    );

    match range {
        Some(range) => {
            insert_text(&mut headers, header::CONTENT_RANGE, &range.content_range(meta.size));
            headers.insert(header::CONTENT_LENGTH, HeaderValue::from(range.length));
        }
        None => {
            headers.insert(header::CONTENT_LENGTH, HeaderValue::from(meta.size));
        }
    }

    headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
    insert_text(
        &mut headers,
        header::CACHE_CONTROL,
        &format!("public, max-age={CACHE_MAX_AGE_SECS}"),
    );
    insert_text(&mut headers, header::ETAG, &meta.etag);

    apply_cors(&mut headers);

    if let Some(disposition) = &meta.attributes.content_disposition {
        insert_text(&mut headers, header::CONTENT_DISPOSITION, disposition);
    }
    if let Some(encoding) = &meta.attributes.content_encoding {
        insert_text(&mut headers, header::CONTENT_ENCODING, encoding);
    }

    headers
}
