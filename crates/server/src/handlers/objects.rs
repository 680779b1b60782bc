//! The object proxy.
//!
//! Every request that does not hit an explicit route lands in
//! [`proxy_request`], which triages it in a fixed order: preflight, health,
//! method check, access pipeline, then the storage read.

use crate::error::{ApiError, ApiResult};
use crate::handlers::health::{health_check, is_health_path};
use crate::headers::{object_headers, preflight_response};
use crate::metrics;
use crate::policy::{AccessRequest, UNREADABLE_REFERER};
use crate::state::AppState;
use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{Method, StatusCode, header};
use axum::response::{IntoResponse, Response};
use futures::StreamExt;
use percent_encoding::percent_decode_str;
use reelgate_core::ByteRange;

/// Object key for a request path: leading `/` removed, percent-decoded.
pub fn object_path(uri_path: &str) -> ApiResult<String> {
    let raw = uri_path.strip_prefix('/').unwrap_or(uri_path);
    percent_decode_str(raw)
        .decode_utf8()
        .map(|p| p.into_owned())
        .map_err(|_| ApiError::BadRequest("request path is not valid UTF-8".to_string()))
}

/// Fallback handler serving every object path.
pub async fn proxy_request(State(state): State<AppState>, req: Request) -> Response {
    let response = triage(&state, req).await;
    metrics::record_outcome(response.status());
    response
}

async fn triage(state: &AppState, req: Request) -> Response {
    let method = req.method().clone();
    if method == Method::OPTIONS {
        return preflight_response();
    }

    let path = match object_path(req.uri().path()) {
        Ok(path) => path,
        Err(e) => return e.into_response(),
    };

    if is_health_path(&path) {
        return health_check(state).into_response();
    }

    if method != Method::GET && method != Method::HEAD {
        return ApiError::MethodNotAllowed.into_response();
    }

    let decision = {
        let referer = req
            .headers()
            .get(header::REFERER)
            .map(|v| v.to_str().unwrap_or(UNREADABLE_REFERER));
        state.access.evaluate(&AccessRequest {
            path: &path,
            query: req.uri().query(),
            referer,
        })
    };
    if !decision.authorized {
        tracing::debug!(path = %path, reason = %decision.reason, "access denied");
        metrics::record_denial(decision.reason);
        return ApiError::Forbidden.into_response();
    }

    // Unsupported or malformed ranges are ignored and the full body is served.
    let range = req
        .headers()
        .get(header::RANGE)
        .and_then(|v| v.to_str().ok())
        .and_then(ByteRange::parse_header);

    let result = if method == Method::HEAD {
        head_object(state, &path, range).await
    } else {
        get_object(state, &path, range).await
    };

    result.unwrap_or_else(IntoResponse::into_response)
}

/// GET: stream the object, or the requested part of it.
async fn get_object(state: &AppState, path: &str, range: Option<ByteRange>) -> ApiResult<Response> {
    let result = state.storage.get(path, range).await?;

    let status = if result.range.is_some() {
        StatusCode::PARTIAL_CONTENT
    } else {
        StatusCode::OK
    };
    let headers = object_headers(path, &result.meta, result.range);
    metrics::BYTES_SERVED.inc_by(result.content_length());

    tracing::debug!(
        key = %path,
        status = status.as_u16(),
        bytes = result.content_length(),
        "serving object"
    );

    let key = path.to_string();
    let body = result.body.map(move |chunk| {
        chunk.map_err(|e| {
            tracing::error!(key = %key, error = %e, "object stream failed mid-transfer");
            std::io::Error::other(e.to_string())
        })
    });

    Ok((status, headers, Body::from_stream(body)).into_response())
}

/// HEAD: same headers as GET, no body and no content read.
async fn head_object(
    state: &AppState,
    path: &str,
    range: Option<ByteRange>,
) -> ApiResult<Response> {
    let meta = state.storage.head(path).await?;

    let served = match range {
        Some(range) => Some(
            range
                .resolve(meta.size)
                .ok_or(ApiError::RangeNotSatisfiable { size: meta.size })?,
        ),
        None => None,
    };
    let status = if served.is_some() {
        StatusCode::PARTIAL_CONTENT
    } else {
        StatusCode::OK
    };

    Ok((status, object_headers(path, &meta, served), Body::empty()).into_response())
}
