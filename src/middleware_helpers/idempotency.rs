use crate::services::idempotency::{Claim, IdempotencyService, StoredResponse};
use axum::{
    body::Body,
    extract::{Request, State},
    http::{header::CONTENT_TYPE, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use http_body_util::BodyExt as _;
use tracing::{debug, warn};

pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";
const MAX_KEY_LEN: usize = 255;

/// Replays the stored response when a POST repeats an `Idempotency-Key`.
/// Requests without the header pass through untouched. The key is claimed
/// before the handler runs, so a concurrent duplicate gets a conflict rather
/// than a second execution. Server errors release the claim so the client
/// can retry them.
pub async fn idempotency_middleware(
    State(service): State<IdempotencyService>,
    req: Request,
    next: Next,
) -> Response {
    if req.method() != Method::POST {
        return next.run(req).await;
    }
    let Some(key) = req
        .headers()
        .get(IDEMPOTENCY_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
    else {
        return next.run(req).await;
    };
    if key.len() > MAX_KEY_LEN {
        return crate::errors::ServiceError::validation(
            IDEMPOTENCY_KEY_HEADER,
            format!("Idempotency key must be at most {} characters", MAX_KEY_LEN),
        )
        .into_response();
    }

    let fingerprint = format!("{} {}", req.method(), req.uri().path());
    match service.claim(&key, &fingerprint).await {
        Ok(Claim::Replay(stored)) => {
            debug!(%key, "Replaying stored response");
            return replay(stored);
        }
        Ok(Claim::Acquired) => {}
        Err(e) => return e.into_response(),
    }

    let response = next.run(req).await;
    if response.status().is_server_error() {
        release(&service, &key).await;
        return response;
    }

    let (parts, body) = response.into_parts();
    let bytes = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!(error = %e, "Could not buffer response for idempotency");
            release(&service, &key).await;
            return Response::from_parts(parts, Body::empty());
        }
    };

    match std::str::from_utf8(&bytes) {
        Ok(text) => {
            let stored = StoredResponse {
                status_code: parts.status.as_u16(),
                body: text.to_string(),
                content_type: parts
                    .headers
                    .get(CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string),
            };
            if let Err(e) = service.complete(&key, stored).await {
                warn!(%key, error = %e, "Failed to record idempotent response");
            }
        }
        Err(_) => {
            debug!(%key, "Response body is not UTF-8; not recorded");
            release(&service, &key).await;
        }
    }

    Response::from_parts(parts, Body::from(bytes))
}

async fn release(service: &IdempotencyService, key: &str) {
    if let Err(e) = service.release(key).await {
        warn!(%key, error = %e, "Failed to release idempotency key");
    }
}

fn replay(stored: StoredResponse) -> Response {
    let mut response = Response::new(Body::from(stored.body));
    *response.status_mut() = StatusCode::from_u16(stored.status_code).unwrap_or(StatusCode::OK);
    if let Some(ct) = stored
        .content_type
        .and_then(|ct| HeaderValue::from_str(&ct).ok())
    {
        response.headers_mut().insert(CONTENT_TYPE, ct);
    }
    response
        .headers_mut()
        .insert("idempotent-replay", HeaderValue::from_static("true"));
    response
}
