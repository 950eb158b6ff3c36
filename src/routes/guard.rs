//! Request guards: admin key check and per-client rate limiting.

use axum::extract::{ConnectInfo, FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use crate::app_state::AppState;
use crate::routes::error::ApiError;

pub const API_KEY_HEADER: &str = "x-api-key";

/// Extractor that admits only callers holding the admin API key.
pub struct AdminAccess;

impl FromRequestParts<AppState> for AdminAccess {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(expected) = state.access.admin_api_key.as_deref() else {
            if state.access.production {
                tracing::error!("ADMIN_API_KEY not set; rejecting mutating request");
                return Err(ApiError::Misconfigured);
            }
            return Ok(AdminAccess);
        };

        let provided = parts
            .headers
            .get(API_KEY_HEADER)
            .and_then(|value| value.to_str().ok());

        if provided == Some(expected) {
            Ok(AdminAccess)
        } else {
            Err(ApiError::Unauthorized)
        }
    }
}

/// Client address from the socket, else `X-Forwarded-For`, else loopback.
pub fn client_ip(connect_info: Option<&ConnectInfo<SocketAddr>>, headers: &HeaderMap) -> IpAddr {
    connect_info
        .map(|info| info.0.ip())
        .or_else(|| {
            headers
                .get("x-forwarded-for")
                .and_then(|h| h.to_str().ok())
                .and_then(|s| s.split(',').next())
                .and_then(|s| s.trim().parse().ok())
        })
        .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
}

fn request_ip(req: &Request) -> IpAddr {
    client_ip(
        req.extensions().get::<ConnectInfo<SocketAddr>>(),
        req.headers(),
    )
}

/// Global ceiling applied to every route.
pub async fn limit_requests(State(state): State<AppState>, req: Request, next: Next) -> Response {
    if !state.general_limiter.check_and_increment(request_ip(&req)).await {
        return ApiError::RateLimited("Too many requests, slow down.").into_response();
    }
    next.run(req).await
}

/// Stricter ceiling for the live status endpoint, which fans out to printers.
pub async fn limit_live_requests(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    let ip = request_ip(&req);
    if !state.live_limiter.check_and_increment(ip).await {
        tracing::debug!(client = %ip, "Live status rate limit hit");
        return ApiError::RateLimited("Too many live requests, slow down.").into_response();
    }
    next.run(req).await
}
