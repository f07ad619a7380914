use axum::http::{HeaderMap, header};
use std::net::SocketAddr;

use crate::models::access_log::RequestContext;

pub const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";
pub const REAL_IP_HEADER: &str = "x-real-ip";

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}

/// Builds the audit context for a request. Proxy headers win over the peer
/// address; anything missing is recorded as "unknown".
pub fn request_context(headers: &HeaderMap, peer: Option<SocketAddr>) -> RequestContext {
    let ip_address = header_value(headers, FORWARDED_FOR_HEADER)
        .and_then(|v| v.split(',').next().map(|s| s.trim().to_string()))
        .filter(|s| !s.is_empty())
        .or_else(|| header_value(headers, REAL_IP_HEADER))
        .or_else(|| peer.map(|addr| addr.ip().to_string()));

    let user_agent = header_value(headers, header::USER_AGENT.as_str());

    RequestContext::new(ip_address, user_agent)
}

pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
}
