//! Network segment derivation.
//!
//! The caller's observed address stands in for "same local network". Devices
//! behind one NAT share a public address, so they group together. This is a
//! grouping heuristic only: headers are client-controlled and nothing here
//! authenticates anyone.

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Request};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;

const UNKNOWN_NETWORK: &str = "unknown";

/// Coarse grouping key for discovery, resolved once per request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkId(pub String);

impl NetworkId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// First `X-Forwarded-For` entry, then `X-Real-IP`, then the TCP peer.
pub fn resolve_network_id(headers: &HeaderMap, peer: Option<SocketAddr>) -> NetworkId {
    let forwarded = header_text(headers, "x-forwarded-for")
        .and_then(|value| value.split(',').next().map(str::trim).map(str::to_string))
        .filter(|value| !value.is_empty());
    let real_ip = || header_text(headers, "x-real-ip").map(|value| value.trim().to_string());

    let id = forwarded
        .or_else(real_ip)
        .filter(|value| !value.is_empty())
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| UNKNOWN_NETWORK.to_string());
    NetworkId(id)
}

fn header_text<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

/// Attach a [`NetworkId`] extension for downstream handlers
pub async fn attach_network_id(mut request: Request, next: Next) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0);
    let network_id = resolve_network_id(request.headers(), peer);
    request.extensions_mut().insert(network_id);
    next.run(request).await
}
