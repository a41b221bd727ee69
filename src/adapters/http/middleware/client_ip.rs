//! Client address resolution.

use std::net::{IpAddr, SocketAddr};

use axum::http::HeaderMap;

/// Resolves the address of the client that sent a request.
///
/// With `trust_forwarded_for`, the first `X-Forwarded-For` entry wins, then
/// `X-Real-IP`; unparseable header values fall through to the socket peer.
/// Without it, only the socket peer is used.
pub fn client_ip(
    headers: &HeaderMap,
    peer: Option<SocketAddr>,
    trust_forwarded_for: bool,
) -> Option<IpAddr> {
    if trust_forwarded_for {
        let forwarded = headers
            .get("X-Forwarded-For")
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.split(',').next())
            .and_then(|first| first.trim().parse().ok());
        if forwarded.is_some() {
            return forwarded;
        }

        let real_ip = headers
            .get("X-Real-IP")
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.trim().parse().ok());
        if real_ip.is_some() {
            return real_ip;
        }
    }

    peer.map(|addr| addr.ip())
}
