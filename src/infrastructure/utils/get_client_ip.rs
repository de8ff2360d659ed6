use std::net::IpAddr;

use actix_web::HttpRequest;

/// Identity used to key the contact rate limiter: the client's IP address.
///
/// With `trust_x_forwarded_for` the first entry of `X-Forwarded-For` wins, but only
/// when it parses as an IP address; anything else falls back to the peer address.
pub fn get_client_ip(req: &HttpRequest, trust_x_forwarded_for: bool) -> String {
    if trust_x_forwarded_for {
        if let Some(ip) = forwarded_ip(req) {
            return ip.to_string();
        }
    }
    req.peer_addr()
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn forwarded_ip(req: &HttpRequest) -> Option<IpAddr> {
    req.headers()
        .get("x-forwarded-for")?
        .to_str()
        .ok()?
        .split(',')
        .next()?
        .trim()
        .parse()
        .ok()
}
