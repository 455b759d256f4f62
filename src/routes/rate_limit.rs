use axum::http::Request;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;
use tower_governor::{key_extractor::KeyExtractor, GovernorError};

/// Rate-limit key: the client address.
///
/// Tries X-Forwarded-For, X-Real-IP, the peer address, then localhost. The
/// API key is not part of the key: it is unverified at this point, and a
/// caller could mint a fresh bucket per request by varying it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientIpExtractor;

impl KeyExtractor for ClientIpExtractor {
    type Key = IpAddr;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        Ok(client_ip(req))
    }
}

fn client_ip<T>(req: &Request<T>) -> IpAddr {
    let headers = req.headers();

    if let Some(ip) = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|first| first.trim().parse::<IpAddr>().ok())
    {
        return ip;
    }

    if let Some(ip) = headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<IpAddr>().ok())
    {
        return ip;
    }

    if let Some(connect_info) = req
        .extensions()
        .get::<axum::extract::ConnectInfo<SocketAddr>>()
    {
        return connect_info.0.ip();
    }

    // Requests without an identifiable address share one bucket
    IpAddr::V4(Ipv4Addr::LOCALHOST)
}

/// Time to replenish one request at `per_second` requests per second.
///
/// `GovernorConfigBuilder::per_second` takes a period in seconds, not a rate,
/// so quotas are built from this period instead.
#[must_use]
pub fn replenish_period(per_second: u64) -> Duration {
    Duration::from_nanos(1_000_000_000 / per_second.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::extract::ConnectInfo;

    fn request(headers: &[(&str, &str)]) -> Request<Body> {
        let mut builder = Request::builder().uri("/api/dashboard");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(Body::empty()).unwrap()
    }

    fn localhost() -> IpAddr {
        IpAddr::V4(Ipv4Addr::LOCALHOST)
    }

    #[test]
    fn api_key_does_not_change_the_bucket() {
        let a = request(&[("x-api-key", "bogus0")]);
        let b = request(&[("x-api-key", "bogus1")]);
        assert_eq!(
            ClientIpExtractor.extract(&a).unwrap(),
            ClientIpExtractor.extract(&b).unwrap()
        );
    }

    #[test]
    fn first_forwarded_address_is_used() {
        let req = request(&[("x-forwarded-for", "203.0.113.7, 10.0.0.1")]);
        assert_eq!(
            ClientIpExtractor.extract(&req).unwrap(),
            "203.0.113.7".parse::<IpAddr>().unwrap()
        );
    }

    #[test]
    fn peer_address_is_used_without_proxy_headers() {
        let mut req = request(&[]);
        req.extensions_mut()
            .insert(ConnectInfo("198.51.100.4:5123".parse::<SocketAddr>().unwrap()));
        assert_eq!(
            ClientIpExtractor.extract(&req).unwrap(),
            "198.51.100.4".parse::<IpAddr>().unwrap()
        );
    }

    #[test]
    fn unidentifiable_requests_share_localhost() {
        let req = request(&[]);
        assert_eq!(ClientIpExtractor.extract(&req).unwrap(), localhost());
    }

    #[test]
    fn replenish_period_is_the_inverse_of_the_rate() {
        assert_eq!(replenish_period(20), Duration::from_millis(50));
        assert_eq!(replenish_period(2), Duration::from_millis(500));
        assert_eq!(replenish_period(0), Duration::from_secs(1));
    }
}
