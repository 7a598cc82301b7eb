//! Client IP resolution.
//!
//! Click logs and gate warnings record the caller's address. A forwarded
//! header is honoured only when the direct connection comes from a configured
//! trusted proxy; otherwise the header is ignored and the socket address wins.
//! The resolved address is stored in an `x-real-client-ip` header for
//! downstream middleware and handlers.

use crate::domain::config::SecurityConfig;
use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{HeaderMap, HeaderValue, Request},
    response::Response,
};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use tower::{Layer, Service};
use tracing::warn;

/// Header carrying the resolved client address.
pub const REAL_IP_HEADER: &str = "x-real-client-ip";

/// Client IP resolution layer
#[derive(Clone)]
pub struct ClientIpLayer {
    config: Arc<SecurityConfig>,
}

impl ClientIpLayer {
    pub fn new(config: SecurityConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }
}

impl<S> Layer<S> for ClientIpLayer {
    type Service = ClientIpService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ClientIpService {
            inner,
            config: Arc::clone(&self.config),
        }
    }
}

/// Client IP resolution service
#[derive(Clone)]
pub struct ClientIpService<S> {
    inner: S,
    config: Arc<SecurityConfig>,
}

impl<S> Service<Request<Body>> for ClientIpService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let config = Arc::clone(&self.config);
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let direct_ip = req
                .extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ci| ci.0.ip())
                .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST));

            let real_ip = resolve_client_ip(req.headers(), direct_ip, &config);

            let (mut parts, body) = req.into_parts();
            if !is_trusted_proxy(direct_ip, &config) {
                if let Some(forwarded) = parts.headers.get("x-forwarded-for") {
                    warn!(
                        direct_ip = %direct_ip,
                        forwarded = ?forwarded,
                        "Ignoring X-Forwarded-For from untrusted source"
                    );
                }
            }
            if let Ok(value) = HeaderValue::from_str(&real_ip.to_string()) {
                parts.headers.insert(REAL_IP_HEADER, value);
            }

            inner.call(Request::from_parts(parts, body)).await
        })
    }
}

/// Read the resolved client address set by this layer, as a display string.
pub fn client_ip_from_headers(headers: &HeaderMap) -> String {
    headers
        .get(REAL_IP_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string()
}

fn resolve_client_ip(headers: &HeaderMap, direct_ip: IpAddr, config: &SecurityConfig) -> IpAddr {
    if !is_trusted_proxy(direct_ip, config) {
        return direct_ip;
    }

    let Some(forwarded) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) else {
        return direct_ip;
    };

    // X-Forwarded-For lists client, proxy1, proxy2; take the entry proxy_count
    // hops from the right.
    let hops: Vec<&str> = forwarded.split(',').map(|s| s.trim()).collect();
    let index = hops.len().saturating_sub(config.proxy_count + 1);
    hops.get(index)
        .and_then(|s| s.parse::<IpAddr>().ok())
        .unwrap_or(direct_ip)
}

fn is_trusted_proxy(ip: IpAddr, config: &SecurityConfig) -> bool {
    if config.trusted_proxies.contains(&ip) {
        return true;
    }

    if ip.is_loopback() {
        return true;
    }

    if config.trust_private_ips {
        return match ip {
            IpAddr::V4(v4) => v4.is_private() || v4.is_link_local(),
            IpAddr::V6(v6) => (v6.octets()[0] & 0xfe) == 0xfc,
        };
    }

    false
}
