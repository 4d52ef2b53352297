//! Static route resolver
//!
//! Expands a proxy target into one route per preferred transport. A
//! target with an explicit port and transport yields exactly that route;
//! a bare domain yields a candidate per transport preference on the
//! default port, in preference order.

use async_trait::async_trait;

use presence_core::{ResolveError, ResolveTarget, Route, RouteResolver, Transport};

/// Default presence proxy port
const DEFAULT_PORT: u16 = 5060;
/// Default presence proxy port for TLS
const DEFAULT_TLS_PORT: u16 = 5061;

/// Resolver that builds routes directly from the configured proxy target
#[derive(Debug, Default, Clone)]
pub struct StaticRouteResolver;

impl StaticRouteResolver {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl RouteResolver for StaticRouteResolver {
    async fn resolve(
        &self,
        target: &ResolveTarget,
        transports: &[Transport],
    ) -> Result<Vec<Route>, ResolveError> {
        if target.host.is_empty() {
            return Err(ResolveError::Lookup("empty target host".to_string()));
        }

        // Explicit proxy: single route exactly as configured
        if let (Some(port), Some(transport)) = (target.port, target.transport) {
            return Ok(vec![Route::new(target.host.clone(), port, transport)]);
        }

        let routes: Vec<Route> = transports
            .iter()
            .map(|&transport| {
                let port = target.port.unwrap_or(match transport {
                    Transport::Tls => DEFAULT_TLS_PORT,
                    Transport::Udp | Transport::Tcp => DEFAULT_PORT,
                });
                Route::new(target.host.clone(), port, transport)
            })
            .collect();

        if routes.is_empty() {
            return Err(ResolveError::NoRoutes);
        }
        Ok(routes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_explicit_proxy_yields_single_route() {
        let resolver = StaticRouteResolver::new();
        let target = ResolveTarget::proxy("proxy.example.com", 5070, Transport::Tcp);

        let routes = resolver
            .resolve(&target, &[Transport::Udp, Transport::Tcp])
            .await
            .unwrap();
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0], Route::new("proxy.example.com", 5070, Transport::Tcp));
    }

    #[tokio::test]
    async fn test_domain_expands_per_transport_preference() {
        let resolver = StaticRouteResolver::new();
        let target = ResolveTarget::domain("example.com");

        let routes = resolver
            .resolve(&target, &[Transport::Udp, Transport::Tcp, Transport::Tls])
            .await
            .unwrap();
        assert_eq!(routes.len(), 3);
        assert_eq!(routes[0], Route::new("example.com", 5060, Transport::Udp));
        assert_eq!(routes[1], Route::new("example.com", 5060, Transport::Tcp));
        assert_eq!(routes[2], Route::new("example.com", 5061, Transport::Tls));
    }

    #[tokio::test]
    async fn test_no_transports_is_no_routes() {
        let resolver = StaticRouteResolver::new();
        let target = ResolveTarget::domain("example.com");

        assert!(matches!(
            resolver.resolve(&target, &[]).await,
            Err(ResolveError::NoRoutes)
        ));
    }
}
