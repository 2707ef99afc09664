//! Host name resolution for outbound connections.
//!
//! The default resolver asks the system. [`StaticResolver`] pins chosen host
//! names to fixed service addresses and falls back to the system for the
//! rest.

use std::collections::HashMap;
use std::fmt;
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::pin::Pin;

/// Boxed future for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;

/// Resolves a host name to socket addresses.
pub trait Resolve: Send + Sync + fmt::Debug {
    fn resolve<'a>(&'a self, host: &'a str, port: u16) -> BoxFuture<'a, io::Result<Vec<SocketAddr>>>;
}

/// System resolver (`getaddrinfo` through tokio).
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemResolver;

impl Resolve for SystemResolver {
    fn resolve<'a>(&'a self, host: &'a str, port: u16) -> BoxFuture<'a, io::Result<Vec<SocketAddr>>> {
        Box::pin(async move {
            let addrs: Vec<SocketAddr> = tokio::net::lookup_host((host, port)).await?.collect();
            if addrs.is_empty() {
                return Err(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("no addresses for {host}"),
                ));
            }
            Ok(addrs)
        })
    }
}

/// Resolver with fixed entries for selected hosts.
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    entries: HashMap<String, Vec<IpAddr>>,
    fallback: SystemResolver,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin `host` to `addrs`. Host names are matched case-insensitively.
    pub fn with_host(mut self, host: impl Into<String>, addrs: Vec<IpAddr>) -> Self {
        self.entries
            .insert(host.into().to_ascii_lowercase(), addrs);
        self
    }
}

impl Resolve for StaticResolver {
    fn resolve<'a>(&'a self, host: &'a str, port: u16) -> BoxFuture<'a, io::Result<Vec<SocketAddr>>> {
        match self.entries.get(&host.to_ascii_lowercase()) {
            Some(addrs) if !addrs.is_empty() => {
                let resolved = addrs.iter().map(|ip| SocketAddr::new(*ip, port)).collect();
                Box::pin(async move { Ok(resolved) })
            }
            _ => self.fallback.resolve(host, port),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[tokio::test]
    async fn test_static_entry() {
        let ip = IpAddr::V4(Ipv4Addr::new(10, 1, 2, 3));
        let resolver = StaticResolver::new().with_host("WS-API.Example.com", vec![ip]);

        let addrs = resolver.resolve("ws-api.example.com", 443).await.unwrap();
        assert_eq!(addrs, vec![SocketAddr::new(ip, 443)]);
    }

    #[tokio::test]
    async fn test_fallback_to_system() {
        let resolver = StaticResolver::new();
        let addrs = resolver.resolve("127.0.0.1", 9000).await.unwrap();
        assert_eq!(addrs, vec!["127.0.0.1:9000".parse::<SocketAddr>().unwrap()]);
    }
}
