//! Hostname resolver collaborator: reverse-DNS lookup, run off the session's
//! read path. Failure is non-fatal — the session keeps using the IP as its
//! hostname.

use async_trait::async_trait;
use hickory_resolver::TokioResolver;
use hickory_resolver::config::ResolverConfig;
use hickory_resolver::name_server::TokioConnectionProvider;
use std::net::IpAddr;

#[async_trait]
pub trait HostnameResolver: Send + Sync {
    async fn resolve(&self, ip: IpAddr) -> Option<String>;
}

/// Production resolver backed by `hickory-resolver`'s reverse (PTR) lookup.
pub struct DnsResolver {
    inner: TokioResolver,
}

impl DnsResolver {
    pub fn from_system_conf() -> Self {
        let inner = TokioResolver::builder_tokio()
            .map(|b| b.build())
            .unwrap_or_else(|_| {
                TokioResolver::builder_with_config(
                    ResolverConfig::default(),
                    TokioConnectionProvider::default(),
                )
                .build()
            });
        DnsResolver { inner }
    }
}

#[async_trait]
impl HostnameResolver for DnsResolver {
    async fn resolve(&self, ip: IpAddr) -> Option<String> {
        let response = self.inner.reverse_lookup(ip).await.ok()?;
        response
            .iter()
            .next()
            .map(|name| name.to_string().trim_end_matches('.').to_string())
    }
}

/// Test double that never resolves, keeping sessions on the IP-as-hostname
/// path deterministically.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopResolver;

#[async_trait]
impl HostnameResolver for NoopResolver {
    async fn resolve(&self, _ip: IpAddr) -> Option<String> {
        None
    }
}
