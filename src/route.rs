// Routing table lookups via `ip route`: default gateways and egress interface.

use crate::error::CollectError;
use crate::exec::{DEFAULT_TIMEOUT, run_command};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gateway {
    pub address: String,
    pub iface: String,
}

impl Gateway {
    pub fn is_ipv6(&self) -> bool {
        self.address.contains(':')
    }
}

fn value_after<'a>(fields: &[&'a str], key: &str) -> Option<&'a str> {
    fields
        .iter()
        .position(|f| *f == key)
        .and_then(|i| fields.get(i + 1).copied())
}

/// Gateways from `ip route show default` output. Lines lacking `via` or
/// `dev` (e.g. point-to-point defaults) are skipped.
pub fn parse_default_routes(text: &str) -> Vec<Gateway> {
    text.lines()
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 5 {
                return None;
            }
            Some(Gateway {
                address: value_after(&fields, "via")?.to_string(),
                iface: value_after(&fields, "dev")?.to_string(),
            })
        })
        .collect()
}

/// Egress interface from `ip route get <addr>` output.
pub fn parse_route_get_iface(text: &str) -> Option<String> {
    let fields: Vec<&str> = text.split_whitespace().collect();
    value_after(&fields, "dev").map(str::to_string)
}

#[async_trait]
pub trait Routes: Send + Sync {
    /// IPv4 and IPv6 default gateways, each address at most once.
    async fn default_gateways(&self, cancel: &CancellationToken)
    -> Result<Vec<Gateway>, CollectError>;

    /// `None` when the kernel reports no route.
    async fn iface_for(
        &self,
        address: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<String>, CollectError>;
}

/// Keeps the first interface seen for each gateway address.
pub fn dedup_gateways(gateways: Vec<Gateway>) -> Vec<Gateway> {
    let mut out: Vec<Gateway> = Vec::with_capacity(gateways.len());
    for gw in gateways {
        if let Some(first) = out.iter().find(|g| g.address == gw.address) {
            tracing::warn!(
                gateway = %gw.address,
                first_iface = %first.iface,
                dup_iface = %gw.iface,
                "duplicate default gateway, keeping first"
            );
            continue;
        }
        out.push(gw);
    }
    out
}

/// [`Routes`] backed by the `ip` command.
#[derive(Debug, Clone, Default)]
pub struct IpRoute;

impl IpRoute {
    async fn ip(&self, args: &[&str], cancel: &CancellationToken) -> Result<String, CollectError> {
        let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        let out = run_command("ip", &args, DEFAULT_TIMEOUT, cancel).await?;
        if !out.success {
            return Err(CollectError::parse(
                format!("ip {}", args.join(" ")),
                out.text.trim().to_string(),
            ));
        }
        Ok(out.text)
    }
}

#[async_trait]
impl Routes for IpRoute {
    async fn default_gateways(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Vec<Gateway>, CollectError> {
        let mut all = Vec::new();
        for args in [
            &["route", "show", "default"][..],
            &["-6", "route", "show", "default"][..],
        ] {
            match self.ip(args, cancel).await {
                Ok(text) => all.extend(parse_default_routes(&text)),
                Err(CollectError::Cancelled) => return Err(CollectError::Cancelled),
                Err(e) => tracing::warn!(error = %e, operation = "default_gateways", "ip route failed"),
            }
        }
        Ok(dedup_gateways(all))
    }

    async fn iface_for(
        &self,
        address: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<String>, CollectError> {
        let text = self.ip(&["route", "get", address], cancel).await?;
        Ok(parse_route_get_iface(&text))
    }
}
