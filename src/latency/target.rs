// One-time target resolution: gateway discovery, interface lookup, dedup.

use crate::error::CollectError;
use crate::models::ProbeTarget;
use crate::route::{Gateway, Routes};
use std::collections::HashSet;
use tokio_util::sync::CancellationToken;

fn gateway_target(gw: &Gateway) -> ProbeTarget {
    let family = if gw.is_ipv6() { "gateway6" } else { "gateway" };
    ProbeTarget {
        name: format!("{family}-{}", gw.iface),
        description: format!("Default gateway via {}", gw.iface),
        address: gw.address.clone(),
        iface: Some(gw.iface.clone()),
    }
}

/// Final target list, fixed for the life of the process.
///
/// With `discover_gateways`, each default gateway not already configured is
/// added as a synthetic target. Addresses are trimmed. Targets without an
/// address, repeating an address already resolved, or with no resolvable
/// egress interface are dropped with a warning. Only cancellation is an error.
pub async fn resolve_targets(
    configured: &[ProbeTarget],
    discover_gateways: bool,
    routes: &dyn Routes,
    cancel: &CancellationToken,
) -> Result<Vec<ProbeTarget>, CollectError> {
    let mut candidates: Vec<ProbeTarget> = configured
        .iter()
        .cloned()
        .map(|mut t| {
            t.address = t.address.trim().to_string();
            t
        })
        .collect();

    if discover_gateways {
        let gateways = match routes.default_gateways(cancel).await {
            Ok(g) => g,
            Err(CollectError::Cancelled) => return Err(CollectError::Cancelled),
            Err(e) => {
                tracing::warn!(error = %e, operation = "default_gateways", "gateway discovery failed");
                Vec::new()
            }
        };
        if gateways.is_empty() {
            tracing::info!("no default gateways discovered");
        }
        for gw in &gateways {
            if candidates.iter().any(|t| t.address == gw.address) {
                tracing::info!(gateway = %gw.address, "gateway already configured, skipping");
                continue;
            }
            tracing::info!(gateway = %gw.address, iface = %gw.iface, "default gateway added to targets");
            candidates.push(gateway_target(gw));
        }
    }

    let mut seen: HashSet<String> = HashSet::new();
    let mut out = Vec::with_capacity(candidates.len());
    for mut target in candidates {
        if target.address.is_empty() {
            tracing::warn!(host = %target.name, "target has no address, dropping");
            continue;
        }
        if seen.contains(&target.address) {
            tracing::warn!(host = %target.name, address = %target.address, "duplicate target address, dropping");
            continue;
        }
        if target.iface.as_deref().is_none_or(str::is_empty) {
            match routes.iface_for(&target.address, cancel).await {
                Ok(Some(iface)) => target.iface = Some(iface),
                Ok(None) => {
                    tracing::warn!(host = %target.name, address = %target.address, "no route to target, dropping");
                    continue;
                }
                Err(CollectError::Cancelled) => return Err(CollectError::Cancelled),
                Err(e) => {
                    tracing::warn!(host = %target.name, address = %target.address, error = %e, "interface lookup failed, dropping");
                    continue;
                }
            }
        }
        seen.insert(target.address.clone());
        out.push(target);
    }
    Ok(out)
}
