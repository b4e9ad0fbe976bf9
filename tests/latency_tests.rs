// Probe scheduler: concurrency bound, cycle barrier, cancellation, target resolution

mod common;

use async_trait::async_trait;
use hostwatch::archive::{Archive, FileKey, RetentionPolicy, Schema};
use hostwatch::error::{CollectError, ExecError, ProbeError};
use hostwatch::latency::{PingParser, ProbeScheduler, Prober, ScheduledTarget, resolve_targets};
use hostwatch::models::{Metric, ProbeTarget};
use hostwatch::route::{Gateway, Routes};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

const PING_OK: &str = "\
--- 10.0.0.1 ping statistics ---
5 packets transmitted, 5 received, 0% packet loss, time 4005ms
rtt min/avg/max/mdev = 1.100/2.200/3.300/0.400 ms
";

/// Takes one second per probe and records the highest overlap seen.
#[derive(Default)]
struct SlowProber {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    calls: AtomicUsize,
}

#[async_trait]
impl Prober for SlowProber {
    async fn probe(
        &self,
        target: &ProbeTarget,
        cancel: &CancellationToken,
    ) -> Result<String, ProbeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        let res = tokio::select! {
            _ = cancel.cancelled() => Err(ProbeError::Exec(ExecError::Cancelled)),
            _ = tokio::time::sleep(Duration::from_secs(1)) => {
                if target.address == "10.0.0.99" {
                    Ok("ping: unknown host\n".to_string())
                } else {
                    Ok(PING_OK.to_string())
                }
            }
        };
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        res
    }
}

fn targets(n: usize) -> Vec<ScheduledTarget> {
    (0..n)
        .map(|i| ScheduledTarget {
            target: ProbeTarget::new(format!("host{i}"), format!("10.0.0.{}", i + 1))
                .with_iface("eth0"),
            key: FileKey::entity("", "latency", &format!("host{i}")),
        })
        .collect()
}

async fn create_all(archive: &Arc<dyn Archive>, targets: &[ScheduledTarget]) {
    let schema = Schema::gauges(&["min", "avg", "max", "loss"]);
    let retention = RetentionPolicy::for_step(60, 1);
    for t in targets {
        archive
            .create_if_absent(&t.key, &schema, &retention)
            .await
            .unwrap();
    }
}

#[tokio::test(start_paused = true)]
async fn five_targets_two_permits_take_three_rounds() {
    let (mem, archive) = common::memory_archive();
    let targets = targets(5);
    create_all(&archive, &targets).await;

    let prober = Arc::new(SlowProber::default());
    let scheduler = ProbeScheduler::new(prober.clone(), PingParser::new().unwrap(), 2);
    let cancel = CancellationToken::new();

    let start = Instant::now();
    let summary = scheduler.run_cycle(&targets, &archive, &cancel).await;

    assert!(start.elapsed() >= Duration::from_secs(3));
    assert_eq!(prober.peak.load(Ordering::SeqCst), 2);
    assert_eq!(summary.succeeded, 5);
    assert_eq!(summary.total(), 5);
    assert_eq!(mem.append_count(), 5);

    let row = &mem.rows_for(&targets[0].key)[0];
    assert_eq!(
        row,
        &vec![
            Metric::Value(1.1),
            Metric::Value(2.2),
            Metric::Value(3.3),
            Metric::Value(0.0)
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn unparsable_output_fails_only_that_target() {
    let (mem, archive) = common::memory_archive();
    let mut targets = targets(3);
    targets[1].target.address = "10.0.0.99".into();
    create_all(&archive, &targets).await;

    let scheduler = ProbeScheduler::new(
        Arc::new(SlowProber::default()),
        PingParser::new().unwrap(),
        4,
    );
    let summary = scheduler
        .run_cycle(&targets, &archive, &CancellationToken::new())
        .await;

    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.failed, 1);
    assert!(mem.rows_for(&targets[1].key).is_empty());
    assert_eq!(mem.rows_for(&targets[2].key).len(), 1);
}

#[tokio::test(start_paused = true)]
async fn cancellation_mid_cycle_appends_nothing_more() {
    let (mem, archive) = common::memory_archive();
    let targets = targets(5);
    create_all(&archive, &targets).await;

    let prober = Arc::new(SlowProber::default());
    let scheduler = Arc::new(ProbeScheduler::new(
        prober.clone(),
        PingParser::new().unwrap(),
        2,
    ));
    let cancel = CancellationToken::new();

    let task = {
        let scheduler = scheduler.clone();
        let archive = archive.clone();
        let cancel = cancel.clone();
        let targets = targets.clone();
        tokio::spawn(async move { scheduler.run_cycle(&targets, &archive, &cancel).await })
    };

    tokio::time::sleep(Duration::from_millis(1500)).await;
    let appended_before_cancel = mem.append_count();
    cancel.cancel();
    let summary = task.await.unwrap();

    assert_eq!(appended_before_cancel, 2);
    assert_eq!(mem.append_count(), 2);
    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.cancelled, 3);
    assert_eq!(summary.total(), 5);
    // the fifth target never got a permit
    assert_eq!(prober.calls.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn cycle_with_cancelled_token_runs_no_probe() {
    let (mem, archive) = common::memory_archive();
    let targets = targets(3);
    create_all(&archive, &targets).await;

    let prober = Arc::new(SlowProber::default());
    let scheduler = ProbeScheduler::new(prober.clone(), PingParser::new().unwrap(), 2);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let summary = scheduler.run_cycle(&targets, &archive, &cancel).await;
    assert_eq!(summary.cancelled, 3);
    assert_eq!(prober.calls.load(Ordering::SeqCst), 0);
    assert_eq!(mem.append_count(), 0);
}

struct FakeRoutes {
    gateways: Vec<Gateway>,
}

#[async_trait]
impl Routes for FakeRoutes {
    async fn default_gateways(
        &self,
        _cancel: &CancellationToken,
    ) -> Result<Vec<Gateway>, CollectError> {
        Ok(self.gateways.clone())
    }

    async fn iface_for(
        &self,
        address: &str,
        _cancel: &CancellationToken,
    ) -> Result<Option<String>, CollectError> {
        Ok(match address {
            "203.0.113.7" => None,
            a if a.contains(':') => Some("wlan0".to_string()),
            _ => Some("eth0".to_string()),
        })
    }
}

fn gateway(address: &str, iface: &str) -> Gateway {
    Gateway {
        address: address.to_string(),
        iface: iface.to_string(),
    }
}

#[tokio::test]
async fn resolve_adds_gateways_and_drops_bad_targets() {
    let routes = FakeRoutes {
        gateways: vec![gateway("192.168.1.1", "eth0"), gateway("fe80::1", "wlan0")],
    };
    let configured = vec![
        ProbeTarget::new("router", "192.168.1.1"),
        ProbeTarget::new("dns", "1.1.1.1"),
        ProbeTarget::new("dns-again", "1.1.1.1"),
        ProbeTarget::new("blank", "  "),
        ProbeTarget::new("unroutable", "203.0.113.7"),
        ProbeTarget::new("pinned", "8.8.8.8").with_iface("eth1"),
    ];

    let out = resolve_targets(&configured, true, &routes, &CancellationToken::new())
        .await
        .unwrap();
    let names: Vec<&str> = out.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["router", "dns", "pinned", "gateway6-wlan0"]);

    assert_eq!(out[0].iface.as_deref(), Some("eth0"));
    assert_eq!(out[2].iface.as_deref(), Some("eth1"));
    assert_eq!(out[3].address, "fe80::1");
}

#[tokio::test]
async fn resolve_without_discovery_keeps_configured_only() {
    let routes = FakeRoutes {
        gateways: vec![gateway("192.168.1.1", "eth0")],
    };
    let configured = vec![ProbeTarget::new("dns", "1.1.1.1")];
    let out = resolve_targets(&configured, false, &routes, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].name, "dns");
}

#[tokio::test]
async fn unroutable_address_does_not_shadow_a_later_pinned_target() {
    let routes = FakeRoutes { gateways: vec![] };
    let configured = vec![
        ProbeTarget::new("unpinned", "203.0.113.7"),
        ProbeTarget::new("pinned", "203.0.113.7").with_iface("eth1"),
    ];
    let out = resolve_targets(&configured, false, &routes, &CancellationToken::new())
        .await
        .unwrap();
    let names: Vec<&str> = out.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["pinned"]);
    assert_eq!(out[0].iface.as_deref(), Some("eth1"));
}

#[tokio::test]
async fn addresses_are_trimmed_before_dedup_and_lookup() {
    let routes = FakeRoutes { gateways: vec![] };
    let configured = vec![
        ProbeTarget::new("dns", " 1.1.1.1 "),
        ProbeTarget::new("dns-plain", "1.1.1.1"),
    ];
    let out = resolve_targets(&configured, false, &routes, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].name, "dns");
    assert_eq!(out[0].address, "1.1.1.1");
    assert_eq!(out[0].iface.as_deref(), Some("eth0"));
}
