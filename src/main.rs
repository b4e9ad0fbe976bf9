use anyhow::Result;
use hostwatch::archive::{Archive, JsonlArchive};
use hostwatch::config::{AppConfig, SubsystemSettings};
use hostwatch::latency::{PingParser, PingProber, ProbeScheduler};
use hostwatch::process::ProcessTable;
use hostwatch::procfs::ProcFs;
use hostwatch::route::IpRoute;
use hostwatch::subsystem::{self, *};
use hostwatch::version;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(s) => s,
                Err(_) => {
                    let _ = tokio::signal::ctrl_c().await;
                    return;
                }
            };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

/// Enabled subsystems paired with their section settings.
fn build_subsystems(
    config: &AppConfig,
) -> Result<Vec<(Box<dyn Subsystem>, SubsystemSettings)>> {
    let procfs = ProcFs::new(&config.global.proc_root);
    let prefix = config.file_prefix();
    let mut subs: Vec<(Box<dyn Subsystem>, SubsystemSettings)> = Vec::new();

    if config.system.enable {
        subs.push((
            Box::new(SystemSubsystem::new(procfs.clone(), &prefix)),
            config.system.clone(),
        ));
    }
    if config.kernel.enable {
        subs.push((
            Box::new(KernelSubsystem::new(procfs.clone(), &prefix)),
            config.kernel.clone(),
        ));
    }
    if config.interrupts.enable {
        subs.push((
            Box::new(InterruptsSubsystem::new(procfs.clone(), &prefix)),
            config.interrupts.clone(),
        ));
    }
    if config.netif.settings.enable {
        subs.push((
            Box::new(NetifSubsystem::new(
                procfs.clone(),
                &prefix,
                config.netif.interfaces.clone(),
                config.netif.auto_discovery,
            )),
            config.netif.settings.clone(),
        ));
    }
    if config.filesystem.settings.enable {
        subs.push((
            Box::new(FilesystemSubsystem::new(
                procfs.clone(),
                &prefix,
                config.filesystem.mountpoints.clone(),
            )),
            config.filesystem.settings.clone(),
        ));
    }
    if config.process.settings.enable {
        subs.push((
            Box::new(ProcessSubsystem::new(
                procfs.clone(),
                &prefix,
                &config.process.processes,
                Arc::new(ProcessTable::new()),
            )),
            config.process.settings.clone(),
        ));
    }
    if config.latency.settings.enable {
        let latency = &config.latency;
        let prober = PingProber::new(
            latency.probe_packets,
            Duration::from_secs(latency.probe_timeout_secs),
        );
        let scheduler = ProbeScheduler::new(
            Arc::new(prober),
            PingParser::new()?,
            latency.max_parallel_probes,
        );
        subs.push((
            Box::new(LatencySubsystem::new(
                &prefix,
                latency.hosts.clone(),
                latency.default_gateway,
                Arc::new(IpRoute),
                scheduler,
            )),
            latency.settings.clone(),
        ));
    }
    if config.connections.settings.enable {
        subs.push((
            Box::new(ConnectionsSubsystem::new(&prefix, config.connections.command)),
            config.connections.settings.clone(),
        ));
    }
    Ok(subs)
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .init();

    let app_config = AppConfig::load()?;
    tracing::info!(
        version = %version::banner(),
        archive_path = %app_config.global.archive_path,
        "starting"
    );

    let archive: Arc<dyn Archive> = Arc::new(JsonlArchive::new(&app_config.global.archive_path));
    let cancel = CancellationToken::new();

    let handles: Vec<_> = build_subsystems(&app_config)?
        .into_iter()
        .map(|(sub, settings)| {
            subsystem::spawn(
                sub,
                archive.clone(),
                app_config.loop_settings(&settings),
                cancel.clone(),
            )
        })
        .collect();
    tracing::info!(subsystems = handles.len(), "subsystems started");

    shutdown_signal().await;
    tracing::info!("Received shutdown signal");
    cancel.cancel();

    for handle in handles {
        if let Err(e) = handle.await {
            tracing::warn!(error = %e, "subsystem task aborted");
        }
    }
    tracing::info!("stopped");
    Ok(())
}
