pub mod error;
mod address;
mod client;
mod config;
mod probe;
mod scan;
mod stats_monitor;
mod utils;

use tokio::{task, time::sleep};

use error::*;

pub use address::{Target, expand_targets, parse_ipv4_cidr};
pub use client::{ScanClient, ScanTracker, poll_until_complete};
pub use config::{Config, GLOBAL_CONFIG};
pub use probe::{BannerData, HttpProbeData, ProbeReport, Protocol};
pub use scan::{ScanJob, ScanRegistry, ScanRequest, ScanResult, ScanRunner, ScanStarted, ScanStatus, ScanTaskInfo};
pub use stats_monitor::{ScanStatsMonitor, ScanStatsReport, SystemStats, SystemStatsMonitor};
pub use utils::{KillableTask, TaskResult};

/// One scan service node: the job registry and runner plus the stats
/// monitors around them.
#[derive(Clone)]
pub struct WorkerService {
    registry: ScanRegistry,
    runner: ScanRunner,
    sys_monitor: SystemStatsMonitor,
    scan_monitor: ScanStatsMonitor,
}

impl WorkerService {
    pub fn start() -> Result<Self, SimpleError> {
        let registry = ScanRegistry::new();
        let runner = ScanRunner::new(&registry)?;
        let scan_monitor = ScanStatsMonitor::start(registry.clone(), runner.counters());
        stats_log(scan_monitor.clone());

        Ok(Self {
            registry,
            runner,
            sys_monitor: SystemStatsMonitor::start(),
            scan_monitor,
        })
    }

    pub fn runner(&self) -> ScanRunner {
        self.runner.clone()
    }

    pub fn registry(&self) -> ScanRegistry {
        self.registry.clone()
    }

    pub fn config(&self) -> &'static Config {
        &GLOBAL_CONFIG
    }

    pub async fn sys_stats(&self) -> SystemStats {
        self.sys_monitor.get_stats().await
    }

    pub async fn scan_stats(&self) -> ScanStatsReport {
        self.scan_monitor.get_stats().await
    }
}

fn stats_log(monitor: ScanStatsMonitor) {
    task::spawn(async move {
        let mut last_stats = ScanStatsReport::default();
        loop {
            sleep(tokio::time::Duration::from_millis(GLOBAL_CONFIG.stats.scan_update_interval)).await;
            let stats = monitor.get_stats().await;
            if last_stats == stats {
                continue;
            }
            log::info!(
                "Scan speed: {:.2} hosts/s, {} jobs running, {} hosts probed",
                stats.hosts_per_second, stats.jobs_running, stats.hosts_probed
            );
            last_stats = stats;
        }
    });
}
