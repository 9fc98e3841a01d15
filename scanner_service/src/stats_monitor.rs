use std::{sync::Arc, time::Duration};

use serde::Serialize;
use sysinfo::{NetworkExt, NetworksExt, ProcessorExt, System, SystemExt};
use tokio::{sync::Mutex, task, time::sleep};

use crate::config::GLOBAL_CONFIG;
use crate::scan::{ScanRegistry, SharedScanCounters};

#[derive(Serialize, Clone, Debug, Default)]
pub struct SystemStats {
    pub cpu_usage: f32,
    pub total_memory_kb: u64,
    pub used_memory_kb: u64,
    pub network_in_bytes: u64,
    pub network_out_bytes: u64,
    pub load_one: f64,
    pub load_five: f64,
    pub load_fifteen: f64,
}

#[derive(Clone)]
pub struct SystemStatsMonitor {
    sys: Arc<Mutex<System>>,
}

impl SystemStatsMonitor {
    pub fn start() -> Self {
        let monitor = Self {
            sys: Arc::new(Mutex::new(System::new_all())),
        };
        task::spawn(monitor.clone().update());
        monitor
    }

    pub async fn get_stats(&self) -> SystemStats {
        let sys = self.sys.lock().await;
        let network_in = sys.get_networks().iter()
            .map(|(_, data)| data.get_received())
            .sum();
        let network_out = sys.get_networks().iter()
            .map(|(_, data)| data.get_transmitted())
            .sum();

        SystemStats {
            cpu_usage: sys.get_global_processor_info().get_cpu_usage(),
            total_memory_kb: sys.get_total_memory(),
            used_memory_kb: sys.get_used_memory(),
            network_in_bytes: network_in,
            network_out_bytes: network_out,
            load_one: sys.get_load_average().one,
            load_five: sys.get_load_average().five,
            load_fifteen: sys.get_load_average().fifteen,
        }
    }

    async fn update(self) {
        loop {
            sleep(Duration::from_millis(GLOBAL_CONFIG.stats.sys_update_interval)).await;
            {
                let mut sys = self.sys.lock().await;
                sys.refresh_cpu();
                sys.refresh_memory();
                sys.refresh_networks();
            }
        }
    }
}

#[derive(Serialize, Clone, Debug, Default, PartialEq)]
pub struct ScanStatsReport {
    pub jobs_running: usize,
    pub jobs_started: usize,
    pub jobs_completed: usize,
    pub hosts_probed: usize,
    pub hosts_reachable: usize,
    pub hosts_per_second: f64,
}

#[derive(Clone)]
pub struct ScanStatsMonitor {
    report: Arc<Mutex<ScanStatsReport>>,
}

impl ScanStatsMonitor {
    pub fn start(registry: ScanRegistry, counters: SharedScanCounters) -> Self {
        let monitor = Self {
            report: Arc::new(Mutex::new(ScanStatsReport::default())),
        };
        task::spawn(monitor.clone().update(registry, counters));
        monitor
    }

    pub async fn get_stats(&self) -> ScanStatsReport {
        let guard = self.report.lock().await;
        guard.clone()
    }

    async fn update(self, registry: ScanRegistry, counters: SharedScanCounters) {
        let interval = Duration::from_millis(GLOBAL_CONFIG.stats.scan_update_interval);
        let mut last_probed = 0;
        loop {
            sleep(interval).await;
            let current = counters.clone_inner().await;
            let report = ScanStatsReport {
                jobs_running: registry.running_count().await,
                jobs_started: current.jobs_started,
                jobs_completed: current.jobs_completed,
                hosts_probed: current.hosts_probed,
                hosts_reachable: current.hosts_reachable,
                hosts_per_second: (current.hosts_probed - last_probed) as f64 / interval.as_secs_f64(),
            };
            last_probed = current.hosts_probed;
            {
                let mut guard = self.report.lock().await;
                *guard = report;
            }
        }
    }
}
