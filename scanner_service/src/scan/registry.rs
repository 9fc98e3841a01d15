use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::SimpleError;
use crate::probe::{ProbeReport, Protocol};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ScanStatus {
    Running,
    Completed,
    Cancelled,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(tag = "result", content = "data")]
pub enum ScanResult<T> {
    Ok(T),
    Err(String),
}

impl<T> ScanResult<T> {
    pub fn is_ok(&self) -> bool {
        matches!(self, ScanResult::Ok(_))
    }
    pub fn ok(self) -> Option<T> {
        match self {
            ScanResult::Ok(result) => Some(result),
            _ => None,
        }
    }
}

impl<T> From<Result<T, SimpleError>> for ScanResult<T> {
    fn from(result: Result<T, SimpleError>) -> Self {
        match result {
            Ok(data) => Self::Ok(data),
            Err(err) => Self::Err(err.msg),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ScanTaskInfo {
    pub host: String,
    pub time: DateTime<Utc>,
    #[serde(flatten)]
    pub result: ScanResult<ProbeReport>,
}

impl ScanTaskInfo {
    pub fn new(host: &str, result: ScanResult<ProbeReport>) -> Self {
        Self {
            host: host.to_owned(),
            time: Utc::now(),
            result,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ScanJob {
    pub scan_id: String,
    pub protocol: Protocol,
    pub hosts: Vec<String>,
    pub status: ScanStatus,
    pub progress: f64,
    pub processed: usize,
    pub successful: usize,
    pub results: Vec<ScanTaskInfo>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl ScanJob {
    pub fn new(scan_id: &str, protocol: Protocol, hosts: Vec<String>) -> Self {
        Self {
            scan_id: scan_id.to_owned(),
            protocol,
            hosts,
            status: ScanStatus::Running,
            progress: 0.0,
            processed: 0,
            successful: 0,
            results: Vec::new(),
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn reachable_hosts(&self) -> Vec<&str> {
        self.results.iter()
            .filter(|info| info.result.is_ok())
            .map(|info| info.host.as_str())
            .collect()
    }
}

/// In-memory job table. Jobs stay in the table after reaching a terminal
/// state so late status queries keep working.
#[derive(Clone)]
pub struct ScanRegistry {
    jobs: Arc<Mutex<HashMap<String, ScanJob>>>,
}

impl ScanRegistry {
    pub fn new() -> Self {
        Self {
            jobs: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub async fn insert(&self, job: ScanJob) {
        let mut jobs = self.jobs.lock().await;
        jobs.insert(job.scan_id.clone(), job);
    }

    pub async fn snapshot(&self, scan_id: &str) -> Option<ScanJob> {
        let jobs = self.jobs.lock().await;
        jobs.get(scan_id).cloned()
    }

    pub async fn is_running(&self, scan_id: &str) -> bool {
        let jobs = self.jobs.lock().await;
        jobs.get(scan_id).map(|job| job.status == ScanStatus::Running).unwrap_or(false)
    }

    pub async fn running_count(&self) -> usize {
        let jobs = self.jobs.lock().await;
        jobs.values().filter(|job| job.status == ScanStatus::Running).count()
    }

    /// Records one probed host and updates the progress counters.
    /// Refused once the job left `running`, so results of probes still in
    /// flight when a job is cancelled are dropped.
    pub async fn record_host(&self, scan_id: &str, info: ScanTaskInfo) -> bool {
        let mut jobs = self.jobs.lock().await;
        let job = match jobs.get_mut(scan_id) {
            Some(job) if job.status == ScanStatus::Running => job,
            _ => return false,
        };
        job.processed += 1;
        if info.result.is_ok() {
            job.successful += 1;
        }
        job.results.push(info);
        let total = job.hosts.len().max(1);
        job.progress = job.processed as f64 / total as f64 * 100.0;
        true
    }

    pub async fn complete(&self, scan_id: &str) -> bool {
        let mut jobs = self.jobs.lock().await;
        match jobs.get_mut(scan_id) {
            Some(job) if job.status == ScanStatus::Running => {
                job.status = ScanStatus::Completed;
                job.finished_at = Some(Utc::now());
                true
            },
            _ => false,
        }
    }

    /// Marks a running job cancelled; a job already in a terminal state
    /// keeps it. Returns the job's final status, `None` for unknown ids.
    pub async fn cancel(&self, scan_id: &str) -> Option<ScanStatus> {
        let mut jobs = self.jobs.lock().await;
        let job = jobs.get_mut(scan_id)?;
        if job.status == ScanStatus::Running {
            job.status = ScanStatus::Cancelled;
            job.finished_at = Some(Utc::now());
        }
        Some(job.status)
    }
}
