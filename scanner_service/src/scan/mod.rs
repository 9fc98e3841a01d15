mod registry;
mod runner;

pub use registry::{ScanJob, ScanRegistry, ScanResult, ScanStatus, ScanTaskInfo};
pub use runner::{ScanCounters, ScanRunner, SharedScanCounters};

use serde::{Deserialize, Serialize};

use crate::probe::Protocol;

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ScanRequest {
    pub hosts: Vec<String>,
    pub protocol: Protocol,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ScanStarted {
    pub scan_id: String,
    pub status: String,
}
