use std::time::Duration;

use tokio::time::sleep;

use crate::error::*;
use crate::scan::{ScanJob, ScanRequest, ScanStarted, ScanStatus};
use crate::utils::KillableTask;

const REQUEST_TIMEOUT: u64 = 10; // seconds

/// Thin client over the scan service's REST surface.
#[derive(Clone)]
pub struct ScanClient {
    base: String,
    client: reqwest::Client,
}

impl ScanClient {
    pub fn new(base: &str) -> Result<Self, SimpleError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT))
            .build()?;
        Ok(Self {
            base: base.trim_end_matches('/').to_owned(),
            client,
        })
    }

    pub async fn start_scan(&self, request: &ScanRequest) -> Result<String, SimpleError> {
        let started: ScanStarted = self.client.post(format!("{}/api/scan", self.base))
            .json(request)
            .send().await?
            .error_for_status()?
            .json().await?;
        Ok(started.scan_id)
    }

    pub async fn status(&self, scan_id: &str) -> Result<ScanJob, SimpleError> {
        Ok(self.client.get(format!("{}/api/scan/{}", self.base, scan_id))
            .send().await?
            .error_for_status()?
            .json().await?)
    }

    pub async fn cancel(&self, scan_id: &str) -> Result<(), SimpleError> {
        self.client.delete(format!("{}/api/scan/{}", self.base, scan_id))
            .send().await?
            .error_for_status()?;
        Ok(())
    }
}

/// Polls the scan until it reaches a terminal state. While the scan is
/// `running` the next poll is re-armed after `interval`; a `completed`
/// scan returns its final snapshot exactly once. Transport failures and
/// unexpected terminal statuses end the loop with an error.
pub async fn poll_until_complete<F>(
    client: &ScanClient,
    scan_id: &str,
    interval: Duration,
    mut on_progress: F,
) -> Result<ScanJob, SimpleError>
where
    F: FnMut(&ScanJob),
{
    loop {
        let job = client.status(scan_id).await?;
        match job.status {
            ScanStatus::Running => {
                on_progress(&job);
                sleep(interval).await;
            },
            ScanStatus::Completed => return Ok(job),
            status => {
                log::warn!("Scan {} ended without completing, status {:?}", scan_id, status);
                Err(format!("Scan {} ended with status {:?}", scan_id, status))?
            },
        }
    }
}

struct ActiveScan {
    scan_id: String,
    poll_task: KillableTask<Result<ScanJob, SimpleError>>,
}

/// Tracks at most one scan at a time. Starting a new scan kills the
/// poll loop of the scan it replaces.
pub struct ScanTracker {
    client: ScanClient,
    interval: Duration,
    active: Option<ActiveScan>,
}

impl ScanTracker {
    pub fn new(client: ScanClient, interval: Duration) -> Self {
        Self {
            client,
            interval,
            active: None,
        }
    }

    /// Submits the scan request and arms a poll loop for the returned
    /// handle. The initial request is never retried; on failure no
    /// polling starts and the previously tracked scan stays in place.
    pub async fn start(&mut self, request: &ScanRequest) -> Result<String, SimpleError> {
        let scan_id = self.client.start_scan(request).await?;
        if let Some(mut previous) = self.active.take() {
            log::warn!("Replacing tracked scan {}, killing its poll loop", previous.scan_id);
            previous.poll_task.kill();
        }

        let client = self.client.clone();
        let interval = self.interval;
        let poll_id = scan_id.clone();
        let poll_task = KillableTask::new(async move {
            poll_until_complete(&client, &poll_id, interval, progress_log()).await
        });
        self.active = Some(ActiveScan {
            scan_id: scan_id.clone(),
            poll_task,
        });
        Ok(scan_id)
    }

    pub fn active_scan(&self) -> Option<&str> {
        self.active.as_ref().map(|scan| scan.scan_id.as_str())
    }

    /// Waits for the tracked poll loop and hands back the completed
    /// snapshot.
    pub async fn join(&mut self) -> Result<ScanJob, SimpleError> {
        match self.active.take() {
            Some(scan) => match scan.poll_task.join().await {
                Ok(result) => result,
                Err(_) => Err(SimpleError::new("Poll loop terminated")),
            },
            None => Err(SimpleError::new("No scan is being tracked")),
        }
    }
}

fn progress_log() -> impl FnMut(&ScanJob) {
    let mut last_processed = usize::MAX;
    move |job: &ScanJob| {
        if job.processed != last_processed {
            log::info!(
                "Scan {}: {:.0}% ({}/{} hosts, {} reachable)",
                job.scan_id, job.progress, job.processed, job.hosts.len(), job.successful
            );
            last_processed = job.processed;
        }
    }
}
