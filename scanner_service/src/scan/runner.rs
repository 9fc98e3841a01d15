use std::sync::Arc;
use std::time::Duration;

use futures::Future;
use tokio::{sync::{Mutex, mpsc::{Receiver, Sender, channel}}, task, time::timeout};
use uuid::Uuid;

use crate::address::{Target, expand_targets};
use crate::config::GLOBAL_CONFIG;
use crate::error::*;
use crate::probe::{Prober, Protocol};

use super::registry::{ScanJob, ScanRegistry, ScanTaskInfo};

#[derive(Clone, Debug, Default)]
pub struct ScanCounters {
    pub jobs_started: usize,
    pub jobs_completed: usize,
    pub hosts_probed: usize,
    pub hosts_reachable: usize,
}

#[derive(Clone)]
pub struct SharedScanCounters(Arc<Mutex<ScanCounters>>);

impl SharedScanCounters {
    pub fn new() -> Self {
        Self(Arc::new(Mutex::new(ScanCounters::default())))
    }
    pub async fn clone_inner(&self) -> ScanCounters {
        let guard = self.0.lock().await;
        guard.clone()
    }
    async fn count_job_started(&self) {
        let mut guard = self.0.lock().await;
        guard.jobs_started += 1;
    }
    async fn count_job_completed(&self) {
        let mut guard = self.0.lock().await;
        guard.jobs_completed += 1;
    }
    async fn count_host(&self, reachable: bool) {
        let mut guard = self.0.lock().await;
        guard.hosts_probed += 1;
        if reachable {
            guard.hosts_reachable += 1;
        }
    }
}

/// Creates scan jobs and drives their probe loops in the background.
#[derive(Clone)]
pub struct ScanRunner {
    registry: ScanRegistry,
    prober: Prober,
    counters: SharedScanCounters,
}

impl ScanRunner {
    pub fn new(registry: &ScanRegistry) -> Result<Self, SimpleError> {
        Ok(Self {
            registry: registry.clone(),
            prober: Prober::new()?,
            counters: SharedScanCounters::new(),
        })
    }

    pub fn counters(&self) -> SharedScanCounters {
        self.counters.clone()
    }

    /// Validates the request, registers the job and spawns its probe
    /// loop. Returns the new scan id.
    pub async fn start_job(&self, hosts: Vec<String>, protocol: Protocol) -> Result<String, SimpleError> {
        if hosts.is_empty() {
            Err("Empty host list")?
        }
        let targets = expand_targets(&hosts)?;
        if protocol == Protocol::Tcp {
            for target in &targets {
                if target.port.is_none() {
                    Err(format!("Target {} needs an explicit port for raw TCP scans", target))?
                }
            }
        }

        let scan_id = format!("scan_{}", Uuid::new_v4().simple());
        let host_names = targets.iter().map(Target::to_string).collect();
        self.registry.insert(ScanJob::new(&scan_id, protocol, host_names)).await;
        self.counters.count_job_started().await;
        log::info!("Scan {} started: {} hosts over {}", scan_id, targets.len(), protocol);

        task::spawn(self.clone().run_job(scan_id.clone(), protocol, targets));
        Ok(scan_id)
    }

    /// Marks a job cancelled. Returns its final status, `None` for
    /// unknown ids.
    pub async fn cancel_job(&self, scan_id: &str) -> Option<super::ScanStatus> {
        let status = self.registry.cancel(scan_id).await?;
        log::info!("Scan {} cancel requested, status now {:?}", scan_id, status);
        Some(status)
    }

    async fn run_job(self, scan_id: String, protocol: Protocol, targets: Vec<Target>) {
        let mut pool = TaskPool::new(GLOBAL_CONFIG.scanner.max_tasks);
        for target in targets {
            if !self.registry.is_running(&scan_id).await {
                log::warn!("Scan {} is no longer running, dropping remaining targets", scan_id);
                break;
            }
            let runner = self.clone();
            let scan_id = scan_id.clone();
            pool.spawn(async move {
                let result = runner.prober.probe(protocol, &target).await.into();
                let info = ScanTaskInfo::new(&target.to_string(), result);
                let reachable = info.result.is_ok();
                if runner.registry.record_host(&scan_id, info).await {
                    runner.counters.count_host(reachable).await;
                }
            }).await;
        }
        pool.join().await;
        if self.registry.complete(&scan_id).await {
            self.counters.count_job_completed().await;
            log::info!("Scan {} completed", scan_id);
        }
    }
}

struct TaskPool {
    max_tasks: usize,
    running_tasks: usize,
    complete_sender: Sender<()>,
    complete_receiver: Receiver<()>,
}

impl TaskPool {
    fn new(max_tasks: usize) -> Self {
        let max_tasks = max_tasks.max(1);
        let (sender, receiver) = channel(max_tasks * 2);
        Self {
            max_tasks,
            running_tasks: 0,
            complete_sender: sender,
            complete_receiver: receiver,
        }
    }

    async fn spawn<T>(&mut self, future: T) where T: Future + Send + 'static, T::Output: Send + 'static {
        if self.running_tasks >= self.max_tasks {
            match self.complete_receiver.recv().await {
                Some(_) => self.running_tasks -= 1,
                None => panic!("Task pool channel closed."),
            }
        }
        self.running_tasks += 1;
        let complete_sender = self.complete_sender.clone();
        task::spawn(async move {
            if timeout(Duration::from_secs(60), future).await.is_err() {
                log::error!("Probe task suspended over 60s");
            }
            complete_sender.send(()).await.log_error_consume("task-pool");
        });
    }

    async fn join(&mut self) {
        while self.running_tasks > 0 {
            match self.complete_receiver.recv().await {
                Some(_) => self.running_tasks -= 1,
                None => break,
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use super::super::ScanStatus;
    use std::time::Instant;
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpListener;
    use tokio::time::sleep;

    async fn listen_with_banner(banner: &'static [u8]) -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        task::spawn(async move {
            loop {
                let (mut stream, _) = listener.accept().await.unwrap();
                stream.write_all(banner).await.unwrap();
                let _ = stream.shutdown().await;
            }
        });
        port
    }

    async fn silent_listener() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        task::spawn(async move {
            let mut held = Vec::new();
            loop {
                let (stream, _) = listener.accept().await.unwrap();
                held.push(stream);
            }
        });
        port
    }

    async fn wait_for_status(registry: &ScanRegistry, scan_id: &str, status: ScanStatus) -> ScanJob {
        let deadline = Instant::now() + Duration::from_secs(30);
        loop {
            let job = registry.snapshot(scan_id).await.unwrap();
            if job.status == status {
                return job;
            }
            if Instant::now() > deadline {
                panic!("Scan {} stuck in {:?}", scan_id, job.status);
            }
            sleep(Duration::from_millis(50)).await;
        }
    }

    #[tokio::test]
    async fn test_job_runs_to_completion() {
        let registry = ScanRegistry::new();
        let runner = ScanRunner::new(&registry).unwrap();

        let port = listen_with_banner(b"220 ready\r\n").await;
        let scan_id = runner.start_job(vec![
            format!("127.0.0.1:{}", port),
            format!("127.0.0.1:{}", port),
            "127.0.0.1:1".to_owned(),
        ], Protocol::Tcp).await.unwrap();

        let job = wait_for_status(&registry, &scan_id, ScanStatus::Completed).await;
        assert_eq!(3, job.processed);
        assert_eq!(2, job.successful);
        assert!((job.progress - 100.0).abs() < f64::EPSILON);
        assert_eq!(2, job.reachable_hosts().len());

        let counters = runner.counters().clone_inner().await;
        assert_eq!(1, counters.jobs_started);
        assert_eq!(1, counters.jobs_completed);
        assert_eq!(3, counters.hosts_probed);
        assert_eq!(2, counters.hosts_reachable);
    }

    #[tokio::test]
    async fn test_invalid_requests_rejected() {
        let registry = ScanRegistry::new();
        let runner = ScanRunner::new(&registry).unwrap();

        assert!(runner.start_job(vec![], Protocol::Http).await.is_err());
        assert!(runner.start_job(vec!["bad host".to_owned()], Protocol::Http).await.is_err());
        // raw TCP scans need a port on every target
        assert!(runner.start_job(vec!["127.0.0.1".to_owned()], Protocol::Tcp).await.is_err());
    }

    #[tokio::test]
    async fn test_cancel_stops_job() {
        let registry = ScanRegistry::new();
        let runner = ScanRunner::new(&registry).unwrap();

        let port = silent_listener().await;
        let scan_id = runner.start_job(vec![
            format!("127.0.0.1:{}", port),
            format!("127.0.0.1:{}", port),
        ], Protocol::Tcp).await.unwrap();

        sleep(Duration::from_millis(200)).await;
        assert_eq!(Some(ScanStatus::Cancelled), runner.cancel_job(&scan_id).await);
        assert_eq!(None, runner.cancel_job("scan_404").await);

        // the in-flight probes drain without flipping the job back
        sleep(Duration::from_secs(4)).await;
        let job = registry.snapshot(&scan_id).await.unwrap();
        assert_eq!(ScanStatus::Cancelled, job.status);
        assert_eq!(0, job.processed);
    }
}
