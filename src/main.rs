mod controller;
mod error;
mod misc;

use std::time::Duration;

use actix_web::{App, HttpServer, web::Data};
use clap::Parser;
use hscn::{GLOBAL_CONFIG, Protocol, ScanClient, ScanRequest, ScanTracker, WorkerService};

#[derive(Parser)]
#[clap(name = "hscn", version = "0.1.0")]
struct CliOptions {
    #[clap(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Run the scan service daemon
    Serve {
        #[clap(short, long, env = "HSCN_LISTEN")]
        listen: Option<String>,
    },
    /// Start a scan on a remote service and follow it to completion
    Scan {
        /// Base URL of the scan service
        #[clap(short, long, env = "HSCN_BACKEND")]
        backend: Option<String>,

        #[clap(short, long, default_value = "http")]
        protocol: Protocol,

        /// Poll interval in milliseconds
        #[clap(long)]
        interval: Option<u64>,

        /// Hosts to scan: `host`, `host:port` or an IPv4 CIDR block
        #[clap(required = true)]
        hosts: Vec<String>,
    },
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));
    let opts = CliOptions::parse();

    match opts.command {
        Command::Serve { listen } => serve(listen).await,
        Command::Scan { backend, protocol, interval, hosts } => {
            if !run_scan(backend, protocol, interval, hosts).await {
                std::process::exit(1);
            }
            Ok(())
        },
    }
}

async fn serve(listen: Option<String>) -> std::io::Result<()> {
    let service = WorkerService::start()
        .map_err(|err| std::io::Error::new(std::io::ErrorKind::Other, err.msg))?;
    let listen = listen.unwrap_or_else(|| service.config().listen.clone());
    log::info!("Scan service listening on {}", listen);

    let data = Data::new(service);
    HttpServer::new(move || {
        App::new()
            .app_data(data.clone())
            .configure(controller::config)
    })
    .bind(&listen)?
    .run()
    .await
}

async fn run_scan(
    backend: Option<String>,
    protocol: Protocol,
    interval: Option<u64>,
    hosts: Vec<String>,
) -> bool {
    let backend = backend.unwrap_or_else(|| GLOBAL_CONFIG.backend.clone());
    let interval = Duration::from_millis(interval.unwrap_or(GLOBAL_CONFIG.poll.interval));
    let client = match ScanClient::new(&backend) {
        Ok(client) => client,
        Err(err) => {
            log::error!("Failed to set up scan client: {}", err.msg);
            return false;
        },
    };
    let mut tracker = ScanTracker::new(client, interval);

    let request = ScanRequest { hosts, protocol };
    let scan_id = match tracker.start(&request).await {
        Ok(scan_id) => scan_id,
        Err(err) => {
            log::error!("Failed to start scan: {}", err.msg);
            return false;
        },
    };
    log::info!("Scan started: {}", scan_id);

    match tracker.join().await {
        Ok(job) => {
            log::info!("Scan completed: {}/{} hosts reachable", job.successful, job.processed);
            for host in job.reachable_hosts() {
                log::info!("  {}", host);
            }
            true
        },
        Err(err) => {
            log::error!("Scan {} failed: {}", scan_id, err.msg);
            false
        },
    }
}
