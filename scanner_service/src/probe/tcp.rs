use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::address::Target;
use crate::error::*;

use super::{ProbeReport, ProbeTask};

const MAX_BANNER_BYTES: usize = 256;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct BannerData {
    pub banner: Option<String>,
}

#[derive(Clone, Copy)]
pub struct TcpProbe {
    timeout: u64, // seconds
}

impl TcpProbe {
    pub fn new(timeout: u64) -> Self {
        Self { timeout }
    }

    /// Connects to the target and captures the greeting line if the peer
    /// sends one before the timeout (FTP/SSH-style services do).
    pub async fn probe_port(&self, target: &Target, default_port: u16) -> Result<ProbeReport, SimpleError> {
        let addr = target.socket_addr(default_port);
        let mut stream = timeout(Duration::from_secs(self.timeout), TcpStream::connect(&addr))
            .await
            .map_err(|_| "Connect timeout")??;
        log::info!("TCP open at {}", addr);
        let banner = match timeout(Duration::from_secs(self.timeout), Self::read_banner(&mut stream)).await {
            Ok(Ok(banner)) => banner,
            _ => None,
        };
        Ok(ProbeReport::Banner(BannerData { banner }))
    }

    async fn read_banner(stream: &mut TcpStream) -> Result<Option<String>, SimpleError> {
        let mut buffer = Vec::new();
        loop {
            let mut chunk = [0u8; 64];
            let count = stream.read(&mut chunk).await?;
            if count == 0 {
                break;
            }
            buffer.extend_from_slice(&chunk[..count]);
            if buffer.contains(&b'\n') || buffer.len() >= MAX_BANNER_BYTES {
                break;
            }
        }
        let line = match buffer.iter().position(|&byte| byte == b'\n') {
            Some(idx) => &buffer[..idx],
            None if buffer.is_empty() => return Ok(None),
            None => &buffer[..],
        };
        let line = std::str::from_utf8(line)?.trim_end_matches('\r');
        Ok(Some(line.to_owned()))
    }
}

#[async_trait]
impl ProbeTask for TcpProbe {
    async fn probe(&self, target: &Target) -> Result<ProbeReport, SimpleError> {
        let port = target.port.ok_or(SimpleError::new("No port specified for raw TCP probe"))?;
        self.probe_port(target, port).await
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpListener;
    use tokio::task;

    async fn listen_with_banner(banner: &'static [u8]) -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        task::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            stream.write_all(banner).await.unwrap();
            let _ = stream.shutdown().await;
        });
        port
    }

    #[tokio::test]
    async fn test_banner_capture() {
        let port = listen_with_banner(b"220 Welcome to the FTP service.\r\n").await;
        let probe = TcpProbe::new(2);
        let target = Target::parse("127.0.0.1").unwrap();
        match probe.probe_port(&target, port).await.unwrap() {
            ProbeReport::Banner(data) => {
                assert_eq!(Some("220 Welcome to the FTP service.".to_owned()), data.banner);
            },
            report => panic!("Unexpected report {:?}", report),
        }
    }

    #[tokio::test]
    async fn test_silent_peer() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        task::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
            drop(stream);
        });
        let probe = TcpProbe::new(1);
        let target = Target::parse(&format!("127.0.0.1:{}", port)).unwrap();
        match probe.probe(&target).await.unwrap() {
            ProbeReport::Banner(data) => assert_eq!(None, data.banner),
            report => panic!("Unexpected report {:?}", report),
        }
    }

    #[tokio::test]
    async fn test_closed_port() {
        let probe = TcpProbe::new(1);
        let target = Target::parse("127.0.0.1:1").unwrap();
        assert!(probe.probe(&target).await.is_err());

        let no_port = Target::parse("127.0.0.1").unwrap();
        assert!(probe.probe(&no_port).await.is_err());
    }
}
