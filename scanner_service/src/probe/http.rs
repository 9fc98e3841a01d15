use std::time::Duration;

use async_trait::async_trait;
use reqwest::Response;
use serde::{Deserialize, Serialize};

use crate::address::Target;
use crate::error::*;

use super::{ProbeReport, ProbeTask};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct HttpProbeData {
    pub status: u16,
    pub server: Option<String>,
}

impl HttpProbeData {
    fn from_response(response: &Response) -> Self {
        Self {
            status: response.status().as_u16(),
            server: response.headers().get("server")
                .and_then(|value| value.to_str().ok())
                .map(str::to_owned),
        }
    }
}

pub struct HttpProbe {
    scheme: &'static str,
    default_port: u16,
    client: reqwest::Client,
}

impl HttpProbe {
    pub fn new(scheme: &'static str, default_port: u16, timeout: u64) -> Result<Self, SimpleError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout))
            .danger_accept_invalid_certs(true)
            .build()?;
        Ok(Self {
            scheme,
            default_port,
            client,
        })
    }
}

#[async_trait]
impl ProbeTask for HttpProbe {
    async fn probe(&self, target: &Target) -> Result<ProbeReport, SimpleError> {
        let url = target.url(self.scheme, self.default_port);
        let response = self.client.get(&url).send().await?;
        log::info!("GET {} - {}", url, response.status());
        Ok(ProbeReport::Http(HttpProbeData::from_response(&response)))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task;

    async fn serve_once(response: &'static [u8]) -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        task::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buffer = [0u8; 2048];
            let _ = stream.read(&mut buffer).await;
            stream.write_all(response).await.unwrap();
            let _ = stream.shutdown().await;
        });
        port
    }

    #[tokio::test]
    async fn test_http_probe() {
        let port = serve_once(
            b"HTTP/1.1 200 OK\r\nServer: testd/0.1\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
        ).await;
        let probe = HttpProbe::new("http", 80, 5).unwrap();
        let target = Target::parse(&format!("127.0.0.1:{}", port)).unwrap();
        match probe.probe(&target).await.unwrap() {
            ProbeReport::Http(data) => {
                assert_eq!(200, data.status);
                assert_eq!(Some("testd/0.1".to_owned()), data.server);
            },
            report => panic!("Unexpected report {:?}", report),
        }
    }

    #[tokio::test]
    async fn test_http_probe_refused() {
        let probe = HttpProbe::new("http", 80, 1).unwrap();
        let target = Target::parse("127.0.0.1:1").unwrap();
        assert!(probe.probe(&target).await.is_err());
    }
}
