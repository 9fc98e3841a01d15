mod http;
mod tcp;

pub use http::{HttpProbe, HttpProbeData};
pub use tcp::{BannerData, TcpProbe};

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::address::Target;
use crate::config::GLOBAL_CONFIG;
use crate::error::*;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Http,
    Https,
    Ssh,
    Ftp,
    Tcp,
}

impl Protocol {
    pub fn name(self) -> &'static str {
        match self {
            Protocol::Http => "http",
            Protocol::Https => "https",
            Protocol::Ssh => "ssh",
            Protocol::Ftp => "ftp",
            Protocol::Tcp => "tcp",
        }
    }
    pub fn default_port(self) -> Option<u16> {
        match self {
            Protocol::Http => Some(80),
            Protocol::Https => Some(443),
            Protocol::Ssh => Some(22),
            Protocol::Ftp => Some(21),
            Protocol::Tcp => None,
        }
    }
}

impl Display for Protocol {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Protocol {
    type Err = String;
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "http" => Ok(Protocol::Http),
            "https" => Ok(Protocol::Https),
            "ssh" => Ok(Protocol::Ssh),
            "ftp" => Ok(Protocol::Ftp),
            "tcp" => Ok(Protocol::Tcp),
            other => Err(format!("Unknown protocol {:?}", other)),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ProbeReport {
    Http(HttpProbeData),
    Banner(BannerData),
}

#[async_trait]
pub trait ProbeTask {
    async fn probe(&self, target: &Target) -> Result<ProbeReport, SimpleError>;
}

/// Protocol dispatch over the configured probe set.
#[derive(Clone)]
pub struct Prober {
    http: Arc<HttpProbe>,
    https: Arc<HttpProbe>,
    tcp: TcpProbe,
}

impl Prober {
    pub fn new() -> Result<Self, SimpleError> {
        Ok(Self {
            http: Arc::new(HttpProbe::new("http", 80, GLOBAL_CONFIG.scanner.http.timeout)?),
            https: Arc::new(HttpProbe::new("https", 443, GLOBAL_CONFIG.scanner.https.timeout)?),
            tcp: TcpProbe::new(GLOBAL_CONFIG.scanner.tcp.timeout),
        })
    }

    pub async fn probe(&self, protocol: Protocol, target: &Target) -> Result<ProbeReport, SimpleError> {
        match protocol {
            Protocol::Http => self.http.probe(target).await,
            Protocol::Https => self.https.probe(target).await,
            Protocol::Ssh => self.tcp.probe_port(target, 22).await,
            Protocol::Ftp => self.tcp.probe_port(target, 21).await,
            Protocol::Tcp => self.tcp.probe(target).await,
        }
    }
}
