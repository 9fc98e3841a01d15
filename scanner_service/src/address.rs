use std::{fmt::{self, Display, Formatter}, net::Ipv4Addr, ops::Range, str::FromStr};

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::*;

// Largest block a single request entry may expand to.
const MAX_CIDR_BITS: u32 = 16;

lazy_static! {
    static ref HOST_PATTERN: Regex = Regex::new(r"^[A-Za-z0-9][A-Za-z0-9.-]*$").unwrap();
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Target {
    pub host: String,
    pub port: Option<u16>,
}

impl Target {
    pub fn parse(target: &str) -> Result<Self, SimpleError> {
        let (host, port) = match target.rfind(':') {
            Some(idx) => {
                let port: u16 = target[idx + 1..].parse()
                    .map_err(|_| SimpleError::new("Invalid port number"))?;
                (&target[..idx], Some(port))
            },
            None => (target, None),
        };
        if !HOST_PATTERN.is_match(host) {
            Err(format!("Invalid host {:?}", host))?
        }
        Ok(Self {
            host: host.to_owned(),
            port,
        })
    }
    pub fn socket_addr(&self, default_port: u16) -> String {
        format!("{}:{}", self.host, self.port.unwrap_or(default_port))
    }
    pub fn url(&self, scheme: &str, default_port: u16) -> String {
        format!("{}://{}", scheme, self.socket_addr(default_port))
    }
}

impl Display for Target {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.port {
            Some(port) => write!(f, "{}:{}", self.host, port),
            None => write!(f, "{}", self.host),
        }
    }
}

pub fn parse_ipv4_cidr(cidr: &str) -> Result<Range<u32>, SimpleError> {
    let (addr, prefix) = match cidr.split_once('/') {
        Some(parts) => parts,
        None => Err("Invalid CIDR notation")?,
    };
    let prefix: u32 = prefix.parse().map_err(|_| SimpleError::new("Invalid CIDR prefix"))?;
    if prefix > 32 {
        Err("Invalid CIDR prefix")?
    }
    if 32 - prefix > MAX_CIDR_BITS {
        Err(format!("CIDR block /{} too large, smallest accepted prefix is /{}", prefix, 32 - MAX_CIDR_BITS))?
    }
    let base: u32 = Ipv4Addr::from_str(addr)?.into();
    let size: u32 = 1 << (32 - prefix);
    let start = base & !(size - 1);
    match start.checked_add(size) {
        Some(end) => Ok(start..end),
        None => Err("CIDR block exceeds the IPv4 address space")?,
    }
}

/// Expands raw request entries into probe targets. A plain entry parses
/// as `host[:port]`, an entry containing `/` as an IPv4 CIDR block.
pub fn expand_targets(hosts: &[String]) -> Result<Vec<Target>, SimpleError> {
    let mut targets = Vec::new();
    for entry in hosts {
        if entry.contains('/') {
            for addr in parse_ipv4_cidr(entry)? {
                targets.push(Target {
                    host: Ipv4Addr::from(addr).to_string(),
                    port: None,
                });
            }
        } else {
            targets.push(Target::parse(entry)?);
        }
    }
    Ok(targets)
}
