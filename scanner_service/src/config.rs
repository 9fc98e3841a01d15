use lazy_static::lazy_static;
use serde::Deserialize;

use crate::error::*;

const CONFIG_ENV: &str = "HSCN_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config.json";

#[derive(Deserialize, Clone)]
#[serde(default)]
pub struct Config {
    pub listen: String,
    pub backend: String,
    pub scanner: ScannerConfig,
    pub poll: PollOptions,
    pub stats: StatsConfig,
}

#[derive(Deserialize, Clone)]
#[serde(default)]
pub struct ScannerConfig {
    pub http: ProbeOptions,
    pub https: ProbeOptions,
    pub tcp: ProbeOptions,
    pub max_tasks: usize,
}

#[derive(Deserialize, Clone)]
#[serde(default)]
pub struct ProbeOptions {
    pub timeout: u64, // seconds
}

#[derive(Deserialize, Clone)]
#[serde(default)]
pub struct PollOptions {
    pub interval: u64, // ms
}

#[derive(Deserialize, Clone)]
#[serde(default)]
pub struct StatsConfig {
    pub sys_update_interval: u64, // ms
    pub scan_update_interval: u64, // ms
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:5000".to_owned(),
            backend: "http://127.0.0.1:5000".to_owned(),
            scanner: ScannerConfig::default(),
            poll: PollOptions::default(),
            stats: StatsConfig::default(),
        }
    }
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            http: ProbeOptions { timeout: 5 },
            https: ProbeOptions { timeout: 5 },
            tcp: ProbeOptions { timeout: 3 },
            max_tasks: 32,
        }
    }
}

impl Default for ProbeOptions {
    fn default() -> Self {
        Self { timeout: 5 }
    }
}

impl Default for PollOptions {
    fn default() -> Self {
        Self { interval: 1000 }
    }
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            sys_update_interval: 2000,
            scan_update_interval: 10000,
        }
    }
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self, SimpleError> {
        let data = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }
    fn load() -> Self {
        let path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_owned());
        match Self::from_file(&path) {
            Ok(config) => config,
            Err(err) => {
                log::warn!("Failed to load {}: {}, falling back to default config", path, err.msg);
                Self::default()
            }
        }
    }
}

lazy_static!{
    pub static ref GLOBAL_CONFIG: Config = {
        Config::load()
    };
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_partial_config() {
        let config: Config = serde_json::from_str(r#"{
            "listen": "127.0.0.1:8080",
            "scanner": { "tcp": { "timeout": 1 } }
        }"#).unwrap();
        assert_eq!("127.0.0.1:8080", config.listen);
        assert_eq!(1, config.scanner.tcp.timeout);
        assert_eq!(5, config.scanner.http.timeout);
        assert_eq!(1000, config.poll.interval);
    }
}
