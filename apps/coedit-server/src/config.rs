use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use coedit::{DEFAULT_LEASE, DEFAULT_SWEEP_PERIOD};

/// Server settings, read once from the environment in `main` and injected
/// from there.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Directory for named document snapshots.
    pub data_dir: PathBuf,
    /// Directory the static client page is served from.
    pub static_dir: PathBuf,
    pub lease: Duration,
    pub sweep_period: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: ([127, 0, 0, 1], 8080).into(),
            data_dir: PathBuf::from("saved_files"),
            static_dir: PathBuf::from("static"),
            lease: DEFAULT_LEASE,
            sweep_period: DEFAULT_SWEEP_PERIOD,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(addr) = env::var("COEDIT_ADDR") {
            if let Ok(addr) = addr.parse() {
                config.bind_addr = addr;
            }
        }
        if let Ok(dir) = env::var("COEDIT_DATA_DIR") {
            config.data_dir = dir.into();
        }
        if let Ok(dir) = env::var("COEDIT_STATIC_DIR") {
            config.static_dir = dir.into();
        }
        if let Ok(secs) = env::var("COEDIT_LEASE_SECS") {
            if let Ok(secs) = secs.parse() {
                config.lease = Duration::from_secs(secs);
            }
        }
        if let Ok(secs) = env::var("COEDIT_SWEEP_SECS") {
            if let Ok(secs) = secs.parse() {
                config.sweep_period = Duration::from_secs(secs);
            }
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_lease_policy() {
        let config = ServerConfig::default();
        assert_eq!(config.lease, Duration::from_secs(30));
        assert_eq!(config.sweep_period, Duration::from_secs(5));
        assert_eq!(config.data_dir, PathBuf::from("saved_files"));
    }
}
