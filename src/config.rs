use std::{fs, path::Path, time::Duration};

use serde::Deserialize;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 9227;
/// Sessions idle for longer than this are purged.
pub const DEFAULT_SESSION_TTL_SECS: u64 = 300;
pub const DEFAULT_PURGE_INTERVAL_SECS: u64 = 60;

#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub host: Option<String>,
    pub port: Option<u16>,
    /// `0` disables expiry.
    pub session_ttl_secs: Option<u64>,
    pub purge_interval_secs: Option<u64>,
}

impl Config {
    pub fn from_file(path: impl AsRef<Path>) -> crate::Result<Self> {
        let toml_string = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&toml_string)?;
        Ok(config)
    }

    pub fn host(&self) -> &str {
        self.host.as_deref().unwrap_or(DEFAULT_HOST)
    }

    pub fn port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_PORT)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host(), self.port())
    }

    pub fn session_ttl(&self) -> Option<Duration> {
        match self.session_ttl_secs.unwrap_or(DEFAULT_SESSION_TTL_SECS) {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    pub fn purge_interval(&self) -> Duration {
        let secs = self
            .purge_interval_secs
            .unwrap_or(DEFAULT_PURGE_INTERVAL_SECS)
            .max(1);
        Duration::from_secs(secs)
    }
}

#[cfg(test)]
mod tests {
    use std::{fs, time::Duration};

    use tempfile::tempdir;

    use super::{Config, DEFAULT_PORT};
    use crate::Result;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.port(), DEFAULT_PORT);
        assert_eq!(config.bind_addr(), "0.0.0.0:9227");
        assert_eq!(config.session_ttl(), Some(Duration::from_secs(300)));
        assert_eq!(config.purge_interval(), Duration::from_secs(60));
    }

    #[test]
    fn load_from_toml() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("relay.toml");
        fs::write(
            &path,
            "host = \"127.0.0.1\"\nport = 8080\nsession_ttl_secs = 0\npurge_interval_secs = 5\n",
        )?;
        let config = Config::from_file(&path)?;
        assert_eq!(config.bind_addr(), "127.0.0.1:8080");
        assert_eq!(config.session_ttl(), None);
        assert_eq!(config.purge_interval(), Duration::from_secs(5));
        Ok(())
    }

    #[test]
    fn partial_toml_keeps_defaults() -> Result<()> {
        let config: Config = toml::from_str("port = 1234")?;
        assert_eq!(config.host(), "0.0.0.0");
        assert_eq!(config.port(), 1234);
        assert_eq!(config.session_ttl(), Some(Duration::from_secs(300)));
        Ok(())
    }
}
