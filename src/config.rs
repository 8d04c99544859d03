use std::path::Path;

use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};

/// Root configuration. Defaults, then an optional YAML file, then `MOCKNET_*`
/// environment overrides.
///
/// Hard safety constraint: this repo automates ONLY the bundled local mock
/// app, so validation enforces a localhost base URL.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub mocknet: MocknetConfig,
    pub auth: AuthConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
    pub run: RunConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MocknetConfig {
    pub base_url: String,
    pub port: u16,
    pub brand_name: String,
    pub checkpoint: bool,
}

impl Default for MocknetConfig {
    fn default() -> Self {
        MocknetConfig {
            base_url: "http://localhost:8080".to_owned(),
            port: 8080,
            brand_name: "Mock Professional Network".to_owned(),
            checkpoint: false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub sqlite_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            sqlite_path: "data/mocknet.db".to_owned(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: "info".to_owned(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub timeout_secs: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig { timeout_secs: 45 }
    }
}

impl Config {
    pub fn load(path: Option<&Path>) -> anyhow::Result<Config> {
        let mut cfg = match path {
            Some(p) => {
                let raw = std::fs::read_to_string(p)
                    .with_context(|| format!("read config file {}", p.display()))?;
                Config::from_yaml(&raw)
                    .with_context(|| format!("parse config file {}", p.display()))?
            }
            None => Config::default(),
        };
        cfg.apply_env_overrides();
        cfg.validate()?;
        Ok(cfg)
    }

    /// Fields absent from the file keep their defaults.
    pub fn from_yaml(raw: &str) -> anyhow::Result<Config> {
        Ok(serde_yaml::from_str(raw)?)
    }

    fn apply_env_overrides(&mut self) {
        fn env_str(key: &str) -> Option<String> {
            std::env::var(key).ok().filter(|v| !v.trim().is_empty())
        }

        if let Some(v) = env_str("MOCKNET_AUTH_USERNAME") {
            self.auth.username = v;
        }
        if let Some(v) = env_str("MOCKNET_AUTH_PASSWORD") {
            self.auth.password = v;
        }
        if let Some(v) = env_str("MOCKNET_BASE_URL") {
            self.mocknet.base_url = v;
        }
        if let Some(v) = env_str("MOCKNET_SQLITE_PATH") {
            self.storage.sqlite_path = v;
        }
        if let Some(v) = env_str("MOCKNET_PORT") {
            if let Ok(p) = v.trim().parse() {
                self.mocknet.port = p;
            }
        }
        if let Some(v) = env_str("MOCKNET_CHECKPOINT") {
            if let Ok(b) = v.trim().parse() {
                self.mocknet.checkpoint = b;
            }
        }
        if let Some(v) = env_str("MOCKNET_LOG_LEVEL") {
            self.logging.level = v;
        }
        if let Some(v) = env_str("MOCKNET_LOG_JSON") {
            if let Ok(b) = v.trim().parse() {
                self.logging.json = b;
            }
        }
        if let Some(v) = env_str("MOCKNET_TIMEOUT_SECS") {
            if let Ok(n) = v.trim().parse() {
                self.run.timeout_secs = n;
            }
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let mut problems = Vec::new();

        let base = self.mocknet.base_url.trim();
        if base.is_empty() {
            problems.push("mocknet.base_url is required".to_owned());
        } else {
            match base.strip_prefix("http://") {
                None => problems.push("mocknet.base_url must use http".to_owned()),
                Some(rest) => {
                    let host = rest.split(['/', '?']).next().unwrap_or_default();
                    let host = host.rsplit_once(':').map(|(h, _)| h).unwrap_or(host);
                    if host != "localhost" && host != "127.0.0.1" {
                        problems.push(
                            "mocknet.base_url must point to localhost/127.0.0.1 (local mock app only)"
                                .to_owned(),
                        );
                    }
                }
            }
        }

        if self.storage.sqlite_path.trim().is_empty() {
            problems.push("storage.sqlite_path is required".to_owned());
        }

        match self.logging.level.trim().to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "warning" | "error" => {}
            "" => problems.push("logging.level is required".to_owned()),
            _ => problems
                .push("logging.level must be one of: trace, debug, info, warn, error".to_owned()),
        }

        if self.run.timeout_secs == 0 {
            problems.push("run.timeout_secs must be > 0".to_owned());
        }

        if !problems.is_empty() {
            bail!("config validation failed: {}", problems.join("; "));
        }
        Ok(())
    }
}
