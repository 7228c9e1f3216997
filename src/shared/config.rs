use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub remote: RemoteConfig,
    pub network: NetworkConfig,
    pub sync: SyncConfig,
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Project base URL, e.g. `https://xyz.supabase.co`
    pub base_url: String,
    pub api_key: String,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Falls back to the remote base URL when unset.
    pub probe_url: Option<String>,
    pub poll_interval_secs: u64,
    pub probe_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Kick off a drain right after a successful enqueue when online.
    pub auto_drain: bool,
    /// Confirmed operations older than this are compacted away.
    pub queue_retention_hours: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub analytics_ttl_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: default_database_url(),
                max_connections: 5,
            },
            remote: RemoteConfig {
                base_url: "http://localhost:54321".to_string(),
                api_key: String::new(),
                request_timeout_secs: 30,
            },
            network: NetworkConfig {
                probe_url: None,
                poll_interval_secs: 5,
                probe_timeout_secs: 3,
            },
            sync: SyncConfig {
                auto_drain: true,
                queue_retention_hours: 24,
            },
            cache: CacheConfig {
                analytics_ttl_secs: 3600, // 1 hour
            },
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(v) = std::env::var("BARBERPRO_DATABASE_URL") {
            if !v.trim().is_empty() {
                cfg.database.url = v.trim().to_string();
            }
        }
        if let Some(value) = env_u64("BARBERPRO_DB_MAX_CONNECTIONS") {
            cfg.database.max_connections = value.clamp(1, u32::MAX as u64) as u32;
        }

        if let Ok(v) = std::env::var("BARBERPRO_REMOTE_URL") {
            cfg.remote.base_url = v.trim().trim_end_matches('/').to_string();
        }
        if let Ok(v) = std::env::var("BARBERPRO_REMOTE_API_KEY") {
            cfg.remote.api_key = v.trim().to_string();
        }
        if let Some(value) = env_u64("BARBERPRO_REMOTE_TIMEOUT_SECS") {
            cfg.remote.request_timeout_secs = value.max(1);
        }

        if let Ok(v) = std::env::var("BARBERPRO_PROBE_URL") {
            let v = v.trim();
            cfg.network.probe_url = if v.is_empty() {
                None
            } else {
                Some(v.to_string())
            };
        }
        if let Some(value) = env_u64("BARBERPRO_POLL_INTERVAL_SECS") {
            cfg.network.poll_interval_secs = value.max(1);
        }
        if let Some(value) = env_u64("BARBERPRO_PROBE_TIMEOUT_SECS") {
            cfg.network.probe_timeout_secs = value.max(1);
        }

        if let Ok(v) = std::env::var("BARBERPRO_AUTO_DRAIN") {
            cfg.sync.auto_drain = parse_bool(&v, cfg.sync.auto_drain);
        }
        if let Some(value) = env_u64("BARBERPRO_QUEUE_RETENTION_HOURS") {
            cfg.sync.queue_retention_hours = value;
        }
        if let Some(value) = env_u64("BARBERPRO_ANALYTICS_TTL_SECS") {
            cfg.cache.analytics_ttl_secs = value;
        }

        cfg
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.database.url.trim().is_empty() {
            return Err("Database url must not be empty".to_string());
        }
        if self.database.max_connections == 0 {
            return Err("Database max_connections must be greater than 0".to_string());
        }
        if !(self.remote.base_url.starts_with("http://")
            || self.remote.base_url.starts_with("https://"))
        {
            return Err(format!(
                "Remote base_url must be an http(s) URL, got `{}`",
                self.remote.base_url
            ));
        }
        if self.remote.request_timeout_secs == 0 {
            return Err("Remote request_timeout_secs must be greater than 0".to_string());
        }
        if self.network.poll_interval_secs == 0 {
            return Err("Network poll_interval_secs must be greater than 0".to_string());
        }
        Ok(())
    }

    pub fn probe_url(&self) -> String {
        self.network
            .probe_url
            .clone()
            .unwrap_or_else(|| self.remote.base_url.clone())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.network.poll_interval_secs)
    }

    pub fn analytics_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.cache.analytics_ttl_secs as i64)
    }

    pub fn queue_retention(&self) -> chrono::Duration {
        chrono::Duration::hours(self.sync.queue_retention_hours as i64)
    }
}

fn default_database_url() -> String {
    let dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("barberpro");
    format!("sqlite://{}?mode=rwc", dir.join("BarberPro.db").display())
}

fn parse_bool(s: &str, default: bool) -> bool {
    match s.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}

fn parse_u64(value: &str) -> Option<u64> {
    value.trim().parse::<u64>().ok()
}

fn env_u64(name: &str) -> Option<u64> {
    std::env::var(name).ok().as_deref().and_then(parse_u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let cfg = AppConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.network.poll_interval_secs, 5);
        assert_eq!(cfg.cache.analytics_ttl_secs, 3600);
        assert!(cfg.database.url.ends_with("BarberPro.db?mode=rwc"));
    }

    #[test]
    fn probe_url_falls_back_to_remote() {
        let mut cfg = AppConfig::default();
        cfg.remote.base_url = "https://shop.example".to_string();
        assert_eq!(cfg.probe_url(), "https://shop.example");

        cfg.network.probe_url = Some("https://status.example/ping".to_string());
        assert_eq!(cfg.probe_url(), "https://status.example/ping");
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut cfg = AppConfig::default();
        cfg.remote.base_url = "ftp://nope".to_string();
        assert!(cfg.validate().is_err());

        let mut cfg = AppConfig::default();
        cfg.database.max_connections = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = AppConfig::default();
        cfg.network.poll_interval_secs = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn parse_bool_accepts_common_spellings() {
        assert!(parse_bool("YES", false));
        assert!(!parse_bool("off", true));
        assert!(parse_bool("garbage", true));
    }
}
