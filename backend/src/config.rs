use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_database_url")]
    pub database_url: String,

    /// Path of a kubeconfig to register at startup
    #[serde(default)]
    pub kubeconfig: Option<String>,

    /// Fall back to `~/.kube/config` when no path is given
    #[serde(default = "default_true")]
    pub load_local_kubeconfig: bool,

    #[serde(default = "default_cluster_name")]
    pub default_cluster_name: String,

    /// Seconds between monitor passes (health, usage, alerts)
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Usage samples kept per cluster, one per monitor pass
    #[serde(default = "default_usage_history_samples")]
    pub usage_history_samples: usize,

    #[serde(default = "default_true")]
    pub auth_enabled: bool,

    #[serde(default = "default_admin_username")]
    pub admin_username: String,

    #[serde(default = "default_admin_password")]
    pub admin_password: String,

    #[serde(default = "default_session_ttl_hours")]
    pub session_ttl_hours: i64,
}

fn default_port() -> u16 {
    8080
}

fn default_database_url() -> String {
    "sqlite://kubeview.db".to_string()
}

fn default_true() -> bool {
    true
}

fn default_cluster_name() -> String {
    "local".to_string()
}

fn default_poll_interval_secs() -> u64 {
    30
}

fn default_usage_history_samples() -> usize {
    // 24h at the default interval
    2880
}

fn default_admin_username() -> String {
    "admin".to_string()
}

fn default_admin_password() -> String {
    "password".to_string()
}

fn default_session_ttl_hours() -> i64 {
    24
}

impl Config {
    pub fn load() -> Result<Self> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::Environment::default())
            .build()?;

        let settings: Config = config
            .try_deserialize()
            .unwrap_or_else(|_| Config::default());

        Ok(settings)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: default_port(),
            database_url: default_database_url(),
            kubeconfig: None,
            load_local_kubeconfig: default_true(),
            default_cluster_name: default_cluster_name(),
            poll_interval_secs: default_poll_interval_secs(),
            usage_history_samples: default_usage_history_samples(),
            auth_enabled: default_true(),
            admin_username: default_admin_username(),
            admin_password: default_admin_password(),
            session_ttl_hours: default_session_ttl_hours(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.port, 8080);
        assert_eq!(config.database_url, "sqlite://kubeview.db");
        assert_eq!(config.default_cluster_name, "local");
        assert_eq!(config.poll_interval_secs, 30);
        assert_eq!(config.usage_history_samples, 2880);
        assert!(config.auth_enabled);
        assert_eq!(config.session_ttl_hours, 24);
    }

    #[test]
    fn test_deserialize_fills_defaults() {
        let source = config::Config::builder()
            .set_override("port", 9090)
            .unwrap()
            .set_override("auth_enabled", false)
            .unwrap()
            .build()
            .unwrap();
        let config: Config = source.try_deserialize().unwrap();

        assert_eq!(config.port, 9090);
        assert!(!config.auth_enabled);
        assert_eq!(config.admin_username, "admin");
        assert!(config.kubeconfig.is_none());
    }
}
