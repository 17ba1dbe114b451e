use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::platform;

/// Environment override for `backend.base_url`.
pub const BACKEND_URL_ENV: &str = "TIMEMACHINE_BACKEND_URL";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub notifications: NotificationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Root of the REST backend; endpoint paths are appended to it.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// A first page with at least this many tracks triggers an eager second
    /// fetch during the initial load. 0 disables the prefetch.
    #[serde(default = "default_prefetch_threshold")]
    pub prefetch_threshold: usize,
    /// Treat a non-empty page shorter than `prefetch_threshold` as the end of
    /// history. Off by default: only an empty page ends it.
    #[serde(default)]
    pub end_on_short_page: bool,
    /// How many rows before the end-of-list marker the scroll trigger fires.
    #[serde(default = "default_trigger_lookahead_rows")]
    pub trigger_lookahead_rows: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Loopback address the OAuth redirect lands on. Must match the redirect
    /// URI registered with the backend.
    #[serde(default = "default_redirect_bind")]
    pub redirect_bind: String,
    #[serde(default = "default_callback_path")]
    pub callback_path: String,
    #[serde(default = "default_open_browser")]
    pub open_browser: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Lifetime of a notification. 0 keeps it until dismissed.
    #[serde(default = "default_duration_ms")]
    pub duration_ms: u64,
    #[serde(default = "default_max_visible")]
    pub max_visible: usize,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            prefetch_threshold: default_prefetch_threshold(),
            end_on_short_page: false,
            trigger_lookahead_rows: default_trigger_lookahead_rows(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            redirect_bind: default_redirect_bind(),
            callback_path: default_callback_path(),
            open_browser: default_open_browser(),
        }
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            duration_ms: default_duration_ms(),
            max_visible: default_max_visible(),
        }
    }
}

impl BackendConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl AuthConfig {
    /// The redirect URI as the browser sees it.
    pub fn redirect_uri(&self) -> String {
        format!("http://{}{}", self.redirect_bind, self.callback_path)
    }
}

impl NotificationConfig {
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }
}

fn default_base_url() -> String {
    "http://127.0.0.1:8888".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_prefetch_threshold() -> usize {
    50
}

fn default_trigger_lookahead_rows() -> usize {
    3
}

fn default_redirect_bind() -> String {
    "127.0.0.1:3000".to_string()
}

fn default_callback_path() -> String {
    "/callback".to_string()
}

fn default_open_browser() -> bool {
    true
}

fn default_duration_ms() -> u64 {
    5000
}

fn default_max_visible() -> usize {
    4
}

impl Config {
    /// Load from the default location, writing a default file on first run,
    /// then apply environment overrides.
    pub fn load() -> anyhow::Result<Self> {
        let mut config = Self::load_from(&Self::config_path())?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply `TIMEMACHINE_BACKEND_URL`, if set.
    pub fn apply_env_overrides(&mut self) {
        self.override_backend_url(std::env::var(BACKEND_URL_ENV).ok().as_deref());
    }

    fn override_backend_url(&mut self, url: Option<&str>) {
        if let Some(url) = url.map(str::trim).filter(|u| !u.is_empty()) {
            self.backend.base_url = url.to_string();
        }
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            let config = Self::default();
            config.save_to(path)?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        platform::config_dir().join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.backend.base_url, "http://127.0.0.1:8888");
        assert_eq!(config.backend.timeout(), Duration::from_secs(10));
        assert_eq!(config.history.prefetch_threshold, 50);
        assert!(!config.history.end_on_short_page);
        assert_eq!(config.auth.redirect_uri(), "http://127.0.0.1:3000/callback");
        assert_eq!(config.notifications.duration(), Duration::from_millis(5000));
    }

    #[test]
    fn test_partial_file_falls_back_to_defaults() {
        let config: Config = toml::from_str(
            r#"
            [history]
            prefetch_threshold = 20
            "#,
        )
        .unwrap();
        assert_eq!(config.history.prefetch_threshold, 20);
        assert_eq!(config.history.trigger_lookahead_rows, 3);
        assert_eq!(config.backend.base_url, "http://127.0.0.1:8888");
        assert!(config.auth.open_browser);
    }

    #[test]
    fn test_backend_url_override() {
        let mut config = Config::default();
        config.override_backend_url(None);
        config.override_backend_url(Some("   "));
        assert_eq!(config.backend.base_url, "http://127.0.0.1:8888");
        config.override_backend_url(Some(" http://backend.lan:8888 "));
        assert_eq!(config.backend.base_url, "http://backend.lan:8888");
    }

    #[test]
    fn test_first_load_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.notifications.max_visible, 4);

        let mut edited = config.clone();
        edited.backend.base_url = "http://10.0.0.2:9000".to_string();
        edited.save_to(&path).unwrap();
        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded.backend.base_url, "http://10.0.0.2:9000");
    }
}
