use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub version: String,
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub refresh: RefreshSettings,
    #[serde(default)]
    pub hover: HoverSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: "1.0.0".to_string(),
            server: ServerSettings::default(),
            refresh: RefreshSettings::default(),
            hover: HoverSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    pub base_url: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

fn default_request_timeout() -> u64 {
    15
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshSettings {
    pub auto_refresh: bool,
    pub adaptive: bool,
}

impl Default for RefreshSettings {
    fn default() -> Self {
        Self {
            auto_refresh: true,
            adaptive: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HoverSettings {
    pub enabled: bool,
    #[serde(default = "default_quiet_period")]
    pub quiet_period_ms: u64,
}

impl Default for HoverSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            quiet_period_ms: default_quiet_period(),
        }
    }
}

fn default_quiet_period() -> u64 {
    200
}
