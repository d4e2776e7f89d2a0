use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use super::history::deserialize_optional_timestamp;
use chrono::{DateTime, Utc};

pub const DEFAULT_INTERVAL_MS: u64 = 60_000;
pub const MIN_INTERVAL_MS: u64 = 30_000;
pub const MAX_INTERVAL_MS: u64 = 900_000;

/// Polling state owned by the scheduler.
#[derive(Debug, Clone)]
pub struct RefreshState {
    pub interval_ms: u64,
    pub next_fire_at: Option<Instant>,
    /// Size of the last history sample fed to the analyzer.
    pub pattern_sample_count: usize,
    pub is_running: bool,
}

impl Default for RefreshState {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_INTERVAL_MS,
            next_fire_at: None,
            pattern_sample_count: 0,
            is_running: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RadarStatusKind {
    Online,
    Offline,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RadarStatus {
    pub status: RadarStatusKind,
    #[serde(default, deserialize_with = "deserialize_optional_timestamp")]
    pub data_timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataTimeResponse {
    pub success: bool,
    #[serde(default, deserialize_with = "deserialize_optional_timestamp")]
    pub data_timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub data_time_local_display: Option<String>,
    #[serde(default)]
    pub is_fallback: bool,
}

/// Latest data time, after `success` has been checked.
#[derive(Debug, Clone, PartialEq)]
pub struct DataTime {
    pub timestamp: DateTime<Utc>,
    pub local_display: Option<String>,
    pub is_fallback: bool,
}

/// A fetched raster. The bytes are opaque; only the format and size are read.
#[derive(Debug, Clone)]
pub struct OverlayImage {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}
