use crate::models::{TimestampHistoryEntry, MAX_INTERVAL_MS, MIN_INTERVAL_MS};

// Gaps below this are request times, not real data updates.
const MIN_MEANINGFUL_DIFF_MINUTES: f64 = 2.0;
const MIN_SAMPLES: usize = 2;
// Poll a little ahead of the expected next update.
const LEAD_FACTOR: f64 = 0.85;
const HYSTERESIS_MS: u64 = 30_000;

/// Infers the upstream cadence from a timestamp history and recommends a
/// polling interval. Pure and total: no signal means `None`, never an error.
#[derive(Debug, Clone)]
pub struct PatternAnalyzer {
    enabled: bool,
}

impl Default for PatternAnalyzer {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl PatternAnalyzer {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn recommend(
        &self,
        history: &[TimestampHistoryEntry],
        current_interval_ms: u64,
    ) -> Option<u64> {
        if !self.enabled {
            return None;
        }
        recommend(history, current_interval_ms)
    }
}

pub fn recommend(history: &[TimestampHistoryEntry], current_interval_ms: u64) -> Option<u64> {
    let diffs: Vec<f64> = history
        .iter()
        .filter_map(|entry| entry.time_diff_minutes)
        .collect();

    if diffs.len() < MIN_SAMPLES {
        log::debug!(
            "[PatternEngine] Not enough data for pattern analysis: {} diffs",
            diffs.len()
        );
        return None;
    }

    // One noisy gap invalidates the whole sample.
    if diffs
        .iter()
        .any(|d| !d.is_finite() || *d < MIN_MEANINGFUL_DIFF_MINUTES)
    {
        log::debug!(
            "[PatternEngine] Small intervals detected, timestamps may not reflect radar updates: {:?}",
            diffs
        );
        return None;
    }

    let avg_minutes = diffs.iter().sum::<f64>() / diffs.len() as f64;
    let candidate = (avg_minutes * 60_000.0 * LEAD_FACTOR).round() as u64;
    let candidate = candidate.clamp(MIN_INTERVAL_MS, MAX_INTERVAL_MS);

    log::debug!(
        "[PatternEngine] Average update interval {:.1} min, candidate {} ms",
        avg_minutes,
        candidate
    );

    if candidate.abs_diff(current_interval_ms) > HYSTERESIS_MS {
        Some(candidate)
    } else {
        None
    }
}
