use chrono::{DateTime, Utc};
use tokio::time::Duration;

use crate::models::TimestampHistoryEntry;

/// `"Next refresh in: M:SS"`, or `"Refreshing..."` once the fire time has passed.
pub fn countdown_text(remaining: Duration) -> String {
    if remaining.is_zero() {
        return "Refreshing...".to_string();
    }
    let secs = remaining.as_secs();
    format!("Next refresh in: {}:{:02}", secs / 60, secs % 60)
}

pub fn interval_label(interval_ms: u64, adapted: bool) -> String {
    let minutes = (interval_ms as f64 / 60_000.0 * 10.0).round() / 10.0;
    let mode = if adapted { "adaptive" } else { "learning..." };
    format!("Auto-refresh every {} min ({})", minutes, mode)
}

/// Data timestamp with its age, e.g. `"2024-05-01 12:00:00 UTC (7 min old)"`.
pub fn data_time_text(
    timestamp: DateTime<Utc>,
    local_display: Option<&str>,
    now: DateTime<Utc>,
) -> String {
    let shown = local_display
        .map(str::to_string)
        .unwrap_or_else(|| timestamp.format("%Y-%m-%d %H:%M:%S UTC").to_string());
    let age_minutes = (now - timestamp).num_minutes().max(0);
    if age_minutes < 60 {
        format!("{} ({} min old)", shown, age_minutes)
    } else {
        format!("{} ({}h {}m old)", shown, age_minutes / 60, age_minutes % 60)
    }
}

/// Time of the last overlay refresh, with `" (N min ago)"` once a minute has passed.
pub fn last_update_text(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let shown = at.format("%H:%M:%S UTC");
    let minutes = (now - at).num_minutes();
    if minutes > 0 {
        format!("{} ({} min ago)", shown, minutes)
    } else {
        shown.to_string()
    }
}

pub fn history_lines(history: &[TimestampHistoryEntry]) -> Vec<String> {
    history
        .iter()
        .map(|entry| {
            let shown = entry
                .local_display
                .clone()
                .unwrap_or_else(|| entry.timestamp.format("%Y-%m-%d %H:%M:%S UTC").to_string());
            match entry.time_diff_minutes {
                Some(diff) => format!("{}: {} {}", entry.position.label(), shown, diff_text(diff)),
                None => format!("{}: {}", entry.position.label(), shown),
            }
        })
        .collect()
}

fn diff_text(minutes: f64) -> String {
    if minutes < 60.0 {
        format!("(+{} min)", minutes)
    } else {
        let hours = (minutes / 60.0).floor();
        let rest = (minutes % 60.0).round();
        format!("(+{}h {}m)", hours, rest)
    }
}

/// Display form of a point value; `None` when there is nothing to show.
pub fn point_value(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Some(i.to_string()),
            None => n.as_f64().map(|f| format!("{:.1}", f)),
        },
        serde_json::Value::String(s) if s.trim().is_empty() => None,
        serde_json::Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
