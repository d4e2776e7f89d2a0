use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Rank of a history entry, newest first. A label, not an identity: the
/// entry that is `Current` now becomes `Previous1` after the next update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum HistoryPosition {
    Current,
    Previous1,
    Previous2,
    Older,
}

impl From<String> for HistoryPosition {
    fn from(value: String) -> Self {
        match value.as_str() {
            "current" => HistoryPosition::Current,
            "previous_1" => HistoryPosition::Previous1,
            "previous_2" => HistoryPosition::Previous2,
            _ => HistoryPosition::Older,
        }
    }
}

impl From<HistoryPosition> for String {
    fn from(value: HistoryPosition) -> Self {
        match value {
            HistoryPosition::Current => "current",
            HistoryPosition::Previous1 => "previous_1",
            HistoryPosition::Previous2 => "previous_2",
            HistoryPosition::Older => "older",
        }
        .to_string()
    }
}

impl HistoryPosition {
    pub fn label(&self) -> &'static str {
        match self {
            HistoryPosition::Current => "Current",
            HistoryPosition::Previous1 => "Previous",
            HistoryPosition::Previous2 => "Before",
            HistoryPosition::Older => "Older",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimestampHistoryEntry {
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub timestamp: DateTime<Utc>,
    pub position: HistoryPosition,
    /// Gap in minutes to the next-older entry; absent on the oldest one.
    #[serde(default)]
    pub time_diff_minutes: Option<f64>,
    #[serde(default)]
    pub local_display: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TimestampHistoryResponse {
    pub success: bool,
    #[serde(default)]
    pub history: Vec<TimestampHistoryEntry>,
    #[serde(default)]
    pub error: Option<String>,
}

/// The server emits either RFC 3339 or naive ISO-8601 strings. Naive values
/// are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

pub fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {}", raw)))
}

pub fn deserialize_optional_timestamp<'de, D>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw {
        None => Ok(None),
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => parse_timestamp(&s)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {}", s))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn parses_naive_and_offset_timestamps() {
        let naive = parse_timestamp("2024-05-01T12:34:00").unwrap();
        assert_eq!(naive.hour(), 12);

        let micros = parse_timestamp("2024-05-01T12:34:00.123456").unwrap();
        assert_eq!(micros.minute(), 34);

        let offset = parse_timestamp("2024-05-01T12:34:00+02:00").unwrap();
        assert_eq!(offset.hour(), 10);

        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn decodes_history_payload() {
        let body = r#"{
            "success": true,
            "count": 3,
            "history": [
                {"timestamp": "2024-05-01T12:10:00", "local_display": "2024-05-01 12:10:00 UTC",
                 "position": "current", "time_diff_minutes": 6.0},
                {"timestamp": "2024-05-01T12:04:00", "position": "previous_1", "time_diff_minutes": 4.0},
                {"timestamp": "2024-05-01T12:00:00", "position": "previous_2", "time_diff_minutes": null}
            ]
        }"#;
        let parsed: TimestampHistoryResponse = serde_json::from_str(body).unwrap();
        assert!(parsed.success);
        assert_eq!(parsed.history.len(), 3);
        assert_eq!(parsed.history[0].position, HistoryPosition::Current);
        assert_eq!(parsed.history[1].time_diff_minutes, Some(4.0));
        assert_eq!(parsed.history[2].time_diff_minutes, None);
    }

    #[test]
    fn unknown_positions_rank_as_older() {
        assert_eq!(HistoryPosition::from("previous_3".to_string()), HistoryPosition::Older);
        assert_eq!(HistoryPosition::Previous2.label(), "Before");
    }
}
