use serde::Deserialize;
use tokio::time::Instant;

pub const OUT_OF_COVERAGE_MESSAGE: &str = "Coordinates outside radar coverage";

#[derive(Debug, Clone, PartialEq)]
pub struct HoverRequest {
    pub latitude: f64,
    pub longitude: f64,
    pub layer_id: String,
    pub issued_at: Instant,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PointValueResponse {
    #[serde(default)]
    pub value: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Outcome of a point-value lookup; every variant maps to a short display string.
#[derive(Debug, Clone, PartialEq)]
pub enum HoverOutcome {
    Value(String),
    OutOfCoverage,
    NoData,
    Failed(String),
}

impl HoverOutcome {
    pub fn display_text(&self) -> String {
        match self {
            HoverOutcome::Value(v) => v.clone(),
            HoverOutcome::OutOfCoverage => "Outside coverage".to_string(),
            HoverOutcome::NoData => "No data".to_string(),
            HoverOutcome::Failed(_) => "Lookup failed".to_string(),
        }
    }
}
