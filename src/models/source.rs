use serde::{Deserialize, Serialize};

/// The station/layer pair that decides which raster is fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveSource {
    pub station_id: String,
    pub layer_id: String,
}

impl ActiveSource {
    pub fn new(station_id: impl Into<String>, layer_id: impl Into<String>) -> Self {
        Self {
            station_id: station_id.into(),
            layer_id: layer_id.into(),
        }
    }
}

impl std::fmt::Display for ActiveSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.station_id, self.layer_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationInfo {
    pub id: String,
    pub name: String,
    pub state: String,
    pub lat: f64,
    pub lon: f64,
}

/// Shape shared by `current-station` and a successful `switch-station`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentStation {
    pub station_id: String,
    pub name: String,
    pub state: String,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerInfo {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(default = "default_available")]
    pub available: bool,
    #[serde(default)]
    pub is_current: bool,
}

fn default_available() -> bool {
    true
}

/// Shape shared by `current-layer` and a successful `switch-layer`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentLayer {
    pub layer_id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub description: String,
    pub service: String,
    pub layer: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub lat_min: f64,
    pub lon_min: f64,
    pub lat_max: f64,
    pub lon_max: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RadarDebugInfo {
    pub bbox: BoundingBox,
}

#[derive(Debug, Clone, Serialize)]
pub struct SwitchStationRequest<'a> {
    pub station_id: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct SwitchLayerRequest<'a> {
    pub layer_id: &'a str,
}
