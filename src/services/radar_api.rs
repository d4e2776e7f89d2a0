use std::future::Future;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{
    BoundingBox, CurrentLayer, CurrentStation, DataTimeResponse, LayerInfo, OverlayImage,
    PointValueResponse, RadarDebugInfo, RadarStatus, ServerSettings, StationInfo,
    SwitchLayerRequest, SwitchStationRequest, TimestampHistoryResponse, OUT_OF_COVERAGE_MESSAGE,
};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClientError {
    #[error("network failure: {0}")]
    NetworkFailure(String),
    #[error("server responded with {status}: {message}")]
    ServerError { status: u16, message: String },
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
    /// Response arrived after it was superseded. Never shown to the user.
    #[error("stale result discarded")]
    StaleResult,
    #[error("coordinates outside radar coverage")]
    OutOfCoverage,
    #[error("no data available")]
    NoData,
}

impl ClientError {
    pub fn from_server(status: u16, message: String) -> Self {
        if message == OUT_OF_COVERAGE_MESSAGE {
            ClientError::OutOfCoverage
        } else if is_no_data_message(&message) {
            ClientError::NoData
        } else {
            ClientError::ServerError { status, message }
        }
    }

    /// Text suitable for an alert: the server's own message when there is one.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::ServerError { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

pub fn is_no_data_message(message: &str) -> bool {
    message.to_lowercase().contains("no data")
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ClientError::MalformedPayload(e.to_string())
        } else {
            ClientError::NetworkFailure(e.to_string())
        }
    }
}

// ─── API seam ───

/// Backend endpoints consumed by the client. Every call is a single request
/// with no retries; callers decide what a failure means.
pub trait RadarApi: Send + Sync + 'static {
    fn list_stations(&self) -> impl Future<Output = Result<Vec<StationInfo>, ClientError>> + Send;

    fn current_station(&self) -> impl Future<Output = Result<CurrentStation, ClientError>> + Send;

    fn switch_station(
        &self,
        station_id: &str,
    ) -> impl Future<Output = Result<CurrentStation, ClientError>> + Send;

    fn list_layers(&self) -> impl Future<Output = Result<Vec<LayerInfo>, ClientError>> + Send;

    fn current_layer(&self) -> impl Future<Output = Result<CurrentLayer, ClientError>> + Send;

    fn switch_layer(
        &self,
        layer_id: &str,
    ) -> impl Future<Output = Result<CurrentLayer, ClientError>> + Send;

    fn radar_image(
        &self,
        layer_id: &str,
    ) -> impl Future<Output = Result<OverlayImage, ClientError>> + Send;

    fn status(&self) -> impl Future<Output = Result<RadarStatus, ClientError>> + Send;

    fn data_time(&self) -> impl Future<Output = Result<DataTimeResponse, ClientError>> + Send;

    fn timestamp_history(
        &self,
    ) -> impl Future<Output = Result<TimestampHistoryResponse, ClientError>> + Send;

    fn point_value(
        &self,
        lat: f64,
        lon: f64,
        layer_id: &str,
    ) -> impl Future<Output = Result<PointValueResponse, ClientError>> + Send;

    fn bounds(&self) -> impl Future<Output = Result<BoundingBox, ClientError>> + Send;
}

// ─── HTTP implementation ───

pub struct HttpRadarApi {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

impl HttpRadarApi {
    pub fn new(settings: &ServerSettings) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .user_agent(concat!("radarwatch/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ClientError> {
        let response = self.client.get(self.url(path)).query(query).send().await?;
        let response = check_status(response).await?;
        Ok(response.json::<T>().await?)
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        let response = self
            .client
            .post(self.url(path))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await?;
        let response = check_status(response).await?;
        Ok(response.json::<T>().await?)
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    let message = server_error_message(&text)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());
    Err(ClientError::from_server(status.as_u16(), message))
}

/// Pulls the `error` field out of a JSON body, or falls back to the raw text.
fn server_error_message(body: &str) -> Option<String> {
    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        return Some(parsed.error);
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Sniffs the raster format and size. The pixels themselves are not kept apart
/// from the original bytes.
pub fn decode_overlay(bytes: Vec<u8>) -> Result<OverlayImage, ClientError> {
    if bytes.is_empty() {
        return Err(ClientError::MalformedPayload("empty radar image".to_string()));
    }
    let format = image::guess_format(&bytes)
        .map_err(|e| ClientError::MalformedPayload(format!("unrecognised image: {}", e)))?;
    let decoded = image::load_from_memory_with_format(&bytes, format)
        .map_err(|e| ClientError::MalformedPayload(format!("undecodable image: {}", e)))?;

    Ok(OverlayImage {
        width: decoded.width(),
        height: decoded.height(),
        bytes,
    })
}

fn cache_buster() -> String {
    chrono::Utc::now().timestamp_millis().to_string()
}

impl RadarApi for HttpRadarApi {
    async fn list_stations(&self) -> Result<Vec<StationInfo>, ClientError> {
        self.get_json("/api/radar/stations", &[]).await
    }

    async fn current_station(&self) -> Result<CurrentStation, ClientError> {
        self.get_json("/api/radar/current-station", &[]).await
    }

    async fn switch_station(&self, station_id: &str) -> Result<CurrentStation, ClientError> {
        self.post_json("/api/radar/station", &SwitchStationRequest { station_id })
            .await
    }

    async fn list_layers(&self) -> Result<Vec<LayerInfo>, ClientError> {
        self.get_json("/api/weather/layers", &[]).await
    }

    async fn current_layer(&self) -> Result<CurrentLayer, ClientError> {
        self.get_json("/api/weather/current-layer", &[]).await
    }

    async fn switch_layer(&self, layer_id: &str) -> Result<CurrentLayer, ClientError> {
        self.post_json("/api/weather/layer", &SwitchLayerRequest { layer_id })
            .await
    }

    async fn radar_image(&self, layer_id: &str) -> Result<OverlayImage, ClientError> {
        let response = self
            .client
            .get(self.url("/api/radar"))
            .query(&[("layer", layer_id.to_string()), ("t", cache_buster())])
            .send()
            .await?;
        let response = check_status(response).await?;
        let bytes = response.bytes().await?;
        decode_overlay(bytes.to_vec())
    }

    async fn status(&self) -> Result<RadarStatus, ClientError> {
        self.get_json("/api/radar/status", &[]).await
    }

    async fn data_time(&self) -> Result<DataTimeResponse, ClientError> {
        self.get_json("/api/radar/data-time", &[]).await
    }

    async fn timestamp_history(&self) -> Result<TimestampHistoryResponse, ClientError> {
        self.get_json("/api/radar/timestamp-history", &[]).await
    }

    async fn point_value(
        &self,
        lat: f64,
        lon: f64,
        layer_id: &str,
    ) -> Result<PointValueResponse, ClientError> {
        self.get_json(
            "/api/radar/point-value",
            &[
                ("lat", lat.to_string()),
                ("lon", lon.to_string()),
                ("layer", layer_id.to_string()),
            ],
        )
        .await
    }

    async fn bounds(&self) -> Result<BoundingBox, ClientError> {
        let info: RadarDebugInfo = self.get_json("/api/radar/debug", &[]).await?;
        Ok(info.bbox)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_error_prefers_json_error_field() {
        assert_eq!(
            server_error_message(r#"{"error": "Invalid radar station"}"#).as_deref(),
            Some("Invalid radar station")
        );
        assert_eq!(
            server_error_message("  upstream timeout \n").as_deref(),
            Some("upstream timeout")
        );
        assert_eq!(server_error_message("   "), None);
    }

    #[test]
    fn coverage_message_maps_to_its_own_kind() {
        assert_eq!(
            ClientError::from_server(404, OUT_OF_COVERAGE_MESSAGE.to_string()),
            ClientError::OutOfCoverage
        );
        assert_eq!(
            ClientError::from_server(404, "No data at this location".to_string()),
            ClientError::NoData
        );
        let other = ClientError::from_server(400, "Invalid weather layer".to_string());
        assert_eq!(other.user_message(), "Invalid weather layer");
    }

    #[test]
    fn overlay_rejects_empty_and_garbage_bodies() {
        assert!(matches!(
            decode_overlay(Vec::new()),
            Err(ClientError::MalformedPayload(_))
        ));
        assert!(matches!(
            decode_overlay(b"<html>oops</html>".to_vec()),
            Err(ClientError::MalformedPayload(_))
        ));
    }

    #[test]
    fn overlay_reads_png_dimensions() {
        let img = image::RgbaImage::new(4, 3);
        let mut buf = std::io::Cursor::new(Vec::new());
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut buf, image::ImageFormat::Png)
            .unwrap();
        let overlay = decode_overlay(buf.into_inner()).unwrap();
        assert_eq!((overlay.width, overlay.height), (4, 3));
    }
}
