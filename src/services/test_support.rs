//! In-memory fakes shared by the service tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use serde_json::json;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::{Duration, Instant};

use crate::models::{
    BoundingBox, CurrentLayer, CurrentStation, DataTimeResponse, HistoryPosition, LayerInfo,
    OverlayImage, PointValueResponse, RadarStatus, RadarStatusKind, StationInfo,
    TimestampHistoryEntry, TimestampHistoryResponse,
};

use super::events::AppEvent;
use super::radar_api::{ClientError, RadarApi};
use super::view::RadarView;

/// Builds a newest-first history whose gaps are `diffs` (in minutes).
pub fn history_from_diffs(diffs: &[f64]) -> Vec<TimestampHistoryEntry> {
    let newest = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    let mut timestamp = newest;
    let mut entries = Vec::with_capacity(diffs.len() + 1);
    for i in 0..=diffs.len() {
        let position = match i {
            0 => HistoryPosition::Current,
            1 => HistoryPosition::Previous1,
            2 => HistoryPosition::Previous2,
            _ => HistoryPosition::Older,
        };
        let diff = diffs.get(i).copied();
        entries.push(TimestampHistoryEntry {
            timestamp,
            position,
            time_diff_minutes: diff,
            local_display: None,
        });
        if let Some(d) = diff {
            timestamp -= ChronoDuration::seconds((d * 60.0) as i64);
        }
    }
    entries
}

pub fn drain(rx: &mut UnboundedReceiver<AppEvent>) -> Vec<AppEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn station(id: &str) -> CurrentStation {
    CurrentStation {
        station_id: id.to_string(),
        name: format!("Station {}", id),
        state: "OH".to_string(),
        lat: Some(41.4),
        lon: Some(-81.9),
    }
}

fn layer(id: &str) -> CurrentLayer {
    CurrentLayer {
        layer_id: id.to_string(),
        name: Some(id.to_string()),
        description: format!("{} description", id),
        service: "conus".to_string(),
        layer: format!("conus:{}", id),
    }
}

struct FakeState {
    current_station: CurrentStation,
    current_layer: CurrentLayer,
    station_switch_error: Option<ClientError>,
    layer_switch_error: Option<ClientError>,
    cycle_error: Option<ClientError>,
    data_time_error: Option<ClientError>,
    status_timestamp: Option<DateTime<Utc>>,
    switch_delay: Duration,
    history: Result<TimestampHistoryResponse, ClientError>,
    point_values: VecDeque<(Duration, Result<serde_json::Value, ClientError>)>,
    point_requests: Vec<(f64, f64, String, Instant)>,
    image_requests: Vec<String>,
    calls: Vec<&'static str>,
}

impl Default for FakeState {
    fn default() -> Self {
        Self {
            current_station: station("KCLE"),
            current_layer: layer("reflectivity"),
            station_switch_error: None,
            layer_switch_error: None,
            cycle_error: None,
            data_time_error: None,
            status_timestamp: None,
            switch_delay: Duration::ZERO,
            history: Ok(TimestampHistoryResponse {
                success: true,
                history: Vec::new(),
                error: None,
            }),
            point_values: VecDeque::new(),
            point_requests: Vec::new(),
            image_requests: Vec::new(),
            calls: Vec::new(),
        }
    }
}

/// Scriptable [`RadarApi`]. Switches succeed and move the server selection
/// unless told to fail.
#[derive(Default)]
pub struct FakeRadarApi {
    state: Mutex<FakeState>,
}

impl FakeRadarApi {
    fn with<R>(&self, f: impl FnOnce(&mut FakeState) -> R) -> R {
        let mut state = self.state.lock().unwrap();
        f(&mut state)
    }

    pub fn set_history(&self, history: Vec<TimestampHistoryEntry>) {
        self.set_history_response(Ok(TimestampHistoryResponse {
            success: true,
            history,
            error: None,
        }));
    }

    pub fn set_history_response(&self, response: Result<TimestampHistoryResponse, ClientError>) {
        self.with(|s| s.history = response);
    }

    pub fn fail_cycle(&self, error: ClientError) {
        self.with(|s| s.cycle_error = Some(error));
    }

    pub fn fail_data_time(&self, error: ClientError) {
        self.with(|s| s.data_time_error = Some(error));
    }

    pub fn set_status_timestamp(&self, timestamp: Option<DateTime<Utc>>) {
        self.with(|s| s.status_timestamp = timestamp);
    }

    pub fn fail_station_switch(&self, error: ClientError) {
        self.with(|s| s.station_switch_error = Some(error));
    }

    pub fn fail_layer_switch(&self, error: ClientError) {
        self.with(|s| s.layer_switch_error = Some(error));
    }

    pub fn set_switch_delay(&self, delay: Duration) {
        self.with(|s| s.switch_delay = delay);
    }

    pub fn push_point_value(&self, delay: Duration, value: Result<serde_json::Value, ClientError>) {
        self.with(|s| s.point_values.push_back((delay, value)));
    }

    pub fn point_requests(&self) -> Vec<(f64, f64, String, Instant)> {
        self.with(|s| s.point_requests.clone())
    }

    pub fn image_requests(&self) -> Vec<String> {
        self.with(|s| s.image_requests.clone())
    }

    pub fn calls_to(&self, name: &str) -> usize {
        self.with(|s| s.calls.iter().filter(|c| **c == name).count())
    }

    fn record(&self, name: &'static str) -> Option<ClientError> {
        self.with(|s| {
            s.calls.push(name);
            s.cycle_error.clone()
        })
    }
}

impl RadarApi for FakeRadarApi {
    async fn list_stations(&self) -> Result<Vec<StationInfo>, ClientError> {
        self.record("list_stations");
        Ok(vec![StationInfo {
            id: "KCLE".to_string(),
            name: "Cleveland".to_string(),
            state: "OH".to_string(),
            lat: 41.4,
            lon: -81.9,
        }])
    }

    async fn current_station(&self) -> Result<CurrentStation, ClientError> {
        self.record("current_station");
        Ok(self.with(|s| s.current_station.clone()))
    }

    async fn switch_station(&self, station_id: &str) -> Result<CurrentStation, ClientError> {
        self.record("switch_station");
        let delay = self.with(|s| s.switch_delay);
        tokio::time::sleep(delay).await;
        self.with(|s| match s.station_switch_error.clone() {
            Some(error) => Err(error),
            None => {
                s.current_station = station(station_id);
                Ok(s.current_station.clone())
            }
        })
    }

    async fn list_layers(&self) -> Result<Vec<LayerInfo>, ClientError> {
        self.record("list_layers");
        Ok(vec![LayerInfo {
            id: "reflectivity".to_string(),
            name: "Base Reflectivity".to_string(),
            description: "Radar reflectivity".to_string(),
            available: true,
            is_current: true,
        }])
    }

    async fn current_layer(&self) -> Result<CurrentLayer, ClientError> {
        self.record("current_layer");
        Ok(self.with(|s| s.current_layer.clone()))
    }

    async fn switch_layer(&self, layer_id: &str) -> Result<CurrentLayer, ClientError> {
        self.record("switch_layer");
        let delay = self.with(|s| s.switch_delay);
        tokio::time::sleep(delay).await;
        self.with(|s| match s.layer_switch_error.clone() {
            Some(error) => Err(error),
            None => {
                s.current_layer = layer(layer_id);
                Ok(s.current_layer.clone())
            }
        })
    }

    async fn radar_image(&self, layer_id: &str) -> Result<OverlayImage, ClientError> {
        self.with(|s| s.image_requests.push(layer_id.to_string()));
        match self.record("radar_image") {
            Some(error) => Err(error),
            None => Ok(OverlayImage {
                bytes: vec![0; 16],
                width: 4,
                height: 4,
            }),
        }
    }

    async fn status(&self) -> Result<RadarStatus, ClientError> {
        match self.record("status") {
            Some(error) => Err(error),
            None => Ok(RadarStatus {
                status: RadarStatusKind::Online,
                data_timestamp: self.with(|s| s.status_timestamp),
            }),
        }
    }

    async fn data_time(&self) -> Result<DataTimeResponse, ClientError> {
        let error = self
            .record("data_time")
            .or_else(|| self.with(|s| s.data_time_error.clone()));
        match error {
            Some(error) => Err(error),
            None => Ok(DataTimeResponse {
                success: true,
                data_timestamp: Some(Utc::now()),
                data_time_local_display: Some("2024-05-01 12:00:00 UTC".to_string()),
                is_fallback: false,
            }),
        }
    }

    async fn timestamp_history(&self) -> Result<TimestampHistoryResponse, ClientError> {
        match self.record("timestamp_history") {
            Some(error) => Err(error),
            None => self.with(|s| s.history.clone()),
        }
    }

    async fn point_value(
        &self,
        lat: f64,
        lon: f64,
        layer_id: &str,
    ) -> Result<PointValueResponse, ClientError> {
        let (delay, value) = self.with(|s| {
            s.calls.push("point_value");
            s.point_requests
                .push((lat, lon, layer_id.to_string(), Instant::now()));
            s.point_values
                .pop_front()
                .unwrap_or((Duration::ZERO, Ok(json!(42))))
        });
        tokio::time::sleep(delay).await;
        value.map(|v| PointValueResponse {
            value: Some(v),
            error: None,
        })
    }

    async fn bounds(&self) -> Result<BoundingBox, ClientError> {
        self.record("bounds");
        Ok(BoundingBox {
            lat_min: 38.9,
            lon_min: -84.9,
            lat_max: 43.9,
            lon_max: -78.9,
        })
    }
}

// ─── View ───

#[derive(Debug, Clone, PartialEq)]
pub enum ViewEvent {
    Stations(usize),
    Layers(usize),
    Station(String),
    Layer(String),
    Bounds,
    SwitchPending(bool),
    Alert(String),
    Interval(String),
    Countdown(Option<String>),
    Poll(bool, String),
    Status(RadarStatusKind),
    DataTime(String),
    LastUpdate(String),
    Message(String),
    History(Vec<String>),
    HoverPending(f64, f64),
    HoverResult(String),
    HoverHidden,
}

#[derive(Debug, Default)]
pub struct RecordingView {
    pub events: Vec<ViewEvent>,
}

impl RecordingView {
    pub fn hover_results(&self) -> Vec<String> {
        self.events
            .iter()
            .filter_map(|e| match e {
                ViewEvent::HoverResult(text) => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn alerts(&self) -> Vec<String> {
        self.events
            .iter()
            .filter_map(|e| match e {
                ViewEvent::Alert(text) => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn last_station(&self) -> Option<String> {
        self.events.iter().rev().find_map(|e| match e {
            ViewEvent::Station(id) => Some(id.clone()),
            _ => None,
        })
    }

    pub fn data_times(&self) -> Vec<String> {
        self.events
            .iter()
            .filter_map(|e| match e {
                ViewEvent::DataTime(text) => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn last_updates(&self) -> Vec<String> {
        self.events
            .iter()
            .filter_map(|e| match e {
                ViewEvent::LastUpdate(text) => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn messages(&self) -> Vec<String> {
        self.events
            .iter()
            .filter_map(|e| match e {
                ViewEvent::Message(text) => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn intervals(&self) -> Vec<String> {
        self.events
            .iter()
            .filter_map(|e| match e {
                ViewEvent::Interval(label) => Some(label.clone()),
                _ => None,
            })
            .collect()
    }
}

impl RadarView for RecordingView {
    fn stations_loaded(&mut self, stations: &[StationInfo]) {
        self.events.push(ViewEvent::Stations(stations.len()));
    }

    fn layers_loaded(&mut self, layers: &[LayerInfo]) {
        self.events.push(ViewEvent::Layers(layers.len()));
    }

    fn station_changed(&mut self, station: &CurrentStation) {
        self.events.push(ViewEvent::Station(station.station_id.clone()));
    }

    fn layer_changed(&mut self, layer: &CurrentLayer) {
        self.events.push(ViewEvent::Layer(layer.layer_id.clone()));
    }

    fn bounds_changed(&mut self, _bounds: &BoundingBox) {
        self.events.push(ViewEvent::Bounds);
    }

    fn switch_pending(&mut self, busy: bool) {
        self.events.push(ViewEvent::SwitchPending(busy));
    }

    fn alert(&mut self, message: &str) {
        self.events.push(ViewEvent::Alert(message.to_string()));
    }

    fn interval_changed(&mut self, label: &str) {
        self.events.push(ViewEvent::Interval(label.to_string()));
    }

    fn countdown(&mut self, text: Option<&str>) {
        self.events.push(ViewEvent::Countdown(text.map(str::to_string)));
    }

    fn poll_result(&mut self, ok: bool, detail: &str) {
        self.events.push(ViewEvent::Poll(ok, detail.to_string()));
    }

    fn status_changed(&mut self, status: RadarStatusKind) {
        self.events.push(ViewEvent::Status(status));
    }

    fn data_time(&mut self, text: &str) {
        self.events.push(ViewEvent::DataTime(text.to_string()));
    }

    fn last_update(&mut self, text: &str) {
        self.events.push(ViewEvent::LastUpdate(text.to_string()));
    }

    fn message(&mut self, text: &str) {
        self.events.push(ViewEvent::Message(text.to_string()));
    }

    fn history(&mut self, lines: &[String]) {
        self.events.push(ViewEvent::History(lines.to_vec()));
    }

    fn hover_pending(&mut self, lat: f64, lon: f64) {
        self.events.push(ViewEvent::HoverPending(lat, lon));
    }

    fn hover_result(&mut self, text: &str) {
        self.events.push(ViewEvent::HoverResult(text.to_string()));
    }

    fn hover_hidden(&mut self) {
        self.events.push(ViewEvent::HoverHidden);
    }
}
