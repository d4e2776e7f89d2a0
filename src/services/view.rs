use crate::models::{BoundingBox, CurrentLayer, CurrentStation, LayerInfo, RadarStatusKind, StationInfo};

/// Presentation capability the client drives. The core never renders; it only
/// reports state changes through these callbacks.
pub trait RadarView: Send {
    fn stations_loaded(&mut self, _stations: &[StationInfo]) {}

    fn layers_loaded(&mut self, _layers: &[LayerInfo]) {}

    fn station_changed(&mut self, station: &CurrentStation);

    fn layer_changed(&mut self, layer: &CurrentLayer);

    fn bounds_changed(&mut self, _bounds: &BoundingBox) {}

    /// `true` while a source switch is in flight; the switch control is disabled.
    fn switch_pending(&mut self, _busy: bool) {}

    /// Blocking, user-visible failure message.
    fn alert(&mut self, message: &str);

    fn interval_changed(&mut self, label: &str);

    /// `None` clears the countdown.
    fn countdown(&mut self, _text: Option<&str>) {}

    fn poll_result(&mut self, ok: bool, detail: &str);

    fn status_changed(&mut self, _status: RadarStatusKind) {}

    fn data_time(&mut self, _text: &str) {}

    /// Wall-clock time of the last successful overlay refresh, with its age.
    fn last_update(&mut self, _text: &str) {}

    fn history(&mut self, _lines: &[String]) {}

    fn hover_pending(&mut self, _lat: f64, _lon: f64) {}

    fn hover_result(&mut self, text: &str);

    fn hover_hidden(&mut self) {}

    /// Free-form text the user asked for (status, help).
    fn message(&mut self, text: &str);
}

// ─── Console ───

/// Prints to stdout. The per-second countdown only goes to the trace log.
#[derive(Debug, Default)]
pub struct ConsoleView {
    switch_busy: bool,
}

impl ConsoleView {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RadarView for ConsoleView {
    fn stations_loaded(&mut self, stations: &[StationInfo]) {
        println!("Stations ({}):", stations.len());
        for station in stations {
            println!("  {} - {}, {}", station.id, station.name, station.state);
        }
    }

    fn layers_loaded(&mut self, layers: &[LayerInfo]) {
        println!("Layers ({}):", layers.len());
        for layer in layers {
            let marker = if layer.is_current { "*" } else { " " };
            let availability = if layer.available { "" } else { " (unavailable)" };
            println!(
                " {} {} - {}{}",
                marker, layer.id, layer.description, availability
            );
        }
    }

    fn station_changed(&mut self, station: &CurrentStation) {
        println!(
            "Station: {} ({}, {})",
            station.station_id, station.name, station.state
        );
    }

    fn layer_changed(&mut self, layer: &CurrentLayer) {
        println!("Layer: {} ({})", layer.layer_id, layer.description);
    }

    fn bounds_changed(&mut self, bounds: &BoundingBox) {
        log::info!(
            "[View] Map bounds [{:.2}, {:.2}] - [{:.2}, {:.2}]",
            bounds.lat_min,
            bounds.lon_min,
            bounds.lat_max,
            bounds.lon_max
        );
    }

    fn switch_pending(&mut self, busy: bool) {
        if busy && !self.switch_busy {
            println!("Switching radar source...");
        }
        self.switch_busy = busy;
    }

    fn alert(&mut self, message: &str) {
        eprintln!("!! {}", message);
    }

    fn interval_changed(&mut self, label: &str) {
        println!("{}", label);
    }

    fn countdown(&mut self, text: Option<&str>) {
        log::trace!("[View] countdown {:?}", text);
    }

    fn poll_result(&mut self, ok: bool, detail: &str) {
        if ok {
            println!("Radar updated: {}", detail);
        } else {
            println!("Radar update failed: {}", detail);
        }
    }

    fn status_changed(&mut self, status: RadarStatusKind) {
        let text = match status {
            RadarStatusKind::Online => "Radar Online",
            RadarStatusKind::Offline => "Radar Offline",
            RadarStatusKind::Unknown => "Status Unknown",
        };
        println!("{}", text);
    }

    fn data_time(&mut self, text: &str) {
        println!("Data time: {}", text);
    }

    fn last_update(&mut self, text: &str) {
        println!("Last update: {}", text);
    }

    fn history(&mut self, lines: &[String]) {
        for line in lines {
            println!("  {}", line);
        }
    }

    fn hover_pending(&mut self, lat: f64, lon: f64) {
        println!("[{:.3}, {:.3}] ...", lat, lon);
    }

    fn hover_result(&mut self, text: &str) {
        println!("Value: {}", text);
    }

    fn hover_hidden(&mut self) {
        log::debug!("[View] hover hidden");
    }

    fn message(&mut self, text: &str) {
        println!("{}", text);
    }
}
