use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::time::{Duration, Instant};

use crate::commands::{Command, HELP};
use crate::models::{ActiveSource, DataTime, RadarStatusKind, Settings};
use crate::utils::format;

use super::events::AppEvent;
use super::hover_lookup::HoverQueryDebouncer;
use super::pattern_engine::PatternAnalyzer;
use super::radar_api::{ClientError, RadarApi};
use super::refresh_scheduler::{AdaptiveScheduler, CycleReport};
use super::source_switch::{Selection, SourceSwitchCoordinator, SwitchRequest, SwitchResolution};
use super::timer::{spawn_every, TaskHandle};
use super::view::RadarView;

// Ages shown next to the data time and last update are re-rendered this often.
const AGE_TICK: Duration = Duration::from_secs(60);

/// The client's single event loop. Owns every component and all mutable
/// state; timers and fetches only talk to it through [`AppEvent`]s.
pub struct RadarClient<A, V> {
    api: Arc<A>,
    view: V,
    scheduler: AdaptiveScheduler<A>,
    hover: HoverQueryDebouncer<A>,
    switcher: SourceSwitchCoordinator<A>,
    age_ticker: TaskHandle,
    last_update: Option<DateTime<Utc>>,
    data_time: Option<DataTime>,
    events_tx: UnboundedSender<AppEvent>,
    events_rx: UnboundedReceiver<AppEvent>,
}

impl<A: RadarApi, V: RadarView> RadarClient<A, V> {
    /// Loads the initial selection, draws the first overlay and starts polling
    /// if auto-refresh is on.
    pub async fn bootstrap(api: Arc<A>, mut view: V, settings: &Settings) -> Result<Self> {
        match api.list_stations().await {
            Ok(stations) => view.stations_loaded(&stations),
            Err(e) => {
                log::error!("[Client] Error loading radar stations: {}", e);
                view.alert("Error loading stations");
            }
        }

        let station = api
            .current_station()
            .await
            .context("failed to load current radar station")?;
        let layer = api
            .current_layer()
            .await
            .context("failed to load current weather layer")?;
        view.station_changed(&station);
        view.layer_changed(&layer);

        match api.bounds().await {
            Ok(bounds) => view.bounds_changed(&bounds),
            Err(e) => log::warn!("[Client] Could not load map bounds: {}", e),
        }

        let active = ActiveSource::new(station.station_id, layer.layer_id);
        log::info!("[Client] Active source {}", active);

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let scheduler = AdaptiveScheduler::new(
            Arc::clone(&api),
            PatternAnalyzer::new(settings.refresh.adaptive),
            events_tx.clone(),
        );
        let hover = HoverQueryDebouncer::new(
            Arc::clone(&api),
            Duration::from_millis(settings.hover.quiet_period_ms),
            settings.hover.enabled,
            events_tx.clone(),
        );
        let switcher = SourceSwitchCoordinator::new(Arc::clone(&api), active, events_tx.clone());
        let age_ticker = spawn_every(AGE_TICK, events_tx.clone(), || AppEvent::AgeTick);

        let mut client = Self {
            api,
            view,
            scheduler,
            hover,
            switcher,
            age_ticker,
            last_update: None,
            data_time: None,
            events_tx,
            events_rx,
        };

        let source = client.switcher.active().clone();
        client.scheduler.force_refresh_now(&source);
        if settings.refresh.auto_refresh {
            client.scheduler.start();
        }
        let label = client.scheduler.interval_label();
        client.view.interval_changed(&label);

        Ok(client)
    }

    #[cfg(test)]
    pub fn active_source(&self) -> &ActiveSource {
        self.switcher.active()
    }

    #[cfg(test)]
    pub fn scheduler(&self) -> &AdaptiveScheduler<A> {
        &self.scheduler
    }

    #[cfg(test)]
    pub fn view(&self) -> &V {
        &self.view
    }

    pub async fn run(mut self, mut commands: UnboundedReceiver<Command>) -> Result<()> {
        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    None | Some(Command::Quit) => break,
                    Some(command) => self.handle_command(command),
                },
                Some(event) = self.events_rx.recv() => self.handle_event(event),
            }
        }
        self.shutdown();
        Ok(())
    }

    pub fn shutdown(&mut self) {
        self.scheduler.stop();
        self.age_ticker.cancel();
        self.hover.on_leave(&mut self.view);
        self.switcher.cancel();
        log::info!("[Client] Stopped");
    }

    pub fn handle_command(&mut self, command: Command) {
        match command {
            Command::Start => {
                self.scheduler.start();
                self.show_interval();
            }
            Command::Stop => {
                self.scheduler.stop();
                self.view.countdown(None);
            }
            Command::Refresh => {
                let source = self.switcher.active().clone();
                self.scheduler.force_refresh_now(&source);
            }
            Command::SwitchStation(id) => {
                let request = self.switcher.switch_station(&id);
                self.report_switch_request(request);
            }
            Command::SwitchLayer(id) => {
                let request = self.switcher.switch_layer(&id);
                self.report_switch_request(request);
            }
            Command::ListStations => {
                let api = Arc::clone(&self.api);
                let events = self.events_tx.clone();
                tokio::spawn(async move {
                    let result = api.list_stations().await;
                    let _ = events.send(AppEvent::StationsLoaded(result));
                });
            }
            Command::ListLayers => {
                let api = Arc::clone(&self.api);
                let events = self.events_tx.clone();
                tokio::spawn(async move {
                    let result = api.list_layers().await;
                    let _ = events.send(AppEvent::LayersLoaded(result));
                });
            }
            Command::HoverMove { lat, lon } => {
                let layer_id = self.switcher.active().layer_id.clone();
                self.hover.on_move(lat, lon, &layer_id, &mut self.view);
            }
            Command::HoverLeave => self.hover.on_leave(&mut self.view),
            Command::SetHoverEnabled(enabled) => self.hover.set_enabled(enabled, &mut self.view),
            Command::SetAdaptive(enabled) => {
                self.scheduler.set_adaptive(enabled);
                log::info!(
                    "[Client] Adaptive refresh {}",
                    if enabled { "enabled" } else { "disabled" }
                );
            }
            Command::Status => {
                let report = self.status_report();
                self.view.message(&report);
            }
            Command::Help => self.view.message(HELP),
            Command::Quit => {}
        }
    }

    pub fn handle_event(&mut self, event: AppEvent) {
        let result = match event {
            AppEvent::RefreshDue { generation } => {
                let source = self.switcher.active().clone();
                if self.scheduler.on_refresh_due(generation, &source) {
                    Ok(())
                } else {
                    Err(ClientError::StaleResult)
                }
            }
            AppEvent::CountdownTick { generation } => {
                if let Some(text) = self.scheduler.on_countdown_tick(generation) {
                    self.view.countdown(Some(&text));
                }
                Ok(())
            }
            AppEvent::AgeTick => {
                self.refresh_ages();
                Ok(())
            }
            AppEvent::CycleFinished(report) => self.apply_cycle(*report),
            AppEvent::HoverDue { token, request } => self.hover.on_due(token, request),
            AppEvent::HoverResolved {
                token,
                layer_id,
                outcome,
            } => {
                let active_layer = self.switcher.active().layer_id.clone();
                self.hover
                    .on_resolved(token, &layer_id, outcome, &active_layer, &mut self.view)
            }
            AppEvent::SwitchFinished(completion) => self
                .switcher
                .complete(*completion)
                .map(|resolution| self.apply_switch(resolution)),
            AppEvent::StationsLoaded(result) => {
                match result {
                    Ok(stations) => self.view.stations_loaded(&stations),
                    Err(e) => log::error!("[Client] Error loading radar stations: {}", e),
                }
                Ok(())
            }
            AppEvent::LayersLoaded(result) => {
                match result {
                    Ok(layers) => self.view.layers_loaded(&layers),
                    Err(e) => log::error!("[Client] Error loading weather layers: {}", e),
                }
                Ok(())
            }
        };

        match result {
            Ok(()) => {}
            Err(ClientError::StaleResult) => log::debug!("[Client] Discarded stale result"),
            Err(e) => log::warn!("[Client] {}", e),
        }
    }

    fn apply_cycle(&mut self, report: CycleReport) -> Result<(), ClientError> {
        let changed = self
            .scheduler
            .accept_cycle(&report, self.switcher.active())?;

        match &report.overlay {
            Ok(overlay) => {
                let detail = format!(
                    "{}x{} overlay for {} ({} bytes)",
                    overlay.width,
                    overlay.height,
                    report.source,
                    overlay.bytes.len()
                );
                self.view.poll_result(true, &detail);
                let now = Utc::now();
                self.last_update = Some(now);
                self.view.last_update(&format::last_update_text(now, now));
            }
            Err(e) => {
                log::warn!("[Scheduler] Overlay refresh failed: {}", e);
                self.view.poll_result(false, "Error loading radar data");
            }
        }

        match &report.status {
            Ok(status) => self.view.status_changed(status.status),
            Err(e) => {
                log::warn!("[Scheduler] Status check failed: {}", e);
                self.view.status_changed(RadarStatusKind::Unknown);
            }
        }

        match &report.data_time {
            Ok(data_time) => {
                if data_time.is_fallback {
                    log::debug!("[Client] Data time is a fallback value");
                }
                self.data_time = Some(data_time.clone());
                self.show_data_time();
            }
            Err(e) => {
                log::warn!("[Scheduler] Failed to fetch radar timestamp: {}", e);
                self.data_time = None;
                self.view.data_time("Data time unavailable");
            }
        }

        match &report.history {
            Ok(history) if history.is_empty() => {
                self.view.history(&["No history available".to_string()]);
            }
            Ok(history) => self.view.history(&format::history_lines(history)),
            Err(e) => {
                log::warn!("[Scheduler] Failed to fetch timestamp history: {}", e);
                self.view.history(&["History unavailable".to_string()]);
            }
        }

        if changed.is_some() || report.history.is_ok() {
            self.show_interval();
        }
        Ok(())
    }

    fn apply_switch(&mut self, resolution: SwitchResolution) {
        self.view.switch_pending(false);
        match resolution {
            SwitchResolution::Applied { selection, bounds } => {
                show_selection(&mut self.view, &selection);
                if let Some(bounds) = bounds {
                    self.view.bounds_changed(&bounds);
                }
                // Hover values for the old source no longer apply.
                self.hover.on_leave(&mut self.view);

                let source = self.switcher.active().clone();
                self.scheduler.reset_to_default();
                self.scheduler.force_refresh_now(&source);
                self.show_interval();
            }
            SwitchResolution::RolledBack {
                alert,
                authoritative,
            } => {
                self.view.alert(&alert);
                if let Some(selection) = authoritative {
                    show_selection(&mut self.view, &selection);
                }
            }
        }
    }

    fn report_switch_request(&mut self, request: SwitchRequest) {
        match request {
            SwitchRequest::Started => self.view.switch_pending(true),
            SwitchRequest::AlreadyActive => log::debug!("[Client] Source already active"),
            SwitchRequest::Busy => log::info!("[Client] Source switch already in progress"),
        }
    }

    fn show_data_time(&mut self) {
        if let Some(data_time) = &self.data_time {
            let text = format::data_time_text(
                data_time.timestamp,
                data_time.local_display.as_deref(),
                Utc::now(),
            );
            self.view.data_time(&text);
        }
    }

    /// Re-renders the relative ages so they do not go stale between polls.
    fn refresh_ages(&mut self) {
        self.show_data_time();
        if let Some(at) = self.last_update {
            self.view.last_update(&format::last_update_text(at, Utc::now()));
        }
    }

    fn status_report(&self) -> String {
        let on_off = |flag: bool| if flag { "on" } else { "off" };
        let mut lines = vec![
            format!("Source: {}", self.switcher.active()),
            format!(
                "{} [{} history samples]",
                self.scheduler.interval_label(),
                self.scheduler.state().pattern_sample_count
            ),
            format!(
                "Auto-refresh {}, adaptive {}, hover {}",
                on_off(self.scheduler.is_running()),
                on_off(self.scheduler.is_adaptive_enabled()),
                on_off(self.hover.is_enabled())
            ),
        ];
        if let Some(countdown) = self.scheduler.countdown_text(Instant::now()) {
            lines.push(countdown);
        }
        if let Some(at) = self.last_update {
            lines.push(format!(
                "Last update: {}",
                format::last_update_text(at, Utc::now())
            ));
        }
        lines.join("\n")
    }

    fn show_interval(&mut self) {
        let label = self.scheduler.interval_label();
        self.view.interval_changed(&label);
    }

    /// Processes events until `duration` of (possibly paused) time has passed.
    #[cfg(test)]
    pub async fn pump_for(&mut self, duration: Duration) {
        let deadline = Instant::now() + duration;
        loop {
            tokio::select! {
                _ = tokio::time::sleep_until(deadline) => break,
                Some(event) = self.events_rx.recv() => self.handle_event(event),
            }
        }
    }
}

fn show_selection<V: RadarView>(view: &mut V, selection: &Selection) {
    match selection {
        Selection::Station(station) => view.station_changed(station),
        Selection::Layer(layer) => view.layer_changed(layer),
    }
}
