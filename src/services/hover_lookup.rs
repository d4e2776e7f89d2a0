use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;
use tokio::time::{Duration, Instant};

use crate::models::{HoverOutcome, HoverRequest, PointValueResponse, OUT_OF_COVERAGE_MESSAGE};
use crate::utils::format;

use super::events::AppEvent;
use super::radar_api::{is_no_data_message, ClientError, RadarApi};
use super::timer::{Debouncer, TaskHandle};
use super::view::RadarView;

/// Debounced point-value lookups driven by pointer movement.
///
/// Only the request holding the debouncer's current token may update the
/// display; anything older is dropped as stale.
pub struct HoverQueryDebouncer<A> {
    api: Arc<A>,
    debouncer: Debouncer,
    inflight: TaskHandle,
    enabled: bool,
    visible: bool,
    events: UnboundedSender<AppEvent>,
}

impl<A: RadarApi> HoverQueryDebouncer<A> {
    pub fn new(
        api: Arc<A>,
        quiet_period: Duration,
        enabled: bool,
        events: UnboundedSender<AppEvent>,
    ) -> Self {
        Self {
            api,
            debouncer: Debouncer::new(quiet_period),
            inflight: TaskHandle::default(),
            enabled,
            visible: false,
            events,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[cfg(test)]
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn set_enabled(&mut self, enabled: bool, view: &mut dyn RadarView) {
        self.enabled = enabled;
        if !enabled {
            self.hide(view);
        }
    }

    pub fn on_move(&mut self, lat: f64, lon: f64, layer_id: &str, view: &mut dyn RadarView) {
        if !self.enabled {
            return;
        }
        self.visible = true;
        view.hover_pending(lat, lon);

        let request = HoverRequest {
            latitude: lat,
            longitude: lon,
            layer_id: layer_id.to_string(),
            issued_at: Instant::now(),
        };
        self.debouncer
            .trigger(&self.events, |token| AppEvent::HoverDue { token, request });
    }

    pub fn on_leave(&mut self, view: &mut dyn RadarView) {
        if !self.enabled {
            return;
        }
        self.hide(view);
    }

    /// The quiet period elapsed: issue the lookup if the request is still current.
    pub fn on_due(&mut self, token: u64, request: HoverRequest) -> Result<(), ClientError> {
        if !self.enabled || !self.visible || !self.debouncer.is_current(token) {
            return Err(ClientError::StaleResult);
        }

        log::debug!(
            "[Hover] Looking up ({:.3}, {:.3}) {:?} after the last move",
            request.latitude,
            request.longitude,
            request.issued_at.elapsed()
        );
        let api = Arc::clone(&self.api);
        let events = self.events.clone();
        // Replacing the handle aborts any older lookup still in flight.
        self.inflight = TaskHandle::spawn(async move {
            let outcome = lookup(api.as_ref(), &request).await;
            let _ = events.send(AppEvent::HoverResolved {
                token,
                layer_id: request.layer_id,
                outcome,
            });
        });
        Ok(())
    }

    /// Applies a lookup result unless it was superseded, hidden, or fetched for
    /// a layer that is no longer active.
    pub fn on_resolved(
        &mut self,
        token: u64,
        layer_id: &str,
        outcome: HoverOutcome,
        active_layer: &str,
        view: &mut dyn RadarView,
    ) -> Result<(), ClientError> {
        if !self.enabled
            || !self.visible
            || !self.debouncer.is_current(token)
            || layer_id != active_layer
        {
            return Err(ClientError::StaleResult);
        }
        view.hover_result(&outcome.display_text());
        Ok(())
    }

    fn hide(&mut self, view: &mut dyn RadarView) {
        self.debouncer.cancel();
        self.inflight.cancel();
        self.visible = false;
        view.hover_hidden();
    }
}

async fn lookup<A: RadarApi>(api: &A, request: &HoverRequest) -> HoverOutcome {
    match api
        .point_value(request.latitude, request.longitude, &request.layer_id)
        .await
    {
        Ok(response) => outcome_from_response(response),
        Err(ClientError::OutOfCoverage) => HoverOutcome::OutOfCoverage,
        Err(ClientError::NoData) => HoverOutcome::NoData,
        Err(e) => {
            log::debug!("[Hover] Point lookup failed: {}", e);
            HoverOutcome::Failed(e.to_string())
        }
    }
}

fn outcome_from_response(response: PointValueResponse) -> HoverOutcome {
    if let Some(error) = response.error {
        if error == OUT_OF_COVERAGE_MESSAGE {
            return HoverOutcome::OutOfCoverage;
        }
        if is_no_data_message(&error) {
            return HoverOutcome::NoData;
        }
        return HoverOutcome::Failed(error);
    }
    match response.value.as_ref().and_then(format::point_value) {
        Some(text) => HoverOutcome::Value(text),
        None => HoverOutcome::NoData,
    }
}
