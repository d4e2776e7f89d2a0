use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;

use crate::models::{ActiveSource, BoundingBox, CurrentLayer, CurrentStation};

use super::events::AppEvent;
use super::radar_api::{ClientError, RadarApi};
use super::timer::TaskHandle;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwitchTarget {
    Station(String),
    Layer(String),
}

impl SwitchTarget {
    fn noun(&self) -> &'static str {
        match self {
            SwitchTarget::Station(_) => "radar station",
            SwitchTarget::Layer(_) => "weather layer",
        }
    }
}

/// Server-side selection as returned by a switch or a current-* read.
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    Station(CurrentStation),
    Layer(CurrentLayer),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwitchFailure {
    pub error: ClientError,
    /// Authoritative selection re-read after the failure, if that read worked.
    pub authoritative: Option<Selection>,
}

#[derive(Debug)]
pub struct SwitchCompletion {
    pub target: SwitchTarget,
    pub result: Result<(Selection, Option<BoundingBox>), SwitchFailure>,
}

/// Why a switch request did not start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchRequest {
    Started,
    AlreadyActive,
    Busy,
}

/// What the loop must do once a switch settles.
#[derive(Debug, Clone, PartialEq)]
pub enum SwitchResolution {
    Applied {
        selection: Selection,
        bounds: Option<BoundingBox>,
    },
    RolledBack {
        alert: String,
        authoritative: Option<Selection>,
    },
}

/// Sole writer of [`ActiveSource`]. One switch at a time: while a request is
/// in flight every other request is refused, as if the control were disabled.
pub struct SourceSwitchCoordinator<A> {
    api: Arc<A>,
    active: ActiveSource,
    pending: Option<SwitchTarget>,
    task: TaskHandle,
    events: UnboundedSender<AppEvent>,
}

impl<A: RadarApi> SourceSwitchCoordinator<A> {
    pub fn new(api: Arc<A>, active: ActiveSource, events: UnboundedSender<AppEvent>) -> Self {
        Self {
            api,
            active,
            pending: None,
            task: TaskHandle::default(),
            events,
        }
    }

    pub fn active(&self) -> &ActiveSource {
        &self.active
    }

    pub fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    pub fn switch_station(&mut self, station_id: &str) -> SwitchRequest {
        let station_id = station_id.trim().to_uppercase();
        if station_id == self.active.station_id {
            return SwitchRequest::AlreadyActive;
        }
        self.begin(SwitchTarget::Station(station_id))
    }

    pub fn switch_layer(&mut self, layer_id: &str) -> SwitchRequest {
        let layer_id = layer_id.trim().to_string();
        if layer_id == self.active.layer_id {
            return SwitchRequest::AlreadyActive;
        }
        self.begin(SwitchTarget::Layer(layer_id))
    }

    fn begin(&mut self, target: SwitchTarget) -> SwitchRequest {
        if self.pending.is_some() {
            log::debug!("[Switch] Ignoring {:?}, another switch is in flight", target);
            return SwitchRequest::Busy;
        }
        log::info!("[Switch] Switching {} to {:?}", target.noun(), target);

        self.pending = Some(target.clone());
        let api = Arc::clone(&self.api);
        let events = self.events.clone();
        self.task = TaskHandle::spawn(async move {
            let completion = run_switch(api.as_ref(), target).await;
            let _ = events.send(AppEvent::SwitchFinished(Box::new(completion)));
        });
        SwitchRequest::Started
    }

    /// Settles the in-flight switch. On failure `ActiveSource` is left as it was.
    pub fn complete(
        &mut self,
        completion: SwitchCompletion,
    ) -> Result<SwitchResolution, ClientError> {
        if self.pending.as_ref() != Some(&completion.target) {
            return Err(ClientError::StaleResult);
        }
        self.pending = None;

        match completion.result {
            Ok((selection, bounds)) => {
                match &selection {
                    Selection::Station(station) => {
                        self.active.station_id = station.station_id.clone();
                    }
                    Selection::Layer(layer) => {
                        self.active.layer_id = layer.layer_id.clone();
                    }
                }
                log::info!("[Switch] Active source is now {}", self.active);
                Ok(SwitchResolution::Applied { selection, bounds })
            }
            Err(failure) => {
                log::warn!(
                    "[Switch] Failed to switch {}: {}",
                    completion.target.noun(),
                    failure.error
                );
                if let Some(authoritative) = &failure.authoritative {
                    if !self.matches_active(authoritative) {
                        log::warn!(
                            "[Switch] Server selection {:?} diverges from {}",
                            authoritative,
                            self.active
                        );
                    }
                }
                Ok(SwitchResolution::RolledBack {
                    alert: format!(
                        "Failed to switch {}: {}",
                        completion.target.noun(),
                        failure.error.user_message()
                    ),
                    authoritative: failure.authoritative,
                })
            }
        }
    }

    /// Abandons an in-flight switch without applying it.
    pub fn cancel(&mut self) {
        self.task.cancel();
        self.pending = None;
    }

    fn matches_active(&self, selection: &Selection) -> bool {
        match selection {
            Selection::Station(s) => s.station_id == self.active.station_id,
            Selection::Layer(l) => l.layer_id == self.active.layer_id,
        }
    }
}

async fn run_switch<A: RadarApi>(api: &A, target: SwitchTarget) -> SwitchCompletion {
    let switched = match &target {
        SwitchTarget::Station(id) => api.switch_station(id).await.map(Selection::Station),
        SwitchTarget::Layer(id) => api.switch_layer(id).await.map(Selection::Layer),
    };

    let result = match switched {
        Ok(selection) => {
            let bounds = match api.bounds().await {
                Ok(bounds) => Some(bounds),
                Err(e) => {
                    log::warn!("[Switch] Could not reload map bounds: {}", e);
                    None
                }
            };
            Ok((selection, bounds))
        }
        Err(error) => {
            let authoritative = match &target {
                SwitchTarget::Station(_) => api.current_station().await.map(Selection::Station),
                SwitchTarget::Layer(_) => api.current_layer().await.map(Selection::Layer),
            };
            let authoritative = authoritative
                .map_err(|e| log::warn!("[Switch] Could not resynchronise selection: {}", e))
                .ok();
            Err(SwitchFailure {
                error,
                authoritative,
            })
        }
    };

    SwitchCompletion { target, result }
}
