use std::sync::Arc;

use futures_util::future::join4;
use tokio::sync::mpsc::UnboundedSender;
use tokio::time::{Duration, Instant};

use crate::models::{
    ActiveSource, DataTime, OverlayImage, RadarStatus, RefreshState, TimestampHistoryEntry,
    DEFAULT_INTERVAL_MS,
};
use crate::utils::format;

use super::events::AppEvent;
use super::history_repository::HistoryRepository;
use super::pattern_engine::PatternAnalyzer;
use super::radar_api::{ClientError, RadarApi};
use super::timer::{spawn_every, TaskHandle};

const COUNTDOWN_TICK: Duration = Duration::from_secs(1);

/// Everything one refresh cycle fetched, tagged with the epoch, sequence
/// number and source it was started for.
#[derive(Debug)]
pub struct CycleReport {
    pub epoch: u64,
    pub seq: u64,
    pub source: ActiveSource,
    pub overlay: Result<OverlayImage, ClientError>,
    pub status: Result<RadarStatus, ClientError>,
    pub data_time: Result<DataTime, ClientError>,
    pub history: Result<Vec<TimestampHistoryEntry>, ClientError>,
}

/// Owns the polling interval, the periodic timer and the countdown tick.
///
/// Timers only post [`AppEvent`]s; the owning loop hands them back through
/// [`on_refresh_due`](Self::on_refresh_due) and friends, which drop anything
/// from an older generation.
pub struct AdaptiveScheduler<A> {
    api: Arc<A>,
    history: HistoryRepository<A>,
    analyzer: PatternAnalyzer,
    state: RefreshState,
    periodic: TaskHandle,
    countdown: TaskHandle,
    cycles: Vec<TaskHandle>,
    // Bumped on every start; timer events from older generations are ignored.
    generation: u64,
    // Bumped on reset; cycle reports from older epochs are ignored.
    epoch: u64,
    // Issued per spawned cycle. Reports not newer than the last applied one are ignored.
    cycle_seq: u64,
    applied_seq: u64,
    events: UnboundedSender<AppEvent>,
}

impl<A: RadarApi> AdaptiveScheduler<A> {
    pub fn new(api: Arc<A>, analyzer: PatternAnalyzer, events: UnboundedSender<AppEvent>) -> Self {
        Self {
            history: HistoryRepository::new(Arc::clone(&api)),
            api,
            analyzer,
            state: RefreshState::default(),
            periodic: TaskHandle::default(),
            countdown: TaskHandle::default(),
            cycles: Vec::new(),
            generation: 0,
            epoch: 0,
            cycle_seq: 0,
            applied_seq: 0,
            events,
        }
    }

    pub fn state(&self) -> &RefreshState {
        &self.state
    }

    #[cfg(test)]
    pub fn interval_ms(&self) -> u64 {
        self.state.interval_ms
    }

    pub fn is_running(&self) -> bool {
        self.state.is_running
    }

    pub fn set_adaptive(&mut self, enabled: bool) {
        self.analyzer.set_enabled(enabled);
    }

    pub fn is_adaptive_enabled(&self) -> bool {
        self.analyzer.is_enabled()
    }

    /// Whether the current interval was learned rather than defaulted.
    pub fn is_adapted(&self) -> bool {
        self.state.pattern_sample_count >= 2 && self.state.interval_ms > DEFAULT_INTERVAL_MS
    }

    pub fn interval_label(&self) -> String {
        format::interval_label(self.state.interval_ms, self.is_adapted())
    }

    /// Number of live timers, periodic plus countdown.
    #[cfg(test)]
    pub fn active_timers(&self) -> usize {
        [&self.periodic, &self.countdown]
            .iter()
            .filter(|t| t.is_active())
            .count()
    }

    /// (Re)starts polling at the current interval. Always cancels the previous
    /// timers first, so at most one periodic and one countdown timer exist.
    pub fn start(&mut self) {
        self.stop();
        self.generation += 1;
        let generation = self.generation;
        let period = Duration::from_millis(self.state.interval_ms);

        self.periodic = spawn_every(period, self.events.clone(), move || {
            AppEvent::RefreshDue { generation }
        });
        self.countdown = spawn_every(COUNTDOWN_TICK, self.events.clone(), move || {
            AppEvent::CountdownTick { generation }
        });
        self.state.next_fire_at = Some(Instant::now() + period);
        self.state.is_running = true;

        log::info!(
            "[Scheduler] Auto-refresh started with {} second interval",
            self.state.interval_ms / 1000
        );
    }

    pub fn stop(&mut self) {
        self.periodic.cancel();
        self.countdown.cancel();
        self.state.next_fire_at = None;
        if self.state.is_running {
            log::info!("[Scheduler] Auto-refresh stopped");
        }
        self.state.is_running = false;
    }

    /// Handles a periodic timer fire. Returns `false` for a stale generation.
    pub fn on_refresh_due(&mut self, generation: u64, source: &ActiveSource) -> bool {
        if !self.is_live(generation) {
            log::debug!("[Scheduler] Ignoring refresh from generation {}", generation);
            return false;
        }
        self.state.next_fire_at = Some(Instant::now() + Duration::from_millis(self.state.interval_ms));
        self.spawn_cycle(source.clone());
        true
    }

    /// Countdown text for a tick, or `None` if the tick is stale.
    pub fn on_countdown_tick(&self, generation: u64) -> Option<String> {
        if !self.is_live(generation) {
            return None;
        }
        self.countdown_text(Instant::now())
    }

    pub fn countdown_text(&self, now: Instant) -> Option<String> {
        let next = self.state.next_fire_at?;
        Some(format::countdown_text(next.saturating_duration_since(now)))
    }

    /// Out-of-band refresh. The interval is untouched, but while running the
    /// timers are restarted so the next fire is one full interval from now.
    pub fn force_refresh_now(&mut self, source: &ActiveSource) {
        if self.state.is_running {
            self.start();
        }
        self.spawn_cycle(source.clone());
    }

    /// Drops everything learned about the previous source: default interval,
    /// no samples, and in-flight cycles are abandoned.
    pub fn reset_to_default(&mut self) {
        self.state.interval_ms = DEFAULT_INTERVAL_MS;
        self.state.pattern_sample_count = 0;
        self.epoch += 1;
        for mut cycle in self.cycles.drain(..) {
            cycle.cancel();
        }
        if self.state.is_running {
            self.start();
        }
        log::info!("[Scheduler] Refresh state reset to default");
    }

    /// Validates a finished cycle and feeds its history to the analyzer.
    /// Returns the new interval if it changed.
    pub fn accept_cycle(
        &mut self,
        report: &CycleReport,
        active: &ActiveSource,
    ) -> Result<Option<u64>, ClientError> {
        if report.epoch != self.epoch || report.source != *active {
            return Err(ClientError::StaleResult);
        }
        if report.seq <= self.applied_seq {
            log::debug!(
                "[Scheduler] Cycle {} finished after cycle {}, discarding",
                report.seq,
                self.applied_seq
            );
            return Err(ClientError::StaleResult);
        }
        self.applied_seq = report.seq;

        let Ok(history) = &report.history else {
            return Ok(None);
        };
        self.state.pattern_sample_count = history.len();

        let Some(new_interval) = self.analyzer.recommend(history, self.state.interval_ms) else {
            return Ok(None);
        };

        let old_interval = self.state.interval_ms;
        self.state.interval_ms = new_interval;
        log::info!(
            "[Scheduler] Adaptive refresh: changed from {}s to {}s based on radar pattern",
            old_interval / 1000,
            new_interval / 1000
        );
        if self.state.is_running {
            self.start();
        }
        Ok(Some(new_interval))
    }

    fn is_live(&self, generation: u64) -> bool {
        self.state.is_running && generation == self.generation
    }

    fn spawn_cycle(&mut self, source: ActiveSource) {
        self.cycles.retain(|c| c.is_active());

        let api = Arc::clone(&self.api);
        let history = self.history.clone();
        let events = self.events.clone();
        let epoch = self.epoch;
        self.cycle_seq += 1;
        let seq = self.cycle_seq;

        self.cycles.push(TaskHandle::spawn(async move {
            let report = run_cycle(api.as_ref(), &history, epoch, seq, source).await;
            let _ = events.send(AppEvent::CycleFinished(Box::new(report)));
        }));
    }
}

async fn run_cycle<A: RadarApi>(
    api: &A,
    history: &HistoryRepository<A>,
    epoch: u64,
    seq: u64,
    source: ActiveSource,
) -> CycleReport {
    let (overlay, status, data_time, history) = join4(
        api.radar_image(&source.layer_id),
        api.status(),
        fetch_data_time(api),
        history.fetch(),
    )
    .await;
    let data_time = data_time.or_else(|e| status_data_time(&status).ok_or(e));

    CycleReport {
        epoch,
        seq,
        source,
        overlay,
        status,
        data_time,
        history,
    }
}

/// The status payload may carry the data timestamp too; used when the
/// dedicated data-time request fails.
fn status_data_time(status: &Result<RadarStatus, ClientError>) -> Option<DataTime> {
    let timestamp = status.as_ref().ok()?.data_timestamp?;
    log::debug!("[Scheduler] Using data time from status response");
    Some(DataTime {
        timestamp,
        local_display: None,
        is_fallback: true,
    })
}

async fn fetch_data_time<A: RadarApi>(api: &A) -> Result<DataTime, ClientError> {
    let response = api.data_time().await?;
    match response.data_timestamp {
        Some(timestamp) if response.success => Ok(DataTime {
            timestamp,
            local_display: response.data_time_local_display,
            is_fallback: response.is_fallback,
        }),
        _ => Err(ClientError::MalformedPayload(
            "data time unavailable".to_string(),
        )),
    }
}
