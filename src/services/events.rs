use crate::models::{HoverOutcome, HoverRequest, LayerInfo, StationInfo};

use super::radar_api::ClientError;
use super::refresh_scheduler::CycleReport;
use super::source_switch::SwitchCompletion;

/// Everything that re-enters the event loop from a timer or a finished fetch.
/// Each variant carries the identity the loop re-validates before applying it.
#[derive(Debug)]
pub enum AppEvent {
    RefreshDue { generation: u64 },
    CountdownTick { generation: u64 },
    /// Re-render relative ages (data time, last update).
    AgeTick,
    CycleFinished(Box<CycleReport>),
    HoverDue { token: u64, request: HoverRequest },
    HoverResolved {
        token: u64,
        layer_id: String,
        outcome: HoverOutcome,
    },
    SwitchFinished(Box<SwitchCompletion>),
    StationsLoaded(Result<Vec<StationInfo>, ClientError>),
    LayersLoaded(Result<Vec<LayerInfo>, ClientError>),
}
