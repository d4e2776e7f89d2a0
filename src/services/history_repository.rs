use std::sync::Arc;

use crate::models::TimestampHistoryEntry;
use super::radar_api::{ClientError, RadarApi};

/// Reads the server's recent data-update timestamps. Stateless.
pub struct HistoryRepository<A> {
    api: Arc<A>,
}

impl<A> Clone for HistoryRepository<A> {
    fn clone(&self) -> Self {
        Self {
            api: Arc::clone(&self.api),
        }
    }
}

impl<A: RadarApi> HistoryRepository<A> {
    pub fn new(api: Arc<A>) -> Self {
        Self { api }
    }

    pub async fn fetch(&self) -> Result<Vec<TimestampHistoryEntry>, ClientError> {
        let response = self.api.timestamp_history().await?;
        if !response.success {
            return Err(ClientError::MalformedPayload(
                response
                    .error
                    .unwrap_or_else(|| "timestamp history unavailable".to_string()),
            ));
        }
        validate_order(&response.history)?;
        Ok(response.history)
    }
}

/// Entries must run newest-first.
fn validate_order(history: &[TimestampHistoryEntry]) -> Result<(), ClientError> {
    let out_of_order = history
        .windows(2)
        .any(|pair| pair[0].timestamp < pair[1].timestamp);
    if out_of_order {
        return Err(ClientError::MalformedPayload(
            "timestamp history is not ordered newest-first".to_string(),
        ));
    }
    Ok(())
}
