//! Health reporting.

use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Report whether persistence is reachable, logging connectivity issues.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    match state.race_store().await {
        Some(store) => {
            if let Err(err) = store.health_check().await {
                warn!(error = %err, "storage health check failed");
            }
        }
        None => warn!("storage unavailable (degraded mode)"),
    }

    let races = state.table().read().await.len();
    if state.is_degraded().await {
        HealthResponse::degraded(races)
    } else {
        HealthResponse::ok(races)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{config::AppConfig, dao::race_store::memory::MemoryRaceStore, state::AppState};

    #[tokio::test]
    async fn reports_degraded_without_storage() {
        let state = AppState::new(AppConfig::default());
        assert_eq!(health_status(&state).await.status, "degraded");

        state
            .install_race_store(Arc::new(MemoryRaceStore::new()))
            .await;
        let status = health_status(&state).await;
        assert_eq!(status.status, "ok");
        assert_eq!(status.races, 0);
    }
}
