//! Health check payload.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Health response returned by the `/healthcheck` route.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Health status ("ok" or "degraded").
    pub status: String,
    /// Races currently held in memory.
    pub races: usize,
}

impl HealthResponse {
    /// Create a health response indicating the system is operational.
    pub fn ok(races: usize) -> Self {
        Self {
            status: "ok".to_string(),
            races,
        }
    }

    /// Create a health response indicating the system is running without storage.
    pub fn degraded(races: usize) -> Self {
        Self {
            status: "degraded".to_string(),
            races,
        }
    }
}
