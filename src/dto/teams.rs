//! Team list payload.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Team labels offered by the profile selector.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TeamsResponse {
    /// Labels in configured order.
    pub teams: Vec<String>,
}
