//! Team list route.

use axum::{Json, Router, extract::State, routing::get};

use crate::{dto::teams::TeamsResponse, state::SharedState};

#[utoipa::path(
    get,
    path = "/teams",
    tag = "races",
    responses((status = 200, description = "Team labels offered to participants", body = TeamsResponse))
)]
/// List the configured team labels.
pub async fn list_teams(State(state): State<SharedState>) -> Json<TeamsResponse> {
    Json(TeamsResponse {
        teams: state.config().teams().to_vec(),
    })
}

/// Configure the team selector routes.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/teams", get(list_teams))
}
