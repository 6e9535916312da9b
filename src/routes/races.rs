//! Race creation, reads and batched writes.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use axum_valid::Valid;
use uuid::Uuid;

use crate::{
    dto::{
        race::{CreateRaceRequest, RaceSnapshot},
        transact::{TransactRequest, TransactResponse},
    },
    error::AppError,
    services::race_service,
    state::SharedState,
};

/// Routes reading and writing races.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/races", post(create_race))
        .route("/races/{id}", get(get_race))
        .route("/transact", post(transact))
}

/// Open a new race.
#[utoipa::path(
    post,
    path = "/races",
    tag = "races",
    request_body = CreateRaceRequest,
    responses(
        (status = 201, description = "Race created", body = RaceSnapshot),
        (status = 400, description = "Invalid paragraph")
    )
)]
pub async fn create_race(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<CreateRaceRequest>>,
) -> Result<(StatusCode, Json<RaceSnapshot>), AppError> {
    let snapshot = race_service::create_race(&state, payload.text).await?;
    Ok((StatusCode::CREATED, Json(snapshot)))
}

/// Current snapshot of a race.
#[utoipa::path(
    get,
    path = "/races/{id}",
    tag = "races",
    params(("id" = Uuid, Path, description = "Identifier of the race")),
    responses(
        (status = 200, description = "Race snapshot", body = RaceSnapshot),
        (status = 404, description = "Unknown race")
    )
)]
pub async fn get_race(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<RaceSnapshot>, AppError> {
    Ok(Json(race_service::get_race(&state, id).await?))
}

/// Apply a batch of record updates and links atomically.
#[utoipa::path(
    post,
    path = "/transact",
    tag = "races",
    request_body = TransactRequest,
    responses(
        (status = 200, description = "Batch committed", body = TransactResponse),
        (status = 400, description = "Empty or oversized batch"),
        (status = 404, description = "Link target missing"),
        (status = 409, description = "Race already started or entrant linked elsewhere")
    )
)]
pub async fn transact(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<TransactRequest>>,
) -> Result<Json<TransactResponse>, AppError> {
    let response = race_service::transact(&state, payload.into()).await?;
    Ok(Json(response))
}
