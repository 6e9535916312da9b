//! OpenAPI document.

use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for the typerace server.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::races::create_race,
        crate::routes::races::get_race,
        crate::routes::races::transact,
        crate::routes::teams::list_teams,
        crate::routes::sse::race_events,
        crate::routes::websocket::ws_handler,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::race::RaceSummary,
            crate::dto::race::EntrantSummary,
            crate::dto::race::RaceSnapshot,
            crate::dto::race::CreateRaceRequest,
            crate::dto::transact::TransactRequest,
            crate::dto::transact::TxOpInput,
            crate::dto::transact::TransactResponse,
            crate::dto::transact::CommittedRace,
            crate::dto::teams::TeamsResponse,
            crate::dto::sse::Handshake,
            crate::dto::sse::Advisory,
            crate::dto::ws::RaceInboundMessage,
            crate::dto::ws::RaceOutboundMessage,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "races", description = "Race Store reads, writes and WebSocket sessions"),
        (name = "sse", description = "Server-sent event streams"),
    )
)]
pub struct ApiDoc;
