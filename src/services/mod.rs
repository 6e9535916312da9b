//! Business logic behind the routes.

/// Mobile device advisory.
pub mod advisory;
/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Write-behind persistence of committed batches.
pub mod persistence;
/// Race creation, reads, subscriptions and batched writes.
pub mod race_service;
/// Server-Sent Events payload builders.
pub mod sse_events;
/// Server-Sent Events streaming service.
pub mod sse_service;
/// Storage connection supervisor toggling degraded mode.
pub mod storage_supervisor;
/// WebSocket session handling.
pub mod websocket_service;
