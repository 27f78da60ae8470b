//! HTTP API handlers for toolcat-import
//!
//! REST endpoints for starting, retrying, inspecting and cancelling import
//! runs, plus an SSE stream of catalog events.

pub mod health;
pub mod import;
pub mod sse;
pub mod tools;

pub use health::health_routes;
pub use import::import_routes;
pub use sse::event_routes;
pub use tools::tool_routes;
