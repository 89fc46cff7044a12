//! Backend HTTP API: read endpoints and action triggers.
//!
//! - [`client`]: [`ApiClient`] for `/network/topology`, `/sensors` and the
//!   action endpoints
//! - [`actions`]: the [`ActionSink`] seam the dashboard dispatches through,
//!   with an HTTP implementation and a no-backend fallback
//! - [`error`]: [`ApiError`]

mod actions;
mod client;
mod error;

pub use actions::{ActionOutcome, ActionSink, HttpActions, NoActions};
pub use client::{Action, ActionResponse, ApiClient};
pub use error::ApiError;
