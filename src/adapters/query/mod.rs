//! Remote event store integration: OAuth and the submit/poll query protocol

pub mod auth;
pub mod client;
pub mod models;

pub use auth::TokenProvider;
pub use client::{EventStore, QueryClient};
pub use models::{EventPage, QueryResponse, QueryResultPayload};
