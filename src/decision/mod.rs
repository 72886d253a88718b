//! Decision provider payload and HTTP client

pub mod client;
pub mod request;

pub use client::HttpDecisionClient;
pub use request::{price_change, DecisionRequest, PositionPayload};
