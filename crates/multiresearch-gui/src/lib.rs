//! Axum service hosting the MultiResearch run lifecycle.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;
pub mod telemetry;
