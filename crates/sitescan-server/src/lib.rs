//! HTTP boundary of the scan platform.
//!
//! Wires the store, job queue, pipeline, and reconciler into an axum
//! application: REST endpoints under `/v1`, a uniform response envelope
//! with trace ids, CORS, and Swagger UI at `/docs`.

pub mod api;
pub mod app;
pub mod config;
pub mod logging;
pub mod state;
