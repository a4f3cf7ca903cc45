//! AWS-oriented adapters and handlers for log-ingestion reconciliation.
//!
//! This crate owns runtime integration details: typed clients over the
//! backend services, the idempotent reconciliation handlers driven by
//! decoded events, the activation poller, and the Lambda binaries that wire
//! real clients together. Deterministic contracts and document models live
//! in `ingest_core`.

pub mod adapters;
pub mod error;
pub mod handlers;
pub mod poller;
pub mod telemetry;
