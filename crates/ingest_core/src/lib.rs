//! Shared log-ingestion domain primitives.
//!
//! This crate owns deterministic reconciliation behavior: event contracts,
//! resource-identity derivation, the pipeline-body generator, and the
//! versioned search-engine documents. It intentionally excludes AWS SDK and
//! Lambda runtime concerns.

pub mod contract;
pub mod naming;
pub mod pipeline_spec;
pub mod search_docs;
