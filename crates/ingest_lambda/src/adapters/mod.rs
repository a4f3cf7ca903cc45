//! Typed request/response clients over the backend services.
//!
//! Pure I/O adapters: traits keep the handlers testable offline, and the
//! AWS implementations bridge to the async SDKs without carrying any
//! reconciliation logic. Transient throttling retries are the SDK's
//! concern.

pub mod delivery_stream;
pub mod log_group;
pub mod pipeline;
pub mod queue;
pub mod search_admin;
