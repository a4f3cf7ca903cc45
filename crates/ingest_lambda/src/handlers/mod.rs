//! Reconciliation handlers: pure logic over the adapter traits, one module
//! per event entry point.

pub mod log_tag;
pub mod object_created;
pub mod search_config;
