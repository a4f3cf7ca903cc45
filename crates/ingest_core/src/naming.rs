//! Deterministic identities for managed resources.
//!
//! Every name is derived purely from its inputs so repeat invocations look
//! up the same resources instead of creating duplicates.

use crate::contract::ValidationError;

/// Tag key that drives subscription reconciliation on a log group.
pub const DESTINATION_TAG: &str = "autolog:dest";

/// Fixed binding name for the per-log-group subscription filter.
pub const SUBSCRIPTION_FILTER_NAME: &str = "autolog";

pub fn queue_name(index_name: &str) -> String {
    format!("ingest-{index_name}-queue")
}

pub fn pipeline_name(index_name: &str) -> String {
    format!("ingestion-pipeline-{index_name}")
}

pub fn pipeline_log_group_name(pipeline_name: &str) -> String {
    format!("/aws/vendedlogs/{pipeline_name}")
}

pub fn index_pattern_id(index_name: &str) -> String {
    format!("logs-{index_name}")
}

pub fn delivery_stream_name(bucket_name: &str, index_name: &str) -> String {
    format!("autolog-{bucket_name}-{index_name}")
}

pub fn delivery_prefix(index_name: &str, account_id: &str, region: &str) -> String {
    format!("autolog/{index_name}/{account_id}/{region}/")
}

pub fn dlq_key_prefix(pipeline_name: &str) -> String {
    format!("dlq/{pipeline_name}/%{{yyyy}}/%{{MM}}/%{{dd}}")
}

/// Extracts the log-group name from its ARN. The resource segment carries a
/// `log-group:` prefix and may end in `:*`.
pub fn parse_log_group_arn(arn: &str) -> Result<String, ValidationError> {
    let resource = arn
        .splitn(6, ':')
        .nth(5)
        .ok_or_else(|| ValidationError::new(format!("{arn:?} is not a log-group ARN")))?;
    let name = resource
        .strip_prefix("log-group:")
        .ok_or_else(|| ValidationError::new(format!("{arn:?} is not a log-group ARN")))?;
    let name = name.strip_suffix(":*").unwrap_or(name);
    if name.is_empty() {
        return Err(ValidationError::new(format!(
            "{arn:?} carries an empty log-group name"
        )));
    }
    Ok(name.to_string())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    pub bucket_name: String,
    pub index_name: String,
}

/// Parses a destination tag value of the form `bucket/index`.
pub fn parse_destination(value: &str) -> Result<Destination, ValidationError> {
    match value.split('/').collect::<Vec<_>>().as_slice() {
        [bucket, index] if !bucket.is_empty() && !index.is_empty() => Ok(Destination {
            bucket_name: bucket.to_string(),
            index_name: index.to_string(),
        }),
        _ => Err(ValidationError::new(format!(
            "invalid destination {value:?}, expected bucket/index"
        ))),
    }
}
