use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Events consumed by the reconcilers, discriminated by their `source` field.
///
/// Payloads are decoded into these shapes at the boundary; core logic never
/// sees untyped JSON.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "source")]
pub enum Notification {
    #[serde(rename = "aws.s3")]
    ObjectCreated(ObjectCreatedEvent),
    #[serde(rename = "aws.tag")]
    TagChange(TagChangeEvent),
    #[serde(rename = "aws.logs")]
    LogGroupLifecycle(LogGroupLifecycleEvent),
}

impl Notification {
    pub fn from_value(value: Value) -> Result<Self, ValidationError> {
        serde_json::from_value(value)
            .map_err(|error| ValidationError::new(format!("unrecognized event: {error}")))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ObjectCreatedEvent {
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub resources: Vec<String>,
    pub detail: ObjectCreatedDetail,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ObjectCreatedDetail {
    pub bucket: BucketRef,
    pub object: ObjectRef,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BucketRef {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ObjectRef {
    pub key: String,
    #[serde(default)]
    pub size: Option<u64>,
}

impl ObjectCreatedEvent {
    pub fn bucket_name(&self) -> &str {
        &self.detail.bucket.name
    }

    pub fn object_key(&self) -> &str {
        &self.detail.object.key
    }

    /// Index identity by convention: the second path segment of the object
    /// key (`app/web/2024/01/01/file.gz` -> `web`).
    pub fn index_name(&self) -> Result<String, ValidationError> {
        match self.object_key().split('/').nth(1) {
            Some(segment) if !segment.is_empty() => Ok(segment.to_string()),
            _ => Err(ValidationError::new(format!(
                "object key {:?} carries no index segment",
                self.object_key()
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TagChangeEvent {
    pub resources: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogGroupLifecycleEvent {
    pub detail: LogGroupLifecycleDetail,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogGroupLifecycleDetail {
    #[serde(rename = "eventName")]
    pub event_name: String,
    #[serde(rename = "requestParameters")]
    pub request_parameters: LogGroupRequestParameters,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogGroupRequestParameters {
    #[serde(rename = "logGroupName")]
    pub log_group_name: String,
}

/// Reshapes an object-created notification into the record envelope the
/// queue-backed pipeline source expects. Pure; identical events produce
/// identical envelopes.
pub fn queue_envelope(event: &ObjectCreatedEvent) -> Value {
    let bucket_arn = format!("arn:aws:s3:::{}", event.bucket_name());
    let bucket_arn = event
        .resources
        .iter()
        .find(|resource| **resource == bucket_arn)
        .cloned()
        .unwrap_or(bucket_arn);

    json!({
        "Records": [
            {
                "eventVersion": "2.1",
                "eventSource": "aws:s3",
                "awsRegion": event.region,
                "eventTime": event.time,
                "eventName": "ObjectCreated:Put",
                "s3": {
                    "bucket": {
                        "name": event.bucket_name(),
                        "arn": bucket_arn,
                    },
                    "object": {
                        "key": event.object_key(),
                        "size": event.detail.object.size,
                    },
                },
            }
        ]
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ValidationError {}
