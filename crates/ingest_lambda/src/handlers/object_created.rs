//! Pipeline reconciler: converges the ingest queue, vended-log group,
//! ingestion pipeline, and index pattern for the index identity an
//! object-created notification names.

use ingest_core::contract::{queue_envelope, ObjectCreatedEvent};
use ingest_core::naming;
use ingest_core::pipeline_spec::{default_index_settings, generate_pipeline_body, PipelineSpecInputs};
use ingest_core::search_docs::log_index_pattern;
use serde::Serialize;

use crate::adapters::log_group::LogGroupService;
use crate::adapters::pipeline::{CreatePipeline, PipelineService};
use crate::adapters::queue::QueueService;
use crate::adapters::search_admin::SearchAdmin;
use crate::error::ServiceError;

const QUEUE_ATTRIBUTES: &[(&str, &str)] = &[
    ("DelaySeconds", "0"),
    ("MessageRetentionPeriod", "345600"),
];

const QUEUE_TAGS: &[(&str, &str)] = &[("automation:component-id", "log-ingestion")];

const PIPELINE_MIN_UNITS: i32 = 1;
const PIPELINE_MAX_UNITS: i32 = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestionConfig {
    pub region: String,
    pub search_endpoint: String,
    pub pipeline_role_arn: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ObjectCreatedOutcome {
    pub index_name: String,
    pub queue_url: String,
    pub message_id: String,
    pub pipeline_created: bool,
}

pub fn handle_object_created(
    event: &ObjectCreatedEvent,
    config: &IngestionConfig,
    queues: &impl QueueService,
    log_groups: &impl LogGroupService,
    pipelines: &impl PipelineService,
    search: &impl SearchAdmin,
) -> Result<ObjectCreatedOutcome, ServiceError> {
    let index_name = event.index_name()?;
    let queue_name = naming::queue_name(&index_name);
    let queue_url = queues.create_queue(&queue_name, QUEUE_ATTRIBUTES, QUEUE_TAGS)?;
    tracing::info!(queue_name = %queue_name, queue_url = %queue_url, "ingest queue ensured");

    let envelope = queue_envelope(event);
    let message_id = queues.send_message(&queue_url, &envelope.to_string())?;
    tracing::info!(message_id = %message_id, "notification forwarded to ingest queue");

    let pipeline_created = ensure_pipeline(
        &index_name,
        &queue_url,
        event.bucket_name(),
        config,
        log_groups,
        pipelines,
        search,
    )?;

    Ok(ObjectCreatedOutcome {
        index_name,
        queue_url,
        message_id,
        pipeline_created,
    })
}

fn ensure_pipeline(
    index_name: &str,
    queue_url: &str,
    bucket_name: &str,
    config: &IngestionConfig,
    log_groups: &impl LogGroupService,
    pipelines: &impl PipelineService,
    search: &impl SearchAdmin,
) -> Result<bool, ServiceError> {
    let pipeline_name = naming::pipeline_name(index_name);
    if pipelines.get_pipeline(&pipeline_name)?.is_some() {
        tracing::info!(pipeline_name = %pipeline_name, "pipeline already exists");
        return Ok(false);
    }

    let log_group_name = naming::pipeline_log_group_name(&pipeline_name);
    match log_groups.create_log_group(&log_group_name) {
        Ok(()) => tracing::info!(log_group_name = %log_group_name, "pipeline log group created"),
        Err(error) if error.is_already_exists() => {
            tracing::debug!(log_group_name = %log_group_name, "pipeline log group already exists");
        }
        Err(error) => return Err(error),
    }

    let index_settings = default_index_settings();
    let body = generate_pipeline_body(&PipelineSpecInputs {
        search_endpoint: &config.search_endpoint,
        index_name,
        region: &config.region,
        pipeline_role_arn: &config.pipeline_role_arn,
        queue_url,
        dlq_bucket_name: bucket_name,
        pipeline_name: &pipeline_name,
        index_settings: &index_settings,
    });

    match pipelines.create_pipeline(&CreatePipeline {
        name: &pipeline_name,
        body: &body,
        min_units: PIPELINE_MIN_UNITS,
        max_units: PIPELINE_MAX_UNITS,
        log_group_name: &log_group_name,
    }) {
        Ok(()) => {
            tracing::info!(pipeline_name = %pipeline_name, "pipeline created");
        }
        Err(error) if error.is_already_exists() => {
            // Lost the create race; one re-describe picks up the winner.
            if pipelines.get_pipeline(&pipeline_name)?.is_some() {
                tracing::info!(pipeline_name = %pipeline_name, "pipeline created concurrently");
                return Ok(false);
            }
            return Err(ServiceError::NotFound(format!(
                "pipeline {pipeline_name} vanished after a concurrent create"
            )));
        }
        Err(error) => return Err(error),
    }

    let pattern_id = naming::index_pattern_id(index_name);
    if let Err(error) = search.create_index_pattern(&pattern_id, &log_index_pattern(index_name)) {
        tracing::warn!(pattern_id = %pattern_id, error = %error, "failed to create index pattern");
    } else {
        tracing::info!(pattern_id = %pattern_id, "index pattern created");
    }

    Ok(true)
}
