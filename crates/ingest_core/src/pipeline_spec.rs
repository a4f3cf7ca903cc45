//! Declarative pipeline-body generation.
//!
//! Pure functions with no I/O: the same inputs always produce byte-identical
//! output, which keeps pipeline creation idempotent and testable offline.

use serde_json::json;

use crate::naming::dlq_key_prefix;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSpecInputs<'a> {
    pub search_endpoint: &'a str,
    pub index_name: &'a str,
    pub region: &'a str,
    pub pipeline_role_arn: &'a str,
    pub queue_url: &'a str,
    pub dlq_bucket_name: &'a str,
    pub pipeline_name: &'a str,
    pub index_settings: &'a str,
}

/// Fixed settings/mappings template applied to every generated index.
pub fn default_index_settings() -> String {
    json!({
        "settings": {
            "number_of_shards": 2,
            "number_of_replicas": 0,
            "refresh_interval": "30s",
            "index.queries.cache.enabled": true,
            "index.requests.cache.enable": true,
        },
        "mappings": {
            "properties": {
                "time": {
                    "type": "date",
                    "format": "epoch_millis",
                },
            },
        },
    })
    .to_string()
}

/// Builds the pipeline body: a queue-backed object-store source with gzip
/// decoding and duplicate-delivery protection, JSON parsing plus timestamp
/// enrichment, and a daily-rolling search index sink with a dead-letter
/// object path.
pub fn generate_pipeline_body(inputs: &PipelineSpecInputs<'_>) -> String {
    let PipelineSpecInputs {
        search_endpoint,
        index_name,
        region,
        pipeline_role_arn,
        queue_url,
        dlq_bucket_name,
        pipeline_name,
        index_settings,
    } = *inputs;
    let dlq_prefix = dlq_key_prefix(pipeline_name);

    format!(
        r#"
version: "2"
log-pipeline:
  source:
    s3:
      acknowledgments: false
      notification_type: "sqs"
      compression: "gzip"
      records_to_accumulate: 1000
      codec:
        newline:
      sqs:
        queue_url: "{queue_url}"
        maximum_messages: 10
        visibility_timeout: "60s"
        visibility_duplication_protection: true
      aws:
        region: "{region}"
        sts_role_arn: "{pipeline_role_arn}"
  processor:
    - parse_json:
    - date:
        from_time_received: true
        destination: "ingest_timestamp"
    - delete_entries:
        with_keys: ["s3"]
  sink:
    - opensearch:
        hosts: ["{search_endpoint}"]
        index: "logs-{index_name}-%{{yyyy.MM.dd}}"
        index_type: "custom"
        bulk_size: 15
        template_content: |
          {index_settings}
        aws:
          serverless: false
          region: "{region}"
          sts_role_arn: "{pipeline_role_arn}"
        dlq:
          s3:
            bucket: "{dlq_bucket_name}"
            key_path_prefix: "{dlq_prefix}"
            region: "{region}"
            sts_role_arn: "{pipeline_role_arn}"
"#
    )
}
