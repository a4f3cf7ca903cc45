use aws_sdk_osis::types::{BufferOptions, CloudWatchLogDestination, LogPublishingOptions};

use crate::error::ServiceError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSummary {
    pub name: String,
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatePipeline<'a> {
    pub name: &'a str,
    pub body: &'a str,
    pub min_units: i32,
    pub max_units: i32,
    pub log_group_name: &'a str,
}

pub trait PipelineService {
    fn get_pipeline(&self, name: &str) -> Result<Option<PipelineSummary>, ServiceError>;

    /// Pipeline logging stays disabled and the persistent buffer off; the
    /// log destination is still declared so it can be switched on without a
    /// pipeline rebuild.
    fn create_pipeline(&self, request: &CreatePipeline<'_>) -> Result<(), ServiceError>;
}

pub struct OsisPipelineService {
    client: aws_sdk_osis::Client,
}

impl OsisPipelineService {
    pub fn new(client: aws_sdk_osis::Client) -> Self {
        Self { client }
    }
}

impl PipelineService for OsisPipelineService {
    fn get_pipeline(&self, name: &str) -> Result<Option<PipelineSummary>, ServiceError> {
        let client = self.client.clone();
        let pipeline_name = name.to_string();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                match client
                    .get_pipeline()
                    .pipeline_name(&pipeline_name)
                    .send()
                    .await
                {
                    Ok(response) => Ok(response.pipeline().map(|pipeline| PipelineSummary {
                        name: pipeline
                            .pipeline_name()
                            .unwrap_or(&pipeline_name)
                            .to_string(),
                        status: pipeline.status().map(|status| status.as_str().to_string()),
                    })),
                    Err(error) => {
                        let error = error.into_service_error();
                        if error.is_resource_not_found_exception() {
                            Ok(None)
                        } else {
                            Err(ServiceError::Service(format!(
                                "failed to describe pipeline {pipeline_name}: {error}"
                            )))
                        }
                    }
                }
            })
        })
    }

    fn create_pipeline(&self, request: &CreatePipeline<'_>) -> Result<(), ServiceError> {
        let client = self.client.clone();
        let pipeline_name = request.name.to_string();
        let body = request.body.to_string();
        let log_group_name = request.log_group_name.to_string();
        let min_units = request.min_units;
        let max_units = request.max_units;

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                let log_destination = CloudWatchLogDestination::builder()
                    .log_group(&log_group_name)
                    .build()
                    .map_err(|error| {
                        ServiceError::Validation(format!("invalid log destination: {error}"))
                    })?;
                let buffer_options = BufferOptions::builder()
                    .persistent_buffer_enabled(false)
                    .build()
                    .map_err(|error| {
                        ServiceError::Validation(format!("invalid buffer options: {error}"))
                    })?;

                match client
                    .create_pipeline()
                    .pipeline_name(&pipeline_name)
                    .min_units(min_units)
                    .max_units(max_units)
                    .pipeline_configuration_body(body)
                    .log_publishing_options(
                        LogPublishingOptions::builder()
                            .is_logging_enabled(false)
                            .cloud_watch_log_destination(log_destination)
                            .build(),
                    )
                    .buffer_options(buffer_options)
                    .send()
                    .await
                {
                    Ok(_) => Ok(()),
                    Err(error) => {
                        let error = error.into_service_error();
                        if error.is_resource_already_exists_exception() {
                            Err(ServiceError::AlreadyExists(format!(
                                "pipeline {pipeline_name} already exists"
                            )))
                        } else if error.is_validation_exception() {
                            Err(ServiceError::Validation(format!(
                                "pipeline {pipeline_name} rejected: {error}"
                            )))
                        } else {
                            Err(ServiceError::Service(format!(
                                "failed to create pipeline {pipeline_name}: {error}"
                            )))
                        }
                    }
                }
            })
        })
    }
}
