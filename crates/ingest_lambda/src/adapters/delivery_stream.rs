use aws_sdk_firehose::types::{
    BufferingHints, CloudWatchLoggingOptions, CompressionFormat, DeliveryStreamType,
    ExtendedS3DestinationConfiguration, ProcessingConfiguration, Processor, ProcessorParameter,
    ProcessorParameterName, ProcessorType, S3BackupMode,
};

use crate::error::ServiceError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryStreamDetails {
    pub arn: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateDeliveryStream<'a> {
    pub name: &'a str,
    pub bucket_name: &'a str,
    pub prefix: &'a str,
    pub role_arn: &'a str,
    pub log_group_name: &'a str,
}

pub trait DeliveryStreamService {
    fn describe_delivery_stream(
        &self,
        name: &str,
    ) -> Result<Option<DeliveryStreamDetails>, ServiceError>;

    fn create_delivery_stream(
        &self,
        request: &CreateDeliveryStream<'_>,
    ) -> Result<String, ServiceError>;
}

pub struct FirehoseDeliveryStreams {
    client: aws_sdk_firehose::Client,
}

impl FirehoseDeliveryStreams {
    pub fn new(client: aws_sdk_firehose::Client) -> Self {
        Self { client }
    }
}

impl DeliveryStreamService for FirehoseDeliveryStreams {
    fn describe_delivery_stream(
        &self,
        name: &str,
    ) -> Result<Option<DeliveryStreamDetails>, ServiceError> {
        let client = self.client.clone();
        let stream_name = name.to_string();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                match client
                    .describe_delivery_stream()
                    .delivery_stream_name(&stream_name)
                    .send()
                    .await
                {
                    Ok(response) => {
                        let Some(description) = response.delivery_stream_description() else {
                            return Ok(None);
                        };
                        Ok(Some(DeliveryStreamDetails {
                            arn: description.delivery_stream_arn().to_string(),
                            status: description.delivery_stream_status().as_str().to_string(),
                        }))
                    }
                    Err(error) => {
                        let error = error.into_service_error();
                        if error.is_resource_not_found_exception() {
                            Ok(None)
                        } else {
                            Err(ServiceError::Service(format!(
                                "failed to describe delivery stream {stream_name}: {error}"
                            )))
                        }
                    }
                }
            })
        })
    }

    fn create_delivery_stream(
        &self,
        request: &CreateDeliveryStream<'_>,
    ) -> Result<String, ServiceError> {
        let client = self.client.clone();
        let stream_name = request.name.to_string();
        let bucket_arn = format!("arn:aws:s3:::{}", request.bucket_name);
        let prefix = request.prefix.to_string();
        let role_arn = request.role_arn.to_string();
        let log_group_name = request.log_group_name.to_string();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                let invalid =
                    |error: &dyn std::fmt::Display| ServiceError::Validation(format!(
                        "invalid delivery stream destination: {error}"
                    ));

                let decompression = Processor::builder()
                    .r#type(ProcessorType::Decompression)
                    .parameters(
                        ProcessorParameter::builder()
                            .parameter_name(ProcessorParameterName::LambdaNumberOfRetries)
                            .parameter_value("3")
                            .build()
                            .map_err(|error| invalid(&error))?,
                    )
                    .build()
                    .map_err(|error| invalid(&error))?;
                let message_extraction = Processor::builder()
                    .r#type(ProcessorType::CloudWatchLogProcessing)
                    .parameters(
                        ProcessorParameter::builder()
                            .parameter_name(ProcessorParameterName::DataMessageExtraction)
                            .parameter_value("True")
                            .build()
                            .map_err(|error| invalid(&error))?,
                    )
                    .build()
                    .map_err(|error| invalid(&error))?;

                let destination = ExtendedS3DestinationConfiguration::builder()
                    .role_arn(&role_arn)
                    .bucket_arn(&bucket_arn)
                    .prefix(&prefix)
                    .buffering_hints(
                        BufferingHints::builder()
                            .size_in_mbs(128)
                            .interval_in_seconds(60)
                            .build(),
                    )
                    .compression_format(CompressionFormat::Gzip)
                    .cloud_watch_logging_options(
                        CloudWatchLoggingOptions::builder()
                            .enabled(true)
                            .log_group_name(&log_group_name)
                            .log_stream_name(&stream_name)
                            .build(),
                    )
                    .processing_configuration(
                        ProcessingConfiguration::builder()
                            .enabled(true)
                            .processors(decompression)
                            .processors(message_extraction)
                            .build(),
                    )
                    .s3_backup_mode(S3BackupMode::Disabled)
                    .build()
                    .map_err(|error| invalid(&error))?;

                match client
                    .create_delivery_stream()
                    .delivery_stream_name(&stream_name)
                    .delivery_stream_type(DeliveryStreamType::DirectPut)
                    .extended_s3_destination_configuration(destination)
                    .send()
                    .await
                {
                    Ok(response) => response
                        .delivery_stream_arn()
                        .map(str::to_string)
                        .ok_or_else(|| {
                            ServiceError::Service(format!(
                                "delivery stream {stream_name} created without an ARN"
                            ))
                        }),
                    Err(error) => {
                        let error = error.into_service_error();
                        if error.is_resource_in_use_exception() {
                            Err(ServiceError::AlreadyExists(format!(
                                "delivery stream {stream_name} already exists"
                            )))
                        } else if error.is_invalid_argument_exception() {
                            Err(ServiceError::Validation(format!(
                                "delivery stream {stream_name} rejected: {error}"
                            )))
                        } else {
                            Err(ServiceError::Service(format!(
                                "failed to create delivery stream {stream_name}: {error}"
                            )))
                        }
                    }
                }
            })
        })
    }
}
