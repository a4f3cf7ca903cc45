use std::collections::BTreeMap;

use aws_sdk_cloudwatchlogs::types::Distribution;

use crate::error::ServiceError;

pub trait LogGroupService {
    /// `AlreadyExists` is surfaced distinctly so callers can treat a repeat
    /// create as a no-op.
    fn create_log_group(&self, name: &str) -> Result<(), ServiceError>;

    fn create_log_stream(&self, group_name: &str, stream_name: &str) -> Result<(), ServiceError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionFilter {
    pub name: String,
    pub destination_arn: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutSubscriptionFilter<'a> {
    pub log_group_name: &'a str,
    pub filter_name: &'a str,
    pub destination_arn: &'a str,
    pub role_arn: &'a str,
}

pub trait SubscriptionService {
    fn get_subscription_filter(
        &self,
        log_group_name: &str,
        filter_name: &str,
    ) -> Result<Option<SubscriptionFilter>, ServiceError>;

    /// Creates or updates in place; the fixed filter name guarantees one
    /// binding per log group.
    fn put_subscription_filter(
        &self,
        request: &PutSubscriptionFilter<'_>,
    ) -> Result<(), ServiceError>;

    fn delete_subscription_filter(
        &self,
        log_group_name: &str,
        filter_name: &str,
    ) -> Result<(), ServiceError>;
}

pub trait TagService {
    fn list_tags(&self, resource_arn: &str) -> Result<BTreeMap<String, String>, ServiceError>;
}

pub struct CloudWatchLogs {
    client: aws_sdk_cloudwatchlogs::Client,
}

impl CloudWatchLogs {
    pub fn new(client: aws_sdk_cloudwatchlogs::Client) -> Self {
        Self { client }
    }
}

impl LogGroupService for CloudWatchLogs {
    fn create_log_group(&self, name: &str) -> Result<(), ServiceError> {
        let client = self.client.clone();
        let group_name = name.to_string();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                match client
                    .create_log_group()
                    .log_group_name(&group_name)
                    .send()
                    .await
                {
                    Ok(_) => Ok(()),
                    Err(error) => {
                        let error = error.into_service_error();
                        if error.is_resource_already_exists_exception() {
                            Err(ServiceError::AlreadyExists(format!(
                                "log group {group_name} already exists"
                            )))
                        } else {
                            Err(ServiceError::Service(format!(
                                "failed to create log group {group_name}: {error}"
                            )))
                        }
                    }
                }
            })
        })
    }

    fn create_log_stream(&self, group_name: &str, stream_name: &str) -> Result<(), ServiceError> {
        let client = self.client.clone();
        let group_name = group_name.to_string();
        let stream_name = stream_name.to_string();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                match client
                    .create_log_stream()
                    .log_group_name(&group_name)
                    .log_stream_name(&stream_name)
                    .send()
                    .await
                {
                    Ok(_) => Ok(()),
                    Err(error) => {
                        let error = error.into_service_error();
                        if error.is_resource_already_exists_exception() {
                            Err(ServiceError::AlreadyExists(format!(
                                "log stream {stream_name} already exists in {group_name}"
                            )))
                        } else {
                            Err(ServiceError::Service(format!(
                                "failed to create log stream {stream_name} in {group_name}: {error}"
                            )))
                        }
                    }
                }
            })
        })
    }
}

impl SubscriptionService for CloudWatchLogs {
    fn get_subscription_filter(
        &self,
        log_group_name: &str,
        filter_name: &str,
    ) -> Result<Option<SubscriptionFilter>, ServiceError> {
        let client = self.client.clone();
        let log_group_name = log_group_name.to_string();
        let filter_name = filter_name.to_string();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                let response = client
                    .describe_subscription_filters()
                    .log_group_name(&log_group_name)
                    .filter_name_prefix(&filter_name)
                    .send()
                    .await
                    .map_err(|error| {
                        ServiceError::Service(format!(
                            "failed to describe subscription filters on {log_group_name}: {}",
                            error.into_service_error()
                        ))
                    })?;

                Ok(response
                    .subscription_filters()
                    .iter()
                    .find(|filter| filter.filter_name() == Some(filter_name.as_str()))
                    .map(|filter| SubscriptionFilter {
                        name: filter.filter_name().unwrap_or_default().to_string(),
                        destination_arn: filter.destination_arn().unwrap_or_default().to_string(),
                    }))
            })
        })
    }

    fn put_subscription_filter(
        &self,
        request: &PutSubscriptionFilter<'_>,
    ) -> Result<(), ServiceError> {
        let client = self.client.clone();
        let log_group_name = request.log_group_name.to_string();
        let filter_name = request.filter_name.to_string();
        let destination_arn = request.destination_arn.to_string();
        let role_arn = request.role_arn.to_string();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                client
                    .put_subscription_filter()
                    .log_group_name(&log_group_name)
                    .filter_name(&filter_name)
                    .filter_pattern("")
                    .destination_arn(destination_arn)
                    .role_arn(role_arn)
                    .distribution(Distribution::ByLogStream)
                    .send()
                    .await
                    .map(|_| ())
                    .map_err(|error| {
                        ServiceError::Service(format!(
                            "failed to put subscription filter on {log_group_name}: {}",
                            error.into_service_error()
                        ))
                    })
            })
        })
    }

    fn delete_subscription_filter(
        &self,
        log_group_name: &str,
        filter_name: &str,
    ) -> Result<(), ServiceError> {
        let client = self.client.clone();
        let log_group_name = log_group_name.to_string();
        let filter_name = filter_name.to_string();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                match client
                    .delete_subscription_filter()
                    .log_group_name(&log_group_name)
                    .filter_name(&filter_name)
                    .send()
                    .await
                {
                    Ok(_) => Ok(()),
                    Err(error) => {
                        let error = error.into_service_error();
                        if error.is_resource_not_found_exception() {
                            Err(ServiceError::NotFound(format!(
                                "no subscription filter {filter_name} on {log_group_name}"
                            )))
                        } else {
                            Err(ServiceError::Service(format!(
                                "failed to delete subscription filter on {log_group_name}: {error}"
                            )))
                        }
                    }
                }
            })
        })
    }
}

impl TagService for CloudWatchLogs {
    fn list_tags(&self, resource_arn: &str) -> Result<BTreeMap<String, String>, ServiceError> {
        let client = self.client.clone();
        let resource_arn = resource_arn.to_string();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                let response = client
                    .list_tags_for_resource()
                    .resource_arn(&resource_arn)
                    .send()
                    .await
                    .map_err(|error| {
                        ServiceError::Service(format!(
                            "failed to list tags on {resource_arn}: {}",
                            error.into_service_error()
                        ))
                    })?;

                Ok(response
                    .tags()
                    .map(|tags| {
                        tags.iter()
                            .map(|(key, value)| (key.clone(), value.clone()))
                            .collect()
                    })
                    .unwrap_or_default())
            })
        })
    }
}
