use aws_sdk_sqs::types::QueueAttributeName;

use crate::error::ServiceError;

pub trait QueueService {
    /// Creates the queue, or returns the existing queue's URL when the name
    /// is already taken with identical attributes.
    fn create_queue(
        &self,
        name: &str,
        attributes: &[(&str, &str)],
        tags: &[(&str, &str)],
    ) -> Result<String, ServiceError>;

    fn send_message(&self, queue_url: &str, body: &str) -> Result<String, ServiceError>;
}

pub struct SqsQueueService {
    client: aws_sdk_sqs::Client,
}

impl SqsQueueService {
    pub fn new(client: aws_sdk_sqs::Client) -> Self {
        Self { client }
    }
}

impl QueueService for SqsQueueService {
    fn create_queue(
        &self,
        name: &str,
        attributes: &[(&str, &str)],
        tags: &[(&str, &str)],
    ) -> Result<String, ServiceError> {
        let client = self.client.clone();
        let queue_name = name.to_string();
        let attributes: Vec<(QueueAttributeName, String)> = attributes
            .iter()
            .map(|(key, value)| (QueueAttributeName::from(*key), value.to_string()))
            .collect();
        let tags: Vec<(String, String)> = tags
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                let mut request = client.create_queue().queue_name(&queue_name);
                for (key, value) in attributes {
                    request = request.attributes(key, value);
                }
                for (key, value) in tags {
                    request = request.tags(key, value);
                }
                match request.send().await {
                    Ok(response) => response.queue_url().map(str::to_string).ok_or_else(|| {
                        ServiceError::Service(format!("queue {queue_name} created without a URL"))
                    }),
                    Err(error) => {
                        let error = error.into_service_error();
                        if error.is_queue_name_exists() {
                            Err(ServiceError::AlreadyExists(format!(
                                "queue {queue_name} exists with different attributes: {error}"
                            )))
                        } else {
                            Err(ServiceError::Service(format!(
                                "failed to create queue {queue_name}: {error}"
                            )))
                        }
                    }
                }
            })
        })
    }

    fn send_message(&self, queue_url: &str, body: &str) -> Result<String, ServiceError> {
        let client = self.client.clone();
        let queue_url = queue_url.to_string();
        let body = body.to_string();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                let response = client
                    .send_message()
                    .queue_url(&queue_url)
                    .message_body(body)
                    .send()
                    .await
                    .map_err(|error| {
                        ServiceError::Service(format!(
                            "failed to send message to {queue_url}: {}",
                            error.into_service_error()
                        ))
                    })?;
                Ok(response.message_id().unwrap_or_default().to_string())
            })
        })
    }
}
