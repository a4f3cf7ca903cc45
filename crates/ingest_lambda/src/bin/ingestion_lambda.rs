use ingest_core::contract::Notification;
use ingest_lambda::adapters::log_group::CloudWatchLogs;
use ingest_lambda::adapters::pipeline::OsisPipelineService;
use ingest_lambda::adapters::queue::SqsQueueService;
use ingest_lambda::adapters::search_admin::HttpSearchAdmin;
use ingest_lambda::handlers::object_created::{
    handle_object_created, IngestionConfig, ObjectCreatedOutcome,
};
use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::Value;

fn required_env(name: &str) -> Result<String, Error> {
    std::env::var(name).map_err(|_| Error::from(format!("{name} must be configured")))
}

fn search_credentials() -> Option<(String, String)> {
    match (
        std::env::var("SEARCH_USERNAME"),
        std::env::var("SEARCH_PASSWORD"),
    ) {
        (Ok(username), Ok(password)) => Some((username, password)),
        _ => None,
    }
}

async fn handle_request(event: LambdaEvent<Value>) -> Result<ObjectCreatedOutcome, Error> {
    let notification = Notification::from_value(event.payload)
        .map_err(|error| Error::from(error.to_string()))?;
    let Notification::ObjectCreated(object_event) = notification else {
        return Err(Error::from("expected an object-created notification"));
    };

    let config = IngestionConfig {
        region: required_env("AWS_REGION")?,
        search_endpoint: required_env("SEARCH_ENDPOINT")?,
        pipeline_role_arn: required_env("PIPELINE_ROLE_ARN")?,
    };

    let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let queues = SqsQueueService::new(aws_sdk_sqs::Client::new(&aws_config));
    let log_groups = CloudWatchLogs::new(aws_sdk_cloudwatchlogs::Client::new(&aws_config));
    let pipelines = OsisPipelineService::new(aws_sdk_osis::Client::new(&aws_config));
    let search = HttpSearchAdmin::new(config.search_endpoint.as_str(), search_credentials());

    handle_object_created(
        &object_event,
        &config,
        &queues,
        &log_groups,
        &pipelines,
        &search,
    )
    .map_err(|error| Error::from(error.to_string()))
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    ingest_lambda::telemetry::init_tracing();
    lambda_runtime::run(service_fn(handle_request)).await
}
