use ingest_core::contract::Notification;
use ingest_lambda::adapters::delivery_stream::FirehoseDeliveryStreams;
use ingest_lambda::adapters::log_group::CloudWatchLogs;
use ingest_lambda::handlers::log_tag::{handle_notification, AutologConfig, TagOutcome};
use ingest_lambda::poller::PollSettings;
use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::Value;

fn required_env(name: &str) -> Result<String, Error> {
    std::env::var(name).map_err(|_| Error::from(format!("{name} must be configured")))
}

async fn resolve_account_id(aws_config: &aws_config::SdkConfig) -> Result<String, Error> {
    let response = aws_sdk_sts::Client::new(aws_config)
        .get_caller_identity()
        .send()
        .await
        .map_err(|error| Error::from(format!("failed to resolve account id: {error}")))?;
    response
        .account()
        .map(str::to_string)
        .ok_or_else(|| Error::from("caller identity carries no account id"))
}

async fn handle_request(event: LambdaEvent<Value>) -> Result<Vec<TagOutcome>, Error> {
    let notification = Notification::from_value(event.payload)
        .map_err(|error| Error::from(error.to_string()))?;

    let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let config = AutologConfig {
        region: required_env("AWS_REGION")?,
        account_id: resolve_account_id(&aws_config).await?,
        delivery_stream_role_arn: required_env("DELIVERY_STREAM_ROLE_ARN")?,
        subscription_filter_role_arn: required_env("SUBSCRIPTION_FILTER_ROLE_ARN")?,
        delivery_stream_log_group: required_env("DELIVERY_STREAM_LOG_GROUP_NAME")?,
        poll: PollSettings::default(),
    };

    let logs_client = aws_sdk_cloudwatchlogs::Client::new(&aws_config);
    let cloudwatch = CloudWatchLogs::new(logs_client);
    let streams = FirehoseDeliveryStreams::new(aws_sdk_firehose::Client::new(&aws_config));

    Ok(handle_notification(
        &notification,
        &config,
        &cloudwatch,
        &cloudwatch,
        &streams,
        &cloudwatch,
        &mut std::thread::sleep,
    ))
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    ingest_lambda::telemetry::init_tracing();
    lambda_runtime::run(service_fn(handle_request)).await
}
