use ingest_lambda::adapters::search_admin::HttpSearchAdmin;
use ingest_lambda::handlers::search_config::{
    handle_search_config, SearchConfig, SearchConfigOutcome,
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

fn admin_groups() -> Vec<String> {
    std::env::var("SEARCH_ADMIN_GROUPS")
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|group| !group.is_empty())
        .map(str::to_string)
        .collect()
}

async fn handle_request(_event: LambdaEvent<Value>) -> Result<SearchConfigOutcome, Error> {
    let endpoint = required_env("SEARCH_ENDPOINT")?;
    let config = SearchConfig {
        access_role_arn: required_env("SEARCH_ACCESS_ROLE_ARN")?,
        admin_groups: admin_groups(),
    };

    let search = HttpSearchAdmin::new(endpoint.as_str(), search_credentials());
    handle_search_config(&config, &search).map_err(|error| Error::from(error.to_string()))
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    ingest_lambda::telemetry::init_tracing();
    lambda_runtime::run(service_fn(handle_request)).await
}
