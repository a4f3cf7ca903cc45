use std::collections::HashMap;

use ingest_core::search_docs::{
    IndexPatternConfig, IsmPolicy, PolicyVersion, RoleDefinition, RoleMapping,
};
use reqwest::StatusCode;
use serde_json::json;

use crate::error::ServiceError;

pub trait SearchAdmin {
    fn get_policy(&self, policy_id: &str) -> Result<Option<PolicyVersion>, ServiceError>;

    /// Conditional write guarded by the fetched `(seq_no, primary_term)`
    /// pair; a stale pair surfaces as `VersionConflict`.
    fn put_policy(
        &self,
        policy_id: &str,
        policy: &IsmPolicy,
        seq_no: u64,
        primary_term: u64,
    ) -> Result<(), ServiceError>;

    fn get_role_mapping(&self, role_name: &str) -> Result<Option<RoleMapping>, ServiceError>;

    fn put_role_mapping(&self, role_name: &str, mapping: &RoleMapping)
        -> Result<(), ServiceError>;

    fn put_role(&self, role_name: &str, definition: &RoleDefinition) -> Result<(), ServiceError>;

    fn create_index_pattern(
        &self,
        pattern_id: &str,
        config: &IndexPatternConfig,
    ) -> Result<(), ServiceError>;
}

/// REST client for the search engine's lifecycle, security, and saved-object
/// APIs. Credential acquisition is out of scope; the client optionally
/// carries basic-auth credentials and otherwise relies on the deployment's
/// network-level access.
pub struct HttpSearchAdmin {
    endpoint: String,
    credentials: Option<(String, String)>,
    client: reqwest::Client,
}

impl HttpSearchAdmin {
    pub fn new(endpoint: impl Into<String>, credentials: Option<(String, String)>) -> Self {
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            credentials,
            client: reqwest::Client::new(),
        }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let mut request = self
            .client
            .request(method, format!("{}{path}", self.endpoint));
        if let Some((username, password)) = &self.credentials {
            request = request.basic_auth(username, Some(password));
        }
        request
    }

    fn execute(&self, request: reqwest::RequestBuilder) -> Result<ResponseParts, ServiceError> {
        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                let response = request
                    .send()
                    .await
                    .map_err(|error| ServiceError::Service(format!("search request failed: {error}")))?;
                let status = response.status();
                let body = response.text().await.map_err(|error| {
                    ServiceError::Service(format!("search response unreadable: {error}"))
                })?;
                Ok(ResponseParts { status, body })
            })
        })
    }
}

struct ResponseParts {
    status: StatusCode,
    body: String,
}

impl ResponseParts {
    fn error(&self, context: &str) -> ServiceError {
        ServiceError::Service(format!(
            "{context}: status {} body {}",
            self.status,
            self.body.chars().take(256).collect::<String>()
        ))
    }
}

impl SearchAdmin for HttpSearchAdmin {
    fn get_policy(&self, policy_id: &str) -> Result<Option<PolicyVersion>, ServiceError> {
        let path = format!("/_plugins/_ism/policies/{policy_id}");
        let response = self.execute(self.request(reqwest::Method::GET, &path))?;
        match response.status {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => serde_json::from_str(&response.body)
                .map(Some)
                .map_err(|error| {
                    ServiceError::Service(format!("policy {policy_id} unparseable: {error}"))
                }),
            _ => Err(response.error(&format!("failed to fetch policy {policy_id}"))),
        }
    }

    fn put_policy(
        &self,
        policy_id: &str,
        policy: &IsmPolicy,
        seq_no: u64,
        primary_term: u64,
    ) -> Result<(), ServiceError> {
        let path = format!(
            "/_plugins/_ism/policies/{policy_id}?if_seq_no={seq_no}&if_primary_term={primary_term}"
        );
        let request = self
            .request(reqwest::Method::PUT, &path)
            .json(&json!({"policy": policy}));
        let response = self.execute(request)?;
        match response.status {
            StatusCode::CONFLICT => Err(ServiceError::VersionConflict(format!(
                "policy {policy_id} changed since seq_no {seq_no} / primary_term {primary_term}"
            ))),
            status if status.is_success() => Ok(()),
            _ => Err(response.error(&format!("failed to update policy {policy_id}"))),
        }
    }

    fn get_role_mapping(&self, role_name: &str) -> Result<Option<RoleMapping>, ServiceError> {
        let path = format!("/_plugins/_security/api/rolesmapping/{role_name}");
        let response = self.execute(self.request(reqwest::Method::GET, &path))?;
        match response.status {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let mut mappings: HashMap<String, RoleMapping> =
                    serde_json::from_str(&response.body).map_err(|error| {
                        ServiceError::Service(format!(
                            "role mapping {role_name} unparseable: {error}"
                        ))
                    })?;
                Ok(mappings.remove(role_name))
            }
            _ => Err(response.error(&format!("failed to fetch role mapping {role_name}"))),
        }
    }

    fn put_role_mapping(
        &self,
        role_name: &str,
        mapping: &RoleMapping,
    ) -> Result<(), ServiceError> {
        let path = format!("/_plugins/_security/api/rolesmapping/{role_name}");
        let request = self.request(reqwest::Method::PUT, &path).json(mapping);
        let response = self.execute(request)?;
        if response.status.is_success() {
            Ok(())
        } else {
            Err(response.error(&format!("failed to update role mapping {role_name}")))
        }
    }

    fn put_role(&self, role_name: &str, definition: &RoleDefinition) -> Result<(), ServiceError> {
        let path = format!("/_plugins/_security/api/roles/{role_name}");
        let request = self.request(reqwest::Method::PUT, &path).json(definition);
        let response = self.execute(request)?;
        if response.status.is_success() {
            Ok(())
        } else {
            Err(response.error(&format!("failed to update role {role_name}")))
        }
    }

    fn create_index_pattern(
        &self,
        pattern_id: &str,
        config: &IndexPatternConfig,
    ) -> Result<(), ServiceError> {
        let path = format!("/_dashboards/api/saved_objects/index-pattern/{pattern_id}");
        let request = self
            .request(reqwest::Method::POST, &path)
            .header("osd-xsrf", "true")
            .json(&json!({"attributes": config}));
        let response = self.execute(request)?;
        match response.status {
            StatusCode::CONFLICT => Err(ServiceError::AlreadyExists(format!(
                "index pattern {pattern_id} already exists"
            ))),
            status if status.is_success() => Ok(()),
            _ => Err(response.error(&format!("failed to create index pattern {pattern_id}"))),
        }
    }
}
