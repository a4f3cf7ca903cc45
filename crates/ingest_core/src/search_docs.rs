//! Versioned documents managed in the search engine's lifecycle and
//! security subsystems.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IsmPolicy {
    pub description: String,
    pub default_state: String,
    pub states: Vec<IsmState>,
    pub ism_template: Vec<IsmTemplate>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IsmState {
    pub name: String,
    pub actions: Vec<Value>,
    pub transitions: Vec<IsmTransition>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IsmTransition {
    pub state_name: String,
    pub conditions: TransitionConditions,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransitionConditions {
    pub min_index_age: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IsmTemplate {
    pub index_patterns: Vec<String>,
    pub priority: u32,
}

/// Desired lifecycle: indices matching `index_patterns` move from `hot` to
/// `delete` once older than `days`.
pub fn retention_policy(days: u32, index_patterns: &[&str]) -> IsmPolicy {
    IsmPolicy {
        description: "Manage index lifecycle".to_string(),
        default_state: "hot".to_string(),
        states: vec![
            IsmState {
                name: "hot".to_string(),
                actions: vec![],
                transitions: vec![IsmTransition {
                    state_name: "delete".to_string(),
                    conditions: TransitionConditions {
                        min_index_age: format!("{days}d"),
                    },
                }],
            },
            IsmState {
                name: "delete".to_string(),
                actions: vec![serde_json::json!({"delete": {}})],
                transitions: vec![],
            },
        ],
        ism_template: vec![IsmTemplate {
            index_patterns: index_patterns.iter().map(|p| p.to_string()).collect(),
            priority: 100,
        }],
    }
}

/// A policy document paired with the optimistic-concurrency token it was
/// fetched under. A write conditioned on a stale token fails and is retried
/// only by re-invocation, never in-process.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PolicyVersion {
    pub policy: IsmPolicy,
    #[serde(rename = "_seq_no")]
    pub seq_no: u64,
    #[serde(rename = "_primary_term")]
    pub primary_term: u64,
}

/// Backend identities associated with a named access role.
///
/// The backend has no partial update, so writes always send the complete
/// triple.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RoleMapping {
    #[serde(default)]
    pub hosts: Vec<String>,
    #[serde(default)]
    pub users: Vec<String>,
    #[serde(default)]
    pub backend_roles: Vec<String>,
}

impl RoleMapping {
    /// Appends a backend role with set-union semantics. Returns false when
    /// the role is already mapped so callers can skip the write.
    pub fn add_backend_role(&mut self, backend_role: &str) -> bool {
        if self.backend_roles.iter().any(|role| role == backend_role) {
            return false;
        }
        self.backend_roles.push(backend_role.to_string());
        true
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoleDefinition {
    pub cluster_permissions: Vec<String>,
    pub index_permissions: Vec<IndexPermission>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexPermission {
    pub index_patterns: Vec<String>,
    pub allowed_actions: Vec<String>,
}

/// Role granted to environment-supplied administrator groups.
pub fn admin_role_definition() -> RoleDefinition {
    RoleDefinition {
        cluster_permissions: vec!["cluster_all".to_string()],
        index_permissions: vec![IndexPermission {
            index_patterns: vec!["*".to_string()],
            allowed_actions: vec!["indices_all".to_string()],
        }],
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexPatternConfig {
    pub title: String,
    #[serde(rename = "timeFieldName")]
    pub time_field_name: String,
    pub fields: String,
}

/// Saved-object configuration for the daily-rolling log indices of one
/// index identity.
pub fn log_index_pattern(index_name: &str) -> IndexPatternConfig {
    IndexPatternConfig {
        title: format!("logs-{index_name}*"),
        time_field_name: "ingest_timestamp".to_string(),
        fields: serde_json::json!([
            {
                "name": "@ingest_timestamp",
                "type": "date",
                "searchable": true,
                "aggregatable": true,
            }
        ])
        .to_string(),
    }
}
