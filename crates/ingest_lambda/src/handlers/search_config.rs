//! Policy and role-mapping reconciliation against the search engine:
//! optimistic-concurrency writes for the lifecycle policy, set-union
//! appends for role mappings.

use ingest_core::search_docs::{admin_role_definition, retention_policy, RoleMapping};
use serde::Serialize;

use crate::adapters::search_admin::SearchAdmin;
use crate::error::ServiceError;

/// Lifecycle policy applied to the rolling log indices. The policy must be
/// pre-seeded; this handler only updates it.
pub const RETENTION_POLICY_ID: &str = "delete_logs_after_90_days";
pub const RETENTION_DAYS: u32 = 90;
pub const RETENTION_INDEX_PATTERNS: &[&str] = &["logs-*"];

/// Pre-seeded role whose mapping receives the pipeline access role.
pub const ACCESS_ROLE: &str = "all_access";

/// Role created for environment-supplied administrator groups.
pub const ADMIN_GROUP_ROLE: &str = "log_admin_groups";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchConfig {
    pub access_role_arn: String,
    pub admin_groups: Vec<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SearchConfigOutcome {
    pub policy_updated: bool,
    pub access_role_mapped: bool,
    pub admin_groups_added: usize,
}

pub fn handle_search_config(
    config: &SearchConfig,
    search: &impl SearchAdmin,
) -> Result<SearchConfigOutcome, ServiceError> {
    apply_retention_policy(search)?;
    let access_role_mapped = ensure_access_role_mapping(search, &config.access_role_arn)?;
    let admin_groups_added = ensure_group_role(search, &config.admin_groups)?;
    Ok(SearchConfigOutcome {
        policy_updated: true,
        access_role_mapped,
        admin_groups_added,
    })
}

/// Read-modify-write under the fetched `(seq_no, primary_term)` pair. A
/// stale pair surfaces as `VersionConflict` and is retried only by
/// re-invocation, so a true conflicting writer stays visible.
pub fn apply_retention_policy(search: &impl SearchAdmin) -> Result<(), ServiceError> {
    let current = search.get_policy(RETENTION_POLICY_ID)?.ok_or_else(|| {
        ServiceError::NotFound(format!("policy {RETENTION_POLICY_ID} is not seeded"))
    })?;

    let desired = retention_policy(RETENTION_DAYS, RETENTION_INDEX_PATTERNS);
    search.put_policy(
        RETENTION_POLICY_ID,
        &desired,
        current.seq_no,
        current.primary_term,
    )?;
    tracing::info!(policy_id = RETENTION_POLICY_ID, "lifecycle policy updated");
    Ok(())
}

/// Appends the pipeline access role to the fixed role's `backend_roles`.
/// The write sends the complete mapping triple and is skipped entirely when
/// the role is already present.
fn ensure_access_role_mapping(
    search: &impl SearchAdmin,
    access_role_arn: &str,
) -> Result<bool, ServiceError> {
    let mut mapping = search.get_role_mapping(ACCESS_ROLE)?.ok_or_else(|| {
        ServiceError::NotFound(format!("role mapping {ACCESS_ROLE} is not seeded"))
    })?;

    if !mapping.add_backend_role(access_role_arn) {
        tracing::debug!(role = ACCESS_ROLE, "access role already mapped");
        return Ok(false);
    }

    search.put_role_mapping(ACCESS_ROLE, &mapping)?;
    tracing::info!(role = ACCESS_ROLE, backend_role = %access_role_arn, "access role mapped");
    Ok(true)
}

/// Creates or updates the admin-group role, then appends each configured
/// group with the same set-union discipline. A missing mapping here starts
/// from the empty document: the role may have just been created.
fn ensure_group_role(
    search: &impl SearchAdmin,
    admin_groups: &[String],
) -> Result<usize, ServiceError> {
    if admin_groups.is_empty() {
        return Ok(0);
    }

    search.put_role(ADMIN_GROUP_ROLE, &admin_role_definition())?;

    let mut mapping = search
        .get_role_mapping(ADMIN_GROUP_ROLE)?
        .unwrap_or_else(RoleMapping::default);
    let added = admin_groups
        .iter()
        .filter(|group| mapping.add_backend_role(group))
        .count();
    if added > 0 {
        search.put_role_mapping(ADMIN_GROUP_ROLE, &mapping)?;
        tracing::info!(role = ADMIN_GROUP_ROLE, added, "admin groups mapped");
    }
    Ok(added)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use ingest_core::search_docs::{
        IndexPatternConfig, IsmPolicy, PolicyVersion, RoleDefinition,
    };

    use super::*;

    /// Stores documents behind the same optimistic-concurrency contract the
    /// backend enforces: writes must present the live `(seq_no,
    /// primary_term)` pair.
    struct FakeSearch {
        policy: Mutex<Option<PolicyVersion>>,
        mappings: Mutex<Vec<(String, RoleMapping)>>,
        roles: Mutex<Vec<String>>,
        mapping_writes: Mutex<u32>,
    }

    impl FakeSearch {
        fn new() -> Self {
            Self {
                policy: Mutex::new(Some(PolicyVersion {
                    policy: retention_policy(30, &["stale-*"]),
                    seq_no: 7,
                    primary_term: 2,
                })),
                mappings: Mutex::new(vec![(ACCESS_ROLE.to_string(), RoleMapping::default())]),
                roles: Mutex::new(Vec::new()),
                mapping_writes: Mutex::new(0),
            }
        }

        fn without_policy() -> Self {
            let fake = Self::new();
            *fake.policy.lock().expect("poisoned mutex") = None;
            fake
        }

        /// Simulates a concurrent writer landing between fetch and write.
        fn bump_policy_version(&self) {
            let mut policy = self.policy.lock().expect("poisoned mutex");
            if let Some(version) = policy.as_mut() {
                version.seq_no += 1;
            }
        }

        fn mapping(&self, role: &str) -> Option<RoleMapping> {
            self.mappings
                .lock()
                .expect("poisoned mutex")
                .iter()
                .find(|(name, _)| name == role)
                .map(|(_, mapping)| mapping.clone())
        }
    }

    impl SearchAdmin for FakeSearch {
        fn get_policy(&self, _policy_id: &str) -> Result<Option<PolicyVersion>, ServiceError> {
            Ok(self.policy.lock().expect("poisoned mutex").clone())
        }

        fn put_policy(
            &self,
            policy_id: &str,
            policy: &IsmPolicy,
            seq_no: u64,
            primary_term: u64,
        ) -> Result<(), ServiceError> {
            let mut current = self.policy.lock().expect("poisoned mutex");
            let Some(version) = current.as_mut() else {
                return Err(ServiceError::NotFound(policy_id.to_string()));
            };
            if version.seq_no != seq_no || version.primary_term != primary_term {
                return Err(ServiceError::VersionConflict(policy_id.to_string()));
            }
            version.policy = policy.clone();
            version.seq_no += 1;
            Ok(())
        }

        fn get_role_mapping(&self, role_name: &str) -> Result<Option<RoleMapping>, ServiceError> {
            Ok(self.mapping(role_name))
        }

        fn put_role_mapping(
            &self,
            role_name: &str,
            mapping: &RoleMapping,
        ) -> Result<(), ServiceError> {
            *self.mapping_writes.lock().expect("poisoned mutex") += 1;
            let mut mappings = self.mappings.lock().expect("poisoned mutex");
            if let Some(entry) = mappings.iter_mut().find(|(name, _)| name == role_name) {
                entry.1 = mapping.clone();
            } else {
                mappings.push((role_name.to_string(), mapping.clone()));
            }
            Ok(())
        }

        fn put_role(
            &self,
            role_name: &str,
            _definition: &RoleDefinition,
        ) -> Result<(), ServiceError> {
            self.roles
                .lock()
                .expect("poisoned mutex")
                .push(role_name.to_string());
            Ok(())
        }

        fn create_index_pattern(
            &self,
            _pattern_id: &str,
            _config: &IndexPatternConfig,
        ) -> Result<(), ServiceError> {
            Ok(())
        }
    }

    fn config() -> SearchConfig {
        SearchConfig {
            access_role_arn: "arn:aws:iam::123456789012:role/pipeline-access".to_string(),
            admin_groups: vec![],
        }
    }

    #[test]
    fn fresh_token_write_succeeds_and_increments_version() {
        let search = FakeSearch::new();

        apply_retention_policy(&search).expect("should update");

        let version = search.get_policy(RETENTION_POLICY_ID).unwrap().unwrap();
        assert_eq!(version.seq_no, 8);
        assert_eq!(
            version.policy,
            retention_policy(RETENTION_DAYS, RETENTION_INDEX_PATTERNS)
        );
    }

    #[test]
    fn stale_token_write_surfaces_a_version_conflict() {
        let search = FakeSearch::new();
        // A fetch from this handler would see seq_no 7; the concurrent
        // writer below moves the backend past it before our write lands.
        let fetched = search.get_policy(RETENTION_POLICY_ID).unwrap().unwrap();
        search.bump_policy_version();

        let error = search
            .put_policy(
                RETENTION_POLICY_ID,
                &retention_policy(RETENTION_DAYS, RETENTION_INDEX_PATTERNS),
                fetched.seq_no,
                fetched.primary_term,
            )
            .expect_err("stale token must fail");
        assert!(matches!(error, ServiceError::VersionConflict(_)));
    }

    #[test]
    fn missing_policy_is_fatal() {
        let search = FakeSearch::without_policy();
        let error = apply_retention_policy(&search).expect_err("must fail");
        assert!(error.is_not_found());
    }

    #[test]
    fn access_role_is_appended_once() {
        let search = FakeSearch::new();

        let outcome = handle_search_config(&config(), &search).expect("should reconcile");
        assert!(outcome.access_role_mapped);

        let mapping = search.mapping(ACCESS_ROLE).expect("mapping exists");
        assert_eq!(
            mapping.backend_roles,
            vec!["arn:aws:iam::123456789012:role/pipeline-access"]
        );
    }

    #[test]
    fn already_mapped_access_role_skips_the_write() {
        let search = FakeSearch::new();
        handle_search_config(&config(), &search).expect("first pass");
        let writes_after_first = *search.mapping_writes.lock().expect("poisoned mutex");

        let outcome = handle_search_config(&config(), &search).expect("second pass");

        assert!(!outcome.access_role_mapped);
        assert_eq!(
            *search.mapping_writes.lock().expect("poisoned mutex"),
            writes_after_first
        );
        let mapping = search.mapping(ACCESS_ROLE).expect("mapping exists");
        assert_eq!(mapping.backend_roles.len(), 1);
    }

    #[test]
    fn admin_groups_create_role_and_mapping() {
        let search = FakeSearch::new();
        let config = SearchConfig {
            admin_groups: vec!["group-a".to_string(), "group-b".to_string()],
            ..config()
        };

        let outcome = handle_search_config(&config, &search).expect("should reconcile");

        assert_eq!(outcome.admin_groups_added, 2);
        assert_eq!(
            search.roles.lock().expect("poisoned mutex").as_slice(),
            [ADMIN_GROUP_ROLE]
        );
        let mapping = search.mapping(ADMIN_GROUP_ROLE).expect("mapping exists");
        assert_eq!(mapping.backend_roles, vec!["group-a", "group-b"]);

        // Re-running adds nothing and leaves the mapping unchanged.
        let outcome = handle_search_config(&config, &search).expect("second pass");
        assert_eq!(outcome.admin_groups_added, 0);
        let mapping = search.mapping(ADMIN_GROUP_ROLE).expect("mapping exists");
        assert_eq!(mapping.backend_roles.len(), 2);
    }
}
