//! Tag-driven subscription reconciler: converges each named log group
//! toward the delivery destination its driving tag describes, or toward no
//! subscription when the tag is gone.

use std::time::Duration;

use ingest_core::contract::Notification;
use ingest_core::naming::{self, Destination, DESTINATION_TAG, SUBSCRIPTION_FILTER_NAME};
use serde::Serialize;

use crate::adapters::delivery_stream::{CreateDeliveryStream, DeliveryStreamService};
use crate::adapters::log_group::{
    LogGroupService, PutSubscriptionFilter, SubscriptionService, TagService,
};
use crate::error::ServiceError;
use crate::poller::{wait_for_delivery_stream, PollSettings};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutologConfig {
    pub region: String,
    pub account_id: String,
    pub delivery_stream_role_arn: String,
    pub subscription_filter_role_arn: String,
    pub delivery_stream_log_group: String,
    pub poll: PollSettings,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TagOutcome {
    SubscriptionRemoved { log_group: String },
    NothingToRemove { log_group: String },
    Subscribed { log_group: String, delivery_stream: String },
    Failed { resource: String, error: String },
}

/// Dispatches a decoded notification to the tag reconciler. Log-group
/// lifecycle events carry no tag state and are only acknowledged; the tag
/// change that follows drives reconciliation.
pub fn handle_notification(
    notification: &Notification,
    config: &AutologConfig,
    tags: &impl TagService,
    subscriptions: &impl SubscriptionService,
    streams: &impl DeliveryStreamService,
    log_groups: &impl LogGroupService,
    sleep: &mut dyn FnMut(Duration),
) -> Vec<TagOutcome> {
    match notification {
        Notification::TagChange(event) => handle_tag_event(
            &event.resources,
            config,
            tags,
            subscriptions,
            streams,
            log_groups,
            sleep,
        ),
        Notification::LogGroupLifecycle(event) => {
            tracing::info!(
                event_name = %event.detail.event_name,
                log_group = %event.detail.request_parameters.log_group_name,
                "log group lifecycle event received"
            );
            Vec::new()
        }
        Notification::ObjectCreated(_) => {
            tracing::error!("object-created event routed to the tag reconciler");
            Vec::new()
        }
    }
}

/// Each named resource is reconciled independently: one failure is logged
/// and recorded, never allowed to abort the siblings.
pub fn handle_tag_event(
    resources: &[String],
    config: &AutologConfig,
    tags: &impl TagService,
    subscriptions: &impl SubscriptionService,
    streams: &impl DeliveryStreamService,
    log_groups: &impl LogGroupService,
    sleep: &mut dyn FnMut(Duration),
) -> Vec<TagOutcome> {
    resources
        .iter()
        .map(|resource| {
            reconcile_resource(
                resource,
                config,
                tags,
                subscriptions,
                streams,
                log_groups,
                sleep,
            )
            .unwrap_or_else(|error| {
                tracing::error!(resource = %resource, error = %error, "failed to reconcile resource");
                TagOutcome::Failed {
                    resource: resource.clone(),
                    error: error.to_string(),
                }
            })
        })
        .collect()
}

fn reconcile_resource(
    resource_arn: &str,
    config: &AutologConfig,
    tags: &impl TagService,
    subscriptions: &impl SubscriptionService,
    streams: &impl DeliveryStreamService,
    log_groups: &impl LogGroupService,
    sleep: &mut dyn FnMut(Duration),
) -> Result<TagOutcome, ServiceError> {
    let log_group = naming::parse_log_group_arn(resource_arn)?;
    let tag_map = tags.list_tags(resource_arn)?;

    match tag_map.get(DESTINATION_TAG) {
        None => remove_subscription(&log_group, subscriptions),
        Some(value) => apply_subscription(
            &log_group,
            value,
            config,
            subscriptions,
            streams,
            log_groups,
            sleep,
        ),
    }
}

fn remove_subscription(
    log_group: &str,
    subscriptions: &impl SubscriptionService,
) -> Result<TagOutcome, ServiceError> {
    let existing = subscriptions.get_subscription_filter(log_group, SUBSCRIPTION_FILTER_NAME)?;
    if existing.is_none() {
        tracing::debug!(log_group = %log_group, "no subscription to remove");
        return Ok(TagOutcome::NothingToRemove {
            log_group: log_group.to_string(),
        });
    }

    match subscriptions.delete_subscription_filter(log_group, SUBSCRIPTION_FILTER_NAME) {
        Ok(()) => {
            tracing::info!(log_group = %log_group, "subscription removed");
            Ok(TagOutcome::SubscriptionRemoved {
                log_group: log_group.to_string(),
            })
        }
        // Deleted underneath us; the desired state holds either way.
        Err(error) if error.is_not_found() => Ok(TagOutcome::NothingToRemove {
            log_group: log_group.to_string(),
        }),
        Err(error) => Err(error),
    }
}

fn apply_subscription(
    log_group: &str,
    destination_tag: &str,
    config: &AutologConfig,
    subscriptions: &impl SubscriptionService,
    streams: &impl DeliveryStreamService,
    log_groups: &impl LogGroupService,
    sleep: &mut dyn FnMut(Duration),
) -> Result<TagOutcome, ServiceError> {
    let destination = naming::parse_destination(destination_tag)?;
    let stream_name =
        naming::delivery_stream_name(&destination.bucket_name, &destination.index_name);

    ensure_delivery_stream(&stream_name, &destination, config, streams, log_groups)?;
    let details = wait_for_delivery_stream(streams, &stream_name, &config.poll, sleep)?;

    subscriptions.put_subscription_filter(&PutSubscriptionFilter {
        log_group_name: log_group,
        filter_name: SUBSCRIPTION_FILTER_NAME,
        destination_arn: &details.arn,
        role_arn: &config.subscription_filter_role_arn,
    })?;
    tracing::info!(
        log_group = %log_group,
        delivery_stream = %stream_name,
        "subscription bound to delivery stream"
    );

    Ok(TagOutcome::Subscribed {
        log_group: log_group.to_string(),
        delivery_stream: stream_name,
    })
}

fn ensure_delivery_stream(
    stream_name: &str,
    destination: &Destination,
    config: &AutologConfig,
    streams: &impl DeliveryStreamService,
    log_groups: &impl LogGroupService,
) -> Result<(), ServiceError> {
    if streams.describe_delivery_stream(stream_name)?.is_some() {
        tracing::debug!(delivery_stream = %stream_name, "delivery stream already exists");
        return Ok(());
    }

    // The stream logs delivery errors to a per-stream log stream, which must
    // exist before the create call references it.
    match log_groups.create_log_stream(&config.delivery_stream_log_group, stream_name) {
        Ok(()) => {}
        Err(error) if error.is_already_exists() => {}
        Err(error) => return Err(error),
    }

    let prefix = naming::delivery_prefix(
        &destination.index_name,
        &config.account_id,
        &config.region,
    );
    match streams.create_delivery_stream(&CreateDeliveryStream {
        name: stream_name,
        bucket_name: &destination.bucket_name,
        prefix: &prefix,
        role_arn: &config.delivery_stream_role_arn,
        log_group_name: &config.delivery_stream_log_group,
    }) {
        Ok(arn) => {
            tracing::info!(delivery_stream = %stream_name, arn = %arn, "delivery stream created");
            Ok(())
        }
        Err(error) if error.is_already_exists() => {
            // Lost the create race; one re-describe picks up the winner.
            if streams.describe_delivery_stream(stream_name)?.is_some() {
                return Ok(());
            }
            Err(ServiceError::NotFound(format!(
                "delivery stream {stream_name} vanished after a concurrent create"
            )))
        }
        Err(error) => Err(error),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    use super::*;
    use crate::adapters::delivery_stream::DeliveryStreamDetails;
    use crate::adapters::log_group::SubscriptionFilter;

    struct FakeTags {
        by_arn: BTreeMap<String, BTreeMap<String, String>>,
    }

    impl TagService for FakeTags {
        fn list_tags(&self, resource_arn: &str) -> Result<BTreeMap<String, String>, ServiceError> {
            Ok(self.by_arn.get(resource_arn).cloned().unwrap_or_default())
        }
    }

    #[derive(Default)]
    struct FakeSubscriptions {
        existing: Mutex<Vec<(String, String)>>,
        put: Mutex<Vec<(String, String)>>,
        deleted: Mutex<Vec<String>>,
    }

    impl FakeSubscriptions {
        fn with_existing(log_group: &str) -> Self {
            let fake = Self::default();
            fake.existing
                .lock()
                .expect("poisoned mutex")
                .push((log_group.to_string(), "arn:old-destination".to_string()));
            fake
        }
    }

    impl SubscriptionService for FakeSubscriptions {
        fn get_subscription_filter(
            &self,
            log_group_name: &str,
            _filter_name: &str,
        ) -> Result<Option<SubscriptionFilter>, ServiceError> {
            Ok(self
                .existing
                .lock()
                .expect("poisoned mutex")
                .iter()
                .find(|(group, _)| group == log_group_name)
                .map(|(_, destination)| SubscriptionFilter {
                    name: SUBSCRIPTION_FILTER_NAME.to_string(),
                    destination_arn: destination.clone(),
                }))
        }

        fn put_subscription_filter(
            &self,
            request: &PutSubscriptionFilter<'_>,
        ) -> Result<(), ServiceError> {
            self.put.lock().expect("poisoned mutex").push((
                request.log_group_name.to_string(),
                request.destination_arn.to_string(),
            ));
            Ok(())
        }

        fn delete_subscription_filter(
            &self,
            log_group_name: &str,
            _filter_name: &str,
        ) -> Result<(), ServiceError> {
            self.deleted
                .lock()
                .expect("poisoned mutex")
                .push(log_group_name.to_string());
            self.existing
                .lock()
                .expect("poisoned mutex")
                .retain(|(group, _)| group != log_group_name);
            Ok(())
        }
    }

    struct FakeStreams {
        // Status reported on each successive describe of a known stream.
        statuses: Mutex<Vec<&'static str>>,
        known: Mutex<Vec<String>>,
        created: Mutex<Vec<String>>,
    }

    impl FakeStreams {
        fn new(statuses: Vec<&'static str>) -> Self {
            Self {
                statuses: Mutex::new(statuses),
                known: Mutex::new(Vec::new()),
                created: Mutex::new(Vec::new()),
            }
        }
    }

    impl DeliveryStreamService for FakeStreams {
        fn describe_delivery_stream(
            &self,
            name: &str,
        ) -> Result<Option<DeliveryStreamDetails>, ServiceError> {
            let known = self.known.lock().expect("poisoned mutex");
            if !known.iter().any(|stream| stream == name) {
                return Ok(None);
            }
            let mut statuses = self.statuses.lock().expect("poisoned mutex");
            let status = if statuses.len() > 1 {
                statuses.remove(0)
            } else {
                statuses[0]
            };
            Ok(Some(DeliveryStreamDetails {
                arn: format!("arn:aws:firehose:us-west-2:123456789012:deliverystream/{name}"),
                status: status.to_string(),
            }))
        }

        fn create_delivery_stream(
            &self,
            request: &CreateDeliveryStream<'_>,
        ) -> Result<String, ServiceError> {
            self.known
                .lock()
                .expect("poisoned mutex")
                .push(request.name.to_string());
            self.created
                .lock()
                .expect("poisoned mutex")
                .push(request.name.to_string());
            Ok(format!(
                "arn:aws:firehose:us-west-2:123456789012:deliverystream/{}",
                request.name
            ))
        }
    }

    struct FakeLogGroups;

    impl LogGroupService for FakeLogGroups {
        fn create_log_group(&self, _name: &str) -> Result<(), ServiceError> {
            Ok(())
        }

        fn create_log_stream(
            &self,
            _group_name: &str,
            _stream_name: &str,
        ) -> Result<(), ServiceError> {
            Ok(())
        }
    }

    const LOG_GROUP_ARN: &str = "arn:aws:logs:us-west-2:123456789012:log-group:/app/web";

    fn config() -> AutologConfig {
        AutologConfig {
            region: "us-west-2".to_string(),
            account_id: "123456789012".to_string(),
            delivery_stream_role_arn: "arn:aws:iam::123456789012:role/delivery".to_string(),
            subscription_filter_role_arn: "arn:aws:iam::123456789012:role/subscription".to_string(),
            delivery_stream_log_group: "/autolog/delivery".to_string(),
            poll: PollSettings::default(),
        }
    }

    fn tagged(dest: &str) -> FakeTags {
        let mut tags = BTreeMap::new();
        tags.insert(DESTINATION_TAG.to_string(), dest.to_string());
        FakeTags {
            by_arn: BTreeMap::from([(LOG_GROUP_ARN.to_string(), tags)]),
        }
    }

    fn untagged() -> FakeTags {
        FakeTags {
            by_arn: BTreeMap::from([(LOG_GROUP_ARN.to_string(), BTreeMap::new())]),
        }
    }

    #[test]
    fn tagged_resource_gets_stream_and_subscription() {
        let tags = tagged("logs-acme/web");
        let subscriptions = FakeSubscriptions::default();
        let streams = FakeStreams::new(vec!["CREATING", "CREATING", "ACTIVE"]);
        let mut sleeps = 0usize;

        let outcomes = handle_tag_event(
            &[LOG_GROUP_ARN.to_string()],
            &config(),
            &tags,
            &subscriptions,
            &streams,
            &FakeLogGroups,
            &mut |_| sleeps += 1,
        );

        assert_eq!(
            outcomes,
            vec![TagOutcome::Subscribed {
                log_group: "/app/web".to_string(),
                delivery_stream: "autolog-logs-acme-web".to_string(),
            }]
        );
        assert_eq!(
            streams.created.lock().expect("poisoned mutex").as_slice(),
            ["autolog-logs-acme-web"]
        );
        assert_eq!(sleeps, 2);

        let put = subscriptions.put.lock().expect("poisoned mutex");
        assert_eq!(put.len(), 1);
        assert_eq!(put[0].0, "/app/web");
        assert!(put[0].1.ends_with("autolog-logs-acme-web"));
    }

    #[test]
    fn existing_stream_is_not_recreated() {
        let tags = tagged("logs-acme/web");
        let subscriptions = FakeSubscriptions::default();
        let streams = FakeStreams::new(vec!["ACTIVE"]);
        streams
            .known
            .lock()
            .expect("poisoned mutex")
            .push("autolog-logs-acme-web".to_string());

        let outcomes = handle_tag_event(
            &[LOG_GROUP_ARN.to_string()],
            &config(),
            &tags,
            &subscriptions,
            &streams,
            &FakeLogGroups,
            &mut |_| {},
        );

        assert!(matches!(outcomes[0], TagOutcome::Subscribed { .. }));
        assert!(streams.created.lock().expect("poisoned mutex").is_empty());
    }

    #[test]
    fn removed_tag_deletes_existing_binding() {
        let tags = untagged();
        let subscriptions = FakeSubscriptions::with_existing("/app/web");
        let streams = FakeStreams::new(vec!["ACTIVE"]);

        let outcomes = handle_tag_event(
            &[LOG_GROUP_ARN.to_string()],
            &config(),
            &tags,
            &subscriptions,
            &streams,
            &FakeLogGroups,
            &mut |_| {},
        );

        assert_eq!(
            outcomes,
            vec![TagOutcome::SubscriptionRemoved {
                log_group: "/app/web".to_string(),
            }]
        );
        assert_eq!(
            subscriptions.deleted.lock().expect("poisoned mutex").as_slice(),
            ["/app/web"]
        );
    }

    #[test]
    fn removed_tag_without_binding_is_a_no_op() {
        let tags = untagged();
        let subscriptions = FakeSubscriptions::default();
        let streams = FakeStreams::new(vec!["ACTIVE"]);

        let outcomes = handle_tag_event(
            &[LOG_GROUP_ARN.to_string()],
            &config(),
            &tags,
            &subscriptions,
            &streams,
            &FakeLogGroups,
            &mut |_| {},
        );

        assert_eq!(
            outcomes,
            vec![TagOutcome::NothingToRemove {
                log_group: "/app/web".to_string(),
            }]
        );
        assert!(subscriptions.deleted.lock().expect("poisoned mutex").is_empty());
    }

    #[test]
    fn one_failing_resource_does_not_abort_siblings() {
        let tags = tagged("logs-acme/web");
        let subscriptions = FakeSubscriptions::default();
        let streams = FakeStreams::new(vec!["ACTIVE"]);

        let outcomes = handle_tag_event(
            &[
                "arn:aws:s3:::not-a-log-group".to_string(),
                LOG_GROUP_ARN.to_string(),
            ],
            &config(),
            &tags,
            &subscriptions,
            &streams,
            &FakeLogGroups,
            &mut |_| {},
        );

        assert_eq!(outcomes.len(), 2);
        assert!(matches!(outcomes[0], TagOutcome::Failed { .. }));
        assert!(matches!(outcomes[1], TagOutcome::Subscribed { .. }));
    }

    #[test]
    fn invalid_destination_tag_fails_that_resource() {
        let tags = tagged("missing-index-segment");
        let subscriptions = FakeSubscriptions::default();
        let streams = FakeStreams::new(vec!["ACTIVE"]);

        let outcomes = handle_tag_event(
            &[LOG_GROUP_ARN.to_string()],
            &config(),
            &tags,
            &subscriptions,
            &streams,
            &FakeLogGroups,
            &mut |_| {},
        );

        assert!(matches!(outcomes[0], TagOutcome::Failed { .. }));
        assert!(streams.created.lock().expect("poisoned mutex").is_empty());
    }
}
