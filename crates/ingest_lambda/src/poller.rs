//! Bounded activation polling for asynchronously-provisioned resources.

use std::time::Duration;

use crate::adapters::delivery_stream::{DeliveryStreamDetails, DeliveryStreamService};
use crate::error::ServiceError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            max_attempts: 60,
        }
    }
}

pub enum Readiness<T> {
    Ready(T),
    Pending,
    Failed(String),
}

/// Probes until the resource reports ready, a terminal failure, or the
/// attempt budget runs out. The sleep is injected so tests run without
/// wall-clock delays; no state is held across polls beyond the attempt
/// counter.
pub fn poll_until_ready<T>(
    settings: &PollSettings,
    sleep: &mut dyn FnMut(Duration),
    probe: &mut dyn FnMut(u32) -> Result<Readiness<T>, ServiceError>,
) -> Result<T, ServiceError> {
    for attempt in 0..settings.max_attempts {
        if attempt > 0 {
            sleep(settings.interval);
        }
        match probe(attempt)? {
            Readiness::Ready(value) => return Ok(value),
            Readiness::Pending => {}
            Readiness::Failed(reason) => return Err(ServiceError::Service(reason)),
        }
    }
    Err(ServiceError::Timeout(format!(
        "resource not ready after {} attempts",
        settings.max_attempts
    )))
}

/// Delivery-stream activation: `CREATING` is pending, `ACTIVE` is ready,
/// and any other status is terminal. A stream that disappears mid-poll is a
/// hard failure, not a retry.
pub fn wait_for_delivery_stream(
    streams: &impl DeliveryStreamService,
    name: &str,
    settings: &PollSettings,
    sleep: &mut dyn FnMut(Duration),
) -> Result<DeliveryStreamDetails, ServiceError> {
    poll_until_ready(settings, sleep, &mut |_attempt| {
        let details = streams
            .describe_delivery_stream(name)?
            .ok_or_else(|| ServiceError::NotFound(format!("delivery stream {name} does not exist")))?;
        match details.status.as_str() {
            "ACTIVE" => Ok(Readiness::Ready(details)),
            "CREATING" => Ok(Readiness::Pending),
            other => Ok(Readiness::Failed(format!(
                "delivery stream {name} cannot become active from status {other}"
            ))),
        }
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::adapters::delivery_stream::CreateDeliveryStream;

    struct ScriptedStreams {
        statuses: Mutex<Vec<&'static str>>,
        probes: Mutex<u32>,
    }

    impl ScriptedStreams {
        fn new(statuses: Vec<&'static str>) -> Self {
            Self {
                statuses: Mutex::new(statuses),
                probes: Mutex::new(0),
            }
        }

        fn probes(&self) -> u32 {
            *self.probes.lock().expect("poisoned mutex")
        }
    }

    impl DeliveryStreamService for ScriptedStreams {
        fn describe_delivery_stream(
            &self,
            name: &str,
        ) -> Result<Option<DeliveryStreamDetails>, ServiceError> {
            *self.probes.lock().expect("poisoned mutex") += 1;
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
            _request: &CreateDeliveryStream<'_>,
        ) -> Result<String, ServiceError> {
            unreachable!("poller never creates");
        }
    }

    fn fast_settings(max_attempts: u32) -> PollSettings {
        PollSettings {
            interval: Duration::from_secs(5),
            max_attempts,
        }
    }

    #[test]
    fn succeeds_after_exactly_three_polls() {
        let streams = ScriptedStreams::new(vec!["CREATING", "CREATING", "ACTIVE"]);
        let mut sleeps = Vec::new();
        let details = wait_for_delivery_stream(
            &streams,
            "autolog-logs-acme-web",
            &fast_settings(60),
            &mut |duration| sleeps.push(duration),
        )
        .expect("stream should activate");

        assert_eq!(streams.probes(), 3);
        assert_eq!(sleeps.len(), 2);
        assert_eq!(sleeps[0], Duration::from_secs(5));
        assert!(details.arn.ends_with("autolog-logs-acme-web"));
    }

    #[test]
    fn times_out_when_never_active() {
        let streams = ScriptedStreams::new(vec!["CREATING"]);
        let error = wait_for_delivery_stream(
            &streams,
            "autolog-logs-acme-web",
            &fast_settings(4),
            &mut |_| {},
        )
        .expect_err("must time out");

        assert!(matches!(error, ServiceError::Timeout(_)));
        assert_eq!(streams.probes(), 4);
    }

    #[test]
    fn unexpected_status_is_terminal() {
        let streams = ScriptedStreams::new(vec!["CREATING", "DELETING"]);
        let error = wait_for_delivery_stream(
            &streams,
            "autolog-logs-acme-web",
            &fast_settings(60),
            &mut |_| {},
        )
        .expect_err("must fail");

        assert!(matches!(error, ServiceError::Service(_)));
        assert_eq!(streams.probes(), 2);
    }
}
