//! Best-effort delivery of status events.

use crate::collector::CollectorClient;
use studyguard_common::StatusEvent;
use tracing::{info, warn};

/// Accepts status events without blocking the caller.
///
/// Delivery is at most once: failures are logged by the sink and dropped.
pub trait StatusSink: Send + Sync {
    fn report(&self, event: StatusEvent);
}

/// Posts each event to the collector on its own task.
#[derive(Debug, Clone)]
pub struct HttpReporter {
    client: CollectorClient,
}

impl HttpReporter {
    pub fn new(client: CollectorClient) -> Self {
        Self { client }
    }
}

impl StatusSink for HttpReporter {
    fn report(&self, event: StatusEvent) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("No async runtime, dropping status report for {}", event.course_id);
            return;
        };

        let client = self.client.clone();
        runtime.spawn(async move {
            match client.send_status(&event).await {
                Ok(ack) => info!(
                    course_id = %event.course_id,
                    active = event.active,
                    "Status reported: {}",
                    ack
                ),
                Err(e) => warn!(
                    course_id = %event.course_id,
                    active = event.active,
                    "Status report failed: {}",
                    e
                ),
            }
        });
    }
}
