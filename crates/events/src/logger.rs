//! Background subscriber that mirrors bus traffic into the tracing log.

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

use crate::bus::WorkspaceEvent;

/// Logs every event received on the bus until the bus is dropped.
pub struct EventLogger;

impl EventLogger {
    /// Run until the channel closes. Returns the number of events logged.
    pub async fn run(mut receiver: broadcast::Receiver<WorkspaceEvent>) -> u64 {
        let mut logged = 0;
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    tracing::info!(
                        event_type = %event.event_type,
                        page_id = ?event.page_id,
                        drive_id = ?event.drive_id,
                        actor_user_id = ?event.actor_user_id,
                        payload = %event.payload,
                        "Workspace event"
                    );
                    logged += 1;
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Event logger lagged behind the bus");
                }
                Err(RecvError::Closed) => break,
            }
        }
        tracing::debug!(logged, "Event logger stopped");
        logged
    }
}
