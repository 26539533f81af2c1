//! Background tasks for the Ringdesk server.

use std::sync::Arc;

use tokio::time::sleep;

use crate::AppState;

/// Starts the notification outbox retry task.
///
/// Runs indefinitely: each pass re-dispatches pending outbox rows that still
/// have attempt budget. Rows created at call-end normally go out in the
/// call-end flow itself; this task only picks up what failed there or what a
/// crash left behind.
pub async fn start_outbox_retry_task(state: Arc<AppState>) {
    let dispatcher = state.orchestrator.dispatcher().clone();
    let interval = dispatcher.retry_interval();

    tracing::info!(
        interval_secs = interval.as_secs(),
        "starting notification outbox retry task"
    );

    loop {
        sleep(interval).await;

        let delivered = dispatcher.dispatch_due(&state.pool).await;
        if delivered > 0 {
            tracing::info!(delivered, "outbox retry pass delivered notifications");
        }
    }
}
