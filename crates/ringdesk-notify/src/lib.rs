//! Notification Dispatcher for the Ringdesk platform.
//!
//! Fans out best-effort notifications to downstream channels once a call
//! reaches its terminal state: every call is logged to the sheet channel, and
//! an alert additionally fires for bookings, missed calls, and human
//! transfers.
//!
//! Delivery intent is recorded durably in the `notification_outbox` table at
//! call-end, then dispatched: all rows for one call go out concurrently and
//! the dispatcher waits for all of them to settle, but individual failures
//! are logged and swallowed; they never propagate to the caller-facing call
//! flow. Rows that fail are retried by a background pass with a bounded
//! attempt budget.

mod channels;
mod dispatcher;
mod error;
mod outbox;

pub use channels::{plan_notifications, NotificationEnvelope, NotifyChannel};
pub use dispatcher::{Dispatcher, NotifyConfig};
pub use error::NotifyError;
pub use outbox::{
    enqueue, mark_attempt, pending_for_call, pending_for_retry, OutboxRow, OutboxStatus,
};
