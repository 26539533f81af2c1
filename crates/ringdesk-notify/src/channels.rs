//! Downstream channels and the notification planning rule.

use ringdesk_types::{CallSession, HandledBy, Outcome};
use serde::{Deserialize, Serialize};

/// A downstream notification channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotifyChannel {
    /// Row-append logging of every completed call.
    #[serde(rename = "sheet_log")]
    SheetLog,
    /// Operator-facing alert for calls that need attention.
    #[serde(rename = "alert")]
    Alert,
}

impl NotifyChannel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SheetLog => "sheet_log",
            Self::Alert => "alert",
        }
    }
}

impl std::str::FromStr for NotifyChannel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sheet_log" => Ok(Self::SheetLog),
            "alert" => Ok(Self::Alert),
            other => Err(format!("unknown notify channel: {other}")),
        }
    }
}

/// The fixed event envelope posted to every downstream channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NotificationEnvelope {
    /// Event name (`call_completed`, `new_booking`, `missed_call`,
    /// `human_transfer`).
    pub event: String,
    pub call_id: String,
    pub caller_number: Option<String>,
    pub language: String,
    pub handled_by: String,
    pub outcome: String,
    pub duration_seconds: Option<i64>,
}

impl NotificationEnvelope {
    fn for_session(event: &str, session: &CallSession) -> Self {
        Self {
            event: event.to_string(),
            call_id: session.call_id.clone(),
            caller_number: session.caller_number.clone(),
            language: session.language.as_str().to_string(),
            handled_by: session.handled_by.as_str().to_string(),
            outcome: session.outcome.as_str().to_string(),
            duration_seconds: session.call_duration_seconds,
        }
    }
}

/// Decides which notifications a completed call produces.
///
/// The sheet log always fires. The alert channel additionally fires when the
/// outcome is a booking or a missed call, or when a human handled the call;
/// the alert's event name identifies which condition triggered it.
pub fn plan_notifications(session: &CallSession) -> Vec<(NotifyChannel, NotificationEnvelope)> {
    let mut planned = vec![(
        NotifyChannel::SheetLog,
        NotificationEnvelope::for_session("call_completed", session),
    )];

    let alert_event = match (session.outcome, session.handled_by) {
        (Outcome::Booking, _) => Some("new_booking"),
        (Outcome::Missed, _) => Some("missed_call"),
        (_, HandledBy::Human) => Some("human_transfer"),
        _ => None,
    };

    if let Some(event) = alert_event {
        planned.push((
            NotifyChannel::Alert,
            NotificationEnvelope::for_session(event, session),
        ));
    }

    planned
}

#[cfg(test)]
mod tests {
    use super::*;
    use ringdesk_types::{CallState, CallStatus, Language};

    fn session(outcome: Outcome, handled_by: HandledBy) -> CallSession {
        CallSession {
            id: 1,
            call_id: "abc123".to_string(),
            caller_number: Some("+998900000000".to_string()),
            language: Language::Ru,
            handled_by,
            outcome,
            status: CallStatus::Completed,
            state: CallState::Completed,
            call_duration_seconds: Some(61),
            notified: false,
            notified_at: None,
            created_at: "2026-01-01T00:00:00Z".to_string(),
            updated_at: "2026-01-01T00:01:01Z".to_string(),
        }
    }

    #[test]
    fn info_call_logs_only() {
        let planned = plan_notifications(&session(Outcome::Info, HandledBy::Ai));
        assert_eq!(planned.len(), 1);
        assert_eq!(planned[0].0, NotifyChannel::SheetLog);
        assert_eq!(planned[0].1.event, "call_completed");
    }

    #[test]
    fn booking_adds_alert() {
        let planned = plan_notifications(&session(Outcome::Booking, HandledBy::Ai));
        assert_eq!(planned.len(), 2);
        assert_eq!(planned[1].0, NotifyChannel::Alert);
        assert_eq!(planned[1].1.event, "new_booking");
    }

    #[test]
    fn missed_adds_alert() {
        let planned = plan_notifications(&session(Outcome::Missed, HandledBy::Ai));
        assert_eq!(planned[1].1.event, "missed_call");
    }

    #[test]
    fn human_transfer_adds_alert() {
        let planned = plan_notifications(&session(Outcome::Transfer, HandledBy::Human));
        assert_eq!(planned[1].1.event, "human_transfer");
    }
}
