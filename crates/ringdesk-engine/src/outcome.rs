//! Outcome classification.
//!
//! Two independent rules applied at different times. Booking detection runs
//! once per speech turn over the combined user and assistant text.
//! Missed-call detection runs once at call-end and overrides whatever the
//! call accumulated, including a booking made moments before an abnormal
//! disconnect.

use ringdesk_types::Outcome;

/// Stems for "appointment" / "booking" / "schedule" in Russian and Uzbek,
/// plus English equivalents. Matching is case-insensitive substring search,
/// so a stem covers its inflected forms.
const BOOKING_STEMS: &[&str] = &[
    // Russian
    "запис",
    "запиш",
    "приём",
    "прием",
    "бронир",
    "забронир",
    // Uzbek
    "yozil",
    "qabulga",
    "band qil",
    "navbat",
    // English
    "appointment",
    "booking",
    "book an",
    "schedule",
];

/// Calls shorter than this are classified as missed regardless of content.
const MISSED_DURATION_SECS: i64 = 5;

/// End reasons that force the missed classification.
const MISSED_END_REASONS: &[&str] = &["no_answer", "rejected"];

/// Returns whether the combined user utterance and assistant reply mention a
/// booking intent.
pub fn detect_booking(user_text: &str, assistant_text: &str) -> bool {
    let combined = format!("{user_text} {assistant_text}").to_lowercase();
    BOOKING_STEMS.iter().any(|stem| combined.contains(stem))
}

/// Promotes an outcome toward `booking`.
///
/// Only `info` is promoted. `transfer` is already more specific and `missed`
/// is only ever assigned at call-end, after the last speech turn.
pub fn promote_to_booking(current: Outcome) -> Outcome {
    match current {
        Outcome::Info => Outcome::Booking,
        other => other,
    }
}

/// Final outcome for a call that just ended.
///
/// Forced to `missed` when the provider reported `no_answer`/`rejected` or
/// the call lasted under five seconds, overriding any accumulated value.
/// Otherwise the accumulated outcome stands.
pub fn classify_end(current: Outcome, duration_seconds: i64, end_reason: Option<&str>) -> Outcome {
    let reason_missed = end_reason
        .map(|r| MISSED_END_REASONS.contains(&r))
        .unwrap_or(false);

    if reason_missed || duration_seconds < MISSED_DURATION_SECS {
        Outcome::Missed
    } else {
        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn booking_stems_match_inflected_forms() {
        assert!(detect_booking("хочу записаться на приём", ""));
        assert!(detect_booking("", "Я запишу вас на завтра."));
        assert!(detect_booking("qabulga yozilmoqchiman", ""));
        assert!(detect_booking("I want to book an appointment", ""));
        assert!(!detect_booking("сколько вы работаете", "Мы работаем до шести."));
    }

    #[test]
    fn detection_is_case_insensitive() {
        assert!(detect_booking("ЗАПИШИТЕ меня", ""));
        assert!(detect_booking("BOOKING please", ""));
    }

    #[test]
    fn promotion_is_monotonic() {
        assert_eq!(promote_to_booking(Outcome::Info), Outcome::Booking);
        assert_eq!(promote_to_booking(Outcome::Booking), Outcome::Booking);
        assert_eq!(promote_to_booking(Outcome::Transfer), Outcome::Transfer);
    }

    #[test]
    fn short_calls_are_missed() {
        assert_eq!(classify_end(Outcome::Info, 3, None), Outcome::Missed);
        assert_eq!(classify_end(Outcome::Info, 5, None), Outcome::Info);
    }

    #[test]
    fn missed_end_reasons_force_missed() {
        assert_eq!(
            classify_end(Outcome::Info, 30, Some("no_answer")),
            Outcome::Missed
        );
        assert_eq!(
            classify_end(Outcome::Info, 30, Some("rejected")),
            Outcome::Missed
        );
        assert_eq!(
            classify_end(Outcome::Info, 30, Some("completed")),
            Outcome::Info
        );
    }

    #[test]
    fn missed_overrides_an_accumulated_booking() {
        assert_eq!(
            classify_end(Outcome::Booking, 3, Some("no_answer")),
            Outcome::Missed
        );
    }

    #[test]
    fn normal_end_keeps_accumulated_outcome() {
        assert_eq!(
            classify_end(Outcome::Booking, 120, Some("hangup")),
            Outcome::Booking
        );
        assert_eq!(classify_end(Outcome::Transfer, 45, None), Outcome::Transfer);
    }
}
