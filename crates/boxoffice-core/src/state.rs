//! Booking state machine.
//!
//! The table here is the single source of truth for legal transitions.
//! Store implementations re-assert it at write time with status-guarded
//! updates, so a pre-check here never substitutes for the guard.

use crate::model::BookingStatus;

/// Whether a booking may move from `from` to `to`.
pub fn can_transition(from: BookingStatus, to: BookingStatus) -> bool {
    use BookingStatus::*;
    match (from, to) {
        (Initiated, PaymentPending) => true,
        (PaymentPending, Confirmed) => true,
        (PaymentPending, Failed) => true,
        (PaymentPending, Expired) => true,
        // Explicit cancellation, reserved for future use.
        (from, Cancelled) => !from.is_terminal(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use BookingStatus::*;

    const ALL: [BookingStatus; 6] =
        [Initiated, PaymentPending, Confirmed, Failed, Expired, Cancelled];

    #[test]
    fn legal_transitions() {
        assert!(can_transition(Initiated, PaymentPending));
        assert!(can_transition(PaymentPending, Confirmed));
        assert!(can_transition(PaymentPending, Failed));
        assert!(can_transition(PaymentPending, Expired));
        assert!(can_transition(Initiated, Cancelled));
        assert!(can_transition(PaymentPending, Cancelled));
    }

    #[test]
    fn terminal_states_admit_nothing() {
        for from in [Confirmed, Failed, Expired, Cancelled] {
            for to in ALL {
                assert!(!can_transition(from, to), "{from} -> {to} must be illegal");
            }
        }
    }

    #[test]
    fn no_shortcuts_into_confirmed() {
        assert!(!can_transition(Initiated, Confirmed));
        assert!(!can_transition(Initiated, Failed));
        assert!(!can_transition(Initiated, Expired));
        assert!(!can_transition(PaymentPending, Initiated));
    }
}
