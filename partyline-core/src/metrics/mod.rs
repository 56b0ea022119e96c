//! Invite metrics
//!
//! Recorded through the `metrics` facade. Without an installed recorder every
//! call is a no-op, so the registry records unconditionally.

use metrics::{counter, describe_counter, describe_gauge, gauge};

pub const INVITES_ADDED: &str = "party.invites.added";
pub const INVITES_ACCEPTED: &str = "party.invites.accepted";
pub const INVITES_DENIED: &str = "party.invites.denied";
pub const INVITES_EXPIRED: &str = "party.invites.expired";
pub const ACCEPT_FAILED: &str = "party.accept.failed";
pub const LEAVE_TOTAL: &str = "party.leave.total";
pub const INVITES_PENDING: &str = "party.invites.pending";

/// Register metric descriptions with the installed recorder
pub fn init_metrics() {
    describe_counter!(INVITES_ADDED, "Number of party invites created");
    describe_counter!(INVITES_ACCEPTED, "Number of party invites accepted");
    describe_counter!(INVITES_DENIED, "Number of party invites denied");
    describe_counter!(INVITES_EXPIRED, "Number of invites dropped by lazy expiry");
    describe_counter!(ACCEPT_FAILED, "Accept attempts that failed after selection");
    describe_counter!(LEAVE_TOTAL, "Number of successful party leaves");
    describe_gauge!(INVITES_PENDING, "Pending invites across every invitee");
}

/// Record a counter metric
pub fn record_counter(name: &'static str, value: u64) {
    if value > 0 {
        counter!(name).increment(value);
    }
}

/// Record a gauge metric
pub fn record_gauge(name: &'static str, value: f64) {
    gauge!(name).set(value);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_recorder_is_noop() {
        init_metrics();
        record_counter(INVITES_ADDED, 1);
        record_counter(INVITES_EXPIRED, 0);
        record_gauge(INVITES_PENDING, 3.0);
    }
}
