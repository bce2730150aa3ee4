use chrono::{DateTime, Duration, Utc};

use crate::plans::Plan;

/// Compute the next billing date for `plan` starting from `from`.
#[must_use]
pub fn next_billing_date(plan: Plan, from: DateTime<Utc>) -> DateTime<Utc> {
    from + Duration::days(plan.cycle_days())
}

/// Days remaining until `target`, for display purposes.
///
/// Rounds partial days up and floors at zero: a date later today counts as
/// one day, a past date yields zero, never a negative number. Expiry
/// detection does NOT use this; it compares raw timestamps so that a date
/// in the past reads as expired (see `subscription`).
#[must_use]
pub fn days_remaining(target: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let remaining = target - now;
    if remaining <= Duration::zero() {
        return 0;
    }
    let whole_days = remaining.num_days();
    if remaining - Duration::days(whole_days) > Duration::zero() {
        whole_days + 1
    } else {
        whole_days
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, mo: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, 12, 0, 0).single().unwrap_or_default()
    }

    #[test]
    fn monthly_plans_add_thirty_days() {
        let from = at(2026, 3, 1);
        assert_eq!(next_billing_date(Plan::Free, from), from + Duration::days(30));
        assert_eq!(next_billing_date(Plan::Basic, from), from + Duration::days(30));
        assert_eq!(next_billing_date(Plan::Pro, from), from + Duration::days(30));
    }

    #[test]
    fn enterprise_adds_a_year() {
        let from = at(2026, 3, 1);
        assert_eq!(
            next_billing_date(Plan::Enterprise, from),
            from + Duration::days(365)
        );
    }

    #[test]
    fn days_remaining_rounds_up() {
        let now = at(2026, 3, 1);
        assert_eq!(days_remaining(now + Duration::days(3), now), 3);
        assert_eq!(days_remaining(now + Duration::hours(36), now), 2);
        assert_eq!(days_remaining(now + Duration::hours(1), now), 1);
    }

    #[test]
    fn days_remaining_never_negative() {
        let now = at(2026, 3, 1);
        assert_eq!(days_remaining(now, now), 0);
        assert_eq!(days_remaining(now - Duration::days(10), now), 0);
        assert_eq!(days_remaining(now - Duration::seconds(1), now), 0);
    }
}
