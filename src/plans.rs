/// Subscription plan tiers and their billing parameters.
///
/// The catalog is static: prices, analysis quotas, and cycle lengths are
/// fixed at compile time and never mutated at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Plan {
    Free,
    Basic,
    Pro,
    Enterprise,
}

impl Plan {
    /// Parse a plan identifier. Unknown identifiers fall back to `Free`:
    /// the documented default, not an error.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "basic" => Self::Basic,
            "pro" => Self::Pro,
            "enterprise" => Self::Enterprise,
            _ => Self::Free,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Basic => "basic",
            Self::Pro => "pro",
            Self::Enterprise => "enterprise",
        }
    }

    /// Monthly price in the store currency's minor display unit.
    #[must_use]
    pub const fn monthly_price(self) -> i64 {
        match self {
            Self::Free => 0,
            Self::Basic => 19_000,
            Self::Pro => 49_000,
            Self::Enterprise => 199_000,
        }
    }

    /// Number of analyses included per billing cycle.
    #[must_use]
    pub const fn analysis_limit(self) -> i32 {
        match self {
            Self::Free => 5,
            Self::Basic => 15,
            Self::Pro => 50,
            Self::Enterprise => 9999,
        }
    }

    /// Billing cycle length in days.
    #[must_use]
    pub const fn cycle_days(self) -> i64 {
        match self {
            Self::Enterprise => 365,
            _ => 30,
        }
    }

    /// Whether `s` names a known plan (used to reject typos on admin input
    /// while keeping `parse` lenient for stored values).
    #[must_use]
    pub fn is_known(s: &str) -> bool {
        matches!(s, "free" | "basic" | "pro" | "enterprise")
    }
}
