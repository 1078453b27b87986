//! Anonymous progress record types.

use chrono::{DateTime, Datelike, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Onboarding progress accumulated before sign-up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnboardingProgress {
    /// Highest onboarding step reached.
    pub step: u32,
    /// Whether onboarding was completed.
    pub completed: bool,
}

/// Usage counters keyed by a week window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyUsage {
    /// ISO date of the Monday starting the week this row counts.
    pub week_start: String,
    /// Stories built during the week.
    pub builds_this_week: u32,
    /// Timestamp of the most recent build.
    pub last_build_at: DateTime<Utc>,
}

impl WeeklyUsage {
    /// Compute the week-window identifier for a given instant: the ISO date
    /// of the Monday of that week, in UTC.
    pub fn week_start_for(now: DateTime<Utc>) -> String {
        let days_from_monday = now.weekday().num_days_from_monday() as i64;
        let monday = now.date_naive() - Duration::days(days_from_monday);
        monday.format("%Y-%m-%d").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn week_start_is_monday() {
        // 2026-08-19 is a Wednesday
        let wed = Utc.with_ymd_and_hms(2026, 8, 19, 15, 30, 0).unwrap();
        assert_eq!(WeeklyUsage::week_start_for(wed), "2026-08-17");
    }

    #[test]
    fn week_start_on_monday_is_same_day() {
        let mon = Utc.with_ymd_and_hms(2026, 8, 17, 0, 5, 0).unwrap();
        assert_eq!(WeeklyUsage::week_start_for(mon), "2026-08-17");
    }

    #[test]
    fn week_start_on_sunday_is_previous_monday() {
        let sun = Utc.with_ymd_and_hms(2026, 8, 23, 23, 59, 0).unwrap();
        assert_eq!(WeeklyUsage::week_start_for(sun), "2026-08-17");
    }

    #[test]
    fn week_start_crosses_month_boundary() {
        // 2026-08-01 is a Saturday; its week starts on Monday 2026-07-27
        let sat = Utc.with_ymd_and_hms(2026, 8, 1, 12, 0, 0).unwrap();
        assert_eq!(WeeklyUsage::week_start_for(sat), "2026-07-27");
    }

    #[test]
    fn onboarding_round_trips_through_json() {
        let record = OnboardingProgress {
            step: 3,
            completed: false,
        };
        let json = serde_json::to_string(&record).unwrap();
        let back: OnboardingProgress = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }
}
