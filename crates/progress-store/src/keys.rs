//! Storage key constants.

/// Storage keys used for anonymous progress records.
pub struct ProgressKeys;

impl ProgressKeys {
    /// Onboarding progress record (JSON)
    pub const ONBOARDING: &'static str = "onboarding_progress";

    /// Weekly usage counters (JSON)
    pub const WEEKLY_USAGE: &'static str = "weekly_usage";

    /// First-story milestone flag
    pub const FIRST_STORY: &'static str = "first_story_built";
}
