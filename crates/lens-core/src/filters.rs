//! Search filter parameters and the activity time window.

use serde::{Deserialize, Serialize};

use crate::constants::{COMMUNITY_REPO_LIMIT_MAX, PROFILE_REPO_LIMIT_MAX};

/// Filters applied to the profile, languages and community fetches.
/// The narrative fetch ignores these.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchFilters {
    pub repo_limit: u32,
    pub recent_months: u32,
    pub include_forks: bool,
    pub include_archived: bool,
}

impl Default for SearchFilters {
    fn default() -> Self {
        Self {
            repo_limit: 5,
            recent_months: 12,
            include_forks: false,
            include_archived: false,
        }
    }
}

impl SearchFilters {
    /// Repo limit clamped to what `/analyze` accepts.
    pub fn profile_limit(&self) -> u32 {
        self.repo_limit.min(PROFILE_REPO_LIMIT_MAX)
    }

    /// Repo limit clamped to what `/community` accepts.
    pub fn community_limit(&self) -> u32 {
        self.repo_limit.min(COMMUNITY_REPO_LIMIT_MAX)
    }

    /// Query pairs for the `/languages` and `/community` endpoints.
    pub fn query_pairs(&self, repo_limit: u32) -> Vec<(&'static str, String)> {
        vec![
            ("repo_limit", repo_limit.to_string()),
            ("recent_months", self.recent_months.to_string()),
            ("include_forks", self.include_forks.to_string()),
            ("include_archived", self.include_archived.to_string()),
        ]
    }
}

/// Activity lookback window. The backend only accepts these three values.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivityWindow {
    D30,
    D60,
    #[default]
    D90,
}

impl ActivityWindow {
    pub fn days(self) -> u32 {
        match self {
            ActivityWindow::D30 => 30,
            ActivityWindow::D60 => 60,
            ActivityWindow::D90 => 90,
        }
    }

    pub fn from_days(days: u32) -> Option<ActivityWindow> {
        match days {
            30 => Some(ActivityWindow::D30),
            60 => Some(ActivityWindow::D60),
            90 => Some(ActivityWindow::D90),
            _ => None,
        }
    }
}
