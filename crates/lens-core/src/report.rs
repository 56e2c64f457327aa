//! Wire types for the five analytics endpoints.
//!
//! Field names follow the backend's JSON exactly. Every field that the
//! backend may omit or null out is either `Option` or `#[serde(default)]`,
//! so a partially filled response still deserializes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// `/analyze` — profile summary plus top repositories.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProfileReport {
    pub user: GitHubUser,
    #[serde(default)]
    pub repos: Vec<Repository>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GitHubUser {
    pub login: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub followers: u64,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub html_url: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Repository {
    pub name: String,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default)]
    pub stargazers_count: u64,
    #[serde(default)]
    pub forks_count: u64,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub pushed_at: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// `/languages` — byte-weighted language distribution over recent repos.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LanguageReport {
    /// Language name to byte count. BTreeMap keeps iteration deterministic.
    #[serde(default)]
    pub languages: BTreeMap<String, u64>,
    #[serde(default)]
    pub total_bytes: u64,
    #[serde(default)]
    pub repo_count: u32,
    #[serde(default)]
    pub skipped_forks: u32,
    #[serde(default)]
    pub skipped_archived: u32,
    #[serde(default)]
    pub skipped_old: u32,
}

/// `/community` — per-repository popularity/governance scoring.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CommunityReport {
    #[serde(default)]
    pub repos: Vec<CommunityRepo>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CommunityRepo {
    pub full_name: String,
    #[serde(default)]
    pub stars: u64,
    #[serde(default)]
    pub forks: u64,
    #[serde(default)]
    pub watchers: u64,
    #[serde(default)]
    pub pushed_at: Option<String>,
    /// 0..=100 composite score
    #[serde(default)]
    pub community_score: u32,
    /// "green" | "yellow" | "red"
    #[serde(default)]
    pub traffic_light: Option<String>,
    #[serde(default)]
    pub breakdown: Option<ScoreBreakdown>,
    /// Governance checklist (readme, license, contributing, ...) to pass/fail
    #[serde(default)]
    pub checks: BTreeMap<String, bool>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    #[serde(default)]
    pub popularity_0_70: f64,
    #[serde(default)]
    pub governance_scaled_0_30: f64,
}

/// `/activity` — event KPIs over a 30/60/90-day window.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActivityReport {
    #[serde(default)]
    pub window_days: u32,
    pub kpis: ActivityKpis,
    pub all_categories: CategoryBreakdown,
    #[serde(default)]
    pub top_collabs: Vec<Collaborator>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActivityKpis {
    /// None when the profile has no public events at all
    #[serde(default)]
    pub last_active_days_ago: Option<i64>,
    #[serde(default)]
    pub active_weeks_12w: u32,
    #[serde(default)]
    pub external_ratio_pct: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryBreakdown {
    #[serde(default)]
    pub total_events: u64,
    #[serde(default)]
    pub build: CategoryShare,
    #[serde(default)]
    pub review: CategoryShare,
    #[serde(default)]
    pub feedback: CategoryShare,
    #[serde(default)]
    pub explore: CategoryShare,
    #[serde(default)]
    pub release: CategoryShare,
    #[serde(default)]
    pub admin: CategoryShare,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryShare {
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub pct_total: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Collaborator {
    pub repo: String,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default)]
    pub prs: u32,
    #[serde(default)]
    pub reviews: u32,
    #[serde(default)]
    pub issues: u32,
    /// ISO date of the most recent interaction
    #[serde(default)]
    pub last: Option<String>,
}

/// `/ai-analysis` — free-text recruiter narrative.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Narrative {
    pub analysis: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub generated_at: Option<String>,
}
