/// Validity window for cached AI narratives (24 hours, milliseconds)
pub const NARRATIVE_TTL_MS: u64 = 24 * 60 * 60 * 1000;

/// Maximum entries kept in the recent-subjects list
pub const MAX_RECENT: usize = 5;

/// Timeout budget for the four primary analytics calls (milliseconds)
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Timeout budget for the AI-narrative call — generation is slow (milliseconds)
pub const NARRATIVE_TIMEOUT_MS: u64 = 60_000;

/// Backend used when no base URL preference is stored
pub const DEFAULT_BASE_URL: &str = "https://github-recruiter.onrender.com";

/// Upper bound the backend accepts for the profile repo list
pub const PROFILE_REPO_LIMIT_MAX: u32 = 20;

/// Upper bound the backend accepts for the community repo scan
pub const COMMUNITY_REPO_LIMIT_MAX: u32 = 100;
