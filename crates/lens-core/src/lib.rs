//! Core logic for gh-lens, a GitHub-profile analytics client.
//!
//! Holds the closed API error taxonomy, the wire types for the five
//! analytics endpoints, and the result-slot state machine with its
//! generation guard against out-of-order completions.
//!
//! Zero I/O — pure types and transitions with no opinions about transport
//! or persistence.

pub mod constants;
pub mod error;
pub mod filters;
pub mod locale;
pub mod recent;
pub mod report;
pub mod search;
pub mod slot;
pub mod time;

pub use constants::{
    DEFAULT_BASE_URL, DEFAULT_TIMEOUT_MS, MAX_RECENT, NARRATIVE_TIMEOUT_MS, NARRATIVE_TTL_MS,
};
pub use error::ApiError;
pub use filters::{ActivityWindow, SearchFilters};
pub use locale::Locale;
pub use recent::push_recent;
pub use report::{
    ActivityKpis, ActivityReport, CategoryBreakdown, CategoryShare, Collaborator, CommunityRepo,
    CommunityReport, GitHubUser, LanguageReport, Narrative, ProfileReport, Repository,
    ScoreBreakdown,
};
pub use search::{FetchOutcome, SearchState, SlotKind};
pub use slot::Slot;
pub use time::{cache_is_fresh, now_unix_ms};
