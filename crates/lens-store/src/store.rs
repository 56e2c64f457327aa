//! Persistent preferences and the TTL'd narrative cache.
//!
//! The public surface never returns an error: a failed read degrades to
//! "no preference / empty cache" and a failed write is logged and dropped.
//! The UI must keep working with a broken or missing store underneath.

use std::env;
use std::path::{Path, PathBuf};

use rusqlite::{Connection, OptionalExtension, params};

use lens_core::{ActivityWindow, Locale, Narrative, cache_is_fresh, now_unix_ms, push_recent};

use crate::error::{Result, StoreError};
use crate::schema;

const KEY_API_BASE_URL: &str = "api_base_url";
const KEY_ACTIVITY_WINDOW: &str = "activity_window_days";
const KEY_RECENT_SUBJECTS: &str = "recent_subjects";

#[derive(Debug)]
pub struct PrefStore {
    conn: Connection,
}

/// Base directory for gh-lens data.
/// Priority: GHLENS_DATA_DIR env > ~/.gh-lens
pub fn default_base_dir() -> PathBuf {
    if let Some(dir) = env::var("GHLENS_DATA_DIR").ok().filter(|d| !d.is_empty()) {
        return PathBuf::from(dir);
    }
    env::var("HOME")
        .or_else(|_| env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(".gh-lens")
}

impl PrefStore {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }

    /// Open `prefs.db` under the default base directory, creating it as
    /// needed.
    pub fn open_default() -> Result<Self> {
        let base = default_base_dir();
        std::fs::create_dir_all(&base).map_err(|source| StoreError::DataDir {
            path: base.clone(),
            source,
        })?;
        Self::open(&base.join("prefs.db"))
    }

    // --- Fallible key-value layer ---

    fn get_pref(&self, key: &str) -> Result<Option<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT value FROM preferences WHERE key = ?1")?;
        let value = stmt.query_row([key], |row| row.get(0)).optional()?;
        Ok(value)
    }

    fn set_pref(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO preferences (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    // --- Preferences (swallowing surface) ---

    pub fn api_base_url(&self) -> Option<String> {
        swallow("read api_base_url", self.get_pref(KEY_API_BASE_URL)).flatten()
    }

    pub fn set_api_base_url(&self, url: &str) {
        log_failure("write api_base_url", self.set_pref(KEY_API_BASE_URL, url));
    }

    pub fn activity_window(&self) -> Option<ActivityWindow> {
        swallow("read activity_window", self.get_pref(KEY_ACTIVITY_WINDOW))
            .flatten()
            .and_then(|days| days.parse::<u32>().ok())
            .and_then(ActivityWindow::from_days)
    }

    pub fn set_activity_window(&self, window: ActivityWindow) {
        log_failure(
            "write activity_window",
            self.set_pref(KEY_ACTIVITY_WINDOW, &window.days().to_string()),
        );
    }

    pub fn recent_subjects(&self) -> Vec<String> {
        swallow("read recent_subjects", self.get_pref(KEY_RECENT_SUBJECTS))
            .flatten()
            .and_then(|json| serde_json::from_str(&json).ok())
            .unwrap_or_default()
    }

    /// Push a subject to the front of the recent list and persist the
    /// updated list immediately.
    pub fn record_recent_subject(&self, subject: &str) {
        let updated = push_recent(&self.recent_subjects(), subject);
        match serde_json::to_string(&updated) {
            Ok(json) => log_failure(
                "write recent_subjects",
                self.set_pref(KEY_RECENT_SUBJECTS, &json),
            ),
            Err(e) => tracing::warn!("pref store: serialize recent_subjects failed: {e}"),
        }
    }

    // --- Narrative cache ---

    pub fn cached_narrative(&self, subject: &str, locale: Locale) -> Option<Narrative> {
        self.cached_narrative_at(subject, locale, now_unix_ms())
    }

    /// TTL check against an explicit clock. A stale or unparsable entry is
    /// treated as absent and deleted best-effort to reclaim space.
    fn cached_narrative_at(&self, subject: &str, locale: Locale, now_ms: u64) -> Option<Narrative> {
        let row = swallow(
            "read narrative cache",
            self.try_cached_row(subject, locale),
        )
        .flatten();
        let (payload, written_at_ms) = row?;

        if !cache_is_fresh(written_at_ms, now_ms) {
            self.evict_narrative(subject, locale);
            return None;
        }

        match serde_json::from_str(&payload) {
            Ok(narrative) => Some(narrative),
            Err(e) => {
                tracing::warn!("pref store: corrupt narrative cache entry: {e}");
                self.evict_narrative(subject, locale);
                None
            }
        }
    }

    fn try_cached_row(&self, subject: &str, locale: Locale) -> Result<Option<(String, u64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT payload, written_at_ms FROM narrative_cache
             WHERE subject = ?1 AND locale = ?2",
        )?;
        let row = stmt
            .query_row(params![subject, locale.as_str()], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
            })
            .optional()?;
        Ok(row)
    }

    pub fn set_cached_narrative(&self, subject: &str, locale: Locale, narrative: &Narrative) {
        self.set_cached_narrative_at(subject, locale, narrative, now_unix_ms());
    }

    fn set_cached_narrative_at(
        &self,
        subject: &str,
        locale: Locale,
        narrative: &Narrative,
        now_ms: u64,
    ) {
        let payload = match serde_json::to_string(narrative) {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!("pref store: serialize narrative failed: {e}");
                return;
            }
        };
        let result = self
            .conn
            .execute(
                "INSERT OR REPLACE INTO narrative_cache (subject, locale, payload, written_at_ms)
                 VALUES (?1, ?2, ?3, ?4)",
                params![subject, locale.as_str(), payload, now_ms as i64],
            )
            .map(|_| ());
        log_failure("write narrative cache", result.map_err(StoreError::from));
    }

    fn evict_narrative(&self, subject: &str, locale: Locale) {
        let result = self
            .conn
            .execute(
                "DELETE FROM narrative_cache WHERE subject = ?1 AND locale = ?2",
                params![subject, locale.as_str()],
            )
            .map(|_| ());
        log_failure("evict narrative cache", result.map_err(StoreError::from));
    }

    pub fn clear_narrative_cache(&self) {
        let result = self
            .conn
            .execute("DELETE FROM narrative_cache", [])
            .map(|_| ());
        log_failure("clear narrative cache", result.map_err(StoreError::from));
    }
}

/// Log-and-drop for store write failures.
fn log_failure(what: &str, result: Result<()>) {
    if let Err(e) = result {
        tracing::warn!("pref store: {what} failed: {e}");
    }
}

/// Log-and-drop for store read failures: the caller sees None.
fn swallow<T>(what: &str, result: Result<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!("pref store: {what} failed: {e}");
            None
        }
    }
}
