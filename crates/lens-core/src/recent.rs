//! Recent-subjects list: most-recent-first, exact-match dedupe, capped.

use crate::constants::MAX_RECENT;

/// Insert `subject` at the front, dropping any prior occurrence
/// (case-sensitive exact match) and truncating to `MAX_RECENT`.
pub fn push_recent(list: &[String], subject: &str) -> Vec<String> {
    let mut updated = Vec::with_capacity(MAX_RECENT);
    updated.push(subject.to_string());
    updated.extend(list.iter().filter(|s| s.as_str() != subject).cloned());
    updated.truncate(MAX_RECENT);
    updated
}
