//! Who wrote an outgoing message: the assistant or a human at the desk.
//!
//! Ground truth is the automation pipeline's own generation log. Pattern
//! matching on known phrases is kept only for the degraded mode where that
//! log is unreachable; staff type similar sentences often enough that
//! patterns alone misattribute.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::config::MonitorConfig;
use crate::schema::{ChatLogRow, ChatRole};

/// Lowercase, collapse runs of whitespace, truncate to `max_len` chars.
/// The bound keeps comparisons cheap and tolerates upstream truncation.
pub fn fingerprint(text: &str, max_len: usize) -> String {
    let collapsed = text
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    collapsed.chars().take(max_len).collect()
}

/// Either side may have been truncated by a different system, so a match
/// is a prefix relation in either direction. Empty never matches.
pub fn fingerprints_match(a: &str, b: &str) -> bool {
    !a.is_empty() && !b.is_empty() && (a.starts_with(b) || b.starts_with(a))
}

/// Immutable snapshot of assistant-authored fingerprints per contact.
/// Staleness is a pure function of `now - built_at`; callers rebuild and
/// swap whole snapshots, never mutate one. Two racing rebuilds produce the
/// same snapshot, so no lock is needed around the rebuild itself.
#[derive(Debug)]
pub struct AttributionIndex {
    built_at: Instant,
    by_contact: HashMap<String, Vec<String>>,
}

impl AttributionIndex {
    pub fn build(rows: &[ChatLogRow], fingerprint_len: usize, now: Instant) -> Self {
        let mut by_contact: HashMap<String, Vec<String>> = HashMap::new();
        for row in rows {
            if row.role() != Some(ChatRole::Assistant) {
                continue;
            }
            let fp = fingerprint(&row.message, fingerprint_len);
            if fp.is_empty() {
                continue;
            }
            let entry = by_contact.entry(row.phone.clone()).or_default();
            if !entry.contains(&fp) {
                entry.push(fp);
            }
        }
        Self {
            built_at: now,
            by_contact,
        }
    }

    pub fn is_stale(&self, now: Instant, ttl: Duration) -> bool {
        now.duration_since(self.built_at) > ttl
    }

    pub fn contact_fingerprints(&self, contact_key: &str) -> Option<&[String]> {
        self.by_contact.get(contact_key).map(Vec::as_slice)
    }
}

/// Classify an outgoing message. Incoming messages are never automated and
/// must not be passed here.
pub fn is_automated(
    text: &str,
    contact_key: &str,
    index: Option<&AttributionIndex>,
    config: &MonitorConfig,
) -> bool {
    let fp = fingerprint(text, config.fingerprint_len);
    if fp.is_empty() {
        return false;
    }

    if let Some(index) = index
        && let Some(known) = index.contact_fingerprints(contact_key)
    {
        return known.iter().any(|k| fingerprints_match(&fp, k));
    }

    // degraded mode: no log entries for this contact
    let lowered = text.to_lowercase();
    config
        .assistant_phrases
        .iter()
        .any(|phrase| lowered.contains(phrase))
}
