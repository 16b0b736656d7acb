//! Conditional request evaluation (`If-Modified-Since`, `If-Unmodified-Since`, `If-Match`).
//!
//! HTTP dates only carry whole seconds, so stored timestamps are truncated to
//! the second before comparing.

use chrono::{DateTime, SubsecRound, Utc};

/// Freshness predicates supplied by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Preconditions {
    pub if_modified_since: Option<DateTime<Utc>>,
    pub if_unmodified_since: Option<DateTime<Utc>>,
    /// Entity tags from `If-Match`; `*` matches any existing resource.
    pub if_match: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Proceed,
    NotModified,
    PreconditionFailed(String),
}

/// Strong entity tag derived from a last-modified timestamp.
pub fn etag(last_updated: DateTime<Utc>) -> String {
    let nanos = last_updated
        .timestamp_nanos_opt()
        .unwrap_or_else(|| last_updated.timestamp_micros().saturating_mul(1_000));
    format!("\"v1-{}\"", to_base36(nanos))
}

fn to_base36(n: i64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".into();
    }
    let negative = n < 0;
    let mut v = n.unsigned_abs();
    let mut out = Vec::new();
    while v > 0 {
        out.push(DIGITS[(v % 36) as usize]);
        v /= 36;
    }
    if negative {
        out.push(b'-');
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}

fn normalize_tag(tag: &str) -> &str {
    tag.trim().trim_start_matches("W/")
}

impl Preconditions {
    pub fn is_empty(&self) -> bool {
        self.if_modified_since.is_none() && self.if_unmodified_since.is_none() && self.if_match.is_none()
    }

    /// Reads: only `If-Modified-Since` applies. `None` means there is nothing to compare against.
    pub fn evaluate_read(&self, last_modified: Option<DateTime<Utc>>) -> Decision {
        match (self.if_modified_since, last_modified) {
            (Some(since), Some(lm)) if lm.trunc_subsecs(0) <= since => Decision::NotModified,
            _ => Decision::Proceed,
        }
    }

    /// Writes against the stored timestamp; `current` is `None` when the resource does not exist yet.
    ///
    /// `If-Unmodified-Since` is ignored whenever `If-Match` is present.
    pub fn evaluate_write(&self, current: Option<DateTime<Utc>>) -> Decision {
        if let Some(tags) = &self.if_match {
            let Some(lu) = current else {
                return Decision::PreconditionFailed("If-Match given for a resource that does not exist".into());
            };
            let current_tag = etag(lu);
            let matched = tags
                .iter()
                .map(|t| normalize_tag(t))
                .any(|t| t == "*" || t == current_tag);
            return if matched {
                Decision::Proceed
            } else {
                Decision::PreconditionFailed("resource was modified: entity tag does not match".into())
            };
        }
        if let (Some(since), Some(lu)) = (self.if_unmodified_since, current) {
            if lu.trunc_subsecs(0) > since {
                return Decision::PreconditionFailed("resource was modified since the given time".into());
            }
        }
        Decision::Proceed
    }
}
