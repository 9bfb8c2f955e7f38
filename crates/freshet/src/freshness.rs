// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Freshness classification of stored entries.

use std::time::SystemTime;

use http::Method;

use crate::entry::CacheEntry;
use crate::policy::CachePolicy;

/// How a stored entry may be used for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// The entry may be served without contacting the origin.
    Fresh {
        /// `true` when the entry is past expiration but the staleness validator allowed it.
        served_stale: bool,
    },
    /// The entry must be revalidated with a conditional request.
    StaleRevalidatable,
    /// The entry cannot be used; the request must go to the origin unconditionally.
    StaleUnusable,
    /// There is no entry, or the method is not cacheable.
    NotApplicable,
}

/// Classifies `entry` for a `method` request at `now`.
///
/// Revalidation is forced when the entry carried `no-cache` or the policy sets
/// `must_revalidate`. Forced revalidation and the entry's own `must-revalidate` both
/// take precedence over the staleness validator.
///
/// # Examples
///
/// ```
/// use freshet::{CachePolicy, Freshness, classify};
/// use http::Method;
/// use std::time::SystemTime;
///
/// let policy = CachePolicy::default();
/// assert_eq!(classify(None, &Method::GET, SystemTime::now(), &policy), Freshness::NotApplicable);
/// ```
#[must_use]
pub fn classify(entry: Option<&CacheEntry>, method: &Method, now: SystemTime, policy: &CachePolicy) -> Freshness {
    let Some(entry) = entry else {
        return Freshness::NotApplicable;
    };
    if !policy.is_cacheable_method(method) {
        return Freshness::NotApplicable;
    }

    let forced = entry.no_cache() || *policy.must_revalidate().value();
    let expired = entry.is_expired(now);

    if !forced && !expired {
        return Freshness::Fresh { served_stale: false };
    }

    if !forced && !entry.must_revalidate() && policy.validators().staleness().allow_stale(entry, now) {
        return Freshness::Fresh { served_stale: true };
    }

    if entry.has_validator() {
        Freshness::StaleRevalidatable
    } else {
        Freshness::StaleUnusable
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::time::Duration;

    use bytes::Bytes;
    use http::{HeaderMap, StatusCode};

    use super::*;
    use crate::validators::GraceWindow;

    fn t0() -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000)
    }

    fn entry(cache_control: &str, etag: bool) -> CacheEntry {
        let mut headers = HeaderMap::new();
        headers.insert("cache-control", cache_control.parse().unwrap());
        if etag {
            headers.insert("etag", "\"v1\"".parse().unwrap());
        }
        CacheEntry::from_response(
            StatusCode::OK,
            &headers,
            Bytes::from_static(b"body"),
            t0(),
            Duration::ZERO,
            BTreeSet::new(),
            BTreeSet::new(),
        )
    }

    fn grace_policy() -> CachePolicy {
        CachePolicy::builder()
            .staleness_validator(GraceWindow::new(Duration::from_secs(30)))
            .build()
            .unwrap()
    }

    #[test]
    fn missing_entry_or_uncacheable_method_is_not_applicable() {
        let policy = CachePolicy::default();
        let e = entry("max-age=60", true);
        assert_eq!(classify(None, &Method::GET, t0(), &policy), Freshness::NotApplicable);
        assert_eq!(classify(Some(&e), &Method::POST, t0(), &policy), Freshness::NotApplicable);
    }

    #[test]
    fn unexpired_entry_is_fresh() {
        let e = entry("max-age=60", true);
        let at = t0() + Duration::from_secs(59);
        assert_eq!(
            classify(Some(&e), &Method::GET, at, &CachePolicy::default()),
            Freshness::Fresh { served_stale: false }
        );
    }

    #[test]
    fn expiration_boundary_is_stale() {
        let e = entry("max-age=60", true);
        let at = t0() + Duration::from_secs(60);
        assert_eq!(
            classify(Some(&e), &Method::GET, at, &CachePolicy::default()),
            Freshness::StaleRevalidatable
        );
    }

    #[test]
    fn expired_without_validator_is_unusable() {
        let e = entry("max-age=60", false);
        let at = t0() + Duration::from_secs(61);
        assert_eq!(
            classify(Some(&e), &Method::GET, at, &CachePolicy::default()),
            Freshness::StaleUnusable
        );
    }

    #[test]
    fn no_cache_forces_revalidation_while_fresh() {
        let e = entry("max-age=60, no-cache", true);
        assert_eq!(
            classify(Some(&e), &Method::GET, t0(), &CachePolicy::default()),
            Freshness::StaleRevalidatable
        );
    }

    #[test]
    fn policy_must_revalidate_forces_revalidation() {
        let policy = CachePolicy::builder().must_revalidate(true).build().unwrap();
        let e = entry("max-age=60", true);
        assert_eq!(classify(Some(&e), &Method::GET, t0(), &policy), Freshness::StaleRevalidatable);
    }

    #[test]
    fn staleness_validator_serves_within_grace() {
        let e = entry("max-age=60", false);
        let policy = grace_policy();

        assert_eq!(
            classify(Some(&e), &Method::GET, t0() + Duration::from_secs(70), &policy),
            Freshness::Fresh { served_stale: true }
        );
        assert_eq!(
            classify(Some(&e), &Method::GET, t0() + Duration::from_secs(95), &policy),
            Freshness::StaleUnusable
        );
    }

    #[test]
    fn must_revalidate_beats_staleness_validator() {
        let policy = CachePolicy::builder()
            .must_revalidate(true)
            .staleness_validator(GraceWindow::new(Duration::from_secs(30)))
            .build()
            .unwrap();
        let e = entry("max-age=60", true);

        assert_eq!(
            classify(Some(&e), &Method::GET, t0() + Duration::from_secs(70), &policy),
            Freshness::StaleRevalidatable
        );
    }

    #[test]
    fn entry_must_revalidate_beats_staleness_validator() {
        let e = entry("max-age=60, must-revalidate", true);
        assert_eq!(
            classify(Some(&e), &Method::GET, t0() + Duration::from_secs(70), &grace_policy()),
            Freshness::StaleRevalidatable
        );
    }
}
