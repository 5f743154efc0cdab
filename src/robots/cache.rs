//! Per-site robots.txt cache
//!
//! Rules are kept by site origin and fetched again once they expire.

use crate::robots::ParsedRobots;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

/// Hours a fetched robots.txt stays valid
pub const ROBOTS_TTL_HOURS: i64 = 24;

/// Robots rules of one site with their expiry
#[derive(Debug, Clone)]
pub struct CachedRobots {
    pub rules: ParsedRobots,
    pub expires_at: DateTime<Utc>,
}

impl CachedRobots {
    pub fn new(rules: ParsedRobots) -> Self {
        Self {
            rules,
            expires_at: Utc::now() + Duration::hours(ROBOTS_TTL_HOURS),
        }
    }

    pub fn is_stale(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    pub fn is_allowed(&self, url: &str, user_agent: &str) -> bool {
        self.rules.is_allowed(url, user_agent)
    }
}

/// Robots rules by site origin, shared between concurrent checks
///
/// Two checks of the same site may both miss and fetch; the later insert
/// wins.
#[derive(Debug, Default)]
pub struct RobotsCache {
    sites: Mutex<HashMap<String, CachedRobots>>,
}

impl RobotsCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Unexpired rules of `origin`
    pub fn get(&self, origin: &str) -> Option<CachedRobots> {
        self.sites
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(origin)
            .filter(|cached| !cached.is_stale())
            .cloned()
    }

    /// Stores freshly fetched rules and returns the entry
    pub fn insert(&self, origin: impl Into<String>, rules: ParsedRobots) -> CachedRobots {
        let cached = CachedRobots::new(rules);
        self.sites
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(origin.into(), cached.clone());
        cached
    }

    /// Number of sites with cached rules, expired ones included
    pub fn len(&self) -> usize {
        self.sites
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORIGIN: &str = "http://x.test";

    #[test]
    fn test_insert_then_get() {
        let cache = RobotsCache::new();
        assert!(cache.get(ORIGIN).is_none());

        cache.insert(ORIGIN, ParsedRobots::disallow_all());
        let cached = cache.get(ORIGIN).unwrap();
        assert!(!cached.is_allowed("http://x.test/page", "TestBot"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_expired_entry_is_missed() {
        let cache = RobotsCache::new();
        cache.insert(ORIGIN, ParsedRobots::allow_all());
        {
            let mut sites = cache.sites.lock().unwrap();
            if let Some(entry) = sites.get_mut(ORIGIN) {
                entry.expires_at = Utc::now() - Duration::hours(1);
            }
        }
        assert!(cache.get(ORIGIN).is_none());
        assert!(!cache.is_empty());
    }

    #[test]
    fn test_fresh_entry_not_stale() {
        let cached = CachedRobots::new(ParsedRobots::allow_all());
        assert!(!cached.is_stale());
        assert!(cached.expires_at > Utc::now() + Duration::hours(ROBOTS_TTL_HOURS - 1));
    }
}
