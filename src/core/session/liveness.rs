//! Last-activity registry for session containers
//!
//! Keyed by safe session name. The front-end records a ping on every
//! proxied request; the maintenance sweep reads the registry to decide
//! idle shutdowns and reconciles it against the observed container set
//! at the end of each pass.

use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, PoisonError};

#[derive(Debug, Default)]
pub struct LivenessRegistry {
    pings: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl LivenessRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_ping(&self, session: &str) {
        self.record_ping_at(session, Utc::now());
    }

    /// Record a ping with an explicit timestamp. Also used by the sweep
    /// when it discovers a running container with no entry.
    pub fn record_ping_at(&self, session: &str, when: DateTime<Utc>) {
        let mut pings = self.pings.lock().unwrap_or_else(PoisonError::into_inner);
        pings.insert(session.to_string(), when);
    }

    pub fn last_ping(&self, session: &str) -> Option<DateTime<Utc>> {
        let pings = self.pings.lock().unwrap_or_else(PoisonError::into_inner);
        pings.get(session).copied()
    }

    pub fn contains(&self, session: &str) -> bool {
        self.last_ping(session).is_some()
    }

    pub fn remove(&self, session: &str) {
        let mut pings = self.pings.lock().unwrap_or_else(PoisonError::into_inner);
        pings.remove(session);
    }

    /// Drop every entry whose session is not in `observed`.
    pub fn retain_names(&self, observed: &HashSet<String>) {
        let mut pings = self.pings.lock().unwrap_or_else(PoisonError::into_inner);
        pings.retain(|name, _| observed.contains(name));
    }

    pub fn names(&self) -> Vec<String> {
        let pings = self.pings.lock().unwrap_or_else(PoisonError::into_inner);
        pings.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_record_and_read_back() {
        let registry = LivenessRegistry::new();
        assert!(!registry.contains("u"));

        registry.record_ping("u");
        assert!(registry.contains("u"));
        assert!(registry.last_ping("u").is_some());
    }

    #[test]
    fn test_later_ping_overwrites() {
        let registry = LivenessRegistry::new();
        let old = Utc::now() - Duration::seconds(900);
        registry.record_ping_at("u", old);
        registry.record_ping("u");
        assert!(registry.last_ping("u").unwrap() > old);
    }

    #[test]
    fn test_retain_names_prunes_ghosts() {
        let registry = LivenessRegistry::new();
        registry.record_ping("alive");
        registry.record_ping("ghost");

        let observed: HashSet<String> = ["alive".to_string()].into_iter().collect();
        registry.retain_names(&observed);

        assert!(registry.contains("alive"));
        assert!(!registry.contains("ghost"));
    }

    #[test]
    fn test_remove() {
        let registry = LivenessRegistry::new();
        registry.record_ping("u");
        registry.remove("u");
        assert!(!registry.contains("u"));
    }
}
