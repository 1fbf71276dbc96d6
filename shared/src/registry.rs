//! Registry of shared event rules
//!
//! Triggers, sessions and pending commands may all refer to the same rule.
//! The registry deduplicates structurally equal rules and hands out
//! [`Arc`] handles; it only keeps weak references itself, so a rule lives
//! as long as one of its holders does. A lookup that fails to upgrade means
//! the rule no longer exists.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, Weak};

use tracing::{debug, warn};

use crate::error::RuleError;
use crate::event_rule::EventRule;

pub type SharedEventRule = Arc<EventRule>;

#[derive(Debug, Default)]
pub struct RuleRegistry {
    buckets: RwLock<HashMap<u64, Vec<Weak<EventRule>>>>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Share `rule`, or return the live rule it is equal to.
    ///
    /// Filter bytecode must be generated before registering: registered
    /// rules are immutable.
    pub fn register(&self, rule: EventRule) -> Result<SharedEventRule, RuleError> {
        if !rule.validate() {
            warn!("Refusing to register invalid {} event rule", rule.kind());
            return Err(RuleError::Invalid);
        }

        let hash = rule.hash();
        let mut buckets = self.buckets.write().unwrap_or_else(PoisonError::into_inner);
        let bucket = buckets.entry(hash).or_default();
        bucket.retain(|entry| entry.strong_count() > 0);

        if let Some(existing) = find_equal(bucket, &rule) {
            debug!("Reusing registered {} event rule", rule.kind());
            return Ok(existing);
        }

        let shared = Arc::new(rule);
        bucket.push(Arc::downgrade(&shared));
        Ok(shared)
    }

    /// Live rule equal to `rule`, if any.
    pub fn lookup(&self, rule: &EventRule) -> Option<SharedEventRule> {
        let buckets = self.buckets.read().unwrap_or_else(PoisonError::into_inner);
        buckets
            .get(&rule.hash())
            .and_then(|bucket| find_equal(bucket, rule))
    }

    /// Number of live rules.
    pub fn len(&self) -> usize {
        let buckets = self.buckets.read().unwrap_or_else(PoisonError::into_inner);
        buckets
            .values()
            .flatten()
            .filter(|entry| entry.strong_count() > 0)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop entries whose rule is gone. Returns how many were removed.
    pub fn prune(&self) -> usize {
        let mut buckets = self.buckets.write().unwrap_or_else(PoisonError::into_inner);
        let mut removed = 0;
        buckets.retain(|_, bucket| {
            let before = bucket.len();
            bucket.retain(|entry| entry.strong_count() > 0);
            removed += before - bucket.len();
            !bucket.is_empty()
        });
        removed
    }
}

/// Upgrade a weak handle held outside the registry.
pub fn try_acquire(handle: &Weak<EventRule>) -> Option<SharedEventRule> {
    handle.upgrade()
}

fn find_equal(bucket: &[Weak<EventRule>], rule: &EventRule) -> Option<SharedEventRule> {
    bucket
        .iter()
        .filter_map(Weak::upgrade)
        .find(|candidate| **candidate == *rule)
}
