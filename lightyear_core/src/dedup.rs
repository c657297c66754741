use serde::Deserialize;
use std::collections::HashSet;

/// Default period for [`DedupCache::after_attempt`].
pub const DEFAULT_CLEAR_THRESHOLD: u64 = 6324;

/// When the cache is bulk-cleared relative to the attempt counter.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ClearPolicy {
    /// Clear when `attempt % threshold == 0`.
    #[default]
    EveryNth,
    /// Clear when `attempt % threshold != 0`, i.e. on all but one attempt of
    /// every period. This keeps at most the single entry recorded on a
    /// multiple of the threshold.
    Literal,
}

/// The set of candidates already submitted and rejected during a run.
///
/// Entries are stored as MD5 digests so that memory per entry stays fixed
/// regardless of password length.
#[derive(Debug)]
pub struct DedupCache {
    known_hashes: HashSet<[u8; 16]>,
    policy: ClearPolicy,
    threshold: u64,
}

impl Default for DedupCache {
    fn default() -> Self {
        Self::new(ClearPolicy::default(), DEFAULT_CLEAR_THRESHOLD)
    }
}

impl DedupCache {
    /// `threshold` is clamped to at least 1.
    pub fn new(policy: ClearPolicy, threshold: u64) -> Self {
        Self {
            known_hashes: HashSet::new(),
            policy,
            threshold: threshold.max(1),
        }
    }

    pub fn contains(&self, candidate: &str) -> bool {
        self.known_hashes.contains(&md5::compute(candidate.as_bytes()).0)
    }

    /// Records `candidate`; returns `false` if it was already present.
    pub fn insert(&mut self, candidate: &str) -> bool {
        self.known_hashes.insert(md5::compute(candidate.as_bytes()).0)
    }

    pub fn clear(&mut self) {
        self.known_hashes.clear();
    }

    pub fn len(&self) -> usize {
        self.known_hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.known_hashes.is_empty()
    }

    pub fn policy(&self) -> ClearPolicy {
        self.policy
    }

    pub fn threshold(&self) -> u64 {
        self.threshold
    }

    /// Whether the periodic clear fires for the given attempt number.
    pub fn should_clear(&self, attempt: u64) -> bool {
        let on_boundary = attempt.is_multiple_of(self.threshold);
        match self.policy {
            ClearPolicy::EveryNth => on_boundary,
            ClearPolicy::Literal => !on_boundary,
        }
    }

    /// Applies the clearing policy after `attempt` has been recorded.
    /// Returns `true` if the cache was cleared.
    pub fn after_attempt(&mut self, attempt: u64) -> bool {
        if self.should_clear(attempt) {
            log::trace!(
                "Clearing dedup cache ({} entries) at attempt {attempt}",
                self.known_hashes.len()
            );
            self.clear();
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_contains_track_candidates() {
        let mut cache = DedupCache::default();
        assert!(cache.is_empty());
        assert!(!cache.contains("Password12!"));

        assert!(cache.insert("Password12!"));
        assert!(cache.contains("Password12!"));
        assert!(!cache.contains("Password13!"));
        assert!(!cache.insert("Password12!"), "Second insert is a duplicate");
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
        assert!(!cache.contains("Password12!"));
    }

    #[test]
    fn every_nth_policy_clears_only_on_multiples() {
        let mut cache = DedupCache::new(ClearPolicy::EveryNth, 3);
        cache.insert("a");
        assert!(!cache.after_attempt(1));
        cache.insert("b");
        assert!(!cache.after_attempt(2));
        assert_eq!(cache.len(), 2);
        cache.insert("c");
        assert!(cache.after_attempt(3));
        assert!(cache.is_empty());
        cache.insert("d");
        assert!(!cache.after_attempt(4));
        assert!(cache.contains("d"));
    }

    #[test]
    fn literal_policy_clears_on_all_but_multiples() {
        let mut cache = DedupCache::new(ClearPolicy::Literal, DEFAULT_CLEAR_THRESHOLD);
        for attempt in 1..DEFAULT_CLEAR_THRESHOLD {
            cache.insert(&format!("pw{attempt}"));
            assert!(cache.after_attempt(attempt));
            assert!(cache.is_empty());
        }
        cache.insert("kept");
        assert!(!cache.after_attempt(DEFAULT_CLEAR_THRESHOLD));
        assert!(cache.contains("kept"));
        assert!(cache.after_attempt(DEFAULT_CLEAR_THRESHOLD + 1));
    }

    #[test]
    fn zero_threshold_is_clamped() {
        let cache = DedupCache::new(ClearPolicy::EveryNth, 0);
        assert_eq!(cache.threshold(), 1);
        assert!(cache.should_clear(5));
    }
}
