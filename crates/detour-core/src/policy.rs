//! Policy list snapshots.
//!
//! The force list is read far more often than it changes. Readers take an
//! `Arc` snapshot and classify against it; writers build a new list and swap
//! it in, so a classification in flight always sees one complete list.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::classifier::{classify, Classification};
use crate::pattern::Pattern;

/// Ordered, immutable list of force-list patterns.
///
/// Duplicates are tolerated; deduplication happens when the list is edited.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PolicyList {
    patterns: Vec<Pattern>,
}

impl PolicyList {
    /// Creates an empty policy list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a list from stored pattern strings, dropping empty entries.
    pub fn from_patterns<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .filter_map(|p| Pattern::parse(p.as_ref()))
            .collect();
        Self { patterns }
    }

    /// Returns the patterns in list order.
    pub fn patterns(&self) -> &[Pattern] {
        &self.patterns
    }

    /// Iterates over the patterns in list order.
    pub fn iter(&self) -> std::slice::Iter<'_, Pattern> {
        self.patterns.iter()
    }

    /// Number of patterns.
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// Returns true if the list has no patterns.
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Returns true if the URL is forced through the proxy by this list.
    pub fn is_forced(&self, url: &str) -> bool {
        classify(url, self).is_forced()
    }

    /// Returns the first pattern (in list order) matching the URL.
    pub fn first_match(&self, url: &str) -> Option<&Pattern> {
        match classify(url, self) {
            Classification::Forced(pattern) => Some(pattern),
            _ => None,
        }
    }
}

impl<'a> IntoIterator for &'a PolicyList {
    type Item = &'a Pattern;
    type IntoIter = std::slice::Iter<'a, Pattern>;

    fn into_iter(self) -> Self::IntoIter {
        self.patterns.iter()
    }
}

impl FromIterator<Pattern> for PolicyList {
    fn from_iter<T: IntoIterator<Item = Pattern>>(iter: T) -> Self {
        Self {
            patterns: iter.into_iter().collect(),
        }
    }
}

/// Copy-on-write cell holding the current policy snapshot.
#[derive(Debug, Default)]
pub struct PolicyCell {
    current: RwLock<Arc<PolicyList>>,
}

impl PolicyCell {
    /// Creates a cell holding the given list.
    pub fn new(list: PolicyList) -> Self {
        Self {
            current: RwLock::new(Arc::new(list)),
        }
    }

    /// Returns the current snapshot.
    ///
    /// The read lock is held only for the `Arc` clone.
    #[inline]
    pub fn snapshot(&self) -> Arc<PolicyList> {
        Arc::clone(&self.current.read())
    }

    /// Swaps in a new list and returns the previous snapshot.
    pub fn replace(&self, list: PolicyList) -> Arc<PolicyList> {
        std::mem::replace(&mut *self.current.write(), Arc::new(list))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_patterns_skips_empty() {
        let list = PolicyList::from_patterns(["example.com", "", "  ", "a.com/b"]);
        assert_eq!(list.len(), 2);
        assert_eq!(list.patterns()[0].as_str(), "example.com");
        assert_eq!(list.patterns()[1].as_str(), "a.com/b");
    }

    #[test]
    fn duplicates_are_tolerated() {
        let list = PolicyList::from_patterns(["example.com", "example.com"]);
        assert_eq!(list.len(), 2);
        assert!(list.is_forced("https://example.com/"));
    }

    #[test]
    fn first_match_follows_list_order() {
        let list = PolicyList::from_patterns(["example.com/feed", "example.com"]);
        let matched = list.first_match("https://example.com/feed/1").unwrap();
        assert_eq!(matched.as_str(), "example.com/feed");

        let matched = list.first_match("https://example.com/other").unwrap();
        assert_eq!(matched.as_str(), "example.com");
    }

    #[test]
    fn serde_is_a_plain_array() {
        let list = PolicyList::from_patterns(["a.com", "b.com/x"]);
        let json = serde_json::to_value(&list).unwrap();
        assert_eq!(json, serde_json::json!(["a.com", "b.com/x"]));
    }

    #[test]
    fn cell_snapshot_survives_replace() {
        let cell = PolicyCell::new(PolicyList::from_patterns(["old.com"]));
        let before = cell.snapshot();

        let previous = cell.replace(PolicyList::from_patterns(["new.com"]));

        assert!(Arc::ptr_eq(&before, &previous));
        assert!(before.is_forced("https://old.com/"));
        assert!(cell.snapshot().is_forced("https://new.com/"));
        assert!(!cell.snapshot().is_forced("https://old.com/"));
    }

    #[test]
    fn cell_default_is_empty() {
        let cell = PolicyCell::default();
        assert!(cell.snapshot().is_empty());
    }
}
