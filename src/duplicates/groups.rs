//! Grouping of messages by fingerprint.
//!
//! # Overview
//!
//! Messages of one folder are grouped by their [`Fingerprint`]. Members keep
//! the order in which they were added (the store's enumeration order), and
//! groups keep the order in which their fingerprint was first seen, so the
//! result is deterministic for a given listing.
//!
//! In a group of two or more, the first member is the survivor and every
//! other member is a removal candidate.
//!
//! # Example
//!
//! ```
//! use maildupe::duplicates::group_by_fingerprint;
//! use maildupe::scanner::Fingerprint;
//!
//! let hello = Fingerprint::from_bytes([1; 32]);
//! let world = Fingerprint::from_bytes([2; 32]);
//!
//! let (groups, stats) = group_by_fingerprint(vec![
//!     (hello, "m1"),
//!     (hello, "m2"),
//!     (world, "m3"),
//!     (world, "m4"),
//! ]);
//!
//! assert_eq!(groups.len(), 2);
//! assert_eq!(groups[0].survivor(), Some(&"m1"));
//! assert_eq!(groups[1].candidates(), &["m4"]);
//! assert_eq!(stats.candidates, 2);
//! ```

use std::collections::HashMap;

use crate::scanner::Fingerprint;

/// Messages sharing one fingerprint, in enumeration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateGroup<T> {
    /// Fingerprint shared by all members
    pub fingerprint: Fingerprint,
    /// Members in enumeration order
    pub members: Vec<T>,
}

impl<T> DuplicateGroup<T> {
    /// Create an empty group.
    #[must_use]
    pub fn new(fingerprint: Fingerprint) -> Self {
        Self {
            fingerprint,
            members: Vec::new(),
        }
    }

    /// Number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Check if this group is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Check if this group holds duplicates (2+ members).
    #[must_use]
    pub fn has_duplicates(&self) -> bool {
        self.members.len() > 1
    }

    /// The member that is kept.
    #[must_use]
    pub fn survivor(&self) -> Option<&T> {
        self.members.first()
    }

    /// Members to remove (everything after the survivor).
    #[must_use]
    pub fn candidates(&self) -> &[T] {
        self.members.get(1..).unwrap_or(&[])
    }

    /// Split into the survivor and the candidates, taking ownership.
    #[must_use]
    pub fn into_parts(self) -> Option<(T, Vec<T>)> {
        let mut members = self.members.into_iter();
        let survivor = members.next()?;
        Some((survivor, members.collect()))
    }
}

/// Accumulates [`DuplicateGroup`]s in first-seen order.
#[derive(Debug)]
pub struct FingerprintGroups<T> {
    index: HashMap<Fingerprint, usize>,
    groups: Vec<DuplicateGroup<T>>,
}

impl<T> Default for FingerprintGroups<T> {
    fn default() -> Self {
        Self {
            index: HashMap::new(),
            groups: Vec::new(),
        }
    }
}

impl<T> FingerprintGroups<T> {
    /// Create an empty grouping.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a member to the group of `fingerprint`.
    pub fn insert(&mut self, fingerprint: Fingerprint, member: T) {
        let groups = &mut self.groups;
        let slot = *self.index.entry(fingerprint).or_insert_with(|| {
            groups.push(DuplicateGroup::new(fingerprint));
            groups.len() - 1
        });
        self.groups[slot].members.push(member);
    }

    /// Statistics over the current groups.
    #[must_use]
    pub fn stats(&self) -> GroupingStats {
        let mut stats = GroupingStats {
            unique_fingerprints: self.groups.len(),
            ..GroupingStats::default()
        };
        for group in &self.groups {
            stats.total_messages += group.len();
            if group.has_duplicates() {
                stats.duplicate_groups += 1;
                stats.candidates += group.len() - 1;
            }
        }
        stats
    }

    /// All groups, singletons included, in first-seen order.
    #[must_use]
    pub fn into_groups(self) -> Vec<DuplicateGroup<T>> {
        self.groups
    }
}

/// Statistics from fingerprint grouping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupingStats {
    /// Total number of messages grouped
    pub total_messages: usize,
    /// Number of distinct fingerprints
    pub unique_fingerprints: usize,
    /// Number of groups with 2+ members
    pub duplicate_groups: usize,
    /// Number of removal candidates (group size minus one, summed)
    pub candidates: usize,
}

/// Group members by fingerprint.
///
/// # Arguments
///
/// * `items` - `(fingerprint, member)` pairs in enumeration order
///
/// # Returns
///
/// A tuple of:
/// - `Vec<DuplicateGroup<T>>` - every group in first-seen order, singletons included
/// - `GroupingStats` - statistics about the grouping
#[must_use]
pub fn group_by_fingerprint<T>(
    items: impl IntoIterator<Item = (Fingerprint, T)>,
) -> (Vec<DuplicateGroup<T>>, GroupingStats) {
    let mut groups = FingerprintGroups::new();
    for (fingerprint, member) in items {
        groups.insert(fingerprint, member);
    }
    let stats = groups.stats();
    log::trace!(
        "Grouped {} messages into {} fingerprints ({} candidates)",
        stats.total_messages,
        stats.unique_fingerprints,
        stats.candidates
    );
    (groups.into_groups(), stats)
}
