// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Normalized, deduplicated, sorted tag collection.
//!
//! Normalization mirrors the source system's tag manager: trim, lowercase,
//! drop characters outside `[a-z0-9-_:/.]`, drop empties, dedupe, sort.

use serde::{Deserialize, Serialize};

const ALLOWED_EXTRA: &[char] = &['-', '_', ':', '/', '.'];

/// A normalized set of tags, always stored sorted and deduplicated.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TagSet(Vec<String>);

impl TagSet {
    /// Build a `TagSet` from caller-supplied raw tag strings.
    pub fn from_raw<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut normalized: Vec<String> = tags
            .into_iter()
            .map(|t| Self::normalize_one(t.as_ref()))
            .filter(|t| !t.is_empty())
            .collect();
        normalized.sort();
        normalized.dedup();
        Self(normalized)
    }

    fn normalize_one(tag: &str) -> String {
        tag.trim()
            .to_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || ALLOWED_EXTRA.contains(c))
            .collect()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn into_vec(self) -> Vec<String> {
        self.0
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        // Re-normalizing an already-normalized set is a no-op: the tag
        // manager's normalize/dedupe/sort pass has no second effect.
        #[test]
        fn normalization_is_idempotent(raw in proptest::collection::vec(".*", 0..16)) {
            let once = TagSet::from_raw(raw);
            let twice = TagSet::from_raw(once.as_slice().to_vec());
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn output_is_always_sorted_and_deduped(raw in proptest::collection::vec(".*", 0..16)) {
            let tags = TagSet::from_raw(raw);
            let mut sorted = tags.as_slice().to_vec();
            sorted.sort();
            sorted.dedup();
            prop_assert_eq!(tags.as_slice().to_vec(), sorted);
        }

        #[test]
        fn every_output_tag_only_contains_allowed_characters(raw in proptest::collection::vec(".*", 0..16)) {
            let tags = TagSet::from_raw(raw);
            for tag in tags.as_slice() {
                prop_assert!(tag.chars().all(|c| c.is_ascii_alphanumeric() || ALLOWED_EXTRA.contains(&c)));
                prop_assert_eq!(tag.clone(), tag.to_lowercase());
            }
        }
    }
}
