//! Cacheability metadata attached to occurrences.
//!
//! Callers that render or store derived output use this bag to decide when
//! that output must be invalidated. Every transformation in the crate merges
//! metadata explicitly through [`CacheableMetadata::merge`].

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// How long derived output may be cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaxAge {
    /// Cache until one of the tags is invalidated.
    #[default]
    Permanent,
    /// Cache for at most this many seconds.
    Seconds(u32),
}

impl MaxAge {
    /// The stricter of two max-ages. Permanent only survives when both sides
    /// are permanent.
    pub fn min(self, other: MaxAge) -> MaxAge {
        match (self, other) {
            (MaxAge::Permanent, other) => other,
            (this, MaxAge::Permanent) => this,
            (MaxAge::Seconds(a), MaxAge::Seconds(b)) => MaxAge::Seconds(a.min(b)),
        }
    }
}

/// Cache tags, cache contexts and a max-age.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CacheableMetadata {
    #[serde(default)]
    tags: BTreeSet<String>,
    #[serde(default)]
    contexts: BTreeSet<String>,
    #[serde(default)]
    max_age: MaxAge,
}

impl CacheableMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(String::as_str)
    }

    pub fn contexts(&self) -> impl Iterator<Item = &str> {
        self.contexts.iter().map(String::as_str)
    }

    pub fn max_age(&self) -> MaxAge {
        self.max_age
    }

    pub fn add_tags<I, S>(&mut self, tags: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    pub fn add_contexts<I, S>(&mut self, contexts: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.contexts.extend(contexts.into_iter().map(Into::into));
        self
    }

    /// Lower the max-age to `max_age` if it is stricter than the current one.
    pub fn merge_max_age(&mut self, max_age: MaxAge) -> &mut Self {
        self.max_age = self.max_age.min(max_age);
        self
    }

    /// Union of tags and contexts, minimum of max-ages.
    pub fn merge(&self, other: &CacheableMetadata) -> CacheableMetadata {
        let mut merged = self.clone();
        merged.merge_from(other);
        merged
    }

    /// In-place form of [`CacheableMetadata::merge`].
    pub fn merge_from(&mut self, other: &CacheableMetadata) {
        self.tags.extend(other.tags.iter().cloned());
        self.contexts.extend(other.contexts.iter().cloned());
        self.max_age = self.max_age.min(other.max_age);
    }

    /// Fold the metadata of every item into one bag.
    pub fn collect<'a, I>(items: I) -> CacheableMetadata
    where
        I: IntoIterator<Item = &'a CacheableMetadata>,
    {
        items
            .into_iter()
            .fold(CacheableMetadata::default(), |acc, m| acc.merge(m))
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty() && self.contexts.is_empty() && self.max_age == MaxAge::Permanent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permanent_only_when_both_permanent() {
        assert_eq!(MaxAge::Permanent.min(MaxAge::Permanent), MaxAge::Permanent);
        assert_eq!(MaxAge::Permanent.min(MaxAge::Seconds(60)), MaxAge::Seconds(60));
        assert_eq!(MaxAge::Seconds(60).min(MaxAge::Permanent), MaxAge::Seconds(60));
        assert_eq!(MaxAge::Seconds(0).min(MaxAge::Seconds(60)), MaxAge::Seconds(0));
    }

    #[test]
    fn merge_unions_tags_and_contexts() {
        let mut a = CacheableMetadata::new();
        a.add_tags(["hello"]).add_contexts(["user.roles"]).merge_max_age(MaxAge::Seconds(1337));
        let mut b = CacheableMetadata::new();
        b.add_tags(["world", "hello"]).merge_max_age(MaxAge::Seconds(60));

        let merged = a.merge(&b);
        assert_eq!(merged.tags().collect::<Vec<_>>(), vec!["hello", "world"]);
        assert_eq!(merged.contexts().collect::<Vec<_>>(), vec!["user.roles"]);
        assert_eq!(merged.max_age(), MaxAge::Seconds(60));
    }

    #[test]
    fn collect_of_nothing_is_empty() {
        assert!(CacheableMetadata::collect(std::iter::empty()).is_empty());
    }
}
