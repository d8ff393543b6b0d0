//! Registry of entry names already committed to an output archive.
//!
//! The registry is the basis of first-writer-wins deduplication: an entry
//! name is copied only by the first archive that carries it. Names are never
//! removed.

use crate::descriptor::DESCRIPTOR_PATH;
use std::collections::HashSet;

/// Set of entry names written so far.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryRegistry {
    seen: HashSet<String>,
}

impl EntryRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry that already holds the reserved descriptor path, so
    /// no source archive's own descriptor is copied through verbatim.
    ///
    /// # Examples
    ///
    /// ```
    /// use uberjar::registry::EntryRegistry;
    ///
    /// let registry = EntryRegistry::seeded();
    /// assert!(registry.already_seen("META-INF/plexus/components.xml"));
    /// assert!(!registry.already_seen("a/b.class"));
    /// ```
    #[must_use]
    pub fn seeded() -> Self {
        let mut registry = Self::new();
        registry.record(DESCRIPTOR_PATH);
        registry
    }

    /// Return true if `name` has already been written.
    #[must_use]
    pub fn already_seen(&self, name: &str) -> bool {
        self.seen.contains(name)
    }

    /// Record `name` as written. Returns true when the name was new.
    pub fn record(&mut self, name: &str) -> bool {
        self.seen.insert(name.to_owned())
    }

    /// Number of names recorded, the reserved path included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// Return true if nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
