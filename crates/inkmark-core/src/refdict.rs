use crate::label::normalize_link_id;
use std::collections::HashMap;

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct RefEntry {
    pub uri: String,
    /// Empty when the definition carried no title.
    pub title: String,
}

/// Reference-link definitions, keyed by normalised identifier. Written by
/// the line tokenizer, read-only afterwards.
#[derive(Debug, Default)]
pub(crate) struct RefDict {
    entries: HashMap<String, RefEntry>,
}

impl RefDict {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last definition of an identifier wins. `id` is already normalised;
    /// the tokenizer normalises once and also screens reserved identifiers.
    pub fn insert(&mut self, id: String, uri: String, title: String) {
        self.entries.insert(id, RefEntry { uri, title });
    }

    /// Looks up raw identifier text; normalisation happens here so callers
    /// pass the slice straight from the source.
    pub fn get(&self, raw_id: &str) -> Option<&RefEntry> {
        self.entries.get(&normalize_link_id(raw_id))
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
