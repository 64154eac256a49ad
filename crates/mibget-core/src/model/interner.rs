//! String interner for symbol names.
//!
//! Symbol and fragment names are short and heavily repeated across
//! fragments (the same name is often defined by several copies of a module),
//! so every string is deduplicated and the lookup table doubles as the
//! reverse index used by name lookup.

use super::ids::StrId;
use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;

/// Error returned when the interner has no more ids to hand out.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InternerFull;

/// Deduplicating string interner.
#[derive(Clone, Debug)]
pub struct StringInterner {
    /// Concatenated string data.
    data: String,
    /// Offsets into data for each string. offsets[i] is the start of string i.
    offsets: Vec<u32>,
    /// Reverse index from content to id.
    lookup: BTreeMap<String, StrId>,
}

impl Default for StringInterner {
    fn default() -> Self {
        Self::new()
    }
}

impl StringInterner {
    /// Create a new string interner.
    #[must_use]
    pub fn new() -> Self {
        Self {
            data: String::new(),
            offsets: alloc::vec![0],
            lookup: BTreeMap::new(),
        }
    }

    /// Intern a string, returning its identifier.
    ///
    /// # Errors
    ///
    /// Returns [`InternerFull`] when the id space or the `u32` offset space
    /// is exhausted.
    pub fn intern(&mut self, s: &str) -> Result<StrId, InternerFull> {
        if let Some(&id) = self.lookup.get(s) {
            return Ok(id);
        }

        let id = StrId::from_index(self.len()).ok_or(InternerFull)?;
        let end = u32::try_from(self.data.len() + s.len()).map_err(|_| InternerFull)?;
        self.data.push_str(s);
        self.offsets.push(end);
        self.lookup.insert(String::from(s), id);
        Ok(id)
    }

    /// Get a string by its identifier.
    ///
    /// Ids from another interner may panic or return unrelated text.
    #[must_use]
    pub fn get(&self, id: StrId) -> &str {
        let idx = id.to_index();
        let start = self.offsets[idx] as usize;
        let end = self.offsets[idx + 1] as usize;
        &self.data[start..end]
    }

    /// Find a string's ID if it has been interned.
    #[must_use]
    pub fn find(&self, s: &str) -> Option<StrId> {
        self.lookup.get(s).copied()
    }

    /// Get the total number of interned strings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.offsets.len() - 1
    }

    /// Check if the interner is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Decompose the interner into its raw parts for serialization.
    ///
    /// Returns `(data, offsets)` where `data` is the concatenated string buffer
    /// and `offsets[i]` is the start of string `i`.
    #[must_use]
    pub fn into_parts(self) -> (String, Vec<u32>) {
        (self.data, self.offsets)
    }

    /// Reconstruct an interner from raw parts, rebuilding the reverse index.
    ///
    /// Returns `None` if the offsets are not a valid, monotonic partition of
    /// `data` on character boundaries.
    #[must_use]
    pub fn from_parts(data: String, offsets: Vec<u32>) -> Option<Self> {
        if offsets.first() != Some(&0) || offsets.last().map(|&o| o as usize) != Some(data.len()) {
            return None;
        }
        let mut lookup = BTreeMap::new();
        for (idx, pair) in offsets.windows(2).enumerate() {
            let (start, end) = (pair[0] as usize, pair[1] as usize);
            let text = data.get(start..end)?;
            let id = StrId::from_index(idx)?;
            lookup.entry(String::from(text)).or_insert(id);
        }
        Some(Self {
            data,
            offsets,
            lookup,
        })
    }
}
