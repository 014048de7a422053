//! String interning for token spellings.
//!
//! Every token stores a [`StringId`] instead of an owned string. The interner
//! is owned by the token list; spellings are deduplicated so that equality of
//! frequently compared tokens (operators, keywords, common identifiers) is an
//! integer comparison and cloned template tokens share their spellings.

use ahash::AHashMap;

/// Index into the interner's storage.
///
/// Uses `u32` to save space (4 bytes vs 8 bytes for `usize`). This limits us
/// to ~4 billion unique spellings per translation unit, which is more than
/// sufficient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct StringId(u32);

impl StringId {
    /// Returns the raw index value.
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Deduplicating store of token spellings.
///
/// Interning is append-only: spellings are never removed, even when the
/// tokens that used them are unlinked, so a `StringId` stays valid for the
/// lifetime of the owning token list.
#[derive(Debug, Default)]
pub struct Interner {
    map: AHashMap<Box<str>, StringId>,
    strings: Vec<Box<str>>,
}

impl Interner {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Interns `s`, returning the id of the existing entry if present.
    pub fn intern(&mut self, s: &str) -> StringId {
        if let Some(&id) = self.map.get(s) {
            return id;
        }
        let id = StringId(u32::try_from(self.strings.len()).unwrap_or(u32::MAX));
        let boxed: Box<str> = s.into();
        self.strings.push(boxed.clone());
        self.map.insert(boxed, id);
        id
    }

    /// Returns the spelling for `id`.
    ///
    /// # Panics
    /// Panics if `id` was produced by a different interner.
    #[must_use]
    pub fn get(&self, id: StringId) -> &str {
        &self.strings[id.index()]
    }

    /// Returns the id for `s` without interning it.
    #[must_use]
    pub fn lookup(&self, s: &str) -> Option<StringId> {
        self.map.get(s).copied()
    }

    /// Number of distinct spellings interned so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intern_dedups() {
        let mut interner = Interner::new();
        let a = interner.intern("x");
        let b = interner.intern("y");
        let c = interner.intern("x");
        assert_eq!(a, c);
        assert_ne!(a, b);
        assert_eq!(interner.get(a), "x");
        assert_eq!(interner.get(b), "y");
        assert_eq!(interner.len(), 2);
    }

    #[test]
    fn lookup_does_not_insert() {
        let mut interner = Interner::new();
        assert_eq!(interner.lookup("z"), None);
        let id = interner.intern("z");
        assert_eq!(interner.lookup("z"), Some(id));
    }
}
