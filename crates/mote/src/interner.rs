// SPDX-License-Identifier: Apache-2.0
//! Per-operation string interning.

use std::sync::Arc;

use rustc_hash::FxHashSet;

/// Deduplicates decoded strings within a single deserialize call.
///
/// Interning applies to `Arc<str>` values: repeated occurrences of the
/// same text share one allocation instead of one per occurrence. Owned
/// `String` values are unaffected, since each must own its buffer anyway.
#[derive(Debug, Default)]
pub(crate) struct StringInterner {
    seen: FxHashSet<Arc<str>>,
}

impl StringInterner {
    /// Returns a shared allocation for `text`, reusing a previous one
    /// when the same text was interned before.
    pub(crate) fn intern(&mut self, text: &str) -> Arc<str> {
        if let Some(existing) = self.seen.get(text) {
            return Arc::clone(existing);
        }
        let fresh: Arc<str> = Arc::from(text);
        self.seen.insert(Arc::clone(&fresh));
        fresh
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_text_shares_one_allocation() {
        let mut interner = StringInterner::default();
        let a = interner.intern("tag");
        let b = interner.intern("tag");
        assert!(Arc::ptr_eq(&a, &b));
        let c = interner.intern("other");
        assert!(!Arc::ptr_eq(&a, &c));
    }
}
