//! Complex character registry.
//!
//! Grapheme clusters that need more than one scalar (combining marks, ZWJ
//! emoji sequences, flags) do not fit in a cell's `code`. They are interned
//! here once and cells store the returned key with [`CellFlags::COMPLEX`] set.
//!
//! Keys are process-wide and never reused, so cells can be copied between
//! buffers and threads freely. The binary codec carries the strings alongside
//! the keys so a decoder in another process can re-intern them.
//!
//! [`CellFlags::COMPLEX`]: super::CellFlags::COMPLEX

use std::collections::HashMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

#[derive(Default)]
struct Registry {
    by_key: Vec<Arc<str>>,
    by_string: HashMap<Arc<str>, u32>,
}

fn registry() -> &'static RwLock<Registry> {
    static REGISTRY: OnceLock<RwLock<Registry>> = OnceLock::new();
    REGISTRY.get_or_init(|| RwLock::new(Registry::default()))
}

/// Return the key for `grapheme`, interning it on first use.
///
/// Keys start at 1 so that 0 keeps meaning "empty".
pub fn intern(grapheme: &str) -> u32 {
    if let Some(key) = key_of(grapheme) {
        return key;
    }
    let mut reg = registry().write().unwrap_or_else(PoisonError::into_inner);
    if let Some(&key) = reg.by_string.get(grapheme) {
        return key;
    }
    let shared: Arc<str> = Arc::from(grapheme);
    reg.by_key.push(Arc::clone(&shared));
    let key = u32::try_from(reg.by_key.len()).unwrap_or(u32::MAX);
    reg.by_string.insert(shared, key);
    key
}

/// The key of `grapheme` if it was interned before. Never interns.
pub fn key_of(grapheme: &str) -> Option<u32> {
    let reg = registry().read().unwrap_or_else(PoisonError::into_inner);
    reg.by_string.get(grapheme).copied()
}

/// Look up the grapheme stored under `key`.
pub fn lookup(key: u32) -> Option<Arc<str>> {
    let index = usize::try_from(key).ok()?.checked_sub(1)?;
    let reg = registry().read().unwrap_or_else(PoisonError::into_inner);
    reg.by_key.get(index).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_is_stable() {
        let a = intern("a\u{300}");
        let b = intern("a\u{300}");
        assert_eq!(a, b);
        assert_ne!(a, 0);
        assert_eq!(lookup(a).as_deref(), Some("a\u{300}"));
    }

    #[test]
    fn test_distinct_keys() {
        let a = intern("🇫🇷");
        let b = intern("🇩🇪");
        assert_ne!(a, b);
    }

    #[test]
    fn test_key_of_does_not_intern() {
        assert_eq!(key_of("o\u{302}\u{323}"), None);
        assert_eq!(key_of("o\u{302}\u{323}"), None);
        let key = intern("o\u{302}\u{323}");
        assert_eq!(key_of("o\u{302}\u{323}"), Some(key));
    }

    #[test]
    fn test_unknown_key() {
        assert_eq!(lookup(0), None);
        assert_eq!(lookup(u32::MAX), None);
    }
}
