//! String interning.
//!
//! A [`Symbol`] is a 4-byte handle to an interned string. Interning the same
//! string twice yields the same handle, so identifier comparison throughout
//! the compiler is an integer comparison. Interned strings live for the
//! program's lifetime; the total is bounded by the size of the source file.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::LazyLock;

use dashmap::DashMap;

/// Keywords and names the compiler itself looks up, pre-interned so their
/// indices are stable across runs.
const SEED_SYMBOLS: &[&str] = &[
    "routine", "is", "end", "var", "type", "integer", "real", "boolean",
    "string", "array", "record", "if", "then", "else", "while", "loop",
    "for", "in", "reverse", "print", "and", "or", "xor", "not", "return",
    "ref", "true", "false", "main", "size", "temp",
];

/// Global interner storage.
///
/// Two maps are kept in sync: `by_value` answers "is this string interned?"
/// and `by_index` answers `as_str`. Strings are leaked to obtain `'static`
/// references; nothing is ever removed.
struct StringTable {
    by_value: DashMap<&'static str, u32, ahash::RandomState>,
    by_index: DashMap<u32, &'static str, ahash::RandomState>,
    next_index: AtomicU32,
}

impl StringTable {
    fn new() -> Self {
        let table = Self {
            by_value: DashMap::with_hasher(ahash::RandomState::new()),
            by_index: DashMap::with_hasher(ahash::RandomState::new()),
            next_index: AtomicU32::new(0),
        };
        for seed in SEED_SYMBOLS {
            table.intern(seed);
        }
        table
    }

    fn intern(&self, string: &str) -> u32 {
        if let Some(existing) = self.by_value.get(string) {
            return *existing;
        }

        let leaked: &'static str = Box::leak(string.to_string().into_boxed_str());
        let index = self.next_index.fetch_add(1, Ordering::Relaxed);

        // A racing intern of the same string may have won; keep the first
        // index so equal strings always compare equal.
        match self.by_value.entry(leaked) {
            dashmap::mapref::entry::Entry::Occupied(entry) => *entry.get(),
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                entry.insert(index);
                self.by_index.insert(index, leaked);
                index
            },
        }
    }

    fn resolve(&self, index: u32) -> &'static str {
        self.by_index
            .get(&index)
            .map(|entry| *entry)
            .expect("symbol index not in table")
    }
}

static STRING_TABLE: LazyLock<StringTable> = LazyLock::new(StringTable::new);

/// A handle to an interned string.
///
/// # Example
///
/// ```
/// use routc_util::Symbol;
///
/// let a = Symbol::intern("counter");
/// let b = Symbol::intern("counter");
/// assert_eq!(a, b);
/// assert_eq!(a.as_str(), "counter");
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(u32);

impl Symbol {
    /// Interns a string, returning its handle.
    pub fn intern(string: &str) -> Self {
        Symbol(STRING_TABLE.intern(string))
    }

    /// The interned string.
    pub fn as_str(&self) -> &'static str {
        STRING_TABLE.resolve(self.0)
    }

    /// Raw table index; useful only for debugging.
    pub fn index(&self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::fmt::Debug for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Symbol({:?})", self.as_str())
    }
}

static_assertions::assert_impl_all!(Symbol: Send, Sync, Copy);
static_assertions::assert_eq_size!(Symbol, u32);
