use std::fmt;

/// An interned identifier.
///
/// Wraps `lalrpop_intern`'s global string table, the same interner chalk
/// uses for its own `Identifier` type (`chalk_ir::Identifier =
/// lalrpop_intern::InternedString`). Symbols are `Copy` and compare by the
/// interned key, not by string content, so cloning a `Rule` or `Expr` never
/// touches the heap.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(lalrpop_intern::InternedString);

impl Symbol {
    pub fn intern(name: &str) -> Symbol {
        Symbol(lalrpop_intern::intern(name))
    }

    pub fn as_str(self) -> &'static str {
        self.0.as_str()
    }

    /// The distinguished symbol naming a k-variable's implicit argument
    /// position (§3 "vv").
    pub fn vv() -> Symbol {
        Symbol::intern("vv")
    }

    pub fn is_vv(self) -> bool {
        self == Symbol::vv()
    }

    /// The seed symbol used when materializing a substitution atom
    /// (§4.2 "Substitution materialization").
    pub fn sub_seed() -> Symbol {
        Symbol::intern("SUB")
    }

    /// Suffixes this symbol with a numeric rename counter, e.g. `x` with
    /// counter 3 becomes `x@3`. This is the renamer's only way of minting
    /// new symbols, so every fresh symbol round-trips through
    /// `split_suffix`.
    pub fn suffixed(self, counter: usize) -> Symbol {
        Symbol::intern(&format!("{}@{}", self.as_str(), counter))
    }

    /// If this symbol was produced by `suffixed`, returns the base symbol
    /// it was derived from and the counter used. Used by
    /// `seed_rename_counters` (the "Rename seeding" open question, §9) to
    /// find the highest suffix already present in an input so freshly
    /// generated symbols never collide with it.
    pub fn split_suffix(self) -> Option<(Symbol, usize)> {
        let s = self.as_str();
        let at = s.rfind('@')?;
        let (base, rest) = s.split_at(at);
        let counter: usize = rest[1..].parse().ok()?;
        Some((Symbol::intern(base), counter))
    }

    /// True if this symbol's text parses as an integer literal. Backs the
    /// "Numberification heuristic" open question (§9): upstream encodes
    /// integer constants as symbol names at some point before this
    /// pipeline sees them, and solution extraction (§4.6 step 3) must
    /// reverse that.
    pub fn parses_as_integer(self) -> bool {
        self.as_str().parse::<i64>().is_ok()
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An unknown predicate variable ("k-variable"), interned the same way a
/// plain `Symbol` is; kept as a distinct type so `Rule`/`Query` heads can't
/// be confused with ordinary value symbols.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KVar(pub Symbol);

impl KVar {
    pub fn intern(name: &str) -> KVar {
        KVar(Symbol::intern(name))
    }

    pub fn as_str(self) -> &'static str {
        self.0.as_str()
    }
}

impl fmt::Debug for KVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for KVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
