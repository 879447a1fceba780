use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashSet;

use crate::sort::Sort;
use crate::symbol::{KVar, Symbol};

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl ArithOp {
    pub fn as_str(self) -> &'static str {
        match self {
            ArithOp::Add => "+",
            ArithOp::Sub => "-",
            ArithOp::Mul => "*",
            ArithOp::Div => "/",
            ArithOp::Mod => "mod",
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum RelOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl RelOp {
    pub fn as_str(self) -> &'static str {
        match self {
            RelOp::Eq => "=",
            RelOp::Ne => "distinct",
            RelOp::Lt => "<",
            RelOp::Le => "<=",
            RelOp::Gt => ">",
            RelOp::Ge => ">=",
        }
    }

    pub fn negate(self) -> RelOp {
        match self {
            RelOp::Eq => RelOp::Ne,
            RelOp::Ne => RelOp::Eq,
            RelOp::Lt => RelOp::Ge,
            RelOp::Le => RelOp::Gt,
            RelOp::Gt => RelOp::Le,
            RelOp::Ge => RelOp::Lt,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Debug)]
pub enum Const {
    Int(i64),
    Real(ordered_float::OrderedFloat<f64>),
    Bool(bool),
}

impl Eq for Const {}
impl std::hash::Hash for Const {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        match self {
            Const::Int(i) => {
                0u8.hash(state);
                i.hash(state)
            }
            Const::Real(r) => {
                1u8.hash(state);
                r.hash(state)
            }
            Const::Bool(b) => {
                2u8.hash(state);
                b.hash(state)
            }
        }
    }
}

/// A recursive term tree (§3 "Expr"). Subterms are shared via `Arc`, the
/// same structural-sharing discipline chalk uses for its own `Ty`
/// (`chalk-ir/src/lib.rs`), since unrolling duplicates subtrees heavily and
/// cloning would otherwise be quadratic in the unroll depth.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum Expr {
    Const(Const),
    Var(Symbol),
    Neg(Arc<Expr>),
    Arith(ArithOp, Arc<Expr>, Arc<Expr>),
    Rel(RelOp, Arc<Expr>, Arc<Expr>),
    And(Vec<Expr>),
    Or(Vec<Expr>),
    Not(Arc<Expr>),
    Implies(Arc<Expr>, Arc<Expr>),
    Iff(Arc<Expr>, Arc<Expr>),
    Exists(Vec<(Symbol, Sort)>, Arc<Expr>),
    Ite(Arc<Expr>, Arc<Expr>, Arc<Expr>),
    App(Symbol, Vec<Expr>),
    /// `K[σ]` — an occurrence of a k-variable applied to a substitution.
    KVarApp(KVar, Substitution),
    /// Marks a subterm as a Craig-interpolation cut point.
    Interp(Arc<Expr>),
}

impl Eq for Expr {}

// Const doesn't derive Eq/Hash generically because of the f64 wrapper;
// provide it via the newtype below so `Expr` can still derive both.
mod ordered_float {
    #[derive(Copy, Clone, Debug, PartialEq, PartialOrd)]
    pub struct OrderedFloat<T>(pub T);

    impl std::hash::Hash for OrderedFloat<f64> {
        fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
            self.0.to_bits().hash(state)
        }
    }
    impl Eq for OrderedFloat<f64> {}
}

impl Expr {
    pub fn int(i: i64) -> Expr {
        Expr::Const(Const::Int(i))
    }

    pub fn bool(b: bool) -> Expr {
        Expr::Const(Const::Bool(b))
    }

    pub fn var(s: Symbol) -> Expr {
        Expr::Var(s)
    }

    pub fn vv() -> Expr {
        Expr::Var(Symbol::vv())
    }

    pub fn rel(op: RelOp, a: Expr, b: Expr) -> Expr {
        Expr::Rel(op, Arc::new(a), Arc::new(b))
    }

    pub fn arith(op: ArithOp, a: Expr, b: Expr) -> Expr {
        Expr::Arith(op, Arc::new(a), Arc::new(b))
    }

    pub fn not(e: Expr) -> Expr {
        match e {
            Expr::Not(inner) => (*inner).clone(),
            other => Expr::Not(Arc::new(other)),
        }
    }

    pub fn and(mut es: Vec<Expr>) -> Expr {
        es.retain(|e| *e != Expr::bool(true));
        if es.is_empty() {
            Expr::bool(true)
        } else if es.len() == 1 {
            es.pop().unwrap()
        } else {
            Expr::And(es)
        }
    }

    pub fn or(mut es: Vec<Expr>) -> Expr {
        es.retain(|e| *e != Expr::bool(false));
        if es.is_empty() {
            Expr::bool(false)
        } else if es.len() == 1 {
            es.pop().unwrap()
        } else {
            Expr::Or(es)
        }
    }

    pub fn kvar_app(k: KVar, sigma: Substitution) -> Expr {
        Expr::KVarApp(k, sigma)
    }

    pub fn interp(e: Expr) -> Expr {
        Expr::Interp(Arc::new(e))
    }

    /// Flattens nested conjunctions into their top-level conjuncts (§4.7
    /// step 1 "Flatten predicates under conjunction and disjunction").
    pub fn conjuncts(&self) -> Vec<&Expr> {
        match self {
            Expr::And(es) => es.iter().flat_map(|e| e.conjuncts()).collect(),
            other => vec![other],
        }
    }

    pub fn disjuncts(&self) -> Vec<&Expr> {
        match self {
            Expr::Or(es) => es.iter().flat_map(|e| e.disjuncts()).collect(),
            other => vec![other],
        }
    }

    /// Decomposes this predicate into the atomic predicates that appear
    /// beneath its And/Or connectives (§4.7 step 1).
    pub fn atoms(&self) -> Vec<&Expr> {
        match self {
            Expr::And(es) | Expr::Or(es) => es.iter().flat_map(|e| e.atoms()).collect(),
            other => vec![other],
        }
    }

    /// Every k-variable application appearing anywhere in this expression,
    /// paired with the binder symbol it is implicitly associated with (the
    /// caller supplies that association; this just finds the occurrences).
    pub fn kvar_apps(&self) -> Vec<(&KVar, &Substitution)> {
        let mut out = vec![];
        self.walk_kvar_apps(&mut out);
        out
    }

    fn walk_kvar_apps<'a>(&'a self, out: &mut Vec<(&'a KVar, &'a Substitution)>) {
        match self {
            Expr::KVarApp(k, sigma) => out.push((k, sigma)),
            Expr::Neg(a) | Expr::Not(a) | Expr::Interp(a) => a.walk_kvar_apps(out),
            Expr::Arith(_, a, b) | Expr::Rel(_, a, b) | Expr::Implies(a, b) | Expr::Iff(a, b) => {
                a.walk_kvar_apps(out);
                b.walk_kvar_apps(out);
            }
            Expr::Ite(a, b, c) => {
                a.walk_kvar_apps(out);
                b.walk_kvar_apps(out);
                c.walk_kvar_apps(out);
            }
            Expr::And(es) | Expr::Or(es) => {
                for e in es {
                    e.walk_kvar_apps(out);
                }
            }
            Expr::Exists(_, a) => a.walk_kvar_apps(out),
            Expr::App(_, args) => {
                for a in args {
                    a.walk_kvar_apps(out);
                }
            }
            Expr::Const(_) | Expr::Var(_) => {}
        }
    }

    /// Free symbols of this expression (binders in `Exists` are excluded).
    pub fn free_symbols(&self) -> FxHashSet<Symbol> {
        let mut out = FxHashSet::default();
        self.collect_free(&mut out);
        out
    }

    fn collect_free(&self, out: &mut FxHashSet<Symbol>) {
        match self {
            Expr::Const(_) => {}
            Expr::Var(s) => {
                out.insert(*s);
            }
            Expr::Neg(a) | Expr::Not(a) | Expr::Interp(a) => a.collect_free(out),
            Expr::Arith(_, a, b) | Expr::Rel(_, a, b) | Expr::Implies(a, b) | Expr::Iff(a, b) => {
                a.collect_free(out);
                b.collect_free(out);
            }
            Expr::Ite(a, b, c) => {
                a.collect_free(out);
                b.collect_free(out);
                c.collect_free(out);
            }
            Expr::And(es) | Expr::Or(es) => {
                for e in es {
                    e.collect_free(out);
                }
            }
            Expr::Exists(binders, body) => {
                let mut inner = FxHashSet::default();
                body.collect_free(&mut inner);
                for (s, _) in binders {
                    inner.remove(s);
                }
                out.extend(inner);
            }
            Expr::App(_, args) => {
                for a in args {
                    a.collect_free(out);
                }
            }
            Expr::KVarApp(_, sigma) => {
                for (_, e) in sigma.iter() {
                    e.collect_free(out);
                }
            }
        }
    }

    /// Renames every free occurrence of `from` to `to`, capture-avoidingly:
    /// an `Exists` binder equal to `from` is left alone (the renamed symbol
    /// is shadowed there), and a binder equal to `to` is itself renamed
    /// apart first so `to` cannot be captured.
    pub fn rename(&self, from: Symbol, to: Symbol) -> Expr {
        match self {
            Expr::Var(s) if *s == from => Expr::Var(to),
            Expr::Var(_) | Expr::Const(_) => self.clone(),
            Expr::Neg(a) => Expr::Neg(Arc::new(a.rename(from, to))),
            Expr::Not(a) => Expr::not(a.rename(from, to)),
            Expr::Interp(a) => Expr::interp(a.rename(from, to)),
            Expr::Arith(op, a, b) => Expr::arith(*op, a.rename(from, to), b.rename(from, to)),
            Expr::Rel(op, a, b) => Expr::rel(*op, a.rename(from, to), b.rename(from, to)),
            Expr::Implies(a, b) => {
                Expr::Implies(Arc::new(a.rename(from, to)), Arc::new(b.rename(from, to)))
            }
            Expr::Iff(a, b) => Expr::Iff(Arc::new(a.rename(from, to)), Arc::new(b.rename(from, to))),
            Expr::Ite(a, b, c) => Expr::Ite(
                Arc::new(a.rename(from, to)),
                Arc::new(b.rename(from, to)),
                Arc::new(c.rename(from, to)),
            ),
            Expr::And(es) => Expr::And(es.iter().map(|e| e.rename(from, to)).collect()),
            Expr::Or(es) => Expr::Or(es.iter().map(|e| e.rename(from, to)).collect()),
            Expr::App(f, args) => {
                Expr::App(*f, args.iter().map(|a| a.rename(from, to)).collect())
            }
            Expr::Exists(binders, body) => {
                if binders.iter().any(|(s, _)| *s == from) {
                    // `from` is shadowed here; the body's occurrences of
                    // `from` refer to the binder, not the outer symbol.
                    self.clone()
                } else {
                    Expr::Exists(binders.clone(), Arc::new(body.rename(from, to)))
                }
            }
            Expr::KVarApp(k, sigma) => Expr::KVarApp(*k, sigma.rename(from, to)),
        }
    }

    /// Applies a substitution capture-avoidingly (§3 "Substitution").
    pub fn apply(&self, sigma: &Substitution) -> Expr {
        match self {
            Expr::Var(s) => sigma.get(*s).cloned().unwrap_or_else(|| self.clone()),
            Expr::Const(_) => self.clone(),
            Expr::Neg(a) => Expr::Neg(Arc::new(a.apply(sigma))),
            Expr::Not(a) => Expr::not(a.apply(sigma)),
            Expr::Interp(a) => Expr::interp(a.apply(sigma)),
            Expr::Arith(op, a, b) => Expr::arith(*op, a.apply(sigma), b.apply(sigma)),
            Expr::Rel(op, a, b) => Expr::rel(*op, a.apply(sigma), b.apply(sigma)),
            Expr::Implies(a, b) => {
                Expr::Implies(Arc::new(a.apply(sigma)), Arc::new(b.apply(sigma)))
            }
            Expr::Iff(a, b) => Expr::Iff(Arc::new(a.apply(sigma)), Arc::new(b.apply(sigma))),
            Expr::Ite(a, b, c) => Expr::Ite(
                Arc::new(a.apply(sigma)),
                Arc::new(b.apply(sigma)),
                Arc::new(c.apply(sigma)),
            ),
            Expr::And(es) => Expr::And(es.iter().map(|e| e.apply(sigma)).collect()),
            Expr::Or(es) => Expr::Or(es.iter().map(|e| e.apply(sigma)).collect()),
            Expr::App(f, args) => Expr::App(*f, args.iter().map(|a| a.apply(sigma)).collect()),
            Expr::Exists(binders, body) => {
                // Capture-avoidance: if a binder's name appears free in any
                // replacement, rename the binder apart before descending.
                let incoming: FxHashSet<Symbol> = sigma
                    .iter()
                    .filter(|(k, _)| body.free_symbols().contains(k))
                    .flat_map(|(_, e)| e.free_symbols())
                    .collect();
                let mut binders = binders.clone();
                let mut body = (**body).clone();
                for (name, _sort) in binders.iter_mut() {
                    if incoming.contains(name) {
                        let fresh = name.suffixed(freshen_counter());
                        body = body.rename(*name, fresh);
                        *name = fresh;
                    }
                }
                let restricted = sigma.restrict_out(binders.iter().map(|(s, _)| *s));
                Expr::Exists(binders, Arc::new(body.apply(&restricted)))
            }
            Expr::KVarApp(k, inner_sigma) => Expr::KVarApp(*k, inner_sigma.compose_apply(sigma)),
        }
    }
}

/// Monotonically increasing counter used only to pick capture-avoidance
/// binder names during substitution; unrelated to the unroller's own
/// per-symbol rename counters (`UnrollState::rename_counter`), which are
/// the ones that actually need to be stable and collision-free.
fn freshen_counter() -> usize {
    use std::sync::atomic::{AtomicUsize, Ordering};
    static COUNTER: AtomicUsize = AtomicUsize::new(1_000_000);
    COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// A finite mapping from symbols to expressions with unique keys (§3
/// "Substitution"). Order of entries is preserved for deterministic
/// serialization (§5's ordering guarantee) but never affects the meaning
/// of `apply`.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Default)]
pub struct Substitution {
    entries: Vec<(Symbol, Expr)>,
}

impl Substitution {
    pub fn empty() -> Substitution {
        Substitution { entries: vec![] }
    }

    pub fn from_entries(entries: Vec<(Symbol, Expr)>) -> Substitution {
        Substitution { entries }
    }

    pub fn singleton(k: Symbol, v: Expr) -> Substitution {
        Substitution {
            entries: vec![(k, v)],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(Symbol, Expr)> {
        self.entries.iter()
    }

    pub fn get(&self, k: Symbol) -> Option<&Expr> {
        self.entries.iter().find(|(s, _)| *s == k).map(|(_, e)| e)
    }

    /// Removes the entry for `k`, if any. Used by the scrubbing pass
    /// (§4.1 step 3) to drop `[x := x']`-shaped identity substitutions.
    pub fn remove(&mut self, k: Symbol) -> Option<Expr> {
        let idx = self.entries.iter().position(|(s, _)| *s == k)?;
        Some(self.entries.remove(idx).1)
    }

    pub fn push(&mut self, k: Symbol, v: Expr) {
        debug_assert!(
            self.get(k).is_none(),
            "substitution keys must be unique: {:?}",
            k
        );
        self.entries.push((k, v));
    }

    /// Renames `from -> to` both as a possible key and inside every value.
    pub fn rename(&self, from: Symbol, to: Symbol) -> Substitution {
        Substitution {
            entries: self
                .entries
                .iter()
                .map(|(k, v)| {
                    let k = if *k == from { to } else { *k };
                    (k, v.rename(from, to))
                })
                .collect(),
        }
    }

    /// Returns a copy of `self` with every entry whose key is in `keys`
    /// removed — used when applying an outer substitution across an
    /// `Exists` binder so the binder's own name is never substituted.
    fn restrict_out(&self, keys: impl Iterator<Item = Symbol>) -> Substitution {
        let keys: FxHashSet<Symbol> = keys.collect();
        Substitution {
            entries: self
                .entries
                .iter()
                .filter(|(k, _)| !keys.contains(k))
                .cloned()
                .collect(),
        }
    }

    /// Applies `outer` to every value of `self`, i.e. computes the
    /// substitution that results from applying `outer` after `self`. This
    /// is what lets `apply` commute with the renamer, as §9 requires
    /// ("Substitution as first-class value").
    fn compose_apply(&self, outer: &Substitution) -> Substitution {
        Substitution {
            entries: self
                .entries
                .iter()
                .map(|(k, v)| (*k, v.apply(outer)))
                .collect(),
        }
    }
}

impl fmt::Display for Substitution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, (k, v)) in self.entries.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{} := {:?}", k, v)?;
        }
        write!(f, "]")
    }
}

/// Replaces every free variable whose name parses as an integer with the
/// corresponding integer constant (§4.6 step 3, §9 "Numberification
/// heuristic"). Isolated behind this one function, as the open question
/// requires, so the (unsound in principle) coercion can be removed in one
/// place if the upstream encoding changes.
pub fn renumber_integer_symbols(e: &Expr) -> Expr {
    match e {
        Expr::Var(s) if s.parses_as_integer() => {
            Expr::int(s.as_str().parse::<i64>().expect("checked by parses_as_integer"))
        }
        Expr::Var(_) | Expr::Const(_) => e.clone(),
        Expr::Neg(a) => Expr::Neg(Arc::new(renumber_integer_symbols(a))),
        Expr::Not(a) => Expr::not(renumber_integer_symbols(a)),
        Expr::Interp(a) => Expr::interp(renumber_integer_symbols(a)),
        Expr::Arith(op, a, b) => {
            Expr::arith(*op, renumber_integer_symbols(a), renumber_integer_symbols(b))
        }
        Expr::Rel(op, a, b) => {
            Expr::rel(*op, renumber_integer_symbols(a), renumber_integer_symbols(b))
        }
        Expr::Implies(a, b) => Expr::Implies(
            Arc::new(renumber_integer_symbols(a)),
            Arc::new(renumber_integer_symbols(b)),
        ),
        Expr::Iff(a, b) => Expr::Iff(
            Arc::new(renumber_integer_symbols(a)),
            Arc::new(renumber_integer_symbols(b)),
        ),
        Expr::Ite(a, b, c) => Expr::Ite(
            Arc::new(renumber_integer_symbols(a)),
            Arc::new(renumber_integer_symbols(b)),
            Arc::new(renumber_integer_symbols(c)),
        ),
        Expr::And(es) => Expr::And(es.iter().map(renumber_integer_symbols).collect()),
        Expr::Or(es) => Expr::Or(es.iter().map(renumber_integer_symbols).collect()),
        Expr::App(f, args) => {
            Expr::App(*f, args.iter().map(renumber_integer_symbols).collect())
        }
        Expr::Exists(binders, body) => {
            Expr::Exists(binders.clone(), Arc::new(renumber_integer_symbols(body)))
        }
        Expr::KVarApp(k, sigma) => {
            let entries = sigma
                .iter()
                .map(|(k, v)| (*k, renumber_integer_symbols(v)))
                .collect();
            Expr::KVarApp(*k, Substitution::from_entries(entries))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_substitutes_free_variable() {
        let x = Symbol::intern("x");
        let y = Symbol::intern("y");
        let e = Expr::rel(RelOp::Ge, Expr::var(x), Expr::int(0));
        let sigma = Substitution::singleton(x, Expr::var(y));
        assert_eq!(e.apply(&sigma), Expr::rel(RelOp::Ge, Expr::var(y), Expr::int(0)));
    }

    #[test]
    fn apply_avoids_capture_in_exists() {
        let x = Symbol::intern("x");
        let y = Symbol::intern("y");
        let body = Expr::rel(RelOp::Eq, Expr::var(x), Expr::var(y));
        let e = Expr::Exists(vec![(y, Sort::Int)], Arc::new(body));
        // substituting x := y should not let the inner `y` capture the
        // substituted-in `y`
        let sigma = Substitution::singleton(x, Expr::var(y));
        let result = e.apply(&sigma);
        if let Expr::Exists(binders, body) = &result {
            assert_ne!(binders[0].0, y, "binder should have been renamed apart");
            let frees = body.free_symbols();
            assert!(frees.contains(&y));
        } else {
            panic!("expected Exists");
        }
    }

    #[test]
    fn conjuncts_flatten_nested_and() {
        let a = Expr::bool(true);
        let b = Expr::bool(false);
        let nested = Expr::And(vec![Expr::And(vec![a.clone(), b.clone()]), a.clone()]);
        assert_eq!(nested.conjuncts().len(), 3);
    }

    #[test]
    fn renumber_converts_integer_named_symbols() {
        let e = Expr::var(Symbol::intern("42"));
        assert_eq!(renumber_integer_symbols(&e), Expr::int(42));
    }
}
