use rustc_hash::FxHashMap;

use crate::expr::Expr;
use crate::sort::Sort;
use crate::symbol::{KVar, Symbol};

/// Present exactly on nodes generated from an unrolled k-variable
/// occurrence; drives solution extraction (§3 "info").
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct NodeInfo {
    pub k: KVar,
    pub sym: Symbol,
}

/// An And/Or tree (§3 "InterpQuery"). `And` nodes are interpolation cut
/// points whose subtree, once free of `Or`, is a tree-interpolation query;
/// `Or` nodes are disjunctions over alternative expansions for a single
/// k-variable occurrence.
#[derive(Clone, PartialEq, Debug)]
pub enum InterpQuery {
    And {
        info: Option<NodeInfo>,
        root: Expr,
        children: Vec<InterpQuery>,
    },
    Or {
        info: Option<NodeInfo>,
        children: Vec<InterpQuery>,
    },
}

impl InterpQuery {
    pub fn leaf_and(root: Expr) -> InterpQuery {
        InterpQuery::And {
            info: None,
            root,
            children: vec![],
        }
    }

    pub fn info(&self) -> Option<NodeInfo> {
        match self {
            InterpQuery::And { info, .. } | InterpQuery::Or { info, .. } => *info,
        }
    }

    pub fn children(&self) -> &[InterpQuery] {
        match self {
            InterpQuery::And { children, .. } | InterpQuery::Or { children, .. } => children,
        }
    }

    /// Counts the `info`-tagged nodes anywhere in this tree (used to sanity
    /// check that the serializer's cut count and the solution extractor's
    /// candidate count agree, §8 invariant 4).
    pub fn info_count(&self) -> usize {
        let here = if self.info().is_some() { 1 } else { 0 };
        here + self.children().iter().map(InterpQuery::info_count).sum::<usize>()
    }
}

/// Same shape as `InterpQuery`, but each node's formula has been replaced
/// by the interpolant the SMT solver returned at that cut (§3
/// "TreeInterp"). The And/Or skeleton and `info` tags are preserved
/// exactly through interpolation (§3 invariant).
#[derive(Clone, Debug)]
pub enum TreeInterp {
    And {
        info: Option<NodeInfo>,
        interpolant: Expr,
        children: Vec<TreeInterp>,
    },
    Or {
        info: Option<NodeInfo>,
        children: Vec<TreeInterp>,
    },
}

impl TreeInterp {
    pub fn info(&self) -> Option<NodeInfo> {
        match self {
            TreeInterp::And { info, .. } | TreeInterp::Or { info, .. } => *info,
        }
    }

    pub fn children(&self) -> &[TreeInterp] {
        match self {
            TreeInterp::And { children, .. } | TreeInterp::Or { children, .. } => children,
        }
    }
}

/// Mutable traversal state threaded through the unroller (§3
/// "UnrollState"). Modeled as an explicit state record rather than global
/// mutable state, per §9's "Mutable traversal state" design note.
#[derive(Clone, Debug, Default)]
pub struct UnrollState {
    /// Fresh symbols that must be declared to the SMT solver, with their
    /// sorts.
    created_symbols: FxHashMap<Symbol, Sort>,
    /// Per-base-symbol rename counters (not a single global counter, so
    /// generated names stay stable under reordering, §9 "Name
    /// generation").
    rename_counter: FxHashMap<Symbol, usize>,
    /// For every fresh symbol introduced during unrolling, the original
    /// symbol it stands in for, collapsed transitively (§3 "unrollSubs").
    unroll_subs: FxHashMap<Symbol, Symbol>,
}

impl UnrollState {
    pub fn new() -> UnrollState {
        UnrollState::default()
    }

    /// Seeds every base symbol's rename counter strictly above the
    /// highest numeric suffix already observed for it, so that fresh
    /// symbols generated later can never collide with suffixed symbols
    /// already present in the input (e.g. `v101`). Resolves the "Rename
    /// seeding" open question (§9): the original `initRenameMap` simply
    /// returns empty, which is documented there as wrong.
    pub fn seed_rename_counters<'a>(&mut self, symbols: impl IntoIterator<Item = Symbol>) {
        for sym in symbols {
            if let Some((base, counter)) = sym.split_suffix() {
                let entry = self.rename_counter.entry(base).or_insert(0);
                if counter >= *entry {
                    *entry = counter + 1;
                }
            }
        }
    }

    /// Generates a fresh symbol derived from `base`, recording it in
    /// `created_symbols` with `sort` (§4.2 "Fresh symbol discipline" step
    /// 1). Never reuses a counter value, even across different base
    /// symbols that happen to produce the same suffixed text, because the
    /// counter is keyed per base symbol.
    pub fn fresh(&mut self, base: Symbol, sort: Sort) -> Symbol {
        let counter = self.rename_counter.entry(base).or_insert(0);
        let n = *counter;
        *counter += 1;
        let fresh = base.suffixed(n);
        self.created_symbols.insert(fresh, sort);
        fresh
    }

    /// Records that `fresh` stands in for `original`, collapsing
    /// transitively if `original` is itself already a recorded stand-in
    /// (§4.2 "Substitution materialization": "`original` collapses
    /// transitively if `k` itself is a fresh substitution symbol").
    pub fn record_stands_for(&mut self, fresh: Symbol, original: Symbol) {
        let collapsed = self.original_of(original);
        self.unroll_subs.insert(fresh, collapsed);
    }

    /// The ultimate original symbol a (possibly fresh) symbol stands for,
    /// or the symbol itself if it was never renamed.
    pub fn original_of(&self, sym: Symbol) -> Symbol {
        match self.unroll_subs.get(&sym) {
            Some(&orig) if orig != sym => self.original_of(orig),
            _ => sym,
        }
    }

    pub fn created_symbols(&self) -> &FxHashMap<Symbol, Sort> {
        &self.created_symbols
    }

    pub fn unroll_subs(&self) -> &FxHashMap<Symbol, Symbol> {
        &self.unroll_subs
    }
}
