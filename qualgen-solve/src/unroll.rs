use rustc_hash::{FxHashMap, FxHashSet};
use tracing::instrument;

use qualgen_ir::expr::{Expr, RelOp};
use qualgen_ir::{Child, KClauses, KVar, NodeInfo, Query, Sort, Symbol, UnrollState};
use qualgen_ir::query_tree::InterpQuery;

/// Unrolls a Query to depth `n` against `kclauses`, producing the
/// disjunctive interpolation And/Or tree and the `UnrollState`
/// accumulated while building it (§4.2).
#[instrument(skip(query, kclauses, sym_sorts))]
pub fn unroll_query(
    query: &Query,
    n: usize,
    kclauses: &KClauses,
    sym_sorts: &FxHashMap<Symbol, Sort>,
) -> (InterpQuery, UnrollState) {
    let mut state = UnrollState::new();
    state.seed_rename_counters(collect_all_symbols(query, kclauses));

    let mut dmap: FxHashMap<KVar, usize> = kclauses.kvars().into_iter().map(|k| (k, n)).collect();

    // The query's own vv is renamed to a fresh v before anything else
    // (§4.2 "Tree construction").
    let vv_sort = sym_sorts.get(&Symbol::vv()).cloned().unwrap_or(Sort::Int);
    let v = state.fresh(Symbol::vv(), vv_sort);
    state.record_stands_for(v, Symbol::vv());

    let body = query.body.rename(Symbol::vv(), v);
    let head = query.head.rename(Symbol::vv(), v);
    let mut children = query.children.clone();
    for c in children.iter_mut() {
        c.sigma = c.sigma.rename(Symbol::vv(), v);
        if c.sym == Symbol::vv() {
            c.sym = v;
        }
    }

    let (extra_atoms, sub_trees) = materialize_children(&children, &mut dmap, kclauses, sym_sorts, &mut state);

    let mut atoms: Vec<Expr> = body.conjuncts().into_iter().cloned().collect();
    atoms.push(Expr::not(head));
    atoms.extend(extra_atoms);
    let root = Expr::and(atoms);

    (
        InterpQuery::And {
            info: None,
            root,
            children: sub_trees,
        },
        state,
    )
}

/// Unrolls a single k-var occurrence `K(sym)` (§4.2 "Depth budget", "Tree
/// construction"). `extra_renames` carries the substitution-materialization
/// renames collected by the caller (the `k -> t` pairs from its own
/// substitution atoms) that must be applied within whichever rule body is
/// chosen here, before that rule's own `vv` is instantiated.
fn unroll_kvar_occurrence(
    k: KVar,
    sym: Symbol,
    extra_renames: &[(Symbol, Symbol)],
    dmap: &FxHashMap<KVar, usize>,
    kclauses: &KClauses,
    sym_sorts: &FxHashMap<Symbol, Sort>,
    state: &mut UnrollState,
) -> InterpQuery {
    if !kclauses.known(k) {
        return InterpQuery::Or {
            info: Some(NodeInfo { k, sym }),
            children: vec![],
        };
    }

    let budget = *dmap.get(&k).unwrap_or(&0);
    let mut branches = vec![];

    if budget > 0 {
        for rule in kclauses.recursive_rules(k) {
            let mut sub_dmap = dmap.clone();
            sub_dmap.insert(k, budget - 1);
            branches.push(unroll_rule(
                rule, sym, extra_renames, &sub_dmap, kclauses, sym_sorts, state,
            ));
        }
    }
    for rule in kclauses.non_recursive_rules(k) {
        branches.push(unroll_rule(
            rule, sym, extra_renames, dmap, kclauses, sym_sorts, state,
        ));
    }

    InterpQuery::Or {
        info: Some(NodeInfo { k, sym }),
        children: branches,
    }
}

/// Instantiates one matching rule for an occurrence whose caller binder is
/// `caller_sym` (§4.2 "Fresh symbol discipline"). The rule's own `vv` is
/// renamed to a freshly minted symbol derived from `caller_sym` and
/// recorded in `unrollSubs` as standing for it, so solution extraction
/// (§4.6) can reverse the rename; `extra_renames` (the enclosing
/// occurrence's substitution atoms) is applied first.
fn unroll_rule(
    rule: &qualgen_ir::Rule,
    caller_sym: Symbol,
    extra_renames: &[(Symbol, Symbol)],
    dmap: &FxHashMap<KVar, usize>,
    kclauses: &KClauses,
    sym_sorts: &FxHashMap<Symbol, Sort>,
    state: &mut UnrollState,
) -> InterpQuery {
    let sort = sym_sorts.get(&caller_sym).cloned().unwrap_or(Sort::Int);
    let sym_prime = state.fresh(caller_sym, sort);
    state.record_stands_for(sym_prime, caller_sym);

    let mut body = rule.body.clone();
    let mut children = rule.children.clone();
    for (from, to) in extra_renames {
        body = body.rename(*from, *to);
        for c in children.iter_mut() {
            c.sigma = c.sigma.rename(*from, *to);
        }
    }
    body = body.rename(Symbol::vv(), sym_prime);
    for c in children.iter_mut() {
        c.sigma = c.sigma.rename(Symbol::vv(), sym_prime);
        if c.sym == Symbol::vv() {
            c.sym = sym_prime;
        }
    }

    let (extra_atoms, sub_trees) = materialize_children(&children, dmap, kclauses, sym_sorts, state);

    let mut atoms: Vec<Expr> = body.conjuncts().into_iter().cloned().collect();
    atoms.extend(extra_atoms);
    let full_body = Expr::and(atoms);

    InterpQuery::And {
        info: None,
        root: full_body,
        children: sub_trees,
    }
}

/// Materializes every child occurrence's substitution into a fresh atom
/// `t = e` (§4.2 "Substitution materialization"), then recursively unrolls
/// each child carrying the resulting `key -> t` renames down into its own
/// rule instantiation. Shared between query-level and rule-level
/// expansion, since both shapes carry a `children: Vec<Child>` list.
fn materialize_children(
    children: &[Child],
    dmap: &FxHashMap<KVar, usize>,
    kclauses: &KClauses,
    sym_sorts: &FxHashMap<Symbol, Sort>,
    state: &mut UnrollState,
) -> (Vec<Expr>, Vec<InterpQuery>) {
    let mut extra_atoms = vec![];
    let mut sub_trees = vec![];
    for child in children {
        let mut child_extra_renames = vec![];
        for (key, e) in child.sigma.iter() {
            let sort = sym_sorts.get(key).cloned().unwrap_or(Sort::Int);
            let t = state.fresh(Symbol::sub_seed(), sort);
            extra_atoms.push(Expr::rel(RelOp::Eq, Expr::var(t), e.clone()));
            let original = state.original_of(*key);
            state.record_stands_for(t, original);
            child_extra_renames.push((*key, t));
        }
        sub_trees.push(unroll_kvar_occurrence(
            child.k,
            child.sym,
            &child_extra_renames,
            dmap,
            kclauses,
            sym_sorts,
            state,
        ));
    }
    (extra_atoms, sub_trees)
}

/// Every symbol mentioned anywhere in the query or in any rule reachable
/// from `kclauses`, used to seed `UnrollState`'s rename counters above any
/// suffix already present in the input (§9 "Rename seeding").
fn collect_all_symbols(query: &Query, kclauses: &KClauses) -> FxHashSet<Symbol> {
    let mut out = FxHashSet::default();
    out.extend(query.body.free_symbols());
    out.extend(query.head.free_symbols());
    for c in &query.children {
        out.insert(c.sym);
        for (k, e) in c.sigma.iter() {
            out.insert(*k);
            out.extend(e.free_symbols());
        }
    }
    for k in kclauses.kvars() {
        let rules = kclauses
            .recursive_rules(k)
            .iter()
            .chain(kclauses.non_recursive_rules(k).iter());
        for rule in rules {
            out.extend(rule.body.free_symbols());
            for c in &rule.children {
                out.insert(c.sym);
                for (kk, e) in c.sigma.iter() {
                    out.insert(*kk);
                    out.extend(e.free_symbols());
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use qualgen_ir::expr::Substitution;
    use qualgen_ir::{classify_rules, Rule};

    fn sorts() -> FxHashMap<Symbol, Sort> {
        let mut m = FxHashMap::default();
        m.insert(Symbol::vv(), Sort::Int);
        m.insert(Symbol::intern("k"), Sort::Int);
        m
    }

    #[test]
    fn depth_zero_never_expands_recursive_rules() {
        let k = KVar::intern("K");
        let r1 = Rule {
            body: Expr::rel(RelOp::Le, Expr::var(Symbol::intern("k")), Expr::int(0)),
            children: vec![],
            head: k,
        };
        let r2 = Rule {
            body: Expr::bool(true),
            children: vec![Child {
                k,
                sigma: Substitution::empty(),
                sym: Symbol::vv(),
            }],
            head: k,
        };
        let kclauses = classify_rules(vec![r1, r2]);

        let query = Query {
            body: Expr::bool(true),
            children: vec![Child {
                k,
                sigma: Substitution::empty(),
                sym: Symbol::vv(),
            }],
            head: Expr::bool(true),
        };

        let (tree, _state) = unroll_query(&query, 0, &kclauses, &sorts());
        if let InterpQuery::And { children, .. } = &tree {
            assert_eq!(children.len(), 1);
            if let InterpQuery::Or { children: or_children, .. } = &children[0] {
                assert_eq!(or_children.len(), 1, "only the non-recursive rule expands at depth 0");
            } else {
                panic!("expected Or node");
            }
        } else {
            panic!("expected And root");
        }
    }

    #[test]
    fn unknown_kvar_yields_empty_or() {
        let k = KVar::intern("Ghost");
        let kclauses = KClauses::new();
        let query = Query {
            body: Expr::bool(true),
            children: vec![Child {
                k,
                sigma: Substitution::empty(),
                sym: Symbol::vv(),
            }],
            head: Expr::bool(true),
        };
        let (tree, _state) = unroll_query(&query, 2, &kclauses, &sorts());
        if let InterpQuery::And { children, .. } = &tree {
            assert_eq!(children.len(), 1);
            assert!(matches!(&children[0], InterpQuery::Or { children, .. } if children.is_empty()));
        } else {
            panic!("expected And root");
        }
    }

    #[test]
    fn query_with_no_children_has_one_and_node() {
        let kclauses = KClauses::new();
        let query = Query {
            body: Expr::bool(true),
            children: vec![],
            head: Expr::bool(true),
        };
        let (tree, _state) = unroll_query(&query, 3, &kclauses, &sorts());
        assert!(matches!(tree, InterpQuery::And { ref children, .. } if children.is_empty()));
    }
}
