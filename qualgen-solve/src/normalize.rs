use qualgen_ir::expr::{Expr, Substitution};
use qualgen_ir::{FInfo, Query, Rule, Sort, SubtypingConstraint, Symbol};
use rustc_hash::FxHashMap;
use tracing::instrument;

/// The result of normalizing one raw subtyping constraint (§4.1 step 5):
/// either a rule whose head is a k-variable, or a query whose head is a
/// concrete predicate to refute.
pub enum NormalizedClause {
    Rule(Rule),
    Query(Query),
}

/// Normalizes every constraint in `finfo` into `Rule`s and `Query`s
/// (§4.1). Mirrors chalk's `program_clauses_for_env`-style "lower
/// everything up front, classify once" pass (`src/lowering.rs`) in
/// structure, though the transformation itself is specific to this
/// pipeline.
#[instrument(skip(finfo))]
pub fn normalize_finfo(finfo: &FInfo) -> (Vec<Rule>, Vec<Query>) {
    let mut rules = vec![];
    let mut queries = vec![];
    for c in finfo.constraints() {
        match normalize_constraint(c) {
            NormalizedClause::Rule(r) => rules.push(r),
            NormalizedClause::Query(q) => queries.push(q),
        }
    }
    (rules, queries)
}

/// Normalizes a single constraint (§4.1 steps 1-5).
pub fn normalize_constraint(c: &SubtypingConstraint) -> NormalizedClause {
    // Step 1: instantiate the LHS and RHS refinements, substituting each
    // binder's actual symbol for the abstract `vv` they're phrased over.
    let lhs_expr = c.lhs.refinement.rename(Symbol::vv(), c.lhs.sym);
    let rhs_expr = c.rhs.refinement.rename(Symbol::vv(), c.rhs.sym);

    // Step 2: collect the bound-variable environment, each contributing
    // its own instantiated refinement tagged with its own binder.
    let mut contributions: Vec<(Symbol, Expr)> = c
        .env
        .iter()
        .map(|b| (b.sym, b.refinement.rename(Symbol::vv(), b.sym)))
        .collect();

    // The LHS expression's own atoms/k-vars are tagged with `vv` (it is
    // the value the whole judgment is about), not with `c.lhs.sym`.
    contributions.push((Symbol::vv(), lhs_expr));

    // Step 3: scrub `[x := x]`-shaped identity substitutions introduced
    // by the upstream encoding.
    let scrubbed: Vec<(Symbol, Expr)> = contributions
        .into_iter()
        .map(|(tag, e)| (tag, scrub_substitutions(&e, tag)))
        .collect();

    // Step 4: partition into body atoms and k-var children.
    let mut body_atoms = vec![];
    let mut children = vec![];
    for (tag, e) in &scrubbed {
        for atom in e.atoms() {
            match atom {
                Expr::KVarApp(k, sigma) => {
                    children.push(qualgen_ir::Child {
                        k: *k,
                        sigma: sigma.clone(),
                        sym: *tag,
                    });
                }
                other => body_atoms.push(other.clone()),
            }
        }
    }
    let body = Expr::and(body_atoms);

    // Step 5: classify by RHS shape.
    match rhs_expr {
        Expr::KVarApp(k, _) => NormalizedClause::Rule(Rule {
            body,
            children,
            head: k,
        }),
        other => NormalizedClause::Query(Query {
            body,
            children,
            head: other,
        }),
    }
}

/// Removes, from every `K[σ]` found anywhere inside `e`, any substitution
/// entry `(k, Var(s'))` whose value symbol equals `binder` (§4.1 step 3).
/// These are artefacts of the upstream encoding — a refinement's own
/// binder substituted trivially for itself — and interfere with
/// unrolling if left in place.
pub fn scrub_substitutions(e: &Expr, binder: Symbol) -> Expr {
    match e {
        Expr::Var(_) | Expr::Const(_) => e.clone(),
        Expr::Neg(a) => Expr::Neg(std::sync::Arc::new(scrub_substitutions(a, binder))),
        Expr::Not(a) => Expr::not(scrub_substitutions(a, binder)),
        Expr::Interp(a) => Expr::interp(scrub_substitutions(a, binder)),
        Expr::Arith(op, a, b) => {
            Expr::arith(*op, scrub_substitutions(a, binder), scrub_substitutions(b, binder))
        }
        Expr::Rel(op, a, b) => {
            Expr::rel(*op, scrub_substitutions(a, binder), scrub_substitutions(b, binder))
        }
        Expr::Implies(a, b) => Expr::Implies(
            std::sync::Arc::new(scrub_substitutions(a, binder)),
            std::sync::Arc::new(scrub_substitutions(b, binder)),
        ),
        Expr::Iff(a, b) => Expr::Iff(
            std::sync::Arc::new(scrub_substitutions(a, binder)),
            std::sync::Arc::new(scrub_substitutions(b, binder)),
        ),
        Expr::Ite(a, b, c) => Expr::Ite(
            std::sync::Arc::new(scrub_substitutions(a, binder)),
            std::sync::Arc::new(scrub_substitutions(b, binder)),
            std::sync::Arc::new(scrub_substitutions(c, binder)),
        ),
        Expr::And(es) => Expr::And(es.iter().map(|e| scrub_substitutions(e, binder)).collect()),
        Expr::Or(es) => Expr::Or(es.iter().map(|e| scrub_substitutions(e, binder)).collect()),
        Expr::App(f, args) => {
            Expr::App(*f, args.iter().map(|a| scrub_substitutions(a, binder)).collect())
        }
        Expr::Exists(binders, body) => {
            Expr::Exists(binders.clone(), std::sync::Arc::new(scrub_substitutions(body, binder)))
        }
        Expr::KVarApp(k, sigma) => {
            let entries = sigma
                .iter()
                .filter(|(_, v)| !matches!(v, Expr::Var(s) if *s == binder))
                .cloned()
                .collect();
            Expr::KVarApp(*k, Substitution::from_entries(entries))
        }
    }
}

/// Extracts `(symbol, sort)` pairs from the bind environment and the
/// well-formedness map, as the union `symSorts` used throughout unrolling
/// (§4.1 "Sort collection").
pub fn collect_sym_sorts(finfo: &FInfo) -> FxHashMap<Symbol, Sort> {
    let mut out: FxHashMap<Symbol, Sort> = finfo.bind_env().clone();
    for k in finfo.kvars_under_consideration() {
        if let Some(sig) = finfo.kvar_signature(*k) {
            if let Some(vv_sort) = sig.first() {
                out.entry(Symbol::vv()).or_insert_with(|| vv_sort.clone());
            }
        }
    }
    out
}
