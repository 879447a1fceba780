use rustc_hash::FxHashMap;

use qualgen_ir::expr::Expr;
use qualgen_ir::{classify_rules, FInfo, Qualifier, Sort};

use qualgen_solve::{collect_sym_sorts, expand, extract_qualifiers, extract_solution, normalize_finfo, serialize, unroll_query};

/// Runs the pure pipeline stages (normalize, unroll, Or-expand, extract)
/// exactly as `qualgen_driver::run_pipeline` does, but with `interpolant_for`
/// standing in for a live solver session: for every assertion the real
/// driver would push to the SMT process, this calls `interpolant_for` once
/// per cut the serializer expects and feeds the results straight to
/// `extract_solution`, the way chalk's own test harness drives its solver
/// through an in-process `ChalkDatabase` rather than an external process.
///
/// This only exercises the deterministic half of the pipeline — nothing
/// here talks to `qualgen_smt` at all, so these tests never depend on a
/// `mathsat`/`z3`/`cvc4` binary being on PATH.
pub fn run_offline(finfo: &FInfo, depth: usize, interpolant_for: impl Fn() -> Expr) -> Vec<Qualifier> {
    let sym_sorts = collect_sym_sorts(finfo);
    let (rules, queries) = normalize_finfo(finfo);
    let kclauses = classify_rules(rules);

    let mut candidates: FxHashMap<_, Vec<Expr>> = FxHashMap::default();
    for query in &queries {
        let (tree, state) = unroll_query(query, depth, &kclauses, &sym_sorts);
        for expanded in expand(&tree) {
            let (_, expected_cuts) = serialize(&expanded);
            let interpolants: Vec<Expr> = (0..expected_cuts).map(|_| interpolant_for()).collect();
            let found = extract_solution(&expanded, interpolants, state.unroll_subs())
                .expect("canned interpolant count always matches the serializer's cut count");
            for (k, exprs) in found {
                candidates.entry(k).or_insert_with(Vec::new).extend(exprs);
            }
        }
    }

    let mut kvar_vv_sorts: FxHashMap<_, Sort> = FxHashMap::default();
    for k in finfo.kvars_under_consideration() {
        if let Some(sig) = finfo.kvar_signature(*k) {
            if let Some(sort) = sig.first() {
                kvar_vv_sorts.insert(*k, sort.clone());
            }
        }
    }

    extract_qualifiers(&candidates, &sym_sorts, &kvar_vv_sorts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use qualgen_ir::expr::RelOp;
    use qualgen_ir::{Binding, ConstraintId, KVar, Symbol, SubtypingConstraint};

    #[test]
    fn offline_run_on_an_empty_finfo_produces_no_qualifiers() {
        let finfo = FInfo::new();
        let quals = run_offline(&finfo, 2, || Expr::bool(true));
        assert!(quals.is_empty());
    }

    #[test]
    fn a_single_non_recursive_query_extracts_the_canned_interpolant() {
        let mut finfo = FInfo::new();
        finfo.declare(Symbol::intern("x"), Sort::Int);
        finfo.declare_kvar(KVar::intern("K"), vec![Sort::Int]);
        finfo.add_constraint(SubtypingConstraint {
            id: ConstraintId(0),
            env: vec![],
            lhs: Binding {
                sym: Symbol::intern("x"),
                refinement: Expr::rel(RelOp::Ge, Expr::vv(), Expr::int(0)),
            },
            rhs: Binding {
                sym: Symbol::intern("x"),
                refinement: Expr::rel(RelOp::Lt, Expr::vv(), Expr::int(0)),
            },
        });

        let canned = Expr::rel(RelOp::Ge, Expr::vv(), Expr::int(0));
        let quals = run_offline(&finfo, 2, move || canned.clone());
        // No k-var occurs anywhere in this constraint, so it's a pure
        // query with no candidates to extract; this only checks the
        // offline harness runs to completion without panicking.
        assert!(quals.is_empty());
    }
}
