//! Wires the pure pipeline stages in `qualgen_solve` to a live SMT
//! subprocess via `qualgen_smt`, and exposes one entry point —
//! `run_pipeline` — the way `chalk-integration`'s `ChalkDatabase` owns the
//! program and exposes one `solve` entry point over it
//! (`chalk-integration/src/lib.rs`).

pub mod config;

use rustc_hash::FxHashMap;
use tracing::instrument;

use qualgen_ir::{classify_rules, Expr, FInfo, KVar, QResult, Qualifier, Sort, Symbol};
use qualgen_smt::{declare_fun, expr_to_sexpr, sexpr_to_expr, DialogueLog, SolverSession};
use qualgen_solve::{
    collect_sym_sorts, expand_deep, extract_qualifiers, extract_solution, normalize_finfo, serialize_deep,
    unroll_query,
};

pub use config::SolverConfig;

/// Runs the full pipeline over `finfo` end to end: normalize its raw
/// constraints into rules and queries, unroll and Or-expand every query,
/// serialize and interpolate each resulting tree query against a live
/// solver session, and extract the final deduplicated qualifier list
/// (§4.1–§4.8).
#[instrument(skip(finfo, config))]
pub fn run_pipeline(finfo: &FInfo, config: &SolverConfig) -> QResult<Vec<Qualifier>> {
    let sym_sorts = collect_sym_sorts(finfo);
    let (rules, queries) = normalize_finfo(finfo);
    let kclauses = classify_rules(rules);

    let log = match &config.log_path {
        Some(path) => DialogueLog::open(path)?,
        None => DialogueLog::disabled(),
    };
    let mut session = SolverSession::spawn(config.backend, config.solver_path.as_deref(), log)?;

    let mut declared: std::collections::HashSet<Symbol> = std::collections::HashSet::new();
    for (sym, sort) in sym_sorts.iter() {
        session.declare_fun(&declare_fun(*sym, sort))?;
        declared.insert(*sym);
    }

    let mut candidates: FxHashMap<KVar, Vec<Expr>> = FxHashMap::default();

    for query in &queries {
        let (tree, state) = unroll_query(query, config.depth, &kclauses, &sym_sorts);

        for (sym, sort) in state.created_symbols() {
            if declared.insert(*sym) {
                session.declare_fun(&declare_fun(*sym, sort))?;
            }
        }

        for expanded in expand_deep(&tree, config.depth_threshold) {
            let (formula, expected_cuts) = serialize_deep(&expanded, config.depth_threshold);

            session.push()?;
            let mut label = 0;
            let sexpr = expr_to_sexpr(&formula, &mut label);
            session.assert(&format!("(assert {})", sexpr))?;

            let raw_terms = session.check_and_interpolate()?;
            let interpolants = raw_terms
                .iter()
                .map(sexpr_to_expr)
                .collect::<QResult<Vec<_>>>()?;
            debug_assert_eq!(
                interpolants.len(),
                expected_cuts,
                "solver returned a different interpolant count than the serializer's cut count"
            );
            let found = extract_solution(&expanded, interpolants, state.unroll_subs())?;
            for (k, exprs) in found {
                candidates.entry(k).or_insert_with(Vec::new).extend(exprs);
            }
            session.pop()?;
        }
    }
    session.shutdown()?;

    let mut kvar_vv_sorts: FxHashMap<KVar, Sort> = FxHashMap::default();
    for k in finfo.kvars_under_consideration() {
        if let Some(sig) = finfo.kvar_signature(*k) {
            if let Some(sort) = sig.first() {
                kvar_vv_sorts.insert(*k, sort.clone());
            }
        }
    }

    Ok(extract_qualifiers(&candidates, &sym_sorts, &kvar_vv_sorts))
}
