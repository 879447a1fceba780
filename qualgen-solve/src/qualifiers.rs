use rustc_hash::{FxHashMap, FxHashSet};
use tracing::instrument;

use qualgen_ir::expr::Expr;
use qualgen_ir::{KVar, Qualifier, Sort, Symbol};

/// Decomposes every k-var's candidate predicates into atomic qualifiers
/// with typed parameter lists, deduplicated by structural equality across
/// all k-vars (§4.7, §5 "Qualifier deduplication is by structural
/// equality of the expression").
#[instrument(skip(candidates, sym_sorts, kvar_vv_sorts))]
pub fn extract_qualifiers(
    candidates: &FxHashMap<KVar, Vec<Expr>>,
    sym_sorts: &FxHashMap<Symbol, Sort>,
    kvar_vv_sorts: &FxHashMap<KVar, Sort>,
) -> Vec<Qualifier> {
    let mut seen: FxHashSet<Expr> = FxHashSet::default();
    let mut out = vec![];

    // Iterate k-vars in a stable order so output is deterministic (§5
    // "outputs must be deterministic given identical inputs").
    let mut kvars: Vec<&KVar> = candidates.keys().collect();
    kvars.sort_by_key(|k| k.as_str());

    for k in kvars {
        let predicates = &candidates[k];
        let mut ordinal = 0;
        for predicate in predicates {
            for atom in atomic_predicates(predicate) {
                if !seen.insert(atom.clone()) {
                    continue;
                }
                let params = typed_params(&atom, sym_sorts, kvar_vv_sorts.get(k));
                let name = Symbol::intern(&format!("qual_{}_{}", k.as_str(), ordinal));
                out.push(Qualifier::extracted(name, params, atom, k.0, ordinal));
                ordinal += 1;
            }
        }
    }
    out
}

/// Flattens a predicate under conjunction and disjunction to the atomic
/// predicates beneath (§4.7 step 1).
fn atomic_predicates(e: &Expr) -> Vec<Expr> {
    e.atoms().into_iter().cloned().collect()
}

/// Looks up each free symbol's sort (§4.7 step 2), defaulting to integer
/// and using the k-var's own parameter sort for occurrences of `vv`.
fn typed_params(
    atom: &Expr,
    sym_sorts: &FxHashMap<Symbol, Sort>,
    vv_sort: Option<&Sort>,
) -> Vec<(Symbol, Sort)> {
    let mut frees: Vec<Symbol> = atom.free_symbols().into_iter().collect();
    frees.sort_by_key(|s| s.as_str());
    frees
        .into_iter()
        .map(|s| {
            let sort = if s.is_vv() {
                vv_sort.cloned().unwrap_or(Sort::Int)
            } else {
                sym_sorts.get(&s).cloned().unwrap_or(Sort::Int)
            };
            (s, sort)
        })
        .collect()
}
