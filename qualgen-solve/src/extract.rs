use std::collections::VecDeque;

use rustc_hash::FxHashMap;
use tracing::instrument;

use qualgen_ir::expr::{renumber_integer_symbols, Expr, Substitution};
use qualgen_ir::query_tree::{InterpQuery, NodeInfo, TreeInterp};
use qualgen_ir::{KVar, QError, QResult, Symbol};

use crate::serialize::serialize;

/// Rehydrates an SMT solver's flat interpolant response into the
/// `TreeInterp` shape implied by `tree`, then walks it to collect, for
/// every k-var occurrence, its candidate predicate (§4.6).
///
/// The interpolant count is checked against the serializer's cut count
/// up front and treated as a protocol error on mismatch — resolving the
/// "PFalse tail" open question: no padding value is appended to make a
/// short response line up.
#[instrument(skip(tree, interpolants, unroll_subs))]
pub fn extract_solution(
    tree: &InterpQuery,
    interpolants: Vec<Expr>,
    unroll_subs: &FxHashMap<Symbol, Symbol>,
) -> QResult<FxHashMap<KVar, Vec<Expr>>> {
    let (_formula, expected_cuts) = serialize(tree);
    if interpolants.len() != expected_cuts {
        return Err(QError::CutInterpolantMismatch {
            expected_cuts,
            got: interpolants.len(),
        });
    }

    let mut queue: VecDeque<Expr> = interpolants.into();
    let tree_interp = build_tree_interp(tree, false, &mut queue)?;

    let mut candidates: FxHashMap<KVar, Vec<Expr>> = FxHashMap::default();
    collect_candidates(&tree_interp, unroll_subs, &mut candidates);
    Ok(candidates)
}

/// Consumes one interpolant per cut point in the same pre-order the query
/// serializer assigned cut positions in (§4.4's `wrap`: a node's own
/// position is reserved before its children's nested cuts are counted).
fn build_tree_interp(
    tree: &InterpQuery,
    self_is_cut: bool,
    interpolants: &mut VecDeque<Expr>,
) -> QResult<TreeInterp> {
    match tree {
        InterpQuery::Or { info, children } => {
            let built = children
                .iter()
                .map(|c| build_tree_interp(c, matches!(c, InterpQuery::And { .. }), interpolants))
                .collect::<QResult<Vec<_>>>()?;
            Ok(TreeInterp::Or {
                info: *info,
                children: built,
            })
        }
        InterpQuery::And { info, children, .. } => {
            let interpolant = if self_is_cut {
                interpolants.pop_front().ok_or_else(|| QError::SmtProtocolError {
                    message: "interpolant stream exhausted before all cuts were consumed".into(),
                })?
            } else {
                Expr::bool(true)
            };
            let built_children = children
                .iter()
                .map(|c| build_tree_interp(c, matches!(c, InterpQuery::And { .. }), interpolants))
                .collect::<QResult<Vec<_>>>()?;
            Ok(TreeInterp::And {
                info: *info,
                interpolant,
                children: built_children,
            })
        }
    }
}

/// Transforms one node's interpolant (§4.6 step 1). The node's own
/// `info.sym` (if any) is rehydrated to `vv` first, since it would
/// otherwise be indistinguishable from any other fresh symbol once
/// `unrollSubs` is applied; everything else is then reversed through
/// `unrollSubs` (fresh symbol -> original). Finally reverses the
/// numberification renaming (§4.6 step 3).
fn transform_node(
    interpolant: &Expr,
    info: Option<NodeInfo>,
    unroll_subs: &FxHashMap<Symbol, Symbol>,
) -> Expr {
    let mut out = interpolant.clone();
    if let Some(info) = info {
        let rehydrate_vv = Substitution::singleton(info.sym, Expr::var(Symbol::vv()));
        out = out.apply(&rehydrate_vv);
    }
    let reverse_unroll = Substitution::from_entries(
        unroll_subs
            .iter()
            .filter(|(fresh, _)| Some(**fresh) != info.map(|i| i.sym))
            .map(|(fresh, original)| (*fresh, Expr::var(*original)))
            .collect(),
    );
    out = out.apply(&reverse_unroll);
    renumber_integer_symbols(&out)
}

/// Walks a `TreeInterp` top-down, collecting each `info`-tagged node's
/// transformed expression into `candidates[K]` (§4.6 step 2).
fn collect_candidates(
    tree: &TreeInterp,
    unroll_subs: &FxHashMap<Symbol, Symbol>,
    candidates: &mut FxHashMap<KVar, Vec<Expr>>,
) {
    match tree {
        TreeInterp::And {
            info,
            interpolant,
            children,
        } => {
            if let Some(info) = info {
                let transformed = transform_node(interpolant, Some(*info), unroll_subs);
                candidates.entry(info.k).or_insert_with(Vec::new).push(transformed);
            }
            for c in children {
                collect_candidates(c, unroll_subs, candidates);
            }
        }
        TreeInterp::Or { children, .. } => {
            for c in children {
                collect_candidates(c, unroll_subs, candidates);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mismatched_interpolant_count_is_a_protocol_error() {
        let tree = InterpQuery::And {
            info: None,
            root: Expr::bool(true),
            children: vec![InterpQuery::leaf_and(Expr::bool(true))],
        };
        let err = extract_solution(&tree, vec![], &FxHashMap::default());
        assert!(err.is_err());
    }

    #[test]
    fn single_cut_candidate_is_collected_for_its_kvar() {
        let k = KVar::intern("K");
        let sym = Symbol::intern("s@0");
        let info = NodeInfo { k, sym };
        let tree = InterpQuery::And {
            info: None,
            root: Expr::bool(true),
            children: vec![InterpQuery::And {
                info: Some(info),
                root: Expr::bool(true),
                children: vec![],
            }],
        };
        let mut unroll_subs = FxHashMap::default();
        unroll_subs.insert(sym, Symbol::intern("orig"));
        let candidates = extract_solution(&tree, vec![Expr::var(sym)], &unroll_subs).unwrap();
        assert_eq!(candidates.get(&k).unwrap().len(), 1);
        assert_eq!(candidates[&k][0], Expr::var(Symbol::vv()));
    }

    #[test]
    fn query_with_no_cuts_yields_no_candidates() {
        let tree = InterpQuery::leaf_and(Expr::bool(true));
        let candidates = extract_solution(&tree, vec![], &FxHashMap::default()).unwrap();
        assert!(candidates.is_empty());
    }
}
