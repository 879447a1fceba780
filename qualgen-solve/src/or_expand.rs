use itertools::Itertools;
use tracing::instrument;

use qualgen_ir::query_tree::{InterpQuery, NodeInfo};

use crate::serialize::tree_depth;

/// Converts a disjunctive interpolation query into the finite list of
/// tree-interpolation queries it denotes (§4.3). Plain recursion; see
/// `expand_deep` for the explicit-work-stack variant §9 requires once a
/// tree is deep enough that this risks the call stack.
#[instrument(skip(tree))]
pub fn expand(tree: &InterpQuery) -> Vec<InterpQuery> {
    expand_lifting(tree, None)
}

/// Explicit work-stack variant of `expand`, used once a tree is deep enough
/// that plain recursion risks the stack (§9 "use explicit work-stacks for
/// `expand` and `genQueryFormula` once depth exceeds a few hundred"). Both
/// produce identical results; callers pick based on measured tree depth,
/// the same way `serialize_deep` picks between `serialize`/`emit_iterative`.
pub fn expand_deep(tree: &InterpQuery, depth_threshold: usize) -> Vec<InterpQuery> {
    if tree_depth(tree) <= depth_threshold {
        return expand(tree);
    }
    expand_iterative(tree)
}

/// Expands `node` under an ambient `lift_info`: an `And` node with no tag
/// of its own inherits `lift_info` (the case of an And-child lifted
/// directly out from under an `Or` parent, §4.3 "lifting an And-child's own
/// root through any surrounding `Or(i, ...)`, attaching `i` to the lifted
/// And"); an `Or` node ignores `lift_info` since only its own children can
/// inherit a tag, and only from this `Or` itself.
fn expand_lifting(node: &InterpQuery, lift_info: Option<NodeInfo>) -> Vec<InterpQuery> {
    match node {
        InterpQuery::Or { info, children } => children
            .iter()
            .flat_map(|c| expand_lifting(c, *info))
            .collect(),
        InterpQuery::And { info, root, children } => {
            let tagged_info = info.or(lift_info);
            if children.is_empty() {
                vec![InterpQuery::And {
                    info: tagged_info,
                    root: root.clone(),
                    children: vec![],
                }]
            } else {
                let per_child: Vec<Vec<InterpQuery>> =
                    children.iter().map(|c| expand_lifting(c, None)).collect();
                per_child
                    .into_iter()
                    .multi_cartesian_product()
                    .map(|combo| InterpQuery::And {
                        info: tagged_info,
                        root: root.clone(),
                        children: combo,
                    })
                    .collect()
            }
        }
    }
}

/// Post-order traversal over an explicit stack, functionally identical to
/// `expand_lifting` but bounded by heap rather than call-stack depth.
fn expand_iterative(root_tree: &InterpQuery) -> Vec<InterpQuery> {
    enum Frame<'a> {
        Enter(&'a InterpQuery, Option<NodeInfo>),
        CombineOr(usize),
        CombineAnd(Option<NodeInfo>, &'a qualgen_ir::expr::Expr, usize),
    }

    let mut stack = vec![Frame::Enter(root_tree, None)];
    let mut results: Vec<Vec<InterpQuery>> = vec![];

    while let Some(frame) = stack.pop() {
        match frame {
            Frame::Enter(node, lift_info) => match node {
                InterpQuery::Or { info, children } => {
                    stack.push(Frame::CombineOr(children.len()));
                    for c in children {
                        stack.push(Frame::Enter(c, *info));
                    }
                }
                InterpQuery::And { info, root, children } => {
                    let tagged_info = info.or(lift_info);
                    if children.is_empty() {
                        results.push(vec![InterpQuery::And {
                            info: tagged_info,
                            root: root.clone(),
                            children: vec![],
                        }]);
                    } else {
                        stack.push(Frame::CombineAnd(tagged_info, root, children.len()));
                        for c in children {
                            stack.push(Frame::Enter(c, None));
                        }
                    }
                }
            },
            Frame::CombineOr(n) => {
                let mut parts: Vec<Vec<InterpQuery>> =
                    (0..n).map(|_| results.pop().unwrap()).collect();
                parts.reverse();
                results.push(parts.into_iter().flatten().collect());
            }
            Frame::CombineAnd(tagged_info, root, n) => {
                let mut per_child: Vec<Vec<InterpQuery>> =
                    (0..n).map(|_| results.pop().unwrap()).collect();
                per_child.reverse();
                let combos: Vec<InterpQuery> = per_child
                    .into_iter()
                    .multi_cartesian_product()
                    .map(|combo| InterpQuery::And {
                        info: tagged_info,
                        root: root.clone(),
                        children: combo,
                    })
                    .collect();
                results.push(combos);
            }
        }
    }

    results.pop().unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use qualgen_ir::expr::Expr;
    use qualgen_ir::{KVar, Symbol};

    fn leaf(n: i64) -> InterpQuery {
        InterpQuery::leaf_and(Expr::int(n))
    }

    #[test]
    fn single_and_leaf_expands_to_itself() {
        let tree = leaf(1);
        let out = expand(&tree);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn or_of_two_leaves_expands_to_two_queries() {
        let tree = InterpQuery::Or {
            info: None,
            children: vec![leaf(1), leaf(2)],
        };
        assert_eq!(expand(&tree).len(), 2);
    }

    #[test]
    fn nested_or_children_combine_multiplicatively() {
        let or_a = InterpQuery::Or {
            info: None,
            children: vec![leaf(1), leaf(2)],
        };
        let or_b = InterpQuery::Or {
            info: None,
            children: vec![leaf(3), leaf(4)],
        };
        let root = InterpQuery::And {
            info: None,
            root: Expr::bool(true),
            children: vec![or_a, or_b],
        };
        // 2 alternatives for the first Or times 2 for the second = 4.
        assert_eq!(expand(&root).len(), 4);
    }

    #[test]
    fn lifted_and_child_inherits_surrounding_or_info() {
        let info = NodeInfo {
            k: KVar::intern("K"),
            sym: Symbol::intern("s"),
        };
        let tree = InterpQuery::Or {
            info: Some(info),
            children: vec![leaf(1)],
        };
        let out = expand(&tree);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].info(), Some(info));
    }

    /// Deep right-leaning chain of nested Ands, each wrapping the next:
    /// `expand_deep` with a threshold below the chain's depth must take the
    /// iterative path and still agree with plain `expand`.
    #[test]
    fn expand_deep_agrees_with_expand_on_a_deep_chain() {
        let mut tree = leaf(0);
        for i in 1..300 {
            tree = InterpQuery::And {
                info: None,
                root: Expr::bool(true),
                children: vec![tree, leaf(i)],
            };
        }
        let recursive = expand(&tree);
        let iterative = expand_deep(&tree, 10);
        assert_eq!(recursive.len(), iterative.len());
        assert_eq!(recursive, iterative);
    }

    #[test]
    fn expand_deep_below_threshold_matches_expand() {
        let tree = InterpQuery::Or {
            info: None,
            children: vec![leaf(1), leaf(2)],
        };
        assert_eq!(expand_deep(&tree, 100), expand(&tree));
    }
}
