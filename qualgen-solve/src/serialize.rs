use qualgen_ir::expr::Expr;
use qualgen_ir::query_tree::InterpQuery;
use tracing::instrument;

/// Emits the single formula `F(t)` for a (fully Or-expanded) tree-shaped
/// interpolation query, and the number of `Interp` cut markers it
/// contains (§4.4). The count is what the SMT driver expects back as the
/// number of interpolants in the response stream.
#[instrument(skip(tree))]
pub fn serialize(tree: &InterpQuery) -> (Expr, usize) {
    let mut cuts = 0;
    let formula = emit(tree, &mut cuts);
    (formula, cuts)
}

/// Explicit work-stack variant of `emit`, used once a tree is deep enough
/// that plain recursion risks the stack (§9 "use explicit work-stacks for
/// `expand` and `genQueryFormula` once depth exceeds a few hundred"). Both
/// produce identical formulas; callers pick based on measured tree depth.
pub fn serialize_deep(tree: &InterpQuery, depth_threshold: usize) -> (Expr, usize) {
    if tree_depth(tree) <= depth_threshold {
        return serialize(tree);
    }
    let mut cuts = 0;
    let formula = emit_iterative(tree, &mut cuts);
    (formula, cuts)
}

/// Shared with `or_expand::expand_deep`, which picks its own iterative vs.
/// recursive strategy by the same measured depth.
pub(crate) fn tree_depth(tree: &InterpQuery) -> usize {
    1 + tree
        .children()
        .iter()
        .map(tree_depth)
        .max()
        .unwrap_or(0)
}

fn emit(tree: &InterpQuery, cuts: &mut usize) -> Expr {
    match tree {
        InterpQuery::Or { children, .. } => {
            Expr::or(children.iter().map(|c| emit(c, cuts)).collect())
        }
        InterpQuery::And { root, children, .. } => {
            let mut atoms = vec![root.clone()];
            for child in children {
                atoms.push(wrap(child, cuts));
            }
            Expr::and(atoms)
        }
    }
}

/// `wrap` tags And-children with an `Interp` cut marker and leaves
/// Or-children untagged (§4.4).
fn wrap(child: &InterpQuery, cuts: &mut usize) -> Expr {
    match child {
        InterpQuery::And { .. } => {
            *cuts += 1;
            Expr::interp(emit(child, cuts))
        }
        InterpQuery::Or { .. } => emit(child, cuts),
    }
}

/// Post-order traversal over an explicit stack, functionally identical to
/// `emit` but bounded by heap rather than call-stack depth.
fn emit_iterative(root_tree: &InterpQuery, cuts: &mut usize) -> Expr {
    enum Frame<'a> {
        Enter(&'a InterpQuery),
        CombineOr(usize),
        /// root atom, and for each child (in order) whether it was an
        /// And-node and so must come back wrapped in `Interp`.
        CombineAnd(&'a Expr, Vec<bool>),
    }

    let mut stack = vec![Frame::Enter(root_tree)];
    let mut results: Vec<Expr> = vec![];

    while let Some(frame) = stack.pop() {
        match frame {
            Frame::Enter(node) => match node {
                InterpQuery::Or { children, .. } => {
                    stack.push(Frame::CombineOr(children.len()));
                    for c in children {
                        stack.push(Frame::Enter(c));
                    }
                }
                InterpQuery::And { root, children, .. } => {
                    let flags = children
                        .iter()
                        .map(|c| matches!(c, InterpQuery::And { .. }))
                        .collect();
                    stack.push(Frame::CombineAnd(root, flags));
                    for c in children {
                        stack.push(Frame::Enter(c));
                    }
                }
            },
            Frame::CombineOr(n) => {
                let mut parts: Vec<Expr> = (0..n).map(|_| results.pop().unwrap()).collect();
                parts.reverse();
                results.push(Expr::or(parts));
            }
            Frame::CombineAnd(root, flags) => {
                let mut popped: Vec<Expr> = (0..flags.len()).map(|_| results.pop().unwrap()).collect();
                popped.reverse();
                let mut atoms = vec![root.clone()];
                for (result, is_and) in popped.into_iter().zip(flags) {
                    if is_and {
                        *cuts += 1;
                        atoms.push(Expr::interp(result));
                    } else {
                        atoms.push(result);
                    }
                }
                results.push(Expr::and(atoms));
            }
        }
    }

    results.pop().unwrap()
}
