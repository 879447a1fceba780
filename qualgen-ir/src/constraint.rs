use crate::expr::Expr;
use crate::symbol::Symbol;

/// Identifies a single subtyping constraint within an `FInfo`'s constraint
/// map (§6 "constraint map").
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct ConstraintId(pub u32);

/// A refinement attached to a binder: `refinement` is a formula over the
/// distinguished `vv` symbol, and `sym` is the concrete variable it
/// describes. Normalizing a constraint substitutes `sym` for `vv` in
/// `refinement` before the expression is usable (§4.1 step 1).
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Binding {
    pub sym: Symbol,
    pub refinement: Expr,
}

/// A raw subtyping constraint as handed to the clause normalizer (§4.1
/// "Input"): a bound-variable environment plus an LHS and RHS refinement.
/// Normalizing one produces either a `Rule` (RHS is a k-var application)
/// or a `Query` (RHS is a concrete predicate).
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct SubtypingConstraint {
    pub id: ConstraintId,
    pub env: Vec<Binding>,
    pub lhs: Binding,
    pub rhs: Binding,
}
