//! Term model, substitutions, clause shapes and the error taxonomy shared
//! by every crate in the qualifier-synthesis pipeline.

pub mod clause;
pub mod constraint;
pub mod error;
pub mod expr;
pub mod finfo;
pub mod qualifier;
pub mod query_tree;
pub mod sort;
pub mod symbol;

pub use clause::{classify_rules, Child, KClauses, Query, Rule};
pub use constraint::{Binding, ConstraintId, SubtypingConstraint};
pub use error::{QError, QResult};
pub use expr::{renumber_integer_symbols, ArithOp, Const, Expr, RelOp, Substitution};
pub use finfo::FInfo;
pub use qualifier::{Qualifier, QualifierSource};
pub use query_tree::{InterpQuery, NodeInfo, TreeInterp, UnrollState};
pub use sort::Sort;
pub use symbol::{KVar, Symbol};
