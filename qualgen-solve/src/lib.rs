//! Clause normalization, unrolling, Or-expansion, query serialization and
//! solution/qualifier extraction: the pure-functional core of the
//! qualifier-synthesis pipeline, sitting between the term model
//! (`qualgen_ir`) and the SMT driver (`qualgen_smt`).

pub mod extract;
pub mod normalize;
pub mod or_expand;
pub mod qualifiers;
pub mod serialize;
pub mod unroll;

pub use extract::extract_solution;
pub use normalize::{collect_sym_sorts, normalize_constraint, normalize_finfo, NormalizedClause};
pub use or_expand::{expand, expand_deep};
pub use qualifiers::extract_qualifiers;
pub use serialize::{serialize, serialize_deep};
pub use unroll::unroll_query;
