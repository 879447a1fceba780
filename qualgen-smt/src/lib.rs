//! The SMT-LIB2 dialogue layer: S-expression parsing, `Expr` codec,
//! backend selection, the subprocess state machine, and an optional
//! `.smt2` transcript log. Everything above this crate (`qualgen_solve`)
//! works purely in terms of `Expr`; everything in this crate is the wire
//! format and process plumbing needed to hand an `Expr` to a real solver
//! and get interpolants back.

pub mod backend;
pub mod log;
pub mod process;
pub mod sexpr;
pub mod writer;

pub use backend::{Backend, Z3Version};
pub use log::DialogueLog;
pub use process::SolverSession;
pub use sexpr::{parse_sexprs, SExpr};
pub use writer::{declare_fun, expr_to_sexpr, sexpr_to_expr, sort_to_text};
