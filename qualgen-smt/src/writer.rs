use qualgen_ir::expr::{ArithOp, Const, Expr, RelOp};
use qualgen_ir::{QError, QResult, Sort, Symbol};

use crate::sexpr::SExpr;

/// Renders a sort the way `declare-fun`/`declare-const` expect it.
pub fn sort_to_text(sort: &Sort) -> String {
    match sort {
        Sort::Int => "Int".to_string(),
        Sort::Bool => "Bool".to_string(),
        Sort::Real => "Real".to_string(),
        Sort::Named(name, args) if args.is_empty() => name.to_string(),
        Sort::Named(name, args) => {
            let parts: Vec<String> = args.iter().map(sort_to_text).collect();
            format!("({} {})", name, parts.join(" "))
        }
    }
}

/// `(declare-fun <sym> () <sort>)` — a nullary function is how this
/// pipeline's symbols (always scalars, never uninterpreted-function
/// applications of positive arity) are declared (§4.5 step 2).
pub fn declare_fun(sym: Symbol, sort: &Sort) -> String {
    format!("(declare-fun {} () {})", sym, sort_to_text(sort))
}

/// Converts an `Expr` into its SMT-LIB2 S-expression form (the inverse of
/// `sexpr_to_expr`). `Interp` cut markers are rendered as `(! φ :named
/// p-<id>)` labels (§6 "SMT wire protocol"); the label counter is shared
/// across one call so cut labels number consistently within a formula.
pub fn expr_to_sexpr(e: &Expr, next_label: &mut usize) -> SExpr {
    match e {
        Expr::Const(Const::Int(i)) => int_literal(*i),
        Expr::Const(Const::Real(r)) => SExpr::atom(format!("{}", r.0)),
        Expr::Const(Const::Bool(b)) => SExpr::atom(if *b { "true" } else { "false" }),
        Expr::Var(s) => SExpr::atom(s.to_string()),
        Expr::Neg(a) => SExpr::list(vec![SExpr::atom("-"), expr_to_sexpr(a, next_label)]),
        Expr::Arith(op, a, b) => SExpr::list(vec![
            SExpr::atom(op.as_str()),
            expr_to_sexpr(a, next_label),
            expr_to_sexpr(b, next_label),
        ]),
        Expr::Rel(op, a, b) => SExpr::list(vec![
            SExpr::atom(op.as_str()),
            expr_to_sexpr(a, next_label),
            expr_to_sexpr(b, next_label),
        ]),
        Expr::And(es) => {
            let mut items = vec![SExpr::atom("and")];
            items.extend(es.iter().map(|e| expr_to_sexpr(e, next_label)));
            SExpr::list(items)
        }
        Expr::Or(es) => {
            let mut items = vec![SExpr::atom("or")];
            items.extend(es.iter().map(|e| expr_to_sexpr(e, next_label)));
            SExpr::list(items)
        }
        Expr::Not(a) => SExpr::list(vec![SExpr::atom("not"), expr_to_sexpr(a, next_label)]),
        Expr::Implies(a, b) => SExpr::list(vec![
            SExpr::atom("=>"),
            expr_to_sexpr(a, next_label),
            expr_to_sexpr(b, next_label),
        ]),
        Expr::Iff(a, b) => SExpr::list(vec![
            SExpr::atom("="),
            expr_to_sexpr(a, next_label),
            expr_to_sexpr(b, next_label),
        ]),
        Expr::Exists(binders, body) => {
            let bindings = binders
                .iter()
                .map(|(s, sort)| SExpr::list(vec![SExpr::atom(s.to_string()), SExpr::atom(sort_to_text(sort))]))
                .collect();
            SExpr::list(vec![
                SExpr::atom("exists"),
                SExpr::List(bindings),
                expr_to_sexpr(body, next_label),
            ])
        }
        Expr::Ite(c, t, f) => SExpr::list(vec![
            SExpr::atom("ite"),
            expr_to_sexpr(c, next_label),
            expr_to_sexpr(t, next_label),
            expr_to_sexpr(f, next_label),
        ]),
        Expr::App(f, args) => {
            let mut items = vec![SExpr::atom(f.to_string())];
            items.extend(args.iter().map(|a| expr_to_sexpr(a, next_label)));
            SExpr::list(items)
        }
        Expr::KVarApp(k, sigma) => {
            // A k-var should never survive to serialization (it is always
            // expanded away by unrolling first); render defensively as an
            // uninterpreted application so a stray occurrence fails loud
            // in the solver rather than silently vanishing.
            let mut items = vec![SExpr::atom(k.to_string())];
            items.extend(sigma.iter().map(|(_, v)| expr_to_sexpr(v, next_label)));
            SExpr::list(items)
        }
        Expr::Interp(inner) => {
            let id = *next_label;
            *next_label += 1;
            SExpr::list(vec![
                SExpr::atom("!"),
                expr_to_sexpr(inner, next_label),
                SExpr::atom(":named"),
                SExpr::atom(format!("p-{}", id)),
            ])
        }
    }
}

fn int_literal(i: i64) -> SExpr {
    if i < 0 {
        SExpr::list(vec![SExpr::atom("-"), SExpr::atom((-i).to_string())])
    } else {
        SExpr::atom(i.to_string())
    }
}

/// Parses an S-expression returned by the solver back into an `Expr`
/// (§4.5 "S-expression parser"): recognizes `true`/`false`, variables,
/// `not`/`and`/`or`/`=>`, `=` (logical iff when both operands are
/// themselves formulas, an equality atom otherwise), arithmetic/relational
/// operators, unary minus, `ite`, and arbitrary function application.
/// Any other shape fails with `SmtProtocolError`.
pub fn sexpr_to_expr(s: &SExpr) -> QResult<Expr> {
    match s {
        SExpr::Atom(a) => atom_to_expr(a),
        SExpr::List(items) => list_to_expr(items),
    }
}

fn atom_to_expr(a: &str) -> QResult<Expr> {
    match a {
        "true" => Ok(Expr::bool(true)),
        "false" => Ok(Expr::bool(false)),
        _ => {
            if let Ok(i) = a.parse::<i64>() {
                Ok(Expr::int(i))
            } else {
                Ok(Expr::var(Symbol::intern(a)))
            }
        }
    }
}

fn list_to_expr(items: &[SExpr]) -> QResult<Expr> {
    let head = items.first().and_then(SExpr::as_atom).ok_or_else(|| QError::SmtProtocolError {
        message: "s-expression list does not start with an operator atom".into(),
    })?;
    let args = &items[1..];

    let parse_all = |args: &[SExpr]| -> QResult<Vec<Expr>> { args.iter().map(sexpr_to_expr).collect() };

    match head {
        "not" => {
            let [a] = require_arity(args, 1)?;
            Ok(Expr::not(sexpr_to_expr(a)?))
        }
        "and" => Ok(Expr::and(parse_all(args)?)),
        "or" => Ok(Expr::or(parse_all(args)?)),
        "=>" => {
            let [a, b] = require_arity(args, 2)?;
            Ok(Expr::Implies(
                std::sync::Arc::new(sexpr_to_expr(a)?),
                std::sync::Arc::new(sexpr_to_expr(b)?),
            ))
        }
        "=" => {
            let [a, b] = require_arity(args, 2)?;
            let a = sexpr_to_expr(a)?;
            let b = sexpr_to_expr(b)?;
            if is_formula(&a) && is_formula(&b) {
                Ok(Expr::Iff(std::sync::Arc::new(a), std::sync::Arc::new(b)))
            } else {
                Ok(Expr::rel(RelOp::Eq, a, b))
            }
        }
        "-" if args.len() == 1 => Ok(Expr::Neg(std::sync::Arc::new(sexpr_to_expr(&args[0])?))),
        "+" | "-" | "*" | "/" | "mod" => {
            let [a, b] = require_arity(args, 2)?;
            let op = match head {
                "+" => ArithOp::Add,
                "-" => ArithOp::Sub,
                "*" => ArithOp::Mul,
                "/" => ArithOp::Div,
                "mod" => ArithOp::Mod,
                _ => unreachable!(),
            };
            Ok(Expr::arith(op, sexpr_to_expr(a)?, sexpr_to_expr(b)?))
        }
        "<" | "<=" | ">" | ">=" | "distinct" => {
            let [a, b] = require_arity(args, 2)?;
            let op = match head {
                "<" => RelOp::Lt,
                "<=" => RelOp::Le,
                ">" => RelOp::Gt,
                ">=" => RelOp::Ge,
                "distinct" => RelOp::Ne,
                _ => unreachable!(),
            };
            Ok(Expr::rel(op, sexpr_to_expr(a)?, sexpr_to_expr(b)?))
        }
        "ite" => {
            let [c, t, f] = require_arity(args, 3)?;
            Ok(Expr::Ite(
                std::sync::Arc::new(sexpr_to_expr(c)?),
                std::sync::Arc::new(sexpr_to_expr(t)?),
                std::sync::Arc::new(sexpr_to_expr(f)?),
            ))
        }
        name => Ok(Expr::App(Symbol::intern(name), parse_all(args)?)),
    }
}

fn require_arity<const N: usize>(args: &[SExpr], n: usize) -> QResult<[&SExpr; N]> {
    if args.len() != n {
        return Err(QError::SmtProtocolError {
            message: format!("expected {} argument(s), got {}", n, args.len()),
        });
    }
    let mut out = [args.first().unwrap_or(&args[0]); N];
    for i in 0..N {
        out[i] = &args[i];
    }
    Ok(out)
}

/// Crude syntactic check used only to disambiguate `=` between two
/// formulas (parsed as `Iff`) and `=` between two terms (parsed as an
/// equality atom), per §4.5.
fn is_formula(e: &Expr) -> bool {
    matches!(
        e,
        Expr::Const(Const::Bool(_))
            | Expr::And(_)
            | Expr::Or(_)
            | Expr::Not(_)
            | Expr::Implies(..)
            | Expr::Iff(..)
            | Expr::Rel(..)
    )
}
