use std::collections::{HashMap, HashSet};

use serde_derive::Deserialize;

use qualgen_ir::expr::{ArithOp, Expr, RelOp, Substitution};
use qualgen_ir::{Binding, ConstraintId, FInfo, KVar, QError, QResult, Sort, SubtypingConstraint, Symbol};
use qualgen_smt::{parse_sexprs, SExpr};

/// On-disk shape of an `FInfo` (§6 "Input (from constraint-file loader, out
/// of scope)"). Refinements are written as S-expressions, parsed with the
/// same low-level reader (`qualgen_smt::sexpr`) the SMT driver itself
/// uses, extended with one input-only form — `(kvar K (s e) ...)` — for
/// the k-variable applications that never appear in a solver-facing
/// formula (they're always expanded away before serialization) but are
/// exactly how a raw constraint names its unknowns.
#[derive(Deserialize)]
pub struct FInfoFile {
    #[serde(default)]
    pub bind_env: HashMap<String, String>,
    #[serde(default)]
    pub kvars: HashMap<String, Vec<String>>,
    #[serde(default)]
    pub constraints: Vec<ConstraintFile>,
}

#[derive(Deserialize)]
pub struct BindingFile {
    pub sym: String,
    pub refinement: String,
}

#[derive(Deserialize)]
pub struct ConstraintFile {
    pub id: u32,
    #[serde(default)]
    pub env: Vec<BindingFile>,
    pub lhs: BindingFile,
    pub rhs: BindingFile,
}

pub fn load_finfo(text: &str) -> QResult<FInfo> {
    let file: FInfoFile = serde_json::from_str(text).map_err(|e| QError::InputError {
        location: "finfo file".to_string(),
        message: e.to_string(),
    })?;
    build_finfo(file)
}

fn build_finfo(file: FInfoFile) -> QResult<FInfo> {
    let mut finfo = FInfo::new();
    let kvars: HashSet<String> = file.kvars.keys().cloned().collect();

    for (sym, sort_text) in &file.bind_env {
        finfo.declare(Symbol::intern(sym), parse_sort(sort_text)?);
    }

    for (kvar, sort_texts) in &file.kvars {
        let sorts = sort_texts.iter().map(|s| parse_sort(s)).collect::<QResult<Vec<_>>>()?;
        finfo.declare_kvar(KVar::intern(kvar), sorts);
    }

    for c in &file.constraints {
        let env = c
            .env
            .iter()
            .map(|b| parse_binding(b, &kvars))
            .collect::<QResult<Vec<_>>>()?;
        finfo.add_constraint(SubtypingConstraint {
            id: ConstraintId(c.id),
            env,
            lhs: parse_binding(&c.lhs, &kvars)?,
            rhs: parse_binding(&c.rhs, &kvars)?,
        });
    }

    Ok(finfo)
}

fn parse_binding(b: &BindingFile, kvars: &HashSet<String>) -> QResult<Binding> {
    Ok(Binding {
        sym: Symbol::intern(&b.sym),
        refinement: parse_expr(&b.refinement, kvars)?,
    })
}

fn parse_expr(text: &str, kvars: &HashSet<String>) -> QResult<Expr> {
    let forms = parse_sexprs(text)?;
    let form = forms.first().ok_or_else(|| QError::InputError {
        location: "refinement".to_string(),
        message: "empty refinement expression".to_string(),
    })?;
    sexpr_to_input_expr(form, kvars)
}

/// Like `qualgen_smt::writer::sexpr_to_expr`, but additionally recognizes
/// `(kvar K (s e) (s e) ...)` as a `KVarApp` — the one shape a raw input
/// constraint needs that a solver-facing formula never does.
fn sexpr_to_input_expr(s: &SExpr, kvars: &HashSet<String>) -> QResult<Expr> {
    match s {
        SExpr::Atom(a) => atom_to_expr(a),
        SExpr::List(items) => list_to_input_expr(items, kvars),
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

fn list_to_input_expr(items: &[SExpr], kvars: &HashSet<String>) -> QResult<Expr> {
    let head = items.first().and_then(SExpr::as_atom).ok_or_else(|| QError::InputError {
        location: "refinement".to_string(),
        message: "s-expression list does not start with an operator atom".to_string(),
    })?;
    let args = &items[1..];
    let recur = |e: &SExpr| sexpr_to_input_expr(e, kvars);

    match head {
        "kvar" => {
            let name = args.first().and_then(SExpr::as_atom).ok_or_else(|| QError::InputError {
                location: "refinement".to_string(),
                message: "`kvar` form is missing its k-variable name".to_string(),
            })?;
            let mut entries = vec![];
            for pair in &args[1..] {
                let pair = pair.as_list().ok_or_else(|| QError::InputError {
                    location: "refinement".to_string(),
                    message: "`kvar` substitution entries must be `(symbol expr)` pairs".to_string(),
                })?;
                let key = pair.first().and_then(SExpr::as_atom).ok_or_else(|| QError::InputError {
                    location: "refinement".to_string(),
                    message: "`kvar` substitution key must be an atom".to_string(),
                })?;
                let value = pair.get(1).ok_or_else(|| QError::InputError {
                    location: "refinement".to_string(),
                    message: "`kvar` substitution entry is missing its value".to_string(),
                })?;
                entries.push((Symbol::intern(key), recur(value)?));
            }
            Ok(Expr::kvar_app(KVar::intern(name), Substitution::from_entries(entries)))
        }
        "not" => Ok(Expr::not(recur(single_arg(args)?)?)),
        "and" => Ok(Expr::and(args.iter().map(recur).collect::<QResult<_>>()?)),
        "or" => Ok(Expr::or(args.iter().map(recur).collect::<QResult<_>>()?)),
        "=" => Ok(Expr::rel(RelOp::Eq, recur(two_args(args)?.0)?, recur(two_args(args)?.1)?)),
        "<" => Ok(Expr::rel(RelOp::Lt, recur(two_args(args)?.0)?, recur(two_args(args)?.1)?)),
        "<=" => Ok(Expr::rel(RelOp::Le, recur(two_args(args)?.0)?, recur(two_args(args)?.1)?)),
        ">" => Ok(Expr::rel(RelOp::Gt, recur(two_args(args)?.0)?, recur(two_args(args)?.1)?)),
        ">=" => Ok(Expr::rel(RelOp::Ge, recur(two_args(args)?.0)?, recur(two_args(args)?.1)?)),
        "distinct" => Ok(Expr::rel(RelOp::Ne, recur(two_args(args)?.0)?, recur(two_args(args)?.1)?)),
        "+" => Ok(Expr::arith(ArithOp::Add, recur(two_args(args)?.0)?, recur(two_args(args)?.1)?)),
        "-" if args.len() == 2 => Ok(Expr::arith(ArithOp::Sub, recur(two_args(args)?.0)?, recur(two_args(args)?.1)?)),
        "-" => Ok(Expr::Neg(std::sync::Arc::new(recur(single_arg(args)?)?))),
        "*" => Ok(Expr::arith(ArithOp::Mul, recur(two_args(args)?.0)?, recur(two_args(args)?.1)?)),
        "/" => Ok(Expr::arith(ArithOp::Div, recur(two_args(args)?.0)?, recur(two_args(args)?.1)?)),
        "mod" => Ok(Expr::arith(ArithOp::Mod, recur(two_args(args)?.0)?, recur(two_args(args)?.1)?)),
        "ite" => {
            if args.len() != 3 {
                return Err(QError::InputError {
                    location: "refinement".to_string(),
                    message: "`ite` takes exactly 3 arguments".to_string(),
                });
            }
            Ok(Expr::Ite(
                std::sync::Arc::new(recur(&args[0])?),
                std::sync::Arc::new(recur(&args[1])?),
                std::sync::Arc::new(recur(&args[2])?),
            ))
        }
        name if kvars.contains(name) => {
            Ok(Expr::kvar_app(KVar::intern(name), Substitution::empty()))
        }
        name => Ok(Expr::App(
            Symbol::intern(name),
            args.iter().map(recur).collect::<QResult<_>>()?,
        )),
    }
}

fn single_arg(args: &[SExpr]) -> QResult<&SExpr> {
    if args.len() != 1 {
        return Err(QError::InputError {
            location: "refinement".to_string(),
            message: "expected exactly 1 argument".to_string(),
        });
    }
    Ok(&args[0])
}

fn two_args(args: &[SExpr]) -> QResult<(&SExpr, &SExpr)> {
    if args.len() != 2 {
        return Err(QError::InputError {
            location: "refinement".to_string(),
            message: "expected exactly 2 arguments".to_string(),
        });
    }
    Ok((&args[0], &args[1]))
}

fn parse_sort(text: &str) -> QResult<Sort> {
    Ok(match text {
        "Int" => Sort::Int,
        "Bool" => Sort::Bool,
        "Real" => Sort::Real,
        other => Sort::named(other),
    })
}
