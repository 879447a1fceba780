use std::fmt;

use qualgen_ir::{QError, QResult};

/// A parsed S-expression: either an atom (a token) or a parenthesized
/// list of further S-expressions. This is the wire shape everything the
/// solver sends back over stdout is parsed into before being interpreted
/// as an `Expr` (§4.5 "S-expression parser").
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum SExpr {
    Atom(String),
    List(Vec<SExpr>),
}

impl SExpr {
    pub fn atom(s: impl Into<String>) -> SExpr {
        SExpr::Atom(s.into())
    }

    pub fn list(items: Vec<SExpr>) -> SExpr {
        SExpr::List(items)
    }

    pub fn as_atom(&self) -> Option<&str> {
        match self {
            SExpr::Atom(s) => Some(s),
            SExpr::List(_) => None,
        }
    }

    pub fn as_list(&self) -> Option<&[SExpr]> {
        match self {
            SExpr::List(items) => Some(items),
            SExpr::Atom(_) => None,
        }
    }
}

impl fmt::Display for SExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SExpr::Atom(s) => write!(f, "{}", s),
            SExpr::List(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, ")")
            }
        }
    }
}

/// Parses every top-level S-expression out of `input` (one SMT-LIB
/// response line may contain several, e.g. a `sat`/`unsat` token followed
/// by interpolant terms).
pub fn parse_sexprs(input: &str) -> QResult<Vec<SExpr>> {
    let tokens = tokenize(input);
    let mut pos = 0;
    let mut out = vec![];
    while pos < tokens.len() {
        let (expr, next) = parse_one(&tokens, pos)?;
        out.push(expr);
        pos = next;
    }
    Ok(out)
}

fn tokenize(input: &str) -> Vec<String> {
    let mut tokens = vec![];
    let mut chars = input.chars().peekable();
    while let Some(&c) = chars.peek() {
        match c {
            '(' | ')' => {
                tokens.push(c.to_string());
                chars.next();
            }
            c if c.is_whitespace() => {
                chars.next();
            }
            ';' => {
                // line comment: consume to end of line
                while let Some(&c) = chars.peek() {
                    chars.next();
                    if c == '\n' {
                        break;
                    }
                }
            }
            _ => {
                let mut tok = String::new();
                while let Some(&c) = chars.peek() {
                    if c == '(' || c == ')' || c.is_whitespace() {
                        break;
                    }
                    tok.push(c);
                    chars.next();
                }
                tokens.push(tok);
            }
        }
    }
    tokens
}

fn parse_one(tokens: &[String], pos: usize) -> QResult<(SExpr, usize)> {
    let tok = tokens.get(pos).ok_or_else(|| QError::SmtProtocolError {
        message: "unexpected end of input while parsing s-expression".into(),
    })?;
    if tok == "(" {
        let mut items = vec![];
        let mut cursor = pos + 1;
        loop {
            match tokens.get(cursor) {
                Some(t) if t == ")" => return Ok((SExpr::List(items), cursor + 1)),
                Some(_) => {
                    let (item, next) = parse_one(tokens, cursor)?;
                    items.push(item);
                    cursor = next;
                }
                None => {
                    return Err(QError::SmtProtocolError {
                        message: "unclosed s-expression list".into(),
                    })
                }
            }
        }
    } else if tok == ")" {
        Err(QError::SmtProtocolError {
            message: "unexpected ')' in s-expression".into(),
        })
    } else {
        Ok((SExpr::Atom(tok.clone()), pos + 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flat_atom() {
        let out = parse_sexprs("unsat").unwrap();
        assert_eq!(out, vec![SExpr::atom("unsat")]);
    }

    #[test]
    fn parses_nested_list() {
        let out = parse_sexprs("(and (= x 1) (not y))").unwrap();
        assert_eq!(
            out,
            vec![SExpr::list(vec![
                SExpr::atom("and"),
                SExpr::list(vec![SExpr::atom("="), SExpr::atom("x"), SExpr::atom("1")]),
                SExpr::list(vec![SExpr::atom("not"), SExpr::atom("y")]),
            ])]
        );
    }

    #[test]
    fn parses_multiple_top_level_forms() {
        let out = parse_sexprs("unsat (and true false)").unwrap();
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn display_round_trips_structurally() {
        let original = "(ite (> x 0) x (- x))";
        let parsed = parse_sexprs(original).unwrap();
        let text = parsed[0].to_string();
        let reparsed = parse_sexprs(&text).unwrap();
        assert_eq!(parsed, reparsed);
    }

    #[test]
    fn unclosed_list_is_a_protocol_error() {
        assert!(parse_sexprs("(and true").is_err());
    }
}
