use crate::expr::Expr;
use crate::sort::Sort;
use crate::symbol::Symbol;

/// A user-supplied template used to guess candidate predicates for a
/// k-variable, and the shape extracted solutions are matched back against
/// when deduplicating (§3 "Qualifier", §4.7).
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Qualifier {
    pub name: Symbol,
    pub params: Vec<(Symbol, Sort)>,
    pub body: Expr,
    /// Where this qualifier came from, for diagnostics only: either a
    /// user-supplied `.hquals` entry or an index into the extracted
    /// solutions it was derived from.
    pub location: QualifierSource,
}

#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum QualifierSource {
    UserSupplied,
    Extracted { kvar: Symbol, ordinal: usize },
}

impl Qualifier {
    pub fn user_supplied(name: Symbol, params: Vec<(Symbol, Sort)>, body: Expr) -> Qualifier {
        Qualifier {
            name,
            params,
            body,
            location: QualifierSource::UserSupplied,
        }
    }

    pub fn extracted(name: Symbol, params: Vec<(Symbol, Sort)>, body: Expr, kvar: Symbol, ordinal: usize) -> Qualifier {
        Qualifier {
            name,
            params,
            body,
            location: QualifierSource::Extracted { kvar, ordinal },
        }
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracted_qualifier_records_its_provenance() {
        let q = Qualifier::extracted(
            Symbol::intern("q0"),
            vec![(Symbol::vv(), Sort::Int)],
            Expr::bool(true),
            Symbol::intern("K"),
            0,
        );
        assert_eq!(q.arity(), 1);
        assert_eq!(
            q.location,
            QualifierSource::Extracted {
                kvar: Symbol::intern("K"),
                ordinal: 0
            }
        );
    }
}
