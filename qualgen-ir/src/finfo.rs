use rustc_hash::FxHashMap;

use crate::constraint::{ConstraintId, SubtypingConstraint};
use crate::qualifier::Qualifier;
use crate::sort::Sort;
use crate::symbol::{KVar, Symbol};

/// The parsed contents of a `.fq`-style input file: raw subtyping
/// constraints over k-variables, their sort signatures, and the
/// qualifiers available to guess solutions with (§3 "FInfo", §6
/// "Input"). This is the one value the whole pipeline is built around —
/// everything downstream, starting with clause normalization, is a
/// function of an `FInfo`.
#[derive(Clone, Debug, Default)]
pub struct FInfo {
    /// Top-level sort environment: every free symbol that appears in any
    /// clause must have an entry here before unrolling.
    bind_env: FxHashMap<Symbol, Sort>,
    /// Raw subtyping constraints, not yet classified into rules/queries.
    constraints: FxHashMap<ConstraintId, SubtypingConstraint>,
    /// The signature (parameter sorts) each k-variable was declared with —
    /// the well-formedness map, keyed by k-var rather than by binder (§4.1
    /// "map of well-formedness constraints, which assigns each k-var its
    /// parameter sort").
    kvar_sigs: FxHashMap<KVar, Vec<Sort>>,
    qualifiers: Vec<Qualifier>,
}

impl FInfo {
    pub fn new() -> FInfo {
        FInfo::default()
    }

    pub fn bind_env(&self) -> &FxHashMap<Symbol, Sort> {
        &self.bind_env
    }

    pub fn declare(&mut self, sym: Symbol, sort: Sort) {
        self.bind_env.insert(sym, sort);
    }

    pub fn sort_of(&self, sym: Symbol) -> Option<&Sort> {
        self.bind_env.get(&sym)
    }

    pub fn add_constraint(&mut self, c: SubtypingConstraint) {
        self.constraints.insert(c.id, c);
    }

    pub fn constraints(&self) -> impl Iterator<Item = &SubtypingConstraint> {
        self.constraints.values()
    }

    pub fn constraint(&self, id: ConstraintId) -> Option<&SubtypingConstraint> {
        self.constraints.get(&id)
    }

    pub fn declare_kvar(&mut self, k: KVar, param_sorts: Vec<Sort>) {
        self.kvar_sigs.insert(k, param_sorts);
    }

    pub fn kvar_signature(&self, k: KVar) -> Option<&[Sort]> {
        self.kvar_sigs.get(&k).map(|v| v.as_slice())
    }

    pub fn kvars_under_consideration(&self) -> impl Iterator<Item = &KVar> {
        self.kvar_sigs.keys()
    }

    pub fn qualifiers(&self) -> &[Qualifier] {
        &self.qualifiers
    }

    pub fn add_qualifier(&mut self, q: Qualifier) {
        self.qualifiers.push(q);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_finfo_has_no_kvars_or_constraints() {
        let fi = FInfo::new();
        assert_eq!(fi.kvars_under_consideration().count(), 0);
        assert_eq!(fi.constraints().count(), 0);
    }

    #[test]
    fn declared_sorts_are_retrievable() {
        let mut fi = FInfo::new();
        let x = Symbol::intern("x");
        fi.declare(x, Sort::Int);
        assert_eq!(fi.sort_of(x), Some(&Sort::Int));
    }

    #[test]
    fn kvar_signature_round_trips() {
        let mut fi = FInfo::new();
        let k = KVar::intern("K");
        fi.declare_kvar(k, vec![Sort::Int, Sort::Bool]);
        assert_eq!(fi.kvar_signature(k), Some(&[Sort::Int, Sort::Bool][..]));
    }

    #[test]
    fn constraints_are_retrievable_by_id() {
        use crate::constraint::Binding;
        use crate::expr::Expr;

        let mut fi = FInfo::new();
        let id = ConstraintId(0);
        fi.add_constraint(SubtypingConstraint {
            id,
            env: vec![],
            lhs: Binding {
                sym: Symbol::vv(),
                refinement: Expr::bool(true),
            },
            rhs: Binding {
                sym: Symbol::vv(),
                refinement: Expr::bool(true),
            },
        });
        assert!(fi.constraint(id).is_some());
    }
}
