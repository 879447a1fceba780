use rustc_hash::{FxHashMap, FxHashSet};

use crate::expr::{Expr, Substitution};
use crate::symbol::{KVar, Symbol};

/// A child occurrence of a k-variable inside a clause body: `K[σ]`, tagged
/// with the symbol its implicit `vv` argument was bound to (§3 "Rule").
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Child {
    pub k: KVar,
    pub sigma: Substitution,
    pub sym: Symbol,
}

/// A Horn clause whose conclusion is a k-variable application (§3 "Rule").
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Rule {
    pub body: Expr,
    pub children: Vec<Child>,
    pub head: KVar,
}

/// A Horn clause whose conclusion is a concrete, k-variable-free predicate
/// (§3 "Query") — the assertion to be refuted.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Query {
    pub body: Expr,
    pub children: Vec<Child>,
    pub head: Expr,
}

/// `KVar -> (recursive rules, non-recursive rules)` (§3 "KClauses"). A
/// rule with head `K` is recursive iff `K` is reachable, transitively,
/// from any of its children's heads in the rule-call graph.
#[derive(Clone, Debug, Default)]
pub struct KClauses {
    recursive: FxHashMap<KVar, Vec<Rule>>,
    non_recursive: FxHashMap<KVar, Vec<Rule>>,
}

impl KClauses {
    pub fn new() -> KClauses {
        KClauses::default()
    }

    pub fn recursive_rules(&self, k: KVar) -> &[Rule] {
        self.recursive.get(&k).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn non_recursive_rules(&self, k: KVar) -> &[Rule] {
        self.non_recursive
            .get(&k)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn known(&self, k: KVar) -> bool {
        self.recursive.contains_key(&k) || self.non_recursive.contains_key(&k)
    }

    pub fn kvars(&self) -> FxHashSet<KVar> {
        self.recursive
            .keys()
            .chain(self.non_recursive.keys())
            .copied()
            .collect()
    }

    fn insert_recursive(&mut self, k: KVar, rule: Rule) {
        self.recursive.entry(k).or_insert_with(Vec::new).push(rule);
    }

    fn insert_non_recursive(&mut self, k: KVar, rule: Rule) {
        self.non_recursive
            .entry(k)
            .or_insert_with(Vec::new)
            .push(rule);
    }
}

/// Builds a `KClauses` map by classifying every rule in `all_rules`
/// according to reachability in the rule-call graph: a rule with head `K`
/// is recursive iff there is a path `K -> ... -> K` through children's
/// heads (§4.1 "K-classification").
pub fn classify_rules(all_rules: Vec<Rule>) -> KClauses {
    let mut by_head: FxHashMap<KVar, Vec<Rule>> = FxHashMap::default();
    for rule in &all_rules {
        by_head
            .entry(rule.head)
            .or_insert_with(Vec::new)
            .push(rule.clone());
    }

    // Build the call graph: head K -> set of K's reachable via one child step.
    let mut direct_successors: FxHashMap<KVar, FxHashSet<KVar>> = FxHashMap::default();
    for rule in &all_rules {
        let succs = direct_successors.entry(rule.head).or_insert_with(FxHashSet::default);
        for child in &rule.children {
            succs.insert(child.k);
        }
    }

    let mut kclauses = KClauses::new();
    for rule in all_rules {
        let recursive = is_reachable(rule.head, rule.head, &direct_successors, &mut FxHashSet::default());
        if recursive {
            kclauses.insert_recursive(rule.head, rule);
        } else {
            kclauses.insert_non_recursive(rule.head, rule);
        }
    }
    kclauses
}

/// Depth-first reachability: is `target` reachable from `from` via
/// `direct_successors`? Used both to classify a rule's own head (is there
/// a cycle back to `K`?) and as the one primitive the whole
/// recursive/non-recursive split is built from.
fn is_reachable(
    from: KVar,
    target: KVar,
    direct_successors: &FxHashMap<KVar, FxHashSet<KVar>>,
    visiting: &mut FxHashSet<KVar>,
) -> bool {
    let succs = match direct_successors.get(&from) {
        Some(s) => s,
        None => return false,
    };
    if succs.contains(&target) {
        return true;
    }
    if !visiting.insert(from) {
        return false;
    }
    let found = succs
        .iter()
        .any(|&next| is_reachable(next, target, direct_successors, visiting));
    visiting.remove(&from);
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Expr;

    fn kvar(s: &str) -> KVar {
        KVar::intern(s)
    }

    #[test]
    fn self_recursive_rule_is_classified_recursive() {
        let k = kvar("K");
        let rule = Rule {
            body: Expr::bool(true),
            children: vec![Child {
                k,
                sigma: Substitution::empty(),
                sym: Symbol::intern("s"),
            }],
            head: k,
        };
        let kc = classify_rules(vec![rule]);
        assert_eq!(kc.recursive_rules(k).len(), 1);
        assert_eq!(kc.non_recursive_rules(k).len(), 0);
    }

    #[test]
    fn base_case_rule_is_classified_non_recursive() {
        let k = kvar("K");
        let rule = Rule {
            body: Expr::bool(true),
            children: vec![],
            head: k,
        };
        let kc = classify_rules(vec![rule]);
        assert_eq!(kc.non_recursive_rules(k).len(), 1);
        assert_eq!(kc.recursive_rules(k).len(), 0);
    }

    #[test]
    fn mutual_recursion_is_detected() {
        let k1 = kvar("K1");
        let k2 = kvar("K2");
        let r1 = Rule {
            body: Expr::bool(true),
            children: vec![Child {
                k: k2,
                sigma: Substitution::empty(),
                sym: Symbol::intern("s"),
            }],
            head: k1,
        };
        let r2 = Rule {
            body: Expr::bool(true),
            children: vec![Child {
                k: k1,
                sigma: Substitution::empty(),
                sym: Symbol::intern("s"),
            }],
            head: k2,
        };
        let kc = classify_rules(vec![r1, r2]);
        assert_eq!(kc.recursive_rules(k1).len(), 1);
        assert_eq!(kc.recursive_rules(k2).len(), 1);
    }

    #[test]
    fn unknown_kvar_has_no_rules() {
        let kc = KClauses::new();
        assert!(!kc.known(kvar("Ghost")));
        assert!(kc.recursive_rules(kvar("Ghost")).is_empty());
        assert!(kc.non_recursive_rules(kvar("Ghost")).is_empty());
    }
}
