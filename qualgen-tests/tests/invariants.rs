//! The universal invariants, round-trip property, and boundary behaviors
//! from the spec's "Testable properties" section, each as its own test
//! rather than folded into the scenario suite.

use rustc_hash::FxHashSet;

use qualgen_ir::expr::{ArithOp, Expr, RelOp};
use qualgen_ir::{
    classify_rules, Binding, ConstraintId, FInfo, KVar, Sort, Substitution, SubtypingConstraint, Symbol,
};
use qualgen_ir::expr::Const;
use qualgen_ir::query_tree::InterpQuery;
use qualgen_solve::{collect_sym_sorts, expand, normalize_finfo, serialize, unroll_query};
use qualgen_smt::{expr_to_sexpr, parse_sexprs, sexpr_to_expr};
use qualgen_tests::mock_smt::run_offline;

fn sym(s: &str) -> Symbol {
    Symbol::intern(s)
}

fn sum_example_finfo() -> FInfo {
    let mut finfo = FInfo::new();
    finfo.declare(sym("k"), Sort::Int);
    finfo.declare(sym("v"), Sort::Int);
    finfo.declare(sym("s"), Sort::Int);
    finfo.declare_kvar(KVar::intern("K"), vec![Sort::Int]);

    finfo.add_constraint(SubtypingConstraint {
        id: ConstraintId(0),
        env: vec![Binding {
            sym: sym("k"),
            refinement: Expr::rel(RelOp::Le, Expr::vv(), Expr::int(0)),
        }],
        lhs: Binding {
            sym: sym("v"),
            refinement: Expr::rel(RelOp::Eq, Expr::vv(), Expr::int(0)),
        },
        rhs: Binding {
            sym: sym("v"),
            refinement: Expr::kvar_app(KVar::intern("K"), Substitution::empty()),
        },
    });
    finfo.add_constraint(SubtypingConstraint {
        id: ConstraintId(1),
        env: vec![
            Binding {
                sym: sym("k"),
                refinement: Expr::rel(RelOp::Gt, Expr::vv(), Expr::int(0)),
            },
            Binding {
                sym: sym("s"),
                refinement: Expr::kvar_app(
                    KVar::intern("K"),
                    Substitution::singleton(sym("k"), Expr::arith(ArithOp::Sub, Expr::var(sym("k")), Expr::int(1))),
                ),
            },
        ],
        lhs: Binding {
            sym: sym("v"),
            refinement: Expr::rel(
                RelOp::Eq,
                Expr::vv(),
                Expr::arith(ArithOp::Add, Expr::var(sym("s")), Expr::var(sym("k"))),
            ),
        },
        rhs: Binding {
            sym: sym("v"),
            refinement: Expr::kvar_app(KVar::intern("K"), Substitution::empty()),
        },
    });
    finfo.add_constraint(SubtypingConstraint {
        id: ConstraintId(2),
        env: vec![],
        lhs: Binding {
            sym: sym("v"),
            refinement: Expr::kvar_app(KVar::intern("K"), Substitution::empty()),
        },
        rhs: Binding {
            sym: sym("v"),
            refinement: Expr::rel(RelOp::Ge, Expr::vv(), Expr::var(sym("k"))),
        },
    });
    finfo
}

/// Invariant 1: every fresh symbol in `createdSymbols` maps, through
/// `unrollSubs`, to a symbol that is not itself a fresh symbol (or to
/// `vv`).
#[test]
fn invariant_1_unroll_subs_bottom_out_at_non_fresh_symbols() {
    let finfo = sum_example_finfo();
    let sym_sorts = collect_sym_sorts(&finfo);
    let (rules, queries) = normalize_finfo(&finfo);
    let kclauses = classify_rules(rules);
    let query = queries.first().expect("the sum example has one query");

    let (_tree, state) = unroll_query(query, 2, &kclauses, &sym_sorts);
    let created: FxHashSet<Symbol> = state.created_symbols().keys().copied().collect();
    for fresh in &created {
        let target = state.unroll_subs().get(fresh).copied().unwrap_or(*fresh);
        assert!(
            !created.contains(&target) || target == Symbol::vv(),
            "fresh symbol {:?} maps to another fresh symbol {:?} instead of bottoming out",
            fresh,
            target
        );
    }
}

/// Invariant 2: the free symbols of the unrolled tree are a subset of the
/// query's own symbols unioned with the freshly created ones — no symbol
/// appears out of nowhere.
#[test]
fn invariant_2_tree_free_symbols_are_query_symbols_plus_created_symbols() {
    let finfo = sum_example_finfo();
    let sym_sorts = collect_sym_sorts(&finfo);
    let (rules, queries) = normalize_finfo(&finfo);
    let kclauses = classify_rules(rules);
    let query = queries.first().expect("one query");

    let (tree, state) = unroll_query(query, 2, &kclauses, &sym_sorts);

    let mut allowed: FxHashSet<Symbol> = query.body.free_symbols();
    allowed.extend(query.head.free_symbols());
    for c in &query.children {
        allowed.insert(c.sym);
        for (k, e) in c.sigma.iter() {
            allowed.insert(*k);
            allowed.extend(e.free_symbols());
        }
    }
    allowed.extend(state.created_symbols().keys().copied());

    let mut tree_symbols = FxHashSet::default();
    collect_tree_symbols(&tree, &mut tree_symbols);

    for s in &tree_symbols {
        assert!(allowed.contains(s), "symbol {:?} appears in the unrolled tree from nowhere", s);
    }
}

fn collect_tree_symbols(tree: &InterpQuery, out: &mut FxHashSet<Symbol>) {
    if let InterpQuery::And { root, .. } = tree {
        out.extend(root.free_symbols());
    }
    for child in tree.children() {
        collect_tree_symbols(child, out);
    }
}

/// Invariant 3: the disjunction over all expanded tree queries is
/// logically equivalent to the original disjunctive query — every
/// combination of Or-alternatives appears in the expansion exactly once,
/// none dropped and none duplicated. Checked structurally: an And of two
/// Ors denotes the cartesian product of their leaves, so the set of
/// (left, right) pairs read back off `expand`'s output must equal that
/// product exactly.
#[test]
fn invariant_3_or_expansion_is_exhaustive_and_without_duplicates() {
    let left = InterpQuery::Or {
        info: None,
        children: vec![int_leaf(1), int_leaf(2)],
    };
    let right = InterpQuery::Or {
        info: None,
        children: vec![int_leaf(3), int_leaf(4), int_leaf(5)],
    };
    let tree = InterpQuery::And {
        info: None,
        root: Expr::bool(true),
        children: vec![left, right],
    };

    let expanded = expand(&tree);

    let mut seen: Vec<(i64, i64)> = expanded
        .iter()
        .map(|combo| {
            if let InterpQuery::And { children, .. } = combo {
                assert_eq!(children.len(), 2, "each expanded query keeps both And-children");
                (leaf_int(&children[0]), leaf_int(&children[1]))
            } else {
                panic!("expand never turns an And root into an Or");
            }
        })
        .collect();
    seen.sort_unstable();

    let mut expected: Vec<(i64, i64)> = (1..=2).flat_map(|a| (3..=5).map(move |b| (a, b))).collect();
    expected.sort_unstable();

    assert_eq!(seen, expected, "expansion must cover every alternative combination exactly once");
}

fn int_leaf(n: i64) -> InterpQuery {
    InterpQuery::leaf_and(Expr::int(n))
}

fn leaf_int(leaf: &InterpQuery) -> i64 {
    if let InterpQuery::And { root: Expr::Const(Const::Int(n)), .. } = leaf {
        *n
    } else {
        panic!("expected an integer leaf, got {:?}", leaf);
    }
}

/// Invariant 4: the number of `Interp` cut markers the serializer emits
/// equals the number of interpolants the rest of the pipeline consumes —
/// checked here by feeding exactly that many canned interpolants through
/// the offline harness and confirming it never trips the mismatch error
/// `extract_solution` would otherwise raise.
#[test]
fn invariant_4_cut_count_matches_interpolant_count() {
    let finfo = sum_example_finfo();
    let canned = Expr::rel(RelOp::Ge, Expr::vv(), Expr::int(0));
    // `run_offline` asserts internally that every `extract_solution` call
    // succeeds; reaching this point at all is the invariant holding.
    let _ = run_offline(&finfo, 2, move || canned.clone());
}

/// Invariant 5: qualifier extraction is deterministic given identical
/// inputs — running the offline harness twice on the same FInfo produces
/// byte-identical qualifier sets.
#[test]
fn invariant_5_qualifier_extraction_is_deterministic() {
    let finfo = sum_example_finfo();
    let canned = Expr::rel(RelOp::Ge, Expr::vv(), Expr::var(sym("k")));
    let once = run_offline(&finfo, 2, {
        let canned = canned.clone();
        move || canned.clone()
    });
    let twice = run_offline(&finfo, 2, move || canned.clone());
    assert_eq!(once, twice);
}

/// Invariant 6: substitution scrubbing removes only `[x := x]`-shaped
/// identity entries tagged with the active binder; every other entry,
/// including one that merely happens to look similar, survives.
#[test]
fn invariant_6_scrub_is_selective() {
    use qualgen_solve::normalize::scrub_substitutions;

    let x = sym("x");
    let y = sym("y");
    let k = KVar::intern("K");

    let mixed = Expr::kvar_app(
        k,
        Substitution::from_entries(vec![(sym("a"), Expr::var(x)), (sym("b"), Expr::var(y))]),
    );
    let scrubbed = scrub_substitutions(&mixed, x);
    if let Expr::KVarApp(_, sigma) = scrubbed {
        assert_eq!(sigma.len(), 1, "only the entry whose value is the active binder is removed");
        assert_eq!(sigma.get(sym("b")), Some(&Expr::var(y)));
    } else {
        panic!("expected KVarApp");
    }
}

/// Round-trip: serializing an Expr to an s-expression and parsing it back
/// yields a structurally equal Expr.
#[test]
fn round_trip_through_the_sexpr_writer_and_reader() {
    let e = Expr::and(vec![
        Expr::rel(RelOp::Ge, Expr::var(sym("x")), Expr::int(0)),
        Expr::rel(RelOp::Lt, Expr::arith(ArithOp::Add, Expr::var(sym("x")), Expr::int(1)), Expr::var(sym("y"))),
    ]);
    let mut label = 0;
    let sexpr = expr_to_sexpr(&e, &mut label);
    let text = sexpr.to_string();
    let reparsed = parse_sexprs(&text).unwrap();
    let back = sexpr_to_expr(&reparsed[0]).unwrap();
    assert_eq!(e, back);
}

/// Round-trip's documented exception: `=` between two formulas becomes
/// `Iff` on the way back in, since the writer has no dedicated `iff`
/// keyword and the reader disambiguates `=` by the shape of its operands.
#[test]
fn round_trip_collapses_eq_between_formulas_into_iff() {
    let e = Expr::Iff(
        std::sync::Arc::new(Expr::rel(RelOp::Ge, Expr::var(sym("x")), Expr::int(0))),
        std::sync::Arc::new(Expr::rel(RelOp::Lt, Expr::var(sym("y")), Expr::int(0))),
    );
    let mut label = 0;
    let sexpr = expr_to_sexpr(&e, &mut label);
    let reparsed = parse_sexprs(&sexpr.to_string()).unwrap();
    let back = sexpr_to_expr(&reparsed[0]).unwrap();
    assert_eq!(e, back);
}

/// Boundary: depth 0 never expands a recursive rule, so every branch in
/// the tree comes from a non-recursive rule only.
#[test]
fn boundary_depth_zero_never_expands_recursive_rules() {
    let finfo = sum_example_finfo();
    let sym_sorts = collect_sym_sorts(&finfo);
    let (rules, queries) = normalize_finfo(&finfo);
    let kclauses = classify_rules(rules);
    let query = queries.first().expect("one query");

    let (tree, _state) = unroll_query(query, 0, &kclauses, &sym_sorts);
    if let InterpQuery::And { children, .. } = &tree {
        assert_eq!(children.len(), 1);
        if let InterpQuery::Or { children: or_children, .. } = &children[0] {
            assert_eq!(or_children.len(), 1, "only R1 (the non-recursive base case) should appear at depth 0");
        } else {
            panic!("expected an Or node for the K occurrence");
        }
    } else {
        panic!("expected an And root");
    }
}

/// Boundary: a k-var with zero rules produces an empty Or and zero
/// candidates — already covered end-to-end as scenario 3, restated here
/// against the raw tree shape instead of the extracted qualifiers.
#[test]
fn boundary_unknown_kvar_is_an_empty_or_node() {
    let mut finfo = FInfo::new();
    finfo.declare(sym("y"), Sort::Int);
    finfo.declare_kvar(KVar::intern("K"), vec![Sort::Int]);
    finfo.add_constraint(SubtypingConstraint {
        id: ConstraintId(0),
        env: vec![],
        lhs: Binding {
            sym: sym("y"),
            refinement: Expr::kvar_app(KVar::intern("K"), Substitution::empty()),
        },
        rhs: Binding {
            sym: sym("y"),
            refinement: Expr::rel(RelOp::Ge, Expr::vv(), Expr::int(0)),
        },
    });

    let sym_sorts = collect_sym_sorts(&finfo);
    let (rules, queries) = normalize_finfo(&finfo);
    let kclauses = classify_rules(rules);
    let query = queries.first().expect("one query");

    let (tree, _state) = unroll_query(query, 2, &kclauses, &sym_sorts);
    if let InterpQuery::And { children, .. } = &tree {
        assert_eq!(children.len(), 1);
        assert!(matches!(&children[0], InterpQuery::Or { children, .. } if children.is_empty()));
    } else {
        panic!("expected an And root");
    }
}

/// Boundary: a Query with no k-var children produces a tree of one
/// And-node and zero interpolant cuts.
#[test]
fn boundary_query_with_no_kvar_children_has_zero_cuts() {
    let mut finfo = FInfo::new();
    finfo.declare(sym("x"), Sort::Int);
    finfo.add_constraint(SubtypingConstraint {
        id: ConstraintId(0),
        env: vec![],
        lhs: Binding {
            sym: sym("x"),
            refinement: Expr::bool(true),
        },
        rhs: Binding {
            sym: sym("x"),
            refinement: Expr::rel(RelOp::Ge, Expr::vv(), Expr::int(0)),
        },
    });

    let sym_sorts = collect_sym_sorts(&finfo);
    let (rules, queries) = normalize_finfo(&finfo);
    let kclauses = classify_rules(rules);
    let query = queries.first().expect("one query");

    let (tree, _state) = unroll_query(query, 2, &kclauses, &sym_sorts);
    assert!(matches!(&tree, InterpQuery::And { children, .. } if children.is_empty()));
    let (_formula, cuts) = serialize(&tree);
    assert_eq!(cuts, 0);
}
