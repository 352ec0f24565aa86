//! Inference engine tests: the typing rules, the error taxonomy, and the
//! scoping combinators.

use super::*;
use crate::env::ModuleEnv;
use crate::reduce::whnf;
use crate::sort::Sort;
use crate::term::TermFactory;
use std::collections::BTreeMap;

fn setup() -> (TermFactory, ModuleEnv) {
    let f = TermFactory::new();
    let env = ModuleEnv::with_prelude(&f);
    (f, env)
}

fn check(f: &TermFactory, env: &ModuleEnv, t: &Term) -> Result<Term, TcError> {
    type_check(f, env, None, t)
}

/// Addition on naturals via the recursor.
fn rec_plus(f: &TermFactory, env: &ModuleEnv, a: Term, b: Term) -> Term {
    let ids = env.prelude();
    let nat = env.nat_type(f);
    let motive = f.lambda("n", nat.clone(), nat.clone());
    let mut cases = BTreeMap::new();
    cases.insert(ids.zero.clone(), b);
    cases.insert(
        ids.succ.clone(),
        f.lambda(
            "n",
            nat.clone(),
            f.lambda(
                "ih",
                nat.clone(),
                f.ctor_app(ids.succ.clone(), vec![], vec![f.local_var(0)]),
            ),
        ),
    );
    f.recursor_app(ids.nat.clone(), vec![], motive, cases, vec![], a)
}

// ----------------------------------------------------------------------
// Core rules
// ----------------------------------------------------------------------

#[test]
fn test_identity_lambda() {
    let (f, env) = setup();
    let t = f.lambda("x", f.sort(Sort::new(0)), f.local_var(0));
    let ty = check(&f, &env, &t).unwrap();
    assert_eq!(ty, f.pi("x", f.sort(Sort::new(0)), f.sort(Sort::new(0))));
}

#[test]
fn test_beta_application() {
    let (f, env) = setup();
    let nat = env.nat_type(&f);
    let t = f.apply(f.lambda("x", nat.clone(), f.local_var(0)), f.nat_lit(3u32));
    let ty = check(&f, &env, &t).unwrap();
    assert_eq!(ty, nat);
    assert_eq!(whnf(&f, &env, &t), f.nat_lit(3u32));
}

#[test]
fn test_pi_codomain_predicative() {
    let (f, env) = setup();
    let t = f.pi("_", f.sort(Sort::new(0)), f.sort(Sort::new(1)));
    assert_eq!(check(&f, &env, &t).unwrap(), f.sort(Sort::new(2)));
}

#[test]
fn test_pi_codomain_impredicative() {
    let (f, env) = setup();
    // The codomain inhabits PROP, so the whole Pi does, regardless of the
    // domain's universe.
    let t = f.pi("_", f.sort(Sort::new(3)), f.unit_type());
    assert_eq!(check(&f, &env, &t).unwrap(), f.sort(Sort::PROP));

    let t = f.pi("_", f.sort(Sort::new(3)), env.nat_type(&f));
    assert_eq!(check(&f, &env, &t).unwrap(), f.sort(Sort::PROP));
}

#[test]
fn test_sort_of_sort() {
    let (f, env) = setup();
    assert_eq!(
        check(&f, &env, &f.sort(Sort::new(4))).unwrap(),
        f.sort(Sort::new(5))
    );
}

#[test]
fn test_local_var_lifting_in_ctx() {
    let (f, env) = setup();
    // Context (outermost first): A : sort 0, x : A. The type of x, seen
    // from inside the full context, is A lifted to LocalVar(1).
    let ctx = vec![
        ("A".to_string(), f.sort(Sort::new(0))),
        ("x".to_string(), f.local_var(0)),
    ];
    let ty = type_check_in_ctx(&f, &env, None, &ctx, &f.local_var(0)).unwrap();
    assert_eq!(ty, f.local_var(1));
}

#[test]
fn test_dangling_var() {
    let (f, env) = setup();
    let err = check(&f, &env, &f.local_var(0)).unwrap_err();
    assert!(matches!(err, TcError::DanglingVar(0)));
}

#[test]
fn test_unbound_global() {
    let (f, env) = setup();
    let err = check(&f, &env, &f.global(Ident::parse("Nowhere.missing"))).unwrap_err();
    assert!(matches!(err, TcError::UnboundName(_)));
}

#[test]
fn test_not_func_type() {
    let (f, env) = setup();
    let err = check(&f, &env, &f.apply(f.nat_lit(1u32), f.nat_lit(2u32))).unwrap_err();
    assert!(matches!(err, TcError::NotFuncType(_)));
}

#[test]
fn test_application_subtype_failure() {
    let (f, env) = setup();
    let nat = env.nat_type(&f);
    let t = f.apply(
        f.lambda("x", nat, f.local_var(0)),
        f.string_lit("not a number"),
    );
    let err = check(&f, &env, &t).unwrap_err();
    assert!(matches!(err, TcError::SubtypeFailure { .. }));
}

#[test]
fn test_universe_cumulativity_in_application() {
    let (f, env) = setup();
    // sort 0 : sort 1 <= sort 2, so a function over sort 2 accepts it.
    let t = f.apply(
        f.lambda("A", f.sort(Sort::new(2)), f.unit_value()),
        f.sort(Sort::new(0)),
    );
    assert_eq!(check(&f, &env, &t).unwrap(), f.unit_type());
}

#[test]
fn test_lambda_domain_must_be_a_type() {
    let (f, env) = setup();
    let t = f.lambda("x", f.nat_lit(1u32), f.local_var(0));
    let err = check(&f, &env, &t).unwrap_err();
    assert!(matches!(err, TcError::NotSort(_)));
}

#[test]
fn test_constant_rule() {
    let (f, env) = setup();
    let nat = env.nat_type(&f);
    let good = f.constant(Ident::parse("Test.three"), f.nat_lit(3u32), nat.clone());
    assert_eq!(check(&f, &env, &good).unwrap(), nat);

    let bad = f.constant(
        Ident::parse("Test.wrong"),
        f.string_lit("three"),
        env.nat_type(&f),
    );
    let err = check(&f, &env, &bad).unwrap_err();
    match err {
        TcError::BadConstType { name, .. } => assert_eq!(name, Ident::parse("Test.wrong")),
        other => panic!("expected BadConstType, got {other:?}"),
    }
}

#[test]
fn test_literal_types() {
    let (f, env) = setup();
    assert_eq!(check(&f, &env, &f.nat_lit(42u32)).unwrap(), env.nat_type(&f));
    assert_eq!(
        check(&f, &env, &f.string_lit("hi")).unwrap(),
        env.string_type(&f)
    );
}

#[test]
fn test_ext_cns_type() {
    let (f, env) = setup();
    let x = f.ext_cns(7, "x", env.nat_type(&f));
    assert_eq!(check(&f, &env, &x).unwrap(), env.nat_type(&f));
}

// ----------------------------------------------------------------------
// Tuples and records
// ----------------------------------------------------------------------

#[test]
fn test_tuple_rules() {
    let (f, env) = setup();
    let nat = env.nat_type(&f);
    assert_eq!(check(&f, &env, &f.unit_type()).unwrap(), f.sort(Sort::new(0)));
    assert_eq!(check(&f, &env, &f.unit_value()).unwrap(), f.unit_type());

    let p = f.pair_value(f.nat_lit(1u32), f.string_lit("s"));
    assert_eq!(
        check(&f, &env, &p).unwrap(),
        f.pair_type(nat.clone(), env.string_type(&f))
    );

    assert_eq!(check(&f, &env, &f.pair_left(p.clone())).unwrap(), nat);
    assert_eq!(
        check(&f, &env, &f.pair_right(p)).unwrap(),
        env.string_type(&f)
    );

    // PairType of types in sorts 1 and 0 lands in their max.
    let pt = f.pair_type(f.sort(Sort::new(0)), env.nat_type(&f));
    assert_eq!(check(&f, &env, &pt).unwrap(), f.sort(Sort::new(1)));
}

#[test]
fn test_projection_of_non_tuple() {
    let (f, env) = setup();
    let err = check(&f, &env, &f.pair_left(f.nat_lit(1u32))).unwrap_err();
    assert!(matches!(err, TcError::NotTupleType(_)));
}

#[test]
fn test_record_rules() {
    let (f, env) = setup();
    let nat = env.nat_type(&f);
    let r = f.record_value(vec![
        ("x".to_string(), f.nat_lit(1u32)),
        ("y".to_string(), f.string_lit("s")),
    ]);
    let r_ty = check(&f, &env, &r).unwrap();
    let expected = f.record_type(vec![
        ("x".to_string(), nat.clone()),
        ("y".to_string(), env.string_type(&f)),
    ]);
    assert_eq!(r_ty, expected);

    // Selection projects the named field's type.
    let sel = f.record_selector(r.clone(), f.string_lit("y"));
    assert_eq!(check(&f, &env, &sel).unwrap(), env.string_type(&f));

    // The record type itself lives in a sort.
    assert_eq!(check(&f, &env, &expected).unwrap(), f.sort(Sort::new(0)));

    // Missing field.
    let missing = f.record_selector(r, f.string_lit("z"));
    let err = check(&f, &env, &missing).unwrap_err();
    match err {
        TcError::BadRecordField { field, .. } => assert_eq!(field, "z"),
        other => panic!("expected BadRecordField, got {other:?}"),
    }
}

#[test]
fn test_selector_on_non_record() {
    let (f, env) = setup();
    let err = check(
        &f,
        &env,
        &f.record_selector(f.nat_lit(1u32), f.string_lit("x")),
    )
    .unwrap_err();
    assert!(matches!(err, TcError::NotRecordType(_)));
}

#[test]
fn test_field_name_must_be_string() {
    let (f, env) = setup();
    let bad = f.field_value(f.nat_lit(0u32), f.nat_lit(1u32), f.unit_value());
    let err = check(&f, &env, &bad).unwrap_err();
    assert!(matches!(err, TcError::NotStringLit(_)));
}

// ----------------------------------------------------------------------
// Arrays
// ----------------------------------------------------------------------

#[test]
fn test_array_value_infers_vec() {
    let (f, env) = setup();
    let nat = env.nat_type(&f);
    let arr = f.term(TermF::ArrayValue(
        nat.clone(),
        vec![f.nat_lit(1u32), f.nat_lit(2u32)],
    ));
    let ty = check(&f, &env, &arr).unwrap();
    assert_eq!(ty, env.vec_type(&f, f.nat_lit(2u32), nat));
}

#[test]
fn test_array_value_element_mismatch() {
    let (f, env) = setup();
    let arr = f.term(TermF::ArrayValue(
        env.nat_type(&f),
        vec![f.nat_lit(1u32), f.string_lit("x")],
    ));
    let err = check(&f, &env, &arr).unwrap_err();
    assert!(matches!(err.root_cause(), TcError::SubtypeFailure { .. }));
}

#[test]
fn test_vector_length_arithmetic() {
    let (f, env) = setup();
    let nat = env.nat_type(&f);
    let arr = f.term(TermF::ArrayValue(
        nat.clone(),
        vec![f.nat_lit(1u32), f.nat_lit(2u32)],
    ));
    let mut tc = TypeChecker::new(&f, &env, None);
    let got = tc.infer(&arr).unwrap();
    // Vec (addNat 1 1) Nat is the same length after literal evaluation.
    let len = f.apply_all(
        f.global(env.prelude().add_nat.clone()),
        vec![f.nat_lit(1u32), f.nat_lit(1u32)],
    );
    let want = env.vec_type(&f, len, nat);
    tc.check_subtype(&got, &tc.tc_whnf(&want)).unwrap();
}

// ----------------------------------------------------------------------
// Datatype and constructor applications
// ----------------------------------------------------------------------

#[test]
fn test_data_type_app() {
    let (f, env) = setup();
    let ids = env.prelude();
    assert_eq!(
        check(&f, &env, &env.nat_type(&f)).unwrap(),
        f.sort(Sort::new(0))
    );
    let vec2 = f.data_type_app(
        ids.vec.clone(),
        vec![f.nat_lit(2u32), env.nat_type(&f)],
        vec![],
    );
    assert_eq!(check(&f, &env, &vec2).unwrap(), f.sort(Sort::new(0)));
}

#[test]
fn test_ctor_app() {
    let (f, env) = setup();
    let ids = env.prelude();
    let one = f.ctor_app(ids.succ.clone(), vec![], vec![f.nat_lit(0u32)]);
    assert_eq!(check(&f, &env, &one).unwrap(), env.nat_type(&f));
}

#[test]
fn test_arity_mismatch() {
    let (f, env) = setup();
    let ids = env.prelude();
    let t = f.ctor_app(ids.succ.clone(), vec![], vec![]);
    let err = check(&f, &env, &t).unwrap_err();
    assert!(matches!(
        err,
        TcError::BadParamsOrArgsLength {
            is_data_type: false,
            ..
        }
    ));

    let t = f.data_type_app(ids.vec.clone(), vec![f.nat_lit(1u32)], vec![]);
    let err = check(&f, &env, &t).unwrap_err();
    assert!(matches!(
        err,
        TcError::BadParamsOrArgsLength {
            is_data_type: true,
            ..
        }
    ));
}

#[test]
fn test_missing_names() {
    let (f, env) = setup();
    let err = check(
        &f,
        &env,
        &f.data_type_app(Ident::parse("Nowhere.T"), vec![], vec![]),
    )
    .unwrap_err();
    assert!(matches!(err, TcError::NoSuchDataType(_)));

    let err = check(
        &f,
        &env,
        &f.ctor_app(Ident::parse("Nowhere.mk"), vec![], vec![]),
    )
    .unwrap_err();
    assert!(matches!(err, TcError::NoSuchCtor(_)));
}

// ----------------------------------------------------------------------
// Recursors
// ----------------------------------------------------------------------

#[test]
fn test_recursor_plus() {
    let (f, env) = setup();
    let sum = rec_plus(&f, &env, f.nat_lit(2u32), f.nat_lit(3u32));
    let ty = check(&f, &env, &sum).unwrap();
    assert_eq!(ty, env.nat_type(&f));
    assert!(
        convertible(&f, &env, &sum, &f.nat_lit(5u32)),
        "2 + 3 should evaluate to 5 under conversion"
    );
}

#[test]
fn test_recursor_missing_case() {
    let (f, env) = setup();
    let ids = env.prelude();
    let nat = env.nat_type(&f);
    let motive = f.lambda("n", nat.clone(), nat.clone());
    // Only the Zero case; Succ is missing.
    let mut cases = BTreeMap::new();
    cases.insert(ids.zero.clone(), f.nat_lit(0u32));
    let t = f.recursor_app(
        ids.nat.clone(),
        vec![],
        motive,
        cases,
        vec![],
        f.nat_lit(1u32),
    );
    let err = check(&f, &env, &t).unwrap_err();
    match err {
        TcError::MalformedRecursor(_, reason) => {
            assert!(
                reason.contains("Missing constructor"),
                "unexpected reason: {reason}"
            );
        }
        other => panic!("expected MalformedRecursor, got {other:?}"),
    }
}

#[test]
fn test_recursor_extra_case() {
    let (f, env) = setup();
    let sum = rec_plus(&f, &env, f.nat_lit(0u32), f.nat_lit(0u32));
    let TermF::RecursorApp {
        data,
        params,
        motive,
        cases,
        indices,
        scrutinee,
    } = sum.term_f()
    else {
        unreachable!()
    };
    let mut cases = cases.clone();
    cases.insert(Ident::parse("Nowhere.bogus"), f.nat_lit(0u32));
    let t = f.recursor_app(
        data.clone(),
        params.clone(),
        motive.clone(),
        cases,
        indices.clone(),
        scrutinee.clone(),
    );
    let err = check(&f, &env, &t).unwrap_err();
    match err {
        TcError::MalformedRecursor(_, reason) => {
            assert!(
                reason.contains("Extra constructors"),
                "unexpected reason: {reason}"
            );
        }
        other => panic!("expected MalformedRecursor, got {other:?}"),
    }
}

#[test]
fn test_recursor_motive_must_return_sort() {
    let (f, env) = setup();
    let ids = env.prelude();
    let nat = env.nat_type(&f);
    // The "motive" returns a value, not a type of types.
    let motive = f.lambda("n", nat.clone(), f.nat_lit(0u32));
    let t = f.recursor_app(
        ids.nat.clone(),
        vec![],
        motive,
        BTreeMap::new(),
        vec![],
        f.nat_lit(0u32),
    );
    let err = check(&f, &env, &t).unwrap_err();
    match err {
        TcError::MalformedRecursor(_, reason) => {
            assert!(reason.contains("should return a sort"), "got: {reason}");
        }
        other => panic!("expected MalformedRecursor, got {other:?}"),
    }
}

#[test]
fn test_recursor_elimination_discipline() {
    let (f, env) = setup();
    let ids = env.prelude();
    let nat = env.nat_type(&f);
    // Nat is a multi-constructor PROP datatype: recursion may only target
    // PROP, so a motive landing in sort 1 is rejected.
    let motive = f.lambda("n", nat.clone(), f.sort(Sort::new(0)));
    let t = f.recursor_app(
        ids.nat.clone(),
        vec![],
        motive,
        BTreeMap::new(),
        vec![],
        f.nat_lit(0u32),
    );
    let err = check(&f, &env, &t).unwrap_err();
    match err {
        TcError::MalformedRecursor(_, reason) => {
            assert!(
                reason.contains("Disallowed propositional elimination"),
                "got: {reason}"
            );
        }
        other => panic!("expected MalformedRecursor, got {other:?}"),
    }
}

#[test]
fn test_recursor_scrutinee_must_inhabit_datatype() {
    let (f, env) = setup();
    let sum = rec_plus(&f, &env, f.string_lit("nope"), f.nat_lit(0u32));
    let err = check(&f, &env, &sum).unwrap_err();
    assert!(matches!(err.root_cause(), TcError::SubtypeFailure { .. }));
}

// ----------------------------------------------------------------------
// Let
// ----------------------------------------------------------------------

#[test]
fn test_let_inference() {
    let (f, env) = setup();
    let t = f.term(TermF::Let(
        vec![crate::term::LetBinding {
            name: "x".into(),
            ty: env.nat_type(&f),
            rhs: f.nat_lit(1u32),
        }],
        f.local_var(0),
    ));
    assert_eq!(check(&f, &env, &t).unwrap(), env.nat_type(&f));
}

#[test]
fn test_recursive_let_rejected() {
    let (f, env) = setup();
    let t = f.term(TermF::Let(
        vec![crate::term::LetBinding {
            name: "x".into(),
            ty: env.nat_type(&f),
            rhs: f.local_var(0),
        }],
        f.local_var(0),
    ));
    let err = check(&f, &env, &t).unwrap_err();
    assert!(matches!(err.root_cause(), TcError::DeclError(_)));
}

// ----------------------------------------------------------------------
// Scoping combinators and error decoration
// ----------------------------------------------------------------------

#[test]
fn test_error_ctx_wrapping() {
    let (f, env) = setup();
    let nat = env.nat_type(&f);
    // \(x : Nat) -> x x — the body fails, decorated with x's scope.
    let t = f.lambda("x", nat, f.apply(f.local_var(0), f.local_var(0)));
    let err = check(&f, &env, &t).unwrap_err();
    match &err {
        TcError::ErrorCtx { var_name, inner, .. } => {
            assert_eq!(var_name, "x");
            assert!(matches!(**inner, TcError::NotFuncType(_)));
        }
        other => panic!("expected ErrorCtx, got {other:?}"),
    }
}

#[test]
fn test_at_pos_decorates_once() {
    let (f, env) = setup();
    let mut tc = TypeChecker::new(&f, &env, None);
    let p_outer = Pos {
        file: "outer.sc".into(),
        line: 1,
        col: 1,
    };
    let p_inner = Pos {
        file: "inner.sc".into(),
        line: 9,
        col: 9,
    };
    let bad = f.local_var(0);
    let err = tc
        .at_pos(&p_outer.clone(), |tc| {
            tc.at_pos(&p_inner.clone(), |tc| tc.infer(&bad))
        })
        .unwrap_err();
    // The innermost position wins; the outer at_pos must not re-wrap.
    match err {
        TcError::ErrorPos(pos, inner) => {
            assert_eq!(pos, p_inner);
            assert!(matches!(*inner, TcError::DanglingVar(0)));
        }
        other => panic!("expected a single ErrorPos, got {other:?}"),
    }
}

#[test]
fn test_memo_is_scoped_to_context() {
    let (f, env) = setup();
    let mut tc = TypeChecker::new(&f, &env, None);
    let var0 = f.local_var(0);
    let nat = env.nat_type(&f);
    let sort0 = f.sort(Sort::new(0));
    // The same shared node has different types under different binders; a
    // leaked memo entry would surface the wrong one.
    let outer = tc
        .with_var("A", sort0.clone(), |tc| {
            let first = tc.infer(&var0)?;
            let inner = tc.with_var("x", nat.clone(), |tc| tc.infer(&var0))?;
            Ok((first, inner))
        })
        .unwrap();
    assert_eq!(outer.0, sort0);
    assert_eq!(outer.1, nat);
}

#[test]
fn test_type_infer_ctx() {
    let (f, env) = setup();
    let mut tc = TypeChecker::new(&f, &env, None);
    let list = vec![
        ("A".to_string(), f.sort(Sort::new(0))),
        ("x".to_string(), f.local_var(0)),
    ];
    let out = tc.type_infer_ctx(&list).unwrap();
    assert_eq!(out.len(), 2);
    assert_eq!(out[0].2, Sort::new(1), "sort 0 lives in sort 1");
    assert_eq!(out[1].2, Sort::new(0), "A's inhabitants form a sort-0 type");
    assert!(tc.ctx().is_empty(), "context restored after inference");
}

// ----------------------------------------------------------------------
// Convertibility and subtyping
// ----------------------------------------------------------------------

#[test]
fn test_sharing_implies_convertible() {
    let (f, env) = setup();
    let a = f.lambda("x", env.nat_type(&f), f.local_var(0));
    let b = f.lambda("x", env.nat_type(&f), f.local_var(0));
    assert_eq!(a.index(), b.index());
    assert!(convertible(&f, &env, &a, &b));
}

#[test]
fn test_convertible_ignores_binder_names() {
    let (f, env) = setup();
    let a = f.lambda("x", env.nat_type(&f), f.local_var(0));
    let b = f.lambda("y", env.nat_type(&f), f.local_var(0));
    assert_ne!(a.index(), b.index());
    assert!(convertible(&f, &env, &a, &b));
}

#[test]
fn test_convertible_literal_vs_ctor_form() {
    let (f, env) = setup();
    let ids = env.prelude();
    let two_ctors = f.ctor_app(
        ids.succ.clone(),
        vec![],
        vec![f.ctor_app(ids.succ.clone(), vec![], vec![f.nat_lit(0u32)])],
    );
    assert!(convertible(&f, &env, &two_ctors, &f.nat_lit(2u32)));
    assert!(!convertible(&f, &env, &two_ctors, &f.nat_lit(3u32)));
}

#[test]
fn test_nat_conversions_toggle() {
    let (f, env) = setup();
    // addNat is a primitive; only the simpset can evaluate it on literals.
    let sum = f.apply_all(
        f.global(env.prelude().add_nat.clone()),
        vec![f.nat_lit(1u32), f.nat_lit(1u32)],
    );
    let with = TypeChecker::new(&f, &env, None);
    assert!(with.are_convertible(&sum, &f.nat_lit(2u32)));

    let without = TypeChecker::with_config(
        &f,
        &env,
        None,
        TcConfig {
            nat_conversions: false,
        },
    );
    assert!(!without.are_convertible(&sum, &f.nat_lit(2u32)));
}

#[test]
fn test_convertible_global_vs_datatype() {
    let (f, env) = setup();
    let g = f.global(env.prelude().nat.clone());
    assert!(convertible(&f, &env, &g, &env.nat_type(&f)));
}

#[test]
fn test_subtype_is_reflexive_and_transitive() {
    let (f, env) = setup();
    let tc = TypeChecker::new(&f, &env, None);
    let nat = env.nat_type(&f);
    let tys = vec![
        nat.clone(),
        f.sort(Sort::new(0)),
        f.pi("x", nat.clone(), env.string_type(&f)),
    ];
    for ty in &tys {
        assert!(tc.is_subtype(ty, ty), "not reflexive on {ty}");
    }
    let (s0, s1, s2) = (
        f.sort(Sort::new(0)),
        f.sort(Sort::new(1)),
        f.sort(Sort::new(2)),
    );
    assert!(tc.is_subtype(&s0, &s1) && tc.is_subtype(&s1, &s2) && tc.is_subtype(&s0, &s2));
    assert!(!tc.is_subtype(&s1, &s0));
}

#[test]
fn test_subtype_pi_codomain_covariance() {
    let (f, env) = setup();
    let tc = TypeChecker::new(&f, &env, None);
    let nat = env.nat_type(&f);
    let small = f.pi("x", nat.clone(), f.sort(Sort::new(0)));
    let big = f.pi("x", nat.clone(), f.sort(Sort::new(1)));
    assert!(tc.is_subtype(&small, &big));
    assert!(!tc.is_subtype(&big, &small));
    // Domains must be convertible, not merely related.
    let other = f.pi("x", env.string_type(&f), f.sort(Sort::new(1)));
    assert!(!tc.is_subtype(&small, &other));
}

// ----------------------------------------------------------------------
// Well-formedness of results
// ----------------------------------------------------------------------

#[test]
fn test_inferred_types_are_well_formed() {
    let (f, env) = setup();
    let nat = env.nat_type(&f);
    let subjects = vec![
        f.lambda("x", f.sort(Sort::new(0)), f.local_var(0)),
        f.pair_value(f.nat_lit(1u32), f.unit_value()),
        f.record_value(vec![("x".to_string(), f.nat_lit(1u32))]),
        rec_plus(&f, &env, f.nat_lit(1u32), f.nat_lit(1u32)),
        f.apply(f.lambda("x", nat, f.local_var(0)), f.nat_lit(9u32)),
    ];
    for t in subjects {
        let ty = check(&f, &env, &t).unwrap();
        // The type is itself well-typed, and its type is a sort.
        let ty_ty = check(&f, &env, &ty)
            .unwrap_or_else(|e| panic!("inferred type {ty} ill-formed: {e}"));
        assert!(
            matches!(ty_ty.term_f(), TermF::Sort(_)),
            "type of {ty} is not a sort: {ty_ty}"
        );
    }
}
