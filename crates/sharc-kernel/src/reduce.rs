//! Reduction
//!
//! Weak-head normalization and the equational simpset the type checker runs
//! before it. `whnf` performs beta, iota (pairs, records, recursors), delta
//! (definition unfolding), and zeta (non-recursive let groups); it is total,
//! deterministic, and idempotent — a head that cannot reduce is returned as
//! is, and missing environment entries simply fail to reduce.
//!
//! The simpset evaluates natural-number literals (`Succ`, `Zero`, `addNat`,
//! `mulNat`) bottom-up to a fixpoint, which is what lets vector-length and
//! similar literal-arithmetic equalities go through during subtype checks.

use num_bigint::BigUint;
use num_traits::Zero;
use rustc_hash::FxHashMap;
use tracing::trace;

use crate::env::ModuleEnv;
use crate::subst::{dec_vars, inc_vars, instantiate_var_list};
use crate::term::{LetBinding, Term, TermF, TermFactory, TermIndex};

/// Minimum stack space to reserve before recursive calls (32 KB).
const MIN_STACK_RED_ZONE: usize = 32 * 1024;

/// Stack size to grow to when running low (1 MB).
const STACK_GROWTH_SIZE: usize = 1024 * 1024;

/// Reduce to weak-head normal form.
pub fn whnf(factory: &TermFactory, env: &ModuleEnv, t: &Term) -> Term {
    stacker::maybe_grow(MIN_STACK_RED_ZONE, STACK_GROWTH_SIZE, || {
        whnf_core(factory, env, t)
    })
}

/// The type-checking WHNF: apply the natural-number conversions, then
/// reduce to weak-head normal form.
pub fn tc_whnf(factory: &TermFactory, env: &ModuleEnv, t: &Term) -> Term {
    let rewritten = rewrite(factory, env, &nat_conversions(), t);
    whnf(factory, env, &rewritten)
}

fn whnf_core(factory: &TermFactory, env: &ModuleEnv, t: &Term) -> Term {
    match t.term_f() {
        TermF::App(g, x) => {
            let gw = whnf(factory, env, g);
            match gw.term_f() {
                // Beta.
                TermF::Lambda(_, _, body) => {
                    let reduced =
                        instantiate_var_list(factory, 0, std::slice::from_ref(x), body);
                    whnf(factory, env, &reduced)
                }
                _ => {
                    if &gw == g {
                        t.clone()
                    } else {
                        factory.apply(gw, x.clone())
                    }
                }
            }
        }
        // Delta: unfold definitions with a body.
        TermF::Global(id) => match env.find_def(id).and_then(|d| d.body.as_ref()) {
            Some(body) => {
                trace!(global = %id, "delta-unfolding definition");
                whnf(factory, env, body)
            }
            None => t.clone(),
        },
        // Constants are transparent for computation: the definition is the
        // value, the node only records the declared type.
        TermF::Constant(name, defn, _) => {
            trace!(constant = %name, "delta-unfolding constant");
            whnf(factory, env, defn)
        }
        // Zeta, for groups whose right-hand sides do not refer back into
        // the group. Recursive groups are stuck.
        TermF::Let(defs, body) => match resolve_let_group(factory, defs) {
            Some(rhss) => {
                let reduced = instantiate_var_list(factory, 0, &rhss, body);
                whnf(factory, env, &reduced)
            }
            None => t.clone(),
        },
        TermF::PairLeft(p) => {
            let pw = whnf(factory, env, p);
            match pw.term_f() {
                TermF::PairValue(a, _) => whnf(factory, env, a),
                _ => {
                    if &pw == p {
                        t.clone()
                    } else {
                        factory.pair_left(pw)
                    }
                }
            }
        }
        TermF::PairRight(p) => {
            let pw = whnf(factory, env, p);
            match pw.term_f() {
                TermF::PairValue(_, b) => whnf(factory, env, b),
                _ => {
                    if &pw == p {
                        t.clone()
                    } else {
                        factory.pair_right(pw)
                    }
                }
            }
        }
        TermF::RecordSelector(r, fld) => {
            let fldw = whnf(factory, env, fld);
            let rw = whnf(factory, env, r);
            if let TermF::StringLit(want) = fldw.term_f() {
                let mut cur = rw.clone();
                loop {
                    let next = match cur.term_f() {
                        TermF::FieldValue(f2, val, rest) => {
                            match whnf(factory, env, f2).term_f() {
                                TermF::StringLit(have) if have == want => {
                                    return whnf(factory, env, val);
                                }
                                _ => whnf(factory, env, rest),
                            }
                        }
                        _ => break,
                    };
                    cur = next;
                }
            }
            if &rw == r && &fldw == fld {
                t.clone()
            } else {
                factory.record_selector(rw, fldw)
            }
        }
        TermF::RecursorApp {
            data,
            params,
            motive,
            cases,
            indices,
            scrutinee,
        } => {
            let mut sw = whnf(factory, env, scrutinee);
            // A literal eliminated by the natural-number recursor is viewed
            // in constructor form.
            if data == &env.prelude().nat {
                if let TermF::NatLit(n) = sw.term_f() {
                    sw = nat_lit_as_ctor(factory, env, n);
                }
            }
            if let TermF::CtorApp(c, _, args) = sw.term_f() {
                if let Some(reduced) = iota_reduce(
                    factory, env, data, params, motive, cases, c, args,
                ) {
                    return whnf(factory, env, &reduced);
                }
            }
            if &sw == scrutinee {
                t.clone()
            } else {
                factory.recursor_app(
                    data.clone(),
                    params.clone(),
                    motive.clone(),
                    cases.clone(),
                    indices.clone(),
                    sw,
                )
            }
        }
        _ => t.clone(),
    }
}

/// View a natural-number literal as a constructor application.
fn nat_lit_as_ctor(factory: &TermFactory, env: &ModuleEnv, n: &BigUint) -> Term {
    let ids = env.prelude();
    if n.is_zero() {
        factory.ctor_app(ids.zero.clone(), vec![], vec![])
    } else {
        let pred = factory.nat_lit(n - 1u32);
        factory.ctor_app(ids.succ.clone(), vec![], vec![pred])
    }
}

/// Zeta precondition: every right-hand side must stand on its own (no
/// references back into the group). Returns the rhss re-expressed outside
/// the group's binders.
fn resolve_let_group(factory: &TermFactory, defs: &[LetBinding]) -> Option<Vec<Term>> {
    let n = defs.len();
    defs.iter().map(|d| dec_vars(factory, n, &d.rhs)).collect()
}

/// The recursor computation rule: eliminate a constructor application by
/// handing the constructor's arguments (with an induction hypothesis after
/// each recursive one) to the matching case.
#[allow(clippy::too_many_arguments)]
fn iota_reduce(
    factory: &TermFactory,
    env: &ModuleEnv,
    data: &crate::name::Ident,
    params: &[Term],
    motive: &Term,
    cases: &std::collections::BTreeMap<crate::name::Ident, Term>,
    ctor_name: &crate::name::Ident,
    args: &[Term],
) -> Option<Term> {
    let ctor = env.find_ctor(ctor_name)?;
    if &ctor.data_type != data {
        return None;
    }
    let case = cases.get(ctor_name)?;
    let shape = env.analyze_ctor(factory, ctor, params).ok()?;
    if shape.args.len() != args.len() {
        return None;
    }

    let mut applied = Vec::new();
    for (j, (arg_spec, arg)) in shape.args.iter().zip(args).enumerate() {
        applied.push(arg.clone());
        let Some(spec) = &arg_spec.recursive else {
            continue;
        };
        // Arguments bound before this one, innermost first, for
        // instantiating the analysis telescopes.
        let rev_args: Vec<Term> = args[..j].iter().rev().cloned().collect();
        let m = spec.binders.len();
        let z_tys: Vec<(String, Term)> = spec
            .binders
            .iter()
            .enumerate()
            .map(|(i, (n, ty))| (n.clone(), instantiate_var_list(factory, i, &rev_args, ty)))
            .collect();
        let ixs: Vec<Term> = spec
            .indices
            .iter()
            .map(|ix| instantiate_var_list(factory, m, &rev_args, ix))
            .collect();
        let z_vars: Vec<Term> = (0..m).rev().map(|i| factory.local_var(i)).collect();
        let rec_scrutinee = factory.apply_all(inc_vars(factory, 0, m, arg), z_vars);
        let lift = |t: &Term| inc_vars(factory, 0, m, t);
        let mut ih = factory.recursor_app(
            data.clone(),
            params.iter().map(lift).collect(),
            lift(motive),
            cases.iter().map(|(k, v)| (k.clone(), lift(v))).collect(),
            ixs,
            rec_scrutinee,
        );
        for (n, ty) in z_tys.into_iter().rev() {
            ih = factory.lambda(n, ty, ih);
        }
        applied.push(ih);
    }
    Some(factory.apply_all(case.clone(), applied))
}

// ============================================================================
// Rewriting
// ============================================================================

/// A single conversion: a syntactic identity applied at one node.
pub type Conversion = fn(&TermFactory, &ModuleEnv, &Term) -> Option<Term>;

/// An equational simpset applied bottom-up to a fixpoint.
pub struct Simpset {
    conversions: Vec<Conversion>,
}

impl Simpset {
    pub fn new(conversions: Vec<Conversion>) -> Self {
        Simpset { conversions }
    }
}

/// The natural-number conversions the type checker runs before WHNF.
pub fn nat_conversions() -> Simpset {
    Simpset::new(vec![conv_zero, conv_succ, conv_add_nat, conv_mul_nat])
}

/// `Zero ↦ 0`.
fn conv_zero(factory: &TermFactory, env: &ModuleEnv, t: &Term) -> Option<Term> {
    match t.term_f() {
        TermF::CtorApp(c, params, args)
            if c == &env.prelude().zero && params.is_empty() && args.is_empty() =>
        {
            Some(factory.nat_lit(0u32))
        }
        _ => None,
    }
}

/// `Succ n ↦ n + 1` on literals.
fn conv_succ(factory: &TermFactory, env: &ModuleEnv, t: &Term) -> Option<Term> {
    match t.term_f() {
        TermF::CtorApp(c, params, args) if c == &env.prelude().succ && params.is_empty() => {
            match args.as_slice() {
                [arg] => match arg.term_f() {
                    TermF::NatLit(n) => Some(factory.nat_lit(n + 1u32)),
                    _ => None,
                },
                _ => None,
            }
        }
        _ => None,
    }
}

fn binop_lit_args<'a>(
    t: &'a Term,
    op: &crate::name::Ident,
) -> Option<(&'a BigUint, &'a BigUint)> {
    let TermF::App(g, b) = t.term_f() else {
        return None;
    };
    let TermF::App(h, a) = g.term_f() else {
        return None;
    };
    let TermF::Global(id) = h.term_f() else {
        return None;
    };
    if id != op {
        return None;
    }
    match (a.term_f(), b.term_f()) {
        (TermF::NatLit(x), TermF::NatLit(y)) => Some((x, y)),
        _ => None,
    }
}

/// `addNat x y ↦ x + y` on literals.
fn conv_add_nat(factory: &TermFactory, env: &ModuleEnv, t: &Term) -> Option<Term> {
    let (x, y) = binop_lit_args(t, &env.prelude().add_nat)?;
    Some(factory.nat_lit(x + y))
}

/// `mulNat x y ↦ x * y` on literals.
fn conv_mul_nat(factory: &TermFactory, env: &ModuleEnv, t: &Term) -> Option<Term> {
    let (x, y) = binop_lit_args(t, &env.prelude().mul_nat)?;
    Some(factory.nat_lit(x * y))
}

/// Apply a simpset bottom-up until no conversion fires, memoizing on shared
/// node indices.
pub fn rewrite(factory: &TermFactory, env: &ModuleEnv, ss: &Simpset, t: &Term) -> Term {
    let mut memo: FxHashMap<TermIndex, Term> = FxHashMap::default();
    rewrite_go(factory, env, ss, t, &mut memo)
}

fn rewrite_go(
    factory: &TermFactory,
    env: &ModuleEnv,
    ss: &Simpset,
    t: &Term,
    memo: &mut FxHashMap<TermIndex, Term>,
) -> Term {
    if let Some(ix) = t.index() {
        if let Some(cached) = memo.get(&ix) {
            return cached.clone();
        }
    }
    let rebuilt = stacker::maybe_grow(MIN_STACK_RED_ZONE, STACK_GROWTH_SIZE, || {
        rewrite_children(factory, env, ss, t, memo)
    });
    let mut result = rebuilt;
    'outer: loop {
        for conv in &ss.conversions {
            if let Some(next) = conv(factory, env, &result) {
                result = next;
                continue 'outer;
            }
        }
        break;
    }
    if let Some(ix) = t.index() {
        memo.insert(ix, result.clone());
    }
    result
}

fn rewrite_children(
    factory: &TermFactory,
    env: &ModuleEnv,
    ss: &Simpset,
    t: &Term,
    memo: &mut FxHashMap<TermIndex, Term>,
) -> Term {
    macro_rules! rec {
        ($child:expr) => {
            rewrite_go(factory, env, ss, $child, memo)
        };
    }
    match t.term_f() {
        TermF::Lambda(n, a, b) => {
            let (a2, b2) = (rec!(a), rec!(b));
            factory.term(TermF::Lambda(n.clone(), a2, b2))
        }
        TermF::Pi(n, a, b) => {
            let (a2, b2) = (rec!(a), rec!(b));
            factory.term(TermF::Pi(n.clone(), a2, b2))
        }
        TermF::Let(defs, body) => {
            let defs2 = defs
                .iter()
                .map(|d| LetBinding {
                    name: d.name.clone(),
                    ty: rec!(&d.ty),
                    rhs: rec!(&d.rhs),
                })
                .collect();
            let body2 = rec!(body);
            factory.term(TermF::Let(defs2, body2))
        }
        TermF::App(g, x) => {
            let (g2, x2) = (rec!(g), rec!(x));
            factory.apply(g2, x2)
        }
        TermF::ArrayValue(ty, elems) => {
            let ty2 = rec!(ty);
            let elems2 = elems.iter().map(|e| rec!(e)).collect();
            factory.term(TermF::ArrayValue(ty2, elems2))
        }
        TermF::PairValue(a, b) => {
            let (a2, b2) = (rec!(a), rec!(b));
            factory.pair_value(a2, b2)
        }
        TermF::PairType(a, b) => {
            let (a2, b2) = (rec!(a), rec!(b));
            factory.pair_type(a2, b2)
        }
        TermF::PairLeft(p) => {
            let p2 = rec!(p);
            factory.pair_left(p2)
        }
        TermF::PairRight(p) => {
            let p2 = rec!(p);
            factory.pair_right(p2)
        }
        TermF::FieldValue(a, b, c) => {
            let (a2, b2, c2) = (rec!(a), rec!(b), rec!(c));
            factory.field_value(a2, b2, c2)
        }
        TermF::FieldType(a, b, c) => {
            let (a2, b2, c2) = (rec!(a), rec!(b), rec!(c));
            factory.field_type(a2, b2, c2)
        }
        TermF::RecordSelector(r, fld) => {
            let (r2, fld2) = (rec!(r), rec!(fld));
            factory.record_selector(r2, fld2)
        }
        TermF::CtorApp(c, params, args) => {
            let params2 = params.iter().map(|p| rec!(p)).collect();
            let args2 = args.iter().map(|a| rec!(a)).collect();
            factory.ctor_app(c.clone(), params2, args2)
        }
        TermF::DataTypeApp(d, params, indices) => {
            let params2 = params.iter().map(|p| rec!(p)).collect();
            let indices2 = indices.iter().map(|i| rec!(i)).collect();
            factory.data_type_app(d.clone(), params2, indices2)
        }
        TermF::RecursorApp {
            data,
            params,
            motive,
            cases,
            indices,
            scrutinee,
        } => {
            let params2 = params.iter().map(|p| rec!(p)).collect();
            let motive2 = rec!(motive);
            let cases2 = cases.iter().map(|(k, v)| (k.clone(), rec!(v))).collect();
            let indices2 = indices.iter().map(|i| rec!(i)).collect();
            let scrutinee2 = rec!(scrutinee);
            factory.recursor_app(data.clone(), params2, motive2, cases2, indices2, scrutinee2)
        }
        // Constants stay opaque: rewriting under a declared definition
        // would desynchronize it from its recorded type.
        TermF::Constant(_, _, _)
        | TermF::LocalVar(_)
        | TermF::Global(_)
        | TermF::Sort(_)
        | TermF::NatLit(_)
        | TermF::StringLit(_)
        | TermF::ExtCns(_)
        | TermF::UnitValue
        | TermF::UnitType => t.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::name::Ident;
    use std::collections::BTreeMap;

    fn setup() -> (TermFactory, ModuleEnv) {
        let f = TermFactory::new();
        let env = ModuleEnv::with_prelude(&f);
        (f, env)
    }

    #[test]
    fn test_beta() {
        let (f, env) = setup();
        let id = f.lambda("x", env.nat_type(&f), f.local_var(0));
        let app = f.apply(id, f.nat_lit(3u32));
        assert_eq!(whnf(&f, &env, &app), f.nat_lit(3u32));
    }

    #[test]
    fn test_beta_under_application_spine() {
        let (f, env) = setup();
        // (\x -> \y -> x) a b --> a
        let k = f.lambda(
            "x",
            env.nat_type(&f),
            f.lambda("y", env.nat_type(&f), f.local_var(1)),
        );
        let app = f.apply(f.apply(k, f.nat_lit(1u32)), f.nat_lit(2u32));
        assert_eq!(whnf(&f, &env, &app), f.nat_lit(1u32));
    }

    #[test]
    fn test_pair_iota() {
        let (f, env) = setup();
        let p = f.pair_value(f.nat_lit(1u32), f.nat_lit(2u32));
        assert_eq!(whnf(&f, &env, &f.pair_left(p.clone())), f.nat_lit(1u32));
        assert_eq!(whnf(&f, &env, &f.pair_right(p)), f.nat_lit(2u32));
    }

    #[test]
    fn test_record_iota() {
        let (f, env) = setup();
        let r = f.record_value(vec![
            ("x".to_string(), f.nat_lit(1u32)),
            ("y".to_string(), f.nat_lit(2u32)),
        ]);
        let sel = f.record_selector(r, f.string_lit("y"));
        assert_eq!(whnf(&f, &env, &sel), f.nat_lit(2u32));
    }

    #[test]
    fn test_delta_global() {
        let (f, env) = setup();
        let nat_global = f.global(env.prelude().nat.clone());
        assert_eq!(whnf(&f, &env, &nat_global), env.nat_type(&f));
    }

    #[test]
    fn test_delta_constant() {
        let (f, env) = setup();
        let c = f.constant(
            Ident::parse("Test.three"),
            f.nat_lit(3u32),
            env.nat_type(&f),
        );
        assert_eq!(whnf(&f, &env, &c), f.nat_lit(3u32));
    }

    #[test]
    fn test_zeta_nonrecursive() {
        let (f, env) = setup();
        // let {x : Nat = 1} in x
        let t = f.term(TermF::Let(
            vec![LetBinding {
                name: "x".into(),
                ty: env.nat_type(&f),
                rhs: f.nat_lit(1u32),
            }],
            f.local_var(0),
        ));
        assert_eq!(whnf(&f, &env, &t), f.nat_lit(1u32));
    }

    #[test]
    fn test_zeta_recursive_is_stuck() {
        let (f, env) = setup();
        // let {x : Nat = x} in x — stuck, but still head-stable.
        let t = f.term(TermF::Let(
            vec![LetBinding {
                name: "x".into(),
                ty: env.nat_type(&f),
                rhs: f.local_var(0),
            }],
            f.local_var(0),
        ));
        let w = whnf(&f, &env, &t);
        assert_eq!(w, t);
    }

    #[test]
    fn test_whnf_is_weak() {
        let (f, env) = setup();
        // A redex under a lambda stays put.
        let inner = f.apply(
            f.lambda("x", env.nat_type(&f), f.local_var(0)),
            f.nat_lit(1u32),
        );
        let lam = f.lambda("y", env.nat_type(&f), inner.clone());
        assert_eq!(whnf(&f, &env, &lam), lam);
    }

    #[test]
    fn test_whnf_idempotent() {
        let (f, env) = setup();
        let terms = vec![
            f.apply(
                f.lambda("x", env.nat_type(&f), f.local_var(0)),
                f.nat_lit(3u32),
            ),
            f.pair_left(f.pair_value(f.unit_value(), f.unit_value())),
            f.global(env.prelude().nat.clone()),
            f.local_var(4),
            f.apply(f.local_var(0), f.nat_lit(1u32)),
        ];
        for t in terms {
            let once = whnf(&f, &env, &t);
            let twice = whnf(&f, &env, &once);
            assert_eq!(once, twice, "whnf not idempotent on {t}");
        }
    }

    /// Addition on naturals via the recursor, used by several tests.
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

    #[test]
    fn test_recursor_iota_on_zero() {
        let (f, env) = setup();
        let zero = f.ctor_app(env.prelude().zero.clone(), vec![], vec![]);
        let sum = rec_plus(&f, &env, zero, f.nat_lit(5u32));
        assert_eq!(whnf(&f, &env, &sum), f.nat_lit(5u32));
    }

    #[test]
    fn test_recursor_iota_on_literal() {
        let (f, env) = setup();
        // Eliminating the literal 2 exposes Succ of a recursive call; WHNF
        // stops at the constructor head.
        let sum = rec_plus(&f, &env, f.nat_lit(2u32), f.nat_lit(3u32));
        let w = whnf(&f, &env, &sum);
        match w.term_f() {
            TermF::CtorApp(c, _, args) => {
                assert_eq!(c, &env.prelude().succ);
                assert_eq!(args.len(), 1);
            }
            other => panic!("expected Succ head, got {other:?}"),
        }
    }

    #[test]
    fn test_recursor_missing_case_is_stuck() {
        let (f, env) = setup();
        let ids = env.prelude();
        let nat = env.nat_type(&f);
        let motive = f.lambda("n", nat.clone(), nat.clone());
        let cases = BTreeMap::new();
        let t = f.recursor_app(
            ids.nat.clone(),
            vec![],
            motive,
            cases,
            vec![],
            f.nat_lit(0u32),
        );
        let w = whnf(&f, &env, &t);
        assert!(matches!(w.term_f(), TermF::RecursorApp { .. }));
    }

    #[test]
    fn test_nat_conversions() {
        let (f, env) = setup();
        let ss = nat_conversions();
        let succ2 = f.ctor_app(env.prelude().succ.clone(), vec![], vec![f.nat_lit(2u32)]);
        assert_eq!(rewrite(&f, &env, &ss, &succ2), f.nat_lit(3u32));

        let zero = f.ctor_app(env.prelude().zero.clone(), vec![], vec![]);
        assert_eq!(rewrite(&f, &env, &ss, &zero), f.nat_lit(0u32));

        let add = f.apply_all(
            f.global(env.prelude().add_nat.clone()),
            vec![f.nat_lit(2u32), f.nat_lit(3u32)],
        );
        assert_eq!(rewrite(&f, &env, &ss, &add), f.nat_lit(5u32));

        let mul = f.apply_all(
            f.global(env.prelude().mul_nat.clone()),
            vec![f.nat_lit(4u32), f.nat_lit(5u32)],
        );
        assert_eq!(rewrite(&f, &env, &ss, &mul), f.nat_lit(20u32));
    }

    #[test]
    fn test_conversions_nest() {
        let (f, env) = setup();
        let ss = nat_conversions();
        // Succ (addNat 1 (mulNat 2 3)) --> 8
        let inner = f.apply_all(
            f.global(env.prelude().mul_nat.clone()),
            vec![f.nat_lit(2u32), f.nat_lit(3u32)],
        );
        let mid = f.apply_all(
            f.global(env.prelude().add_nat.clone()),
            vec![f.nat_lit(1u32), inner],
        );
        let outer = f.ctor_app(env.prelude().succ.clone(), vec![], vec![mid]);
        assert_eq!(rewrite(&f, &env, &ss, &outer), f.nat_lit(8u32));
    }

    #[test]
    fn test_tc_whnf_combines_both() {
        let (f, env) = setup();
        // addNat 1 1 applied under a beta redex.
        let add = f.apply_all(
            f.global(env.prelude().add_nat.clone()),
            vec![f.nat_lit(1u32), f.nat_lit(1u32)],
        );
        let t = f.apply(
            f.lambda("x", env.nat_type(&f), f.local_var(0)),
            add,
        );
        assert_eq!(tc_whnf(&f, &env, &t), f.nat_lit(2u32));
    }
}
