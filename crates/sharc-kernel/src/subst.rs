//! Substitution and lifting
//!
//! Capture-avoiding operations on de Bruijn terms: shifting (`inc_vars`),
//! generic substitution of dangling variables (`instantiate_vars`), and
//! simultaneous substitution of a list (`instantiate_var_list`).
//!
//! All traversals prune subtrees whose free-variable bitset shows nothing at
//! or above the current cutoff, and memoize per (shared index, binder depth),
//! so shared subterms are rewritten once.

use rustc_hash::FxHashMap;

use crate::term::{LetBinding, Term, TermF, TermFactory, TermIndex};

/// Minimum stack space to reserve before recursive calls (32 KB).
const MIN_STACK_RED_ZONE: usize = 32 * 1024;

/// Stack size to grow to when running low (1 MB).
const STACK_GROWTH_SIZE: usize = 1024 * 1024;

/// Shift every free `LocalVar(i)` with `i >= cutoff` up by `delta`.
pub fn inc_vars(factory: &TermFactory, cutoff: usize, delta: usize, t: &Term) -> Term {
    if delta == 0 {
        return t.clone();
    }
    map_vars(factory, cutoff, t, &mut |f, _level, j| f.local_var(j + delta))
}

/// Substitute each dangling `LocalVar(j)` (with `j >= level`) by
/// `sub(level', j)`, where `level'` is the number of binders surrounding the
/// occurrence. `Constant` nodes are left unchanged.
pub fn instantiate_vars(
    factory: &TermFactory,
    level: usize,
    t: &Term,
    sub: &mut dyn FnMut(&TermFactory, usize, usize) -> Term,
) -> Term {
    map_vars(factory, level, t, sub)
}

/// Substitute `ts[0..n-1]` for `LocalVar(k..k+n-1)` and shift every higher
/// free variable down by `n`. Elements of `ts` are understood at the scope
/// outside the traversed binders; the shifted copies consulted at each depth
/// are memoized.
pub fn instantiate_var_list(factory: &TermFactory, k: usize, ts: &[Term], t: &Term) -> Term {
    let n = ts.len();
    if n == 0 {
        return t.clone();
    }
    let mut shifted: FxHashMap<(usize, usize), Term> = FxHashMap::default();
    map_vars(factory, 0, t, &mut |f, level, j| {
        let rel = j - level;
        if rel < k {
            f.local_var(j)
        } else if rel < k + n {
            shifted
                .entry((rel - k, level))
                .or_insert_with(|| inc_vars(f, 0, level, &ts[rel - k]))
                .clone()
        } else {
            f.local_var(j - n)
        }
    })
}

/// Shift every free variable down by `n`. Returns `None` when some free
/// variable below `n` would dangle.
pub(crate) fn dec_vars(factory: &TermFactory, n: usize, t: &Term) -> Option<Term> {
    if n == 0 {
        return Some(t.clone());
    }
    if t.free_vars().iter().any(|i| i < n) {
        return None;
    }
    Some(map_vars(factory, 0, t, &mut |f, level, j| {
        f.local_var(j - n)
    }))
}

/// Core traversal: rewrite every dangling variable through `sub`, keeping
/// the cutoff in step with the binders crossed.
fn map_vars(
    factory: &TermFactory,
    level: usize,
    t: &Term,
    sub: &mut dyn FnMut(&TermFactory, usize, usize) -> Term,
) -> Term {
    let mut memo: FxHashMap<(TermIndex, usize), Term> = FxHashMap::default();
    go(factory, level, t, sub, &mut memo)
}

fn go(
    factory: &TermFactory,
    level: usize,
    t: &Term,
    sub: &mut dyn FnMut(&TermFactory, usize, usize) -> Term,
    memo: &mut FxHashMap<(TermIndex, usize), Term>,
) -> Term {
    if !t.has_var_at_or_above(level) {
        return t.clone();
    }
    if let Some(ix) = t.index() {
        if let Some(cached) = memo.get(&(ix, level)) {
            return cached.clone();
        }
    }
    let result = stacker::maybe_grow(MIN_STACK_RED_ZONE, STACK_GROWTH_SIZE, || {
        go_node(factory, level, t, sub, memo)
    });
    if let Some(ix) = t.index() {
        memo.insert((ix, level), result.clone());
    }
    result
}

fn go_node(
    factory: &TermFactory,
    level: usize,
    t: &Term,
    sub: &mut dyn FnMut(&TermFactory, usize, usize) -> Term,
    memo: &mut FxHashMap<(TermIndex, usize), Term>,
) -> Term {
    macro_rules! rec {
        ($lvl:expr, $child:expr) => {
            go(factory, $lvl, $child, sub, memo)
        };
    }
    match t.term_f() {
        TermF::LocalVar(j) => {
            debug_assert!(*j >= level, "pruning admitted a bound variable");
            sub(factory, level, *j)
        }
        TermF::Lambda(name, ty, body) => {
            let ty2 = rec!(level, ty);
            let body2 = rec!(level + 1, body);
            factory.term(TermF::Lambda(name.clone(), ty2, body2))
        }
        TermF::Pi(name, ty, body) => {
            let ty2 = rec!(level, ty);
            let body2 = rec!(level + 1, body);
            factory.term(TermF::Pi(name.clone(), ty2, body2))
        }
        TermF::Let(defs, body) => {
            let n = defs.len();
            let defs2 = defs
                .iter()
                .map(|d| LetBinding {
                    name: d.name.clone(),
                    ty: rec!(level, &d.ty),
                    rhs: rec!(level + n, &d.rhs),
                })
                .collect();
            let body2 = rec!(level + n, body);
            factory.term(TermF::Let(defs2, body2))
        }
        // Closed by definition; the pruning above normally catches this,
        // but an unshared wrapper may reach here.
        TermF::Constant(_, _, _) => t.clone(),
        TermF::App(f, x) => {
            let f2 = rec!(level, f);
            let x2 = rec!(level, x);
            factory.term(TermF::App(f2, x2))
        }
        TermF::ArrayValue(ty, elems) => {
            let ty2 = rec!(level, ty);
            let elems2 = elems.iter().map(|e| rec!(level, e)).collect();
            factory.term(TermF::ArrayValue(ty2, elems2))
        }
        TermF::ExtCns(ec) => {
            let ty2 = rec!(level, &ec.ty);
            factory.term(TermF::ExtCns(crate::term::ExtCns {
                var_index: ec.var_index,
                name: ec.name.clone(),
                ty: ty2,
            }))
        }
        TermF::PairValue(a, b) => {
            let a2 = rec!(level, a);
            let b2 = rec!(level, b);
            factory.term(TermF::PairValue(a2, b2))
        }
        TermF::PairType(a, b) => {
            let a2 = rec!(level, a);
            let b2 = rec!(level, b);
            factory.term(TermF::PairType(a2, b2))
        }
        TermF::PairLeft(p) => {
            let p2 = rec!(level, p);
            factory.term(TermF::PairLeft(p2))
        }
        TermF::PairRight(p) => {
            let p2 = rec!(level, p);
            factory.term(TermF::PairRight(p2))
        }
        TermF::FieldValue(fld, val, rest) => {
            let fld2 = rec!(level, fld);
            let val2 = rec!(level, val);
            let rest2 = rec!(level, rest);
            factory.term(TermF::FieldValue(fld2, val2, rest2))
        }
        TermF::FieldType(fld, ty, rest) => {
            let fld2 = rec!(level, fld);
            let ty2 = rec!(level, ty);
            let rest2 = rec!(level, rest);
            factory.term(TermF::FieldType(fld2, ty2, rest2))
        }
        TermF::RecordSelector(rec_, fld) => {
            let r2 = rec!(level, rec_);
            let fld2 = rec!(level, fld);
            factory.term(TermF::RecordSelector(r2, fld2))
        }
        TermF::CtorApp(c, params, args) => {
            let params2 = params.iter().map(|p| rec!(level, p)).collect();
            let args2 = args.iter().map(|a| rec!(level, a)).collect();
            factory.term(TermF::CtorApp(c.clone(), params2, args2))
        }
        TermF::DataTypeApp(d, params, indices) => {
            let params2 = params.iter().map(|p| rec!(level, p)).collect();
            let indices2 = indices.iter().map(|i| rec!(level, i)).collect();
            factory.term(TermF::DataTypeApp(d.clone(), params2, indices2))
        }
        TermF::RecursorApp {
            data,
            params,
            motive,
            cases,
            indices,
            scrutinee,
        } => {
            let params2 = params.iter().map(|p| rec!(level, p)).collect();
            let motive2 = rec!(level, motive);
            let cases2 = cases
                .iter()
                .map(|(c, t)| (c.clone(), rec!(level, t)))
                .collect();
            let indices2 = indices.iter().map(|i| rec!(level, i)).collect();
            let scrutinee2 = rec!(level, scrutinee);
            factory.term(TermF::RecursorApp {
                data: data.clone(),
                params: params2,
                motive: motive2,
                cases: cases2,
                indices: indices2,
                scrutinee: scrutinee2,
            })
        }
        // No variables to touch; unreachable past the pruning check for
        // shared nodes.
        TermF::Global(_)
        | TermF::Sort(_)
        | TermF::NatLit(_)
        | TermF::StringLit(_)
        | TermF::UnitValue
        | TermF::UnitType => t.clone(),
    }
}
