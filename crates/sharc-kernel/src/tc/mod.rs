//! Type inference
//!
//! The bidirectional inference engine over shared terms. `infer` walks a
//! term bottom-up under a typing context, consulting the module environment
//! for datatype, constructor, and definition signatures, normalizing
//! intermediate types with the type-checking WHNF, and returning the most
//! general type in weak-head normal form.
//!
//! Inference is memoized per shared-node index. The memo table is only
//! meaningful under a fixed context, so `with_var` saves it, clears it for
//! the extended scope, and restores it on exit. Errors unwind to the nearest
//! `at_pos`/`with_var` frame, which decorate them with positions and
//! variable scopes but never swallow them.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::env::{DataTypeVal, DeclError, ModuleEnv};
use crate::name::{Ident, ModuleName};
use crate::reduce;
use crate::sort::Sort;
use crate::subst::{inc_vars, instantiate_var_list};
use crate::term::{Term, TermF, TermFactory, TermIndex};

/// Minimum stack space to reserve before recursive calls (32 KB).
const MIN_STACK_RED_ZONE: usize = 32 * 1024;

/// Stack size to grow to when running low (1 MB).
const STACK_GROWTH_SIZE: usize = 1024 * 1024;

/// A source position attached to errors by `at_pos`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pos {
    pub file: String,
    pub line: u32,
    pub col: u32,
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.col)
    }
}

/// A value paired with its type (in WHNF), as passed between engine stages.
#[derive(Clone, Debug)]
pub struct TypedTerm {
    pub value: Term,
    pub ty: Term,
}

/// Checker switches, in the spirit of kernel mode flags: currently only
/// whether the literal simpset runs before WHNF during type checking.
#[derive(Clone, Copy, Debug)]
pub struct TcConfig {
    pub nat_conversions: bool,
}

impl Default for TcConfig {
    fn default() -> Self {
        TcConfig {
            nat_conversions: true,
        }
    }
}

/// Type checking errors.
///
/// Term payloads are boxed to keep the `Result` success path small; errors
/// are rare but results are returned everywhere.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TcError {
    #[error("expected a sort, got: {0}")]
    NotSort(Box<Term>),
    #[error("expected a function type, got: {0}")]
    NotFuncType(Box<Term>),
    #[error("expected a tuple type, got: {0}")]
    NotTupleType(Box<Term>),
    #[error("tuple index {0} out of range for {1}")]
    BadTupleIndex(usize, Box<Term>),
    #[error("record field is not a string literal: {0}")]
    NotStringLit(Box<Term>),
    #[error("expected a record type, got: {0}")]
    NotRecordType(Box<Term>),
    #[error("no field {field} in record type {record_ty}")]
    BadRecordField { field: String, record_ty: Box<Term> },
    #[error("dangling de Bruijn index {0}")]
    DanglingVar(usize),
    #[error("unbound name: {0}")]
    UnboundName(Ident),
    #[error("{found} is not a subtype of {expected}")]
    SubtypeFailure { found: Box<Term>, expected: Box<Term> },
    #[error("vector literals must be non-empty")]
    EmptyVectorLit,
    #[error("no such datatype: {0}")]
    NoSuchDataType(Ident),
    #[error("no such constructor: {0}")]
    NoSuchCtor(Ident),
    #[error("recursor is not fully applied: {0}")]
    NotFullyAppliedRec(Box<Term>),
    #[error("wrong number of parameters or arguments for {id}: {params} parameters, {args} arguments")]
    BadParamsOrArgsLength {
        is_data_type: bool,
        id: Ident,
        params: usize,
        args: usize,
    },
    #[error("declared type mismatch for {name}: inferred {inferred}, declared {declared}")]
    BadConstType {
        name: Ident,
        inferred: Box<Term>,
        declared: Box<Term>,
    },
    #[error("malformed recursor {0}: {1}")]
    MalformedRecursor(Box<Term>, String),
    #[error(transparent)]
    DeclError(#[from] DeclError),
    #[error("at {0}: {1}")]
    ErrorPos(Pos, Box<TcError>),
    #[error("in the scope of {var_name} : {var_ty}: {inner}")]
    ErrorCtx {
        var_name: String,
        var_ty: Box<Term>,
        inner: Box<TcError>,
    },
}

impl TcError {
    /// Whether a position is already attached, looking through scope
    /// wrappers. `at_pos` only decorates errors that carry none, so the
    /// innermost position wins.
    pub fn has_position(&self) -> bool {
        match self {
            TcError::ErrorPos(_, _) => true,
            TcError::ErrorCtx { inner, .. } => inner.has_position(),
            _ => false,
        }
    }

    /// The error underneath all position and scope wrappers.
    pub fn root_cause(&self) -> &TcError {
        match self {
            TcError::ErrorPos(_, inner) | TcError::ErrorCtx { inner, .. } => inner.root_cause(),
            other => other,
        }
    }
}

// ============================================================================
// Convertibility
// ============================================================================

/// Decide alpha-equivalence up to the type-checking WHNF and the
/// natural-number conversions. Both terms are expected well-typed in the
/// ambient context.
pub fn convertible(factory: &TermFactory, env: &ModuleEnv, t1: &Term, t2: &Term) -> bool {
    conv(factory, env, true, t1, t2)
}

fn conv(factory: &TermFactory, env: &ModuleEnv, use_simpset: bool, t1: &Term, t2: &Term) -> bool {
    let red = |t: &Term| {
        if use_simpset {
            reduce::tc_whnf(factory, env, t)
        } else {
            reduce::whnf(factory, env, t)
        }
    };
    let a = red(t1);
    let b = red(t2);
    if let (Some(i), Some(j)) = (a.index(), b.index()) {
        if i == j {
            return true;
        }
    }
    let rec = |x: &Term, y: &Term| conv(factory, env, use_simpset, x, y);
    let rec_all = |xs: &[Term], ys: &[Term]| {
        xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| rec(x, y))
    };
    match (a.term_f(), b.term_f()) {
        (TermF::LocalVar(i), TermF::LocalVar(j)) => i == j,
        // Binder names are irrelevant.
        (TermF::Lambda(_, ty1, b1), TermF::Lambda(_, ty2, b2))
        | (TermF::Pi(_, ty1, b1), TermF::Pi(_, ty2, b2)) => rec(ty1, ty2) && rec(b1, b2),
        (TermF::Let(d1, b1), TermF::Let(d2, b2)) => {
            d1.len() == d2.len()
                && d1
                    .iter()
                    .zip(d2)
                    .all(|(x, y)| rec(&x.ty, &y.ty) && rec(&x.rhs, &y.rhs))
                && rec(b1, b2)
        }
        (TermF::App(f1, x1), TermF::App(f2, x2)) => rec(f1, f2) && rec(x1, x2),
        // Universe equality is strict here; cumulativity lives in the
        // subtype check.
        (TermF::Sort(s1), TermF::Sort(s2)) => s1 == s2,
        (TermF::Global(g1), TermF::Global(g2)) => g1 == g2,
        (TermF::NatLit(m), TermF::NatLit(n)) => m == n,
        (TermF::StringLit(s1), TermF::StringLit(s2)) => s1 == s2,
        (TermF::UnitValue, TermF::UnitValue) | (TermF::UnitType, TermF::UnitType) => true,
        (TermF::PairValue(a1, b1), TermF::PairValue(a2, b2))
        | (TermF::PairType(a1, b1), TermF::PairType(a2, b2)) => rec(a1, a2) && rec(b1, b2),
        (TermF::PairLeft(p1), TermF::PairLeft(p2))
        | (TermF::PairRight(p1), TermF::PairRight(p2)) => rec(p1, p2),
        (TermF::FieldValue(f1, v1, r1), TermF::FieldValue(f2, v2, r2))
        | (TermF::FieldType(f1, v1, r1), TermF::FieldType(f2, v2, r2)) => {
            rec(f1, f2) && rec(v1, v2) && rec(r1, r2)
        }
        (TermF::RecordSelector(r1, f1), TermF::RecordSelector(r2, f2)) => {
            rec(r1, r2) && rec(f1, f2)
        }
        (TermF::ArrayValue(ty1, es1), TermF::ArrayValue(ty2, es2)) => {
            rec(ty1, ty2) && rec_all(es1, es2)
        }
        (TermF::ExtCns(e1), TermF::ExtCns(e2)) => e1.var_index == e2.var_index,
        (TermF::CtorApp(c1, p1, x1), TermF::CtorApp(c2, p2, x2)) => {
            c1 == c2 && rec_all(p1, p2) && rec_all(x1, x2)
        }
        (TermF::DataTypeApp(d1, p1, x1), TermF::DataTypeApp(d2, p2, x2)) => {
            d1 == d2 && rec_all(p1, p2) && rec_all(x1, x2)
        }
        // A literal meets a stuck constructor spine: peel one layer.
        (TermF::NatLit(n), TermF::CtorApp(c, _, _))
            if c == &env.prelude().zero || c == &env.prelude().succ =>
        {
            rec(&nat_unfold(factory, env, n), &b)
        }
        (TermF::CtorApp(c, _, _), TermF::NatLit(n))
            if c == &env.prelude().zero || c == &env.prelude().succ =>
        {
            rec(&a, &nat_unfold(factory, env, n))
        }
        (
            TermF::RecursorApp {
                data: d1,
                params: p1,
                motive: m1,
                cases: c1,
                indices: i1,
                scrutinee: s1,
            },
            TermF::RecursorApp {
                data: d2,
                params: p2,
                motive: m2,
                cases: c2,
                indices: i2,
                scrutinee: s2,
            },
        ) => {
            d1 == d2
                && rec_all(p1, p2)
                && rec(m1, m2)
                && c1.len() == c2.len()
                && c1.iter().zip(c2).all(|((n1, v1), (n2, v2))| n1 == n2 && rec(v1, v2))
                && rec_all(i1, i2)
                && rec(s1, s2)
        }
        _ => false,
    }
}

/// One constructor layer of a natural-number literal.
fn nat_unfold(factory: &TermFactory, env: &ModuleEnv, n: &num_bigint::BigUint) -> Term {
    use num_traits::Zero;
    let ids = env.prelude();
    if n.is_zero() {
        factory.ctor_app(ids.zero.clone(), vec![], vec![])
    } else {
        factory.ctor_app(ids.succ.clone(), vec![], vec![factory.nat_lit(n - 1u32)])
    }
}

// ============================================================================
// The checker
// ============================================================================

/// The inference engine. Holds the factory and environment for the duration
/// of one inference; the context and memo table thread through `with_var`.
pub struct TypeChecker<'a> {
    factory: &'a TermFactory,
    env: &'a ModuleEnv,
    module: Option<ModuleName>,
    /// Innermost binding last; `LocalVar(0)` is the last entry.
    ctx: Vec<(String, Term)>,
    memo: FxHashMap<TermIndex, Term>,
    config: TcConfig,
}

impl<'a> TypeChecker<'a> {
    pub fn new(factory: &'a TermFactory, env: &'a ModuleEnv, module: Option<ModuleName>) -> Self {
        TypeChecker {
            factory,
            env,
            module,
            ctx: Vec::new(),
            memo: FxHashMap::default(),
            config: TcConfig::default(),
        }
    }

    pub fn with_config(
        factory: &'a TermFactory,
        env: &'a ModuleEnv,
        module: Option<ModuleName>,
        config: TcConfig,
    ) -> Self {
        TypeChecker {
            factory,
            env,
            module,
            ctx: Vec::new(),
            memo: FxHashMap::default(),
            config,
        }
    }

    pub fn factory(&self) -> &'a TermFactory {
        self.factory
    }

    pub fn env(&self) -> &'a ModuleEnv {
        self.env
    }

    pub fn module_name(&self) -> Option<&ModuleName> {
        self.module.as_ref()
    }

    /// The current typing context, innermost binding last.
    pub fn ctx(&self) -> &[(String, Term)] {
        &self.ctx
    }

    /// The engine's reducer: literal conversions (when configured), then
    /// WHNF.
    pub fn tc_whnf(&self, t: &Term) -> Term {
        if self.config.nat_conversions {
            reduce::tc_whnf(self.factory, self.env, t)
        } else {
            reduce::whnf(self.factory, self.env, t)
        }
    }

    pub fn are_convertible(&self, t1: &Term, t2: &Term) -> bool {
        conv(self.factory, self.env, self.config.nat_conversions, t1, t2)
    }

    // ------------------------------------------------------------------
    // Scoping combinators
    // ------------------------------------------------------------------

    /// Run `body` with `(name, ty)` prepended to the context. `ty` must be
    /// in WHNF. The memo table is saved, cleared for the extended scope,
    /// and restored on exit; escaping errors gain an `ErrorCtx` frame.
    pub fn with_var<R>(
        &mut self,
        name: &str,
        ty: Term,
        body: impl FnOnce(&mut Self) -> Result<R, TcError>,
    ) -> Result<R, TcError> {
        self.ctx.push((name.to_string(), ty));
        let saved = std::mem::take(&mut self.memo);
        let result = body(self);
        self.memo = saved;
        let (var_name, var_ty) = self.ctx.pop().expect("context push/pop discipline");
        result.map_err(|e| TcError::ErrorCtx {
            var_name,
            var_ty: Box::new(var_ty),
            inner: Box::new(e),
        })
    }

    /// Run `body` under a whole list of bindings, outermost first.
    pub fn with_ctx<R>(
        &mut self,
        vars: &[(String, Term)],
        body: impl FnOnce(&mut Self) -> Result<R, TcError>,
    ) -> Result<R, TcError> {
        for (name, ty) in vars {
            self.ctx.push((name.clone(), ty.clone()));
        }
        let saved = std::mem::take(&mut self.memo);
        let mut result = body(self);
        self.memo = saved;
        for _ in 0..vars.len() {
            let (var_name, var_ty) = self.ctx.pop().expect("context push/pop discipline");
            result = result.map_err(|e| TcError::ErrorCtx {
                var_name,
                var_ty: Box::new(var_ty),
                inner: Box::new(e),
            });
        }
        result
    }

    /// Attach `pos` to any escaping error that does not already carry a
    /// position.
    pub fn at_pos<R>(
        &mut self,
        pos: &Pos,
        body: impl FnOnce(&mut Self) -> Result<R, TcError>,
    ) -> Result<R, TcError> {
        body(self).map_err(|e| {
            if e.has_position() {
                e
            } else {
                TcError::ErrorPos(pos.clone(), Box::new(e))
            }
        })
    }

    // ------------------------------------------------------------------
    // Inference
    // ------------------------------------------------------------------

    /// Infer the type of `t` in the current context, in WHNF.
    pub fn infer(&mut self, t: &Term) -> Result<Term, TcError> {
        if let Some(ix) = t.index() {
            if let Some(ty) = self.memo.get(&ix) {
                return Ok(ty.clone());
            }
        }
        let ty = stacker::maybe_grow(MIN_STACK_RED_ZONE, STACK_GROWTH_SIZE, || {
            self.infer_term_f(t)
        })?;
        let ty = self.tc_whnf(&ty);
        if let Some(ix) = t.index() {
            self.memo.insert(ix, ty.clone());
        }
        Ok(ty)
    }

    /// Infer and pair a term with its type.
    fn typed(&mut self, t: &Term) -> Result<TypedTerm, TcError> {
        Ok(TypedTerm {
            value: t.clone(),
            ty: self.infer(t)?,
        })
    }

    fn infer_term_f(&mut self, t: &Term) -> Result<Term, TcError> {
        let f = self.factory;
        match t.term_f() {
            TermF::LocalVar(i) => {
                let i = *i;
                if i < self.ctx.len() {
                    let ty = self.ctx[self.ctx.len() - 1 - i].1.clone();
                    // Context types are recorded just outside their own
                    // binder; lift into the present scope.
                    Ok(inc_vars(f, 0, i + 1, &ty))
                } else {
                    Err(TcError::DanglingVar(i))
                }
            }
            TermF::Global(id) => match self.env.type_of_global(id) {
                Some(ty) => Ok(self.tc_whnf(&ty.clone())),
                None => Err(TcError::UnboundName(id.clone())),
            },
            TermF::App(g, x) => {
                let g_ty = self.infer(g)?;
                let g_ty_w = self.tc_whnf(&g_ty);
                let (arg_ty, ret_ty) = match g_ty_w.term_f() {
                    TermF::Pi(_, a, r) => (a.clone(), r.clone()),
                    _ => return Err(TcError::NotFuncType(Box::new(g_ty_w))),
                };
                let x_ty = self.infer(x)?;
                self.check_subtype(&x_ty, &arg_ty)?;
                let ret = instantiate_var_list(f, 0, std::slice::from_ref(x), &ret_ty);
                Ok(self.tc_whnf(&ret))
            }
            TermF::Lambda(name, a, body) => {
                let a_ty = self.infer(a)?;
                self.ensure_sort(&a_ty)?;
                let aw = self.tc_whnf(a);
                let name = name.clone();
                let body = body.clone();
                let b_ty = self.with_var(&name, aw.clone(), |tc| tc.infer(&body))?;
                Ok(f.pi(name, aw, b_ty))
            }
            TermF::Pi(name, a, b) => {
                let a_ty = self.infer(a)?;
                let s1 = self.ensure_sort(&a_ty)?;
                let aw = self.tc_whnf(a);
                let b = b.clone();
                let s2 = self.with_var(name, aw, |tc| {
                    let b_ty = tc.infer(&b)?;
                    tc.ensure_sort(&b_ty)
                })?;
                // Impredicative in the codomain only.
                let s = if s2.is_prop() { s2 } else { s1.max(s2) };
                Ok(f.sort(s))
            }
            TermF::Let(defs, body) => {
                // The engine only sees fully-elaborated terms; reduce the
                // group away and check the reduct. A genuinely recursive
                // group has no such reading.
                let rhss: Option<Vec<Term>> = defs
                    .iter()
                    .map(|d| crate::subst::dec_vars(f, defs.len(), &d.rhs))
                    .collect();
                match rhss {
                    Some(rhss) => {
                        let reduced = instantiate_var_list(f, 0, &rhss, body);
                        self.infer(&reduced)
                    }
                    None => Err(TcError::DeclError(DeclError {
                        name: Ident::parse(&defs[0].name),
                        reason: "recursive let groups cannot be type-checked".into(),
                    })),
                }
            }
            TermF::Constant(name, defn, decl_ty) => {
                // Inferring the declared type's sort verifies it is a
                // well-formed type.
                let decl_ty_ty = self.infer(decl_ty)?;
                self.ensure_sort(&decl_ty_ty)?;
                let declared = self.tc_whnf(decl_ty);
                let inferred = self.infer(defn)?;
                if !self.is_subtype(&inferred, &declared) {
                    return Err(TcError::BadConstType {
                        name: name.clone(),
                        inferred: Box::new(inferred),
                        declared: Box::new(declared),
                    });
                }
                Ok(declared)
            }
            TermF::Sort(s) => Ok(f.sort(s.sort_of())),
            TermF::NatLit(_) => Ok(self.env.nat_type(f)),
            TermF::StringLit(_) => Ok(self.env.string_type(f)),
            TermF::ArrayValue(elem_ty, elems) => {
                let et_ty = self.infer(elem_ty)?;
                self.ensure_sort(&et_ty)?;
                let ew = self.tc_whnf(elem_ty);
                for e in elems {
                    let e_ty = self.infer(e)?;
                    self.check_subtype(&e_ty, &ew)?;
                }
                let len = f.nat_lit(elems.len() as u64);
                Ok(self.env.vec_type(f, len, ew))
            }
            TermF::ExtCns(ec) => Ok(self.tc_whnf(&ec.ty.clone())),
            TermF::UnitValue => Ok(f.unit_type()),
            TermF::UnitType => Ok(f.sort(Sort::new(0))),
            TermF::PairValue(a, b) => {
                let a_ty = self.infer(a)?;
                let b_ty = self.infer(b)?;
                Ok(f.pair_type(a_ty, b_ty))
            }
            TermF::PairType(a, b) => {
                let sa = {
                    let a_ty = self.infer(a)?;
                    self.ensure_sort(&a_ty)?
                };
                let sb = {
                    let b_ty = self.infer(b)?;
                    self.ensure_sort(&b_ty)?
                };
                Ok(f.sort(sa.max(sb)))
            }
            TermF::PairLeft(p) => {
                let p_ty = self.infer(p)?;
                match p_ty.term_f() {
                    TermF::PairType(a, _) => Ok(self.tc_whnf(&a.clone())),
                    _ => Err(TcError::NotTupleType(Box::new(p_ty))),
                }
            }
            TermF::PairRight(p) => {
                let p_ty = self.infer(p)?;
                match p_ty.term_f() {
                    TermF::PairType(_, b) => Ok(self.tc_whnf(&b.clone())),
                    _ => Err(TcError::NotTupleType(Box::new(p_ty))),
                }
            }
            TermF::FieldValue(fld, val, rest) => {
                let fld_lit = self.ensure_string_field(fld)?;
                let val_ty = self.infer(val)?;
                let rest_ty = self.infer(rest)?;
                match rest_ty.term_f() {
                    TermF::FieldType(_, _, _) | TermF::UnitType => {}
                    _ => return Err(TcError::NotRecordType(Box::new(rest_ty))),
                }
                Ok(f.field_type(fld_lit, val_ty, rest_ty))
            }
            TermF::FieldType(fld, ty, rest) => {
                self.ensure_string_field(fld)?;
                let s1 = {
                    let t1 = self.infer(ty)?;
                    self.ensure_sort(&t1)?
                };
                let rest_w = self.tc_whnf(rest);
                match rest_w.term_f() {
                    TermF::FieldType(_, _, _) | TermF::UnitType => {}
                    _ => return Err(TcError::NotRecordType(Box::new(rest_w))),
                }
                let s2 = {
                    let t2 = self.infer(rest)?;
                    self.ensure_sort(&t2)?
                };
                Ok(f.sort(s1.max(s2)))
            }
            TermF::RecordSelector(r, fld) => {
                let fld_lit = self.ensure_string_field(fld)?;
                let want = match fld_lit.term_f() {
                    TermF::StringLit(s) => s.clone(),
                    _ => unreachable!("ensure_string_field returns a literal"),
                };
                let r_ty = self.infer(r)?;
                let mut cur = r_ty.clone();
                loop {
                    let next = match cur.term_f() {
                        TermF::FieldType(f2, ty, rest) => {
                            match self.tc_whnf(f2).term_f() {
                                TermF::StringLit(have) if have == &want => {
                                    return Ok(self.tc_whnf(&ty.clone()));
                                }
                                _ => self.tc_whnf(rest),
                            }
                        }
                        TermF::UnitType => {
                            return Err(TcError::BadRecordField {
                                field: want,
                                record_ty: Box::new(r_ty),
                            });
                        }
                        _ => return Err(TcError::NotRecordType(Box::new(r_ty))),
                    };
                    cur = next;
                }
            }
            TermF::CtorApp(c, params, args) => {
                let cv = match self.env.find_ctor(c) {
                    Some(cv) => cv,
                    None => return Err(TcError::NoSuchCtor(c.clone())),
                };
                if params.len() != cv.num_params || args.len() != cv.num_args {
                    return Err(TcError::BadParamsOrArgsLength {
                        is_data_type: false,
                        id: c.clone(),
                        params: params.len(),
                        args: args.len(),
                    });
                }
                let mut ty = self.tc_whnf(&cv.ty.clone());
                for x in params.iter().chain(args) {
                    let arg = self.typed(x)?;
                    ty = self.apply_pi_typed(ty, &arg)?;
                }
                Ok(ty)
            }
            TermF::DataTypeApp(d, params, indices) => {
                let dt = match self.env.find_data_type(d) {
                    Some(dt) => dt,
                    None => return Err(TcError::NoSuchDataType(d.clone())),
                };
                if params.len() != dt.params.len() || indices.len() != dt.indices.len() {
                    return Err(TcError::BadParamsOrArgsLength {
                        is_data_type: true,
                        id: d.clone(),
                        params: params.len(),
                        args: indices.len(),
                    });
                }
                let mut ty = self.tc_whnf(&dt.ty.clone());
                for x in params.iter().chain(indices) {
                    let arg = self.typed(x)?;
                    ty = self.apply_pi_typed(ty, &arg)?;
                }
                Ok(ty)
            }
            TermF::RecursorApp { .. } => self.infer_recursor(t),
        }
    }

    /// Recursor applications: check parameters, motive shape and sort,
    /// elimination discipline, the case set and each case type, and the
    /// scrutinee; the result is the motive at the indices and scrutinee.
    fn infer_recursor(&mut self, t: &Term) -> Result<Term, TcError> {
        let f = self.factory;
        let TermF::RecursorApp {
            data,
            params,
            motive,
            cases,
            indices,
            scrutinee,
        } = t.term_f()
        else {
            unreachable!("caller matched RecursorApp");
        };
        let malformed =
            |reason: String| TcError::MalformedRecursor(Box::new(t.clone()), reason);

        let dt: &DataTypeVal = match self.env.find_data_type(data) {
            Some(dt) => dt,
            None => return Err(TcError::NoSuchDataType(data.clone())),
        };
        if params.len() != dt.params.len() || indices.len() != dt.indices.len() {
            return Err(malformed(format!(
                "expected {} parameters and {} indices, got {} and {}",
                dt.params.len(),
                dt.indices.len(),
                params.len(),
                indices.len()
            )));
        }

        // The parameters and indices must type-check against the datatype
        // signature; the fully-applied signature is a sort.
        let mut dty = self.tc_whnf(&dt.ty.clone());
        for x in params.iter().chain(indices) {
            let arg = self.typed(x)?;
            dty = self.apply_pi_typed(dty, &arg)?;
        }
        self.ensure_sort(&dty)?;

        // The motive must be a function into a sort, of the shape dictated
        // by the datatype signature.
        let motive_ty = self.infer(motive)?;
        let mut ret = motive_ty.clone();
        let s_ret = loop {
            match ret.term_f() {
                TermF::Pi(_, _, body) => ret = self.tc_whnf(&body.clone()),
                TermF::Sort(s) => break *s,
                _ => return Err(malformed("Motive function should return a sort".into())),
            }
        };
        let motive_req = self.env.recursor_ret_type_type(f, dt, params, s_ret);
        if !self.is_subtype(&motive_ty, &motive_req) {
            return Err(malformed(format!(
                "motive should have type {motive_req}, found {motive_ty}"
            )));
        }

        if !dt.allowed_elim_sort(s_ret) {
            return Err(malformed("Disallowed propositional elimination".into()));
        }

        // The case set must name exactly the datatype's constructors.
        let extra: Vec<String> = cases
            .keys()
            .filter(|c| !dt.ctors.contains(c))
            .map(|c| c.to_string())
            .collect();
        if !extra.is_empty() {
            return Err(malformed(format!(
                "Extra constructors: {}",
                extra.join(", ")
            )));
        }
        for ctor_id in &dt.ctors {
            if !cases.contains_key(ctor_id) {
                return Err(malformed(format!("Missing constructor: {ctor_id}")));
            }
            let cv = match self.env.find_ctor(ctor_id) {
                Some(cv) => cv,
                None => return Err(TcError::NoSuchCtor(ctor_id.clone())),
            };
            let required = self
                .env
                .recursor_elim_type(f, dt, cv, params, motive)
                .map_err(|reason| malformed(reason))?;
            let required = self.tc_whnf(&required);
            let case_ty = self.infer(&cases[ctor_id])?;
            self.check_subtype(&case_ty, &required)?;
        }

        // The scrutinee inhabits the fully-applied datatype.
        let scrut_ty = self.infer(scrutinee)?;
        let want = f.data_type_app(data.clone(), params.clone(), indices.clone());
        self.check_subtype(&scrut_ty, &want)?;

        let result = f.apply_all(
            motive.clone(),
            indices.iter().cloned().chain([scrutinee.clone()]),
        );
        Ok(self.tc_whnf(&result))
    }

    // ------------------------------------------------------------------
    // Utilities (also exported for engine extensions)
    // ------------------------------------------------------------------

    /// Require a type to be a sort, after WHNF.
    pub fn ensure_sort(&mut self, ty: &Term) -> Result<Sort, TcError> {
        let w = self.tc_whnf(ty);
        match w.term_f() {
            TermF::Sort(s) => Ok(*s),
            _ => Err(TcError::NotSort(Box::new(w))),
        }
    }

    /// Require a record field position to reduce to a string literal;
    /// returns the literal term.
    fn ensure_string_field(&mut self, fld: &Term) -> Result<Term, TcError> {
        let w = self.tc_whnf(fld);
        match w.term_f() {
            TermF::StringLit(_) => Ok(w),
            _ => Err(TcError::NotStringLit(Box::new(w))),
        }
    }

    /// Subtyping: universe cumulativity in `Sort` positions, covariant Pi
    /// codomains over convertible domains, definitional equality elsewhere.
    /// Both sides are expected to be types in WHNF.
    pub fn is_subtype(&self, a: &Term, b: &Term) -> bool {
        match (a.term_f(), b.term_f()) {
            (TermF::Pi(_, a1, b1), TermF::Pi(_, a2, b2)) => {
                self.are_convertible(a1, a2)
                    && self.is_subtype(&self.tc_whnf(b1), &self.tc_whnf(b2))
            }
            (TermF::Sort(s1), TermF::Sort(s2)) => s1 <= s2,
            _ => self.are_convertible(a, b),
        }
    }

    /// `is_subtype` as a check, failing with `SubtypeFailure`.
    pub fn check_subtype(&self, found: &Term, expected: &Term) -> Result<(), TcError> {
        if self.is_subtype(found, expected) {
            Ok(())
        } else {
            Err(TcError::SubtypeFailure {
                found: Box::new(found.clone()),
                expected: Box::new(expected.clone()),
            })
        }
    }

    /// Dependent application at the type level: `fun_ty` must WHNF to a Pi,
    /// the argument must fit its domain, and the result is the codomain
    /// instantiated at the argument, in WHNF.
    pub fn apply_pi_typed(&mut self, fun_ty: Term, arg: &TypedTerm) -> Result<Term, TcError> {
        let w = self.tc_whnf(&fun_ty);
        let (arg_ty, ret_ty) = match w.term_f() {
            TermF::Pi(_, a, r) => (a.clone(), r.clone()),
            _ => return Err(TcError::NotFuncType(Box::new(w))),
        };
        self.check_subtype(&arg.ty, &arg_ty)?;
        let ret = instantiate_var_list(self.factory, 0, std::slice::from_ref(&arg.value), &ret_ty);
        Ok(self.tc_whnf(&ret))
    }

    /// Process a binding list left-to-right: infer each type, ensure it is
    /// a sort, and extend the context with its WHNF before the next. The
    /// context and memo table are restored afterwards.
    pub fn type_infer_ctx(
        &mut self,
        vars: &[(String, Term)],
    ) -> Result<Vec<(String, Term, Sort)>, TcError> {
        let saved_memo = std::mem::take(&mut self.memo);
        let saved_len = self.ctx.len();
        let result = self.type_infer_ctx_inner(vars);
        self.ctx.truncate(saved_len);
        self.memo = saved_memo;
        result
    }

    fn type_infer_ctx_inner(
        &mut self,
        vars: &[(String, Term)],
    ) -> Result<Vec<(String, Term, Sort)>, TcError> {
        let mut out = Vec::with_capacity(vars.len());
        for (name, a) in vars {
            let a_ty = self.infer(a)?;
            let s = self.ensure_sort(&a_ty)?;
            let aw = self.tc_whnf(a);
            out.push((name.clone(), aw.clone(), s));
            self.ctx.push((name.clone(), aw));
            self.memo.clear();
        }
        Ok(out)
    }
}

// ============================================================================
// Entry points
// ============================================================================

/// Type-check a term in the empty context. On success the returned type is
/// in WHNF and itself type-checks to a sort.
pub fn type_check(
    factory: &TermFactory,
    env: &ModuleEnv,
    module: Option<ModuleName>,
    t: &Term,
) -> Result<Term, TcError> {
    debug!(module = ?module, "type checking term");
    TypeChecker::new(factory, env, module).infer(t)
}

/// Type-check a term under a context, given outermost binding first. Every
/// context type must be in WHNF and well-typed in its own prefix.
pub fn type_check_in_ctx(
    factory: &TermFactory,
    env: &ModuleEnv,
    module: Option<ModuleName>,
    ctx: &[(String, Term)],
    t: &Term,
) -> Result<Term, TcError> {
    debug!(module = ?module, ctx_len = ctx.len(), "type checking term in context");
    let mut tc = TypeChecker::new(factory, env, module);
    tc.with_ctx(ctx, |tc| tc.infer(t))
}

#[cfg(test)]
mod tests;
