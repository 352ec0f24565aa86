//! Module environment
//!
//! Global declarations live here: datatypes, their constructors, and plain
//! definitions, all addressed by qualified name. The environment also owns
//! the schematic Pi types the recursor checker needs — the required motive
//! type and the required case type per constructor — and the constructor
//! argument analysis shared between case-type construction and iota
//! reduction.
//!
//! The environment is read-only during inference; declaration happens up
//! front. A fresh environment can be seeded with the built-in prelude
//! (`Nat`, `String`, `Vec`, `addNat`, `mulNat`) so the checker and the
//! literal simpset are usable out of the box.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::name::{Ident, ModuleName};
use crate::sort::Sort;
use crate::subst::{inc_vars, instantiate_var_list, instantiate_vars};
use crate::term::{Term, TermF, TermFactory};

/// A declaration was rejected before it reached the environment.
#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid declaration of {name}: {reason}")]
pub struct DeclError {
    pub name: Ident,
    pub reason: String,
}

impl DeclError {
    fn new(name: &Ident, reason: impl Into<String>) -> Self {
        DeclError {
            name: name.clone(),
            reason: reason.into(),
        }
    }
}

/// An inductive datatype registered in the environment.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataTypeVal {
    pub name: Ident,
    /// Fully-quantified type: `∀params. ∀indices. sort s`. Closed.
    pub ty: Term,
    /// Parameter telescope (names and types, each under the previous).
    pub params: Vec<(String, Term)>,
    /// Index telescope, under the parameters.
    pub indices: Vec<(String, Term)>,
    /// The sort the fully-applied datatype inhabits.
    pub sort: Sort,
    /// Constructor names, in declaration order.
    pub ctors: Vec<Ident>,
    /// Primitive datatypes have no constructors and no recursor rules.
    pub is_primitive: bool,
    /// Empty or subsingleton; gates elimination into `PROP`.
    pub is_subsingleton: bool,
}

impl DataTypeVal {
    /// Elimination-sort discipline: a multi-constructor datatype in `PROP`
    /// supports elimination only into `PROP`; small (empty or subsingleton)
    /// `PROP` datatypes and all predicative datatypes eliminate anywhere.
    pub fn allowed_elim_sort(&self, s: Sort) -> bool {
        if self.sort.is_prop() && !self.is_subsingleton {
            s.is_prop()
        } else {
            true
        }
    }
}

/// A constructor registered in the environment.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CtorVal {
    pub name: Ident,
    pub data_type: Ident,
    /// Closed type `∀params. ∀args. DataTypeApp(d, params, indices)`.
    pub ty: Term,
    pub num_params: usize,
    pub num_args: usize,
}

/// A global definition. Primitives carry no body and never delta-reduce.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DefVal {
    pub name: Ident,
    pub ty: Term,
    pub body: Option<Term>,
}

/// Qualified names of the built-in prelude entities.
#[derive(Clone, Debug)]
pub struct PreludeIds {
    pub nat: Ident,
    pub zero: Ident,
    pub succ: Ident,
    pub string: Ident,
    pub vec: Ident,
    pub add_nat: Ident,
    pub mul_nat: Ident,
}

impl PreludeIds {
    fn new() -> Self {
        PreludeIds {
            nat: Ident::parse("Prelude.Nat"),
            zero: Ident::parse("Prelude.Zero"),
            succ: Ident::parse("Prelude.Succ"),
            string: Ident::parse("Prelude.String"),
            vec: Ident::parse("Prelude.Vec"),
            add_nat: Ident::parse("Prelude.addNat"),
            mul_nat: Ident::parse("Prelude.mulNat"),
        }
    }
}

/// The module environment.
pub struct ModuleEnv {
    datatypes: FxHashMap<Ident, DataTypeVal>,
    ctors: FxHashMap<Ident, CtorVal>,
    defs: FxHashMap<Ident, DefVal>,
    prelude: PreludeIds,
}

impl Default for ModuleEnv {
    fn default() -> Self {
        ModuleEnv::new()
    }
}

/// Split a Pi telescope: the first `n` binders (name, type) and the rest of
/// the term. Declaration types are kept in normal form, so this is purely
/// structural.
fn pi_telescope(t: &Term, n: usize) -> Option<(Vec<(String, Term)>, Term)> {
    let mut binders = Vec::with_capacity(n);
    let mut cur = t.clone();
    for _ in 0..n {
        match cur.term_f() {
            TermF::Pi(name, ty, body) => {
                binders.push((name.clone(), ty.clone()));
                cur = body.clone();
            }
            _ => return None,
        }
    }
    Some((binders, cur))
}

/// Count the Pi binders at the head of a term.
fn count_pis(t: &Term) -> usize {
    let mut n = 0;
    let mut cur = t.clone();
    while let TermF::Pi(_, _, body) = cur.term_f() {
        n += 1;
        cur = body.clone();
    }
    n
}

impl ModuleEnv {
    /// An empty environment.
    pub fn new() -> Self {
        ModuleEnv {
            datatypes: FxHashMap::default(),
            ctors: FxHashMap::default(),
            defs: FxHashMap::default(),
            prelude: PreludeIds::new(),
        }
    }

    /// An environment seeded with the built-in prelude.
    pub fn with_prelude(factory: &TermFactory) -> Self {
        let mut env = ModuleEnv::new();
        env.install_prelude(factory)
            .expect("prelude declarations are well-formed");
        env
    }

    pub fn prelude(&self) -> &PreludeIds {
        &self.prelude
    }

    pub fn prelude_module(&self) -> ModuleName {
        ModuleName::new("Prelude")
    }

    // ------------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------------

    pub fn find_data_type(&self, id: &Ident) -> Option<&DataTypeVal> {
        self.datatypes.get(id)
    }

    pub fn find_ctor(&self, id: &Ident) -> Option<&CtorVal> {
        self.ctors.get(id)
    }

    pub fn find_def(&self, id: &Ident) -> Option<&DefVal> {
        self.defs.get(id)
    }

    pub fn type_of_global(&self, id: &Ident) -> Option<&Term> {
        self.defs.get(id).map(|d| &d.ty)
    }

    /// The type of natural-number literals.
    pub fn nat_type(&self, factory: &TermFactory) -> Term {
        factory.data_type_app(self.prelude.nat.clone(), vec![], vec![])
    }

    /// The type of string literals.
    pub fn string_type(&self, factory: &TermFactory) -> Term {
        factory.data_type_app(self.prelude.string.clone(), vec![], vec![])
    }

    /// `Vec len elem`, the type of array literals.
    pub fn vec_type(&self, factory: &TermFactory, len: Term, elem: Term) -> Term {
        factory.data_type_app(self.prelude.vec.clone(), vec![len, elem], vec![])
    }

    // ------------------------------------------------------------------
    // Declaration
    // ------------------------------------------------------------------

    /// Register a global definition. `body: None` declares a primitive.
    pub fn declare_def(
        &mut self,
        name: Ident,
        ty: Term,
        body: Option<Term>,
    ) -> Result<(), DeclError> {
        if self.defs.contains_key(&name) {
            return Err(DeclError::new(&name, "already declared"));
        }
        if !ty.is_closed() {
            return Err(DeclError::new(&name, "declared type is not closed"));
        }
        if let Some(b) = &body {
            if !b.is_closed() {
                return Err(DeclError::new(&name, "definition body is not closed"));
            }
        }
        debug!(name = %name, primitive = body.is_none(), "declaring definition");
        self.defs.insert(name.clone(), DefVal { name, ty, body });
        Ok(())
    }

    /// Register a datatype with its constructors. The type must be a closed
    /// Pi telescope of `num_params + num_indices` binders ending in a sort;
    /// each constructor type must be closed and return the datatype.
    /// Positivity is assumed checked upstream.
    pub fn declare_data_type(
        &mut self,
        name: Ident,
        ty: Term,
        num_params: usize,
        num_indices: usize,
        is_primitive: bool,
        ctors: Vec<(Ident, Term)>,
    ) -> Result<(), DeclError> {
        if self.datatypes.contains_key(&name) {
            return Err(DeclError::new(&name, "already declared"));
        }
        if !ty.is_closed() {
            return Err(DeclError::new(&name, "datatype signature is not closed"));
        }
        let Some((binders, rest)) = pi_telescope(&ty, num_params + num_indices) else {
            return Err(DeclError::new(
                &name,
                "signature has fewer binders than the declared arities",
            ));
        };
        let TermF::Sort(sort) = rest.term_f() else {
            return Err(DeclError::new(&name, "signature does not end in a sort"));
        };
        let sort = *sort;
        let params = binders[..num_params].to_vec();
        let indices = binders[num_params..].to_vec();

        let mut ctor_vals = Vec::with_capacity(ctors.len());
        let mut ctor_names = Vec::with_capacity(ctors.len());
        for (cname, cty) in &ctors {
            if self.ctors.contains_key(cname) || ctor_names.contains(cname) {
                return Err(DeclError::new(cname, "already declared"));
            }
            if !cty.is_closed() {
                return Err(DeclError::new(cname, "constructor type is not closed"));
            }
            let total = count_pis(cty);
            if total < num_params {
                return Err(DeclError::new(
                    cname,
                    "constructor takes fewer binders than the datatype has parameters",
                ));
            }
            let (_, ret) = pi_telescope(cty, total).expect("telescope length just counted");
            match ret.term_f() {
                TermF::DataTypeApp(d, _, _) if d == &name => {}
                _ => {
                    return Err(DeclError::new(
                        cname,
                        format!("constructor does not return {name}"),
                    ));
                }
            }
            ctor_names.push(cname.clone());
            ctor_vals.push(CtorVal {
                name: cname.clone(),
                data_type: name.clone(),
                ty: cty.clone(),
                num_params,
                num_args: total - num_params,
            });
        }

        debug!(name = %name, ctors = ctor_names.len(), "declaring datatype");
        self.datatypes.insert(
            name.clone(),
            DataTypeVal {
                name: name.clone(),
                ty,
                params,
                indices,
                sort,
                ctors: ctor_names,
                is_primitive,
                is_subsingleton: ctors.len() <= 1,
            },
        );
        for cv in ctor_vals {
            self.ctors.insert(cv.name.clone(), cv);
        }
        Ok(())
    }

    fn install_prelude(&mut self, f: &TermFactory) -> Result<(), DeclError> {
        let ids = self.prelude.clone();
        let sort0 = f.sort(Sort::new(0));
        let nat = f.data_type_app(ids.nat.clone(), vec![], vec![]);

        // Nat : sort 0, with Zero and Succ.
        self.declare_data_type(
            ids.nat.clone(),
            sort0.clone(),
            0,
            0,
            false,
            vec![
                (ids.zero.clone(), nat.clone()),
                (ids.succ.clone(), f.pi("n", nat.clone(), nat.clone())),
            ],
        )?;

        // String : sort 0, primitive.
        self.declare_data_type(ids.string.clone(), sort0.clone(), 0, 0, true, vec![])?;

        // Vec : Nat -> sort 0 -> sort 0, primitive.
        let vec_ty = f.pi("n", nat.clone(), f.pi("a", sort0.clone(), sort0.clone()));
        self.declare_data_type(ids.vec.clone(), vec_ty, 2, 0, true, vec![])?;

        // Globals mirroring the type formers, so `Global(Prelude.Nat)` is a
        // usable spelling that delta-reduces to the datatype application.
        self.declare_def(ids.nat.clone(), sort0.clone(), Some(nat.clone()))?;
        self.declare_def(
            ids.string.clone(),
            sort0.clone(),
            Some(f.data_type_app(ids.string.clone(), vec![], vec![])),
        )?;
        self.declare_def(
            ids.vec.clone(),
            f.pi("n", nat.clone(), f.pi("a", sort0.clone(), sort0.clone())),
            Some(f.lambda(
                "n",
                nat.clone(),
                f.lambda(
                    "a",
                    sort0.clone(),
                    f.data_type_app(
                        ids.vec.clone(),
                        vec![f.local_var(1), f.local_var(0)],
                        vec![],
                    ),
                ),
            )),
        )?;

        // Literal-bearing arithmetic primitives; the simpset evaluates them
        // on literal arguments.
        let nat2 = f.arrow(nat.clone(), f.arrow(nat.clone(), nat.clone()));
        self.declare_def(ids.add_nat.clone(), nat2.clone(), None)?;
        self.declare_def(ids.mul_nat.clone(), nat2, None)?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Recursor schematics
    // ------------------------------------------------------------------

    /// The required motive type for eliminating `dt` applied to `params`
    /// into `s`: `∀indices. DataTypeApp(d, params, indices) -> sort s`.
    pub fn recursor_ret_type_type(
        &self,
        f: &TermFactory,
        dt: &DataTypeVal,
        params: &[Term],
        s: Sort,
    ) -> Term {
        let k = dt.indices.len();
        let rev_params: Vec<Term> = params.iter().rev().cloned().collect();
        // Index types are written under the parameter binders; instantiate
        // the parameters away, keeping earlier indices in scope.
        let ix_tys: Vec<(String, Term)> = dt
            .indices
            .iter()
            .enumerate()
            .map(|(i, (n, ty))| (n.clone(), instantiate_var_list(f, i, &rev_params, ty)))
            .collect();
        let lifted_params: Vec<Term> = params.iter().map(|p| inc_vars(f, 0, k, p)).collect();
        let ix_vars: Vec<Term> = (0..k).rev().map(|i| f.local_var(i)).collect();
        let dt_app = f.data_type_app(dt.name.clone(), lifted_params, ix_vars);
        let mut ty = f.pi("x", dt_app, f.sort(s));
        for (n, ixty) in ix_tys.into_iter().rev() {
            ty = f.pi(n, ixty, ty);
        }
        ty
    }

    /// Analyze a constructor's argument telescope relative to concrete
    /// parameters: which arguments are recursive occurrences (possibly under
    /// inner binders), and the datatype indices of the return type.
    pub fn analyze_ctor(
        &self,
        f: &TermFactory,
        ctor: &CtorVal,
        params: &[Term],
    ) -> Result<CtorShape, String> {
        let mut ty = ctor.ty.clone();
        for p in params {
            match ty.term_f() {
                TermF::Pi(_, _, body) => {
                    ty = instantiate_var_list(f, 0, std::slice::from_ref(p), body);
                }
                _ => {
                    return Err(format!(
                        "constructor {} takes fewer parameters than supplied",
                        ctor.name
                    ));
                }
            }
        }
        let mut args = Vec::with_capacity(ctor.num_args);
        for j in 0..ctor.num_args {
            match ty.term_f() {
                TermF::Pi(name, a, body) => {
                    let recursive = self.recursive_arg_spec(f, ctor, params, j, a);
                    args.push(CtorArg {
                        name: name.clone(),
                        ty: a.clone(),
                        recursive,
                    });
                    ty = body.clone();
                }
                _ => {
                    return Err(format!(
                        "constructor {} has a malformed argument telescope",
                        ctor.name
                    ));
                }
            }
        }
        match ty.term_f() {
            TermF::DataTypeApp(d, _, ixs) if d == &ctor.data_type => Ok(CtorShape {
                args,
                ret_indices: ixs.clone(),
            }),
            _ => Err(format!(
                "constructor {} does not return {}",
                ctor.name, ctor.data_type
            )),
        }
    }

    /// Is `a` (the type of argument `j`, under `j` argument binders) a
    /// recursive occurrence `∀zs. D params ixs`?
    fn recursive_arg_spec(
        &self,
        f: &TermFactory,
        ctor: &CtorVal,
        params: &[Term],
        j: usize,
        a: &Term,
    ) -> Option<RecArgSpec> {
        let mut binders = Vec::new();
        let mut cur = a.clone();
        while let TermF::Pi(n, d, b) = cur.term_f() {
            binders.push((n.clone(), d.clone()));
            cur = b.clone();
        }
        match cur.term_f() {
            TermF::DataTypeApp(d, ps, ixs) if d == &ctor.data_type => {
                let lift = j + binders.len();
                let expected: Vec<Term> =
                    params.iter().map(|p| inc_vars(f, 0, lift, p)).collect();
                if ps == &expected {
                    Some(RecArgSpec {
                        binders,
                        indices: ixs.clone(),
                    })
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    /// The required type of the `ctor` case of a recursor eliminating `dt`
    /// applied to `params` with `motive`. Each recursive argument is
    /// followed immediately by its induction hypothesis.
    pub fn recursor_elim_type(
        &self,
        f: &TermFactory,
        dt: &DataTypeVal,
        ctor: &CtorVal,
        params: &[Term],
        motive: &Term,
    ) -> Result<Term, String> {
        debug_assert_eq!(ctor.data_type, dt.name);
        let shape = self.analyze_ctor(f, ctor, params)?;
        // Emission-ordered output binders and, for each constructor
        // argument, its absolute position among them.
        let mut binders: Vec<(String, Term)> = Vec::new();
        let mut arg_pos: Vec<usize> = Vec::new();

        for (j, arg) in shape.args.iter().enumerate() {
            let depth = binders.len();
            let ty = reindex(f, &arg.ty, j, 0, depth, &arg_pos);
            binders.push((arg.name.clone(), ty));
            arg_pos.push(depth);

            if let Some(spec) = &arg.recursive {
                let depth = binders.len();
                let m = spec.binders.len();
                let z_tys: Vec<(String, Term)> = spec
                    .binders
                    .iter()
                    .enumerate()
                    .map(|(i, (n, ty))| (n.clone(), reindex(f, ty, j, i, depth, &arg_pos)))
                    .collect();
                let ixs: Vec<Term> = spec
                    .indices
                    .iter()
                    .map(|ix| reindex(f, ix, j, m, depth, &arg_pos))
                    .collect();
                // The argument itself sits right below the z binders.
                let z_vars: Vec<Term> = (0..m).rev().map(|i| f.local_var(i)).collect();
                let applied_arg = f.apply_all(f.local_var(m), z_vars);
                let motive_l = inc_vars(f, 0, depth + m, motive);
                let mut ih = f.apply_all(motive_l, ixs.into_iter().chain([applied_arg]));
                for (n, ty) in z_tys.into_iter().rev() {
                    ih = f.pi(n, ty, ih);
                }
                binders.push((format!("{}_ih", arg.name), ih));
            }
        }

        let df = binders.len();
        let num_args = shape.args.len();
        let motive_f = inc_vars(f, 0, df, motive);
        let ret_ixs: Vec<Term> = shape
            .ret_indices
            .iter()
            .map(|ix| reindex(f, ix, num_args, 0, df, &arg_pos))
            .collect();
        let lifted_params: Vec<Term> = params.iter().map(|p| inc_vars(f, 0, df, p)).collect();
        let arg_vars: Vec<Term> = arg_pos.iter().map(|p| f.local_var(df - 1 - p)).collect();
        let ctor_val = f.ctor_app(ctor.name.clone(), lifted_params, arg_vars);
        let mut ty = f.apply_all(motive_f, ret_ixs.into_iter().chain([ctor_val]));
        for (n, bty) in binders.into_iter().rev() {
            ty = f.pi(n, bty, ty);
        }
        Ok(ty)
    }
}

/// Renumber a term written under `j` constructor-argument binders (plus `zs`
/// inner binders) into the case-type telescope, where the arguments sit at
/// `arg_pos` among `depth` emitted binders and ambient variables shift by
/// the difference.
fn reindex(
    f: &TermFactory,
    t: &Term,
    j: usize,
    zs: usize,
    depth: usize,
    arg_pos: &[usize],
) -> Term {
    instantiate_vars(f, 0, t, &mut |fac, lvl, w| {
        let v = w - lvl;
        let nv = if v < zs {
            v
        } else if v < zs + j {
            let a = j - 1 - (v - zs);
            zs + (depth - 1 - arg_pos[a])
        } else {
            v + depth - j
        };
        fac.local_var(lvl + nv)
    })
}

/// Spec of a recursive constructor argument `∀zs. D params ixs`.
#[derive(Clone, Debug)]
pub struct RecArgSpec {
    pub binders: Vec<(String, Term)>,
    pub indices: Vec<Term>,
}

/// One analyzed constructor argument.
#[derive(Clone, Debug)]
pub struct CtorArg {
    pub name: String,
    pub ty: Term,
    pub recursive: Option<RecArgSpec>,
}

/// Full analyzed constructor telescope, relative to concrete parameters.
#[derive(Clone, Debug)]
pub struct CtorShape {
    pub args: Vec<CtorArg>,
    pub ret_indices: Vec<Term>,
}
