//! Shared terms
//!
//! The term universe of the kernel. Terms are trees of flat constructors
//! (`TermF`) whose children are again terms, in one of two physical forms:
//!
//! - *Shared*: an interned node carrying a unique integer index, a cached
//!   structural hash, and a cached free-variable bitset. Two shared nodes
//!   built by the same factory are structurally equal iff their indices are
//!   equal, so equality and memoization are O(1).
//! - *Unshared*: a raw constructor application, used for terms that arrive
//!   from outside the factory (e.g. deserialized fixtures). Equality falls
//!   back to structural comparison.
//!
//! All binder references are de Bruijn indices counting binders outward.

use num_bigint::BigUint;
use rustc_hash::{FxHashMap, FxHasher};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex};

use crate::name::Ident;
use crate::sort::Sort;

/// Unique identity of a shared node within its factory.
pub type TermIndex = u64;

/// De Bruijn index of a bound variable.
pub type DeBruijnIndex = usize;

/// Identity of an external constant.
pub type VarIndex = u64;

// ============================================================================
// Free-variable bitsets
// ============================================================================

/// Set of free de Bruijn indices: bit `i` is set iff `LocalVar(i)` occurs
/// free in the term.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VarSet {
    bits: bitvec::vec::BitVec,
}

impl VarSet {
    pub fn empty() -> Self {
        VarSet::default()
    }

    pub fn singleton(i: DeBruijnIndex) -> Self {
        let mut bits = bitvec::vec::BitVec::repeat(false, i + 1);
        bits.set(i, true);
        VarSet { bits }
    }

    pub fn contains(&self, i: DeBruijnIndex) -> bool {
        self.bits.get(i).map(|b| *b).unwrap_or(false)
    }

    pub fn is_empty(&self) -> bool {
        self.bits.not_any()
    }

    /// Union with another set.
    pub fn union(&self, other: &VarSet) -> VarSet {
        let mut bits = self.bits.clone();
        if bits.len() < other.bits.len() {
            bits.resize(other.bits.len(), false);
        }
        for i in other.bits.iter_ones() {
            bits.set(i, true);
        }
        VarSet { bits }
    }

    /// Leave `n` binders: drop bits `0..n` and renumber the rest down by `n`.
    pub fn shift_down(&self, n: usize) -> VarSet {
        if n == 0 {
            return self.clone();
        }
        let mut bits = bitvec::vec::BitVec::new();
        for i in self.bits.iter_ones() {
            if i >= n {
                let j = i - n;
                if bits.len() <= j {
                    bits.resize(j + 1, false);
                }
                bits.set(j, true);
            }
        }
        VarSet { bits }
    }

    /// True iff some free variable is `>= cutoff`. Traversals use this to
    /// skip subtrees that a shift or substitution cannot touch.
    pub fn any_at_or_above(&self, cutoff: usize) -> bool {
        self.bits.iter_ones().any(|i| i >= cutoff)
    }

    /// Iterate the free indices in increasing order.
    pub fn iter(&self) -> impl Iterator<Item = DeBruijnIndex> + '_ {
        self.bits.iter_ones()
    }
}

// ============================================================================
// Flat constructors
// ============================================================================

/// One binding of a `Let` group. The group's right-hand sides and body live
/// under all `n` binders of the group; the declared types do not.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LetBinding {
    pub name: String,
    pub ty: Term,
    pub rhs: Term,
}

/// An external constant: a free variable with a global identity and a
/// declared type, not subject to de Bruijn discipline.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExtCns {
    pub var_index: VarIndex,
    pub name: String,
    pub ty: Term,
}

/// The flat constructors of the term universe.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TermF {
    /// Bound variable (de Bruijn index).
    LocalVar(DeBruijnIndex),
    /// Lambda abstraction. The name is display-only.
    Lambda(String, Term, Term),
    /// Dependent function type.
    Pi(String, Term, Term),
    /// Group of let bindings; see [`LetBinding`] for the binding structure.
    Let(Vec<LetBinding>, Term),
    /// Application.
    App(Term, Term),
    /// A named, closed term with a declared type. Opaque to substitution
    /// and free-variable analysis.
    Constant(Ident, Term, Term),
    /// Reference to a global definition.
    Global(Ident),
    /// Universe literal.
    Sort(Sort),
    /// Natural-number literal, arbitrary precision.
    NatLit(BigUint),
    /// String literal.
    StringLit(String),
    /// Array literal with an explicit element type.
    ArrayValue(Term, Vec<Term>),
    /// External constant.
    ExtCns(ExtCns),
    UnitValue,
    UnitType,
    PairValue(Term, Term),
    PairType(Term, Term),
    PairLeft(Term),
    PairRight(Term),
    /// Record value cell: field name (a term reducing to a string literal),
    /// field value, rest of the chain. Chains are right-nested and end in
    /// `UnitValue`.
    FieldValue(Term, Term, Term),
    /// Record type cell; chains end in `UnitType`.
    FieldType(Term, Term, Term),
    /// Select a named field out of a record value.
    RecordSelector(Term, Term),
    /// Constructor application, params and ordinary arguments split.
    CtorApp(Ident, Vec<Term>, Vec<Term>),
    /// Datatype application, params and indices split.
    DataTypeApp(Ident, Vec<Term>, Vec<Term>),
    /// Dependent eliminator application. `cases` maps constructor names to
    /// case functions.
    RecursorApp {
        data: Ident,
        params: Vec<Term>,
        motive: Term,
        cases: BTreeMap<Ident, Term>,
        indices: Vec<Term>,
        scrutinee: Term,
    },
}

impl TermF {
    /// The free-variable set of a node, given that children already know
    /// theirs. Binders shift their bodies down; `Constant` is closed by
    /// definition.
    fn free_vars(&self) -> VarSet {
        match self {
            TermF::LocalVar(i) => VarSet::singleton(*i),
            TermF::Lambda(_, ty, body) | TermF::Pi(_, ty, body) => {
                ty.free_vars_ref(|a| body.free_vars_ref(|b| a.union(&b.shift_down(1))))
            }
            TermF::Let(defs, body) => {
                let n = defs.len();
                let mut acc = body.free_vars().shift_down(n);
                for d in defs {
                    acc = acc.union(&d.ty.free_vars());
                    acc = acc.union(&d.rhs.free_vars().shift_down(n));
                }
                acc
            }
            TermF::Constant(_, _, _) => VarSet::empty(),
            _ => {
                let mut acc = VarSet::empty();
                self.for_each_child(|t| acc = acc.union(&t.free_vars()));
                acc
            }
        }
    }

    /// Visit every direct child term of a non-binding node. Binding nodes
    /// are handled explicitly by the callers that care about cutoffs.
    fn for_each_child(&self, mut f: impl FnMut(&Term)) {
        match self {
            TermF::LocalVar(_)
            | TermF::Global(_)
            | TermF::Sort(_)
            | TermF::NatLit(_)
            | TermF::StringLit(_)
            | TermF::UnitValue
            | TermF::UnitType => {}
            TermF::Lambda(_, a, b) | TermF::Pi(_, a, b) => {
                f(a);
                f(b);
            }
            TermF::Let(defs, body) => {
                for d in defs {
                    f(&d.ty);
                    f(&d.rhs);
                }
                f(body);
            }
            TermF::App(g, x) => {
                f(g);
                f(x);
            }
            TermF::Constant(_, defn, ty) => {
                f(defn);
                f(ty);
            }
            TermF::ArrayValue(ty, elems) => {
                f(ty);
                for e in elems {
                    f(e);
                }
            }
            TermF::ExtCns(ec) => f(&ec.ty),
            TermF::PairValue(a, b) | TermF::PairType(a, b) => {
                f(a);
                f(b);
            }
            TermF::PairLeft(t) | TermF::PairRight(t) => f(t),
            TermF::FieldValue(a, b, c) | TermF::FieldType(a, b, c) => {
                f(a);
                f(b);
                f(c);
            }
            TermF::RecordSelector(r, fld) => {
                f(r);
                f(fld);
            }
            TermF::CtorApp(_, ps, xs) | TermF::DataTypeApp(_, ps, xs) => {
                for p in ps {
                    f(p);
                }
                for x in xs {
                    f(x);
                }
            }
            TermF::RecursorApp {
                params,
                motive,
                cases,
                indices,
                scrutinee,
                ..
            } => {
                for p in params {
                    f(p);
                }
                f(motive);
                for c in cases.values() {
                    f(c);
                }
                for i in indices {
                    f(i);
                }
                f(scrutinee);
            }
        }
    }
}

// ============================================================================
// Terms
// ============================================================================

/// An interned term node.
#[derive(Debug)]
pub struct TermNode {
    /// Unique within the originating factory.
    pub index: TermIndex,
    /// Cached structural hash of `body`.
    pub hash: u64,
    /// Cached free-variable set.
    pub free_vars: VarSet,
    pub body: TermF,
}

/// A term in one of its two physical forms.
#[derive(Clone, Debug)]
pub enum Term {
    Shared(Arc<TermNode>),
    Unshared(Arc<TermF>),
}

impl Term {
    /// The underlying flat constructor.
    pub fn term_f(&self) -> &TermF {
        match self {
            Term::Shared(node) => &node.body,
            Term::Unshared(tf) => tf,
        }
    }

    /// The interned index, if this is a shared node.
    pub fn index(&self) -> Option<TermIndex> {
        match self {
            Term::Shared(node) => Some(node.index),
            Term::Unshared(_) => None,
        }
    }

    /// The free-variable set. Cached for shared nodes, recomputed for
    /// unshared ones.
    pub fn free_vars(&self) -> VarSet {
        match self {
            Term::Shared(node) => node.free_vars.clone(),
            Term::Unshared(tf) => tf.free_vars(),
        }
    }

    /// Run `f` on the free-variable set without cloning it when cached.
    fn free_vars_ref<R>(&self, f: impl FnOnce(&VarSet) -> R) -> R {
        match self {
            Term::Shared(node) => f(&node.free_vars),
            Term::Unshared(tf) => f(&tf.free_vars()),
        }
    }

    /// True iff some free variable is `>= cutoff`.
    pub fn has_var_at_or_above(&self, cutoff: usize) -> bool {
        self.free_vars_ref(|fv| fv.any_at_or_above(cutoff))
    }

    pub fn is_closed(&self) -> bool {
        self.free_vars_ref(VarSet::is_empty)
    }

    fn structural_hash(&self) -> u64 {
        match self {
            Term::Shared(node) => node.hash,
            Term::Unshared(tf) => hash_term_f(tf),
        }
    }
}

fn hash_term_f(tf: &TermF) -> u64 {
    let mut h = FxHasher::default();
    tf.hash(&mut h);
    h.finish()
}

impl PartialEq for Term {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            // Nodes from the same factory are equal iff their indices are;
            // hash-consing guarantees the forward direction and uniqueness
            // the converse.
            (Term::Shared(a), Term::Shared(b)) => a.index == b.index,
            _ => self.term_f() == other.term_f(),
        }
    }
}

impl Eq for Term {}

impl Hash for Term {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Shared and unshared views of the same tree must hash alike, so
        // both sides funnel through the structural hash.
        state.write_u64(self.structural_hash());
    }
}

impl Serialize for Term {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.term_f().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Term {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Deserialized terms come back unshared; re-intern through a factory
        // to recover index identity.
        Ok(Term::Unshared(Arc::new(TermF::deserialize(deserializer)?)))
    }
}

// ============================================================================
// The factory
// ============================================================================

/// Hash-consing term factory. Structurally equal constructions return the
/// same shared node. The intern table sits behind a lock so the factory can
/// be handed across threads, though a single inference holds it exclusively.
pub struct TermFactory {
    inner: Mutex<FactoryInner>,
}

struct FactoryInner {
    table: FxHashMap<TermF, Term>,
    next_index: TermIndex,
}

impl Default for TermFactory {
    fn default() -> Self {
        TermFactory::new()
    }
}

impl TermFactory {
    pub fn new() -> Self {
        TermFactory {
            inner: Mutex::new(FactoryInner {
                table: FxHashMap::default(),
                next_index: 0,
            }),
        }
    }

    /// Intern a flat constructor, returning the canonical shared node.
    pub fn term(&self, tf: TermF) -> Term {
        let mut inner = self.inner.lock().expect("term factory lock poisoned");
        if let Some(t) = inner.table.get(&tf) {
            return t.clone();
        }
        let node = TermNode {
            index: inner.next_index,
            hash: hash_term_f(&tf),
            free_vars: tf.free_vars(),
            body: tf.clone(),
        };
        inner.next_index += 1;
        let t = Term::Shared(Arc::new(node));
        inner.table.insert(tf, t.clone());
        t
    }

    /// Number of distinct nodes interned so far.
    pub fn node_count(&self) -> u64 {
        self.inner.lock().expect("term factory lock poisoned").next_index
    }

    // ------------------------------------------------------------------
    // Convenience constructors
    // ------------------------------------------------------------------

    pub fn local_var(&self, i: DeBruijnIndex) -> Term {
        self.term(TermF::LocalVar(i))
    }

    pub fn sort(&self, s: Sort) -> Term {
        self.term(TermF::Sort(s))
    }

    pub fn prop(&self) -> Term {
        self.sort(Sort::PROP)
    }

    pub fn nat_lit(&self, n: impl Into<BigUint>) -> Term {
        self.term(TermF::NatLit(n.into()))
    }

    pub fn string_lit(&self, s: impl Into<String>) -> Term {
        self.term(TermF::StringLit(s.into()))
    }

    pub fn global(&self, id: Ident) -> Term {
        self.term(TermF::Global(id))
    }

    pub fn lambda(&self, name: impl Into<String>, ty: Term, body: Term) -> Term {
        self.term(TermF::Lambda(name.into(), ty, body))
    }

    pub fn pi(&self, name: impl Into<String>, ty: Term, body: Term) -> Term {
        self.term(TermF::Pi(name.into(), ty, body))
    }

    /// Non-dependent function type. The codomain must not reference the new
    /// binder (callers lift beforehand when it does).
    pub fn arrow(&self, dom: Term, cod: Term) -> Term {
        self.pi("_", dom, cod)
    }

    pub fn apply(&self, f: Term, x: Term) -> Term {
        self.term(TermF::App(f, x))
    }

    /// Iterated application.
    pub fn apply_all(&self, f: Term, args: impl IntoIterator<Item = Term>) -> Term {
        args.into_iter().fold(f, |acc, x| self.apply(acc, x))
    }

    pub fn constant(&self, name: Ident, defn: Term, ty: Term) -> Term {
        self.term(TermF::Constant(name, defn, ty))
    }

    pub fn ext_cns(&self, var_index: VarIndex, name: impl Into<String>, ty: Term) -> Term {
        self.term(TermF::ExtCns(ExtCns {
            var_index,
            name: name.into(),
            ty,
        }))
    }

    pub fn unit_value(&self) -> Term {
        self.term(TermF::UnitValue)
    }

    pub fn unit_type(&self) -> Term {
        self.term(TermF::UnitType)
    }

    pub fn pair_value(&self, a: Term, b: Term) -> Term {
        self.term(TermF::PairValue(a, b))
    }

    pub fn pair_type(&self, a: Term, b: Term) -> Term {
        self.term(TermF::PairType(a, b))
    }

    pub fn pair_left(&self, t: Term) -> Term {
        self.term(TermF::PairLeft(t))
    }

    pub fn pair_right(&self, t: Term) -> Term {
        self.term(TermF::PairRight(t))
    }

    pub fn field_value(&self, fld: Term, val: Term, rest: Term) -> Term {
        self.term(TermF::FieldValue(fld, val, rest))
    }

    pub fn field_type(&self, fld: Term, ty: Term, rest: Term) -> Term {
        self.term(TermF::FieldType(fld, ty, rest))
    }

    pub fn record_selector(&self, rec: Term, fld: Term) -> Term {
        self.term(TermF::RecordSelector(rec, fld))
    }

    /// Build a record value chain from named fields.
    pub fn record_value(&self, fields: impl IntoIterator<Item = (String, Term)>) -> Term {
        let fields: Vec<_> = fields.into_iter().collect();
        fields
            .into_iter()
            .rev()
            .fold(self.unit_value(), |rest, (name, val)| {
                let fld = self.string_lit(name);
                self.field_value(fld, val, rest)
            })
    }

    /// Build a record type chain from named field types.
    pub fn record_type(&self, fields: impl IntoIterator<Item = (String, Term)>) -> Term {
        let fields: Vec<_> = fields.into_iter().collect();
        fields
            .into_iter()
            .rev()
            .fold(self.unit_type(), |rest, (name, ty)| {
                let fld = self.string_lit(name);
                self.field_type(fld, ty, rest)
            })
    }

    pub fn ctor_app(&self, c: Ident, params: Vec<Term>, args: Vec<Term>) -> Term {
        self.term(TermF::CtorApp(c, params, args))
    }

    pub fn data_type_app(&self, d: Ident, params: Vec<Term>, indices: Vec<Term>) -> Term {
        self.term(TermF::DataTypeApp(d, params, indices))
    }

    #[allow(clippy::too_many_arguments)]
    pub fn recursor_app(
        &self,
        data: Ident,
        params: Vec<Term>,
        motive: Term,
        cases: BTreeMap<Ident, Term>,
        indices: Vec<Term>,
        scrutinee: Term,
    ) -> Term {
        self.term(TermF::RecursorApp {
            data,
            params,
            motive,
            cases,
            indices,
            scrutinee,
        })
    }
}
