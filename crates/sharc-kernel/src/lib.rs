//! sharc kernel - Trusted Type Checker
//!
//! This crate implements the term representation and type checking core of
//! the sharc proof environment. It is the trusted computing base: every
//! judgment ultimately reduces to this checker accepting a term.
//!
//! # Architecture
//!
//! The kernel consists of:
//! - Qualified names (`name.rs`)
//! - Universe sorts (`sort.rs`)
//! - Hash-consed shared terms and the term factory (`term.rs`)
//! - Substitution and lifting on de Bruijn terms (`subst.rs`)
//! - The module environment with datatypes, constructors, and global
//!   definitions (`env.rs`)
//! - Weak-head reduction and the literal simpset (`reduce.rs`)
//! - The memoizing inference engine (`tc/`)
//! - A compact term printer used by error messages (`pretty.rs`)
//!
//! # Performance
//!
//! Terms are interned: structurally equal constructions share one node with
//! a unique integer index, so equality during conversion checking and the
//! per-context inference memo table are both O(1) on the index. Every term
//! carries a cached free-variable bitset that lets substitution skip
//! untouched subtrees.

pub mod env;
pub mod name;
pub mod pretty;
pub mod reduce;
pub mod sort;
pub mod subst;
pub mod tc;
pub mod term;

pub use env::{CtorVal, DataTypeVal, DeclError, DefVal, ModuleEnv, PreludeIds};
pub use name::{FieldName, Ident, ModuleName};
pub use reduce::{nat_conversions, rewrite, tc_whnf, whnf, Simpset};
pub use sort::Sort;
pub use subst::{inc_vars, instantiate_var_list, instantiate_vars};
pub use tc::{
    convertible, type_check, type_check_in_ctx, Pos, TcConfig, TcError, TypeChecker, TypedTerm,
};
pub use term::{Term, TermF, TermFactory, TermIndex, VarSet};
