//! Term printing
//!
//! A compact, precedence-aware renderer for terms. This exists for error
//! messages and debugging; it prints de Bruijn variables as `%i` rather than
//! recovering surface names.

use std::fmt;

use crate::term::{Term, TermF};

/// Precedence levels, loosest first.
const PREC_NONE: u8 = 0;
const PREC_ARROW: u8 = 1;
const PREC_APP: u8 = 2;
const PREC_ATOM: u8 = 3;

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        pp(f, self, PREC_NONE)
    }
}

fn parens_if(
    f: &mut fmt::Formatter<'_>,
    cond: bool,
    body: impl FnOnce(&mut fmt::Formatter<'_>) -> fmt::Result,
) -> fmt::Result {
    if cond {
        f.write_str("(")?;
        body(f)?;
        f.write_str(")")
    } else {
        body(f)
    }
}

fn pp(f: &mut fmt::Formatter<'_>, t: &Term, prec: u8) -> fmt::Result {
    match t.term_f() {
        TermF::LocalVar(i) => write!(f, "%{i}"),
        TermF::Lambda(name, ty, body) => parens_if(f, prec > PREC_NONE, |f| {
            write!(f, "\\({name} : ")?;
            pp(f, ty, PREC_NONE)?;
            f.write_str(") -> ")?;
            pp(f, body, PREC_NONE)
        }),
        TermF::Pi(name, ty, body) => parens_if(f, prec > PREC_ARROW, |f| {
            if body.free_vars().contains(0) {
                write!(f, "({name} : ")?;
                pp(f, ty, PREC_NONE)?;
                f.write_str(") -> ")?;
            } else {
                pp(f, ty, PREC_APP)?;
                f.write_str(" -> ")?;
            }
            pp(f, body, PREC_ARROW)
        }),
        TermF::Let(defs, body) => parens_if(f, prec > PREC_NONE, |f| {
            f.write_str("let {")?;
            for (i, d) in defs.iter().enumerate() {
                if i > 0 {
                    f.write_str("; ")?;
                }
                write!(f, "{} : ", d.name)?;
                pp(f, &d.ty, PREC_NONE)?;
                f.write_str(" = ")?;
                pp(f, &d.rhs, PREC_NONE)?;
            }
            f.write_str("} in ")?;
            pp(f, body, PREC_NONE)
        }),
        TermF::App(g, x) => parens_if(f, prec > PREC_APP, |f| {
            pp(f, g, PREC_APP)?;
            f.write_str(" ")?;
            pp(f, x, PREC_ATOM)
        }),
        TermF::Constant(name, _, _) => write!(f, "{name}"),
        TermF::Global(id) => write!(f, "{id}"),
        TermF::Sort(s) => parens_if(f, prec > PREC_APP, |f| write!(f, "{s}")),
        TermF::NatLit(n) => write!(f, "{n}"),
        TermF::StringLit(s) => write!(f, "{s:?}"),
        TermF::ArrayValue(_, elems) => {
            f.write_str("[")?;
            for (i, e) in elems.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                pp(f, e, PREC_NONE)?;
            }
            f.write_str("]")
        }
        TermF::ExtCns(ec) => write!(f, "?{}", ec.name),
        TermF::UnitValue => f.write_str("()"),
        TermF::UnitType => f.write_str("Unit"),
        TermF::PairValue(a, b) => {
            f.write_str("(")?;
            pp(f, a, PREC_NONE)?;
            f.write_str(", ")?;
            pp(f, b, PREC_NONE)?;
            f.write_str(")")
        }
        TermF::PairType(a, b) => parens_if(f, prec > PREC_ARROW, |f| {
            pp(f, a, PREC_APP)?;
            f.write_str(" * ")?;
            pp(f, b, PREC_ARROW)
        }),
        TermF::PairLeft(p) => parens_if(f, prec > PREC_APP, |f| {
            pp(f, p, PREC_ATOM)?;
            f.write_str(".1")
        }),
        TermF::PairRight(p) => parens_if(f, prec > PREC_APP, |f| {
            pp(f, p, PREC_ATOM)?;
            f.write_str(".2")
        }),
        TermF::FieldValue(_, _, _) => pp_record(f, t, false),
        TermF::FieldType(_, _, _) => pp_record(f, t, true),
        TermF::RecordSelector(r, fld) => parens_if(f, prec > PREC_APP, |f| {
            pp(f, r, PREC_ATOM)?;
            f.write_str(".")?;
            match fld.term_f() {
                TermF::StringLit(s) => f.write_str(s),
                _ => pp(f, fld, PREC_ATOM),
            }
        }),
        TermF::CtorApp(c, params, args) | TermF::DataTypeApp(c, params, args) => {
            let spine = params.iter().chain(args.iter());
            parens_if(f, prec > PREC_APP && !(params.is_empty() && args.is_empty()), |f| {
                write!(f, "{c}")?;
                for a in spine {
                    f.write_str(" ")?;
                    pp(f, a, PREC_ATOM)?;
                }
                Ok(())
            })
        }
        TermF::RecursorApp {
            data,
            motive,
            indices,
            scrutinee,
            ..
        } => parens_if(f, prec > PREC_APP, |f| {
            write!(f, "{data}.rec ")?;
            pp(f, motive, PREC_ATOM)?;
            for i in indices {
                f.write_str(" ")?;
                pp(f, i, PREC_ATOM)?;
            }
            f.write_str(" ")?;
            pp(f, scrutinee, PREC_ATOM)
        }),
    }
}

fn pp_record(f: &mut fmt::Formatter<'_>, t: &Term, is_type: bool) -> fmt::Result {
    let sep = if is_type { " : " } else { " = " };
    f.write_str("{")?;
    let mut cur = t;
    let mut first = true;
    loop {
        match cur.term_f() {
            TermF::FieldValue(fld, val, rest) | TermF::FieldType(fld, val, rest) => {
                if !first {
                    f.write_str(", ")?;
                }
                first = false;
                match fld.term_f() {
                    TermF::StringLit(s) => f.write_str(s)?,
                    _ => pp(f, fld, PREC_ATOM)?,
                }
                f.write_str(sep)?;
                pp(f, val, PREC_NONE)?;
                cur = rest;
            }
            TermF::UnitValue | TermF::UnitType => break,
            _ => {
                if !first {
                    f.write_str(" | ")?;
                }
                pp(f, cur, PREC_NONE)?;
                break;
            }
        }
    }
    f.write_str("}")
}
