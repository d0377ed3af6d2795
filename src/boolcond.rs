// Copyright (c) Microsoft Corporation.
// SPDX-License-Identifier: MIT
use sexp::{atom_s, list, Atom, Sexp};
use std::collections::BTreeSet;
use std::convert::TryFrom;
use std::fmt;

use crate::constants;
use crate::error::PolicyError;
use crate::sexp_internal::display_cil;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CondOp {
    And,
    Or,
    Xor,
    Eq,
    Neq,
}

impl CondOp {
    fn symbol(&self) -> &'static str {
        match self {
            CondOp::And => "&&",
            CondOp::Or => "||",
            CondOp::Xor => "^",
            CondOp::Eq => "==",
            CondOp::Neq => "!=",
        }
    }

    fn cil_keyword(&self) -> &'static str {
        match self {
            CondOp::And => constants::CIL_AND,
            CondOp::Or => constants::CIL_OR,
            CondOp::Xor => constants::CIL_XOR,
            CondOp::Eq => constants::CIL_EQ,
            CondOp::Neq => constants::CIL_NEQ,
        }
    }

    fn from_cil_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            constants::CIL_AND => Some(CondOp::And),
            constants::CIL_OR => Some(CondOp::Or),
            constants::CIL_XOR => Some(CondOp::Xor),
            constants::CIL_EQ => Some(CondOp::Eq),
            constants::CIL_NEQ => Some(CondOp::Neq),
            _ => None,
        }
    }
}

/// A conditional expression over policy booleans
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum CondExpr {
    Bool(String),
    Not(Box<CondExpr>),
    Binary(CondOp, Box<CondExpr>, Box<CondExpr>),
}

impl CondExpr {
    pub fn binary(op: CondOp, left: CondExpr, right: CondExpr) -> Self {
        CondExpr::Binary(op, Box::new(left), Box::new(right))
    }

    pub fn negate(expr: CondExpr) -> Self {
        CondExpr::Not(Box::new(expr))
    }

    /// The names of all booleans the expression depends on
    pub fn booleans(&self) -> BTreeSet<&str> {
        let mut ret = BTreeSet::new();
        self.collect_booleans(&mut ret);
        ret
    }

    fn collect_booleans<'a>(&'a self, out: &mut BTreeSet<&'a str>) {
        match self {
            CondExpr::Bool(b) => {
                out.insert(b.as_str());
            }
            CondExpr::Not(e) => e.collect_booleans(out),
            CondExpr::Binary(_, l, r) => {
                l.collect_booleans(out);
                r.collect_booleans(out);
            }
        }
    }

    pub fn to_cil(&self) -> Sexp {
        match self {
            CondExpr::Bool(b) => atom_s(b),
            CondExpr::Not(e) => list(&[atom_s(constants::CIL_NOT), e.to_cil()]),
            CondExpr::Binary(op, l, r) => list(&[atom_s(op.cil_keyword()), l.to_cil(), r.to_cil()]),
        }
    }

    fn fmt_operand(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CondExpr::Binary(..) => write!(f, "({})", self),
            _ => write!(f, "{}", self),
        }
    }
}

impl fmt::Display for CondExpr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CondExpr::Bool(b) => write!(f, "{}", b),
            CondExpr::Not(e) => {
                write!(f, "!")?;
                e.fmt_operand(f)
            }
            CondExpr::Binary(op, l, r) => {
                l.fmt_operand(f)?;
                write!(f, " {} ", op.symbol())?;
                r.fmt_operand(f)
            }
        }
    }
}

impl From<&str> for CondExpr {
    fn from(b: &str) -> Self {
        CondExpr::Bool(b.to_string())
    }
}

impl TryFrom<&Sexp> for CondExpr {
    type Error = PolicyError;

    fn try_from(expr: &Sexp) -> Result<Self, Self::Error> {
        let malformed = || PolicyError::InvalidRuleRecord(display_cil(expr));
        match expr {
            Sexp::Atom(Atom::S(b)) => Ok(CondExpr::Bool(b.clone())),
            Sexp::Atom(_) => Err(malformed()),
            Sexp::List(l) => match l.as_slice() {
                [Sexp::Atom(Atom::S(op)), operand] if op == constants::CIL_NOT => {
                    Ok(CondExpr::negate(CondExpr::try_from(operand)?))
                }
                [Sexp::Atom(Atom::S(op)), left, right] => {
                    let op = CondOp::from_cil_keyword(op).ok_or_else(malformed)?;
                    Ok(CondExpr::binary(
                        op,
                        CondExpr::try_from(left)?,
                        CondExpr::try_from(right)?,
                    ))
                }
                _ => Err(malformed()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_bool() {
        assert_eq!(CondExpr::from("cond60").to_string(), "cond60");
    }

    #[test]
    fn display_nested() {
        let expr = CondExpr::binary(
            CondOp::And,
            CondExpr::from("a"),
            CondExpr::negate(CondExpr::binary(
                CondOp::Or,
                CondExpr::from("b"),
                CondExpr::from("c"),
            )),
        );
        assert_eq!(expr.to_string(), "a && !(b || c)");
        assert_eq!(expr.booleans(), BTreeSet::from(["a", "b", "c"]));
        assert_eq!(display_cil(&expr.to_cil()), "(and a (not (or b c)))");
    }

    #[test]
    fn from_cil() {
        let sexp = sexp::parse("(neq a (xor b c))").unwrap();
        let expr = CondExpr::try_from(&sexp).unwrap();
        assert_eq!(expr.to_string(), "a != (b ^ c)");

        let sexp = sexp::parse("(nand a b)").unwrap();
        assert!(matches!(
            CondExpr::try_from(&sexp),
            Err(PolicyError::InvalidRuleRecord(_))
        ));

        let sexp = sexp::parse("(not a b)").unwrap();
        assert!(CondExpr::try_from(&sexp).is_err());
    }
}
