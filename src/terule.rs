// Copyright (c) Microsoft Corporation.
// SPDX-License-Identifier: MIT

//! Type enforcement and access vector rules
//!
//! A loader hands over one [`RuleRecord`] per rule.  [`TERule::from_record`] resolves the
//! names it carries against a [`Policy`] and produces the rule wrapper.  The record variant
//! decides which payload the rule carries; accessors for the other payload return
//! [`PolicyError::RuleUse`].

use sexp::{atom_s, list, Atom, Sexp};
use std::collections::BTreeSet;
use std::convert::TryFrom;
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use crate::boolcond::CondExpr;
use crate::constants;
use crate::error::PolicyError;
use crate::objclass::ObjectClass;
use crate::policy::Policy;
use crate::sexp_internal::{atom_name, display_cil, quoted_atom};
use crate::typeattr::TypeOrAttr;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RuleType {
    Allow,
    Neverallow,
    Auditallow,
    Dontaudit,
    TypeTransition,
    TypeChange,
    TypeMember,
}

impl RuleType {
    pub const ALL: &'static [RuleType] = &[
        RuleType::Allow,
        RuleType::Neverallow,
        RuleType::Auditallow,
        RuleType::Dontaudit,
        RuleType::TypeTransition,
        RuleType::TypeChange,
        RuleType::TypeMember,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RuleType::Allow => constants::ALLOW_RULE_NAME,
            RuleType::Neverallow => constants::NEVERALLOW_RULE_NAME,
            RuleType::Auditallow => constants::AUDITALLOW_RULE_NAME,
            RuleType::Dontaudit => constants::DONTAUDIT_RULE_NAME,
            RuleType::TypeTransition => constants::TYPE_TRANSITION_RULE_NAME,
            RuleType::TypeChange => constants::TYPE_CHANGE_RULE_NAME,
            RuleType::TypeMember => constants::TYPE_MEMBER_RULE_NAME,
        }
    }

    /// Access vector rules carry permissions, the others carry a default type
    pub fn is_av(&self) -> bool {
        matches!(
            self,
            RuleType::Allow | RuleType::Neverallow | RuleType::Auditallow | RuleType::Dontaudit
        )
    }

    pub fn cil_keyword(&self) -> &'static str {
        match self {
            RuleType::TypeTransition => constants::CIL_TYPE_TRANSITION,
            RuleType::TypeChange => constants::CIL_TYPE_CHANGE,
            RuleType::TypeMember => constants::CIL_TYPE_MEMBER,
            _ => self.as_str(),
        }
    }

    pub fn from_cil_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            constants::CIL_TYPE_TRANSITION => Some(RuleType::TypeTransition),
            constants::CIL_TYPE_CHANGE => Some(RuleType::TypeChange),
            constants::CIL_TYPE_MEMBER => Some(RuleType::TypeMember),
            k if constants::AV_RULES.contains(&k) => k.parse().ok(),
            _ => None,
        }
    }
}

impl FromStr for RuleType {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RuleType::ALL
            .iter()
            .find(|rt| rt.as_str() == s)
            .copied()
            .ok_or_else(|| PolicyError::InvalidTERuleType(s.to_string()))
    }
}

impl fmt::Display for RuleType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Check that every candidate names a TE or AV rule type.
///
/// The error names the first candidate that doesn't.  A single candidate is passed as a one
/// element array or an `Option`, such as `validate_ruletype(["allow"])` or
/// `validate_ruletype(Some("allow"))`.
pub fn validate_ruletype<I, S>(candidates: I) -> Result<(), PolicyError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    for c in candidates {
        RuleType::from_str(c.as_ref())?;
    }
    Ok(())
}

/// The conditional block a rule lives in
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RuleCond {
    pub expr: CondExpr,
    /// Which branch of the block holds the rule
    pub truth: bool,
}

impl RuleCond {
    pub fn new(expr: CondExpr, truth: bool) -> Self {
        RuleCond { expr, truth }
    }
}

impl From<CondExpr> for RuleCond {
    fn from(expr: CondExpr) -> Self {
        RuleCond { expr, truth: true }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AvRecord {
    pub ruletype: String,
    pub source: String,
    pub target: String,
    pub tclass: String,
    pub perms: Vec<String>,
    pub cond: Option<RuleCond>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TeRecord {
    pub ruletype: String,
    pub source: String,
    pub target: String,
    pub tclass: String,
    pub default: String,
    pub cond: Option<RuleCond>,
}

/// A type_transition scoped to one object name.  These are never conditional.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FilenameTransRecord {
    pub source: String,
    pub target: String,
    pub tclass: String,
    pub default: String,
    pub filename: String,
}

/// A rule as produced by a policy loader, with every reference still a name
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RuleRecord {
    Av(AvRecord),
    Te(TeRecord),
    FilenameTrans(FilenameTransRecord),
}

impl RuleRecord {
    /// The record with the rule placed in a conditional block.  Filename transitions can't be
    /// conditional.
    pub fn with_cond(self, cond: RuleCond) -> Result<Self, PolicyError> {
        match self {
            RuleRecord::Av(r) => Ok(RuleRecord::Av(AvRecord {
                cond: Some(cond),
                ..r
            })),
            RuleRecord::Te(r) => Ok(RuleRecord::Te(TeRecord {
                cond: Some(cond),
                ..r
            })),
            RuleRecord::FilenameTrans(r) => Err(PolicyError::InvalidRuleRecord(format!(
                "filename transition {} {} {} \"{}\" cannot be conditional",
                r.source, r.target, r.tclass, r.filename
            ))),
        }
    }
}

/// Build a record from a CIL rule statement, such as `(allow a b (file (read)))` or
/// `(typetransition a b file "name" c)`.
impl TryFrom<&Sexp> for RuleRecord {
    type Error = PolicyError;

    fn try_from(stmt: &Sexp) -> Result<Self, Self::Error> {
        let malformed = || PolicyError::InvalidRuleRecord(display_cil(stmt));
        let items = match stmt {
            Sexp::List(l) => l,
            Sexp::Atom(_) => return Err(malformed()),
        };
        let (keyword, args) = match items.split_first() {
            Some((Sexp::Atom(Atom::S(k)), args)) => (k, args),
            _ => return Err(malformed()),
        };
        let ruletype = RuleType::from_cil_keyword(keyword).ok_or_else(malformed)?;
        let names = |exprs: &[Sexp]| -> Result<Vec<String>, PolicyError> {
            exprs
                .iter()
                .map(|e| atom_name(e).ok_or_else(malformed))
                .collect()
        };

        if ruletype.is_av() {
            let (source, target, classperms) = match args {
                [s, t, Sexp::List(cp)] => (s, t, cp),
                _ => return Err(malformed()),
            };
            let (tclass, perms) = match classperms.as_slice() {
                [c, Sexp::List(p)] if !p.is_empty() => (c, p),
                _ => return Err(malformed()),
            };
            let mut st = names(&[source.clone(), target.clone(), tclass.clone()])?.into_iter();
            return Ok(RuleRecord::Av(AvRecord {
                ruletype: ruletype.as_str().to_string(),
                source: st.next().ok_or_else(malformed)?,
                target: st.next().ok_or_else(malformed)?,
                tclass: st.next().ok_or_else(malformed)?,
                perms: names(perms)?,
                cond: None,
            }));
        }

        match args {
            [_, _, _, _] => {
                let mut n = names(args)?.into_iter();
                Ok(RuleRecord::Te(TeRecord {
                    ruletype: ruletype.as_str().to_string(),
                    source: n.next().ok_or_else(malformed)?,
                    target: n.next().ok_or_else(malformed)?,
                    tclass: n.next().ok_or_else(malformed)?,
                    default: n.next().ok_or_else(malformed)?,
                    cond: None,
                }))
            }
            [_, _, _, _, _] if ruletype == RuleType::TypeTransition => {
                let mut n = names(args)?.into_iter();
                Ok(RuleRecord::FilenameTrans(FilenameTransRecord {
                    source: n.next().ok_or_else(malformed)?,
                    target: n.next().ok_or_else(malformed)?,
                    tclass: n.next().ok_or_else(malformed)?,
                    filename: n.next().ok_or_else(malformed)?,
                    default: n.next().ok_or_else(malformed)?,
                }))
            }
            _ => Err(malformed()),
        }
    }
}

#[derive(Clone, Debug)]
enum RuleBody {
    Av {
        perms: BTreeSet<String>,
        cond: Option<RuleCond>,
    },
    Te {
        default: TypeOrAttr,
        cond: Option<RuleCond>,
    },
    FilenameTrans {
        default: TypeOrAttr,
        filename: String,
    },
}

/// A type enforcement or access vector rule
#[derive(Clone, Debug)]
pub struct TERule {
    ruletype: RuleType,
    source: TypeOrAttr,
    target: TypeOrAttr,
    tclass: Rc<ObjectClass>,
    body: RuleBody,
}

impl TERule {
    /// Resolve a loader record against the policy.
    ///
    /// Fails if the rule type is unknown or belongs to the other family than the record, or if
    /// a referenced type or class doesn't exist.
    pub fn from_record(policy: &Policy, record: &RuleRecord) -> Result<TERule, PolicyError> {
        let (ruletype, source, target, tclass, body) = match record {
            RuleRecord::Av(r) => {
                let ruletype: RuleType = r.ruletype.parse()?;
                if !ruletype.is_av() {
                    return Err(PolicyError::InvalidRuleRecord(format!(
                        "{} rule with permissions",
                        ruletype
                    )));
                }
                if r.perms.is_empty() {
                    return Err(PolicyError::InvalidRuleRecord(format!(
                        "{} rule without permissions",
                        ruletype
                    )));
                }
                let body = RuleBody::Av {
                    perms: r.perms.iter().cloned().collect(),
                    cond: r.cond.clone(),
                };
                (ruletype, &r.source, &r.target, &r.tclass, body)
            }
            RuleRecord::Te(r) => {
                let ruletype: RuleType = r.ruletype.parse()?;
                if ruletype.is_av() {
                    return Err(PolicyError::InvalidRuleRecord(format!(
                        "{} rule with a default type",
                        ruletype
                    )));
                }
                let body = RuleBody::Te {
                    default: policy.lookup_type(&r.default)?,
                    cond: r.cond.clone(),
                };
                (ruletype, &r.source, &r.target, &r.tclass, body)
            }
            RuleRecord::FilenameTrans(r) => {
                // Filenames are rendered inside double quotes
                if r.filename.contains('"') {
                    return Err(PolicyError::InvalidRuleRecord(format!(
                        "filename {} contains a double quote",
                        r.filename
                    )));
                }
                let body = RuleBody::FilenameTrans {
                    default: policy.lookup_type(&r.default)?,
                    filename: r.filename.clone(),
                };
                (
                    RuleType::TypeTransition,
                    &r.source,
                    &r.target,
                    &r.tclass,
                    body,
                )
            }
        };

        Ok(TERule {
            ruletype,
            source: policy.lookup_type(source)?,
            target: policy.lookup_type(target)?,
            tclass: policy.lookup_class(tclass.as_str())?,
            body,
        })
    }

    pub fn ruletype(&self) -> RuleType {
        self.ruletype
    }

    pub fn source(&self) -> &TypeOrAttr {
        &self.source
    }

    pub fn target(&self) -> &TypeOrAttr {
        &self.target
    }

    pub fn tclass(&self) -> &Rc<ObjectClass> {
        &self.tclass
    }

    fn misuse(&self, attribute: &'static str) -> PolicyError {
        PolicyError::RuleUse {
            ruletype: self.ruletype,
            attribute,
        }
    }

    pub fn perms(&self) -> Result<&BTreeSet<String>, PolicyError> {
        match &self.body {
            RuleBody::Av { perms, .. } => Ok(perms),
            _ => Err(self.misuse("permissions")),
        }
    }

    pub fn default(&self) -> Result<&TypeOrAttr, PolicyError> {
        match &self.body {
            RuleBody::Te { default, .. } | RuleBody::FilenameTrans { default, .. } => Ok(default),
            RuleBody::Av { .. } => Err(self.misuse("default type")),
        }
    }

    fn cond(&self) -> Option<&RuleCond> {
        match &self.body {
            RuleBody::Av { cond, .. } | RuleBody::Te { cond, .. } => cond.as_ref(),
            RuleBody::FilenameTrans { .. } => None,
        }
    }

    pub fn conditional(&self) -> Result<&CondExpr, PolicyError> {
        self.cond()
            .map(|c| &c.expr)
            .ok_or(PolicyError::RuleNotConditional(self.ruletype))
    }

    /// Whether the rule is in the true or the false branch of its conditional block
    pub fn conditional_block(&self) -> Result<bool, PolicyError> {
        self.cond()
            .map(|c| c.truth)
            .ok_or(PolicyError::RuleNotConditional(self.ruletype))
    }

    pub fn filename(&self) -> Result<&str, PolicyError> {
        if self.ruletype != RuleType::TypeTransition {
            return Err(self.misuse("filename"));
        }
        match &self.body {
            RuleBody::FilenameTrans { filename, .. } => Ok(filename),
            _ => Err(PolicyError::TERuleNoFilename(self.ruletype)),
        }
    }

    /// The rule in policy language syntax
    pub fn statement(&self) -> String {
        let mut stmt = format!(
            "{} {} {}:{} ",
            self.ruletype,
            self.source,
            self.target,
            self.tclass.name()
        );

        match &self.body {
            RuleBody::Av { perms, .. } => {
                let perms: Vec<&str> = perms.iter().map(String::as_str).collect();
                if perms.len() > 1 {
                    stmt.push_str(&format!("{{ {} }};", perms.join(" ")));
                } else {
                    stmt.push_str(&format!("{};", perms.join(" ")));
                }
            }
            RuleBody::Te { default, .. } => stmt.push_str(&format!("{};", default)),
            RuleBody::FilenameTrans { default, filename } => {
                stmt.push_str(&format!("{} \"{}\";", default, filename))
            }
        }

        if let Some(cond) = self.cond() {
            stmt.push_str(&format!(" [ {} ]", cond.expr));
        }

        stmt
    }

    /// The rule as a CIL statement.  Conditional rules are wrapped in a booleanif block.
    pub fn to_cil(&self) -> Sexp {
        let mut rule = vec![
            atom_s(self.ruletype.cil_keyword()),
            atom_s(self.source.name()),
            atom_s(self.target.name()),
        ];

        match &self.body {
            RuleBody::Av { perms, .. } => {
                let perms = perms.iter().map(|p| atom_s(p)).collect();
                rule.push(list(&[atom_s(self.tclass.name()), Sexp::List(perms)]));
            }
            RuleBody::Te { default, .. } => {
                rule.push(atom_s(self.tclass.name()));
                rule.push(atom_s(default.name()));
            }
            RuleBody::FilenameTrans { default, filename } => {
                rule.push(atom_s(self.tclass.name()));
                rule.push(quoted_atom(filename));
                rule.push(atom_s(default.name()));
            }
        }

        let rule = Sexp::List(rule);
        match self.cond() {
            None => rule,
            Some(cond) => {
                let branch = if cond.truth {
                    constants::CIL_TRUE
                } else {
                    constants::CIL_FALSE
                };
                list(&[
                    atom_s(constants::CIL_BOOLEANIF),
                    cond.expr.to_cil(),
                    list(&[atom_s(branch), rule]),
                ])
            }
        }
    }
}

impl fmt::Display for TERule {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.statement())
    }
}
