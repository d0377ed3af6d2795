// Copyright (c) Microsoft Corporation.
// SPDX-License-Identifier: MIT

//! The policy registry
//!
//! A [`Policy`] owns the raw declarations handed over by a loader and resolves them on
//! demand.  Commons and classes are constructed the first time they are looked up and cached
//! by name, so every lookup of a name returns the same [`Rc`].  Callers may rely on
//! [`Rc::ptr_eq`] to compare them.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use tracing::{debug, trace};

use crate::constants;
use crate::error::PolicyError;
use crate::objclass::{Common, ObjectClass};
use crate::terule::{validate_ruletype, RuleRecord, RuleType, TERule};
use crate::typeattr::TypeOrAttr;

/// Something to look up in a policy: either a name, or a handle previously handed out
#[derive(Debug)]
pub enum SymbolKey<'a, T> {
    Name(&'a str),
    Handle(&'a Rc<T>),
}

impl<'a, T> From<&'a str> for SymbolKey<'a, T> {
    fn from(name: &'a str) -> Self {
        SymbolKey::Name(name)
    }
}

impl<'a, T> From<&'a String> for SymbolKey<'a, T> {
    fn from(name: &'a String) -> Self {
        SymbolKey::Name(name.as_str())
    }
}

impl<'a, T> From<&'a Rc<T>> for SymbolKey<'a, T> {
    fn from(handle: &'a Rc<T>) -> Self {
        SymbolKey::Handle(handle)
    }
}

#[derive(Clone, Debug)]
struct CommonDecl {
    perms: Vec<String>,
}

#[derive(Clone, Debug)]
struct ClassDecl {
    perms: Vec<String>,
    common: Option<String>,
}

#[derive(Debug)]
pub struct Policy {
    commons: BTreeMap<String, CommonDecl>,
    classes: BTreeMap<String, ClassDecl>,
    types: BTreeMap<String, TypeOrAttr>,
    rules: Vec<RuleRecord>,
    common_cache: RefCell<BTreeMap<String, Rc<Common>>>,
    class_cache: RefCell<BTreeMap<String, Rc<ObjectClass>>>,
}

impl Policy {
    /// Look up a common by name.  Looking up a common handed out by this policy returns that
    /// same common.
    pub fn lookup_common<'a, K>(&self, key: K) -> Result<Rc<Common>, PolicyError>
    where
        K: Into<SymbolKey<'a, Common>>,
    {
        let name = match key.into() {
            SymbolKey::Handle(com) => {
                if self.is_bound(&self.common_cache, com.name(), com) {
                    return Ok(Rc::clone(com));
                }
                com.name()
            }
            SymbolKey::Name(name) => name,
        };

        if let Some(com) = self.common_cache.borrow().get(name) {
            return Ok(Rc::clone(com));
        }

        let decl = self
            .commons
            .get(name)
            .ok_or_else(|| PolicyError::InvalidCommon(name.to_string()))?;
        trace!("Constructing common {}", name);
        let com = Rc::new(Common::new(name, decl.perms.iter().cloned()));
        self.common_cache
            .borrow_mut()
            .insert(name.to_string(), Rc::clone(&com));
        Ok(com)
    }

    /// Look up an object class by name.  Looking up a class handed out by this policy returns
    /// that same class.
    pub fn lookup_class<'a, K>(&self, key: K) -> Result<Rc<ObjectClass>, PolicyError>
    where
        K: Into<SymbolKey<'a, ObjectClass>>,
    {
        let name = match key.into() {
            SymbolKey::Handle(cls) => {
                if self.is_bound(&self.class_cache, cls.name(), cls) {
                    return Ok(Rc::clone(cls));
                }
                cls.name()
            }
            SymbolKey::Name(name) => name,
        };

        if let Some(cls) = self.class_cache.borrow().get(name) {
            return Ok(Rc::clone(cls));
        }

        let decl = self
            .classes
            .get(name)
            .ok_or_else(|| PolicyError::InvalidClass(name.to_string()))?;
        let common = match &decl.common {
            Some(c) => Some(self.lookup_common(c)?),
            None => None,
        };
        trace!("Constructing class {}", name);
        let cls = Rc::new(ObjectClass::new(name, decl.perms.iter().cloned(), common));
        self.class_cache
            .borrow_mut()
            .insert(name.to_string(), Rc::clone(&cls));
        Ok(cls)
    }

    fn is_bound<T>(
        &self,
        cache: &RefCell<BTreeMap<String, Rc<T>>>,
        name: &str,
        handle: &Rc<T>,
    ) -> bool {
        cache
            .borrow()
            .get(name)
            .map_or(false, |cached| Rc::ptr_eq(cached, handle))
    }

    pub fn lookup_type(&self, name: &str) -> Result<TypeOrAttr, PolicyError> {
        if name == constants::SELF_TYPE {
            return Ok(TypeOrAttr::new_type(name));
        }
        self.types
            .get(name)
            .cloned()
            .ok_or_else(|| PolicyError::InvalidType(name.to_string()))
    }

    pub fn commons(&self) -> Result<Vec<Rc<Common>>, PolicyError> {
        self.commons
            .keys()
            .map(|name| self.lookup_common(name))
            .collect()
    }

    pub fn classes(&self) -> Result<Vec<Rc<ObjectClass>>, PolicyError> {
        self.classes
            .keys()
            .map(|name| self.lookup_class(name))
            .collect()
    }

    pub fn types(&self) -> impl Iterator<Item = &TypeOrAttr> {
        self.types.values()
    }

    pub fn rule_records(&self) -> &[RuleRecord] {
        &self.rules
    }

    /// Every TE and AV rule of the policy, in declaration order
    pub fn terules(&self) -> Result<Vec<TERule>, PolicyError> {
        self.rules
            .iter()
            .map(|r| TERule::from_record(self, r))
            .collect()
    }

    /// The TE and AV rules whose rule type is one of `ruletypes`
    pub fn terules_of<I, S>(&self, ruletypes: I) -> Result<Vec<TERule>, PolicyError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let ruletypes: Vec<S> = ruletypes.into_iter().collect();
        validate_ruletype(ruletypes.iter())?;
        let wanted = ruletypes
            .iter()
            .map(|r| r.as_ref().parse())
            .collect::<Result<Vec<RuleType>, PolicyError>>()?;
        debug!("Selecting {} rule types", wanted.len());

        Ok(self
            .terules()?
            .into_iter()
            .filter(|r| wanted.contains(&r.ruletype()))
            .collect())
    }
}

/// Collects the declarations of a policy
///
/// Declarations may arrive in any order.  [`PolicyBuilder::build`] checks that they are
/// consistent with each other.
#[derive(Debug, Default)]
pub struct PolicyBuilder {
    commons: BTreeMap<String, CommonDecl>,
    classes: BTreeMap<String, ClassDecl>,
    types: BTreeMap<String, TypeOrAttr>,
    rules: Vec<RuleRecord>,
}

impl PolicyBuilder {
    pub fn new() -> Self {
        PolicyBuilder::default()
    }

    pub fn add_common<I, S>(&mut self, name: &str, perms: I) -> Result<(), PolicyError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if self.commons.contains_key(name) {
            return Err(PolicyError::DuplicateDeclaration {
                kind: "common",
                name: name.to_string(),
            });
        }
        self.commons.insert(
            name.to_string(),
            CommonDecl {
                perms: perms.into_iter().map(Into::into).collect(),
            },
        );
        Ok(())
    }

    pub fn add_class<I, S>(&mut self, name: &str, perms: I) -> Result<(), PolicyError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if self.classes.contains_key(name) {
            return Err(PolicyError::DuplicateDeclaration {
                kind: "class",
                name: name.to_string(),
            });
        }
        self.classes.insert(
            name.to_string(),
            ClassDecl {
                perms: perms.into_iter().map(Into::into).collect(),
                common: None,
            },
        );
        Ok(())
    }

    pub fn has_common(&self, name: &str) -> bool {
        self.commons.contains_key(name)
    }

    /// Make `class` inherit `common`.  A class inherits at most one common.
    pub fn set_class_common(&mut self, class: &str, common: &str) -> Result<(), PolicyError> {
        let decl = self
            .classes
            .get_mut(class)
            .ok_or_else(|| PolicyError::InvalidClass(class.to_string()))?;
        if decl.common.is_some() {
            return Err(PolicyError::DuplicateDeclaration {
                kind: "classcommon",
                name: class.to_string(),
            });
        }
        decl.common = Some(common.to_string());
        Ok(())
    }

    pub fn add_type(&mut self, name: &str) -> Result<(), PolicyError> {
        self.add_type_or_attr(TypeOrAttr::new_type(name))
    }

    pub fn add_attribute(&mut self, name: &str) -> Result<(), PolicyError> {
        self.add_type_or_attr(TypeOrAttr::new_attribute(name))
    }

    fn add_type_or_attr(&mut self, t: TypeOrAttr) -> Result<(), PolicyError> {
        if self.types.contains_key(t.name()) {
            return Err(PolicyError::DuplicateDeclaration {
                kind: if t.is_attribute() {
                    "typeattribute"
                } else {
                    "type"
                },
                name: t.name().to_string(),
            });
        }
        self.types.insert(t.name().to_string(), t);
        Ok(())
    }

    pub fn add_rule(&mut self, record: RuleRecord) {
        self.rules.push(record);
    }

    pub fn build(self) -> Result<Policy, PolicyError> {
        for decl in self.classes.values() {
            if let Some(c) = &decl.common {
                if !self.commons.contains_key(c) {
                    return Err(PolicyError::InvalidCommon(c.clone()));
                }
            }
        }
        debug!(
            "Built policy with {} commons, {} classes, {} types and {} rules",
            self.commons.len(),
            self.classes.len(),
            self.types.len(),
            self.rules.len()
        );
        Ok(Policy {
            commons: self.commons,
            classes: self.classes,
            types: self.types,
            rules: self.rules,
            common_cache: RefCell::new(BTreeMap::new()),
            class_cache: RefCell::new(BTreeMap::new()),
        })
    }
}
