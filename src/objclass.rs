// Copyright (c) Microsoft Corporation.
// SPDX-License-Identifier: MIT

//! Commons and object classes
//!
//! Instances are normally obtained through [`Policy::lookup_common`] and
//! [`Policy::lookup_class`], which hand out one shared instance per name.
//!
//! [`Policy::lookup_common`]: crate::Policy::lookup_common
//! [`Policy::lookup_class`]: crate::Policy::lookup_class

use sexp::{atom_s, list, Sexp};
use std::collections::BTreeSet;
use std::fmt;
use std::rc::Rc;

use crate::constants;

/// A named set of permissions which object classes may inherit
#[derive(Debug)]
pub struct Common {
    name: String,
    perms: BTreeSet<String>,
}

impl Common {
    pub fn new<I, S>(name: &str, perms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Common {
            name: name.to_string(),
            perms: perms.into_iter().map(Into::into).collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn perms(&self) -> &BTreeSet<String> {
        &self.perms
    }

    pub fn contains(&self, perm: &str) -> bool {
        self.perms.contains(perm)
    }

    /// The policy language declaration of this common
    pub fn statement(&self) -> String {
        format!(
            "{} {}{}",
            constants::CIL_COMMON,
            self.name,
            perm_block(self.perms.iter())
        )
    }

    pub fn to_cil(&self) -> Sexp {
        list(&[
            atom_s(constants::CIL_COMMON),
            atom_s(&self.name),
            perm_list(self.perms.iter()),
        ])
    }
}

impl fmt::Display for Common {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// An object class, optionally inheriting the permissions of one common
#[derive(Debug)]
pub struct ObjectClass {
    name: String,
    own_perms: BTreeSet<String>,
    common: Option<Rc<Common>>,
}

impl ObjectClass {
    pub fn new<I, S>(name: &str, perms: I, common: Option<Rc<Common>>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ObjectClass {
            name: name.to_string(),
            own_perms: perms.into_iter().map(Into::into).collect(),
            common,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn common(&self) -> Option<&Rc<Common>> {
        self.common.as_ref()
    }

    /// Permissions declared directly on the class
    pub fn own_perms(&self) -> &BTreeSet<String> {
        &self.own_perms
    }

    /// All permissions of the class, including those inherited from its common
    pub fn perms(&self) -> BTreeSet<&str> {
        let inherited = self.common.iter().flat_map(|c| c.perms().iter());
        self.own_perms
            .iter()
            .chain(inherited)
            .map(String::as_str)
            .collect()
    }

    pub fn contains(&self, perm: &str) -> bool {
        self.own_perms.contains(perm) || self.common.iter().any(|c| c.contains(perm))
    }

    /// The policy language declaration of this class.
    ///
    /// Inherited permissions are implied by the inherits clause and are not listed.  The braces
    /// are left out entirely when the class declares no permissions of its own.
    pub fn statement(&self) -> String {
        let mut stmt = format!("{} {}", constants::CIL_CLASS, self.name);
        if let Some(common) = &self.common {
            stmt.push_str(&format!("\ninherits {}", common.name()));
        }
        if !self.own_perms.is_empty() {
            stmt.push_str(&perm_block(self.own_perms.iter()));
        }
        stmt
    }

    pub fn to_cil(&self) -> Vec<Sexp> {
        let mut ret = vec![list(&[
            atom_s(constants::CIL_CLASS),
            atom_s(&self.name),
            perm_list(self.own_perms.iter()),
        ])];
        if let Some(common) = &self.common {
            ret.push(list(&[
                atom_s(constants::CIL_CLASSCOMMON),
                atom_s(&self.name),
                atom_s(common.name()),
            ]));
        }
        ret
    }
}

impl fmt::Display for ObjectClass {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

fn perm_block<'a, I>(perms: I) -> String
where
    I: Iterator<Item = &'a String>,
{
    let mut block = String::from("\n{\n");
    for p in perms {
        block.push('\t');
        block.push_str(p);
        block.push('\n');
    }
    block.push('}');
    block
}

fn perm_list<'a, I>(perms: I) -> Sexp
where
    I: Iterator<Item = &'a String>,
{
    Sexp::List(perms.map(|p| atom_s(p)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sexp_internal::display_cil;

    fn mock_class(name: &str, perms: &[&str], com_perms: &[&str]) -> ObjectClass {
        let common = if com_perms.is_empty() {
            None
        } else {
            Some(Rc::new(Common::new(
                &format!("{}_common", name),
                com_perms.iter().copied(),
            )))
        };
        ObjectClass::new(name, perms.iter().copied(), common)
    }

    fn assert_one_of(actual: &str, candidates: &[&str]) {
        assert!(
            candidates.contains(&actual),
            "{:?} is not one of {:?}",
            actual,
            candidates
        );
    }

    #[test]
    fn common_string() {
        let com = Common::new("test10", ["perm1", "perm2"]);
        assert_eq!(com.to_string(), "test10");
    }

    #[test]
    fn common_perms() {
        let com = Common::new("test20", ["perm1", "perm2", "perm1"]);
        assert_eq!(
            com.perms(),
            &BTreeSet::from(["perm1".to_string(), "perm2".to_string()])
        );
    }

    #[test]
    fn common_statement() {
        let com = Common::new("test30", ["perm1", "perm2"]);
        assert_one_of(
            &com.statement(),
            &[
                "common test30\n{\n\tperm1\n\tperm2\n}",
                "common test30\n{\n\tperm2\n\tperm1\n}",
            ],
        );
    }

    #[test]
    fn common_contains() {
        let com = Common::new("test40", ["perm1", "perm2"]);
        assert!(com.contains("perm1"));
        assert!(!com.contains("perm3"));
    }

    #[test]
    fn class_string() {
        let cls = mock_class("test10", &["perm1", "perm2"], &[]);
        assert_eq!(cls.to_string(), "test10");
    }

    #[test]
    fn class_perms_include_common() {
        let cls = mock_class("test20", &["perm1", "perm2"], &["perm3", "perm4"]);
        assert_eq!(
            cls.perms(),
            BTreeSet::from(["perm1", "perm2", "perm3", "perm4"])
        );
        assert_eq!(cls.own_perms().len(), 2);
        assert_eq!(cls.common().map(|c| c.name()), Some("test20_common"));
    }

    #[test]
    fn class_statement_no_common() {
        let cls = mock_class("test30", &["perm1", "perm2"], &[]);
        assert_one_of(
            &cls.statement(),
            &[
                "class test30\n{\n\tperm1\n\tperm2\n}",
                "class test30\n{\n\tperm2\n\tperm1\n}",
            ],
        );
    }

    #[test]
    fn class_statement_with_common() {
        let cls = mock_class("test31", &["perm1", "perm2"], &["perm3", "perm4"]);
        assert_one_of(
            &cls.statement(),
            &[
                "class test31\ninherits test31_common\n{\n\tperm1\n\tperm2\n}",
                "class test31\ninherits test31_common\n{\n\tperm2\n\tperm1\n}",
            ],
        );
    }

    #[test]
    fn class_statement_common_only() {
        let cls = mock_class("test32", &[], &["perm3", "perm4"]);
        assert_eq!(cls.statement(), "class test32\ninherits test32_common");

        let base = Rc::new(Common::new("base", ["p3"]));
        let cls = ObjectClass::new("cls1", Vec::<String>::new(), Some(base));
        assert_eq!(cls.statement(), "class cls1\ninherits base");
    }

    #[test]
    fn class_statement_empty() {
        let cls = mock_class("test33", &[], &[]);
        assert_eq!(cls.statement(), "class test33");
    }

    #[test]
    fn class_contains() {
        let cls = mock_class("test40", &["perm1", "perm2"], &[]);
        assert!(cls.contains("perm1"));
        assert!(!cls.contains("perm3"));

        let cls = mock_class("test41", &["perm1", "perm2"], &["perm3", "perm4"]);
        for p in ["perm1", "perm2", "perm3", "perm4"] {
            assert!(cls.contains(p), "{} missing", p);
        }
        assert!(!cls.contains("perm5"));
    }

    #[test]
    fn class_cil() {
        let cls = mock_class("file", &["read"], &["ioctl"]);
        let cil: Vec<String> = cls.to_cil().iter().map(display_cil).collect();
        assert_eq!(
            cil,
            vec![
                "(class file (read))".to_string(),
                "(classcommon file file_common)".to_string()
            ]
        );
        let com = Common::new("file_common", ["ioctl"]);
        assert_eq!(display_cil(&com.to_cil()), "(common file_common (ioctl))");
    }
}
