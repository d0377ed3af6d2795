// Copyright (c) Microsoft Corporation.
// SPDX-License-Identifier: MIT
use std::collections::BTreeSet;
use std::rc::Rc;

use super::*;
use crate::error::{ErrorItem, LoadError, PolicyError};
use crate::typeattr::TypeFlavor;

const POLICIES_DIR: &str = "data/policies/";
const ERROR_POLICIES_DIR: &str = "data/error_policies/";

fn load_test_policy(filenames: &[&str]) -> (Policy, Warnings) {
    let paths: Vec<String> = filenames
        .iter()
        .map(|f| [POLICIES_DIR, f].concat())
        .collect();
    match load_policy(paths.iter().map(|s| s as &str).collect()) {
        Ok(p) => p,
        Err(e) => panic!("Loading {:?} failed with {}", filenames, e),
    }
}

fn rule_statements(policy: &Policy) -> Vec<String> {
    policy
        .terules()
        .unwrap()
        .iter()
        .map(|r| r.statement())
        .collect()
}

// Each expected entry lists the acceptable spellings of one statement.  Statements listing
// several permissions may name them in any order.
fn valid_policy_test(
    filenames: &[&str],
    expected_statements: &[&[&str]],
    expected_warn_count: usize,
) {
    let (policy, warnings) = load_test_policy(filenames);
    let statements = rule_statements(&policy);
    for alternatives in expected_statements {
        assert!(
            alternatives.iter().any(|s| statements.iter().any(|t| t == s)),
            "Policy does not contain {:?}. It contains {:#?}",
            alternatives,
            statements
        );
    }
    assert_eq!(statements.len(), expected_statements.len());
    assert_eq!(warnings.count(), expected_warn_count);
}

macro_rules! error_policy_test {
($filename:literal, $expected_error_count:literal, $error_pattern:pat_param $(if $guard:expr)?) => {
    let policy_file = [ERROR_POLICIES_DIR, $filename].concat();
    match load_policy(vec![&policy_file]) {
	Ok(_) => panic!("{} loaded successfully", $filename),
	Err(e) => {
	    assert_eq!(e.error_count(), $expected_error_count);
	    for error in e {
		assert!(matches!(error, $error_pattern $(if $guard)?));
	    }
	}
    }
}
}

#[test]
fn objclass_lookup_test() {
    let (policy, _) = load_test_policy(&["objclass.cil"]);

    let com = policy.lookup_common("com_a").unwrap();
    assert_eq!(com.name(), "com_a");
    let com2 = policy.lookup_common(&com).unwrap();
    assert!(Rc::ptr_eq(&com, &com2));

    let cls = policy.lookup_class("infoflow4").unwrap();
    assert!(Rc::ptr_eq(&policy.lookup_class(&cls).unwrap(), &cls));
    assert!(Rc::ptr_eq(cls.common().unwrap(), &com));

    assert_eq!(
        policy.lookup_common("INVALID").unwrap_err(),
        PolicyError::InvalidCommon("INVALID".to_string())
    );
    assert_eq!(
        policy.lookup_class("INVALID").unwrap_err(),
        PolicyError::InvalidClass("INVALID".to_string())
    );
}

#[test]
fn objclass_statements_test() {
    let (policy, _) = load_test_policy(&["objclass.cil"]);

    let cls = policy.lookup_class("infoflow6").unwrap();
    assert_eq!(
        cls.statement(),
        "class infoflow6\ninherits com_c\n{\n\thi_r\n}"
    );
    assert_eq!(
        cls.perms(),
        BTreeSet::from(["hi_c", "hi_r", "low_c", "low_w"])
    );

    let cls = policy.lookup_class("infoflow5").unwrap();
    assert_eq!(cls.statement(), "class infoflow5\ninherits com_b");
    assert!(cls.contains("low_b"));
    assert!(!cls.contains("low_a"));

    let cls = policy.lookup_class("infoflow7").unwrap();
    assert!(
        cls.statement() == "class infoflow7\n{\n\tsuper_w\n\tsuper_r\n}"
            || cls.statement() == "class infoflow7\n{\n\tsuper_r\n\tsuper_w\n}"
    );

    assert_eq!(policy.commons().unwrap().len(), 3);
    assert_eq!(policy.classes().unwrap().len(), 7);
    assert!(policy.terules().unwrap().is_empty());
}

#[test]
fn terule_policy_test() {
    valid_policy_test(
        &["terule.cil"],
        &[
            &["allow test1a test1b:infoflow hi_w;"],
            &[
                "auditallow test1a data:infoflow { hi_w low_r };",
                "auditallow test1a data:infoflow { low_r hi_w };",
            ],
            &["dontaudit domain self:infoflow2 hi_r;"],
            &["neverallow test2 data:infoflow low_w;"],
            &["type_transition test3_t test1b:process test3_new;"],
            &["type_change system test1b:infoflow test2;"],
            &["type_member system test1b:infoflow2 test2;"],
            &["type_transition test3_t test1b:infoflow test3_new \"file103\";"],
            &["allow test1a test1b:infoflow2 hi_r; [ b1 && !b2 ]"],
            &["type_transition test1a test1b:infoflow test2; [ b1 && !b2 ]"],
            &["dontaudit test1a test1b:infoflow low_r; [ b1 && !b2 ]"],
        ],
        0,
    );
}

#[test]
fn terule_attributes_test() {
    let (policy, _) = load_test_policy(&["terule.cil"]);
    let rules = policy.terules().unwrap();

    let attributes: Vec<&str> = policy
        .types()
        .filter(|t| t.flavor() == TypeFlavor::Attribute)
        .map(|t| t.name())
        .collect();
    assert_eq!(attributes, vec!["data", "domain"]);
    assert_eq!(policy.types().count(), 8);

    assert!(rules[1].target().is_attribute());
    assert!(rules[2].source().is_attribute());
    assert_eq!(rules[7].filename(), Ok("file103"));
    assert_eq!(
        rules[7].conditional(),
        Err(PolicyError::RuleNotConditional(RuleType::TypeTransition))
    );
    assert_eq!(
        rules[4].filename(),
        Err(PolicyError::TERuleNoFilename(RuleType::TypeTransition))
    );
    assert!(matches!(
        rules[5].filename(),
        Err(PolicyError::RuleUse { .. })
    ));
    assert_eq!(
        rules[8].conditional().unwrap().booleans(),
        BTreeSet::from(["b1", "b2"])
    );
    assert_eq!(rules[10].conditional_block(), Ok(false));

    for rule in &rules {
        if rule.ruletype().is_av() {
            assert!(rule.perms().is_ok());
            assert!(matches!(rule.default(), Err(PolicyError::RuleUse { .. })));
        } else {
            assert!(rule.default().is_ok());
            assert!(matches!(rule.perms(), Err(PolicyError::RuleUse { .. })));
        }
    }
}

#[test]
fn terule_filter_test() {
    let (policy, _) = load_test_policy(&["terule.cil"]);
    let rules = policy.terules_of(["dontaudit", "type_member"]).unwrap();
    assert_eq!(rules.len(), 3);
    assert_eq!(
        policy.terules_of(["role_transition"]).unwrap_err(),
        PolicyError::InvalidTERuleType("role_transition".to_string())
    );
}

#[test]
fn terule_cil_test() {
    let (policy, _) = load_test_policy(&["terule.cil"]);
    let cil: Vec<String> = policy
        .terules()
        .unwrap()
        .iter()
        .map(|r| display_cil(&r.to_cil()))
        .collect();
    assert_eq!(cil[0], "(allow test1a test1b (infoflow (hi_w)))");
    assert_eq!(
        cil[7],
        "(typetransition test3_t test1b infoflow \"file103\" test3_new)"
    );
    assert_eq!(
        cil[10],
        "(booleanif (and b1 (not b2)) (false (dontaudit test1a test1b (infoflow (low_r)))))"
    );

    // Rendered CIL loads back into the same rules
    let classes = "(class infoflow (hi_w hi_r low_w low_r)) (class infoflow2 (hi_w hi_r)) \
                   (class process (transition)) (typeattribute domain) (typeattribute data)";
    let types = "(type test1a) (type test1b) (type test2) (type test3_t) (type test3_new) \
                 (type system)";
    let rules = cil.join("\n");
    let reloaded = [classes, types, rules.as_str()].join("\n");
    let (reloaded, _) = load_policy_str("reloaded.cil", &reloaded).unwrap();
    assert_eq!(rule_statements(&reloaded), rule_statements(&policy));
}

#[test]
fn unsupported_statements_test() {
    valid_policy_test(
        &["unsupported.cil"],
        &[&["allow a self:file read;"]],
        3,
    );
}

#[test]
fn multiple_files_test() {
    valid_policy_test(
        &["split_rules.cil", "split_decls.cil"],
        &[
            &[
                "allow split_a split_b:file { getattr read };",
                "allow split_a split_b:file { read getattr };",
            ],
            &["type_transition split_a split_b:file split_a;"],
        ],
        0,
    );
}

#[test]
fn missing_file_test() {
    match load_policy(vec!["data/policies/does_not_exist.cil"]) {
        Ok(_) => panic!("Loaded a missing file"),
        Err(e) => {
            assert_eq!(e.error_count(), 1);
            for error in e {
                assert!(matches!(error, ErrorItem::IO(_)));
            }
        }
    }
}

#[test]
fn unknown_common_test() {
    error_policy_test!(
        "unknown_common.cil",
        1,
        ErrorItem::Load(LoadError { diagnostic: d, .. })
            if d.inner.message.contains("missing_common is not a valid common")
    );
}

#[test]
fn bad_rules_test() {
    error_policy_test!("bad_rules.cil", 4, ErrorItem::Load(_));
}

#[test]
fn unbalanced_test() {
    error_policy_test!(
        "unbalanced.cil",
        1,
        ErrorItem::Load(LoadError { diagnostic: d, .. })
            if d.inner.message == "Unbalanced parenthesis"
    );
}

#[test]
fn duplicates_test() {
    error_policy_test!(
        "duplicates.cil",
        3,
        ErrorItem::Load(LoadError { diagnostic: d, .. })
            if d.inner.message.contains("already exists")
    );
}

#[test]
fn filename_cond_test() {
    error_policy_test!(
        "filename_cond.cil",
        1,
        ErrorItem::Load(LoadError { diagnostic: d, .. })
            if d.inner.message.contains("cannot be conditional")
    );
}
