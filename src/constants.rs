// Copyright (c) Microsoft Corporation.
// SPDX-License-Identifier: MIT
pub const ALLOW_RULE_NAME: &str = "allow";
pub const NEVERALLOW_RULE_NAME: &str = "neverallow";
pub const AUDITALLOW_RULE_NAME: &str = "auditallow";
pub const DONTAUDIT_RULE_NAME: &str = "dontaudit";
pub const TYPE_TRANSITION_RULE_NAME: &str = "type_transition";
pub const TYPE_CHANGE_RULE_NAME: &str = "type_change";
pub const TYPE_MEMBER_RULE_NAME: &str = "type_member";

pub const AV_RULES: &[&str] = &[
    ALLOW_RULE_NAME,
    NEVERALLOW_RULE_NAME,
    AUDITALLOW_RULE_NAME,
    DONTAUDIT_RULE_NAME,
];

#[cfg(test)]
pub const TE_RULES: &[&str] = &[
    TYPE_TRANSITION_RULE_NAME,
    TYPE_CHANGE_RULE_NAME,
    TYPE_MEMBER_RULE_NAME,
];

// CIL spellings.  The AV rules share their policy language keyword.
pub const CIL_TYPE_TRANSITION: &str = "typetransition";
pub const CIL_TYPE_CHANGE: &str = "typechange";
pub const CIL_TYPE_MEMBER: &str = "typemember";

pub const CIL_COMMON: &str = "common";
pub const CIL_CLASS: &str = "class";
pub const CIL_CLASSCOMMON: &str = "classcommon";
pub const CIL_TYPE: &str = "type";
pub const CIL_TYPEATTRIBUTE: &str = "typeattribute";
pub const CIL_BOOLEANIF: &str = "booleanif";
pub const CIL_TRUE: &str = "true";
pub const CIL_FALSE: &str = "false";

pub const CIL_AND: &str = "and";
pub const CIL_OR: &str = "or";
pub const CIL_XOR: &str = "xor";
pub const CIL_EQ: &str = "eq";
pub const CIL_NEQ: &str = "neq";
pub const CIL_NOT: &str = "not";

// Rules may name "self" as their target without declaring it
pub const SELF_TYPE: &str = "self";
