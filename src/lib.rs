// Copyright (c) Microsoft Corporation.
// SPDX-License-Identifier: MIT
#![allow(clippy::new_without_default)]

//! A semantic model of SELinux policy classes and type enforcement rules
//!
//! A [`Policy`] is built from already resolved declarations, either through a
//! [`PolicyBuilder`] or by loading CIL source with [`load_policy`].  Commons and object classes
//! are looked up through the policy, which hands out one shared instance per name.  TE and AV
//! rules are wrapped in [`TERule`], which guards access to the attributes that only exist for
//! some rule types and renders rules back into policy language statements.

extern crate thiserror;

pub mod boolcond;
mod cil;
mod constants;
pub mod error;
pub mod objclass;
pub mod policy;
mod sexp_internal;
pub mod terule;
pub mod typeattr;
pub mod warning;

#[cfg(test)]
mod test;

use tracing::debug;

use crate::error::PolicyErrors;
pub use crate::objclass::{Common, ObjectClass};
pub use crate::policy::{Policy, PolicyBuilder, SymbolKey};
pub use crate::sexp_internal::display_cil;
pub use crate::terule::{validate_ruletype, RuleRecord, RuleType, TERule};
pub use crate::typeattr::TypeOrAttr;
pub use crate::warning::Warnings;

/// Load one policy out of several CIL files
///
/// Declarations from any of the files may be used by rules in any other.
/// Returns a Result containing either the policy and any warnings raised while loading, or a
/// list of errors.
pub fn load_policy(input_files: Vec<&str>) -> Result<(Policy, Warnings), PolicyErrors> {
    let mut errors = PolicyErrors::new();
    let mut sources = Vec::new();
    for f in input_files {
        let policy_str = match std::fs::read_to_string(f) {
            Ok(s) => s,
            Err(e) => {
                errors.add_error(e);
                continue;
            }
        };
        match cil::parse_source(f, policy_str) {
            Ok(s) => {
                debug!("{}: {} statements", f, s.statement_count());
                sources.push(s);
            }
            Err(e) => errors.append(e),
        }
    }

    // Stops if something went wrong for this major step.
    errors = errors.into_result_self()?;

    let mut warnings = Warnings::new();
    let policy = cil::load_sources(&sources)?.inner(&mut warnings);
    errors.into_result((policy, warnings))
}

/// Load a policy out of CIL source held in memory.  `name` is used in diagnostics.
pub fn load_policy_str(name: &str, contents: &str) -> Result<(Policy, Warnings), PolicyErrors> {
    let source = cil::parse_source(name, contents.to_string())?;
    let mut warnings = Warnings::new();
    let policy = cil::load_sources(&[source])?.inner(&mut warnings);
    Ok((policy, warnings))
}
