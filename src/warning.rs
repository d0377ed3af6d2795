// Copyright (c) Microsoft Corporation.
// SPDX-License-Identifier: MIT

//! Non fatal loader diagnostics
//!
//! Loading a policy skips what it doesn't model, such as roles, users or MLS statements, and
//! reports each skipped statement as a [`Warning`].  Loader passes return their result in a
//! [`WithWarnings`]; callers move the warnings into their own [`Warnings`] with
//! [`WithWarnings::inner`] and keep going.

use codespan_reporting::diagnostic::Severity;
use codespan_reporting::files::SimpleFile;
use std::ops::Range;
use termcolor::ColorChoice;

use crate::error::LoadError;

/// A diagnostic of warning severity attached to a statement of a source file
#[derive(Clone, Debug)]
pub struct Warning {
    diagnostic: LoadError,
}

impl Warning {
    pub fn new(
        msg: &str,
        file: &SimpleFile<String, String>,
        range: Range<usize>,
        help: &str,
    ) -> Self {
        let mut diagnostic = LoadError::new(msg, file, Some(range), help);
        diagnostic.diagnostic.inner.severity = Severity::Warning;
        Warning { diagnostic }
    }

    /// A statement whose keyword the loader has no model for
    pub fn unsupported_statement(
        file: &SimpleFile<String, String>,
        range: Range<usize>,
        keyword: &str,
    ) -> Self {
        Warning::new(
            "Unsupported statement skipped",
            file,
            range,
            &format!("{} statements are not modeled", keyword),
        )
    }

    pub fn message(&self) -> &str {
        &self.diagnostic.diagnostic.inner.message
    }

    pub fn file_name(&self) -> &str {
        self.diagnostic.file.name()
    }

    pub fn print_diagnostic(&self, color: ColorChoice) {
        self.diagnostic.print_diagnostic(color)
    }
}

/// Warnings in the order they were raised
#[derive(Clone, Debug, Default)]
pub struct Warnings {
    warnings: Vec<Warning>,
}

impl Warnings {
    pub fn new() -> Self {
        Warnings::default()
    }

    pub fn append(&mut self, other: &mut Self) {
        self.warnings.append(&mut other.warnings)
    }

    pub fn push(&mut self, w: Warning) {
        self.warnings.push(w)
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn count(&self) -> usize {
        self.warnings.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Warning> {
        self.warnings.iter()
    }

    /// Render every warning to stderr
    pub fn print_warnings(&self, color: ColorChoice) {
        for w in &self.warnings {
            w.print_diagnostic(color)
        }
    }
}

/// A loader result together with the warnings raised while producing it
pub struct WithWarnings<T> {
    inner: T,
    warnings: Warnings,
}

impl<T> WithWarnings<T> {
    pub fn new(inner: T, warnings: Warnings) -> Self {
        WithWarnings { inner, warnings }
    }

    /// Move the warnings into `warnings` and return the result
    pub fn inner(mut self, warnings: &mut Warnings) -> T {
        warnings.append(&mut self.warnings);
        self.inner
    }

    pub fn add_warning(&mut self, warning: Warning) {
        self.warnings.push(warning);
    }
}

impl<T> From<T> for WithWarnings<T> {
    fn from(inner: T) -> Self {
        WithWarnings::new(inner, Warnings::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy_file() -> SimpleFile<String, String> {
        SimpleFile::new(
            "roles.cil".to_string(),
            "(type a) (role r) (user u)".to_string(),
        )
    }

    // Declares the type, skips the role and user statements
    fn load_statements(file: &SimpleFile<String, String>) -> WithWarnings<Vec<&'static str>> {
        let mut ret = WithWarnings::from(vec!["a"]);
        ret.add_warning(Warning::unsupported_statement(file, 9..17, "role"));
        ret.add_warning(Warning::unsupported_statement(file, 18..26, "user"));
        ret
    }

    #[test]
    fn unsupported_statement_warning() {
        let file = policy_file();
        let warn = Warning::unsupported_statement(&file, 9..17, "role");

        assert_eq!(warn.message(), "Unsupported statement skipped");
        assert_eq!(warn.file_name(), "roles.cil");
        assert_eq!(
            warn.diagnostic.diagnostic.inner.severity,
            Severity::Warning
        );
        assert_eq!(
            warn.diagnostic.diagnostic.inner.labels[0].message,
            "role statements are not modeled"
        );
    }

    #[test]
    fn warnings_move_to_caller() {
        let file = policy_file();
        let mut warnings = Warnings::new();
        warnings.push(Warning::new("Earlier warning", &file, 0..8, "here"));

        let types = load_statements(&file).inner(&mut warnings);

        assert_eq!(types, vec!["a"]);
        assert_eq!(warnings.count(), 3);
        let messages: Vec<&str> = warnings.iter().map(|w| w.message()).collect();
        assert_eq!(
            messages,
            vec![
                "Earlier warning",
                "Unsupported statement skipped",
                "Unsupported statement skipped"
            ]
        );
    }

    #[test]
    fn no_warnings() {
        let mut warnings = Warnings::new();
        let n = WithWarnings::from(3).inner(&mut warnings);
        assert_eq!(n, 3);
        assert!(warnings.is_empty());
    }
}
