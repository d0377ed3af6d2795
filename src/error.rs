// Copyright (c) Microsoft Corporation.
// SPDX-License-Identifier: MIT
use codespan_reporting::diagnostic::{Diagnostic, Label};
use codespan_reporting::files::SimpleFile;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};
use std::fmt;
use std::io;
use std::ops::Range;
use thiserror::Error;

use crate::terule::RuleType;

/// Errors returned while querying a loaded policy.
///
/// Each kind is distinct so that callers can tell a misused attribute apart from data that is
/// simply absent on a particular rule.
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum PolicyError {
    #[error("{0} is not a valid common")]
    InvalidCommon(String),
    #[error("{0} is not a valid object class")]
    InvalidClass(String),
    #[error("{0} is not a valid type or attribute")]
    InvalidType(String),
    #[error("{0} is not a valid TE rule type")]
    InvalidTERuleType(String),
    #[error("{attribute} does not apply to {ruletype} rules")]
    RuleUse {
        ruletype: RuleType,
        attribute: &'static str,
    },
    #[error("{0} rule is not conditional")]
    RuleNotConditional(RuleType),
    #[error("{0} rule does not have a filename")]
    TERuleNoFilename(RuleType),
    #[error("Not a rule record: {0}")]
    InvalidRuleRecord(String),
    #[error("A {kind} named {name} already exists")]
    DuplicateDeclaration { kind: &'static str, name: String },
}

#[derive(Error, Clone, Debug)]
#[error("{diagnostic}")]
pub struct LoadError {
    pub diagnostic: Diag,
    pub file: SimpleFile<String, String>,
}

#[derive(Clone, Debug)]
pub struct Diag {
    pub inner: Diagnostic<()>,
}

impl From<Diagnostic<()>> for Diag {
    fn from(d: Diagnostic<()>) -> Self {
        Self { inner: d }
    }
}

impl fmt::Display for Diag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.inner.message)
    }
}

impl LoadError {
    pub fn new(
        msg: &str,
        file: &SimpleFile<String, String>,
        range: Option<Range<usize>>,
        help: &str,
    ) -> Self {
        let diagnostic = Diagnostic::error().with_message(msg);

        let diagnostic = match range {
            None => diagnostic,
            Some(r) => diagnostic.with_labels(vec![Label::primary((), r).with_message(help)]),
        };
        LoadError {
            diagnostic: diagnostic.into(),
            file: file.clone(),
        }
    }

    /// Wrap a query error raised while validating a statement of a source file
    pub fn from_policy_error(
        error: &PolicyError,
        file: &SimpleFile<String, String>,
        range: Range<usize>,
    ) -> Self {
        let help = match error {
            PolicyError::InvalidRuleRecord(_) => "This is not a well formed rule",
            PolicyError::DuplicateDeclaration { .. } => "Duplicate declaration",
            _ => "Referenced here",
        };
        LoadError::new(&error.to_string(), file, Some(range), help)
    }

    pub fn print_diagnostic(&self, color: ColorChoice) {
        let writer = StandardStream::stderr(color);
        let config = term::Config::default();
        // Ignores print errors.
        let _ = term::emit(
            &mut writer.lock(),
            &config,
            &self.file,
            &self.diagnostic.inner,
        );
    }
}

#[derive(Error, Debug)]
pub enum ErrorItem {
    #[error("Load error: {0}")]
    Load(#[from] LoadError),
    #[error("Policy error: {0}")]
    Policy(#[from] PolicyError),
    #[error("I/O error: {0}")]
    IO(#[from] io::Error),
}

impl From<ErrorItem> for Vec<ErrorItem> {
    fn from(error: ErrorItem) -> Self {
        vec![error]
    }
}

#[derive(Error, Debug)]
pub struct PolicyErrors {
    errors: Vec<ErrorItem>,
}

impl PolicyErrors {
    pub fn new() -> Self {
        PolicyErrors { errors: Vec::new() }
    }

    pub fn add_error<T>(&mut self, error: T)
    where
        T: Into<ErrorItem>,
    {
        self.errors.push(error.into());
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn append(&mut self, mut other: PolicyErrors) {
        self.errors.append(&mut other.errors);
    }

    pub fn into_result_with<F, T>(self, ok_with: F) -> Result<T, PolicyErrors>
    where
        F: FnOnce() -> T,
    {
        if self.is_empty() {
            Ok(ok_with())
        } else {
            Err(self)
        }
    }

    pub fn into_result<T>(self, ok: T) -> Result<T, PolicyErrors> {
        self.into_result_with(|| ok)
    }

    /// Enables to easily stop a workflow after a failed major step.  This is
    /// useful to avoid accumulating more errors that may be hard to understand
    /// because of unsatisfied prerequiste.
    ///
    /// For a multi-step workflow, it works as follow:
    /// 1. creates an accumulator with `let mut errors = PolicyErrors::new();`
    /// 2. within a major step accumulate errors with `errors.add_error(e);`
    /// 3. between major steps check for any errors with `errors =
    ///    errors.into_result_self()?;` which returns `Err(self)` if there are
    ///    any. If there aren't, just keep the empty list and proceed.
    pub fn into_result_self(self) -> Result<Self, Self> {
        if self.is_empty() {
            Ok(self)
        } else {
            Err(self)
        }
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }
}

impl From<ErrorItem> for PolicyErrors {
    fn from(error: ErrorItem) -> Self {
        PolicyErrors {
            errors: vec![error],
        }
    }
}

impl From<LoadError> for PolicyErrors {
    fn from(error: LoadError) -> Self {
        PolicyErrors::from(ErrorItem::from(error))
    }
}

impl From<PolicyError> for PolicyErrors {
    fn from(error: PolicyError) -> Self {
        PolicyErrors::from(ErrorItem::from(error))
    }
}

impl From<io::Error> for PolicyErrors {
    fn from(error: io::Error) -> Self {
        PolicyErrors::from(ErrorItem::from(error))
    }
}

impl Iterator for PolicyErrors {
    type Item = ErrorItem;
    fn next(&mut self) -> Option<Self::Item> {
        if self.errors.is_empty() {
            None
        } else {
            Some(self.errors.remove(0))
        }
    }
}

impl fmt::Display for PolicyErrors {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let num_errors = self.errors.len();
        let s = match num_errors {
            0 => return writeln!(f, "no error"),
            1 => "",
            _ => "s",
        };
        writeln!(f, "{} error{}:", num_errors, s)?;
        for (i, e) in self.errors.iter().enumerate() {
            writeln!(f, "{}: {}", i + 1, e)?
        }
        Ok(())
    }
}
