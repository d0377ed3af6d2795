// Copyright (c) Microsoft Corporation.
// SPDX-License-Identifier: MIT

// Loads commons, classes, types and TE/AV rules out of CIL source.  Everything else CIL can
// express is skipped with a warning.

use sexp::{Atom, Sexp};
use std::convert::TryFrom;
use std::ops::Range;

use codespan_reporting::files::SimpleFile;
use tracing::{debug, trace};

use crate::boolcond::CondExpr;
use crate::constants;
use crate::error::{LoadError, PolicyError, PolicyErrors};
use crate::policy::{Policy, PolicyBuilder};
use crate::sexp_internal::atom_name;
use crate::terule::{RuleCond, RuleRecord, RuleType, TERule};
use crate::warning::{Warning, WithWarnings};

struct Statement {
    range: Range<usize>,
    sexp: Sexp,
}

impl Statement {
    fn keyword(&self) -> Option<&str> {
        match &self.sexp {
            Sexp::List(l) => match l.first() {
                Some(Sexp::Atom(Atom::S(k))) => Some(k.as_str()),
                _ => None,
            },
            Sexp::Atom(_) => None,
        }
    }

    fn args(&self) -> &[Sexp] {
        match &self.sexp {
            Sexp::List(l) if !l.is_empty() => &l[1..],
            _ => &[],
        }
    }
}

pub struct SourceFile {
    file: SimpleFile<String, String>,
    statements: Vec<Statement>,
}

impl SourceFile {
    pub fn statement_count(&self) -> usize {
        self.statements.len()
    }
}

/// Split CIL source into its top level statements
pub fn parse_source(name: &str, contents: String) -> Result<SourceFile, PolicyErrors> {
    let file = SimpleFile::new(name.to_string(), contents);
    let masked = mask_comments(file.source());

    let ranges = match split_statements(&masked) {
        Ok(r) => r,
        Err((msg, range, help)) => {
            return Err(LoadError::new(msg, &file, Some(range), help).into());
        }
    };

    let mut errors = PolicyErrors::new();
    let mut statements = Vec::new();
    for range in ranges {
        match sexp::parse(&quote_numeric_atoms(&masked[range.clone()])) {
            Ok(sexp) => statements.push(Statement { range, sexp }),
            Err(e) => errors.add_error(LoadError::new(
                "Malformed statement",
                &file,
                Some(range),
                &e.to_string(),
            )),
        }
    }
    debug!("Parsed {} statements from {}", statements.len(), name);
    errors.into_result(SourceFile { file, statements })
}

// Blank out comments, keeping every byte offset intact for diagnostics
fn mask_comments(contents: &str) -> String {
    let mut ret = String::with_capacity(contents.len());
    let mut in_quote = false;
    let mut escaped = false;
    let mut in_comment = false;
    for c in contents.chars() {
        if in_comment {
            if c == '\n' {
                in_comment = false;
                ret.push(c);
            } else {
                ret.extend(std::iter::repeat(' ').take(c.len_utf8()));
            }
            continue;
        }
        match c {
            _ if escaped => escaped = false,
            '\\' if in_quote => escaped = true,
            '"' => in_quote = !in_quote,
            ';' if !in_quote => {
                in_comment = true;
                ret.push(' ');
                continue;
            }
            _ => (),
        }
        ret.push(c);
    }
    ret
}

// The sexp parser turns atoms such as 1.0, 007 or inf into numbers, which loses their
// spelling.  CIL has no numeric atoms in the statements loaded here, so quote them to keep
// them as names.
fn quote_numeric_atoms(stmt: &str) -> String {
    let mut ret = String::with_capacity(stmt.len());
    let mut token = String::new();
    let mut in_quote = false;
    let mut escaped = false;

    fn flush(token: &mut String, out: &mut String) {
        if token.parse::<i64>().is_ok() || token.parse::<f64>().is_ok() {
            out.push('"');
            out.push_str(token);
            out.push('"');
        } else {
            out.push_str(token);
        }
        token.clear();
    }

    for c in stmt.chars() {
        if in_quote {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_quote = false,
                _ => (),
            }
            ret.push(c);
            continue;
        }
        match c {
            '(' | ')' | '"' => {
                flush(&mut token, &mut ret);
                in_quote = c == '"';
                ret.push(c);
            }
            c if c.is_whitespace() => {
                flush(&mut token, &mut ret);
                ret.push(c);
            }
            c => token.push(c),
        }
    }
    flush(&mut token, &mut ret);
    ret
}

fn split_statements(
    masked: &str,
) -> Result<Vec<Range<usize>>, (&'static str, Range<usize>, &'static str)> {
    let mut ret = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    let mut in_quote = false;
    let mut escaped = false;

    for (i, b) in masked.bytes().enumerate() {
        if in_quote {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_quote = false,
                _ => (),
            }
            continue;
        }
        match b {
            b'"' if depth > 0 => in_quote = true,
            b'(' => {
                if depth == 0 {
                    start = i;
                }
                depth += 1;
            }
            b')' => {
                if depth == 0 {
                    return Err((
                        "Unexpected closing parenthesis",
                        i..i + 1,
                        "No statement is open here",
                    ));
                }
                depth -= 1;
                if depth == 0 {
                    ret.push(start..i + 1);
                }
            }
            b if depth == 0 && !b.is_ascii_whitespace() => {
                return Err((
                    "Expected a statement",
                    i..i + 1,
                    "Statements must be enclosed in parentheses",
                ));
            }
            _ => (),
        }
    }

    if depth > 0 {
        return Err((
            "Unbalanced parenthesis",
            start..masked.len(),
            "This statement is never closed",
        ));
    }
    Ok(ret)
}

fn is_rule_keyword(keyword: &str) -> bool {
    keyword == constants::CIL_BOOLEANIF || RuleType::from_cil_keyword(keyword).is_some()
}

struct Loader<'a> {
    sources: &'a [SourceFile],
    builder: PolicyBuilder,
    errors: PolicyErrors,
    // Source location of each rule handed to the builder, in order
    rule_locations: Vec<(&'a SimpleFile<String, String>, Range<usize>)>,
}

impl<'a> Loader<'a> {
    fn new(sources: &'a [SourceFile]) -> Self {
        Loader {
            sources,
            builder: PolicyBuilder::new(),
            errors: PolicyErrors::new(),
            rule_locations: Vec::new(),
        }
    }

    fn take_errors(&mut self) -> PolicyErrors {
        std::mem::replace(&mut self.errors, PolicyErrors::new())
    }

    fn error(
        &mut self,
        file: &SimpleFile<String, String>,
        stmt: &Statement,
        msg: &str,
        help: &str,
    ) {
        self.errors
            .add_error(LoadError::new(msg, file, Some(stmt.range.clone()), help));
    }

    fn policy_error(
        &mut self,
        file: &SimpleFile<String, String>,
        range: Range<usize>,
        error: PolicyError,
    ) {
        self.errors
            .add_error(LoadError::from_policy_error(&error, file, range));
    }

    fn declarations(&mut self) -> WithWarnings<()> {
        let mut ret = WithWarnings::from(());
        let mut classcommons = Vec::new();

        for source in self.sources {
            let file = &source.file;
            for stmt in &source.statements {
                let keyword = match stmt.keyword() {
                    Some(k) => k,
                    None => {
                        self.error(
                            file,
                            stmt,
                            "Expected a statement keyword",
                            "Statements begin with a keyword",
                        );
                        continue;
                    }
                };
                let args = stmt.args();
                let res = match keyword {
                    constants::CIL_COMMON | constants::CIL_CLASS => match args {
                        [name, Sexp::List(perms)] => {
                            match (atom_name(name), perm_names(perms)) {
                                (Some(name), Some(perms)) => {
                                    if keyword == constants::CIL_COMMON {
                                        self.builder.add_common(&name, perms)
                                    } else {
                                        self.builder.add_class(&name, perms)
                                    }
                                }
                                _ => {
                                    self.error(
                                        file,
                                        stmt,
                                        "Malformed declaration",
                                        "Expected a name and a list of permissions",
                                    );
                                    continue;
                                }
                            }
                        }
                        _ => {
                            self.error(
                                file,
                                stmt,
                                "Malformed declaration",
                                "Expected a name and a list of permissions",
                            );
                            continue;
                        }
                    },
                    constants::CIL_CLASSCOMMON => {
                        match (args.get(0).and_then(atom_name), args.get(1).and_then(atom_name)) {
                            (Some(class), Some(common)) if args.len() == 2 => {
                                classcommons.push((file, stmt.range.clone(), class, common));
                                continue;
                            }
                            _ => {
                                self.error(
                                    file,
                                    stmt,
                                    "Malformed classcommon",
                                    "Expected a class name and a common name",
                                );
                                continue;
                            }
                        }
                    }
                    constants::CIL_TYPE | constants::CIL_TYPEATTRIBUTE => {
                        match (args, args.get(0).and_then(atom_name)) {
                            ([_], Some(name)) => {
                                if keyword == constants::CIL_TYPE {
                                    self.builder.add_type(&name)
                                } else {
                                    self.builder.add_attribute(&name)
                                }
                            }
                            _ => {
                                self.error(file, stmt, "Malformed declaration", "Expected a name");
                                continue;
                            }
                        }
                    }
                    k if is_rule_keyword(k) => continue,
                    k => {
                        trace!("Skipping {} statement", k);
                        ret.add_warning(Warning::unsupported_statement(
                            file,
                            stmt.range.clone(),
                            k,
                        ));
                        continue;
                    }
                };
                if let Err(e) = res {
                    self.policy_error(file, stmt.range.clone(), e);
                }
            }
        }

        // A class may be declared after its classcommon statement
        for (file, range, class, common) in classcommons {
            let res = if self.builder.has_common(&common) {
                self.builder.set_class_common(&class, &common)
            } else {
                Err(PolicyError::InvalidCommon(common))
            };
            if let Err(e) = res {
                self.policy_error(file, range, e);
            }
        }

        ret
    }

    fn rules(&mut self) {
        for source in self.sources {
            let file = &source.file;
            for stmt in &source.statements {
                match stmt.keyword() {
                    Some(constants::CIL_BOOLEANIF) => self.booleanif(file, stmt),
                    Some(k) if is_rule_keyword(k) => match RuleRecord::try_from(&stmt.sexp) {
                        Ok(record) => self.add_rule(file, stmt, record),
                        Err(e) => self.policy_error(file, stmt.range.clone(), e),
                    },
                    _ => (),
                }
            }
        }
    }

    fn booleanif(&mut self, file: &'a SimpleFile<String, String>, stmt: &Statement) {
        let (expr, branches) = match stmt.args().split_first() {
            Some((expr, branches)) if !branches.is_empty() => (expr, branches),
            _ => {
                self.error(
                    file,
                    stmt,
                    "Malformed booleanif",
                    "Expected a condition and at least one branch",
                );
                return;
            }
        };
        let expr = match CondExpr::try_from(expr) {
            Ok(e) => e,
            Err(e) => {
                self.policy_error(file, stmt.range.clone(), e);
                return;
            }
        };

        for branch in branches {
            let (truth, rules) = match branch {
                Sexp::List(l) => match l.split_first() {
                    Some((Sexp::Atom(Atom::S(b)), rules)) if b == constants::CIL_TRUE => {
                        (true, rules)
                    }
                    Some((Sexp::Atom(Atom::S(b)), rules)) if b == constants::CIL_FALSE => {
                        (false, rules)
                    }
                    _ => {
                        self.error(
                            file,
                            stmt,
                            "Malformed booleanif branch",
                            "Expected true or false",
                        );
                        continue;
                    }
                },
                Sexp::Atom(_) => {
                    self.error(
                        file,
                        stmt,
                        "Malformed booleanif branch",
                        "Expected true or false",
                    );
                    continue;
                }
            };
            for rule in rules {
                let record = RuleRecord::try_from(rule)
                    .and_then(|r| r.with_cond(RuleCond::new(expr.clone(), truth)));
                match record {
                    Ok(r) => self.add_rule(file, stmt, r),
                    Err(e) => self.policy_error(file, stmt.range.clone(), e),
                }
            }
        }
    }

    fn add_rule(
        &mut self,
        file: &'a SimpleFile<String, String>,
        stmt: &Statement,
        record: RuleRecord,
    ) {
        self.builder.add_rule(record);
        self.rule_locations.push((file, stmt.range.clone()));
    }
}

fn perm_names(perms: &[Sexp]) -> Option<Vec<String>> {
    perms.iter().map(atom_name).collect()
}

/// Build one policy out of the statements of all sources.
///
/// Declarations are collected from every source before any rule is resolved, so rules may
/// refer to declarations in other files.
pub fn load_sources(sources: &[SourceFile]) -> Result<WithWarnings<Policy>, PolicyErrors> {
    let mut loader = Loader::new(sources);
    let mut warnings = crate::Warnings::new();

    // Rules can't be resolved against inconsistent declarations
    loader.declarations().inner(&mut warnings);
    let mut errors = loader.take_errors().into_result_self()?;

    loader.rules();

    let Loader {
        builder,
        errors: rule_errors,
        rule_locations,
        ..
    } = loader;
    errors.append(rule_errors);

    let policy = match builder.build() {
        Ok(p) => p,
        Err(e) => {
            errors.add_error(e);
            return Err(errors);
        }
    };

    for (record, (file, range)) in policy.rule_records().iter().zip(rule_locations) {
        if let Err(e) = TERule::from_record(&policy, record) {
            errors.add_error(LoadError::from_policy_error(&e, file, range));
        }
    }

    errors.into_result(WithWarnings::new(policy, warnings))
}
