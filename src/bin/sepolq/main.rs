// Copyright (c) Microsoft Corporation.
// SPDX-License-Identifier: MIT
use selinux_policyrep::error::{ErrorItem, PolicyErrors};
use selinux_policyrep::{display_cil, load_policy, validate_ruletype, Policy};

mod args;
use args::{Args, ColorArg};

use clap::Parser;
use is_terminal::IsTerminal;
use std::io::{Error, ErrorKind, Write};
use termcolor::ColorChoice;
use tracing::Level;
use walkdir::WalkDir;

fn main() -> std::io::Result<()> {
    let args = Args::parse();

    let level = match args.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = validate_ruletype(&args.ruletypes) {
        return Err(Error::new(ErrorKind::InvalidInput, e.to_string()));
    }

    let policies: Vec<String> = match get_policy_files(&args.input_file) {
        Ok(mut s) => {
            // Always treat files in the same order for determinism in loading
            // sort_unstable() does not preserve equality, which is fine because two
            // different files cannot have the same relative path
            s.sort_unstable();
            s
        }
        Err(e) => {
            eprintln!("{e}");
            return Err(e);
        }
    };
    if policies.is_empty() {
        // Files supplied on command line, but no .cil files found
        return Err(Error::new(
            ErrorKind::InvalidData,
            "No policy source files found",
        ));
    }

    // termcolor doesn't handle automatic terminal detection
    // https://docs.rs/termcolor/latest/termcolor/#detecting-presence-of-a-terminal
    let color = match args.color {
        Some(ColorArg::Always) => ColorChoice::Always,
        Some(ColorArg::Auto) | None => {
            if std::io::stderr().is_terminal() {
                ColorChoice::Auto
            } else {
                ColorChoice::Never
            }
        }
        Some(ColorArg::Never) => ColorChoice::Never,
    };

    match load_policy(policies.iter().map(|s| s as &str).collect()) {
        Err(error_list) => print_error(error_list, color),
        Ok((policy, warnings)) => {
            warnings.print_warnings(color);
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            match write_statements(&mut out, &policy, &args) {
                Ok(()) => Ok(()),
                Err(ErrorItem::IO(e)) => Err(e),
                Err(e) => {
                    eprintln!("{e}");
                    Err(Error::new(ErrorKind::InvalidData, "Invalid policy"))
                }
            }
        }
    }
}

fn write_statements<W: Write>(
    out: &mut W,
    policy: &Policy,
    args: &Args,
) -> Result<(), ErrorItem> {
    if args.commons {
        for com in policy.commons()? {
            if args.cil {
                writeln!(out, "{}", display_cil(&com.to_cil()))?;
            } else {
                writeln!(out, "{}", com.statement())?;
            }
        }
    }
    if args.classes {
        for cls in policy.classes()? {
            if args.cil {
                for stmt in cls.to_cil() {
                    writeln!(out, "{}", display_cil(&stmt))?;
                }
            } else {
                writeln!(out, "{}", cls.statement())?;
            }
        }
    }
    if args.show_rules() {
        let rules = if args.ruletypes.is_empty() {
            policy.terules()?
        } else {
            policy.terules_of(&args.ruletypes)?
        };
        for rule in rules {
            if args.cil {
                writeln!(out, "{}", display_cil(&rule.to_cil()))?;
            } else {
                writeln!(out, "{}", rule.statement())?;
            }
        }
    }
    Ok(())
}

fn print_error(error_list: PolicyErrors, color: ColorChoice) -> std::io::Result<()> {
    for e in error_list {
        if let ErrorItem::Load(l) = e {
            l.print_diagnostic(color);
        } else {
            eprintln!("{e}");
        }
    }
    Err(Error::new(ErrorKind::InvalidData, "Invalid policy"))
}

// Create a list of policy files
fn get_policy_files(filenames: &[String]) -> Result<Vec<String>, Error> {
    let mut policy_files = Vec::new();
    for file in filenames {
        for entry in WalkDir::new(file) {
            let entry = entry?;
            if entry.file_type().is_file() && entry.path().extension().unwrap_or_default() == "cil"
            {
                let filename = entry.path().display().to_string();
                policy_files.push(filename);
            }
        }
    }
    Ok(policy_files)
}
