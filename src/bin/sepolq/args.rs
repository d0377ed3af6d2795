// Copyright (c) Microsoft Corporation.
// SPDX-License-Identifier: MIT
use clap::{ArgAction, Parser, ValueEnum};

#[derive(Parser, Debug)]
#[clap(author, version, name = "sepolq", about = "Query classes and type enforcement rules of CIL SELinux policies", long_about = None)]
pub struct Args {
    /// List of input files to process.  Directories are searched recursively.
    #[clap(required(true))]
    pub input_file: Vec<String>,
    /// Only show rules of this type, such as allow or type_transition.  May be repeated.
    #[clap(short = 't', long = "ruletype")]
    pub ruletypes: Vec<String>,
    /// Show common declarations
    #[clap(long)]
    pub commons: bool,
    /// Show object class declarations
    #[clap(long)]
    pub classes: bool,
    /// Print CIL instead of policy language statements
    #[clap(long)]
    pub cil: bool,
    #[clap(long, value_enum)]
    pub color: Option<ColorArg>,
    /// Increase logging verbosity.  May be repeated.
    #[clap(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Clone, Debug, ValueEnum)]
pub enum ColorArg {
    Always,
    Auto,
    Never,
}

impl Args {
    /// Rules are shown when asked for, or when nothing else was
    pub fn show_rules(&self) -> bool {
        !self.ruletypes.is_empty() || !(self.commons || self.classes)
    }
}
