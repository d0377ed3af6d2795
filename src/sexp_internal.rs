// Copyright (c) Microsoft Corporation.
// SPDX-License-Identifier: MIT
use sexp::*;

// the sexp crate doesn't treat foo and "foo" as separate strings, which we need
// The quoting behavior in the sexp crate automatically handles quoting in situations where the
// string contains a quote or a space, so we need to avoid those in order for this to work, but 1.
// We want to avoid those anyways and 2. The default behavior makes actually inserting a quoted
// string that wouldn't be automatically quoted impossible.
// https://github.com/cgaebel/sexp/issues/2
pub fn display_cil(expr: &sexp::Sexp) -> String {
    match expr {
        Sexp::List(l) => {
            format!(
                "({})",
                l.iter()
                    .map(display_cil)
                    .collect::<Vec<String>>()
                    .join(" ")
            )
        }
        Sexp::Atom(a) => match a {
            Atom::S(s) => s.to_string(),
            _ => a.to_string(),
        },
    }
}

/// The identifier held by a string atom.  Numeric atoms don't keep their spelling, so they are
/// not identifiers.
pub fn atom_name(expr: &sexp::Sexp) -> Option<String> {
    match expr {
        Sexp::Atom(Atom::S(s)) => Some(s.clone()),
        Sexp::Atom(_) | Sexp::List(_) => None,
    }
}

pub fn quoted_atom(s: &str) -> Sexp {
    atom_s(&format!("\"{}\"", s))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_cil() {
        let cil = parse("(foo)").unwrap();
        assert_eq!(display_cil(&cil), cil.to_string());

        let cil = parse("(foo (bar baz))").unwrap();
        assert_eq!(display_cil(&cil), cil.to_string());

        let cil = parse("32").unwrap();
        assert_eq!(display_cil(&cil), cil.to_string());

        assert_eq!(display_cil(&quoted_atom("/bin")), "\"/bin\"".to_string());
    }

    #[test]
    fn test_atom_name() {
        assert_eq!(atom_name(&atom_s("read")), Some("read".to_string()));
        assert_eq!(atom_name(&parse("32").unwrap()), None);
        assert_eq!(atom_name(&parse("1.0").unwrap()), None);
        assert_eq!(atom_name(&parse("\"1.0\"").unwrap()), Some("1.0".to_string()));
        assert_eq!(atom_name(&parse("(read)").unwrap()), None);
    }
}
