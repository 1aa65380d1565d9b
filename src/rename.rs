//! Entry name rewriting via regex substitution.
//!
//! The same transform runs in both directions of the pipeline: it names
//! entries while an archive is created and picks destination paths while one
//! is extracted. Replacements may reference capture groups as `\1`, `\2`, …

use regex::Regex;

use crate::error::{Error, Result};

/// A compiled rename rule. With no pattern or no replacement it passes names
/// through unchanged.
#[derive(Debug, Default)]
pub struct Rename {
    rule: Option<(Regex, String)>,
}

impl Rename {
    pub fn new(pattern: Option<&str>, replacement: Option<&str>) -> Result<Self> {
        let rule = match (pattern, replacement) {
            (Some(pat), Some(rep)) if !pat.is_empty() && !rep.is_empty() => {
                let re = Regex::new(pat).map_err(|source| Error::Regex {
                    pattern: pat.to_string(),
                    source,
                })?;
                Some((re, expand_backreferences(rep)))
            }
            _ => None,
        };
        Ok(Self { rule })
    }

    /// Apply the substitution to every match in `name`.
    pub fn apply(&self, name: &str) -> String {
        match &self.rule {
            Some((re, rep)) => re.replace_all(name, rep.as_str()).into_owned(),
            None => name.to_string(),
        }
    }
}

/// Translate `\1`-style backreferences into the `${1}` syntax the regex crate
/// expands, and neutralize literal `$` so it is never treated as a capture.
fn expand_backreferences(replacement: &str) -> String {
    let mut out = String::with_capacity(replacement.len());
    let mut chars = replacement.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '$' => out.push_str("$$"),
            '\\' => match chars.peek() {
                Some(d) if d.is_ascii_digit() => {
                    out.push_str("${");
                    while let Some(d) = chars.peek().filter(|d| d.is_ascii_digit()) {
                        out.push(*d);
                        chars.next();
                    }
                    out.push('}');
                }
                // `\\` escapes a literal backslash.
                Some('\\') => {
                    out.push('\\');
                    chars.next();
                }
                _ => out.push('\\'),
            },
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_matching_suffix() {
        let rename = Rename::new(Some(r"\.txt$"), Some(".md")).unwrap();
        assert_eq!(rename.apply("abc.txt"), "abc.md");
    }

    #[test]
    fn empty_pattern_is_identity() {
        let rename = Rename::new(Some(""), Some(".md")).unwrap();
        assert_eq!(rename.apply("abc.txt"), "abc.txt");
        let rename = Rename::new(None, None).unwrap();
        assert_eq!(rename.apply("abc.txt"), "abc.txt");
    }

    #[test]
    fn numbered_backreferences_expand() {
        let rename = Rename::new(Some(r"([^/]+)\.txt$"), Some(r"\1.md")).unwrap();
        assert_eq!(rename.apply("dir/name.txt"), "dir/name.md");
    }

    #[test]
    fn dollar_in_replacement_is_literal() {
        let rename = Rename::new(Some("x"), Some("$1")).unwrap();
        assert_eq!(rename.apply("x"), "$1");
    }

    #[test]
    fn replaces_every_occurrence() {
        let rename = Rename::new(Some("-"), Some("_")).unwrap();
        assert_eq!(rename.apply("a-b-c"), "a_b_c");
    }

    #[test]
    fn invalid_pattern_is_an_error() {
        assert!(matches!(
            Rename::new(Some("("), Some("x")),
            Err(Error::Regex { .. })
        ));
    }
}
