//! Permission rules: map archive names to (mode, uid, gid).
//!
//! Rule text is `REGEX=MODE[:UID[:GID]]` with octal numeric fields, split at
//! the last `=` so the regex part may itself contain `=`. Rules come from the
//! command line first, then from an optional rule file (one rule per line,
//! blank lines skipped). A rule declared later takes priority over an earlier
//! one when both match, so the collected list is reversed once at build time
//! and resolution returns the first match in that reversed order.

use std::fs;
use std::path::Path;

use regex::Regex;

use crate::error::{Error, Result};
use crate::fsx;

/// One parsed rule. A rule whose text had no `=` keeps the default mode and
/// no pattern; it can never match and only exists so a sloppy rule line does
/// not fail the whole parse.
#[derive(Debug)]
pub struct PermissionRule {
    pattern: Option<Regex>,
    mode: u32,
    uid: Option<u64>,
    gid: Option<u64>,
}

/// Resolved attributes for one entry name.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResolvedPermissions {
    pub mode: u32,
    pub uid: Option<u64>,
    pub gid: Option<u64>,
}

/// The full rule set for one operation, ordered for matching.
///
/// Built once per operation and read-only afterwards; resolution is a pure
/// function of the rule list and the entry name.
#[derive(Debug, Default)]
pub struct PermissionMap {
    rules: Vec<PermissionRule>,
}

impl PermissionMap {
    /// Build the map from CLI rule strings and an optional rule file.
    pub fn load(rule_strings: &[String], rule_file: Option<&Path>) -> Result<Self> {
        let mut rules = Vec::new();
        for text in rule_strings {
            rules.push(parse_rule(text)?);
        }
        if let Some(path) = rule_file {
            for line in fs::read_to_string(path)?.lines() {
                if line.is_empty() {
                    continue;
                }
                rules.push(parse_rule(line)?);
            }
        }
        // Later declarations win: match in reverse declaration order.
        rules.reverse();
        Ok(Self { rules })
    }

    /// First matching rule in stored (reversed) order, else the default.
    pub fn resolve(&self, name: &str, default_mode: u32) -> ResolvedPermissions {
        for rule in &self.rules {
            if let Some(re) = &rule.pattern {
                if re.is_match(name) {
                    return ResolvedPermissions {
                        mode: rule.mode,
                        uid: rule.uid,
                        gid: rule.gid,
                    };
                }
            }
        }
        ResolvedPermissions {
            mode: default_mode,
            uid: None,
            gid: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

fn parse_rule(text: &str) -> Result<PermissionRule> {
    let Some(idx) = text.rfind('=') else {
        // No delimiter: degrade to an inert default element.
        return Ok(PermissionRule {
            pattern: None,
            mode: fsx::DEFAULT_FILE_MODE,
            uid: None,
            gid: None,
        });
    };
    let pattern = Regex::new(&text[..idx]).map_err(|source| Error::Regex {
        pattern: text[..idx].to_string(),
        source,
    })?;
    let mut fields = text[idx + 1..].split(':');
    let mode = parse_octal(text, fields.next().unwrap_or(""))? as u32;
    let uid = fields.next().map(|f| parse_octal(text, f)).transpose()?;
    let gid = fields.next().map(|f| parse_octal(text, f)).transpose()?;
    Ok(PermissionRule {
        pattern: Some(pattern),
        mode,
        uid,
        gid,
    })
}

fn parse_octal(rule: &str, field: &str) -> Result<u64> {
    u64::from_str_radix(field, 8).map_err(|_| Error::PermissionRule {
        rule: rule.to_string(),
        field: field.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn map(rules: &[&str]) -> PermissionMap {
        let rules: Vec<String> = rules.iter().map(|s| s.to_string()).collect();
        PermissionMap::load(&rules, None).unwrap()
    }

    #[test]
    fn later_declaration_wins_on_tie() {
        let map = map(&["a.*=0640", "a.*=0600"]);
        assert_eq!(map.resolve("afile", 0o644).mode, 0o600);
    }

    #[test]
    fn first_declared_still_matches_when_later_does_not() {
        let map = map(&["a.*=0640", "b.*=0600"]);
        assert_eq!(map.resolve("afile", 0o644).mode, 0o640);
        assert_eq!(map.resolve("bfile", 0o644).mode, 0o600);
    }

    #[test]
    fn unmatched_name_gets_the_default() {
        let map = map(&["bin/.*=0755"]);
        let resolved = map.resolve("docs/readme", 0o644);
        assert_eq!(
            resolved,
            ResolvedPermissions {
                mode: 0o644,
                uid: None,
                gid: None
            }
        );
    }

    #[test]
    fn uid_and_gid_fields_are_octal() {
        let map = map(&[".*=0644:1750:144"]);
        let resolved = map.resolve("x", 0o600);
        assert_eq!(resolved.mode, 0o644);
        assert_eq!(resolved.uid, Some(0o1750));
        assert_eq!(resolved.gid, Some(0o144));
    }

    #[test]
    fn rule_without_delimiter_is_inert() {
        let map = map(&["oops"]);
        assert_eq!(map.resolve("oops", 0o755).mode, 0o755);
    }

    #[test]
    fn regex_may_contain_equals() {
        let map = map(&["a=b.*=0600"]);
        assert_eq!(map.resolve("a=bc", 0o644).mode, 0o600);
    }

    #[test]
    fn bad_octal_field_is_an_error() {
        let rules = vec!["a.*=09".to_string()];
        let err = PermissionMap::load(&rules, None).unwrap_err();
        assert!(matches!(err, Error::PermissionRule { .. }));
    }

    #[test]
    fn rule_file_lines_follow_cli_rules() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "a.*=0600").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "a.*=0400").unwrap();
        let rules = vec!["a.*=0640".to_string()];
        let map = PermissionMap::load(&rules, Some(file.path())).unwrap();
        // The file's last line is the latest declaration overall.
        assert_eq!(map.resolve("afile", 0o644).mode, 0o400);
    }
}
