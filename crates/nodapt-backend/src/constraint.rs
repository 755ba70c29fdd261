use std::fmt;
use std::str::FromStr;

use semver::VersionReq;
use thiserror::Error;

use crate::types::{NodeVersion, strip_tag};

const INSTALLED_SENTINELS: [&str; 2] = ["installed", "current"];
const OPERATOR_CHARS: &[char] = &['<', '>', '=', '~', '^'];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed version constraint {input:?}: {details}")]
pub struct ConstraintError {
    pub input: String,
    pub details: String,
}

impl ConstraintError {
    fn new(input: &str, details: impl Into<String>) -> Self {
        Self {
            input: input.to_string(),
            details: details.into(),
        }
    }
}

/// A caller-supplied selector for a runtime version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionConstraint {
    /// One specific release; matches nothing else.
    Exact(NodeVersion),
    /// npm-style range; any of the `||` alternatives may match.
    Range {
        raw: String,
        alternatives: Vec<VersionReq>,
    },
    /// Whatever runtime was most recently used from the local store.
    Installed,
}

impl VersionConstraint {
    #[must_use]
    pub fn matches(&self, version: &NodeVersion) -> bool {
        match self {
            Self::Exact(expected) => expected == version,
            Self::Range { alternatives, .. } => alternatives
                .iter()
                .any(|req| req.matches(version.as_semver())),
            Self::Installed => true,
        }
    }
}

impl fmt::Display for VersionConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(version) => write!(f, "{version}"),
            Self::Range { raw, .. } => f.write_str(raw),
            Self::Installed => f.write_str(INSTALLED_SENTINELS[0]),
        }
    }
}

impl FromStr for VersionConstraint {
    type Err = ConstraintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        if raw.is_empty() {
            return Err(ConstraintError::new(s, "empty constraint"));
        }

        if INSTALLED_SENTINELS
            .iter()
            .any(|sentinel| raw.eq_ignore_ascii_case(sentinel))
        {
            return Ok(Self::Installed);
        }

        if let Ok(version) = raw.parse::<NodeVersion>() {
            return Ok(Self::Exact(version));
        }

        let alternatives = raw
            .split("||")
            .map(|alternative| {
                let normalized = normalize_alternative(alternative)
                    .map_err(|details| ConstraintError::new(raw, details))?;
                VersionReq::parse(&normalized)
                    .map_err(|error| ConstraintError::new(raw, error.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self::Range {
            raw: raw.to_string(),
            alternatives,
        })
    }
}

/// Rewrite one npm range alternative (`>=14 <16`, `1.2 - 2`, `14.x`) into the
/// comma-separated comparator syntax understood by `semver`.
fn normalize_alternative(alternative: &str) -> Result<String, String> {
    let tokens = merge_operators(alternative.split_whitespace());
    let mut comparators = Vec::new();
    let mut index = 0;

    while index < tokens.len() {
        if index + 2 < tokens.len() && tokens[index + 1] == "-" {
            comparators.push(format!(">={}", strip_tag(&tokens[index])));
            comparators.push(format!("<={}", strip_tag(&tokens[index + 2])));
            index += 3;
            continue;
        }

        comparators.extend(expand_comparator(&tokens[index])?);
        index += 1;
    }

    if comparators.is_empty() {
        comparators.push(">=0.0.0".to_string());
    }

    Ok(comparators.join(", "))
}

/// Join bare operators with the version that follows them (`>= 14` → `>=14`).
fn merge_operators<'a>(tokens: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut merged = Vec::new();
    let mut pending = String::new();

    for token in tokens {
        if token.chars().all(|c| OPERATOR_CHARS.contains(&c)) {
            pending.push_str(token);
        } else {
            merged.push(format!("{pending}{token}"));
            pending.clear();
        }
    }

    if !pending.is_empty() {
        merged.push(pending);
    }

    merged
}

fn expand_comparator(token: &str) -> Result<Vec<String>, String> {
    let operator_len = token
        .find(|c: char| !OPERATOR_CHARS.contains(&c))
        .unwrap_or(token.len());
    let (operator, rest) = token.split_at(operator_len);
    let rest = strip_tag(rest);

    if rest.is_empty() {
        return Err(format!("operator {operator:?} has no version"));
    }

    if !operator.is_empty() {
        return Ok(vec![format!("{operator}{rest}")]);
    }

    if semver::Version::parse(rest).is_ok() {
        return Ok(vec![format!("={rest}")]);
    }

    expand_partial(rest)
}

/// Bare partial versions and x-ranges pin every component given and leave the
/// rest open: `14` → `>=14.0.0, <15.0.0`, `14.17.x` → `>=14.17.0, <14.18.0`.
fn expand_partial(partial: &str) -> Result<Vec<String>, String> {
    let is_wildcard = |part: &str| matches!(part, "x" | "X" | "*");
    let mut numbers = Vec::new();

    for part in partial.split('.') {
        if is_wildcard(part) {
            break;
        }
        let number = part
            .parse::<u64>()
            .map_err(|_| format!("invalid version component {part:?}"))?;
        numbers.push(number);
    }

    if partial.split('.').count() > 3 {
        return Err(format!("too many version components in {partial:?}"));
    }

    Ok(match numbers.as_slice() {
        [] => vec![">=0.0.0".to_string()],
        [major] => vec![
            format!(">={major}.0.0"),
            format!("<{}.0.0", major + 1),
        ],
        [major, minor] => vec![
            format!(">={major}.{minor}.0"),
            format!("<{major}.{}.0", minor + 1),
        ],
        [major, minor, patch] => vec![format!("={major}.{minor}.{patch}")],
        _ => return Err(format!("too many version components in {partial:?}")),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn version(s: &str) -> NodeVersion {
        s.parse().expect("valid version in test")
    }

    fn constraint(s: &str) -> VersionConstraint {
        s.parse().expect("valid constraint in test")
    }

    #[test]
    fn full_versions_are_exact() {
        assert_eq!(
            constraint("v14.17.0"),
            VersionConstraint::Exact(version("14.17.0"))
        );
        assert_eq!(
            constraint(" 14.17.0 "),
            VersionConstraint::Exact(version("14.17.0"))
        );
    }

    #[test]
    fn sentinel_is_case_insensitive() {
        assert_eq!(constraint("installed"), VersionConstraint::Installed);
        assert_eq!(constraint("CURRENT"), VersionConstraint::Installed);
    }

    #[test]
    fn caret_range_matches_same_major() {
        let c = constraint("^14.0.0");
        assert!(c.matches(&version("14.21.3")));
        assert!(!c.matches(&version("15.0.0")));
        assert!(!c.matches(&version("13.9.0")));
    }

    #[test]
    fn npm_space_separated_comparators() {
        let c = constraint(">=14 <16");
        assert!(c.matches(&version("14.0.0")));
        assert!(c.matches(&version("15.9.1")));
        assert!(!c.matches(&version("16.0.0")));

        let spaced = constraint(">= 14.17.0");
        assert!(spaced.matches(&version("20.0.0")));
        assert!(!spaced.matches(&version("14.16.9")));
    }

    #[test]
    fn alternatives_match_any() {
        let c = constraint("^14.17.0 || >=16.13.0");
        assert!(c.matches(&version("14.18.0")));
        assert!(c.matches(&version("18.0.0")));
        assert!(!c.matches(&version("16.0.0")));
    }

    #[test]
    fn hyphen_range_is_inclusive() {
        let c = constraint("14.0.0 - 16.0.0");
        assert!(c.matches(&version("14.0.0")));
        assert!(c.matches(&version("16.0.0")));
        assert!(!c.matches(&version("16.0.1")));
    }

    #[test]
    fn partial_and_wildcard_versions() {
        let major = constraint("14");
        assert!(major.matches(&version("14.21.3")));
        assert!(!major.matches(&version("15.0.0")));

        let minor = constraint("v14.17");
        assert!(minor.matches(&version("14.17.6")));
        assert!(!minor.matches(&version("14.18.0")));

        let x_range = constraint("16.x");
        assert!(x_range.matches(&version("16.20.2")));
        assert!(!x_range.matches(&version("17.0.0")));

        assert!(constraint("*").matches(&version("22.1.0")));
    }

    #[test]
    fn ranges_exclude_prereleases_unless_requested() {
        let c = constraint("^22.0.0");
        assert!(!c.matches(&version("22.1.0-rc.1")));

        let pre = constraint(">=22.0.0-rc.1");
        assert!(pre.matches(&version("22.0.0-rc.2")));
    }

    #[test]
    fn display_keeps_raw_range() {
        assert_eq!(constraint(" >=14 <16 ").to_string(), ">=14 <16");
        assert_eq!(constraint("14.17.0").to_string(), "v14.17.0");
    }

    #[test]
    fn malformed_input_is_rejected() {
        for input in ["", "   ", "not-a-version", ">=", "1.2.3.4", "^abc"] {
            let error = input.parse::<VersionConstraint>().unwrap_err();
            assert_eq!(error.input, input, "input {input:?}");
        }
    }
}
