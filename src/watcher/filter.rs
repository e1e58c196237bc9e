//! Inclusion filter deciding which paths take part in indexing.

use std::fmt;
use std::str::FromStr;

use globset::{Glob, GlobMatcher};
use regex::Regex;

use crate::error::WatcherError;
use crate::Result;

/// How an inclusion pattern is interpreted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PatternSyntax {
    /// Unanchored regular expression, matched anywhere in the path.
    #[default]
    Regex,
    /// Shell glob; `*` also crosses `/`.
    Glob,
}

impl FromStr for PatternSyntax {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "regex" | "regexp" => Ok(Self::Regex),
            "glob" => Ok(Self::Glob),
            other => Err(format!("unknown pattern syntax '{other}', expected regex or glob")),
        }
    }
}

impl fmt::Display for PatternSyntax {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Regex => f.write_str("regex"),
            Self::Glob => f.write_str("glob"),
        }
    }
}

#[derive(Debug, Clone)]
enum Matcher {
    All,
    Regex(Regex),
    Glob(GlobMatcher),
}

/// Stateless predicate over document paths.
///
/// An empty pattern matches everything.
#[derive(Debug, Clone)]
pub struct InclusionFilter {
    matcher: Matcher,
}

impl InclusionFilter {
    /// Compile a filter from a pattern.
    ///
    /// # Errors
    ///
    /// Returns an error if the pattern is not valid for `syntax`.
    pub fn new(pattern: &str, syntax: PatternSyntax) -> Result<Self> {
        if pattern.is_empty() {
            return Ok(Self::match_all());
        }

        let invalid = |reason: String| WatcherError::InvalidPattern {
            pattern: pattern.to_string(),
            reason,
        };

        let matcher = match syntax {
            PatternSyntax::Regex => {
                Matcher::Regex(Regex::new(pattern).map_err(|e| invalid(e.to_string()))?)
            }
            PatternSyntax::Glob => Matcher::Glob(
                Glob::new(pattern)
                    .map_err(|e| invalid(e.to_string()))?
                    .compile_matcher(),
            ),
        };

        Ok(Self { matcher })
    }

    /// A filter that accepts every path.
    #[must_use]
    pub const fn match_all() -> Self {
        Self {
            matcher: Matcher::All,
        }
    }

    /// Check whether `path` participates in indexing.
    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        match &self.matcher {
            Matcher::All => true,
            Matcher::Regex(re) => re.is_match(path),
            Matcher::Glob(glob) => glob.is_match(path),
        }
    }
}

impl Default for InclusionFilter {
    fn default() -> Self {
        Self::match_all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_pattern_matches_all() {
        for syntax in [PatternSyntax::Regex, PatternSyntax::Glob] {
            let filter = InclusionFilter::new("", syntax).unwrap();
            assert!(filter.matches("a.md"));
            assert!(filter.matches("deep/nested/file.bin"));
            assert!(filter.matches(""));
        }
    }

    #[test]
    fn test_regex_is_unanchored() {
        let filter = InclusionFilter::new(r"\.md$", PatternSyntax::Regex).unwrap();
        assert!(filter.matches("a.md"));
        assert!(filter.matches("docs/guide/intro.md"));
        assert!(!filter.matches("a.mdx"));
        assert!(!filter.matches("main.rs"));
    }

    #[test]
    fn test_regex_prefix() {
        let filter = InclusionFilter::new("^docs/", PatternSyntax::Regex).unwrap();
        assert!(filter.matches("docs/a.md"));
        assert!(!filter.matches("src/docs/a.md"));
    }

    #[test]
    fn test_glob_crosses_separators() {
        let filter = InclusionFilter::new("*.md", PatternSyntax::Glob).unwrap();
        assert!(filter.matches("a.md"));
        assert!(filter.matches("notes/2024/a.md"));
        assert!(!filter.matches("a.txt"));
    }

    #[test]
    fn test_invalid_patterns() {
        assert!(InclusionFilter::new("(", PatternSyntax::Regex).is_err());
        assert!(InclusionFilter::new("a[", PatternSyntax::Glob).is_err());
    }

    #[test]
    fn test_pattern_syntax_parse() {
        assert_eq!("regex".parse::<PatternSyntax>().unwrap(), PatternSyntax::Regex);
        assert_eq!("REGEXP".parse::<PatternSyntax>().unwrap(), PatternSyntax::Regex);
        assert_eq!("glob".parse::<PatternSyntax>().unwrap(), PatternSyntax::Glob);
        assert!("lua".parse::<PatternSyntax>().is_err());
        assert_eq!(PatternSyntax::Glob.to_string(), "glob");
    }
}
