//! Submodule match patterns
//!
//! Package specs may end in a pattern selecting which directory entries are
//! expanded into submodules. Only two shapes exist:
//!
//! - `*`    - every direct entry of the package directory
//! - `**.*` - every entry, recursing into matched sub-packages

use crate::resolver::ResolveError;
use std::fmt;

/// A parsed submodule pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Matcher {
    /// `*`
    Children,
    /// `**.*`
    Tree,
}

impl Matcher {
    /// Parse a pattern string, rejecting anything but `*` and `**.*`
    pub fn parse(pattern: &str) -> Result<Self, ResolveError> {
        let (recursive, rest) = match pattern.strip_prefix("**.") {
            Some(rest) => (true, rest),
            None => (false, pattern),
        };

        match (rest, recursive) {
            ("*", false) => Ok(Matcher::Children),
            ("*", true) => Ok(Matcher::Tree),
            _ => Err(ResolveError::UnsupportedPattern(pattern.to_string())),
        }
    }

    /// Whether this matcher descends into matched sub-packages
    pub fn is_recursive(&self) -> bool {
        matches!(self, Matcher::Tree)
    }

    /// Match a directory entry name.
    ///
    /// Returns `(matched, recursive)`.
    pub fn matches(&self, _entry: &str) -> (bool, bool) {
        (true, self.is_recursive())
    }
}

impl fmt::Display for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Matcher::Children => write!(f, "*"),
            Matcher::Tree => write!(f, "**.*"),
        }
    }
}

/// Parse `pattern` and match it against `entry` in one step
pub fn match_entry(pattern: &str, entry: &str) -> Result<(bool, bool), ResolveError> {
    Ok(Matcher::parse(pattern)?.matches(entry))
}
