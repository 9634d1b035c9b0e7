//! Path filters and translation rules.

use crate::error::ApiError;
use glob::Pattern;
use regex::Regex;

/// Shell-glob filters matched against original paths; empty means accept all
#[derive(Debug, Clone, Default)]
pub struct PathFilter {
    patterns: Vec<Pattern>,
}

impl PathFilter {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, ApiError> {
        let patterns = patterns
            .iter()
            .map(|p| {
                Pattern::new(p.as_ref()).map_err(|e| {
                    ApiError::InvalidPattern(format!("filter {:?}: {}", p.as_ref(), e))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// `*` also matches `/`, as fnmatch does
    pub fn accepts(&self, path: &str) -> bool {
        self.patterns.is_empty() || self.patterns.iter().any(|p| p.matches(path))
    }
}

/// One `(pattern, replacement)` substitution
#[derive(Debug, Clone)]
pub struct Translation {
    pattern: Regex,
    replacement: String,
}

impl Translation {
    pub fn new(pattern: &str, replacement: impl Into<String>) -> Result<Self, ApiError> {
        let pattern = Regex::new(pattern)
            .map_err(|e| ApiError::InvalidPattern(format!("translation {:?}: {}", pattern, e)))?;
        Ok(Self {
            pattern,
            replacement: replacement.into(),
        })
    }

    /// Replace every match, `$1`/`${name}` expand capture groups
    pub fn apply(&self, path: &str) -> String {
        self.pattern
            .replace_all(path, self.replacement.as_str())
            .into_owned()
    }
}

/// Ordered translation rules, each applied to the previous rule's output
#[derive(Debug, Clone, Default)]
pub struct Translations {
    rules: Vec<Translation>,
}

impl Translations {
    pub fn new(rules: Vec<Translation>) -> Self {
        Self { rules }
    }

    pub fn from_pairs<S: AsRef<str>>(pairs: &[(S, S)]) -> Result<Self, ApiError> {
        let rules = pairs
            .iter()
            .map(|(search, replace)| Translation::new(search.as_ref(), replace.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules })
    }

    pub fn apply(&self, path: &str) -> String {
        let mut out = path.to_string();
        for rule in &self.rules {
            out = rule.apply(&out);
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
