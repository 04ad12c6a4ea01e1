use std::error::Error;
use std::fmt;

use hookscope_types::SearchPattern;
use regex::Regex;

#[derive(Debug)]
pub struct PatternError {
    pub source_text: String,
    pub source: regex::Error,
}

impl fmt::Display for PatternError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid regular expression {:?}: {}", self.source_text, self.source)
    }
}

impl Error for PatternError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.source)
    }
}

/// A [`SearchPattern`] ready to test field values.
///
/// Literals compare by exact string equality. Regular expressions use
/// `is_match`, so they are unanchored unless the pattern anchors itself.
#[derive(Debug, Clone)]
pub enum Matcher {
    Literal(String),
    Regex(Regex),
}

impl Matcher {
    pub fn compile(pattern: &SearchPattern) -> Result<Self, PatternError> {
        match pattern {
            SearchPattern::Literal(value) => Ok(Self::Literal(value.clone())),
            SearchPattern::Regex(source) => Regex::new(source)
                .map(Self::Regex)
                .map_err(|source_error| PatternError {
                    source_text: source.clone(),
                    source: source_error,
                }),
        }
    }

    pub fn is_match(&self, value: &str) -> bool {
        match self {
            Self::Literal(expected) => value == expected,
            Self::Regex(regex) => regex.is_match(value),
        }
    }
}

/// One-shot form of [`Matcher::is_match`]. A regular expression that fails to
/// compile matches nothing.
pub fn matches(value: &str, pattern: &SearchPattern) -> bool {
    Matcher::compile(pattern).is_ok_and(|matcher| matcher.is_match(value))
}
