use std::sync::LazyLock;

use regex::Regex;

static ADDRESS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\((.+?)\)").expect("invariant violated: address pattern must compile")
});

static FUNCTION_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"at (.+?)\(").expect("invariant violated: function name pattern must compile")
});

/// Display form of a stack-frame style code location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeInfo {
    /// Text inside the first parenthesised segment, or the whole location.
    pub address: String,
    /// Text between `at ` and the next `(`, verbatim. Chrome-style frames
    /// leave a trailing space here (`"add "`); it is kept as captured.
    pub function_name: Option<String>,
}

/// Best-effort parse of a captured location.
///
/// Handles the Chrome shape `    at add (http://host/t.js:158:3)`. The Firefox
/// shape `add@http://host/t.js:2:14` has neither parentheses nor `at `, so it
/// falls back to the raw string as address and no function name.
pub fn parse_code_location(location: &str) -> CodeInfo {
    let address = ADDRESS
        .captures(location)
        .and_then(|captures| captures.get(1))
        .map_or_else(|| location.to_string(), |m| m.as_str().to_string());
    let function_name = FUNCTION_NAME
        .captures(location)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str().to_string());
    CodeInfo {
        address,
        function_name,
    }
}
