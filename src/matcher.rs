//! Response classification against ordered matcher rules

use crate::device::{COLOR_FAIL, COLOR_OK, MatcherRule};

/// Result of running a response summary through the matcher rules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification<'a> {
    pub matched: bool,
    pub color: Option<&'a str>,
}

impl<'a> Classification<'a> {
    const NO_MATCH: Self = Self {
        matched: false,
        color: None,
    };

    /// Final `(ok, color)` pair for a probe whose protocol-level result was `passed`.
    ///
    /// A matching rule always passes and supplies its color; otherwise the
    /// protocol result decides between green and red.
    pub fn resolve(&self, passed: bool) -> (bool, String) {
        let ok = self.matched || passed;
        let color = match self.color {
            Some(color) => color.to_string(),
            None if ok => COLOR_OK.to_string(),
            None => COLOR_FAIL.to_string(),
        };
        (ok, color)
    }
}

/// Returns the color of the first rule whose pattern occurs in `text`, ignoring case.
///
/// Empty patterns never match.
pub fn classify<'a>(matchers: &'a [MatcherRule], text: &str) -> Classification<'a> {
    if matchers.is_empty() {
        return Classification::NO_MATCH;
    }

    let haystack = text.to_lowercase();
    matchers
        .iter()
        .find(|rule| !rule.pattern.is_empty() && haystack.contains(&rule.pattern.to_lowercase()))
        .map(|rule| Classification {
            matched: true,
            color: Some(rule.color.as_str()),
        })
        .unwrap_or(Classification::NO_MATCH)
}
