use regex::bytes::Regex;
use std::collections::HashSet;

/// Exclusion criteria; a response matching any one of them is dropped.
#[derive(Debug, Clone, Default)]
pub struct FilterConfig {
    pub sizes: Option<HashSet<usize>>,
    pub lines: Option<HashSet<usize>>,
    pub regex: Option<Regex>,
}

impl FilterConfig {
    /// True when the response should be suppressed.
    ///
    /// Unset criteria never match.
    pub fn excludes(&self, size: usize, lines: usize, body: &[u8]) -> bool {
        self.sizes.as_ref().is_some_and(|set| set.contains(&size))
            || self.lines.as_ref().is_some_and(|set| set.contains(&lines))
            || self.regex.as_ref().is_some_and(|re| re.is_match(body))
    }

    pub fn is_empty(&self) -> bool {
        self.sizes.is_none() && self.lines.is_none() && self.regex.is_none()
    }
}

/// Newline count, plus one for any non-empty body.
pub fn count_lines(body: &[u8]) -> usize {
    if body.is_empty() {
        return 0;
    }
    body.iter().filter(|&&b| b == b'\n').count() + 1
}
