//! Pointcut matching.
//!
//! Wildcard patterns use `/` as the segment separator: `*` matches within one
//! segment, `?` one character of a segment, `**` any number of segments.
//! Regex patterns are anchored at both ends.

use regex::Regex;

use crate::error::{ActivityError, ActivityResult};
use crate::rule::PointcutType;

/// A compiled name pattern.
#[derive(Debug, Clone)]
pub struct NameMatcher {
    source: String,
    regex: Regex,
}

impl NameMatcher {
    pub fn compile(pointcut_type: PointcutType, pattern: &str) -> ActivityResult<Self> {
        let expression = match pointcut_type {
            PointcutType::Wildcard => wildcard_to_regex(pattern),
            PointcutType::Regexp => format!("^(?:{pattern})$"),
        };
        let regex = Regex::new(&expression).map_err(|e| {
            ActivityError::IllegalRule(format!("invalid pointcut pattern '{pattern}': {e}"))
        })?;
        Ok(Self {
            source: pattern.to_string(),
            regex,
        })
    }

    pub fn matches(&self, name: &str) -> bool {
        self.regex.is_match(name)
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

fn wildcard_to_regex(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + 8);
    out.push('^');
    let mut chars = pattern.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '*' if chars.peek() == Some(&'*') => {
                chars.next();
                if chars.peek() == Some(&'/') {
                    chars.next();
                    out.push_str("(?:.*/)?");
                } else {
                    out.push_str(".*");
                }
            }
            '*' => out.push_str("[^/]*"),
            '?' => out.push_str("[^/]"),
            other => out.push_str(&regex::escape(other.encode_utf8(&mut [0; 4]))),
        }
    }
    out.push('$');
    out
}

/// One pointcut pattern: a translet name, optionally narrowed to a bean method.
#[derive(Debug, Clone)]
pub struct PointcutPattern {
    translet: Option<NameMatcher>,
    bean_id: Option<NameMatcher>,
    bean_method: Option<NameMatcher>,
}

impl PointcutPattern {
    pub fn translet(matcher: NameMatcher) -> Self {
        Self {
            translet: Some(matcher),
            bean_id: None,
            bean_method: None,
        }
    }

    pub fn bean(bean_id: Option<NameMatcher>, bean_method: Option<NameMatcher>) -> Self {
        Self {
            translet: None,
            bean_id,
            bean_method,
        }
    }

    fn matches_translet(&self, name: &str) -> bool {
        self.translet.as_ref().map_or(true, |matcher| matcher.matches(name))
    }

    fn targets_beans(&self) -> bool {
        self.bean_id.is_some() || self.bean_method.is_some()
    }
}

/// Include/exclude pattern sets of one aspect.
#[derive(Debug, Clone, Default)]
pub struct Pointcut {
    includes: Vec<PointcutPattern>,
    excludes: Vec<PointcutPattern>,
}

impl Pointcut {
    pub fn include(&mut self, pattern: PointcutPattern) {
        self.includes.push(pattern);
    }

    pub fn exclude(&mut self, pattern: PointcutPattern) {
        self.excludes.push(pattern);
    }

    /// With no include patterns every translet matches.
    pub fn matches_translet(&self, name: &str) -> bool {
        let included = self.includes.is_empty()
            || self
                .includes
                .iter()
                .any(|pattern| pattern.matches_translet(name));
        included
            && !self
                .excludes
                .iter()
                .any(|pattern| pattern.translet.is_some() && pattern.matches_translet(name))
    }

    /// Bean-method pointcuts never join a translet's advice registry.
    pub fn is_bean_relevant(&self) -> bool {
        self.includes.iter().any(PointcutPattern::targets_beans)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wildcard(pattern: &str) -> NameMatcher {
        NameMatcher::compile(PointcutType::Wildcard, pattern).expect("valid pattern")
    }

    #[test]
    fn test_single_star_stays_within_segment() {
        let matcher = wildcard("/users/*");
        assert!(matcher.matches("/users/42"));
        assert!(!matcher.matches("/users/42/orders"));
        assert!(!matcher.matches("/accounts/42"));
    }

    #[test]
    fn test_double_star_spans_segments() {
        let matcher = wildcard("/admin/**");
        assert!(matcher.matches("/admin/"));
        assert!(matcher.matches("/admin/users/42/edit"));

        let middle = wildcard("/a/**/z");
        assert!(middle.matches("/a/z"));
        assert!(middle.matches("/a/b/c/z"));
    }

    #[test]
    fn test_question_mark_and_literal_escaping() {
        let matcher = wildcard("/v?/items.json");
        assert!(matcher.matches("/v1/items.json"));
        assert!(!matcher.matches("/v1/itemsXjson"));
        assert!(!matcher.matches("/v12/items.json"));
    }

    #[test]
    fn test_regex_patterns_are_anchored() {
        let matcher = NameMatcher::compile(PointcutType::Regexp, r"/orders/\d+").expect("valid");
        assert!(matcher.matches("/orders/7"));
        assert!(!matcher.matches("/orders/7/lines"));
        assert!(NameMatcher::compile(PointcutType::Regexp, "(").is_err());
    }

    #[test]
    fn test_excludes_override_includes() {
        let mut pointcut = Pointcut::default();
        pointcut.include(PointcutPattern::translet(wildcard("/shop/**")));
        pointcut.exclude(PointcutPattern::translet(wildcard("/shop/health")));

        assert!(pointcut.matches_translet("/shop/cart"));
        assert!(!pointcut.matches_translet("/shop/health"));
        assert!(!pointcut.is_bean_relevant());
    }
}
