//! # Messages
//!
//! Localized message lookup with `{0}`-style placeholders.

use std::collections::HashMap;

pub trait MessageSource: Send + Sync {
    /// Resolves `code` for `locale`, substituting `args` into its placeholders.
    fn message(&self, code: &str, args: &[&str], locale: Option<&str>) -> Option<String>;
}

/// Messages registered in code, keyed by locale.
///
/// Lookup tries the exact locale (`ko_KR`), then its language (`ko`), then the
/// messages registered without a locale.
#[derive(Debug, Default, Clone)]
pub struct StaticMessageSource {
    bundles: HashMap<String, HashMap<String, String>>,
}

impl StaticMessageSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_message(
        mut self,
        locale: Option<&str>,
        code: impl Into<String>,
        template: impl Into<String>,
    ) -> Self {
        self.bundles
            .entry(locale.unwrap_or_default().to_string())
            .or_default()
            .insert(code.into(), template.into());
        self
    }

    fn lookup(&self, code: &str, locale: Option<&str>) -> Option<&str> {
        let mut candidates: Vec<&str> = Vec::with_capacity(3);
        if let Some(locale) = locale {
            candidates.push(locale);
            if let Some((language, _)) = locale.split_once(['_', '-']) {
                candidates.push(language);
            }
        }
        candidates.push("");
        candidates.into_iter().find_map(|candidate| {
            self.bundles
                .get(candidate)
                .and_then(|bundle| bundle.get(code))
                .map(String::as_str)
        })
    }
}

impl MessageSource for StaticMessageSource {
    fn message(&self, code: &str, args: &[&str], locale: Option<&str>) -> Option<String> {
        self.lookup(code, locale)
            .map(|template| format_message(template, args))
    }
}

/// Replaces `{n}` with the n-th argument; unknown placeholders are kept.
pub fn format_message(template: &str, args: &[&str]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let replaced = after.find('}').and_then(|close| {
            let index: usize = after[..close].trim().parse().ok()?;
            args.get(index).map(|arg| (arg, close))
        });
        match replaced {
            Some((arg, close)) => {
                out.push_str(arg);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}
