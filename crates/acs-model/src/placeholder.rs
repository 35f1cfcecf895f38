//! `${...}` placeholder resolution for environment-dependent values
//!
//! Unresolvable placeholders are left intact, so resolving the same input
//! twice always yields the same output.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::HashMap;
use std::fmt::Debug;

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{([A-Za-z0-9_.\-]+)\}").expect("placeholder pattern is valid"));

/// Source of placeholder values
pub trait PlaceholderResolver: Send + Sync + Debug {
    /// Look up the value of one placeholder key
    fn lookup(&self, key: &str) -> Option<String>;

    /// Replace every resolvable `${key}` in `input`
    fn resolve(&self, input: &str) -> String {
        PLACEHOLDER
            .replace_all(input, |caps: &Captures<'_>| {
                self.lookup(&caps[1]).unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    }
}

/// Resolves `${a.b-c}` from the environment variable `A_B_C`
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvResolver;

impl EnvResolver {
    /// Environment variable name for a placeholder key
    #[must_use]
    pub fn variable_name(key: &str) -> String {
        key.chars()
            .map(|c| match c {
                '.' | '-' => '_',
                other => other.to_ascii_uppercase(),
            })
            .collect()
    }
}

impl PlaceholderResolver for EnvResolver {
    fn lookup(&self, key: &str) -> Option<String> {
        std::env::var(Self::variable_name(key)).ok()
    }
}

/// Fixed key/value resolver
#[derive(Debug, Clone, Default)]
pub struct MapResolver {
    values: HashMap<String, String>,
}

impl MapResolver {
    /// With value
    #[inline]
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }
}

impl PlaceholderResolver for MapResolver {
    fn lookup(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_known_and_keeps_unknown() {
        let resolver = MapResolver::default().with("host", "cardq");
        assert_eq!(
            resolver.resolve("http://${host}:${port}/x"),
            "http://cardq:${port}/x"
        );
    }

    #[test]
    fn resolution_is_idempotent_for_unresolved() {
        let resolver = MapResolver::default();
        let once = resolver.resolve("${cluster.ns}");
        assert_eq!(once, resolver.resolve(&once));
    }

    #[test]
    fn env_variable_name_mapping() {
        assert_eq!(EnvResolver::variable_name("cardq.host-name"), "CARDQ_HOST_NAME");
    }
}
