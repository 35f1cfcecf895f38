//! Alias substitution in expression templates

use regex::{Captures, Regex};
use std::collections::BTreeMap;

/// Replace every whole-word alias in `template` in a single pass
///
/// Replacement text is never rescanned, so an alias occurring inside a
/// substituted column name is left alone.
pub(crate) fn substitute(template: &str, replacements: &BTreeMap<&str, String>) -> String {
    if replacements.is_empty() {
        return template.to_string();
    }
    // Longest first so overlapping aliases prefer the longer match
    let mut aliases: Vec<&str> = replacements.keys().copied().collect();
    aliases.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));
    let alternation = aliases
        .iter()
        .map(|alias| regex::escape(alias))
        .collect::<Vec<_>>()
        .join("|");
    let Ok(pattern) = Regex::new(&format!(r"\b(?:{alternation})\b")) else {
        return template.to_string();
    };
    pattern
        .replace_all(template, |caps: &Captures<'_>| {
            replacements
                .get(&caps[0])
                .cloned()
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// Expression of a simple KPI read from a PM stream
pub(crate) fn simple(template: &str, replacements: &BTreeMap<&str, String>, source: &str) -> String {
    format!("{} FROM kafka://{source}", substitute(template, replacements))
}

/// Expression of a complex KPI read from a KPI output table
pub(crate) fn complex(
    template: &str,
    replacements: &BTreeMap<&str, String>,
    primary_table: &str,
) -> String {
    format!(
        "{} FROM kpi_db://{primary_table}",
        substitute(template, replacements)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn map(pairs: &[(&'static str, &str)]) -> BTreeMap<&'static str, String> {
        pairs.iter().map(|(k, v)| (*k, (*v).to_string())).collect()
    }

    #[test]
    fn replaces_whole_words_only() {
        let replacements = map(&[("a", "smf.pm.a"), ("ab", "smf.pm.ab")]);
        assert_eq!(
            substitute("SUM(a) / SUM(ab) + abc", &replacements),
            "SUM(smf.pm.a) / SUM(smf.pm.ab) + abc"
        );
    }

    #[test]
    fn substituted_text_is_not_rescanned() {
        let replacements = map(&[("x", "t.y"), ("y", "t.x")]);
        assert_eq!(substitute("x + y", &replacements), "t.y + t.x");
    }

    #[test]
    fn simple_and_complex_suffixes() {
        let replacements = map(&[("s", "smf.pmCounters.s")]);
        assert_eq!(
            simple("SUM(s)", &replacements, "smf"),
            "SUM(smf.pmCounters.s) FROM kafka://smf"
        );
        assert_eq!(
            complex("s * 100", &map(&[("s", "kpi_nf_15.acs_1")]), "kpi_nf_15"),
            "kpi_nf_15.acs_1 * 100 FROM kpi_db://kpi_nf_15"
        );
    }

    proptest! {
        #[test]
        fn template_without_aliases_is_unchanged(template in "[0-9 +*/()]{0,40}") {
            let replacements = map(&[("a", "s.a")]);
            prop_assert_eq!(substitute(&template, &replacements), template);
        }
    }
}
