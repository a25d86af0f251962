use crate::domain::error::{AppError, Result};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::{BTreeSet, HashMap};

/// `{{ name }}` with an identifier inside.
static PLACEHOLDER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").unwrap());

/// Anything that still looks like placeholder syntax, well-formed or not.
static PLACEHOLDER_RESIDUE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{[^{}]*\}\}").unwrap());

/// Fills `{{name}}` placeholders in a template. Pure; no I/O.
pub struct PromptBuilder;

impl PromptBuilder {
    /// Substitutes every placeholder in a single pass, so values are never re-expanded.
    pub fn build(template: &str, variables: &HashMap<String, String>) -> Result<String> {
        let missing: BTreeSet<&str> = Self::placeholders(template)
            .into_iter()
            .filter(|name| !variables.contains_key(*name))
            .collect();
        if !missing.is_empty() {
            return Err(AppError::MissingVariable(
                missing.into_iter().collect::<Vec<_>>().join(", "),
            ));
        }

        // Residue is checked on the literal template text only; substituted
        // values may legitimately contain braces.
        let literal_segments = PLACEHOLDER_PATTERN.split(template);
        for segment in literal_segments {
            if let Some(found) = PLACEHOLDER_RESIDUE_PATTERN.find(segment) {
                return Err(AppError::UnresolvedPlaceholder(found.as_str().to_string()));
            }
        }

        let output = PLACEHOLDER_PATTERN.replace_all(template, |caps: &Captures| {
            variables
                .get(&caps[1])
                .cloned()
                .unwrap_or_default()
        });

        Ok(output.into_owned())
    }

    /// Placeholder names in order of first appearance.
    pub fn placeholders(template: &str) -> Vec<&str> {
        let mut seen = BTreeSet::new();
        PLACEHOLDER_PATTERN
            .captures_iter(template)
            .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
            .filter(|name| seen.insert(*name))
            .collect()
    }
}
