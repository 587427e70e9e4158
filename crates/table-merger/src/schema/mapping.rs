//! Mapping and transformation suggestions exchanged with the model and the reviewer.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::column::{ColumnInfo, column_names};
use super::types::Confidence;
use crate::error::{MergerError, Result};

/// One proposed template → incoming column correspondence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMapping {
    /// Name of the template column.
    pub template_column: String,
    /// Best-matching incoming column.
    pub incoming_column: String,
    /// How sure the model was.
    pub confidence: Confidence,
    /// Other incoming columns the model considered plausible.
    #[serde(default)]
    pub ambiguous_with: Vec<String>,
}

impl ColumnMapping {
    /// Whether the reviewer has to pick between alternatives.
    pub fn is_ambiguous(&self) -> bool {
        self.ambiguous_with
            .iter()
            .any(|c| c != &self.incoming_column)
    }

    /// The suggested column followed by its alternatives, sorted and deduplicated.
    pub fn candidates(&self) -> Vec<&str> {
        let mut names: Vec<&str> = std::iter::once(self.incoming_column.as_str())
            .chain(self.ambiguous_with.iter().map(String::as_str))
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }
}

/// One round of mapping suggestion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMergeInfo {
    /// One entry per template column.
    pub column_mapping: Vec<ColumnMapping>,
    /// Problems found while parsing or checking the suggestion.
    #[serde(default)]
    pub errors: Vec<String>,
}

impl ColumnMergeInfo {
    /// The suggested choices as a confirmable template → incoming map.
    pub fn selected_mapping(&self) -> IndexMap<String, String> {
        self.column_mapping
            .iter()
            .map(|m| (m.template_column.clone(), m.incoming_column.clone()))
            .collect()
    }

    /// Look up the suggestion for a template column.
    pub fn mapping_for(&self, template_column: &str) -> Option<&ColumnMapping> {
        self.column_mapping
            .iter()
            .find(|m| m.template_column == template_column)
    }

    /// Check the suggestion against both column sets.
    ///
    /// Returns one description per problem: template columns that are
    /// missing, repeated or unknown, and incoming names (suggested or
    /// alternative) that do not exist.
    pub fn coverage_problems(
        &self,
        template: &[ColumnInfo],
        incoming: &[ColumnInfo],
    ) -> Vec<String> {
        let template_names: HashSet<&str> = template.iter().map(|c| c.name.as_str()).collect();
        let incoming_names: HashSet<&str> = incoming.iter().map(|c| c.name.as_str()).collect();

        let mut problems = Vec::new();
        let mut counts: HashMap<&str, usize> = HashMap::new();

        for mapping in &self.column_mapping {
            let name = mapping.template_column.as_str();
            *counts.entry(name).or_default() += 1;
            if !template_names.contains(&name) {
                problems.push(format!("suggested mapping names unknown template column '{name}'"));
            }
            if !incoming_names.contains(mapping.incoming_column.as_str()) {
                problems.push(format!(
                    "template column '{name}' is mapped to unknown incoming column '{}'",
                    mapping.incoming_column
                ));
            }
            for alt in &mapping.ambiguous_with {
                if !incoming_names.contains(alt.as_str()) {
                    problems.push(format!(
                        "template column '{name}' lists unknown alternative '{alt}'"
                    ));
                }
            }
        }

        for column in template {
            match counts.get(column.name.as_str()).copied().unwrap_or(0) {
                0 => problems.push(format!(
                    "template column '{}' is missing from the suggested mapping",
                    column.name
                )),
                1 => {}
                n => problems.push(format!(
                    "template column '{}' appears {n} times in the suggested mapping",
                    column.name
                )),
            }
        }

        problems
    }
}

/// One proposed value rule for a template column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnTransformation {
    /// Template column the rule produces.
    pub column_name: String,
    /// Expression evaluated per row; see [`crate::transform`].
    pub transformation_expression: String,
}

/// One transformation per template column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnTransformations {
    pub transformations: Vec<ColumnTransformation>,
}

impl ColumnTransformations {
    /// The suggested expressions as a confirmable column → expression map.
    pub fn as_map(&self) -> IndexMap<String, String> {
        self.transformations
            .iter()
            .map(|t| (t.column_name.clone(), t.transformation_expression.clone()))
            .collect()
    }

    /// Fail unless every template column has exactly one transformation.
    pub fn check_coverage(&self, template: &[ColumnInfo]) -> Result<()> {
        check_exact_cover(
            template,
            self.transformations.iter().map(|t| t.column_name.as_str()),
            "transformation",
        )
    }
}

/// Fail unless `names` covers the template column set exactly once.
pub(crate) fn check_exact_cover<'a>(
    template: &[ColumnInfo],
    names: impl IntoIterator<Item = &'a str>,
    what: &str,
) -> Result<()> {
    let template_names = column_names(template);
    let mut seen: HashSet<&str> = HashSet::new();

    for name in names {
        if !template_names.contains(&name) {
            return Err(MergerError::IncompleteCoverage(format!(
                "{what} for unknown template column '{name}'"
            )));
        }
        if !seen.insert(name) {
            return Err(MergerError::IncompleteCoverage(format!(
                "more than one {what} for template column '{name}'"
            )));
        }
    }

    let missing: Vec<&str> = template_names
        .iter()
        .copied()
        .filter(|n| !seen.contains(n))
        .collect();
    if !missing.is_empty() {
        return Err(MergerError::IncompleteCoverage(format!(
            "no {what} for template column(s): {}",
            missing.join(", ")
        )));
    }

    Ok(())
}
