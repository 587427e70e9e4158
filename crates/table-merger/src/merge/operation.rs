//! One incoming table merged against one template.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{MergerError, Result};
use crate::input::DataTable;
use crate::profile::ColumnProfiler;
use crate::schema::{ColumnInfo, ColumnMergeInfo, ColumnTransformations, check_exact_cover};
use crate::suggest::{MappingSuggester, TransformationSuggester};
use crate::transform::{CompiledTransformation, RowContext};

use super::rows::{MergedRows, ResolvedColumn};

/// Lifecycle position of a [`TableMergeOperation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeState {
    Created,
    Profiled,
    MappingSuggested,
    MappingConfirmed,
    TransformationSuggested,
    TransformationConfirmed,
    Applied,
    /// Absorbing: an unrecoverable profiling, model or parse failure happened.
    Errored,
}

impl MergeState {
    pub fn as_str(&self) -> &'static str {
        match self {
            MergeState::Created => "created",
            MergeState::Profiled => "profiled",
            MergeState::MappingSuggested => "mapping_suggested",
            MergeState::MappingConfirmed => "mapping_confirmed",
            MergeState::TransformationSuggested => "transformation_suggested",
            MergeState::TransformationConfirmed => "transformation_confirmed",
            MergeState::Applied => "applied",
            MergeState::Errored => "errored",
        }
    }
}

impl fmt::Display for MergeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The unit of work for one incoming table against one template.
///
/// Every step is an explicit call guarded by the current [`MergeState`]:
///
/// ```text
/// Created -profile-> Profiled -suggest_mapping-> MappingSuggested
///   -confirm_mapping-> MappingConfirmed -suggest_transformations->
///   TransformationSuggested -confirm_transformations->
///   TransformationConfirmed -apply-> Applied
/// ```
///
/// Out-of-order calls return [`MergerError::Precondition`] and change
/// nothing. Model and parse failures are recorded in [`errors`](Self::errors)
/// and move the operation to [`MergeState::Errored`].
#[derive(Debug)]
pub struct TableMergeOperation {
    state: MergeState,
    template_column_info: Arc<[ColumnInfo]>,
    incoming_column_info: Vec<ColumnInfo>,
    table: DataTable,
    suggested_merge_info: Option<ColumnMergeInfo>,
    actual_column_mapping: Option<IndexMap<String, String>>,
    suggested_transformation_operations: Option<ColumnTransformations>,
    actual_transformations: Option<IndexMap<String, String>>,
    resolved: Vec<ResolvedColumn>,
    errors: Vec<String>,
    allow_incoming_reuse: bool,
}

impl TableMergeOperation {
    /// A fresh operation; call [`profile`](Self::profile) next.
    pub fn new(template_column_info: Arc<[ColumnInfo]>, table: DataTable) -> Self {
        Self {
            state: MergeState::Created,
            template_column_info,
            incoming_column_info: Vec::new(),
            table,
            suggested_merge_info: None,
            actual_column_mapping: None,
            suggested_transformation_operations: None,
            actual_transformations: None,
            resolved: Vec::new(),
            errors: Vec::new(),
            allow_incoming_reuse: false,
        }
    }

    /// An operation whose incoming table has already been profiled.
    pub fn with_profile(
        template_column_info: Arc<[ColumnInfo]>,
        incoming_column_info: Vec<ColumnInfo>,
        table: DataTable,
    ) -> Self {
        let mut op = Self::new(template_column_info, table);
        op.incoming_column_info = incoming_column_info;
        op.state = MergeState::Profiled;
        op
    }

    /// An operation that failed before it could be profiled.
    pub(crate) fn errored(template_column_info: Arc<[ColumnInfo]>, error: &MergerError) -> Self {
        let mut op = Self::new(template_column_info, DataTable::default());
        op.fail(error);
        op
    }

    /// Allow one incoming column to feed several template columns.
    pub fn with_incoming_reuse(mut self, allow: bool) -> Self {
        self.allow_incoming_reuse = allow;
        self
    }

    pub fn state(&self) -> MergeState {
        self.state
    }

    pub fn is_errored(&self) -> bool {
        self.state == MergeState::Errored
    }

    pub fn template_column_info(&self) -> &[ColumnInfo] {
        &self.template_column_info
    }

    pub fn incoming_column_info(&self) -> &[ColumnInfo] {
        &self.incoming_column_info
    }

    /// The incoming table this operation merges.
    pub fn table(&self) -> &DataTable {
        &self.table
    }

    pub fn suggested_merge_info(&self) -> Option<&ColumnMergeInfo> {
        self.suggested_merge_info.as_ref()
    }

    /// Confirmed template → incoming mapping, in template column order.
    pub fn actual_column_mapping(&self) -> Option<&IndexMap<String, String>> {
        self.actual_column_mapping.as_ref()
    }

    pub fn suggested_transformations(&self) -> Option<&ColumnTransformations> {
        self.suggested_transformation_operations.as_ref()
    }

    /// Confirmed column → expression map, in template column order.
    pub fn actual_transformations(&self) -> Option<&IndexMap<String, String>> {
        self.actual_transformations.as_ref()
    }

    /// Failures recorded so far, oldest first.
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// Profile the incoming table.
    pub fn profile(&mut self, profiler: &ColumnProfiler) -> Result<()> {
        self.require(&[MergeState::Created], "profile")?;

        match profiler.profile(&self.table) {
            Ok(columns) => {
                self.incoming_column_info = columns;
                self.transition(MergeState::Profiled);
                Ok(())
            }
            Err(e) => {
                self.fail(&e);
                Err(e)
            }
        }
    }

    /// Ask the model for a mapping. Allowed once, right after profiling.
    ///
    /// Coverage problems in the answer are recorded in `errors` and do not
    /// stop the operation; the human fixes them while confirming.
    pub fn suggest_mapping(&mut self, suggester: &MappingSuggester) -> Result<&ColumnMergeInfo> {
        self.require(&[MergeState::Profiled], "suggest a mapping")?;

        let merge_info = match suggester.suggest(&self.template_column_info, &self.incoming_column_info) {
            Ok(merge_info) => merge_info,
            Err(e) => {
                self.fail(&e);
                return Err(e);
            }
        };

        self.errors.extend(merge_info.errors.iter().cloned());
        self.transition(MergeState::MappingSuggested);
        Ok(self.suggested_merge_info.insert(merge_info))
    }

    /// Record the human-confirmed template → incoming mapping.
    ///
    /// The keys must be exactly the template columns and the values must be
    /// incoming columns. Unless reuse is allowed, no incoming column may
    /// serve two template columns. A rejected mapping changes nothing.
    pub fn confirm_mapping<I, K, V>(&mut self, mapping: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.require(
            &[
                MergeState::Profiled,
                MergeState::MappingSuggested,
                MergeState::MappingConfirmed,
            ],
            "confirm a mapping",
        )?;

        let mut given: IndexMap<String, String> = IndexMap::new();
        for (template, incoming) in mapping {
            let template = template.into();
            if given.contains_key(&template) {
                return Err(MergerError::IncompleteCoverage(format!(
                    "template column '{template}' is mapped more than once"
                )));
            }
            given.insert(template, incoming.into());
        }

        check_exact_cover(
            &self.template_column_info,
            given.keys().map(String::as_str),
            "mapping",
        )?;

        let incoming_names: HashSet<&str> = self
            .incoming_column_info
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        if let Some((template, incoming)) = given
            .iter()
            .find(|(_, incoming)| !incoming_names.contains(incoming.as_str()))
        {
            return Err(MergerError::UnknownColumn(format!(
                "template column '{template}' is mapped to '{incoming}', which is not an incoming column"
            )));
        }

        if !self.allow_incoming_reuse {
            check_unshared(&given)?;
        }

        let ordered: IndexMap<String, String> = self
            .template_column_info
            .iter()
            .filter_map(|c| given.get(&c.name).map(|i| (c.name.clone(), i.clone())))
            .collect();

        self.actual_column_mapping = Some(ordered);
        self.transition(MergeState::MappingConfirmed);
        Ok(())
    }

    /// Ask the model for one transformation per template column.
    ///
    /// Needs a confirmed mapping. An answer that does not cover the template
    /// exactly once fails the operation.
    pub fn suggest_transformations(
        &mut self,
        suggester: &TransformationSuggester,
    ) -> Result<&ColumnTransformations> {
        self.require(&[MergeState::MappingConfirmed], "suggest transformations")?;
        let Some(mapping) = self.actual_column_mapping.as_ref() else {
            return Err(MergerError::Precondition(
                "no confirmed mapping to suggest transformations for".to_string(),
            ));
        };

        let transformations =
            match suggester.suggest(mapping, &self.template_column_info, &self.incoming_column_info) {
                Ok(transformations) => transformations,
                Err(e) => {
                    self.fail(&e);
                    return Err(e);
                }
            };

        self.transition(MergeState::TransformationSuggested);
        Ok(self.suggested_transformation_operations.insert(transformations))
    }

    /// Record and compile the human-confirmed column → expression map.
    ///
    /// May be called straight after mapping confirmation to supply
    /// transformations by hand. A set that misses a template column or does
    /// not compile changes nothing.
    pub fn confirm_transformations<I, K, V>(&mut self, transformations: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.require(
            &[
                MergeState::MappingConfirmed,
                MergeState::TransformationSuggested,
                MergeState::TransformationConfirmed,
            ],
            "confirm transformations",
        )?;
        let Some(mapping) = self.actual_column_mapping.as_ref() else {
            return Err(MergerError::Precondition(
                "no confirmed mapping to attach transformations to".to_string(),
            ));
        };

        let mut given: IndexMap<String, String> = IndexMap::new();
        for (column, expression) in transformations {
            let column = column.into();
            if given.contains_key(&column) {
                return Err(MergerError::IncompleteCoverage(format!(
                    "more than one transformation for template column '{column}'"
                )));
            }
            given.insert(column, expression.into());
        }
        check_exact_cover(
            &self.template_column_info,
            given.keys().map(String::as_str),
            "transformation",
        )?;

        let mut resolved = Vec::with_capacity(self.template_column_info.len());
        let mut ordered = IndexMap::with_capacity(self.template_column_info.len());
        for column in self.template_column_info.iter() {
            let (Some(expression), Some(incoming)) = (given.get(&column.name), mapping.get(&column.name))
            else {
                continue;
            };
            let source = self.table.column_index(incoming).ok_or_else(|| {
                MergerError::UnknownColumn(format!(
                    "incoming column '{incoming}' is not in the incoming table"
                ))
            })?;
            let transformation = CompiledTransformation::compile(&column.name, expression)?;
            debug!(
                column = transformation.column(),
                expression = transformation.expression(),
                "compiled transformation"
            );
            resolved.push(ResolvedColumn {
                source,
                transformation,
            });
            ordered.insert(column.name.clone(), expression.clone());
        }

        self.resolved = resolved;
        self.actual_transformations = Some(ordered);
        self.transition(MergeState::TransformationConfirmed);
        Ok(())
    }

    /// Produce the merged rows, lazily, in incoming row order.
    ///
    /// Each item is one output row keyed by template column, or the error
    /// that stopped that row. Applying again restarts from the first row and
    /// yields the same sequence.
    pub fn apply(&mut self) -> Result<MergedRows<'_>> {
        self.require(
            &[MergeState::TransformationConfirmed, MergeState::Applied],
            "apply",
        )?;
        let context = RowContext::new(&self.table.headers)?;
        if self.state != MergeState::Applied {
            self.transition(MergeState::Applied);
        }
        Ok(MergedRows::new(&self.table, &self.resolved, context))
    }

    fn require(&self, allowed: &[MergeState], action: &str) -> Result<()> {
        if allowed.contains(&self.state) {
            return Ok(());
        }
        let detail = match (self.state, self.errors.last()) {
            (MergeState::Errored, Some(last)) => format!(" ({last})"),
            _ => String::new(),
        };
        Err(MergerError::Precondition(format!(
            "cannot {action} while the operation is {}{detail}",
            self.state
        )))
    }

    fn transition(&mut self, to: MergeState) {
        info!(from = %self.state, to = %to, "merge state changed");
        self.state = to;
    }

    fn fail(&mut self, error: &MergerError) {
        warn!(state = %self.state, error = %error, "merge operation failed");
        self.errors.push(error.to_string());
        self.state = MergeState::Errored;
    }
}

/// Fail if one incoming column serves several template columns.
fn check_unshared(mapping: &IndexMap<String, String>) -> Result<()> {
    let mut users: IndexMap<&str, Vec<String>> = IndexMap::new();
    for (template, incoming) in mapping {
        users.entry(incoming.as_str()).or_default().push(template.clone());
    }
    match users.into_iter().find(|(_, templates)| templates.len() > 1) {
        Some((incoming, template_columns)) => Err(MergerError::SharedIncomingColumn {
            incoming_column: incoming.to_string(),
            template_columns,
        }),
        None => Ok(()),
    }
}
