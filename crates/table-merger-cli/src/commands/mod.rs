//! CLI command implementations.

pub mod apply;
pub mod profile;
pub mod suggest_mapping;
pub mod suggest_transformations;

use std::error::Error;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::Deserialize;
use serde::Serialize;

use table_merger::{
    AnthropicProvider, ColumnMergeInfo, ColumnTransformations, LlmConfig, LlmProvider,
    MergerConfig, OllamaProvider, OpenAIProvider, TableMergeOperation, TableMergerManager,
};

use crate::cli::{LlmArgs, LlmProviderChoice, TableArgs};

type CommandResult<T> = Result<T, Box<dyn Error>>;

/// A mapping file: either a plain `{template: incoming}` object or a
/// (possibly edited) mapping suggestion.
#[derive(Deserialize)]
#[serde(untagged)]
enum MappingFile {
    Suggestion(ColumnMergeInfo),
    Plain(IndexMap<String, String>),
}

/// A transformations file: either a plain `{column: expression}` object or
/// a (possibly edited) transformation suggestion.
#[derive(Deserialize)]
#[serde(untagged)]
enum TransformationsFile {
    Suggestion(ColumnTransformations),
    Plain(IndexMap<String, String>),
}

/// Read a confirmed template → incoming mapping.
pub fn load_mapping(path: &Path) -> CommandResult<IndexMap<String, String>> {
    let text = read_file(path)?;
    let mapping = match serde_json::from_str(&text)? {
        MappingFile::Suggestion(info) => info.selected_mapping(),
        MappingFile::Plain(map) => map,
    };
    Ok(mapping)
}

/// Read confirmed column → expression transformations.
pub fn load_transformations(path: &Path) -> CommandResult<IndexMap<String, String>> {
    let text = read_file(path)?;
    let transformations = match serde_json::from_str(&text)? {
        TransformationsFile::Suggestion(t) => t.as_map(),
        TransformationsFile::Plain(map) => map,
    };
    Ok(transformations)
}

fn read_file(path: &Path) -> CommandResult<String> {
    fs::read_to_string(path).map_err(|e| format!("Cannot read {}: {}", path.display(), e).into())
}

/// Build a model handle from the command-line choice.
pub fn build_provider(
    choice: &LlmProviderChoice,
    model: Option<&str>,
) -> CommandResult<Arc<dyn LlmProvider>> {
    let provider: Arc<dyn LlmProvider> = match (choice, model) {
        (LlmProviderChoice::OpenAI, None) => Arc::new(OpenAIProvider::from_env()?),
        (LlmProviderChoice::OpenAI, Some(m)) => Arc::new(OpenAIProvider::from_env_with_config(
            LlmConfig::default().with_model(m),
        )?),
        (LlmProviderChoice::Anthropic, None) => Arc::new(AnthropicProvider::from_env()?),
        (LlmProviderChoice::Anthropic, Some(m)) => Arc::new(
            AnthropicProvider::from_env_with_config(LlmConfig::default().with_model(m))?,
        ),
        (LlmProviderChoice::Ollama, None) => Arc::new(OllamaProvider::new()?),
        (LlmProviderChoice::Ollama, Some(m)) => Arc::new(OllamaProvider::with_model(m)?),
    };
    Ok(provider)
}

/// A ready manager for the template, backed by the chosen models.
pub fn build_manager(tables: &TableArgs, llm: &LlmArgs) -> CommandResult<TableMergerManager> {
    let primary = build_provider(&llm.llm, llm.model.as_deref())?;
    let config = MergerConfig {
        repair: !llm.no_repair,
        ..MergerConfig::default()
    };

    let mut manager = TableMergerManager::with_config(primary, config);
    if let Some(repair_model) = llm.repair_model.as_deref() {
        manager = manager.with_repair_llm(build_provider(&llm.llm, Some(repair_model))?);
    }

    if !manager.ready_from_path(&tables.template) {
        return Err(format!(
            "Cannot profile template {}: {}",
            tables.template.display(),
            manager.errors().join("; ")
        )
        .into());
    }
    Ok(manager)
}

/// Start a merge of the incoming file, failing if it cannot be profiled.
pub fn prepare(manager: &TableMergerManager, tables: &TableArgs) -> CommandResult<TableMergeOperation> {
    let op = manager.prep_csv_file_from_path(&tables.incoming)?;
    if op.is_errored() {
        return Err(format!(
            "Cannot profile incoming file {}: {}",
            tables.incoming.display(),
            op.errors().join("; ")
        )
        .into());
    }
    Ok(op)
}

/// Write pretty JSON to `output`, or stdout when no path is given.
pub fn write_json<T: Serialize>(value: &T, output: Option<&Path>) -> CommandResult<()> {
    let json = serde_json::to_string_pretty(value)?;
    match output {
        Some(path) => fs::write(path, json + "\n")
            .map_err(|e| format!("Cannot write {}: {}", path.display(), e))?,
        None => println!("{}", json),
    }
    Ok(())
}
