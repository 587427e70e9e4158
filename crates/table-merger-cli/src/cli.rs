//! Command-line surface: one subcommand per review step.

use std::fmt;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Table Merger: LLM-assisted merging of tabular files into a template
#[derive(Parser)]
#[command(name = "table-merger")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Profile the columns of a file and print them as JSON
    Profile {
        /// CSV, TSV or other delimited file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Number of example values per column
        #[arg(long, default_value = "10")]
        examples: usize,
    },

    /// Ask the model to map incoming columns onto template columns
    SuggestMapping {
        #[command(flatten)]
        tables: TableArgs,

        #[command(flatten)]
        provider: LlmArgs,

        /// Output path for the suggestion (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Ask the model for one value transformation per template column
    SuggestTransformations {
        #[command(flatten)]
        tables: TableArgs,

        /// Confirmed mapping (plain object or edited mapping suggestion)
        #[arg(long, value_name = "FILE")]
        mapping: PathBuf,

        #[command(flatten)]
        provider: LlmArgs,

        /// Output path for the suggestion (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Allow one incoming column to feed several template columns
        #[arg(long)]
        allow_reuse: bool,
    },

    /// Apply a confirmed mapping and transformations and write merged CSV
    Apply {
        #[command(flatten)]
        tables: TableArgs,

        /// Confirmed mapping (plain object or edited mapping suggestion)
        #[arg(long, value_name = "FILE")]
        mapping: PathBuf,

        /// Confirmed transformations (plain object or edited suggestion)
        #[arg(long, value_name = "FILE")]
        transformations: PathBuf,

        /// Output path for merged data (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Allow one incoming column to feed several template columns
        #[arg(long)]
        allow_reuse: bool,
    },
}

/// The template and incoming files every merge step needs.
#[derive(Args, Clone, Debug)]
pub struct TableArgs {
    /// Template file whose columns define the output
    #[arg(long, value_name = "FILE")]
    pub template: PathBuf,

    /// Incoming file to merge into the template
    #[arg(long, value_name = "FILE")]
    pub incoming: PathBuf,
}

/// Model selection for suggestion steps.
#[derive(Args, Clone, Debug)]
pub struct LlmArgs {
    /// Service answering the prompts
    #[arg(long, value_enum, default_value_t = LlmProviderChoice::OpenAI)]
    pub llm: LlmProviderChoice,

    /// Model name understood by that service, e.g. "gpt-4o-mini"
    #[arg(long)]
    pub model: Option<String>,

    /// Cheaper model of the same provider used to repair malformed output
    #[arg(long)]
    pub repair_model: Option<String>,

    /// Fail immediately on malformed model output
    #[arg(long)]
    pub no_repair: bool,
}

/// Which service answers suggestion prompts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LlmProviderChoice {
    /// OpenAI chat completions, key in OPENAI_API_KEY
    #[default]
    #[value(name = "openai", alias = "gpt")]
    OpenAI,
    /// Anthropic messages, key in ANTHROPIC_API_KEY
    #[value(alias = "claude")]
    Anthropic,
    /// A local Ollama server (OLLAMA_HOST)
    #[value(alias = "local")]
    Ollama,
}

impl fmt::Display for LlmProviderChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_possible_value() {
            Some(value) => f.write_str(value.get_name()),
            None => Ok(()),
        }
    }
}
