//! hclr cli interface

use clap::{Parser, Subcommand, ValueEnum};
use std::fmt::Formatter;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Change the work directory
    ///
    /// Can be specified multiple times. Note that all
    /// paths on the way to the final path must exist.
    ///
    /// This is equivalent to running { cd <directory>; hclr ... }
    #[clap(short = 'C', long = "directory", global(true))]
    pub directory: Vec<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Parse hcl and print the resolved document
    ///
    /// Reads HCL from stdin unless files are provided (via --file)
    Parse(ParseCommand),

    /// Print debug information for development
    Dev(DevCommand),
}

#[derive(Parser, Debug)]
pub struct ParseCommand {
    #[clap(flatten)]
    pub input: InputArgs,

    #[clap(flatten)]
    pub variables: VariableArgs,

    #[clap(flatten)]
    pub output: OutputArgs,
}

#[derive(Parser, Debug)]
pub struct InputArgs {
    /// Load a file
    ///
    /// Multiple files are parsed as one document, in the order given.
    #[clap(short = 'f', long = "file")]
    pub files: Vec<PathBuf>,

    /// Return the partial document instead of failing
    #[clap(long = "ignore-errors")]
    pub ignore_errors: bool,
}

#[derive(Parser, Debug)]
pub struct VariableArgs {
    /// Load variables from a file of `name = value` attributes
    #[clap(long = "vars")]
    pub files: Vec<PathBuf>,

    /// Set a single variable, the value is taken as a string
    #[clap(long = "var", value_parser = parse_key_value)]
    pub values: Vec<(String, String)>,
}

fn parse_key_value(argument: &str) -> Result<(String, String), String> {
    argument
        .split_once('=')
        .map(|(key, value)| (key.trim().to_string(), value.to_string()))
        .ok_or_else(|| format!("expected key=value, got `{argument}`"))
}

#[derive(Parser, Debug)]
pub struct OutputArgs {
    #[arg(short = 'F', long = "output-format", default_value_t)]
    pub format: OutputFormat,
}

#[derive(ValueEnum, Clone, Default, Debug)]
pub enum OutputFormat {
    Json,
    #[default]
    Yaml,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Json => f.write_str("json"),
            OutputFormat::Yaml => f.write_str("yaml"),
        }
    }
}

#[derive(Parser, Debug)]
pub struct DevCommand {
    #[command(subcommand)]
    pub command: DevSubCommand,

    #[clap(flatten)]
    pub input: InputArgs,
}

#[derive(Subcommand, Debug)]
pub enum DevSubCommand {
    /// Lowered syntax nodes
    Nodes,
    /// Resolved document, including unresolved references and type markers
    Document,
}
