//! parser entry point
use crate::error::Error;
use crate::functions::FunctionRegistry;
use crate::lookup::DataLookupRegistry;
use crate::lower;
use crate::reduce::Reducer;
use crate::syntax::Node;
use crate::value::{Document, Map, Value};
use std::path::Path;

#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Return whatever could be parsed instead of failing
    ///
    /// A document with syntax errors parses as an empty document, top level structures that can not be
    /// lowered are skipped and a failing reduction keeps the partially reduced document.
    pub ignore_errors: bool,
    /// Maximum number of nested reference resolutions
    pub max_depth: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            ignore_errors: false,
            max_depth: 64,
        }
    }
}

/// Parses HCL documents into a [Document]
///
/// A parser carries the function and data lookup registries and the variable store. Each call to
/// [Parser::parse] starts with a fresh document and an empty lookup cache.
///
/// ```
/// let mut parser = hclr::Parser::new();
/// parser.set_variable("region", "eu-west-1");
///
/// let document = parser.parse(r#"
///     locals {
///         name = upper("web")
///     }
///     server = "${local.name}-${var.region}"
/// "#).unwrap();
///
/// assert_eq!(document["server"], hclr::Value::from("WEB-eu-west-1"));
/// ```
#[derive(Debug, Clone)]
pub struct Parser {
    functions: FunctionRegistry,
    lookups: DataLookupRegistry,
    variables: Map,
    options: ParseOptions,
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser {
    /// Parser with the built-in functions and no data lookups
    pub fn new() -> Self {
        Self::with_options(ParseOptions::default())
    }

    pub fn with_options(options: ParseOptions) -> Self {
        Self {
            functions: FunctionRegistry::with_builtins(),
            lookups: DataLookupRegistry::default(),
            variables: Map::new(),
            options,
        }
    }

    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut ParseOptions {
        &mut self.options
    }

    /// Register a function, replacing a built-in of the same name
    pub fn register_function<F>(&mut self, name: impl Into<String>, function: F) -> &mut Self
    where
        F: Fn(&[Value]) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.functions.register(name, function);
        self
    }

    /// Register the data lookup for `data "<provider>" "..." { ... }` blocks
    pub fn register_data_lookup<F>(&mut self, provider: impl Into<String>, lookup: F) -> &mut Self
    where
        F: Fn(&Map) -> anyhow::Result<Map> + Send + Sync + 'static,
    {
        self.lookups.register(provider, lookup);
        self
    }

    pub fn functions(&self) -> &FunctionRegistry {
        &self.functions
    }

    pub fn data_lookups(&self) -> &DataLookupRegistry {
        &self.lookups
    }

    /// Set a value for `var.<name>`
    pub fn set_variable(&mut self, name: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.variables.insert(name.into(), value.into());
        self
    }

    pub fn set_variables<K, V>(&mut self, variables: impl IntoIterator<Item = (K, V)>) -> &mut Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        self.variables
            .extend(variables.into_iter().map(|(name, value)| (name.into(), value.into())));
        self
    }

    pub fn variables(&self) -> &Map {
        &self.variables
    }

    /// Parse a variables file (`name = value` per line) and merge its top level entries into the variables
    ///
    /// The file is parsed with the same functions and data lookups but without any variables.
    pub fn parse_vars(&mut self, input: &str) -> Result<&Map, Error> {
        let loader = Parser {
            functions: self.functions.clone(),
            lookups: self.lookups.clone(),
            variables: Map::new(),
            options: self.options.clone(),
        };
        let variables = loader.parse(input)?;
        tracing::debug!(count = variables.len(), "loaded variables");

        self.variables.extend(variables);
        Ok(&self.variables)
    }

    pub fn parse(&self, input: &str) -> Result<Document, Error> {
        let nodes = if self.options.ignore_errors {
            lower::tokenize_lenient(input)
        } else {
            lower::tokenize(input)?
        };
        self.parse_nodes(&nodes)
    }

    /// Parse UTF-8 input from a reader
    pub fn parse_reader(&self, mut reader: impl std::io::Read) -> Result<Document, Error> {
        let mut input = String::new();
        reader.read_to_string(&mut input)?;
        self.parse(&input)
    }

    pub fn parse_file(&self, path: impl AsRef<Path>) -> Result<Document, Error> {
        let path = path.as_ref();
        tracing::info!(path = %path.display(), "loading file");
        let input = std::fs::read_to_string(path)?;
        self.parse(&input)
    }

    /// Reduce already lowered nodes
    pub fn parse_nodes(&self, nodes: &[Node]) -> Result<Document, Error> {
        let mut reducer = Reducer::new(&self.functions, &self.lookups, &self.variables, self.options.max_depth);

        match reducer.reduce(nodes) {
            Ok(()) => Ok(reducer.into_document()),
            Err(error) if self.options.ignore_errors => {
                tracing::warn!(%error, "ignoring error, returning partial document");
                Ok(reducer.into_document())
            }
            Err(error) => Err(error),
        }
    }
}
