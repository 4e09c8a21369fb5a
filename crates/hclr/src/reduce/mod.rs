//! tree reduction
//!
//! Turns a list of [Node]s into a [Document] in two passes:
//!
//! 1. [structure](Reducer::reduce_structure): builds the shape of the document. Blocks are nested and merged
//!    into lists when their path repeats, attributes are stored *unevaluated* as [Value::Node].
//! 2. [resolution](Reducer::resolve_document): replaces every unevaluated node with its value, resolving
//!    `locals`, `variable` and `data` before everything else.
//!
//! All state of a parse lives in the [Reducer]. It borrows the registries and the variable store of the
//! [crate::Parser] and owns the document and the lookup cache.
mod expr;
mod reference;
mod resolve;
mod structure;

use crate::error::Error;
use crate::functions::FunctionRegistry;
use crate::lookup::{DataLookupRegistry, LookupCache};
use crate::syntax::Node;
use crate::value::{Document, Map, Value};

#[derive(derive_new::new)]
pub(crate) struct Reducer<'p> {
    functions: &'p FunctionRegistry,
    lookups: &'p DataLookupRegistry,
    variables: &'p Map,
    /// maximum number of nested reference resolutions
    max_depth: usize,
    #[new(default)]
    document: Document,
    #[new(default)]
    cache: LookupCache,
    /// iteration variables of the comprehensions being evaluated, innermost last
    #[new(default)]
    scopes: Vec<Map>,
    /// references currently being resolved, innermost last
    #[new(default)]
    resolving: Vec<String>,
}

impl<'p> Reducer<'p> {
    /// Run both passes
    ///
    /// On failure the partially reduced document stays available through [Reducer::into_document].
    pub(crate) fn reduce(&mut self, nodes: &[Node]) -> Result<(), Error> {
        let mut root = Map::new();
        let structured = self.reduce_structure(nodes, &mut root);
        self.document = root;
        structured?;

        self.resolve_document()
    }

    pub(crate) fn into_document(self) -> Document {
        self.document
    }

    /// Reduce every unevaluated node inside `value`
    pub(crate) fn reduce_value(&mut self, value: Value) -> Result<Value, Error> {
        Ok(match value {
            Value::Map(map) => {
                let mut reduced = Map::with_capacity(map.len());
                for (key, value) in map {
                    reduced.insert(key, self.reduce_value(value)?);
                }
                Value::Map(reduced)
            }
            Value::List(list) => Value::List(
                list.into_iter()
                    .map(|value| self.reduce_value(value))
                    .collect::<Result<_, _>>()?,
            ),
            Value::Node(node) => self.reduce_node(&node)?,
            other => other,
        })
    }
}

/// Map key for a value: strings as they are, numbers and booleans in their string form
pub(crate) fn key_string(value: &Value) -> Option<String> {
    match value {
        Value::String(key) => Some(key.clone()),
        Value::Number(_) | Value::Bool(_) => Some(value.to_string()),
        _ => None,
    }
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    /// Reduce `nodes` with the built-in functions and the given registry/variables
    pub(crate) fn reduce_with(
        nodes: &[Node],
        lookups: &DataLookupRegistry,
        variables: &Map,
    ) -> Result<Document, Error> {
        let functions = FunctionRegistry::with_builtins();
        let mut reducer = Reducer::new(&functions, lookups, variables, 64);
        reducer.reduce(nodes)?;
        Ok(reducer.into_document())
    }

    pub(crate) fn reduce(nodes: &[Node]) -> Result<Document, Error> {
        reduce_with(nodes, &DataLookupRegistry::default(), &Map::new())
    }

    #[test]
    fn keys() {
        assert_eq!(key_string(&Value::from("a")), Some("a".to_string()));
        assert_eq!(key_string(&Value::Number(1.0)), Some("1".to_string()));
        assert_eq!(key_string(&Value::Null), None);
    }

    #[test]
    fn partial_document_on_failure() {
        let functions = FunctionRegistry::with_builtins();
        let lookups = DataLookupRegistry::default();
        let variables = Map::new();
        let mut reducer = Reducer::new(&functions, &lookups, &variables, 64);

        let nodes = vec![
            Node::attribute("ok", vec![Node::string("yes")]),
            Node::attribute("broken", vec![Node::number("1.2.3")]),
        ];

        assert!(matches!(reducer.reduce(&nodes), Err(Error::InvalidNumber { .. })));
        let document = reducer.into_document();
        assert_eq!(document.get("ok"), Some(&Value::from("yes")));
    }
}
