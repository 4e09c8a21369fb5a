//! first pass: document structure
use super::expr::literal;
use super::Reducer;
use crate::error::Error;
use crate::syntax::{Attribute, AttributeName, Block, Node};
use crate::value::{Map, Value};
use indexmap::map::Entry;

impl Reducer<'_> {
    /// Insert blocks and attributes of `nodes` into `target`
    ///
    /// Attribute expressions are not evaluated here unless they are plain values. Everything else is kept as
    /// [Value::Node] for the second pass.
    pub(crate) fn reduce_structure(&mut self, nodes: &[Node], target: &mut Map) -> Result<(), Error> {
        for node in nodes {
            match node {
                Node::Block(block) => {
                    let scope = position_block(block, target)?;
                    self.reduce_structure(&block.children, scope)?;
                }
                Node::Attribute(attribute) => {
                    let name = self.attribute_name(&attribute.name)?;
                    let value = self.structure_attribute(node, attribute)?;
                    target.insert(name, value);
                }
                other => tracing::trace!(node = %other, "skipping value outside of an attribute"),
            }
        }
        Ok(())
    }

    fn structure_attribute(&mut self, node: &Node, attribute: &Attribute) -> Result<Value, Error> {
        match attribute.children.as_slice() {
            [Node::Block(block)] => {
                let mut nested = Map::new();
                self.reduce_structure(&block.children, &mut nested)?;
                Ok(Value::Map(nested))
            }
            [value @ (Node::Literal(_) | Node::Type(_) | Node::Map(_) | Node::Array(_))] => {
                self.structure_value(value)
            }
            _ => Ok(Value::Node(Box::new(node.clone()))),
        }
    }

    /// First pass handling of a single value
    pub(crate) fn structure_value(&mut self, node: &Node) -> Result<Value, Error> {
        Ok(match node {
            Node::Literal(value) => literal(value)?,
            Node::Type(marker) => Value::Type(marker.clone()),
            // keys can only be computed once the document exists
            Node::Map(entries) if entries.iter().any(has_dynamic_name) => Value::Node(Box::new(node.clone())),
            Node::Map(entries) => {
                let mut nested = Map::new();
                self.reduce_structure(entries, &mut nested)?;
                Value::Map(nested)
            }
            Node::Array(elements) if elements.is_empty() => Value::Null,
            Node::Array(elements) => Value::List(
                elements
                    .iter()
                    .map(|element| self.structure_value(element))
                    .collect::<Result<_, _>>()?,
            ),
            Node::Block(_) | Node::Attribute(_) => {
                let mut scratch = Map::new();
                self.reduce_structure(std::slice::from_ref(node), &mut scratch)?;
                Value::Map(scratch)
            }
            Node::Operator(_) | Node::Segment(_) => Value::Null,
            expression if expression.has_references() => Value::Node(Box::new(expression.clone())),
            expression => self.reduce_node(expression)?,
        })
    }

    pub(crate) fn attribute_name(&mut self, name: &AttributeName) -> Result<String, Error> {
        match name {
            AttributeName::Static(name) => Ok(name.clone()),
            AttributeName::Dynamic(expression) => {
                let value = self.reduce_node(expression)?;
                super::key_string(&value).ok_or_else(|| Error::InvalidAttributeName {
                    name: expression.to_string(),
                })
            }
        }
    }
}

fn has_dynamic_name(entry: &Node) -> bool {
    matches!(entry, Node::Attribute(attribute) if matches!(attribute.name, AttributeName::Dynamic(_)))
}

/// Find (or create) the map a block writes into
///
/// Every name but the last must lead through maps. A block whose full path already exists turns the existing
/// map into a list of maps and appends a fresh one.
fn position_block<'m>(block: &Block, mut target: &'m mut Map) -> Result<&'m mut Map, Error> {
    let last = block.names.len().saturating_sub(1);

    for (index, name) in block.names.iter().enumerate() {
        let slot = match target.entry(name.clone()) {
            Entry::Vacant(vacant) => vacant.insert(Value::Map(Map::new())),
            Entry::Occupied(occupied) => {
                let slot = occupied.into_mut();
                if index == last && matches!(slot, Value::Map(_)) {
                    let prior = std::mem::take(slot);
                    *slot = Value::List(vec![prior]);
                }
                slot
            }
        };

        target = match slot {
            Value::Map(map) => map,
            Value::List(list) if index == last => push_map(list),
            Value::List(_) => {
                return Err(Error::BlockTraversesArray {
                    path: block.names[..=index].join("."),
                    position: block.position,
                })
            }
            _ => {
                return Err(Error::BlockTraversesValue {
                    path: block.names[..=index].join("."),
                    position: block.position,
                })
            }
        };
    }

    Ok(target)
}

fn push_map(list: &mut Vec<Value>) -> &mut Map {
    list.push(Value::Map(Map::new()));
    match list.last_mut() {
        Some(Value::Map(map)) => map,
        _ => unreachable!("a map was just pushed"),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::functions::FunctionRegistry;
    use crate::lookup::DataLookupRegistry;
    use crate::syntax::Operator;
    use pretty_assertions::assert_eq;

    fn structure(nodes: &[Node]) -> Result<Map, Error> {
        let functions = FunctionRegistry::with_builtins();
        let lookups = DataLookupRegistry::default();
        let variables = Map::new();
        let mut reducer = Reducer::new(&functions, &lookups, &variables, 64);

        let mut root = Map::new();
        reducer.reduce_structure(nodes, &mut root)?;
        Ok(root)
    }

    #[test]
    fn nested_blocks() {
        let nodes = vec![Node::block(
            ["resource", "aws_instance", "web"],
            vec![Node::attribute("ami", vec![Node::string("ami-123")])],
        )];
        let root = Value::Map(structure(&nodes).unwrap());
        assert_eq!(
            root.pointer(["resource", "aws_instance", "web", "ami"]),
            Some(&Value::from("ami-123"))
        );
    }

    #[test]
    fn repeated_blocks_become_lists() {
        let block = |id: &str| {
            Node::block(["resource", "x", "y"], vec![Node::attribute("id", vec![Node::string(id)])])
        };
        let root = Value::Map(structure(&[block("1"), block("2"), block("3")]).unwrap());

        let instances = root.pointer(["resource", "x", "y"]).and_then(Value::as_list).unwrap();
        assert_eq!(instances.len(), 3);
        assert_eq!(instances[2].pointer(["id"]), Some(&Value::from("3")));
    }

    #[test]
    fn sibling_labels_stay_maps() {
        let nodes = vec![
            Node::block(["variable", "a"], vec![]),
            Node::block(["variable", "b"], vec![]),
        ];
        let root = structure(&nodes).unwrap();
        let variables = root.get("variable").and_then(Value::as_map).unwrap();
        assert_eq!(variables.keys().collect::<Vec<_>>(), ["a", "b"]);
    }

    #[test]
    fn block_through_list() {
        let nodes = vec![
            Node::block(["a", "b"], vec![]),
            Node::block(["a", "b"], vec![]),
            Node::block(["a", "b", "c"], vec![]),
        ];
        let error = structure(&nodes).unwrap_err();
        assert!(matches!(error, Error::BlockTraversesArray { ref path, .. } if path == "a.b"));
    }

    #[test]
    fn block_through_value() {
        let nodes = vec![
            Node::attribute("a", vec![Node::number("1")]),
            Node::block(["a", "b"], vec![]),
        ];
        let error = structure(&nodes).unwrap_err();
        assert!(matches!(error, Error::BlockTraversesValue { ref path, .. } if path == "a"));
    }

    #[test]
    fn expressions_stay_unevaluated() {
        let sum = Node::attribute(
            "sum",
            vec![Node::number("1"), Node::Operator(Operator::Plus), Node::number("2")],
        );
        let root = structure(&[sum.clone()]).unwrap();
        assert_eq!(root.get("sum"), Some(&Value::Node(Box::new(sum))));
    }

    #[test]
    fn plain_values_are_converted() {
        let nodes = vec![
            Node::attribute("empty", vec![Node::Array(vec![])]),
            Node::attribute(
                "list",
                vec![Node::Array(vec![Node::number("1"), Node::reference(["local", "x"])])],
            ),
            Node::attribute(
                "object",
                vec![Node::Map(vec![Node::attribute("flag", vec![Node::boolean(true)])])],
            ),
        ];
        let root = structure(&nodes).unwrap();

        assert_eq!(root.get("empty"), Some(&Value::Null));
        assert_eq!(
            root.get("list"),
            Some(&Value::List(vec![
                Value::Number(1.0),
                Value::Node(Box::new(Node::reference(["local", "x"])))
            ]))
        );
        assert_eq!(
            Value::Map(root).pointer(["object", "flag"]),
            Some(&Value::Bool(true))
        );
    }
}
