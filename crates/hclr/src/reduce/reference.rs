//! reference resolution
//!
//! The first segment of a reference selects where the lookup starts:
//! - a variable of an enclosing `for` expression
//! - `local`: the `locals` blocks, merged into one map
//! - `var`: the variable store, falling back to the `default` of the `variable` block
//! - `data`: the data lookups, `data.<provider>.<name>` triggers the lookup
//! - any other name: the top level entry of the document with that name
//!
//! Remaining segments index into maps (by key or position) and lists (by position). Values that are not reduced
//! yet are reduced on the way. Inside the document this happens in place, so a forward reference and the second
//! pass see the same value. References that lead nowhere evaluate to themselves.
//!
//! A `var` name that is neither set nor declared by a `variable` block stays unresolved, even when other
//! `variable` blocks exist. It is not replaced by `null`.
use super::resolve::Step;
use super::Reducer;
use crate::error::Error;
use crate::syntax::{Node, ReferencePath};
use crate::value::{Map, Value};

/// Where a resolution currently stands
enum Cursor {
    Value(Value),
    /// a location inside the document, read on demand
    Slot(Vec<Step>),
    Locals,
    Variables,
    Data,
    Provider(String),
}

enum Key {
    Name(String),
    Index(f64),
}

impl Reducer<'_> {
    pub(crate) fn resolve_reference(&mut self, segments: &[Node]) -> Result<Value, Error> {
        let path = ReferencePath(segments).to_string();
        if self.resolving.contains(&path) {
            return Err(Error::CyclicReference(path));
        }
        if self.resolving.len() >= self.max_depth {
            return Err(Error::RecursionLimit(self.max_depth));
        }

        self.resolving.push(path);
        let resolved = self.resolve_segments(segments);
        let path = self.resolving.pop().unwrap_or_default();

        Ok(match resolved? {
            Some(value) => value,
            None => {
                tracing::trace!(reference = %path, "unresolved");
                Value::Node(Box::new(Node::Reference(segments.to_vec())))
            }
        })
    }

    fn resolve_segments(&mut self, segments: &[Node]) -> Result<Option<Value>, Error> {
        let Some((first, rest)) = segments.split_first() else {
            return Ok(None);
        };

        let mut cursor = match first {
            Node::Segment(name) => self.namespace(name),
            expression => match self.reduce_node(expression)? {
                value if value.is_unresolved() => None,
                value => Some(Cursor::Value(value)),
            },
        };

        for segment in rest {
            let Some(current) = cursor.take() else {
                return Ok(None);
            };
            let key = match segment {
                Node::Segment(name) => Key::Name(name.clone()),
                Node::Array(accessor) => match self.accessor(accessor)? {
                    Some(key) => key,
                    None => return Ok(None),
                },
                _ => return Ok(None),
            };
            cursor = self.step(current, key)?;
        }

        match cursor {
            Some(cursor) => self.finish(cursor),
            None => Ok(None),
        }
    }

    fn namespace(&self, name: &str) -> Option<Cursor> {
        if let Some(value) = self.scopes.iter().rev().find_map(|scope| scope.get(name)) {
            return Some(Cursor::Value(value.clone()));
        }

        match name {
            "local" => Some(Cursor::Locals),
            "var" => Some(Cursor::Variables),
            "data" => Some(Cursor::Data),
            _ => self
                .document
                .contains_key(name)
                .then(|| Cursor::Slot(vec![Step::Key(name.to_string())])),
        }
    }

    /// Key of an index accessor: strings select map entries, numbers select by position
    fn accessor(&mut self, accessor: &[Node]) -> Result<Option<Key>, Error> {
        let Some(expression) = accessor.first() else {
            return Ok(None);
        };
        Ok(match self.reduce_node(expression)? {
            Value::String(name) => Some(Key::Name(name)),
            Value::Number(index) => Some(Key::Index(index)),
            _ => None,
        })
    }

    fn step(&mut self, cursor: Cursor, key: Key) -> Result<Option<Cursor>, Error> {
        Ok(match cursor {
            Cursor::Value(value) => take_child(self.force(value)?, &key).map(Cursor::Value),
            Cursor::Slot(mut path) => {
                self.force_slot(&path)?;
                let Some(next) = self.slot(&path).and_then(|value| slot_step(value, &key)) else {
                    return Ok(None);
                };
                path.push(next);
                Some(Cursor::Slot(path))
            }
            Cursor::Locals => match &key {
                Key::Name(name) => self.local_path(name).map(Cursor::Slot),
                Key::Index(_) => child(&Value::Map(self.locals()), &key).cloned().map(Cursor::Value),
            },
            Cursor::Variables => {
                let found = match &key {
                    Key::Name(name) => self.variables.get(name).cloned(),
                    Key::Index(index) => position(*index)
                        .and_then(|index| self.variables.get_index(index))
                        .map(|(_, value)| value.clone()),
                };
                match (found, key) {
                    (Some(value), _) => Some(Cursor::Value(value)),
                    (None, Key::Name(name)) => self.variable_default(&name),
                    (None, Key::Index(_)) => None,
                }
            }
            Cursor::Data => match key {
                Key::Name(provider) => Some(Cursor::Provider(provider)),
                Key::Index(_) => None,
            },
            Cursor::Provider(provider) => match key {
                Key::Name(name) => self.data_lookup(&provider, &name)?.map(Cursor::Value),
                Key::Index(_) => None,
            },
        })
    }

    fn finish(&mut self, cursor: Cursor) -> Result<Option<Value>, Error> {
        let value = match cursor {
            Cursor::Value(value) => value,
            Cursor::Slot(mut path) => {
                self.resolve_path(&mut path)?;
                return Ok(self.slot(&path).cloned());
            }
            Cursor::Locals => {
                self.resolve_path(&mut vec![Step::Key("locals".to_string())])?;
                Value::Map(self.locals())
            }
            Cursor::Variables => Value::Map(self.variables.clone()),
            Cursor::Data => self.cache.to_value(),
            Cursor::Provider(provider) => match self.cache.provider(&provider) {
                Some(results) => Value::Map(results.clone()),
                None => return Ok(None),
            },
        };
        self.reduce_value(value).map(Some)
    }

    /// Reduce a value that is still syntax, so it can be indexed
    fn force(&mut self, value: Value) -> Result<Value, Error> {
        match value {
            Value::Node(node) => self.reduce_node(&node),
            other => Ok(other),
        }
    }

    /// All `locals` blocks merged, later blocks win
    fn locals(&self) -> Map {
        match self.document.get("locals") {
            Some(Value::Map(locals)) => locals.clone(),
            Some(Value::List(blocks)) => blocks
                .iter()
                .filter_map(Value::as_map)
                .flat_map(|block| block.iter().map(|(k, v)| (k.clone(), v.clone())))
                .collect(),
            _ => Map::new(),
        }
    }

    /// Document location of `local.<name>`, the last `locals` block declaring it wins
    fn local_path(&self, name: &str) -> Option<Vec<Step>> {
        let mut path = vec![Step::Key("locals".to_string())];
        match self.document.get("locals")? {
            Value::Map(locals) if locals.contains_key(name) => {}
            Value::List(blocks) => {
                let index = blocks
                    .iter()
                    .rposition(|block| block.as_map().is_some_and(|block| block.contains_key(name)))?;
                path.push(Step::Index(index));
            }
            _ => return None,
        }
        path.push(Step::Key(name.to_string()));
        Some(path)
    }

    /// `default` of the `variable "<name>"` block, or the value itself when it is not a block
    fn variable_default(&self, name: &str) -> Option<Cursor> {
        let mut path = vec![Step::Key("variable".to_string()), Step::Key(name.to_string())];
        let definition = match self.document.get("variable")?.as_map()?.get(name)? {
            Value::List(definitions) => {
                let last = definitions.len().checked_sub(1)?;
                path.push(Step::Index(last));
                definitions.get(last)?
            }
            definition => definition,
        };

        Some(match definition {
            Value::Map(block) if block.contains_key("default") => {
                path.push(Step::Key("default".to_string()));
                Cursor::Slot(path)
            }
            Value::Map(_) => Cursor::Value(Value::Null),
            _ => Cursor::Slot(path),
        })
    }

    /// Result of `data.<provider>.<name>`, looked up at most once per parse
    fn data_lookup(&mut self, provider: &str, name: &str) -> Result<Option<Value>, Error> {
        if let Some(cached) = self.cache.get(provider, name) {
            tracing::trace!(provider, name, "data lookup cached");
            return Ok(Some(cached.clone()));
        }

        let Some(lookup) = self.lookups.get(provider).cloned() else {
            tracing::debug!(provider, name, "no data lookup registered");
            return Ok(Some(Value::Null));
        };
        let Some(properties) = self.data_properties(provider, name)? else {
            tracing::debug!(provider, name, "data block not found");
            return Ok(None);
        };

        tracing::debug!(provider, name, "data lookup");
        let value = match lookup(&properties) {
            Ok(result) => Value::Map(result),
            Err(error) => {
                tracing::warn!(provider, name, ?error, "data lookup failed");
                Value::Null
            }
        };
        self.cache.insert(provider, name, value.clone());
        Ok(Some(value))
    }

    /// Fully resolved properties of the `data "<provider>" "<name>"` block
    fn data_properties(&mut self, provider: &str, name: &str) -> Result<Option<Map>, Error> {
        let mut path = vec![
            Step::Key("data".to_string()),
            Step::Key(provider.to_string()),
            Step::Key(name.to_string()),
        ];
        let repeated = match self.slot(&path) {
            Some(Value::List(blocks)) => Some(blocks.len()),
            _ => None,
        };
        if let Some(count) = repeated {
            let Some(last) = count.checked_sub(1) else {
                return Ok(None);
            };
            path.push(Step::Index(last));
        }

        self.resolve_path(&mut path)?;
        Ok(self.slot(&path).and_then(Value::as_map).cloned())
    }
}

/// Non-negative integral part of an index
fn position(index: f64) -> Option<usize> {
    (index.is_finite() && index >= 0.0).then(|| index as usize)
}

fn child<'v>(value: &'v Value, key: &Key) -> Option<&'v Value> {
    match (value, key) {
        (Value::Map(map), Key::Name(name)) => map.get(name),
        (Value::Map(map), Key::Index(index)) => position(*index)
            .and_then(|index| map.get_index(index))
            .map(|(_, value)| value),
        (Value::List(list), Key::Index(index)) => position(*index).and_then(|index| list.get(index)),
        _ => None,
    }
}

/// Document step from `value` to its child at `key`
fn slot_step(value: &Value, key: &Key) -> Option<Step> {
    match (value, key) {
        (Value::Map(map), Key::Name(name)) => map.contains_key(name).then(|| Step::Key(name.clone())),
        (Value::Map(map), Key::Index(index)) => position(*index)
            .and_then(|index| map.get_index(index))
            .map(|(name, _)| Step::Key(name.clone())),
        (Value::List(list), Key::Index(index)) => position(*index)
            .filter(|index| *index < list.len())
            .map(Step::Index),
        _ => None,
    }
}

fn take_child(value: Value, key: &Key) -> Option<Value> {
    match (value, key) {
        (Value::Map(mut map), Key::Name(name)) => map.swap_remove(name),
        (Value::Map(map), Key::Index(index)) => {
            map.into_iter().nth(position(*index)?).map(|(_, value)| value)
        }
        (Value::List(list), Key::Index(index)) => list.into_iter().nth(position(*index)?),
        _ => None,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::lookup::DataLookupRegistry;
    use crate::reduce::test::{reduce, reduce_with};
    use crate::syntax::Operator;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn index(raw: &str) -> Node {
        Node::Array(vec![Node::number(raw)])
    }

    fn segment(name: &str) -> Node {
        Node::Segment(name.to_string())
    }

    #[test]
    fn locals_and_document_roots() {
        let nodes = vec![
            Node::block(["locals"], vec![Node::attribute("name", vec![Node::string("web")])]),
            Node::block(
                ["locals"],
                vec![Node::attribute(
                    "greeting",
                    vec![Node::string("hello "), Node::Operator(Operator::Plus), Node::reference(["local", "name"])],
                )],
            ),
            Node::block(
                ["resource", "x", "y"],
                vec![Node::attribute("name", vec![Node::reference(["local", "greeting"])])],
            ),
            Node::attribute("copy", vec![Node::reference(["resource", "x", "y", "name"])]),
        ];
        let document = reduce(&nodes).unwrap();
        assert_eq!(document.get("copy"), Some(&Value::from("hello web")));
    }

    #[test]
    fn index_accessors() {
        let list = Node::Array(vec![
            Node::Map(vec![Node::attribute("name", vec![Node::string("a")])]),
            Node::Map(vec![Node::attribute("name", vec![Node::string("b")])]),
        ]);
        let nodes = vec![
            Node::block(["locals"], vec![Node::attribute("list", vec![list])]),
            Node::attribute(
                "by_position",
                vec![Node::Reference(vec![segment("local"), segment("list"), index("1"), segment("name")])],
            ),
            Node::attribute(
                "by_key",
                vec![Node::Reference(vec![
                    segment("local"),
                    segment("list"),
                    index("0"),
                    Node::Array(vec![Node::string("name")]),
                ])],
            ),
            Node::attribute(
                "out_of_range",
                vec![Node::Reference(vec![segment("local"), segment("list"), index("5")])],
            ),
        ];
        let document = reduce(&nodes).unwrap();
        assert_eq!(document.get("by_position"), Some(&Value::from("b")));
        assert_eq!(document.get("by_key"), Some(&Value::from("a")));
        assert!(document.get("out_of_range").is_some_and(Value::is_unresolved));
    }

    #[test]
    fn variables_and_defaults() {
        let nodes = vec![
            Node::block(["variable", "region"], vec![Node::attribute("default", vec![Node::string("eu")])]),
            Node::block(["variable", "size"], vec![Node::attribute("default", vec![Node::string("s")])]),
            Node::attribute("region", vec![Node::reference(["var", "region"])]),
            Node::attribute("size", vec![Node::reference(["var", "size"])]),
            Node::attribute("missing", vec![Node::reference(["var", "missing"])]),
        ];
        let mut variables = Map::new();
        variables.insert("size".to_string(), Value::from("xl"));

        let document = reduce_with(&nodes, &DataLookupRegistry::default(), &variables).unwrap();
        assert_eq!(document.get("region"), Some(&Value::from("eu")));
        assert_eq!(document.get("size"), Some(&Value::from("xl")));
        assert_eq!(
            document.get("missing"),
            Some(&Value::Node(Box::new(Node::reference(["var", "missing"]))))
        );
    }

    #[test]
    fn data_lookups_are_cached() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut lookups = DataLookupRegistry::default();
        let counter = calls.clone();
        lookups.register("echo", move |properties| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(properties.clone())
        });

        let nodes = vec![
            Node::block(["data", "echo", "site"], vec![Node::attribute("url", vec![Node::string("x")])]),
            Node::attribute("first", vec![Node::reference(["data", "echo", "site", "url"])]),
            Node::attribute("second", vec![Node::reference(["data", "echo", "site", "url"])]),
        ];
        let document = reduce_with(&nodes, &lookups, &Map::new()).unwrap();

        assert_eq!(document.get("first"), Some(&Value::from("x")));
        assert_eq!(document.get("second"), Some(&Value::from("x")));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failed_and_unknown_lookups_are_null() {
        let mut lookups = DataLookupRegistry::default();
        lookups.register("broken", |_| anyhow::bail!("unreachable host"));

        let nodes = vec![
            Node::block(["data", "broken", "a"], vec![]),
            Node::attribute("broken", vec![Node::reference(["data", "broken", "a"])]),
            Node::attribute("unknown", vec![Node::reference(["data", "nobody", "a"])]),
        ];
        let document = reduce_with(&nodes, &lookups, &Map::new()).unwrap();
        assert_eq!(document.get("broken"), Some(&Value::Null));
        assert_eq!(document.get("unknown"), Some(&Value::Null));
    }

    #[test]
    fn cyclic_reference() {
        let nodes = vec![Node::block(
            ["locals"],
            vec![
                Node::attribute("a", vec![Node::reference(["local", "b"])]),
                Node::attribute("b", vec![Node::reference(["local", "a"])]),
            ],
        )];
        assert!(matches!(reduce(&nodes), Err(Error::CyclicReference(_))));
    }

    #[test]
    fn forward_references_share_the_value() {
        let nodes = vec![Node::block(
            ["locals"],
            vec![
                Node::attribute("a", vec![Node::reference(["local", "id"])]),
                Node::attribute("id", vec![Node::call("uuid", vec![])]),
            ],
        )];
        let document = Value::Map(reduce(&nodes).unwrap());

        let id = document.pointer(["locals", "id"]).cloned();
        assert!(id.as_ref().is_some_and(|id| id.as_str().is_some()));
        assert_eq!(document.pointer(["locals", "a"]).cloned(), id);
    }

    #[test]
    fn root_reference_before_its_value() {
        let nodes = vec![
            Node::attribute("a", vec![Node::reference(["b", "c"])]),
            Node::attribute("b", vec![Node::call("jsondecode", vec![Node::string(r#"{"c": 1}"#)])]),
            Node::attribute("d", vec![Node::reference(["b", "c"])]),
        ];
        let document = reduce(&nodes).unwrap();

        assert_eq!(document.get("a"), Some(&Value::Number(1.0)));
        assert_eq!(document.get("d"), Some(&Value::Number(1.0)));
    }

    #[test]
    fn repeated_locals_blocks() {
        let nodes = vec![
            Node::block(["locals"], vec![Node::attribute("a", vec![Node::reference(["local", "b"])])]),
            Node::block(["locals"], vec![Node::attribute("b", vec![Node::string("x")])]),
        ];
        let document = reduce(&nodes).unwrap();

        assert_eq!(
            document.get("locals").and_then(Value::as_list).and_then(|blocks| blocks.first()),
            Some(&Value::Map([("a".to_string(), Value::from("x"))].into_iter().collect()))
        );
    }

    #[test]
    fn call_as_first_segment() {
        // jsondecode("{\"a\": 1}").a
        let nodes = vec![Node::attribute(
            "a",
            vec![Node::Reference(vec![
                Node::call("jsondecode", vec![Node::string(r#"{"a": 1}"#)]),
                segment("a"),
            ])],
        )];
        let document = reduce(&nodes).unwrap();
        assert_eq!(document.get("a"), Some(&Value::Number(1.0)));
    }
}
