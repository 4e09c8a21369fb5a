//! expression evaluation
//!
//! Flat expressions are evaluated strictly left to right, there is no operator precedence: `1 + 2 * 3` is `9`.
//! Every operator consumes the operand to its right. Operands of the wrong type leave the running result
//! unchanged.
use super::{key_string, Reducer};
use crate::error::Error;
use crate::syntax::{Comprehension, FunctionCall, Literal, LiteralKind, Node, Operator};
use crate::value::{Map, Value};
use std::cmp::Ordering;

impl Reducer<'_> {
    /// Second pass reduction of a single node
    pub(crate) fn reduce_node(&mut self, node: &Node) -> Result<Value, Error> {
        match node {
            Node::Attribute(attribute) => self.evaluate(&attribute.children),
            Node::Group(children) | Node::Interpolation(children) => self.evaluate(children),
            Node::Block(_) => self.structure_value(node).and_then(|value| self.reduce_value(value)),
            Node::Map(entries) => {
                let mut map = Map::new();
                self.reduce_structure(entries, &mut map)?;
                self.reduce_value(Value::Map(map))
            }
            Node::Array(elements) if elements.is_empty() => Ok(Value::Null),
            Node::Array(elements) => Ok(Value::List(
                elements
                    .iter()
                    .map(|element| self.reduce_node(element))
                    .collect::<Result<_, _>>()?,
            )),
            Node::Literal(value) => literal(value),
            Node::Type(marker) => Ok(Value::Type(marker.clone())),
            Node::Reference(segments) => self.resolve_reference(segments),
            Node::Call(call) => self.call(call),
            Node::Comprehension(comprehension) => self.comprehend(comprehension),
            Node::Operator(_) | Node::Segment(_) => Ok(Value::Null),
        }
    }

    /// Evaluate a flat list of operands and operators
    pub(crate) fn evaluate(&mut self, children: &[Node]) -> Result<Value, Error> {
        let mut result = Value::Null;
        let mut cursor = 0;

        while let Some(child) = children.get(cursor) {
            cursor += 1;
            let Node::Operator(operator) = child else {
                result = self.reduce_node(child)?;
                continue;
            };

            match operator {
                Operator::And | Operator::Or => {
                    let end = children[cursor..]
                        .iter()
                        .position(|node| matches!(node, Node::Operator(op) if op.ends_logical_operand()))
                        .map_or(children.len(), |offset| cursor + offset);
                    let right = self.evaluate(&children[cursor..end])?;
                    cursor = end;

                    result = Value::Bool(match operator {
                        Operator::And => result.is_truthy() && right.is_truthy(),
                        _ => result.is_truthy() || right.is_truthy(),
                    });
                }
                Operator::Question => {
                    if !result.is_truthy() {
                        cursor = skip_branch(children, cursor);
                    }
                    // the chosen branch starts from scratch
                    result = Value::Null;
                }
                Operator::Colon => break,
                Operator::Not => {
                    let right = self.operand(children, &mut cursor)?;
                    result = Value::Bool(!right.is_truthy());
                }
                binary => {
                    let right = self.operand(children, &mut cursor)?;
                    result = apply(*binary, result, right);
                }
            }
        }

        Ok(result)
    }

    /// The operand right of an operator, prefix operators included
    fn operand(&mut self, children: &[Node], cursor: &mut usize) -> Result<Value, Error> {
        let Some(node) = children.get(*cursor) else {
            return Ok(Value::Null);
        };
        *cursor += 1;

        match node {
            Node::Operator(Operator::Not) => {
                let operand = self.operand(children, cursor)?;
                Ok(Value::Bool(!operand.is_truthy()))
            }
            Node::Operator(prefix @ (Operator::Minus | Operator::Plus)) => {
                let operand = self.operand(children, cursor)?;
                Ok(apply(*prefix, Value::Null, operand))
            }
            other => self.reduce_node(other),
        }
    }

    pub(crate) fn call(&mut self, call: &FunctionCall) -> Result<Value, Error> {
        let mut arguments = Vec::with_capacity(call.arguments.len());
        for argument in &call.arguments {
            let value = self.reduce_node(argument)?;
            if value.is_unresolved() {
                tracing::debug!(function = %call.name, %argument, "unresolved argument, skipping call");
                return Ok(Value::Null);
            }
            arguments.push(value);
        }

        if call.expand_final {
            if let Some(Value::List(last)) = arguments.pop() {
                arguments.extend(last);
            } else {
                tracing::debug!(function = %call.name, "final argument can not be expanded");
                return Ok(Value::Null);
            }
        }

        let Some(function) = self.functions.get(&call.name) else {
            tracing::debug!(function = %call.name, "unknown function");
            return Ok(Value::Null);
        };

        function(&arguments).map_err(|source| Error::Function {
            name: call.name.clone(),
            source,
        })
    }

    pub(crate) fn comprehend(&mut self, comprehension: &Comprehension) -> Result<Value, Error> {
        let items: Vec<(Value, Value)> = match self.reduce_node(&comprehension.collection)? {
            Value::List(list) => list
                .into_iter()
                .enumerate()
                .map(|(index, value)| (Value::Number(index as f64), value))
                .collect(),
            Value::Map(map) => map
                .into_iter()
                .map(|(key, value)| (Value::String(key), value))
                .collect(),
            other => {
                tracing::debug!(collection = %other, "for expression over a value that is not a collection");
                return Ok(Value::Null);
            }
        };

        let mut list = vec![];
        let mut object = Map::new();
        for (key, value) in items {
            let mut scope = Map::new();
            if let Some(key_var) = &comprehension.key_var {
                scope.insert(key_var.clone(), key);
            }
            scope.insert(comprehension.value_var.clone(), value);

            self.scopes.push(scope);
            let produced = self.comprehend_item(comprehension, &mut list, &mut object);
            self.scopes.pop();
            produced?;
        }

        Ok(match comprehension.key {
            Some(_) => Value::Map(object),
            None => Value::List(list),
        })
    }

    fn comprehend_item(
        &mut self,
        comprehension: &Comprehension,
        list: &mut Vec<Value>,
        object: &mut Map,
    ) -> Result<(), Error> {
        if let Some(condition) = &comprehension.condition {
            if !self.reduce_node(condition)?.is_truthy() {
                return Ok(());
            }
        }

        let Some(key) = &comprehension.key else {
            list.push(self.reduce_node(&comprehension.value)?);
            return Ok(());
        };

        let key = self.reduce_node(key)?;
        let Some(key) = key_string(&key) else {
            tracing::debug!(%key, "for expression key is not a string");
            return Ok(());
        };
        let value = self.reduce_node(&comprehension.value)?;

        if comprehension.grouping {
            if let Value::List(values) = object.entry(key).or_insert_with(|| Value::List(vec![])) {
                values.push(value);
            }
        } else {
            object.insert(key, value);
        }
        Ok(())
    }
}

/// Convert a literal to its value
pub(crate) fn literal(literal: &Literal) -> Result<Value, Error> {
    Ok(match literal.kind {
        LiteralKind::String => Value::String(literal.raw.clone()),
        LiteralKind::Number => Value::Number(literal.raw.parse().map_err(|source| {
            Error::InvalidNumber {
                raw: literal.raw.clone(),
                source,
            }
        })?),
        LiteralKind::Boolean => Value::Bool(literal.raw == "true"),
        LiteralKind::Null => Value::Null,
    })
}

/// Position after the `:` that belongs to the `?` just consumed
fn skip_branch(children: &[Node], mut cursor: usize) -> usize {
    let mut depth = 0usize;
    while let Some(child) = children.get(cursor) {
        cursor += 1;
        match child {
            Node::Operator(Operator::Question) => depth += 1,
            Node::Operator(Operator::Colon) if depth == 0 => break,
            Node::Operator(Operator::Colon) => depth -= 1,
            _ => {}
        }
    }
    cursor
}

/// Binary operators; type mismatches keep the left operand
fn apply(operator: Operator, left: Value, right: Value) -> Value {
    match operator {
        Operator::Equal => Value::Bool(left == right),
        Operator::NotEqual => Value::Bool(left != right),
        Operator::Greater | Operator::GreaterEqual | Operator::Less | Operator::LessEqual => {
            let (Value::Number(l), Value::Number(r)) = (&left, &right) else {
                return left;
            };
            let Some(ordering) = l.partial_cmp(r) else {
                return Value::Bool(false);
            };
            Value::Bool(match operator {
                Operator::Greater => ordering == Ordering::Greater,
                Operator::GreaterEqual => ordering != Ordering::Less,
                Operator::Less => ordering == Ordering::Less,
                _ => ordering != Ordering::Greater,
            })
        }
        Operator::Plus => match (left, right) {
            (Value::String(l), r) if !r.is_null() => Value::String(l + &r.to_string()),
            (Value::Number(l), Value::Number(r)) => Value::Number(l + r),
            (Value::Null, r) => r,
            (l, _) => l,
        },
        Operator::Minus => match (left, right) {
            (Value::Number(l), Value::Number(r)) => Value::Number(l - r),
            (Value::Null, Value::Number(r)) => Value::Number(-r),
            (l, _) => l,
        },
        Operator::Multiply | Operator::Divide | Operator::Modulo => match (left, right) {
            (Value::Number(l), Value::Number(r)) => Value::Number(match operator {
                Operator::Multiply => l * r,
                Operator::Divide => l / r,
                _ => l % r,
            }),
            (l, _) => l,
        },
        Operator::And | Operator::Or | Operator::Question | Operator::Colon | Operator::Not => left,
    }
}
