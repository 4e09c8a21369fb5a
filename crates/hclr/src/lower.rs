//! lowering of hcl source into [Node]s
//!
//! The source is parsed with [hcl_edit::parser::parse_body], expressions are converted into [hcl::Expression]s
//! and then lowered:
//! - binary operations are flattened in source order, `a + b * c` becomes `[a, +, b, *, c]`
//! - parentheses, and unary operations right of a binary operator, become a [Node::Group]
//! - conditionals become `cond ? then : else`
//! - templates become string concatenation, `%{if}` directives a grouped conditional
//! - inside a `type` attribute, type keywords (`string`, `list(number)`, ...) become [Node::Type]
//!
//! Splat traversals and `%{for}` directives are not supported.
use crate::error::Error;
use crate::syntax::{
    Attribute, AttributeName, Block, Comprehension, FunctionCall, Node, Operator, Position, PrimitiveType,
    TypeMarker,
};
use hcl::expr::{Expression, ForExpr, FuncCall, ObjectKey, Operation, TemplateExpr, Traversal, TraversalOperator};
use hcl::template::{Directive, Element, Template};
use hcl_edit::structure::Structure;
use hcl_edit::Span;

/// Parse and lower a complete document
pub fn tokenize(source: &str) -> Result<Vec<Node>, Error> {
    let body = hcl_edit::parser::parse_body(source)?;
    body.iter()
        .map(|structure| lower_structure(structure, source))
        .collect()
}

/// Like [tokenize], but a syntax error yields no nodes and top level structures that can not be lowered are
/// skipped
pub fn tokenize_lenient(source: &str) -> Vec<Node> {
    let body = match hcl_edit::parser::parse_body(source) {
        Ok(body) => body,
        Err(error) => {
            tracing::warn!(%error, "ignoring document with syntax error");
            return vec![];
        }
    };

    body.iter()
        .filter_map(|structure| match lower_structure(structure, source) {
            Ok(node) => Some(node),
            Err(error) => {
                tracing::warn!(%error, "ignoring structure");
                None
            }
        })
        .collect()
}

pub fn lower_structure(structure: &Structure, source: &str) -> Result<Node, Error> {
    match structure {
        Structure::Attribute(attribute) => {
            let name = attribute.key.value().as_str();
            let position = position(attribute, source);
            let lowering = Lowering {
                declares_type: name == "type",
                position,
            };

            let expression: Expression = attribute.value.clone().into();
            let mut lowered = Attribute::new(AttributeName::Static(name.to_string()), lowering.flat(&expression)?);
            lowered.position = position;
            Ok(Node::Attribute(lowered))
        }
        Structure::Block(block) => {
            let mut names = vec![block.ident.value().as_str().to_string()];
            names.extend(block.labels.iter().map(|label| label.as_str().to_string()));

            let children = block
                .body
                .iter()
                .map(|structure| lower_structure(structure, source))
                .collect::<Result<_, _>>()?;

            let mut lowered = Block::new(names, children);
            lowered.position = position(block, source);
            Ok(Node::Block(lowered))
        }
    }
}

fn position(spanned: &impl Span, source: &str) -> Option<Position> {
    spanned
        .span()
        .map(|span| Position::from_offset(source, span.start))
}

/// Lowering of the expression of a single attribute
struct Lowering {
    /// inside a `type = ...` attribute
    declares_type: bool,
    position: Option<Position>,
}

impl Lowering {
    fn unsupported(&self, what: &'static str) -> Error {
        Error::Unsupported {
            what,
            position: self.position,
        }
    }

    fn flat(&self, expression: &Expression) -> Result<Vec<Node>, Error> {
        let mut nodes = vec![];
        self.flatten(expression, &mut nodes)?;
        Ok(nodes)
    }

    fn flatten(&self, expression: &Expression, nodes: &mut Vec<Node>) -> Result<(), Error> {
        match expression {
            Expression::Operation(operation) => match operation.as_ref() {
                Operation::Binary(binary) => {
                    self.flatten(&binary.lhs_expr, nodes)?;
                    nodes.push(Node::Operator(self.operator(binary.operator.as_str())?));
                    match &binary.rhs_expr {
                        unary @ Expression::Operation(rhs) if matches!(rhs.as_ref(), Operation::Unary(_)) => {
                            nodes.push(Node::Group(self.flat(unary)?))
                        }
                        rhs => self.flatten(rhs, nodes)?,
                    }
                }
                Operation::Unary(unary) => {
                    nodes.push(Node::Operator(self.operator(unary.operator.as_str())?));
                    nodes.push(self.operand(&unary.expr)?);
                }
            },
            Expression::Conditional(conditional) => {
                self.flatten(&conditional.cond_expr, nodes)?;
                nodes.push(Node::Operator(Operator::Question));
                self.flatten(&conditional.true_expr, nodes)?;
                nodes.push(Node::Operator(Operator::Colon));
                self.flatten(&conditional.false_expr, nodes)?;
            }
            other => nodes.push(self.operand(other)?),
        }
        Ok(())
    }

    fn operator(&self, symbol: &str) -> Result<Operator, Error> {
        Operator::from_symbol(symbol).ok_or_else(|| self.unsupported("operator"))
    }

    /// A single operand; compound expressions are grouped
    fn operand(&self, expression: &Expression) -> Result<Node, Error> {
        if self.declares_type {
            if let Some(marker) = type_marker(expression) {
                return Ok(Node::Type(marker));
            }
        }

        Ok(match expression {
            Expression::Null => Node::null(),
            Expression::Bool(value) => Node::boolean(*value),
            Expression::Number(value) => Node::number(value.to_string()),
            Expression::String(value) => Node::string(value.clone()),
            Expression::Array(elements) => Node::Array(
                elements
                    .iter()
                    .map(|element| self.operand(element))
                    .collect::<Result<_, _>>()?,
            ),
            Expression::Object(object) => Node::Map(
                object
                    .iter()
                    .map(|(key, value)| self.object_entry(key, value))
                    .collect::<Result<_, _>>()?,
            ),
            Expression::TemplateExpr(template) => self.template_expr(template)?,
            Expression::Variable(variable) => Node::reference([variable.as_str()]),
            Expression::Traversal(traversal) => self.traversal(traversal)?,
            Expression::FuncCall(call) => self.call(call)?,
            Expression::Parenthesis(inner) => Node::Group(self.flat(inner)?),
            Expression::Conditional(_) | Expression::Operation(_) => Node::Group(self.flat(expression)?),
            Expression::ForExpr(for_expr) => self.comprehension(for_expr)?,
            _ => return Err(self.unsupported("expression")),
        })
    }

    fn object_entry(&self, key: &ObjectKey, value: &Expression) -> Result<Node, Error> {
        let name = match key {
            ObjectKey::Identifier(identifier) => AttributeName::Static(identifier.to_string()),
            ObjectKey::Expression(Expression::String(name)) => AttributeName::Static(name.clone()),
            ObjectKey::Expression(Expression::Variable(name)) => AttributeName::Static(name.as_str().to_string()),
            ObjectKey::Expression(expression) => AttributeName::Dynamic(Box::new(self.operand(expression)?)),
            _ => return Err(self.unsupported("object key")),
        };
        Ok(Node::Attribute(Attribute::new(name, self.flat(value)?)))
    }

    fn template_expr(&self, template: &TemplateExpr) -> Result<Node, Error> {
        let template = Template::from_expr(template).map_err(|_| self.unsupported("malformed template"))?;
        self.template(&template)
    }

    fn template(&self, template: &Template) -> Result<Node, Error> {
        let elements = template.elements();
        match elements {
            [] => return Ok(Node::string("")),
            [Element::Literal(text)] => return Ok(Node::string(text.clone())),
            _ => {}
        }

        let mut children = vec![Node::string("")];
        for element in elements {
            let part = match element {
                Element::Literal(text) => Node::string(text.clone()),
                Element::Interpolation(interpolation) => self.operand(&interpolation.expr)?,
                Element::Directive(Directive::If(directive)) => {
                    let mut branches = self.flat(&directive.cond_expr)?;
                    branches.push(Node::Operator(Operator::Question));
                    branches.push(self.template(&directive.true_template)?);
                    branches.push(Node::Operator(Operator::Colon));
                    branches.push(match &directive.false_template {
                        Some(template) => self.template(template)?,
                        None => Node::string(""),
                    });
                    Node::Group(branches)
                }
                Element::Directive(Directive::For(_)) => return Err(self.unsupported("template for directive")),
            };
            children.push(Node::Operator(Operator::Plus));
            children.push(part);
        }

        Ok(Node::Interpolation(children))
    }

    fn traversal(&self, traversal: &Traversal) -> Result<Node, Error> {
        let mut segments = match &traversal.expr {
            Expression::Variable(variable) => vec![Node::Segment(variable.as_str().to_string())],
            other => vec![self.operand(other)?],
        };

        for operator in &traversal.operators {
            segments.push(match operator {
                TraversalOperator::GetAttr(identifier) => Node::Segment(identifier.to_string()),
                TraversalOperator::Index(index) => Node::Array(vec![self.operand(index)?]),
                TraversalOperator::LegacyIndex(index) => Node::Array(vec![Node::number(index.to_string())]),
                _ => return Err(self.unsupported("splat operator")),
            });
        }

        Ok(Node::Reference(segments))
    }

    fn call(&self, call: &FuncCall) -> Result<Node, Error> {
        let arguments = call
            .args
            .iter()
            .map(|argument| self.operand(argument))
            .collect::<Result<_, _>>()?;

        let mut lowered = FunctionCall::new(call.name.to_string(), arguments);
        lowered.expand_final = call.expand_final;
        Ok(Node::Call(lowered))
    }

    fn comprehension(&self, for_expr: &ForExpr) -> Result<Node, Error> {
        Ok(Node::Comprehension(Box::new(Comprehension {
            key_var: for_expr.key_var.as_ref().map(ToString::to_string),
            value_var: for_expr.value_var.to_string(),
            collection: self.operand(&for_expr.collection_expr)?,
            key: for_expr
                .key_expr
                .as_ref()
                .map(|key| self.operand(key))
                .transpose()?,
            value: self.operand(&for_expr.value_expr)?,
            condition: for_expr
                .cond_expr
                .as_ref()
                .map(|condition| self.operand(condition))
                .transpose()?,
            grouping: for_expr.grouping,
        })))
    }
}

/// `string`, `list(number)`, `map(list(any))`, ...
fn type_marker(expression: &Expression) -> Option<TypeMarker> {
    match expression {
        Expression::Variable(word) => PrimitiveType::from_keyword(word.as_str())
            .or_else(|| PrimitiveType::from_constructor(word.as_str()))
            .map(TypeMarker::primitive),
        Expression::FuncCall(call) => {
            let kind = PrimitiveType::from_constructor(&call.name.to_string())?;
            match call.args.as_slice() {
                [] => Some(TypeMarker::primitive(kind)),
                [element] => Some(TypeMarker::collection(kind, type_marker(element)?)),
                _ => None,
            }
        }
        _ => None,
    }
}
