//! syntax node model
//!
//! The typed node tree consumed by the reducer. [crate::lower] produces it from HCL source text, but any
//! producer works: the reducer only relies on the shapes defined here.
//!
//! Children are always kept in source order. Expressions are stored as a *flat* list of operands and
//! [Operator]s (`a + b * c` is `[a, +, b, *, c]`), which the evaluator reduces strictly left to right.
use std::fmt;

/// Location of a node in the source text (1-based line and column, 0-based byte offset)
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_new::new)]
pub struct Position {
    pub line: usize,
    pub column: usize,
    pub offset: usize,
}

impl Position {
    /// Compute line and column of a byte offset in `source`
    pub fn from_offset(source: &str, offset: usize) -> Self {
        let offset = offset.min(source.len());
        let before = &source[..offset];
        let line = before.matches('\n').count() + 1;
        let line_start = before.rfind('\n').map(|index| index + 1).unwrap_or(0);
        let column = before[line_start..].chars().count() + 1;

        Self {
            line,
            column,
            offset,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Block(Block),
    Attribute(Attribute),
    /// `{ key = value, ... }`, entries are [Node::Attribute]s
    Map(Vec<Node>),
    /// `[a, b, ...]`, also used as index accessor inside a [Node::Reference]
    Array(Vec<Node>),
    Literal(Literal),
    Type(TypeMarker),
    Operator(Operator),
    /// `a.b[0].c`: segments are [Node::Segment]s interleaved with single-element [Node::Array] accessors
    Reference(Vec<Node>),
    Segment(String),
    Call(FunctionCall),
    /// `( ... )`
    Group(Vec<Node>),
    /// `"text ${expr}"`
    Interpolation(Vec<Node>),
    Comprehension(Box<Comprehension>),
}

impl Node {
    pub fn string(value: impl Into<String>) -> Self {
        Node::Literal(Literal::new(LiteralKind::String, value.into()))
    }

    pub fn number(raw: impl Into<String>) -> Self {
        Node::Literal(Literal::new(LiteralKind::Number, raw.into()))
    }

    pub fn boolean(value: bool) -> Self {
        Node::Literal(Literal::new(LiteralKind::Boolean, value.to_string()))
    }

    pub fn null() -> Self {
        Node::Literal(Literal::new(LiteralKind::Null, "null".to_string()))
    }

    /// A reference made of plain names: `Node::reference(["var", "region"])`
    pub fn reference<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Self {
        Node::Reference(
            names
                .into_iter()
                .map(|name| Node::Segment(name.into()))
                .collect(),
        )
    }

    pub fn attribute(name: impl Into<String>, children: Vec<Node>) -> Self {
        Node::Attribute(Attribute::new(AttributeName::Static(name.into()), children))
    }

    pub fn block<S: Into<String>>(names: impl IntoIterator<Item = S>, children: Vec<Node>) -> Self {
        Node::Block(Block::new(names.into_iter().map(Into::into).collect(), children))
    }

    pub fn call(name: impl Into<String>, arguments: Vec<Node>) -> Self {
        Node::Call(FunctionCall::new(name.into(), arguments))
    }

    /// Does this node (or any of its descendants) reference something?
    ///
    /// Expressions without references can be evaluated as soon as they are encountered.
    pub fn has_references(&self) -> bool {
        match self {
            Node::Reference(_) | Node::Comprehension(_) => true,
            Node::Block(block) => block.children.iter().any(Node::has_references),
            Node::Attribute(attribute) => {
                matches!(&attribute.name, AttributeName::Dynamic(name) if name.has_references())
                    || attribute.children.iter().any(Node::has_references)
            }
            Node::Map(children)
            | Node::Array(children)
            | Node::Group(children)
            | Node::Interpolation(children) => children.iter().any(Node::has_references),
            Node::Call(call) => call.arguments.iter().any(Node::has_references),
            Node::Literal(_) | Node::Type(_) | Node::Operator(_) | Node::Segment(_) => false,
        }
    }

    /// Is this node an unresolved reference?
    pub fn is_reference(&self) -> bool {
        matches!(self, Node::Reference(_))
    }
}

/// Renders nodes close to their source form. Used for unresolved references in the output and in error messages.
impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Block(block) => write!(f, "{} {{ ... }}", block.names.join(" ")),
            Node::Attribute(attribute) => {
                write!(f, "{} = ", attribute.name)?;
                write_flat(f, &attribute.children)
            }
            Node::Map(entries) => {
                f.write_str("{ ")?;
                write_separated(f, entries, ", ")?;
                f.write_str(" }")
            }
            Node::Array(elements) => {
                f.write_str("[")?;
                write_separated(f, elements, ", ")?;
                f.write_str("]")
            }
            Node::Literal(literal) => match literal.kind {
                LiteralKind::String => write!(f, "{:?}", literal.raw),
                _ => f.write_str(&literal.raw),
            },
            Node::Type(marker) => write!(f, "{marker}"),
            Node::Operator(operator) => f.write_str(operator.symbol()),
            Node::Reference(segments) => write!(f, "{}", ReferencePath(segments)),
            Node::Segment(name) => f.write_str(name),
            Node::Call(call) => {
                write!(f, "{}(", call.name)?;
                write_separated(f, &call.arguments, ", ")?;
                if call.expand_final {
                    f.write_str("...")?;
                }
                f.write_str(")")
            }
            Node::Group(children) => {
                f.write_str("(")?;
                write_flat(f, children)?;
                f.write_str(")")
            }
            Node::Interpolation(children) => {
                f.write_str("\"${")?;
                write_flat(f, children)?;
                f.write_str("}\"")
            }
            Node::Comprehension(comprehension) => write!(f, "{comprehension}"),
        }
    }
}

/// Source form of the segments of a [Node::Reference]
pub(crate) struct ReferencePath<'a>(pub &'a [Node]);

impl fmt::Display for ReferencePath<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, segment) in self.0.iter().enumerate() {
            match segment {
                Node::Segment(name) if index == 0 => f.write_str(name)?,
                Node::Segment(name) => write!(f, ".{name}")?,
                other => write!(f, "{other}")?,
            }
        }
        Ok(())
    }
}

fn write_flat(f: &mut fmt::Formatter<'_>, children: &[Node]) -> fmt::Result {
    write_separated(f, children, " ")
}

fn write_separated(f: &mut fmt::Formatter<'_>, children: &[Node], separator: &str) -> fmt::Result {
    for (index, child) in children.iter().enumerate() {
        if index > 0 {
            f.write_str(separator)?;
        }
        write!(f, "{child}")?;
    }
    Ok(())
}

/// `resource "type" "name" { ... }`
#[derive(Debug, Clone, PartialEq, derive_new::new)]
pub struct Block {
    /// identifier followed by all labels, never empty
    pub names: Vec<String>,
    pub children: Vec<Node>,
    #[new(default)]
    pub position: Option<Position>,
}

#[derive(Debug, Clone, PartialEq, derive_new::new)]
pub struct Attribute {
    pub name: AttributeName,
    /// Empty: `null`. A single [Node::Block]: nested object. Otherwise: a flat expression.
    pub children: Vec<Node>,
    #[new(default)]
    pub position: Option<Position>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttributeName {
    Static(String),
    /// Object keys given as expressions, e.g. `{ (local.key) = 1 }`
    Dynamic(Box<Node>),
}

impl fmt::Display for AttributeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeName::Static(name) => f.write_str(name),
            AttributeName::Dynamic(expression) => write!(f, "({expression})"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, derive_new::new)]
pub struct Literal {
    pub kind: LiteralKind,
    /// literal text as written (strings without quotes)
    pub raw: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralKind {
    String,
    Number,
    Boolean,
    Null,
}

/// A primitive type declaration such as `string` or `list(map(string))`
///
/// Kept as written; values are never checked against it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeMarker {
    pub kind: PrimitiveType,
    /// element type of `list(..)`, `map(..)` and `set(..)`
    pub element: Option<Box<TypeMarker>>,
}

impl TypeMarker {
    pub fn primitive(kind: PrimitiveType) -> Self {
        Self {
            kind,
            element: None,
        }
    }

    pub fn collection(kind: PrimitiveType, element: TypeMarker) -> Self {
        Self {
            kind,
            element: Some(Box::new(element)),
        }
    }
}

impl fmt::Display for TypeMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind.as_str())?;
        if let Some(element) = &self.element {
            write!(f, "({element})")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveType {
    Any,
    String,
    Number,
    Bool,
    List,
    Map,
    Set,
}

impl PrimitiveType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrimitiveType::Any => "any",
            PrimitiveType::String => "string",
            PrimitiveType::Number => "number",
            PrimitiveType::Bool => "bool",
            PrimitiveType::List => "list",
            PrimitiveType::Map => "map",
            PrimitiveType::Set => "set",
        }
    }

    /// Types written as a bare word
    pub fn from_keyword(word: &str) -> Option<Self> {
        match word {
            "any" => Some(PrimitiveType::Any),
            "string" => Some(PrimitiveType::String),
            "number" => Some(PrimitiveType::Number),
            "bool" | "boolean" => Some(PrimitiveType::Bool),
            _ => None,
        }
    }

    /// Types written as a call with an element type
    pub fn from_constructor(name: &str) -> Option<Self> {
        match name {
            "list" => Some(PrimitiveType::List),
            "map" => Some(PrimitiveType::Map),
            "set" => Some(PrimitiveType::Set),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    And,
    Or,
    Question,
    Colon,
    Equal,
    NotEqual,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,
    Plus,
    Minus,
    Multiply,
    Divide,
    Modulo,
    Not,
}

impl Operator {
    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::And => "&&",
            Operator::Or => "||",
            Operator::Question => "?",
            Operator::Colon => ":",
            Operator::Equal => "==",
            Operator::NotEqual => "!=",
            Operator::Greater => ">",
            Operator::GreaterEqual => ">=",
            Operator::Less => "<",
            Operator::LessEqual => "<=",
            Operator::Plus => "+",
            Operator::Minus => "-",
            Operator::Multiply => "*",
            Operator::Divide => "/",
            Operator::Modulo => "%",
            Operator::Not => "!",
        }
    }

    pub fn from_symbol(symbol: &str) -> Option<Self> {
        Some(match symbol {
            "&&" => Operator::And,
            "||" => Operator::Or,
            "?" => Operator::Question,
            ":" => Operator::Colon,
            "==" => Operator::Equal,
            "!=" => Operator::NotEqual,
            ">" => Operator::Greater,
            ">=" => Operator::GreaterEqual,
            "<" => Operator::Less,
            "<=" => Operator::LessEqual,
            "+" => Operator::Plus,
            "-" => Operator::Minus,
            "*" => Operator::Multiply,
            "/" => Operator::Divide,
            "%" => Operator::Modulo,
            "!" => Operator::Not,
            _ => return None,
        })
    }

    /// Operators that end the right-hand operand of `&&` and `||`
    pub(crate) fn ends_logical_operand(&self) -> bool {
        matches!(
            self,
            Operator::And | Operator::Or | Operator::Question | Operator::Colon
        )
    }
}

#[derive(Debug, Clone, PartialEq, derive_new::new)]
pub struct FunctionCall {
    pub name: String,
    pub arguments: Vec<Node>,
    /// `f(a, list...)`: the final argument is a list spread into separate arguments
    #[new(default)]
    pub expand_final: bool,
}

/// `[for k, v in collection : value if condition]` and `{for k, v in collection : key => value}`
#[derive(Debug, Clone, PartialEq)]
pub struct Comprehension {
    pub key_var: Option<String>,
    pub value_var: String,
    pub collection: Node,
    /// present for object comprehensions
    pub key: Option<Node>,
    pub value: Node,
    pub condition: Option<Node>,
    /// `key => value...` collects all values with the same key into a list
    pub grouping: bool,
}

impl fmt::Display for Comprehension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (open, close) = if self.key.is_some() {
            ("{", "}")
        } else {
            ("[", "]")
        };
        write!(f, "{open}for ")?;
        if let Some(key_var) = &self.key_var {
            write!(f, "{key_var}, ")?;
        }
        write!(f, "{} in {} : ", self.value_var, self.collection)?;
        if let Some(key) = &self.key {
            write!(f, "{key} => ")?;
        }
        write!(f, "{}", self.value)?;
        if self.grouping {
            f.write_str("...")?;
        }
        if let Some(condition) = &self.condition {
            write!(f, " if {condition}")?;
        }
        f.write_str(close)
    }
}
