//! parse errors
//!
//! Only fatal conditions are errors. Unknown functions, missing references and mismatched operand types
//! degrade to `null` (or leave the current result unchanged) and never show up here.
use crate::syntax::Position;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Unable to parse hcl source")]
    Syntax(#[from] hcl_edit::parser::Error),
    #[error("IO error")]
    Io(#[from] std::io::Error),
    #[error("{what} is not supported{}", at(.position))]
    Unsupported {
        what: &'static str,
        position: Option<Position>,
    },
    #[error("Block scope `{path}` traverses an object array{}", at(.position))]
    BlockTraversesArray {
        path: String,
        position: Option<Position>,
    },
    #[error("Block scope `{path}` traverses an object value{}", at(.position))]
    BlockTraversesValue {
        path: String,
        position: Option<Position>,
    },
    #[error("Invalid numeric literal `{raw}`")]
    InvalidNumber {
        raw: String,
        #[source]
        source: std::num::ParseFloatError,
    },
    #[error("Attribute name `{name}` does not evaluate to a string")]
    InvalidAttributeName { name: String },
    #[error("Cyclic reference `{0}`")]
    CyclicReference(String),
    #[error("Recursion limit of {0} nested references exceeded")]
    RecursionLimit(usize),
    #[error("Function `{name}` failed")]
    Function {
        name: String,
        #[source]
        source: anyhow::Error,
    },
}

fn at(position: &Option<Position>) -> String {
    position
        .map(|position| format!(" (at {position})"))
        .unwrap_or_default()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn display_with_position() {
        let error = Error::BlockTraversesValue {
            path: "resource.x".to_string(),
            position: Some(Position::new(3, 1, 20)),
        };
        assert_eq!(
            error.to_string(),
            "Block scope `resource.x` traverses an object value (at 3:1)"
        );
    }
}
