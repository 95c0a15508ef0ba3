use thiserror::Error;

use crate::span::Location;
use crate::syntax::Rule;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("lex error at {location}: {message}")]
    Lex { location: Location, message: String },
    #[error("parse error at {location}: {message}")]
    Parse { location: Location, message: String },
    #[error("invalid literal {text}: {message}")]
    InvalidLiteral { text: String, message: String },
    #[error("malformed `{rule}` production: {message}")]
    MalformedTree { rule: Rule, message: String },
    #[error(
        "{kind} literal requires a declared context (it must be the direct initializer of a `let` declaration)"
    )]
    LiteralRequiresDeclaration { kind: &'static str },
}
