use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::ast::Operator;
use crate::diagnostic;
use crate::lexer::{Span, Token};

/// Umbrella error for the helpers that run several pipeline stages at once
/// (`parse_str`, `eval_str`, `Interpreter::from_source`, `JitFunction::from_source`).
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error(transparent)]
    Syntax(#[from] SyntaxError),
    #[error(transparent)]
    Ast(#[from] AstError),
    #[error(transparent)]
    Eval(#[from] EvalError),
    #[error(transparent)]
    Compile(#[from] CompileError),
}

impl Error {
    /// Caret diagnostic for lexical and syntax errors, `None` for the rest.
    pub fn diagnostic(&self) -> Option<String> {
        match self {
            Error::Lex(e) => Some(e.diagnostic()),
            Error::Syntax(e) => Some(e.diagnostic()),
            _ => None,
        }
    }
}

/// The first lexical error of a source text.
///
/// The offending text is kept as an [`Invalid`](crate::TokenKind::Invalid)
/// token so that the diagnostic can be rendered against the shared source.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message} at byte {}", .token.offset())]
pub struct LexError {
    pub(crate) token: Token,
    pub(crate) message: String,
}

impl LexError {
    pub(crate) fn new(token: Token, message: impl Into<String>) -> Self {
        Self {
            token,
            message: message.into(),
        }
    }

    /// Byte offset of the offending text.
    pub fn position(&self) -> usize {
        self.token.offset()
    }

    pub fn span(&self) -> Span {
        self.token.span()
    }

    pub fn token(&self) -> &Token {
        &self.token
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn diagnostic(&self) -> String {
        diagnostic::render(self.token.source(), self.token.span(), &self.message)
    }
}

/// Where a syntax error was detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    At(Span),
    EndOfInput,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::At(span) => write!(f, "at byte {}", span.offset),
            Location::EndOfInput => f.write_str("at end of input"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message} {location}")]
pub struct SyntaxError {
    pub(crate) location: Location,
    pub(crate) message: String,
    pub(crate) input: Option<Arc<str>>,
}

impl SyntaxError {
    pub(crate) fn at(token: &Token, message: impl Into<String>) -> Self {
        Self {
            location: Location::At(token.span()),
            message: message.into(),
            input: Some(token.source().clone()),
        }
    }

    pub(crate) fn end_of_input(input: Option<Arc<str>>, message: impl Into<String>) -> Self {
        Self {
            location: Location::EndOfInput,
            message: message.into(),
            input,
        }
    }

    pub fn location(&self) -> Location {
        self.location
    }

    /// Byte offset of the offending token, `None` at end of input.
    pub fn position(&self) -> Option<usize> {
        match self.location {
            Location::At(span) => Some(span.offset),
            Location::EndOfInput => None,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn diagnostic(&self) -> String {
        let Some(input) = &self.input else {
            return format!("[error] {}", self.message);
        };
        let span = match self.location {
            Location::At(span) => span,
            Location::EndOfInput => Span::new(input.len(), 1),
        };
        diagnostic::render(input, span, &self.message)
    }
}

/// Misuse of the AST construction API.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AstError {
    #[error("operator `{operator}` takes {expected} operand(s), found {found}")]
    InvalidArity {
        operator: Operator,
        expected: usize,
        found: usize,
    },
    #[error("duplicate parameter `{0}`")]
    DuplicateParameter(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("unbound variable `{0}`")]
    UnboundVariable(String),
    #[error("function takes {expected} argument(s), but {found} were supplied")]
    ArityMismatch { expected: usize, found: usize },
    #[error("expected a function definition")]
    NotAFunction,
}

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("expected a function definition")]
    NotAFunction,
    #[error("signature takes {declared} argument(s), but the function declares {params}")]
    SignatureMismatch { declared: usize, params: usize },
    #[error("{count} parameters exceed the {max} floating-point argument registers")]
    TooManyParameters { count: usize, max: usize },
    #[error("free variable `{0}` is not a parameter")]
    FreeVariable(String),
    #[error("nested function definitions cannot be compiled")]
    NestedFunction,
    #[error("expression needs more than {limit} live values")]
    RegisterExhaustion { limit: usize },
    #[error("the native backend is not available on this target")]
    UnsupportedTarget,
    #[error("executable memory: {0}")]
    Memory(#[from] std::io::Error),
    #[error("jit internal error: {0}")]
    Backend(String),
}
