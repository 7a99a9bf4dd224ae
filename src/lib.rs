mod error;
mod env;
mod rt_types;
mod ast;
mod lexer;
mod parser;
mod eval;
mod interpreter;
mod collect;
mod emitter;
mod codegen;
mod clif;
#[cfg(all(target_arch = "x86_64", unix))]
mod memory;
#[cfg(all(target_arch = "x86_64", unix))]
mod x64;
mod engine;
pub mod diagnostic;

pub use error::{AstError, CompileError, Error, EvalError, LexError, Location, SyntaxError};
pub use env::{EmptyEnv, Environment};
pub use rt_types::{Fn0, Fn1, Fn2, Fn3, Fn4, Fn5, Fn6, Fn7, Fn8, Signature};
pub use ast::{BinaryOp, FunctionDef, Node, Operator, UnaryOp, dump};
pub use lexer::{Span, Token, TokenKind, tokenize};
pub use parser::{MAX_NESTING, MAX_TREE_HEIGHT, parse, parse_str};
pub use eval::{eval_str, evaluate};
pub use interpreter::Interpreter;
pub use codegen::{MAX_PARAMS, STACK_DEPTH};

pub use engine::{Backend, JitFunction};
