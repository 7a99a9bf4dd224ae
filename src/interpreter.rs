use std::collections::HashMap;

use crate::ast::{FunctionDef, Node};
use crate::error::{Error, EvalError};
use crate::eval::evaluate;
use crate::parser::parse_str;

/// A function definition callable with a fixed number of `f64` arguments.
///
/// Every call binds the arguments into a fresh environment and walks the body.
/// Nothing is cached between calls, which makes this the reference semantics
/// that [`JitFunction`](crate::JitFunction) is tested against.
#[derive(Clone, Debug)]
pub struct Interpreter {
    def: FunctionDef,
}

impl Interpreter {
    /// Wraps `node`, which must be a function definition taking `arity` parameters.
    pub fn new(node: Node, arity: usize) -> Result<Self, EvalError> {
        let Node::FunctionDef(def) = node else {
            return Err(EvalError::NotAFunction);
        };
        if def.arity() != arity {
            return Err(EvalError::ArityMismatch {
                expected: def.arity(),
                found: arity,
            });
        }
        Ok(Self { def })
    }

    pub fn from_source(source: &str, arity: usize) -> Result<Self, Error> {
        let node = parse_str(source)?;
        Ok(Self::new(node, arity)?)
    }

    pub fn arity(&self) -> usize {
        self.def.arity()
    }

    pub fn params(&self) -> &[String] {
        self.def.params()
    }

    pub fn definition(&self) -> &FunctionDef {
        &self.def
    }

    pub fn call(&self, args: &[f64]) -> Result<f64, EvalError> {
        if args.len() != self.def.arity() {
            return Err(EvalError::ArityMismatch {
                expected: self.def.arity(),
                found: args.len(),
            });
        }
        let env: HashMap<String, f64> = self
            .def
            .params()
            .iter()
            .cloned()
            .zip(args.iter().copied())
            .collect();
        evaluate(&env, self.def.body())
    }
}
