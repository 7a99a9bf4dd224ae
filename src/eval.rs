use crate::ast::Node;
use crate::env::{EmptyEnv, Environment};
use crate::error::{Error, EvalError};
use crate::parser::parse_str;

/// Walks `node` and computes its value.
///
/// Operands are evaluated left to right. Arithmetic follows IEEE-754 exactly,
/// so `1 / 0` is `+inf` rather than an error. A function definition evaluates
/// its body in `env` unchanged; binding arguments is the
/// [`Interpreter`](crate::Interpreter)'s job.
pub fn evaluate<E: Environment + ?Sized>(env: &E, node: &Node) -> Result<f64, EvalError> {
    match node {
        Node::Variable(name) => env
            .lookup(name)
            .ok_or_else(|| EvalError::UnboundVariable(name.clone())),
        Node::Immediate(value) => Ok(*value),
        Node::Unary { op, operand } => {
            let x = evaluate(env, operand)?;
            Ok(op.apply(x))
        }
        Node::Binary { op, lhs, rhs } => {
            let x = evaluate(env, lhs)?;
            let y = evaluate(env, rhs)?;
            Ok(op.apply(x, y))
        }
        Node::FunctionDef(def) => evaluate(env, def.body()),
    }
}

/// Tokenizes, parses and evaluates `source` with no variables bound.
pub fn eval_str(source: &str) -> Result<f64, Error> {
    let node = parse_str(source)?;
    Ok(evaluate(&EmptyEnv, &node)?)
}
