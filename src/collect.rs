use std::collections::HashSet;

use crate::ast::{FunctionDef, Node};
use crate::codegen::MAX_PARAMS;
use crate::error::CompileError;

/// Variable names in left-to-right first-appearance order.
pub(crate) fn collect_vars(node: &Node) -> Vec<String> {
    fn walk(node: &Node, seen: &mut HashSet<String>, out: &mut Vec<String>) {
        match node {
            Node::Immediate(_) => {}
            Node::Variable(name) => {
                if seen.insert(name.clone()) {
                    out.push(name.clone());
                }
            }
            Node::Unary { operand, .. } => walk(operand, seen, out),
            Node::Binary { lhs, rhs, .. } => {
                walk(lhs, seen, out);
                walk(rhs, seen, out);
            }
            Node::FunctionDef(def) => walk(def.body(), seen, out),
        }
    }
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    walk(node, &mut seen, &mut out);
    out
}

pub(crate) fn contains_function_def(node: &Node) -> bool {
    match node {
        Node::Immediate(_) | Node::Variable(_) => false,
        Node::Unary { operand, .. } => contains_function_def(operand),
        Node::Binary { lhs, rhs, .. } => contains_function_def(lhs) || contains_function_def(rhs),
        Node::FunctionDef(_) => true,
    }
}

/// Rejects definitions the JIT cannot lower, before any code is emitted.
pub(crate) fn check_compilable(def: &FunctionDef, declared: usize) -> Result<(), CompileError> {
    if def.arity() > MAX_PARAMS {
        return Err(CompileError::TooManyParameters {
            count: def.arity(),
            max: MAX_PARAMS,
        });
    }
    if declared != def.arity() {
        return Err(CompileError::SignatureMismatch {
            declared,
            params: def.arity(),
        });
    }
    if contains_function_def(def.body()) {
        return Err(CompileError::NestedFunction);
    }
    if let Some(free) = collect_vars(def.body())
        .into_iter()
        .find(|name| def.param_index(name).is_none())
    {
        return Err(CompileError::FreeVariable(free));
    }
    Ok(())
}
