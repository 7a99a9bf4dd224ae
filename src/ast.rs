use std::collections::HashSet;
use std::fmt;

use crate::error::AstError;

/// Binary arithmetic operators. Every one takes exactly two operands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOp {
    /// IEEE-754 semantics of the operator; division by zero yields ±∞ or NaN.
    pub fn apply(self, x: f64, y: f64) -> f64 {
        match self {
            BinaryOp::Add => x + y,
            BinaryOp::Sub => x - y,
            BinaryOp::Mul => x * y,
            BinaryOp::Div => x / y,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
        }
    }
}

/// Unary operators. Every one takes exactly one operand.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    /// Sign-bit flip: `-0.0` for `0.0`, and NaN keeps its payload.
    Neg,
}

impl UnaryOp {
    pub fn apply(self, x: f64) -> f64 {
        match self {
            UnaryOp::Neg => -x,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Neg => "neg",
        }
    }
}

/// Any operator, used where the operand count is not known statically.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operator {
    Binary(BinaryOp),
    Unary(UnaryOp),
}

impl Operator {
    pub const ADD: Operator = Operator::Binary(BinaryOp::Add);
    pub const SUB: Operator = Operator::Binary(BinaryOp::Sub);
    pub const MUL: Operator = Operator::Binary(BinaryOp::Mul);
    pub const DIV: Operator = Operator::Binary(BinaryOp::Div);
    pub const NEG: Operator = Operator::Unary(UnaryOp::Neg);

    pub fn arity(self) -> usize {
        match self {
            Operator::Binary(_) => 2,
            Operator::Unary(_) => 1,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Operator::Binary(op) => op.symbol(),
            Operator::Unary(op) => op.symbol(),
        }
    }
}

impl From<BinaryOp> for Operator {
    fn from(op: BinaryOp) -> Self {
        Operator::Binary(op)
    }
}

impl From<UnaryOp> for Operator {
    fn from(op: UnaryOp) -> Self {
        Operator::Unary(op)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// AST nodes. Every intermediate value and the final result is an `f64`.
///
/// The tree is strict: each node owns its operands and nothing is shared.
/// The operand count of an expression is part of its variant, so a
/// well-typed `Node` can never carry the wrong number of operands.
#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    /// Reference to a function parameter (e.g. `a`).
    Variable(String),
    /// Numeric literal (e.g. `1`, `3.14`, `2.5e-4`).
    Immediate(f64),
    /// Single-operand expression (`-x`).
    Unary { op: UnaryOp, operand: Box<Node> },
    /// Two-operand expression (`a + b`, `a / b`, ...).
    Binary {
        op: BinaryOp,
        lhs: Box<Node>,
        rhs: Box<Node>,
    },
    /// Function definition `(params) { body }`.
    FunctionDef(FunctionDef),
}

impl Node {
    pub fn var(name: impl Into<String>) -> Node {
        Node::Variable(name.into())
    }

    pub fn imm(value: f64) -> Node {
        Node::Immediate(value)
    }

    pub fn binary(op: BinaryOp, lhs: Node, rhs: Node) -> Node {
        Node::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn add(lhs: Node, rhs: Node) -> Node {
        Node::binary(BinaryOp::Add, lhs, rhs)
    }

    pub fn sub(lhs: Node, rhs: Node) -> Node {
        Node::binary(BinaryOp::Sub, lhs, rhs)
    }

    pub fn mul(lhs: Node, rhs: Node) -> Node {
        Node::binary(BinaryOp::Mul, lhs, rhs)
    }

    pub fn div(lhs: Node, rhs: Node) -> Node {
        Node::binary(BinaryOp::Div, lhs, rhs)
    }

    pub fn neg(operand: Node) -> Node {
        Node::Unary {
            op: UnaryOp::Neg,
            operand: Box::new(operand),
        }
    }

    /// Builds an expression from an operator and an operand list, checking
    /// the operand count against the operator's arity.
    pub fn expression(operator: Operator, operands: Vec<Node>) -> Result<Node, AstError> {
        let found = operands.len();
        let invalid = AstError::InvalidArity {
            operator,
            expected: operator.arity(),
            found,
        };
        let mut operands = operands.into_iter();
        match (operator, operands.next(), operands.next(), operands.next()) {
            (Operator::Binary(op), Some(lhs), Some(rhs), None) => Ok(Node::binary(op, lhs, rhs)),
            (Operator::Unary(op), Some(operand), None, None) => Ok(Node::Unary {
                op,
                operand: Box::new(operand),
            }),
            _ => Err(invalid),
        }
    }

    pub fn function(
        name: impl Into<String>,
        params: impl IntoIterator<Item = impl Into<String>>,
        body: Node,
    ) -> Result<Node, AstError> {
        FunctionDef::new(name, params, body).map(Node::FunctionDef)
    }

    pub fn as_function(&self) -> Option<&FunctionDef> {
        match self {
            Node::FunctionDef(def) => Some(def),
            _ => None,
        }
    }
}

/// A function definition. Parameter names are unique; the parser produces
/// definitions with an empty name.
#[derive(Clone, Debug, PartialEq)]
pub struct FunctionDef {
    name: String,
    params: Vec<String>,
    body: Box<Node>,
}

impl FunctionDef {
    pub fn new(
        name: impl Into<String>,
        params: impl IntoIterator<Item = impl Into<String>>,
        body: Node,
    ) -> Result<FunctionDef, AstError> {
        let params: Vec<String> = params.into_iter().map(Into::into).collect();
        let mut seen = HashSet::new();
        if let Some(dup) = params.iter().find(|p| !seen.insert(p.as_str())) {
            return Err(AstError::DuplicateParameter(dup.clone()));
        }
        Ok(FunctionDef {
            name: name.into(),
            params,
            body: Box::new(body),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[String] {
        &self.params
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    pub fn body(&self) -> &Node {
        &self.body
    }

    pub fn param_index(&self, name: &str) -> Option<usize> {
        self.params.iter().position(|p| p == name)
    }
}

/// Human-readable form of a tree, for test diagnostics only.
///
/// The format is deterministic but not a stable interchange format:
/// `Var{a}`, `Imm{3.14}`, `Expr{+(Imm{1.0}, Var{b})}`, `f(a, b) {Var{a}}`.
pub fn dump(node: &Node) -> String {
    let mut out = String::new();
    dump_into(node, &mut out);
    out
}

fn dump_into(node: &Node, out: &mut String) {
    match node {
        Node::Variable(name) => {
            out.push_str("Var{");
            out.push_str(name);
            out.push('}');
        }
        Node::Immediate(value) => out.push_str(&format!("Imm{{{value:?}}}")),
        Node::Unary { op, operand } => {
            out.push_str("Expr{");
            out.push_str(op.symbol());
            out.push('(');
            dump_into(operand, out);
            out.push_str(")}");
        }
        Node::Binary { op, lhs, rhs } => {
            out.push_str("Expr{");
            out.push_str(op.symbol());
            out.push('(');
            dump_into(lhs, out);
            out.push_str(", ");
            dump_into(rhs, out);
            out.push_str(")}");
        }
        Node::FunctionDef(def) => {
            out.push_str(&def.name);
            out.push('(');
            out.push_str(&def.params.join(", "));
            out.push_str(") {");
            dump_into(&def.body, out);
            out.push('}');
        }
    }
}
