use std::sync::Arc;

use log::trace;

use crate::ast::{self, BinaryOp, FunctionDef, Node};
use crate::error::{AstError, Error, SyntaxError};
use crate::lexer::{Token, TokenKind, tokenize};

/// Maximum number of open parentheses and prefix `-` around any point of an
/// expression.
pub const MAX_NESTING: usize = 256;
/// Maximum height of a parsed expression tree, leaves counting as 1.
pub const MAX_TREE_HEIGHT: usize = 1024;

/// Parses a token stream into a tree.
///
/// ```text
/// program := funcdef | expr        -- funcdef iff the first token is `(`
/// funcdef := '(' [ident (',' ident)*] ')' '{' expr '}'
/// expr    := mul (('+' | '-') mul)*
/// mul     := unary (('*' | '/') unary)*
/// unary   := '-' unary | primary
/// primary := immediate | ident | '(' expr ')'
/// ```
///
/// Binary operators are left-associative. Tokens left over after a complete
/// program are an error, and so is an expression deeper than
/// [`MAX_NESTING`] or [`MAX_TREE_HEIGHT`], which keeps every later tree walk
/// within a bounded stack.
pub fn parse(tokens: &[Token]) -> Result<Node, SyntaxError> {
    let input = tokens.first().map(|t| Arc::clone(t.source()));
    Parser::new(tokens, input).parse()
}

/// Tokenizes and parses `source`.
pub fn parse_str(source: &str) -> Result<Node, Error> {
    let tokens = tokenize(source)?;
    let input = match tokens.first() {
        Some(t) => Arc::clone(t.source()),
        None => Arc::from(source),
    };
    Ok(Parser::new(&tokens, Some(input)).parse()?)
}

/// A parsed subexpression and the height of its tree.
struct Sub {
    node: Node,
    height: usize,
}

impl Sub {
    fn leaf(node: Node) -> Self {
        Self { node, height: 1 }
    }
}

struct Parser<'t> {
    tokens: &'t [Token],
    pos: usize,
    input: Option<Arc<str>>,
    nesting: usize,
}

impl<'t> Parser<'t> {
    fn new(tokens: &'t [Token], input: Option<Arc<str>>) -> Self {
        Self {
            tokens,
            pos: 0,
            input,
            nesting: 0,
        }
    }

    fn look(&self) -> Option<&'t Token> {
        self.tokens.get(self.pos)
    }

    fn look_kind(&self) -> Option<TokenKind> {
        self.look().map(Token::kind)
    }

    fn bump(&mut self) -> Option<&'t Token> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn error(&self, message: impl Into<String>) -> SyntaxError {
        match self.look() {
            Some(token) => SyntaxError::at(token, message),
            None => SyntaxError::end_of_input(self.input.clone(), message),
        }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<&'t Token, SyntaxError> {
        match self.look() {
            Some(token) if token.kind() == kind => {
                self.pos += 1;
                Ok(token)
            }
            Some(token) => Err(SyntaxError::at(
                token,
                format!("expected {what}, found `{}`", token.text()),
            )),
            None => Err(self.error(format!("expected {what}, found end of input"))),
        }
    }

    /// Enters one level of `(` or prefix `-` opened by `token`.
    fn nest(&mut self, token: &Token) -> Result<(), SyntaxError> {
        if self.nesting == MAX_NESTING {
            return Err(SyntaxError::at(token, "expression nested too deeply"));
        }
        self.nesting += 1;
        Ok(())
    }

    fn unnest(&mut self) {
        self.nesting -= 1;
    }

    fn binary(&self, token: &Token, op: BinaryOp, lhs: Sub, rhs: Sub) -> Result<Sub, SyntaxError> {
        let height = lhs.height.max(rhs.height) + 1;
        if height > MAX_TREE_HEIGHT {
            return Err(SyntaxError::at(token, "expression nested too deeply"));
        }
        Ok(Sub {
            node: Node::binary(op, lhs.node, rhs.node),
            height,
        })
    }

    fn parse(mut self) -> Result<Node, SyntaxError> {
        let node = if self.look_kind() == Some(TokenKind::LeftParen) {
            self.funcdef()?
        } else {
            self.additive()?.node
        };
        if let Some(token) = self.look() {
            let message = match token.kind() {
                TokenKind::RightParen => "unmatched `)`".to_string(),
                TokenKind::RightCurly => "unmatched `}`".to_string(),
                _ => format!("unexpected trailing `{}`", token.text()),
            };
            return Err(SyntaxError::at(token, message));
        }
        trace!("parsed {}", ast::dump(&node));
        Ok(node)
    }

    fn funcdef(&mut self) -> Result<Node, SyntaxError> {
        let open = self.expect(TokenKind::LeftParen, "`(`")?;
        let mut params: Vec<&'t Token> = Vec::new();
        if self.look_kind() == Some(TokenKind::RightParen) {
            self.bump();
        } else {
            loop {
                params.push(self.expect(TokenKind::Identifier, "a parameter name")?);
                match self.look_kind() {
                    Some(TokenKind::Comma) => {
                        self.bump();
                    }
                    Some(TokenKind::RightParen) => {
                        self.bump();
                        break;
                    }
                    Some(TokenKind::Identifier) => {
                        return Err(self.error("expected `,` between parameters"));
                    }
                    Some(_) => return Err(self.error("expected `,` or `)` in parameter list")),
                    None => {
                        return Err(SyntaxError::at(open, "unmatched `(` in parameter list"));
                    }
                }
            }
        }

        let curly = self.expect(TokenKind::LeftCurly, "`{` to open the function body")?;
        let body = self.additive()?.node;
        match self.look_kind() {
            Some(TokenKind::RightCurly) => {
                self.bump();
            }
            Some(_) => return Err(self.error("expected `}` to close the function body")),
            None => return Err(SyntaxError::at(curly, "unmatched `{`")),
        }

        let names = params.iter().map(|t| t.text());
        FunctionDef::new("", names, body)
            .map(Node::FunctionDef)
            .map_err(|e| match &e {
                AstError::DuplicateParameter(name) => {
                    let token = params.iter().rev().find(|t| t.text() == name);
                    match token {
                        Some(token) => SyntaxError::at(token, e.to_string()),
                        None => SyntaxError::at(open, e.to_string()),
                    }
                }
                AstError::InvalidArity { .. } => SyntaxError::at(open, e.to_string()),
            })
    }

    fn additive(&mut self) -> Result<Sub, SyntaxError> {
        let mut sub = self.multiplicative()?;
        loop {
            let (token, op) = match self.look() {
                Some(t) if t.is_operator("+") => (t, BinaryOp::Add),
                Some(t) if t.is_operator("-") => (t, BinaryOp::Sub),
                _ => break,
            };
            self.bump();
            let rhs = self.multiplicative()?;
            sub = self.binary(token, op, sub, rhs)?;
        }
        Ok(sub)
    }

    fn multiplicative(&mut self) -> Result<Sub, SyntaxError> {
        let mut sub = self.unary()?;
        loop {
            let (token, op) = match self.look() {
                Some(t) if t.is_operator("*") => (t, BinaryOp::Mul),
                Some(t) if t.is_operator("/") => (t, BinaryOp::Div),
                _ => break,
            };
            self.bump();
            let rhs = self.unary()?;
            sub = self.binary(token, op, sub, rhs)?;
        }
        Ok(sub)
    }

    fn unary(&mut self) -> Result<Sub, SyntaxError> {
        match self.look() {
            Some(t) if t.is_operator("-") => {
                self.nest(t)?;
                self.bump();
                let operand = self.unary()?;
                self.unnest();
                let height = operand.height + 1;
                if height > MAX_TREE_HEIGHT {
                    return Err(SyntaxError::at(t, "expression nested too deeply"));
                }
                Ok(Sub {
                    node: Node::neg(operand.node),
                    height,
                })
            }
            _ => self.primary(),
        }
    }

    fn primary(&mut self) -> Result<Sub, SyntaxError> {
        let Some(token) = self.look() else {
            return Err(self.error("expected an expression, found end of input"));
        };
        match token.kind() {
            TokenKind::Immediate => {
                self.bump();
                let value: f64 = token.text().parse().map_err(|e| {
                    SyntaxError::at(token, format!("invalid number `{}`: {e}", token.text()))
                })?;
                Ok(Sub::leaf(Node::Immediate(value)))
            }
            TokenKind::Identifier => {
                self.bump();
                Ok(Sub::leaf(Node::Variable(token.text().to_string())))
            }
            TokenKind::LeftParen => {
                self.nest(token)?;
                self.bump();
                let inner = self.additive()?;
                match self.look_kind() {
                    Some(TokenKind::RightParen) => {
                        self.bump();
                        self.unnest();
                        Ok(inner)
                    }
                    Some(_) => Err(self.error("expected `)`")),
                    None => Err(SyntaxError::at(token, "unmatched `(`")),
                }
            }
            _ => Err(SyntaxError::at(
                token,
                format!("unexpected `{}`, expected an expression", token.text()),
            )),
        }
    }
}
