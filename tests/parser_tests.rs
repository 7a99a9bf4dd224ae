use flatjit::{
    Error, Location, MAX_NESTING, MAX_TREE_HEIGHT, Node, SyntaxError, eval_str, parse, parse_str,
    tokenize,
};

fn syntax_err(src: &str) -> SyntaxError {
    match parse_str(src) {
        Err(Error::Syntax(e)) => e,
        other => panic!("expected a syntax error for {src:?}, got {other:?}"),
    }
}

fn var(name: &str) -> Node {
    Node::var(name)
}

fn imm(v: f64) -> Node {
    Node::imm(v)
}

#[test]
fn addition_is_left_associative() {
    let node = parse_str("1 + 3.14 + 2.71").unwrap();
    assert_eq!(node, Node::add(Node::add(imm(1.0), imm(3.14)), imm(2.71)));
    assert_ne!(node, Node::add(imm(1.0), Node::add(imm(3.14), imm(2.71))));
}

#[test]
fn subtraction_and_division_are_left_associative() {
    assert_eq!(
        parse_str("a - b - c").unwrap(),
        Node::sub(Node::sub(var("a"), var("b")), var("c"))
    );
    assert_eq!(
        parse_str("a / b / c").unwrap(),
        Node::div(Node::div(var("a"), var("b")), var("c"))
    );
}

#[test]
fn multiplication_binds_tighter() {
    assert_eq!(
        parse_str("1 + 2 * 3 - 4 / x").unwrap(),
        Node::sub(
            Node::add(imm(1.0), Node::mul(imm(2.0), imm(3.0))),
            Node::div(imm(4.0), var("x"))
        )
    );
}

#[test]
fn parentheses_group() {
    assert_eq!(
        parse_str("2 * (3.14 + 2.71)").unwrap(),
        Node::mul(imm(2.0), Node::add(imm(3.14), imm(2.71)))
    );
    assert_eq!(parse_str("x + ((y))").unwrap(), Node::add(var("x"), var("y")));
}

#[test]
fn prefix_minus() {
    assert_eq!(parse_str("-a * b").unwrap(), Node::mul(Node::neg(var("a")), var("b")));
    assert_eq!(parse_str("a - -b").unwrap(), Node::sub(var("a"), Node::neg(var("b"))));
    assert_eq!(parse_str("--2").unwrap(), Node::neg(Node::neg(imm(2.0))));
}

#[test]
fn function_definition() {
    let node = parse_str("(a, b) { a + b }").unwrap();
    let expected = Node::function("", ["a", "b"], Node::add(var("a"), var("b"))).unwrap();
    assert_eq!(node, expected);

    let def = node.as_function().unwrap();
    assert_eq!(def.name(), "");
    assert_eq!(def.params(), ["a", "b"]);
    assert_eq!(def.param_index("b"), Some(1));
}

#[test]
fn function_with_zero_parameters() {
    let node = parse_str("() { 42 }").unwrap();
    let def = node.as_function().unwrap();
    assert_eq!(def.arity(), 0);
    assert_eq!(def.body(), &imm(42.0));
}

#[test]
fn bare_expression_is_not_wrapped() {
    assert!(parse_str("a + 1").unwrap().as_function().is_none());
}

#[test]
fn leading_paren_always_starts_a_function() {
    let err = syntax_err("(1 + 2) * 3");
    assert_eq!(err.position(), Some(1));
    assert_eq!(err.message(), "expected a parameter name, found `1`");
}

#[test]
fn parse_takes_tokens() {
    let tokens = tokenize("x * 2").unwrap();
    assert_eq!(parse(&tokens).unwrap(), Node::mul(var("x"), imm(2.0)));
}

#[test]
fn unmatched_delimiters() {
    let err = syntax_err("2 * (3 + 4");
    assert_eq!(err.message(), "unmatched `(`");
    assert_eq!(err.position(), Some(4));

    let err = syntax_err("1 + 2)");
    assert_eq!(err.message(), "unmatched `)`");
    assert_eq!(err.position(), Some(5));

    let err = syntax_err("(a) { a");
    assert_eq!(err.message(), "unmatched `{`");
    assert_eq!(err.position(), Some(4));

    let err = syntax_err("(a) { a } }");
    assert_eq!(err.message(), "unmatched `}`");
    assert_eq!(err.position(), Some(10));

    let err = syntax_err("(a, b");
    assert_eq!(err.message(), "unmatched `(` in parameter list");
    assert_eq!(err.position(), Some(0));
}

#[test]
fn parameter_list_errors() {
    let err = syntax_err("(a b) { a }");
    assert_eq!(err.message(), "expected `,` between parameters");
    assert_eq!(err.position(), Some(3));

    let err = syntax_err("(a, ) { a }");
    assert_eq!(err.message(), "expected a parameter name, found `)`");
    assert_eq!(err.position(), Some(4));

    let err = syntax_err("(a + b) { a }");
    assert_eq!(err.message(), "expected `,` or `)` in parameter list");
    assert_eq!(err.position(), Some(3));

    let err = syntax_err("(a, a) { a }");
    assert_eq!(err.message(), "duplicate parameter `a`");
    assert_eq!(err.position(), Some(4));
}

#[test]
fn function_body_errors() {
    let err = syntax_err("(a) a");
    assert_eq!(err.message(), "expected `{` to open the function body, found `a`");

    let err = syntax_err("(a)");
    assert_eq!(err.location(), Location::EndOfInput);
    assert_eq!(
        err.message(),
        "expected `{` to open the function body, found end of input"
    );

    let err = syntax_err("(a) { a b }");
    assert_eq!(err.message(), "expected `}` to close the function body");
    assert_eq!(err.position(), Some(8));

    let err = syntax_err("(a) { }");
    assert_eq!(err.message(), "unexpected `}`, expected an expression");
}

#[test]
fn unexpected_end_of_input() {
    let err = syntax_err("1 +");
    assert_eq!(err.location(), Location::EndOfInput);
    assert_eq!(err.position(), None);
    assert_eq!(err.to_string(), "expected an expression, found end of input at end of input");

    assert_eq!(syntax_err("").location(), Location::EndOfInput);
}

#[test]
fn unexpected_token_in_primary() {
    let err = syntax_err("* 2");
    assert_eq!(err.message(), "unexpected `*`, expected an expression");
    assert_eq!(err.position(), Some(0));

    let err = syntax_err("1 + ,");
    assert_eq!(err.position(), Some(4));
}

#[test]
fn trailing_tokens_are_rejected() {
    let err = syntax_err("1 2");
    assert_eq!(err.message(), "unexpected trailing `2`");
    assert_eq!(err.position(), Some(2));

    let err = syntax_err("(a) { a } (b) { b }");
    assert_eq!(err.message(), "unexpected trailing `(`");
}

#[test]
fn lexical_errors_pass_through() {
    assert!(matches!(parse_str("1 + @"), Err(Error::Lex(e)) if e.position() == 4));
}

#[test]
fn deep_parentheses_are_rejected() {
    let src = format!("1 + {}1{}", "(".repeat(100_000), ")".repeat(100_000));
    let err = syntax_err(&src);
    assert_eq!(err.message(), "expression nested too deeply");
    assert_eq!(err.position(), Some(4 + MAX_NESTING));
}

#[test]
fn deep_negation_is_rejected() {
    let src = format!("{}1", "-".repeat(100_000));
    let err = syntax_err(&src);
    assert_eq!(err.message(), "expression nested too deeply");
    assert_eq!(err.position(), Some(MAX_NESTING));
}

#[test]
fn nesting_at_the_limit_parses() {
    let src = format!("1 + {}x{}", "(".repeat(MAX_NESTING), ")".repeat(MAX_NESTING));
    assert_eq!(parse_str(&src).unwrap(), Node::add(imm(1.0), var("x")));

    let src = format!("{}2", "-".repeat(MAX_NESTING));
    assert_eq!(eval_str(&src).unwrap(), 2.0);
}

#[test]
fn long_operator_chain_is_bounded() {
    let at_limit = vec!["1"; MAX_TREE_HEIGHT].join(" + ");
    assert_eq!(eval_str(&at_limit).unwrap(), MAX_TREE_HEIGHT as f64);

    let src = vec!["1"; 100_000].join(" * ");
    let err = syntax_err(&src);
    assert_eq!(err.message(), "expression nested too deeply");
    assert_eq!(err.position(), Some(4 * (MAX_TREE_HEIGHT - 1) + 2));
}

#[test]
fn deep_input_fails_through_eval_str() {
    let src = format!("{}x", "-(".repeat(50_000));
    match eval_str(&src) {
        Err(Error::Syntax(e)) => assert_eq!(e.message(), "expression nested too deeply"),
        other => panic!("expected a syntax error, got {other:?}"),
    }
}
