use flatjit::{
    Backend, CompileError, Error, EvalError, Fn0, Fn1, Fn2, Fn3, Fn8, Interpreter, JitFunction,
    MAX_PARAMS, Node, STACK_DEPTH, parse_str,
};

fn backends() -> Vec<Backend> {
    [Backend::Native, Backend::Cranelift]
        .into_iter()
        .filter(|b| b.is_available())
        .collect()
}

fn compile<S: flatjit::Signature>(src: &str, backend: Backend) -> JitFunction<S> {
    let node = parse_str(src).unwrap();
    JitFunction::<S>::compile_with(&node, backend).unwrap()
}

fn compile_err<S: flatjit::Signature>(node: &Node) -> Vec<CompileError> {
    backends()
        .into_iter()
        .map(|b| JitFunction::<S>::compile_with(node, b).unwrap_err())
        .collect()
}

/// `a + (a + (... + a))` with `leaves` operands: needs `leaves` live values.
fn right_nested_sum(leaves: usize) -> String {
    let mut body = "a".to_string();
    for _ in 1..leaves {
        body = format!("a + ({body})");
    }
    format!("(a) {{ {body} }}")
}

#[test]
fn two_parameter_sum_matches_interpreter() {
    let interp = Interpreter::from_source("(a, b) { a + b }", 2).unwrap();
    let expected = interp.call(&[3.14, 2.71]).unwrap();
    for backend in backends() {
        let f = compile::<Fn2>("(a, b) { a + b }", backend);
        assert_eq!(f.call(3.14, 2.71), 5.85, "{backend:?}");
        assert_eq!(f.call(3.14, 2.71).to_bits(), expected.to_bits(), "{backend:?}");
        assert_eq!(f.backend(), backend);
    }
}

#[test]
fn three_parameter_product() {
    for backend in backends() {
        let f = compile::<Fn3>("(a, b, c) { a * (b + c) }", backend);
        assert_eq!(f.call(2.0, 3.14, 2.71), 11.7, "{backend:?}");
    }
}

#[test]
fn constants_only() {
    for backend in backends() {
        let f = compile::<Fn0>("() { 1.5 * 4 - 0.25 / 0.5 }", backend);
        assert_eq!(f.call(), 5.5, "{backend:?}");
        assert_eq!(f.arity(), 0);
    }
}

#[test]
fn all_eight_argument_registers() {
    let src = "(a, b, c, d, e, f, g, h) { a - b * c + d / e - f + g * h }";
    let interp = Interpreter::from_source(src, 8).unwrap();
    let args = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0];
    let expected = interp.call(&args).unwrap();
    for backend in backends() {
        let f = compile::<Fn8>(src, backend);
        let got = f.call(1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0);
        assert_eq!(got.to_bits(), expected.to_bits(), "{backend:?}");
        assert_eq!(f.params().len(), MAX_PARAMS);
    }
}

#[test]
fn parameter_order_follows_declaration() {
    for backend in backends() {
        let f = compile::<Fn2>("(x, y) { x - y }", backend);
        assert_eq!(f.call(10.0, 4.0), 6.0);
        let g = compile::<Fn2>("(x, y) { y - x }", backend);
        assert_eq!(g.call(10.0, 4.0), -6.0);
    }
}

#[test]
fn unused_and_repeated_parameters() {
    for backend in backends() {
        let f = compile::<Fn3>("(a, b, c) { c * c }", backend);
        assert_eq!(f.call(1.0, 2.0, 3.0), 9.0);
    }
}

#[test]
fn negation_preserves_signed_zero() {
    for backend in backends() {
        let f = compile::<Fn1>("(a) { -a }", backend);
        assert_eq!(f.call(0.0).to_bits(), (-0.0f64).to_bits(), "{backend:?}");
        assert_eq!(f.call(-0.0).to_bits(), 0.0f64.to_bits(), "{backend:?}");
        assert_eq!(f.call(2.5), -2.5);
    }
}

#[test]
fn ieee_special_values() {
    for backend in backends() {
        let f = compile::<Fn2>("(a, b) { a / b }", backend);
        assert_eq!(f.call(1.0, 0.0), f64::INFINITY);
        assert_eq!(f.call(-1.0, 0.0), f64::NEG_INFINITY);
        assert!(f.call(0.0, 0.0).is_nan());
        assert!(f.call(f64::NAN, 1.0).is_nan());

        let g = compile::<Fn0>("() { 1e308 * 10 }", backend);
        assert_eq!(g.call(), f64::INFINITY);
    }
}

#[test]
fn stack_depth_boundary() {
    let fits = parse_str(&right_nested_sum(STACK_DEPTH)).unwrap();
    for backend in backends() {
        let f = JitFunction::<Fn1>::compile_with(&fits, backend).unwrap();
        assert_eq!(f.call(1.0), STACK_DEPTH as f64);
    }

    let too_deep = parse_str(&right_nested_sum(STACK_DEPTH + 1)).unwrap();
    for err in compile_err::<Fn1>(&too_deep) {
        assert!(matches!(err, CompileError::RegisterExhaustion { limit } if limit == STACK_DEPTH));
    }
}

#[test]
fn depth_counts_live_values_not_nesting() {
    // Left-nested chains never hold more than two values.
    let body = vec!["a"; 40].join(" + ");
    let src = format!("(a) {{ {body} }}");
    for backend in backends() {
        let f = compile::<Fn1>(&src, backend);
        assert_eq!(f.call(0.5), 20.0);
    }
    // Deep unary nesting does not grow the stack either.
    let src = format!("(a) {{ {}a }}", "-".repeat(30));
    for backend in backends() {
        let f = compile::<Fn1>(&src, backend);
        assert_eq!(f.call(3.0), 3.0);
    }
}

#[test]
fn rejects_non_function() {
    let node = parse_str("1 + 2").unwrap();
    for err in compile_err::<Fn0>(&node) {
        assert!(matches!(err, CompileError::NotAFunction));
    }
}

#[test]
fn rejects_signature_mismatch() {
    let node = parse_str("(a, b) { a }").unwrap();
    for err in compile_err::<Fn1>(&node) {
        assert!(matches!(
            err,
            CompileError::SignatureMismatch { declared: 1, params: 2 }
        ));
    }
}

#[test]
fn rejects_too_many_parameters() {
    let node = parse_str("(a, b, c, d, e, f, g, h, i) { a }").unwrap();
    for err in compile_err::<Fn8>(&node) {
        assert!(matches!(
            err,
            CompileError::TooManyParameters { count: 9, max: 8 }
        ));
    }
}

#[test]
fn rejects_free_variable() {
    let node = parse_str("(a) { a * scale }").unwrap();
    for err in compile_err::<Fn1>(&node) {
        assert!(matches!(err, CompileError::FreeVariable(ref name) if name == "scale"));
    }
}

#[test]
fn rejects_nested_function() {
    let inner = Node::function("inner", ["b"], Node::var("b")).unwrap();
    let node = Node::function("outer", ["a"], Node::add(Node::var("a"), inner)).unwrap();
    for err in compile_err::<Fn1>(&node) {
        assert!(matches!(err, CompileError::NestedFunction));
    }
}

#[cfg(not(all(target_arch = "x86_64", unix)))]
#[test]
fn native_backend_needs_x86_64_unix() {
    let node = parse_str("(a) { a }").unwrap();
    let err = JitFunction::<Fn1>::compile_with(&node, Backend::Native).unwrap_err();
    assert!(matches!(err, CompileError::UnsupportedTarget));
    assert_eq!(Backend::default(), Backend::Cranelift);
}

#[cfg(all(target_arch = "x86_64", unix))]
#[test]
fn native_is_the_default_backend() {
    assert_eq!(Backend::default(), Backend::Native);
    let f = JitFunction::<Fn1>::from_source("(a) { a * 2 }").unwrap();
    assert_eq!(f.backend(), Backend::Native);
}

#[test]
fn from_source_reports_every_stage() {
    assert!(matches!(
        JitFunction::<Fn1>::from_source("(a) { a @ }"),
        Err(Error::Lex(_))
    ));
    assert!(matches!(
        JitFunction::<Fn1>::from_source("(a) { a + }"),
        Err(Error::Syntax(_))
    ));
    assert!(matches!(
        JitFunction::<Fn1>::from_source("(a) { b }"),
        Err(Error::Compile(CompileError::FreeVariable(_)))
    ));
}

#[test]
fn call_slice_checks_arity() {
    for backend in backends() {
        let f = compile::<Fn2>("(a, b) { a * b }", backend);
        assert_eq!(f.call_slice(&[3.0, 4.0]).unwrap(), 12.0);
        assert_eq!(
            f.call_slice(&[3.0]).unwrap_err(),
            EvalError::ArityMismatch { expected: 2, found: 1 }
        );
    }
}

#[test]
fn raw_function_pointer() {
    for backend in backends() {
        let f = compile::<Fn2>("(a, b) { a - b }", backend);
        let raw: Fn2 = unsafe { f.as_fn() };
        assert_eq!(raw(5.0, 3.0), 2.0);
    }
}

#[test]
fn accessors_and_debug() {
    let f = compile::<Fn2>("(left, right) { left + right }", Backend::Cranelift);
    assert_eq!(f.params(), ["left", "right"]);
    assert_eq!(f.arity(), 2);
    let shown = format!("{f:?}");
    assert!(shown.contains("left"));
    assert!(shown.contains("Cranelift"));
}

#[test]
fn many_functions_coexist() {
    let fs: Vec<JitFunction<Fn1>> = (0..32)
        .map(|i| compile::<Fn1>(&format!("(x) {{ x + {i} }}"), Backend::default()))
        .collect();
    for (i, f) in fs.iter().enumerate() {
        assert_eq!(f.call(0.5), i as f64 + 0.5);
    }
}
