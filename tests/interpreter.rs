#[cfg(test)]
mod interpreter_tests {
    use std::cell::RefCell;
    use std::io::{self, Write};
    use std::rc::Rc;

    use pretty_assertions::assert_eq;

    use sprig::ast::NodeKind;
    use sprig::diagnostics::RuntimeError;
    use sprig::observer::{OutputEvent, Recorder, StepPhase};
    use sprig::*;

    fn eval(source: &str) -> Object {
        match run(source) {
            Ok(value) => value,
            Err(e) => panic!("{:?} failed:\n{}", source, e),
        }
    }

    fn eval_to_string(source: &str) -> String {
        eval(source).inspect()
    }

    fn runtime_error(source: &str) -> RuntimeError {
        match run(source) {
            Err(SprigError::Runtime(err)) => *err,
            other => panic!("expected a runtime error from {:?}, got {:?}", source, other),
        }
    }

    fn error_message(source: &str) -> String {
        runtime_error(source).message
    }

    /// `print` sink the test can read back.
    #[derive(Clone, Default)]
    struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

    impl SharedBuffer {
        fn contents(&self) -> String {
            String::from_utf8(self.0.borrow().clone()).expect("output is UTF-8")
        }
    }

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_interpreter_01_recursive_fibonacci() {
        let source = "
            let fib = fn(n) {
                if (n < 2) { return n }
                return fib(n - 1) + fib(n - 2)
            };
            fib(10)
        ";

        assert_eq!(eval(source), Object::Integer(55));
    }

    #[test]
    fn test_interpreter_02_integer_arithmetic() {
        assert_eq!(eval("2 + 3 * 4"), Object::Integer(14));
        assert_eq!(eval("10 / 3"), Object::Integer(3));
        assert_eq!(eval("-7 / 2"), Object::Integer(-3));
        assert_eq!(eval("-7 // 2"), Object::Integer(-4));
        assert_eq!(eval("-7 % 2"), Object::Integer(-1));
        assert_eq!(eval("(1 + 2) * -3"), Object::Integer(-9));
    }

    #[test]
    fn test_interpreter_03_float_arithmetic_and_display() {
        assert_eq!(eval("7 / 2.0"), Object::Float(3.5));
        assert_eq!(eval("1 + 0.5"), Object::Float(1.5));
        assert_eq!(eval_to_string("1.0 * 3"), "3.0");
        assert_eq!(eval_to_string("7.5 // 2"), "3.0");
        assert_eq!(eval_to_string("0.0 / 0.0"), "NaN");
        assert_eq!(eval_to_string("1 / 0.0"), "Infinity");
        assert_eq!(eval_to_string("-1 / 0.0"), "-Infinity");
    }

    #[test]
    fn test_interpreter_04_arithmetic_errors() {
        assert_eq!(error_message("1 / 0"), "division by zero");
        assert_eq!(error_message("1 // 0"), "division by zero");
        assert_eq!(error_message("5 % 0"), "modulo by zero");
        assert_eq!(
            error_message("9223372036854775807 + 1"),
            "integer overflow in 9223372036854775807 + 1"
        );
        assert_eq!(
            error_message("\"a\" - 1"),
            "unsupported operand types for -: STRING and INTEGER"
        );
        assert_eq!(error_message("-\"a\""), "unsupported operand type for -: STRING");
    }

    #[test]
    fn test_interpreter_05_strings() {
        assert_eq!(eval_to_string("\"foo\" + \"bar\""), "foobar");
        assert_eq!(eval("\"abc\" < \"abd\""), Object::Boolean(true));
        assert_eq!(eval("\"b\" >= \"a\""), Object::Boolean(true));
        assert_eq!(eval_to_string("\"héllo\"[1]"), "é");
        assert_eq!(eval("len(\"héllo\")"), Object::Integer(5));
        assert_eq!(
            error_message("\"a\" + 1"),
            "unsupported operand types for +: STRING and INTEGER"
        );
    }

    #[test]
    fn test_interpreter_06_truthiness_and_logic() {
        assert_eq!(eval("!0"), Object::Boolean(true));
        assert_eq!(eval("!\"\""), Object::Boolean(true));
        assert_eq!(eval("!0.0"), Object::Boolean(true));
        assert_eq!(eval("![]"), Object::Boolean(false));
        assert_eq!(eval("0 || \"x\""), Object::Boolean(true));
        assert_eq!(eval("1 && null"), Object::Boolean(false));
        assert_eq!(eval("if (0) { 1 } else { 2 }"), Object::Integer(2));
        assert_eq!(eval("if (null) { 1 }"), Object::Null);
    }

    #[test]
    fn test_interpreter_07_logic_short_circuits() {
        // The right side would fail if it were evaluated.
        assert_eq!(eval("false && missing()"), Object::Boolean(false));
        assert_eq!(eval("true || missing()"), Object::Boolean(true));
    }

    #[test]
    fn test_interpreter_08_equality() {
        assert_eq!(eval("1 == 1.0"), Object::Boolean(true));
        assert_eq!(eval("[1] == [1]"), Object::Boolean(false));
        assert_eq!(eval("let a = [1]; let b = a; a == b"), Object::Boolean(true));
        assert_eq!(eval("null == null"), Object::Boolean(true));
        assert_eq!(eval("\"a\" == 1"), Object::Boolean(false));
        assert_eq!(eval("\"a\" != \"b\""), Object::Boolean(true));
    }

    #[test]
    fn test_interpreter_09_if_elif_else_chain() {
        let source = "
            let grade = fn(n) {
                return if (n >= 90) { \"A\" } elif (n >= 80) { \"B\" } else if (n >= 70) { \"C\" } else { \"F\" }
            };
            [grade(95), grade(85), grade(75), grade(10)]
        ";

        assert_eq!(eval_to_string(source), "[\"A\", \"B\", \"C\", \"F\"]");
    }

    #[test]
    fn test_interpreter_10_block_scoping() {
        assert_eq!(eval("let x = 1; { let x = 2; } x"), Object::Integer(1));
        assert_eq!(eval("let x = 1; { x = 2 } x"), Object::Integer(2));
        assert_eq!(
            error_message("{ let inner = 1 } inner"),
            "identifier not found: inner"
        );
    }

    #[test]
    fn test_interpreter_11_functions_and_implicit_null() {
        assert_eq!(eval("let f = fn() { 5 }; f()"), Object::Null);
        assert_eq!(eval("let f = fn() { return; }; f()"), Object::Null);
        assert_eq!(
            eval("let x = 1; let f = fn() { let x = 5; return x }; f() + x"),
            Object::Integer(6)
        );
        assert_eq!(eval("fn add(a, b) { return a + b } add(2, 3)"), Object::Integer(5));
        assert_eq!(eval_to_string("fn(a, b) { }"), "fn(a, b) { ... }");
    }

    #[test]
    fn test_interpreter_12_closures_capture_environment() {
        let source = "
            let make = fn() {
                let count = 0;
                return fn() { count += 1; return count }
            };
            let next = make();
            next(); next();
            next()
        ";

        assert_eq!(eval(source), Object::Integer(3));

        let source = "
            let adder = fn(a) { return fn(b) { return a + b } };
            let add2 = adder(2);
            let add10 = adder(10);
            [add2(1), add10(1)]
        ";

        assert_eq!(eval_to_string(source), "[3, 11]");
    }

    #[test]
    fn test_interpreter_13_bindings() {
        assert_eq!(error_message("const k = 1; k = 2"), "cannot assign to constant 'k'");
        assert_eq!(
            error_message("let a = 1; let a = 2"),
            "'a' is already declared in this scope"
        );
        assert_eq!(
            error_message("y = 3"),
            "cannot assign to undeclared variable 'y'"
        );
        assert_eq!(eval("let a = 1; { let a = 2 } a"), Object::Integer(1));
    }

    #[test]
    fn test_interpreter_14_loops() {
        let source = "
            let s = 0;
            for (let i = 0; i < 5; i += 1) {
                if (i == 3) { continue }
                s += i
            }
            s
        ";
        assert_eq!(eval(source), Object::Integer(7));

        let source = "let i = 0; while (true) { i += 1; if (i >= 10) { break } } i";
        assert_eq!(eval(source), Object::Integer(10));

        assert_eq!(
            error_message("for (let i = 0; i < 2; i += 1) {} i"),
            "identifier not found: i"
        );
    }

    #[test]
    fn test_interpreter_15_loop_iteration_limit() {
        let config = InterpreterConfig {
            max_loop_iterations: 100,
            ..Default::default()
        };

        let err = run_with(Interpreter::with_config(config), "let n = 0; while (true) { n += 1 }");

        match err {
            Err(SprigError::Runtime(err)) => {
                assert_eq!(err.message, "maximum iterations (100) exceeded in loop")
            }
            other => panic!("expected a runtime error, got {:?}", other),
        }

        let config = InterpreterConfig {
            max_loop_iterations: 100,
            ..Default::default()
        };

        // The limit applies to each loop execution separately.
        let source = "
            let total = 0;
            for (let i = 0; i < 50; i += 1) {
                for (let j = 0; j < 50; j += 1) { total += 1 }
            }
            total
        ";
        let value = run_with(Interpreter::with_config(config), source).expect("within limits");
        assert_eq!(value, Object::Integer(2500));
    }

    #[test]
    fn test_interpreter_16_call_depth_limit() {
        let config = InterpreterConfig {
            max_call_depth: 50,
            ..Default::default()
        };

        let result = run_with(
            Interpreter::with_config(config),
            "let f = fn(n) { return f(n + 1) }; f(0)",
        );

        match result {
            Err(SprigError::Runtime(err)) => {
                assert_eq!(err.message, "maximum call depth of 50 exceeded");
                assert_eq!(err.stack.len(), 50);
            }
            other => panic!("expected a runtime error, got {:?}", other),
        }
    }

    #[test]
    fn test_interpreter_17_deep_recursion_within_limit() {
        let source = "
            let depth = fn(n) { if (n == 0) { return 0 } return 1 + depth(n - 1) };
            depth(1500)
        ";

        assert_eq!(eval(source), Object::Integer(1500));
    }

    #[test]
    fn test_interpreter_18_arrays() {
        assert_eq!(eval_to_string("let a = [1, 2, 3]; a[0] = 10; a"), "[10, 2, 3]");
        assert_eq!(eval("[1, 2, 3][2]"), Object::Integer(3));
        assert_eq!(error_message("[1, 2, 3][3]"), "index out of bounds: 3 (length 3)");
        assert_eq!(error_message("[1][-1]"), "index out of bounds: -1 (length 1)");
        assert_eq!(error_message("[1][\"a\"]"), "index must be INTEGER, got STRING");
        assert_eq!(eval_to_string("let a = [1]; a[0] = a; a"), "[[...]]");
    }

    #[test]
    fn test_interpreter_19_hashes() {
        assert_eq!(
            eval_to_string("let h = {\"a\": 1}; h[\"b\"] = 2; h"),
            "{\"a\": 1, \"b\": 2}"
        );
        assert_eq!(eval("let h = {1: \"one\"}; h[1] == h[\"1\"]"), Object::Boolean(true));
        assert_eq!(eval("let h = {\"a\": 1}; h[\"zz\"]"), Object::Null);
        assert_eq!(eval("let h = {name: 1}; h[\"name\"]"), Object::Integer(1));
        assert_eq!(error_message("let h = {\"a\": 1}; h[true]"), "unusable as hash key: BOOLEAN");
        assert_eq!(error_message("let n = 1; n[0]"), "index operator not supported on INTEGER");
    }

    #[test]
    fn test_interpreter_20_builtins() {
        assert_eq!(eval("len([1, 2, 3])"), Object::Integer(3));
        assert_eq!(eval_to_string("type(1)"), "INTEGER");
        assert_eq!(eval_to_string("type(len)"), "BUILTIN");
        assert_eq!(eval_to_string("str(1.0)"), "1.0");
        assert_eq!(eval("int(\"42\")"), Object::Integer(42));
        assert_eq!(eval("float(2)"), Object::Float(2.0));
        assert_eq!(eval_to_string("keys({b: 1, a: 2})"), "[\"b\", \"a\"]");
        assert_eq!(eval_to_string("values({b: 1, a: 2})"), "[1, 2]");
        assert_eq!(eval_to_string("range(1, 4)"), "[1, 2, 3]");
        assert_eq!(eval_to_string("let a = [1]; let b = push(a, 2); [a, b]"), "[[1], [1, 2]]");
        assert_eq!(eval_to_string("[first([4, 5]), last([4, 5]), rest([4, 5])]"), "[4, 5, [5]]");
        assert_eq!(eval("abs(-3)"), Object::Integer(3));
        assert_eq!(
            error_message("len(1)"),
            "argument to `len` not supported, got INTEGER"
        );
    }

    #[test]
    fn test_interpreter_21_builtins_can_be_shadowed() {
        assert_eq!(eval("let len = fn(x) { return 0 }; len([1, 2])"), Object::Integer(0));
    }

    #[test]
    fn test_interpreter_22_print_writes_lines() {
        let buffer = SharedBuffer::default();
        let interpreter = Interpreter::new().with_output(Box::new(buffer.clone()));

        let value = run_with(interpreter, "print(\"a\", 1, [1, \"x\"]); print()")
            .expect("program runs");

        assert_eq!(value, Object::Null);
        assert_eq!(buffer.contents(), "a 1 [1, \"x\"]\n\n");
    }

    #[test]
    fn test_interpreter_23_fstrings() {
        assert_eq!(eval_to_string("let a = 1; let b = 2; f\"sum={a + b}\""), "sum=3");
        assert_eq!(
            eval_to_string("let h = {k: [1, \"s\"]}; f\"{h[\"k\"]} and {len(h)}\""),
            "[1, \"s\"] and 1"
        );
        assert_eq!(eval_to_string("let name = \"x\"; f\"<{name}>\""), "<x>");
    }

    #[test]
    fn test_interpreter_24_top_level_return() {
        assert_eq!(eval("return 5; 6"), Object::Integer(5));
        assert_eq!(eval(""), Object::Null);
        assert_eq!(eval("let x = 1;"), Object::Null);
    }

    #[test]
    fn test_interpreter_25_call_errors() {
        assert_eq!(error_message("1()"), "not a function: INTEGER");
        assert_eq!(
            error_message("let f = fn(a) { return a }; f(1, 2)"),
            "wrong number of arguments to 'f': expected 1, got 2"
        );
        assert_eq!(
            error_message("fn(a) { return a }()"),
            "wrong number of arguments to '<anonymous>': expected 1, got 0"
        );
        assert_eq!(error_message("foo"), "identifier not found: foo");
    }

    #[test]
    fn test_interpreter_26_environment_persists_across_programs() {
        let env = Environment::new();
        let mut interpreter = Interpreter::new();

        let first = parse("let x = 2").expect("tokenizes");
        let second = parse("x * 3").expect("tokenizes");

        assert_eq!(interpreter.evaluate(&first.program, &env), Object::Null);
        assert_eq!(interpreter.evaluate(&second.program, &env), Object::Integer(6));
    }

    #[test]
    fn test_interpreter_27_errors_are_values() {
        let env = Environment::new();
        let program = parse("let a = 1; a()").expect("tokenizes").program;

        let value = Interpreter::new().evaluate(&program, &env);

        assert!(value.is_error());
        assert_eq!(value.type_tag(), "ERROR");
    }

    #[test]
    fn test_interpreter_28_observer_sees_events() {
        let recorder = Rc::new(RefCell::new(Recorder::default()));

        let interpreter = Interpreter::new()
            .with_output(Box::new(io::sink()))
            .with_observer(Box::new(Rc::clone(&recorder)));

        let value = run_with(interpreter, "let x = 1; print(x); fn f() { return 2 } f()")
            .expect("program runs");

        assert_eq!(value, Object::Integer(2));

        let recorder = recorder.borrow();

        assert_eq!(
            recorder.outputs,
            vec![
                OutputEvent::Assignment {
                    name: "x".into(),
                    value: "1".into()
                },
                OutputEvent::Log("1".into()),
                OutputEvent::Assignment {
                    name: "f".into(),
                    value: "fn() { ... }".into()
                },
                OutputEvent::ReturnValue("2".into()),
            ]
        );
        assert_eq!(recorder.calls, vec!["push f", "pop f"]);

        let first = recorder.steps.first().expect("steps recorded");
        let last = recorder.steps.last().expect("steps recorded");
        assert_eq!((first.0, first.2), (NodeKind::Program, StepPhase::Before));
        assert_eq!((last.0, last.2), (NodeKind::Program, StepPhase::After));

        let befores = recorder
            .steps
            .iter()
            .filter(|(_, _, phase)| *phase == StepPhase::Before)
            .count();
        assert_eq!(befores * 2, recorder.steps.len());
    }

    #[test]
    fn test_interpreter_29_observer_sees_runtime_error() {
        let recorder = Rc::new(RefCell::new(Recorder::default()));

        let interpreter = Interpreter::new().with_observer(Box::new(Rc::clone(&recorder)));

        assert!(run_with(interpreter, "1 / 0").is_err());

        let outputs = recorder.borrow().outputs.clone();
        assert_eq!(outputs.len(), 1);
        assert!(matches!(&outputs[0], OutputEvent::Error(text) if text.contains("division by zero")));
    }

    #[test]
    fn test_interpreter_30_parse_errors_surface_from_run() {
        match run("let = 1") {
            Err(SprigError::Parse(errors)) => assert_eq!(errors.len(), 1),
            other => panic!("expected parse errors, got {:?}", other),
        }

        assert!(matches!(run("\"open"), Err(SprigError::Lex(_))));
    }

    #[test]
    fn test_interpreter_31_single_statements_and_expressions() {
        let env = Environment::new();
        let mut interpreter = Interpreter::new();

        let mut parser = sprig::parser::Parser::new("let base = 40");
        let statement = parser.parse_statement().expect("statement parses");
        assert_eq!(interpreter.evaluate_statement(&statement, &env), Object::Null);

        let mut parser = sprig::parser::Parser::new("base + 2");
        let expression = parser
            .parse_expression(sprig::parser::Precedence::Lowest)
            .expect("expression parses");
        assert_eq!(interpreter.evaluate_expression(&expression, &env), Object::Integer(42));

        let mut parser = sprig::parser::Parser::new("missing");
        let expression = parser
            .parse_expression(sprig::parser::Precedence::Lowest)
            .expect("expression parses");
        assert!(interpreter.evaluate_expression(&expression, &env).is_error());
    }

    #[test]
    fn test_interpreter_32_config_defaults() {
        let interpreter = Interpreter::new();

        assert_eq!(interpreter.config().max_loop_iterations, 1_000_000);
        assert_eq!(interpreter.config().max_call_depth, 2_000);
    }

    #[test]
    fn test_interpreter_33_error_value_renders_diagnostic() {
        let source = "let a = 1;\na()";
        let program = parse(source).expect("tokenizes").program;

        let value = Interpreter::new()
            .with_source(source)
            .evaluate(&program, &Environment::new());

        let rendered = value.inspect();
        assert!(rendered.starts_with("error: not a function: INTEGER"), "{}", rendered);
        assert!(rendered.contains("  2 | a()"), "{}", rendered);
        assert!(rendered.ends_with("^"), "{}", rendered);
    }

    #[test]
    fn test_interpreter_34_reference_scenarios() {
        assert_eq!(eval("1 < 2 && 3 > 2"), Object::Boolean(true));
        assert_eq!(
            eval("let fib = fn(n) { if (n < 2) { return n; } return fib(n-1) + fib(n-2); }; fib(10);"),
            Object::Integer(55)
        );
        assert_eq!(
            eval(
                "class A { constructor(x){ this.x = x; } get(){ return this.x; } } \
                 class B extends A { constructor(x){ super(x); } } new B(5).get();"
            ),
            Object::Integer(5)
        );
        assert_eq!(eval_to_string("f\"sum={1+2}\""), "sum=3");
    }

    #[test]
    fn test_interpreter_35_function_body_is_its_own_block() {
        assert_eq!(
            eval("let f = fn(x) { let x = 2; return x; }; f(1)"),
            Object::Integer(2)
        );
        assert_eq!(
            eval("let g = fn(x) { let y = x * 10; { let y = 1; } return y; }; g(4)"),
            Object::Integer(40)
        );
    }

    #[test]
    fn test_interpreter_36_fstring_escaped_braces() {
        assert_eq!(eval_to_string("let x = 5; f\"\\{x\\} = {x}\""), "{x} = 5");
        assert_eq!(eval_to_string("f\"a \\{\""), "a {");
        assert_eq!(eval_to_string("f\"back\\\\slash {1}\""), "back\\slash 1");
    }

    #[test]
    fn test_interpreter_37_range_size_is_limited() {
        assert_eq!(
            error_message("range(0, 9223372036854775807)"),
            "`range` would produce 9223372036854775807 elements, more than the limit of 1000000"
        );
        assert_eq!(eval_to_string("len(range(10, 0, -3))"), "4");
    }

    #[test]
    fn test_interpreter_38_const_binding_not_contents() {
        assert_eq!(eval_to_string("const a = [1]; a[0] = 2; a"), "[2]");
        assert_eq!(
            error_message("const a = [1]; a = [2]"),
            "cannot assign to constant 'a'"
        );
    }

    #[test]
    fn test_interpreter_39_while_body_scope_ends_with_loop() {
        assert_eq!(
            error_message("let i = 0; while (i < 3) { let inner = i; i = i + 1 } inner"),
            "identifier not found: inner"
        );
    }

    #[test]
    fn test_interpreter_40_if_statement_ends_at_brace() {
        assert_eq!(eval("let x = 1;\nif (true) { x = 2 }\n-1"), Object::Integer(-1));
        assert_eq!(eval("let x = 1;\nif (true) { x = 2 }\n-1\nx"), Object::Integer(2));
        assert_eq!(eval("let y = if (false) { 1 } else { 2 } + 3; y"), Object::Integer(5));
    }

    #[test]
    fn test_interpreter_41_ordering_operators() {
        assert_eq!(
            eval_to_string("[1 < 2.5, \"a\" < \"b\", 0.0 / 0.0 < 1, 2 >= 2, 3.5 <= 3]"),
            "[true, true, false, true, false]"
        );
        assert_eq!(
            error_message("1 < \"a\""),
            "unsupported operand types for <: INTEGER and STRING"
        );
    }
}
