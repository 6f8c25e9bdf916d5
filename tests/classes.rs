#[cfg(test)]
mod class_tests {
    use pretty_assertions::assert_eq;

    use sprig::diagnostics::RuntimeError;
    use sprig::{run, Object, SprigError};

    fn eval(source: &str) -> Object {
        match run(source) {
            Ok(value) => value,
            Err(e) => panic!("{:?} failed:\n{}", source, e),
        }
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

    #[test]
    fn test_classes_01_constructor_and_methods() {
        let source = "
            class Point {
                constructor(x, y) {
                    this.x = x;
                    this.y = y;
                }

                sum() { return this.x + this.y }
            }

            let p = new Point(2, 3);
            p.sum()
        ";

        assert_eq!(eval(source), Object::Integer(5));
    }

    #[test]
    fn test_classes_02_super_constructor() {
        let source = "
            class A {
                constructor(x) { this.x = x }
                get() { return this.x }
            }

            class B extends A {
                constructor(x) { super(x + 1) }
            }

            new B(4).get()
        ";

        assert_eq!(eval(source), Object::Integer(5));
    }

    #[test]
    fn test_classes_03_super_resolves_from_defining_class() {
        let source = "
            class A { speak() { return \"a\" } }
            class B extends A { speak() { return super.speak() + \"b\" } }
            class C extends B { speak() { return super.speak() + \"c\" } }

            new C().speak()
        ";

        assert_eq!(eval(source).inspect(), "abc");
    }

    #[test]
    fn test_classes_04_inherited_constructor_and_methods() {
        let source = "
            class A {
                constructor(v) { this.v = v }
                twice() { return this.v * 2 }
            }
            class B extends A {}

            let b = new B(7);
            [b.v, b.twice()]
        ";

        assert_eq!(eval(source).inspect(), "[7, 14]");
    }

    #[test]
    fn test_classes_05_overriding_uses_dynamic_this() {
        let source = "
            class Shape {
                describe() { return f\"{this.name()} with area {this.area()}\" }
                name() { return \"shape\" }
                area() { return 0 }
            }
            class Square extends Shape {
                constructor(side) { this.side = side }
                name() { return \"square\" }
                area() { return this.side * this.side }
            }

            new Square(3).describe()
        ";

        assert_eq!(eval(source).inspect(), "square with area 9");
    }

    #[test]
    fn test_classes_06_fields_and_bound_methods() {
        let source = "
            class Counter {
                constructor() { this.n = 0 }
                bump() { this.n += 1; return this.n }
            }

            let c = new Counter();
            let bump = c.bump;
            bump(); bump();
            c.n
        ";

        assert_eq!(eval(source), Object::Integer(2));

        assert_eq!(
            eval("class P {} let p = new P(); p.name = \"x\"; p.name").inspect(),
            "x"
        );
    }

    #[test]
    fn test_classes_07_fields_shadow_methods() {
        let source = "
            class A { m() { return 1 } }
            let a = new A();
            a.m = fn() { return 2 };
            a.m()
        ";

        assert_eq!(eval(source), Object::Integer(2));
    }

    #[test]
    fn test_classes_08_display_and_type() {
        assert_eq!(
            eval("class P { constructor() { this.x = 1; this.s = \"t\" } } new P()").inspect(),
            "P { x: 1, s: \"t\" }"
        );
        assert_eq!(eval("class P {} new P()").inspect(), "P {}");
        assert_eq!(eval("class P {} P").inspect(), "class P");
        assert_eq!(eval("class P {} type(new P())").inspect(), "INSTANCE");
        assert_eq!(eval("class P {} type(P)").inspect(), "CLASS");
    }

    #[test]
    fn test_classes_09_instances_compare_by_identity() {
        assert_eq!(
            eval("class P {} let a = new P(); let b = new P(); [a == a, a == b]").inspect(),
            "[true, false]"
        );
    }

    #[test]
    fn test_classes_10_instantiation_errors() {
        assert_eq!(
            error_message("class A {} A()"),
            "class A must be instantiated with 'new'"
        );
        assert_eq!(error_message("new 5()"), "'new' requires a class, got INTEGER");
        assert_eq!(
            error_message("class A {} new A(1)"),
            "class A has no constructor but was given 1 arguments"
        );
        assert_eq!(
            error_message("class A { constructor(x) {} } new A()"),
            "constructor of A expects 1 arguments, got 0"
        );
    }

    #[test]
    fn test_classes_11_declaration_errors() {
        assert_eq!(
            error_message("class A extends A {}"),
            "class 'A' cannot inherit from itself"
        );
        assert_eq!(
            error_message("class B extends Missing {}"),
            "parent class 'Missing' is not defined"
        );
        assert_eq!(
            error_message("let X = 1; class B extends X {}"),
            "parent of class 'B' must be a class, got INTEGER"
        );
        assert_eq!(
            error_message("class A {} class A {}"),
            "class 'A' is already declared in this scope"
        );
    }

    #[test]
    fn test_classes_12_circular_inheritance() {
        let source = "
            class A {}
            class B extends A {}
            { class A extends B {} }
        ";

        assert_eq!(
            error_message(source),
            "circular inheritance: 'A' is already an ancestor of 'B'"
        );
    }

    #[test]
    fn test_classes_13_this_and_super_outside_methods() {
        assert_eq!(error_message("this"), "'this' used outside of a method");
        assert_eq!(
            error_message("fn f() { return super.m() } f()"),
            "'super' used outside of a method"
        );
        assert_eq!(
            error_message("class A { m() { return super.m() } } new A().m()"),
            "class 'A' has no parent class"
        );
    }

    #[test]
    fn test_classes_14_missing_members() {
        let err = runtime_error("class A { constructor() { this.value = 1 } } new A().vaule");

        assert_eq!(err.message, "undefined property 'vaule' on instance of A");
        assert_eq!(err.hint.as_deref(), Some("did you mean `value`?"));

        assert_eq!(
            error_message("class A {} class B extends A { m() { return super.n() } } new B().m()"),
            "undefined method 'n' in parent class A"
        );
        assert_eq!(
            error_message("let a = 1; a.x = 2"),
            "cannot set property 'x' on INTEGER"
        );
        assert_eq!(
            error_message("let a = [1]; a.len"),
            "cannot read property 'len' of ARRAY"
        );
    }

    #[test]
    fn test_classes_15_method_calls_appear_in_stack_trace() {
        let source = "
            class A {
                fail() { return 1 / 0 }
                run() { return this.fail() }
            }
            new A().run()
        ";

        let err = runtime_error(source);
        let names: Vec<&str> = err.stack.iter().map(|frame| frame.name.as_str()).collect();

        assert_eq!(err.message, "division by zero");
        assert_eq!(names, vec!["A.fail", "A.run"]);
    }
}
