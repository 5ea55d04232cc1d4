mod common;

#[cfg(test)]
mod resolver_tests {
    use pretty_assertions::assert_eq;

    use crate::common::{run_failing, run_program};

    use rlox::error::{Diagnostics, RunError};
    use rlox::interpreter::Interpreter;
    use rlox::parser::parse;
    use rlox::resolver::resolve;
    use rlox::scanner::scan;

    /// Runs the static stages only and returns every resolver diagnostic.
    fn resolve_errors(source: &str) -> Vec<String> {
        let mut interpreter = Interpreter::with_output(Box::new(std::io::sink()));
        let mut diagnostics = Diagnostics::new();

        let tokens = scan(source, &mut diagnostics);
        let statements = parse(&tokens, &mut diagnostics);
        assert!(diagnostics.is_empty(), "unexpected syntax errors: {}", diagnostics);

        resolve(&mut interpreter, &statements, &mut diagnostics);

        diagnostics.iter().map(|e| e.to_string()).collect()
    }

    #[test]
    fn test_own_initializer_is_an_error() {
        assert_eq!(
            resolve_errors("{ var a = a; }"),
            vec!["[line 1] Error at 'a': Can't read local variable in its own initializer."]
        );
    }

    #[test]
    fn test_global_self_reference_is_left_to_runtime() {
        // Globals are late bound; only locals are checked statically.
        assert!(resolve_errors("var a = a;").is_empty());

        let (printed, err) = run_failing("var a = a;");
        assert_eq!(printed, "");
        assert!(matches!(err, RunError::Runtime(_)));
        assert_eq!(err.to_string(), "Undefined variable 'a'.\n[line 1]");
    }

    #[test]
    fn test_duplicate_local_is_an_error() {
        assert_eq!(
            resolve_errors("fun f() {\n  var a;\n  var a;\n}"),
            vec!["[line 3] Error at 'a': Already a variable with this name in this scope."]
        );

        // Parameters live in the same scope as the body's declarations.
        assert_eq!(
            resolve_errors("fun g(x, x) {}"),
            vec!["[line 1] Error at 'x': Already a variable with this name in this scope."]
        );
    }

    #[test]
    fn test_global_redeclaration_is_allowed() {
        assert!(resolve_errors("var a = 1; var a = 2;").is_empty());
    }

    #[test]
    fn test_return_placement() {
        assert_eq!(
            resolve_errors("return 1;"),
            vec!["[line 1] Error at 'return': Can't return from top-level code."]
        );

        assert_eq!(
            resolve_errors("class A { init() { return 1; } }"),
            vec!["[line 1] Error at 'return': Can't return a value from an initializer."]
        );

        // A bare `return;` in an initializer is fine.
        assert!(resolve_errors("class A { init() { return; } }").is_empty());
    }

    #[test]
    fn test_this_outside_class() {
        assert_eq!(
            resolve_errors("print this;"),
            vec!["[line 1] Error at 'this': Can't use 'this' outside of a class."]
        );

        assert_eq!(
            resolve_errors("fun f() { return this; }"),
            vec!["[line 1] Error at 'this': Can't use 'this' outside of a class."]
        );
    }

    #[test]
    fn test_super_misuse() {
        assert_eq!(
            resolve_errors("print super.x;"),
            vec!["[line 1] Error at 'super': Can't use 'super' outside of a class."]
        );

        assert_eq!(
            resolve_errors("class A { f() { super.f(); } }"),
            vec!["[line 1] Error at 'super': Can't use 'super' in a class with no superclass."]
        );
    }

    #[test]
    fn test_class_cannot_inherit_from_itself() {
        assert_eq!(
            resolve_errors("class A < A {}"),
            vec!["[line 1] Error at 'A': A class can't inherit from itself."]
        );
    }

    #[test]
    fn test_all_errors_are_collected_in_one_pass() {
        let errors: Vec<String> = resolve_errors("return;\nprint this;\n{ var b = b; }");

        assert_eq!(
            errors,
            vec![
                "[line 1] Error at 'return': Can't return from top-level code.",
                "[line 2] Error at 'this': Can't use 'this' outside of a class.",
                "[line 3] Error at 'b': Can't read local variable in its own initializer.",
            ]
        );
    }

    #[test]
    fn test_resolver_errors_prevent_execution() {
        let (printed, err) = run_failing("print \"before\";\nreturn 1;");

        assert!(matches!(err, RunError::Static(_)));
        assert_eq!(printed, "");
    }

    /// Closures bind to the variable visible where they are written, even if
    /// a same-named local is declared later in the enclosing block.
    #[test]
    fn test_closure_binds_statically() {
        let source = r#"
            var a = "global";
            {
                fun show() { print a; }
                show();
                var a = "block";
                show();
            }
        "#;

        assert_eq!(run_program(source).expect("program should run"), "global\nglobal\n");
    }
}
