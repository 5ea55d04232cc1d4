#[cfg(test)]
mod parser_tests {
    use pretty_assertions::assert_eq;

    use rlox::ast::{Expr, LiteralValue, Stmt};
    use rlox::ast_printer::AstPrinter;
    use rlox::error::{Diagnostics, RunError};
    use rlox::parser::{parse, Parser};
    use rlox::scanner::scan;

    /// Parses a single expression and prints it in prefix form.
    fn print_expression(source: &str) -> String {
        let expr: Expr = rlox::parse_expression(source).expect("expression should parse");

        AstPrinter::print(&expr)
    }

    /// Parses a whole program, returning the statements and rendered errors.
    fn parse_program(source: &str) -> (Vec<Stmt<'_>>, Vec<String>) {
        let mut diagnostics = Diagnostics::new();
        let tokens = scan(source, &mut diagnostics);
        let statements = parse(&tokens, &mut diagnostics);

        let errors: Vec<String> = diagnostics.iter().map(|e| e.to_string()).collect();

        (statements, errors)
    }

    #[test]
    fn test_parser_precedence() {
        assert_eq!(print_expression("1 + 2 * 3"), "(+ 1.0 (* 2.0 3.0))");
        assert_eq!(print_expression("(1 + 2) * 3"), "(* (group (+ 1.0 2.0)) 3.0)");
        assert_eq!(print_expression("-1 - -2"), "(- (- 1.0) (- 2.0))");
        assert_eq!(print_expression("!true == false"), "(== (! true) false)");
        assert_eq!(print_expression("1 < 2 == 3 >= 4"), "(== (< 1.0 2.0) (>= 3.0 4.0))");
    }

    #[test]
    fn test_parser_left_associativity() {
        assert_eq!(print_expression("8 / 4 / 2"), "(/ (/ 8.0 4.0) 2.0)");
        assert_eq!(print_expression("1 - 2 + 3"), "(+ (- 1.0 2.0) 3.0)");
    }

    #[test]
    fn test_parser_logical_and_assignment() {
        assert_eq!(print_expression("a or b and c"), "(or a (and b c))");
        assert_eq!(print_expression("a = b = 1"), "(= a (= b 1.0))");
        assert_eq!(print_expression("p.x = \"hi\""), "(= (. p x) hi)");
    }

    #[test]
    fn test_parser_calls_and_properties() {
        assert_eq!(print_expression("f(1, g())(2)"), "(call (call f 1.0 (call g)) 2.0)");
        assert_eq!(print_expression("a.b.c()"), "(call (. (. a b) c))");
        assert_eq!(print_expression("super.init"), "(super init)");
        assert_eq!(print_expression("this"), "this");
    }

    #[test]
    fn test_parser_expression_errors() {
        let err = rlox::parse_expression("(1 + 2").unwrap_err();
        assert_eq!(err.to_string(), "[line 1] Error at end: Expect ')' after expression.");
        assert_eq!(err.exit_code(), 65);

        let err = rlox::parse_expression("1 +").unwrap_err();
        assert_eq!(err.to_string(), "[line 1] Error at end: Expect expression.");

        let err = rlox::parse_expression("1 2").unwrap_err();
        assert_eq!(err.to_string(), "[line 1] Error at '2': Expect end of expression.");
    }

    #[test]
    fn test_parser_missing_semicolon() {
        let (statements, errors) = parse_program("print 1");

        assert!(statements.is_empty());
        assert_eq!(errors, vec!["[line 1] Error at end: Expect ';' after value."]);
    }

    /// One error per broken statement; good statements around them survive.
    #[test]
    fn test_parser_recovers_at_statement_boundary() {
        let source = "var a = ;\nprint a;\nvar = 2;\nprint 3;";
        let (statements, errors) = parse_program(source);

        assert_eq!(
            errors,
            vec![
                "[line 1] Error at ';': Expect expression.",
                "[line 3] Error at '=': Expect variable name.",
            ]
        );
        assert_eq!(statements.len(), 2);
        assert!(statements.iter().all(|s| matches!(s, Stmt::Print(_))));
    }

    #[test]
    fn test_parser_invalid_assignment_target() {
        let (statements, errors) = parse_program("1 + 2 = 3;\nprint 4;");

        assert_eq!(errors, vec!["[line 1] Error at '=': Invalid assignment target."]);

        // The statement is kept and parsing continues normally.
        assert_eq!(statements.len(), 2);
    }

    #[test]
    fn test_parser_for_desugars_to_while() {
        let (statements, errors) = parse_program("for (var i = 0; i < 3; i = i + 1) print i;");

        assert!(errors.is_empty());
        assert_eq!(statements.len(), 1);

        let Stmt::Block(outer) = &statements[0] else {
            panic!("expected block, got {:?}", statements[0]);
        };
        assert!(matches!(outer[0], Stmt::Var { .. }));

        let Stmt::While { body, .. } = &outer[1] else {
            panic!("expected while, got {:?}", outer[1]);
        };
        let Stmt::Block(inner) = body.as_ref() else {
            panic!("expected block body, got {:?}", body);
        };
        assert!(matches!(inner[0], Stmt::Print(_)));
        assert!(matches!(inner[1], Stmt::Expression(Expr::Assign { .. })));
    }

    #[test]
    fn test_parser_for_without_clauses_loops_on_true() {
        let (statements, errors) = parse_program("for (;;) print 1;");

        assert!(errors.is_empty());
        assert!(matches!(
            &statements[0],
            Stmt::While {
                condition: Expr::Literal(LiteralValue::True),
                ..
            }
        ));
    }

    #[test]
    fn test_parser_class_declaration() {
        let (statements, errors) =
            parse_program("class B < A { init(x) { this.x = x; } get() { return this.x; } }");

        assert!(errors.is_empty());

        let Stmt::Class {
            name,
            superclass,
            methods,
        } = &statements[0]
        else {
            panic!("expected class, got {:?}", statements[0]);
        };

        assert_eq!(name.lexeme, "B");
        assert!(matches!(superclass, Some(Expr::Variable { name, .. }) if name.lexeme == "A"));

        let names: Vec<&str> = methods.iter().map(|m| m.name.lexeme).collect();
        assert_eq!(names, vec!["init", "get"]);
        assert_eq!(methods[0].params.len(), 1);
    }

    #[test]
    fn test_parser_too_many_arguments() {
        let args: Vec<String> = (0..256).map(|i| i.to_string()).collect();
        let source: String = format!("f({});", args.join(", "));

        let (statements, errors) = parse_program(&source);

        assert_eq!(errors, vec!["[line 1] Error at '255': Can't have more than 255 arguments."]);
        assert_eq!(statements.len(), 1);
    }

    #[test]
    fn test_parser_too_many_parameters() {
        let params: Vec<String> = (0..256).map(|i| format!("p{}", i)).collect();
        let source: String = format!("fun f({}) {{}}", params.join(", "));

        let (_, errors) = parse_program(&source);

        assert_eq!(errors, vec!["[line 1] Error at 'p255': Can't have more than 255 parameters."]);
    }

    #[test]
    fn test_parser_ids_are_distinct() {
        let mut diagnostics = Diagnostics::new();
        let tokens = scan("a; a;", &mut diagnostics);
        let statements = Parser::new(&tokens).parse();

        let ids: Vec<_> = statements
            .iter()
            .filter_map(|s| match s {
                Stmt::Expression(Expr::Variable { id, .. }) => Some(*id),
                _ => None,
            })
            .collect();

        assert_eq!(ids.len(), 2);
        assert_ne!(ids[0], ids[1]);
    }

    #[test]
    fn test_run_reports_static_errors_without_executing() {
        let mut interpreter = rlox::interpreter::Interpreter::with_output(Box::new(std::io::sink()));

        let err = rlox::run(&mut interpreter, "print ;").unwrap_err();

        assert!(matches!(err, RunError::Static(_)));
        assert_eq!(err.exit_code(), 65);
    }

    #[test]
    fn test_check_runs_static_stages_only() {
        assert!(rlox::check("print undefinedButLateBound;").is_ok());
        assert!(rlox::check("   ").is_ok());

        let err = rlox::check("print ;\nreturn 1;").unwrap_err();
        assert_eq!(err.to_string(), "[line 1] Error at ';': Expect expression.");

        let err = rlox::check("{ var a = a; }").unwrap_err();
        assert_eq!(
            err.to_string(),
            "[line 1] Error at 'a': Can't read local variable in its own initializer."
        );
    }
}
