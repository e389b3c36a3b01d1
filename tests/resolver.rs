mod common;

#[cfg(test)]
mod resolver_tests {
    use super::common::{messages, run, run_ok};

    use rox::diagnostics::{Diagnostics, EXIT_DATAERR};
    use rox::interpreter::Interpreter;
    use rox::parser::Parser;
    use rox::resolver::Resolver;
    use rox::scanner::tokenize;

    fn static_errors(source: &str) -> Vec<String> {
        let (output, diagnostics) = run(source);
        assert!(output.is_empty(), "nothing may run after a static error");
        assert_eq!(diagnostics.exit_code(), Some(EXIT_DATAERR));
        messages(&diagnostics)
    }

    #[test]
    fn test_closure_captures_binding_visible_at_definition() {
        let output = run_ok(
            "var a = 1;
             { fun f() { return a; } var a = 2; print f(); print a; }",
        );
        assert_eq!(output, "1\n2\n");
    }

    #[test]
    fn test_resolution_is_not_affected_by_later_shadowing() {
        let output = run_ok(
            "var a = \"global\";
             {
               fun showA() { print a; }
               showA();
               var a = \"block\";
               showA();
             }",
        );
        assert_eq!(output, "global\nglobal\n");
    }

    #[test]
    fn test_redeclaration_in_local_scope() {
        assert_eq!(
            static_errors("{ var a = 1; var a = 2; }"),
            vec!["[line 1] Error at 'a': Already a variable with this name in this scope."]
        );
    }

    #[test]
    fn test_parameters_share_the_body_scope() {
        assert_eq!(
            static_errors("fun f(a) { var a = 1; }"),
            vec!["[line 1] Error at 'a': Already a variable with this name in this scope."]
        );
    }

    #[test]
    fn test_global_redeclaration_is_allowed() {
        assert_eq!(run_ok("var a = 1; var a = 2; print a;"), "2\n");
    }

    #[test]
    fn test_self_referential_initializer() {
        assert_eq!(
            static_errors("var a = 1; { var a = a; }"),
            vec!["[line 1] Error at 'a': Can't read local variable in its own initializer."]
        );
    }

    #[test]
    fn test_return_outside_function() {
        assert_eq!(
            static_errors("return 1;"),
            vec!["[line 1] Error at 'return': Can't return from top-level code."]
        );
    }

    #[test]
    fn test_return_value_from_initializer() {
        assert_eq!(
            static_errors("class A {\n  init() { return 1; }\n}"),
            vec!["[line 2] Error at 'return': Can't return a value from an initializer."]
        );
    }

    #[test]
    fn test_lambda_inside_initializer_may_return_values() {
        assert_eq!(
            run_ok(
                "class A { init() { var f = fun () { return 1; }; this.v = f(); return; } }
                 print A().v;"
            ),
            "1\n"
        );
    }

    #[test]
    fn test_this_outside_class() {
        assert_eq!(
            static_errors("print this;"),
            vec!["[line 1] Error at 'this': Can't use 'this' outside of a class."]
        );
        assert_eq!(
            static_errors("fun f() { return this; }"),
            vec!["[line 1] Error at 'this': Can't use 'this' outside of a class."]
        );
    }

    #[test]
    fn test_super_misuse() {
        assert_eq!(
            static_errors("super.m();"),
            vec!["[line 1] Error at 'super': Can't use 'super' outside of a class."]
        );
        assert_eq!(
            static_errors("class A { m() { return super.m(); } }"),
            vec!["[line 1] Error at 'super': Can't use 'super' in a class with no superclass."]
        );
    }

    #[test]
    fn test_class_inheriting_from_itself() {
        assert_eq!(
            static_errors("class A < B, A {}"),
            vec!["[line 1] Error at 'A': A class can't inherit from itself."]
        );
    }

    #[test]
    fn test_all_static_errors_are_reported() {
        let errors = static_errors("return 1;\nprint this;\n{ var x = 1; var x = 2; }");
        assert_eq!(errors.len(), 3);
        assert!(errors[0].starts_with("[line 1]"));
        assert!(errors[1].starts_with("[line 2]"));
        assert!(errors[2].starts_with("[line 3]"));
    }

    #[test]
    fn test_resolver_runs_directly_against_an_interpreter() {
        let source = "fun outer() { var x = 1; fun inner() { return x; } return inner; } outer();";

        let mut diagnostics = Diagnostics::new();
        let tokens = tokenize(source, &mut diagnostics);
        let statements = Parser::new(tokens).parse(&mut diagnostics);

        let mut interpreter = Interpreter::new();
        Resolver::new(&mut interpreter).resolve(&statements, &mut diagnostics);
        assert!(diagnostics.is_empty());

        interpreter.interpret(&statements, &mut diagnostics);
        assert!(diagnostics.is_empty());
    }
}
