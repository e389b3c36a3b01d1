mod common;

#[cfg(test)]
mod session_tests {
    use super::common::{messages, SharedBuffer};

    use rox::diagnostics::{EXIT_DATAERR, EXIT_SOFTWARE};
    use rox::session::Session;
    use rox::value::Value;

    fn session() -> (Session, SharedBuffer) {
        let buffer = SharedBuffer::default();
        (Session::with_output(Box::new(buffer.clone())), buffer)
    }

    #[test]
    fn test_bare_expression_value_is_returned() {
        let (mut session, buffer) = session();

        let outcome = session.run_repl_line("1 + 2\n");
        assert_eq!(outcome.value, Some(Value::Number(3.0)));
        assert!(outcome.diagnostics.is_empty());
        assert!(buffer.contents().is_empty());
    }

    #[test]
    fn test_state_persists_between_lines() {
        let (mut session, buffer) = session();

        let outcome = session.run_repl_line("var a = 5;");
        assert_eq!(outcome.value, None);
        assert!(outcome.diagnostics.is_empty());

        let outcome = session.run_repl_line("fun double(x) { return x * 2; }");
        assert!(outcome.diagnostics.is_empty());

        let outcome = session.run_repl_line("double(a)");
        assert_eq!(outcome.value, Some(Value::Number(10.0)));

        session.run_repl_line("print a;");
        assert_eq!(buffer.contents(), "5\n");
    }

    #[test]
    fn test_failed_expression_attempt_leaves_no_diagnostics_behind() {
        let (mut session, _) = session();

        let outcome = session.run_repl_line("print 4");
        assert_eq!(
            messages(&outcome.diagnostics),
            vec!["[line 1] Error at end: Expect ';' after value."]
        );
        assert_eq!(outcome.value, None);
    }

    #[test]
    fn test_statement_lines_fall_back_to_full_parse() {
        let (mut session, buffer) = session();

        let outcome = session.run_repl_line("{ print \"block\"; }");
        assert!(outcome.diagnostics.is_empty());
        assert_eq!(outcome.value, None);
        assert_eq!(buffer.contents(), "block\n");
    }

    #[test]
    fn test_object_literal_line_is_an_expression() {
        let (mut session, _) = session();

        let outcome = session.run_repl_line("{a: 1}");
        let value = outcome.value.expect("object literal should evaluate");
        assert_eq!(value.to_string(), "Object instance");
    }

    #[test]
    fn test_errors_in_bare_expressions() {
        let (mut session, _) = session();

        let outcome = session.run_repl_line("nope");
        assert_eq!(outcome.value, None);
        assert_eq!(outcome.diagnostics.exit_code(), Some(EXIT_SOFTWARE));
        assert_eq!(
            messages(&outcome.diagnostics),
            vec!["Undefined variable 'nope'.\n[line 1]"]
        );

        let outcome = session.run_repl_line("this");
        assert_eq!(outcome.value, None);
        assert_eq!(outcome.diagnostics.exit_code(), Some(EXIT_DATAERR));
    }

    #[test]
    fn test_locals_table_stays_bounded_across_lines() {
        let (mut session, buffer) = session();

        assert!(session.run("fun keep() { var x = 1; return x; }").is_empty());
        assert!(session
            .run("var f; { var y = 2; f = fun () { return y; }; }")
            .is_empty());
        let baseline = session.interpreter().local_count();
        assert!(baseline >= 2);

        for _ in 0..3 {
            assert!(session.run("{ var a = 1; { print a; } }").is_empty());
            assert_eq!(
                session.run_repl_line("keep()").value,
                Some(Value::Number(1.0))
            );
            assert_eq!(session.run("{ var z = nope; }").exit_code(), Some(EXIT_SOFTWARE));
        }

        assert_eq!(session.interpreter().local_count(), baseline);

        // Closures defined on earlier lines still find their variables.
        assert_eq!(session.run_repl_line("f()").value, Some(Value::Number(2.0)));
        assert_eq!(buffer.contents(), "1\n1\n1\n");
    }

    #[test]
    fn test_session_recovers_after_errors() {
        let (mut session, buffer) = session();

        let diagnostics = session.run("print ;");
        assert_eq!(diagnostics.exit_code(), Some(EXIT_DATAERR));

        let diagnostics = session.run("print undefined;");
        assert_eq!(diagnostics.exit_code(), Some(EXIT_SOFTWARE));

        let diagnostics = session.run("print \"still alive\";");
        assert!(diagnostics.is_empty());
        assert_eq!(buffer.contents(), "still alive\n");
    }

    #[test]
    fn test_static_errors_prevent_execution() {
        let (mut session, buffer) = session();

        let diagnostics = session.run("print \"never\";\nvar x = @;");
        assert_eq!(diagnostics.exit_code(), Some(EXIT_DATAERR));
        assert!(buffer.contents().is_empty());
    }

    #[test]
    fn test_report_writes_one_error_per_line() {
        let (mut session, _) = session();

        let diagnostics = session.run("print 1 +;\nprint );");
        let mut report: Vec<u8> = Vec::new();
        diagnostics.report(&mut report).unwrap();

        assert_eq!(
            String::from_utf8(report).unwrap(),
            "[line 1] Error at ';': Expect expression.\n[line 2] Error at ')': Expect expression.\n"
        );
    }
}
