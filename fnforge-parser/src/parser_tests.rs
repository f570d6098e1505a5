#[cfg(test)]
mod tests {
    use crate::error::ParseError;
    use crate::{parse_expression, parse_program, parse_with_depth_limit, DEFAULT_MAX_DEPTH};
    use fnforge_core::ast::{
        Argument, ArrayElement, AssignOp, BinaryOp, DeclKind, Entry, Expr, FunctionBody, Literal,
        LogicalOp, MemberProperty, Pattern, Property, Stmt, UnaryOp, UpdateOp,
    };
    use pretty_assertions::assert_eq;

    // ===== Helper Functions =====

    fn expr(source: &str) -> Expr {
        parse_expression(source).unwrap()
    }

    fn statements(source: &str) -> Vec<Stmt> {
        parse_program(source).unwrap().statements().cloned().collect()
    }

    fn num(n: f64) -> Expr {
        Expr::Literal(Literal::Number(n))
    }

    fn ident(name: &str) -> Expr {
        Expr::Ident(name.to_string())
    }

    // ===== Literal Tests =====

    #[test]
    fn test_parse_literals() {
        assert_eq!(expr("42"), num(42.0));
        assert_eq!(expr("'hi'"), Expr::Literal(Literal::String("hi".into())));
        assert_eq!(expr("true"), Expr::Literal(Literal::Boolean(true)));
        assert_eq!(expr("null"), Expr::Literal(Literal::Null));
        assert_eq!(expr("undefined"), ident("undefined"));
    }

    #[test]
    fn test_parse_template_literal() {
        match expr("`a${x + 1}b${y}`") {
            Expr::Template { quasis, exprs } => {
                assert_eq!(quasis, vec!["a".to_string(), "b".to_string(), String::new()]);
                assert_eq!(exprs.len(), 2);
                assert!(matches!(exprs[0], Expr::Binary { op: BinaryOp::Add, .. }));
                assert_eq!(exprs[1], ident("y"));
            }
            other => panic!("expected template, got {:?}", other),
        }
    }

    #[test]
    fn test_template_error_position_is_absolute() {
        let err = parse_program("let s = `${1 + )}`;").unwrap_err();
        assert!(err.position().unwrap() >= 9);
    }

    #[test]
    fn test_parse_array_and_object_literals() {
        assert_eq!(
            expr("[1, , ...xs]"),
            Expr::Array(vec![
                ArrayElement::Expr(num(1.0)),
                ArrayElement::Hole,
                ArrayElement::Spread(ident("xs")),
            ])
        );

        match expr("({ a: 1, b, [k]: 2, ...rest, 3: 'x', double(n) { return n * 2 } })") {
            Expr::Object(props) => {
                assert_eq!(props.len(), 6);
                assert_eq!(props[0], Property::KeyValue("a".into(), num(1.0)));
                assert_eq!(props[1], Property::KeyValue("b".into(), ident("b")));
                assert!(matches!(props[2], Property::Computed(_, _)));
                assert_eq!(props[3], Property::Spread(ident("rest")));
                assert!(matches!(&props[4], Property::KeyValue(k, _) if k == "3"));
                assert!(matches!(&props[5], Property::KeyValue(k, Expr::Function(_)) if k == "double"));
            }
            other => panic!("expected object, got {:?}", other),
        }
    }

    // ===== Operator Tests =====

    #[test]
    fn test_precedence() {
        assert_eq!(
            expr("1 + 2 * 3"),
            Expr::Binary {
                op: BinaryOp::Add,
                left: Box::new(num(1.0)),
                right: Box::new(Expr::Binary {
                    op: BinaryOp::Mul,
                    left: Box::new(num(2.0)),
                    right: Box::new(num(3.0)),
                }),
            }
        );
    }

    #[test]
    fn test_left_associativity() {
        assert_eq!(
            expr("10 - 4 - 3"),
            Expr::Binary {
                op: BinaryOp::Sub,
                left: Box::new(Expr::Binary {
                    op: BinaryOp::Sub,
                    left: Box::new(num(10.0)),
                    right: Box::new(num(4.0)),
                }),
                right: Box::new(num(3.0)),
            }
        );
    }

    #[test]
    fn test_exponent_is_right_associative() {
        assert_eq!(
            expr("2 ** 3 ** 2"),
            Expr::Binary {
                op: BinaryOp::Pow,
                left: Box::new(num(2.0)),
                right: Box::new(Expr::Binary {
                    op: BinaryOp::Pow,
                    left: Box::new(num(3.0)),
                    right: Box::new(num(2.0)),
                }),
            }
        );
    }

    #[test]
    fn test_logical_and_nullish() {
        match expr("a || b && c") {
            Expr::Logical { op, right, .. } => {
                assert_eq!(op, LogicalOp::Or);
                assert!(matches!(*right, Expr::Logical { op: LogicalOp::And, .. }));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(
            expr("a ?? 0"),
            Expr::Logical { op: LogicalOp::Nullish, .. }
        ));
    }

    #[test]
    fn test_unary_and_update() {
        assert!(matches!(expr("!x"), Expr::Unary { op: UnaryOp::Not, .. }));
        assert!(matches!(expr("typeof x"), Expr::Unary { op: UnaryOp::TypeOf, .. }));
        assert!(matches!(
            expr("i++"),
            Expr::Update { op: UpdateOp::Increment, prefix: false, .. }
        ));
        assert!(matches!(
            expr("--i"),
            Expr::Update { op: UpdateOp::Decrement, prefix: true, .. }
        ));
    }

    #[test]
    fn test_conditional() {
        assert!(matches!(
            expr("n < 2 ? n : fib(n - 1)"),
            Expr::Conditional { .. }
        ));
    }

    #[test]
    fn test_strict_equality() {
        assert!(matches!(
            expr("a === b"),
            Expr::Binary { op: BinaryOp::StrictEq, .. }
        ));
        assert!(matches!(
            expr("a !== b"),
            Expr::Binary { op: BinaryOp::StrictNotEq, .. }
        ));
    }

    // ===== Assignment Tests =====

    #[test]
    fn test_assignment_is_right_associative() {
        match expr("a = b = 1") {
            Expr::Assign { op, target, value } => {
                assert_eq!(op, AssignOp::Assign);
                assert_eq!(*target, ident("a"));
                assert!(matches!(*value, Expr::Assign { .. }));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_compound_assignment() {
        assert!(matches!(expr("x += 2"), Expr::Assign { op: AssignOp::Add, .. }));
        assert!(matches!(expr("x ??= 2"), Expr::Assign { op: AssignOp::Nullish, .. }));
    }

    #[test]
    fn test_destructuring_assignment_target() {
        assert!(matches!(expr("[a, b] = [b, a]"), Expr::Assign { .. }));
    }

    #[test]
    fn test_invalid_assignment_target() {
        let err = parse_expression("1 = 2").unwrap_err();
        assert!(matches!(err, ParseError::InvalidSyntax { .. }));
    }

    // ===== Member and Call Tests =====

    #[test]
    fn test_member_chain() {
        match expr("a.b[0]?.c(1, ...rest)") {
            Expr::Call { callee, args, optional } => {
                assert!(!optional);
                assert_eq!(args.len(), 2);
                assert!(matches!(args[1], Argument::Spread(_)));
                match *callee {
                    Expr::Member { property, optional, .. } => {
                        assert!(optional);
                        assert_eq!(property, MemberProperty::Named("c".into()));
                    }
                    other => panic!("unexpected callee {:?}", other),
                }
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_keyword_property_names() {
        assert_eq!(
            expr("obj.delete"),
            Expr::Member {
                object: Box::new(ident("obj")),
                property: MemberProperty::Named("delete".into()),
                optional: false,
            }
        );
    }

    #[test]
    fn test_new_expression() {
        match expr("new Set([1, 2])") {
            Expr::New { callee, args } => {
                assert_eq!(*callee, ident("Set"));
                assert_eq!(args.len(), 1);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    // ===== Function Tests =====

    #[test]
    fn test_arrow_functions() {
        match expr("x => x * 2") {
            Expr::Function(f) => {
                assert!(f.is_arrow);
                assert_eq!(f.param_names(), vec!["x".to_string()]);
                assert!(matches!(f.body, FunctionBody::Expr(_)));
            }
            other => panic!("unexpected {:?}", other),
        }

        match expr("(a, [b, c], { d }, ...rest) => { return a; }") {
            Expr::Function(f) => {
                assert_eq!(f.param_names(), vec!["a", "b", "c", "d", "rest"]);
                assert!(f.params[3].rest);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parenthesised_expression_is_not_arrow() {
        assert!(matches!(expr("(a + b) * 2"), Expr::Binary { op: BinaryOp::Mul, .. }));
    }

    #[test]
    fn test_function_declaration() {
        let stmts = statements("function isPrime(n) { if (n < 2) return false; return true; }");
        match &stmts[0] {
            Stmt::FunctionDecl(f) => {
                assert_eq!(f.name.as_deref(), Some("isPrime"));
                assert_eq!(f.param_names(), vec!["n".to_string()]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_default_parameters() {
        match expr("function (a, b = 2) { return a + b }") {
            Expr::Function(f) => assert!(f.params[1].default.is_some()),
            other => panic!("unexpected {:?}", other),
        }
    }

    // ===== Statement Tests =====

    #[test]
    fn test_variable_declarations() {
        let stmts = statements("let a = 1, b; const [x, y] = pair; var { k: v = 3 } = obj;");
        assert_eq!(stmts.len(), 3);
        match &stmts[0] {
            Stmt::VarDecl { kind, declarations } => {
                assert_eq!(*kind, DeclKind::Let);
                assert_eq!(declarations.len(), 2);
                assert!(declarations[1].init.is_none());
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(
            &stmts[1],
            Stmt::VarDecl { declarations, .. } if matches!(declarations[0].pattern, Pattern::Array { .. })
        ));
        assert!(matches!(
            &stmts[2],
            Stmt::VarDecl { declarations, .. } if matches!(declarations[0].pattern, Pattern::Object { .. })
        ));
    }

    #[test]
    fn test_const_requires_initializer() {
        let err = parse_program("const a;").unwrap_err();
        assert!(matches!(err, ParseError::InvalidSyntax { .. }));
    }

    #[test]
    fn test_for_loops() {
        let stmts = statements(
            "for (let i = 0, j = 10; i < j; i++, j--) {}\n\
             for (const v of xs) {}\n\
             for (const k in obj) {}\n\
             for (;;) { break; }",
        );
        assert_eq!(stmts.len(), 4);
        match &stmts[0] {
            Stmt::For { init, test, update, .. } => {
                assert!(init.is_some());
                assert!(test.is_some());
                assert!(matches!(update, Some(Expr::Sequence(items)) if items.len() == 2));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(stmts[1], Stmt::ForOf { kind: DeclKind::Const, .. }));
        assert!(matches!(stmts[2], Stmt::ForIn { .. }));
        assert!(matches!(
            stmts[3],
            Stmt::For { init: None, test: None, update: None, .. }
        ));
    }

    #[test]
    fn test_while_and_do_while() {
        let stmts = statements("while (n > 0) n--; do { n++ } while (n < 3);");
        assert!(matches!(stmts[0], Stmt::While { .. }));
        assert!(matches!(stmts[1], Stmt::DoWhile { .. }));
    }

    #[test]
    fn test_labeled_loops() {
        let stmts = statements(
            "outer: for (const row of grid) {\n\
               for (const v of row) { if (v) continue outer; if (!v) break outer }\n\
             }\n\
             done: { break done }",
        );
        match &stmts[0] {
            Stmt::Labeled { label, body } => {
                assert_eq!(label, "outer");
                assert!(matches!(**body, Stmt::ForOf { .. }));
            }
            other => panic!("unexpected {:?}", other),
        }
        match &stmts[1] {
            Stmt::Labeled { label, body } => {
                assert_eq!(label, "done");
                assert_eq!(**body, Stmt::Block(vec![Stmt::Break(Some("done".into()))]));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_jump_label_stays_on_its_line() {
        let stmts = statements("while (true) {\n  break\n  outer\n}");
        match &stmts[0] {
            Stmt::While { body, .. } => assert_eq!(
                **body,
                Stmt::Block(vec![Stmt::Break(None), Stmt::Expr(ident("outer"))])
            ),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_try_catch_finally() {
        let stmts = statements("try { risky() } catch (e) { handle(e) } finally { done() }");
        match &stmts[0] {
            Stmt::Try { handler, finalizer, .. } => {
                assert_eq!(
                    handler.as_ref().and_then(|h| h.param.clone()),
                    Some(Pattern::Ident("e".into()))
                );
                assert!(finalizer.is_some());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_try_requires_handler() {
        assert!(parse_program("try { a() }").is_err());
    }

    #[test]
    fn test_switch_statement() {
        let stmts = statements(
            "switch (op) {\n  case '+': return a + b\n  case '-':\n  case 'minus': return a - b\n  default: throw new Error('bad')\n}",
        );
        match &stmts[0] {
            Stmt::Switch { cases, .. } => {
                assert_eq!(cases.len(), 4);
                assert!(cases[2].test.is_some());
                assert!(cases[1].body.is_empty());
                assert!(cases[3].test.is_none());
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(parse_program("switch (a) { default: 1; default: 2 }").is_err());
    }

    #[test]
    fn test_if_else_chain() {
        let stmts = statements("if (a) b(); else if (c) d(); else e();");
        match &stmts[0] {
            Stmt::If { alternate: Some(alt), .. } => {
                assert!(matches!(**alt, Stmt::If { alternate: Some(_), .. }));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    // ===== Semicolon Insertion =====

    #[test]
    fn test_semicolons_optional_at_line_breaks() {
        let stmts = statements("let a = 1\nlet b = a + 1\nb");
        assert_eq!(stmts.len(), 3);
    }

    #[test]
    fn test_return_followed_by_newline() {
        let stmts = statements("function f(x) {\n  return\n  x\n}");
        match &stmts[0] {
            Stmt::FunctionDecl(f) => match &f.body {
                FunctionBody::Block(body) => {
                    assert_eq!(body[0], Stmt::Return(None));
                    assert_eq!(body[1], Stmt::Expr(ident("x")));
                }
                other => panic!("unexpected {:?}", other),
            },
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_missing_semicolon_on_same_line() {
        let err = parse_program("let a = 1 let b = 2").unwrap_err();
        assert!(matches!(err, ParseError::UnexpectedToken { .. }));
    }

    #[test]
    fn test_top_level_return() {
        let stmts = statements("return x * 2;");
        assert!(matches!(stmts[0], Stmt::Return(Some(_))));
    }

    // ===== Spans and Entry =====

    #[test]
    fn test_item_spans_cover_statement_text() {
        let source = "const y = 2;\nconsole.log(x)";
        let program = parse_program(source).unwrap();
        assert_eq!(&source[program.items[0].span.clone()], "const y = 2;");
        assert_eq!(&source[program.items[1].span.clone()], "console.log(x)");
    }

    #[test]
    fn test_entry_from_arrow_binding() {
        let program = parse_program("const f = (n) => n + 1;").unwrap();
        match program.entry() {
            Entry::Function { name, function } => {
                assert_eq!(name, "f");
                assert!(function.is_arrow);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    // ===== Errors and Limits =====

    #[test]
    fn test_unexpected_eof() {
        let err = parse_program("function f(x) {").unwrap_err();
        assert!(matches!(err, ParseError::UnexpectedEof { .. }));
    }

    #[test]
    fn test_error_reports_found_token() {
        match parse_program("let = 3").unwrap_err() {
            ParseError::UnexpectedToken { position, found, .. } => {
                assert_eq!(position, 4);
                assert_eq!(found, "'='");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_regex_literal_is_rejected_clearly() {
        match parse_program("function f(s) { return /ab+c/.test(s) }").unwrap_err() {
            ParseError::InvalidSyntax { position, message } => {
                assert_eq!(position, 23);
                assert_eq!(message, "regular expression literals are not supported");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_depth_limit_prevents_stack_overflow() {
        let depth = 2000;
        let input = format!("{}1{}", "(".repeat(depth), ")".repeat(depth));

        match parse_program(&input) {
            Err(ParseError::MaxDepthExceeded { max_depth, .. }) => {
                assert_eq!(max_depth, DEFAULT_MAX_DEPTH);
            }
            other => panic!("expected MaxDepthExceeded, got {:?}", other),
        }
    }

    #[test]
    fn test_custom_depth_limit() {
        let input = format!("{}1{}", "[".repeat(20), "]".repeat(20));
        assert!(parse_with_depth_limit(&input, 10).is_err());
        assert!(parse_with_depth_limit(&input, 100).is_ok());
    }

    #[test]
    fn test_empty_program() {
        assert!(parse_program("").unwrap().is_empty());
        assert!(parse_program("  // nothing\n").unwrap().is_empty());
    }
}
