#[cfg(test)]
mod tests {
    use crate::error::InterpreterError;
    use crate::{evaluate, matches_expected, Interpreter, InterpreterOptions, Value};
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value as Json};
    use std::time::Duration;

    // ===== Helper Functions =====

    fn run(source: &str, input: Json) -> Json {
        evaluate(source, &input, &InterpreterOptions::default()).unwrap()
    }

    fn run_err(source: &str, input: Json) -> InterpreterError {
        evaluate(source, &input, &InterpreterOptions::default()).unwrap_err()
    }

    fn run_with(source: &str, input: Json, options: InterpreterOptions) -> InterpreterError {
        evaluate(source, &input, &options).unwrap_err()
    }

    const PRIME: &str = r#"
        function f(n) {
            if (n < 2) return false;
            for (let i = 2; i * i <= n; i++) {
                if (n % i === 0) return false;
            }
            return true;
        }
    "#;

    // ===== Entry Resolution =====

    #[test]
    fn test_prime_checker() {
        assert_eq!(run(PRIME, json!(53)), json!(true));
        assert_eq!(run(PRIME, json!(44)), json!(false));
        assert_eq!(run(PRIME, json!(2)), json!(true));
    }

    #[test]
    fn test_bare_body_uses_x() {
        assert_eq!(run("return x * 2", json!(21)), json!(42));
    }

    #[test]
    fn test_arrow_entry() {
        let source = "const f = (s) => s.split('').reverse().join('')";
        assert_eq!(run(source, json!("abc")), json!("cba"));
    }

    #[test]
    fn test_entry_bound_to_other_function() {
        let source = "const helper = (n) => n + 1;\nconst f = helper;";
        assert_eq!(run(source, json!(1)), json!(2));
    }

    #[test]
    fn test_entry_not_a_function() {
        assert!(matches!(
            run_err("const f = 5;", json!(1)),
            InterpreterError::InvalidEntry(_)
        ));
    }

    #[test]
    fn test_helpers_visible_to_entry() {
        let source = r#"
            function square(n) { return n * n; }
            function f(xs) { return xs.map(square); }
        "#;
        assert_eq!(run(source, json!([1, 2, 3])), json!([1, 4, 9]));
    }

    // ===== Scoping =====

    #[test]
    fn test_let_per_iteration() {
        let source = r#"
            function f(n) {
                const fns = [];
                for (let i = 0; i < n; i++) {
                    fns.push(() => i);
                }
                return fns.map(g => g());
            }
        "#;
        assert_eq!(run(source, json!(3)), json!([0, 1, 2]));
    }

    #[test]
    fn test_var_hoisting() {
        let source = "function f(x) { if (x) { var y = 1; } return y; }";
        assert_eq!(run(source, json!(true)), json!(1));
        assert_eq!(run(source, json!(false)), json!(null));
    }

    #[test]
    fn test_function_hoisting() {
        let source = "function f(x) { return double(x); function double(n) { return n * 2; } }";
        assert_eq!(run(source, json!(4)), json!(8));
    }

    #[test]
    fn test_sloppy_global_assignment() {
        let source = "function f(x) { total = x + 1; return total; }";
        assert_eq!(run(source, json!(1)), json!(2));
    }

    #[test]
    fn test_typeof_undeclared() {
        let source = "function f(x) { return typeof notDeclared; }";
        assert_eq!(run(source, json!(0)), json!("undefined"));
    }

    #[test]
    fn test_const_assignment_is_catchable() {
        let source = r#"
            function f(x) {
                try { const a = 1; a = 2; return 'no'; }
                catch (e) { return e.name; }
            }
        "#;
        assert_eq!(run(source, json!(0)), json!("TypeError"));
    }

    #[test]
    fn test_memoized_recursion() {
        let source = r#"
            const memo = {};
            function f(n) {
                if (n < 2) return n;
                if (memo[n]) return memo[n];
                return memo[n] = f(n - 1) + f(n - 2);
            }
        "#;
        assert_eq!(run(source, json!(50)), json!(12586269025u64));
    }

    #[test]
    fn test_arguments_and_rest() {
        assert_eq!(
            run("function f() { return arguments.length; }", json!(7)),
            json!(1)
        );
        assert_eq!(
            run("function f(...nums) { return Math.max(...nums, 3); }", json!(5)),
            json!(5)
        );
    }

    // ===== Patterns =====

    #[test]
    fn test_destructuring_params() {
        let source = "function f({a, b: [c, ...rest]}) { return [a, c, rest]; }";
        assert_eq!(
            run(source, json!({"a": 1, "b": [2, 3, 4]})),
            json!([1, 2, [3, 4]])
        );
    }

    #[test]
    fn test_destructuring_assignment_swap() {
        let source = "function f(p) { let a = p[0], b = p[1]; [a, b] = [b, a]; return {a, b}; }";
        assert_eq!(run(source, json!([1, 2])), json!({"a": 2, "b": 1}));
    }

    #[test]
    fn test_default_values() {
        let source = "function f(x, y = 10) { const { z = 5 } = x; return y + z; }";
        assert_eq!(run(source, json!({})), json!(15));
    }

    // ===== Control Flow =====

    #[test]
    fn test_switch_fallthrough() {
        let source = r#"
            function f(x) {
                const out = [];
                switch (x) {
                    case 1: out.push('one');
                    case 2: out.push('two'); break;
                    default: out.push('other');
                }
                return out;
            }
        "#;
        assert_eq!(run(source, json!(1)), json!(["one", "two"]));
        assert_eq!(run(source, json!(5)), json!(["other"]));
    }

    #[test]
    fn test_loops_break_continue() {
        let source = r#"
            function f(n) {
                let sum = 0;
                let i = 0;
                while (true) {
                    i++;
                    if (i > n) break;
                    if (i % 2 === 0) continue;
                    sum += i;
                }
                do { sum += 100; } while (false);
                return sum;
            }
        "#;
        assert_eq!(run(source, json!(5)), json!(109));
    }

    #[test]
    fn test_labeled_break_and_continue() {
        let source = r#"
            function f(grid) {
                const firstNegative = [];
                outer: for (let r = 0; r < grid.length; r++) {
                    for (const v of grid[r]) {
                        if (v === 0) continue outer;
                        if (v < 0) {
                            firstNegative.push(v);
                            break outer;
                        }
                    }
                    firstNegative.push(r);
                }
                let n = 0;
                search: while (true) {
                    do {
                        n++;
                        if (n > 3) break search;
                    } while (true);
                }
                block: {
                    if (n === 4) break block;
                    n = -1;
                }
                return [firstNegative, n];
            }
        "#;
        assert_eq!(
            run(source, json!([[1, 2], [0, -5], [3, -7], [-9]])),
            json!([[0, -7], 4])
        );
    }

    #[test]
    fn test_for_in_and_for_of() {
        let source = r#"
            function f(o) {
                const keys = [];
                for (const k in o) keys.push(k);
                let total = 0;
                for (const [k, v] of Object.entries(o)) total += v;
                return [keys, total];
            }
        "#;
        assert_eq!(
            run(source, json!({"b": 1, "a": 2})),
            json!([["b", "a"], 3])
        );
    }

    #[test]
    fn test_try_finally_order() {
        let source = r#"
            function f(x) {
                const log = [];
                try { log.push('try'); throw new Error('x'); }
                catch (e) { log.push(e.message); }
                finally { log.push('finally'); }
                return log;
            }
        "#;
        assert_eq!(run(source, json!(0)), json!(["try", "x", "finally"]));
    }

    #[test]
    fn test_runtime_type_error_is_catchable() {
        let source = r#"
            function f(x) {
                try { null.foo; } catch (e) { return e instanceof TypeError; }
            }
        "#;
        assert_eq!(run(source, json!(0)), json!(true));
    }

    // ===== Operators =====

    #[test]
    fn test_optional_chaining_and_nullish() {
        let source = "function f(x) { return x?.a?.b ?? 'none'; }";
        assert_eq!(run(source, json!({})), json!("none"));
        assert_eq!(run(source, json!({"a": {"b": 0}})), json!(0));
        assert_eq!(run(source, json!(null)), json!("none"));
    }

    #[test]
    fn test_equality_and_coercion() {
        let source = r#"
            function f(x) {
                return [1 == '1', 1 === '1', null == undefined, '5' * '2', '5' + 2,
                        [2] < [10], 'b' > 'a', 7 >>> 1, -7 >> 1, 2 ** 10];
            }
        "#;
        assert_eq!(
            run(source, json!(0)),
            json!([true, false, true, 10, "52", false, true, 3, -4, 1024])
        );
    }

    #[test]
    fn test_template_literal() {
        let source = "function f(p) { return `${p.name} is ${p.age + 1}`; }";
        assert_eq!(
            run(source, json!({"name": "Ada", "age": 35})),
            json!("Ada is 36")
        );
    }

    #[test]
    fn test_compound_member_update_evaluates_once() {
        let source = r#"
            function f(x) {
                const a = [0, 0, 0];
                let i = 0;
                a[i++] += 5;
                return [a, i];
            }
        "#;
        assert_eq!(run(source, json!(0)), json!([[5, 0, 0], 1]));
    }

    #[test]
    fn test_array_length_grows_on_write() {
        let source = "function f(x) { const a = []; a[3] = 1; return a.length; }";
        assert_eq!(run(source, json!(0)), json!(4));
    }

    // ===== Builtins =====

    #[test]
    fn test_string_methods() {
        let source = r#"
            function f(s) {
                return [s.toUpperCase(), s.padStart(7, '*'), s.slice(-3), s.indexOf('l'),
                        s.split('l'), s.at(-1), s.replace('l', 'L'), s.includes('ell'),
                        s.length, s[1]];
            }
        "#;
        assert_eq!(
            run(source, json!("hello")),
            json!(["HELLO", "**hello", "llo", 2, ["he", "", "o"], "o", "heLlo", true, 5, "e"])
        );
    }

    #[test]
    fn test_array_methods() {
        let source = r#"
            function f(xs) {
                return [
                    xs.filter(n => n % 2 === 0).map(n => n * 10),
                    xs.reduce((a, b) => a + b, 0),
                    [[1, [2]], 3].flat(Infinity),
                    Array.from({ length: 3 }, (_, i) => i * i),
                    [NaN].includes(NaN),
                    [NaN].indexOf(NaN),
                    xs.some(n => n > 3),
                    xs.every(n => n > 0),
                    xs.findIndex(n => n === 3),
                    xs.slice().reverse(),
                    xs.join('-'),
                ];
            }
        "#;
        assert_eq!(
            run(source, json!([1, 2, 3, 4])),
            json!([[20, 40], 10, [1, 2, 3], [0, 1, 4], true, -1, true, true, 2, [4, 3, 2, 1], "1-2-3-4"])
        );
    }

    #[test]
    fn test_sort() {
        let source = "function f(xs) { return [xs.slice().sort(), xs.slice().sort((a, b) => a - b)]; }";
        assert_eq!(
            run(source, json!([10, 9, 1])),
            json!([[1, 10, 9], [1, 9, 10]])
        );
    }

    #[test]
    fn test_sort_with_inconsistent_comparator() {
        let source = "function f(xs) { return xs.sort(() => 1).length; }";
        assert_eq!(run(source, json!([3, 1, 2, 5, 4])), json!(5));
    }

    #[test]
    fn test_map_and_set() {
        let source = r#"
            function f(words) {
                const counts = new Map();
                for (const w of words) counts.set(w, (counts.get(w) || 0) + 1);
                const unique = new Set(words);
                return [Object.fromEntries(counts), unique.size, [...unique], unique.has('b')];
            }
        "#;
        assert_eq!(
            run(source, json!(["a", "b", "a"])),
            json!([{"a": 2, "b": 1}, 2, ["a", "b"], true])
        );
    }

    #[test]
    fn test_json_builtins() {
        let source = r#"
            function f(x) {
                return [JSON.stringify({a: [1, "x"], b: null, c: undefined}),
                        JSON.stringify([1], null, 2),
                        JSON.parse('{"k": [true]}').k[0]];
            }
        "#;
        assert_eq!(
            run(source, json!(0)),
            json!(["{\"a\":[1,\"x\"],\"b\":null}", "[\n  1\n]", true])
        );
    }

    #[test]
    fn test_number_formatting() {
        let source = r#"
            function f(x) {
                return [(0.1 + 0.2).toFixed(2), String(1 / 3), (255).toString(16),
                        parseInt('42px'), Number.isInteger(5.0), Math.round(-2.5)];
            }
        "#;
        assert_eq!(
            run(source, json!(0)),
            json!(["0.30", "0.3333333333333333", "ff", 42, true, -2])
        );
    }

    #[test]
    fn test_no_ambient_capabilities() {
        for global in ["console", "require", "process", "fetch", "setTimeout"] {
            let source = format!("function f(x) {{ return typeof {}; }}", global);
            assert_eq!(run(&source, json!(0)), json!("undefined"), "{}", global);
        }
        assert_eq!(
            run("function f(x) { return typeof Math.random; }", json!(0)),
            json!("undefined")
        );
    }

    // ===== Results =====

    #[test]
    fn test_result_conversion() {
        assert_eq!(run("function f(x) { return 0 / 0; }", json!(0)), json!(null));
        assert_eq!(run("function f(x) { return undefined; }", json!(0)), json!(null));
        assert_eq!(
            run("function f(x) { return new Set([1, 1, 2]); }", json!(0)),
            json!([1, 2])
        );
        assert_eq!(run("function f(x) { return () => 1; }", json!(0)), json!(null));
    }

    #[test]
    fn test_matches_expected_is_structural() {
        let program = fnforge_parser::parse_program("function f(x) { return {b: 2, a: 1}; }").unwrap();
        let (equal, actual) = matches_expected(
            &program,
            &json!(null),
            &json!({"a": 1, "b": 2}),
            &InterpreterOptions::default(),
        )
        .unwrap();
        assert!(equal);
        assert_eq!(actual, json!({"b": 2, "a": 1}));

        let program = fnforge_parser::parse_program("function f(x) { return undefined; }").unwrap();
        let (equal, _) = matches_expected(
            &program,
            &json!(null),
            &json!(null),
            &InterpreterOptions::default(),
        )
        .unwrap();
        assert!(!equal);
    }

    // ===== Errors and Limits =====

    #[test]
    fn test_uncaught_error() {
        assert_eq!(
            run_err("function f(x) { throw new Error('bad'); }", json!(0)),
            InterpreterError::Uncaught("Error: bad".to_string())
        );
        assert_eq!(
            run_err("function f(x) { return y; }", json!(0)),
            InterpreterError::Uncaught("ReferenceError: y is not defined".to_string())
        );
        assert_eq!(
            run_err("function f(x) { return [].reduce((a, b) => a + b); }", json!(0)),
            InterpreterError::Uncaught(
                "TypeError: Reduce of empty array with no initial value".to_string()
            )
        );
    }

    #[test]
    fn test_uncaught_primitive() {
        assert!(matches!(
            run_err("function f(x) { throw 'bad'; }", json!(0)),
            InterpreterError::Uncaught(_)
        ));
    }

    #[test]
    fn test_calling_non_function() {
        assert_eq!(
            run_err("function f(x) { return x.nope(); }", json!({})),
            InterpreterError::Uncaught("TypeError: x.nope is not a function".to_string())
        );
    }

    #[test]
    fn test_step_limit_cannot_be_caught() {
        let options = InterpreterOptions {
            max_steps: 10_000,
            ..InterpreterOptions::default()
        };
        let source = "function f(x) { try { while (true) {} } catch (e) { return 1; } }";
        assert_eq!(
            run_with(source, json!(0), options),
            InterpreterError::StepLimitExceeded(10_000)
        );
    }

    #[test]
    fn test_recursion_limit() {
        assert_eq!(
            run_err("function f(n) { return f(n + 1); }", json!(0)),
            InterpreterError::StackOverflow(512)
        );
    }

    #[test]
    fn test_timeout() {
        let options = InterpreterOptions {
            max_steps: u64::MAX,
            timeout: Some(Duration::from_millis(50)),
            ..InterpreterOptions::default()
        };
        assert_eq!(
            run_with("function f(x) { while (true) {} }", json!(0), options),
            InterpreterError::Timeout(Duration::from_millis(50))
        );
    }

    #[test]
    fn test_string_growth_is_bounded() {
        let source = "function f(x) { let s = 'ab'; while (true) { s += s; } }";
        assert_eq!(
            run_err(source, json!(0)),
            InterpreterError::Uncaught("RangeError: Invalid string length".to_string())
        );
    }

    #[test]
    fn test_parse_error_surfaces() {
        assert!(matches!(
            run_err("function f(x) { return ; ; }}", json!(0)),
            InterpreterError::Parse(_)
        ));
    }

    // ===== Direct Interpreter Use =====

    #[test]
    fn test_interpreter_counts_steps() {
        let program = fnforge_parser::parse_program(PRIME).unwrap();
        let mut interpreter = Interpreter::new(InterpreterOptions::default());
        let result = interpreter.call_entry(&program, Value::Number(97.0)).unwrap();
        assert!(result.is_truthy());
        assert!(interpreter.steps() > 0);
    }

    #[test]
    fn test_fresh_interpreter_has_no_leftover_globals() {
        let program = fnforge_parser::parse_program("function f(x) { leaked = 1; return 0; }").unwrap();
        let mut first = Interpreter::new(InterpreterOptions::default());
        first.call_entry(&program, Value::Null).unwrap();
        assert!(first.global_env().lookup("leaked").is_some());

        let second = Interpreter::new(InterpreterOptions::default());
        assert!(second.global_env().lookup("leaked").is_none());
    }
}
