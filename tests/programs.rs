mod common;

#[cfg(test)]
mod program_tests {
    use pretty_assertions::assert_eq;

    use std::io::{self, Write};

    use wagago::session::{RunOutcome, Session};

    use crate::common::{messages, run, session};

    fn output_of(source: &str) -> String {
        let (output, outcome) = run(source);
        assert!(
            outcome.is_ok(),
            "unexpected diagnostics: {:?}",
            messages(&outcome)
        );
        output
    }

    fn runtime_error_of(source: &str) -> (String, String) {
        let (output, outcome) = run(source);
        match outcome {
            RunOutcome::RuntimeError(e) => (output, e.to_string()),
            other => panic!("expected a runtime fault, got {:?}", other),
        }
    }

    #[test]
    fn test_arithmetic_and_concatenation() {
        assert_eq!(
            output_of(
                "print 1 + 1;\nprint \"a\" + \"b\";\nprint 1 + \"a\" == \"1a\";\nprint \"n=\" + 2.5;\nprint 7 / 2;\nprint -(3 * 2) - 1;"
            ),
            "2\nab\ntrue\nn=2.5\n3.5\n-7\n"
        );
    }

    #[test]
    fn test_plus_rejects_other_mixes() {
        let (output, error) = runtime_error_of("print \"before\";\nprint true + 1;\nprint \"after\";");
        assert_eq!(output, "before\n");
        assert_eq!(
            error,
            "Operands must be two numbers or at least one string.\n[line 2]"
        );
    }

    #[test]
    fn test_division_by_zero_follows_ieee() {
        assert_eq!(
            output_of("print 1 / 0;\nprint -1 / 0;\nvar nan = 0 / 0; print nan == nan;"),
            "inf\n-inf\nfalse\n"
        );
    }

    #[test]
    fn test_truthiness() {
        assert_eq!(
            output_of(
                "if (0) print \"yes\"; else print \"no\";\nif (nil) print \"yes\"; else print \"no\";\nif (\"\") print \"empty\";\nprint !nil;\nprint nil or \"default\";\nprint false and boom;"
            ),
            "yes\nno\nempty\ntrue\ndefault\nfalse\n"
        );
    }

    #[test]
    fn test_equality() {
        assert_eq!(
            output_of(
                "print nil == nil;\nprint 1 == \"1\";\nprint \"a\" == \"a\";\nfun f() {}\nprint f == f;\nclass A {}\nprint A() == A();"
            ),
            "true\nfalse\ntrue\ntrue\nfalse\n"
        );
    }

    #[test]
    fn test_shadowing() {
        assert_eq!(
            output_of("var a = 1;\n{ var a = 2; print a; }\nprint a;"),
            "2\n1\n"
        );
    }

    #[test]
    fn test_closure_counter() {
        let source = "\
fun makeCounter() {
  var count = 0;
  fun counter() {
    count = count + 1;
    return count;
  }
  return counter;
}
var c = makeCounter();
print c();
print c();
var d = makeCounter();
print d();
print c();";

        assert_eq!(output_of(source), "1\n2\n1\n3\n");
    }

    #[test]
    fn test_closure_binding_is_static() {
        let source = "\
var a = \"global\";
{
  fun show() { print a; }
  show();
  var a = \"block\";
  show();
}";

        assert_eq!(output_of(source), "global\nglobal\n");
    }

    #[test]
    fn test_recursion_and_loops() {
        let source = "\
fun fib(n) { if (n < 2) return n; return fib(n - 1) + fib(n - 2); }
print fib(15);
var total = 0;
for (var i = 1; i <= 10; i = i + 1) total = total + i;
print total;
var n = 3;
while (n > 0) { print n; n = n - 1; }";

        assert_eq!(output_of(source), "610\n55\n3\n2\n1\n");
    }

    #[test]
    fn test_value_display() {
        assert_eq!(
            output_of(
                "fun f() {}\nclass P {}\nimport m { g() {} }\nprint f;\nprint clock;\nprint P;\nprint P();\nprint m;\nprint f();"
            ),
            "<fn f>\n<native fn>\nP\nP instance\n'm' module\nnil\n"
        );
    }

    #[test]
    fn test_classes_fields_and_methods() {
        let source = "\
class Point {
  init(x, y) { this.x = x; this.y = y; }
  sum() { return this.x + this.y; }
}
var p = Point(1, 2);
print p.sum();
p.x = 10;
print p.sum();
var bound = p.sum;
p.y = 5;
print bound();
p.sum = \"field wins\";
print p.sum;";

        assert_eq!(output_of(source), "3\n12\n15\nfield wins\n");
    }

    #[test]
    fn test_super_calls_reach_the_superclass() {
        let source = "\
class A { greet() { print \"A\"; } }
class B : A { greet() { super.greet(); print \"B\"; } }
B().greet();";

        assert_eq!(output_of(source), "A\nB\n");
    }

    #[test]
    fn test_super_is_bound_to_the_defining_class() {
        // C inherits m from B; inside it `super` must still mean A, not B.
        let source = "\
class A { m() { print \"A\"; } }
class B : A { m() { print \"B\"; super.m(); } }
class C : B {}
C().m();";

        assert_eq!(output_of(source), "B\nA\n");
    }

    #[test]
    fn test_inherited_methods_and_init() {
        let source = "\
class Base { init(name) { this.name = name; } hello() { return \"hi \" + this.name; } }
class Derived : Base {}
var d = Derived(\"wagago\");
print d.hello();";

        assert_eq!(output_of(source), "hi wagago\n");
    }

    #[test]
    fn test_initializer_returns_the_instance() {
        let source = "\
class Foo {
  init() { this.ready = true; return; }
}
var foo = Foo();
print foo;
print foo.ready;
print foo.init() == foo;";

        assert_eq!(output_of(source), "Foo instance\ntrue\ntrue\n");

        let (_, outcome) = run("class Foo { init() { return 5; } }");
        assert_eq!(
            messages(&outcome),
            vec!["[line 1] Error at 'return': Can't return a value from an initializer."]
        );
    }

    #[test]
    fn test_arity_enforcement() {
        let (_, error) = runtime_error_of("fun one(a) {}\none();");
        assert_eq!(error, "Expected 1 arguments but got 0.\n[line 2]");

        let (_, error) = runtime_error_of("fun one(a) {}\none(1, 2);");
        assert_eq!(error, "Expected 1 arguments but got 2.\n[line 2]");

        let (_, error) = runtime_error_of("class P { init(x) {} }\nP();");
        assert_eq!(error, "Expected 1 arguments but got 0.\n[line 2]");
    }

    #[test]
    fn test_runtime_fault_messages() {
        let cases: &[(&str, &str)] = &[
            ("print missing;", "Undefined variable 'missing'.\n[line 1]"),
            ("missing = 1;", "Undefined variable 'missing'.\n[line 1]"),
            ("print -\"x\";", "Operand must be a number.\n[line 1]"),
            ("print 1 < \"2\";", "Operands must be numbers.\n[line 1]"),
            ("\"not fn\"();", "Can only call functions and classes.\n[line 1]"),
            ("print 3.field;", "Only instances and modules have properties.\n[line 1]"),
            ("var s = \"s\"; s.f = 1;", "Only instances have fields.\n[line 1]"),
            ("class A {} print A().nope;", "Undefined property 'nope'.\n[line 1]"),
            ("var x = 1; class B : x {}", "Superclass must be a class.\n[line 1]"),
            ("import m {} m.nope();", "Undefined module function 'nope'.\n[line 1]"),
        ];

        for (source, expected) in cases {
            let (_, error) = runtime_error_of(source);
            assert_eq!(&error, expected, "source: {}", source);
        }
    }

    #[test]
    fn test_modules() {
        let source = "\
var factor = 3;
import math {
  square(n) { return n * n; }
  scaled(n) { return square(n) * factor; }
}
print math.square(4);
print math.scaled(2);";

        // Module members close over the defining scope, not each other.
        let (output, outcome) = run(source);
        assert_eq!(output, "16\n");
        assert_eq!(
            messages(&outcome),
            vec!["Undefined variable 'square'.\n[line 4]"]
        );

        assert_eq!(
            output_of("import util { twice(x) { return x + x; } }\nvar t = util.twice;\nprint t(\"ab\");"),
            "abab\n"
        );
    }

    #[test]
    fn test_static_errors_suppress_execution() {
        let (output, outcome) = run("print \"never\";\nprint 1 +;\n{ var a = a; }");
        assert_eq!(output, "");
        assert_eq!(
            messages(&outcome),
            vec!["[line 2] Error at ';': Expect expression."]
        );

        let (output, outcome) = run("print \"never\";\n{ var a = a; }");
        assert_eq!(output, "");
        assert!(matches!(outcome, RunOutcome::StaticErrors(_)));
    }

    #[test]
    fn test_error_flags_and_persistent_globals() {
        let (mut session, output) = session();

        assert!(session.run("var greeting = \"hi\";").is_ok());
        assert!(!session.had_error() && !session.had_runtime_error());

        session.run("print greeting +;");
        assert!(session.had_error());
        assert!(!session.had_runtime_error());

        session.reset_errors();
        session.run("print undefined_thing;");
        assert!(!session.had_error());
        assert!(session.had_runtime_error());

        session.reset_errors();
        assert!(session.run("fun greet() { return greeting + \"!\"; }").is_ok());
        assert!(session.run("{ var local = greet(); print local; }").is_ok());
        assert!(!session.had_error() && !session.had_runtime_error());

        assert_eq!(output.contents(), "hi!\n");
    }

    #[test]
    fn test_independent_sessions_do_not_share_state() {
        let (mut first, _) = session();
        let (mut second, _) = session();

        first.run("var only_here = 1; print nope;");
        assert!(first.had_runtime_error());
        assert!(!second.had_runtime_error());

        let outcome = second.run("print only_here;");
        assert_eq!(
            messages(&outcome),
            vec!["Undefined variable 'only_here'.\n[line 1]"]
        );
    }

    #[test]
    fn test_clock_is_a_number() {
        assert_eq!(
            output_of("var t = clock(); print t > 1000000000; print clock() - t >= 0;"),
            "true\ntrue\n"
        );
    }

    #[test]
    fn test_fault_inside_block_restores_the_global_scope() {
        let (mut session, output) = session();

        let outcome = session.run("{ var x = 1; print nope; }");
        assert_eq!(
            messages(&outcome),
            vec!["Undefined variable 'nope'.\n[line 1]"]
        );

        let outcome = session.run("var y = 2;");
        assert_eq!(messages(&outcome), Vec::<String>::new());

        let outcome = session.run("{ print y; }");
        assert_eq!(messages(&outcome), Vec::<String>::new());
        assert_eq!(output.contents(), "2\n");

        // `x` lived in the abandoned block only.
        let outcome = session.run("print x;");
        assert_eq!(messages(&outcome), vec!["Undefined variable 'x'.\n[line 1]"]);
    }

    #[test]
    fn test_rejected_lines_leave_earlier_closures_working() {
        let (mut session, output) = session();

        assert!(session
            .run("fun make() { var n = 0; fun inc() { n = n + 1; return n; } return inc; }")
            .is_ok());
        assert!(session.run("var inc = make(); print inc();").is_ok());
        assert!(!session.run("{ var a = a; }").is_ok());
        assert!(!session.run("print (;").is_ok());
        assert!(session.run("print inc();").is_ok());

        assert_eq!(output.contents(), "1\n2\n");
    }

    /// Accepts writes, refuses to flush.
    struct UnflushableOutput;

    impl Write for UnflushableOutput {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }
    }

    #[test]
    fn test_fault_is_reported_even_when_flush_fails() {
        let mut session = Session::with_output(Box::new(UnflushableOutput));

        let outcome = session.run("print 1;\nprint -nil;");
        assert_eq!(
            messages(&outcome),
            vec!["Operand must be a number.\n[line 2]"]
        );
        assert!(session.had_runtime_error());
    }

    #[test]
    fn test_deep_recursion_runs_on_a_large_stack() {
        let worker = std::thread::Builder::new()
            .stack_size(64 * 1024 * 1024)
            .spawn(|| {
                let (output, outcome) = run(
                    "fun count(n) { if (n == 0) return 0; return 1 + count(n - 1); }\nprint count(1000);",
                );
                (output, messages(&outcome))
            })
            .unwrap();

        let (output, diagnostics) = worker.join().unwrap();
        assert_eq!(diagnostics, Vec::<String>::new());
        assert_eq!(output, "1000\n");
    }
}
