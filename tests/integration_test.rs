// Integration tests for the analysis engine

use fieldflow::parser::parser::Parser;
use fieldflow::state::ValueRange;
use fieldflow::{Engine, FunctionReport, ProjectConfig};

fn analyze(source: &str) -> Vec<FunctionReport> {
    let mut parser = Parser::new(source).expect("Parser creation failed");
    let program = parser.parse_program().expect("Parsing failed");

    let mut engine = Engine::new(program, &ProjectConfig::default());
    engine.analyze()
}

fn analyze_one(source: &str) -> FunctionReport {
    let mut reports = analyze(source);
    assert_eq!(reports.len(), 1, "expected exactly one function");
    reports.remove(0)
}

#[test]
fn test_simple_assignments() {
    let report = analyze_one(
        r#"
        int main() {
            int x = 5;
            int y = 10;
            int z = x + y;
            return z;
        }
    "#,
    );

    assert!(report.errors.is_empty(), "unexpected errors: {:?}", report.errors);
    assert_eq!(report.value_of("z"), Some(ValueRange::exact(15)));
    assert!(report.is_modified("x"));
}

#[test]
fn test_functions_analyzed_independently() {
    let reports = analyze(
        r#"
        int add(int a, int b) {
            int sum = a + b;
            return sum;
        }

        int main() {
            int result = add(3, 4);
            return result;
        }
    "#,
    );

    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0].name, "add");
    assert_eq!(
        reports[0].value_of("sum").unwrap().to_string(),
        "s32min-s32max"
    );
    // Calls are not followed into the callee
    assert_eq!(
        reports[1].value_of("result").unwrap().to_string(),
        "s32min-s32max"
    );
}

#[test]
fn test_struct_member_writes() {
    let report = analyze_one(
        r#"
        struct Point {
            int x;
            int y;
        };

        int main() {
            struct Point p;
            p.x = 10;
            p.y = 20;
            return p.x + p.y;
        }
    "#,
    );

    assert_eq!(report.value_of("p.x"), Some(ValueRange::exact(10)));
    assert_eq!(report.value_of("p.y"), Some(ValueRange::exact(20)));
    assert_eq!(report.value_of("p"), None);
}

#[test]
fn test_if_else_merge() {
    let report = analyze_one(
        r#"
        struct pair { int x; int y; };

        void f(int n) {
            struct pair a;
            if (n) {
                a.x = 1;
                a.y = 5;
            } else {
                a.x = 3;
            }
        }
    "#,
    );

    assert_eq!(report.value_of("a.x"), Some(ValueRange::new(1, 3)));
    // Only known on one side
    assert_eq!(report.value_of("a.y"), None);
    assert!(report.is_modified("a.y"));
}

#[test]
fn test_if_without_else_keeps_fallthrough() {
    let report = analyze_one(
        r#"
        void f(int n) {
            int v = 7;
            if (n > 3)
                v = 9;
        }
    "#,
    );

    assert_eq!(report.value_of("v"), Some(ValueRange::new(7, 9)));
}

#[test]
fn test_returns_are_merged() {
    let report = analyze_one(
        r#"
        int f(int n) {
            int r = 1;
            if (n) {
                r = 2;
                return r;
            }
            r = 3;
            return r;
        }
    "#,
    );

    assert_eq!(report.value_of("r"), Some(ValueRange::new(2, 3)));
}

#[test]
fn test_while_with_break() {
    let report = analyze_one(
        r#"
        void f(int n) {
            int total = 0;
            while (n) {
                total = 5;
                break;
            }
        }
    "#,
    );

    assert_eq!(report.value_of("total"), Some(ValueRange::new(0, 5)));
}

#[test]
fn test_for_loop_runs_body_once() {
    let report = analyze_one(
        r#"
        void f(int n) {
            int s = 0;
            for (int i = 0; i < n; i++) {
                s = 1;
            }
        }
    "#,
    );

    assert_eq!(report.value_of("s"), Some(ValueRange::new(0, 1)));
    // The loop variable is scoped to the loop but its state is kept
    assert!(report.is_modified("i"));
}

#[test]
fn test_do_while_with_continue() {
    let report = analyze_one(
        r#"
        void f(int n) {
            int a = 0;
            do {
                a = 1;
                if (n)
                    continue;
                a = 2;
            } while (n);
        }
    "#,
    );

    assert_eq!(report.value_of("a"), Some(ValueRange::new(1, 2)));
}

#[test]
fn test_errors_are_reported_per_statement() {
    let report = analyze_one(
        r#"
        struct s { int a; };
        void f() {
            struct s v;
            int ok = 1;
            v.nope = 2;
            undeclared = 3;
            ok = 4;
        }
    "#,
    );

    assert_eq!(report.errors.len(), 2);
    assert_eq!(report.errors[0].location().line, 6);
    assert_eq!(report.value_of("ok"), Some(ValueRange::exact(4)));
}

#[test]
fn test_parse_error_location() {
    let err = Parser::new("void f() { int x = ; }")
        .and_then(|mut p| p.parse_program())
        .unwrap_err();

    assert_eq!(err.location.line, 1);
    assert!(err.to_string().starts_with("Parse error at line 1"));
}
