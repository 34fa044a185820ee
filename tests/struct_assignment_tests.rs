// End-to-end tests for member-wise struct copies

use fieldflow::parser::parser::Parser;
use fieldflow::state::ValueRange;
use fieldflow::{Engine, FunctionReport, ProjectConfig};
use std::fs;

const FOO: &str = r#"
    struct foo {
        int x;
        int y;
        int buf[4];
    };
    struct bar {
        int x;
        int y;
    };
"#;

fn analyze_with(source: &str, config: &ProjectConfig) -> FunctionReport {
    let source = format!("{}{}", FOO, source);
    let mut parser = Parser::new(&source).expect("Parser creation failed");
    let program = parser.parse_program().expect("Parsing failed");

    let mut reports = Engine::new(program, config).analyze();
    reports.pop().expect("no function analyzed")
}

fn analyze(source: &str) -> FunctionReport {
    analyze_with(source, &ProjectConfig::default())
}

fn unknown_int() -> ValueRange {
    ValueRange::new(i32::MIN as i64, i32::MAX as i64)
}

#[test]
fn test_direct_copy_propagates_members() {
    let report = analyze(
        r#"
        void f() {
            struct foo one, two;
            two.x = 1;
            two.y = 2;
            one = two;
        }
    "#,
    );

    assert_eq!(report.value_of("one.x"), Some(ValueRange::exact(1)));
    assert_eq!(report.value_of("one.y"), Some(ValueRange::exact(2)));
    assert!(report.is_modified("one.x"));
    // Arrays are never expanded
    assert!(!report.is_modified("one.buf"));
}

#[test]
fn test_initializer_copy() {
    let report = analyze(
        r#"
        void f() {
            struct foo a;
            a.x = 4;
            struct foo b = a;
        }
    "#,
    );

    assert_eq!(report.value_of("b.x"), Some(ValueRange::exact(4)));
    assert_eq!(report.value_of("b.y"), Some(unknown_int()));
}

#[test]
fn test_copy_replaces_stale_members() {
    let report = analyze(
        r#"
        void f(struct foo src) {
            struct foo dst;
            dst.x = 9;
            dst.y = 9;
            dst = src;
        }
    "#,
    );

    assert_eq!(report.value_of("dst.x"), Some(unknown_int()));
    assert_eq!(report.value_of("dst.y"), Some(unknown_int()));
}

#[test]
fn test_pointer_copy() {
    let report = analyze(
        r#"
        void f(struct foo *p1, struct foo *p2) {
            p2->x = 5;
            p1 = p2;
        }
    "#,
    );

    assert_eq!(report.value_of("p1->x"), Some(ValueRange::exact(5)));
    assert_eq!(report.value_of("p1->y"), Some(unknown_int()));
}

#[test]
fn test_copy_through_dereference() {
    let report = analyze(
        r#"
        void f(struct foo *p) {
            struct foo local;
            p->y = 3;
            local = *p;
        }
    "#,
    );

    assert_eq!(report.value_of("local.y"), Some(ValueRange::exact(3)));
}

#[test]
fn test_memcpy_matches_direct_copy() {
    let report = analyze(
        r#"
        void *memcpy(void *dst, void *src, long n);
        void f() {
            struct foo a, b;
            b.x = 3;
            b.y = 4;
            memcpy(&a, &b, sizeof(a));
        }
    "#,
    );

    assert_eq!(report.value_of("a.x"), Some(ValueRange::exact(3)));
    assert_eq!(report.value_of("a.y"), Some(ValueRange::exact(4)));
}

#[test]
fn test_memmove_into_pointer() {
    let report = analyze(
        r#"
        void f(struct foo *dst) {
            struct foo b;
            b.x = 8;
            memmove(dst, &b, sizeof(b));
        }
    "#,
    );

    assert_eq!(report.value_of("dst->x"), Some(ValueRange::exact(8)));
}

#[test]
fn test_memcpy_type_mismatch_is_unknown() {
    let report = analyze(
        r#"
        void f() {
            struct foo a;
            struct bar b;
            a.x = 1;
            b.x = 2;
            memcpy(&a, &b, sizeof(b));
        }
    "#,
    );

    assert_eq!(report.value_of("a.x"), Some(unknown_int()));
    assert_eq!(report.value_of("a.y"), Some(unknown_int()));
}

#[test]
fn test_memset_fills_every_member() {
    let report = analyze(
        r#"
        void f(struct foo *p) {
            struct foo a;
            memset(&a, 0, sizeof(a));
            memset(p, 7, sizeof(*p));
        }
    "#,
    );

    assert_eq!(report.value_of("a.x"), Some(ValueRange::exact(0)));
    assert_eq!(report.value_of("a.y"), Some(ValueRange::exact(0)));
    assert_eq!(report.value_of("p->y"), Some(ValueRange::exact(7)));
    assert!(!report.is_modified("a.buf"));
}

#[test]
fn test_one_level_only() {
    let report = analyze(
        r#"
        struct inner { int v; };
        struct outer { int a; struct inner in; };
        void f() {
            struct outer x, y;
            y.a = 1;
            y.in.v = 2;
            x.in.v = 9;
            x = y;
        }
    "#,
    );

    assert_eq!(report.value_of("x.a"), Some(ValueRange::exact(1)));
    assert!(report.is_modified("x.in"));
    // The nested member is forgotten, not copied
    assert_eq!(report.value_of("x.in.v"), None);
}

#[test]
fn test_clears_argument_directive() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(dir.path().join("demo.clears_argument"), "wipe 1\n").expect("write directives");
    let config = ProjectConfig::new(Some("demo".to_string()), dir.path());

    let report = analyze_with(
        r#"
        void wipe(struct foo *keep, struct foo *lost);
        void f() {
            struct foo a, b;
            a.x = 1;
            b.x = 7;
            wipe(&b, &a);
        }
    "#,
        &config,
    );

    assert_eq!(report.value_of("a.x"), Some(unknown_int()));
    assert_eq!(report.value_of("a.y"), Some(unknown_int()));
    // A hooked call does not clobber its other arguments
    assert_eq!(report.value_of("b.x"), Some(ValueRange::exact(7)));
}

#[test]
fn test_clears_argument_missing_argument() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(dir.path().join("demo.clears_argument"), "wipe 3").expect("write directives");
    let config = ProjectConfig::new(Some("demo".to_string()), dir.path());

    let report = analyze_with(
        r#"
        void f() {
            struct foo a;
            a.x = 1;
            wipe(&a);
        }
    "#,
        &config,
    );

    assert_eq!(report.value_of("a.x"), Some(ValueRange::exact(1)));
}

#[test]
fn test_unknown_callee_clobbers_tracked_members() {
    let report = analyze(
        r#"
        void touch(struct foo *f);
        void f() {
            struct foo a;
            struct foo c;
            a.x = 1;
            touch(&a);
            touch(&c);
        }
    "#,
    );

    assert_eq!(report.value_of("a.x"), Some(unknown_int()));
    assert_eq!(report.value_of("a.y"), Some(unknown_int()));
    // Nothing was known about c's members, so nothing is expanded
    assert!(!report.is_modified("c.x"));
}

#[test]
fn test_self_copy_keeps_members() {
    let report = analyze(
        r#"
        void f(struct foo *p) {
            struct foo one;
            one.x = 3;
            one.y = 5;
            one = one;
            p->y = 4;
            *p = *p;
        }
    "#,
    );

    assert_eq!(report.value_of("one.x"), Some(ValueRange::exact(3)));
    assert_eq!(report.value_of("one.y"), Some(ValueRange::exact(5)));
    assert_eq!(report.value_of("p->y"), Some(ValueRange::exact(4)));
}

#[test]
fn test_anonymous_struct_members_are_copied() {
    let report = analyze(
        r#"
        struct tagged { int kind; struct { int lo; int hi; }; };
        void f() {
            struct tagged a, b;
            b.kind = 1;
            b.lo = 2;
            a.hi = 9;
            a = b;
        }
    "#,
    );

    assert_eq!(report.value_of("a.kind"), Some(ValueRange::exact(1)));
    assert_eq!(report.value_of("a.lo"), Some(ValueRange::exact(2)));
    assert_eq!(report.value_of("a.hi"), Some(unknown_int()));
}
