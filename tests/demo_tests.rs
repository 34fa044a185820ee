use fieldflow::parser::parser::Parser;
use fieldflow::state::ValueRange;
use fieldflow::{Engine, FunctionReport, ProjectConfig};
use std::fs;
use std::path::Path;

fn analyze_demo() -> Vec<FunctionReport> {
    let path = Path::new("demos/struct_copy.c");
    let source = fs::read_to_string(path).expect("Failed to read demo file");

    let mut parser = Parser::new(&source).expect("Parser creation failed");
    let program = parser.parse_program().expect("Parsing failed");

    Engine::new(program, &ProjectConfig::default()).analyze()
}

fn report<'a>(reports: &'a [FunctionReport], name: &str) -> &'a FunctionReport {
    reports
        .iter()
        .find(|r| r.name == name)
        .unwrap_or_else(|| panic!("no report for {}", name))
}

#[test]
fn test_demo_struct_copies() {
    let reports = analyze_demo();

    let names: Vec<_> = reports.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["copy_header", "clone_packet", "zero_packet", "forget_packet", "pick"]
    );
    for r in &reports {
        assert!(r.errors.is_empty(), "{}: {:?}", r.name, r.errors);
    }

    // *out = h
    let header = report(&reports, "copy_header");
    assert_eq!(header.value_of("out->kind"), Some(ValueRange::exact(2)));
    assert_eq!(header.value_of("out->len"), Some(ValueRange::exact(64)));

    // dst = src
    let clone = report(&reports, "clone_packet");
    assert_eq!(clone.value_of("dst->seq"), Some(ValueRange::exact(1)));
    assert_eq!(clone.value_of("dst->checksum"), Some(ValueRange::exact(0)));
    assert!(clone.is_modified("dst->hdr"));

    // memset(&p, 0, sizeof(p))
    let zero = report(&reports, "zero_packet");
    assert_eq!(zero.value_of("p.seq"), Some(ValueRange::exact(0)));

    // reset_packet(&p) has no hook: tracked members are forgotten
    let forget = report(&reports, "forget_packet");
    assert_eq!(
        forget.value_of("p.seq").map(|v| v.to_string()),
        Some("s32min-s32max".to_string())
    );

    let pick = report(&reports, "pick");
    assert_eq!(pick.value_of("b.kind"), Some(ValueRange::new(1, 3)));
}
