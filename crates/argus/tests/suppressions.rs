//! Suppression handling end to end.

use argus::{Analyzer, Settings, Suppression, Suppressions, assemble_results};

#[test]
fn id_suppression_drops_the_finding() {
    let mut settings = Settings::default();
    settings.suppressions.add(Suppression::new("zerodiv", None, None).unwrap());
    let analyzer = Analyzer::new(settings);
    let r = analyzer.analyze_source("a.c", "void f() { int x = 1 / 0; }");
    assert!(r.diagnostics.iter().all(|m| m.id != "zerodiv"));
    assert!(!r.used_suppressions.is_empty());
}

#[test]
fn file_and_line_suppression() {
    let mut settings = Settings::default();
    settings.suppressions.add(Suppression::new("zerodiv", Some("a.c"), Some(1)).unwrap());
    let analyzer = Analyzer::new(settings);
    // Wrong file: the finding survives.
    let r = analyzer.analyze_source("b.c", "void f() { int x = 1 / 0; }");
    assert!(r.diagnostics.iter().any(|m| m.id == "zerodiv"));
    // Right file and line: suppressed.
    let r = analyzer.analyze_source("a.c", "void f() { int x = 1 / 0; }");
    assert!(r.diagnostics.iter().all(|m| m.id != "zerodiv"));
}

#[test]
fn inline_suppression_attaches_to_next_statement() {
    let code = "void f() {\n  // argus-suppress zerodiv\n  int x = 1 / 0;\n}\n";
    let analyzer = Analyzer::new(Settings::default());
    let r = analyzer.analyze_source("a.c", code);
    assert!(r.diagnostics.iter().all(|m| m.id != "zerodiv"), "got {:?}", r.diagnostics);
}

#[test]
fn inline_range_suppression() {
    let code = "void f() {\n  // argus-suppress-begin zerodiv\n  int x = 1 / 0;\n  int y = 2 / 0;\n  // argus-suppress-end zerodiv\n  int z = 3 / 0;\n}\n";
    let analyzer = Analyzer::new(Settings::default());
    let r = analyzer.analyze_source("a.c", code);
    let zerodivs: Vec<u32> = r
        .diagnostics
        .iter()
        .filter(|m| m.id == "zerodiv")
        .filter_map(|m| m.primary_location().map(|l| l.line))
        .collect();
    assert_eq!(zerodivs, [6], "got {:?}", r.diagnostics);
}

#[test]
fn wildcard_suppression_by_file() {
    let text = "zerodiv:src/*.c\n";
    let sups = Suppressions::parse_text(text).unwrap();
    let mut settings = Settings::default();
    for entry in sups.entries() {
        settings.suppressions.add(entry.clone());
    }
    let analyzer = Analyzer::new(settings);
    let r = analyzer.analyze_source("src/a.c", "void f() { int x = 1 / 0; }");
    assert!(r.diagnostics.iter().all(|m| m.id != "zerodiv"));
    let r = analyzer.analyze_source("lib/a.c", "void f() { int x = 1 / 0; }");
    assert!(r.diagnostics.iter().any(|m| m.id == "zerodiv"));
}

#[test]
fn unused_suppressions_are_reported_when_information_enabled() {
    let mut settings = Settings::default();
    settings.enabled.enable("information");
    settings.suppressions.add(Suppression::new("nullPointer", None, None).unwrap());
    let analyzer = Analyzer::new(settings);
    let result = analyzer.analyze_source("a.c", "int f(int x) { return x; }");
    let all = assemble_results(vec![("a.c".to_owned(), result)], analyzer.settings());
    assert!(all.iter().any(|m| m.id == "unusedSuppression"), "got {all:?}");
}

#[test]
fn used_suppressions_are_not_reported_unused() {
    let mut settings = Settings::default();
    settings.enabled.enable("information");
    settings.suppressions.add(Suppression::new("zerodiv", None, None).unwrap());
    let analyzer = Analyzer::new(settings);
    let result = analyzer.analyze_source("a.c", "void f() { int x = 1 / 0; }");
    let all = assemble_results(vec![("a.c".to_owned(), result)], analyzer.settings());
    assert!(all.iter().all(|m| m.id != "unusedSuppression"), "got {all:?}");
}
