//! Output rendering through user templates.

use argus::{Analyzer, Colors, Settings, DEFAULT_TEMPLATE};
use pretty_assertions::assert_eq;

#[test]
fn default_template_output() {
    let analyzer = Analyzer::new(Settings::default());
    let r = analyzer.analyze_source("src/a.c", "void f() {\n  int x = 1 / 0;\n}\n");
    let rendered: Vec<String> = r
        .diagnostics
        .iter()
        .map(|m| m.render(DEFAULT_TEMPLATE, &Colors::default()))
        .collect();
    assert_eq!(rendered.len(), 1);
    assert_eq!(
        rendered[0],
        "src/a.c:2:13: error: Division by zero in '1/0'. [zerodiv]"
    );
}

#[test]
fn custom_template_with_callstack() {
    let analyzer = Analyzer::new(Settings::default());
    let r = analyzer.analyze_source("a.c", "void f() { int x = 1 / 0; }");
    let msg = &r.diagnostics[0];
    let rendered = msg.render("{id}|{severity}|{file}|{callstack}", &Colors::default());
    assert!(rendered.starts_with("zerodiv|error|a.c|"));
    assert!(rendered.contains("[a.c:1]"));
}

#[test]
fn severity_spellings() {
    use argus::Severity;
    assert_eq!(Severity::Error.to_string(), "error");
    assert_eq!(Severity::Warning.to_string(), "warning");
    assert_eq!(Severity::Style.to_string(), "style");
    assert_eq!(Severity::Performance.to_string(), "performance");
    assert_eq!(Severity::Portability.to_string(), "portability");
    assert_eq!(Severity::Information.to_string(), "information");
}

#[test]
fn colors_wrap_only_the_severity() {
    let analyzer = Analyzer::new(Settings::default());
    let r = analyzer.analyze_source("a.c", "void f() { int x = 1 / 0; }");
    let plain = r.diagnostics[0].render("{severity}: {message}", &Colors::new(false));
    let colored = r.diagnostics[0].render("{severity}: {message}", &Colors::new(true));
    assert!(!plain.contains('\x1b'));
    assert!(colored.contains("\x1b[31;1merror\x1b[0m"));
    assert!(colored.ends_with(&plain[plain.find(':').unwrap()..]));
}

#[test]
fn json_serialization_carries_the_same_fields() {
    let analyzer = Analyzer::new(Settings::default());
    let r = analyzer.analyze_source("a.c", "void f() { int x = 1 / 0; }");
    let json = r.diagnostics[0].to_json();
    assert!(json.contains("\"id\":\"zerodiv\""), "got {json}");
    assert!(json.contains("\"severity\":\"error\""), "got {json}");
    assert!(json.contains("\"line\":1"), "got {json}");
}

#[test]
fn ids_are_wellformed_identifiers() {
    let analyzer = Analyzer::new(Settings::default());
    let r = analyzer.analyze_source(
        "a.c",
        "void f(unsigned u, bool b) { int x = 1 / 0; if (u < 0) { } if (b < 2) { } }",
    );
    for m in &r.diagnostics {
        let mut chars = m.id.chars();
        assert!(chars.next().unwrap().is_ascii_alphabetic(), "bad id {}", m.id);
        assert!(chars.all(|c| c.is_ascii_alphanumeric() || c == '_'), "bad id {}", m.id);
    }
}
