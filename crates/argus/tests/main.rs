use argus::{Analyzer, Settings};

/// The analyzer is reusable across translation units without state
/// leaking between them.
#[test]
fn repeat_analysis() {
    let analyzer = Analyzer::new(Settings::default());

    let r = analyzer.analyze_source("a.c", "int f(int x) { return x + 1; }");
    assert!(r.diagnostics.is_empty(), "unexpected: {:?}", r.diagnostics);

    let r = analyzer.analyze_source("b.c", "void f() { int x = 1 / 0; }");
    assert!(r.diagnostics.iter().any(|m| m.id == "zerodiv"));

    let r = analyzer.analyze_source("c.c", "int g(int y) { return y * 2; }");
    assert!(r.diagnostics.is_empty(), "unexpected: {:?}", r.diagnostics);
}

#[test]
fn clean_code_produces_no_diagnostics() {
    let code = "
int add(int a, int b) {
    return a + b;
}

int main() {
    int total = 0;
    for (int i = 0; i < 10; i++) {
        total = total + add(i, i);
    }
    return total;
}
";
    let analyzer = Analyzer::new(Settings::default());
    let r = analyzer.analyze_source("clean.c", code);
    assert!(r.diagnostics.is_empty(), "unexpected: {:?}", r.diagnostics);
}

#[test]
fn fatal_syntax_error_reports_and_aborts() {
    let analyzer = Analyzer::new(Settings::default());
    let r = analyzer.analyze_source("bad.c", "void f() { int a; ");
    assert_eq!(r.diagnostics.len(), 1);
    assert_eq!(r.diagnostics[0].id, "syntaxError");
    assert!(r.analysis.is_none());
}

#[test]
fn stop_flag_aborts_cleanly() {
    use argus::StopFlag;
    let mut settings = Settings::default();
    settings.enabled.enable("information");
    let stop = StopFlag::new();
    stop.stop();
    let analyzer = Analyzer::new(settings).with_stop_flag(stop);
    let r = analyzer.analyze_source("a.c", "void f() { int x = 1 / 0; }");
    // The TU aborts before any checker runs; only the abort note remains.
    assert!(r.diagnostics.iter().any(|m| m.id == "analysisAborted"), "got {:?}", r.diagnostics);
    assert!(r.diagnostics.iter().all(|m| m.id != "zerodiv"));
}

#[test]
fn shared_logger_collects_across_threads() {
    use argus::{ErrorLogger, SharedLogger};
    let logger = SharedLogger::new();
    let handles: Vec<_> = (0..2)
        .map(|i| {
            let mut logger = logger.clone();
            std::thread::spawn(move || {
                let analyzer = Analyzer::new(Settings::default());
                let result = analyzer.analyze_source(&format!("t{i}.c"), "void f() { int x = 1 / 0; }");
                for msg in result.diagnostics {
                    logger.report(msg);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    let messages = logger.take();
    assert_eq!(messages.iter().filter(|m| m.id == "zerodiv").count(), 2);
    assert!(logger.is_empty());
}

#[test]
fn analysis_is_exposed_for_embedding() {
    let analyzer = Analyzer::new(Settings::default());
    let r = analyzer.analyze_source("a.c", "int f(int x) { return x; }");
    let analysis = r.analysis.expect("analysis should survive");
    assert!(analysis.tokens.front().is_some());
    assert!(!analysis.symbols.functions.is_empty());
}
