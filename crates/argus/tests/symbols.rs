//! Symbol database construction seen through the public API.

use argus::{Analysis, Analyzer, ScopeKind, Settings, Storage, Virtuality};

fn analyze(code: &str) -> Analysis {
    Analyzer::new(Settings::default())
        .analyze_source("t.cpp", code)
        .analysis
        .expect("analysis")
}

#[test]
fn scope_tree_shape() {
    let a = analyze("void f() { if (1) { } while (0) { } }");
    let kinds: Vec<ScopeKind> = a.symbols.scopes.iter().map(|s| s.kind).collect();
    assert_eq!(kinds[0], ScopeKind::Global);
    assert!(kinds.contains(&ScopeKind::Function));
    assert!(kinds.contains(&ScopeKind::If));
    assert!(kinds.contains(&ScopeKind::While));
    // Nesting forms a tree rooted at the global scope.
    for (i, scope) in a.symbols.scopes.iter().enumerate() {
        if i == 0 {
            assert!(scope.parent.is_none());
        } else {
            assert!(scope.parent.is_some());
        }
    }
}

#[test]
fn every_token_has_an_innermost_scope() {
    let a = analyze("int g; void f() { int x = g; { int y = x; } }");
    for t in a.tokens.tokens() {
        assert!(a.tokens.token(t).scope.is_some(), "token '{}' has no scope", a.tokens.str(t));
    }
}

#[test]
fn variables_and_arguments() {
    let a = analyze("static int counter; void f(int a, char* s) { const int local = 3; }");
    let names: Vec<&str> = a
        .symbols
        .variables
        .iter()
        .map(|v| a.tokens.interned_str(v.name))
        .collect();
    assert!(names.contains(&"counter"));
    assert!(names.contains(&"a"));
    assert!(names.contains(&"s"));
    assert!(names.contains(&"local"));

    let counter = a
        .symbols
        .variables
        .iter()
        .find(|v| a.tokens.interned_str(v.name) == "counter")
        .unwrap();
    assert_eq!(counter.storage, Storage::Static);

    let s = a
        .symbols
        .variables
        .iter()
        .find(|v| a.tokens.interned_str(v.name) == "s")
        .unwrap();
    assert_eq!(s.arg_nr, Some(2));
    assert!(s.is_pointer());

    let local = a
        .symbols
        .variables
        .iter()
        .find(|v| a.tokens.interned_str(v.name) == "local")
        .unwrap();
    assert!(local.is_const);
}

#[test]
fn overloads_are_distinct_functions() {
    let a = analyze("void f(int x) { } void f(char c) { } void g() { }");
    let fs: Vec<_> = a
        .symbols
        .functions
        .iter()
        .filter(|f| a.tokens.interned_str(f.name) == "f")
        .collect();
    assert_eq!(fs.len(), 2);
}

#[test]
fn virtuality_flags() {
    let code = "
class Base {
    virtual int size() { return 0; }
};
class Derived : public Base {
    int size() override { return 1; }
};
class Other : public Base {
    int size() { return 2; }
};
";
    let a = analyze(code);
    let virtuality = |name: &str, expected: Virtuality| {
        let found = a
            .symbols
            .functions
            .iter()
            .filter(|f| a.tokens.interned_str(f.name) == "size")
            .map(|f| f.virtuality)
            .collect::<Vec<_>>();
        assert!(found.contains(&expected), "{name}: {found:?}");
    };
    virtuality("base", Virtuality::Virtual);
    virtuality("derived", Virtuality::Override);
    virtuality("other", Virtuality::ImplicitVirtual);
}

#[test]
fn enumerator_constants_are_collected() {
    let a = analyze("enum Flags { A, B = 4, C };");
    let value_of = |name: &str| {
        let id = a
            .tokens
            .tokens()
            .find(|&t| a.tokens.is(t, name))
            .map(|t| a.tokens.token(t).spelling_id())
            .unwrap();
        a.symbols.enumerators.get(&id).cloned().unwrap()
    };
    assert_eq!(value_of("A"), 0.into());
    assert_eq!(value_of("B"), 4.into());
    assert_eq!(value_of("C"), 5.into());
}

#[test]
fn varid_identifies_every_use() {
    let a = analyze("int f(int x) { int y = x; return x + y; }");
    let xs: Vec<_> = a
        .tokens
        .tokens()
        .filter(|&t| a.tokens.is(t, "x"))
        .map(|t| a.tokens.token(t).var_id)
        .collect();
    assert_eq!(xs.len(), 3);
    assert!(xs[0].is_some());
    assert!(xs.iter().all(|v| *v == xs[0]));
    let ys: Vec<_> = a
        .tokens
        .tokens()
        .filter(|&t| a.tokens.is(t, "y"))
        .map(|t| a.tokens.token(t).var_id)
        .collect();
    assert!(ys.iter().all(|v| v.is_some() && *v != xs[0]));
}

#[test]
fn call_sites_resolve_to_exactly_one_function_or_none() {
    let a = analyze("int h(int v) { return v; } void f() { h(1); unknown(2); }");
    let call_tokens: Vec<_> = a
        .tokens
        .tokens()
        .filter(|&t| a.tokens.is(t, "h") || a.tokens.is(t, "unknown"))
        .collect();
    let h_call = call_tokens.iter().find(|&&t| a.tokens.is(t, "h")).unwrap();
    assert!(a.tokens.token(*h_call).function.is_some());
    let unknown_call = call_tokens.iter().find(|&&t| a.tokens.is(t, "unknown")).unwrap();
    assert!(a.tokens.token(*unknown_call).function.is_none());
}
