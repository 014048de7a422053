//! Value-flow behavior observed through the public analysis result.

use argus::{Analyzer, Settings, TokenId, TuResult, ValueData, ValueKind};
use num_bigint::BigInt;

fn analyze(code: &str) -> TuResult {
    Analyzer::new(Settings::default()).analyze_source("t.c", code)
}

/// All tokens with the given spelling, in source order.
fn find_all(result: &TuResult, spelling: &str) -> Vec<TokenId> {
    let analysis = result.analysis.as_ref().expect("analysis");
    analysis
        .tokens
        .tokens()
        .filter(|&t| analysis.tokens.is(t, spelling))
        .collect()
}

#[test]
fn assignment_forwards_known_value() {
    let result = analyze("int f() { int x = 3; return x + 1; }");
    let xs = find_all(&result, "x");
    let analysis = result.analysis.as_ref().unwrap();
    // The `x` inside `return x + 1`.
    let last_x = *xs.last().unwrap();
    let known = analysis.tokens.token(last_x).known_int().expect("known value");
    assert_eq!(known, &BigInt::from(3));
}

#[test]
fn reassignment_kills_forwarding() {
    let result = analyze("int f(int a) { int x = 3; x = a; return x; }");
    let analysis = result.analysis.as_ref().unwrap();
    let xs = find_all(&result, "x");
    let last_x = *xs.last().unwrap();
    assert!(analysis.tokens.token(last_x).known_int().is_none());
}

#[test]
fn address_taken_kills_forwarding() {
    let result = analyze("void g(int*); int f() { int x = 3; g(&x); return x; }");
    let analysis = result.analysis.as_ref().unwrap();
    let xs = find_all(&result, "x");
    let last_x = *xs.last().unwrap();
    assert!(analysis.tokens.token(last_x).known_int().is_none());
}

#[test]
fn condition_narrows_then_branch() {
    let result = analyze("int f(int x) { if (x > 5) { return x; } return 0; }");
    let analysis = result.analysis.as_ref().unwrap();
    let xs = find_all(&result, "x");
    // The `x` inside the then-branch carries a lower bound of 6.
    let narrowed = xs.iter().any(|&t| {
        analysis.tokens.token(t).values.iter().any(|v| {
            v.kind == ValueKind::Possible
                && v.bound == argus::Bound::Lower
                && v.as_int() == Some(&BigInt::from(6))
        })
    });
    assert!(narrowed);
}

#[test]
fn equality_condition_leaves_possible_value_after_merge() {
    let result = analyze("void f(int x) { if (x == 0) { } int y = x; }");
    let analysis = result.analysis.as_ref().unwrap();
    let xs = find_all(&result, "x");
    let last_x = *xs.last().unwrap();
    let possible_zero = analysis
        .tokens
        .token(last_x)
        .values
        .iter()
        .any(|v| v.kind == ValueKind::Possible && v.as_int() == Some(&BigInt::from(0)));
    assert!(possible_zero);
}

#[test]
fn then_branch_exit_makes_value_impossible_after() {
    let result = analyze("int f(int x) { if (x == 0) { return -1; } return 10 / x; }");
    // Division is safe: zero is impossible past the early return.
    assert!(result.diagnostics.iter().all(|m| m.id != "zerodiv"), "got {:?}", result.diagnostics);
}

#[test]
fn loop_induction_bounds_the_counter() {
    let result = analyze("void f() { int a[10]; for (int i = 0; i < 10; i++) { a[i] = 0; } }");
    // In-bounds: the upper bound 9 never reaches the array size 10.
    assert!(result.diagnostics.is_empty(), "got {:?}", result.diagnostics);

    let result = analyze("void f() { int a[10]; for (int i = 0; i <= 10; i++) { a[i] = 0; } }");
    let ids: Vec<&str> = result.diagnostics.iter().map(|m| m.id.as_str()).collect();
    assert!(
        ids.contains(&"arrayIndexOutOfBounds") || ids.contains(&"arrayIndexOutOfBoundsCond"),
        "got {ids:?}"
    );
}

#[test]
fn function_return_value_propagates() {
    let result = analyze("int three() { return 3; } int f() { int x = three(); return 100 / (x - 3); }");
    // x is 3, so the divisor is a known zero.
    assert!(result.diagnostics.iter().any(|m| m.id == "zerodiv"), "got {:?}", result.diagnostics);
}

#[test]
fn call_chains_are_followed_through_nested_bodies() {
    let code = "
int inner(int a) { return a + 1; }
int outer(int b) { return inner(b) + 1; }
int f() { int x = outer(1); return 100 / (x - 3); }
";
    // `outer(1)` has a value only by running `inner` inside `outer` with
    // the argument injected; the divisor is then a known zero.
    let result = analyze(code);
    assert!(result.diagnostics.iter().any(|m| m.id == "zerodiv"), "got {:?}", result.diagnostics);
}

#[test]
fn recursive_calls_are_cut_off_at_the_depth_cap() {
    let code = "int spin(int n) { return spin(n); } int f() { int x = spin(1); return x; }";
    let result = analyze(code);
    // The self-call never produces a value; analysis terminates without
    // findings instead of descending forever.
    assert!(result.diagnostics.is_empty(), "got {:?}", result.diagnostics);
    let analysis = result.analysis.as_ref().unwrap();
    let xs = find_all(&result, "x");
    assert!(analysis.tokens.token(*xs.last().unwrap()).known_int().is_none());
}

#[test]
fn lowering_the_call_depth_disables_chain_following() {
    let code = "
int inner(int a) { return a + 1; }
int outer(int b) { return inner(b) + 1; }
int f() { int x = outer(1); return 100 / (x - 3); }
";
    let mut settings = Settings::default();
    settings.max_call_depth = 0;
    let result = Analyzer::new(settings).analyze_source("t.c", code);
    // With nested evaluation disabled, the chain can only be rebuilt one
    // function per value-flow round, and the round budget ends first; no
    // known zero reaches the division.
    assert!(result.diagnostics.iter().all(|m| m.id != "zerodiv"), "got {:?}", result.diagnostics);
}

#[test]
fn uninitialized_local_carries_uninit_value() {
    let result = analyze("int f() { int x; return x; }");
    let analysis = result.analysis.as_ref().unwrap();
    let xs = find_all(&result, "x");
    let last_x = *xs.last().unwrap();
    let has_uninit = analysis
        .tokens
        .token(last_x)
        .values
        .iter()
        .any(|v| matches!(v.data, ValueData::Uninit));
    assert!(has_uninit);
}

#[test]
fn string_literal_carries_sizes() {
    let result = analyze("const char* s = \"hello\";");
    let analysis = result.analysis.as_ref().unwrap();
    let lit = analysis
        .tokens
        .tokens()
        .find(|&t| analysis.tokens.str(t).starts_with('"'))
        .unwrap();
    let values = &analysis.tokens.token(lit).values;
    assert!(values.iter().any(|v| matches!(&v.data, ValueData::BufferSize(n) if *n == BigInt::from(6))));
    assert!(values.iter().any(|v| matches!(&v.data, ValueData::ContainerSize(n) if *n == BigInt::from(5))));
}

#[test]
fn container_size_tracking() {
    let code = "
void f() {
    std::vector<int> v;
    v.push_back(1);
    v.push_back(2);
    int n = v.size();
}
";
    let result = analyze(code);
    let analysis = result.analysis.as_ref().unwrap();
    // The size() call folds to 2.
    let size_known = analysis.tokens.tokens().any(|t| {
        analysis
            .tokens
            .token(t)
            .values
            .iter()
            .any(|v| v.kind == ValueKind::Known && matches!(&v.data, ValueData::ContainerSize(n) if *n == BigInt::from(2)))
    });
    assert!(size_known);
}

#[test]
fn assume_narrows_program_memory() {
    let result = analyze("int f(int x) { return x == 3; }");
    let analysis = result.analysis.as_ref().unwrap();
    let settings = Settings::default();
    let eq = analysis.tokens.tokens().find(|&t| analysis.tokens.is(t, "==")).unwrap();
    let x = analysis.tokens.token(eq).ast_operand1.unwrap();
    let x_expr = analysis.tokens.token(x).expr_id.unwrap();

    let mut pm = argus::ProgramMemory::new();
    argus::assume(&mut pm, &analysis.tokens, eq, true);
    assert!(argus::condition_is_true(&analysis.tokens, eq, &pm, &settings));
    assert!(!argus::condition_is_false(&analysis.tokens, eq, &pm, &settings));

    let mut pm = argus::ProgramMemory::new();
    argus::assume(&mut pm, &analysis.tokens, eq, false);
    // `x != 3` is recorded as an Impossible 3, visible only on request.
    assert!(pm.get_value(x_expr, false).is_none());
    let recorded = pm.get_value(x_expr, true).unwrap();
    assert!(recorded.is_impossible());
    assert_eq!(recorded.as_i64(), Some(3));
}

#[test]
fn at_most_one_known_integer_per_token() {
    let result = analyze("int f(int c) { int x = c ? 1 : 2; if (x == 1) { } return x; }");
    let analysis = result.analysis.as_ref().unwrap();
    for t in analysis.tokens.tokens() {
        let knowns = analysis
            .tokens
            .token(t)
            .values
            .iter()
            .filter(|v| v.kind == ValueKind::Known && matches!(v.data, ValueData::Int(_)))
            .count();
        assert!(knowns <= 1, "token '{}' has {} Known ints", analysis.tokens.str(t), knowns);
    }
}
