//! Tokenizer output shape: normalization, AST links, expression ids.

use argus::{Analysis, Analyzer, Settings, TokenId};

fn analyze(code: &str) -> Analysis {
    Analyzer::new(Settings::default())
        .analyze_source("t.c", code)
        .analysis
        .expect("analysis")
}

fn text(a: &Analysis) -> String {
    a.tokens
        .tokens()
        .map(|t| a.tokens.str(t).to_owned())
        .collect::<Vec<_>>()
        .join(" ")
}

fn find(a: &Analysis, spelling: &str) -> TokenId {
    a.tokens.tokens().find(|&t| a.tokens.is(t, spelling)).unwrap()
}

#[test]
fn single_statement_bodies_get_braces() {
    let a = analyze("void f(int x) { if (x) x = 1; else x = 2; }");
    assert_eq!(
        text(&a),
        "void f ( int x ) { if ( x ) { x = 1 ; } else { x = 2 ; } }"
    );
}

#[test]
fn combined_declarations_are_split() {
    let a = analyze("void f() { int a = 1, b = 2; }");
    assert_eq!(text(&a), "void f ( ) { int a = 1 ; int b = 2 ; }");
}

#[test]
fn typedefs_resolve_through_chains() {
    let a = analyze("typedef unsigned long word; typedef word w2; void f() { w2 x = 0; }");
    assert_eq!(text(&a), "void f ( ) { unsigned long x = 0 ; }");
}

#[test]
fn precedence_beats_source_order() {
    let a = analyze("int f(int a, int b) { return a + b * 2; }");
    let plus = find(&a, "+");
    let star = find(&a, "*");
    assert_eq!(a.tokens.token(plus).ast_operand2, Some(star));
    assert_eq!(a.tokens.token(star).ast_parent, Some(plus));
}

#[test]
fn ternary_is_right_associative() {
    let a = analyze("int f(int c, int d) { return c ? 1 : d ? 2 : 3; }");
    let questions: Vec<TokenId> = a.tokens.tokens().filter(|&t| a.tokens.is(t, "?")).collect();
    assert_eq!(questions.len(), 2);
    // The second ternary nests inside the first's false branch.
    let first_colon = a.tokens.token(questions[0]).ast_operand2.unwrap();
    assert_eq!(a.tokens.token(first_colon).ast_operand2, Some(questions[1]));
}

#[test]
fn subscripts_and_calls_are_postfix_nodes() {
    let a = analyze("int g(int); int f(int* p) { return g(p[2]); }");
    let bracket = find(&a, "[");
    assert!(a.tokens.token(bracket).ast_operand1.is_some());
    assert!(a.tokens.token(bracket).ast_operand2.is_some());
    let call = a
        .tokens
        .tokens()
        .find(|&t| a.tokens.is(t, "(") && a.tokens.token(t).ast_operand1.is_some())
        .unwrap();
    let callee = a.tokens.token(call).ast_operand1.unwrap();
    assert!(a.tokens.is(callee, "g"));
}

#[test]
fn same_structure_same_expression_id() {
    let a = analyze("int f(int a, int b) { int x = a * b + 1; int y = a * b + 1; return x + y; }");
    let pluses: Vec<TokenId> = a
        .tokens
        .tokens()
        .filter(|&t| a.tokens.is(t, "+") && a.tokens.token(t).ast_operand2.is_some())
        .collect();
    // The two `a * b + 1` roots share an id; `x + y` differs.
    assert_eq!(a.tokens.token(pluses[0]).expr_id, a.tokens.token(pluses[1]).expr_id);
    assert_ne!(a.tokens.token(pluses[0]).expr_id, a.tokens.token(pluses[2]).expr_id);
}

#[test]
fn different_variables_different_expression_ids() {
    let a = analyze("int f(int a, int b) { int x = a + 1; int y = b + 1; return x + y; }");
    let pluses: Vec<TokenId> = a
        .tokens
        .tokens()
        .filter(|&t| a.tokens.is(t, "+") && a.tokens.token(t).ast_operand2.is_some())
        .collect();
    assert_ne!(a.tokens.token(pluses[0]).expr_id, a.tokens.token(pluses[1]).expr_id);
}

#[test]
fn comparison_results_are_bool_typed() {
    let a = analyze("int f(int a) { return a == 3; }");
    let eq = find(&a, "==");
    assert!(a.tokens.token(eq).value_type.unwrap().is_bool());
}

#[test]
fn pointer_arithmetic_keeps_pointerness() {
    let a = analyze("int* f(int* p) { return p + 1; }");
    let plus = find(&a, "+");
    assert!(a.tokens.token(plus).value_type.unwrap().is_pointer());
}

#[test]
fn template_instantiation_clones_the_definition() {
    let code = "template <typename T> T pick(T v) { return v; } int main() { return pick<int>(4); }";
    let result = Analyzer::new(Settings::default()).analyze_source("t.cpp", code);
    let a = result.analysis.expect("analysis");
    let rendered = text(&a);
    assert!(rendered.contains("int pick<int> ( int v ) { return v ; }"), "got: {rendered}");
    assert!(!rendered.contains("template"), "got: {rendered}");
}
