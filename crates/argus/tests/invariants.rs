//! Universal invariants over produced analyses.

use argus::{Analyzer, Checker as _, CollectingLogger, Settings, ValueData, ValueKind, all_checkers};

const SAMPLE: &str = "
enum Mode { OFF, ON = 3 };

int helper(int v) {
    if (v > 10) {
        return v - 1;
    }
    return v + 1;
}

void main_flow(int x, unsigned u) {
    int a[4];
    int total = 0;
    for (int i = 0; i < 4; i++) {
        a[i] = helper(i);
        total = total + a[i];
    }
    if (x == 0) {
    } else {
        total = total / x;
    }
    char* s = \"text\";
    if (u < 0) {
    }
}
";

fn analyze(code: &str) -> argus::TuResult {
    Analyzer::new(Settings::default()).analyze_source("sample.c", code)
}

/// Property: `t.ast_parent` is unset, or the parent points back at `t`
/// through one of its operands.
#[test]
fn ast_parent_operand_mutual_linkage() {
    let result = analyze(SAMPLE);
    let a = result.analysis.expect("analysis");
    for t in a.tokens.tokens() {
        match a.tokens.token(t).ast_parent {
            None => {}
            Some(parent) => {
                let p = a.tokens.token(parent);
                assert!(
                    p.ast_operand1 == Some(t) || p.ast_operand2 == Some(t),
                    "token '{}' not an operand of its parent",
                    a.tokens.str(t)
                );
            }
        }
    }
}

/// Property: every opening bracket links forward to a partner that links
/// back.
#[test]
fn bracket_links_are_symmetric_and_forward() {
    let result = analyze(SAMPLE);
    let a = result.analysis.expect("analysis");
    for t in a.tokens.tokens() {
        if !matches!(a.tokens.str(t), "(" | "[" | "{") {
            continue;
        }
        let partner = a.tokens.token(t).link.expect("unlinked bracket");
        assert_eq!(a.tokens.token(partner).link, Some(t));
        assert!(a.tokens.order_of(partner) > a.tokens.order_of(t));
    }
}

/// Property: every token referring to a variable sits inside that
/// variable's scope or a descendant.
#[test]
fn varid_uses_stay_inside_the_declaring_scope() {
    let result = analyze(SAMPLE);
    let a = result.analysis.expect("analysis");
    for t in a.tokens.tokens() {
        let Some(vid) = a.tokens.token(t).var_id else { continue };
        let var_scope = a.symbols.variable(vid).scope;
        let tok_scope = a.tokens.token(t).scope.expect("token without scope");
        assert!(
            a.symbols.is_descendant_of(tok_scope, var_scope),
            "use of '{}' outside its scope",
            a.tokens.str(t)
        );
    }
}

/// Property: a token never carries two Known values of the same variant.
#[test]
fn at_most_one_known_per_variant() {
    let result = analyze(SAMPLE);
    let a = result.analysis.expect("analysis");
    for t in a.tokens.tokens() {
        let values = &a.tokens.token(t).values;
        let known_ints = values
            .iter()
            .filter(|v| v.kind == ValueKind::Known && matches!(v.data, ValueData::Int(_)))
            .count();
        let known_sizes = values
            .iter()
            .filter(|v| v.kind == ValueKind::Known && matches!(v.data, ValueData::ContainerSize(_)))
            .count();
        assert!(known_ints <= 1, "token '{}': {known_ints} Known ints", a.tokens.str(t));
        assert!(known_sizes <= 1);
    }
}

/// Property: diagnostics do not depend on checker registration order.
#[test]
fn checker_order_does_not_change_findings() {
    let result = analyze(SAMPLE);
    let a = result.analysis.expect("analysis");
    let settings = Settings::default();

    let mut forward = CollectingLogger::new();
    for checker in all_checkers() {
        checker.run_checks(&a, &settings, &mut forward).unwrap();
    }
    let mut reverse = CollectingLogger::new();
    for checker in all_checkers().into_iter().rev() {
        checker.run_checks(&a, &settings, &mut reverse).unwrap();
    }
    let key = |m: &argus::ErrorMessage| {
        (
            m.id.clone(),
            m.primary_location().map(|l| (l.file.clone(), l.line, l.column)),
            m.message.clone(),
        )
    };
    let mut forward: Vec<_> = forward.messages.iter().map(key).collect();
    let mut reverse: Vec<_> = reverse.messages.iter().map(key).collect();
    forward.sort();
    reverse.sort();
    assert_eq!(forward, reverse);
}

/// Property: the whole pipeline is deterministic — two runs over the same
/// input render byte-identical diagnostics.
#[test]
fn rerun_is_byte_identical() {
    let render = || {
        let result = analyze(SAMPLE);
        result
            .diagnostics
            .iter()
            .map(|m| m.render(argus::DEFAULT_TEMPLATE, &argus::Colors::default()))
            .collect::<Vec<_>>()
            .join("\n")
    };
    assert_eq!(render(), render());
}
