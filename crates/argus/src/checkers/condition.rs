//! Condition checks: comparisons whose outcome is already decided, and
//! assignment/condition mismatches.

use std::sync::LazyLock;

use num_bigint::BigInt;
use num_traits::Zero;

use crate::{
    analyzer::Analysis,
    astutils::expr_text,
    diagnostics::{DiagnosticLocation, ErrorLogger, ErrorMessage, Severity},
    pattern::Pattern,
    settings::Settings,
    token::TokenId,
    tokenlist::TokenList,
};

use super::{CheckFailure, Checker, other::render_error_path};

pub struct CheckCondition;

impl Checker for CheckCondition {
    fn name(&self) -> &'static str {
        "Condition"
    }

    fn class_info(&self) -> &'static str {
        "Match conditions against assignments and other conditions"
    }

    fn run_checks(
        &self,
        analysis: &Analysis,
        settings: &Settings,
        logger: &mut dyn ErrorLogger,
    ) -> Result<(), CheckFailure> {
        known_condition_true_false(analysis, logger);
        assign_if(analysis, settings, logger);
        multi_condition(analysis, logger);
        Ok(())
    }

    fn error_messages(&self, logger: &mut dyn ErrorLogger) {
        logger.report(known_condition_message("x==2", false, &[], DiagnosticLocation::new("", 0, 0)));
        logger.report(assign_if_message("y==2", false, DiagnosticLocation::new("", 0, 0)));
        logger.report(multi_condition_message(0, DiagnosticLocation::new("", 0, 0)));
    }
}

fn known_condition_message(
    expr: &str,
    result: bool,
    error_path: &[DiagnosticLocation],
    primary: DiagnosticLocation,
) -> ErrorMessage {
    let mut stack = error_path.to_vec();
    stack.push(primary);
    let which = if result { "true" } else { "false" };
    ErrorMessage::new(
        "knownConditionTrueFalse",
        Severity::Style,
        format!("Condition '{expr}' is always {which}"),
    )
    .with_callstack(stack)
    .with_cwe(if result { 571 } else { 570 })
}

fn assign_if_message(condition: &str, result: bool, primary: DiagnosticLocation) -> ErrorMessage {
    let which = if result { "true" } else { "false" };
    ErrorMessage::new(
        "assignIfError",
        Severity::Style,
        format!("Mismatching assignment and comparison, comparison '{condition}' is always {which}."),
    )
    .with_location(primary)
    .with_cwe(398)
}

fn multi_condition_message(line: u32, primary: DiagnosticLocation) -> ErrorMessage {
    ErrorMessage::new(
        "multiCondition",
        Severity::Style,
        format!("Expression is always false because 'else if' condition matches previous condition at line {line}."),
    )
    .with_location(primary)
    .with_cwe(398)
}

/// Comparisons and negations whose value is Known before they run.
fn known_condition_true_false(analysis: &Analysis, logger: &mut dyn ErrorLogger) {
    let list = &analysis.tokens;
    for id in list.tokens() {
        let is_candidate = list.is_comparison_op(id) || (list.is(id, "!") && list.token(id).ast_operand1.is_some());
        if !is_candidate {
            continue;
        }
        let Some(known) = list
            .token(id)
            .values
            .iter()
            .find(|v| v.is_known() && v.as_int().is_some())
        else {
            continue;
        };
        // A comparison of two literals is deliberate compile-time
        // arithmetic, not a defect.
        let operands_literal = [list.token(id).ast_operand1, list.token(id).ast_operand2]
            .into_iter()
            .flatten()
            .all(|o| list.token(o).is_literal());
        if operands_literal {
            continue;
        }
        if list.token(id).from_macro {
            continue;
        }
        let result = known.as_int().is_some_and(|n| !n.is_zero());
        let expr = expr_text(list, id);
        let path = render_error_path(list, known);
        logger.report(known_condition_message(&expr, result, &path, list.location(id)));
    }
}

/// `x = y & 0xf0;` followed by `if (x == 2)` — the comparison can never be
/// true when the mask rules the value out.
fn assign_if(analysis: &Analysis, _settings: &Settings, logger: &mut dyn ErrorLogger) {
    let list = &analysis.tokens;
    for id in list.tokens() {
        if !list.is(id, "=") || list.token(id).ast_parent.is_some() {
            continue;
        }
        let Some(lhs) = list.token(id).ast_operand1 else { continue };
        let Some(vid) = list.token(lhs).var_id else { continue };
        let Some(rhs) = list.token(id).ast_operand2 else { continue };
        if !list.is(rhs, "&") {
            continue;
        }
        let Some(mask) = known_operand(list, rhs) else { continue };
        if mask < BigInt::from(0) {
            continue;
        }
        // Scan forward for comparisons of the variable against constants.
        let Some(mut cur) = crate::astutils::after_statement(list, id) else {
            continue;
        };
        let base_scope = list.token(id).scope;
        loop {
            let tok = list.token(cur);
            if list.is(cur, "}") && tok.scope == base_scope {
                break;
            }
            if tok.var_id == Some(vid)
                && let Some(parent) = tok.ast_parent
            {
                if list.is_assignment_op(parent) && list.token(parent).ast_operand1 == Some(cur) {
                    break;
                }
                if matches!(list.str(parent), "==" | "!=") {
                    let other = if list.token(parent).ast_operand1 == Some(cur) {
                        list.token(parent).ast_operand2
                    } else {
                        list.token(parent).ast_operand1
                    };
                    if let Some(n) = other.and_then(|o| list.int_literal_value(o))
                        && n >= BigInt::from(0)
                        && (&mask & &n) != n
                    {
                        // `(x & mask) == n` needs bits the mask cleared.
                        let result = list.is(parent, "!=");
                        let condition = expr_text(list, parent);
                        logger.report(assign_if_message(&condition, result, list.location(parent)));
                    }
                }
            }
            match list.next(cur) {
                Some(next) => cur = next,
                None => break,
            }
        }
    }
}

fn known_operand(list: &TokenList, op: TokenId) -> Option<BigInt> {
    for operand in [list.token(op).ast_operand1, list.token(op).ast_operand2].into_iter().flatten() {
        if let Some(n) = list.int_literal_value(operand) {
            return Some(n);
        }
    }
    None
}

/// `if (x & 4) {} else if (x & 6)`: the second condition is entirely
/// covered by the first.
fn multi_condition(analysis: &Analysis, logger: &mut dyn ErrorLogger) {
    let list = &analysis.tokens;
    let db = &analysis.symbols;
    for scope in &db.scopes {
        if scope.kind != crate::symbols::ScopeKind::If {
            continue;
        }
        let Some(if_tok) = scope.class_def else { continue };
        let Some((vid, first_mask, first_line)) = bitmask_condition(list, if_tok) else {
            continue;
        };
        // Walk the else-if chain.
        let mut close = scope.body_end;
        while let Some(c) = close {
            let Some(els) = list.next(c) else { break };
            if list.token(els).keyword() != Some(crate::keywords::Keyword::Else) {
                break;
            }
            let Some(next_if) = list.next(els) else { break };
            if list.token(next_if).keyword() != Some(crate::keywords::Keyword::If) {
                break;
            }
            if let Some((vid2, mask2, _)) = bitmask_condition(list, next_if)
                && vid2 == vid
                && (&first_mask & &mask2) == mask2
            {
                logger.report(multi_condition_message(first_line, list.location(next_if)));
            }
            // Advance to the next `else if`.
            close = list
                .next(next_if)
                .filter(|p| list.is(*p, "("))
                .and_then(|p| list.token(p).link)
                .and_then(|p| list.next(p))
                .filter(|b| list.is(*b, "{"))
                .and_then(|b| list.token(b).link);
        }
    }
}

/// `if ( var & mask )` shape.
fn bitmask_condition(list: &TokenList, if_tok: TokenId) -> Option<(crate::symbols::VarId, BigInt, u32)> {
    static SHAPE: LazyLock<Pattern> = LazyLock::new(|| Pattern::compile("if ( %var% & %num% )"));
    if !SHAPE.matches(list, if_tok) {
        return None;
    }
    let var_tok = list.at(if_tok, 2)?;
    let num = list.at(if_tok, 4)?;
    let vid = list.token(var_tok).var_id?;
    let mask = list.int_literal_value(num)?;
    if mask < BigInt::from(0) {
        return None;
    }
    Some((vid, mask, list.token(if_tok).line))
}
