//! Miscellaneous checks: division by zero, unsigned comparisons that can
//! never be true, redundant assignments.

use crate::{
    analyzer::Analysis,
    astutils::expr_text,
    diagnostics::{DiagnosticLocation, ErrorLogger, ErrorMessage, Severity},
    settings::Settings,
    token::TokenId,
    tokenlist::TokenList,
    values::{AbstractValue, Bound, ValueKind},
    valuetype::Sign,
};

use super::{CheckFailure, Checker};

pub struct CheckOther;

impl Checker for CheckOther {
    fn name(&self) -> &'static str {
        "Other"
    }

    fn class_info(&self) -> &'static str {
        "Division by zero, unsigned comparisons against zero, redundant assignments"
    }

    fn run_checks(
        &self,
        analysis: &Analysis,
        settings: &Settings,
        logger: &mut dyn ErrorLogger,
    ) -> Result<(), CheckFailure> {
        zero_division(analysis, logger);
        unsigned_less_than_zero(analysis, settings, logger);
        redundant_assignment(analysis, settings, logger);
        Ok(())
    }

    fn error_messages(&self, logger: &mut dyn ErrorLogger) {
        logger.report(zerodiv_message("x", &[], DiagnosticLocation::new("", 0, 0)));
        logger.report(unsigned_message("x", DiagnosticLocation::new("", 0, 0)));
        logger.report(redundant_message("x", DiagnosticLocation::new("", 0, 0)));
    }
}

fn zerodiv_message(expr: &str, error_path: &[DiagnosticLocation], primary: DiagnosticLocation) -> ErrorMessage {
    let mut stack = error_path.to_vec();
    stack.push(primary);
    ErrorMessage::new("zerodiv", Severity::Error, format!("Division by zero in '{expr}'."))
        .with_verbose(format!(
            "Division by zero in '{expr}'. The divisor can be zero when control reaches this division."
        ))
        .with_callstack(stack)
        .with_cwe(369)
}

fn unsigned_message(expr: &str, primary: DiagnosticLocation) -> ErrorMessage {
    ErrorMessage::new(
        "unsignedLessThanZero",
        Severity::Style,
        format!("Checking if unsigned expression '{expr}' is less than zero."),
    )
    .with_location(primary)
    .with_cwe(570)
}

fn redundant_message(var: &str, primary: DiagnosticLocation) -> ErrorMessage {
    ErrorMessage::new(
        "redundantAssignment",
        Severity::Style,
        format!("Variable '{var}' is reassigned a value before the old one has been used."),
    )
    .with_location(primary)
    .with_cwe(563)
}

/// The divisor of `/` or `%` carries a zero value that is not ruled out.
fn zero_division(analysis: &Analysis, logger: &mut dyn ErrorLogger) {
    let list = &analysis.tokens;
    for id in list.tokens() {
        if !matches!(list.str(id), "/" | "%") || list.token(id).ast_operand2.is_none() {
            continue;
        }
        let divisor = list.token(id).ast_operand2.unwrap_or(id);
        let divisor_tok = list.token(divisor);
        if divisor_tok.value_type.is_some_and(|vt| vt.is_floating()) {
            continue;
        }
        // An Impossible zero proves the divisor non-zero on this path.
        let ruled_out = divisor_tok
            .values
            .iter()
            .any(|v| v.is_impossible() && v.is_int_zero());
        if ruled_out {
            continue;
        }
        let Some(zero) = divisor_tok.values.iter().find(|v| {
            matches!(v.kind, ValueKind::Known | ValueKind::Possible)
                && v.bound == Bound::Point
                && v.is_int_zero()
        }) else {
            continue;
        };
        let expr = expr_text(list, id);
        let path = render_error_path(list, zero);
        logger.report(zerodiv_message(&expr, &path, list.location(id)));
    }
}

/// Breadcrumbs of a value, rendered as call-stack locations.
pub(super) fn render_error_path(list: &TokenList, value: &AbstractValue) -> Vec<DiagnosticLocation> {
    value
        .error_path
        .iter()
        .map(|(tok, note)| {
            let mut loc = list.location(*tok);
            loc.info.clone_from(note);
            loc
        })
        .collect()
}

/// `u < 0` with unsigned `u` can never be true.
fn unsigned_less_than_zero(analysis: &Analysis, settings: &Settings, logger: &mut dyn ErrorLogger) {
    let list = &analysis.tokens;
    for id in list.tokens() {
        if !list.is(id, "<") {
            continue;
        }
        let (Some(lhs), Some(rhs)) = (list.token(id).ast_operand1, list.token(id).ast_operand2) else {
            continue;
        };
        let lhs_unsigned = list
            .token(lhs)
            .value_type
            .is_some_and(|vt| vt.is_integral() && vt.effective_sign(&settings.platform) == Sign::Unsigned);
        let rhs_zero = list
            .int_literal_value(rhs)
            .is_some_and(|n| n == num_bigint::BigInt::from(0));
        if lhs_unsigned && rhs_zero {
            logger.report(unsigned_message(&expr_text(list, lhs), list.location(id)));
        }
    }
}

/// Two assignments to the same expression with no intervening read.
fn redundant_assignment(analysis: &Analysis, _settings: &Settings, logger: &mut dyn ErrorLogger) {
    let list = &analysis.tokens;
    for id in list.tokens() {
        if !list.is(id, "=") || list.token(id).ast_parent.is_some() {
            continue;
        }
        let Some(lhs) = list.token(id).ast_operand1 else { continue };
        let Some(expr) = list.token(lhs).expr_id else { continue };
        if list.token(lhs).ast_operand1.is_some() {
            continue;
        }
        // The very next statement must reassign the same expression; any
        // other token mentioning it, any call, or any brace in between
        // keeps the first assignment meaningful.
        let Some(rhs) = list.token(id).ast_operand2 else { continue };
        if has_side_effects(list, rhs) {
            continue;
        }
        let Some(mut cur) = crate::astutils::after_statement(list, id) else {
            continue;
        };
        loop {
            let tok = list.token(cur);
            if matches!(list.str(cur), "{" | "}" | "(") || tok.keyword().is_some() {
                break;
            }
            if list.is(cur, "=") && tok.ast_parent.is_none() {
                let same = tok.ast_operand1.and_then(|l| list.token(l).expr_id) == Some(expr);
                let second_rhs_reads = tok
                    .ast_operand2
                    .is_some_and(|r| expr_mentions(list, r, expr));
                if same && !second_rhs_reads {
                    logger.report(redundant_message(&expr_text(list, lhs), list.location(id)));
                }
                break;
            }
            if tok.expr_id == Some(expr) && !is_lhs_of_assignment(list, cur) {
                break;
            }
            match list.next(cur) {
                Some(next) => cur = next,
                None => break,
            }
        }
    }
}

fn has_side_effects(list: &TokenList, root: TokenId) -> bool {
    let mut stack = vec![root];
    while let Some(id) = stack.pop() {
        if matches!(list.str(id), "(" | "++" | "--") && list.token(id).ast_operand1.is_some() {
            return true;
        }
        if let Some(o) = list.token(id).ast_operand1 {
            stack.push(o);
        }
        if let Some(o) = list.token(id).ast_operand2 {
            stack.push(o);
        }
    }
    false
}

fn expr_mentions(list: &TokenList, root: TokenId, expr: crate::symbols::ExprId) -> bool {
    let mut stack = vec![root];
    while let Some(id) = stack.pop() {
        if list.token(id).expr_id == Some(expr) {
            return true;
        }
        if let Some(o) = list.token(id).ast_operand1 {
            stack.push(o);
        }
        if let Some(o) = list.token(id).ast_operand2 {
            stack.push(o);
        }
    }
    false
}

fn is_lhs_of_assignment(list: &TokenList, id: TokenId) -> bool {
    list.token(id)
        .ast_parent
        .is_some_and(|p| list.is_assignment_op(p) && list.token(p).ast_operand1 == Some(id))
}
