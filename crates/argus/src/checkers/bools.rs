//! Boolean-misuse checks.

use crate::{
    analyzer::Analysis,
    astutils::expr_text,
    diagnostics::{Certainty, DiagnosticLocation, ErrorLogger, ErrorMessage, Severity},
    settings::Settings,
    token::TokenId,
    tokenlist::TokenList,
};

use super::{CheckFailure, Checker};

pub struct CheckBool;

impl Checker for CheckBool {
    fn name(&self) -> &'static str {
        "Bool"
    }

    fn class_info(&self) -> &'static str {
        "Boolean value misuse"
    }

    fn run_checks(
        &self,
        analysis: &Analysis,
        settings: &Settings,
        logger: &mut dyn ErrorLogger,
    ) -> Result<(), CheckFailure> {
        comparison_of_bool_with_int(analysis, logger);
        bitwise_on_boolean(analysis, settings, logger);
        comparison_of_bool_returning_functions(analysis, logger);
        Ok(())
    }

    fn error_messages(&self, logger: &mut dyn ErrorLogger) {
        logger.report(bool_with_int_message("b", DiagnosticLocation::new("", 0, 0)));
        logger.report(bitwise_message("b", "&", DiagnosticLocation::new("", 0, 0)));
        logger.report(func_compare_message(DiagnosticLocation::new("", 0, 0)));
    }
}

fn bool_with_int_message(expr: &str, primary: DiagnosticLocation) -> ErrorMessage {
    ErrorMessage::new(
        "comparisonOfBoolWithInt",
        Severity::Warning,
        format!("Comparison of a boolean expression '{expr}' with an integer."),
    )
    .with_verbose(format!(
        "Comparison of a boolean expression '{expr}' with an integer. A boolean can only hold 0 or 1, so the \
         relational comparison is misleading or always has the same result."
    ))
    .with_location(primary)
    .with_cwe(398)
}

fn bitwise_message(expr: &str, op: &str, primary: DiagnosticLocation) -> ErrorMessage {
    ErrorMessage::new(
        "bitwiseOnBoolean",
        Severity::Style,
        format!("Boolean expression '{expr}' is used in bitwise operation. Did you mean '{op}{op}'?"),
    )
    .with_location(primary)
    .with_certainty(Certainty::Inconclusive)
    .with_cwe(398)
}

fn func_compare_message(primary: DiagnosticLocation) -> ErrorMessage {
    ErrorMessage::new(
        "comparisonOfFuncReturningBoolError",
        Severity::Style,
        "Relational comparison of two functions returning bool.".to_owned(),
    )
    .with_verbose(
        "Relational comparison of two functions returning bool. The return type is restricted to 0 and 1, so \
         ordering them rarely expresses the intended logic.",
    )
    .with_location(primary)
    .with_cwe(398)
}

/// True when the expression is boolean: bool-typed, a negation, or a
/// comparison/logical operator.
fn is_bool_expression(list: &TokenList, tok: TokenId) -> bool {
    if list.token(tok).value_type.is_some_and(|vt| vt.is_bool()) {
        return true;
    }
    matches!(list.str(tok), "!" | "&&" | "||") || list.is_comparison_op(tok)
}

/// Relational comparison between a boolean expression and an integer.
fn comparison_of_bool_with_int(analysis: &Analysis, logger: &mut dyn ErrorLogger) {
    let list = &analysis.tokens;
    for id in list.tokens() {
        if !matches!(list.str(id), "<" | "<=" | ">" | ">=") {
            continue;
        }
        let (Some(lhs), Some(rhs)) = (list.token(id).ast_operand1, list.token(id).ast_operand2) else {
            continue;
        };
        let (bool_side, other) = if is_bool_expression(list, lhs) {
            (lhs, rhs)
        } else if is_bool_expression(list, rhs) {
            (rhs, lhs)
        } else {
            continue;
        };
        // The other side must be integral and not itself boolean.
        let other_is_int = list.token(other).is_number()
            || list
                .token(other)
                .value_type
                .is_some_and(|vt| vt.is_integral() && !vt.is_bool());
        if !other_is_int || is_bool_expression(list, other) {
            continue;
        }
        logger.report(bool_with_int_message(&expr_text(list, bool_side), list.location(id)));
    }
}

/// `b & flag` on a boolean operand; `&&` was probably intended.
fn bitwise_on_boolean(analysis: &Analysis, settings: &Settings, logger: &mut dyn ErrorLogger) {
    if !settings.inconclusive {
        return;
    }
    let list = &analysis.tokens;
    for id in list.tokens() {
        if !matches!(list.str(id), "&" | "|") || list.token(id).ast_operand2.is_none() {
            continue;
        }
        let (Some(lhs), Some(rhs)) = (list.token(id).ast_operand1, list.token(id).ast_operand2) else {
            continue;
        };
        for side in [lhs, rhs] {
            // Only named booleans; comparisons under `&` are often masks
            // built on purpose.
            let named_bool = list.token(side).var_id.is_some()
                && list.token(side).value_type.is_some_and(|vt| vt.is_bool());
            if named_bool {
                let op = list.str(id).to_owned();
                logger.report(bitwise_message(&expr_text(list, side), &op, list.location(id)));
                break;
            }
        }
    }
}

/// Relational comparison where both sides call functions returning bool.
fn comparison_of_bool_returning_functions(analysis: &Analysis, logger: &mut dyn ErrorLogger) {
    let list = &analysis.tokens;
    let db = &analysis.symbols;
    for id in list.tokens() {
        if !matches!(list.str(id), "<" | "<=" | ">" | ">=") {
            continue;
        }
        let (Some(lhs), Some(rhs)) = (list.token(id).ast_operand1, list.token(id).ast_operand2) else {
            continue;
        };
        let returns_bool = |tok: TokenId| {
            list.is(tok, "(")
                && list
                    .token(tok)
                    .ast_operand1
                    .and_then(|callee| list.token(callee).function)
                    .and_then(|fid| db.function(fid).return_type)
                    .is_some_and(|vt| vt.is_bool())
        };
        if returns_bool(lhs) && returns_bool(rhs) {
            logger.report(func_compare_message(list.location(id)));
        }
    }
}
