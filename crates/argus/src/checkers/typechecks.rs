//! Type checks: oversized shifts, integer overflow, sign conversion.

use num_bigint::BigInt;

use crate::{
    analyzer::Analysis,
    astutils::expr_text,
    diagnostics::{DiagnosticLocation, ErrorLogger, ErrorMessage, Severity},
    settings::Settings,
    values::{Bound, ValueKind},
    valuetype::Sign,
};

use super::{CheckFailure, Checker, other::render_error_path};

pub struct CheckType;

impl Checker for CheckType {
    fn name(&self) -> &'static str {
        "Type"
    }

    fn class_info(&self) -> &'static str {
        "Type-related checks: shifts, overflows, sign conversion"
    }

    fn run_checks(
        &self,
        analysis: &Analysis,
        settings: &Settings,
        logger: &mut dyn ErrorLogger,
    ) -> Result<(), CheckFailure> {
        shift_too_many_bits(analysis, settings, logger);
        integer_overflow(analysis, settings, logger);
        sign_conversion(analysis, settings, logger);
        Ok(())
    }

    fn error_messages(&self, logger: &mut dyn ErrorLogger) {
        logger.report(shift_message(32, &BigInt::from(40), DiagnosticLocation::new("", 0, 0)));
        logger.report(overflow_message("x*x", DiagnosticLocation::new("", 0, 0)));
        logger.report(sign_message("-1", &[], DiagnosticLocation::new("", 0, 0)));
    }
}

fn shift_message(bits: u32, by: &BigInt, primary: DiagnosticLocation) -> ErrorMessage {
    ErrorMessage::new(
        "shiftTooManyBits",
        Severity::Error,
        format!("Shifting {bits}-bit value by {by} bits is undefined behaviour"),
    )
    .with_location(primary)
    .with_cwe(758)
}

fn overflow_message(expr: &str, primary: DiagnosticLocation) -> ErrorMessage {
    ErrorMessage::new(
        "integerOverflow",
        Severity::Error,
        format!("Signed integer overflow for expression '{expr}'."),
    )
    .with_location(primary)
    .with_cwe(190)
}

fn sign_message(expr: &str, error_path: &[DiagnosticLocation], primary: DiagnosticLocation) -> ErrorMessage {
    let mut stack = error_path.to_vec();
    stack.push(primary);
    ErrorMessage::new(
        "signConversion",
        Severity::Warning,
        format!("Expression '{expr}' has a negative value. That is converted to an unsigned value and used in an unsigned calculation."),
    )
    .with_callstack(stack)
    .with_cwe(195)
}

/// `x << n` with `n` at least the width of `x`'s promoted type.
fn shift_too_many_bits(analysis: &Analysis, settings: &Settings, logger: &mut dyn ErrorLogger) {
    let list = &analysis.tokens;
    for id in list.tokens() {
        if !matches!(list.str(id), "<<" | ">>" | "<<=" | ">>=") || list.token(id).ast_operand2.is_none() {
            continue;
        }
        let (Some(lhs), Some(rhs)) = (list.token(id).ast_operand1, list.token(id).ast_operand2) else {
            continue;
        };
        let Some(lhs_type) = list.token(lhs).value_type else {
            continue;
        };
        if !lhs_type.is_integral() {
            continue;
        }
        let Some(bits) = lhs_type.promoted().bits(&settings.platform) else {
            continue;
        };
        let shift = list.int_literal_value(rhs).or_else(|| list.token(rhs).known_int().cloned());
        if let Some(by) = shift
            && by >= BigInt::from(bits)
        {
            logger.report(shift_message(bits, &by, list.location(id)));
        }
    }
}

/// Arithmetic whose Known result leaves the range of its signed type.
fn integer_overflow(analysis: &Analysis, settings: &Settings, logger: &mut dyn ErrorLogger) {
    let list = &analysis.tokens;
    for id in list.tokens() {
        if !matches!(list.str(id), "+" | "-" | "*") || list.token(id).ast_operand2.is_none() {
            continue;
        }
        let Some(vt) = list.token(id).value_type else { continue };
        if !vt.is_integral() || vt.effective_sign(&settings.platform) != Sign::Signed {
            continue;
        }
        let (Some(max), Some(min)) = (vt.max_value(&settings.platform), vt.min_value(&settings.platform)) else {
            continue;
        };
        // Operand-level arithmetic over wide integers never wraps, so the
        // folded Known value is the mathematically exact result.
        let Some(result) = list.token(id).known_int().cloned() else {
            continue;
        };
        if result > max || result < min {
            logger.report(overflow_message(&expr_text(list, id), list.location(id)));
        }
    }
}

/// A Known negative value flowing into an unsigned operation.
fn sign_conversion(analysis: &Analysis, settings: &Settings, logger: &mut dyn ErrorLogger) {
    let list = &analysis.tokens;
    for id in list.tokens() {
        if !matches!(list.str(id), "+" | "-" | "*" | "/" | "%") || list.token(id).ast_operand2.is_none() {
            continue;
        }
        let Some(vt) = list.token(id).value_type else { continue };
        if !vt.is_integral() || vt.effective_sign(&settings.platform) != Sign::Unsigned {
            continue;
        }
        for operand in [list.token(id).ast_operand1, list.token(id).ast_operand2].into_iter().flatten() {
            let negative = list.token(operand).values.iter().find(|v| {
                matches!(v.kind, ValueKind::Known | ValueKind::Possible)
                    && v.bound == Bound::Point
                    && v.as_int().is_some_and(|n| n < &BigInt::from(0))
            });
            // A literal negation is visible without value-flow.
            let literal_negative = list.is(operand, "-")
                && list.token(operand).ast_operand2.is_none()
                && list
                    .token(operand)
                    .ast_operand1
                    .and_then(|o| list.int_literal_value(o))
                    .is_some_and(|n| n > BigInt::from(0));
            if let Some(v) = negative {
                let path = render_error_path(list, v);
                logger.report(sign_message(&expr_text(list, operand), &path, list.location(id)));
            } else if literal_negative {
                logger.report(sign_message(&expr_text(list, operand), &[], list.location(id)));
            }
        }
    }
}
