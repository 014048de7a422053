//! Bitmask checks: masked values tested against bits the mask can never
//! produce.

use num_bigint::BigInt;
use num_traits::Zero;

use crate::{
    analyzer::Analysis,
    diagnostics::{DiagnosticLocation, ErrorLogger, ErrorMessage, Severity},
    settings::Settings,
    token::TokenId,
    tokenlist::TokenList,
};

use super::{CheckFailure, Checker};

pub struct CheckBitops;

impl Checker for CheckBitops {
    fn name(&self) -> &'static str {
        "Bitops"
    }

    fn class_info(&self) -> &'static str {
        "Bitwise operations whose result is fixed by the operand masks"
    }

    fn run_checks(
        &self,
        analysis: &Analysis,
        settings: &Settings,
        logger: &mut dyn ErrorLogger,
    ) -> Result<(), CheckFailure> {
        mismatching_bit_and(analysis, settings, logger);
        comparison_always_fixed(analysis, logger);
        Ok(())
    }

    fn error_messages(&self, logger: &mut dyn ErrorLogger) {
        logger.report(mismatching_message(
            &BigInt::from(0xf0),
            &BigInt::from(1),
            vec![DiagnosticLocation::new("", 0, 0)],
        ));
        logger.report(comparison_message("&", &BigInt::from(6), "==", &BigInt::from(1), false, DiagnosticLocation::new("", 0, 0)));
    }
}

fn mismatching_message(mask1: &BigInt, mask2: &BigInt, stack: Vec<DiagnosticLocation>) -> ErrorMessage {
    ErrorMessage::new(
        "mismatchingBitAnd",
        Severity::Style,
        format!("Mismatching bitmasks. Result is always 0 (X = Y & 0x{mask1:x}; Z = X & 0x{mask2:x}; => Z=0)."),
    )
    .with_callstack(stack)
    .with_cwe(398)
}

fn comparison_message(
    bitop: &str,
    mask: &BigInt,
    comparison: &str,
    rhs: &BigInt,
    result: bool,
    primary: DiagnosticLocation,
) -> ErrorMessage {
    let which = if result { "true" } else { "false" };
    ErrorMessage::new(
        "comparisonError",
        Severity::Style,
        format!("Expression '(X {bitop} 0x{mask:x}) {comparison} 0x{rhs:x}' is always {which}."),
    )
    .with_verbose(format!(
        "Expression '(X {bitop} 0x{mask:x}) {comparison} 0x{rhs:x}' is always {which}. Check carefully constants \
         and operators used, these errors might be hard to spot sometimes."
    ))
    .with_location(primary)
    .with_cwe(398)
}

/// `x = y & M;` followed by `x & N` with `M & N == 0` always yields zero.
fn mismatching_bit_and(analysis: &Analysis, _settings: &Settings, logger: &mut dyn ErrorLogger) {
    let list = &analysis.tokens;
    for id in list.tokens() {
        if !list.is(id, "=") || list.token(id).ast_parent.is_some() {
            continue;
        }
        let Some(lhs) = list.token(id).ast_operand1 else { continue };
        let Some(vid) = list.token(lhs).var_id else { continue };
        let Some(rhs) = list.token(id).ast_operand2 else { continue };
        if !list.is(rhs, "&") || list.token(rhs).ast_operand2.is_none() {
            continue;
        }
        let Some(mask) = literal_operand(list, rhs) else { continue };
        if mask < BigInt::from(0) {
            continue;
        }
        // Forward scan: uses of the variable under `&` until reassignment.
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
                if (list.is_assignment_op(parent) && list.token(parent).ast_operand1 == Some(cur))
                    || matches!(list.str(parent), "++" | "--")
                {
                    break;
                }
                if list.is(parent, "&")
                    && list.token(parent).ast_operand2.is_some()
                    && let Some(second) = literal_operand(list, parent)
                    && second >= BigInt::from(0)
                    && (&mask & &second).is_zero()
                {
                    let mut assign_loc = list.location(id);
                    assign_loc.info = "The mask is applied here".to_owned();
                    logger.report(mismatching_message(&mask, &second, vec![assign_loc, list.location(parent)]));
                }
            }
            match list.next(cur) {
                Some(next) => cur = next,
                None => break,
            }
        }
    }
}

fn literal_operand(list: &TokenList, op: TokenId) -> Option<BigInt> {
    for operand in [list.token(op).ast_operand1, list.token(op).ast_operand2].into_iter().flatten() {
        if let Some(n) = list.int_literal_value(operand) {
            return Some(n);
        }
    }
    None
}

/// `(x & 6) == 1` and `(x | 4) == 1` are decided by the constants alone.
fn comparison_always_fixed(analysis: &Analysis, logger: &mut dyn ErrorLogger) {
    let list = &analysis.tokens;
    for id in list.tokens() {
        if !matches!(list.str(id), "==" | "!=") || list.token(id).ast_operand2.is_none() {
            continue;
        }
        let (Some(mut expr1), Some(mut expr2)) = (list.token(id).ast_operand1, list.token(id).ast_operand2) else {
            continue;
        };
        if list.token(expr1).is_number() {
            std::mem::swap(&mut expr1, &mut expr2);
        }
        let Some(rhs) = list.int_literal_value(expr2) else {
            continue;
        };
        if rhs < BigInt::from(0) {
            continue;
        }
        if !matches!(list.str(expr1), "&" | "|") || list.token(expr1).ast_operand2.is_none() {
            continue;
        }
        let bitop = list.str(expr1).to_owned();
        let Some(mask) = literal_operand(list, expr1) else { continue };
        if mask < BigInt::from(0) {
            continue;
        }
        let fixed = match bitop.as_str() {
            "&" => (&mask & &rhs) != rhs,
            _ => (&mask | &rhs) != rhs,
        };
        if fixed {
            let result = list.is(id, "!=");
            let comparison = list.str(id).to_owned();
            logger.report(comparison_message(&bitop, &mask, &comparison, &rhs, result, list.location(expr1)));
        }
    }
}
