//! sizeof misuse checks.

use crate::{
    analyzer::Analysis,
    diagnostics::{Certainty, DiagnosticLocation, ErrorLogger, ErrorMessage, Severity},
    keywords::Keyword,
    settings::Settings,
    token::TokenId,
    tokenlist::TokenList,
};

use super::{CheckFailure, Checker};

pub struct CheckSizeof;

impl Checker for CheckSizeof {
    fn name(&self) -> &'static str {
        "Sizeof"
    }

    fn class_info(&self) -> &'static str {
        "sizeof() usage checks"
    }

    fn run_checks(
        &self,
        analysis: &Analysis,
        settings: &Settings,
        logger: &mut dyn ErrorLogger,
    ) -> Result<(), CheckFailure> {
        sizeof_sizeof(analysis, logger);
        sizeof_calculation(analysis, settings, logger);
        multiply_sizeof(analysis, logger);
        sizeof_void(analysis, logger);
        Ok(())
    }

    fn error_messages(&self, logger: &mut dyn ErrorLogger) {
        logger.report(sizeof_sizeof_message(DiagnosticLocation::new("", 0, 0)));
        logger.report(calculation_message(false, DiagnosticLocation::new("", 0, 0)));
        logger.report(multiply_message(DiagnosticLocation::new("", 0, 0)));
        logger.report(void_message(DiagnosticLocation::new("", 0, 0)));
    }
}

fn sizeof_sizeof_message(primary: DiagnosticLocation) -> ErrorMessage {
    ErrorMessage::new(
        "sizeofsizeof",
        Severity::Warning,
        "Calling 'sizeof' on 'sizeof'.".to_owned(),
    )
    .with_verbose(
        "Calling 'sizeof' on 'sizeof'. The inner sizeof is an integer constant, so the outer one measures the \
         size of that constant's type rather than anything in the program.",
    )
    .with_location(primary)
    .with_cwe(682)
}

fn calculation_message(inconclusive: bool, primary: DiagnosticLocation) -> ErrorMessage {
    let mut msg = ErrorMessage::new(
        "sizeofCalculation",
        Severity::Warning,
        "Found calculation inside sizeof().".to_owned(),
    )
    .with_location(primary)
    .with_cwe(682);
    if inconclusive {
        msg = msg.with_certainty(Certainty::Inconclusive);
    }
    msg
}

fn multiply_message(primary: DiagnosticLocation) -> ErrorMessage {
    ErrorMessage::new(
        "multiplySizeof",
        Severity::Warning,
        "Multiplying sizeof() with sizeof() indicates a logic error.".to_owned(),
    )
    .with_location(primary)
    .with_cwe(682)
}

fn void_message(primary: DiagnosticLocation) -> ErrorMessage {
    ErrorMessage::new(
        "sizeofVoid",
        Severity::Portability,
        "Behaviour of 'sizeof(void)' is not covered by the ISO C standard.".to_owned(),
    )
    .with_location(primary)
    .with_cwe(682)
}

fn sizeof_tokens(list: &TokenList) -> impl Iterator<Item = TokenId> + '_ {
    list.tokens()
        .filter(|&id| list.token(id).keyword() == Some(Keyword::Sizeof))
}

/// `sizeof (sizeof(x))`.
fn sizeof_sizeof(analysis: &Analysis, logger: &mut dyn ErrorLogger) {
    let list = &analysis.tokens;
    for id in sizeof_tokens(list) {
        let inner = match list.next(id) {
            Some(n) if list.is(n, "(") => list.next(n),
            other => other,
        };
        if inner.is_some_and(|n| list.token(n).keyword() == Some(Keyword::Sizeof)) {
            logger.report(sizeof_sizeof_message(list.location(id)));
        }
    }
}

/// `sizeof(a + b)` — the calculation is almost always a mistake.
fn sizeof_calculation(analysis: &Analysis, _settings: &Settings, logger: &mut dyn ErrorLogger) {
    let list = &analysis.tokens;
    for id in sizeof_tokens(list) {
        let Some(operand) = list.token(id).ast_operand1 else {
            continue;
        };
        if list.token(operand).keyword() == Some(Keyword::Sizeof) {
            continue;
        }
        let has_calculation = contains_arith(list, operand);
        if has_calculation {
            let inconclusive = list.token(id).from_macro;
            logger.report(calculation_message(inconclusive, list.location(id)));
        }
    }
}

fn contains_arith(list: &TokenList, root: TokenId) -> bool {
    let mut stack = vec![root];
    while let Some(id) = stack.pop() {
        let tok = list.token(id);
        if tok.ast_operand2.is_some() && matches!(list.str(id), "+" | "-" | "*" | "/" | "%") {
            return true;
        }
        if let Some(o) = tok.ast_operand1 {
            stack.push(o);
        }
        if let Some(o) = tok.ast_operand2 {
            stack.push(o);
        }
    }
    false
}

/// `sizeof(x) * sizeof(y)`.
fn multiply_sizeof(analysis: &Analysis, logger: &mut dyn ErrorLogger) {
    let list = &analysis.tokens;
    for id in list.tokens() {
        if !list.is(id, "*") || list.token(id).ast_operand2.is_none() {
            continue;
        }
        let (Some(lhs), Some(rhs)) = (list.token(id).ast_operand1, list.token(id).ast_operand2) else {
            continue;
        };
        let is_sizeof = |t: TokenId| list.token(t).keyword() == Some(Keyword::Sizeof);
        if is_sizeof(lhs) && is_sizeof(rhs) {
            logger.report(multiply_message(list.location(id)));
        }
    }
}

/// `sizeof(void)`.
fn sizeof_void(analysis: &Analysis, logger: &mut dyn ErrorLogger) {
    let list = &analysis.tokens;
    for id in sizeof_tokens(list) {
        if let Some(paren) = list.next(id)
            && list.is(paren, "(")
            && let Some(inner) = list.next(paren)
            && list.token(inner).keyword() == Some(Keyword::Void)
            && list.next(inner).is_some_and(|c| list.is(c, ")"))
        {
            logger.report(void_message(list.location(id)));
        }
    }
}
