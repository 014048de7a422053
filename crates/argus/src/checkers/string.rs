//! String checks: writes into literals, degenerate comparisons, literals
//! in boolean context.

use std::sync::LazyLock;

use crate::{
    analyzer::Analysis,
    astutils::get_arguments,
    diagnostics::{DiagnosticLocation, ErrorLogger, ErrorMessage, Severity},
    keywords::Keyword,
    pattern::Pattern,
    settings::Settings,
    token::TokenKind,
    values::{ValueData, ValueKind},
};

use super::{CheckFailure, Checker};

pub struct CheckString;

impl Checker for CheckString {
    fn name(&self) -> &'static str {
        "String"
    }

    fn class_info(&self) -> &'static str {
        "Detect misuse of C-style strings and string literals"
    }

    fn run_checks(
        &self,
        analysis: &Analysis,
        settings: &Settings,
        logger: &mut dyn ErrorLogger,
    ) -> Result<(), CheckFailure> {
        string_literal_write(analysis, logger);
        always_true_false_string_compare(analysis, settings, logger);
        incorrect_string_boolean(analysis, settings, logger);
        str_plus_char(analysis, logger);
        Ok(())
    }

    fn error_messages(&self, logger: &mut dyn ErrorLogger) {
        logger.report(literal_write_message("abc", DiagnosticLocation::new("", 0, 0)));
        logger.report(static_compare_message("a", DiagnosticLocation::new("", 0, 0)));
        logger.report(string_boolean_message("abc", DiagnosticLocation::new("", 0, 0)));
        logger.report(str_plus_char_message(DiagnosticLocation::new("", 0, 0)));
    }
}

fn literal_write_message(literal: &str, primary: DiagnosticLocation) -> ErrorMessage {
    ErrorMessage::new(
        "stringLiteralWrite",
        Severity::Error,
        format!("Modifying string literal \"{literal}\" directly or indirectly is undefined behaviour."),
    )
    .with_location(primary)
    .with_cwe(758)
}

fn static_compare_message(text: &str, primary: DiagnosticLocation) -> ErrorMessage {
    ErrorMessage::new(
        "staticStringCompare",
        Severity::Warning,
        format!("Unnecessary comparison of static strings \"{text}\"."),
    )
    .with_verbose(format!(
        "Unnecessary comparison of static strings \"{text}\". The result is always the same; the comparison can \
         be replaced by a constant."
    ))
    .with_location(primary)
    .with_cwe(570)
}

fn string_boolean_message(literal: &str, primary: DiagnosticLocation) -> ErrorMessage {
    ErrorMessage::new(
        "incorrectStringBooleanError",
        Severity::Warning,
        format!("Conversion of string literal \"{literal}\" to bool always evaluates to true."),
    )
    .with_location(primary)
    .with_cwe(571)
}

fn str_plus_char_message(primary: DiagnosticLocation) -> ErrorMessage {
    ErrorMessage::new(
        "strPlusChar",
        Severity::Error,
        "Unusual pointer arithmetic. A value of type 'char' is added to a string literal.".to_owned(),
    )
    .with_location(primary)
    .with_cwe(665)
}

/// Write through a pointer whose value is a string literal.
fn string_literal_write(analysis: &Analysis, logger: &mut dyn ErrorLogger) {
    let list = &analysis.tokens;
    for id in list.tokens() {
        // Assignment or inc/dec target.
        let target = if list.is_assignment_op(id) {
            list.token(id).ast_operand1
        } else if matches!(list.str(id), "++" | "--") {
            list.token(id).ast_operand1
        } else {
            continue;
        };
        let Some(target) = target else { continue };
        // `p[i]` or `*p` where `p` carries a string-literal token value.
        let pointer = match list.str(target) {
            "[" => list.token(target).ast_operand1,
            "*" if list.token(target).ast_operand2.is_none() => list.token(target).ast_operand1,
            _ => None,
        };
        let Some(pointer) = pointer else { continue };
        let literal = list.token(pointer).values.iter().find_map(|v| match (&v.data, v.kind) {
            (ValueData::Tok(tok), ValueKind::Known | ValueKind::Possible) => Some(*tok),
            _ => None,
        });
        let Some(literal_tok) = literal else { continue };
        if list.token(literal_tok).kind != TokenKind::StringLiteral {
            continue;
        }
        let content = list.string_literal_content(literal_tok).unwrap_or_default();
        logger.report(literal_write_message(&content, list.location(target)));
    }
}

/// `strcmp("a", "a")` and direct comparisons of identical literals.
fn always_true_false_string_compare(analysis: &Analysis, _settings: &Settings, logger: &mut dyn ErrorLogger) {
    static STATIC_CMP: LazyLock<Pattern> =
        LazyLock::new(|| Pattern::compile("strcmp|strncmp|strcasecmp ( %str% , %str%"));
    let list = &analysis.tokens;
    for id in list.tokens() {
        // Library comparison calls over two literals.
        if STATIC_CMP.matches(list, id) {
            if let Some(paren) = crate::astutils::call_paren(list, id) {
                let args = get_arguments(list, paren);
                if args.len() >= 2
                    && let (Some(a), Some(b)) = (
                        list.string_literal_content(args[0]),
                        list.string_literal_content(args[1]),
                    )
                    && a == b
                {
                    logger.report(static_compare_message(&a, list.location(id)));
                }
            }
            continue;
        }
        // `"abc" == "abc"`.
        if matches!(list.str(id), "==" | "!=")
            && let (Some(lhs), Some(rhs)) = (list.token(id).ast_operand1, list.token(id).ast_operand2)
            && let (Some(a), Some(b)) = (list.string_literal_content(lhs), list.string_literal_content(rhs))
            && a == b
        {
            logger.report(static_compare_message(&a, list.location(id)));
        }
    }
}

/// A string literal used directly as a condition is always true.
fn incorrect_string_boolean(analysis: &Analysis, _settings: &Settings, logger: &mut dyn ErrorLogger) {
    let list = &analysis.tokens;
    for id in list.tokens() {
        let literal = if list.is(id, "!") {
            list.token(id).ast_operand1
        } else if matches!(list.token(id).keyword(), Some(Keyword::If | Keyword::While)) {
            list.next(id)
                .filter(|p| list.is(*p, "("))
                .and_then(|p| {
                    let close = list.token(p).link?;
                    crate::programmemory::condition_root(list, p, close)
                })
        } else {
            continue;
        };
        let Some(literal) = literal else { continue };
        if list.token(literal).kind != TokenKind::StringLiteral {
            continue;
        }
        let content = list.string_literal_content(literal).unwrap_or_default();
        logger.report(string_boolean_message(&content, list.location(literal)));
    }
}

/// `"abc" + c` with a char operand indexes into the literal by character
/// code.
fn str_plus_char(analysis: &Analysis, logger: &mut dyn ErrorLogger) {
    let list = &analysis.tokens;
    for id in list.tokens() {
        if !list.is(id, "+") || list.token(id).ast_operand2.is_none() {
            continue;
        }
        let (Some(lhs), Some(rhs)) = (list.token(id).ast_operand1, list.token(id).ast_operand2) else {
            continue;
        };
        let lhs_is_literal = list.token(lhs).kind == TokenKind::StringLiteral;
        let rhs_is_char = list.token(rhs).kind == TokenKind::CharLiteral
            || list
                .token(rhs)
                .value_type
                .is_some_and(|vt| vt.base == crate::valuetype::BaseType::Char && !vt.is_pointer());
        if lhs_is_literal && rhs_is_char {
            logger.report(str_plus_char_message(list.location(id)));
        }
    }
}
