//! The checker framework.
//!
//! A checker reads the analyzed translation unit — tokens, symbols and the
//! values attached by value-flow — and writes diagnostics to the logger.
//! Checkers never mutate the analysis and are independent of one another:
//! the diagnostics of a TU are invariant under registration order.
//!
//! A failing checker is contained at dispatch: the failure becomes an
//! `internalError` diagnostic and the remaining checkers still run.

mod bitops;
mod bools;
mod buffer;
mod condition;
mod other;
mod sizeofchecks;
mod string;
mod typechecks;

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};

use crate::{
    analyzer::{Analysis, StopFlag},
    diagnostics::{ErrorLogger, ErrorMessage, Severity},
    errors::AnalysisResult,
    settings::Settings,
};

/// Recoverable failure of a single checker.
#[derive(Debug)]
pub struct CheckFailure {
    pub message: String,
}

impl fmt::Display for CheckFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CheckFailure {}

/// One rule module.
pub trait Checker {
    /// Stable name of the checker.
    fn name(&self) -> &'static str;

    /// Human-readable summary of what the checker looks for.
    fn class_info(&self) -> &'static str;

    /// Runs once per TU after value-flow. Read-only over the analysis.
    fn run_checks(
        &self,
        analysis: &Analysis,
        settings: &Settings,
        logger: &mut dyn ErrorLogger,
    ) -> Result<(), CheckFailure>;

    /// Enumerates the diagnostics this checker may produce, with dummy
    /// locations; used for documentation and the check-every-rule
    /// self-test.
    fn error_messages(&self, logger: &mut dyn ErrorLogger);
}

/// The registry, in registration order.
#[must_use]
pub fn all_checkers() -> Vec<Box<dyn Checker>> {
    vec![
        Box::new(condition::CheckCondition),
        Box::new(bitops::CheckBitops),
        Box::new(bools::CheckBool),
        Box::new(buffer::CheckBuffer),
        Box::new(string::CheckString),
        Box::new(other::CheckOther),
        Box::new(sizeofchecks::CheckSizeof),
        Box::new(typechecks::CheckType),
    ]
}

/// Dispatch: every registered checker runs once over the TU.
pub fn run_all(
    analysis: &Analysis,
    settings: &Settings,
    logger: &mut dyn ErrorLogger,
    stop: &StopFlag,
) -> AnalysisResult<()> {
    for checker in all_checkers() {
        stop.check()?;
        let outcome = catch_unwind(AssertUnwindSafe(|| checker.run_checks(analysis, settings, logger)));
        let failure = match outcome {
            Ok(Ok(())) => continue,
            Ok(Err(failure)) => failure.message,
            Err(panic) => panic_message(&panic),
        };
        logger.report(ErrorMessage::new(
            "internalError",
            Severity::Error,
            format!("Internal error in checker '{}': {failure}", checker.name()),
        ));
    }
    Ok(())
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::CollectingLogger;

    /// Every checker enumerates at least one diagnostic, and every id is a
    /// well-formed identifier.
    #[test]
    fn check_every_rule() {
        for checker in all_checkers() {
            let mut logger = CollectingLogger::new();
            checker.error_messages(&mut logger);
            assert!(
                !logger.messages.is_empty(),
                "checker '{}' enumerates no diagnostics",
                checker.name()
            );
            for msg in &logger.messages {
                let mut chars = msg.id.chars();
                assert!(chars.next().is_some_and(|c| c.is_ascii_alphabetic()));
                assert!(chars.all(|c| c.is_ascii_alphanumeric() || c == '_'), "bad id {}", msg.id);
            }
            assert!(!checker.class_info().is_empty());
        }
    }
}
