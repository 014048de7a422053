//! Internal error taxonomy for the analysis pipeline.
//!
//! Fatal errors abort the translation unit and surface as a `syntaxError`
//! diagnostic; recoverable limits surface as information diagnostics and
//! analysis continues. Errors never cross a phase boundary as panics.

use std::fmt;

use crate::diagnostics::{DiagnosticLocation, ErrorMessage, Severity};

/// Result type alias for operations that can abort analysis of a TU.
pub type AnalysisResult<T> = Result<T, AnalysisError>;

/// Classified failure raised by a pipeline phase.
#[derive(Debug, Clone)]
pub enum AnalysisError {
    /// The TU cannot be analyzed at all: bracket mismatch, unterminated
    /// literal, impossible token kind.
    Syntax {
        file: String,
        line: u32,
        column: u32,
        message: String,
    },
    /// A construct the tokenizer does not model. Fatal only when it prevents
    /// AST construction for a whole function; the caller decides.
    UnsupportedConstruct {
        file: String,
        line: u32,
        column: u32,
        message: String,
    },
    /// A configured bound was reached (template depth, evaluator steps).
    RecursionLimit { what: String },
    /// The driver set the stop flag; the TU aborts cleanly.
    Aborted,
    /// Malformed platform / library / suppressions input.
    BadConfig { message: String },
    /// A bug in the analyzer itself, reported and contained at dispatch.
    Internal { message: String },
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Syntax {
                file,
                line,
                column,
                message,
            } => {
                write!(f, "{file}:{line}:{column}: syntax error: {message}")
            }
            Self::UnsupportedConstruct {
                file,
                line,
                column,
                message,
            } => {
                write!(f, "{file}:{line}:{column}: unsupported construct: {message}")
            }
            Self::RecursionLimit { what } => write!(f, "recursion limit reached: {what}"),
            Self::Aborted => write!(f, "analysis aborted"),
            Self::BadConfig { message } => write!(f, "invalid configuration: {message}"),
            Self::Internal { message } => write!(f, "internal error: {message}"),
        }
    }
}

impl std::error::Error for AnalysisError {}

impl AnalysisError {
    /// Fatal errors abandon the TU; everything else is reported and analysis
    /// continues.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Syntax { .. } | Self::BadConfig { .. })
    }

    /// Converts the error into the diagnostic that represents it in the
    /// output stream.
    #[must_use]
    pub fn to_diagnostic(&self) -> ErrorMessage {
        match self {
            Self::Syntax {
                file,
                line,
                column,
                message,
            } => ErrorMessage::new("syntaxError", Severity::Error, message.clone()).with_location(
                DiagnosticLocation {
                    file: file.clone(),
                    line: *line,
                    column: *column,
                    info: String::new(),
                },
            ),
            Self::UnsupportedConstruct {
                file,
                line,
                column,
                message,
            } => ErrorMessage::new("unsupportedConstruct", Severity::Information, message.clone())
                .with_location(DiagnosticLocation {
                    file: file.clone(),
                    line: *line,
                    column: *column,
                    info: String::new(),
                }),
            Self::RecursionLimit { what } => ErrorMessage::new(
                "recursionLimit",
                Severity::Information,
                format!("Analysis limit reached: {what}"),
            ),
            Self::Aborted => ErrorMessage::new(
                "analysisAborted",
                Severity::Information,
                "Analysis was aborted before completion.",
            ),
            Self::BadConfig { message } => {
                ErrorMessage::new("badConfig", Severity::Error, message.clone())
            }
            Self::Internal { message } => ErrorMessage::new(
                "internalError",
                Severity::Error,
                format!("Internal error: {message}"),
            ),
        }
    }
}
