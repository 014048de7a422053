//! Diagnostic model: severities, messages, rendering, and the logger seam.
//!
//! Checkers construct [`ErrorMessage`] values and hand them to an
//! [`ErrorLogger`]. The [`Reporter`] wrapper applies suppressions,
//! per-TU deduplication and severity filtering before anything is published.

use std::{
    fmt::Write as _,
    sync::{Arc, Mutex, PoisonError},
};

use ahash::AHashSet;
use serde::Serialize;
use strum::{Display, EnumString, IntoStaticStr};

use crate::{settings::Settings, suppressions::Suppressions};

/// Severity categories, ordered from most to least urgent.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString, IntoStaticStr, Serialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Style,
    Performance,
    Portability,
    Information,
}

/// Whether a finding is backed by a definite proof or a heuristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Certainty {
    #[default]
    Normal,
    Inconclusive,
}

/// One stop in a diagnostic's call stack. The last entry is the primary
/// location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiagnosticLocation {
    pub file: String,
    pub line: u32,
    pub column: u32,
    /// Short per-location annotation ("Assuming that x is 0", ...).
    pub info: String,
}

impl DiagnosticLocation {
    #[must_use]
    pub fn new(file: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            file: file.into(),
            line,
            column,
            info: String::new(),
        }
    }
}

/// A finding, ready for filtering and rendering.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorMessage {
    /// Stable identifier matching `[A-Za-z][A-Za-z0-9_]*`.
    pub id: String,
    pub severity: Severity,
    #[serde(skip)]
    pub certainty: Certainty,
    /// One-line message.
    pub message: String,
    /// Longer explanation; falls back to `message` when empty.
    pub verbose: String,
    /// Breadcrumbs leading to the finding; last entry is the primary
    /// location. Empty for file-independent diagnostics.
    pub callstack: Vec<DiagnosticLocation>,
    /// Common Weakness Enumeration tag, when one applies.
    pub cwe: Option<u32>,
}

impl ErrorMessage {
    #[must_use]
    pub fn new(id: &str, severity: Severity, message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            id: id.to_owned(),
            severity,
            certainty: Certainty::Normal,
            verbose: message.clone(),
            message,
            callstack: Vec::new(),
            cwe: None,
        }
    }

    /// Appends a location; the last appended location becomes primary.
    #[must_use]
    pub fn with_location(mut self, loc: DiagnosticLocation) -> Self {
        self.callstack.push(loc);
        self
    }

    #[must_use]
    pub fn with_callstack(mut self, stack: Vec<DiagnosticLocation>) -> Self {
        self.callstack = stack;
        self
    }

    #[must_use]
    pub fn with_certainty(mut self, certainty: Certainty) -> Self {
        self.certainty = certainty;
        self
    }

    #[must_use]
    pub fn with_verbose(mut self, verbose: impl Into<String>) -> Self {
        self.verbose = verbose.into();
        self
    }

    #[must_use]
    pub fn with_cwe(mut self, cwe: u32) -> Self {
        self.cwe = Some(cwe);
        self
    }

    /// The location the finding is reported at.
    #[must_use]
    pub fn primary_location(&self) -> Option<&DiagnosticLocation> {
        self.callstack.last()
    }

    #[must_use]
    pub fn is_inconclusive(&self) -> bool {
        self.certainty == Certainty::Inconclusive
    }

    /// Renders the message through a user template.
    ///
    /// Placeholders: `{file}`, `{line}`, `{column}`, `{severity}`,
    /// `{message}`, `{verbose}`, `{id}`, `{cwe}`, `{callstack}`, and the
    /// conditional `{inconclusive:text:}` which expands to `text` only for
    /// inconclusive findings.
    #[must_use]
    pub fn render(&self, template: &str, colors: &Colors) -> String {
        let (file, line, column) = match self.primary_location() {
            Some(loc) => (loc.file.as_str(), loc.line, loc.column),
            None => ("", 0, 0),
        };
        let mut out = String::with_capacity(template.len() + self.message.len());
        let mut rest = template;
        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            rest = &rest[open..];
            let Some(close) = placeholder_end(rest) else {
                out.push_str(rest);
                return out;
            };
            let inner = &rest[1..close];
            rest = &rest[close + 1..];
            if let Some(text) = inner.strip_prefix("inconclusive:") {
                if self.is_inconclusive() {
                    out.push_str(text.strip_suffix(':').unwrap_or(text));
                }
                continue;
            }
            match inner {
                "file" => out.push_str(file),
                "line" => {
                    let _ = write!(out, "{line}");
                }
                "column" => {
                    let _ = write!(out, "{column}");
                }
                "severity" => out.push_str(&colors.severity(self.severity)),
                "message" => out.push_str(&self.message),
                "verbose" => out.push_str(if self.verbose.is_empty() {
                    &self.message
                } else {
                    &self.verbose
                }),
                "id" => out.push_str(&self.id),
                "cwe" => {
                    if let Some(cwe) = self.cwe {
                        let _ = write!(out, "{cwe}");
                    }
                }
                "callstack" => {
                    for (i, loc) in self.callstack.iter().enumerate() {
                        if i > 0 {
                            out.push_str(" -> ");
                        }
                        let _ = write!(out, "[{}:{}]", loc.file, loc.line);
                    }
                }
                other => {
                    // Unknown placeholders render literally.
                    out.push('{');
                    out.push_str(other);
                    out.push('}');
                }
            }
        }
        out.push_str(rest);
        out
    }

    /// Serializes the fields verbatim for machine-readable sinks.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Key used for per-TU deduplication.
    #[must_use]
    pub fn dedup_key(&self) -> String {
        let (file, line, column) = match self.primary_location() {
            Some(loc) => (loc.file.as_str(), loc.line, loc.column),
            None => ("", 0, 0),
        };
        format!("{}\x1f{file}\x1f{line}\x1f{column}\x1f{}", self.id, self.message)
    }
}

/// Finds the closing `}` of the placeholder starting at `s[0] == '{'`,
/// allowing one level of `:`-delimited conditional text.
fn placeholder_end(s: &str) -> Option<usize> {
    s.find('}')
}

/// ANSI styling for rendered output.
///
/// Constructed once at driver startup and passed through `Settings`; there
/// is no process-global color state.
#[derive(Debug, Clone, Default)]
pub struct Colors {
    pub enabled: bool,
}

impl Colors {
    #[must_use]
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    fn severity(&self, severity: Severity) -> String {
        if !self.enabled {
            return severity.to_string();
        }
        let code = match severity {
            Severity::Error => "\x1b[31;1m",
            Severity::Warning => "\x1b[35m",
            Severity::Style | Severity::Performance | Severity::Portability => "\x1b[34m",
            Severity::Information => "\x1b[2m",
        };
        format!("{code}{severity}\x1b[0m")
    }
}

/// Sink for diagnostics. `Send` so a sink can move into the worker threads
/// of a driver that analyzes translation units in parallel; [`SharedLogger`]
/// is the mutex-guarded fan-in for that case.
pub trait ErrorLogger: Send {
    fn report(&mut self, msg: ErrorMessage);
}

/// Logger that keeps every message, used per TU and by tests.
#[derive(Debug, Default)]
pub struct CollectingLogger {
    pub messages: Vec<ErrorMessage>,
}

impl CollectingLogger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ErrorLogger for CollectingLogger {
    fn report(&mut self, msg: ErrorMessage) {
        self.messages.push(msg);
    }
}

/// Thread-safe fan-in sink: clones share one message queue behind a mutex,
/// so parallel TU analyses enqueue into a single stream. The configuration
/// stays immutable; this queue is the only state drivers share.
#[derive(Debug, Clone, Default)]
pub struct SharedLogger {
    messages: Arc<Mutex<Vec<ErrorMessage>>>,
}

impl SharedLogger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drains everything enqueued so far.
    #[must_use]
    pub fn take(&self) -> Vec<ErrorMessage> {
        std::mem::take(&mut *self.messages.lock().unwrap_or_else(PoisonError::into_inner))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ErrorLogger for SharedLogger {
    fn report(&mut self, msg: ErrorMessage) {
        self.messages.lock().unwrap_or_else(PoisonError::into_inner).push(msg);
    }
}

/// Filtering logger applied between the analysis and the published stream.
///
/// Order of the publishing pipeline: suppression match (matched entries are
/// counted and dropped), per-TU deduplication, severity/enable filtering.
pub struct Reporter<'s> {
    settings: &'s Settings,
    suppressions: &'s Suppressions,
    seen: AHashSet<String>,
    /// Indices of suppressions that matched at least one message.
    pub used_suppressions: AHashSet<usize>,
    pub messages: Vec<ErrorMessage>,
}

impl<'s> Reporter<'s> {
    #[must_use]
    pub fn new(settings: &'s Settings, suppressions: &'s Suppressions) -> Self {
        Self {
            settings,
            suppressions,
            seen: AHashSet::new(),
            used_suppressions: AHashSet::new(),
            messages: Vec::new(),
        }
    }

    /// Sorts collected diagnostics into source order and returns them.
    #[must_use]
    pub fn into_messages(mut self) -> Vec<ErrorMessage> {
        self.messages.sort_by(|a, b| {
            let ka = a.primary_location().map(|l| (l.file.clone(), l.line, l.column));
            let kb = b.primary_location().map(|l| (l.file.clone(), l.line, l.column));
            ka.cmp(&kb).then_with(|| a.id.cmp(&b.id))
        });
        self.messages
    }
}

impl ErrorLogger for Reporter<'_> {
    fn report(&mut self, msg: ErrorMessage) {
        if let Some(index) = self.suppressions.match_message(&msg) {
            self.used_suppressions.insert(index);
            return;
        }
        if !self.seen.insert(msg.dedup_key()) {
            return;
        }
        if !self.settings.is_enabled(msg.severity) {
            return;
        }
        if msg.is_inconclusive() && !self.settings.inconclusive {
            return;
        }
        self.messages.push(msg);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg() -> ErrorMessage {
        ErrorMessage::new("zerodiv", Severity::Error, "Division by zero.")
            .with_location(DiagnosticLocation::new("a.c", 3, 11))
    }

    #[test]
    fn default_template_rendering() {
        let rendered = msg().render(crate::settings::DEFAULT_TEMPLATE, &Colors::default());
        assert_eq!(rendered, "a.c:3:11: error: Division by zero. [zerodiv]");
    }

    #[test]
    fn inconclusive_conditional() {
        let m = msg().with_certainty(Certainty::Inconclusive);
        let rendered = m.render("{severity}:{inconclusive:inconclusive:} {message}", &Colors::default());
        assert_eq!(rendered, "error:inconclusive Division by zero.");
        let rendered = msg().render("{severity}:{inconclusive:inconclusive:} {message}", &Colors::default());
        assert_eq!(rendered, "error: Division by zero.");
    }
}
