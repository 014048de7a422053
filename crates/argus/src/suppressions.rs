//! User suppressions: file entries, inline comments, wildcard matching.
//!
//! File format, one entry per line: `<id>[:<file>[:<line>]]`. `*` is a
//! wildcard in both the id and the file. Lines starting with `#` are
//! comments. Inline suppressions are comments of the form
//! `argus-suppress <id>` attached to the next statement, or
//! `argus-suppress-begin <id>` / `argus-suppress-end <id>` for ranges.

use regex::Regex;

use crate::{
    diagnostics::ErrorMessage,
    errors::{AnalysisError, AnalysisResult},
};

/// One suppression rule.
#[derive(Debug, Clone)]
pub struct Suppression {
    pub id: String,
    pub file: Option<String>,
    pub line: Option<u32>,
    /// Inclusive end line for `-begin`/`-end` ranges.
    pub end_line: Option<u32>,
    pub symbol: Option<String>,
    id_matcher: Matcher,
    file_matcher: Option<Matcher>,
}

/// Compiled matcher: exact comparison for plain strings, anchored regex when
/// the pattern contains `*`.
#[derive(Debug, Clone)]
enum Matcher {
    Exact(String),
    Glob(Regex),
}

impl Matcher {
    fn compile(pattern: &str) -> AnalysisResult<Self> {
        if !pattern.contains('*') && !pattern.contains('?') {
            return Ok(Self::Exact(pattern.to_owned()));
        }
        let mut re = String::with_capacity(pattern.len() + 8);
        re.push('^');
        for c in pattern.chars() {
            match c {
                '*' => re.push_str(".*"),
                '?' => re.push('.'),
                c => re.push_str(&regex::escape(&c.to_string())),
            }
        }
        re.push('$');
        Regex::new(&re).map(Self::Glob).map_err(|e| AnalysisError::BadConfig {
            message: format!("bad suppression pattern '{pattern}': {e}"),
        })
    }

    fn matches(&self, s: &str) -> bool {
        match self {
            Self::Exact(p) => p == s,
            Self::Glob(re) => re.is_match(s),
        }
    }
}

impl Suppression {
    pub fn new(id: &str, file: Option<&str>, line: Option<u32>) -> AnalysisResult<Self> {
        Ok(Self {
            id: id.to_owned(),
            file: file.map(str::to_owned),
            line,
            end_line: None,
            symbol: None,
            id_matcher: Matcher::compile(id)?,
            file_matcher: file.map(Matcher::compile).transpose()?,
        })
    }

    /// Parses one suppressions-file line (`<id>[:<file>[:<line>]]`).
    pub fn parse_line(line: &str) -> AnalysisResult<Self> {
        let mut parts = line.splitn(3, ':');
        let id = parts.next().unwrap_or_default().trim();
        if id.is_empty() {
            return Err(AnalysisError::BadConfig {
                message: format!("bad suppression line '{line}'"),
            });
        }
        let file = parts.next().map(str::trim).filter(|s| !s.is_empty());
        let line_nr = match parts.next().map(str::trim) {
            Some(nr) => Some(nr.parse::<u32>().map_err(|_| AnalysisError::BadConfig {
                message: format!("bad suppression line number in '{line}'"),
            })?),
            None => None,
        };
        Self::new(id, file, line_nr)
    }

    #[must_use]
    pub fn matches(&self, msg: &ErrorMessage) -> bool {
        if !self.id_matcher.matches(&msg.id) {
            return false;
        }
        let Some(loc) = msg.primary_location() else {
            // Location-free diagnostics are only matched by bare-id entries.
            return self.file.is_none() && self.line.is_none();
        };
        if let Some(matcher) = &self.file_matcher
            && !matcher.matches(&loc.file)
        {
            return false;
        }
        match (self.line, self.end_line) {
            (Some(first), Some(last)) => loc.line >= first && loc.line <= last,
            (Some(line), None) => loc.line == line,
            _ => true,
        }
    }
}

/// The kind of an inline suppression comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InlineSuppressionKind {
    Single,
    Begin,
    End,
}

/// An inline suppression harvested from the token stream by the lexer.
///
/// For `Single`, `line` is the line of the statement the comment precedes.
#[derive(Debug, Clone)]
pub struct InlineSuppression {
    pub id: String,
    pub line: u32,
    pub kind: InlineSuppressionKind,
}

/// The active suppression set.
#[derive(Debug, Clone, Default)]
pub struct Suppressions {
    entries: Vec<Suppression>,
}

impl Suppressions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a whole suppressions file.
    pub fn parse_text(text: &str) -> AnalysisResult<Self> {
        let mut result = Self::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            result.entries.push(Suppression::parse_line(line)?);
        }
        Ok(result)
    }

    pub fn add(&mut self, suppression: Suppression) {
        self.entries.push(suppression);
    }

    /// Folds inline suppressions of one file into the entry list. `Begin`
    /// and `End` markers are paired in order; an unmatched begin suppresses
    /// to the end of the file.
    pub fn add_inline(&mut self, file: &str, inline: &[InlineSuppression]) -> AnalysisResult<()> {
        let mut open: Vec<(String, u32)> = Vec::new();
        for sup in inline {
            match sup.kind {
                InlineSuppressionKind::Single => {
                    self.entries.push(Suppression::new(&sup.id, Some(file), Some(sup.line))?);
                }
                InlineSuppressionKind::Begin => open.push((sup.id.clone(), sup.line)),
                InlineSuppressionKind::End => {
                    if let Some(pos) = open.iter().rposition(|(id, _)| *id == sup.id) {
                        let (id, first) = open.remove(pos);
                        let mut entry = Suppression::new(&id, Some(file), Some(first))?;
                        entry.end_line = Some(sup.line);
                        self.entries.push(entry);
                    }
                }
            }
        }
        for (id, first) in open {
            let mut entry = Suppression::new(&id, Some(file), Some(first))?;
            entry.end_line = Some(u32::MAX);
            self.entries.push(entry);
        }
        Ok(())
    }

    /// Returns the index of the first matching suppression, if any.
    #[must_use]
    pub fn match_message(&self, msg: &ErrorMessage) -> Option<usize> {
        self.entries.iter().position(|s| s.matches(msg))
    }

    #[must_use]
    pub fn entries(&self) -> &[Suppression] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries that never matched, for `unusedSuppression` reporting.
    /// Wildcard-id entries are exempt, matching common usage.
    #[must_use]
    pub fn unused(&self, used: &ahash::AHashSet<usize>) -> Vec<&Suppression> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(i, s)| !used.contains(i) && !s.id.contains('*'))
            .map(|(_, s)| s)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{DiagnosticLocation, Severity};

    fn msg(id: &str, file: &str, line: u32) -> ErrorMessage {
        ErrorMessage::new(id, Severity::Style, "m").with_location(DiagnosticLocation::new(file, line, 1))
    }

    #[test]
    fn parse_and_match() {
        let sups = Suppressions::parse_text("zerodiv\nnullPointer:src/a.c:7\n# comment\n").unwrap();
        assert_eq!(sups.len(), 2);
        assert!(sups.match_message(&msg("zerodiv", "x.c", 1)).is_some());
        assert!(sups.match_message(&msg("nullPointer", "src/a.c", 7)).is_some());
        assert!(sups.match_message(&msg("nullPointer", "src/a.c", 8)).is_none());
    }

    #[test]
    fn wildcards() {
        let sups = Suppressions::parse_text("unusedStruct*\nzerodiv:src/*.c\n").unwrap();
        assert!(sups.match_message(&msg("unusedStructMember", "a.c", 1)).is_some());
        assert!(sups.match_message(&msg("zerodiv", "src/b.c", 12)).is_some());
        assert!(sups.match_message(&msg("zerodiv", "lib/b.c", 12)).is_none());
    }
}
