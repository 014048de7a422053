//! The per-TU analysis driver.
//!
//! One [`Analyzer`] holds the immutable settings and the shared stop flag;
//! each call to [`Analyzer::analyze_source`] runs the full pipeline —
//! lexing, tokenization, value-flow, checkers — over one translation unit
//! and returns its filtered, source-ordered diagnostics. TUs own all of
//! their state exclusively, so a driver may fan analyses out across
//! threads; only the logger sink and the configuration are shared.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use ahash::AHashSet;

use crate::{
    checkers,
    diagnostics::{ErrorLogger, ErrorMessage, Reporter, Severity},
    errors::AnalysisError,
    pretoken::{self, PreTokenStream},
    settings::Settings,
    suppressions::Suppressions,
    symbols::SymbolDatabase,
    tokenizer::Tokenizer,
    tokenlist::TokenList,
    valueflow,
};

/// Cooperative cancellation: the driver sets the flag, the analysis polls
/// it at phase boundaries and at the top of every value-flow round.
#[derive(Debug, Clone, Default)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// The analyzed TU handed to checkers: read-only tokens and symbols.
#[derive(Debug)]
pub struct Analysis {
    pub tokens: TokenList,
    pub symbols: SymbolDatabase,
}

/// Result of analyzing one translation unit.
#[derive(Debug)]
pub struct TuResult {
    /// Filtered diagnostics in source order.
    pub diagnostics: Vec<ErrorMessage>,
    /// Indices into the TU's suppression set that matched something.
    pub used_suppressions: AHashSet<usize>,
    /// The suppression set the TU ran with (file entries plus inline).
    pub suppressions: Suppressions,
    /// The analysis survives for callers that want to inspect it.
    pub analysis: Option<Analysis>,
}

#[derive(Debug, Default)]
pub struct Analyzer {
    settings: Settings,
    stop: StopFlag,
}

impl Analyzer {
    #[must_use]
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            stop: StopFlag::new(),
        }
    }

    #[must_use]
    pub fn with_stop_flag(mut self, stop: StopFlag) -> Self {
        self.stop = stop;
        self
    }

    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Lexes raw source through the reference lexer and analyzes it.
    #[must_use]
    pub fn analyze_source(&self, path: &str, code: &str) -> TuResult {
        match pretoken::lex(code, path) {
            Ok(stream) => self.analyze_stream(&stream),
            Err(err) => fatal_result(&err, self.settings.suppressions.clone()),
        }
    }

    /// Analyzes a preprocessed token stream (the upstream contract).
    #[must_use]
    pub fn analyze_stream(&self, stream: &PreTokenStream) -> TuResult {
        // Per-TU suppressions: the configured set plus the stream's inline
        // markers.
        let mut suppressions = self.settings.suppressions.clone();
        let file = stream.files.first().map_or("", String::as_str);
        // Malformed inline markers never abort the TU.
        let _ = suppressions.add_inline(file, &stream.inline_suppressions);
        let mut reporter = Reporter::new(&self.settings, &suppressions);

        let analysis = match self.run_pipeline(stream, &mut reporter) {
            Ok(analysis) => Some(analysis),
            Err(err) => {
                reporter.report(err.to_diagnostic());
                None
            }
        };
        let used_suppressions = reporter.used_suppressions.clone();
        TuResult {
            diagnostics: reporter.into_messages(),
            used_suppressions,
            suppressions,
            analysis,
        }
    }

    fn run_pipeline(&self, stream: &PreTokenStream, reporter: &mut Reporter<'_>) -> Result<Analysis, AnalysisError> {
        let tokenizer = Tokenizer::tokenize(stream, &self.settings, reporter, &self.stop)?;
        let Tokenizer {
            mut list,
            symbols,
        } = tokenizer;
        valueflow::run(&mut list, &symbols, &self.settings, reporter, &self.stop)?;
        let analysis = Analysis {
            tokens: list,
            symbols,
        };
        checkers::run_all(&analysis, &self.settings, reporter, &self.stop)?;
        Ok(analysis)
    }
}

fn fatal_result(err: &AnalysisError, suppressions: Suppressions) -> TuResult {
    TuResult {
        diagnostics: vec![err.to_diagnostic()],
        used_suppressions: AHashSet::new(),
        suppressions,
        analysis: None,
    }
}

/// Cross-TU assembly: orders results by file path, drops repeats of
/// file-independent diagnostics, and appends `unusedSuppression` notes for
/// entries that never fired anywhere.
#[must_use]
pub fn assemble_results(mut results: Vec<(String, TuResult)>, settings: &Settings) -> Vec<ErrorMessage> {
    results.sort_by(|a, b| a.0.cmp(&b.0));
    let mut seen: AHashSet<String> = AHashSet::new();
    let mut out = Vec::new();
    let mut used_global: AHashSet<usize> = AHashSet::new();
    for (_, result) in &results {
        for msg in &result.diagnostics {
            if !seen.insert(msg.dedup_key()) {
                continue;
            }
            out.push(msg.clone());
        }
        // Only indices into the shared (configured) prefix aggregate.
        for &index in &result.used_suppressions {
            if index < settings.suppressions.len() {
                used_global.insert(index);
            }
        }
    }
    if settings.is_enabled(Severity::Information) {
        for unused in settings.suppressions.unused(&used_global) {
            out.push(ErrorMessage::new(
                "unusedSuppression",
                Severity::Information,
                format!("Unmatched suppression: {}", unused.id),
            ));
        }
    }
    out
}
