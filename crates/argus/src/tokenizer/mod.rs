//! The tokenizer pipeline.
//!
//! Takes a preprocessed token stream and produces a fully linked,
//! classified token list plus the symbol database, ready for value-flow.
//! Phases run strictly in order; each either succeeds or raises a
//! classified error that abandons the TU.

mod ast;
mod normalize;
mod templates;

pub use ast::assign_expr_ids;

use crate::{
    analyzer::StopFlag,
    diagnostics::ErrorLogger,
    errors::{AnalysisError, AnalysisResult},
    pretoken::PreTokenStream,
    settings::Settings,
    symbols::SymbolDatabase,
    tokenlist::TokenList,
};

/// Result of tokenization: the finished token list and its symbols.
#[derive(Debug)]
pub struct Tokenizer {
    pub list: TokenList,
    pub symbols: SymbolDatabase,
}

impl Tokenizer {
    /// Runs the full phase sequence:
    /// bracket linking → syntax normalization → template instantiation →
    /// scope/variable/function discovery → AST construction → expression
    /// ids → type resolution.
    pub fn tokenize(
        stream: &PreTokenStream,
        settings: &Settings,
        logger: &mut dyn ErrorLogger,
        stop: &StopFlag,
    ) -> AnalysisResult<Self> {
        let mut list = TokenList::from_stream(stream)?;
        list.link_brackets()?;
        stop.check()?;

        normalize::simplify(&mut list, settings)?;
        stop.check()?;

        templates::instantiate(&mut list, settings, logger)?;
        stop.check()?;

        let symbols = SymbolDatabase::build(&mut list, settings, logger)?;
        stop.check()?;

        ast::build_ast(&mut list, &symbols)?;
        ast::assign_expr_ids(&mut list);
        ast::resolve_value_types(&mut list, &symbols, settings);
        list.assign_order();
        stop.check()?;

        Ok(Self {
            list,
            symbols,
        })
    }
}

impl StopFlag {
    /// Polled at phase boundaries; a set flag aborts the TU cleanly.
    pub(crate) fn check(&self) -> AnalysisResult<()> {
        if self.is_set() { Err(AnalysisError::Aborted) } else { Ok(()) }
    }
}
