//! argus — a static analyzer for C and C++ source code.
//!
//! The engine runs a single forward pipeline per translation unit:
//! a preprocessed token stream is normalized and linked into a
//! [`tokenlist::TokenList`], symbols are resolved into a
//! [`symbols::SymbolDatabase`], value-flow attaches abstract values to
//! expression tokens, and the registered checkers read the result and emit
//! diagnostics. See [`analyzer::Analyzer`] for the entry point.

#![allow(clippy::must_use_candidate, reason = "query methods are pervasive; annotating each adds noise")]
#![allow(clippy::missing_panics_doc, reason = "arena index panics are internal invariants")]

mod astutils;
mod checkers;
mod errors;
mod intern;
mod keywords;
mod pattern;
mod programmemory;
mod symbols;
mod token;
mod tokenizer;
mod tokenlist;
mod valueflow;
mod values;
mod valuetype;

pub mod analyzer;
pub mod diagnostics;
pub mod library;
pub mod platform;
pub mod pretoken;
pub mod settings;
pub mod suppressions;

pub use crate::{
    analyzer::{Analysis, Analyzer, StopFlag, TuResult, assemble_results},
    astutils::{
        after_statement, call_paren, controlling_keyword, expr_contains_var, expr_root, expr_text, get_arguments,
        is_same_expression,
    },
    checkers::{CheckFailure, Checker, all_checkers},
    diagnostics::{
        Certainty, Colors, CollectingLogger, DiagnosticLocation, ErrorLogger, ErrorMessage, Reporter, Severity,
        SharedLogger,
    },
    errors::{AnalysisError, AnalysisResult},
    intern::{Interner, StringId},
    keywords::Keyword,
    library::{ArgModel, FunctionModel, Library, MinSize},
    pattern::{Pattern, match_tokens},
    platform::{Endianness, Platform},
    pretoken::{KindHint, PreToken, PreTokenStream},
    programmemory::{ExecuteResult, ProgramMemory, assume, condition_is_false, condition_is_true, evaluate, execute_scope},
    settings::{DEFAULT_TEMPLATE, EnabledChecks, Settings},
    suppressions::{InlineSuppression, InlineSuppressionKind, Suppression, Suppressions},
    symbols::{
        ExprId, Function, FunctionId, RecordKind, Scope, ScopeId, ScopeKind, Storage, SymbolDatabase, TypeId,
        UserType, VarId, Variable, Virtuality,
    },
    token::{Token, TokenId, TokenKind},
    tokenizer::{Tokenizer, assign_expr_ids},
    tokenlist::TokenList,
    valuetype::{BaseType, Sign, ValueType},
    values::{AbstractValue, Bound, LifetimeKind, LifetimeScope, ValueData, ValueKind},
};
