//! The lexical unit every other structure hangs off.
//!
//! Tokens are owned exclusively by the [`crate::tokenlist::TokenList`] arena;
//! every cross-reference — sequence links, AST links, bracket partners,
//! symbol back-references — is a typed index whose validity is coterminous
//! with the list. Tokens are mutated during tokenization and value-flow,
//! then frozen for the checkers.

use num_bigint::BigInt;

use crate::{
    intern::StringId,
    keywords::Keyword,
    symbols::{ExprId, FunctionId, ScopeId, VarId},
    values::{AbstractValue, ValueData, ValueKind},
    valuetype::ValueType,
};

/// Index into the token arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TokenId(pub(crate) u32);

impl TokenId {
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Lexical classification. The preprocessor supplies the coarse kinds; the
/// tokenizer refines identifiers into type, variable and function names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Identifier,
    Keyword(Keyword),
    IntLiteral,
    FloatLiteral,
    CharLiteral,
    StringLiteral,
    Operator,
    Punctuator,
    TypeName,
    VariableName,
    FunctionName,
}

/// One token. Analysis fields start empty and are filled in by the
/// tokenizer and value-flow phases.
#[derive(Debug)]
pub struct Token {
    pub(crate) spelling: StringId,
    pub kind: TokenKind,
    pub file_index: u32,
    pub line: u32,
    pub column: u32,
    pub from_macro: bool,

    /// Identity of the declared object this token refers to; doubles as the
    /// back-reference into the variable arena.
    pub var_id: Option<VarId>,
    /// Fingerprint of the expression this token roots; equal ids mean
    /// structurally equivalent expressions over the same variables.
    pub expr_id: Option<ExprId>,
    pub function: Option<FunctionId>,
    pub scope: Option<ScopeId>,
    pub value_type: Option<ValueType>,
    /// Abstract values attached by value-flow. Checkers read these; they
    /// never push directly.
    pub values: Vec<AbstractValue>,

    pub ast_parent: Option<TokenId>,
    pub ast_operand1: Option<TokenId>,
    pub ast_operand2: Option<TokenId>,
    /// Partner bracket for `(`, `[`, `{` and their closers.
    pub link: Option<TokenId>,

    pub(crate) next: Option<TokenId>,
    pub(crate) prev: Option<TokenId>,
    /// Position ordinal in the final sequence, assigned once the token
    /// stream is stable.
    pub(crate) order: u32,
}

impl Token {
    pub(crate) fn new(spelling: StringId, kind: TokenKind, file_index: u32, line: u32, column: u32) -> Self {
        Self {
            spelling,
            kind,
            file_index,
            line,
            column,
            from_macro: false,
            var_id: None,
            expr_id: None,
            function: None,
            scope: None,
            value_type: None,
            values: Vec::new(),
            ast_parent: None,
            ast_operand1: None,
            ast_operand2: None,
            link: None,
            next: None,
            prev: None,
            order: 0,
        }
    }

    #[must_use]
    pub fn spelling_id(&self) -> StringId {
        self.spelling
    }

    #[must_use]
    pub fn keyword(&self) -> Option<Keyword> {
        match self.kind {
            TokenKind::Keyword(k) => Some(k),
            _ => None,
        }
    }

    /// Identifier-like tokens: plain identifiers and the refined name kinds.
    #[must_use]
    pub fn is_name(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::Identifier | TokenKind::TypeName | TokenKind::VariableName | TokenKind::FunctionName
        )
    }

    #[must_use]
    pub fn is_number(&self) -> bool {
        matches!(self.kind, TokenKind::IntLiteral | TokenKind::FloatLiteral)
    }

    #[must_use]
    pub fn is_literal(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::IntLiteral
                | TokenKind::FloatLiteral
                | TokenKind::CharLiteral
                | TokenKind::StringLiteral
        ) || matches!(self.keyword(), Some(Keyword::True | Keyword::False))
    }

    #[must_use]
    pub fn is_op(&self) -> bool {
        self.kind == TokenKind::Operator
    }

    /// First Known integer value, if value-flow attached one.
    #[must_use]
    pub fn known_int(&self) -> Option<&BigInt> {
        self.values.iter().find_map(|v| match (&v.data, v.kind) {
            (ValueData::Int(n), ValueKind::Known) => Some(n),
            _ => None,
        })
    }

    /// Any (Known or Possible) integer value equal to `n`, excluding
    /// Impossible entries.
    #[must_use]
    pub fn value_eq_int(&self, n: i64) -> Option<&AbstractValue> {
        let n = BigInt::from(n);
        self.values.iter().find(|v| {
            matches!(v.kind, ValueKind::Known | ValueKind::Possible)
                && matches!(&v.data, ValueData::Int(m) if *m == n)
        })
    }

    #[must_use]
    pub fn has_known_value(&self) -> bool {
        self.values.iter().any(|v| v.kind == ValueKind::Known)
    }

    /// First Known or Possible value of any variant.
    #[must_use]
    pub fn first_usable_value(&self) -> Option<&AbstractValue> {
        self.values
            .iter()
            .find(|v| matches!(v.kind, ValueKind::Known | ValueKind::Possible))
    }
}
