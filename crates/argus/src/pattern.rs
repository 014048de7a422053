//! Token pattern matching.
//!
//! Checkers scan the token sequence with small patterns: literal tokens
//! match literally, `%var%` matches an identifier bound to a variable,
//! `%num%` a numeric literal, `%op%` any operator, `%any%` any single
//! token, `|` inside a word is alternation, and `!!x` forbids `x` at that
//! position. The extended classes `%name%`, `%str%`, `%bool%`, `%comp%`
//! and `%varid%` cover the recurring checker idioms.
//!
//! Patterns compile once into a matcher vector; hot call sites keep the
//! compiled [`Pattern`] in a `LazyLock`.

use crate::{
    symbols::VarId,
    token::TokenId,
    tokenlist::TokenList,
};

/// One element of a compiled pattern.
#[derive(Debug, Clone)]
enum PatElem {
    /// Alternation of literal spellings and classes (`a|b|%num%`).
    Any(Vec<PatAtom>),
    /// `!!x` — fails when the token matches; absence of a token matches.
    Not(PatAtom),
}

#[derive(Debug, Clone)]
enum PatAtom {
    Literal(Box<str>),
    Var,
    VarIdBound,
    Num,
    Name,
    Op,
    Comp,
    Str,
    Bool,
    AnyToken,
}

impl PatAtom {
    fn parse(word: &str) -> Self {
        match word {
            "%var%" => Self::Var,
            "%varid%" => Self::VarIdBound,
            "%num%" => Self::Num,
            "%name%" => Self::Name,
            "%op%" => Self::Op,
            "%comp%" => Self::Comp,
            "%str%" => Self::Str,
            "%bool%" => Self::Bool,
            "%any%" => Self::AnyToken,
            lit => Self::Literal(lit.into()),
        }
    }

    fn matches(&self, list: &TokenList, tok: TokenId, varid: Option<VarId>) -> bool {
        let t = list.token(tok);
        match self {
            Self::Literal(lit) => list.str(tok) == &**lit,
            Self::Var => t.var_id.is_some(),
            Self::VarIdBound => varid.is_some() && t.var_id == varid,
            Self::Num => t.is_number(),
            Self::Name => t.is_name() || t.keyword().is_some(),
            Self::Op => t.is_op(),
            Self::Comp => list.is_comparison_op(tok),
            Self::Str => matches!(t.kind, crate::token::TokenKind::StringLiteral),
            Self::Bool => list.is_bool_literal(tok),
            Self::AnyToken => true,
        }
    }
}

/// A compiled token pattern.
#[derive(Debug, Clone)]
pub struct Pattern {
    elems: Vec<PatElem>,
}

impl Pattern {
    /// Compiles a whitespace-separated pattern.
    #[must_use]
    pub fn compile(pattern: &str) -> Self {
        let mut elems = Vec::new();
        for word in pattern.split_whitespace() {
            if let Some(stripped) = word.strip_prefix("!!") {
                elems.push(PatElem::Not(PatAtom::parse(stripped)));
                continue;
            }
            // `|` alternation never splits inside a class word.
            let atoms: Vec<PatAtom> = if word.starts_with('%') && word.ends_with('%') && !word.contains('|') {
                vec![PatAtom::parse(word)]
            } else {
                word.split('|').map(PatAtom::parse).collect()
            };
            elems.push(PatElem::Any(atoms));
        }
        Self { elems }
    }

    /// Matches the pattern against consecutive tokens starting at `start`.
    #[must_use]
    pub fn matches(&self, list: &TokenList, start: TokenId) -> bool {
        self.matches_impl(list, Some(start), None)
    }

    /// Like [`Self::matches`], binding `%varid%` to the given variable.
    #[must_use]
    pub fn matches_varid(&self, list: &TokenList, start: TokenId, varid: VarId) -> bool {
        self.matches_impl(list, Some(start), Some(varid))
    }

    fn matches_impl(&self, list: &TokenList, start: Option<TokenId>, varid: Option<VarId>) -> bool {
        let mut cur = start;
        for elem in &self.elems {
            match elem {
                PatElem::Any(atoms) => {
                    let Some(tok) = cur else { return false };
                    if !atoms.iter().any(|a| a.matches(list, tok, varid)) {
                        return false;
                    }
                    cur = list.next(tok);
                }
                PatElem::Not(atom) => {
                    // A missing token satisfies the negation.
                    let Some(tok) = cur else { continue };
                    if atom.matches(list, tok, varid) {
                        return false;
                    }
                    cur = list.next(tok);
                }
            }
        }
        true
    }
}

/// One-shot match without keeping the compiled pattern.
#[must_use]
pub fn match_tokens(list: &TokenList, start: TokenId, pattern: &str) -> bool {
    Pattern::compile(pattern).matches(list, start)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pretoken::lex;

    fn list(code: &str) -> TokenList {
        TokenList::from_stream(&lex(code, "test.c").unwrap()).unwrap()
    }

    fn first(list: &TokenList) -> TokenId {
        list.front().unwrap()
    }

    #[test]
    fn alternation_with_literal() {
        // Match(tok, "a|b c") is true iff the two consecutive tokens are
        // (`a` or `b`) followed by `c`.
        let l = list("a c");
        assert!(match_tokens(&l, first(&l), "a|b c"));
        let l = list("b c");
        assert!(match_tokens(&l, first(&l), "a|b c"));
        let l = list("x c");
        assert!(!match_tokens(&l, first(&l), "a|b c"));
        let l = list("a d");
        assert!(!match_tokens(&l, first(&l), "a|b c"));
    }

    #[test]
    fn classes() {
        let l = list("x + 3");
        assert!(match_tokens(&l, first(&l), "%name% %op% %num%"));
        assert!(!match_tokens(&l, first(&l), "%num% %op% %num%"));
    }

    #[test]
    fn negation() {
        let l = list("if ( x ) ;");
        assert!(match_tokens(&l, first(&l), "if ( x ) !!else"));
        let l = list("if ( x ) else");
        assert!(!match_tokens(&l, first(&l), "if ( x ) !!else"));
        // Negation at the end of input matches.
        let l = list("if ( x )");
        assert!(match_tokens(&l, first(&l), "if ( x ) !!else"));
    }

    #[test]
    fn pattern_runs_past_end() {
        let l = list("a b");
        assert!(!match_tokens(&l, first(&l), "a b c"));
    }
}
