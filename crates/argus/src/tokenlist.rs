//! The ordered token sequence and its owning arena.
//!
//! The list is a doubly linked sequence threaded through an arena `Vec`;
//! unlinked tokens leave tombstone slots behind so that ids held elsewhere
//! never dangle. The list also owns the spelling interner and the file
//! table, making it the single source of truth for source order and text.

use num_bigint::BigInt;

use crate::{
    diagnostics::DiagnosticLocation,
    errors::{AnalysisError, AnalysisResult},
    intern::{Interner, StringId},
    keywords::Keyword,
    pretoken::{KindHint, PreTokenStream},
    token::{Token, TokenId, TokenKind},
};

#[derive(Debug, Default)]
pub struct TokenList {
    tokens: Vec<Token>,
    head: Option<TokenId>,
    tail: Option<TokenId>,
    interner: Interner,
    files: Vec<String>,
}

impl TokenList {
    #[must_use]
    pub fn new(files: Vec<String>) -> Self {
        Self {
            files,
            ..Self::default()
        }
    }

    /// Builds the initial list from the preprocessor stream, assigning
    /// lexical classifications.
    pub fn from_stream(stream: &PreTokenStream) -> AnalysisResult<Self> {
        let mut list = Self::new(stream.files.clone());
        for pre in &stream.tokens {
            let kind = match pre.kind_hint {
                KindHint::Identifier => match Keyword::recognize(&pre.spelling) {
                    Some(k) => TokenKind::Keyword(k),
                    None => TokenKind::Identifier,
                },
                KindHint::Number => {
                    if is_float_spelling(&pre.spelling) {
                        TokenKind::FloatLiteral
                    } else {
                        TokenKind::IntLiteral
                    }
                }
                KindHint::CharLiteral => TokenKind::CharLiteral,
                KindHint::StringLiteral => TokenKind::StringLiteral,
                KindHint::Operator => TokenKind::Operator,
                KindHint::Punctuator => TokenKind::Punctuator,
            };
            let id = list.append(&pre.spelling, kind, pre.file_index, pre.line, pre.column);
            list.token_mut(id).from_macro = pre.from_macro;
        }
        if list.files.is_empty() {
            return Err(AnalysisError::BadConfig {
                message: "token stream without a file table".to_owned(),
            });
        }
        Ok(list)
    }

    // ---- arena access ----

    #[inline]
    #[must_use]
    pub fn token(&self, id: TokenId) -> &Token {
        &self.tokens[id.index()]
    }

    #[inline]
    pub fn token_mut(&mut self, id: TokenId) -> &mut Token {
        &mut self.tokens[id.index()]
    }

    #[must_use]
    pub fn str(&self, id: TokenId) -> &str {
        self.interner.get(self.token(id).spelling_id())
    }

    /// True when the token's spelling is exactly `s`.
    #[must_use]
    pub fn is(&self, id: TokenId, s: &str) -> bool {
        self.str(id) == s
    }

    pub fn intern(&mut self, s: &str) -> StringId {
        self.interner.intern(s)
    }

    /// Rewrites a token's spelling in place. The kind is left to the
    /// caller.
    pub fn set_str(&mut self, id: TokenId, s: &str) {
        let spelling = self.interner.intern(s);
        self.token_mut(id).spelling = spelling;
    }

    #[must_use]
    pub fn interned_str(&self, id: StringId) -> &str {
        self.interner.get(id)
    }

    #[must_use]
    pub fn file_name(&self, index: u32) -> &str {
        self.files.get(index as usize).map_or("", String::as_str)
    }

    #[must_use]
    pub fn files(&self) -> &[String] {
        &self.files
    }

    #[must_use]
    pub fn location(&self, id: TokenId) -> DiagnosticLocation {
        let tok = self.token(id);
        DiagnosticLocation::new(self.file_name(tok.file_index), tok.line, tok.column)
    }

    // ---- navigation ----

    #[must_use]
    pub fn front(&self) -> Option<TokenId> {
        self.head
    }

    #[must_use]
    pub fn back(&self) -> Option<TokenId> {
        self.tail
    }

    #[inline]
    #[must_use]
    pub fn next(&self, id: TokenId) -> Option<TokenId> {
        self.token(id).next
    }

    #[inline]
    #[must_use]
    pub fn prev(&self, id: TokenId) -> Option<TokenId> {
        self.token(id).prev
    }

    /// Token `n` positions away; negative offsets walk backwards.
    #[must_use]
    pub fn at(&self, id: TokenId, n: i32) -> Option<TokenId> {
        let mut cur = Some(id);
        if n >= 0 {
            for _ in 0..n {
                cur = cur.and_then(|t| self.next(t));
            }
        } else {
            for _ in 0..-n {
                cur = cur.and_then(|t| self.prev(t));
            }
        }
        cur
    }

    #[must_use]
    pub fn str_at(&self, id: TokenId, n: i32) -> Option<&str> {
        self.at(id, n).map(|t| self.str(t))
    }

    /// Forward iterator over live tokens.
    #[must_use]
    pub fn tokens(&self) -> TokenIter<'_> {
        TokenIter {
            list: self,
            cur: self.head,
        }
    }

    /// Position ordinal; meaningful once [`Self::assign_order`] has run.
    #[must_use]
    pub fn order_of(&self, id: TokenId) -> u32 {
        self.token(id).order
    }

    // ---- construction and surgery ----

    pub fn append(&mut self, spelling: &str, kind: TokenKind, file_index: u32, line: u32, column: u32) -> TokenId {
        let spelling = self.interner.intern(spelling);
        let id = TokenId(u32::try_from(self.tokens.len()).unwrap_or(u32::MAX));
        let mut tok = Token::new(spelling, kind, file_index, line, column);
        tok.prev = self.tail;
        self.tokens.push(tok);
        match self.tail {
            Some(tail) => self.token_mut(tail).next = Some(id),
            None => self.head = Some(id),
        }
        self.tail = Some(id);
        id
    }

    /// Inserts a synthesized token after `after`, inheriting its location.
    pub fn insert_after(&mut self, after: TokenId, spelling: &str, kind: TokenKind) -> TokenId {
        let spelling = self.interner.intern(spelling);
        let (file_index, line, column, scope) = {
            let t = self.token(after);
            (t.file_index, t.line, t.column, t.scope)
        };
        let id = TokenId(u32::try_from(self.tokens.len()).unwrap_or(u32::MAX));
        let mut tok = Token::new(spelling, kind, file_index, line, column);
        tok.scope = scope;
        tok.prev = Some(after);
        tok.next = self.token(after).next;
        self.tokens.push(tok);
        if let Some(next) = self.token(id).next {
            self.token_mut(next).prev = Some(id);
        } else {
            self.tail = Some(id);
        }
        self.token_mut(after).next = Some(id);
        id
    }

    /// Inserts a synthesized token before `before`.
    pub fn insert_before(&mut self, before: TokenId, spelling: &str, kind: TokenKind) -> TokenId {
        match self.prev(before) {
            Some(prev) => self.insert_after(prev, spelling, kind),
            None => {
                let spelling = self.interner.intern(spelling);
                let (file_index, line, column) = {
                    let t = self.token(before);
                    (t.file_index, t.line, t.column)
                };
                let id = TokenId(u32::try_from(self.tokens.len()).unwrap_or(u32::MAX));
                let mut tok = Token::new(spelling, kind, file_index, line, column);
                tok.next = Some(before);
                self.tokens.push(tok);
                self.token_mut(before).prev = Some(id);
                self.head = Some(id);
                id
            }
        }
    }

    /// Removes a token from the sequence. Removing a bracket also removes
    /// its partner, nulling both `link` pointers first so the matched-pair
    /// invariant never observes a half-removed pair.
    pub fn remove(&mut self, id: TokenId) {
        if let Some(partner) = self.token(id).link {
            self.token_mut(partner).link = None;
            self.token_mut(id).link = None;
            self.unlink(partner);
        }
        self.unlink(id);
    }

    /// Removes the whole `[first, last]` range. Bracket pairs fully inside
    /// the range lose their links before detaching, so the pair invariant
    /// never observes a half-removed bracket.
    pub fn remove_range(&mut self, first: TokenId, last: TokenId) {
        let mut ids = Vec::new();
        let mut cur = Some(first);
        while let Some(id) = cur {
            ids.push(id);
            if id == last {
                break;
            }
            cur = self.next(id);
        }
        for &id in &ids {
            if let Some(partner) = self.token(id).link {
                self.token_mut(partner).link = None;
                self.token_mut(id).link = None;
            }
        }
        for &id in &ids {
            self.unlink(id);
        }
    }

    fn unlink(&mut self, id: TokenId) {
        let (prev, next) = {
            let t = self.token(id);
            (t.prev, t.next)
        };
        match prev {
            Some(p) => self.token_mut(p).next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.token_mut(n).prev = prev,
            None => self.tail = prev,
        }
        let t = self.token_mut(id);
        t.next = None;
        t.prev = None;
    }

    /// Pairs `()`, `[]` and `{}` with a stack pass. Imbalance is a fatal
    /// syntax error.
    pub fn link_brackets(&mut self) -> AnalysisResult<()> {
        let mut stack: Vec<TokenId> = Vec::new();
        let mut cur = self.head;
        while let Some(id) = cur {
            let s = self.str(id);
            match s {
                "(" | "[" | "{" => stack.push(id),
                ")" | "]" | "}" => {
                    let expected = match s {
                        ")" => "(",
                        "]" => "[",
                        _ => "{",
                    };
                    let Some(open) = stack.pop() else {
                        return Err(self.syntax_error(id, format!("unmatched '{s}'")));
                    };
                    if self.str(open) != expected {
                        let found = self.str(open).to_owned();
                        return Err(self.syntax_error(id, format!("mismatched '{found}' closed by '{s}'")));
                    }
                    self.token_mut(open).link = Some(id);
                    self.token_mut(id).link = Some(open);
                }
                _ => {}
            }
            cur = self.next(id);
        }
        if let Some(open) = stack.pop() {
            let s = self.str(open).to_owned();
            return Err(self.syntax_error(open, format!("unmatched '{s}'")));
        }
        Ok(())
    }

    /// Stamps position ordinals onto the live sequence.
    pub fn assign_order(&mut self) {
        let mut order = 0u32;
        let mut cur = self.head;
        while let Some(id) = cur {
            self.token_mut(id).order = order;
            order += 1;
            cur = self.next(id);
        }
    }

    pub(crate) fn syntax_error(&self, at: TokenId, message: String) -> AnalysisError {
        let tok = self.token(at);
        AnalysisError::Syntax {
            file: self.file_name(tok.file_index).to_owned(),
            line: tok.line,
            column: tok.column,
            message,
        }
    }

    // ---- classification helpers ----

    #[must_use]
    pub fn is_comparison_op(&self, id: TokenId) -> bool {
        self.token(id).is_op() && matches!(self.str(id), "==" | "!=" | "<" | "<=" | ">" | ">=")
    }

    #[must_use]
    pub fn is_assignment_op(&self, id: TokenId) -> bool {
        self.token(id).is_op()
            && matches!(
                self.str(id),
                "=" | "+=" | "-=" | "*=" | "/=" | "%=" | "&=" | "|=" | "^=" | "<<=" | ">>="
            )
    }

    #[must_use]
    pub fn is_bool_literal(&self, id: TokenId) -> bool {
        matches!(self.token(id).keyword(), Some(Keyword::True | Keyword::False))
    }

    /// Literal sequence match: every word of `pattern` must equal the
    /// spelling of the corresponding token.
    #[must_use]
    pub fn simple_match(&self, start: TokenId, pattern: &str) -> bool {
        let mut cur = Some(start);
        for word in pattern.split_whitespace() {
            match cur {
                Some(id) if self.is(id, word) => cur = self.next(id),
                _ => return false,
            }
        }
        true
    }

    // ---- literal parsing ----

    /// Integer value of an integer or character literal.
    #[must_use]
    pub fn int_literal_value(&self, id: TokenId) -> Option<BigInt> {
        let tok = self.token(id);
        match tok.kind {
            TokenKind::IntLiteral => parse_int_literal(self.str(id)),
            TokenKind::CharLiteral => parse_char_literal(self.str(id)),
            TokenKind::Keyword(Keyword::True) => Some(BigInt::from(1)),
            TokenKind::Keyword(Keyword::False) => Some(BigInt::from(0)),
            _ => None,
        }
    }

    #[must_use]
    pub fn float_literal_value(&self, id: TokenId) -> Option<f64> {
        if self.token(id).kind != TokenKind::FloatLiteral {
            return None;
        }
        let s: String = self
            .str(id)
            .trim_end_matches(['f', 'F', 'l', 'L'])
            .chars()
            .filter(|c| *c != '\'')
            .collect();
        s.parse().ok()
    }

    /// Unescaped content of a string literal, without the quotes.
    #[must_use]
    pub fn string_literal_content(&self, id: TokenId) -> Option<String> {
        if self.token(id).kind != TokenKind::StringLiteral {
            return None;
        }
        let s = self.str(id);
        let inner = s.strip_prefix('"')?.strip_suffix('"')?;
        Some(unescape(inner))
    }
}

/// Forward iterator over live token ids.
pub struct TokenIter<'a> {
    list: &'a TokenList,
    cur: Option<TokenId>,
}

impl Iterator for TokenIter<'_> {
    type Item = TokenId;

    fn next(&mut self) -> Option<TokenId> {
        let id = self.cur?;
        self.cur = self.list.next(id);
        Some(id)
    }
}

fn is_float_spelling(s: &str) -> bool {
    let lower = s.to_ascii_lowercase();
    if lower.starts_with("0x") {
        return lower.contains('p');
    }
    lower.contains('.') || lower.contains('e') || lower.ends_with('f')
}

fn parse_int_literal(s: &str) -> Option<BigInt> {
    let cleaned: String = s.chars().filter(|c| *c != '\'').collect();
    let trimmed = cleaned.trim_end_matches(['u', 'U', 'l', 'L', 'z', 'Z']);
    if let Some(hex) = trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
        return BigInt::parse_bytes(hex.as_bytes(), 16);
    }
    if let Some(bin) = trimmed.strip_prefix("0b").or_else(|| trimmed.strip_prefix("0B")) {
        return BigInt::parse_bytes(bin.as_bytes(), 2);
    }
    if trimmed.len() > 1 && trimmed.starts_with('0') {
        return BigInt::parse_bytes(trimmed[1..].as_bytes(), 8);
    }
    BigInt::parse_bytes(trimmed.as_bytes(), 10)
}

fn parse_char_literal(s: &str) -> Option<BigInt> {
    let inner = s.strip_prefix('\'')?.strip_suffix('\'')?;
    let unescaped = unescape(inner);
    unescaped.chars().next().map(|c| BigInt::from(c as u32))
}

fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some('\\') => out.push('\\'),
            Some('\'') => out.push('\''),
            Some('"') => out.push('"'),
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pretoken::lex;

    fn list(code: &str) -> TokenList {
        TokenList::from_stream(&lex(code, "test.c").unwrap()).unwrap()
    }

    #[test]
    fn bracket_linking() {
        let mut l = list("void f() { int a[3]; }");
        l.link_brackets().unwrap();
        let open_brace = l.tokens().find(|&t| l.is(t, "{")).unwrap();
        let close = l.token(open_brace).link.unwrap();
        assert!(l.is(close, "}"));
        assert_eq!(l.token(close).link, Some(open_brace));
    }

    #[test]
    fn bracket_imbalance_is_fatal() {
        let mut l = list("void f() { int a; ");
        assert!(l.link_brackets().is_err());
        let mut l = list("void f() ) {}");
        assert!(l.link_brackets().is_err());
    }

    #[test]
    fn remove_bracket_removes_partner() {
        let mut l = list("a ( b ) c");
        l.link_brackets().unwrap();
        let open = l.tokens().find(|&t| l.is(t, "(")).unwrap();
        l.remove(open);
        let spellings: Vec<&str> = l.tokens().map(|t| l.str(t)).collect();
        assert_eq!(spellings, ["a", "b", "c"]);
    }

    #[test]
    fn int_literal_parsing() {
        let l = list("0x1f 017 42 0b101 10'000 7ULL");
        let values: Vec<Option<BigInt>> = l.tokens().map(|t| l.int_literal_value(t)).collect();
        let expect: Vec<i64> = vec![31, 15, 42, 5, 10000, 7];
        for (v, e) in values.iter().zip(expect) {
            assert_eq!(v.as_ref().unwrap(), &BigInt::from(e));
        }
    }

    #[test]
    fn float_classification() {
        let l = list("1.5 2e10 0x1p3 42");
        let kinds: Vec<TokenKind> = l.tokens().map(|t| l.token(t).kind).collect();
        assert_eq!(
            kinds,
            [
                TokenKind::FloatLiteral,
                TokenKind::FloatLiteral,
                TokenKind::FloatLiteral,
                TokenKind::IntLiteral
            ]
        );
    }
}
