//! AST construction on top of the token sequence.
//!
//! Expressions get their shape from operator precedence, not source order:
//! a precedence-climbing parser writes `ast_operand1`/`ast_operand2` and
//! `ast_parent` links directly onto the tokens. No separate nodes exist;
//! every AST position is a token with a source location.
//!
//! This module also assigns hash-consed expression ids (two tokens share an
//! id iff their operator trees are structurally identical over the same
//! variables or literals) and resolves expression types bottom-up.

use ahash::AHashMap;

use crate::{
    errors::AnalysisResult,
    keywords::Keyword,
    settings::Settings,
    symbols::{ExprId, SymbolDatabase, parse_value_type},
    token::{TokenId, TokenKind},
    tokenlist::TokenList,
    valuetype::{BaseType, Sign, ValueType},
};

/// Binding power of a prefix operator's operand.
const PREFIX_BP: u8 = 27;

/// Left/right binding powers of the binary and ternary operators.
fn infix_binding_power(op: &str) -> Option<(u8, u8)> {
    Some(match op {
        "::" => (30, 31),
        "*" | "/" | "%" => (25, 26),
        "+" | "-" => (23, 24),
        "<<" | ">>" => (21, 22),
        "<" | "<=" | ">" | ">=" => (19, 20),
        "==" | "!=" => (17, 18),
        "&" => (15, 16),
        "^" => (13, 14),
        "|" => (11, 12),
        "&&" => (9, 10),
        "||" => (7, 8),
        "?" => (6, 5),
        "=" | "+=" | "-=" | "*=" | "/=" | "%=" | "&=" | "|=" | "^=" | "<<=" | ">>=" => (4, 3),
        "," => (1, 2),
        _ => return None,
    })
}

pub(super) fn build_ast(list: &mut TokenList, db: &SymbolDatabase) -> AnalysisResult<()> {
    let ids: Vec<TokenId> = list.tokens().collect();
    for id in ids {
        match list.token(id).keyword() {
            Some(Keyword::If | Keyword::While | Keyword::Switch) => {
                if let Some(paren) = list.next(id)
                    && list.is(paren, "(")
                    && let Some(close) = list.token(paren).link
                    && let Some(start) = list.next(paren)
                {
                    parse_range(list, start, close);
                }
            }
            Some(Keyword::For) => {
                if let Some(paren) = list.next(id)
                    && list.is(paren, "(")
                    && let Some(close) = list.token(paren).link
                {
                    parse_for_head(list, db, paren, close);
                }
            }
            Some(Keyword::Return) => {
                if let Some(start) = list.next(id)
                    && !list.is(start, ";")
                    && let Some(end) = statement_semicolon(list, start)
                    && let Some(root) = parse_range(list, start, end)
                {
                    list.token_mut(id).ast_operand1 = Some(root);
                    list.token_mut(root).ast_parent = Some(id);
                }
            }
            _ => {
                if is_expression_statement_start(list, db, id)
                    && let Some(end) = statement_semicolon(list, id)
                {
                    let start = declaration_parse_start(list, db, id, end);
                    if let Some(start) = start {
                        parse_range(list, start, end);
                    }
                }
            }
        }
    }
    Ok(())
}

/// The `;` ending the plain statement that starts at `start`, or `None`
/// when the statement runs into a brace instead.
fn statement_semicolon(list: &TokenList, start: TokenId) -> Option<TokenId> {
    let mut cur = Some(start);
    while let Some(t) = cur {
        match list.str(t) {
            ";" => return Some(t),
            "}" => return None,
            "(" | "[" | "{" => {
                cur = list.token(t).link.and_then(|l| list.next(l));
            }
            _ => cur = list.next(t),
        }
    }
    None
}

fn is_expression_statement_start(list: &TokenList, db: &SymbolDatabase, id: TokenId) -> bool {
    let tok = list.token(id);
    let Some(scope) = tok.scope else { return false };
    if !db.scope(scope).kind.is_executable() {
        return false;
    }
    let at_start = match list.prev(id) {
        None => false,
        Some(p) => matches!(list.str(p), ";" | "{" | "}"),
    };
    if !at_start {
        return false;
    }
    if matches!(list.str(id), ";" | "{" | "}") {
        return false;
    }
    match tok.keyword() {
        None => true,
        // Statements may begin with these inside an expression.
        Some(Keyword::Sizeof | Keyword::Alignof | Keyword::This | Keyword::New | Keyword::Delete) => true,
        Some(k) if k.is_type_specifier() || k.is_decl_qualifier() => true,
        Some(_) => false,
    }
}

/// For a declaration statement, the expression starts at the declared name
/// (`int x = 3 ;` parses `x = 3`); a declaration without an initializer has
/// no expression. Plain statements parse from their first token.
fn declaration_parse_start(list: &TokenList, db: &SymbolDatabase, start: TokenId, end: TokenId) -> Option<TokenId> {
    let mut cur = Some(start);
    while let Some(t) = cur {
        if t == end {
            break;
        }
        if let Some(vid) = list.token(t).var_id
            && db.variable(vid).name_token == t
        {
            // Declared name: expression only when initialized.
            let mut after = list.next(t);
            // Skip array extents.
            while let Some(a) = after {
                if list.is(a, "[")
                    && let Some(close) = list.token(a).link
                {
                    after = list.next(close);
                } else {
                    break;
                }
            }
            return match after {
                Some(a) if list.is(a, "=") => Some(t),
                _ => None,
            };
        }
        cur = list.next(t);
    }
    Some(start)
}

/// `for ( init ; cond ; post )` — parses the three head regions
/// independently; the condition and post-expression keep their own AST
/// roots addressable from the head.
fn parse_for_head(list: &mut TokenList, db: &SymbolDatabase, paren: TokenId, close: TokenId) {
    // Top-level semicolons inside the head.
    let mut semis = Vec::new();
    let mut cur = list.next(paren);
    while let Some(t) = cur {
        if t == close {
            break;
        }
        match list.str(t) {
            ";" => semis.push(t),
            "(" | "[" | "{" => {
                cur = list.token(t).link.and_then(|l| list.next(l));
                continue;
            }
            _ => {}
        }
        cur = list.next(t);
    }
    if semis.len() != 2 {
        // Range-for or malformed; parse the whole head as one expression.
        if let Some(start) = list.next(paren)
            && start != close
        {
            parse_range(list, start, close);
        }
        return;
    }
    let regions = [
        (list.next(paren), semis[0]),
        (list.next(semis[0]), semis[1]),
        (list.next(semis[1]), close),
    ];
    for (start, end) in regions {
        let Some(start) = start else { continue };
        if start == end {
            continue;
        }
        if let Some(expr_start) = declaration_parse_start(list, db, start, end) {
            parse_range(list, expr_start, end);
        }
    }
}

/// Parses one expression in `[start, stop)` and returns the root.
fn parse_range(list: &mut TokenList, start: TokenId, stop: TokenId) -> Option<TokenId> {
    let mut parser = Parser {
        list,
        cur: Some(start),
        stop,
    };
    parser.parse_expr(0)
}

struct Parser<'a> {
    list: &'a mut TokenList,
    cur: Option<TokenId>,
    stop: TokenId,
}

impl Parser<'_> {
    fn peek(&self) -> Option<TokenId> {
        self.cur.filter(|&c| c != self.stop)
    }

    fn bump(&mut self) -> Option<TokenId> {
        let t = self.peek()?;
        self.cur = self.list.next(t);
        Some(t)
    }

    fn set_unary(&mut self, op: TokenId, operand: TokenId) {
        self.list.token_mut(op).ast_operand1 = Some(operand);
        self.list.token_mut(operand).ast_parent = Some(op);
    }

    fn set_binary(&mut self, op: TokenId, lhs: TokenId, rhs: TokenId) {
        self.list.token_mut(op).ast_operand1 = Some(lhs);
        self.list.token_mut(op).ast_operand2 = Some(rhs);
        self.list.token_mut(lhs).ast_parent = Some(op);
        self.list.token_mut(rhs).ast_parent = Some(op);
    }

    fn parse_expr(&mut self, min_bp: u8) -> Option<TokenId> {
        let mut lhs = self.parse_primary()?;
        loop {
            let Some(op) = self.peek() else { break };
            let op_str = self.list.str(op).to_owned();
            // Postfix forms bind tightest.
            match op_str.as_str() {
                "(" => {
                    let close = self.list.token(op).link?;
                    self.bump();
                    let args = if self.peek().is_some_and(|t| t != close) {
                        let mut inner = Parser {
                            list: &mut *self.list,
                            cur: Some(self.cur?),
                            stop: close,
                        };
                        inner.parse_expr(0)
                    } else {
                        None
                    };
                    match args {
                        Some(args) => self.set_binary(op, lhs, args),
                        None => self.set_unary(op, lhs),
                    }
                    self.cur = self.list.next(close);
                    lhs = op;
                    continue;
                }
                "[" => {
                    let close = self.list.token(op).link?;
                    self.bump();
                    let index = {
                        let mut inner = Parser {
                            list: &mut *self.list,
                            cur: self.cur,
                            stop: close,
                        };
                        inner.parse_expr(0)
                    };
                    match index {
                        Some(index) => self.set_binary(op, lhs, index),
                        None => self.set_unary(op, lhs),
                    }
                    self.cur = self.list.next(close);
                    lhs = op;
                    continue;
                }
                "." | "->" => {
                    self.bump();
                    let member = self.bump()?;
                    self.set_binary(op, lhs, member);
                    lhs = op;
                    continue;
                }
                "++" | "--" => {
                    // Postfix increment/decrement.
                    self.bump();
                    self.set_unary(op, lhs);
                    lhs = op;
                    continue;
                }
                _ => {}
            }
            let Some((l_bp, r_bp)) = infix_binding_power(&op_str) else {
                break;
            };
            if l_bp < min_bp {
                break;
            }
            self.bump();
            if op_str == "?" {
                // cond ? a : b — the `:` token holds the branches.
                let mid = self.parse_expr(0)?;
                let colon = self.peek().filter(|&c| self.list.is(c, ":"))?;
                self.bump();
                let rhs = self.parse_expr(r_bp)?;
                self.set_binary(colon, mid, rhs);
                self.set_binary(op, lhs, colon);
                lhs = op;
                continue;
            }
            let rhs = self.parse_expr(r_bp)?;
            self.set_binary(op, lhs, rhs);
            lhs = op;
        }
        Some(lhs)
    }

    fn parse_primary(&mut self) -> Option<TokenId> {
        let t = self.peek()?;
        let s = self.list.str(t).to_owned();
        match s.as_str() {
            "!" | "~" | "+" | "-" | "*" | "&" | "++" | "--" => {
                self.bump();
                let operand = self.parse_expr(PREFIX_BP)?;
                self.set_unary(t, operand);
                return Some(t);
            }
            "(" => {
                let close = self.list.token(t).link?;
                if self.is_cast(t, close) {
                    self.bump();
                    self.cur = self.list.next(close);
                    let operand = self.parse_expr(PREFIX_BP)?;
                    self.set_unary(t, operand);
                    return Some(t);
                }
                // Grouping parentheses vanish from the tree.
                self.bump();
                let inner = {
                    let mut p = Parser {
                        list: &mut *self.list,
                        cur: self.cur,
                        stop: close,
                    };
                    p.parse_expr(0)
                };
                self.cur = self.list.next(close);
                return inner;
            }
            "{" => {
                // Brace initializer: an opaque leaf.
                let close = self.list.token(t).link?;
                self.cur = self.list.next(close);
                return Some(t);
            }
            _ => {}
        }
        match self.list.token(t).keyword() {
            Some(Keyword::Sizeof | Keyword::Alignof) => {
                self.bump();
                if let Some(paren) = self.peek().filter(|&p| self.list.is(p, "(")) {
                    let close = self.list.token(paren).link?;
                    if self.is_cast(paren, close) {
                        // sizeof(type): the operand tokens stay linked to
                        // the parens; folding reads them in place.
                        self.cur = self.list.next(close);
                        return Some(t);
                    }
                    self.cur = self.list.next(paren);
                    let inner = {
                        let mut p = Parser {
                            list: &mut *self.list,
                            cur: self.cur,
                            stop: close,
                        };
                        p.parse_expr(0)
                    };
                    self.cur = self.list.next(close);
                    if let Some(inner) = inner {
                        self.set_unary(t, inner);
                    }
                    return Some(t);
                }
                let operand = self.parse_expr(PREFIX_BP)?;
                self.set_unary(t, operand);
                return Some(t);
            }
            Some(Keyword::True | Keyword::False | Keyword::This) => {
                self.bump();
                return Some(t);
            }
            Some(_) => {
                // Type keywords inside expressions only appear in casts,
                // which are handled above; bail out.
                return None;
            }
            None => {}
        }
        // Literal or name.
        self.bump();
        Some(t)
    }

    /// `( type )` followed by the start of an expression is a cast, not a
    /// grouping.
    fn is_cast(&self, open: TokenId, close: TokenId) -> bool {
        let mut saw_type_word = false;
        let mut cur = self.list.next(open);
        while let Some(t) = cur {
            if t == close {
                break;
            }
            match self.list.token(t).keyword() {
                Some(k) if k.is_type_specifier() || k == Keyword::Const => saw_type_word = true,
                Some(Keyword::Struct | Keyword::Union | Keyword::Enum) => {}
                Some(_) => return false,
                None => match self.list.str(t) {
                    "*" | "&" | "::" => {}
                    _ => {
                        let tok = self.list.token(t);
                        if !tok.is_name() || tok.var_id.is_some() {
                            return false;
                        }
                        // A bare unresolved identifier counts as a type
                        // name only if nothing else follows but pointers.
                        saw_type_word = true;
                    }
                },
            }
            cur = self.list.next(t);
        }
        if !saw_type_word {
            return false;
        }
        // The next token must start an expression.
        match self.list.next(close) {
            Some(n) if n != self.stop => {
                let tok = self.list.token(n);
                tok.is_name()
                    || tok.is_number()
                    || matches!(tok.kind, TokenKind::StringLiteral | TokenKind::CharLiteral)
                    || matches!(self.list.str(n), "(" | "*" | "&" | "!" | "~" | "-" | "+")
            }
            _ => false,
        }
    }
}

/// Hash-consing pass: structurally identical expressions over the same
/// variables (or the same literal spellings) share an id.
pub fn assign_expr_ids(list: &mut TokenList) {
    let mut interner = ExprInterner::default();
    let ids: Vec<TokenId> = list.tokens().collect();
    // Roots first; leaves that never joined a tree afterwards.
    for id in &ids {
        let tok = list.token(*id);
        if tok.ast_parent.is_none() && (tok.ast_operand1.is_some() || tok.ast_operand2.is_some()) {
            assign_recursive(list, &mut interner, *id);
        }
    }
    for id in ids {
        let tok = list.token(id);
        if tok.expr_id.is_none() && (tok.var_id.is_some() || tok.is_literal()) {
            assign_recursive(list, &mut interner, id);
        }
    }
}

#[derive(Default)]
struct ExprInterner {
    map: AHashMap<(u8, u64, u32, u32), ExprId>,
    next: u32,
}

impl ExprInterner {
    fn get(&mut self, key: (u8, u64, u32, u32)) -> ExprId {
        if let Some(&id) = self.map.get(&key) {
            return id;
        }
        self.next += 1;
        let id = ExprId(self.next);
        self.map.insert(key, id);
        id
    }

    fn fresh(&mut self) -> ExprId {
        self.next += 1;
        ExprId(self.next)
    }
}

fn assign_recursive(list: &mut TokenList, interner: &mut ExprInterner, id: TokenId) -> ExprId {
    if let Some(existing) = list.token(id).expr_id {
        return existing;
    }
    let op1 = list.token(id).ast_operand1;
    let op2 = list.token(id).ast_operand2;
    let sub1 = op1.map(|o| assign_recursive(list, interner, o));
    let sub2 = op2.map(|o| assign_recursive(list, interner, o));
    let tok = list.token(id);
    let expr_id = match (sub1, sub2) {
        (None, None) => {
            if let Some(vid) = tok.var_id {
                interner.get((0, u64::from(vid.index() as u32), 0, 0))
            } else if tok.is_literal() {
                interner.get((1, u64::from(tok.spelling_id().index() as u32), 0, 0))
            } else {
                // Unresolved identifier: structurally unique.
                interner.fresh()
            }
        }
        _ => interner.get((
            2,
            u64::from(tok.spelling_id().index() as u32),
            sub1.map_or(0, ExprId::value),
            sub2.map_or(0, ExprId::value),
        )),
    };
    list.token_mut(id).expr_id = Some(expr_id);
    expr_id
}

/// Bottom-up type resolution over the AST, applying the promotion and
/// conversion rules.
pub(super) fn resolve_value_types(list: &mut TokenList, db: &SymbolDatabase, settings: &Settings) {
    let ids: Vec<TokenId> = list.tokens().collect();
    for id in &ids {
        let tok = list.token(*id);
        if tok.ast_parent.is_none() {
            resolve_type_recursive(list, db, settings, *id);
        }
    }
}

fn resolve_type_recursive(
    list: &mut TokenList,
    db: &SymbolDatabase,
    settings: &Settings,
    id: TokenId,
) -> Option<ValueType> {
    if let Some(vt) = list.token(id).value_type {
        return Some(vt);
    }
    let op1 = list.token(id).ast_operand1;
    let op2 = list.token(id).ast_operand2;
    let t1 = op1.and_then(|o| resolve_type_recursive(list, db, settings, o));
    let t2 = op2.and_then(|o| resolve_type_recursive(list, db, settings, o));
    let platform = &settings.platform;

    let tok = list.token(id);
    let vt: Option<ValueType> = match tok.kind {
        TokenKind::IntLiteral => Some(int_literal_type(list, id, settings)),
        TokenKind::FloatLiteral => {
            let s = list.str(id);
            if s.ends_with(['f', 'F']) {
                Some(ValueType::new(Sign::Signed, BaseType::Float))
            } else {
                Some(ValueType::double_type())
            }
        }
        TokenKind::CharLiteral => Some(ValueType::new(Sign::Unknown, BaseType::Char)),
        TokenKind::StringLiteral => Some(ValueType {
            is_const: true,
            ..ValueType::new(Sign::Unknown, BaseType::Char).pointer_to()
        }),
        TokenKind::Keyword(Keyword::True | Keyword::False) => Some(ValueType::bool_type()),
        TokenKind::Keyword(Keyword::Sizeof | Keyword::Alignof) => {
            Some(ValueType::new(Sign::Unsigned, size_t_base(platform)))
        }
        TokenKind::Operator => {
            let s = list.str(id).to_owned();
            match s.as_str() {
                "==" | "!=" | "<" | "<=" | ">" | ">=" | "&&" | "||" | "!" => Some(ValueType::bool_type()),
                "=" | "+=" | "-=" | "*=" | "/=" | "%=" | "&=" | "|=" | "^=" | "<<=" | ">>=" => t1,
                "+" | "-" | "*" | "/" | "%" | "&" | "|" | "^" => match (op2, &t1, &t2) {
                    (None, Some(t1), _) => match s.as_str() {
                        // Unary minus/plus promote; unary * dereferences;
                        // unary & adds a level.
                        "*" => Some(ValueType {
                            pointer: t1.pointer.saturating_sub(1),
                            reference: false,
                            ..*t1
                        }),
                        "&" => Some(t1.pointer_to()),
                        _ => Some(t1.promoted()),
                    },
                    (Some(_), Some(a), Some(b)) => Some(ValueType::common_type(a, b, platform)),
                    _ => None,
                },
                "<<" | ">>" => t1.map(|t| t.promoted()),
                "~" | "++" | "--" => t1,
                "?" => None,
                ":" => match (&t1, &t2) {
                    (Some(a), Some(b)) => Some(ValueType::common_type(a, b, platform)),
                    _ => None,
                },
                "," => t2,
                "." | "->" => t2,
                _ => None,
            }
        }
        TokenKind::Punctuator => match list.str(id) {
            "(" => {
                // Cast or call.
                if op2.is_none() && op1.is_some() && list.token(id).link.is_some() && is_type_span(list, id) {
                    let close = list.token(id).link;
                    close.map(|c| {
                        let start = list.next(id).unwrap_or(c);
                        parse_value_type(list, start, c, db)
                    })
                } else {
                    // Call: the callee's declared return type.
                    op1.and_then(|callee| list.token(callee).function)
                        .and_then(|fid| db.function(fid).return_type)
                }
            }
            "[" => t1.map(|t| ValueType {
                pointer: t.pointer.saturating_sub(1),
                reference: false,
                ..t
            }),
            _ => None,
        },
        _ => None,
    };
    if let Some(vt) = vt {
        list.token_mut(id).value_type = Some(vt);
    }
    vt
}

/// Whether the parenthesized span holds only type tokens (a cast).
fn is_type_span(list: &TokenList, open: TokenId) -> bool {
    let Some(close) = list.token(open).link else { return false };
    let mut cur = list.next(open);
    let mut any = false;
    while let Some(t) = cur {
        if t == close {
            return any;
        }
        let tok = list.token(t);
        let ok = match tok.keyword() {
            Some(k) => k.is_type_specifier() || k == Keyword::Const || matches!(k, Keyword::Struct | Keyword::Union | Keyword::Enum),
            None => matches!(list.str(t), "*" | "&" | "::") || (tok.is_name() && tok.var_id.is_none()),
        };
        if !ok {
            return false;
        }
        any = true;
        cur = list.next(t);
    }
    false
}

fn size_t_base(platform: &crate::platform::Platform) -> BaseType {
    if platform.sizeof_size_t == platform.sizeof_long {
        BaseType::Long
    } else if platform.sizeof_size_t == platform.sizeof_long_long {
        BaseType::LongLong
    } else {
        BaseType::Int
    }
}

/// Integer literals type as the first of int/long/long long that fits,
/// honoring `u`/`l` suffixes.
fn int_literal_type(list: &TokenList, id: TokenId, settings: &Settings) -> ValueType {
    let s = list.str(id);
    let lower = s.to_ascii_lowercase();
    let unsigned = lower.contains('u');
    let longs = lower.matches('l').count();
    let platform = &settings.platform;
    let sign = if unsigned { Sign::Unsigned } else { Sign::Signed };
    let mut base = match longs {
        0 => BaseType::Int,
        1 => BaseType::Long,
        _ => BaseType::LongLong,
    };
    if let Some(value) = list.int_literal_value(id) {
        loop {
            let vt = ValueType::new(sign, base);
            if let Some(max) = vt.max_value(platform)
                && value <= max
            {
                break;
            }
            base = match base {
                BaseType::Int => BaseType::Long,
                BaseType::Long => BaseType::LongLong,
                _ => break,
            };
        }
    }
    ValueType::new(sign, base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        analyzer::StopFlag,
        diagnostics::CollectingLogger,
        pretoken::lex,
        tokenizer::Tokenizer,
    };

    fn tokenize(code: &str) -> Tokenizer {
        let stream = lex(code, "test.c").unwrap();
        let settings = Settings::default();
        let mut logger = CollectingLogger::new();
        Tokenizer::tokenize(&stream, &settings, &mut logger, &StopFlag::new()).unwrap()
    }

    fn find(list: &TokenList, spelling: &str) -> TokenId {
        list.tokens().find(|&t| list.is(t, spelling)).unwrap()
    }

    #[test]
    fn precedence_shapes_the_tree() {
        let t = tokenize("void f(int a, int b, int c) { a = b + c * 2; }");
        let l = &t.list;
        let assign = find(l, "=");
        let plus = find(l, "+");
        let stars: Vec<TokenId> = l.tokens().filter(|&x| l.is(x, "*")).collect();
        let star = *stars.last().unwrap();
        assert_eq!(l.token(assign).ast_operand2, Some(plus));
        assert_eq!(l.token(plus).ast_operand2, Some(star));
        assert_eq!(l.token(plus).ast_parent, Some(assign));
        assert!(l.token(assign).ast_parent.is_none());
    }

    #[test]
    fn assignment_is_right_associative() {
        let t = tokenize("void f(int a, int b, int c) { a = b = c; }");
        let l = &t.list;
        let assigns: Vec<TokenId> = l.tokens().filter(|&x| l.is(x, "=")).collect();
        assert_eq!(assigns.len(), 2);
        // `a = (b = c)` — the first `=` is the root.
        assert_eq!(l.token(assigns[0]).ast_operand2, Some(assigns[1]));
        assert!(l.token(assigns[0]).ast_parent.is_none());
    }

    #[test]
    fn ternary_uses_colon_branches() {
        let t = tokenize("void f(int a, int b) { int x = a ? b : 3; }");
        let l = &t.list;
        let q = find(l, "?");
        let colon = find(l, ":");
        assert_eq!(l.token(q).ast_operand2, Some(colon));
        assert!(l.token(colon).ast_operand1.is_some());
        assert!(l.token(colon).ast_operand2.is_some());
    }

    #[test]
    fn call_arguments_chain_with_commas() {
        let t = tokenize("void g(int, int); void f(int x) { g(x, 2); }");
        let l = &t.list;
        let call = l
            .tokens()
            .find(|&x| l.is(x, "(") && l.token(x).ast_operand1.is_some())
            .unwrap();
        let comma = find(l, ",");
        assert_eq!(l.token(call).ast_operand2, Some(comma));
    }

    #[test]
    fn expression_ids_hash_cons() {
        let t = tokenize("int f(int a, int b) { int x = a + b; int y = a + b; return x; }");
        let l = &t.list;
        let pluses: Vec<TokenId> = l.tokens().filter(|&x| l.is(x, "+")).collect();
        assert_eq!(pluses.len(), 2);
        assert_eq!(l.token(pluses[0]).expr_id, l.token(pluses[1]).expr_id);
        assert!(l.token(pluses[0]).expr_id.is_some());
    }

    #[test]
    fn distinct_expressions_get_distinct_ids() {
        let t = tokenize("int f(int a, int b) { int x = a + b; int y = a - b; return x; }");
        let l = &t.list;
        let plus = find(l, "+");
        let minus = l
            .tokens()
            .find(|&x| l.is(x, "-") && l.token(x).ast_operand2.is_some())
            .unwrap();
        assert_ne!(l.token(plus).expr_id, l.token(minus).expr_id);
    }

    #[test]
    fn comparison_type_is_bool() {
        let t = tokenize("int f(int a) { return a < 3; }");
        let l = &t.list;
        let lt = find(l, "<");
        assert!(l.token(lt).value_type.unwrap().is_bool());
    }

    #[test]
    fn parent_operand_mutual_linkage() {
        let t = tokenize("int f(int a, int b) { return (a + b) * (a - b); }");
        let l = &t.list;
        for id in l.tokens() {
            if let Some(parent) = l.token(id).ast_parent {
                let p = l.token(parent);
                assert!(p.ast_operand1 == Some(id) || p.ast_operand2 == Some(id));
            }
        }
    }
}
