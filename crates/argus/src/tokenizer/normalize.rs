//! Syntax normalization.
//!
//! Rewrites the raw sequence into the canonical shape the later phases
//! expect: typedef chains resolved, combined declarations split into one
//! statement per variable, and implicit braces added around
//! single-statement bodies of `if`/`else`/`for`/`while`/`do`.

use ahash::AHashMap;

use crate::{
    errors::{AnalysisError, AnalysisResult},
    keywords::Keyword,
    settings::Settings,
    token::{TokenId, TokenKind},
    tokenlist::TokenList,
};

const MAX_TYPEDEF_DEPTH: u32 = 16;
const MAX_BODY_NESTING: u32 = 256;

pub(super) fn simplify(list: &mut TokenList, _settings: &Settings) -> AnalysisResult<()> {
    resolve_typedefs(list)?;
    split_declarations(list);
    add_implicit_braces(list)?;
    Ok(())
}

/// Records `typedef <type> <alias> ;` statements, removes them, and expands
/// every later use of an alias into the underlying type tokens. Chains are
/// followed with a depth cap so cyclic typedefs cannot loop.
fn resolve_typedefs(list: &mut TokenList) -> AnalysisResult<()> {
    // Collect definitions.
    let mut aliases: AHashMap<String, Vec<String>> = AHashMap::new();
    let mut removals: Vec<(TokenId, TokenId)> = Vec::new();
    let ids: Vec<TokenId> = list.tokens().collect();
    for id in ids {
        if list.token(id).keyword() != Some(Keyword::Typedef) {
            continue;
        }
        let at_start = match list.prev(id) {
            None => true,
            Some(p) => matches!(list.str(p), ";" | "{" | "}"),
        };
        if !at_start {
            continue;
        }
        // Scan to the terminating `;`.
        let mut body = Vec::new();
        let mut cur = list.next(id);
        let mut end = None;
        let mut has_parens = false;
        while let Some(t) = cur {
            if list.is(t, ";") {
                end = Some(t);
                break;
            }
            if list.is(t, "(") {
                has_parens = true;
            }
            body.push(t);
            cur = list.next(t);
        }
        let Some(end) = end else {
            return Err(list.syntax_error(id, "typedef without terminating ';'".to_owned()));
        };
        // Function-pointer typedefs are left alone.
        if has_parens || body.len() < 2 {
            continue;
        }
        let alias_tok = body[body.len() - 1];
        if !list.token(alias_tok).is_name() {
            continue;
        }
        let alias = list.str(alias_tok).to_owned();
        let expansion: Vec<String> = body[..body.len() - 1].iter().map(|&t| list.str(t).to_owned()).collect();
        aliases.insert(alias, expansion);
        removals.push((id, end));
    }
    for (start, end) in removals {
        list.remove_range(start, end);
    }
    if aliases.is_empty() {
        return Ok(());
    }
    // Follow chains: typedef int a; typedef a b; → b expands to int.
    let names: Vec<String> = aliases.keys().cloned().collect();
    for name in &names {
        let mut expansion = aliases[name].clone();
        for _ in 0..MAX_TYPEDEF_DEPTH {
            let mut changed = false;
            let mut next = Vec::with_capacity(expansion.len());
            for word in &expansion {
                match aliases.get(word) {
                    Some(inner) if word != name => {
                        next.extend(inner.iter().cloned());
                        changed = true;
                    }
                    _ => next.push(word.clone()),
                }
            }
            expansion = next;
            if !changed {
                break;
            }
        }
        aliases.insert(name.clone(), expansion);
    }
    // Substitute uses.
    let ids: Vec<TokenId> = list.tokens().collect();
    for id in ids {
        if !list.token(id).is_name() {
            continue;
        }
        if let Some(p) = list.prev(id)
            && matches!(list.str(p), "." | "->" | "::")
        {
            continue;
        }
        let Some(expansion) = aliases.get(list.str(id)) else {
            continue;
        };
        let expansion = expansion.clone();
        let mut anchor = id;
        for (i, word) in expansion.iter().enumerate() {
            let kind = classify_spelling(word);
            if i == 0 {
                list.set_str(id, word);
                list.token_mut(id).kind = kind;
            } else {
                anchor = list.insert_after(anchor, word, kind);
            }
        }
    }
    Ok(())
}

pub(super) fn classify_spelling(word: &str) -> TokenKind {
    match Keyword::recognize(word) {
        Some(k) => TokenKind::Keyword(k),
        None if word.chars().next().is_some_and(|c| c.is_alphabetic() || c == '_') => TokenKind::Identifier,
        None if word.chars().next().is_some_and(|c| c.is_ascii_digit()) => TokenKind::IntLiteral,
        None => TokenKind::Operator,
    }
}

/// Splits `int a, b;` into `int a; int b;` so that later phases see one
/// declaration per statement.
fn split_declarations(list: &mut TokenList) {
    let ids: Vec<TokenId> = list.tokens().collect();
    for id in ids {
        let at_start = match list.prev(id) {
            None => true,
            Some(p) => matches!(list.str(p), ";" | "{" | "}"),
        };
        if !at_start {
            continue;
        }
        // Leading type prefix: qualifiers and type words, stopping before
        // the first declarator.
        let mut prefix: Vec<String> = Vec::new();
        let mut cur = Some(id);
        while let Some(t) = cur {
            let tok = list.token(t);
            let is_type_word = match tok.keyword() {
                Some(k) => k.is_type_specifier() || k.is_decl_qualifier(),
                None => {
                    tok.is_name()
                        && list
                            .next(t)
                            .is_some_and(|n| list.token(n).is_name() || matches!(list.str(n), "*" | "&"))
                }
            };
            if !is_type_word {
                break;
            }
            prefix.push(list.str(t).to_owned());
            cur = list.next(t);
        }
        if prefix.is_empty() {
            continue;
        }
        let Some(first_declarator) = cur else { continue };
        if !list.token(first_declarator).is_name() && !matches!(list.str(first_declarator), "*" | "&") {
            continue;
        }
        // Find top-level commas up to the `;`.
        let mut commas = Vec::new();
        let mut t = Some(first_declarator);
        let mut terminated = false;
        while let Some(x) = t {
            match list.str(x) {
                ";" => {
                    terminated = true;
                    break;
                }
                "{" | "}" => break,
                "," => commas.push(x),
                "(" | "[" => {
                    t = list.token(x).link.and_then(|l| list.next(l));
                    continue;
                }
                "=" => {
                    // Brace initializers after `=` are jumped like brackets.
                }
                _ => {}
            }
            t = list.next(x);
        }
        if !terminated || commas.is_empty() {
            continue;
        }
        for comma in commas {
            list.set_str(comma, ";");
            list.token_mut(comma).kind = TokenKind::Punctuator;
            let mut anchor = comma;
            for word in &prefix {
                anchor = list.insert_after(anchor, word, classify_spelling(word));
            }
        }
    }
}

/// Wraps single-statement bodies of control constructs in explicit braces,
/// giving every body a scope of its own.
fn add_implicit_braces(list: &mut TokenList) -> AnalysisResult<()> {
    // Collected up front: insertions extend the arena but never disturb the
    // ids gathered here.
    let ids: Vec<TokenId> = list.tokens().collect();
    for id in ids {
        match list.token(id).keyword() {
            Some(Keyword::If | Keyword::While | Keyword::For) => {
                let Some(paren) = list.next(id) else { continue };
                if !list.is(paren, "(") {
                    continue;
                }
                let Some(close) = list.token(paren).link else { continue };
                // `while` of a do-while has its `;` right after the `)`.
                let Some(body) = list.next(close) else { continue };
                if matches!(list.str(body), "{" | ";") {
                    continue;
                }
                wrap_statement(list, body, 0)?;
            }
            Some(Keyword::Else) => {
                let Some(body) = list.next(id) else { continue };
                // `else if` stays chained; the inner if wraps its own body.
                if list.is(body, "{") || list.token(body).keyword() == Some(Keyword::If) {
                    continue;
                }
                wrap_statement(list, body, 0)?;
            }
            Some(Keyword::Do) => {
                let Some(body) = list.next(id) else { continue };
                if list.is(body, "{") {
                    continue;
                }
                wrap_statement(list, body, 0)?;
            }
            _ => {}
        }
    }
    Ok(())
}

/// Inserts `{` ... `}` around the statement starting at `start`.
fn wrap_statement(list: &mut TokenList, start: TokenId, depth: u32) -> AnalysisResult<()> {
    let end = statement_extent(list, start, depth)?;
    let open = list.insert_before(start, "{", TokenKind::Punctuator);
    let close = list.insert_after(end, "}", TokenKind::Punctuator);
    list.token_mut(open).link = Some(close);
    list.token_mut(close).link = Some(open);
    Ok(())
}

/// Last token of the statement starting at `start`: the `;`, the closing
/// `}` of a compound body, or the full extent of a control statement
/// including `else` chains and the do-while tail.
fn statement_extent(list: &TokenList, start: TokenId, depth: u32) -> AnalysisResult<TokenId> {
    if depth > MAX_BODY_NESTING {
        return Err(AnalysisError::RecursionLimit {
            what: "statement nesting".to_owned(),
        });
    }
    if list.is(start, "{") {
        return list
            .token(start)
            .link
            .ok_or_else(|| list.syntax_error(start, "unlinked brace".to_owned()));
    }
    match list.token(start).keyword() {
        Some(Keyword::If) => {
            let body = control_body(list, start)?;
            let mut end = statement_extent(list, body, depth + 1)?;
            if let Some(els) = list.next(end)
                && list.token(els).keyword() == Some(Keyword::Else)
            {
                let else_body = list
                    .next(els)
                    .ok_or_else(|| list.syntax_error(els, "dangling else".to_owned()))?;
                end = statement_extent(list, else_body, depth + 1)?;
            }
            Ok(end)
        }
        Some(Keyword::While | Keyword::For | Keyword::Switch) => {
            let body = control_body(list, start)?;
            statement_extent(list, body, depth + 1)
        }
        Some(Keyword::Do) => {
            let body = list
                .next(start)
                .ok_or_else(|| list.syntax_error(start, "do without body".to_owned()))?;
            let body_end = statement_extent(list, body, depth + 1)?;
            // Tail: `while ( ... ) ;`
            let mut cur = list.next(body_end);
            while let Some(t) = cur {
                if list.is(t, "(") {
                    cur = list.token(t).link.and_then(|l| list.next(l));
                    continue;
                }
                if list.is(t, ";") {
                    return Ok(t);
                }
                cur = list.next(t);
            }
            Err(list.syntax_error(start, "do-while without terminating ';'".to_owned()))
        }
        _ => {
            // Plain statement: scan to the `;`, jumping bracket pairs.
            let mut cur = Some(start);
            while let Some(t) = cur {
                if list.is(t, ";") {
                    return Ok(t);
                }
                if matches!(list.str(t), "(" | "[" | "{") {
                    cur = list.token(t).link.and_then(|l| list.next(l));
                    continue;
                }
                if list.is(t, "}") {
                    break;
                }
                cur = list.next(t);
            }
            Err(list.syntax_error(start, "statement without terminating ';'".to_owned()))
        }
    }
}

/// The first token after the `( ... )` head of a control statement.
fn control_body(list: &TokenList, keyword: TokenId) -> AnalysisResult<TokenId> {
    let paren = list
        .next(keyword)
        .filter(|p| list.is(*p, "("))
        .ok_or_else(|| list.syntax_error(keyword, "missing '(' after control keyword".to_owned()))?;
    let close = list
        .token(paren)
        .link
        .ok_or_else(|| list.syntax_error(paren, "unlinked '('".to_owned()))?;
    list.next(close)
        .ok_or_else(|| list.syntax_error(close, "missing body".to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pretoken::lex;

    fn normalized(code: &str) -> TokenList {
        let mut list = TokenList::from_stream(&lex(code, "test.c").unwrap()).unwrap();
        list.link_brackets().unwrap();
        simplify(&mut list, &Settings::default()).unwrap();
        list
    }

    fn spellings(list: &TokenList) -> Vec<String> {
        list.tokens().map(|t| list.str(t).to_owned()).collect()
    }

    #[test]
    fn implicit_braces_for_if() {
        let l = normalized("void f(int x) { if (x) x = 1; }");
        assert_eq!(
            spellings(&l).join(" "),
            "void f ( int x ) { if ( x ) { x = 1 ; } }"
        );
    }

    #[test]
    fn implicit_braces_if_else_chain() {
        let l = normalized("void f(int x) { if (x) x = 1; else if (x > 2) x = 2; else x = 3; }");
        assert_eq!(
            spellings(&l).join(" "),
            "void f ( int x ) { if ( x ) { x = 1 ; } else if ( x > 2 ) { x = 2 ; } else { x = 3 ; } }"
        );
    }

    #[test]
    fn implicit_braces_nested_body() {
        let l = normalized("void f(int x) { while (x) if (x) x = 1; }");
        assert_eq!(
            spellings(&l).join(" "),
            "void f ( int x ) { while ( x ) { if ( x ) { x = 1 ; } } }"
        );
    }

    #[test]
    fn split_combined_declarations() {
        let l = normalized("void f() { int a, b; }");
        assert_eq!(spellings(&l).join(" "), "void f ( ) { int a ; int b ; }");
    }

    #[test]
    fn typedef_resolution() {
        let l = normalized("typedef unsigned int uint; uint x;");
        assert_eq!(spellings(&l).join(" "), "unsigned int x ;");
    }

    #[test]
    fn typedef_chain() {
        let l = normalized("typedef int a; typedef a b; b x;");
        assert_eq!(spellings(&l).join(" "), "int x ;");
    }
}
