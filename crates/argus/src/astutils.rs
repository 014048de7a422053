//! Shared AST helpers used by value-flow and the checkers.

use crate::{
    symbols::VarId,
    token::TokenId,
    tokenlist::TokenList,
};

/// Root of the expression containing `tok`.
#[must_use]
pub fn expr_root(list: &TokenList, tok: TokenId) -> TokenId {
    let mut cur = tok;
    while let Some(parent) = list.token(cur).ast_parent {
        cur = parent;
    }
    cur
}

/// Arguments of a call, given the call's `(` token. Flattens the comma
/// chain in source order.
#[must_use]
pub fn get_arguments(list: &TokenList, call_paren: TokenId) -> Vec<TokenId> {
    let mut args = Vec::new();
    let Some(arg_tree) = list.token(call_paren).ast_operand2 else {
        return args;
    };
    flatten_commas(list, arg_tree, &mut args);
    args
}

fn flatten_commas(list: &TokenList, tok: TokenId, out: &mut Vec<TokenId>) {
    if list.is(tok, ",") {
        if let Some(lhs) = list.token(tok).ast_operand1 {
            flatten_commas(list, lhs, out);
        }
        if let Some(rhs) = list.token(tok).ast_operand2 {
            out.push(rhs);
        }
        return;
    }
    out.push(tok);
}

/// The `(` of a call when `name_tok` is the callee name.
#[must_use]
pub fn call_paren(list: &TokenList, name_tok: TokenId) -> Option<TokenId> {
    let paren = list.next(name_tok)?;
    if list.is(paren, "(") && list.token(paren).ast_operand1 == Some(name_tok) {
        Some(paren)
    } else {
        None
    }
}

/// Structural equivalence via the hash-consed expression ids.
#[must_use]
pub fn is_same_expression(list: &TokenList, a: TokenId, b: TokenId) -> bool {
    match (list.token(a).expr_id, list.token(b).expr_id) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}

/// Whether the subtree rooted at `tok` mentions the variable.
#[must_use]
pub fn expr_contains_var(list: &TokenList, tok: TokenId, varid: VarId) -> bool {
    let mut stack = vec![tok];
    while let Some(id) = stack.pop() {
        if list.token(id).var_id == Some(varid) {
            return true;
        }
        if let Some(o) = list.token(id).ast_operand1 {
            stack.push(o);
        }
        if let Some(o) = list.token(id).ast_operand2 {
            stack.push(o);
        }
    }
    false
}

/// Whether `tok` sits inside the head parentheses of an `if`/`while`
/// condition; returns the controlling keyword.
#[must_use]
pub fn controlling_keyword(list: &TokenList, tok: TokenId) -> Option<TokenId> {
    // Walk backwards over enclosing parens.
    let mut cur = list.prev(tok);
    let mut depth = 0i32;
    while let Some(id) = cur {
        match list.str(id) {
            ")" => depth += 1,
            "(" => {
                if depth == 0 {
                    let before = list.prev(id)?;
                    return match list.token(before).keyword() {
                        Some(k) if k.is_control_with_condition() => Some(before),
                        _ => None,
                    };
                }
                depth -= 1;
            }
            ";" | "{" | "}" => return None,
            _ => {}
        }
        cur = list.prev(id);
    }
    None
}

/// Source text of the expression rooted at `tok`, reconstructed from the
/// token sequence between its extreme leaves.
#[must_use]
pub fn expr_text(list: &TokenList, root: TokenId) -> String {
    let mut members = Vec::new();
    let mut stack = vec![root];
    while let Some(id) = stack.pop() {
        members.push(id);
        if let Some(o) = list.token(id).ast_operand1 {
            stack.push(o);
        }
        if let Some(o) = list.token(id).ast_operand2 {
            stack.push(o);
        }
    }
    members.sort_by_key(|&id| list.order_of(id));
    let mut out = String::new();
    for (i, id) in members.iter().enumerate() {
        let s = list.str(*id);
        if i > 0 && needs_space(&out, s) {
            out.push(' ');
        }
        out.push_str(s);
    }
    out
}

fn needs_space(before: &str, next: &str) -> bool {
    let prev_alnum = before.chars().next_back().is_some_and(|c| c.is_alphanumeric() || c == '_');
    let next_alnum = next.chars().next().is_some_and(|c| c.is_alphanumeric() || c == '_');
    prev_alnum && next_alnum
}

/// First token after the statement containing `tok` (the token following
/// its terminating `;`).
#[must_use]
pub fn after_statement(list: &TokenList, tok: TokenId) -> Option<TokenId> {
    let mut cur = Some(tok);
    while let Some(id) = cur {
        match list.str(id) {
            ";" => return list.next(id),
            "(" | "[" | "{" => {
                cur = list.token(id).link.and_then(|l| list.next(l));
            }
            "}" => return None,
            _ => cur = list.next(id),
        }
    }
    None
}
