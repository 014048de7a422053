//! Condition-based narrowing.
//!
//! After `if (x > 5)`, the then-branch sees `x` with a Lower-bounded value
//! of 6 and the else-branch an Upper-bounded 5. Equality conditions attach
//! point values; the merge point after the `if` keeps what both paths
//! agree on. A branch that exits (returns, breaks) leaves the opposite
//! fact behind instead.

use num_bigint::BigInt;

use crate::{
    astutils::expr_text,
    keywords::Keyword,
    programmemory::condition_root,
    settings::Settings,
    symbols::{ExprId, SymbolDatabase},
    token::TokenId,
    tokenlist::TokenList,
    values::{AbstractValue, Bound, ValueKind},
};

use super::set_token_value;

pub(super) fn condition_values(list: &mut TokenList, db: &SymbolDatabase, _settings: &Settings) -> bool {
    let mut changed = false;
    let ids: Vec<TokenId> = list.tokens().collect();
    for id in ids {
        if !matches!(list.token(id).keyword(), Some(Keyword::If | Keyword::While)) {
            continue;
        }
        let Some(paren) = list.next(id) else { continue };
        if !list.is(paren, "(") {
            continue;
        }
        let Some(close) = list.token(paren).link else { continue };
        let Some(cond) = condition_root(list, paren, close) else {
            continue;
        };
        let Some(then_open) = list.next(close).filter(|b| list.is(*b, "{")) else {
            continue;
        };
        let Some(then_close) = list.token(then_open).link else { continue };
        let mut else_range = None;
        let mut chain_end = then_close;
        if let Some(els) = list.next(then_close)
            && list.token(els).keyword() == Some(Keyword::Else)
            && let Some(else_open) = list.next(els)
            && list.is(else_open, "{")
            && let Some(else_close) = list.token(else_open).link
        {
            else_range = Some((else_open, else_close));
            chain_end = else_close;
        }
        // Merge handling applies only to `if`; a while-condition re-tests
        // every iteration.
        let after = (list.token(id).keyword() == Some(Keyword::If))
            .then(|| after_range(list, db, id, chain_end))
            .flatten();
        changed |= apply_condition(list, cond, true, (then_open, then_close), else_range, after);
    }
    changed
}

/// Tokens between the end of the if-chain and the end of the enclosing
/// scope.
fn after_range(list: &TokenList, db: &SymbolDatabase, if_tok: TokenId, chain_end: TokenId) -> Option<(TokenId, TokenId)> {
    let scope = list.token(if_tok).scope?;
    let end = db.scope(scope).body_end?;
    let start = list.next(chain_end)?;
    if start == end {
        return None;
    }
    Some((start, end))
}

/// Applies one condition (possibly a conjunction) to the branch ranges.
fn apply_condition(
    list: &mut TokenList,
    cond: TokenId,
    truth: bool,
    then_range: (TokenId, TokenId),
    else_range: Option<(TokenId, TokenId)>,
    after: Option<(TokenId, TokenId)>,
) -> bool {
    let mut changed = false;
    match list.str(cond) {
        "&&" if truth => {
            // Both conjuncts hold on the then-path.
            if let (Some(a), Some(b)) = (list.token(cond).ast_operand1, list.token(cond).ast_operand2) {
                changed |= apply_condition(list, a, true, then_range, None, None);
                changed |= apply_condition(list, b, true, then_range, None, None);
            }
        }
        "||" if truth => {
            // Both disjuncts fail on the else-path.
            if let Some(else_range) = else_range
                && let (Some(a), Some(b)) = (list.token(cond).ast_operand1, list.token(cond).ast_operand2)
            {
                changed |= apply_condition(list, a, false, else_range, None, None);
                changed |= apply_condition(list, b, false, else_range, None, None);
            }
        }
        "!" => {
            if let Some(inner) = list.token(cond).ast_operand1 {
                changed |= apply_condition(list, inner, !truth, then_range, else_range, after);
            }
        }
        "==" | "!=" | "<" | "<=" | ">" | ">=" => {
            changed |= apply_comparison(list, cond, truth, then_range, else_range, after);
        }
        _ => {
            // Plain truthiness: `if (x)` — zero is impossible inside, and
            // the else-branch pins it to zero.
            if let Some(expr) = list.token(cond).expr_id {
                let text = expr_text(list, cond);
                let mut nonzero = AbstractValue::int(0).with_condition(cond);
                nonzero.kind = ValueKind::Impossible;
                nonzero.push_breadcrumb(cond, format!("Assuming that condition '{text}' is not redundant"));
                let mut zero = AbstractValue::int(0).with_condition(cond);
                zero.push_breadcrumb(cond, format!("Assuming that condition '{text}' is false"));
                let (inside, outside) = if truth { (nonzero, zero) } else { (zero, nonzero) };
                changed |= attach_in_range(list, expr, then_range, &inside);
                if let Some(else_range) = else_range {
                    changed |= attach_in_range(list, expr, else_range, &outside);
                }
            }
        }
    }
    changed
}

fn apply_comparison(
    list: &mut TokenList,
    cond: TokenId,
    truth: bool,
    then_range: (TokenId, TokenId),
    else_range: Option<(TokenId, TokenId)>,
    after: Option<(TokenId, TokenId)>,
) -> bool {
    let Some(lhs) = list.token(cond).ast_operand1 else { return false };
    let Some(rhs) = list.token(cond).ast_operand2 else { return false };
    let (expr_tok, constant, flipped) = if let Some(n) = known_point(list, rhs) {
        (lhs, n, false)
    } else if let Some(n) = known_point(list, lhs) {
        (rhs, n, true)
    } else {
        return false;
    };
    let Some(expr) = list.token(expr_tok).expr_id else { return false };
    let mut op = list.str(cond).to_owned();
    if flipped {
        op = flip_op(&op);
    }
    if !truth {
        op = negate_op(&op);
    }
    let text = expr_text(list, cond);
    let mut changed = false;

    let mk = |data: BigInt, kind: ValueKind, bound: Bound, note: &str| {
        let mut v = AbstractValue::int(data).with_condition(cond).with_bound(bound);
        v.kind = kind;
        v.push_breadcrumb(cond, note.to_owned());
        v
    };
    let assuming = format!("Assuming that condition '{text}' is not redundant");

    match op.as_str() {
        "==" => {
            let inside = mk(constant.clone(), ValueKind::Possible, Bound::Point, &assuming);
            changed |= attach_in_range(list, expr, then_range, &inside);
            if let Some(else_range) = else_range {
                let outside = mk(constant.clone(), ValueKind::Impossible, Bound::Point, &assuming);
                changed |= attach_in_range(list, expr, else_range, &outside);
            }
            if let Some(after) = after {
                changed |= attach_after_merge(list, expr, then_range, else_range, after, &inside);
            }
        }
        "!=" => {
            let inside = mk(constant.clone(), ValueKind::Impossible, Bound::Point, &assuming);
            changed |= attach_in_range(list, expr, then_range, &inside);
            if let Some(else_range) = else_range {
                let outside = mk(constant.clone(), ValueKind::Possible, Bound::Point, &assuming);
                changed |= attach_in_range(list, expr, else_range, &outside);
            }
        }
        "<" | "<=" => {
            let upper = if op == "<" { constant.clone() - 1 } else { constant.clone() };
            let inside = mk(upper, ValueKind::Possible, Bound::Upper, &assuming);
            changed |= attach_in_range(list, expr, then_range, &inside);
            if let Some(else_range) = else_range {
                let lower = if op == "<" { constant.clone() } else { constant.clone() + 1 };
                let outside = mk(lower, ValueKind::Possible, Bound::Lower, &assuming);
                changed |= attach_in_range(list, expr, else_range, &outside);
            }
        }
        ">" | ">=" => {
            let lower = if op == ">" { constant.clone() + 1 } else { constant.clone() };
            let inside = mk(lower, ValueKind::Possible, Bound::Lower, &assuming);
            changed |= attach_in_range(list, expr, then_range, &inside);
            if let Some(else_range) = else_range {
                let upper = if op == ">" { constant.clone() } else { constant.clone() - 1 };
                let outside = mk(upper, ValueKind::Possible, Bound::Upper, &assuming);
                changed |= attach_in_range(list, expr, else_range, &outside);
            }
        }
        _ => {}
    }
    changed
}

/// At the merge point the fact survives only when neither branch rewrote
/// the expression; a then-branch that exits inverts it.
fn attach_after_merge(
    list: &mut TokenList,
    expr: ExprId,
    then_range: (TokenId, TokenId),
    else_range: Option<(TokenId, TokenId)>,
    after: (TokenId, TokenId),
    inside: &AbstractValue,
) -> bool {
    if range_modifies_expr(list, then_range, expr) {
        return false;
    }
    if let Some(else_range) = else_range
        && range_modifies_expr(list, else_range, expr)
    {
        return false;
    }
    let mut value = inside.clone();
    if range_exits(list, then_range) {
        // Only the else-path reaches the merge.
        value.kind = ValueKind::Impossible;
    }
    attach_in_range(list, expr, after, &value)
}

fn known_point(list: &TokenList, tok: TokenId) -> Option<BigInt> {
    if let Some(n) = list.int_literal_value(tok) {
        return Some(n);
    }
    let t = list.token(tok);
    t.values
        .iter()
        .find(|v| v.is_known() && v.bound == Bound::Point)
        .and_then(|v| v.as_int())
        .cloned()
}

fn flip_op(op: &str) -> String {
    match op {
        "<" => ">",
        "<=" => ">=",
        ">" => "<",
        ">=" => "<=",
        other => other,
    }
    .to_owned()
}

fn negate_op(op: &str) -> String {
    match op {
        "==" => "!=",
        "!=" => "==",
        "<" => ">=",
        "<=" => ">",
        ">" => "<=",
        ">=" => "<",
        other => other,
    }
    .to_owned()
}

/// Attaches `value` to every token in the range with the given expression
/// id, stopping at the first reassignment of that expression.
fn attach_in_range(list: &mut TokenList, expr: ExprId, range: (TokenId, TokenId), value: &AbstractValue) -> bool {
    let mut changed = false;
    let (start, end) = range;
    let mut cur = Some(start);
    while let Some(id) = cur {
        if id == end {
            break;
        }
        if list.token(id).expr_id == Some(expr) {
            if is_assignment_target(list, id) {
                break;
            }
            changed |= set_token_value(list, id, value.clone());
        }
        cur = list.next(id);
    }
    changed
}

/// Token is the left side of an assignment or an inc/dec operand.
fn is_assignment_target(list: &TokenList, id: TokenId) -> bool {
    let Some(parent) = list.token(id).ast_parent else {
        return false;
    };
    if list.is_assignment_op(parent) {
        return list.token(parent).ast_operand1 == Some(id);
    }
    matches!(list.str(parent), "++" | "--")
}

fn range_modifies_expr(list: &TokenList, range: (TokenId, TokenId), expr: ExprId) -> bool {
    let (start, end) = range;
    let mut cur = Some(start);
    while let Some(id) = cur {
        if id == end {
            break;
        }
        if list.token(id).expr_id == Some(expr) && is_assignment_target(list, id) {
            return true;
        }
        cur = list.next(id);
    }
    false
}

fn range_exits(list: &TokenList, range: (TokenId, TokenId)) -> bool {
    let (start, end) = range;
    let mut cur = Some(start);
    while let Some(id) = cur {
        if id == end {
            break;
        }
        if matches!(
            list.token(id).keyword(),
            Some(Keyword::Return | Keyword::Break | Keyword::Continue | Keyword::Goto | Keyword::Throw)
        ) {
            return true;
        }
        cur = list.next(id);
    }
    false
}
