//! Loop induction.
//!
//! Counted for-loops with a clear counter and monotone update give the
//! counter a Possible range inside the body: `for (i = 0; i < n; i++)`
//! bounds `i` between 0 and `n - 1`.

use num_bigint::BigInt;

use crate::{
    astutils::{expr_text, expr_contains_var},
    diagnostics::ErrorLogger,
    keywords::Keyword,
    settings::Settings,
    symbols::SymbolDatabase,
    token::TokenId,
    tokenlist::TokenList,
    values::{AbstractValue, Bound, ValueKind},
};

use super::{bailout, set_token_value};

pub(super) fn induction_values(
    list: &mut TokenList,
    _db: &SymbolDatabase,
    settings: &Settings,
    logger: &mut dyn ErrorLogger,
) -> bool {
    let mut changed = false;
    let ids: Vec<TokenId> = list.tokens().collect();
    for id in ids {
        if list.token(id).keyword() != Some(Keyword::For) {
            continue;
        }
        let Some(paren) = list.next(id) else { continue };
        if !list.is(paren, "(") {
            continue;
        }
        let Some(close) = list.token(paren).link else { continue };
        let Some(body_open) = list.next(close).filter(|b| list.is(*b, "{")) else {
            continue;
        };
        let Some(body_close) = list.token(body_open).link else { continue };
        let Some(shape) = counted_loop_shape(list, paren, close) else {
            continue;
        };
        // A counter also written in the body is not monotone.
        if body_assigns_counter(list, body_open, body_close, shape.counter) {
            bailout(list, logger, id, "loop counter is modified inside the body", settings);
            continue;
        }
        let (low, high) = (shape.start, shape.end_inclusive);
        if low > high {
            continue;
        }
        let cond_text = expr_text(list, shape.cond);
        let mut lower = AbstractValue::int(low).with_bound(Bound::Lower).with_condition(shape.cond);
        lower.kind = ValueKind::Possible;
        lower.push_breadcrumb(shape.cond, format!("Loop '{cond_text}', first iteration"));
        let mut upper = AbstractValue::int(high).with_bound(Bound::Upper).with_condition(shape.cond);
        upper.kind = ValueKind::Possible;
        upper.push_breadcrumb(shape.cond, format!("Loop '{cond_text}', last iteration"));

        let mut cur = list.next(body_open);
        while let Some(t) = cur {
            if t == body_close {
                break;
            }
            if list.token(t).var_id == Some(shape.counter) {
                changed |= set_token_value(list, t, lower.clone());
                changed |= set_token_value(list, t, upper.clone());
            }
            cur = list.next(t);
        }
    }
    changed
}

struct CountedLoop {
    counter: crate::symbols::VarId,
    cond: TokenId,
    start: BigInt,
    end_inclusive: BigInt,
}

/// Recognizes `i = K0` / `int i = K0`, `i < N` or `i <= N` with constant
/// `N`, and `i++` / `++i`.
fn counted_loop_shape(list: &TokenList, paren: TokenId, close: TokenId) -> Option<CountedLoop> {
    // Head regions split by the two `;`.
    let mut semis = Vec::new();
    let mut cur = list.next(paren);
    while let Some(t) = cur {
        if t == close {
            break;
        }
        if list.is(t, ";") {
            semis.push(t);
        }
        if matches!(list.str(t), "(" | "[") {
            cur = list.token(t).link.and_then(|l| list.next(l));
            continue;
        }
        cur = list.next(t);
    }
    if semis.len() != 2 {
        return None;
    }
    // Init: the `=` root before the first `;`.
    let init_assign = find_in_region(list, list.next(paren)?, semis[0], |l, t| {
        l.is(t, "=") && l.token(t).ast_operand2.is_some()
    })?;
    let counter_tok = list.token(init_assign).ast_operand1?;
    let counter = list.token(counter_tok).var_id?;
    let start = known_int_of(list, list.token(init_assign).ast_operand2?)?;

    // Condition: `i < N` / `i <= N`.
    let cond = find_in_region(list, list.next(semis[0])?, semis[1], |l, t| {
        matches!(l.str(t), "<" | "<=") && l.token(t).ast_parent.is_none()
    })?;
    let lhs = list.token(cond).ast_operand1?;
    if list.token(lhs).var_id != Some(counter) {
        return None;
    }
    let limit = known_int_of(list, list.token(cond).ast_operand2?)?;
    let end_inclusive = if list.is(cond, "<") { limit - 1 } else { limit };

    // Post: `i++` or `++i` only.
    let post = find_in_region(list, list.next(semis[1])?, close, |l, t| {
        matches!(l.str(t), "++") && l.token(t).ast_operand1.is_some()
    })?;
    let post_operand = list.token(post).ast_operand1?;
    if list.token(post_operand).var_id != Some(counter) {
        return None;
    }

    Some(CountedLoop {
        counter,
        cond,
        start,
        end_inclusive,
    })
}

fn find_in_region(
    list: &TokenList,
    start: TokenId,
    end: TokenId,
    pred: impl Fn(&TokenList, TokenId) -> bool,
) -> Option<TokenId> {
    let mut cur = Some(start);
    while let Some(t) = cur {
        if t == end {
            return None;
        }
        if pred(list, t) {
            return Some(t);
        }
        cur = list.next(t);
    }
    None
}

fn known_int_of(list: &TokenList, tok: TokenId) -> Option<BigInt> {
    if let Some(n) = list.int_literal_value(tok) {
        return Some(n);
    }
    list.token(tok).known_int().cloned()
}

fn body_assigns_counter(list: &TokenList, open: TokenId, close: TokenId, counter: crate::symbols::VarId) -> bool {
    let mut cur = list.next(open);
    while let Some(t) = cur {
        if t == close {
            return false;
        }
        let tok = list.token(t);
        if tok.var_id == Some(counter)
            && let Some(parent) = tok.ast_parent
            && ((list.is_assignment_op(parent) && list.token(parent).ast_operand1 == Some(t))
                || matches!(list.str(parent), "++" | "--"))
        {
            return true;
        }
        // Address escape counts as modification.
        if tok.var_id == Some(counter)
            && let Some(parent) = tok.ast_parent
            && list.is(parent, "&")
            && list.token(parent).ast_operand2.is_none()
        {
            return true;
        }
        // `&i` buried deeper still taints the counter.
        if list.is(t, "&") && tok.ast_operand2.is_none()
            && let Some(inner) = tok.ast_operand1
            && expr_contains_var(list, inner, counter)
        {
            return true;
        }
        cur = list.next(t);
    }
    false
}
