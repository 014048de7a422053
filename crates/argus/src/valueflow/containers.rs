//! Container size tracking.
//!
//! Recognized standard containers carry a ContainerSize value: empty at
//! construction, bumped by `push_back`, reset by `clear`, set by `resize`
//! and `assign`. `size()` and `empty()` calls fold to integer values when
//! the size is tracked. Any use the model does not understand drops the
//! tracking for that container.

use num_bigint::BigInt;

use crate::{
    settings::Settings,
    symbols::{SymbolDatabase, VarId},
    token::TokenId,
    tokenlist::TokenList,
    values::{AbstractValue, ValueData, ValueKind},
};

use super::set_token_value;

pub(super) fn container_sizes(list: &mut TokenList, db: &SymbolDatabase, _settings: &Settings) -> bool {
    let mut changed = false;
    for (i, var) in db.variables.iter().enumerate() {
        if !var.is_container {
            continue;
        }
        let vid = VarId(u32::try_from(i).unwrap_or(u32::MAX));
        // Initial size: default construction is empty; `(n)` and brace
        // initializers leave it unknown unless the count is a literal.
        let mut size: Option<BigInt> = match list.next(var.name_token) {
            Some(after) if list.is(after, ";") => Some(BigInt::from(0)),
            Some(after) if list.is(after, "(") => list
                .next(after)
                .and_then(|n| list.int_literal_value(n))
                .filter(|_| matches!(list.str_at(after, 2), Some(")"))),
            _ => None,
        };
        let scope = db.scope(var.scope);
        let Some(end) = scope.body_end else { continue };
        let mut cur = list.next(var.name_token);
        while let Some(id) = cur {
            if id == end {
                break;
            }
            if list.token(id).var_id != Some(vid) {
                cur = list.next(id);
                continue;
            }
            // Attach the current size at this use.
            if let Some(n) = &size {
                let mut v = AbstractValue::container_size(n.clone());
                v.set_known();
                v.push_breadcrumb(id, format!("Container size is {n}"));
                changed |= set_token_value(list, id, v);
            }
            // Method effects: `v . method ( args )`.
            size = match method_call(list, id) {
                Some((method, paren)) => apply_method(list, id, &method, paren, size, &mut changed),
                None => {
                    // Anything else (pass by reference, assignment,
                    // iteration) loses the tracking.
                    if is_opaque_use(list, id) { None } else { size }
                }
            };
            cur = list.next(id);
        }
    }
    changed
}

/// `name . method ( … )` shape at a container use.
fn method_call(list: &TokenList, name: TokenId) -> Option<(String, TokenId)> {
    let dot = list.next(name)?;
    if !list.is(dot, ".") {
        return None;
    }
    let method = list.next(dot)?;
    let paren = list.next(method)?;
    if !list.is(paren, "(") {
        return None;
    }
    Some((list.str(method).to_owned(), paren))
}

fn apply_method(
    list: &mut TokenList,
    name: TokenId,
    method: &str,
    paren: TokenId,
    size: Option<BigInt>,
    changed: &mut bool,
) -> Option<BigInt> {
    match method {
        "push_back" | "push_front" | "emplace_back" | "insert" => size.map(|n| n + 1),
        "pop_back" | "pop_front" => size.map(|n| if n > BigInt::from(0) { n - 1 } else { n }),
        "clear" => Some(BigInt::from(0)),
        "resize" | "assign" => list.next(paren).and_then(|arg| list.int_literal_value(arg)),
        "size" | "length" => {
            if let Some(n) = &size {
                let mut v = AbstractValue::int(n.clone());
                v.kind = ValueKind::Known;
                v.push_breadcrumb(name, format!("Container size is {n}"));
                *changed |= set_token_value(list, paren, v);
            }
            size
        }
        "empty" => {
            if let Some(n) = &size {
                let empty = i64::from(*n == BigInt::from(0));
                let mut v = AbstractValue::int(empty);
                v.kind = ValueKind::Known;
                v.push_breadcrumb(name, format!("Container size is {n}"));
                *changed |= set_token_value(list, paren, v);
            }
            size
        }
        "begin" | "end" => {
            // Iterator values: begin() is position 0, end() the size.
            if let Some(container) = list.token(name).expr_id {
                let position = if method == "end" {
                    size.as_ref().and_then(num_traits::ToPrimitive::to_i64)
                } else {
                    Some(0)
                };
                if let Some(position) = position {
                    let mut v = AbstractValue::new(ValueData::Iterator { container, position });
                    v.kind = ValueKind::Possible;
                    v.push_breadcrumb(name, "Iterator obtained here".to_owned());
                    *changed |= set_token_value(list, paren, v);
                }
            }
            size
        }
        "rbegin" | "rend" | "cbegin" | "cend" | "front" | "back" | "at" => size,
        _ => None,
    }
}

/// Uses that may change the size in ways the model does not track.
fn is_opaque_use(list: &TokenList, id: TokenId) -> bool {
    let Some(parent) = list.token(id).ast_parent else {
        return false;
    };
    // Reads through `[ ]` keep the tracking; everything else is opaque.
    !(list.is(parent, "[") && list.token(parent).ast_operand1 == Some(id))
}
