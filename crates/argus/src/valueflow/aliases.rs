//! Pointer aliasing.
//!
//! When a pointer demonstrably refers to a named object (`p = &x`),
//! dereferences of the pointer share the pointee's value set until either
//! side is reassigned.

use crate::{
    settings::Settings,
    symbols::{SymbolDatabase, VarId},
    token::TokenId,
    tokenlist::TokenList,
    values::{AbstractValue, Bound, ValueData, ValueKind},
};

use super::set_token_value;

pub(super) fn alias_values(list: &mut TokenList, db: &SymbolDatabase, _settings: &Settings) -> bool {
    let mut changed = false;
    let ids: Vec<TokenId> = list.tokens().collect();
    for id in ids {
        // `p = & x` with plain variables on both sides.
        if !list.is(id, "=") || list.token(id).ast_parent.is_some() {
            continue;
        }
        let Some(lhs) = list.token(id).ast_operand1 else { continue };
        let Some(rhs) = list.token(id).ast_operand2 else { continue };
        let Some(pointer) = list.token(lhs).var_id else { continue };
        if !list.is(rhs, "&") || list.token(rhs).ast_operand2.is_some() {
            continue;
        }
        let Some(target_tok) = list.token(rhs).ast_operand1 else { continue };
        let Some(target) = list.token(target_tok).var_id else { continue };
        if !db.variable(pointer).is_pointer() {
            continue;
        }
        // The pointee's values at the assignment point.
        let pointee_values: Vec<AbstractValue> = list
            .token(target_tok)
            .values
            .iter()
            .filter(|v| {
                matches!(v.kind, ValueKind::Known | ValueKind::Possible)
                    && matches!(v.data, ValueData::Int(_) | ValueData::Float(_))
                    && v.bound == Bound::Point
            })
            .cloned()
            .collect();
        changed |= propagate_deref(list, id, pointer, target, target_tok, &pointee_values);
    }
    changed
}

/// Attaches the pointee's values and a symbolic link to `* p` roots after
/// the aliasing assignment, until `p` or the pointee is written again.
fn propagate_deref(
    list: &mut TokenList,
    assign_tok: TokenId,
    pointer: VarId,
    target: VarId,
    target_tok: TokenId,
    pointee_values: &[AbstractValue],
) -> bool {
    let mut changed = false;
    let Some(start) = crate::astutils::after_statement(list, assign_tok) else {
        return false;
    };
    let base_scope = list.token(assign_tok).scope;
    let mut cur = Some(start);
    while let Some(id) = cur {
        let tok = list.token(id);
        if list.is(id, "}") && tok.scope == base_scope {
            break;
        }
        // Reassignment of either side ends the alias window.
        if (tok.var_id == Some(pointer) || tok.var_id == Some(target))
            && let Some(parent) = tok.ast_parent
            && ((list.is_assignment_op(parent) && list.token(parent).ast_operand1 == Some(id))
                || matches!(list.str(parent), "++" | "--"))
        {
            break;
        }
        // `* p` dereference roots.
        if list.is(id, "*")
            && tok.ast_operand2.is_none()
            && let Some(operand) = tok.ast_operand1
            && list.token(operand).var_id == Some(pointer)
        {
            let mut symbolic = AbstractValue::new(ValueData::Symbolic {
                token: target_tok,
                delta: 0,
            });
            symbolic.kind = ValueKind::Known;
            symbolic.push_breadcrumb(assign_tok, "Pointer aliases the variable here".to_owned());
            changed |= set_token_value(list, id, symbolic);
            for v in pointee_values {
                let mut v = v.clone();
                v.set_possible();
                v.push_breadcrumb(assign_tok, "Value of the aliased variable".to_owned());
                changed |= set_token_value(list, id, v);
            }
        }
        cur = list.next(id);
    }
    changed
}
