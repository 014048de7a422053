//! Assignment forwarding.
//!
//! `x = 3;` makes later reads of `x` Known 3 until the value is killed:
//! `x` is reassigned, its address is taken and escapes, or it is passed by
//! non-const reference. An assignment inside a conditional branch degrades
//! a surviving Known to Possible at the branch merge. Locals declared
//! without an initializer carry an Uninit value until their first write.

use crate::{
    astutils::expr_text,
    settings::Settings,
    symbols::{SymbolDatabase, VarId},
    token::TokenId,
    tokenlist::TokenList,
    values::{AbstractValue, Bound, ValueData, ValueKind},
};

use super::set_token_value;

pub(super) fn assignment_values(list: &mut TokenList, db: &SymbolDatabase, settings: &Settings) -> bool {
    let mut changed = false;
    let ids: Vec<TokenId> = list.tokens().collect();
    for id in ids {
        if !list.is(id, "=") || list.token(id).ast_parent.is_some() {
            continue;
        }
        let Some(lhs) = list.token(id).ast_operand1 else { continue };
        let Some(rhs) = list.token(id).ast_operand2 else { continue };
        // Plain variable target only; compound lvalues alias.
        let Some(vid) = list.token(lhs).var_id else { continue };
        if list.token(lhs).ast_operand1.is_some() {
            continue;
        }
        let var = db.variable(vid);
        if var.is_reference || var.is_volatile {
            continue;
        }
        // Values to forward: Known/Possible ints, floats, symbolic tokens.
        let source_values: Vec<AbstractValue> = list
            .token(rhs)
            .values
            .iter()
            .filter(|v| {
                matches!(v.kind, ValueKind::Known | ValueKind::Possible)
                    && matches!(
                        v.data,
                        ValueData::Int(_) | ValueData::Float(_) | ValueData::Tok(_) | ValueData::ContainerSize(_)
                    )
                    && v.bound == Bound::Point
            })
            .cloned()
            .collect();
        if source_values.is_empty() {
            continue;
        }
        let note = format!("Assignment '{}'", expr_text(list, id));
        for mut value in source_values {
            value.push_breadcrumb(id, note.clone());
            changed |= forward_value(list, db, settings, id, vid, value);
        }
    }
    changed |= uninit_values(list, db);
    changed
}

/// Walks forward from the assignment, attaching `value` to uses of the
/// variable until it dies.
fn forward_value(
    list: &mut TokenList,
    db: &SymbolDatabase,
    _settings: &Settings,
    assign_tok: TokenId,
    vid: VarId,
    value: AbstractValue,
) -> bool {
    let mut changed = false;
    // Start after the statement.
    let Some(mut cur) = crate::astutils::after_statement(list, assign_tok) else {
        return false;
    };
    let base_scope = list.token(assign_tok).scope;
    // While a conditional write exists behind us, Known degrades.
    let mut certain = true;
    loop {
        let id = cur;
        let tok = list.token(id);
        // Leaving the variable's accessible region ends the walk.
        if list.is(id, "}") && tok.scope == base_scope {
            break;
        }
        if tok.var_id == Some(vid) {
            if is_killing_use(list, db, id) {
                // A kill in a nested conditional only weakens the value.
                if tok.scope == base_scope {
                    break;
                }
                certain = false;
                // Skip the rest of the conditional branch: the value is
                // invalid inside it after the write.
                if let Some(end) = enclosing_branch_end(list, db, id, base_scope) {
                    cur = end;
                    if let Some(next) = list.next(cur) {
                        cur = next;
                        continue;
                    }
                    break;
                }
                break;
            }
            let mut v = value.clone();
            if !certain {
                v.set_possible();
            }
            changed |= set_token_value(list, id, v);
        }
        match list.next(id) {
            Some(next) => cur = next,
            None => break,
        }
    }
    changed
}

/// A use that invalidates forwarded values: reassignment, inc/dec,
/// address-of, or passing by mutable reference.
fn is_killing_use(list: &TokenList, db: &SymbolDatabase, id: TokenId) -> bool {
    let Some(parent) = list.token(id).ast_parent else {
        return false;
    };
    if list.is_assignment_op(parent) && list.token(parent).ast_operand1 == Some(id) {
        return true;
    }
    if matches!(list.str(parent), "++" | "--") {
        return true;
    }
    if list.is(parent, "&") && list.token(parent).ast_operand2.is_none() {
        return true;
    }
    // Function argument passed by non-const reference.
    if let Some((fid, arg_index)) = argument_position(list, id)
        && let Some(&param) = db.function(fid).args.get(arg_index)
    {
        let param = db.variable(param);
        if (param.is_reference || param.is_pointer()) && !param.is_const {
            return true;
        }
    }
    false
}

/// When `id` is a direct argument of a resolved call, its 0-based position.
fn argument_position(list: &TokenList, id: TokenId) -> Option<(crate::symbols::FunctionId, usize)> {
    let mut cur = id;
    loop {
        let parent = list.token(cur).ast_parent?;
        match list.str(parent) {
            "," => cur = parent,
            "(" => {
                let callee = list.token(parent).ast_operand1?;
                let fid = list.token(callee).function?;
                let args = crate::astutils::get_arguments(list, parent);
                let index = args
                    .iter()
                    .position(|&a| a == id || subtree_contains(list, a, id))?;
                return Some((fid, index));
            }
            _ => return None,
        }
    }
}

fn subtree_contains(list: &TokenList, root: TokenId, needle: TokenId) -> bool {
    let mut stack = vec![root];
    while let Some(t) = stack.pop() {
        if t == needle {
            return true;
        }
        if let Some(o) = list.token(t).ast_operand1 {
            stack.push(o);
        }
        if let Some(o) = list.token(t).ast_operand2 {
            stack.push(o);
        }
    }
    false
}

/// End token of the innermost braced branch containing `id` that is nested
/// below `base_scope`.
fn enclosing_branch_end(list: &TokenList, db: &SymbolDatabase, id: TokenId, base_scope: Option<crate::symbols::ScopeId>) -> Option<TokenId> {
    let mut scope = list.token(id).scope?;
    loop {
        let s = db.scope(scope);
        match s.parent {
            Some(p) if Some(p) == base_scope => return s.body_end,
            Some(p) => scope = p,
            None => return None,
        }
    }
}

/// Locals declared without an initializer are uninitialized until their
/// first write.
fn uninit_values(list: &mut TokenList, db: &SymbolDatabase) -> bool {
    let mut changed = false;
    for (i, var) in db.variables.iter().enumerate() {
        let vid = VarId(u32::try_from(i).unwrap_or(u32::MAX));
        if !var.is_local(db) || var.is_argument() || var.is_container {
            continue;
        }
        if !db.scope(var.scope).kind.is_executable() {
            continue;
        }
        // Declared without `=` and not an array of static storage.
        let Some(after) = list.next(var.name_token) else { continue };
        let initialized = list.is(after, "=") || list.is(after, "(") || list.is(after, "{");
        if initialized {
            continue;
        }
        if var.is_array() && !list.is(after, ";") {
            continue;
        }
        let mut value = AbstractValue::uninit();
        value.push_breadcrumb(var.name_token, "Declared without initialization".to_owned());
        // Walk until the first write, address-of, or scope end.
        let mut cur = list.next(after);
        while let Some(id) = cur {
            let tok = list.token(id);
            if list.is(id, "}") && tok.scope == Some(var.scope) {
                break;
            }
            if tok.var_id == Some(vid) {
                if is_write_or_escape(list, id) {
                    break;
                }
                changed |= set_token_value(list, id, value.clone());
            }
            cur = list.next(id);
        }
    }
    changed
}

fn is_write_or_escape(list: &TokenList, id: TokenId) -> bool {
    let Some(parent) = list.token(id).ast_parent else {
        return false;
    };
    (list.is_assignment_op(parent) && list.token(parent).ast_operand1 == Some(id))
        || matches!(list.str(parent), "++" | "--")
        || (list.is(parent, "&") && list.token(parent).ast_operand2.is_none())
        || is_function_argument(list, id)
}

fn is_function_argument(list: &TokenList, id: TokenId) -> bool {
    let mut cur = id;
    while let Some(parent) = list.token(cur).ast_parent {
        if list.is(parent, "(") && list.token(parent).ast_operand1 != Some(cur) {
            return true;
        }
        cur = parent;
    }
    false
}
