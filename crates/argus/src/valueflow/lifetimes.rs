//! Lifetime propagation.
//!
//! Pointers and references to named storage carry a Lifetime value naming
//! that storage; iterators carry one naming their container. Once the walk
//! passes the end of the storage's scope the value flips to Impossible,
//! which is how dangling uses become visible.

use crate::{
    settings::Settings,
    symbols::{ScopeKind, SymbolDatabase},
    token::TokenId,
    tokenlist::TokenList,
    values::{AbstractValue, LifetimeKind, LifetimeScope, ValueData, ValueKind},
};

use super::set_token_value;

pub(super) fn lifetime_values(list: &mut TokenList, db: &SymbolDatabase, _settings: &Settings) -> bool {
    let mut changed = false;
    let ids: Vec<TokenId> = list.tokens().collect();
    for id in ids {
        // `p = & x` and `T & r = x`.
        if list.is(id, "=") && list.token(id).ast_parent.is_none() {
            changed |= address_assignment(list, db, id);
            continue;
        }
        // Iterator factories: `c . begin ( )` and friends.
        if list.is(id, "(")
            && let Some(method) = list.token(id).ast_operand1
            && list.is(method, ".")
            && let Some(name) = list.token(method).ast_operand2
            && matches!(list.str(name), "begin" | "end" | "rbegin" | "rend" | "cbegin" | "cend")
            && let Some(container) = list.token(method).ast_operand1
            && let Some(target) = list.token(container).expr_id
        {
            let mut v = AbstractValue::new(ValueData::Lifetime {
                target,
                scope: LifetimeScope::Local,
                kind: LifetimeKind::Iterator,
            });
            v.kind = ValueKind::Possible;
            v.push_breadcrumb(container, "Iterator into this container".to_owned());
            changed |= set_token_value(list, id, v);
        }
    }
    changed
}

fn address_assignment(list: &mut TokenList, db: &SymbolDatabase, assign: TokenId) -> bool {
    let Some(lhs) = list.token(assign).ast_operand1 else {
        return false;
    };
    let Some(rhs) = list.token(assign).ast_operand2 else {
        return false;
    };
    let Some(holder) = list.token(lhs).var_id else {
        return false;
    };
    let holder_var = db.variable(holder);

    let (target_tok, kind) = if list.is(rhs, "&") && list.token(rhs).ast_operand2.is_none() {
        match list.token(rhs).ast_operand1 {
            Some(t) => (t, LifetimeKind::Address),
            None => return false,
        }
    } else if holder_var.is_reference && list.token(rhs).var_id.is_some() {
        (rhs, LifetimeKind::Object)
    } else {
        return false;
    };
    let Some(target_vid) = list.token(target_tok).var_id else {
        return false;
    };
    let Some(target) = list.token(target_tok).expr_id else {
        return false;
    };
    let target_var = db.variable(target_vid);
    let lifetime_scope = match (target_var.storage, target_var.is_argument()) {
        (crate::symbols::Storage::Static, _) | (crate::symbols::Storage::Extern, _) => LifetimeScope::Static,
        (crate::symbols::Storage::ThreadLocal, _) => LifetimeScope::Thread,
        (_, true) => LifetimeScope::Argument,
        _ if db.scope(target_var.scope).kind == ScopeKind::Global => LifetimeScope::Static,
        _ => LifetimeScope::Local,
    };

    let mut value = AbstractValue::new(ValueData::Lifetime {
        target,
        scope: lifetime_scope,
        kind,
    });
    value.kind = ValueKind::Possible;
    value.push_breadcrumb(assign, "Refers to this storage".to_owned());

    // Storage dies at the end of its scope; uses beyond are Impossible.
    let storage_end = db.scope(target_var.scope).body_end.map(|e| list.order_of(e));

    let mut changed = set_token_value(list, lhs, value.clone());
    let Some(start) = crate::astutils::after_statement(list, assign) else {
        return changed;
    };
    let base_scope = list.token(assign).scope;
    let mut cur = Some(start);
    while let Some(id) = cur {
        let tok = list.token(id);
        if list.is(id, "}") && tok.scope == base_scope {
            break;
        }
        if tok.var_id == Some(holder) {
            if let Some(parent) = tok.ast_parent
                && list.is_assignment_op(parent)
                && list.token(parent).ast_operand1 == Some(id)
            {
                break;
            }
            let mut v = value.clone();
            if let Some(end_order) = storage_end
                && lifetime_scope == LifetimeScope::Local
                && list.order_of(id) > end_order
            {
                v.kind = ValueKind::Impossible;
                v.push_breadcrumb(id, "The storage this refers to has gone out of scope".to_owned());
            }
            changed |= set_token_value(list, id, v);
        }
        cur = list.next(id);
    }
    changed
}
