//! Constant seeding and pure folding.
//!
//! Covers the leading sub-analyses: literal values, enumerators, global
//! constants, string-literal values, array sizes, sizeof folding, and the
//! structural propagation through `&&`/`||`/`?:` and pure operators.

use num_bigint::BigInt;
use num_traits::Zero;

use crate::{
    programmemory::sizeof_value,
    settings::Settings,
    symbols::{ScopeKind, SymbolDatabase},
    token::{TokenId, TokenKind},
    tokenlist::TokenList,
    values::{AbstractValue, ValueKind},
};

use super::set_token_value;

/// Seeds Known values on literals, enumerators, global constants, string
/// literals, array names and sizeof expressions.
pub(super) fn literal_values(list: &mut TokenList, db: &SymbolDatabase, settings: &Settings) -> bool {
    let mut changed = false;
    let ids: Vec<TokenId> = list.tokens().collect();
    for id in ids {
        let tok = list.token(id);
        match tok.kind {
            TokenKind::IntLiteral | TokenKind::CharLiteral => {
                if let Some(n) = list.int_literal_value(id) {
                    changed |= set_token_value(list, id, AbstractValue::known_int(n));
                }
            }
            TokenKind::FloatLiteral => {
                if let Some(f) = list.float_literal_value(id) {
                    let mut v = AbstractValue::float(f);
                    v.set_known();
                    changed |= set_token_value(list, id, v);
                }
            }
            TokenKind::Keyword(k) if list.is_bool_literal(id) => {
                let n = i64::from(k == crate::keywords::Keyword::True);
                changed |= set_token_value(list, id, AbstractValue::known_int(n));
            }
            TokenKind::Keyword(crate::keywords::Keyword::Sizeof | crate::keywords::Keyword::Alignof) => {
                if let Some(n) = sizeof_value(list, id, settings) {
                    changed |= set_token_value(list, id, AbstractValue::known_int(n));
                }
            }
            TokenKind::StringLiteral => {
                if let Some(content) = list.string_literal_content(id) {
                    let len = content.chars().count();
                    let mut tokval = AbstractValue::tok(id);
                    tokval.set_known();
                    changed |= set_token_value(list, id, tokval);
                    let mut buf = AbstractValue::buffer_size(len as u64 + 1);
                    buf.set_known();
                    changed |= set_token_value(list, id, buf);
                    let mut size = AbstractValue::container_size(len as u64);
                    size.set_known();
                    changed |= set_token_value(list, id, size);
                }
            }
            TokenKind::Identifier => {
                // Enumerator constants.
                if tok.var_id.is_none()
                    && let Some(value) = db.enumerators.get(&tok.spelling_id()).cloned()
                {
                    changed |= set_token_value(list, id, AbstractValue::known_int(value));
                }
            }
            TokenKind::VariableName => {
                if let Some(vid) = tok.var_id {
                    let var = db.variable(vid);
                    // Array names carry their allocation size.
                    if let Some(bytes) = var.array_byte_size(&settings.platform) {
                        let mut v = AbstractValue::buffer_size(bytes);
                        v.set_known();
                        changed |= set_token_value(list, id, v);
                    }
                }
            }
            _ => {}
        }
    }
    changed |= global_constants(list, db);
    changed
}

/// `const int N = 5;` at namespace scope: every use of `N` is 5.
fn global_constants(list: &mut TokenList, db: &SymbolDatabase) -> bool {
    let mut changed = false;
    let mut constants: Vec<(crate::symbols::VarId, BigInt)> = Vec::new();
    for (i, var) in db.variables.iter().enumerate() {
        if !var.is_const || var.is_pointer() || var.is_array() {
            continue;
        }
        let scope_kind = db.scope(var.scope).kind;
        if !matches!(scope_kind, ScopeKind::Global | ScopeKind::Namespace | ScopeKind::Class | ScopeKind::Struct) {
            continue;
        }
        // `= <integer literal> ;` after the declared name.
        let Some(eq) = list.next(var.name_token) else { continue };
        if !list.is(eq, "=") {
            continue;
        }
        let Some(value_tok) = list.next(eq) else { continue };
        let Some(semi) = list.next(value_tok) else { continue };
        if !list.is(semi, ";") {
            continue;
        }
        let Some(n) = list.int_literal_value(value_tok) else {
            continue;
        };
        constants.push((crate::symbols::VarId(u32::try_from(i).unwrap_or(u32::MAX)), n));
    }
    if constants.is_empty() {
        return false;
    }
    let ids: Vec<TokenId> = list.tokens().collect();
    for id in ids {
        let Some(vid) = list.token(id).var_id else { continue };
        if let Some((_, n)) = constants.iter().find(|(v, _)| *v == vid) {
            let n = n.clone();
            changed |= set_token_value(list, id, AbstractValue::known_int(n));
        }
    }
    changed
}

/// Pure folding over the AST: an operator whose operands have Known values
/// gets the computed Known value; `&&`/`||` short-circuit structurally and
/// `?:` unions its branch values.
pub(super) fn structural_values(list: &mut TokenList, settings: &Settings) -> bool {
    let mut changed = false;
    let ids: Vec<TokenId> = list.tokens().collect();
    for id in ids {
        let tok = list.token(id);
        if tok.ast_parent.is_none() && (tok.ast_operand1.is_some() || tok.ast_operand2.is_some()) {
            changed |= fold_recursive(list, id, settings);
        }
    }
    changed
}

fn fold_recursive(list: &mut TokenList, id: TokenId, settings: &Settings) -> bool {
    let mut changed = false;
    let op1 = list.token(id).ast_operand1;
    let op2 = list.token(id).ast_operand2;
    if let Some(o) = op1 {
        changed |= fold_recursive(list, o, settings);
    }
    if let Some(o) = op2 {
        changed |= fold_recursive(list, o, settings);
    }
    if list.token(id).known_int().is_some() {
        return changed;
    }
    let s = list.str(id).to_owned();
    match s.as_str() {
        "&&" | "||" => {
            let a = op1.and_then(|o| list.token(o).known_int().cloned());
            let b = op2.and_then(|o| list.token(o).known_int().cloned());
            let value = match (s.as_str(), &a, &b) {
                ("&&", Some(a), _) if a.is_zero() => Some(0),
                ("||", Some(a), _) if !a.is_zero() => Some(1),
                ("&&", Some(a), Some(b)) => Some(i64::from(!a.is_zero() && !b.is_zero())),
                ("||", Some(a), Some(b)) => Some(i64::from(!a.is_zero() || !b.is_zero())),
                _ => None,
            };
            if let Some(n) = value {
                changed |= set_token_value(list, id, AbstractValue::known_int(n));
            }
        }
        "?" => {
            // Union of the branch values, demoted to Possible unless the
            // condition is Known.
            let cond = op1.and_then(|o| list.token(o).known_int().cloned());
            if let Some(colon) = op2 {
                let branches = (list.token(colon).ast_operand1, list.token(colon).ast_operand2);
                let chosen = match &cond {
                    Some(c) if !c.is_zero() => vec![branches.0],
                    Some(_) => vec![branches.1],
                    None => vec![branches.0, branches.1],
                };
                let known = cond.is_some();
                for branch in chosen.into_iter().flatten() {
                    let vals: Vec<AbstractValue> = list.token(branch).values.clone();
                    for mut v in vals {
                        if !matches!(v.kind, ValueKind::Known | ValueKind::Possible) {
                            continue;
                        }
                        if !known {
                            v.set_possible();
                        }
                        changed |= set_token_value(list, id, v);
                    }
                }
            }
        }
        "!" => {
            if let Some(a) = op1.and_then(|o| list.token(o).known_int().cloned()) {
                changed |= set_token_value(list, id, AbstractValue::known_int(i64::from(a.is_zero())));
            }
        }
        "-" | "+" | "~" if op2.is_none() => {
            if let Some(a) = op1.and_then(|o| list.token(o).known_int().cloned()) {
                let n = match s.as_str() {
                    "-" => -a,
                    "~" => -a - 1,
                    _ => a,
                };
                changed |= set_token_value(list, id, AbstractValue::known_int(n));
            }
        }
        "+" | "-" | "*" | "/" | "%" | "&" | "|" | "^" | "<<" | ">>" | "==" | "!=" | "<" | "<=" | ">" | ">=" => {
            let a = op1.and_then(|o| list.token(o).known_int().cloned());
            let b = op2.and_then(|o| list.token(o).known_int().cloned());
            if let (Some(a), Some(b)) = (a, b)
                && let Some(n) = crate::programmemory::evaluate_binary(&s, &a, &b)
            {
                changed |= set_token_value(list, id, AbstractValue::known_int(n));
            }
            // Possible values flow through comparisons against constants in
            // the condition pass, not here.
        }
        "(" => {
            // Casts forward their operand's Known value, wrapped.
            if op2.is_none()
                && let Some(inner) = op1
                && list.token(inner).function.is_none()
                && list.token(id).link.is_some()
                && let Some(n) = list.token(inner).known_int().cloned()
            {
                let wrapped = crate::programmemory::wrap_cast_value(list, id, n, settings);
                changed |= set_token_value(list, id, AbstractValue::known_int(wrapped));
            }
        }
        _ => {}
    }
    changed
}
