//! Interprocedural propagation: function returns and subfunction
//! arguments.
//!
//! A call site inherits the callee's return value when every return
//! statement agrees on a Known value (Known unless the callee is
//! overridable). Otherwise the callee body is run through the bounded
//! evaluator with the caller's argument values injected; the Cartesian
//! product of argument values is capped and overflow is reported as an
//! information diagnostic. Symmetrically, argument expressions learn that
//! they are passed into the callee, and parameter tokens learn the values
//! callers pass.

use num_bigint::BigInt;

use crate::{
    astutils::get_arguments,
    diagnostics::{ErrorLogger, ErrorMessage, Severity},
    programmemory::{ProgramMemory, execute_scope},
    settings::Settings,
    symbols::{FunctionId, SymbolDatabase},
    token::TokenId,
    tokenlist::TokenList,
    values::{AbstractValue, Bound, LifetimeKind, LifetimeScope, ValueData, ValueKind},
};

use super::{bailout, set_token_value};

pub(super) fn return_values(
    list: &mut TokenList,
    db: &SymbolDatabase,
    settings: &Settings,
    logger: &mut dyn ErrorLogger,
) -> bool {
    let mut changed = false;
    let ids: Vec<TokenId> = list.tokens().collect();
    for id in ids {
        // Call sites: `(` with a resolved callee, skipping casts.
        if !list.is(id, "(") {
            continue;
        }
        let Some(callee) = list.token(id).ast_operand1 else { continue };
        let Some(fid) = list.token(callee).function else { continue };
        let function = db.function(fid);
        // A virtual call may dispatch anywhere; only `final` pins it down.
        if function.virtuality == crate::symbols::Virtuality::ImplicitVirtual {
            continue;
        }
        if list.token(id).has_known_value() {
            continue;
        }
        let Some(body) = function.function_scope else { continue };
        let returns = find_returns(list, db, body);
        if returns.is_empty() {
            continue;
        }
        let fname = list.interned_str(function.name).to_owned();

        if let Some(common) = common_known_value(list, &returns) {
            let mut value = common;
            if function.is_overridable() {
                value.set_possible();
            } else {
                value.set_known();
            }
            value.push_breadcrumb(id, format!("Calling function '{fname}' returns {}", value.describe()));
            changed |= set_token_value(list, id, value);
            continue;
        }

        // Inject caller arguments and run the body.
        let arguments = get_arguments(list, id);
        let mut value_lists: Vec<Vec<BigInt>> = Vec::with_capacity(arguments.len());
        for &arg in &arguments {
            let values: Vec<BigInt> = list
                .token(arg)
                .values
                .iter()
                .filter(|v| matches!(v.kind, ValueKind::Known | ValueKind::Possible) && v.bound == Bound::Point)
                .filter_map(|v| v.as_int().cloned())
                .collect();
            value_lists.push(values);
        }
        let combinations: u64 = value_lists
            .iter()
            .map(|l| l.len().max(1) as u64)
            .product();
        if combinations > u64::from(settings.max_config_product) {
            logger.report(
                ErrorMessage::new(
                    "toomanyconfigs",
                    Severity::Information,
                    format!(
                        "Too many argument value combinations for '{fname}' ({combinations}); exceeding ones were dropped."
                    ),
                )
                .with_location(list.location(id)),
            );
            continue;
        }
        let mut produced: Vec<AbstractValue> = Vec::new();
        let mut deterministic = true;
        let mut single_combination = true;
        for combo in cartesian(&value_lists) {
            if value_lists.iter().any(|l| l.len() > 1) {
                single_combination = false;
            }
            let mut pm = ProgramMemory::new();
            for (i, value) in combo.iter().enumerate() {
                let Some(value) = value else { continue };
                let Some(&param) = function.args.get(i) else { continue };
                let param_tok = db.variable(param).name_token;
                if let Some(expr) = list.token(param_tok).expr_id {
                    pm.set_int_value(expr, value.clone());
                }
            }
            let result = execute_scope(list, db, body, &mut pm, settings);
            deterministic &= result.deterministic;
            for v in result.returns {
                if matches!(v.data, ValueData::Uninit) {
                    continue;
                }
                produced.push(v);
            }
        }
        if produced.is_empty() {
            bailout(list, logger, id, "function body not evaluatable", settings);
            continue;
        }
        let keep_known = deterministic
            && single_combination
            && produced.len() == 1
            && !function.is_overridable();
        for mut v in produced {
            if !keep_known {
                v.set_possible();
            }
            v.push_breadcrumb(id, format!("Calling function '{fname}' returns {}", v.describe()));
            changed |= set_token_value(list, id, v);
        }
    }
    changed
}

/// Root tokens of all `return` expressions in a function body.
fn find_returns(list: &TokenList, db: &SymbolDatabase, body: crate::symbols::ScopeId) -> Vec<TokenId> {
    let mut out = Vec::new();
    let scope = db.scope(body);
    let (Some(start), Some(end)) = (scope.body_start, scope.body_end) else {
        return out;
    };
    let mut cur = list.next(start);
    while let Some(id) = cur {
        if id == end {
            break;
        }
        if list.token(id).keyword() == Some(crate::keywords::Keyword::Return)
            && let Some(expr) = list.token(id).ast_operand1
        {
            out.push(expr);
        }
        cur = list.next(id);
    }
    out
}

/// The single Known value every return statement agrees on, if any.
fn common_known_value(list: &TokenList, returns: &[TokenId]) -> Option<AbstractValue> {
    let first = list.token(*returns.first()?).values.iter().find(|v| {
        v.is_known() && matches!(v.data, ValueData::Int(_) | ValueData::Float(_) | ValueData::ContainerSize(_))
    })?;
    for &other in &returns[1..] {
        let matches = list
            .token(other)
            .values
            .iter()
            .any(|v| v.kind == first.kind && v.equal_data(first));
        if !matches {
            return None;
        }
    }
    Some(first.clone())
}

/// Iterator over the Cartesian product; empty per-argument lists
/// contribute a single "unbound" slot.
fn cartesian(lists: &[Vec<BigInt>]) -> Vec<Vec<Option<BigInt>>> {
    let mut out: Vec<Vec<Option<BigInt>>> = vec![Vec::new()];
    for list in lists {
        let mut next = Vec::new();
        if list.is_empty() {
            for combo in &out {
                let mut c = combo.clone();
                c.push(None);
                next.push(c);
            }
        } else {
            for value in list {
                for combo in &out {
                    let mut c = combo.clone();
                    c.push(Some(value.clone()));
                    next.push(c);
                }
            }
        }
        out = next;
    }
    out
}

/// The backward half: argument expressions learn where they flow, and
/// parameters learn what callers pass.
pub(super) fn subfunction_values(list: &mut TokenList, db: &SymbolDatabase, _settings: &Settings) -> bool {
    let mut changed = false;
    // Caller-side tags plus per-parameter value collection. Each call site
    // gets its own path tag so joined values stay distinguishable.
    let mut param_values: Vec<(FunctionId, usize, AbstractValue)> = Vec::new();
    let mut path: u32 = 0;
    let ids: Vec<TokenId> = list.tokens().collect();
    for id in ids {
        if !list.is(id, "(") {
            continue;
        }
        let Some(callee) = list.token(id).ast_operand1 else { continue };
        let Some(fid) = list.token(callee).function else { continue };
        let function = db.function(fid);
        if function.function_scope.is_none() {
            continue;
        }
        let fname = list.interned_str(function.name).to_owned();
        let arguments = get_arguments(list, id);
        path += 1;
        for (i, &arg) in arguments.iter().enumerate() {
            let Some(&param) = function.args.get(i) else { continue };
            let param_tok = db.variable(param).name_token;
            if let Some(target) = list.token(param_tok).expr_id {
                let mut tag = AbstractValue::new(ValueData::Lifetime {
                    target,
                    scope: LifetimeScope::SubFunction,
                    kind: LifetimeKind::Object,
                });
                tag.push_breadcrumb(arg, format!("Passed to '{fname}' as argument {}", i + 1));
                changed |= set_token_value(list, arg, tag);
            }
            // Values the caller passes flow into the parameter.
            for v in &list.token(arg).values {
                if matches!(v.kind, ValueKind::Known | ValueKind::Possible)
                    && matches!(v.data, ValueData::Int(_) | ValueData::Float(_))
                    && v.bound == Bound::Point
                {
                    let mut pv = v.clone();
                    pv.set_possible();
                    pv.path = path;
                    pv.push_breadcrumb(arg, format!("Calling '{fname}' with this value"));
                    param_values.push((fid, i, pv));
                }
            }
        }
    }
    // Attach collected values to parameter uses inside the bodies.
    for (fid, index, value) in param_values {
        let function = db.function(fid);
        let Some(&param) = function.args.get(index) else { continue };
        let Some(body) = function.function_scope else { continue };
        let scope = db.scope(body);
        let (Some(start), Some(end)) = (scope.body_start, scope.body_end) else {
            continue;
        };
        let mut cur = list.next(start);
        while let Some(id) = cur {
            if id == end {
                break;
            }
            if list.token(id).var_id == Some(param) {
                if is_param_write(list, id) {
                    break;
                }
                changed |= set_token_value(list, id, value.clone());
            }
            cur = list.next(id);
        }
    }
    changed
}

fn is_param_write(list: &TokenList, id: TokenId) -> bool {
    let Some(parent) = list.token(id).ast_parent else {
        return false;
    };
    (list.is_assignment_op(parent) && list.token(parent).ast_operand1 == Some(id))
        || matches!(list.str(parent), "++" | "--")
        || (list.is(parent, "&") && list.token(parent).ast_operand2.is_none())
}
