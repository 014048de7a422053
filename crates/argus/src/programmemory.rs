//! Program memory: the path-local mapping from expression ids to abstract
//! values, plus the bounded evaluator built on top of it.
//!
//! The map sits behind a shared handle with copy-on-write semantics so
//! branching duplicates state in O(1); mutation clones the map only when
//! the handle is shared. External iteration sorts by expression id so hash
//! ordering can never leak into diagnostics.

use std::sync::Arc;

use ahash::AHashMap;
use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{Signed, ToPrimitive, Zero};

use crate::{
    keywords::Keyword,
    settings::Settings,
    symbols::{ExprId, ScopeId, SymbolDatabase},
    token::TokenId,
    tokenlist::TokenList,
    values::{AbstractValue, Bound, ValueKind},
};

/// Copy-on-write map from expression id to current abstract value.
/// An empty map means "nothing known".
#[derive(Debug, Clone, Default)]
pub struct ProgramMemory {
    values: Arc<AHashMap<ExprId, AbstractValue>>,
}

impl ProgramMemory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Overwrites any prior value for the same expression.
    pub fn set_value(&mut self, expr: ExprId, value: AbstractValue) {
        Arc::make_mut(&mut self.values).insert(expr, value);
    }

    /// Current value; Impossible entries are filtered unless asked for.
    #[must_use]
    pub fn get_value(&self, expr: ExprId, allow_impossible: bool) -> Option<&AbstractValue> {
        let v = self.values.get(&expr)?;
        if v.is_impossible() && !allow_impossible {
            return None;
        }
        Some(v)
    }

    pub fn set_int_value(&mut self, expr: ExprId, value: impl Into<BigInt>) {
        self.set_value(expr, AbstractValue::known_int(value));
    }

    pub fn set_tok_value(&mut self, expr: ExprId, token: TokenId) {
        let mut v = AbstractValue::tok(token);
        v.set_known();
        self.set_value(expr, v);
    }

    pub fn set_container_size_value(&mut self, expr: ExprId, size: impl Into<BigInt>) {
        let mut v = AbstractValue::container_size(size);
        v.set_known();
        self.set_value(expr, v);
    }

    /// Asserts we lost track of the expression.
    pub fn set_unknown(&mut self, expr: ExprId) {
        Arc::make_mut(&mut self.values).remove(&expr);
    }

    /// Drops every entry whose key satisfies the predicate; used when a
    /// statement's side effects may touch many expressions.
    pub fn erase_if(&mut self, mut pred: impl FnMut(ExprId) -> bool) {
        Arc::make_mut(&mut self.values).retain(|k, _| !pred(*k));
    }

    pub fn clear(&mut self) {
        if !self.values.is_empty() {
            Arc::make_mut(&mut self.values).clear();
        }
    }

    /// Wholesale substitution on branch entry.
    pub fn replace(&mut self, other: Self) {
        self.values = other.values;
    }

    /// Deterministic view for rendering and joins.
    #[must_use]
    pub fn iter_sorted(&self) -> Vec<(ExprId, &AbstractValue)> {
        let mut entries: Vec<(ExprId, &AbstractValue)> = self.values.iter().map(|(k, v)| (*k, v)).collect();
        entries.sort_by_key(|(k, _)| *k);
        entries
    }

    /// The two handles share the same map (cheap equality used by joins).
    #[must_use]
    pub fn same_handle(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.values, &other.values)
    }
}

/// Refines `pm` under the assumption that `cond` evaluates to `truth`.
/// This is the engine of path-sensitive narrowing.
pub fn assume(pm: &mut ProgramMemory, list: &TokenList, cond: TokenId, truth: bool) {
    let s = list.str(cond);
    match s {
        "!" => {
            if let Some(inner) = list.token(cond).ast_operand1 {
                assume(pm, list, inner, !truth);
            }
        }
        "&&" if truth => {
            if let (Some(a), Some(b)) = (list.token(cond).ast_operand1, list.token(cond).ast_operand2) {
                assume(pm, list, a, true);
                assume(pm, list, b, true);
            }
        }
        "||" if !truth => {
            if let (Some(a), Some(b)) = (list.token(cond).ast_operand1, list.token(cond).ast_operand2) {
                assume(pm, list, a, false);
                assume(pm, list, b, false);
            }
        }
        "==" | "!=" | "<" | "<=" | ">" | ">=" => {
            assume_comparison(pm, list, cond, s, truth);
        }
        _ => {
            // Plain truthiness: `if (x)`.
            if let Some(expr) = list.token(cond).expr_id {
                if truth {
                    let mut v = AbstractValue::int(0);
                    v.kind = ValueKind::Impossible;
                    pm.set_value(expr, v);
                } else {
                    pm.set_int_value(expr, 0);
                }
            }
        }
    }
}

fn assume_comparison(pm: &mut ProgramMemory, list: &TokenList, cond: TokenId, op: &str, truth: bool) {
    let Some(lhs) = list.token(cond).ast_operand1 else { return };
    let Some(rhs) = list.token(cond).ast_operand2 else { return };
    // One side must be a constant.
    let (expr_tok, constant, flipped) = if let Some(n) = constant_of(list, rhs, pm) {
        (lhs, n, false)
    } else if let Some(n) = constant_of(list, lhs, pm) {
        (rhs, n, true)
    } else {
        return;
    };
    let Some(expr) = list.token(expr_tok).expr_id else { return };
    // Normalize to `expr OP constant`.
    let op = if flipped {
        match op {
            "<" => ">",
            "<=" => ">=",
            ">" => "<",
            ">=" => "<=",
            other => other,
        }
    } else {
        op
    };
    let effective = match (op, truth) {
        ("==", true) | ("!=", false) => Some(("==", constant)),
        ("==", false) | ("!=", true) => Some(("!=", constant)),
        ("<", true) | (">=", false) => Some(("<=", constant - 1)),
        ("<=", true) | (">", false) => Some(("<=", constant)),
        (">", true) | ("<=", false) => Some((">=", constant + 1)),
        (">=", true) | ("<", false) => Some((">=", constant)),
        _ => None,
    };
    match effective {
        Some(("==", n)) => pm.set_int_value(expr, n),
        Some(("!=", n)) => {
            let mut v = AbstractValue::int(n);
            v.kind = ValueKind::Impossible;
            pm.set_value(expr, v);
        }
        Some(("<=", n)) => {
            let v = AbstractValue::int(n).with_bound(Bound::Upper);
            pm.set_value(expr, v);
        }
        Some((">=", n)) => {
            let v = AbstractValue::int(n).with_bound(Bound::Lower);
            pm.set_value(expr, v);
        }
        _ => {}
    }
}

fn constant_of(list: &TokenList, tok: TokenId, pm: &ProgramMemory) -> Option<BigInt> {
    if let Some(n) = list.int_literal_value(tok) {
        return Some(n);
    }
    let expr = list.token(tok).expr_id?;
    let v = pm.get_value(expr, false)?;
    if v.bound == Bound::Point { v.as_int().cloned() } else { None }
}

/// Is the condition always true under the given memory?
#[must_use]
pub fn condition_is_true(list: &TokenList, cond: TokenId, pm: &ProgramMemory, settings: &Settings) -> bool {
    let mut steps = settings.max_evaluator_steps;
    let mut pm = pm.clone();
    matches!(evaluate(list, cond, &mut pm, settings, &mut steps), Some(n) if !n.is_zero())
}

/// Is the condition always false under the given memory?
#[must_use]
pub fn condition_is_false(list: &TokenList, cond: TokenId, pm: &ProgramMemory, settings: &Settings) -> bool {
    let mut steps = settings.max_evaluator_steps;
    let mut pm = pm.clone();
    matches!(evaluate(list, cond, &mut pm, settings, &mut steps), Some(n) if n.is_zero())
}

/// Evaluates an expression under `pm`. Returns `None` when the value is
/// not computable (unknown operand, division by zero, budget exhausted).
/// Assignments and increments update `pm` as a side effect.
///
/// Without a symbol view, calls are opaque; [`execute_scope`] and the
/// value-flow passes evaluate through [`evaluate_impl`], which follows
/// resolved calls into their bodies up to `Settings::max_call_depth`.
pub fn evaluate(
    list: &TokenList,
    tok: TokenId,
    pm: &mut ProgramMemory,
    settings: &Settings,
    steps: &mut u32,
) -> Option<BigInt> {
    evaluate_impl(list, None, tok, pm, settings, steps, 0)
}

fn evaluate_impl(
    list: &TokenList,
    db: Option<&SymbolDatabase>,
    tok: TokenId,
    pm: &mut ProgramMemory,
    settings: &Settings,
    steps: &mut u32,
    depth: u32,
) -> Option<BigInt> {
    if *steps == 0 {
        return None;
    }
    *steps -= 1;

    let t = list.token(tok);
    // Literal leaves.
    if let Some(n) = list.int_literal_value(tok) {
        return Some(n);
    }
    // Current program state.
    if let Some(expr) = t.expr_id
        && t.ast_operand1.is_none()
        && let Some(v) = pm.get_value(expr, false)
        && v.bound == Bound::Point
        && let Some(n) = v.as_int()
    {
        return Some(n.clone());
    }
    if t.keyword() == Some(Keyword::Sizeof) {
        return sizeof_value(list, tok, settings);
    }
    let op1 = t.ast_operand1;
    let op2 = t.ast_operand2;
    let s = list.str(tok).to_owned();
    match s.as_str() {
        "=" => {
            let rhs = evaluate_impl(list, db, op2?, pm, settings, steps, depth)?;
            if let Some(lhs_expr) = op1.and_then(|l| list.token(l).expr_id) {
                pm.set_int_value(lhs_expr, rhs.clone());
            }
            Some(rhs)
        }
        "+" if op2.is_none() => evaluate_impl(list, db, op1?, pm, settings, steps, depth),
        "-" if op2.is_none() => Some(-evaluate_impl(list, db, op1?, pm, settings, steps, depth)?),
        "~" => Some(-evaluate_impl(list, db, op1?, pm, settings, steps, depth)? - 1),
        "!" => {
            let v = evaluate_impl(list, db, op1?, pm, settings, steps, depth)?;
            Some(BigInt::from(i32::from(v.is_zero())))
        }
        "&&" => {
            let a = evaluate_impl(list, db, op1?, pm, settings, steps, depth)?;
            if a.is_zero() {
                return Some(BigInt::from(0));
            }
            let b = evaluate_impl(list, db, op2?, pm, settings, steps, depth)?;
            Some(BigInt::from(i32::from(!b.is_zero())))
        }
        "||" => {
            let a = evaluate_impl(list, db, op1?, pm, settings, steps, depth)?;
            if !a.is_zero() {
                return Some(BigInt::from(1));
            }
            let b = evaluate_impl(list, db, op2?, pm, settings, steps, depth)?;
            Some(BigInt::from(i32::from(!b.is_zero())))
        }
        "?" => {
            let cond = evaluate_impl(list, db, op1?, pm, settings, steps, depth)?;
            let colon = op2?;
            let branch = if cond.is_zero() {
                list.token(colon).ast_operand2?
            } else {
                list.token(colon).ast_operand1?
            };
            evaluate_impl(list, db, branch, pm, settings, steps, depth)
        }
        "," => {
            evaluate_impl(list, db, op1?, pm, settings, steps, depth);
            evaluate_impl(list, db, op2?, pm, settings, steps, depth)
        }
        "(" => {
            let inner = op1?;
            // Resolved calls are followed into the callee body, bounded by
            // the configured call depth.
            if let Some(fid) = list.token(inner).function {
                return evaluate_call(list, db?, tok, fid, pm, settings, steps, depth);
            }
            if op2.is_none() {
                // Cast: pass through with a wrap to the target width.
                let value = evaluate_impl(list, db, inner, pm, settings, steps, depth)?;
                return Some(wrap_cast_value(list, tok, value, settings));
            }
            None
        }
        "++" | "--" => {
            let operand = op1?;
            let old = evaluate_impl(list, db, operand, pm, settings, steps, depth)?;
            let new: BigInt = if s == "++" { &old + 1 } else { &old - 1 };
            if let Some(expr) = list.token(operand).expr_id {
                pm.set_int_value(expr, new.clone());
            }
            // Prefix yields the new value, postfix the old; the postfix
            // form has the operand on the left in source order.
            let is_postfix = list.order_of(operand) < list.order_of(tok);
            Some(if is_postfix { old } else { new })
        }
        _ => {
            let a = evaluate_impl(list, db, op1?, pm, settings, steps, depth)?;
            let b = evaluate_impl(list, db, op2?, pm, settings, steps, depth)?;
            evaluate_binary(&s, &a, &b)
        }
    }
}

/// Runs a resolved callee body under a fresh memory with the caller's
/// argument values bound to the parameters. Yields a value only when the
/// body evaluates deterministically to a single return; the recursion is
/// cut off at `Settings::max_call_depth`.
#[expect(clippy::too_many_arguments, reason = "internal recursion carries the whole evaluation state")]
fn evaluate_call(
    list: &TokenList,
    db: &SymbolDatabase,
    call: TokenId,
    fid: crate::symbols::FunctionId,
    pm: &mut ProgramMemory,
    settings: &Settings,
    steps: &mut u32,
    depth: u32,
) -> Option<BigInt> {
    if depth >= settings.max_call_depth {
        return None;
    }
    let function = db.function(fid);
    // A call that may dispatch to an override has no single body.
    if function.is_overridable() {
        return None;
    }
    let body = function.function_scope?;
    let scope = db.scope(body);
    let (Some(start), Some(end)) = (scope.body_start, scope.body_end) else {
        return None;
    };
    let mut callee_pm = ProgramMemory::new();
    for (i, &arg) in crate::astutils::get_arguments(list, call).iter().enumerate() {
        let Some(&param) = function.args.get(i) else { continue };
        let Some(value) = evaluate_impl(list, Some(db), arg, pm, settings, steps, depth) else {
            continue;
        };
        let param_tok = db.variable(param).name_token;
        if let Some(expr) = list.token(param_tok).expr_id {
            callee_pm.set_int_value(expr, value);
        }
    }
    let mut result = ExecuteResult {
        returns: Vec::new(),
        deterministic: true,
    };
    execute_range(list, db, start, end, &mut callee_pm, settings, steps, depth + 1, &mut result);
    if !result.deterministic || result.returns.len() != 1 {
        return None;
    }
    result.returns.first().and_then(|v| v.as_int().cloned())
}

/// Folds one binary operator over wide integers. Division by zero and
/// oversized shifts yield `None`.
pub(crate) fn evaluate_binary(op: &str, a: &BigInt, b: &BigInt) -> Option<BigInt> {
    let boolean = |cond: bool| Some(BigInt::from(i32::from(cond)));
    match op {
        "+" => Some(a + b),
        "-" => Some(a - b),
        "*" => Some(a * b),
        "/" | "%" => {
            if b.is_zero() {
                return None;
            }
            // C99 division truncates toward zero; the remainder keeps the
            // dividend's sign.
            let (quotient, remainder) = a.div_rem(b);
            Some(if op == "/" { quotient } else { remainder })
        }
        "&" => Some(a & b),
        "|" => Some(a | b),
        "^" => Some(a ^ b),
        "<<" => {
            let shift = b.to_u32().filter(|s| *s <= 1024)?;
            if b.is_negative() {
                return None;
            }
            Some(a << shift)
        }
        ">>" => {
            let shift = b.to_u32().filter(|s| *s <= 1024)?;
            Some(a >> shift)
        }
        "==" => boolean(a == b),
        "!=" => boolean(a != b),
        "<" => boolean(a < b),
        "<=" => boolean(a <= b),
        ">" => boolean(a > b),
        ">=" => boolean(a >= b),
        _ => None,
    }
}

/// Wraps a value into the integral type of a cast token.
pub(crate) fn wrap_cast_value(list: &TokenList, cast: TokenId, value: BigInt, settings: &Settings) -> BigInt {
    let Some(vt) = list.token(cast).value_type else {
        return value;
    };
    if !vt.is_integral() {
        return value;
    }
    let Some(bits) = vt.bits(&settings.platform) else {
        return value;
    };
    let modulus = BigInt::from(1) << bits;
    let mut wrapped = value % &modulus;
    if wrapped.is_negative() {
        wrapped += &modulus;
    }
    if vt.effective_sign(&settings.platform) == crate::valuetype::Sign::Signed {
        let half = BigInt::from(1) << (bits - 1);
        if wrapped >= half {
            wrapped -= modulus;
        }
    }
    wrapped
}

/// `sizeof ( type )` and `sizeof expr`, folded from the platform.
pub(crate) fn sizeof_value(list: &TokenList, sizeof_tok: TokenId, settings: &Settings) -> Option<BigInt> {
    if let Some(operand) = list.token(sizeof_tok).ast_operand1 {
        let vt = list.token(operand).value_type?;
        return vt.sizeof_bytes(&settings.platform).map(BigInt::from);
    }
    // Type form: the parens follow the keyword.
    let paren = list.next(sizeof_tok)?;
    if !list.is(paren, "(") {
        return None;
    }
    let close = list.token(paren).link?;
    let start = list.next(paren)?;
    if start == close {
        return None;
    }
    let vt = crate::symbols::parse_value_type(list, start, close, &SymbolDatabase::default());
    vt.sizeof_bytes(&settings.platform).map(BigInt::from)
}

/// Result of executing a scope body: the values flowing out of `return`
/// statements and whether every path was fully tracked.
#[derive(Debug, Default)]
pub struct ExecuteResult {
    pub returns: Vec<AbstractValue>,
    /// False when an unknown branch or call forced approximation.
    pub deterministic: bool,
}

/// Runs the bounded evaluator over a function body under `pm`, collecting
/// the values of `return` expressions. Never loops: bounded by the step
/// budget and structural recursion only.
pub fn execute_scope(
    list: &TokenList,
    db: &SymbolDatabase,
    scope: ScopeId,
    pm: &mut ProgramMemory,
    settings: &Settings,
) -> ExecuteResult {
    let mut result = ExecuteResult {
        returns: Vec::new(),
        deterministic: true,
    };
    let s = db.scope(scope);
    let (Some(start), Some(end)) = (s.body_start, s.body_end) else {
        result.deterministic = false;
        return result;
    };
    let mut steps = settings.max_evaluator_steps;
    execute_range(list, db, start, end, pm, settings, &mut steps, 0, &mut result);
    result
}

#[expect(clippy::too_many_arguments, reason = "internal recursion carries the whole evaluation state")]
fn execute_range(
    list: &TokenList,
    db: &SymbolDatabase,
    open: TokenId,
    close: TokenId,
    pm: &mut ProgramMemory,
    settings: &Settings,
    steps: &mut u32,
    depth: u32,
    result: &mut ExecuteResult,
) -> bool {
    // Returns true when control falls through the end of the range.
    let close_order = list.order_of(close);
    let mut cur = list.next(open);
    while let Some(id) = cur {
        // Branch skips may step over `close` itself; the ordinal check
        // keeps the walk inside the range either way.
        if id == close || list.order_of(id) >= close_order || *steps == 0 {
            break;
        }
        let tok = list.token(id);
        match tok.keyword() {
            Some(Keyword::Return) => {
                if let Some(expr) = tok.ast_operand1 {
                    if let Some(n) = evaluate_impl(list, Some(db), expr, pm, settings, steps, depth) {
                        result.returns.push(AbstractValue::known_int(n));
                    } else {
                        result.deterministic = false;
                    }
                }
                return false;
            }
            Some(Keyword::If) => {
                let Some((cond, then_open, then_close, else_body, chain_end)) = if_shape(list, id) else {
                    result.deterministic = false;
                    return false;
                };
                match evaluate_impl(list, Some(db), cond, pm, settings, steps, depth) {
                    Some(n) if !n.is_zero() => {
                        if !execute_range(list, db, then_open, then_close, pm, settings, steps, depth, result) {
                            return false;
                        }
                    }
                    Some(_) => {
                        if let Some((else_open, else_close)) = else_body
                            && !execute_range(list, db, else_open, else_close, pm, settings, steps, depth, result)
                        {
                            return false;
                        }
                    }
                    None => {
                        // Unknown condition: collect returns from both arms
                        // on cloned memories, then lose track of state.
                        result.deterministic = false;
                        let mut then_pm = pm.clone();
                        let then_falls = execute_range(
                            list, db, then_open, then_close, &mut then_pm, settings, steps, depth, result,
                        );
                        let mut else_falls = true;
                        if let Some((else_open, else_close)) = else_body {
                            let mut else_pm = pm.clone();
                            else_falls = execute_range(
                                list, db, else_open, else_close, &mut else_pm, settings, steps, depth, result,
                            );
                        }
                        pm.clear();
                        if !then_falls && !else_falls {
                            return false;
                        }
                    }
                }
                cur = list.next(chain_end);
                continue;
            }
            Some(kw @ (Keyword::While | Keyword::For | Keyword::Do | Keyword::Switch)) => {
                // Loops are not unrolled: collect possible returns from one
                // symbolic pass, then lose track of mutated state.
                result.deterministic = false;
                if let Some((body_open, body_close)) = loop_body(list, id) {
                    let mut body_pm = pm.clone();
                    execute_range(list, db, body_open, body_close, &mut body_pm, settings, steps, depth, result);
                    pm.clear();
                    cur = list.next(body_close);
                    if kw == Keyword::Do {
                        // Skip the `while ( ... ) ;` tail.
                        while let Some(t) = cur {
                            if list.is(t, "(") {
                                cur = list.token(t).link.and_then(|l| list.next(l));
                                continue;
                            }
                            if list.is(t, ";") {
                                cur = list.next(t);
                                break;
                            }
                            if t == close || list.is(t, "{") || list.is(t, "}") {
                                break;
                            }
                            cur = list.next(t);
                        }
                    }
                    continue;
                }
                pm.clear();
                return false;
            }
            Some(Keyword::Break | Keyword::Continue | Keyword::Goto) => {
                result.deterministic = false;
                return false;
            }
            _ => {}
        }
        // Expression statement roots.
        if tok.ast_parent.is_none() && (tok.ast_operand1.is_some() || tok.ast_operand2.is_some()) {
            if evaluate_impl(list, Some(db), id, pm, settings, steps, depth).is_none() {
                // Unknown statement effect; side effects may invalidate
                // anything the statement touches.
                invalidate_statement_effects(list, id, pm);
            }
        }
        cur = list.next(id);
    }
    true
}

/// Shape of a normalized if statement:
/// `if ( cond ) { … } [else { … } | else if …]`.
fn if_shape(
    list: &TokenList,
    if_tok: TokenId,
) -> Option<(TokenId, TokenId, TokenId, Option<(TokenId, TokenId)>, TokenId)> {
    let paren = list.next(if_tok).filter(|p| list.is(*p, "("))?;
    let close = list.token(paren).link?;
    let cond = condition_root(list, paren, close)?;
    let then_open = list.next(close).filter(|b| list.is(*b, "{"))?;
    let then_close = list.token(then_open).link?;
    let mut chain_end = then_close;
    let mut else_body = None;
    if let Some(els) = list.next(then_close)
        && list.token(els).keyword() == Some(Keyword::Else)
    {
        let after = list.next(els)?;
        if list.is(after, "{") {
            let else_close = list.token(after).link?;
            else_body = Some((after, else_close));
            chain_end = else_close;
        } else if list.token(after).keyword() == Some(Keyword::If) {
            // `else if` — treat the nested chain as the else body by
            // spanning from its `{` to the end of the chain.
            let (_, _, nested_close, nested_else, nested_end) = if_shape(list, after)?;
            let _ = (nested_close, nested_else);
            // Execute the nested if as a range containing it.
            let open = list.next(els)?;
            else_body = Some((list.prev(open)?, nested_end));
            chain_end = nested_end;
        }
    }
    Some((cond, then_open, then_close, else_body, chain_end))
}

/// Root token of the expression inside `( ... )`.
pub(crate) fn condition_root(list: &TokenList, open: TokenId, close: TokenId) -> Option<TokenId> {
    let mut cur = list.next(open);
    while let Some(id) = cur {
        if id == close {
            break;
        }
        let tok = list.token(id);
        if tok.expr_id.is_some() || tok.ast_operand1.is_some() {
            // Climb to the root inside the parens.
            let mut root = id;
            while let Some(parent) = list.token(root).ast_parent {
                if list.order_of(parent) <= list.order_of(open) || list.order_of(parent) >= list.order_of(close) {
                    break;
                }
                root = parent;
            }
            return Some(root);
        }
        cur = list.next(id);
    }
    None
}

fn loop_body(list: &TokenList, keyword_tok: TokenId) -> Option<(TokenId, TokenId)> {
    let mut cur = list.next(keyword_tok);
    while let Some(id) = cur {
        if list.is(id, "(") {
            cur = list.token(id).link.and_then(|l| list.next(l));
            continue;
        }
        if list.is(id, "{") {
            let close = list.token(id).link?;
            return Some((id, close));
        }
        if matches!(list.str(id), ";" | "}") {
            return None;
        }
        cur = list.next(id);
    }
    None
}

/// An opaque statement invalidates what it assigns to or passes by
/// address.
fn invalidate_statement_effects(list: &TokenList, root: TokenId, pm: &mut ProgramMemory) {
    let mut stack = vec![root];
    while let Some(id) = stack.pop() {
        let tok = list.token(id);
        if list.is_assignment_op(id) || matches!(list.str(id), "++" | "--") || list.is(id, "&") && tok.ast_operand2.is_none() {
            if let Some(target) = tok.ast_operand1.and_then(|o| list.token(o).expr_id) {
                pm.set_unknown(target);
            }
        }
        if list.is(id, "(") && tok.ast_operand1.is_some() {
            // A call may mutate anything reachable; drop everything.
            pm.clear();
            return;
        }
        if let Some(o) = tok.ast_operand1 {
            stack.push(o);
        }
        if let Some(o) = tok.ast_operand2 {
            stack.push(o);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::values::ValueKind;

    #[test]
    fn copy_is_cheap_and_diverges_on_write() {
        let mut a = ProgramMemory::new();
        a.set_int_value(ExprId(1), 5);
        let b = a.clone();
        assert!(a.same_handle(&b));
        a.set_int_value(ExprId(2), 7);
        assert!(!a.same_handle(&b));
        assert!(b.get_value(ExprId(2), false).is_none());
        assert_eq!(a.get_value(ExprId(1), false).unwrap().as_i64(), Some(5));
    }

    #[test]
    fn impossible_values_are_filtered() {
        let mut pm = ProgramMemory::new();
        let mut v = AbstractValue::int(3);
        v.kind = ValueKind::Impossible;
        pm.set_value(ExprId(1), v);
        assert!(pm.get_value(ExprId(1), false).is_none());
        assert!(pm.get_value(ExprId(1), true).is_some());
    }

    #[test]
    fn sorted_iteration() {
        let mut pm = ProgramMemory::new();
        for k in [9u32, 2, 7, 4] {
            pm.set_int_value(ExprId(k), i64::from(k));
        }
        let keys: Vec<u32> = pm.iter_sorted().iter().map(|(k, _)| k.value()).collect();
        assert_eq!(keys, [2, 4, 7, 9]);
    }
}
