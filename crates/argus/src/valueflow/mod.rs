//! The value-flow propagator.
//!
//! A series of ordered, idempotent sub-analyses, each walking the TU once.
//! A sub-analysis attaches values to expression tokens; later ones read and
//! extend them. The driver reruns the series until nothing changes or the
//! iteration budget is exhausted, polling the stop flag at the top of every
//! round. Value-flow never loops indefinitely and never aborts on its own
//! ambiguities: it narrows or widens and continues.

mod aliases;
mod conditions;
mod constfold;
mod containers;
mod forward;
mod functions;
mod lifetimes;
mod loops;

use crate::{
    analyzer::StopFlag,
    diagnostics::{ErrorLogger, ErrorMessage, Severity},
    errors::AnalysisResult,
    settings::Settings,
    symbols::SymbolDatabase,
    token::TokenId,
    tokenlist::TokenList,
    values::{AbstractValue, ValueKind},
};

/// Cap on values per token; reaching it triggers a bailout note.
const MAX_VALUES_PER_TOKEN: usize = 32;

pub fn run(
    list: &mut TokenList,
    db: &SymbolDatabase,
    settings: &Settings,
    logger: &mut dyn ErrorLogger,
    stop: &StopFlag,
) -> AnalysisResult<()> {
    for _ in 0..settings.max_valueflow_iterations {
        stop.check()?;
        let mut changed = false;
        changed |= constfold::literal_values(list, db, settings);
        changed |= constfold::structural_values(list, settings);
        changed |= forward::assignment_values(list, db, settings);
        changed |= conditions::condition_values(list, db, settings);
        changed |= loops::induction_values(list, db, settings, logger);
        changed |= aliases::alias_values(list, db, settings);
        changed |= functions::return_values(list, db, settings, logger);
        changed |= functions::subfunction_values(list, db, settings);
        changed |= lifetimes::lifetime_values(list, db, settings);
        changed |= containers::container_sizes(list, db, settings);
        if !changed {
            return Ok(());
        }
    }
    // Ran out of rounds before reaching a fixed point.
    if let Some(front) = list.front() {
        bailout(list, logger, front, "iteration limit reached before fixed point", settings);
    }
    report_incomplete_vars(list, db, settings, logger);
    Ok(())
}

/// Identifiers value-flow could not resolve to anything; each unresolved
/// name is reported once.
fn report_incomplete_vars(
    list: &TokenList,
    db: &SymbolDatabase,
    settings: &Settings,
    logger: &mut dyn ErrorLogger,
) {
    if !settings.debug_warnings {
        return;
    }
    let mut reported: ahash::AHashSet<&str> = ahash::AHashSet::new();
    for id in list.tokens() {
        let tok = list.token(id);
        if !matches!(tok.kind, crate::token::TokenKind::Identifier) || tok.var_id.is_some() || tok.function.is_some() {
            continue;
        }
        let Some(scope) = tok.scope else { continue };
        if !db.scope(scope).kind.is_executable() {
            continue;
        }
        if db.enumerators.contains_key(&tok.spelling_id()) {
            continue;
        }
        // Call names resolve through the library instead.
        if list.next(id).is_some_and(|n| list.is(n, "(")) {
            continue;
        }
        let name = list.str(id);
        if reported.insert(name) {
            logger.report(
                ErrorMessage::new(
                    "valueFlowBailoutIncompleteVar",
                    Severity::Information,
                    format!("ValueFlow analysis is limited: '{name}' is not resolved"),
                )
                .with_location(list.location(id)),
            );
        }
    }
}

/// Controlled analysis give-up on a local construct.
pub(crate) fn bailout(
    list: &TokenList,
    logger: &mut dyn ErrorLogger,
    tok: TokenId,
    what: &str,
    settings: &Settings,
) {
    if !settings.debug_warnings {
        return;
    }
    logger.report(
        ErrorMessage::new(
            "valueFlowBailout",
            Severity::Information,
            format!("ValueFlow bailout: {what}"),
        )
        .with_location(list.location(tok)),
    );
}

/// The single merge point for attaching a value to a token.
///
/// Enforces the union invariants: duplicates are dropped; a token holds at
/// most one Known value per payload variant — a disagreeing second Known
/// demotes both to Possible (the join rule). Returns whether anything
/// changed.
pub(crate) fn set_token_value(list: &mut TokenList, tok: TokenId, value: AbstractValue) -> bool {
    let values = &list.token(tok).values;
    if values.len() >= MAX_VALUES_PER_TOKEN {
        return false;
    }
    if values
        .iter()
        .any(|v| v.equal_data(&value) && v.kind == value.kind && v.bound == value.bound)
    {
        return false;
    }
    if value.kind == ValueKind::Known {
        if let Some(pos) = values
            .iter()
            .position(|v| v.kind == ValueKind::Known && v.same_variant(&value))
        {
            if values[pos].equal_data(&value) {
                return false;
            }
            // Two Knowns that disagree collapse to two Possibles.
            let mut demoted = value;
            demoted.set_possible();
            let tok_mut = list.token_mut(tok);
            tok_mut.values[pos].set_possible();
            tok_mut.values.push(demoted);
            return true;
        }
    }
    list.token_mut(tok).values.push(value);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{pretoken::lex, values::ValueData};

    fn list(code: &str) -> TokenList {
        TokenList::from_stream(&lex(code, "t.c").unwrap()).unwrap()
    }

    #[test]
    fn disagreeing_knowns_collapse_to_possibles() {
        let mut l = list("x");
        let tok = l.front().unwrap();
        assert!(set_token_value(&mut l, tok, AbstractValue::known_int(1)));
        assert!(set_token_value(&mut l, tok, AbstractValue::known_int(2)));
        let values = &l.token(tok).values;
        assert_eq!(values.len(), 2);
        assert!(values.iter().all(|v| v.kind == ValueKind::Possible));
    }

    #[test]
    fn duplicate_values_are_dropped() {
        let mut l = list("x");
        let tok = l.front().unwrap();
        assert!(set_token_value(&mut l, tok, AbstractValue::int(3)));
        assert!(!set_token_value(&mut l, tok, AbstractValue::int(3)));
        assert_eq!(l.token(tok).values.len(), 1);
    }

    #[test]
    fn known_of_distinct_variants_coexist(){
        let mut l = list("x");
        let tok = l.front().unwrap();
        assert!(set_token_value(&mut l, tok, AbstractValue::known_int(1)));
        let mut size = AbstractValue::container_size(4);
        size.set_known();
        assert!(set_token_value(&mut l, tok, size));
        let known: Vec<&ValueData> = l
            .token(tok)
            .values
            .iter()
            .filter(|v| v.kind == ValueKind::Known)
            .map(|v| &v.data)
            .collect();
        assert_eq!(known.len(), 2);
    }
}
