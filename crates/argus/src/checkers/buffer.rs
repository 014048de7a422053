//! Buffer overrun checks: direct array indexing and library calls with
//! minimum-size contracts.

use num_bigint::BigInt;

use crate::{
    analyzer::Analysis,
    astutils::{expr_text, get_arguments},
    diagnostics::{DiagnosticLocation, ErrorLogger, ErrorMessage, Severity},
    library::MinSize,
    settings::Settings,
    token::TokenId,
    tokenlist::TokenList,
    values::{Bound, ValueData, ValueKind},
};

use super::{CheckFailure, Checker, other::render_error_path};

pub struct CheckBuffer;

impl Checker for CheckBuffer {
    fn name(&self) -> &'static str {
        "Buffer"
    }

    fn class_info(&self) -> &'static str {
        "Out of bounds buffer access"
    }

    fn run_checks(
        &self,
        analysis: &Analysis,
        settings: &Settings,
        logger: &mut dyn ErrorLogger,
    ) -> Result<(), CheckFailure> {
        array_index_out_of_bounds(analysis, logger);
        library_buffer_overrun(analysis, settings, logger);
        Ok(())
    }

    fn error_messages(&self, logger: &mut dyn ErrorLogger) {
        logger.report(array_index_message(
            "a",
            &BigInt::from(5),
            &BigInt::from(6),
            false,
            &[],
            DiagnosticLocation::new("", 0, 0),
        ));
        logger.report(buffer_access_message("a", DiagnosticLocation::new("", 0, 0)));
    }
}

fn array_index_message(
    array: &str,
    dim: &BigInt,
    index: &BigInt,
    conditional: bool,
    error_path: &[DiagnosticLocation],
    primary: DiagnosticLocation,
) -> ErrorMessage {
    let mut stack = error_path.to_vec();
    stack.push(primary);
    let id = if conditional { "arrayIndexOutOfBoundsCond" } else { "arrayIndexOutOfBounds" };
    let severity = if conditional { Severity::Warning } else { Severity::Error };
    ErrorMessage::new(
        id,
        severity,
        format!("Array '{array}[{dim}]' accessed at index {index}, which is out of bounds."),
    )
    .with_callstack(stack)
    .with_cwe(788)
}

fn buffer_access_message(buffer: &str, primary: DiagnosticLocation) -> ErrorMessage {
    ErrorMessage::new(
        "bufferAccessOutOfBounds",
        Severity::Error,
        format!("Buffer is accessed out of bounds: {buffer}"),
    )
    .with_verbose(format!(
        "Buffer is accessed out of bounds: {buffer}. The call writes or reads past the end of the buffer. This \
         is undefined behaviour and may corrupt adjacent memory."
    ))
    .with_location(primary)
    .with_cwe(788)
}

/// `a[i]` with a known dimension and an index value at or past it.
fn array_index_out_of_bounds(analysis: &Analysis, logger: &mut dyn ErrorLogger) {
    let list = &analysis.tokens;
    let db = &analysis.symbols;
    for id in list.tokens() {
        if !list.is(id, "[") || list.token(id).ast_operand2.is_none() {
            continue;
        }
        let (Some(base), Some(index)) = (list.token(id).ast_operand1, list.token(id).ast_operand2) else {
            continue;
        };
        let Some(vid) = list.token(base).var_id else { continue };
        let var = db.variable(vid);
        let Some(Some(dim)) = var.array_dims.first().cloned() else {
            continue;
        };
        // Literal index or a value-flow result.
        let literal = list.int_literal_value(index);
        if let Some(n) = &literal {
            if *n >= dim {
                let name = list.str(base).to_owned();
                logger.report(array_index_message(&name, &dim, n, false, &[], list.location(id)));
            }
            continue;
        }
        // A Point or Lower bound at the dimension proves the overrun; an
        // Upper bound reaching it only shows the overrun is possible.
        let out_of_bounds = list.token(index).values.iter().find(|v| {
            matches!(v.kind, ValueKind::Known | ValueKind::Possible) && v.as_int().is_some_and(|n| *n >= dim)
        });
        if let Some(v) = out_of_bounds {
            let name = list.str(base).to_owned();
            let conditional = v.bound == Bound::Upper || v.condition.is_some() || v.is_possible();
            let path = render_error_path(list, v);
            let index_value = v.as_int().cloned().unwrap_or_default();
            logger.report(array_index_message(&name, &dim, &index_value, conditional, &path, list.location(id)));
        }
    }
}

/// Calls into modeled library functions: each min-size rule on an argument
/// is checked against what the caller actually passes.
fn library_buffer_overrun(analysis: &Analysis, settings: &Settings, logger: &mut dyn ErrorLogger) {
    let list = &analysis.tokens;
    let db = &analysis.symbols;
    for id in list.tokens() {
        // `name ( ... )` where the name resolves to a library model.
        if !list.token(id).is_name() {
            continue;
        }
        let Some(paren) = crate::astutils::call_paren(list, id) else {
            continue;
        };
        let Some(model) = settings.library.function(list.str(id)) else {
            continue;
        };
        let args = get_arguments(list, paren);
        if let Some(argc) = model.argc
            && args.len() != argc as usize
        {
            continue;
        }
        for arg_model in &model.args {
            let Some(&buffer_tok) = arg_index(arg_model.nr).and_then(|i| args.get(i)) else {
                continue;
            };
            let Some(capacity) = buffer_capacity(list, db, buffer_tok, settings) else {
                continue;
            };
            for min_size in &arg_model.min_sizes {
                let arg_at = |nr: u16| arg_index(nr).and_then(|i| args.get(i)).copied();
                let required = match min_size {
                    MinSize::ArgValue { arg } => arg_at(*arg).and_then(|t| known_int(list, t)),
                    MinSize::Strlen { arg } => arg_at(*arg).and_then(|t| string_length(list, t).map(|n| n + 1)),
                    MinSize::Mul { arg1, arg2 } => {
                        let a = arg_at(*arg1).and_then(|t| known_int(list, t));
                        let b = arg_at(*arg2).and_then(|t| known_int(list, t));
                        match (a, b) {
                            (Some(a), Some(b)) => Some(a * b),
                            _ => None,
                        }
                    }
                    MinSize::Fixed { bytes } => Some(BigInt::from(*bytes)),
                };
                if let Some(required) = required
                    && required > capacity
                {
                    logger.report(buffer_access_message(&expr_text(list, buffer_tok), list.location(id)));
                }
            }
        }
    }
}

/// Capacity in bytes of the expression passed as a buffer argument.
fn buffer_capacity(
    list: &TokenList,
    db: &crate::symbols::SymbolDatabase,
    tok: TokenId,
    settings: &Settings,
) -> Option<BigInt> {
    if let Some(vid) = list.token(tok).var_id {
        let var = db.variable(vid);
        if let Some(bytes) = var.array_byte_size(&settings.platform) {
            return Some(bytes);
        }
    }
    list.token(tok)
        .values
        .iter()
        .find(|v| {
            matches!(v.kind, ValueKind::Known | ValueKind::Possible) && matches!(v.data, ValueData::BufferSize(_))
        })
        .and_then(|v| match &v.data {
            ValueData::BufferSize(n) => Some(n.clone()),
            _ => None,
        })
}

/// 1-based model argument number to call-argument index.
fn arg_index(nr: u16) -> Option<usize> {
    (nr >= 1).then(|| nr as usize - 1)
}

fn known_int(list: &TokenList, tok: TokenId) -> Option<BigInt> {
    if let Some(n) = list.int_literal_value(tok) {
        return Some(n);
    }
    list.token(tok).known_int().cloned()
}

fn string_length(list: &TokenList, tok: TokenId) -> Option<BigInt> {
    if let Some(content) = list.string_literal_content(tok) {
        return Some(BigInt::from(content.chars().count()));
    }
    list.token(tok).values.iter().find_map(|v| match (&v.data, v.kind) {
        (ValueData::ContainerSize(n), ValueKind::Known) => Some(n.clone()),
        _ => None,
    })
}
