//! The upstream preprocessor contract.
//!
//! The tokenizer accepts a sequence of [`PreToken`] records: spelling, file
//! index, line, column, macro-origin flag and a lexical kind hint, plus the
//! file table. Macros are already expanded; the engine never re-tokenizes
//! source bytes itself.
//!
//! [`lex`] is the contract's reference producer: a plain lexer used by the
//! CLI and the test suite. It is not a preprocessor — it performs no macro
//! expansion — but it does harvest inline suppression comments, which live
//! in the token gaps and would otherwise be lost.

use crate::{
    errors::{AnalysisError, AnalysisResult},
    suppressions::{InlineSuppression, InlineSuppressionKind},
};

/// Lexical classification supplied by the preprocessor. The tokenizer may
/// refine it later (type names, variable names, function names).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KindHint {
    Identifier,
    Number,
    CharLiteral,
    StringLiteral,
    Operator,
    Punctuator,
}

/// One record of the preprocessed input stream.
#[derive(Debug, Clone)]
pub struct PreToken {
    pub spelling: String,
    pub file_index: u32,
    pub line: u32,
    pub column: u32,
    pub from_macro: bool,
    pub kind_hint: KindHint,
}

/// A whole preprocessed translation unit.
#[derive(Debug, Clone, Default)]
pub struct PreTokenStream {
    pub tokens: Vec<PreToken>,
    /// File table: index → path. Index 0 is the primary file.
    pub files: Vec<String>,
    pub inline_suppressions: Vec<InlineSuppression>,
}

const SUPPRESS_MARKER: &str = "argus-suppress";

/// Reference lexer producing the contract stream from raw source.
pub fn lex(source: &str, path: &str) -> AnalysisResult<PreTokenStream> {
    let mut stream = PreTokenStream {
        files: vec![path.to_owned()],
        ..PreTokenStream::default()
    };
    // Inline suppressions waiting for the statement they precede.
    let mut pending: Vec<String> = Vec::new();

    let bytes: Vec<char> = source.chars().collect();
    let mut i = 0usize;
    let mut line = 1u32;
    let mut column = 1u32;

    let syntax = |line: u32, column: u32, message: String| AnalysisError::Syntax {
        file: path.to_owned(),
        line,
        column,
        message,
    };

    while i < bytes.len() {
        let c = bytes[i];
        if c == '\n' {
            line += 1;
            column = 1;
            i += 1;
            continue;
        }
        if c.is_whitespace() {
            column += 1;
            i += 1;
            continue;
        }
        // Line comment.
        if c == '/' && bytes.get(i + 1) == Some(&'/') {
            let start = i + 2;
            let mut end = start;
            while end < bytes.len() && bytes[end] != '\n' {
                end += 1;
            }
            let text: String = bytes[start..end].iter().collect();
            harvest_suppression(text.trim(), line, &mut pending, &mut stream.inline_suppressions);
            column += u32::try_from(end - i).unwrap_or(0);
            i = end;
            continue;
        }
        // Block comment.
        if c == '/' && bytes.get(i + 1) == Some(&'*') {
            let start_line = line;
            let mut j = i + 2;
            let mut text = String::new();
            loop {
                if j + 1 >= bytes.len() {
                    return Err(syntax(start_line, column, "unterminated comment".to_owned()));
                }
                if bytes[j] == '*' && bytes[j + 1] == '/' {
                    break;
                }
                if bytes[j] == '\n' {
                    line += 1;
                    column = 0;
                }
                text.push(bytes[j]);
                j += 1;
                column += 1;
            }
            harvest_suppression(text.trim(), start_line, &mut pending, &mut stream.inline_suppressions);
            column += 2;
            i = j + 2;
            continue;
        }
        let tok_line = line;
        let tok_column = column;
        let (spelling, hint) = if c == '"' || c == '\'' {
            let quote = c;
            let mut j = i + 1;
            let mut s = String::new();
            s.push(quote);
            loop {
                if j >= bytes.len() || bytes[j] == '\n' {
                    let what = if quote == '"' { "string" } else { "character" };
                    return Err(syntax(tok_line, tok_column, format!("unterminated {what} literal")));
                }
                let ch = bytes[j];
                s.push(ch);
                j += 1;
                if ch == '\\' {
                    if j < bytes.len() {
                        s.push(bytes[j]);
                        j += 1;
                    }
                    continue;
                }
                if ch == quote {
                    break;
                }
            }
            i = j;
            let hint = if quote == '"' {
                KindHint::StringLiteral
            } else {
                KindHint::CharLiteral
            };
            (s, hint)
        } else if c.is_ascii_digit() || (c == '.' && bytes.get(i + 1).is_some_and(char::is_ascii_digit)) {
            // pp-number: digits, letters, dots, digit separators and
            // exponent signs after e/E/p/P.
            let mut j = i;
            let mut s = String::new();
            while j < bytes.len() {
                let ch = bytes[j];
                if ch.is_ascii_alphanumeric() || ch == '.' || ch == '\'' {
                    s.push(ch);
                    j += 1;
                } else if (ch == '+' || ch == '-')
                    && matches!(bytes.get(j.wrapping_sub(1)).copied(), Some('e' | 'E' | 'p' | 'P'))
                {
                    s.push(ch);
                    j += 1;
                } else {
                    break;
                }
            }
            i = j;
            (s, KindHint::Number)
        } else if c.is_alphabetic() || c == '_' {
            let mut j = i;
            let mut s = String::new();
            while j < bytes.len() && (bytes[j].is_alphanumeric() || bytes[j] == '_') {
                s.push(bytes[j]);
                j += 1;
            }
            i = j;
            (s, KindHint::Identifier)
        } else {
            let (s, punct) = lex_operator(&bytes, i)
                .ok_or_else(|| syntax(tok_line, tok_column, format!("impossible token '{c}'")))?;
            i += s.chars().count();
            (s, if punct { KindHint::Punctuator } else { KindHint::Operator })
        };
        column = tok_column + u32::try_from(spelling.chars().count()).unwrap_or(0);
        // A pending single-line suppression attaches to the statement the
        // next token starts.
        for id in pending.drain(..) {
            stream.inline_suppressions.push(InlineSuppression {
                id,
                line: tok_line,
                kind: InlineSuppressionKind::Single,
            });
        }
        stream.tokens.push(PreToken {
            spelling,
            file_index: 0,
            line: tok_line,
            column: tok_column,
            from_macro: false,
            kind_hint: hint,
        });
    }
    // Trailing suppression comments attach to their own line.
    for id in pending {
        stream.inline_suppressions.push(InlineSuppression {
            id,
            line,
            kind: InlineSuppressionKind::Single,
        });
    }
    Ok(stream)
}

/// Longest-match operator and punctuator scan.
fn lex_operator(bytes: &[char], i: usize) -> Option<(String, bool)> {
    const THREE: [&str; 5] = ["<<=", ">>=", "...", "->*", "<=>"];
    const TWO: [&str; 19] = [
        "::", "->", "++", "--", "<<", ">>", "<=", ">=", "==", "!=", "&&", "||", "+=", "-=", "*=", "/=", "%=", "&=",
        "|=",
    ];
    let take = |n: usize| -> Option<String> {
        if i + n <= bytes.len() {
            Some(bytes[i..i + n].iter().collect())
        } else {
            None
        }
    };
    if let Some(s) = take(3)
        && THREE.contains(&s.as_str())
    {
        return Some((s, false));
    }
    if let Some(s) = take(2)
        && (TWO.contains(&s.as_str()) || s == "^=")
    {
        return Some((s, false));
    }
    let c = bytes[i];
    if "()[]{},;".contains(c) {
        return Some((c.to_string(), true));
    }
    if "+-*/%&|^~!<>=?:.#".contains(c) {
        return Some((c.to_string(), false));
    }
    None
}

fn harvest_suppression(
    text: &str,
    line: u32,
    pending: &mut Vec<String>,
    out: &mut Vec<InlineSuppression>,
) {
    let Some(rest) = text.strip_prefix(SUPPRESS_MARKER) else {
        return;
    };
    if let Some(id) = rest.strip_prefix("-begin") {
        let id = id.trim();
        if !id.is_empty() {
            out.push(InlineSuppression {
                id: id.to_owned(),
                line,
                kind: InlineSuppressionKind::Begin,
            });
        }
    } else if let Some(id) = rest.strip_prefix("-end") {
        let id = id.trim();
        if !id.is_empty() {
            out.push(InlineSuppression {
                id: id.to_owned(),
                line,
                kind: InlineSuppressionKind::End,
            });
        }
    } else {
        let id = rest.trim();
        if !id.is_empty() {
            pending.push(id.to_owned());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lex_simple_function() {
        let stream = lex("int f(int x) { return x + 1; }", "a.c").unwrap();
        let spellings: Vec<&str> = stream.tokens.iter().map(|t| t.spelling.as_str()).collect();
        assert_eq!(
            spellings,
            ["int", "f", "(", "int", "x", ")", "{", "return", "x", "+", "1", ";", "}"]
        );
        assert_eq!(stream.tokens[0].line, 1);
        assert_eq!(stream.tokens[0].column, 1);
    }

    #[test]
    fn lex_operators_maximal_munch() {
        let stream = lex("a <<= b >> c->d;", "a.c").unwrap();
        let spellings: Vec<&str> = stream.tokens.iter().map(|t| t.spelling.as_str()).collect();
        assert_eq!(spellings, ["a", "<<=", "b", ">>", "c", "->", "d", ";"]);
    }

    #[test]
    fn lex_literals() {
        let stream = lex("char* s = \"a\\\"b\"; char c = 'x'; double d = 1.5e-3;", "a.c").unwrap();
        let hints: Vec<KindHint> = stream.tokens.iter().map(|t| t.kind_hint).collect();
        assert!(hints.contains(&KindHint::StringLiteral));
        assert!(hints.contains(&KindHint::CharLiteral));
        assert!(stream.tokens.iter().any(|t| t.spelling == "1.5e-3"));
    }

    #[test]
    fn unterminated_string_is_fatal() {
        assert!(lex("char* s = \"abc", "a.c").is_err());
    }

    #[test]
    fn inline_suppression_attaches_to_next_statement() {
        let code = "void f() {\n  // argus-suppress zerodiv\n  int x = 1 / 0;\n}\n";
        let stream = lex(code, "a.c").unwrap();
        let sup = &stream.inline_suppressions[0];
        assert_eq!(sup.id, "zerodiv");
        assert_eq!(sup.line, 3);
        assert_eq!(sup.kind, InlineSuppressionKind::Single);
    }
}
