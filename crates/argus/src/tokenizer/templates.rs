//! Template instantiation (C++ only).
//!
//! A bounded pragmatic subset: type and value parameters, non-dependent
//! bodies, and full specializations chosen by exact argument match. Each
//! use of a template with concrete arguments clones the definition tokens
//! with parameters substituted and a mangled instance name. Recursive
//! instantiation is cut off at a configurable depth with an information
//! diagnostic; template forms outside the subset are rejected with an
//! information diagnostic rather than guessed at.

use ahash::{AHashMap, AHashSet};

use crate::{
    diagnostics::{ErrorLogger, ErrorMessage, Severity},
    errors::AnalysisResult,
    keywords::Keyword,
    settings::Settings,
    token::{TokenId, TokenKind},
    tokenlist::TokenList,
};

#[derive(Debug)]
struct TemplateDef {
    name: String,
    /// Parameter names in declaration order.
    params: Vec<String>,
    /// Concrete argument pattern for a full specialization
    /// (`template <> class X<int>`), empty for the primary.
    specialization: Vec<String>,
    /// Token range of the whole definition, `template` through the final
    /// `}` or `;`.
    first: TokenId,
    last: TokenId,
    /// Tokens of the instantiable entity (after the parameter list).
    body: Vec<(String, TokenKind, u32, u32, u32)>,
}

pub(super) fn instantiate(
    list: &mut TokenList,
    settings: &Settings,
    logger: &mut dyn ErrorLogger,
) -> AnalysisResult<()> {
    let defs = collect_definitions(list, logger);
    if defs.is_empty() {
        return Ok(());
    }
    let mut by_name: AHashMap<String, Vec<usize>> = AHashMap::new();
    for (i, def) in defs.iter().enumerate() {
        by_name.entry(def.name.clone()).or_default().push(i);
    }
    let mut def_tokens: AHashSet<TokenId> = AHashSet::new();
    for def in &defs {
        let mut cur = Some(def.first);
        while let Some(t) = cur {
            def_tokens.insert(t);
            if t == def.last {
                break;
            }
            cur = list.next(t);
        }
    }

    let mut instantiated: AHashSet<String> = AHashSet::new();
    let mut depth = 0;
    loop {
        let sites = find_instantiation_sites(list, &by_name, &def_tokens);
        if sites.is_empty() {
            break;
        }
        if depth >= settings.max_template_depth {
            if let Some(&(site, _)) = sites.first() {
                logger.report(
                    ErrorMessage::new(
                        "templateRecursion",
                        Severity::Information,
                        "Template instantiation depth limit reached; remaining instantiations skipped.",
                    )
                    .with_location(list.location(site)),
                );
            }
            // Collapse the remaining sites so later phases see plain names.
            for (site, args_end) in sites {
                collapse_site(list, site, args_end, &mangled_name(list, site, args_end));
            }
            break;
        }
        depth += 1;
        for (site, args_end) in sites {
            let args = site_arguments(list, site, args_end);
            let mangled = mangled_name(list, site, args_end);
            let def = match choose_definition(&defs, &by_name, list.str(site), &args) {
                Some(d) => d,
                None => {
                    collapse_site(list, site, args_end, &mangled);
                    continue;
                }
            };
            if instantiated.insert(mangled.clone()) {
                clone_definition(list, def, &args, &mangled);
            }
            collapse_site(list, site, args_end, &mangled);
        }
        list.link_brackets()?;
    }

    // The definitions themselves are not analyzable code; drop them.
    for def in &defs {
        remove_definition(list, def);
    }
    list.link_brackets()?;
    Ok(())
}

/// Scans for `template < params > entity` definitions.
fn collect_definitions(list: &mut TokenList, logger: &mut dyn ErrorLogger) -> Vec<TemplateDef> {
    let mut defs = Vec::new();
    let ids: Vec<TokenId> = list.tokens().collect();
    for id in ids {
        if list.token(id).keyword() != Some(Keyword::Template) {
            continue;
        }
        let Some(open) = list.next(id) else { continue };
        if !list.is(open, "<") {
            continue;
        }
        let Some(params_end) = matching_angle(list, open) else {
            continue;
        };
        // Parameter list.
        let mut params = Vec::new();
        let mut unsupported = false;
        let mut cur = list.next(open);
        while let Some(t) = cur {
            if t == params_end {
                break;
            }
            match list.str(t) {
                "typename" | "class" | "int" | "long" | "short" | "char" | "bool" | "unsigned" | "," => {}
                "..." => unsupported = true,
                s if list.token(t).is_name() => params.push(s.to_owned()),
                "=" => {
                    // Default arguments are outside the subset.
                    unsupported = true;
                }
                _ => unsupported = true,
            }
            cur = list.next(t);
        }
        // Entity after the parameter list.
        let Some(entity) = list.next(params_end) else { continue };
        let (name_tok, last) = match list.token(entity).keyword() {
            Some(Keyword::Class | Keyword::Struct) => {
                let Some(name) = list.next(entity) else { continue };
                // Specialization pattern: `class X < int >`.
                let Some(body_or_angle) = list.next(name) else { continue };
                let mut after_name = body_or_angle;
                let mut specialization = Vec::new();
                if list.is(body_or_angle, "<")
                    && let Some(spec_end) = matching_angle(list, body_or_angle)
                {
                    let mut t = list.next(body_or_angle);
                    while let Some(x) = t {
                        if x == spec_end {
                            break;
                        }
                        if !list.is(x, ",") {
                            specialization.push(list.str(x).to_owned());
                        }
                        t = list.next(x);
                    }
                    after_name = list.next(spec_end).unwrap_or(spec_end);
                }
                let Some(brace) = find_brace(list, after_name) else { continue };
                let Some(close) = list.token(brace).link else { continue };
                // Class definitions end at `} ;`.
                let last = list.next(close).filter(|s| list.is(*s, ";")).unwrap_or(close);
                if !specialization.is_empty() {
                    // The `< pattern >` tokens after the name are not part
                    // of the instantiable body.
                    let skip = (body_or_angle, list.prev(after_name).unwrap_or(after_name));
                    push_def(
                        list,
                        &mut defs,
                        id,
                        name,
                        last,
                        params,
                        specialization,
                        params_end,
                        Some(skip),
                    );
                    continue;
                }
                (name, last)
            }
            _ => {
                // Function template: `ret name ( ... ) { ... }`.
                let Some((name, last)) = function_entity(list, entity) else {
                    if !unsupported {
                        logger.report(
                            ErrorMessage::new(
                                "templateUnsupported",
                                Severity::Information,
                                "Unsupported template form; the template is not instantiated.",
                            )
                            .with_location(list.location(id)),
                        );
                    }
                    continue;
                };
                (name, last)
            }
        };
        if unsupported {
            logger.report(
                ErrorMessage::new(
                    "templateUnsupported",
                    Severity::Information,
                    "Unsupported template form; the template is not instantiated.",
                )
                .with_location(list.location(id)),
            );
            // Still record the range so the definition is removed.
        }
        push_def(
            list,
            &mut defs,
            id,
            name_tok,
            last,
            if unsupported { Vec::new() } else { params },
            Vec::new(),
            params_end,
            None,
        );
    }
    defs
}

#[expect(clippy::too_many_arguments, reason = "free helper local to this pass")]
fn push_def(
    list: &TokenList,
    defs: &mut Vec<TemplateDef>,
    template_kw: TokenId,
    name_tok: TokenId,
    last: TokenId,
    params: Vec<String>,
    specialization: Vec<String>,
    params_end: TokenId,
    skip: Option<(TokenId, TokenId)>,
) {
    // The instantiable entity: everything after the parameter list, minus
    // a specialization's `< pattern >` run.
    let mut body = Vec::new();
    let mut cur = list.next(params_end);
    while let Some(t) = cur {
        if let Some((skip_first, skip_last)) = skip
            && t == skip_first
        {
            if skip_last == last {
                break;
            }
            cur = list.next(skip_last);
            continue;
        }
        let tok = list.token(t);
        body.push((
            list.str(t).to_owned(),
            tok.kind,
            tok.file_index,
            tok.line,
            tok.column,
        ));
        if t == last {
            break;
        }
        cur = list.next(t);
    }
    defs.push(TemplateDef {
        name: list.str(name_tok).to_owned(),
        params,
        specialization,
        first: template_kw,
        last,
        body,
    });
}

/// `ret name ( ... ) { ... }` after the parameter list.
fn function_entity(list: &TokenList, start: TokenId) -> Option<(TokenId, TokenId)> {
    let mut cur = Some(start);
    let mut name = None;
    while let Some(t) = cur {
        if list.is(t, "(") {
            let close = list.token(t).link?;
            let brace = list.next(close)?;
            if !list.is(brace, "{") {
                return None;
            }
            return Some((name?, list.token(brace).link?));
        }
        if list.token(t).is_name() {
            name = Some(t);
        } else if matches!(list.str(t), ";" | "{" | "}") {
            return None;
        }
        cur = list.next(t);
    }
    None
}

fn find_brace(list: &TokenList, from: TokenId) -> Option<TokenId> {
    let mut cur = Some(from);
    while let Some(t) = cur {
        if list.is(t, "{") {
            return Some(t);
        }
        if matches!(list.str(t), ";" | "}") {
            return None;
        }
        cur = list.next(t);
    }
    None
}

/// Matches `<` with its `>` by depth counting; `>>` closes two levels.
fn matching_angle(list: &TokenList, open: TokenId) -> Option<TokenId> {
    let mut depth: i32 = 1;
    let mut cur = list.next(open);
    while let Some(t) = cur {
        match list.str(t) {
            "<" => depth += 1,
            ">" => {
                depth -= 1;
                if depth == 0 {
                    return Some(t);
                }
            }
            ">>" => {
                depth -= 2;
                if depth <= 0 {
                    return Some(t);
                }
            }
            ";" | "{" | "}" => return None,
            _ => {}
        }
        cur = list.next(t);
    }
    None
}

/// Uses of `name < concrete-args >` outside any definition range.
fn find_instantiation_sites(
    list: &TokenList,
    by_name: &AHashMap<String, Vec<usize>>,
    def_tokens: &AHashSet<TokenId>,
) -> Vec<(TokenId, TokenId)> {
    let mut sites = Vec::new();
    for id in list.tokens() {
        if def_tokens.contains(&id) || !list.token(id).is_name() {
            continue;
        }
        if !by_name.contains_key(list.str(id)) {
            continue;
        }
        if let Some(p) = list.prev(id)
            && matches!(list.token(p).keyword(), Some(Keyword::Class | Keyword::Struct | Keyword::Template))
        {
            continue;
        }
        let Some(open) = list.next(id) else { continue };
        if !list.is(open, "<") {
            continue;
        }
        if let Some(end) = matching_angle(list, open) {
            sites.push((id, end));
        }
    }
    sites
}

fn site_arguments(list: &TokenList, site: TokenId, args_end: TokenId) -> Vec<Vec<String>> {
    let mut args: Vec<Vec<String>> = vec![Vec::new()];
    let Some(open) = list.next(site) else { return Vec::new() };
    let mut cur = list.next(open);
    while let Some(t) = cur {
        if t == args_end {
            break;
        }
        if list.is(t, ",") {
            args.push(Vec::new());
        } else if let Some(last) = args.last_mut() {
            last.push(list.str(t).to_owned());
        }
        cur = list.next(t);
    }
    args.retain(|a| !a.is_empty());
    args
}

fn mangled_name(list: &TokenList, site: TokenId, args_end: TokenId) -> String {
    let args = site_arguments(list, site, args_end);
    let rendered: Vec<String> = args.iter().map(|a| a.join(" ")).collect();
    format!("{}<{}>", list.str(site), rendered.join(","))
}

/// Specializations with an exactly matching argument pattern win over the
/// primary definition.
fn choose_definition<'d>(
    defs: &'d [TemplateDef],
    by_name: &AHashMap<String, Vec<usize>>,
    name: &str,
    args: &[Vec<String>],
) -> Option<&'d TemplateDef> {
    let candidates = by_name.get(name)?;
    let flat: Vec<String> = args.iter().map(|a| a.join(" ")).collect();
    if let Some(&i) = candidates
        .iter()
        .find(|&&i| !defs[i].specialization.is_empty() && defs[i].specialization == flat)
    {
        return Some(&defs[i]);
    }
    candidates
        .iter()
        .map(|&i| &defs[i])
        .find(|d| d.specialization.is_empty() && d.params.len() == args.len())
}

/// Appends a clone of the definition with parameters substituted and the
/// name replaced by the mangled instance name.
fn clone_definition(list: &mut TokenList, def: &TemplateDef, args: &[Vec<String>], mangled: &str) {
    let substitution: AHashMap<&str, &[String]> = def
        .params
        .iter()
        .zip(args.iter())
        .map(|(p, a)| (p.as_str(), a.as_slice()))
        .collect();
    let def_name = def.name.clone();
    for (spelling, kind, file, line, column) in &def.body {
        if let Some(replacement) = substitution.get(spelling.as_str()) {
            for word in *replacement {
                list.append(word, super::normalize::classify_spelling(word), *file, *line, *column);
            }
            continue;
        }
        let spelling = if *spelling == def_name { mangled } else { spelling };
        list.append(spelling, *kind, *file, *line, *column);
    }
}

/// Rewrites `name < args >` at the use site into the single mangled name.
fn collapse_site(list: &mut TokenList, site: TokenId, args_end: TokenId, mangled: &str) {
    list.set_str(site, mangled);
    if let Some(open) = list.next(site) {
        list.remove_range(open, args_end);
    }
}

fn remove_definition(list: &mut TokenList, def: &TemplateDef) {
    list.remove_range(def.first, def.last);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{diagnostics::CollectingLogger, pretoken::lex};

    fn run(code: &str) -> (TokenList, CollectingLogger) {
        let mut list = TokenList::from_stream(&lex(code, "test.cpp").unwrap()).unwrap();
        list.link_brackets().unwrap();
        let mut logger = CollectingLogger::new();
        instantiate(&mut list, &Settings::default(), &mut logger).unwrap();
        (list, logger)
    }

    fn text(list: &TokenList) -> String {
        list.tokens().map(|t| list.str(t).to_owned()).collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn function_template_instantiation() {
        let (list, _) = run("template <typename T> T id(T x) { return x; } int main() { return id<int>(3); }");
        let t = text(&list);
        assert!(t.contains("int main ( ) { return id<int> ( 3 ) ; }"), "got: {t}");
        assert!(t.contains("int id<int> ( int x ) { return x ; }"), "got: {t}");
        assert!(!t.contains("template"), "definitions must be removed: {t}");
    }

    #[test]
    fn class_template_instantiation() {
        let (list, _) = run("template <class T> class Box { T v; }; Box<int> b;");
        let t = text(&list);
        assert!(t.starts_with("Box<int> b ;"), "got: {t}");
        assert!(t.contains("class Box<int> { int v ; } ;"), "got: {t}");
    }

    #[test]
    fn value_parameter_substitution() {
        let (list, _) = run("template <int N> int get() { return N; } int main() { return get<7>(); }");
        let t = text(&list);
        assert!(t.contains("int get<7> ( ) { return 7 ; }"), "got: {t}");
    }

    #[test]
    fn full_specialization_wins() {
        let (list, _) = run(
            "template <class T> class S { T v; }; template <> class S<int> { long v; }; S<int> s;",
        );
        let t = text(&list);
        assert!(t.contains("class S<int> { long v ; } ;"), "got: {t}");
        assert!(!t.contains("class S<int> { int v ; }"), "got: {t}");
    }

    #[test]
    fn variadic_templates_are_rejected_with_diagnostic() {
        let (_, logger) = run("template <typename... Ts> int f(Ts... xs) { return 0; }");
        assert!(logger.messages.iter().any(|m| m.id == "templateUnsupported"));
    }
}
