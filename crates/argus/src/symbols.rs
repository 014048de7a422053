//! Scopes, variables, functions and user types.
//!
//! All symbol objects live in flat arenas inside [`SymbolDatabase`] and are
//! addressed by typed index newtypes. Tokens point back at their symbols by
//! those ids; nothing here is reference counted.

use ahash::AHashMap;
use num_bigint::BigInt;
use strum::Display;

use crate::{
    diagnostics::ErrorLogger,
    errors::AnalysisResult,
    intern::StringId,
    keywords::Keyword,
    settings::Settings,
    token::{TokenId, TokenKind},
    tokenlist::TokenList,
    valuetype::{BaseType, Sign, ValueType},
};

/// Identity of a declared object; doubles as the index into the variable
/// arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(pub(crate) u32);

impl VarId {
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FunctionId(pub(crate) u32);

impl FunctionId {
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(pub(crate) u32);

impl ScopeId {
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TypeId(pub(crate) u32);

impl TypeId {
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Fingerprint of a structurally equivalent expression; the key of program
/// memory and the deduplication unit of diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExprId(pub(crate) u32);

impl ExprId {
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    #[must_use]
    pub fn value(self) -> u32 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum ScopeKind {
    Global,
    Namespace,
    Class,
    Struct,
    Union,
    Enum,
    Function,
    Block,
    For,
    If,
    Else,
    While,
    Do,
    Switch,
    Try,
    Catch,
    Lambda,
}

impl ScopeKind {
    /// Scopes whose members are declarations rather than statements.
    #[must_use]
    pub fn is_declaration_scope(self) -> bool {
        matches!(
            self,
            Self::Global | Self::Namespace | Self::Class | Self::Struct | Self::Union
        )
    }

    /// Scopes executed as part of a function body.
    #[must_use]
    pub fn is_executable(self) -> bool {
        !self.is_declaration_scope() && self != Self::Enum
    }
}

/// A lexical region.
#[derive(Debug)]
pub struct Scope {
    pub kind: ScopeKind,
    /// Token that introduced the scope: the control keyword, the record
    /// name, or the function name.
    pub class_def: Option<TokenId>,
    /// The `{` and `}` tokens, when the scope is braced.
    pub body_start: Option<TokenId>,
    pub body_end: Option<TokenId>,
    pub parent: Option<ScopeId>,
    pub children: Vec<ScopeId>,
    pub variables: Vec<VarId>,
    pub functions: Vec<FunctionId>,
    /// For function scopes, the function whose body this is.
    pub function: Option<FunctionId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Storage {
    #[default]
    Auto,
    Static,
    Extern,
    ThreadLocal,
}

/// A declared object. Created during tokenization, immutable afterwards.
#[derive(Debug)]
pub struct Variable {
    pub name: StringId,
    /// The declaring name token; exactly one per variable.
    pub name_token: TokenId,
    pub type_start: TokenId,
    pub type_end: TokenId,
    pub scope: ScopeId,
    pub storage: Storage,
    pub is_const: bool,
    pub is_volatile: bool,
    pub is_reference: bool,
    pub pointer: u8,
    /// One entry per dimension; `None` for an unsized dimension.
    pub array_dims: Vec<Option<BigInt>>,
    /// 1-based argument position when this is a parameter.
    pub arg_nr: Option<u16>,
    /// True for recognized standard-library container types.
    pub is_container: bool,
    pub value_type: ValueType,
}

impl Variable {
    #[must_use]
    pub fn is_array(&self) -> bool {
        !self.array_dims.is_empty()
    }

    #[must_use]
    pub fn is_pointer(&self) -> bool {
        self.pointer > 0
    }

    #[must_use]
    pub fn is_argument(&self) -> bool {
        self.arg_nr.is_some()
    }

    /// Local storage: declared in an executable scope, not static/extern.
    #[must_use]
    pub fn is_local(&self, db: &SymbolDatabase) -> bool {
        self.storage == Storage::Auto && db.scope(self.scope).kind.is_executable()
    }

    /// Total byte size of an array variable, when every dimension and the
    /// element size are known.
    #[must_use]
    pub fn array_byte_size(&self, platform: &crate::platform::Platform) -> Option<BigInt> {
        if !self.is_array() {
            return None;
        }
        let elem = ValueType {
            pointer: 0,
            ..self.value_type
        }
        .sizeof_bytes(platform)?;
        let mut total = BigInt::from(elem);
        for dim in &self.array_dims {
            total *= dim.as_ref()?;
        }
        Some(total)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Virtuality {
    #[default]
    None,
    Virtual,
    Override,
    Final,
    /// Overrides a base-class virtual without saying so.
    ImplicitVirtual,
}

/// A callable entity; overloads are distinct functions.
#[derive(Debug)]
pub struct Function {
    pub name: StringId,
    /// Name token at the definition (or the declaration when there is no
    /// body in this TU).
    pub name_token: TokenId,
    /// The scope the function is declared in.
    pub scope: ScopeId,
    /// Body scope; `None` for declarations.
    pub function_scope: Option<ScopeId>,
    pub args: Vec<VarId>,
    pub return_type: Option<ValueType>,
    pub virtuality: Virtuality,
    pub is_static: bool,
}

impl Function {
    /// A call may dispatch to an override.
    #[must_use]
    pub fn is_overridable(&self) -> bool {
        matches!(
            self.virtuality,
            Virtuality::Virtual | Virtuality::Override | Virtuality::ImplicitVirtual
        )
    }

    /// Argument variable by 0-based position.
    #[must_use]
    pub fn argument_var(&self, index: usize) -> Option<VarId> {
        self.args.get(index).copied()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Class,
    Struct,
    Union,
    Enum,
}

/// A user-defined type with its members.
#[derive(Debug)]
pub struct UserType {
    pub name: StringId,
    pub kind: RecordKind,
    /// The record's body scope.
    pub scope: Option<ScopeId>,
    pub declared_in: ScopeId,
    pub base_types: Vec<StringId>,
}

/// Indexed views over all symbols of one translation unit.
#[derive(Debug, Default)]
pub struct SymbolDatabase {
    pub scopes: Vec<Scope>,
    pub variables: Vec<Variable>,
    pub functions: Vec<Function>,
    pub types: Vec<UserType>,
    /// Enumerator constants, visible TU-wide.
    pub enumerators: AHashMap<StringId, BigInt>,
}

impl SymbolDatabase {
    #[inline]
    #[must_use]
    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.index()]
    }

    #[inline]
    #[must_use]
    pub fn variable(&self, id: VarId) -> &Variable {
        &self.variables[id.index()]
    }

    #[inline]
    #[must_use]
    pub fn function(&self, id: FunctionId) -> &Function {
        &self.functions[id.index()]
    }

    #[must_use]
    pub fn global_scope(&self) -> ScopeId {
        ScopeId(0)
    }

    /// Walks `a` and its ancestors looking for `ancestor`.
    #[must_use]
    pub fn is_descendant_of(&self, a: ScopeId, ancestor: ScopeId) -> bool {
        let mut cur = Some(a);
        while let Some(s) = cur {
            if s == ancestor {
                return true;
            }
            cur = self.scope(s).parent;
        }
        false
    }

    /// Innermost function scope enclosing `scope`, if any.
    #[must_use]
    pub fn enclosing_function(&self, scope: ScopeId) -> Option<FunctionId> {
        let mut cur = Some(scope);
        while let Some(s) = cur {
            if let Some(f) = self.scope(s).function {
                return Some(f);
            }
            cur = self.scope(s).parent;
        }
        None
    }

    /// Overload set for a call by plain name, searching `from` and its
    /// ancestors.
    #[must_use]
    pub fn find_functions(&self, name: StringId, from: ScopeId) -> Vec<FunctionId> {
        let mut cur = Some(from);
        while let Some(s) = cur {
            let found: Vec<FunctionId> = self
                .scope(s)
                .functions
                .iter()
                .copied()
                .filter(|f| self.function(*f).name == name)
                .collect();
            if !found.is_empty() {
                return found;
            }
            cur = self.scope(s).parent;
        }
        Vec::new()
    }

    #[must_use]
    pub fn find_type(&self, name: StringId) -> Option<TypeId> {
        self.types
            .iter()
            .position(|t| t.name == name)
            .map(|i| TypeId(u32::try_from(i).unwrap_or(u32::MAX)))
    }

    /// Builds the symbol database: scope discovery, function and variable
    /// discovery, varid assignment. The token list must already be
    /// normalized with brackets linked.
    pub fn build(
        list: &mut TokenList,
        _settings: &Settings,
        _logger: &mut dyn ErrorLogger,
    ) -> AnalysisResult<Self> {
        let mut builder = Builder { db: Self::default() };
        builder.discover_scopes(list)?;
        builder.collect_enumerators(list);
        builder.discover_variables(list)?;
        builder.assign_varids(list);
        builder.resolve_calls(list);
        builder.mark_implicit_virtual();
        Ok(builder.db)
    }
}

struct Builder {
    db: SymbolDatabase,
}

impl Builder {
    fn new_scope(&mut self, kind: ScopeKind, parent: Option<ScopeId>) -> ScopeId {
        let id = ScopeId(u32::try_from(self.db.scopes.len()).unwrap_or(u32::MAX));
        self.db.scopes.push(Scope {
            kind,
            class_def: None,
            body_start: None,
            body_end: None,
            parent,
            children: Vec::new(),
            variables: Vec::new(),
            functions: Vec::new(),
            function: None,
        });
        if let Some(p) = parent {
            self.db.scopes[p.index()].children.push(id);
        }
        id
    }

    /// Pass 1: walk the token order, pushing a scope at every `{` and at
    /// function/namespace/record heads, popping at the matching `}`. Every
    /// token is stamped with its innermost scope.
    fn discover_scopes(&mut self, list: &mut TokenList) -> AnalysisResult<()> {
        let global = self.new_scope(ScopeKind::Global, None);
        let mut stack: Vec<(ScopeId, TokenId)> = Vec::new();
        let mut cur_scope = global;

        let mut cur = list.front();
        while let Some(id) = cur {
            if list.is(id, "{") {
                let (kind, class_def) = self.classify_brace(list, id, cur_scope);
                let scope = self.new_scope(kind, Some(cur_scope));
                self.db.scopes[scope.index()].class_def = class_def;
                self.db.scopes[scope.index()].body_start = Some(id);
                let close = list.token(id).link;
                self.db.scopes[scope.index()].body_end = close;
                match kind {
                    ScopeKind::Function => {
                        if let Some(name_tok) = class_def {
                            let f = self.create_function(list, name_tok, cur_scope, Some(scope))?;
                            self.db.scopes[scope.index()].function = Some(f);
                        }
                    }
                    ScopeKind::Class | ScopeKind::Struct | ScopeKind::Union | ScopeKind::Enum => {
                        self.create_user_type(list, kind, class_def, scope, cur_scope);
                    }
                    _ => {}
                }
                // The brace itself belongs to the new scope.
                list.token_mut(id).scope = Some(scope);
                if let Some(close) = close {
                    stack.push((cur_scope, close));
                }
                cur_scope = scope;
                cur = list.next(id);
                continue;
            }
            list.token_mut(id).scope = Some(cur_scope);
            if let Some(&(outer, close)) = stack.last()
                && close == id
            {
                stack.pop();
                cur_scope = outer;
            }
            cur = list.next(id);
        }
        // Function declarations without bodies.
        self.discover_function_declarations(list)?;
        Ok(())
    }

    /// Decides what kind of scope a `{` opens by looking backwards.
    fn classify_brace(&self, list: &TokenList, brace: TokenId, cur_scope: ScopeId) -> (ScopeKind, Option<TokenId>) {
        let Some(mut prev) = list.prev(brace) else {
            return (ScopeKind::Block, None);
        };
        // Trailing function specifiers sit between the `)` and the body.
        while matches!(list.str(prev), "override" | "final" | "const" | "noexcept") {
            match list.prev(prev) {
                Some(p) => prev = p,
                None => return (ScopeKind::Block, None),
            }
        }
        match list.token(prev).keyword() {
            Some(Keyword::Else) => return (ScopeKind::Else, Some(prev)),
            Some(Keyword::Do) => return (ScopeKind::Do, Some(prev)),
            Some(Keyword::Try) => return (ScopeKind::Try, Some(prev)),
            _ => {}
        }
        if list.is(prev, ")")
            && let Some(open) = list.token(prev).link
        {
            if let Some(before) = list.prev(open) {
                match list.token(before).keyword() {
                    Some(Keyword::If) => return (ScopeKind::If, Some(before)),
                    Some(Keyword::While) => {
                        // `do { } while ( ... )` never reaches here: the brace
                        // precedes the while.
                        return (ScopeKind::While, Some(before));
                    }
                    Some(Keyword::For) => return (ScopeKind::For, Some(before)),
                    Some(Keyword::Switch) => return (ScopeKind::Switch, Some(before)),
                    Some(Keyword::Catch) => return (ScopeKind::Catch, Some(before)),
                    _ => {}
                }
                if list.token(before).is_name() && self.db.scopes[cur_scope.index()].kind.is_declaration_scope() {
                    return (ScopeKind::Function, Some(before));
                }
                if list.is(before, "]") {
                    return (ScopeKind::Lambda, None);
                }
            }
            return (ScopeKind::Block, None);
        }
        // Record and namespace heads: `class X ... {`, `namespace N {`.
        let mut back = Some(prev);
        let mut name: Option<TokenId> = None;
        let mut steps = 0;
        while let Some(b) = back {
            if steps > 16 {
                break;
            }
            match list.token(b).keyword() {
                Some(Keyword::Class) => return (ScopeKind::Class, name),
                Some(Keyword::Struct) => return (ScopeKind::Struct, name),
                Some(Keyword::Union) => return (ScopeKind::Union, name),
                Some(Keyword::Enum) => return (ScopeKind::Enum, name),
                Some(Keyword::Namespace) => return (ScopeKind::Namespace, name),
                _ => {}
            }
            // The record name is the identifier nearest the keyword, so
            // later names overwrite earlier ones while walking back.
            if list.token(b).is_name() {
                name = Some(b);
            } else if !matches!(list.str(b), ":" | "," | "public" | "private" | "protected") {
                break;
            }
            back = list.prev(b);
            steps += 1;
        }
        (ScopeKind::Block, None)
    }

    fn create_user_type(
        &mut self,
        list: &TokenList,
        kind: ScopeKind,
        class_def: Option<TokenId>,
        scope: ScopeId,
        declared_in: ScopeId,
    ) {
        let Some(name_tok) = class_def else { return };
        let record_kind = match kind {
            ScopeKind::Class => RecordKind::Class,
            ScopeKind::Struct => RecordKind::Struct,
            ScopeKind::Union => RecordKind::Union,
            _ => RecordKind::Enum,
        };
        // Base types: `class D : public B1, B2 {`.
        let mut base_types = Vec::new();
        if let Some(colon) = list.next(name_tok)
            && list.is(colon, ":")
        {
            let mut t = list.next(colon);
            while let Some(b) = t {
                if list.is(b, "{") {
                    break;
                }
                if list.token(b).is_name() && !matches!(list.str(b), "public" | "private" | "protected") {
                    base_types.push(list.token(b).spelling_id());
                }
                t = list.next(b);
            }
        }
        self.db.types.push(UserType {
            name: list.token(name_tok).spelling_id(),
            kind: record_kind,
            scope: Some(scope),
            declared_in,
            base_types,
        });
    }

    /// Creates a function from its name token; parses parameters into
    /// argument variables owned by the body scope (or the owning scope for
    /// declarations).
    fn create_function(
        &mut self,
        list: &mut TokenList,
        name_tok: TokenId,
        owning: ScopeId,
        body: Option<ScopeId>,
    ) -> AnalysisResult<FunctionId> {
        let fid = FunctionId(u32::try_from(self.db.functions.len()).unwrap_or(u32::MAX));
        let name = list.token(name_tok).spelling_id();

        // Virtuality and storage from the tokens before the return type.
        let mut virtuality = Virtuality::None;
        let mut is_static = false;
        let mut ret_start: Option<TokenId> = None;
        let mut back = list.prev(name_tok);
        while let Some(b) = back {
            match list.token(b).keyword() {
                Some(Keyword::Virtual) => virtuality = Virtuality::Virtual,
                Some(Keyword::Static) => is_static = true,
                Some(k) if k.is_type_specifier() || k.is_decl_qualifier() => ret_start = Some(b),
                _ => {
                    if list.token(b).is_name() || matches!(list.str(b), "*" | "&" | "::" | "<" | ">") {
                        ret_start = Some(b);
                    } else {
                        break;
                    }
                }
            }
            back = list.prev(b);
        }
        let return_type = ret_start.map(|start| parse_value_type(list, start, name_tok, &self.db));

        // Trailing `override` / `final` after the `)`.
        let paren = list.next(name_tok);
        if let Some(paren) = paren
            && list.is(paren, "(")
            && let Some(close) = list.token(paren).link
        {
            let mut t = list.next(close);
            while let Some(tok) = t {
                match list.str(tok) {
                    "override" => virtuality = Virtuality::Override,
                    "final" => virtuality = Virtuality::Final,
                    "{" | ";" => break,
                    _ => {}
                }
                t = list.next(tok);
            }
        }

        self.db.functions.push(Function {
            name,
            name_token: name_tok,
            scope: owning,
            function_scope: body,
            args: Vec::new(),
            return_type,
            virtuality,
            is_static,
        });
        self.db.scopes[owning.index()].functions.push(fid);
        list.token_mut(name_tok).function = Some(fid);
        list.token_mut(name_tok).kind = TokenKind::FunctionName;

        // Parameters.
        if let Some(paren) = paren
            && list.is(paren, "(")
        {
            let arg_scope = body.unwrap_or(owning);
            let args = self.parse_parameters(list, paren, arg_scope)?;
            self.db.functions[fid.index()].args = args;
        }
        Ok(fid)
    }

    fn parse_parameters(
        &mut self,
        list: &mut TokenList,
        open_paren: TokenId,
        scope: ScopeId,
    ) -> AnalysisResult<Vec<VarId>> {
        let Some(close) = list.token(open_paren).link else {
            return Ok(Vec::new());
        };
        let mut args = Vec::new();
        let mut arg_nr: u16 = 1;
        let mut cur = list.next(open_paren);
        let mut start = cur;
        while let Some(id) = cur {
            if id == close || list.is(id, ",") {
                if let Some(s) = start
                    && s != id
                    && let Some(var) = self.parse_one_declaration(list, s, id, scope, Some(arg_nr))
                {
                    args.push(var);
                }
                arg_nr += 1;
                start = list.next(id);
            } else if let Some(link) = list.token(id).link
                && matches!(list.str(id), "(" | "[" | "{")
            {
                cur = list.next(link);
                continue;
            }
            if id == close {
                break;
            }
            cur = list.next(id);
        }
        Ok(args)
    }

    /// Function declarations without bodies: `ret name ( args ) ;` in a
    /// declaration scope.
    fn discover_function_declarations(&mut self, list: &mut TokenList) -> AnalysisResult<()> {
        let ids: Vec<TokenId> = list.tokens().collect();
        for id in ids {
            if !list.token(id).is_name() || list.token(id).function.is_some() {
                continue;
            }
            let Some(scope_id) = list.token(id).scope else { continue };
            if !self.db.scopes[scope_id.index()].kind.is_declaration_scope() {
                continue;
            }
            let Some(paren) = list.next(id) else { continue };
            if !list.is(paren, "(") {
                continue;
            }
            let Some(close) = list.token(paren).link else { continue };
            let Some(after) = list.next(close) else { continue };
            if !list.is(after, ";") {
                continue;
            }
            // Require a type before the name so calls in declaration scopes
            // are not misread as declarations.
            let Some(before) = list.prev(id) else { continue };
            let looks_typed = list.token(before).keyword().is_some_and(|k| k.is_type_specifier())
                || list.token(before).is_name()
                || matches!(list.str(before), "*" | "&");
            if !looks_typed {
                continue;
            }
            self.create_function(list, id, scope_id, None)?;
        }
        Ok(())
    }

    /// Enum bodies: `enum E { A, B = 4, C };` — records constants in the
    /// TU-wide enumerator table.
    fn collect_enumerators(&mut self, list: &TokenList) {
        for scope_index in 0..self.db.scopes.len() {
            if self.db.scopes[scope_index].kind != ScopeKind::Enum {
                continue;
            }
            let Some(start) = self.db.scopes[scope_index].body_start else {
                continue;
            };
            let Some(end) = self.db.scopes[scope_index].body_end else {
                continue;
            };
            let mut next_value = BigInt::from(0);
            let mut cur = list.next(start);
            while let Some(id) = cur {
                if id == end {
                    break;
                }
                if list.token(id).is_name() {
                    let name = list.token(id).spelling_id();
                    let mut value = next_value.clone();
                    if let Some(eq) = list.next(id)
                        && list.is(eq, "=")
                        && let Some(val_tok) = list.next(eq)
                    {
                        if let Some(n) = list.int_literal_value(val_tok) {
                            value = n;
                        } else if let Some(n) = self.db.enumerators.get(&list.token(val_tok).spelling_id()) {
                            value = n.clone();
                        }
                    }
                    next_value = &value + 1;
                    self.db.enumerators.insert(name, value);
                    // Skip to the comma.
                    while let Some(n) = cur {
                        if list.is(n, ",") || n == end {
                            break;
                        }
                        cur = list.next(n);
                    }
                    continue;
                }
                cur = list.next(id);
            }
        }
    }

    /// Pass 2: declaration discovery in every scope.
    fn discover_variables(&mut self, list: &mut TokenList) -> AnalysisResult<()> {
        let ids: Vec<TokenId> = list.tokens().collect();
        for id in ids {
            let Some(scope_id) = list.token(id).scope else { continue };
            let kind = self.db.scopes[scope_id.index()].kind;
            if kind == ScopeKind::Enum {
                continue;
            }
            // Statement starts only.
            let at_start = match list.prev(id) {
                None => true,
                Some(p) => matches!(list.str(p), ";" | "{" | "}"),
            };
            if !at_start {
                continue;
            }
            // `for (int i = 0; ...` declarations start right after the `(`.
            self.try_declaration_at(list, id, scope_id)?;
        }
        // `for` head declarations.
        let ids: Vec<TokenId> = list.tokens().collect();
        for id in ids {
            if list.token(id).keyword() == Some(Keyword::For)
                && let Some(paren) = list.next(id)
                && list.is(paren, "(")
                && let Some(first) = list.next(paren)
            {
                // Loop variables resolve from the head and the body; attach
                // them to the enclosing scope, which both can see.
                if let Some(scope_id) = list.token(id).scope {
                    self.try_declaration_at(list, first, scope_id)?;
                }
            }
        }
        Ok(())
    }

    /// Tries to parse one declaration statement starting at `id`. Combined
    /// declarations have been split by normalization, so one statement
    /// declares at most one variable.
    fn try_declaration_at(&mut self, list: &mut TokenList, id: TokenId, scope_id: ScopeId) -> AnalysisResult<()> {
        // Find the end of the statement.
        let mut end = id;
        loop {
            let Some(n) = list.next(end) else { break };
            if matches!(list.str(n), ";" | "{" | "}") {
                end = n;
                break;
            }
            if let Some(link) = list.token(n).link
                && matches!(list.str(n), "(" | "[")
            {
                end = link;
                continue;
            }
            end = n;
        }
        if !list.is(end, ";") {
            return Ok(());
        }
        self.parse_one_declaration(list, id, end, scope_id, None);
        Ok(())
    }

    /// Parses `qualifiers type declarator [= init]` in `[start, end)`.
    /// Returns the created variable, or `None` when the range is not a
    /// declaration.
    fn parse_one_declaration(
        &mut self,
        list: &mut TokenList,
        start: TokenId,
        end: TokenId,
        scope_id: ScopeId,
        arg_nr: Option<u16>,
    ) -> Option<VarId> {
        let mut storage = Storage::default();
        let mut is_const = false;
        let mut is_volatile = false;
        let mut saw_type = false;
        let mut is_container = false;
        let mut type_start: Option<TokenId> = None;
        let mut cur = Some(start);

        // Type and qualifier tokens.
        while let Some(id) = cur {
            if id == end {
                return None;
            }
            let tok = list.token(id);
            match tok.keyword() {
                Some(Keyword::Const) => is_const = true,
                Some(Keyword::Volatile) => is_volatile = true,
                Some(Keyword::Static) => storage = Storage::Static,
                Some(Keyword::Extern) => storage = Storage::Extern,
                Some(Keyword::ThreadLocal) => storage = Storage::ThreadLocal,
                Some(Keyword::Typedef | Keyword::Return | Keyword::Goto | Keyword::Break | Keyword::Continue) => {
                    return None;
                }
                Some(k) if k.is_type_specifier() => saw_type = true,
                Some(Keyword::Struct | Keyword::Class | Keyword::Union | Keyword::Enum | Keyword::Constexpr | Keyword::Inline | Keyword::Auto) => {}
                Some(_) => return None,
                None => {
                    if tok.is_name() {
                        let name_id = tok.spelling_id();
                        if saw_type {
                            // The declarator name.
                            break;
                        }
                        let spelled = list.str(id);
                        if matches!(spelled, "std") {
                            // `std :: vector < T >`-style type.
                            saw_type = true;
                            is_container = is_container_path(list, id);
                            cur = skip_type_path(list, id, end);
                            list.token_mut(id).kind = TokenKind::TypeName;
                            if type_start.is_none() {
                                type_start = Some(id);
                            }
                            continue;
                        }
                        let names_a_type = self.db.find_type(name_id).is_some() || known_type_name(spelled);
                        let container_name = matches!(spelled, "vector" | "string" | "deque" | "list" | "set" | "map");
                        if names_a_type {
                            saw_type = true;
                            is_container |= container_name;
                            cur = skip_type_path(list, id, end);
                            list.token_mut(id).kind = TokenKind::TypeName;
                            if type_start.is_none() {
                                type_start = Some(id);
                            }
                            continue;
                        }
                        // `A b ;` — treat A as a type when a name directly
                        // follows.
                        if !saw_type
                            && let Some(next) = list.next(id)
                            && (list.token(next).is_name() || matches!(list.str(next), "*" | "&"))
                        {
                            saw_type = true;
                            if type_start.is_none() {
                                type_start = Some(id);
                            }
                            cur = list.next(id);
                            continue;
                        }
                        return None;
                    }
                    if matches!(list.str(id), "*" | "&") && saw_type {
                        break;
                    }
                    return None;
                }
            }
            if type_start.is_none() {
                type_start = Some(id);
            }
            cur = list.next(id);
        }
        if !saw_type {
            return None;
        }
        let type_start = type_start?;

        // Declarator: skip over `*`, `&` and cv-qualifiers to the name;
        // the type parse below reads the same tokens.
        while let Some(id) = cur {
            if id == end {
                return None;
            }
            if !matches!(list.str(id), "*" | "&" | "const" | "volatile") {
                break;
            }
            cur = list.next(id);
        }
        let name_tok = cur?;
        if name_tok == end || !list.token(name_tok).is_name() {
            return None;
        }
        // Reject `name (` — that is a function, not a variable (function
        // pointers excepted, which normalization leaves alone).
        let mut array_dims = Vec::new();
        let mut after = list.next(name_tok);
        while let Some(id) = after {
            if id == end {
                break;
            }
            if list.is(id, "[")
                && let Some(close) = list.token(id).link
            {
                let dim = list
                    .next(id)
                    .filter(|d| *d != close)
                    .and_then(|d| constant_dimension(list, d, &self.db.enumerators));
                array_dims.push(dim);
                after = list.next(close);
                continue;
            }
            if list.is(id, "(") {
                return None;
            }
            break;
        }
        if let Some(id) = after
            && id != end
            && !matches!(list.str(id), "=" | ";" | "," | ")" | "{")
        {
            return None;
        }

        let type_end = list.prev(name_tok).unwrap_or(type_start);
        // The declaration range covers the declarator's `*`s, `&` and
        // cv-qualifiers, so the parsed type carries the full shape.
        let mut value_type = parse_value_type(list, type_start, name_tok, &self.db);
        value_type.is_const = value_type.is_const || is_const;
        let is_const = value_type.is_const;
        let pointer = value_type.pointer;
        let is_reference = value_type.reference;

        let vid = VarId(u32::try_from(self.db.variables.len()).unwrap_or(u32::MAX));
        self.db.variables.push(Variable {
            name: list.token(name_tok).spelling_id(),
            name_token: name_tok,
            type_start,
            type_end,
            scope: scope_id,
            storage,
            is_const,
            is_volatile,
            is_reference,
            pointer,
            array_dims,
            arg_nr,
            is_container,
            value_type,
        });
        self.db.scopes[scope_id.index()].variables.push(vid);
        let tok = list.token_mut(name_tok);
        tok.var_id = Some(vid);
        tok.kind = TokenKind::VariableName;
        tok.value_type = Some(value_type);
        Some(vid)
    }

    /// Pass 3: every identifier use gets the var id of the declaration it
    /// resolves to, walking the scope chain from the token's scope.
    fn assign_varids(&mut self, list: &mut TokenList) {
        // Name → variable per scope.
        let mut by_scope: Vec<AHashMap<StringId, VarId>> = Vec::with_capacity(self.db.scopes.len());
        for scope in &self.db.scopes {
            let mut map = AHashMap::new();
            for &vid in &scope.variables {
                map.insert(self.db.variables[vid.index()].name, vid);
            }
            by_scope.push(map);
        }
        let ids: Vec<TokenId> = list.tokens().collect();
        for id in ids {
            let tok = list.token(id);
            if !tok.is_name() || tok.var_id.is_some() || tok.function.is_some() {
                continue;
            }
            // Member accesses resolve against the record, not the scope
            // chain; leave them untouched.
            if let Some(p) = list.prev(id)
                && matches!(list.str(p), "." | "->" | "::")
            {
                continue;
            }
            let name = tok.spelling_id();
            let mut cur = tok.scope;
            while let Some(s) = cur {
                if let Some(&vid) = by_scope[s.index()].get(&name) {
                    let var_type = self.db.variables[vid.index()].value_type;
                    let t = list.token_mut(id);
                    t.var_id = Some(vid);
                    t.kind = TokenKind::VariableName;
                    t.value_type = Some(var_type);
                    break;
                }
                cur = self.db.scopes[s.index()].parent;
            }
        }
    }

    /// Pass 4: call-site tokens get their function back-pointer when the
    /// overload set has exactly one candidate.
    fn resolve_calls(&mut self, list: &mut TokenList) {
        let ids: Vec<TokenId> = list.tokens().collect();
        for id in ids {
            let tok = list.token(id);
            if !tok.is_name() || tok.var_id.is_some() || tok.function.is_some() {
                continue;
            }
            let Some(next) = list.next(id) else { continue };
            if !list.is(next, "(") {
                continue;
            }
            let Some(scope) = tok.scope else { continue };
            let name = tok.spelling_id();
            let overloads = self.db.find_functions(name, scope);
            if overloads.len() == 1 {
                let t = list.token_mut(id);
                t.function = Some(overloads[0]);
                t.kind = TokenKind::FunctionName;
            }
        }
    }

    /// Pass 5: a method overriding a base-class virtual without an explicit
    /// specifier is implicitly virtual.
    fn mark_implicit_virtual(&mut self) {
        let mut updates = Vec::new();
        for (fi, f) in self.db.functions.iter().enumerate() {
            if f.virtuality != Virtuality::None {
                continue;
            }
            // Owning record of this method.
            let owner = self
                .db
                .types
                .iter()
                .find(|t| t.scope == Some(f.scope));
            let Some(owner) = owner else { continue };
            for base_name in &owner.base_types {
                let Some(base) = self.db.types.iter().find(|t| t.name == *base_name) else {
                    continue;
                };
                let Some(base_scope) = base.scope else { continue };
                let base_has_virtual = self.db.scopes[base_scope.index()].functions.iter().any(|&bf| {
                    let bf = &self.db.functions[bf.index()];
                    bf.name == f.name && bf.is_overridable()
                });
                if base_has_virtual {
                    updates.push(fi);
                    break;
                }
            }
        }
        for fi in updates {
            self.db.functions[fi].virtuality = Virtuality::ImplicitVirtual;
        }
    }
}

/// True for identifiers that conventionally name types even without a
/// visible definition.
fn known_type_name(name: &str) -> bool {
    matches!(
        name,
        "size_t" | "ssize_t" | "ptrdiff_t" | "intptr_t" | "uintptr_t"
            | "int8_t" | "int16_t" | "int32_t" | "int64_t"
            | "uint8_t" | "uint16_t" | "uint32_t" | "uint64_t"
            | "FILE" | "string" | "vector" | "deque" | "list" | "set" | "map"
    )
}

/// Whether a `std :: name` path names a standard container.
fn is_container_path(list: &TokenList, std_tok: TokenId) -> bool {
    let Some(colons) = list.next(std_tok) else { return false };
    if !list.is(colons, "::") {
        return false;
    }
    list.next(colons)
        .is_some_and(|n| matches!(list.str(n), "vector" | "string" | "deque" | "list" | "set" | "map"))
}

/// Skips a qualified, possibly templated type path: `std :: vector < int >`.
fn skip_type_path(list: &TokenList, start: TokenId, end: TokenId) -> Option<TokenId> {
    let mut cur = list.next(start);
    while let Some(id) = cur {
        if id == end {
            return Some(id);
        }
        match list.str(id) {
            "::" => {
                cur = list.next(id).and_then(|n| list.next(n));
            }
            "<" => {
                // Template argument list: scan to the matching `>`.
                let mut depth = 1;
                let mut t = list.next(id);
                while let Some(x) = t {
                    if x == end {
                        return Some(x);
                    }
                    match list.str(x) {
                        "<" => depth += 1,
                        ">" => {
                            depth -= 1;
                            if depth == 0 {
                                return list.next(x);
                            }
                        }
                        ";" => return Some(x),
                        _ => {}
                    }
                    t = list.next(x);
                }
                return None;
            }
            _ => return Some(id),
        }
    }
    None
}

/// Array dimension: integer literal or enumerator.
fn constant_dimension(list: &TokenList, tok: TokenId, enums: &AHashMap<StringId, BigInt>) -> Option<BigInt> {
    if let Some(n) = list.int_literal_value(tok) {
        return Some(n);
    }
    enums.get(&list.token(tok).spelling_id()).cloned()
}

/// Computes a [`ValueType`] from the declaration tokens in
/// `[start, name_tok)`.
pub(crate) fn parse_value_type(list: &TokenList, start: TokenId, name_tok: TokenId, db: &SymbolDatabase) -> ValueType {
    let mut sign = Sign::Unknown;
    let mut base = BaseType::Unknown;
    let mut long_count = 0u8;
    let mut pointer = 0u8;
    let mut is_const = false;
    let mut reference = false;
    let mut cur = Some(start);
    while let Some(id) = cur {
        if id == name_tok {
            break;
        }
        match list.token(id).keyword() {
            Some(Keyword::Unsigned) => sign = Sign::Unsigned,
            Some(Keyword::Signed) => sign = Sign::Signed,
            Some(Keyword::Const) => is_const = true,
            Some(Keyword::Bool) => base = BaseType::Bool,
            Some(Keyword::Char) => base = BaseType::Char,
            Some(Keyword::Short) => base = BaseType::Short,
            Some(Keyword::Int) => {
                if base == BaseType::Unknown {
                    base = BaseType::Int;
                }
            }
            Some(Keyword::Long) => {
                long_count += 1;
                base = if long_count >= 2 { BaseType::LongLong } else { BaseType::Long };
            }
            Some(Keyword::Float) => base = BaseType::Float,
            Some(Keyword::Double) => {
                base = if long_count > 0 { BaseType::LongDouble } else { BaseType::Double };
            }
            Some(Keyword::Void) => base = BaseType::Void,
            Some(Keyword::WcharT) => base = BaseType::Int,
            _ => match list.str(id) {
                "*" => pointer = pointer.saturating_add(1),
                "&" => reference = true,
                _ => {
                    if base == BaseType::Unknown
                        && list.token(id).is_name()
                        && let Some(tid) = db.find_type(list.token(id).spelling_id())
                    {
                        base = BaseType::Record(tid);
                    }
                }
            },
        }
        cur = list.next(id);
    }
    if base == BaseType::Unknown && sign != Sign::Unknown {
        base = BaseType::Int;
    }
    if sign == Sign::Unknown && matches!(base, BaseType::Short | BaseType::Int | BaseType::Long | BaseType::LongLong) {
        sign = Sign::Signed;
    }
    ValueType {
        sign,
        base,
        pointer,
        is_const,
        reference,
    }
}
