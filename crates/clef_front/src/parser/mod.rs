//! The parser and semantic analyzer.
//!
//! One recursive-descent pass builds the AST and computes types as it
//! goes; there is no separate checking phase.  The submodules split
//! along the grammar:
//!
//! - [`declaration`]: specifiers, declarators, parameters, tags;
//! - [`expression`]: the Pratt expression sub-parser and the
//!   conversion/assignability rules;
//! - [`statement`]: statements and the label machinery;
//! - [`initializer`]: initializers.
//!
//! Error handling follows the recovery design: diagnostics accumulate
//! in the sink, syntactic failures eat tokens up to `;`/`}`/`)`, and
//! ill-typed nodes get the error type which every later rule accepts.
//! Nothing is unwound; the single `panic!` path is reserved for
//! violated internal invariants.

mod declaration;
mod expression;
mod initializer;
mod statement;

use crate::ast::{
    AstContext, CaseLabel, DeclArena, DeclId, DeclPayload, Declaration, Namespace, StorageClass,
    TranslationUnit,
};
use crate::lexer::Lexer;
use crate::scope::{Environment, ScopeId};
use crate::token::{Token, TokenKind};
use crate::types::{AtomicKind, FunctionType, Qualifiers, Type, TypeArena, TypeKind, TypeRef};
use crate::warning::Warnings;
use clef_base::{Diagnostics, Interner, Loc, Symbol};

const MAX_LOOKAHEAD: usize = 2;

/// The open switch statement, while its body is being parsed.  Case
/// and default labels append themselves here in source order.
pub(crate) struct SwitchContext<'a> {
    pub cases: Vec<CaseLabel<'a>>,
}

/// Saved scope state for the explicit save/restore discipline around
/// nested scopes.
#[derive(Clone, Copy)]
pub(crate) struct ScopeMark {
    env_top: usize,
    old_scope: ScopeId,
}

/// How a finished declaration is recorded.
#[derive(Clone, Copy, PartialEq, Eq)]
pub(crate) enum DeclMode {
    /// Normal recording into the current scope.
    Record,
    /// Part of a K&R parameter declaration list: fills the type of the
    /// placeholder created by the identifier list.
    KrParameter,
}

pub struct Parser<'a, 'e> {
    lexer: Lexer<'e>,
    pub(crate) token: Token,
    lookahead: [Token; MAX_LOOKAHEAD],
    lookahead_pos: usize,

    pub(crate) ctx: AstContext<'a>,
    pub(crate) interner: &'e mut Interner,
    pub(crate) types: &'e mut TypeArena,
    pub(crate) diags: &'e mut Diagnostics,
    pub(crate) warnings: &'e Warnings,
    pub(crate) strict: bool,

    pub(crate) decls: DeclArena<'a>,
    pub(crate) environment: Environment,
    pub(crate) labels: Environment,
    pub(crate) global_scope: ScopeId,
    pub(crate) current_scope: ScopeId,

    pub(crate) current_function: Option<DeclId>,
    pub(crate) current_switch: Option<SwitchContext<'a>>,
    pub(crate) loop_depth: u32,
    /// `goto`s of the current function, resolved by `check_labels`.
    pub(crate) gotos: Vec<(DeclId, Loc)>,
    /// Labels defined in the current function, for the unused check.
    pub(crate) defined_labels: Vec<(DeclId, Loc)>,

    pub(crate) had_initializer_brace_warning: bool,

    sym_main: Symbol,

    // Builtin typedef types, set up before the first declaration.
    pub(crate) type_size_t: TypeRef,
    pub(crate) type_ptrdiff_t: TypeRef,
    pub(crate) type_wchar_t: TypeRef,
    pub(crate) type_valist: TypeRef,
    pub(crate) type_char_ptr: TypeRef,
    pub(crate) type_char_ptr_ptr: TypeRef,
    pub(crate) type_wchar_ptr: TypeRef,
}

/// Parses one preprocessed translation unit.  Diagnostics land in the
/// sink; the caller rejects the result when the error counter is
/// non-zero.
pub fn parse_translation_unit<'a, 'e>(
    source: &'e str,
    display_name: &str,
    ctx: AstContext<'a>,
    interner: &'e mut Interner,
    types: &'e mut TypeArena,
    warnings: &'e Warnings,
    strict: bool,
    diags: &'e mut Diagnostics,
) -> TranslationUnit<'a> {
    let lexer = Lexer::new(source, display_name, interner, diags);

    let mut decls = DeclArena::new();
    let global_scope = decls.new_scope(None);

    let sym_main = interner.intern("main");
    let error = types.error_type();

    let mut parser = Parser {
        lexer,
        token: Token::eof(),
        lookahead: [Token::eof(), Token::eof()],
        lookahead_pos: 0,
        ctx,
        interner,
        types,
        diags,
        warnings,
        strict,
        decls,
        environment: Environment::new(),
        labels: Environment::new(),
        global_scope,
        current_scope: global_scope,
        current_function: None,
        current_switch: None,
        loop_depth: 0,
        gotos: Vec::new(),
        defined_labels: Vec::new(),
        had_initializer_brace_warning: false,
        sym_main,
        type_size_t: error,
        type_ptrdiff_t: error,
        type_wchar_t: error,
        type_valist: error,
        type_char_ptr: error,
        type_char_ptr_ptr: error,
        type_wchar_ptr: error,
    };

    for _ in 0..MAX_LOOKAHEAD + 1 {
        parser.next_token();
    }

    parser.initialize_builtin_types();

    while parser.token.kind != TokenKind::Eof {
        if parser.token.kind == TokenKind::Semicolon {
            let loc = parser.here();
            parser.diags.warning(loc, "stray ';' outside of function");
            parser.next_token();
        } else {
            parser.parse_external_declaration();
        }
    }

    parser.check_unused_globals();

    TranslationUnit {
        decls: parser.decls,
        global_scope,
    }
}

impl<'a, 'e> Parser<'a, 'e> {
    // ========================================================================
    // Token plumbing: a circular lookahead window of depth 2.
    // ========================================================================

    pub(crate) fn next_token(&mut self) {
        let fresh = self.lexer.next(self.interner, self.diags);
        self.token = std::mem::replace(&mut self.lookahead[self.lookahead_pos], fresh);
        self.lookahead_pos = (self.lookahead_pos + 1) % MAX_LOOKAHEAD;
    }

    pub(crate) fn look_ahead(&self, n: usize) -> &Token {
        debug_assert!(n >= 1 && n <= MAX_LOOKAHEAD);
        &self.lookahead[(self.lookahead_pos + n - 1) % MAX_LOOKAHEAD]
    }

    pub(crate) fn here(&self) -> Loc {
        self.token.loc
    }

    /// Consumes a token the caller already matched.
    pub(crate) fn eat(&mut self, kind: TokenKind) {
        debug_assert_eq!(self.token.kind, kind);
        self.next_token();
    }

    pub(crate) fn name_of(&self, sym: Symbol) -> String {
        self.interner.resolve(sym).to_string()
    }

    pub(crate) fn display_type(&self, ty: TypeRef) -> String {
        self.types.display(ty, &self.decls, self.interner)
    }

    pub(crate) fn decl_name(&self, decl: DeclId) -> String {
        match self.decls.get(decl).symbol {
            Some(sym) => self.name_of(sym),
            None => "<anonymous>".to_string(),
        }
    }

    // ========================================================================
    // Error reporting and resynchronization
    // ========================================================================

    pub(crate) fn parse_error_expected(&mut self, context: Option<&str>, expected: &str) {
        let got = self.token.kind.describe(self.interner);
        let loc = self.here();
        let message = match context {
            Some(ctx) => format!("got {}, expected {} while parsing {}", got, expected, ctx),
            None => format!("got {}, expected {}", got, expected),
        };
        self.diags.error(loc, message);
    }

    /// Eats a complete `{ ... }` block.
    pub(crate) fn eat_block(&mut self) {
        if self.token.kind == TokenKind::LBrace {
            self.next_token();
        }
        loop {
            match self.token.kind {
                TokenKind::RBrace => {
                    self.next_token();
                    return;
                }
                TokenKind::Eof => return,
                TokenKind::LBrace => self.eat_block(),
                _ => self.next_token(),
            }
        }
    }

    /// Eats tokens up to and including the next `;`, stopping early at
    /// a closing brace.
    pub(crate) fn eat_statement(&mut self) {
        loop {
            match self.token.kind {
                TokenKind::Semicolon => {
                    self.next_token();
                    return;
                }
                TokenKind::Eof | TokenKind::RBrace => return,
                TokenKind::LBrace => self.eat_block(),
                _ => self.next_token(),
            }
        }
    }

    /// Eats a parenthesized term.
    pub(crate) fn eat_paren(&mut self) {
        if self.token.kind == TokenKind::LParen {
            self.next_token();
        }
        loop {
            match self.token.kind {
                TokenKind::RParen => {
                    self.next_token();
                    return;
                }
                TokenKind::Eof | TokenKind::Semicolon | TokenKind::RBrace => return,
                TokenKind::LParen => self.eat_paren(),
                TokenKind::LBrace => self.eat_block(),
                _ => self.next_token(),
            }
        }
    }

    /// Expects and consumes `kind`; on mismatch reports and
    /// resynchronizes at statement granularity.
    #[must_use = "resynchronization must abort the production"]
    pub(crate) fn expect(&mut self, kind: TokenKind) -> bool {
        if self.token.kind == kind {
            self.next_token();
            return true;
        }
        let expected = format!("'{}'", kind);
        self.parse_error_expected(None, &expected);
        self.eat_statement();
        false
    }

    /// Like [`Parser::expect`] but resynchronizes at block granularity.
    #[must_use = "resynchronization must abort the production"]
    pub(crate) fn expect_block(&mut self, kind: TokenKind) -> bool {
        if self.token.kind == kind {
            self.next_token();
            return true;
        }
        let expected = format!("'{}'", kind);
        self.parse_error_expected(None, &expected);
        self.eat_block();
        false
    }

    /// Soft variant used inside expressions: reports and continues
    /// without token recovery, leaving the decision to the caller.
    pub(crate) fn expect_soft(&mut self, kind: TokenKind) -> bool {
        if self.token.kind == kind {
            self.next_token();
            return true;
        }
        let expected = format!("'{}'", kind);
        self.parse_error_expected(None, &expected);
        false
    }

    // ========================================================================
    // Scopes and name binding
    // ========================================================================

    pub(crate) fn enter_scope(&mut self, scope: ScopeId) -> ScopeMark {
        let mark = ScopeMark {
            env_top: self.environment.top(),
            old_scope: self.current_scope,
        };
        self.current_scope = scope;
        mark
    }

    pub(crate) fn leave_scope(&mut self, mark: ScopeMark) {
        self.current_scope = mark.old_scope;
        self.environment.pop_to(mark.env_top);
    }

    pub(crate) fn get_declaration(&self, symbol: Symbol, namespace: Namespace) -> Option<DeclId> {
        self.environment.lookup(symbol, namespace)
    }

    /// Installs `decl` as the visible binding of its symbol/namespace,
    /// saving the shadowed one on the environment stack.
    pub(crate) fn environment_push(&mut self, decl: DeclId) {
        let d = self.decls.get(decl);
        let symbol = d.symbol.expect("cannot bind an anonymous declaration");
        let namespace = d.namespace;
        self.environment.push(symbol, namespace, decl);
    }

    /// Labels have function scope: the declaration is re-homed to the
    /// current function's scope no matter where it appeared.
    pub(crate) fn label_push(&mut self, decl: DeclId) {
        let function = self
            .current_function
            .expect("label outside of a function");
        let scope = self.decls.get(function).own_scope;
        self.decls.get_mut(decl).parent_scope = scope;
        let d = self.decls.get(decl);
        let symbol = d.symbol.expect("label without a name");
        self.labels.push(symbol, Namespace::Label, decl);
    }

    /// Appends `decl` at the end of the current scope's chain.
    pub(crate) fn append_declaration(&mut self, decl: DeclId) {
        self.decls.append_to_scope(self.current_scope, decl);
    }

    pub(crate) fn is_typedef_symbol(&self, symbol: Symbol) -> bool {
        match self.get_declaration(symbol, Namespace::Ordinary) {
            Some(decl) => self.decls.get(decl).storage_class == StorageClass::Typedef,
            None => false,
        }
    }

    /// Could this token start a declaration?  With
    /// `only_type_specifiers`, storage classes and qualifiers do not
    /// count (the `sizeof '(' typename` disambiguation).
    pub(crate) fn is_declaration_specifier(
        &self,
        token: &Token,
        only_type_specifiers: bool,
    ) -> bool {
        use TokenKind::*;
        match &token.kind {
            Void | Char | Short | Int | Long | Float_ | Double | Signed | Unsigned | Bool
            | Complex | Imaginary | Struct | Union | Enum | Typeof | BuiltinVaList => true,
            Identifier(sym) => self.is_typedef_symbol(*sym),
            Extension | Typedef | Extern | Static | Auto | Register | Thread | Const
            | Restrict | Volatile | Inline => !only_type_specifiers,
            _ => false,
        }
    }

    // ========================================================================
    // Declaration recording
    // ========================================================================

    /// Records a declaration in the current scope, composing it with a
    /// previous declaration of the same symbol and namespace per the
    /// linkage rules.  Returns the effective declaration.
    pub(crate) fn record_declaration(&mut self, decl: DeclId) -> DeclId {
        self.internal_record_declaration(decl, false)
    }

    pub(crate) fn record_function_definition(&mut self, decl: DeclId) -> DeclId {
        self.internal_record_declaration(decl, true)
    }

    fn internal_record_declaration(&mut self, decl: DeclId, is_definition: bool) -> DeclId {
        let d = self.decls.get(decl);
        let symbol = d.symbol.expect("recording an anonymous declaration");
        let namespace = d.namespace;
        let loc = d.loc.unwrap_or_default();
        let orig_ty = d.ty.unwrap_or_else(|| self.types.error_type());
        let ty = self.types.skip_typeref(orig_ty);

        let function = self.types.function_info(self.types.skip_alias(ty));

        if let Some(f) = &function {
            if f.unspecified_parameters && self.warnings.strict_prototypes && !f.kr_style {
                let shown = self.display_type(orig_ty);
                self.diags.warning(
                    loc,
                    format!("function declaration '{}' is not a prototype", shown),
                );
            }
        }

        if is_definition && self.warnings.main && symbol == self.sym_main {
            if let Some(f) = function {
                self.check_type_of_main(decl, &f);
            }
        }

        if let Some(previous) = self.get_declaration(symbol, namespace) {
            assert_ne!(previous, decl, "declaration recorded twice");
            if self.decls.get(previous).parent_scope == Some(self.current_scope) {
                self.merge_with_previous(decl, previous, is_definition);
                return previous;
            }
        } else if is_definition {
            if self.decls.get(decl).storage_class != StorageClass::Static
                && symbol != self.sym_main
            {
                let shown = self.display_type(orig_ty);
                if self.warnings.missing_prototypes {
                    self.diags
                        .warning(loc, format!("no previous prototype for '{}'", shown));
                } else if self.warnings.missing_declarations {
                    self.diags
                        .warning(loc, format!("no previous declaration for '{}'", shown));
                }
            }
        } else if self.warnings.missing_declarations
            && self.current_scope == self.global_scope
            && !self.types.is_function(self.types.skip_alias(ty))
            && matches!(
                self.decls.get(decl).storage_class,
                StorageClass::None | StorageClass::Thread
            )
        {
            let name = self.name_of(symbol);
            self.diags
                .warning(loc, format!("no previous declaration for '{}'", name));
        }

        self.environment_push(decl);
        self.append_declaration(decl);
        decl
    }

    /// The composition rules for a redeclaration in the same scope:
    /// K&R placeholder filling, compatibility checking, completing
    /// array sizes and prototypes, and the storage class merge.
    fn merge_with_previous(&mut self, decl: DeclId, previous: DeclId, is_definition: bool) {
        let loc = self.decls.get(decl).loc.unwrap_or_default();
        let symbol = self.decls.get(decl).symbol.expect("named declaration");

        // K&R parameter placeholders receive their first type here
        if self.decls.get(previous).ty.is_none() {
            self.decls.get_mut(previous).ty = self.decls.get(decl).ty;
            return;
        }

        let new_orig = self.decls.get(decl).ty.expect("declared type");
        let prev_orig = self.decls.get(previous).ty.expect("declared type");
        let ty = self.types.skip_typeref(new_orig);
        let prev_ty = self.types.skip_typeref(prev_orig);

        if !self.types.compatible(ty, prev_ty) {
            let shown_new = self
                .types
                .display_declared(new_orig, &self.name_of(symbol), &self.decls, self.interner);
            let shown_prev = self
                .types
                .display_declared(prev_orig, &self.name_of(symbol), &self.decls, self.interner);
            self.diags.error(
                loc,
                format!(
                    "declaration '{}' is incompatible with previous declaration '{}'",
                    shown_new, shown_prev
                ),
            );
            let prev_loc = self.decls.get(previous).loc.unwrap_or_default();
            let name = self.name_of(symbol);
            self.diags.note(
                prev_loc,
                format!("previous declaration of '{}' was here", name),
            );
            return;
        }

        // the later declaration may complete the earlier type:
        // an array gains its size, `()` gains a prototype
        let completes = match (self.types.kind(prev_ty), self.types.kind(ty)) {
            (
                TypeKind::Array {
                    size: crate::types::ArraySize::Unknown,
                    ..
                },
                TypeKind::Array { size, .. },
            ) => !matches!(size, crate::types::ArraySize::Unknown),
            (TypeKind::Function(p), TypeKind::Function(n)) => {
                p.unspecified_parameters && !n.unspecified_parameters
            }
            _ => false,
        };
        if completes {
            self.decls.get_mut(previous).ty = Some(new_orig);
        }

        let mut old_storage = self.decls.get(previous).storage_class;
        let mut new_storage = self.decls.get(decl).storage_class;
        let is_function = self.types.is_function(self.types.skip_alias(ty));

        // a function declaration with no storage class acts as extern
        if is_function {
            if old_storage == StorageClass::None {
                old_storage = StorageClass::Extern;
            }
            if old_storage == StorageClass::Extern {
                if is_definition {
                    let unspecified = match self.types.kind(prev_ty) {
                        TypeKind::Function(f) => f.unspecified_parameters,
                        _ => false,
                    };
                    if self.warnings.missing_prototypes
                        && unspecified
                        && symbol != self.sym_main
                    {
                        let shown = self.display_type(new_orig);
                        self.diags
                            .warning(loc, format!("no previous prototype for '{}'", shown));
                    }
                } else if new_storage == StorageClass::None {
                    new_storage = StorageClass::Extern;
                }
            }
        }

        if old_storage == StorageClass::Extern && new_storage == StorageClass::Extern {
            self.warn_redundant_declaration(decl, previous);
        } else if self.current_function.is_none() {
            if old_storage != StorageClass::Static && new_storage == StorageClass::Static {
                let name = self.name_of(symbol);
                self.diags.error(
                    loc,
                    format!(
                        "static declaration of '{}' follows non-static declaration",
                        name
                    ),
                );
                let prev_loc = self.decls.get(previous).loc.unwrap_or_default();
                self.diags.note(
                    prev_loc,
                    format!("previous declaration of '{}' was here", name),
                );
            } else {
                if old_storage != StorageClass::Extern && !is_definition {
                    self.warn_redundant_declaration(decl, previous);
                }
                if new_storage == StorageClass::None {
                    self.decls.get_mut(previous).storage_class = StorageClass::None;
                }
            }
        } else {
            let name = self.name_of(symbol);
            if old_storage == new_storage {
                self.diags
                    .error(loc, format!("redeclaration of '{}'", name));
            } else {
                self.diags.error(
                    loc,
                    format!("redeclaration of '{}' with different linkage", name),
                );
            }
            let prev_loc = self.decls.get(previous).loc.unwrap_or_default();
            self.diags.note(
                prev_loc,
                format!("previous declaration of '{}' was here", name),
            );
        }
    }

    fn warn_redundant_declaration(&mut self, decl: DeclId, previous: DeclId) {
        if !self.warnings.redundant_decls {
            return;
        }
        let name = self.decl_name(decl);
        let loc = self.decls.get(decl).loc.unwrap_or_default();
        self.diags
            .warning(loc, format!("redundant declaration for '{}'", name));
        let prev_loc = self.decls.get(previous).loc.unwrap_or_default();
        self.diags.note(
            prev_loc,
            format!("previous declaration of '{}' was here", name),
        );
    }

    pub(crate) fn error_multiple_definition(&mut self, previous: DeclId, loc: Loc) {
        let name = self.decl_name(previous);
        self.diags
            .error(loc, format!("multiple definition of symbol '{}'", name));
        let prev_loc = self.decls.get(previous).loc.unwrap_or_default();
        self.diags.note(
            prev_loc,
            "this is the location of the previous definition",
        );
    }

    /// `main` should be a non-static function returning `int` taking
    /// `()`, `(int, char**)` or `(int, char**, char**)`.
    fn check_type_of_main(&mut self, decl: DeclId, func_type: &FunctionType) {
        let loc = self.decls.get(decl).loc.unwrap_or_default();
        if self.decls.get(decl).storage_class == StorageClass::Static {
            self.diags
                .warning(loc, "'main' is normally a non-static function");
        }
        let int = self.types.atomic(AtomicKind::Int);
        let ret = self.types.skip_typeref(func_type.return_type);
        if ret != int {
            let shown = self.display_type(func_type.return_type);
            self.diags.warning(
                loc,
                format!("return type of 'main' should be 'int', but is '{}'", shown),
            );
        }
        let params = &func_type.parameters;
        if params.is_empty() {
            return;
        }
        if !self.types.compatible(params[0], int) {
            let shown = self.display_type(params[0]);
            self.diags.warning(
                loc,
                format!(
                    "first argument of 'main' should be 'int', but is '{}'",
                    shown
                ),
            );
        }
        for param in params.iter().skip(1).take(2) {
            if !self.types.compatible(*param, self.type_char_ptr_ptr) {
                let shown = self.display_type(*param);
                self.diags.warning(
                    loc,
                    format!(
                        "second and third argument of 'main' should be 'char**', but found '{}'",
                        shown
                    ),
                );
            }
        }
        if params.len() == 1 || params.len() > 3 {
            self.diags
                .warning(loc, "'main' takes only zero, two or three arguments");
        }
    }

    // ========================================================================
    // External declarations and function definitions
    // ========================================================================

    pub(crate) fn parse_external_declaration(&mut self) {
        let specifiers = self.parse_declaration_specifiers();

        if self.token.kind == TokenKind::Semicolon {
            self.parse_anonymous_declaration_rest(&specifiers);
            return;
        }

        let ndeclaration = self.parse_declarator(&specifiers, false);

        if matches!(
            self.token.kind,
            TokenKind::Comma | TokenKind::Assign | TokenKind::Semicolon
        ) {
            self.parse_declaration_rest(ndeclaration, &specifiers, DeclMode::Record);
            return;
        }

        // must be a function definition from here on
        self.parse_kr_declaration_list(ndeclaration);

        if self.token.kind != TokenKind::LBrace {
            self.parse_error_expected(Some("function definition"), "'{'");
            self.eat_statement();
            return;
        }

        let declared_type = self.decls.get(ndeclaration).ty;
        let Some(orig_ty) = declared_type else {
            self.eat_block();
            return;
        };

        // typerefs are intentionally not skipped: the standard does not
        // allow a typedef name here
        if !matches!(self.types.kind(orig_ty), TypeKind::Function(_)) {
            if self.types.is_valid(self.types.skip_alias(orig_ty)) {
                let name = self.decl_name(ndeclaration);
                let loc = self.here();
                self.diags.error(
                    loc,
                    format!("declarator '{}' has a body but is not a function type", name),
                );
            }
            self.eat_block();
            return;
        }

        // a definition with `()` has no parameters, not unspecified ones
        let function = self.types.function_info(orig_ty);
        if let Some(mut f) = function {
            if f.unspecified_parameters && !f.kr_style {
                f.unspecified_parameters = false;
                let ty = self.types.intern(Type::new(TypeKind::Function(f)));
                self.decls.get_mut(ndeclaration).ty = Some(ty);
            }
        }

        let declaration = self.record_function_definition(ndeclaration);
        if declaration != ndeclaration {
            // keep the freshly parsed parameter scope on the winner
            let scope = self.decls.get(ndeclaration).own_scope;
            if scope.is_some() {
                self.decls.get_mut(declaration).own_scope = scope;
            }
        }

        let own_scope = self.decls.get(declaration).own_scope;
        let function_scope = match own_scope {
            Some(scope) => scope,
            None => {
                let scope = self.decls.new_scope(Some(self.current_scope));
                self.decls.get_mut(declaration).own_scope = Some(scope);
                scope
            }
        };

        let mark = self.enter_scope(function_scope);
        let parameters: Vec<DeclId> = self.decls.scope(function_scope).declarations.clone();
        for parameter in parameters {
            if self.decls.get(parameter).symbol.is_some() {
                self.environment_push(parameter);
            }
        }

        if self.decls.get(declaration).is_defined() {
            let loc = self.here();
            self.error_multiple_definition(declaration, loc);
            self.eat_block();
        } else {
            let label_top = self.labels.top();
            let old_function = self.current_function.replace(declaration);
            let old_gotos = std::mem::take(&mut self.gotos);
            let old_labels = std::mem::take(&mut self.defined_labels);

            let body = self.parse_compound_statement();
            self.decls.get_mut(declaration).payload = DeclPayload::Body(body);
            self.check_labels();
            self.check_declarations();

            self.current_function = old_function;
            self.gotos = old_gotos;
            self.defined_labels = old_labels;
            self.labels.pop_to(label_top);
        }

        self.leave_scope(mark);
    }

    /// Resolves the function's `goto` list against the label namespace:
    /// a referenced label without a definition position is an error, a
    /// defined label never referenced is a warning.
    fn check_labels(&mut self) {
        let gotos = std::mem::take(&mut self.gotos);
        for (label, loc) in gotos {
            self.decls.get_mut(label).used = true;
            if self.decls.get(label).loc.is_none() {
                let name = self.decl_name(label);
                self.diags
                    .error(loc, format!("label '{}' used but not defined", name));
            }
        }

        let defined = std::mem::take(&mut self.defined_labels);
        if self.warnings.unused_label {
            for (label, loc) in defined {
                if !self.decls.get(label).used {
                    let name = self.decl_name(label);
                    self.diags
                        .warning(loc, format!("label '{}' defined but not used", name));
                }
            }
        }
    }

    /// Unused-entity checks for the function that just ended.
    fn check_declarations(&mut self) {
        if !self.warnings.unused_parameter {
            return;
        }
        let function = self.current_function.expect("inside a function");
        let Some(scope) = self.decls.get(function).own_scope else {
            return;
        };
        let parameters = self.decls.scope(scope).declarations.clone();
        for parameter in parameters {
            let d = self.decls.get(parameter);
            if !d.used && d.namespace == Namespace::Ordinary {
                if let (Some(sym), Some(loc)) = (d.symbol, d.loc) {
                    let name = self.name_of(sym);
                    self.diags
                        .warning(loc, format!("unused parameter '{}'", name));
                }
            }
        }
    }

    /// Unused static functions and variables at translation-unit end.
    fn check_unused_globals(&mut self) {
        if !self.warnings.unused_function && !self.warnings.unused_variable {
            return;
        }
        let globals = self.decls.scope(self.global_scope).declarations.clone();
        for decl in globals {
            let d = self.decls.get(decl);
            if d.used || d.storage_class != StorageClass::Static {
                continue;
            }
            let Some(ty) = d.ty else { continue };
            let is_function = self.types.is_function(self.types.skip_alias(ty));
            let verb = if is_function {
                if !self.warnings.unused_function || d.is_inline {
                    continue;
                }
                if d.is_defined() {
                    "defined"
                } else {
                    "declared"
                }
            } else {
                if !self.warnings.unused_variable {
                    continue;
                }
                "defined"
            };
            let loc = d.loc.unwrap_or_default();
            let name = self.decl_name(decl);
            self.diags
                .warning(loc, format!("'{}' {} but not used", name, verb));
        }
    }

    // ========================================================================
    // Builtins
    // ========================================================================

    fn make_global_typedef(&mut self, name: &str, ty: TypeRef) -> TypeRef {
        let symbol = self.interner.intern(name);
        let mut decl = Declaration::new(Namespace::Ordinary);
        decl.symbol = Some(symbol);
        decl.storage_class = StorageClass::Typedef;
        decl.ty = Some(ty);
        decl.loc = Some(self.builtin_loc());
        let decl = self.decls.alloc(decl);
        self.record_declaration(decl);

        self.types.intern(Type::new(TypeKind::Typedef {
            decl,
            resolved: ty,
        }))
    }

    fn builtin_loc(&mut self) -> Loc {
        let file = self.diags.add_file("<builtin>");
        Loc::new(file, 0, 0)
    }

    fn initialize_builtin_types(&mut self) {
        let int = self.types.atomic(AtomicKind::Int);
        let long = self.types.atomic(AtomicKind::Long);
        let ulong = self.types.atomic(AtomicKind::ULong);
        let longlong = self.types.atomic(AtomicKind::LongLong);
        let ulonglong = self.types.atomic(AtomicKind::ULongLong);
        let char_ty = self.types.atomic(AtomicKind::Char);
        let void = self.types.atomic(AtomicKind::Void);

        self.type_char_ptr = self.types.pointer_to(char_ty, Qualifiers::NONE);
        self.type_char_ptr_ptr = self.types.pointer_to(self.type_char_ptr, Qualifiers::NONE);

        self.make_global_typedef("__intmax_t__", longlong);
        self.type_size_t = self.make_global_typedef("__SIZE_TYPE__", ulong);
        self.make_global_typedef("__SSIZE_TYPE__", long);
        self.type_ptrdiff_t = self.make_global_typedef("__PTRDIFF_TYPE__", long);
        self.make_global_typedef("__uintmax_t__", ulonglong);
        self.make_global_typedef("__UPTRDIFF_TYPE__", ulong);
        self.type_wchar_t = self.make_global_typedef("__WCHAR_TYPE__", int);
        self.make_global_typedef("__WINT_TYPE__", int);

        self.type_wchar_ptr = self.types.pointer_to(self.type_wchar_t, Qualifiers::NONE);

        let void_ptr = self.types.pointer_to(void, Qualifiers::NONE);
        let valist_sym = self.interner.intern("__builtin_va_list");
        self.type_valist = self.types.intern(Type::new(TypeKind::Builtin {
            name: valist_sym,
            resolved: void_ptr,
        }));
    }
}
