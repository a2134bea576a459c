//! Abstract syntax tree for one translation unit.
//!
//! Expressions, statements and initializers are immutable once built
//! and live in a bump [`Arena`]; nodes reference each other with plain
//! `&'a` links.  The one mutable corner is an expression's type: the
//! automatic array/function decay applied at reference sites must be
//! undone by `sizeof`, `&` and member access, so `ty` sits in a `Cell`.
//!
//! Declarations are different: they are patched repeatedly while
//! parsing (K&R parameter types arrive late, storage classes merge,
//! array sizes complete), so they live in a [`DeclArena`] addressed by
//! copyable [`DeclId`] handles.  Tag types refer to declarations
//! through these ids, which is how `struct S { struct S *next; }`
//! cycles without a cyclic type structure.

use crate::scope::{Scope, ScopeId};
use crate::types::TypeRef;
use clef_base::{Arena, Loc, Symbol};
use std::cell::Cell;

// ============================================================================
// Allocation context
// ============================================================================

/// Allocation context handed to the parser; a thin typed facade over
/// the translation unit's bump arena.
#[derive(Clone, Copy)]
pub struct AstContext<'a> {
    arena: &'a Arena,
}

impl<'a> AstContext<'a> {
    pub fn new(arena: &'a Arena) -> Self {
        AstContext { arena }
    }

    pub fn expr(&self, kind: ExprKind<'a>, ty: TypeRef, loc: Loc) -> &'a Expr<'a> {
        self.arena.alloc(Expr {
            kind,
            ty: Cell::new(ty),
            loc,
        })
    }

    pub fn stmt(&self, kind: StmtKind<'a>, loc: Loc) -> &'a Stmt<'a> {
        self.arena.alloc(Stmt { kind, loc })
    }

    pub fn initializer(&self, init: Initializer<'a>) -> &'a Initializer<'a> {
        self.arena.alloc(init)
    }

    /// Moves a finished list into the arena.
    pub fn slice<T>(&self, items: Vec<T>) -> &'a [T] {
        self.arena.alloc_slice(items)
    }

    pub fn bytes(&self, bytes: &[u8]) -> &'a [u8] {
        self.arena.alloc_bytes(bytes)
    }
}

// ============================================================================
// Expressions
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConstValue {
    Int(i64),
    Float(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Negate,
    Plus,
    Not,
    BitNot,
    Dereference,
    TakeAddress,
    PrefixIncrement,
    PrefixDecrement,
    PostfixIncrement,
    PostfixDecrement,
    /// Explicit cast; the destination type is the node's type.
    Cast,
    /// Cast inserted by a conversion rule; destination in the node type.
    ImplicitCast,
    /// Reads the value out of a bitfield member access.
    BitfieldExtract,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    BitAnd,
    BitOr,
    BitXor,
    ShiftLeft,
    ShiftRight,
    LogicalAnd,
    LogicalOr,
    Comma,
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    ModAssign,
    ShiftLeftAssign,
    ShiftRightAssign,
    BitAndAssign,
    BitOrAssign,
    BitXorAssign,
    IsGreater,
    IsGreaterEqual,
    IsLess,
    IsLessEqual,
    IsLessGreater,
    IsUnordered,
    Expect,
}

impl BinaryOp {
    pub fn is_assignment(self) -> bool {
        use BinaryOp::*;
        matches!(
            self,
            Assign
                | AddAssign
                | SubAssign
                | MulAssign
                | DivAssign
                | ModAssign
                | ShiftLeftAssign
                | ShiftRightAssign
                | BitAndAssign
                | BitOrAssign
                | BitXorAssign
        )
    }
}

/// One step of an `offsetof` member designator.
#[derive(Debug, Clone, Copy)]
pub struct Designator<'a> {
    pub symbol: Option<Symbol>,
    pub index: Option<&'a Expr<'a>>,
}

#[derive(Debug)]
pub enum ExprKind<'a> {
    /// Placeholder produced by error recovery; carries the error type.
    Error,
    Const(ConstValue),
    StringLiteral(&'a [u8]),
    WideStringLiteral(&'a [u32]),
    /// Identifier reference, resolved to its declaration.
    Reference {
        symbol: Symbol,
        decl: Option<DeclId>,
    },
    Call {
        function: &'a Expr<'a>,
        arguments: &'a [&'a Expr<'a>],
    },
    Unary {
        op: UnaryOp,
        value: &'a Expr<'a>,
    },
    Binary {
        op: BinaryOp,
        left: &'a Expr<'a>,
        right: &'a Expr<'a>,
    },
    Conditional {
        condition: &'a Expr<'a>,
        true_expr: &'a Expr<'a>,
        false_expr: &'a Expr<'a>,
    },
    /// `s.m` or `p->m`; `entry` is the resolved member declaration.
    Select {
        compound: &'a Expr<'a>,
        symbol: Symbol,
        entry: Option<DeclId>,
        via_pointer: bool,
    },
    ArrayAccess {
        array: &'a Expr<'a>,
        index: &'a Expr<'a>,
    },
    /// `sizeof` / `_Alignof`; exactly one of `operand`/`queried` forms
    /// is printed back, both record the queried type.
    TypeProp {
        is_alignof: bool,
        queried: TypeRef,
        operand: Option<&'a Expr<'a>>,
    },
    ClassifyType {
        value: &'a Expr<'a>,
    },
    /// `__func__` / `__PRETTY_FUNCTION__`.
    FunctionName {
        pretty: bool,
    },
    /// A builtin with a fixed function type (`__builtin_alloca`, ...).
    BuiltinSymbol {
        symbol: Symbol,
    },
    BuiltinConstantP {
        value: &'a Expr<'a>,
    },
    BuiltinPrefetch {
        address: &'a Expr<'a>,
        rw: Option<&'a Expr<'a>>,
        locality: Option<&'a Expr<'a>>,
    },
    OffsetOf {
        queried: TypeRef,
        designators: &'a [Designator<'a>],
    },
    VaStart {
        ap: &'a Expr<'a>,
        parameter: DeclId,
    },
    VaArg {
        ap: &'a Expr<'a>,
    },
    /// GNU statement expression `({ ... })`.
    StatementExpr {
        statement: &'a Stmt<'a>,
    },
}

/// An expression node: kind, computed type, semantic source position.
#[derive(Debug)]
pub struct Expr<'a> {
    pub kind: ExprKind<'a>,
    ty: Cell<TypeRef>,
    pub loc: Loc,
}

impl<'a> Expr<'a> {
    pub fn ty(&self) -> TypeRef {
        self.ty.get()
    }

    /// Replaces the computed type; used to undo automatic decay.
    pub fn set_ty(&self, ty: TypeRef) {
        self.ty.set(ty);
    }
}

// ============================================================================
// Initializers
// ============================================================================

#[derive(Debug)]
pub enum Initializer<'a> {
    Value(&'a Expr<'a>),
    List(&'a [&'a Initializer<'a>]),
    String(&'a [u8]),
    WideString(&'a [u32]),
}

// ============================================================================
// Statements
// ============================================================================

/// Case/default entry collected on the enclosing switch, in source
/// order.  `value` is `None` for `default`.
#[derive(Debug, Clone, Copy)]
pub struct CaseLabel<'a> {
    pub expression: Option<&'a Expr<'a>>,
    pub value: Option<i64>,
    pub loc: Loc,
}

#[derive(Debug, Clone, Copy)]
pub struct AsmConstraint<'a> {
    pub symbol: Option<Symbol>,
    pub constraint: &'a [u8],
    pub expression: &'a Expr<'a>,
}

#[derive(Debug)]
pub enum StmtKind<'a> {
    Compound {
        statements: &'a [&'a Stmt<'a>],
        scope: ScopeId,
    },
    Expression(&'a Expr<'a>),
    Declaration {
        declarations: &'a [DeclId],
    },
    If {
        condition: &'a Expr<'a>,
        then_branch: Option<&'a Stmt<'a>>,
        else_branch: Option<&'a Stmt<'a>>,
    },
    Switch {
        expression: &'a Expr<'a>,
        body: Option<&'a Stmt<'a>>,
        cases: &'a [CaseLabel<'a>],
    },
    CaseLabel {
        expression: Option<&'a Expr<'a>>,
        statement: Option<&'a Stmt<'a>>,
    },
    Label {
        label: DeclId,
        statement: Option<&'a Stmt<'a>>,
    },
    While {
        condition: &'a Expr<'a>,
        body: Option<&'a Stmt<'a>>,
    },
    DoWhile {
        body: Option<&'a Stmt<'a>>,
        condition: &'a Expr<'a>,
    },
    For {
        scope: ScopeId,
        initialization: Option<&'a Stmt<'a>>,
        condition: Option<&'a Expr<'a>>,
        step: Option<&'a Expr<'a>>,
        body: Option<&'a Stmt<'a>>,
    },
    Goto {
        label: DeclId,
    },
    Continue,
    Break,
    Return {
        value: Option<&'a Expr<'a>>,
    },
    Asm {
        is_volatile: bool,
        text: &'a [u8],
        inputs: &'a [AsmConstraint<'a>],
        outputs: &'a [AsmConstraint<'a>],
        clobbers: &'a [&'a [u8]],
    },
}

#[derive(Debug)]
pub struct Stmt<'a> {
    pub kind: StmtKind<'a>,
    pub loc: Loc,
}

// ============================================================================
// Declarations
// ============================================================================

/// Handle to a declaration in the [`DeclArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeclId(u32);

/// The disjoint identifier spaces of C.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    Ordinary,
    Struct,
    Union,
    Enum,
    Label,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageClass {
    None,
    Typedef,
    Extern,
    Static,
    Auto,
    Register,
    EnumEntry,
    Thread,
    ThreadExtern,
    ThreadStatic,
}

/// The kind-specific slot of a declaration.
#[derive(Debug, Clone, Copy)]
pub enum DeclPayload<'a> {
    Empty,
    /// Object with an initializer.
    Initializer(&'a Initializer<'a>),
    /// Function definition body.
    Body(&'a Stmt<'a>),
    /// Enum entry with its folded value.
    EnumValue {
        expression: Option<&'a Expr<'a>>,
        value: i64,
    },
    /// Tag whose body has been seen.
    TagDefined,
}

/// One named entity.
#[derive(Debug)]
pub struct Declaration<'a> {
    pub symbol: Option<Symbol>,
    pub namespace: Namespace,
    pub storage_class: StorageClass,
    /// `None` marks a K&R parameter placeholder awaiting its type.
    pub ty: Option<TypeRef>,
    /// `None` marks a label that was referenced but not yet defined.
    pub loc: Option<Loc>,
    pub is_inline: bool,
    pub address_taken: bool,
    pub used: bool,
    /// Scope this declaration appears in.
    pub parent_scope: Option<ScopeId>,
    /// Scope owned by this declaration: parameters for functions,
    /// members for struct/union tags.
    pub own_scope: Option<ScopeId>,
    pub payload: DeclPayload<'a>,
}

impl<'a> Declaration<'a> {
    pub fn new(namespace: Namespace) -> Self {
        Declaration {
            symbol: None,
            namespace,
            storage_class: StorageClass::None,
            ty: None,
            loc: None,
            is_inline: false,
            address_taken: false,
            used: false,
            parent_scope: None,
            own_scope: None,
            payload: DeclPayload::Empty,
        }
    }

    /// Whether the entity has a definition: a body for functions, a
    /// seen `{...}` for tags.
    pub fn is_defined(&self) -> bool {
        matches!(
            self.payload,
            DeclPayload::Body(_) | DeclPayload::TagDefined
        )
    }
}

/// Storage for declarations and scopes of one translation unit.
///
/// Scope membership is the per-scope `declarations` list (source
/// order); visibility is tracked separately by the environment stacks.
/// Invariant: a declaration is appended to exactly one scope.
pub struct DeclArena<'a> {
    decls: Vec<Declaration<'a>>,
    scopes: Vec<Scope>,
}

impl<'a> DeclArena<'a> {
    pub fn new() -> Self {
        DeclArena {
            decls: Vec::new(),
            scopes: Vec::new(),
        }
    }

    pub fn alloc(&mut self, decl: Declaration<'a>) -> DeclId {
        let id = DeclId(self.decls.len() as u32);
        self.decls.push(decl);
        id
    }

    pub fn get(&self, id: DeclId) -> &Declaration<'a> {
        &self.decls[id.0 as usize]
    }

    pub fn get_mut(&mut self, id: DeclId) -> &mut Declaration<'a> {
        &mut self.decls[id.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.decls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = DeclId> {
        (0..self.decls.len() as u32).map(DeclId)
    }

    // ---- scopes ----

    pub fn new_scope(&mut self, parent: Option<ScopeId>) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope {
            parent,
            declarations: Vec::new(),
        });
        id
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0 as usize]
    }

    pub fn scope_ids(&self) -> impl Iterator<Item = ScopeId> {
        (0..self.scopes.len() as u32).map(ScopeId)
    }

    /// Appends `decl` at the end of `scope`'s declaration chain and
    /// records the back link.
    pub fn append_to_scope(&mut self, scope: ScopeId, decl: DeclId) {
        self.scopes[scope.0 as usize].declarations.push(decl);
        self.decls[decl.0 as usize].parent_scope = Some(scope);
    }

    /// Declarations of the scope owned by a tag or function
    /// declaration, in source order; empty if it owns none.
    pub fn members_of(&self, tag: DeclId) -> impl Iterator<Item = DeclId> + '_ {
        let list: &[DeclId] = match self.get(tag).own_scope {
            Some(scope) => &self.scope(scope).declarations,
            None => &[],
        };
        list.iter().copied()
    }

    #[cfg(test)]
    pub fn fresh_typedef_for_tests(&mut self, ty: TypeRef) -> DeclId {
        let mut decl = Declaration::new(Namespace::Ordinary);
        decl.storage_class = StorageClass::Typedef;
        decl.ty = Some(ty);
        self.alloc(decl)
    }
}

impl<'a> Default for DeclArena<'a> {
    fn default() -> Self {
        Self::new()
    }
}

/// The parse result: all declarations and scopes, rooted at the global
/// scope.  AST nodes stay alive through the arena behind `'a`.
pub struct TranslationUnit<'a> {
    pub decls: DeclArena<'a>,
    pub global_scope: ScopeId,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AtomicKind, TypeArena};

    #[test]
    fn expression_type_can_be_reverted() {
        let arena = Arena::new();
        let ctx = AstContext::new(&arena);
        let mut types = TypeArena::new();
        let int = types.atomic(AtomicKind::Int);
        let ptr = types.pointer_to(int, crate::types::Qualifiers::NONE);

        let e = ctx.expr(ExprKind::Error, ptr, Loc::default());
        assert_eq!(e.ty(), ptr);
        e.set_ty(int);
        assert_eq!(e.ty(), int);
    }

    #[test]
    fn scope_chain_preserves_source_order() {
        let mut decls: DeclArena<'_> = DeclArena::new();
        let scope = decls.new_scope(None);
        let a = decls.alloc(Declaration::new(Namespace::Ordinary));
        let b = decls.alloc(Declaration::new(Namespace::Ordinary));
        decls.append_to_scope(scope, a);
        decls.append_to_scope(scope, b);
        assert_eq!(decls.scope(scope).declarations, vec![a, b]);
        assert_eq!(decls.get(a).parent_scope, Some(scope));
    }

    #[test]
    fn members_of_walks_the_owned_scope() {
        let mut decls: DeclArena<'_> = DeclArena::new();
        let tag = decls.alloc(Declaration::new(Namespace::Struct));
        let body = decls.new_scope(None);
        let member = decls.alloc(Declaration::new(Namespace::Ordinary));
        decls.append_to_scope(body, member);
        decls.get_mut(tag).own_scope = Some(body);

        let members: Vec<_> = decls.members_of(tag).collect();
        assert_eq!(members, vec![member]);
    }

    #[test]
    fn declarations_without_definition_are_not_defined() {
        let mut decl = Declaration::new(Namespace::Struct);
        assert!(!decl.is_defined());
        decl.payload = DeclPayload::TagDefined;
        assert!(decl.is_defined());
    }
}
