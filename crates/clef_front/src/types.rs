//! The C type system: representation, hash-consing, conversions.
//!
//! All type nodes live in one [`TypeArena`] and are addressed by
//! copyable [`TypeRef`] handles.  Every structurally finished type goes
//! through [`TypeArena::intern`], which deduplicates it against a
//! content-addressed table; after interning, handle equality *is*
//! structural equality for everything except tag types, whose identity
//! is the identity of their owning declaration.  The promotion and
//! assignability rules below lean on that property.
//!
//! Cyclic shapes (`struct S { struct S *next; }`) never cycle through
//! type nodes: a struct/union/enum type holds the [`DeclId`] of its tag
//! declaration, and member types are reached through the declaration's
//! scope.

use crate::ast::{DeclArena, DeclId, Namespace};
use clef_base::{Interner, Symbol};
use std::collections::HashMap;
use std::fmt::Write as _;

/// `const` / `volatile` / `restrict` qualifier set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Qualifiers(u8);

impl Qualifiers {
    pub const NONE: Qualifiers = Qualifiers(0);
    pub const CONST: Qualifiers = Qualifiers(1);
    pub const VOLATILE: Qualifiers = Qualifiers(2);
    pub const RESTRICT: Qualifiers = Qualifiers(4);

    pub fn is_none(self) -> bool {
        self.0 == 0
    }

    /// `true` if every qualifier in `other` is also in `self`.
    pub fn contains(self, other: Qualifiers) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for Qualifiers {
    type Output = Qualifiers;
    fn bitor(self, rhs: Qualifiers) -> Qualifiers {
        Qualifiers(self.0 | rhs.0)
    }
}

impl std::fmt::Display for Qualifiers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut sep = "";
        for (bit, name) in [
            (Qualifiers::CONST, "const"),
            (Qualifiers::VOLATILE, "volatile"),
            (Qualifiers::RESTRICT, "restrict"),
        ] {
            if self.contains(bit) {
                write!(f, "{}{}", sep, name)?;
                sep = " ";
            }
        }
        Ok(())
    }
}

/// The fixed set of atomic (builtin scalar) type kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AtomicKind {
    Void,
    Bool,
    Char,
    SChar,
    UChar,
    Short,
    UShort,
    Int,
    UInt,
    Long,
    ULong,
    LongLong,
    ULongLong,
    Float,
    Double,
    LongDouble,
    FloatComplex,
    DoubleComplex,
    LongDoubleComplex,
    FloatImaginary,
    DoubleImaginary,
    LongDoubleImaginary,
}

impl AtomicKind {
    /// Integer conversion rank.  Only meaningful for integer kinds.
    pub fn rank(self) -> u8 {
        use AtomicKind::*;
        match self {
            Bool => 1,
            Char | SChar | UChar => 2,
            Short | UShort => 3,
            Int | UInt => 4,
            Long | ULong => 5,
            LongLong | ULongLong => 6,
            _ => u8::MAX,
        }
    }

    pub fn is_integer(self) -> bool {
        use AtomicKind::*;
        matches!(
            self,
            Bool | Char | SChar | UChar | Short | UShort | Int | UInt | Long | ULong | LongLong
                | ULongLong
        )
    }

    pub fn is_float(self) -> bool {
        use AtomicKind::*;
        matches!(
            self,
            Float
                | Double
                | LongDouble
                | FloatComplex
                | DoubleComplex
                | LongDoubleComplex
                | FloatImaginary
                | DoubleImaginary
                | LongDoubleImaginary
        )
    }

    /// Plain `char` counts as signed here, matching the target ABI.
    pub fn is_signed(self) -> bool {
        use AtomicKind::*;
        matches!(self, Char | SChar | Short | Int | Long | LongLong)
    }

    pub fn name(self) -> &'static str {
        use AtomicKind::*;
        match self {
            Void => "void",
            Bool => "_Bool",
            Char => "char",
            SChar => "signed char",
            UChar => "unsigned char",
            Short => "short",
            UShort => "unsigned short",
            Int => "int",
            UInt => "unsigned int",
            Long => "long",
            ULong => "unsigned long",
            LongLong => "long long",
            ULongLong => "unsigned long long",
            Float => "float",
            Double => "double",
            LongDouble => "long double",
            FloatComplex => "float _Complex",
            DoubleComplex => "double _Complex",
            LongDoubleComplex => "long double _Complex",
            FloatImaginary => "float _Imaginary",
            DoubleImaginary => "double _Imaginary",
            LongDoubleImaginary => "long double _Imaginary",
        }
    }

    /// Size in bytes on the LP64 target model.
    pub fn size(self) -> u64 {
        use AtomicKind::*;
        match self {
            Void => 1,
            Bool | Char | SChar | UChar => 1,
            Short | UShort => 2,
            Int | UInt | Float | FloatImaginary => 4,
            // a complex type is a two-element array of its base type
            Long | ULong | LongLong | ULongLong | Double | DoubleImaginary | FloatComplex => 8,
            LongDouble | LongDoubleImaginary | DoubleComplex => 16,
            LongDoubleComplex => 32,
        }
    }
}

/// Array extent after constant folding.
///
/// The size *expression* lives in the AST; only the folded extent takes
/// part in structural identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArraySize {
    /// `int a[]`, incomplete.
    Unknown,
    /// `int a[n]` with a constant `n`.
    Fixed(u64),
    /// Variable length array.
    Variable,
}

/// A function type: return type, parameter types, flags.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FunctionType {
    pub return_type: TypeRef,
    pub parameters: Vec<TypeRef>,
    pub variadic: bool,
    /// `()`: parameter list left unspecified (old-style declaration).
    pub unspecified_parameters: bool,
    /// `(a, b)` identifier list awaiting a K&R declaration list.
    pub kr_style: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeKind {
    /// Sentinel for ill-typed constructs; accepted by every rule to
    /// avoid diagnostic cascades.
    Error,
    Atomic(AtomicKind),
    Bitfield { base: TypeRef, width: u32 },
    Struct(DeclId),
    Union(DeclId),
    Enum(DeclId),
    Function(FunctionType),
    Pointer(TypeRef),
    Array {
        element: TypeRef,
        size: ArraySize,
        is_static: bool,
        is_variable: bool,
    },
    /// Compiler-provided alias such as `__builtin_va_list`.
    Builtin { name: Symbol, resolved: TypeRef },
    /// A typedef name; keeps the declaration for its presentation name
    /// and the resolved type for semantics.
    Typedef { decl: DeclId, resolved: TypeRef },
    /// `__typeof__(...)`.
    Typeof { resolved: TypeRef },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Type {
    pub qualifiers: Qualifiers,
    pub kind: TypeKind,
}

impl Type {
    pub fn new(kind: TypeKind) -> Self {
        Type {
            qualifiers: Qualifiers::NONE,
            kind,
        }
    }

    pub fn qualified(kind: TypeKind, qualifiers: Qualifiers) -> Self {
        Type { kind, qualifiers }
    }
}

/// Handle to an interned type.  After interning, `TypeRef` equality
/// implies structural equality (tag types compare by declaration).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeRef(u32);

/// Owner of all type storage plus the hash-cons table.
pub struct TypeArena {
    types: Vec<Type>,
    table: HashMap<Type, TypeRef>,
    error: TypeRef,
}

impl TypeArena {
    pub fn new() -> Self {
        let mut arena = TypeArena {
            types: Vec::new(),
            table: HashMap::new(),
            error: TypeRef(0),
        };
        arena.error = arena.intern(Type::new(TypeKind::Error));
        arena
    }

    /// Interns a finished type, returning the canonical handle.
    /// Idempotent: interning a structurally known type returns the
    /// existing handle.
    pub fn intern(&mut self, ty: Type) -> TypeRef {
        if let Some(&existing) = self.table.get(&ty) {
            return existing;
        }
        let handle = TypeRef(self.types.len() as u32);
        self.types.push(ty.clone());
        self.table.insert(ty, handle);
        handle
    }

    pub fn error_type(&self) -> TypeRef {
        self.error
    }

    pub fn get(&self, r: TypeRef) -> &Type {
        &self.types[r.0 as usize]
    }

    pub fn kind(&self, r: TypeRef) -> &TypeKind {
        &self.get(r).kind
    }

    pub fn qualifiers(&self, r: TypeRef) -> Qualifiers {
        self.get(r).qualifiers
    }

    pub fn atomic(&mut self, kind: AtomicKind) -> TypeRef {
        self.intern(Type::new(TypeKind::Atomic(kind)))
    }

    pub fn pointer_to(&mut self, pointee: TypeRef, qualifiers: Qualifiers) -> TypeRef {
        self.intern(Type::qualified(TypeKind::Pointer(pointee), qualifiers))
    }

    /// Re-interns `r` with a different qualifier set.
    pub fn with_qualifiers(&mut self, r: TypeRef, qualifiers: Qualifiers) -> TypeRef {
        if self.get(r).qualifiers == qualifiers {
            return r;
        }
        let mut ty = self.get(r).clone();
        ty.qualifiers = qualifiers;
        self.intern(ty)
    }

    pub fn unqualified(&mut self, r: TypeRef) -> TypeRef {
        self.with_qualifiers(r, Qualifiers::NONE)
    }

    /// Resolves typedef/typeof/builtin aliases without touching
    /// qualifiers.  Read-only variant of [`TypeArena::skip_typeref`].
    pub fn skip_alias(&self, mut r: TypeRef) -> TypeRef {
        loop {
            match &self.get(r).kind {
                TypeKind::Typedef { resolved, .. } => r = *resolved,
                TypeKind::Typeof { resolved } => r = *resolved,
                TypeKind::Builtin { resolved, .. } => r = *resolved,
                _ => return r,
            }
        }
    }

    /// Resolves aliases, folding the qualifiers written on the aliases
    /// into the resolved type: `const size_t` becomes `const unsigned
    /// long`.
    pub fn skip_typeref(&mut self, r: TypeRef) -> TypeRef {
        let mut quals = Qualifiers::NONE;
        let mut cur = r;
        loop {
            let ty = self.get(cur);
            quals = quals | ty.qualifiers;
            match &ty.kind {
                TypeKind::Typedef { resolved, .. } => cur = *resolved,
                TypeKind::Typeof { resolved } => cur = *resolved,
                TypeKind::Builtin { resolved, .. } => cur = *resolved,
                _ => break,
            }
        }
        self.with_qualifiers(cur, quals)
    }

    // ---- copy-out accessors for common kind payloads ----

    pub fn pointee(&self, r: TypeRef) -> Option<TypeRef> {
        match self.kind(r) {
            TypeKind::Pointer(points_to) => Some(*points_to),
            _ => None,
        }
    }

    pub fn array_element(&self, r: TypeRef) -> Option<TypeRef> {
        match self.kind(r) {
            TypeKind::Array { element, .. } => Some(*element),
            _ => None,
        }
    }

    /// The function signature of `r`, cloned out of the arena so the
    /// caller may keep interning while inspecting it.
    pub fn function_info(&self, r: TypeRef) -> Option<FunctionType> {
        match self.kind(r) {
            TypeKind::Function(f) => Some(f.clone()),
            _ => None,
        }
    }

    pub fn compound_tag(&self, r: TypeRef) -> Option<DeclId> {
        match self.kind(r) {
            TypeKind::Struct(decl) | TypeKind::Union(decl) => Some(*decl),
            _ => None,
        }
    }

    // ---- predicates; arguments are expected to be alias-free ----

    pub fn is_valid(&self, r: TypeRef) -> bool {
        !matches!(self.kind(r), TypeKind::Error)
    }

    pub fn is_atomic(&self, r: TypeRef, kind: AtomicKind) -> bool {
        matches!(self.kind(r), TypeKind::Atomic(k) if *k == kind)
    }

    pub fn is_integer(&self, r: TypeRef) -> bool {
        match self.kind(r) {
            TypeKind::Atomic(k) => k.is_integer(),
            TypeKind::Enum(_) => true,
            TypeKind::Bitfield { .. } => true,
            _ => false,
        }
    }

    pub fn is_float(&self, r: TypeRef) -> bool {
        matches!(self.kind(r), TypeKind::Atomic(k) if k.is_float())
    }

    pub fn is_arithmetic(&self, r: TypeRef) -> bool {
        self.is_integer(r) || self.is_float(r)
    }

    pub fn is_scalar(&self, r: TypeRef) -> bool {
        self.is_arithmetic(r) || self.is_pointer(r)
    }

    pub fn is_pointer(&self, r: TypeRef) -> bool {
        matches!(self.kind(r), TypeKind::Pointer(_))
    }

    pub fn is_array(&self, r: TypeRef) -> bool {
        matches!(self.kind(r), TypeKind::Array { .. })
    }

    pub fn is_function(&self, r: TypeRef) -> bool {
        matches!(self.kind(r), TypeKind::Function(_))
    }

    pub fn is_compound(&self, r: TypeRef) -> bool {
        matches!(self.kind(r), TypeKind::Struct(_) | TypeKind::Union(_))
    }

    pub fn is_signed(&self, r: TypeRef) -> bool {
        match self.kind(r) {
            TypeKind::Atomic(k) => k.is_signed(),
            TypeKind::Enum(_) => true,
            TypeKind::Bitfield { base, .. } => self.is_signed(*base),
            _ => false,
        }
    }

    /// Integer conversion rank; enums rank as `int`.
    pub fn rank(&self, r: TypeRef) -> u8 {
        match self.kind(r) {
            TypeKind::Enum(_) => AtomicKind::Int.rank(),
            TypeKind::Atomic(k) => k.rank(),
            TypeKind::Bitfield { base, .. } => self.rank(*base),
            _ => u8::MAX,
        }
    }

    /// A type an object of which cannot be created yet: `void`, arrays
    /// of unknown size, tags that have not been defined.
    pub fn is_incomplete(&self, r: TypeRef, decls: &DeclArena<'_>) -> bool {
        match self.kind(r) {
            TypeKind::Atomic(AtomicKind::Void) => true,
            TypeKind::Array { size, .. } => matches!(size, ArraySize::Unknown),
            TypeKind::Struct(d) | TypeKind::Union(d) | TypeKind::Enum(d) => {
                !decls.get(*d).is_defined()
            }
            _ => false,
        }
    }

    // ---- compatibility ----

    /// Structural type compatibility after alias removal.
    pub fn compatible(&self, a: TypeRef, b: TypeRef) -> bool {
        let a = self.skip_alias(a);
        let b = self.skip_alias(b);
        if a == b {
            return true;
        }
        let (ta, tb) = (self.get(a), self.get(b));
        match (&ta.kind, &tb.kind) {
            (TypeKind::Error, _) | (_, TypeKind::Error) => true,
            _ if ta.qualifiers != tb.qualifiers => false,
            (TypeKind::Atomic(x), TypeKind::Atomic(y)) => x == y,
            (TypeKind::Pointer(x), TypeKind::Pointer(y)) => self.compatible(*x, *y),
            (
                TypeKind::Array {
                    element: x,
                    size: sx,
                    ..
                },
                TypeKind::Array {
                    element: y,
                    size: sy,
                    ..
                },
            ) => {
                self.compatible(*x, *y)
                    && match (sx, sy) {
                        (ArraySize::Unknown, _) | (_, ArraySize::Unknown) => true,
                        (x, y) => x == y,
                    }
            }
            (TypeKind::Function(f), TypeKind::Function(g)) => {
                if !self.compatible(f.return_type, g.return_type) {
                    return false;
                }
                if f.unspecified_parameters || g.unspecified_parameters {
                    return true;
                }
                f.variadic == g.variadic
                    && f.parameters.len() == g.parameters.len()
                    && f.parameters
                        .iter()
                        .zip(&g.parameters)
                        .all(|(x, y)| self.compatible(*x, *y))
            }
            (TypeKind::Struct(x), TypeKind::Struct(y))
            | (TypeKind::Union(x), TypeKind::Union(y))
            | (TypeKind::Enum(x), TypeKind::Enum(y)) => x == y,
            _ => false,
        }
    }

    /// Pointer compatibility for comparison, subtraction and the
    /// conditional operator: `void*` matches anything, otherwise the
    /// unqualified pointees must be compatible.
    pub fn pointers_compatible(&self, a: TypeRef, b: TypeRef) -> bool {
        let (pa, pb) = match (self.kind(a), self.kind(b)) {
            (TypeKind::Pointer(x), TypeKind::Pointer(y)) => (*x, *y),
            _ => return false,
        };
        let pa = self.skip_alias(pa);
        let pb = self.skip_alias(pb);
        if self.is_atomic(pa, AtomicKind::Void) || self.is_atomic(pb, AtomicKind::Void) {
            return true;
        }
        let mut ua = self.get(pa).clone();
        let mut ub = self.get(pb).clone();
        ua.qualifiers = Qualifiers::NONE;
        ub.qualifiers = Qualifiers::NONE;
        ua == ub || {
            // fall back to deep comparison for nested qualifiers
            match (&ua.kind, &ub.kind) {
                (TypeKind::Error, _) | (_, TypeKind::Error) => true,
                _ => ua.kind == ub.kind,
            }
        }
    }

    // ---- conversions ----

    /// Integer promotion: bitfields take their base type, anything of
    /// rank below `int` becomes `int`.
    pub fn promote_integer(&mut self, r: TypeRef) -> TypeRef {
        let r = match *self.kind(r) {
            TypeKind::Bitfield { base, .. } => base,
            _ => r,
        };
        if self.rank(r) < AtomicKind::Int.rank() {
            self.atomic(AtomicKind::Int)
        } else if let TypeKind::Enum(_) = self.kind(r) {
            self.atomic(AtomicKind::Int)
        } else {
            self.unqualified(r)
        }
    }

    /// The usual arithmetic conversions of C99 §6.3.1.8.  Both inputs
    /// must be alias-free arithmetic types; the result is the common
    /// type both operands are converted to.
    pub fn usual_arithmetic(&mut self, left: TypeRef, right: TypeRef) -> TypeRef {
        let left = self.unqualified(left);
        let right = self.unqualified(right);

        for float_kind in [
            AtomicKind::LongDouble,
            AtomicKind::Double,
            AtomicKind::Float,
        ] {
            let candidate = self.atomic(float_kind);
            if left == candidate || right == candidate {
                return candidate;
            }
        }

        let left = self.promote_integer(left);
        let right = self.promote_integer(right);
        if left == right {
            return left;
        }

        let signed_left = self.is_signed(left);
        let signed_right = self.is_signed(right);
        let rank_left = self.rank(left);
        let rank_right = self.rank(right);
        if rank_left < rank_right {
            if signed_left == signed_right || !signed_right {
                right
            } else {
                left
            }
        } else if signed_left == signed_right || !signed_left {
            left
        } else {
            right
        }
    }

    // ---- layout (LP64 target model) ----

    pub fn size_of(&self, r: TypeRef, decls: &DeclArena<'_>) -> Option<u64> {
        let r = self.skip_alias(r);
        match self.kind(r) {
            TypeKind::Atomic(k) => Some(k.size()),
            TypeKind::Pointer(_) => Some(8),
            TypeKind::Enum(d) => decls.get(*d).is_defined().then_some(4),
            TypeKind::Array {
                element,
                size: ArraySize::Fixed(n),
                ..
            } => self.size_of(*element, decls).map(|s| s * n),
            TypeKind::Struct(d) => {
                let mut offset = 0u64;
                let mut align = 1u64;
                for member in decls.members_of(*d) {
                    let ty = decls.get(member).ty?;
                    let size = self.size_of(ty, decls)?;
                    let member_align = self.align_of(ty, decls)?;
                    offset = (offset + member_align - 1) / member_align * member_align;
                    offset += size;
                    align = align.max(member_align);
                }
                Some((offset + align - 1) / align * align)
            }
            TypeKind::Union(d) => {
                let mut size = 0u64;
                let mut align = 1u64;
                for member in decls.members_of(*d) {
                    let ty = decls.get(member).ty?;
                    size = size.max(self.size_of(ty, decls)?);
                    align = align.max(self.align_of(ty, decls)?);
                }
                Some((size + align - 1) / align * align)
            }
            _ => None,
        }
    }

    pub fn align_of(&self, r: TypeRef, decls: &DeclArena<'_>) -> Option<u64> {
        let r = self.skip_alias(r);
        match self.kind(r) {
            TypeKind::Atomic(k) => Some(k.size().min(16).max(1)),
            TypeKind::Pointer(_) => Some(8),
            TypeKind::Enum(_) => Some(4),
            TypeKind::Array { element, .. } => self.align_of(*element, decls),
            TypeKind::Struct(d) | TypeKind::Union(d) => {
                let mut align = 1u64;
                for member in decls.members_of(*d) {
                    let ty = decls.get(member).ty?;
                    align = align.max(self.align_of(ty, decls)?);
                }
                Some(align)
            }
            _ => None,
        }
    }

    // ---- rendering ----

    /// Renders a type in C syntax for diagnostics.
    pub fn display(&self, r: TypeRef, decls: &DeclArena<'_>, interner: &Interner) -> String {
        self.display_declared(r, "", decls, interner)
    }

    /// Renders `r` as a declaration of `name` (empty name for a bare
    /// type).  Used both by diagnostics and by the AST printer.
    pub fn display_declared(
        &self,
        r: TypeRef,
        name: &str,
        decls: &DeclArena<'_>,
        interner: &Interner,
    ) -> String {
        let ty = self.get(r);
        let quals = ty.qualifiers;
        let prefix = |base: String| -> String {
            let mut out = String::new();
            if !quals.is_none() {
                let _ = write!(out, "{} ", quals);
            }
            out.push_str(&base);
            if !name.is_empty() {
                out.push(' ');
                out.push_str(name);
            }
            out
        };
        match &ty.kind {
            TypeKind::Error => prefix("<error>".to_string()),
            TypeKind::Atomic(k) => prefix(k.name().to_string()),
            TypeKind::Bitfield { base, width } => {
                let inner = format!("{} : {}", name, width);
                self.display_declared(*base, inner.trim(), decls, interner)
            }
            TypeKind::Struct(d) | TypeKind::Union(d) | TypeKind::Enum(d) => {
                let keyword = match ty.kind {
                    TypeKind::Struct(_) => "struct",
                    TypeKind::Union(_) => "union",
                    _ => "enum",
                };
                let tag = match decls.get(*d).symbol {
                    Some(sym) => interner.resolve(sym).to_string(),
                    None => "<anonymous>".to_string(),
                };
                prefix(format!("{} {}", keyword, tag))
            }
            TypeKind::Pointer(pointee) => {
                let mut inner = String::from("*");
                if !quals.is_none() {
                    let _ = write!(inner, "{} ", quals);
                }
                inner.push_str(name);
                let inner = match self.kind(self.skip_alias(*pointee)) {
                    TypeKind::Array { .. } | TypeKind::Function(_) => format!("({})", inner),
                    _ => inner,
                };
                self.display_declared(*pointee, &inner, decls, interner)
            }
            TypeKind::Array { element, size, .. } => {
                let extent = match size {
                    ArraySize::Unknown => String::new(),
                    ArraySize::Fixed(n) => n.to_string(),
                    ArraySize::Variable => "*".to_string(),
                };
                let inner = format!("{}[{}]", name, extent);
                self.display_declared(*element, &inner, decls, interner)
            }
            TypeKind::Function(f) => {
                let mut params = String::new();
                if f.unspecified_parameters || f.kr_style {
                    // nothing between the parentheses
                } else if f.parameters.is_empty() {
                    params.push_str("void");
                } else {
                    for (i, p) in f.parameters.iter().enumerate() {
                        if i > 0 {
                            params.push_str(", ");
                        }
                        params.push_str(&self.display(*p, decls, interner));
                    }
                    if f.variadic {
                        params.push_str(", ...");
                    }
                }
                let inner = format!("{}({})", name, params);
                self.display_declared(f.return_type, &inner, decls, interner)
            }
            TypeKind::Builtin { name: sym, .. } => prefix(interner.resolve(*sym).to_string()),
            TypeKind::Typedef { decl, .. } => {
                let alias = match decls.get(*decl).symbol {
                    Some(sym) => interner.resolve(sym).to_string(),
                    None => "<typedef>".to_string(),
                };
                prefix(alias)
            }
            TypeKind::Typeof { resolved } => {
                let inner = self.display(*resolved, decls, interner);
                prefix(format!("typeof({})", inner))
            }
        }
    }

    /// Number of members in the ordinary namespace of a compound tag
    /// whose skipped type is const-qualified, recursively.  Used by the
    /// modifiable-lvalue check.
    pub fn has_const_fields(&self, d: DeclId, decls: &DeclArena<'_>) -> bool {
        for member in decls.members_of(d) {
            let decl = decls.get(member);
            if decl.namespace != Namespace::Ordinary {
                continue;
            }
            let Some(ty) = decl.ty else { continue };
            let skipped = self.skip_alias(ty);
            if self.qualifiers(ty).contains(Qualifiers::CONST)
                || self.qualifiers(skipped).contains(Qualifiers::CONST)
            {
                return true;
            }
            if let TypeKind::Struct(inner) | TypeKind::Union(inner) = self.kind(skipped) {
                if self.has_const_fields(*inner, decls) {
                    return true;
                }
            }
        }
        false
    }
}

impl Default for TypeArena {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_is_idempotent() {
        let mut types = TypeArena::new();
        let int = types.atomic(AtomicKind::Int);
        let again = types.atomic(AtomicKind::Int);
        assert_eq!(int, again);
        let ty = types.get(int).clone();
        assert_eq!(types.intern(ty), int);
    }

    #[test]
    fn structural_equality_implies_handle_equality() {
        let mut types = TypeArena::new();
        let int = types.atomic(AtomicKind::Int);
        let p1 = types.pointer_to(int, Qualifiers::NONE);
        let p2 = types.pointer_to(int, Qualifiers::NONE);
        assert_eq!(p1, p2);

        let qp = types.pointer_to(int, Qualifiers::CONST);
        assert_ne!(p1, qp);
    }

    #[test]
    fn distinct_structures_get_distinct_handles() {
        let mut types = TypeArena::new();
        let int = types.atomic(AtomicKind::Int);
        let uint = types.atomic(AtomicKind::UInt);
        assert_ne!(int, uint);
        let a5 = types.intern(Type::new(TypeKind::Array {
            element: int,
            size: ArraySize::Fixed(5),
            is_static: false,
            is_variable: false,
        }));
        let a6 = types.intern(Type::new(TypeKind::Array {
            element: int,
            size: ArraySize::Fixed(6),
            is_static: false,
            is_variable: false,
        }));
        assert_ne!(a5, a6);
    }

    #[test]
    fn promotion_raises_small_ranks_to_int() {
        let mut types = TypeArena::new();
        let ch = types.atomic(AtomicKind::Char);
        let sh = types.atomic(AtomicKind::UShort);
        let int = types.atomic(AtomicKind::Int);
        let long = types.atomic(AtomicKind::Long);
        assert_eq!(types.promote_integer(ch), int);
        assert_eq!(types.promote_integer(sh), int);
        assert_eq!(types.promote_integer(long), long);
    }

    #[test]
    fn bitfield_promotes_through_its_base() {
        let mut types = TypeArena::new();
        let int = types.atomic(AtomicKind::Int);
        let bf = types.intern(Type::new(TypeKind::Bitfield {
            base: int,
            width: 3,
        }));
        assert_eq!(types.promote_integer(bf), int);
    }

    #[test]
    fn usual_arithmetic_prefers_floats_by_rank() {
        let mut types = TypeArena::new();
        let int = types.atomic(AtomicKind::Int);
        let float = types.atomic(AtomicKind::Float);
        let double = types.atomic(AtomicKind::Double);
        let ldouble = types.atomic(AtomicKind::LongDouble);
        assert_eq!(types.usual_arithmetic(int, double), double);
        assert_eq!(types.usual_arithmetic(float, int), float);
        assert_eq!(types.usual_arithmetic(double, ldouble), ldouble);
    }

    #[test]
    fn usual_arithmetic_sign_tiebreak() {
        let mut types = TypeArena::new();
        let int = types.atomic(AtomicKind::Int);
        let uint = types.atomic(AtomicKind::UInt);
        let long = types.atomic(AtomicKind::Long);
        let ulong = types.atomic(AtomicKind::ULong);
        // same rank, one unsigned: unsigned wins
        assert_eq!(types.usual_arithmetic(int, uint), uint);
        // a lower-ranked unsigned operand against a higher-ranked
        // signed one keeps the unsigned type; the lattice cannot
        // fold constants, so it never assumes the signed type can
        // represent the unsigned range
        assert_eq!(types.usual_arithmetic(uint, long), uint);
        assert_eq!(types.usual_arithmetic(ulong, int), ulong);
    }

    #[test]
    fn char_subtypes_promote_to_int() {
        let mut types = TypeArena::new();
        let ch = types.atomic(AtomicKind::Char);
        let uch = types.atomic(AtomicKind::UChar);
        let int = types.atomic(AtomicKind::Int);
        assert_eq!(types.usual_arithmetic(ch, uch), int);
    }

    #[test]
    fn incomplete_arrays_are_compatible_with_sized_ones() {
        let mut types = TypeArena::new();
        let int = types.atomic(AtomicKind::Int);
        let open = types.intern(Type::new(TypeKind::Array {
            element: int,
            size: ArraySize::Unknown,
            is_static: false,
            is_variable: false,
        }));
        let sized = types.intern(Type::new(TypeKind::Array {
            element: int,
            size: ArraySize::Fixed(5),
            is_static: false,
            is_variable: false,
        }));
        assert!(types.compatible(open, sized));
        assert_ne!(open, sized);
    }

    #[test]
    fn unspecified_parameters_are_compatible_with_prototypes() {
        let mut types = TypeArena::new();
        let int = types.atomic(AtomicKind::Int);
        let unspec = types.intern(Type::new(TypeKind::Function(FunctionType {
            return_type: int,
            parameters: Vec::new(),
            variadic: false,
            unspecified_parameters: true,
            kr_style: false,
        })));
        let proto = types.intern(Type::new(TypeKind::Function(FunctionType {
            return_type: int,
            parameters: Vec::new(),
            variadic: false,
            unspecified_parameters: false,
            kr_style: false,
        })));
        assert!(types.compatible(unspec, proto));
    }

    #[test]
    fn skip_typeref_merges_alias_qualifiers() {
        let mut types = TypeArena::new();
        let mut decls = DeclArena::new();
        let int = types.atomic(AtomicKind::Int);
        let decl = decls.fresh_typedef_for_tests(int);
        let alias = types.intern(Type::qualified(
            TypeKind::Typedef {
                decl,
                resolved: int,
            },
            Qualifiers::CONST,
        ));
        let skipped = types.skip_typeref(alias);
        assert!(types.qualifiers(skipped).contains(Qualifiers::CONST));
        assert!(matches!(
            types.kind(skipped),
            TypeKind::Atomic(AtomicKind::Int)
        ));
    }

    #[test]
    fn display_renders_declarator_syntax() {
        let mut types = TypeArena::new();
        let decls = DeclArena::new();
        let interner = Interner::new();
        let int = types.atomic(AtomicKind::Int);
        let ptr = types.pointer_to(int, Qualifiers::NONE);
        let arr = types.intern(Type::new(TypeKind::Array {
            element: ptr,
            size: ArraySize::Fixed(3),
            is_static: false,
            is_variable: false,
        }));
        assert_eq!(types.display(int, &decls, &interner), "int");
        assert_eq!(types.display(ptr, &decls, &interner), "int *");
        assert_eq!(
            types.display_declared(arr, "a", &decls, &interner),
            "int *a[3]"
        );
    }

    #[test]
    fn sizeof_on_lp64_model() {
        let mut types = TypeArena::new();
        let decls = DeclArena::new();
        let int = types.atomic(AtomicKind::Int);
        let long = types.atomic(AtomicKind::Long);
        let ptr = types.pointer_to(int, Qualifiers::NONE);
        let arr = types.intern(Type::new(TypeKind::Array {
            element: int,
            size: ArraySize::Fixed(4),
            is_static: false,
            is_variable: false,
        }));
        assert_eq!(types.size_of(int, &decls), Some(4));
        assert_eq!(types.size_of(long, &decls), Some(8));
        assert_eq!(types.size_of(ptr, &decls), Some(8));
        assert_eq!(types.size_of(arr, &decls), Some(16));
    }
}
