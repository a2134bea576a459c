//! Declaration parsing: specifiers, declarators, parameters, tags.
//!
//! Declaration specifiers accumulate three orthogonal axes in one
//! pass (storage class, qualifiers and type specifiers) with the
//! type specifiers collected as a bitmask that is matched against the
//! fixed C99 combination table afterwards.
//!
//! Declarators are parsed into a temporary list of constructors
//! (pointer, function, array) ordered outer-to-inner along the
//! declarator's textual reading; the base type is then wrapped by each
//! constructor in list order and the result interned.

use super::{DeclMode, Parser};
use crate::ast::{DeclId, DeclPayload, Declaration, Namespace, StorageClass};
use crate::fold;
use crate::scope::ScopeId;
use crate::token::TokenKind;
use crate::types::{
    ArraySize, AtomicKind, FunctionType, Qualifiers, Type, TypeKind, TypeRef,
};
use clef_base::Loc;

pub(crate) struct DeclarationSpecifiers {
    pub loc: Loc,
    pub storage_class: StorageClass,
    pub is_inline: bool,
    pub ty: TypeRef,
}

const SPEC_SIGNED: u32 = 1 << 0;
const SPEC_UNSIGNED: u32 = 1 << 1;
const SPEC_LONG: u32 = 1 << 2;
const SPEC_INT: u32 = 1 << 3;
const SPEC_DOUBLE: u32 = 1 << 4;
const SPEC_CHAR: u32 = 1 << 5;
const SPEC_SHORT: u32 = 1 << 6;
const SPEC_LONG_LONG: u32 = 1 << 7;
const SPEC_FLOAT: u32 = 1 << 8;
const SPEC_BOOL: u32 = 1 << 9;
const SPEC_VOID: u32 = 1 << 10;
const SPEC_COMPLEX: u32 = 1 << 11;
const SPEC_IMAGINARY: u32 = 1 << 12;

/// The accepted C99 specifier combinations.  The accumulated bitmask
/// is looked up here; no entry means the combination is invalid.
#[rustfmt::skip]
const SPECIFIER_TABLE: &[(u32, AtomicKind)] = &[
    (SPEC_VOID,                                              AtomicKind::Void),
    (SPEC_CHAR,                                              AtomicKind::Char),
    (SPEC_SIGNED | SPEC_CHAR,                                AtomicKind::SChar),
    (SPEC_UNSIGNED | SPEC_CHAR,                              AtomicKind::UChar),
    (SPEC_SHORT,                                             AtomicKind::Short),
    (SPEC_SIGNED | SPEC_SHORT,                               AtomicKind::Short),
    (SPEC_SHORT | SPEC_INT,                                  AtomicKind::Short),
    (SPEC_SIGNED | SPEC_SHORT | SPEC_INT,                    AtomicKind::Short),
    (SPEC_UNSIGNED | SPEC_SHORT,                             AtomicKind::UShort),
    (SPEC_UNSIGNED | SPEC_SHORT | SPEC_INT,                  AtomicKind::UShort),
    (SPEC_INT,                                               AtomicKind::Int),
    (SPEC_SIGNED,                                            AtomicKind::Int),
    (SPEC_SIGNED | SPEC_INT,                                 AtomicKind::Int),
    (SPEC_UNSIGNED,                                          AtomicKind::UInt),
    (SPEC_UNSIGNED | SPEC_INT,                               AtomicKind::UInt),
    (SPEC_LONG,                                              AtomicKind::Long),
    (SPEC_SIGNED | SPEC_LONG,                                AtomicKind::Long),
    (SPEC_LONG | SPEC_INT,                                   AtomicKind::Long),
    (SPEC_SIGNED | SPEC_LONG | SPEC_INT,                     AtomicKind::Long),
    (SPEC_UNSIGNED | SPEC_LONG,                              AtomicKind::ULong),
    (SPEC_UNSIGNED | SPEC_LONG | SPEC_INT,                   AtomicKind::ULong),
    (SPEC_LONG | SPEC_LONG_LONG,                             AtomicKind::LongLong),
    (SPEC_SIGNED | SPEC_LONG | SPEC_LONG_LONG,               AtomicKind::LongLong),
    (SPEC_LONG | SPEC_LONG_LONG | SPEC_INT,                  AtomicKind::LongLong),
    (SPEC_SIGNED | SPEC_LONG | SPEC_LONG_LONG | SPEC_INT,    AtomicKind::LongLong),
    (SPEC_UNSIGNED | SPEC_LONG | SPEC_LONG_LONG,             AtomicKind::ULongLong),
    (SPEC_UNSIGNED | SPEC_LONG | SPEC_LONG_LONG | SPEC_INT,  AtomicKind::ULongLong),
    (SPEC_FLOAT,                                             AtomicKind::Float),
    (SPEC_DOUBLE,                                            AtomicKind::Double),
    (SPEC_LONG | SPEC_DOUBLE,                                AtomicKind::LongDouble),
    (SPEC_BOOL,                                              AtomicKind::Bool),
    (SPEC_FLOAT | SPEC_COMPLEX,                              AtomicKind::FloatComplex),
    (SPEC_DOUBLE | SPEC_COMPLEX,                             AtomicKind::DoubleComplex),
    (SPEC_LONG | SPEC_DOUBLE | SPEC_COMPLEX,                 AtomicKind::LongDoubleComplex),
    (SPEC_FLOAT | SPEC_IMAGINARY,                            AtomicKind::FloatImaginary),
    (SPEC_DOUBLE | SPEC_IMAGINARY,                           AtomicKind::DoubleImaginary),
    (SPEC_LONG | SPEC_DOUBLE | SPEC_IMAGINARY,               AtomicKind::LongDoubleImaginary),
];

/// One step of a declarator, outer-to-inner.
pub(crate) enum Constructor {
    Pointer {
        qualifiers: Qualifiers,
    },
    Array {
        qualifiers: Qualifiers,
        size: ArraySize,
        is_static: bool,
        is_variable: bool,
    },
    Function {
        parameters: Vec<TypeRef>,
        variadic: bool,
        unspecified: bool,
        kr: bool,
    },
}

impl<'a, 'e> Parser<'a, 'e> {
    // ========================================================================
    // Declaration specifiers
    // ========================================================================

    pub(crate) fn parse_declaration_specifiers(&mut self) -> DeclarationSpecifiers {
        let mut specifiers = DeclarationSpecifiers {
            loc: self.here(),
            storage_class: StorageClass::None,
            is_inline: false,
            ty: self.types.error_type(),
        };
        let mut qualifiers = Qualifiers::NONE;
        let mut mask: u32 = 0;
        let mut ty: Option<TypeRef> = None;

        loop {
            match self.token.kind.clone() {
                TokenKind::Typedef => self.set_storage_class(&mut specifiers, StorageClass::Typedef),
                TokenKind::Extern => self.set_storage_class(&mut specifiers, StorageClass::Extern),
                TokenKind::Static => self.set_storage_class(&mut specifiers, StorageClass::Static),
                TokenKind::Auto => self.set_storage_class(&mut specifiers, StorageClass::Auto),
                TokenKind::Register => {
                    self.set_storage_class(&mut specifiers, StorageClass::Register)
                }
                TokenKind::Thread => {
                    specifiers.storage_class = match specifiers.storage_class {
                        StorageClass::None => StorageClass::Thread,
                        StorageClass::Extern => StorageClass::ThreadExtern,
                        StorageClass::Static => StorageClass::ThreadStatic,
                        other => {
                            let loc = self.here();
                            self.diags.error(
                                loc,
                                "multiple storage classes in declaration specifiers",
                            );
                            other
                        }
                    };
                    self.next_token();
                }

                TokenKind::Const => {
                    qualifiers = qualifiers | Qualifiers::CONST;
                    self.next_token();
                }
                TokenKind::Volatile => {
                    qualifiers = qualifiers | Qualifiers::VOLATILE;
                    self.next_token();
                }
                TokenKind::Restrict => {
                    qualifiers = qualifiers | Qualifiers::RESTRICT;
                    self.next_token();
                }

                TokenKind::Extension => self.next_token(),
                TokenKind::Inline => {
                    specifiers.is_inline = true;
                    self.next_token();
                }

                TokenKind::Void => self.add_specifier(&mut mask, SPEC_VOID, "void"),
                TokenKind::Char => self.add_specifier(&mut mask, SPEC_CHAR, "char"),
                TokenKind::Short => self.add_specifier(&mut mask, SPEC_SHORT, "short"),
                TokenKind::Int => self.add_specifier(&mut mask, SPEC_INT, "int"),
                TokenKind::Float_ => self.add_specifier(&mut mask, SPEC_FLOAT, "float"),
                TokenKind::Double => self.add_specifier(&mut mask, SPEC_DOUBLE, "double"),
                TokenKind::Signed => self.add_specifier(&mut mask, SPEC_SIGNED, "signed"),
                TokenKind::Unsigned => self.add_specifier(&mut mask, SPEC_UNSIGNED, "unsigned"),
                TokenKind::Bool => self.add_specifier(&mut mask, SPEC_BOOL, "_Bool"),
                TokenKind::Complex => self.add_specifier(&mut mask, SPEC_COMPLEX, "_Complex"),
                TokenKind::Imaginary => {
                    self.add_specifier(&mut mask, SPEC_IMAGINARY, "_Imaginary")
                }

                TokenKind::Long => {
                    self.next_token();
                    if mask & SPEC_LONG_LONG != 0 {
                        let loc = self.here();
                        self.diags.error(loc, "multiple type specifiers given");
                    } else if mask & SPEC_LONG != 0 {
                        mask |= SPEC_LONG_LONG;
                    } else {
                        mask |= SPEC_LONG;
                    }
                }

                TokenKind::Struct => {
                    let tag = self.parse_compound_type_specifier(true);
                    let new_ty = match tag {
                        Some(decl) => self.types.intern(Type::new(TypeKind::Struct(decl))),
                        None => self.types.error_type(),
                    };
                    self.set_specifier_type(&mut ty, new_ty);
                }
                TokenKind::Union => {
                    let tag = self.parse_compound_type_specifier(false);
                    let new_ty = match tag {
                        Some(decl) => self.types.intern(Type::new(TypeKind::Union(decl))),
                        None => self.types.error_type(),
                    };
                    self.set_specifier_type(&mut ty, new_ty);
                }
                TokenKind::Enum => {
                    let new_ty = self.parse_enum_specifier();
                    self.set_specifier_type(&mut ty, new_ty);
                }
                TokenKind::Typeof => {
                    let new_ty = self.parse_typeof();
                    self.set_specifier_type(&mut ty, new_ty);
                }
                TokenKind::BuiltinVaList => {
                    let valist = self.type_valist;
                    self.set_specifier_type(&mut ty, valist);
                    self.next_token();
                }

                TokenKind::Attribute => self.parse_attributes(),

                TokenKind::Identifier(sym) => {
                    if ty.is_some() || mask != 0 {
                        break;
                    }
                    let Some(decl) = self.get_declaration(sym, Namespace::Ordinary) else {
                        break;
                    };
                    if self.decls.get(decl).storage_class != StorageClass::Typedef {
                        break;
                    }
                    let resolved = self
                        .decls
                        .get(decl)
                        .ty
                        .unwrap_or_else(|| self.types.error_type());
                    let alias = self.types.intern(Type::new(TypeKind::Typedef {
                        decl,
                        resolved,
                    }));
                    ty = Some(alias);
                    self.next_token();
                }

                _ => break,
            }
        }

        let mut base = match ty {
            Some(t) => {
                if mask != 0 {
                    self.diags
                        .error(specifiers.loc, "multiple datatypes in declaration");
                }
                t
            }
            None => {
                let atomic = self.atomic_from_specifiers(mask, specifiers.loc);
                self.types.atomic(atomic)
            }
        };
        if !qualifiers.is_none() {
            let combined = self.types.qualifiers(base) | qualifiers;
            base = self.types.with_qualifiers(base, combined);
        }
        specifiers.ty = base;
        specifiers
    }

    fn set_storage_class(&mut self, specifiers: &mut DeclarationSpecifiers, class: StorageClass) {
        if specifiers.storage_class != StorageClass::None {
            let loc = self.here();
            self.diags
                .error(loc, "multiple storage classes in declaration specifiers");
        } else {
            specifiers.storage_class = class;
        }
        self.next_token();
    }

    fn add_specifier(&mut self, mask: &mut u32, bit: u32, name: &str) {
        self.next_token();
        if *mask & bit != 0 {
            let loc = self.here();
            self.diags
                .error(loc, format!("multiple {} type specifiers given", name));
        } else {
            *mask |= bit;
        }
    }

    fn set_specifier_type(&mut self, ty: &mut Option<TypeRef>, new_ty: TypeRef) {
        if ty.is_some() {
            let loc = self.here();
            self.diags.error(loc, "multiple datatypes in declaration");
        }
        *ty = Some(new_ty);
    }

    fn atomic_from_specifiers(&mut self, mask: u32, loc: Loc) -> AtomicKind {
        if let Some((_, kind)) = SPECIFIER_TABLE.iter().find(|(bits, _)| *bits == mask) {
            return *kind;
        }
        if mask == 0 {
            if !self.strict {
                if self.warnings.implicit_int {
                    self.diags
                        .warning(loc, "no type specifiers in declaration, using 'int'");
                }
                return AtomicKind::Int;
            }
            self.diags
                .error(loc, "no type specifiers given in declaration");
        } else if mask & SPEC_SIGNED != 0 && mask & SPEC_UNSIGNED != 0 {
            self.diags
                .error(loc, "both signed and unsigned specifiers given");
        } else if mask & (SPEC_SIGNED | SPEC_UNSIGNED) != 0 {
            self.diags
                .error(loc, "only integer types can be signed or unsigned");
        } else {
            self.diags.error(loc, "multiple datatypes in declaration");
        }
        AtomicKind::Int
    }

    pub(crate) fn parse_type_qualifiers(&mut self) -> Qualifiers {
        let mut qualifiers = Qualifiers::NONE;
        loop {
            match self.token.kind {
                TokenKind::Const => qualifiers = qualifiers | Qualifiers::CONST,
                TokenKind::Volatile => qualifiers = qualifiers | Qualifiers::VOLATILE,
                TokenKind::Restrict => qualifiers = qualifiers | Qualifiers::RESTRICT,
                _ => return qualifiers,
            }
            self.next_token();
        }
    }

    /// Skips `__attribute__((...))` and `asm("...")` annotations.
    pub(crate) fn parse_attributes(&mut self) {
        loop {
            match self.token.kind {
                TokenKind::Attribute => {
                    self.next_token();
                    if !self.expect_soft(TokenKind::LParen) {
                        return;
                    }
                    let mut depth = 1;
                    while depth > 0 {
                        match self.token.kind {
                            TokenKind::Eof => {
                                let loc = self.here();
                                self.diags.error(loc, "EOF while parsing attribute");
                                return;
                            }
                            TokenKind::LParen => {
                                self.next_token();
                                depth += 1;
                            }
                            TokenKind::RParen => {
                                self.next_token();
                                depth -= 1;
                            }
                            _ => self.next_token(),
                        }
                    }
                }
                TokenKind::Asm => {
                    self.next_token();
                    if !self.expect_soft(TokenKind::LParen) {
                        return;
                    }
                    if matches!(self.token.kind, TokenKind::StringLiteral(_)) {
                        self.next_token();
                    } else {
                        self.parse_error_expected(
                            Some("assembler attribute"),
                            "string literal",
                        );
                        self.eat_paren();
                        continue;
                    }
                    let _ = self.expect_soft(TokenKind::RParen);
                }
                _ => return,
            }
        }
    }

    // ========================================================================
    // struct/union/enum specifiers
    // ========================================================================

    pub(crate) fn parse_compound_type_specifier(&mut self, is_struct: bool) -> Option<DeclId> {
        if is_struct {
            self.eat(TokenKind::Struct);
        } else {
            self.eat(TokenKind::Union);
        }

        if self.token.kind == TokenKind::Attribute {
            self.parse_attributes();
        }

        let namespace = if is_struct {
            Namespace::Struct
        } else {
            Namespace::Union
        };

        let mut symbol = None;
        let mut declaration = None;
        if let TokenKind::Identifier(sym) = self.token.kind {
            symbol = Some(sym);
            self.next_token();
            declaration = self.get_declaration(sym, namespace);
        } else if self.token.kind != TokenKind::LBrace {
            let context = if is_struct {
                "struct type specifier"
            } else {
                "union type specifier"
            };
            self.parse_error_expected(Some(context), "identifier or '{'");
            return None;
        }

        let declaration = match declaration {
            Some(decl) => decl,
            None => {
                let mut decl = Declaration::new(namespace);
                decl.symbol = symbol;
                decl.loc = Some(self.here());
                let decl = self.decls.alloc(decl);
                if symbol.is_some() {
                    self.environment_push(decl);
                }
                self.append_declaration(decl);
                decl
            }
        };

        if self.token.kind == TokenKind::LBrace {
            if self.decls.get(declaration).is_defined() {
                let keyword = if is_struct { "struct" } else { "union" };
                let name = self.decl_name(declaration);
                let loc = self.here();
                self.diags.error(
                    loc,
                    format!("multiple definition of '{} {}'", keyword, name),
                );
            }
            self.decls.get_mut(declaration).payload = DeclPayload::TagDefined;

            let members = self.decls.new_scope(Some(self.current_scope));
            self.decls.get_mut(declaration).own_scope = Some(members);

            let mark = self.enter_scope(members);
            self.parse_compound_type_entries();
            self.parse_attributes();
            self.leave_scope(mark);
        }

        Some(declaration)
    }

    fn parse_compound_type_entries(&mut self) {
        self.eat(TokenKind::LBrace);

        while !matches!(self.token.kind, TokenKind::RBrace | TokenKind::Eof) {
            let specifiers = self.parse_declaration_specifiers();
            self.parse_struct_declarators(&specifiers);
        }
        if self.token.kind == TokenKind::Eof {
            let loc = self.here();
            self.diags.error(loc, "EOF while parsing struct");
            return;
        }
        self.next_token();
    }

    fn make_bitfield_type(&mut self, base: TypeRef) -> TypeRef {
        let (_, value) = self.parse_constant_expression();
        let width = match value {
            Some(v) if v >= 0 => v as u32,
            Some(_) => {
                let loc = self.here();
                self.diags.error(loc, "negative width in bitfield");
                0
            }
            None => 0,
        };
        self.types
            .intern(Type::new(TypeKind::Bitfield { base, width }))
    }

    fn parse_struct_declarators(&mut self, specifiers: &DeclarationSpecifiers) {
        loop {
            if self.token.kind == TokenKind::Colon {
                self.next_token();
                let ty = self.make_bitfield_type(specifiers.ty);
                let mut decl = Declaration::new(Namespace::Ordinary);
                decl.loc = Some(self.here());
                decl.ty = Some(ty);
                let decl = self.decls.alloc(decl);
                self.append_declaration(decl);
            } else {
                let declaration = self.parse_declarator(specifiers, true);
                if self.token.kind == TokenKind::Colon {
                    self.next_token();
                    let base = self
                        .decls
                        .get(declaration)
                        .ty
                        .unwrap_or_else(|| self.types.error_type());
                    let ty = self.make_bitfield_type(base);
                    self.decls.get_mut(declaration).ty = Some(ty);
                }
                if self.decls.get(declaration).symbol.is_some() {
                    self.record_declaration(declaration);
                } else {
                    self.append_declaration(declaration);
                }
            }

            if self.token.kind != TokenKind::Comma {
                break;
            }
            self.next_token();
        }
        let _ = self.expect(TokenKind::Semicolon);
    }

    pub(crate) fn parse_enum_specifier(&mut self) -> TypeRef {
        self.eat(TokenKind::Enum);

        let mut symbol = None;
        let mut declaration = None;
        if let TokenKind::Identifier(sym) = self.token.kind {
            symbol = Some(sym);
            self.next_token();
            declaration = self.get_declaration(sym, Namespace::Enum);
        } else if self.token.kind != TokenKind::LBrace {
            self.parse_error_expected(Some("enum type specifier"), "identifier or '{'");
            return self.types.error_type();
        }

        let declaration = match declaration {
            Some(decl) => decl,
            None => {
                let mut decl = Declaration::new(Namespace::Enum);
                decl.symbol = symbol;
                decl.loc = Some(self.here());
                self.decls.alloc(decl)
            }
        };

        let ty = self.types.intern(Type::new(TypeKind::Enum(declaration)));

        if self.token.kind == TokenKind::LBrace {
            if self.decls.get(declaration).is_defined() {
                let name = self.decl_name(declaration);
                let loc = self.here();
                self.diags
                    .error(loc, format!("multiple definitions of 'enum {}'", name));
            }
            if self.decls.get(declaration).parent_scope.is_none() {
                if symbol.is_some() {
                    self.environment_push(declaration);
                }
                self.append_declaration(declaration);
            }
            self.decls.get_mut(declaration).payload = DeclPayload::TagDefined;

            self.parse_enum_entries(ty);
            self.parse_attributes();
        }

        ty
    }

    fn parse_enum_entries(&mut self, enum_type: TypeRef) {
        self.eat(TokenKind::LBrace);

        if self.token.kind == TokenKind::RBrace {
            self.next_token();
            let loc = self.here();
            self.diags.error(loc, "empty enum not allowed");
            return;
        }

        let mut next_value: i64 = 0;
        loop {
            let TokenKind::Identifier(sym) = self.token.kind else {
                self.parse_error_expected(Some("enum entry"), "identifier");
                self.eat_block();
                return;
            };

            let mut entry = Declaration::new(Namespace::Ordinary);
            entry.storage_class = StorageClass::EnumEntry;
            entry.ty = Some(enum_type);
            entry.symbol = Some(sym);
            entry.loc = Some(self.here());
            let entry = self.decls.alloc(entry);
            self.next_token();

            let payload = if self.token.kind == TokenKind::Assign {
                self.next_token();
                let (expression, value) = self.parse_constant_expression();
                let value = value.unwrap_or(next_value);
                next_value = value.wrapping_add(1);
                DeclPayload::EnumValue {
                    expression: Some(expression),
                    value,
                }
            } else {
                let value = next_value;
                next_value = next_value.wrapping_add(1);
                DeclPayload::EnumValue {
                    expression: None,
                    value,
                }
            };
            self.decls.get_mut(entry).payload = payload;

            self.record_declaration(entry);

            if self.token.kind != TokenKind::Comma {
                break;
            }
            self.next_token();
            if self.token.kind == TokenKind::RBrace {
                break;
            }
        }
        let _ = self.expect(TokenKind::RBrace);
    }

    pub(crate) fn parse_typeof(&mut self) -> TypeRef {
        self.eat(TokenKind::Typeof);
        if !self.expect_soft(TokenKind::LParen) {
            return self.types.error_type();
        }

        while self.token.kind == TokenKind::Extension {
            self.next_token();
        }

        let starts_typename = match self.token.kind {
            TokenKind::Identifier(sym) => self.is_typedef_symbol(sym),
            TokenKind::Const | TokenKind::Volatile | TokenKind::Restrict => true,
            _ => self.is_declaration_specifier(&self.token, true),
        };
        let ty = if starts_typename {
            self.parse_typename()
        } else {
            let expression = self.parse_expression();
            expression.ty()
        };

        let _ = self.expect_soft(TokenKind::RParen);

        self.types
            .intern(Type::new(TypeKind::Typeof { resolved: ty }))
    }

    // ========================================================================
    // Parameters
    // ========================================================================

    fn parse_identifier_list(&mut self, scope: ScopeId) {
        loop {
            let TokenKind::Identifier(sym) = self.token.kind else {
                break;
            };
            let mut decl = Declaration::new(Namespace::Ordinary);
            decl.symbol = Some(sym);
            decl.loc = Some(self.here());
            // K&R parameters have no type yet
            let decl = self.decls.alloc(decl);
            self.decls.append_to_scope(scope, decl);
            self.next_token();

            if self.token.kind != TokenKind::Comma {
                break;
            }
            self.next_token();
        }
    }

    /// Adjustments of §6.7.5.3: arrays and functions decay to
    /// pointers, storage classes other than `register` are rejected,
    /// parameters must have complete types.
    pub(crate) fn semantic_parameter(&mut self, declaration: DeclId) {
        let loc = self.here();
        match self.decls.get(declaration).storage_class {
            StorageClass::Typedef => {
                self.diags
                    .error(loc, "typedef not allowed in parameter list");
            }
            StorageClass::None | StorageClass::Register => {}
            _ => {
                self.diags.error(
                    loc,
                    "parameter may only have none or register storage class",
                );
            }
        }

        let declared = self.decls.get(declaration).ty;
        let Some(orig_type) = declared else {
            return;
        };
        let ty = self.types.skip_typeref(orig_type);

        let adjusted = if let Some(element) = self.types.array_element(ty) {
            let qualifiers = self.types.qualifiers(ty);
            Some(self.types.pointer_to(element, qualifiers))
        } else if self.types.is_function(ty) {
            Some(self.types.pointer_to(ty, Qualifiers::NONE))
        } else {
            None
        };
        let ty = match adjusted {
            Some(pointer) => {
                self.decls.get_mut(declaration).ty = Some(pointer);
                pointer
            }
            None => ty,
        };

        if self.types.is_valid(ty) && self.types.is_incomplete(ty, &self.decls) {
            let shown = self.display_type(orig_type);
            let name = self.decl_name(declaration);
            self.diags.error(
                loc,
                format!(
                    "incomplete type ('{}') not allowed for parameter '{}'",
                    shown, name
                ),
            );
        }
    }

    fn parse_parameter(&mut self) -> DeclId {
        let specifiers = self.parse_declaration_specifiers();
        let declaration = self.parse_declarator(&specifiers, true);
        self.semantic_parameter(declaration);
        declaration
    }

    /// Parses a parameter list into `scope`, distinguishing the four
    /// shapes: `()`, `(void)`, a K&R identifier list, and a prototype
    /// with optional trailing ellipsis.
    fn parse_parameters(&mut self, scope: ScopeId) -> (Vec<TypeRef>, bool, bool, bool) {
        let mut parameters = Vec::new();

        if let TokenKind::Identifier(sym) = self.token.kind {
            if !self.is_typedef_symbol(sym) {
                self.parse_identifier_list(scope);
                return (parameters, false, false, true);
            }
        }

        if self.token.kind == TokenKind::RParen {
            return (parameters, false, true, false);
        }
        if self.token.kind == TokenKind::Void && self.look_ahead(1).kind == TokenKind::RParen {
            self.next_token();
            return (parameters, false, false, false);
        }

        loop {
            if self.token.kind == TokenKind::Ellipsis {
                self.next_token();
                return (parameters, true, false, false);
            }
            let starts_parameter = matches!(
                self.token.kind,
                TokenKind::Identifier(_) | TokenKind::Extension
            ) || self.is_declaration_specifier(&self.token, false);
            if !starts_parameter {
                return (parameters, false, false, false);
            }

            let declaration = self.parse_parameter();
            self.decls.append_to_scope(scope, declaration);
            let ty = self
                .decls
                .get(declaration)
                .ty
                .unwrap_or_else(|| self.types.error_type());
            parameters.push(ty);

            if self.token.kind != TokenKind::Comma {
                return (parameters, false, false, false);
            }
            self.next_token();
        }
    }

    // ========================================================================
    // Declarators
    // ========================================================================

    fn parse_pointer_declarator(&mut self) -> Constructor {
        self.eat(TokenKind::Star);
        Constructor::Pointer {
            qualifiers: self.parse_type_qualifiers(),
        }
    }

    fn parse_array_declarator(&mut self) -> Constructor {
        self.eat(TokenKind::LBracket);

        let mut is_static = false;
        if self.token.kind == TokenKind::Static {
            is_static = true;
            self.next_token();
        }
        let qualifiers = self.parse_type_qualifiers();
        if !qualifiers.is_none() && self.token.kind == TokenKind::Static {
            is_static = true;
            self.next_token();
        }

        let mut is_variable = false;
        let mut size = ArraySize::Unknown;
        if self.token.kind == TokenKind::Star && self.look_ahead(1).kind == TokenKind::RBracket {
            is_variable = true;
            self.next_token();
        } else if self.token.kind != TokenKind::RBracket {
            let expression = self.parse_assignment_expression();
            size = match fold::fold(expression, &self.decls, self.types) {
                Some(n) if n >= 0 => ArraySize::Fixed(n as u64),
                Some(_) => {
                    self.diags
                        .error(expression.loc, "size of array is negative");
                    ArraySize::Unknown
                }
                None => ArraySize::Variable,
            };
        }

        let _ = self.expect(TokenKind::RBracket);

        Constructor::Array {
            qualifiers,
            size,
            is_static,
            is_variable,
        }
    }

    fn parse_function_declarator(&mut self, declaration: Option<DeclId>) -> Constructor {
        self.eat(TokenKind::LParen);

        let scope = self.decls.new_scope(Some(self.current_scope));
        let (parameters, variadic, unspecified, kr) = self.parse_parameters(scope);

        if let Some(decl) = declaration {
            if self.decls.get(decl).own_scope.is_none() {
                self.decls.get_mut(decl).own_scope = Some(scope);
            }
        }

        let _ = self.expect_soft(TokenKind::RParen);

        Constructor::Function {
            parameters,
            variadic,
            unspecified,
            kr,
        }
    }

    /// Builds the constructor list describing the declarator,
    /// outer-to-inner along its textual reading.  Postfix constructors
    /// slot in right behind the pointer block; a parenthesized inner
    /// declarator is appended last, binding tightest.
    fn parse_inner_declarator(
        &mut self,
        declaration: Option<DeclId>,
        may_be_abstract: bool,
    ) -> Vec<Constructor> {
        let mut constructors = Vec::new();

        while self.token.kind == TokenKind::Star {
            let pointer = self.parse_pointer_declarator();
            constructors.push(pointer);
        }

        self.parse_attributes();

        let mut inner = Vec::new();
        match self.token.kind {
            TokenKind::Identifier(sym) => {
                match declaration {
                    None => {
                        let loc = self.here();
                        self.diags.error(loc, "no identifier expected in typename");
                    }
                    Some(decl) => {
                        let loc = self.here();
                        let d = self.decls.get_mut(decl);
                        d.symbol = Some(sym);
                        d.loc = Some(loc);
                    }
                }
                self.next_token();
            }
            TokenKind::LParen => {
                self.next_token();
                inner = self.parse_inner_declarator(declaration, may_be_abstract);
                let _ = self.expect_soft(TokenKind::RParen);
            }
            _ => {
                if !may_be_abstract {
                    self.parse_error_expected(Some("declarator"), "identifier or '('");
                    // avoid a loop at the outermost scope: eat_statement
                    // stops in front of '}'
                    if self.token.kind == TokenKind::RBrace && self.current_function.is_none() {
                        self.next_token();
                    } else {
                        self.eat_statement();
                    }
                    return constructors;
                }
            }
        }

        let insert_at = constructors.len();
        loop {
            let constructor = match self.token.kind {
                TokenKind::LParen => self.parse_function_declarator(declaration),
                TokenKind::LBracket => self.parse_array_declarator(),
                _ => break,
            };
            constructors.insert(insert_at, constructor);
        }

        self.parse_attributes();

        constructors.extend(inner);
        constructors
    }

    /// Wraps the base type with each constructor in list order,
    /// checking the composition rules, interning every finished step.
    fn construct_declarator_type(
        &mut self,
        constructors: Vec<Constructor>,
        base: TypeRef,
    ) -> TypeRef {
        let mut ty = base;
        for constructor in constructors {
            match constructor {
                Constructor::Function {
                    parameters,
                    variadic,
                    unspecified,
                    kr,
                } => {
                    let skipped = self.types.skip_alias(ty);
                    if self.types.is_function(skipped) {
                        let loc = self.here();
                        self.diags
                            .error(loc, "function returning function is not allowed");
                        ty = self.types.error_type();
                    } else if self.types.is_array(skipped) {
                        let loc = self.here();
                        self.diags
                            .error(loc, "function returning array is not allowed");
                        ty = self.types.error_type();
                    } else {
                        ty = self.types.intern(Type::new(TypeKind::Function(
                            FunctionType {
                                return_type: ty,
                                parameters,
                                variadic,
                                unspecified_parameters: unspecified,
                                kr_style: kr,
                            },
                        )));
                    }
                }
                Constructor::Pointer { qualifiers } => {
                    ty = self.types.pointer_to(ty, qualifiers);
                }
                Constructor::Array {
                    qualifiers,
                    size,
                    is_static,
                    is_variable,
                } => {
                    let skipped = self.types.skip_alias(ty);
                    if self.types.is_atomic(skipped, AtomicKind::Void) {
                        let loc = self.here();
                        self.diags.error(loc, "array of void is not allowed");
                        ty = self.types.error_type();
                    } else {
                        ty = self.types.intern(Type::qualified(
                            TypeKind::Array {
                                element: ty,
                                size,
                                is_static,
                                is_variable,
                            },
                            qualifiers,
                        ));
                    }
                }
            }
        }
        ty
    }

    pub(crate) fn parse_declarator(
        &mut self,
        specifiers: &DeclarationSpecifiers,
        may_be_abstract: bool,
    ) -> DeclId {
        let mut decl = Declaration::new(Namespace::Ordinary);
        decl.storage_class = specifiers.storage_class;
        decl.is_inline = specifiers.is_inline;
        decl.loc = Some(specifiers.loc);
        let declaration = self.decls.alloc(decl);

        let constructors = self.parse_inner_declarator(Some(declaration), may_be_abstract);
        let ty = self.construct_declarator_type(constructors, specifiers.ty);
        self.decls.get_mut(declaration).ty = Some(ty);

        declaration
    }

    pub(crate) fn parse_abstract_declarator(&mut self, base: TypeRef) -> TypeRef {
        let constructors = self.parse_inner_declarator(None, true);
        self.construct_declarator_type(constructors, base)
    }

    pub(crate) fn parse_typename(&mut self) -> TypeRef {
        let specifiers = self.parse_declaration_specifiers();
        if specifiers.storage_class != StorageClass::None {
            self.diags
                .error(specifiers.loc, "typename must not have a storage class");
        }
        self.parse_abstract_declarator(specifiers.ty)
    }

    // ========================================================================
    // Declarations
    // ========================================================================

    pub(crate) fn parse_declaration(&mut self, mode: DeclMode) {
        let specifiers = self.parse_declaration_specifiers();

        if self.token.kind == TokenKind::Semicolon {
            self.parse_anonymous_declaration_rest(&specifiers);
        } else {
            let declaration = self.parse_declarator(&specifiers, false);
            self.parse_declaration_rest(declaration, &specifiers, mode);
        }
    }

    pub(crate) fn parse_anonymous_declaration_rest(
        &mut self,
        specifiers: &DeclarationSpecifiers,
    ) {
        self.eat(TokenKind::Semicolon);

        let mut decl = Declaration::new(Namespace::Ordinary);
        decl.ty = Some(specifiers.ty);
        decl.storage_class = specifiers.storage_class;
        decl.loc = Some(specifiers.loc);
        let declaration = self.decls.alloc(decl);

        if specifiers.storage_class != StorageClass::None {
            self.diags.warning(
                specifiers.loc,
                "useless storage class in empty declaration",
            );
        }

        match self.types.kind(specifiers.ty) {
            TypeKind::Struct(tag) | TypeKind::Union(tag) => {
                if self.decls.get(*tag).symbol.is_none() {
                    self.diags.warning(
                        specifiers.loc,
                        "unnamed struct/union that defines no instances",
                    );
                }
            }
            TypeKind::Enum(_) | TypeKind::Error => {}
            _ => {
                self.diags.warning(specifiers.loc, "empty declaration");
            }
        }

        self.append_declaration(declaration);
    }

    pub(crate) fn parse_declaration_rest(
        &mut self,
        first: DeclId,
        specifiers: &DeclarationSpecifiers,
        mode: DeclMode,
    ) {
        let mut ndeclaration = first;
        loop {
            let declaration = match mode {
                DeclMode::Record => self.record_declaration(ndeclaration),
                DeclMode::KrParameter => self.finished_kr_declaration(ndeclaration),
            };

            if let Some(ty) = self.decls.get(declaration).ty {
                let skipped = self.types.skip_typeref(ty);
                if !self.types.is_function(skipped)
                    && self.decls.get(declaration).is_inline
                    && self.types.is_valid(skipped)
                {
                    let name = self.decl_name(declaration);
                    let loc = self.decls.get(declaration).loc.unwrap_or_default();
                    self.diags
                        .warning(loc, format!("variable '{}' declared 'inline'", name));
                }
            }

            if self.token.kind == TokenKind::Assign {
                self.parse_init_declarator_rest(declaration);
            }

            if self.token.kind != TokenKind::Comma {
                break;
            }
            self.eat(TokenKind::Comma);

            ndeclaration = self.parse_declarator(specifiers, false);
        }
        let _ = self.expect(TokenKind::Semicolon);
    }

    /// `= initializer` after a declarator.  Completes the size of an
    /// open array from the initializer per §6.7.8 (22).
    fn parse_init_declarator_rest(&mut self, declaration: DeclId) {
        self.eat(TokenKind::Assign);

        let orig_type = self
            .decls
            .get(declaration)
            .ty
            .unwrap_or_else(|| self.types.error_type());
        let ty = self.types.skip_typeref(orig_type);

        if matches!(
            self.decls.get(declaration).payload,
            DeclPayload::Initializer(_)
        ) {
            let loc = self.here();
            self.error_multiple_definition(declaration, loc);
        }

        let initializer = self.parse_initializer(ty);

        let Some(initializer) = initializer else {
            return;
        };

        let open_array = match *self.types.kind(ty) {
            TypeKind::Array {
                element,
                size: ArraySize::Unknown,
                is_static,
                is_variable,
            } => Some((element, is_static, is_variable)),
            _ => None,
        };
        if let Some((element, is_static, is_variable)) = open_array {
            let length = match initializer {
                crate::ast::Initializer::List(entries) => Some(entries.len() as u64),
                crate::ast::Initializer::String(bytes) => Some(bytes.len() as u64 + 1),
                crate::ast::Initializer::WideString(chars) => Some(chars.len() as u64 + 1),
                crate::ast::Initializer::Value(_) => None,
            };
            if let Some(n) = length {
                let qualifiers = self.types.qualifiers(ty);
                let completed = self.types.intern(Type::qualified(
                    TypeKind::Array {
                        element,
                        size: ArraySize::Fixed(n),
                        is_static,
                        is_variable,
                    },
                    qualifiers,
                ));
                self.decls.get_mut(declaration).ty = Some(completed);
            }
        }

        if self.types.is_function(ty) {
            let name = self.decl_name(declaration);
            let shown = self.display_type(orig_type);
            let loc = self.decls.get(declaration).loc.unwrap_or_default();
            self.diags.error(
                loc,
                format!(
                    "initializers not allowed for function declarator '{}' (type '{}')",
                    name, shown
                ),
            );
        } else {
            self.decls.get_mut(declaration).payload = DeclPayload::Initializer(initializer);
        }
    }

    /// Declaration inside a K&R parameter list: the first type for a
    /// placeholder fills it in place, anything else records normally.
    fn finished_kr_declaration(&mut self, declaration: DeclId) -> DeclId {
        let Some(symbol) = self.decls.get(declaration).symbol else {
            let loc = self.here();
            self.diags
                .error(loc, "anonymous declaration not valid as function parameter");
            return declaration;
        };
        if self.decls.get(declaration).namespace != Namespace::Ordinary {
            return self.record_declaration(declaration);
        }

        let previous = self.get_declaration(symbol, Namespace::Ordinary);
        let previous = match previous {
            Some(p) if self.decls.get(p).parent_scope == Some(self.current_scope) => p,
            _ => {
                let name = self.name_of(symbol);
                let loc = self.here();
                self.diags.error(
                    loc,
                    format!(
                        "expected declaration of a function parameter, found '{}'",
                        name
                    ),
                );
                return declaration;
            }
        };

        if self.decls.get(previous).ty.is_none() {
            let ty = self.decls.get(declaration).ty;
            let storage_class = self.decls.get(declaration).storage_class;
            let prev = self.decls.get_mut(previous);
            prev.ty = ty;
            prev.storage_class = storage_class;
            previous
        } else {
            self.record_declaration(declaration)
        }
    }

    /// The declaration list between a K&R declarator and the function
    /// body: fills parameter types, then rebuilds the function type
    /// with the now-known parameters.
    pub(crate) fn parse_kr_declaration_list(&mut self, declaration: DeclId) {
        let Some(orig_type) = self.decls.get(declaration).ty else {
            return;
        };
        let ty = self.types.skip_typeref(orig_type);
        let function = match self.types.kind(ty) {
            TypeKind::Function(f) if f.kr_style => f.clone(),
            _ => return,
        };
        let Some(scope) = self.decls.get(declaration).own_scope else {
            return;
        };

        let mark = self.enter_scope(scope);
        let parameters: Vec<DeclId> = self.decls.scope(scope).declarations.clone();
        for parameter in &parameters {
            if self.decls.get(*parameter).symbol.is_some() {
                self.environment_push(*parameter);
            }
        }

        while self.is_declaration_specifier(&self.token.clone(), false) {
            self.parse_declaration(DeclMode::KrParameter);
        }

        self.leave_scope(mark);

        // every parameter now has a type; rebuild the function type
        let mut parameter_types = Vec::new();
        let parameters: Vec<DeclId> = self.decls.scope(scope).declarations.clone();
        for parameter in parameters {
            if self.decls.get(parameter).namespace != Namespace::Ordinary {
                continue;
            }
            if self.decls.get(parameter).ty.is_none() {
                let name = self.decl_name(parameter);
                let loc = self.decls.get(parameter).loc.unwrap_or_default();
                if self.strict {
                    self.diags.error(
                        loc,
                        format!("no type specified for function parameter '{}'", name),
                    );
                    self.decls.get_mut(parameter).ty = Some(self.types.error_type());
                } else {
                    if self.warnings.implicit_int {
                        self.diags.warning(
                            loc,
                            format!(
                                "no type specified for function parameter '{}', using 'int'",
                                name
                            ),
                        );
                    }
                    let int = self.types.atomic(AtomicKind::Int);
                    self.decls.get_mut(parameter).ty = Some(int);
                }
            }
            self.semantic_parameter(parameter);
            parameter_types.push(self.decls.get(parameter).ty.unwrap());
        }

        let rebuilt = self.types.intern(Type::new(TypeKind::Function(
            FunctionType {
                return_type: function.return_type,
                parameters: parameter_types,
                variadic: function.variadic,
                unspecified_parameters: false,
                kr_style: false,
            },
        )));
        self.decls.get_mut(declaration).ty = Some(rebuilt);
    }
}
