//! The Pratt expression parser and its semantic rules.
//!
//! Every token that can continue an expression has an infix precedence;
//! `parse_sub_expression` loops while the next token's precedence is at
//! least the requested one.  Left-associative operators parse their
//! right side one level tighter, the right-associative ones (`?:` and
//! the assignment family) at their own level.
//!
//! Each production attaches its computed type as it builds the node:
//! the usual arithmetic conversions, integer promotion, pointer
//! assignability and the lvalue rules live here.  Implicit conversions
//! materialize as cast nodes wrapped around the operands, so the
//! consumer of the AST never re-derives them.

use super::Parser;
use crate::ast::{
    BinaryOp, ConstValue, DeclId, Designator, Expr, ExprKind, StmtKind, StorageClass, UnaryOp,
};
use crate::fold;
use crate::token::TokenKind;
use crate::types::{AtomicKind, FunctionType, Qualifiers, Type, TypeKind, TypeRef};
use clef_base::{Loc, Symbol};

pub(crate) const PREC_COMMA: u32 = 1;
pub(crate) const PREC_ASSIGN: u32 = 2;
pub(crate) const PREC_CONDITIONAL: u32 = 7;
const PREC_LOGICAL_OR: u32 = 8;
const PREC_LOGICAL_AND: u32 = 9;
const PREC_BIT_OR: u32 = 10;
const PREC_BIT_XOR: u32 = 11;
const PREC_BIT_AND: u32 = 12;
const PREC_EQUALITY: u32 = 13;
const PREC_RELATIONAL: u32 = 14;
const PREC_ADDITIVE: u32 = 15;
const PREC_MULTIPLICATIVE: u32 = 16;
const PREC_CAST: u32 = 20;
const PREC_UNARY: u32 = 25;
const PREC_POSTFIX: u32 = 30;

/// Infix precedence and associativity per token; `None` if the token
/// cannot continue an expression.
fn infix_info(kind: &TokenKind) -> Option<(u32, bool)> {
    use TokenKind::*;
    let entry = match kind {
        LBracket | LParen | Dot | Arrow | PlusPlus | MinusMinus => (PREC_POSTFIX, true),
        Star | Slash | Percent => (PREC_MULTIPLICATIVE, true),
        LessLess | GreaterGreater => (PREC_MULTIPLICATIVE, true),
        Plus | Minus => (PREC_ADDITIVE, true),
        Less | Greater | LessEqual | GreaterEqual => (PREC_RELATIONAL, true),
        EqualEqual | ExclaimEqual => (PREC_EQUALITY, true),
        Amp => (PREC_BIT_AND, true),
        Caret => (PREC_BIT_XOR, true),
        Pipe => (PREC_BIT_OR, true),
        AmpAmp => (PREC_LOGICAL_AND, true),
        PipePipe => (PREC_LOGICAL_OR, true),
        Question => (PREC_CONDITIONAL, false),
        Assign | PlusAssign | MinusAssign | StarAssign | SlashAssign | PercentAssign
        | LessLessAssign | GreaterGreaterAssign | AmpAssign | PipeAssign | CaretAssign => {
            (PREC_ASSIGN, false)
        }
        Comma => (PREC_COMMA, true),
        _ => return None,
    };
    Some(entry)
}

fn binary_op_for(kind: &TokenKind) -> BinaryOp {
    use TokenKind::*;
    match kind {
        Star => BinaryOp::Mul,
        Slash => BinaryOp::Div,
        Percent => BinaryOp::Mod,
        LessLess => BinaryOp::ShiftLeft,
        GreaterGreater => BinaryOp::ShiftRight,
        Plus => BinaryOp::Add,
        Minus => BinaryOp::Sub,
        Less => BinaryOp::Less,
        Greater => BinaryOp::Greater,
        LessEqual => BinaryOp::LessEqual,
        GreaterEqual => BinaryOp::GreaterEqual,
        EqualEqual => BinaryOp::Equal,
        ExclaimEqual => BinaryOp::NotEqual,
        Amp => BinaryOp::BitAnd,
        Caret => BinaryOp::BitXor,
        Pipe => BinaryOp::BitOr,
        AmpAmp => BinaryOp::LogicalAnd,
        PipePipe => BinaryOp::LogicalOr,
        Assign => BinaryOp::Assign,
        PlusAssign => BinaryOp::AddAssign,
        MinusAssign => BinaryOp::SubAssign,
        StarAssign => BinaryOp::MulAssign,
        SlashAssign => BinaryOp::DivAssign,
        PercentAssign => BinaryOp::ModAssign,
        LessLessAssign => BinaryOp::ShiftLeftAssign,
        GreaterGreaterAssign => BinaryOp::ShiftRightAssign,
        AmpAssign => BinaryOp::BitAndAssign,
        PipeAssign => BinaryOp::BitOrAssign,
        CaretAssign => BinaryOp::BitXorAssign,
        Comma => BinaryOp::Comma,
        _ => panic!("token is not a binary operator"),
    }
}

impl<'a, 'e> Parser<'a, 'e> {
    // ========================================================================
    // Entry points
    // ========================================================================

    pub(crate) fn parse_expression(&mut self) -> &'a Expr<'a> {
        self.parse_sub_expression(PREC_COMMA)
    }

    pub(crate) fn parse_assignment_expression(&mut self) -> &'a Expr<'a> {
        self.parse_sub_expression(PREC_ASSIGN)
    }

    /// Parses at conditional-expression precedence and folds; a
    /// non-constant expression is diagnosed here.
    pub(crate) fn parse_constant_expression(&mut self) -> (&'a Expr<'a>, Option<i64>) {
        let expression = self.parse_sub_expression(PREC_CONDITIONAL);
        let value = fold::fold(expression, &self.decls, self.types);
        if value.is_none() {
            self.diags
                .error(expression.loc, "expression is not constant");
        }
        (expression, value)
    }

    pub(crate) fn parse_sub_expression(&mut self, precedence: u32) -> &'a Expr<'a> {
        let start = self.here();
        let mut left = self.parse_prefix_expression(start);
        loop {
            let Some((infix_precedence, left_assoc)) = infix_info(&self.token.kind) else {
                break;
            };
            if infix_precedence < precedence {
                break;
            }
            left = self.parse_infix_expression(infix_precedence, left_assoc, left, start);
        }
        left
    }

    pub(crate) fn create_error_expression(&mut self, loc: Loc) -> &'a Expr<'a> {
        let error = self.types.error_type();
        self.ctx.expr(ExprKind::Error, error, loc)
    }

    // ========================================================================
    // Prefix operators and primaries
    // ========================================================================

    fn parse_prefix_expression(&mut self, start: Loc) -> &'a Expr<'a> {
        match self.token.kind {
            TokenKind::Minus => self.parse_unary_expression(UnaryOp::Negate, start),
            TokenKind::Plus => self.parse_unary_expression(UnaryOp::Plus, start),
            TokenKind::Exclaim => self.parse_unary_expression(UnaryOp::Not, start),
            TokenKind::Tilde => self.parse_unary_expression(UnaryOp::BitNot, start),
            TokenKind::Star => self.parse_unary_expression(UnaryOp::Dereference, start),
            TokenKind::Amp => self.parse_unary_expression(UnaryOp::TakeAddress, start),
            TokenKind::PlusPlus => {
                self.parse_unary_expression(UnaryOp::PrefixIncrement, start)
            }
            TokenKind::MinusMinus => {
                self.parse_unary_expression(UnaryOp::PrefixDecrement, start)
            }
            TokenKind::Sizeof => self.parse_typeprop(false, start),
            TokenKind::Alignof => self.parse_typeprop(true, start),
            TokenKind::Extension => {
                while self.token.kind == TokenKind::Extension {
                    self.next_token();
                }
                self.parse_sub_expression(PREC_UNARY)
            }
            TokenKind::BuiltinClassifyType => self.parse_builtin_classify_type(start),
            _ => self.parse_primary_expression(start),
        }
    }

    fn parse_unary_expression(&mut self, op: UnaryOp, start: Loc) -> &'a Expr<'a> {
        self.next_token();
        let value = self.parse_sub_expression(PREC_UNARY);
        let ty = match op {
            UnaryOp::Negate | UnaryOp::Plus => self.semantic_unexpr_arithmetic(value),
            UnaryOp::Not => self.semantic_unexpr_scalar(value),
            UnaryOp::BitNot => self.semantic_unexpr_integer(value),
            UnaryOp::Dereference => self.semantic_dereference(value),
            UnaryOp::TakeAddress => self.semantic_take_addr(value, start),
            UnaryOp::PrefixIncrement | UnaryOp::PrefixDecrement => self.semantic_incdec(value),
            _ => panic!("not a prefix operator"),
        };
        self.ctx.expr(ExprKind::Unary { op, value }, ty, start)
    }

    fn parse_primary_expression(&mut self, start: Loc) -> &'a Expr<'a> {
        match &self.token.kind {
            TokenKind::Integer { value, ty } => {
                let (value, kind) = (*value, *ty);
                self.next_token();
                let ty = self.types.atomic(kind);
                self.ctx
                    .expr(ExprKind::Const(ConstValue::Int(value)), ty, start)
            }
            TokenKind::Float { value, ty } => {
                let (value, kind) = (*value, *ty);
                self.next_token();
                let ty = self.types.atomic(kind);
                self.ctx
                    .expr(ExprKind::Const(ConstValue::Float(value)), ty, start)
            }
            TokenKind::StringLiteral(bytes) => {
                let content = self.ctx.bytes(bytes);
                self.next_token();
                let ty = self.type_char_ptr;
                self.ctx
                    .expr(ExprKind::StringLiteral(content), ty, start)
            }
            TokenKind::WideStringLiteral(chars) => {
                let content = self.ctx.slice(chars.clone());
                self.next_token();
                let ty = self.type_wchar_ptr;
                self.ctx
                    .expr(ExprKind::WideStringLiteral(content), ty, start)
            }
            TokenKind::Identifier(sym) => {
                let symbol = *sym;
                self.parse_reference(symbol, start)
            }
            TokenKind::Func => self.parse_function_keyword(false, start),
            TokenKind::PrettyFunc => self.parse_function_keyword(true, start),
            TokenKind::BuiltinOffsetof => self.parse_offsetof(start),
            TokenKind::BuiltinVaStart => self.parse_va_start(start),
            TokenKind::BuiltinVaArg => self.parse_va_arg(start),
            TokenKind::BuiltinExpect => self.parse_builtin_expect(start),
            TokenKind::BuiltinAlloca
            | TokenKind::BuiltinNan
            | TokenKind::BuiltinNanf
            | TokenKind::BuiltinNand
            | TokenKind::BuiltinVaEnd => self.parse_builtin_symbol(start),
            TokenKind::BuiltinIsGreater
            | TokenKind::BuiltinIsGreaterEqual
            | TokenKind::BuiltinIsLess
            | TokenKind::BuiltinIsLessEqual
            | TokenKind::BuiltinIsLessGreater
            | TokenKind::BuiltinIsUnordered => self.parse_compare_builtin(start),
            TokenKind::BuiltinConstantP => self.parse_builtin_constant(start),
            TokenKind::BuiltinPrefetch => self.parse_builtin_prefetch(start),
            TokenKind::LParen => self.parse_brace_expression(start),
            _ => {
                let got = self.token.kind.describe(self.interner);
                self.diags
                    .error(start, format!("expected expression, got {}", got));
                self.eat_statement();
                self.create_error_expression(start)
            }
        }
    }

    /// Identifier reference: name lookup plus the automatic array and
    /// function decay.  The decay is reversible; `sizeof`, `&` and
    /// member access undo it.
    fn parse_reference(&mut self, symbol: Symbol, start: Loc) -> &'a Expr<'a> {
        let declaration = self.get_declaration(symbol, crate::ast::Namespace::Ordinary);
        self.next_token();

        let declaration = match declaration {
            Some(decl) => decl,
            None => {
                if !self.strict && self.token.kind == TokenKind::LParen {
                    // an implicitly declared function
                    if self.warnings.implicit_function_declaration {
                        let name = self.name_of(symbol);
                        self.diags.warning(
                            start,
                            format!("implicit declaration of function '{}'", name),
                        );
                    }
                    self.create_implicit_function(symbol, start)
                } else {
                    let name = self.name_of(symbol);
                    self.diags
                        .error(start, format!("unknown symbol '{}' found", name));
                    let error = self.types.error_type();
                    return self.ctx.expr(
                        ExprKind::Reference {
                            symbol,
                            decl: None,
                        },
                        error,
                        start,
                    );
                }
            }
        };

        let declared = self
            .decls
            .get(declaration)
            .ty
            .unwrap_or_else(|| self.types.error_type());
        let converted = self.automatic_type_conversion(declared);
        self.decls.get_mut(declaration).used = true;

        self.ctx.expr(
            ExprKind::Reference {
                symbol,
                decl: Some(declaration),
            },
            converted,
            start,
        )
    }

    fn create_implicit_function(&mut self, symbol: Symbol, loc: Loc) -> DeclId {
        let int = self.types.atomic(AtomicKind::Int);
        let ty = self.types.intern(Type::new(TypeKind::Function(FunctionType {
            return_type: int,
            parameters: Vec::new(),
            variadic: false,
            unspecified_parameters: true,
            kr_style: false,
        })));

        let mut decl = crate::ast::Declaration::new(crate::ast::Namespace::Ordinary);
        decl.symbol = Some(symbol);
        decl.storage_class = StorageClass::Extern;
        decl.ty = Some(ty);
        decl.loc = Some(loc);
        let decl = self.decls.alloc(decl);

        self.decls.append_to_scope(self.global_scope, decl);
        self.environment_push(decl);
        decl
    }

    /// `( ... )` as a primary: a cast, a grouped expression, or a GNU
    /// statement expression, disambiguated by one token of lookahead.
    fn parse_brace_expression(&mut self, start: Loc) -> &'a Expr<'a> {
        self.eat(TokenKind::LParen);

        let starts_typename = self.is_declaration_specifier(&self.token, true)
            || matches!(
                self.token.kind,
                TokenKind::Const | TokenKind::Volatile | TokenKind::Restrict
            );

        if self.token.kind == TokenKind::LBrace {
            return self.parse_statement_expression(start);
        }
        if starts_typename {
            return self.parse_cast(start);
        }

        let result = self.parse_expression();
        let _ = self.expect_soft(TokenKind::RParen);
        result
    }

    fn parse_cast(&mut self, start: Loc) -> &'a Expr<'a> {
        let ty = self.parse_typename();
        let _ = self.expect_soft(TokenKind::RParen);
        let value = self.parse_sub_expression(PREC_CAST);
        self.ctx.expr(
            ExprKind::Unary {
                op: UnaryOp::Cast,
                value,
            },
            ty,
            start,
        )
    }

    /// GNU statement expression `({ ... })`; its type is the type of
    /// the final expression statement.
    fn parse_statement_expression(&mut self, start: Loc) -> &'a Expr<'a> {
        let statement = self.parse_compound_statement();

        let mut ty = self.types.atomic(AtomicKind::Void);
        if let StmtKind::Compound { statements, .. } = &statement.kind {
            match statements.last() {
                Some(last) => {
                    if let StmtKind::Expression(expression) = &last.kind {
                        ty = expression.ty();
                    }
                }
                None => {
                    self.diags
                        .warning(start, "empty statement expression ({})");
                }
            }
        }

        let _ = self.expect_soft(TokenKind::RParen);
        self.ctx
            .expr(ExprKind::StatementExpr { statement }, ty, start)
    }

    fn parse_function_keyword(&mut self, pretty: bool, start: Loc) -> &'a Expr<'a> {
        self.next_token();
        if self.current_function.is_none() {
            let keyword = if pretty {
                "__PRETTY_FUNCTION__"
            } else {
                "__func__"
            };
            self.diags
                .error(start, format!("'{}' used outside of a function", keyword));
        }
        let ty = self.type_char_ptr;
        self.ctx
            .expr(ExprKind::FunctionName { pretty }, ty, start)
    }

    /// `sizeof` and `_Alignof`/`__alignof__`: takes a parenthesized
    /// typename or an expression whose automatic decay is reverted.
    fn parse_typeprop(&mut self, is_alignof: bool, start: Loc) -> &'a Expr<'a> {
        self.next_token();
        let size_t = self.type_size_t;

        if self.token.kind == TokenKind::LParen
            && self.is_declaration_specifier(self.look_ahead(1), true)
        {
            self.next_token();
            let queried = self.parse_typename();
            let _ = self.expect_soft(TokenKind::RParen);
            return self.ctx.expr(
                ExprKind::TypeProp {
                    is_alignof,
                    queried,
                    operand: None,
                },
                size_t,
                start,
            );
        }

        let operand = self.parse_sub_expression(PREC_UNARY);
        let reverted = self.revert_automatic_type_conversion(operand);
        operand.set_ty(reverted);
        self.ctx.expr(
            ExprKind::TypeProp {
                is_alignof,
                queried: reverted,
                operand: Some(operand),
            },
            size_t,
            start,
        )
    }

    // ========================================================================
    // Infix operators
    // ========================================================================

    fn parse_infix_expression(
        &mut self,
        precedence: u32,
        left_assoc: bool,
        left: &'a Expr<'a>,
        start: Loc,
    ) -> &'a Expr<'a> {
        match self.token.kind {
            TokenKind::LBracket => self.parse_array_expression(left, start),
            TokenKind::LParen => self.parse_call_expression(left, start),
            TokenKind::Dot => self.parse_select_expression(left, false, start),
            TokenKind::Arrow => self.parse_select_expression(left, true, start),
            TokenKind::PlusPlus => {
                self.next_token();
                let ty = self.semantic_incdec(left);
                self.ctx.expr(
                    ExprKind::Unary {
                        op: UnaryOp::PostfixIncrement,
                        value: left,
                    },
                    ty,
                    start,
                )
            }
            TokenKind::MinusMinus => {
                self.next_token();
                let ty = self.semantic_incdec(left);
                self.ctx.expr(
                    ExprKind::Unary {
                        op: UnaryOp::PostfixDecrement,
                        value: left,
                    },
                    ty,
                    start,
                )
            }
            TokenKind::Question => self.parse_conditional_expression(left, start),
            _ => {
                let op = binary_op_for(&self.token.kind);
                self.next_token();
                let right = self.parse_sub_expression(precedence + left_assoc as u32);
                self.build_binary_expression(op, left, right, start)
            }
        }
    }

    fn build_binary_expression(
        &mut self,
        op: BinaryOp,
        left: &'a Expr<'a>,
        right: &'a Expr<'a>,
        start: Loc,
    ) -> &'a Expr<'a> {
        use BinaryOp::*;
        let (left, right, ty) = match op {
            Mul | Div | Mod | BitAnd | BitOr | BitXor => {
                self.semantic_binexpr_arithmetic(left, right)
            }
            ShiftLeft | ShiftRight => self.semantic_shift_op(left, right),
            Add => self.semantic_add(left, right),
            Sub => self.semantic_sub(left, right),
            Less | Greater | LessEqual | GreaterEqual | Equal | NotEqual => {
                self.semantic_comparison(op, left, right, start)
            }
            LogicalAnd | LogicalOr => self.semantic_logical_op(left, right),
            Assign => self.semantic_binexpr_assign(left, right, start),
            AddAssign | SubAssign => self.semantic_arithmetic_addsub_assign(left, right),
            MulAssign | DivAssign | ModAssign | ShiftLeftAssign | ShiftRightAssign
            | BitAndAssign | BitOrAssign | BitXorAssign => {
                self.semantic_arithmetic_assign(left, right)
            }
            Comma => self.semantic_comma(left, right),
            _ => panic!("not an infix binary operator"),
        };
        self.ctx
            .expr(ExprKind::Binary { op, left, right }, ty, start)
    }

    /// `expr [ index ]`: one side must be a pointer after decay, the
    /// other an integer; the operands may appear in either order.
    fn parse_array_expression(&mut self, left: &'a Expr<'a>, start: Loc) -> &'a Expr<'a> {
        self.eat(TokenKind::LBracket);
        let inside = self.parse_expression();

        let type_left = self.types.skip_typeref(left.ty());
        let type_inside = self.types.skip_typeref(inside.ty());

        let pointee_left = self.types.pointee(type_left);
        let pointee_inside = self.types.pointee(type_inside);
        let (array, index, pointee) = if let Some(p) = pointee_left {
            self.check_for_char_index_type(inside);
            (left, inside, p)
        } else if let Some(p) = pointee_inside {
            self.check_for_char_index_type(left);
            (inside, left, p)
        } else {
            if self.types.is_valid(type_left) && self.types.is_valid(type_inside) {
                let shown_left = self.display_type(left.ty());
                let shown_inside = self.display_type(inside.ty());
                self.diags.error(
                    start,
                    format!(
                        "array access on object with non-pointer types '{}', '{}'",
                        shown_left, shown_inside
                    ),
                );
            }
            let error = self.types.error_type();
            (left, inside, error)
        };

        let _ = self.expect_soft(TokenKind::RBracket);

        let result = self.automatic_type_conversion(pointee);
        self.ctx
            .expr(ExprKind::ArrayAccess { array, index }, result, start)
    }

    fn check_for_char_index_type(&mut self, expression: &Expr<'a>) {
        if !self.warnings.char_subscripts {
            return;
        }
        let ty = self.types.skip_alias(expression.ty());
        if self.types.is_atomic(ty, AtomicKind::Char) {
            let shown = self.display_type(expression.ty());
            self.diags.warning(
                expression.loc,
                format!("array subscript has type '{}'", shown),
            );
        }
    }

    /// `s.m` and `p->m`.  Resolves the member in the tag's scope and
    /// applies the automatic decay to the member type; access to a
    /// bitfield member is wrapped in an extract node.
    fn parse_select_expression(
        &mut self,
        compound: &'a Expr<'a>,
        via_pointer: bool,
        start: Loc,
    ) -> &'a Expr<'a> {
        self.next_token();

        let TokenKind::Identifier(symbol) = self.token.kind else {
            self.parse_error_expected(Some("select"), "identifier");
            return self.create_error_expression(start);
        };
        self.next_token();

        let orig_type = compound.ty();
        let ty = self.types.skip_typeref(orig_type);

        let type_left = if via_pointer {
            match self.types.pointee(ty) {
                Some(points_to) => self.types.skip_typeref(points_to),
                None => {
                    if self.types.is_valid(ty) {
                        let shown = self.display_type(orig_type);
                        self.diags.error(
                            start,
                            format!("left hand side of '->' is not a pointer, but '{}'", shown),
                        );
                    }
                    return self.create_error_expression(start);
                }
            }
        } else {
            ty
        };

        let tag = match self.types.compound_tag(type_left) {
            Some(decl) => decl,
            None => {
                if self.types.is_valid(type_left) {
                    let name = self.name_of(symbol);
                    let shown = self.display_type(orig_type);
                    self.diags.error(
                        start,
                        format!(
                            "request for member '{}' in something not a struct or union, but '{}'",
                            name, shown
                        ),
                    );
                }
                return self.create_error_expression(start);
            }
        };

        if !self.decls.get(tag).is_defined() {
            let name = self.name_of(symbol);
            let shown = self.display_type(orig_type);
            self.diags.error(
                start,
                format!("request for member '{}' of incomplete type '{}'", name, shown),
            );
            return self.create_error_expression(start);
        }

        let entry = self
            .decls
            .members_of(tag)
            .find(|member| self.decls.get(*member).symbol == Some(symbol));
        let Some(entry) = entry else {
            let name = self.name_of(symbol);
            let shown = self.display_type(orig_type);
            self.diags.error(
                start,
                format!("'{}' has no member named '{}'", shown, name),
            );
            return self.create_error_expression(start);
        };

        let member_type = self
            .decls
            .get(entry)
            .ty
            .unwrap_or_else(|| self.types.error_type());
        let converted = self.automatic_type_conversion(member_type);

        let select = self.ctx.expr(
            ExprKind::Select {
                compound,
                symbol,
                entry: Some(entry),
                via_pointer,
            },
            converted,
            start,
        );

        if let TypeKind::Bitfield { base, .. } = *self.types.kind(self.types.skip_alias(converted))
        {
            return self.ctx.expr(
                ExprKind::Unary {
                    op: UnaryOp::BitfieldExtract,
                    value: select,
                },
                base,
                start,
            );
        }

        select
    }

    /// A call: the callee must be a function or pointer-to-function
    /// after decay; arguments are assignability-checked against the
    /// parameters, extra variadic arguments get the default argument
    /// promotions, and printf-family callees get their format string
    /// checked.
    fn parse_call_expression(&mut self, function: &'a Expr<'a>, start: Loc) -> &'a Expr<'a> {
        let orig_type = function.ty();
        let ty = self.types.skip_typeref(orig_type);

        let mut function_type: Option<FunctionType> = None;
        if let Some(points_to) = self.types.pointee(ty) {
            let to_type = self.types.skip_typeref(points_to);
            function_type = self.types.function_info(to_type);
        }
        if function_type.is_none() && self.types.is_valid(ty) {
            let shown = self.display_type(orig_type);
            self.diags.error(
                start,
                format!(
                    "called object (type '{}') is not a pointer to a function",
                    shown
                ),
            );
        }

        self.eat(TokenKind::LParen);
        let mut arguments: Vec<&'a Expr<'a>> = Vec::new();
        if self.token.kind != TokenKind::RParen {
            loop {
                arguments.push(self.parse_assignment_expression());
                if self.token.kind != TokenKind::Comma {
                    break;
                }
                self.next_token();
            }
        }
        let _ = self.expect_soft(TokenKind::RParen);

        let mut return_type = self.types.error_type();
        if let Some(f) = &function_type {
            return_type = f.return_type;

            let checked = f.parameters.len().min(arguments.len());
            for i in 0..checked {
                let expected = f.parameters[i];
                let argument = arguments[i];
                match self.semantic_assign(expected, argument, "function call") {
                    Some(res_type) => {
                        arguments[i] = self.create_implicit_cast(argument, res_type);
                    }
                    None => {
                        let shown_arg = self.display_type(argument.ty());
                        let shown_param = self.display_type(expected);
                        self.diags.error(
                            argument.loc,
                            format!(
                                "cannot call function with argument of type '{}' where type '{}' is expected",
                                shown_arg, shown_param
                            ),
                        );
                    }
                }
            }

            let mut arity_error = false;
            if arguments.len() < f.parameters.len() {
                self.diags.error(start, "too few arguments to function");
                arity_error = true;
            } else if arguments.len() > f.parameters.len() {
                if !f.variadic && !f.unspecified_parameters {
                    self.diags.error(start, "too many arguments to function");
                    arity_error = true;
                } else {
                    // default argument promotion for the extra arguments
                    for i in f.parameters.len()..arguments.len() {
                        let argument = arguments[i];
                        let ty = self.types.skip_typeref(argument.ty());
                        let float = self.types.atomic(AtomicKind::Float);
                        let promoted = if self.types.is_integer(ty) {
                            self.types.promote_integer(ty)
                        } else if self.types.unqualified(ty) == float {
                            self.types.atomic(AtomicKind::Double)
                        } else {
                            ty
                        };
                        arguments[i] = self.create_implicit_cast(argument, promoted);
                    }
                }
            }

            if !arity_error && self.warnings.format {
                crate::format_check::check_format(
                    function,
                    &arguments,
                    self.types,
                    self.interner,
                    self.diags,
                );
            }
        }

        let arguments = self.ctx.slice(arguments);
        self.ctx.expr(
            ExprKind::Call {
                function,
                arguments,
            },
            return_type,
            start,
        )
    }

    /// `cond ? a : b` per §6.5.15: arithmetic operands take the usual
    /// arithmetic conversions, matching compounds or two voids keep
    /// their type, compatible pointers keep the left pointer type.
    fn parse_conditional_expression(
        &mut self,
        condition: &'a Expr<'a>,
        start: Loc,
    ) -> &'a Expr<'a> {
        self.eat(TokenKind::Question);

        let condition_type = self.types.skip_typeref(condition.ty());
        if !self.types.is_scalar(condition_type) && self.types.is_valid(condition_type) {
            let shown = self.display_type(condition.ty());
            self.diags.error(
                condition.loc,
                format!(
                    "expected a scalar type in conditional condition, but found type '{}'",
                    shown
                ),
            );
        }

        let mut true_expr = self.parse_expression();
        let _ = self.expect_soft(TokenKind::Colon);
        let mut false_expr = self.parse_sub_expression(PREC_CONDITIONAL);

        let true_type = self.types.skip_typeref(true_expr.ty());
        let false_type = self.types.skip_typeref(false_expr.ty());

        let result_type = if self.types.is_arithmetic(true_type)
            && self.types.is_arithmetic(false_type)
        {
            let result = self.types.usual_arithmetic(true_type, false_type);
            true_expr = self.create_implicit_cast(true_expr, result);
            false_expr = self.create_implicit_cast(false_expr, result);
            result
        } else if self.same_compound_type(true_type, false_type)
            || (self.types.is_atomic(true_type, AtomicKind::Void)
                && self.types.is_atomic(false_type, AtomicKind::Void))
        {
            true_type
        } else if self.types.is_pointer(true_type)
            && self.types.is_pointer(false_type)
            && self.types.pointers_compatible(true_type, false_type)
        {
            true_type
        } else {
            if self.types.is_valid(true_type) && self.types.is_valid(false_type) {
                let shown_true = self.display_type(true_expr.ty());
                let shown_false = self.display_type(false_expr.ty());
                self.diags.error(
                    start,
                    format!(
                        "incompatible types in conditional expression: '{}' - '{}'",
                        shown_true, shown_false
                    ),
                );
            }
            self.types.error_type()
        };

        self.ctx.expr(
            ExprKind::Conditional {
                condition,
                true_expr,
                false_expr,
            },
            result_type,
            start,
        )
    }

    fn same_compound_type(&self, a: TypeRef, b: TypeRef) -> bool {
        match (self.types.kind(a), self.types.kind(b)) {
            (TypeKind::Struct(x), TypeKind::Struct(y)) => x == y,
            (TypeKind::Union(x), TypeKind::Union(y)) => x == y,
            _ => false,
        }
    }

    // ========================================================================
    // Builtins
    // ========================================================================

    fn parse_builtin_classify_type(&mut self, start: Loc) -> &'a Expr<'a> {
        self.eat(TokenKind::BuiltinClassifyType);
        let int = self.types.atomic(AtomicKind::Int);
        if !self.expect_soft(TokenKind::LParen) {
            return self.create_error_expression(start);
        }
        let value = self.parse_expression();
        let _ = self.expect_soft(TokenKind::RParen);
        self.ctx.expr(ExprKind::ClassifyType { value }, int, start)
    }

    fn parse_offsetof(&mut self, start: Loc) -> &'a Expr<'a> {
        self.eat(TokenKind::BuiltinOffsetof);
        let size_t = self.type_size_t;

        if !self.expect_soft(TokenKind::LParen) {
            return self.create_error_expression(start);
        }
        let queried = self.parse_typename();
        let _ = self.expect_soft(TokenKind::Comma);
        let designators = self.parse_designator();
        let _ = self.expect_soft(TokenKind::RParen);

        let designators = self.ctx.slice(designators);
        self.ctx.expr(
            ExprKind::OffsetOf {
                queried,
                designators,
            },
            size_t,
            start,
        )
    }

    fn parse_designator(&mut self) -> Vec<Designator<'a>> {
        let mut result = Vec::new();

        let TokenKind::Identifier(symbol) = self.token.kind else {
            self.parse_error_expected(Some("member designator"), "identifier");
            self.eat_paren();
            return result;
        };
        result.push(Designator {
            symbol: Some(symbol),
            index: None,
        });
        self.next_token();

        loop {
            match self.token.kind {
                TokenKind::Dot => {
                    self.next_token();
                    let TokenKind::Identifier(symbol) = self.token.kind else {
                        self.parse_error_expected(Some("member designator"), "identifier");
                        self.eat_paren();
                        return result;
                    };
                    result.push(Designator {
                        symbol: Some(symbol),
                        index: None,
                    });
                    self.next_token();
                }
                TokenKind::LBracket => {
                    self.next_token();
                    let index = self.parse_expression();
                    result.push(Designator {
                        symbol: None,
                        index: Some(index),
                    });
                    let _ = self.expect_soft(TokenKind::RBracket);
                }
                _ => break,
            }
        }
        result
    }

    fn parse_va_start(&mut self, start: Loc) -> &'a Expr<'a> {
        self.eat(TokenKind::BuiltinVaStart);
        let void = self.types.atomic(AtomicKind::Void);

        if !self.expect_soft(TokenKind::LParen) {
            return self.create_error_expression(start);
        }
        let ap = self.parse_assignment_expression();
        let _ = self.expect_soft(TokenKind::Comma);
        let parameter_expr = self.parse_assignment_expression();

        if let ExprKind::Reference {
            decl: Some(decl), ..
        } = &parameter_expr.kind
        {
            let function_scope = self
                .current_function
                .and_then(|f| self.decls.get(f).own_scope);
            if let Some(scope) = function_scope {
                let is_last = self.decls.scope(scope).declarations.last() == Some(decl);
                if self.decls.get(*decl).parent_scope == Some(scope) && is_last {
                    let _ = self.expect_soft(TokenKind::RParen);
                    return self.ctx.expr(
                        ExprKind::VaStart {
                            ap,
                            parameter: *decl,
                        },
                        void,
                        start,
                    );
                }
            }
        }
        self.diags.error(
            parameter_expr.loc,
            "second argument of 'va_start' must be last parameter of the current function",
        );
        let _ = self.expect_soft(TokenKind::RParen);
        self.create_error_expression(start)
    }

    fn parse_va_arg(&mut self, start: Loc) -> &'a Expr<'a> {
        self.eat(TokenKind::BuiltinVaArg);
        if !self.expect_soft(TokenKind::LParen) {
            return self.create_error_expression(start);
        }
        let ap = self.parse_assignment_expression();
        let _ = self.expect_soft(TokenKind::Comma);
        let ty = self.parse_typename();
        let _ = self.expect_soft(TokenKind::RParen);
        self.ctx.expr(ExprKind::VaArg { ap }, ty, start)
    }

    fn builtin_symbol_type(&mut self, kind: &TokenKind) -> TypeRef {
        let void = self.types.atomic(AtomicKind::Void);
        let double = self.types.atomic(AtomicKind::Double);
        let float = self.types.atomic(AtomicKind::Float);
        let long_double = self.types.atomic(AtomicKind::LongDouble);
        let void_ptr = self.types.pointer_to(void, Qualifiers::NONE);
        let char_ptr = self.type_char_ptr;
        let size_t = self.type_size_t;
        let valist = self.type_valist;

        let (return_type, argument) = match kind {
            TokenKind::BuiltinAlloca => (void_ptr, size_t),
            TokenKind::BuiltinNan => (double, char_ptr),
            TokenKind::BuiltinNanf => (float, char_ptr),
            TokenKind::BuiltinNand => (long_double, char_ptr),
            TokenKind::BuiltinVaEnd => (void, valist),
            _ => panic!("not a function-typed builtin"),
        };
        self.types.intern(Type::new(TypeKind::Function(FunctionType {
            return_type,
            parameters: vec![argument],
            variadic: false,
            unspecified_parameters: false,
            kr_style: false,
        })))
    }

    fn parse_builtin_symbol(&mut self, start: Loc) -> &'a Expr<'a> {
        let kind = self.token.kind.clone();
        let spelling = kind.spelling().expect("builtin keyword");
        let symbol = self.interner.intern(spelling);
        self.next_token();

        let ty = self.builtin_symbol_type(&kind);
        let converted = self.automatic_type_conversion(ty);
        self.ctx
            .expr(ExprKind::BuiltinSymbol { symbol }, converted, start)
    }

    fn parse_builtin_constant(&mut self, start: Loc) -> &'a Expr<'a> {
        self.eat(TokenKind::BuiltinConstantP);
        let int = self.types.atomic(AtomicKind::Int);
        if !self.expect_soft(TokenKind::LParen) {
            return self.create_error_expression(start);
        }
        let value = self.parse_assignment_expression();
        let _ = self.expect_soft(TokenKind::RParen);
        self.ctx
            .expr(ExprKind::BuiltinConstantP { value }, int, start)
    }

    fn parse_builtin_prefetch(&mut self, start: Loc) -> &'a Expr<'a> {
        self.eat(TokenKind::BuiltinPrefetch);
        let void = self.types.atomic(AtomicKind::Void);
        if !self.expect_soft(TokenKind::LParen) {
            return self.create_error_expression(start);
        }
        let address = self.parse_assignment_expression();
        let mut rw = None;
        let mut locality = None;
        if self.token.kind == TokenKind::Comma {
            self.next_token();
            rw = Some(self.parse_assignment_expression());
        }
        if self.token.kind == TokenKind::Comma {
            self.next_token();
            locality = Some(self.parse_assignment_expression());
        }
        let _ = self.expect_soft(TokenKind::RParen);
        self.ctx.expr(
            ExprKind::BuiltinPrefetch {
                address,
                rw,
                locality,
            },
            void,
            start,
        )
    }

    fn parse_compare_builtin(&mut self, start: Loc) -> &'a Expr<'a> {
        let op = match self.token.kind {
            TokenKind::BuiltinIsGreater => BinaryOp::IsGreater,
            TokenKind::BuiltinIsGreaterEqual => BinaryOp::IsGreaterEqual,
            TokenKind::BuiltinIsLess => BinaryOp::IsLess,
            TokenKind::BuiltinIsLessEqual => BinaryOp::IsLessEqual,
            TokenKind::BuiltinIsLessGreater => BinaryOp::IsLessGreater,
            TokenKind::BuiltinIsUnordered => BinaryOp::IsUnordered,
            _ => panic!("not a compare builtin"),
        };
        self.next_token();

        if !self.expect_soft(TokenKind::LParen) {
            return self.create_error_expression(start);
        }
        let left = self.parse_assignment_expression();
        let _ = self.expect_soft(TokenKind::Comma);
        let right = self.parse_assignment_expression();
        let _ = self.expect_soft(TokenKind::RParen);

        let type_left = self.types.skip_typeref(left.ty());
        let type_right = self.types.skip_typeref(right.ty());
        let int = self.types.atomic(AtomicKind::Int);

        if !self.types.is_float(type_left) && !self.types.is_float(type_right) {
            if self.types.is_valid(type_left) && self.types.is_valid(type_right) {
                let shown_left = self.display_type(left.ty());
                let shown_right = self.display_type(right.ty());
                self.diags.error(
                    start,
                    format!(
                        "invalid operands in comparison: '{}' - '{}'",
                        shown_left, shown_right
                    ),
                );
            }
            return self
                .ctx
                .expr(ExprKind::Binary { op, left, right }, int, start);
        }

        let (left, right, _) = self.semantic_comparison(BinaryOp::Less, left, right, start);
        self.ctx
            .expr(ExprKind::Binary { op, left, right }, int, start)
    }

    fn parse_builtin_expect(&mut self, start: Loc) -> &'a Expr<'a> {
        self.eat(TokenKind::BuiltinExpect);
        if !self.expect_soft(TokenKind::LParen) {
            return self.create_error_expression(start);
        }
        let left = self.parse_assignment_expression();
        let _ = self.expect_soft(TokenKind::Comma);
        let (right, _) = self.parse_constant_expression();
        let _ = self.expect_soft(TokenKind::RParen);
        let ty = left.ty();
        self.ctx.expr(
            ExprKind::Binary {
                op: BinaryOp::Expect,
                left,
                right,
            },
            ty,
            start,
        )
    }

    // ========================================================================
    // Conversions
    // ========================================================================

    /// §6.3.2.1 automatic conversion: arrays decay to pointers to
    /// their first element, function designators to function pointers.
    pub(crate) fn automatic_type_conversion(&mut self, orig_type: TypeRef) -> TypeRef {
        let ty = self.types.skip_typeref(orig_type);
        if let Some(element) = self.types.array_element(ty) {
            let qualifiers = self.types.qualifiers(ty);
            return self.types.pointer_to(element, qualifiers);
        }
        if self.types.is_function(ty) {
            return self.types.pointer_to(orig_type, Qualifiers::NONE);
        }
        orig_type
    }

    /// Undoes the automatic decay for the operand positions that need
    /// the original type: `sizeof`, `&` and member access.
    pub(crate) fn revert_automatic_type_conversion(&mut self, expression: &Expr<'a>) -> TypeRef {
        match &expression.kind {
            ExprKind::Reference {
                decl: Some(decl), ..
            } => self
                .decls
                .get(*decl)
                .ty
                .unwrap_or_else(|| self.types.error_type()),
            ExprKind::Select {
                entry: Some(entry), ..
            } => self
                .decls
                .get(*entry)
                .ty
                .unwrap_or_else(|| self.types.error_type()),
            ExprKind::Unary {
                op: UnaryOp::Dereference,
                value,
            } => {
                let ty = self.types.skip_typeref(value.ty());
                match *self.types.kind(ty) {
                    TypeKind::Pointer(points_to) => points_to,
                    _ => expression.ty(),
                }
            }
            ExprKind::ArrayAccess { array, .. } => {
                let ty = self.types.skip_typeref(array.ty());
                match *self.types.kind(ty) {
                    TypeKind::Pointer(points_to) => points_to,
                    _ => expression.ty(),
                }
            }
            ExprKind::BuiltinSymbol { .. } => {
                let ty = self.types.skip_typeref(expression.ty());
                match *self.types.kind(ty) {
                    TypeKind::Pointer(points_to) => points_to,
                    _ => expression.ty(),
                }
            }
            _ => expression.ty(),
        }
    }

    pub(crate) fn create_implicit_cast(
        &mut self,
        expression: &'a Expr<'a>,
        dest_type: TypeRef,
    ) -> &'a Expr<'a> {
        if expression.ty() == dest_type {
            return expression;
        }
        self.ctx.expr(
            ExprKind::Unary {
                op: UnaryOp::ImplicitCast,
                value: expression,
            },
            dest_type,
            expression.loc,
        )
    }

    /// The assignability rules of §6.5.16.1, shared by assignment,
    /// initialization, argument passing and `return`.  `None` means
    /// incompatible; the caller reports with its own context.
    pub(crate) fn semantic_assign(
        &mut self,
        orig_type_left: TypeRef,
        right: &Expr<'a>,
        context: &str,
    ) -> Option<TypeRef> {
        let orig_type_right = right.ty();
        let type_left = self.types.skip_typeref(orig_type_left);
        let type_right = self.types.skip_typeref(orig_type_right);

        if (self.types.is_arithmetic(type_left) && self.types.is_arithmetic(type_right))
            || (self.types.is_pointer(type_left)
                && fold::is_null_pointer_constant(right, self.types))
            || (self.types.is_atomic(type_left, AtomicKind::Bool)
                && self.types.is_pointer(type_right))
        {
            return Some(orig_type_left);
        }

        if self.types.is_pointer(type_left) && self.types.is_pointer(type_right) {
            let points_to_left = self.types.pointee(type_left).expect("pointer type");
            let points_to_left = self.types.skip_typeref(points_to_left);
            let points_to_right = self.types.pointee(type_right).expect("pointer type");
            let points_to_right = self.types.skip_typeref(points_to_right);

            // the destination must carry every qualifier of the source
            let left_quals = self.types.qualifiers(points_to_left);
            let right_quals = self.types.qualifiers(points_to_right);
            if !left_quals.contains(right_quals) {
                let shown_left = self.display_type(type_left);
                let shown_right = self.display_type(type_right);
                self.diags.error(
                    right.loc,
                    format!(
                        "destination type '{}' in {} from type '{}' lacks qualifiers in pointed-to type",
                        shown_left, context, shown_right
                    ),
                );
                return Some(orig_type_left);
            }

            let unqual_left = self.types.unqualified(points_to_left);
            let unqual_right = self.types.unqualified(points_to_right);

            if !self.types.is_atomic(unqual_left, AtomicKind::Void)
                && !self.types.is_atomic(unqual_right, AtomicKind::Void)
                && !self.types.compatible(unqual_left, unqual_right)
            {
                return None;
            }
            return Some(orig_type_left);
        }

        if self.types.is_compound(type_left) && self.types.is_compound(type_right) {
            let unqual_left = self.types.unqualified(type_left);
            let unqual_right = self.types.unqualified(type_right);
            if self.types.compatible(unqual_left, unqual_right) {
                return Some(orig_type_left);
            }
        }

        if !self.types.is_valid(type_left) {
            return Some(type_left);
        }
        if !self.types.is_valid(type_right) {
            return Some(orig_type_right);
        }
        None
    }

    // ========================================================================
    // Unary semantics
    // ========================================================================

    fn semantic_incdec(&mut self, value: &Expr<'a>) -> TypeRef {
        let orig_type = value.ty();
        let ty = self.types.skip_typeref(orig_type);
        if !self.types.is_arithmetic(ty) && !self.types.is_pointer(ty) {
            if self.types.is_valid(ty) {
                let loc = self.here();
                self.diags
                    .error(loc, "operation needs an arithmetic or pointer type");
            }
            return self.types.error_type();
        }
        orig_type
    }

    fn semantic_unexpr_arithmetic(&mut self, value: &Expr<'a>) -> TypeRef {
        let orig_type = value.ty();
        let ty = self.types.skip_typeref(orig_type);
        if !self.types.is_arithmetic(ty) {
            if self.types.is_valid(ty) {
                let loc = self.here();
                self.diags.error(loc, "operation needs an arithmetic type");
            }
            return self.types.error_type();
        }
        orig_type
    }

    fn semantic_unexpr_scalar(&mut self, value: &Expr<'a>) -> TypeRef {
        let orig_type = value.ty();
        let ty = self.types.skip_typeref(orig_type);
        if !self.types.is_scalar(ty) {
            if self.types.is_valid(ty) {
                let loc = self.here();
                self.diags.error(loc, "operand of ! must be of scalar type");
            }
            return self.types.error_type();
        }
        orig_type
    }

    fn semantic_unexpr_integer(&mut self, value: &Expr<'a>) -> TypeRef {
        let orig_type = value.ty();
        let ty = self.types.skip_typeref(orig_type);
        if !self.types.is_integer(ty) {
            if self.types.is_valid(ty) {
                let loc = self.here();
                self.diags
                    .error(loc, "operand of ~ must be of integer type");
            }
            return self.types.error_type();
        }
        orig_type
    }

    fn semantic_dereference(&mut self, value: &Expr<'a>) -> TypeRef {
        let orig_type = value.ty();
        let ty = self.types.skip_typeref(orig_type);
        match self.types.pointee(ty) {
            Some(points_to) => self.automatic_type_conversion(points_to),
            None => {
                if self.types.is_valid(ty) {
                    let shown = self.display_type(orig_type);
                    let loc = self.here();
                    self.diags.error(
                        loc,
                        format!(
                            "unary '*' needs pointer or array type, but type '{}' given",
                            shown
                        ),
                    );
                }
                self.types.error_type()
            }
        }
    }

    /// `&` undoes the automatic decay of its operand, marks referenced
    /// declarations as address-taken, and rejects register storage.
    fn semantic_take_addr(&mut self, value: &Expr<'a>, loc: Loc) -> TypeRef {
        let reverted = self.revert_automatic_type_conversion(value);
        value.set_ty(reverted);

        if !self.types.is_valid(self.types.skip_alias(reverted)) {
            return self.types.error_type();
        }

        if let ExprKind::Reference {
            decl: Some(decl), ..
        } = &value.kind
        {
            if self.decls.get(*decl).storage_class == StorageClass::Register {
                let name = self.decl_name(*decl);
                self.diags.error(
                    loc,
                    format!("address of register variable '{}' requested", name),
                );
            }
            self.decls.get_mut(*decl).address_taken = true;
        }

        self.types.pointer_to(reverted, Qualifiers::NONE)
    }

    // ========================================================================
    // Binary semantics
    // ========================================================================

    fn semantic_binexpr_arithmetic(
        &mut self,
        left: &'a Expr<'a>,
        right: &'a Expr<'a>,
    ) -> (&'a Expr<'a>, &'a Expr<'a>, TypeRef) {
        let type_left = self.types.skip_typeref(left.ty());
        let type_right = self.types.skip_typeref(right.ty());

        if !self.types.is_arithmetic(type_left) || !self.types.is_arithmetic(type_right) {
            if self.types.is_valid(type_left) && self.types.is_valid(type_right) {
                let loc = self.here();
                self.diags.error(loc, "operation needs arithmetic types");
            }
            return (left, right, self.types.error_type());
        }

        let arithmetic_type = self.types.usual_arithmetic(type_left, type_right);
        let left = self.create_implicit_cast(left, arithmetic_type);
        let right = self.create_implicit_cast(right, arithmetic_type);
        (left, right, arithmetic_type)
    }

    fn semantic_shift_op(
        &mut self,
        left: &'a Expr<'a>,
        right: &'a Expr<'a>,
    ) -> (&'a Expr<'a>, &'a Expr<'a>, TypeRef) {
        let type_left = self.types.skip_typeref(left.ty());
        let type_right = self.types.skip_typeref(right.ty());

        if !self.types.is_integer(type_left) || !self.types.is_integer(type_right) {
            if self.types.is_valid(type_left) && self.types.is_valid(type_right) {
                let loc = self.here();
                self.diags.error(loc, "operation needs integer types");
            }
            return (left, right, self.types.error_type());
        }

        let type_left = self.types.promote_integer(type_left);
        let type_right = self.types.promote_integer(type_right);

        let left = self.create_implicit_cast(left, type_left);
        let right = self.create_implicit_cast(right, type_right);
        (left, right, type_left)
    }

    fn semantic_add(
        &mut self,
        left: &'a Expr<'a>,
        right: &'a Expr<'a>,
    ) -> (&'a Expr<'a>, &'a Expr<'a>, TypeRef) {
        let type_left = self.types.skip_typeref(left.ty());
        let type_right = self.types.skip_typeref(right.ty());

        if self.types.is_arithmetic(type_left) && self.types.is_arithmetic(type_right) {
            let arithmetic_type = self.types.usual_arithmetic(type_left, type_right);
            let left = self.create_implicit_cast(left, arithmetic_type);
            let right = self.create_implicit_cast(right, arithmetic_type);
            return (left, right, arithmetic_type);
        }
        if self.types.is_pointer(type_left) && self.types.is_integer(type_right) {
            return (left, right, type_left);
        }
        if self.types.is_pointer(type_right) && self.types.is_integer(type_left) {
            return (left, right, type_right);
        }
        if self.types.is_valid(type_left) && self.types.is_valid(type_right) {
            let shown_left = self.display_type(left.ty());
            let shown_right = self.display_type(right.ty());
            let loc = self.here();
            self.diags.error(
                loc,
                format!(
                    "invalid operands to binary + ('{}', '{}')",
                    shown_left, shown_right
                ),
            );
        }
        (left, right, self.types.error_type())
    }

    fn semantic_sub(
        &mut self,
        left: &'a Expr<'a>,
        right: &'a Expr<'a>,
    ) -> (&'a Expr<'a>, &'a Expr<'a>, TypeRef) {
        let type_left = self.types.skip_typeref(left.ty());
        let type_right = self.types.skip_typeref(right.ty());

        if self.types.is_arithmetic(type_left) && self.types.is_arithmetic(type_right) {
            let arithmetic_type = self.types.usual_arithmetic(type_left, type_right);
            let left = self.create_implicit_cast(left, arithmetic_type);
            let right = self.create_implicit_cast(right, arithmetic_type);
            return (left, right, arithmetic_type);
        }
        if self.types.is_pointer(type_left) && self.types.is_integer(type_right) {
            return (left, right, type_left);
        }
        if self.types.is_pointer(type_left) && self.types.is_pointer(type_right) {
            if !self.types.pointers_compatible(type_left, type_right) {
                let shown_left = self.display_type(left.ty());
                let shown_right = self.display_type(right.ty());
                let loc = self.here();
                self.diags.error(
                    loc,
                    format!(
                        "pointers to incompatible objects to binary '-' ('{}', '{}')",
                        shown_left, shown_right
                    ),
                );
                return (left, right, self.types.error_type());
            }
            return (left, right, self.type_ptrdiff_t);
        }
        if self.types.is_valid(type_left) && self.types.is_valid(type_right) {
            let shown_left = self.display_type(left.ty());
            let shown_right = self.display_type(right.ty());
            let loc = self.here();
            self.diags.error(
                loc,
                format!(
                    "invalid operands to binary '-' ('{}', '{}')",
                    shown_left, shown_right
                ),
            );
        }
        (left, right, self.types.error_type())
    }

    /// Comparisons produce `int`.  Numeric operands take the usual
    /// arithmetic conversions; mixing a pointer and an integer is
    /// diagnosed and the integer converted.
    fn semantic_comparison(
        &mut self,
        op: BinaryOp,
        left: &'a Expr<'a>,
        right: &'a Expr<'a>,
        start: Loc,
    ) -> (&'a Expr<'a>, &'a Expr<'a>, TypeRef) {
        let type_left = self.types.skip_typeref(left.ty());
        let type_right = self.types.skip_typeref(right.ty());
        let int = self.types.atomic(AtomicKind::Int);
        let is_equality = matches!(op, BinaryOp::Equal | BinaryOp::NotEqual);

        let mut left = left;
        let mut right = right;

        if self.types.is_arithmetic(type_left) && self.types.is_arithmetic(type_right) {
            if self.warnings.sign_compare
                && !is_equality
                && self.types.is_integer(type_left)
                && self.types.is_integer(type_right)
                && self.types.is_signed(type_left) != self.types.is_signed(type_right)
            {
                self.diags
                    .warning(start, "comparison between signed and unsigned");
            }
            let arithmetic_type = self.types.usual_arithmetic(type_left, type_right);
            left = self.create_implicit_cast(left, arithmetic_type);
            right = self.create_implicit_cast(right, arithmetic_type);
            if self.warnings.float_equal
                && is_equality
                && self.types.is_float(arithmetic_type)
            {
                self.diags.warning(
                    start,
                    "comparing floating point with == or != is unsafe",
                );
            }
        } else if self.types.is_pointer(type_left) && self.types.is_pointer(type_right) {
            // both pointers compare directly
        } else if self.types.is_pointer(type_left) && self.types.is_arithmetic(type_right) {
            if !fold::is_null_pointer_constant(right, self.types) {
                self.diags
                    .warning(start, "comparison between pointer and integer");
            }
            right = self.create_implicit_cast(right, type_left);
        } else if self.types.is_pointer(type_right) && self.types.is_arithmetic(type_left) {
            if !fold::is_null_pointer_constant(left, self.types) {
                self.diags
                    .warning(start, "comparison between pointer and integer");
            }
            left = self.create_implicit_cast(left, type_right);
        } else if self.types.is_valid(type_left) && self.types.is_valid(type_right) {
            let shown_left = self.display_type(left.ty());
            let shown_right = self.display_type(right.ty());
            self.diags.error(
                start,
                format!(
                    "invalid operands in comparison: '{}' - '{}'",
                    shown_left, shown_right
                ),
            );
        }
        (left, right, int)
    }

    fn semantic_logical_op(
        &mut self,
        left: &'a Expr<'a>,
        right: &'a Expr<'a>,
    ) -> (&'a Expr<'a>, &'a Expr<'a>, TypeRef) {
        let type_left = self.types.skip_typeref(left.ty());
        let type_right = self.types.skip_typeref(right.ty());

        if !self.types.is_scalar(type_left) || !self.types.is_scalar(type_right) {
            if self.types.is_valid(type_left) && self.types.is_valid(type_right) {
                let loc = self.here();
                self.diags.error(loc, "operation needs scalar types");
            }
            return (left, right, self.types.error_type());
        }
        let int = self.types.atomic(AtomicKind::Int);
        (left, right, int)
    }

    /// Simple assignment: the target must be a modifiable lvalue, and
    /// the right side is assignability-checked and implicitly cast.
    fn semantic_binexpr_assign(
        &mut self,
        left: &'a Expr<'a>,
        right: &'a Expr<'a>,
        start: Loc,
    ) -> (&'a Expr<'a>, &'a Expr<'a>, TypeRef) {
        let orig_type_left = left.ty();
        let type_left = self.types.skip_typeref(orig_type_left);
        let error = self.types.error_type();

        if self.types.is_array(type_left) {
            self.diags.error(start, "cannot assign to arrays");
            return (left, right, error);
        }
        if self.types.qualifiers(type_left).contains(Qualifiers::CONST) {
            let shown = self.display_type(orig_type_left);
            self.diags.error(
                start,
                format!("assignment to readonly location (type '{}')", shown),
            );
            return (left, right, error);
        }
        if self.types.is_incomplete(type_left, &self.decls) && self.types.is_valid(type_left) {
            let shown = self.display_type(orig_type_left);
            self.diags.error(
                start,
                format!(
                    "left-hand side of assignment has incomplete type '{}'",
                    shown
                ),
            );
            return (left, right, error);
        }
        if let TypeKind::Struct(tag) | TypeKind::Union(tag) = *self.types.kind(type_left) {
            if self.types.has_const_fields(tag, &self.decls) {
                let shown = self.display_type(orig_type_left);
                self.diags.error(
                    start,
                    format!(
                        "cannot assign to lvalue because compound type '{}' has readonly fields",
                        shown
                    ),
                );
                return (left, right, error);
            }
        }

        let mut right = right;
        match self.semantic_assign(orig_type_left, right, "assignment") {
            Some(res_type) => {
                right = self.create_implicit_cast(right, res_type);
            }
            None => {
                let shown_left = self.display_type(orig_type_left);
                let shown_right = self.display_type(right.ty());
                self.diags.error(
                    start,
                    format!("cannot assign to '{}' from '{}'", shown_left, shown_right),
                );
            }
        }

        (left, right, orig_type_left)
    }

    fn semantic_arithmetic_assign(
        &mut self,
        left: &'a Expr<'a>,
        right: &'a Expr<'a>,
    ) -> (&'a Expr<'a>, &'a Expr<'a>, TypeRef) {
        let type_left = self.types.skip_typeref(left.ty());
        let type_right = self.types.skip_typeref(right.ty());

        if !self.types.is_arithmetic(type_left) || !self.types.is_arithmetic(type_right) {
            if self.types.is_valid(type_left) && self.types.is_valid(type_right) {
                let loc = self.here();
                self.diags.error(loc, "operation needs arithmetic types");
            }
            return (left, right, self.types.error_type());
        }

        // no cast on the left side: the store needs the uncasted form,
        // the consumer re-derives the operation type
        let arithmetic_type = self.types.usual_arithmetic(type_left, type_right);
        let right = self.create_implicit_cast(right, arithmetic_type);
        (left, right, type_left)
    }

    fn semantic_arithmetic_addsub_assign(
        &mut self,
        left: &'a Expr<'a>,
        right: &'a Expr<'a>,
    ) -> (&'a Expr<'a>, &'a Expr<'a>, TypeRef) {
        let type_left = self.types.skip_typeref(left.ty());
        let type_right = self.types.skip_typeref(right.ty());

        if self.types.is_arithmetic(type_left) && self.types.is_arithmetic(type_right) {
            let arithmetic_type = self.types.usual_arithmetic(type_left, type_right);
            let right = self.create_implicit_cast(right, arithmetic_type);
            return (left, right, type_left);
        }
        if self.types.is_pointer(type_left) && self.types.is_integer(type_right) {
            return (left, right, type_left);
        }
        if self.types.is_valid(type_left) && self.types.is_valid(type_right) {
            let shown_left = self.display_type(left.ty());
            let shown_right = self.display_type(right.ty());
            let loc = self.here();
            self.diags.error(
                loc,
                format!(
                    "incompatible types '{}' and '{}' in assignment",
                    shown_left, shown_right
                ),
            );
        }
        (left, right, self.types.error_type())
    }

    fn semantic_comma(
        &mut self,
        left: &'a Expr<'a>,
        right: &'a Expr<'a>,
    ) -> (&'a Expr<'a>, &'a Expr<'a>, TypeRef) {
        if self.warnings.unused_value && !self.expression_has_effect(left) {
            self.diags.warning(
                left.loc,
                "left-hand operand of comma expression has no effect",
            );
        }
        (left, right, right.ty())
    }

    /// Whether evaluating the expression has a side effect; drives the
    /// unused-value warnings.
    pub(crate) fn expression_has_effect(&self, expression: &Expr<'a>) -> bool {
        match &expression.kind {
            ExprKind::Error => false,
            ExprKind::Const(_)
            | ExprKind::StringLiteral(_)
            | ExprKind::WideStringLiteral(_)
            | ExprKind::Reference { .. }
            | ExprKind::Select { .. }
            | ExprKind::ArrayAccess { .. }
            | ExprKind::TypeProp { .. }
            | ExprKind::ClassifyType { .. }
            | ExprKind::FunctionName { .. }
            | ExprKind::BuiltinConstantP { .. }
            | ExprKind::OffsetOf { .. } => false,
            ExprKind::Call { function, .. } => match &function.kind {
                ExprKind::BuiltinSymbol { symbol } => {
                    self.interner.resolve(*symbol) == "__builtin_va_end"
                }
                _ => true,
            },
            ExprKind::Conditional {
                true_expr,
                false_expr,
                ..
            } => self.expression_has_effect(true_expr) && self.expression_has_effect(false_expr),
            ExprKind::BuiltinSymbol { .. } => false,
            ExprKind::BuiltinPrefetch { .. }
            | ExprKind::VaStart { .. }
            | ExprKind::VaArg { .. }
            | ExprKind::StatementExpr { .. } => true,
            ExprKind::Unary { op, .. } => match op {
                UnaryOp::PostfixIncrement
                | UnaryOp::PostfixDecrement
                | UnaryOp::PrefixIncrement
                | UnaryOp::PrefixDecrement
                | UnaryOp::ImplicitCast => true,
                UnaryOp::Cast => {
                    let ty = self.types.skip_alias(expression.ty());
                    self.types.is_atomic(ty, AtomicKind::Void)
                }
                _ => false,
            },
            ExprKind::Binary { op, right, .. } => {
                if op.is_assignment() {
                    return true;
                }
                match op {
                    BinaryOp::LogicalAnd | BinaryOp::LogicalOr | BinaryOp::Comma => {
                        self.expression_has_effect(right)
                    }
                    BinaryOp::Expect => true,
                    _ => false,
                }
            }
        }
    }
}
