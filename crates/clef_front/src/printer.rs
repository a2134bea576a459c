//! AST printing.
//!
//! Renders a parsed translation unit (or a single expression) back to
//! C source.  The output is meant to be reparseable: expressions are
//! fully parenthesized and implicit casts are printed transparently,
//! so feeding the result through the parser again yields the same
//! types.  Drives `--print-ast`.

use crate::ast::{
    BinaryOp, ConstValue, DeclArena, DeclId, DeclPayload, Expr, ExprKind, Initializer, Namespace,
    Stmt, StmtKind, StorageClass, TranslationUnit, UnaryOp,
};
use crate::types::{TypeArena, TypeKind};
use clef_base::Interner;
use std::fmt::Write as _;

pub struct AstPrinter<'x, 'a> {
    decls: &'x DeclArena<'a>,
    types: &'x TypeArena,
    interner: &'x Interner,
    out: String,
    indent: usize,
}

/// Renders the whole translation unit.
pub fn print_unit(unit: &TranslationUnit<'_>, types: &TypeArena, interner: &Interner) -> String {
    let mut printer = AstPrinter::new(&unit.decls, types, interner);
    for decl in unit.decls.scope(unit.global_scope).declarations.clone() {
        printer.print_global(decl);
    }
    printer.finish()
}

/// Renders one expression, fully parenthesized.
pub fn print_expression(
    expression: &Expr<'_>,
    decls: &DeclArena<'_>,
    types: &TypeArena,
    interner: &Interner,
) -> String {
    let mut printer = AstPrinter::new(decls, types, interner);
    printer.print_expr(expression);
    printer.finish()
}

impl<'x, 'a> AstPrinter<'x, 'a> {
    pub fn new(decls: &'x DeclArena<'a>, types: &'x TypeArena, interner: &'x Interner) -> Self {
        AstPrinter {
            decls,
            types,
            interner,
            out: String::new(),
            indent: 0,
        }
    }

    pub fn finish(self) -> String {
        self.out
    }

    fn newline(&mut self) {
        self.out.push('\n');
        for _ in 0..self.indent {
            self.out.push('\t');
        }
    }

    fn decl_name(&self, decl: DeclId) -> String {
        match self.decls.get(decl).symbol {
            Some(sym) => self.interner.resolve(sym).to_string(),
            None => String::new(),
        }
    }

    fn storage_prefix(class: StorageClass) -> &'static str {
        match class {
            StorageClass::Typedef => "typedef ",
            StorageClass::Extern => "extern ",
            StorageClass::Static => "static ",
            StorageClass::Auto => "auto ",
            StorageClass::Register => "register ",
            StorageClass::Thread => "__thread ",
            StorageClass::ThreadExtern => "extern __thread ",
            StorageClass::ThreadStatic => "static __thread ",
            _ => "",
        }
    }

    // ========================================================================
    // Declarations
    // ========================================================================

    fn print_global(&mut self, decl: DeclId) {
        let d = self.decls.get(decl);
        // the pre-declared builtin typedefs carry no useful position
        if d.loc.map_or(true, |loc| loc.line == 0) {
            return;
        }
        // enum entries print inside their tag's braces
        if d.storage_class == StorageClass::EnumEntry {
            return;
        }
        match d.namespace {
            Namespace::Struct | Namespace::Union | Namespace::Enum => {
                self.print_tag(decl);
                self.out.push_str(";\n");
            }
            Namespace::Ordinary => {
                self.print_declaration(decl);
                self.out.push('\n');
            }
            Namespace::Label => {}
        }
    }

    fn print_tag(&mut self, decl: DeclId) {
        let d = self.decls.get(decl);
        let keyword = match d.namespace {
            Namespace::Struct => "struct",
            Namespace::Union => "union",
            _ => "enum",
        };
        self.out.push_str(keyword);
        if let Some(sym) = d.symbol {
            let _ = write!(self.out, " {}", self.interner.resolve(sym));
        }
        if !d.is_defined() {
            return;
        }
        self.out.push_str(" {");
        self.indent += 1;
        if d.namespace == Namespace::Enum {
            // enum entries live in the enclosing scope; find them by type
            let entries: Vec<DeclId> = self
                .decls
                .ids()
                .filter(|id| {
                    let e = self.decls.get(*id);
                    e.storage_class == StorageClass::EnumEntry
                        && matches!(e.ty.map(|t| self.types.kind(t)), Some(TypeKind::Enum(d)) if *d == decl)
                })
                .collect();
            for entry in entries {
                self.newline();
                let _ = write!(self.out, "{},", self.decl_name(entry));
            }
        } else {
            let members: Vec<DeclId> = self.decls.members_of(decl).collect();
            for member in members {
                self.newline();
                self.print_declaration(member);
            }
        }
        self.indent -= 1;
        self.newline();
        self.out.push('}');
    }

    /// One declaration with storage class, declarator and initializer
    /// or function body.
    fn print_declaration(&mut self, decl: DeclId) {
        let d = self.decls.get(decl);
        self.out.push_str(Self::storage_prefix(d.storage_class));
        let name = self.decl_name(decl);
        let ty = match d.ty {
            Some(ty) => ty,
            None => {
                let _ = write!(self.out, "{};", name);
                return;
            }
        };
        let declared = self
            .types
            .display_declared(ty, &name, self.decls, self.interner);
        self.out.push_str(&declared);

        let payload = self.decls.get(decl).payload;
        match payload {
            DeclPayload::Body(body) => {
                self.newline();
                self.print_stmt(body);
                self.out.push('\n');
            }
            DeclPayload::Initializer(initializer) => {
                self.out.push_str(" = ");
                self.print_initializer(initializer);
                self.out.push(';');
            }
            _ => {
                self.out.push(';');
            }
        }
    }

    fn print_initializer(&mut self, initializer: &Initializer<'a>) {
        match initializer {
            Initializer::Value(expression) => self.print_expr(expression),
            Initializer::String(bytes) => self.print_string(bytes, false),
            Initializer::WideString(chars) => {
                let bytes: Vec<u8> = chars.iter().map(|c| *c as u8).collect();
                self.print_string(&bytes, true);
            }
            Initializer::List(entries) => {
                self.out.push_str("{ ");
                for (i, entry) in entries.iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    self.print_initializer(entry);
                }
                self.out.push_str(" }");
            }
        }
    }

    // ========================================================================
    // Statements
    // ========================================================================

    fn print_stmt(&mut self, statement: &Stmt<'a>) {
        match &statement.kind {
            StmtKind::Compound { statements, .. } => {
                self.out.push('{');
                self.indent += 1;
                for sub in statements.iter() {
                    self.newline();
                    self.print_stmt(sub);
                }
                self.indent -= 1;
                self.newline();
                self.out.push('}');
            }
            StmtKind::Expression(expression) => {
                self.print_expr(expression);
                self.out.push(';');
            }
            StmtKind::Declaration { declarations } => {
                for (i, decl) in declarations.iter().enumerate() {
                    if i > 0 {
                        self.newline();
                    }
                    self.print_declaration(*decl);
                }
            }
            StmtKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.out.push_str("if (");
                self.print_expr(condition);
                self.out.push_str(") ");
                self.print_opt_stmt(*then_branch);
                if let Some(else_branch) = else_branch {
                    self.out.push_str(" else ");
                    self.print_stmt(else_branch);
                }
            }
            StmtKind::Switch {
                expression, body, ..
            } => {
                self.out.push_str("switch (");
                self.print_expr(expression);
                self.out.push_str(") ");
                self.print_opt_stmt(*body);
            }
            StmtKind::CaseLabel {
                expression,
                statement,
            } => {
                match expression {
                    Some(expression) => {
                        self.out.push_str("case ");
                        self.print_expr(expression);
                        self.out.push(':');
                    }
                    None => self.out.push_str("default:"),
                }
                if let Some(statement) = statement {
                    self.out.push(' ');
                    self.print_stmt(statement);
                }
            }
            StmtKind::Label { label, statement } => {
                let _ = write!(self.out, "{}:", self.decl_name(*label));
                match statement {
                    Some(statement) => {
                        self.out.push(' ');
                        self.print_stmt(statement);
                    }
                    None => self.out.push(';'),
                }
            }
            StmtKind::While { condition, body } => {
                self.out.push_str("while (");
                self.print_expr(condition);
                self.out.push_str(") ");
                self.print_opt_stmt(*body);
            }
            StmtKind::DoWhile { body, condition } => {
                self.out.push_str("do ");
                self.print_opt_stmt(*body);
                self.out.push_str(" while (");
                self.print_expr(condition);
                self.out.push_str(");");
            }
            StmtKind::For {
                initialization,
                condition,
                step,
                body,
                ..
            } => {
                self.out.push_str("for (");
                if let Some(init) = initialization {
                    // the initialization prints its own ';'
                    self.print_stmt(init);
                } else {
                    self.out.push(';');
                }
                if let Some(condition) = condition {
                    self.out.push(' ');
                    self.print_expr(condition);
                }
                self.out.push(';');
                if let Some(step) = step {
                    self.out.push(' ');
                    self.print_expr(step);
                }
                self.out.push_str(") ");
                self.print_opt_stmt(*body);
            }
            StmtKind::Goto { label } => {
                let _ = write!(self.out, "goto {};", self.decl_name(*label));
            }
            StmtKind::Continue => self.out.push_str("continue;"),
            StmtKind::Break => self.out.push_str("break;"),
            StmtKind::Return { value } => {
                self.out.push_str("return");
                if let Some(value) = value {
                    self.out.push(' ');
                    self.print_expr(value);
                }
                self.out.push(';');
            }
            StmtKind::Asm {
                is_volatile, text, ..
            } => {
                self.out.push_str("asm ");
                if *is_volatile {
                    self.out.push_str("volatile ");
                }
                self.out.push('(');
                self.print_string(text, false);
                self.out.push_str(");");
            }
        }
    }

    fn print_opt_stmt(&mut self, statement: Option<&Stmt<'a>>) {
        match statement {
            Some(statement) => self.print_stmt(statement),
            None => self.out.push(';'),
        }
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    fn print_string(&mut self, bytes: &[u8], wide: bool) {
        if wide {
            self.out.push('L');
        }
        self.out.push('"');
        for byte in bytes {
            match byte {
                b'"' => self.out.push_str("\\\""),
                b'\\' => self.out.push_str("\\\\"),
                b'\n' => self.out.push_str("\\n"),
                b'\t' => self.out.push_str("\\t"),
                b'\r' => self.out.push_str("\\r"),
                0x20..=0x7e => self.out.push(*byte as char),
                other => {
                    let _ = write!(self.out, "\\x{:02x}", other);
                }
            }
        }
        self.out.push('"');
    }

    fn binary_symbol(op: BinaryOp) -> &'static str {
        use BinaryOp::*;
        match op {
            Add => "+",
            Sub => "-",
            Mul => "*",
            Div => "/",
            Mod => "%",
            Equal => "==",
            NotEqual => "!=",
            Less => "<",
            LessEqual => "<=",
            Greater => ">",
            GreaterEqual => ">=",
            BitAnd => "&",
            BitOr => "|",
            BitXor => "^",
            ShiftLeft => "<<",
            ShiftRight => ">>",
            LogicalAnd => "&&",
            LogicalOr => "||",
            Comma => ",",
            Assign => "=",
            AddAssign => "+=",
            SubAssign => "-=",
            MulAssign => "*=",
            DivAssign => "/=",
            ModAssign => "%=",
            ShiftLeftAssign => "<<=",
            ShiftRightAssign => ">>=",
            BitAndAssign => "&=",
            BitOrAssign => "|=",
            BitXorAssign => "^=",
            IsGreater => "__builtin_isgreater",
            IsGreaterEqual => "__builtin_isgreaterequal",
            IsLess => "__builtin_isless",
            IsLessEqual => "__builtin_islessequal",
            IsLessGreater => "__builtin_islessgreater",
            IsUnordered => "__builtin_isunordered",
            Expect => "__builtin_expect",
        }
    }

    fn type_text(&self, ty: crate::types::TypeRef) -> String {
        self.types.display(ty, self.decls, self.interner)
    }

    pub fn print_expr(&mut self, expression: &Expr<'a>) {
        match &expression.kind {
            ExprKind::Error => self.out.push_str("/* error */0"),
            ExprKind::Const(ConstValue::Int(v)) => {
                let _ = write!(self.out, "{}", v);
            }
            ExprKind::Const(ConstValue::Float(v)) => {
                let _ = write!(self.out, "{:?}", v);
            }
            ExprKind::StringLiteral(bytes) => self.print_string(bytes, false),
            ExprKind::WideStringLiteral(chars) => {
                let bytes: Vec<u8> = chars.iter().map(|c| *c as u8).collect();
                self.print_string(&bytes, true);
            }
            ExprKind::Reference { symbol, .. } => {
                self.out.push_str(self.interner.resolve(*symbol));
            }
            ExprKind::Call {
                function,
                arguments,
            } => {
                self.print_expr(function);
                self.out.push('(');
                for (i, argument) in arguments.iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    self.print_expr(argument);
                }
                self.out.push(')');
            }
            ExprKind::Unary { op, value } => self.print_unary(*op, value, expression),
            ExprKind::Binary { op, left, right } => match op {
                BinaryOp::IsGreater
                | BinaryOp::IsGreaterEqual
                | BinaryOp::IsLess
                | BinaryOp::IsLessEqual
                | BinaryOp::IsLessGreater
                | BinaryOp::IsUnordered
                | BinaryOp::Expect => {
                    self.out.push_str(Self::binary_symbol(*op));
                    self.out.push('(');
                    self.print_expr(left);
                    self.out.push_str(", ");
                    self.print_expr(right);
                    self.out.push(')');
                }
                _ => {
                    self.out.push('(');
                    self.print_expr(left);
                    let _ = write!(self.out, " {} ", Self::binary_symbol(*op));
                    self.print_expr(right);
                    self.out.push(')');
                }
            },
            ExprKind::Conditional {
                condition,
                true_expr,
                false_expr,
            } => {
                self.out.push('(');
                self.print_expr(condition);
                self.out.push_str(" ? ");
                self.print_expr(true_expr);
                self.out.push_str(" : ");
                self.print_expr(false_expr);
                self.out.push(')');
            }
            ExprKind::Select {
                compound,
                symbol,
                via_pointer,
                ..
            } => {
                self.print_expr(compound);
                self.out.push_str(if *via_pointer { "->" } else { "." });
                self.out.push_str(self.interner.resolve(*symbol));
            }
            ExprKind::ArrayAccess { array, index } => {
                self.print_expr(array);
                self.out.push('[');
                self.print_expr(index);
                self.out.push(']');
            }
            ExprKind::TypeProp {
                is_alignof,
                queried,
                operand,
            } => {
                self.out
                    .push_str(if *is_alignof { "__alignof__" } else { "sizeof" });
                match operand {
                    Some(operand) => {
                        self.out.push('(');
                        self.print_expr(operand);
                        self.out.push(')');
                    }
                    None => {
                        let _ = write!(self.out, "({})", self.type_text(*queried));
                    }
                }
            }
            ExprKind::ClassifyType { value } => {
                self.out.push_str("__builtin_classify_type(");
                self.print_expr(value);
                self.out.push(')');
            }
            ExprKind::FunctionName { pretty } => {
                self.out.push_str(if *pretty {
                    "__PRETTY_FUNCTION__"
                } else {
                    "__func__"
                });
            }
            ExprKind::BuiltinSymbol { symbol } => {
                self.out.push_str(self.interner.resolve(*symbol));
            }
            ExprKind::BuiltinConstantP { value } => {
                self.out.push_str("__builtin_constant_p(");
                self.print_expr(value);
                self.out.push(')');
            }
            ExprKind::BuiltinPrefetch {
                address,
                rw,
                locality,
            } => {
                self.out.push_str("__builtin_prefetch(");
                self.print_expr(address);
                if let Some(rw) = rw {
                    self.out.push_str(", ");
                    self.print_expr(rw);
                }
                if let Some(locality) = locality {
                    self.out.push_str(", ");
                    self.print_expr(locality);
                }
                self.out.push(')');
            }
            ExprKind::OffsetOf {
                queried,
                designators,
            } => {
                let _ = write!(self.out, "__builtin_offsetof({}, ", self.type_text(*queried));
                for (i, designator) in designators.iter().enumerate() {
                    if let Some(symbol) = designator.symbol {
                        if i > 0 {
                            self.out.push('.');
                        }
                        self.out.push_str(self.interner.resolve(symbol));
                    } else if let Some(index) = designator.index {
                        self.out.push('[');
                        self.print_expr(index);
                        self.out.push(']');
                    }
                }
                self.out.push(')');
            }
            ExprKind::VaStart { ap, parameter } => {
                self.out.push_str("__builtin_va_start(");
                self.print_expr(ap);
                let _ = write!(self.out, ", {})", self.decl_name(*parameter));
            }
            ExprKind::VaArg { ap } => {
                self.out.push_str("__builtin_va_arg(");
                self.print_expr(ap);
                let _ = write!(self.out, ", {})", self.type_text(expression.ty()));
            }
            ExprKind::StatementExpr { statement } => {
                self.out.push('(');
                self.print_stmt(statement);
                self.out.push(')');
            }
        }
    }

    fn print_unary(&mut self, op: UnaryOp, value: &Expr<'a>, whole: &Expr<'a>) {
        use UnaryOp::*;
        match op {
            // conversions inserted by the analyzer print transparently
            ImplicitCast | BitfieldExtract => self.print_expr(value),
            Cast => {
                let _ = write!(self.out, "(({})", self.type_text(whole.ty()));
                self.print_expr(value);
                self.out.push(')');
            }
            PostfixIncrement => {
                self.print_expr(value);
                self.out.push_str("++");
            }
            PostfixDecrement => {
                self.print_expr(value);
                self.out.push_str("--");
            }
            _ => {
                let symbol = match op {
                    Negate => "-",
                    Plus => "+",
                    Not => "!",
                    BitNot => "~",
                    Dereference => "*",
                    TakeAddress => "&",
                    PrefixIncrement => "++",
                    PrefixDecrement => "--",
                    _ => unreachable!(),
                };
                self.out.push('(');
                self.out.push_str(symbol);
                self.print_expr(value);
                self.out.push(')');
            }
        }
    }
}
