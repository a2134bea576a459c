//! Statement parsing.
//!
//! The analyzer keeps four explicit contexts while walking statements:
//! the current function, the open switch, the loop nesting depth and
//! the per-function label lists.  Each is saved on entry to the
//! matching construct and restored on every exit path, including the
//! recovery paths.
//!
//! Case and default labels register themselves on the open switch in
//! source order; `goto`s are collected per function and resolved
//! against the label namespace when the function body ends.

use super::{DeclMode, Parser, SwitchContext};
use crate::ast::{
    AsmConstraint, CaseLabel, DeclId, Declaration, ExprKind, Namespace, Stmt, StmtKind,
    StorageClass, UnaryOp,
};
use crate::fold;
use crate::token::TokenKind;
use crate::types::{AtomicKind, TypeKind};
use clef_base::Symbol;

impl<'a, 'e> Parser<'a, 'e> {
    pub(crate) fn parse_statement(&mut self) -> Option<&'a Stmt<'a>> {
        match self.token.kind {
            TokenKind::Asm => self.parse_asm_statement(),
            TokenKind::Case => self.parse_case_statement(),
            TokenKind::Default => self.parse_default_statement(),
            TokenKind::LBrace => Some(self.parse_compound_statement()),
            TokenKind::If => self.parse_if(),
            TokenKind::Switch => self.parse_switch(),
            TokenKind::While => self.parse_while(),
            TokenKind::Do => self.parse_do(),
            TokenKind::For => self.parse_for(),
            TokenKind::Goto => self.parse_goto(),
            TokenKind::Continue => self.parse_continue(),
            TokenKind::Break => self.parse_break(),
            TokenKind::Return => self.parse_return(),
            TokenKind::Semicolon => {
                if self.warnings.empty_statement {
                    let loc = self.here();
                    self.diags.warning(loc, "statement is empty");
                }
                self.next_token();
                None
            }
            TokenKind::Identifier(sym) => {
                if self.look_ahead(1).kind == TokenKind::Colon {
                    return self.parse_label_statement(sym);
                }
                if self.is_typedef_symbol(sym) {
                    return self.parse_declaration_statement();
                }
                self.parse_expression_statement()
            }
            TokenKind::Extension => {
                while self.token.kind == TokenKind::Extension {
                    self.next_token();
                }
                self.parse_statement()
            }
            _ if self.is_declaration_specifier(&self.token, false) => {
                self.parse_declaration_statement()
            }
            _ => self.parse_expression_statement(),
        }
    }

    pub(crate) fn parse_compound_statement(&mut self) -> &'a Stmt<'a> {
        let loc = self.here();
        self.eat(TokenKind::LBrace);

        let scope = self.decls.new_scope(Some(self.current_scope));
        let mark = self.enter_scope(scope);

        let mut statements = Vec::new();
        while !matches!(self.token.kind, TokenKind::RBrace | TokenKind::Eof) {
            if let Some(statement) = self.parse_statement() {
                statements.push(statement);
            }
        }

        if self.token.kind == TokenKind::RBrace {
            self.next_token();
        } else {
            self.diags
                .error(loc, "end of file while looking for closing '}'");
        }

        self.leave_scope(mark);

        let statements = self.ctx.slice(statements);
        self.ctx
            .stmt(StmtKind::Compound { statements, scope }, loc)
    }

    // ========================================================================
    // Labels and switch labels
    // ========================================================================

    fn parse_case_statement(&mut self) -> Option<&'a Stmt<'a>> {
        let loc = self.here();
        self.eat(TokenKind::Case);

        let expression = self.parse_expression();
        if !self.expect(TokenKind::Colon) {
            return None;
        }

        let value = fold::fold(expression, &self.decls, self.types);
        if value.is_none() {
            self.diags
                .error(loc, "case label does not reduce to an integer constant");
        } else {
            match &mut self.current_switch {
                Some(switch) => switch.cases.push(CaseLabel {
                    expression: Some(expression),
                    value,
                    loc,
                }),
                None => {
                    self.diags
                        .error(loc, "case label not within a switch statement");
                }
            }
        }

        let statement = self.parse_statement();
        Some(self.ctx.stmt(
            StmtKind::CaseLabel {
                expression: Some(expression),
                statement,
            },
            loc,
        ))
    }

    fn parse_default_statement(&mut self) -> Option<&'a Stmt<'a>> {
        let loc = self.here();
        self.eat(TokenKind::Default);

        if !self.expect(TokenKind::Colon) {
            return None;
        }

        if self.current_switch.is_none() {
            self.diags
                .error(loc, "'default' label not within a switch statement");
        } else {
            let first_default = self
                .current_switch
                .as_ref()
                .unwrap()
                .cases
                .iter()
                .find(|case| case.expression.is_none())
                .map(|case| case.loc);
            match first_default {
                Some(first) => {
                    self.diags.error(loc, "multiple default labels in one switch");
                    self.diags.note(first, "this is the first default label");
                }
                None => {
                    let switch = self.current_switch.as_mut().unwrap();
                    switch.cases.push(CaseLabel {
                        expression: None,
                        value: None,
                        loc,
                    });
                }
            }
        }

        let statement = self.parse_statement();
        Some(self.ctx.stmt(
            StmtKind::CaseLabel {
                expression: None,
                statement,
            },
            loc,
        ))
    }

    /// Returns the label declaration for `symbol` in the current
    /// function, creating it on first mention.
    fn get_label(&mut self, symbol: Symbol) -> DeclId {
        let function = self
            .current_function
            .expect("label outside of a function");
        let function_scope = self.decls.get(function).own_scope;

        if let Some(candidate) = self.labels.lookup(symbol, Namespace::Label) {
            if self.decls.get(candidate).parent_scope == function_scope {
                return candidate;
            }
        }

        let mut decl = Declaration::new(Namespace::Label);
        decl.symbol = Some(symbol);
        let decl = self.decls.alloc(decl);
        self.label_push(decl);
        decl
    }

    fn parse_label_statement(&mut self, symbol: Symbol) -> Option<&'a Stmt<'a>> {
        let loc = self.here();
        self.next_token();

        let label = self.get_label(symbol);

        // a set position means the label was already defined; a bare
        // goto mention leaves it unset
        if self.decls.get(label).loc.is_some() {
            let name = self.name_of(symbol);
            self.diags.error(loc, format!("duplicate label '{}'", name));
            let previous = self.decls.get(label).loc.unwrap();
            self.diags.note(
                previous,
                format!("previous definition of '{}' was here", name),
            );
        } else {
            self.decls.get_mut(label).loc = Some(loc);
        }

        self.eat(TokenKind::Colon);

        if self.token.kind == TokenKind::RBrace {
            self.diags.error(loc, "label at end of compound statement");
            return Some(self.ctx.stmt(
                StmtKind::Label {
                    label,
                    statement: None,
                },
                loc,
            ));
        }

        let statement = if self.token.kind == TokenKind::Semicolon {
            // 'label: ;' is commonly used in front of a '}'
            self.next_token();
            None
        } else {
            self.parse_statement()
        };

        self.defined_labels.push((label, loc));

        Some(self.ctx.stmt(StmtKind::Label { label, statement }, loc))
    }

    // ========================================================================
    // Selection statements
    // ========================================================================

    fn parse_if(&mut self) -> Option<&'a Stmt<'a>> {
        let loc = self.here();
        self.eat(TokenKind::If);

        if !self.expect(TokenKind::LParen) {
            return None;
        }
        let condition = self.parse_expression();
        if !self.expect(TokenKind::RParen) {
            return None;
        }

        let then_branch = self.parse_statement();
        let mut else_branch = None;
        if self.token.kind == TokenKind::Else {
            self.next_token();
            else_branch = self.parse_statement();
        }

        Some(self.ctx.stmt(
            StmtKind::If {
                condition,
                then_branch,
                else_branch,
            },
            loc,
        ))
    }

    fn parse_switch(&mut self) -> Option<&'a Stmt<'a>> {
        let loc = self.here();
        self.eat(TokenKind::Switch);

        if !self.expect(TokenKind::LParen) {
            return None;
        }
        let expression = self.parse_expression();
        let mut ty = self.types.skip_typeref(expression.ty());
        if self.types.is_integer(ty) {
            ty = self.types.promote_integer(ty);
        } else if self.types.is_valid(ty) {
            let shown = self.display_type(expression.ty());
            self.diags.error(
                expression.loc,
                format!("switch quantity is not an integer, but '{}'", shown),
            );
            ty = self.types.error_type();
        }
        let expression = self.create_implicit_cast(expression, ty);
        if !self.expect(TokenKind::RParen) {
            return None;
        }

        let enclosing = self
            .current_switch
            .replace(SwitchContext { cases: Vec::new() });
        let body = self.parse_statement();
        let context = std::mem::replace(&mut self.current_switch, enclosing)
            .expect("switch context must survive its body");

        if self.warnings.switch_default
            && !context.cases.iter().any(|case| case.expression.is_none())
        {
            self.diags.warning(loc, "switch has no default case");
        }

        let cases = self.ctx.slice(context.cases);
        Some(self.ctx.stmt(
            StmtKind::Switch {
                expression,
                body,
                cases,
            },
            loc,
        ))
    }

    // ========================================================================
    // Iteration statements
    // ========================================================================

    fn parse_loop_body(&mut self) -> Option<&'a Stmt<'a>> {
        self.loop_depth += 1;
        let body = self.parse_statement();
        self.loop_depth -= 1;
        body
    }

    fn parse_while(&mut self) -> Option<&'a Stmt<'a>> {
        let loc = self.here();
        self.eat(TokenKind::While);

        if !self.expect(TokenKind::LParen) {
            return None;
        }
        let condition = self.parse_expression();
        if !self.expect(TokenKind::RParen) {
            return None;
        }

        let body = self.parse_loop_body();
        Some(self
            .ctx
            .stmt(StmtKind::While { condition, body }, loc))
    }

    fn parse_do(&mut self) -> Option<&'a Stmt<'a>> {
        let loc = self.here();
        self.eat(TokenKind::Do);

        let body = self.parse_loop_body();

        if !self.expect(TokenKind::While) {
            return None;
        }
        if !self.expect(TokenKind::LParen) {
            return None;
        }
        let condition = self.parse_expression();
        if !self.expect(TokenKind::RParen) {
            return None;
        }
        if !self.expect(TokenKind::Semicolon) {
            return None;
        }

        Some(self
            .ctx
            .stmt(StmtKind::DoWhile { body, condition }, loc))
    }

    fn parse_for(&mut self) -> Option<&'a Stmt<'a>> {
        let loc = self.here();
        self.eat(TokenKind::For);

        if !self.expect(TokenKind::LParen) {
            return None;
        }

        let scope = self.decls.new_scope(Some(self.current_scope));
        let mark = self.enter_scope(scope);

        let mut initialization = None;
        if self.token.kind != TokenKind::Semicolon {
            if self.is_declaration_specifier(&self.token.clone(), false) {
                initialization = self.parse_declaration_statement();
            } else {
                let expression = self.parse_expression();
                if self.warnings.unused_value && !self.expression_has_effect(expression) {
                    self.diags
                        .warning(expression.loc, "initialisation of 'for' statement has no effect");
                }
                initialization =
                    Some(self.ctx.stmt(StmtKind::Expression(expression), expression.loc));
                if !self.expect(TokenKind::Semicolon) {
                    self.leave_scope(mark);
                    return None;
                }
            }
        } else {
            self.next_token();
        }

        let mut condition = None;
        if self.token.kind != TokenKind::Semicolon {
            condition = Some(self.parse_expression());
        }
        if !self.expect(TokenKind::Semicolon) {
            self.leave_scope(mark);
            return None;
        }

        let mut step = None;
        if self.token.kind != TokenKind::RParen {
            step = Some(self.parse_expression());
        }
        if !self.expect(TokenKind::RParen) {
            self.leave_scope(mark);
            return None;
        }

        let body = self.parse_loop_body();

        self.leave_scope(mark);

        Some(self.ctx.stmt(
            StmtKind::For {
                scope,
                initialization,
                condition,
                step,
                body,
            },
            loc,
        ))
    }

    // ========================================================================
    // Jump statements
    // ========================================================================

    fn parse_goto(&mut self) -> Option<&'a Stmt<'a>> {
        let loc = self.here();
        self.eat(TokenKind::Goto);

        let TokenKind::Identifier(symbol) = self.token.kind else {
            self.parse_error_expected(Some("goto"), "identifier");
            self.eat_statement();
            return None;
        };
        self.next_token();

        let label = self.get_label(symbol);
        self.gotos.push((label, loc));

        if !self.expect(TokenKind::Semicolon) {
            return None;
        }

        Some(self.ctx.stmt(StmtKind::Goto { label }, loc))
    }

    fn parse_continue(&mut self) -> Option<&'a Stmt<'a>> {
        let loc = self.here();
        let valid = self.loop_depth > 0;
        if !valid {
            self.diags.error(loc, "continue statement not within loop");
        }

        self.eat(TokenKind::Continue);
        if !self.expect(TokenKind::Semicolon) {
            return None;
        }

        valid.then(|| self.ctx.stmt(StmtKind::Continue, loc))
    }

    fn parse_break(&mut self) -> Option<&'a Stmt<'a>> {
        let loc = self.here();
        let valid = self.loop_depth > 0 || self.current_switch.is_some();
        if !valid {
            self.diags
                .error(loc, "break statement not within loop or switch");
        }

        self.eat(TokenKind::Break);
        if !self.expect(TokenKind::Semicolon) {
            return None;
        }

        valid.then(|| self.ctx.stmt(StmtKind::Break, loc))
    }

    /// Whether the expression names a local object; drives the
    /// address-of-local warning on `return`.
    fn is_local_variable(&self, expression: &ExprKind<'a>) -> bool {
        let ExprKind::Reference {
            decl: Some(decl), ..
        } = expression
        else {
            return false;
        };
        let d = self.decls.get(*decl);
        if !matches!(
            d.storage_class,
            StorageClass::None | StorageClass::Auto | StorageClass::Register
        ) {
            return false;
        }
        match d.ty {
            Some(ty) => !self.types.is_function(self.types.skip_alias(ty)),
            None => false,
        }
    }

    fn parse_return(&mut self) -> Option<&'a Stmt<'a>> {
        let loc = self.here();
        self.eat(TokenKind::Return);

        let mut value = None;
        if self.token.kind != TokenKind::Semicolon {
            value = Some(self.parse_expression());
        }
        if !self.expect(TokenKind::Semicolon) {
            return None;
        }

        let Some(function) = self.current_function else {
            self.diags.error(loc, "'return' outside of a function");
            return Some(self.ctx.stmt(StmtKind::Return { value }, loc));
        };

        let func_type = self
            .decls
            .get(function)
            .ty
            .unwrap_or_else(|| self.types.error_type());
        let func_type = self.types.skip_typeref(func_type);
        let declared_return = match self.types.kind(func_type) {
            TypeKind::Function(f) => Some(f.return_type),
            _ => None,
        };
        let return_type = match declared_return {
            Some(ty) => self.types.skip_typeref(ty),
            None => self.types.error_type(),
        };

        match value {
            Some(return_value) => {
                let value_type = self.types.skip_typeref(return_value.ty());
                if self.types.is_atomic(return_type, AtomicKind::Void)
                    && !self.types.is_atomic(value_type, AtomicKind::Void)
                {
                    self.diags
                        .warning(loc, "'return' with a value, in function returning void");
                    value = None;
                } else {
                    match self.semantic_assign(return_type, return_value, "'return'") {
                        Some(res_type) => {
                            value = Some(self.create_implicit_cast(return_value, res_type));
                        }
                        None => {
                            let shown_value = self.display_type(return_value.ty());
                            let shown_return = self.display_type(return_type);
                            self.diags.error(
                                loc,
                                format!(
                                    "cannot return something of type '{}' in function returning '{}'",
                                    shown_value, shown_return
                                ),
                            );
                        }
                    }
                }

                if let Some(checked) = value {
                    if let ExprKind::Unary {
                        op: UnaryOp::TakeAddress,
                        value: inner,
                    } = &checked.kind
                    {
                        if self.is_local_variable(&inner.kind) {
                            self.diags
                                .warning(loc, "function returns address of local variable");
                        }
                    }
                }
            }
            None => {
                if !self.types.is_atomic(return_type, AtomicKind::Void)
                    && self.types.is_valid(return_type)
                {
                    self.diags
                        .warning(loc, "'return' without value, in function returning non-void");
                }
            }
        }

        Some(self.ctx.stmt(StmtKind::Return { value }, loc))
    }

    // ========================================================================
    // Declaration and expression statements
    // ========================================================================

    fn parse_declaration_statement(&mut self) -> Option<&'a Stmt<'a>> {
        let loc = self.here();

        let before = self.decls.scope(self.current_scope).declarations.len();
        self.parse_declaration(DeclMode::Record);
        let declarations = self.decls.scope(self.current_scope).declarations[before..].to_vec();

        let declarations = self.ctx.slice(declarations);
        Some(self
            .ctx
            .stmt(StmtKind::Declaration { declarations }, loc))
    }

    fn parse_expression_statement(&mut self) -> Option<&'a Stmt<'a>> {
        let loc = self.here();
        let expression = self.parse_expression();

        if self.warnings.unused_value && !self.expression_has_effect(expression) {
            self.diags
                .warning(expression.loc, "statement has no effect");
        }

        if !self.expect(TokenKind::Semicolon) {
            return None;
        }

        Some(self.ctx.stmt(StmtKind::Expression(expression), loc))
    }

    // ========================================================================
    // Inline assembler
    // ========================================================================

    fn parse_asm_constraints(&mut self) -> Vec<AsmConstraint<'a>> {
        let mut constraints = Vec::new();

        while matches!(
            self.token.kind,
            TokenKind::StringLiteral(_) | TokenKind::LBracket
        ) {
            let mut symbol = None;
            if self.token.kind == TokenKind::LBracket {
                self.eat(TokenKind::LBracket);
                let TokenKind::Identifier(sym) = self.token.kind else {
                    self.parse_error_expected(Some("asm constraint"), "identifier");
                    return constraints;
                };
                symbol = Some(sym);
                self.next_token();
                if !self.expect_soft(TokenKind::RBracket) {
                    return constraints;
                }
            }

            let constraint = match &self.token.kind {
                TokenKind::StringLiteral(bytes) => {
                    let content = self.ctx.bytes(bytes);
                    self.next_token();
                    content
                }
                _ => {
                    self.parse_error_expected(Some("asm constraint"), "string literal");
                    return constraints;
                }
            };

            if !self.expect_soft(TokenKind::LParen) {
                return constraints;
            }
            let expression = self.parse_expression();
            if !self.expect_soft(TokenKind::RParen) {
                return constraints;
            }

            constraints.push(AsmConstraint {
                symbol,
                constraint,
                expression,
            });

            if self.token.kind != TokenKind::Comma {
                break;
            }
            self.eat(TokenKind::Comma);
        }

        constraints
    }

    fn parse_asm_clobbers(&mut self) -> Vec<&'a [u8]> {
        let mut clobbers = Vec::new();

        while let TokenKind::StringLiteral(bytes) = &self.token.kind {
            let content = self.ctx.bytes(bytes);
            clobbers.push(content);
            self.next_token();

            if self.token.kind != TokenKind::Comma {
                break;
            }
            self.eat(TokenKind::Comma);
        }

        clobbers
    }

    fn parse_asm_statement(&mut self) -> Option<&'a Stmt<'a>> {
        let loc = self.here();
        self.eat(TokenKind::Asm);

        let mut is_volatile = false;
        if self.token.kind == TokenKind::Volatile {
            self.next_token();
            is_volatile = true;
        }

        if !self.expect(TokenKind::LParen) {
            return None;
        }

        let text: &'a [u8] = match &self.token.kind {
            TokenKind::StringLiteral(bytes) => {
                let content = self.ctx.bytes(bytes);
                self.next_token();
                content
            }
            _ => {
                self.parse_error_expected(Some("asm statement"), "string literal");
                self.eat_paren();
                let _ = self.expect(TokenKind::Semicolon);
                return None;
            }
        };

        let mut inputs = Vec::new();
        let mut outputs = Vec::new();
        let mut clobbers = Vec::new();

        if self.token.kind == TokenKind::Colon {
            self.eat(TokenKind::Colon);
            inputs = self.parse_asm_constraints();

            if self.token.kind == TokenKind::Colon {
                self.eat(TokenKind::Colon);
                outputs = self.parse_asm_constraints();

                if self.token.kind == TokenKind::Colon {
                    self.eat(TokenKind::Colon);
                    clobbers = self.parse_asm_clobbers();
                }
            }
        }

        if !self.expect(TokenKind::RParen) {
            return None;
        }
        if !self.expect(TokenKind::Semicolon) {
            return None;
        }

        let inputs = self.ctx.slice(inputs);
        let outputs = self.ctx.slice(outputs);
        let clobbers = self.ctx.slice(clobbers);
        Some(self.ctx.stmt(
            StmtKind::Asm {
                is_volatile,
                text,
                inputs,
                outputs,
                clobbers,
            },
            loc,
        ))
    }
}
