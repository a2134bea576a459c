//! Initializer parsing.
//!
//! An initializer is an assignment expression or a brace-enclosed
//! list.  Lists descend recursively into array elements and struct
//! fields in declaration order; a sub-expression that does not match
//! the element type is offered to the parent type, which is how
//! `struct point p = { 1, 2 }` and `struct point ps[] = { p0, p1 }`
//! both work.  Designators are parsed and skipped, not matched; using
//! the wrong designator form for the target is diagnosed.

use super::Parser;
use crate::ast::{Expr, ExprKind, Initializer};
use crate::token::TokenKind;
use crate::types::{AtomicKind, TypeKind, TypeRef};

impl<'a, 'e> Parser<'a, 'e> {
    /// Parses an initializer for an object of (alias-free) type `ty`.
    pub(crate) fn parse_initializer(&mut self, ty: TypeRef) -> Option<&'a Initializer<'a>> {
        if self.token.kind != TokenKind::LBrace {
            let expression = self.parse_assignment_expression();
            let initializer = self.initializer_from_expression(ty, expression);
            if initializer.is_none() {
                let shown_expr = self.display_type(expression.ty());
                let shown_target = self.display_type(ty);
                self.diags.error(
                    expression.loc,
                    format!(
                        "initializer expression of type '{}' is incompatible with type '{}'",
                        shown_expr, shown_target
                    ),
                );
            }
            return initializer;
        }

        if self.types.is_scalar(ty) {
            // §6.7.8.11: braces around a scalar initializer
            self.eat(TokenKind::LBrace);
            let expression = self.parse_assignment_expression();
            let result = self.initializer_from_expression(ty, expression);
            if self.token.kind == TokenKind::Comma {
                self.next_token();
            }
            if !self.expect(TokenKind::RBrace) {
                return result;
            }
            result
        } else {
            self.parse_sub_initializer(ty, None)
        }
    }

    /// A single expression initializing `ty`: the char-array-from-
    /// string special cases, otherwise the assignment rules with an
    /// implicit cast.
    fn initializer_from_expression(
        &mut self,
        ty: TypeRef,
        expression: &'a Expr<'a>,
    ) -> Option<&'a Initializer<'a>> {
        let target = self.types.skip_typeref(ty);

        // §6.7.8.14/15: a char array may take a string literal, a
        // wchar_t array a wide one
        if let Some(element) = self.types.array_element(target) {
            let element = self.types.skip_typeref(element);
            match &expression.kind {
                ExprKind::StringLiteral(bytes) => {
                    if self.types.is_atomic(element, AtomicKind::Char) {
                        return Some(self.ctx.initializer(Initializer::String(*bytes)));
                    }
                }
                ExprKind::WideStringLiteral(chars) => {
                    let unqual = self.types.unqualified(element);
                    let bare_wchar = self.types.skip_typeref(self.type_wchar_t);
                    if unqual == bare_wchar {
                        return Some(self.ctx.initializer(Initializer::WideString(*chars)));
                    }
                }
                _ => {}
            }
        }

        let res_type = self.semantic_assign(ty, expression, "initializer")?;
        let value = self.create_implicit_cast(expression, res_type);
        Some(self.ctx.initializer(Initializer::Value(value)))
    }

    fn parse_sub_initializer_elem(&mut self, ty: TypeRef) -> Option<&'a Initializer<'a>> {
        if self.token.kind == TokenKind::LBrace {
            return self.parse_sub_initializer(ty, None);
        }
        let expression = self.parse_assignment_expression();
        self.parse_sub_initializer(ty, Some(expression))
    }

    /// Skips a designator chain (`.field` / `[index]`) without
    /// matching it against the target.
    fn skip_designator(&mut self) {
        loop {
            match self.token.kind {
                TokenKind::Dot => {
                    self.next_token();
                    if matches!(self.token.kind, TokenKind::Identifier(_)) {
                        self.next_token();
                    }
                }
                TokenKind::LBracket => {
                    self.next_token();
                    let _ = self.parse_constant_expression();
                    if self.token.kind == TokenKind::RBracket {
                        self.next_token();
                    }
                }
                _ => break,
            }
            if self.token.kind == TokenKind::Assign {
                self.next_token();
                break;
            }
        }
    }

    fn parse_sub_initializer(
        &mut self,
        ty: TypeRef,
        expression: Option<&'a Expr<'a>>,
    ) -> Option<&'a Initializer<'a>> {
        let ty = self.types.skip_typeref(ty);

        if !self.types.is_valid(ty) {
            // error recovery: swallow whatever initializes the bad type
            if self.token.kind == TokenKind::LBrace {
                self.eat_block();
                return None;
            }
            let expression = match expression {
                Some(e) => e,
                None => self.parse_assignment_expression(),
            };
            return Some(self.ctx.initializer(Initializer::Value(expression)));
        }

        if self.types.is_scalar(ty) {
            // there might be extra {} hierarchies
            if self.token.kind == TokenKind::LBrace {
                self.next_token();
                if !self.had_initializer_brace_warning {
                    let loc = self.here();
                    self.diags
                        .warning(loc, "braces around scalar initializer");
                    self.had_initializer_brace_warning = true;
                }
                let result = self.parse_sub_initializer(ty, None);
                if self.token.kind == TokenKind::Comma {
                    self.next_token();
                }
                if !self.expect_block(TokenKind::RBrace) {
                    return None;
                }
                return result;
            }

            let expression = match expression {
                Some(e) => e,
                None => self.parse_assignment_expression(),
            };
            return self.initializer_from_expression(ty, expression);
        }

        // does the expression match the object being initialized?
        if let Some(e) = expression {
            if let Some(result) = self.initializer_from_expression(ty, e) {
                return Some(result);
            }
        }

        let read_brace = if self.token.kind == TokenKind::LBrace {
            self.next_token();
            true
        } else {
            false
        };

        let mut elems: Vec<&'a Initializer<'a>> = Vec::new();

        let array_element = self.types.array_element(ty);
        if let Some(element) = array_element {
            if self.token.kind == TokenKind::Dot {
                let shown = self.display_type(ty);
                let loc = self.here();
                self.diags.error(
                    loc,
                    format!("compound designator in initializer for array type '{}'", shown),
                );
                self.skip_designator();
            } else if self.token.kind == TokenKind::LBracket {
                self.skip_designator();
            }

            let element_type = self.types.skip_typeref(element);

            self.had_initializer_brace_warning = false;
            let sub = match expression {
                None => self.parse_sub_initializer_elem(element_type),
                Some(e) => self.parse_sub_initializer(element_type, Some(e)),
            };

            // didn't match the subtype: offer the parent type
            let Some(sub) = sub else {
                if read_brace {
                    self.eat_block();
                }
                return None;
            };
            elems.push(sub);

            loop {
                if self.token.kind == TokenKind::RBrace {
                    break;
                }
                if !self.expect_block(TokenKind::Comma) {
                    return None;
                }
                if self.token.kind == TokenKind::RBrace {
                    break;
                }
                if matches!(self.token.kind, TokenKind::Dot | TokenKind::LBracket) {
                    if self.token.kind == TokenKind::Dot {
                        let shown = self.display_type(ty);
                        let loc = self.here();
                        self.diags.error(
                            loc,
                            format!(
                                "compound designator in initializer for array type '{}'",
                                shown
                            ),
                        );
                    }
                    self.skip_designator();
                }

                let Some(sub) = self.parse_sub_initializer_elem(element_type) else {
                    let loc = self.here();
                    self.diags.error(loc, "member initializer didn't match");
                    return None;
                };
                elems.push(sub);
            }
        } else {
            let tag = match *self.types.kind(ty) {
                TypeKind::Struct(tag) | TypeKind::Union(tag) => tag,
                _ => panic!("initializer for a non-aggregate type"),
            };

            if self.token.kind == TokenKind::LBracket {
                let shown = self.display_type(ty);
                let loc = self.here();
                self.diags.error(
                    loc,
                    format!(
                        "array designator in initializer for compound type '{}'",
                        shown
                    ),
                );
                self.skip_designator();
            } else if self.token.kind == TokenKind::Dot {
                self.skip_designator();
            }

            let members: Vec<_> = self
                .decls
                .members_of(tag)
                .filter(|member| {
                    self.decls.get(*member).namespace == crate::ast::Namespace::Ordinary
                })
                .collect();
            let Some(first) = members.first() else {
                if read_brace {
                    self.eat_block();
                }
                return None;
            };

            let first_type = self
                .decls
                .get(*first)
                .ty
                .unwrap_or_else(|| self.types.error_type());
            let first_type = self.types.skip_typeref(first_type);

            self.had_initializer_brace_warning = false;
            let sub = match expression {
                None => self.parse_sub_initializer_elem(first_type),
                Some(e) => self.parse_sub_initializer(first_type, Some(e)),
            };
            let Some(sub) = sub else {
                if read_brace {
                    self.eat_block();
                }
                return None;
            };
            elems.push(sub);

            for member in members.iter().skip(1) {
                if self.decls.get(*member).symbol.is_none() {
                    continue;
                }
                if self.token.kind == TokenKind::RBrace {
                    break;
                }
                if !self.expect_block(TokenKind::Comma) {
                    return None;
                }
                if self.token.kind == TokenKind::RBrace {
                    break;
                }
                if matches!(self.token.kind, TokenKind::Dot | TokenKind::LBracket) {
                    self.skip_designator();
                }

                let member_type = self
                    .decls
                    .get(*member)
                    .ty
                    .unwrap_or_else(|| self.types.error_type());
                let member_type = self.types.skip_typeref(member_type);

                let Some(sub) = self.parse_sub_initializer_elem(member_type) else {
                    let loc = self.here();
                    self.diags.error(loc, "member initializer didn't match");
                    return None;
                };
                elems.push(sub);
            }
        }

        let entries = self.ctx.slice(elems);
        let result = self.ctx.initializer(Initializer::List(entries));

        if read_brace {
            if self.token.kind == TokenKind::Comma {
                self.next_token();
            }
            if !self.expect(TokenKind::RBrace) {
                return None;
            }
        }
        Some(result)
    }
}
