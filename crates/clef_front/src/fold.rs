//! Constant expression evaluation.
//!
//! Case labels, array extents, enum values and bitfield widths all
//! require integer constant expressions.  [`fold`] evaluates an
//! expression tree to an `i64` where the C constant-expression rules
//! allow it and returns `None` otherwise; callers decide whether
//! `None` is an error.
//!
//! Folding follows the annotated types: casts truncate and sign-extend
//! to the destination width, `sizeof`/`_Alignof` use the LP64 layout
//! model, enum references read the value recorded on their entry.

use crate::ast::{BinaryOp, ConstValue, DeclArena, DeclPayload, Expr, ExprKind, UnaryOp};
use crate::types::{AtomicKind, TypeArena, TypeKind};

/// Evaluates an integer constant expression, `None` if it is not one.
pub fn fold(expr: &Expr<'_>, decls: &DeclArena<'_>, types: &TypeArena) -> Option<i64> {
    match &expr.kind {
        ExprKind::Const(ConstValue::Int(v)) => Some(*v),
        ExprKind::Const(ConstValue::Float(_)) => None,

        ExprKind::Reference { decl: Some(d), .. } => match decls.get(*d).payload {
            DeclPayload::EnumValue { value, .. } => Some(value),
            _ => None,
        },

        ExprKind::Unary { op, value } => {
            let inner = fold(value, decls, types);
            match op {
                UnaryOp::Plus => inner,
                UnaryOp::Negate => inner.map(i64::wrapping_neg),
                UnaryOp::BitNot => inner.map(|v| !v),
                UnaryOp::Not => inner.map(|v| (v == 0) as i64),
                UnaryOp::Cast | UnaryOp::ImplicitCast => {
                    inner.and_then(|v| truncate(expr.ty(), v, types))
                }
                _ => None,
            }
        }

        ExprKind::Binary { op, left, right } => {
            let l = fold(left, decls, types)?;
            match op {
                BinaryOp::LogicalAnd => {
                    if l == 0 {
                        return Some(0);
                    }
                    fold(right, decls, types).map(|r| (r != 0) as i64)
                }
                BinaryOp::LogicalOr => {
                    if l != 0 {
                        return Some(1);
                    }
                    fold(right, decls, types).map(|r| (r != 0) as i64)
                }
                BinaryOp::Expect => Some(l),
                _ => {
                    let r = fold(right, decls, types)?;
                    match op {
                        BinaryOp::Add => Some(l.wrapping_add(r)),
                        BinaryOp::Sub => Some(l.wrapping_sub(r)),
                        BinaryOp::Mul => Some(l.wrapping_mul(r)),
                        BinaryOp::Div => (r != 0).then(|| l.wrapping_div(r)),
                        BinaryOp::Mod => (r != 0).then(|| l.wrapping_rem(r)),
                        BinaryOp::BitAnd => Some(l & r),
                        BinaryOp::BitOr => Some(l | r),
                        BinaryOp::BitXor => Some(l ^ r),
                        BinaryOp::ShiftLeft => Some(l.wrapping_shl(r as u32 & 63)),
                        BinaryOp::ShiftRight => Some(l.wrapping_shr(r as u32 & 63)),
                        BinaryOp::Equal => Some((l == r) as i64),
                        BinaryOp::NotEqual => Some((l != r) as i64),
                        BinaryOp::Less => Some((l < r) as i64),
                        BinaryOp::LessEqual => Some((l <= r) as i64),
                        BinaryOp::Greater => Some((l > r) as i64),
                        BinaryOp::GreaterEqual => Some((l >= r) as i64),
                        _ => None,
                    }
                }
            }
        }

        ExprKind::Conditional {
            condition,
            true_expr,
            false_expr,
        } => {
            let c = fold(condition, decls, types)?;
            if c != 0 {
                fold(true_expr, decls, types)
            } else {
                fold(false_expr, decls, types)
            }
        }

        ExprKind::TypeProp {
            is_alignof,
            queried,
            ..
        } => {
            let n = if *is_alignof {
                types.align_of(*queried, decls)?
            } else {
                types.size_of(*queried, decls)?
            };
            Some(n as i64)
        }

        ExprKind::BuiltinConstantP { value } => {
            Some(fold(value, decls, types).is_some() as i64)
        }

        ExprKind::OffsetOf {
            queried,
            designators,
        } => {
            let mut ty = types.skip_alias(*queried);
            let mut offset: u64 = 0;
            for designator in designators.iter() {
                if let Some(symbol) = designator.symbol {
                    let tag = match types.kind(ty) {
                        TypeKind::Struct(d) | TypeKind::Union(d) => *d,
                        _ => return None,
                    };
                    let is_union = matches!(types.kind(ty), TypeKind::Union(_));
                    let mut member_offset: u64 = 0;
                    let mut found = None;
                    for member in decls.members_of(tag) {
                        let member_decl = decls.get(member);
                        let member_ty = member_decl.ty?;
                        if !is_union {
                            let align = types.align_of(member_ty, decls)?;
                            member_offset = (member_offset + align - 1) / align * align;
                        }
                        if member_decl.symbol == Some(symbol) {
                            found = Some((member_offset, member_ty));
                            break;
                        }
                        if !is_union {
                            member_offset += types.size_of(member_ty, decls)?;
                        }
                    }
                    let (off, member_ty) = found?;
                    offset += off;
                    ty = types.skip_alias(member_ty);
                } else if let Some(index) = designator.index {
                    let element = match types.kind(ty) {
                        TypeKind::Array { element, .. } => *element,
                        _ => return None,
                    };
                    let i = fold(index, decls, types)?;
                    offset += types.size_of(element, decls)? * i as u64;
                    ty = types.skip_alias(element);
                }
            }
            Some(offset as i64)
        }

        _ => None,
    }
}

/// `true` for the `0` integer constant, looking through casts:
/// the null pointer constant of the assignment rules.
pub fn is_null_pointer_constant(
    mut expr: &Expr<'_>,
    types: &TypeArena,
) -> bool {
    while let ExprKind::Unary {
        op: UnaryOp::Cast | UnaryOp::ImplicitCast,
        value,
    } = &expr.kind
    {
        expr = value;
    }
    match &expr.kind {
        ExprKind::Const(ConstValue::Int(0)) => {
            let ty = types.skip_alias(expr.ty());
            types.is_integer(ty)
        }
        _ => false,
    }
}

/// Truncates and re-extends `v` to the width and signedness of the
/// destination type of a cast.
fn truncate(ty: crate::types::TypeRef, v: i64, types: &TypeArena) -> Option<i64> {
    let ty = types.skip_alias(ty);
    let kind = match types.kind(ty) {
        TypeKind::Atomic(k) => *k,
        TypeKind::Enum(_) => AtomicKind::Int,
        _ => return None,
    };
    if kind == AtomicKind::Bool {
        return Some((v != 0) as i64);
    }
    if !kind.is_integer() {
        return None;
    }
    let bits = kind.size() * 8;
    if bits >= 64 {
        return Some(v);
    }
    let masked = (v as u64) & ((1u64 << bits) - 1);
    if kind.is_signed() && masked >> (bits - 1) != 0 {
        Some((masked as i64) | !(((1u64 << bits) - 1) as i64))
    } else {
        Some(masked as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::AstContext;
    use clef_base::{Arena, Loc};

    fn int_const<'a>(ctx: AstContext<'a>, types: &mut TypeArena, v: i64) -> &'a Expr<'a> {
        let int = types.atomic(AtomicKind::Int);
        ctx.expr(ExprKind::Const(ConstValue::Int(v)), int, Loc::default())
    }

    #[test]
    fn arithmetic_folds() {
        let arena = Arena::new();
        let ctx = AstContext::new(&arena);
        let mut types = TypeArena::new();
        let decls = DeclArena::new();
        let int = types.atomic(AtomicKind::Int);

        let l = int_const(ctx, &mut types, 6);
        let r = int_const(ctx, &mut types, 7);
        let mul = ctx.expr(
            ExprKind::Binary {
                op: BinaryOp::Mul,
                left: l,
                right: r,
            },
            int,
            Loc::default(),
        );
        assert_eq!(fold(mul, &decls, &types), Some(42));
    }

    #[test]
    fn division_by_zero_does_not_fold() {
        let arena = Arena::new();
        let ctx = AstContext::new(&arena);
        let mut types = TypeArena::new();
        let decls = DeclArena::new();
        let int = types.atomic(AtomicKind::Int);

        let l = int_const(ctx, &mut types, 1);
        let r = int_const(ctx, &mut types, 0);
        let div = ctx.expr(
            ExprKind::Binary {
                op: BinaryOp::Div,
                left: l,
                right: r,
            },
            int,
            Loc::default(),
        );
        assert_eq!(fold(div, &decls, &types), None);
    }

    #[test]
    fn casts_truncate_to_destination_width() {
        let arena = Arena::new();
        let ctx = AstContext::new(&arena);
        let mut types = TypeArena::new();
        let decls = DeclArena::new();
        let ch = types.atomic(AtomicKind::Char);

        let v = int_const(ctx, &mut types, 0x1ff);
        let cast = ctx.expr(
            ExprKind::Unary {
                op: UnaryOp::Cast,
                value: v,
            },
            ch,
            Loc::default(),
        );
        assert_eq!(fold(cast, &decls, &types), Some(-1));
    }

    #[test]
    fn logical_operators_short_circuit() {
        let arena = Arena::new();
        let ctx = AstContext::new(&arena);
        let mut types = TypeArena::new();
        let decls = DeclArena::new();
        let int = types.atomic(AtomicKind::Int);

        let zero = int_const(ctx, &mut types, 0);
        // right side is not a constant, but `0 &&` decides anyway
        let non_const = ctx.expr(ExprKind::Error, int, Loc::default());
        let and = ctx.expr(
            ExprKind::Binary {
                op: BinaryOp::LogicalAnd,
                left: zero,
                right: non_const,
            },
            int,
            Loc::default(),
        );
        assert_eq!(fold(and, &decls, &types), Some(0));
    }

    #[test]
    fn sizeof_folds_with_the_layout_model() {
        let arena = Arena::new();
        let ctx = AstContext::new(&arena);
        let mut types = TypeArena::new();
        let decls = DeclArena::new();
        let long = types.atomic(AtomicKind::Long);
        let size_expr = ctx.expr(
            ExprKind::TypeProp {
                is_alignof: false,
                queried: long,
                operand: None,
            },
            long,
            Loc::default(),
        );
        assert_eq!(fold(size_expr, &decls, &types), Some(8));
    }

    #[test]
    fn null_pointer_constant_sees_through_casts() {
        let arena = Arena::new();
        let ctx = AstContext::new(&arena);
        let mut types = TypeArena::new();
        let int = types.atomic(AtomicKind::Int);
        let void = types.atomic(AtomicKind::Void);
        let void_ptr = types.pointer_to(void, crate::types::Qualifiers::NONE);

        let zero = ctx.expr(ExprKind::Const(ConstValue::Int(0)), int, Loc::default());
        assert!(is_null_pointer_constant(zero, &types));

        let cast = ctx.expr(
            ExprKind::Unary {
                op: UnaryOp::Cast,
                value: zero,
            },
            void_ptr,
            Loc::default(),
        );
        assert!(is_null_pointer_constant(cast, &types));

        let one = ctx.expr(ExprKind::Const(ConstValue::Int(1)), int, Loc::default());
        assert!(!is_null_pointer_constant(one, &types));
    }
}
