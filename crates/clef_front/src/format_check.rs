//! Format string checking for the printf/scanf families.
//!
//! Dispatched by callee identity from the call checker: when a call to
//! a known formatted-I/O function carries a string literal in the
//! format position, the conversion specifications are parsed and
//! matched against the variadic arguments for count and rough argument
//! class.  Everything it finds is a warning; the check never rejects a
//! program.

use crate::ast::{Expr, ExprKind, UnaryOp};
use crate::types::TypeArena;
use clef_base::{Diagnostics, Interner, Loc};

/// Functions with a format string, and which argument it is.
const FORMAT_FUNCTIONS: &[(&str, usize, bool)] = &[
    ("printf", 0, false),
    ("fprintf", 1, false),
    ("sprintf", 1, false),
    ("snprintf", 2, false),
    ("scanf", 0, true),
    ("fscanf", 1, true),
    ("sscanf", 1, true),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArgClass {
    Integer,
    Float,
    Pointer,
}

impl ArgClass {
    fn name(self) -> &'static str {
        match self {
            ArgClass::Integer => "an integer",
            ArgClass::Float => "a floating point",
            ArgClass::Pointer => "a pointer",
        }
    }
}

fn strip_casts<'x, 'a>(mut expression: &'x Expr<'a>) -> &'x Expr<'a> {
    while let ExprKind::Unary {
        op: UnaryOp::Cast | UnaryOp::ImplicitCast,
        value,
    } = &expression.kind
    {
        expression = value;
    }
    expression
}

/// Checks a call's format string against its arguments.  `function` is
/// the callee expression, `arguments` the full argument list.
pub fn check_format(
    function: &Expr<'_>,
    arguments: &[&Expr<'_>],
    types: &TypeArena,
    interner: &Interner,
    diags: &mut Diagnostics,
) {
    let ExprKind::Reference { symbol, .. } = &function.kind else {
        return;
    };
    let name = interner.resolve(*symbol);
    let Some((_, format_index, is_scan)) = FORMAT_FUNCTIONS
        .iter()
        .find(|(candidate, _, _)| *candidate == name)
        .copied()
    else {
        return;
    };

    let Some(format_argument) = arguments.get(format_index) else {
        return;
    };
    let ExprKind::StringLiteral(format) = &strip_casts(format_argument).kind else {
        return;
    };

    let mut remaining = arguments.iter().skip(format_index + 1);
    let mut index = format_index + 1;
    let loc = format_argument.loc;

    let mut bytes = format.iter().copied().peekable();
    while let Some(byte) = bytes.next() {
        if byte != b'%' {
            continue;
        }
        // flags
        while matches!(bytes.peek().copied(), Some(b'-' | b'+' | b' ' | b'0' | b'#' | b'\'')) {
            bytes.next();
        }
        // width
        if bytes.peek() == Some(&b'*') {
            bytes.next();
            check_one(
                remaining.next().copied(),
                &mut index,
                ArgClass::Integer,
                '*',
                loc,
                types,
                diags,
            );
        } else {
            while matches!(bytes.peek().copied(), Some(b'0'..=b'9')) {
                bytes.next();
            }
        }
        // precision
        if bytes.peek() == Some(&b'.') {
            bytes.next();
            if bytes.peek() == Some(&b'*') {
                bytes.next();
                check_one(
                    remaining.next().copied(),
                    &mut index,
                    ArgClass::Integer,
                    '*',
                    loc,
                    types,
                    diags,
                );
            } else {
                while matches!(bytes.peek().copied(), Some(b'0'..=b'9')) {
                    bytes.next();
                }
            }
        }
        // length modifiers
        while matches!(
            bytes.peek().copied(),
            Some(b'h' | b'l' | b'L' | b'j' | b'z' | b't' | b'q')
        ) {
            bytes.next();
        }

        let Some(conversion) = bytes.next() else {
            diags.warning(loc, "format string ends in the middle of a conversion");
            break;
        };
        if conversion == b'%' {
            continue;
        }

        let expected = if is_scan {
            ArgClass::Pointer
        } else {
            match conversion {
                b'd' | b'i' | b'u' | b'o' | b'x' | b'X' | b'c' => ArgClass::Integer,
                b'e' | b'E' | b'f' | b'F' | b'g' | b'G' | b'a' | b'A' => ArgClass::Float,
                b's' | b'p' | b'n' => ArgClass::Pointer,
                other => {
                    diags.warning(
                        loc,
                        format!("unknown conversion character '{}' in format", other as char),
                    );
                    continue;
                }
            }
        };

        check_one(
            remaining.next().copied(),
            &mut index,
            expected,
            conversion as char,
            loc,
            types,
            diags,
        );
    }

    let surplus = remaining.count();
    if surplus > 0 {
        diags.warning(loc, "too many arguments for format");
    }
}

#[allow(clippy::too_many_arguments)]
fn check_one(
    argument: Option<&Expr<'_>>,
    index: &mut usize,
    expected: ArgClass,
    conversion: char,
    loc: Loc,
    types: &TypeArena,
    diags: &mut Diagnostics,
) {
    *index += 1;
    let Some(argument) = argument else {
        diags.warning(loc, "too few arguments for format");
        return;
    };

    let ty = types.skip_alias(argument.ty());
    let class = if types.is_pointer(ty) {
        ArgClass::Pointer
    } else if types.is_float(ty) {
        ArgClass::Float
    } else if types.is_integer(ty) {
        ArgClass::Integer
    } else {
        // error type or aggregate; the call checker already complained
        return;
    };

    if class != expected {
        diags.warning(
            argument.loc,
            format!(
                "format '%{}' expects {} argument, but argument {} is {}",
                conversion,
                expected.name(),
                index,
                class.name()
            ),
        );
    }
}
