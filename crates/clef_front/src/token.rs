//! Token kinds produced by the C lexer.
//!
//! Constants carry their value and their suffix-determined type, so the
//! parser never re-reads spellings.  Character constants arrive as
//! [`TokenKind::Integer`] of type `int` (or `wchar_t` for `L'x'`),
//! matching the C value model.  Adjacent narrow string literals are
//! already concatenated when a [`TokenKind::StringLiteral`] reaches the
//! parser.

use crate::types::AtomicKind;
use clef_base::{Loc, Symbol};
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Payload-carrying tokens
    Identifier(Symbol),
    Integer { value: i64, ty: AtomicKind },
    Float { value: f64, ty: AtomicKind },
    StringLiteral(Vec<u8>),
    WideStringLiteral(Vec<u32>),

    // Keywords
    Auto,
    Break,
    Case,
    Char,
    Const,
    Continue,
    Default,
    Do,
    Double,
    Else,
    Enum,
    Extern,
    Float_,
    For,
    Goto,
    If,
    Inline,
    Int,
    Long,
    Register,
    Restrict,
    Return,
    Short,
    Signed,
    Sizeof,
    Static,
    Struct,
    Switch,
    Typedef,
    Union,
    Unsigned,
    Void,
    Volatile,
    While,
    Bool,
    Complex,
    Imaginary,

    // GNU extensions
    Thread,
    Extension,
    Attribute,
    Typeof,
    Alignof,
    Asm,
    Func,
    PrettyFunc,
    BuiltinVaList,
    BuiltinOffsetof,
    BuiltinVaStart,
    BuiltinVaArg,
    BuiltinVaEnd,
    BuiltinExpect,
    BuiltinAlloca,
    BuiltinNan,
    BuiltinNanf,
    BuiltinNand,
    BuiltinConstantP,
    BuiltinPrefetch,
    BuiltinIsGreater,
    BuiltinIsGreaterEqual,
    BuiltinIsLess,
    BuiltinIsLessEqual,
    BuiltinIsLessGreater,
    BuiltinIsUnordered,
    BuiltinClassifyType,

    // Punctuation
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Semicolon,
    Comma,
    Colon,
    Question,
    Tilde,
    Dot,
    Arrow,
    Ellipsis,
    PlusPlus,
    MinusMinus,
    Amp,
    AmpAmp,
    Pipe,
    PipePipe,
    Caret,
    Exclaim,
    Assign,
    EqualEqual,
    ExclaimEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    LessLess,
    GreaterGreater,
    PlusAssign,
    MinusAssign,
    StarAssign,
    SlashAssign,
    PercentAssign,
    LessLessAssign,
    GreaterGreaterAssign,
    AmpAssign,
    PipeAssign,
    CaretAssign,

    Eof,
}

impl TokenKind {
    /// The canonical spelling of a fixed token, `None` for tokens that
    /// carry a payload.
    pub fn spelling(&self) -> Option<&'static str> {
        use TokenKind::*;
        let s = match self {
            Auto => "auto",
            Break => "break",
            Case => "case",
            Char => "char",
            Const => "const",
            Continue => "continue",
            Default => "default",
            Do => "do",
            Double => "double",
            Else => "else",
            Enum => "enum",
            Extern => "extern",
            Float_ => "float",
            For => "for",
            Goto => "goto",
            If => "if",
            Inline => "inline",
            Int => "int",
            Long => "long",
            Register => "register",
            Restrict => "restrict",
            Return => "return",
            Short => "short",
            Signed => "signed",
            Sizeof => "sizeof",
            Static => "static",
            Struct => "struct",
            Switch => "switch",
            Typedef => "typedef",
            Union => "union",
            Unsigned => "unsigned",
            Void => "void",
            Volatile => "volatile",
            While => "while",
            Bool => "_Bool",
            Complex => "_Complex",
            Imaginary => "_Imaginary",
            Thread => "__thread",
            Extension => "__extension__",
            Attribute => "__attribute__",
            Typeof => "__typeof__",
            Alignof => "__alignof__",
            Asm => "asm",
            Func => "__func__",
            PrettyFunc => "__PRETTY_FUNCTION__",
            BuiltinVaList => "__builtin_va_list",
            BuiltinOffsetof => "__builtin_offsetof",
            BuiltinVaStart => "__builtin_va_start",
            BuiltinVaArg => "__builtin_va_arg",
            BuiltinVaEnd => "__builtin_va_end",
            BuiltinExpect => "__builtin_expect",
            BuiltinAlloca => "__builtin_alloca",
            BuiltinNan => "__builtin_nan",
            BuiltinNanf => "__builtin_nanf",
            BuiltinNand => "__builtin_nand",
            BuiltinConstantP => "__builtin_constant_p",
            BuiltinPrefetch => "__builtin_prefetch",
            BuiltinIsGreater => "__builtin_isgreater",
            BuiltinIsGreaterEqual => "__builtin_isgreaterequal",
            BuiltinIsLess => "__builtin_isless",
            BuiltinIsLessEqual => "__builtin_islessequal",
            BuiltinIsLessGreater => "__builtin_islessgreater",
            BuiltinIsUnordered => "__builtin_isunordered",
            BuiltinClassifyType => "__builtin_classify_type",
            LParen => "(",
            RParen => ")",
            LBracket => "[",
            RBracket => "]",
            LBrace => "{",
            RBrace => "}",
            Semicolon => ";",
            Comma => ",",
            Colon => ":",
            Question => "?",
            Tilde => "~",
            Dot => ".",
            Arrow => "->",
            Ellipsis => "...",
            PlusPlus => "++",
            MinusMinus => "--",
            Amp => "&",
            AmpAmp => "&&",
            Pipe => "|",
            PipePipe => "||",
            Caret => "^",
            Exclaim => "!",
            Assign => "=",
            EqualEqual => "==",
            ExclaimEqual => "!=",
            Less => "<",
            LessEqual => "<=",
            Greater => ">",
            GreaterEqual => ">=",
            Plus => "+",
            Minus => "-",
            Star => "*",
            Slash => "/",
            Percent => "%",
            LessLess => "<<",
            GreaterGreater => ">>",
            PlusAssign => "+=",
            MinusAssign => "-=",
            StarAssign => "*=",
            SlashAssign => "/=",
            PercentAssign => "%=",
            LessLessAssign => "<<=",
            GreaterGreaterAssign => ">>=",
            AmpAssign => "&=",
            PipeAssign => "|=",
            CaretAssign => "^=",
            Eof => "end of file",
            Identifier(_) | Integer { .. } | Float { .. } | StringLiteral(_)
            | WideStringLiteral(_) => return None,
        };
        Some(s)
    }

    /// Human-readable description used in diagnostics, resolving
    /// identifier spellings through the symbol table.
    pub fn describe(&self, interner: &clef_base::Interner) -> String {
        match self {
            TokenKind::Identifier(sym) => format!("'{}'", interner.resolve(*sym)),
            TokenKind::Integer { value, .. } => format!("'{}'", value),
            TokenKind::Float { value, .. } => format!("'{}'", value),
            TokenKind::StringLiteral(_) => "string literal".to_string(),
            TokenKind::WideStringLiteral(_) => "wide string literal".to_string(),
            other => format!("'{}'", other.spelling().unwrap_or("?")),
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.spelling() {
            Some(s) => f.write_str(s),
            None => match self {
                TokenKind::Identifier(_) => f.write_str("identifier"),
                TokenKind::Integer { value, .. } => write!(f, "{}", value),
                TokenKind::Float { value, .. } => write!(f, "{}", value),
                TokenKind::StringLiteral(_) => f.write_str("string literal"),
                TokenKind::WideStringLiteral(_) => f.write_str("wide string literal"),
                _ => unreachable!(),
            },
        }
    }
}

/// All reserved words and the token kinds they map to.  The lexer
/// pre-interns these so identifier classification is a symbol lookup.
pub fn keywords() -> &'static [(&'static str, TokenKind)] {
    use TokenKind::*;
    &[
        ("auto", Auto),
        ("break", Break),
        ("case", Case),
        ("char", Char),
        ("const", Const),
        ("continue", Continue),
        ("default", Default),
        ("do", Do),
        ("double", Double),
        ("else", Else),
        ("enum", Enum),
        ("extern", Extern),
        ("float", Float_),
        ("for", For),
        ("goto", Goto),
        ("if", If),
        ("inline", Inline),
        ("int", Int),
        ("long", Long),
        ("register", Register),
        ("restrict", Restrict),
        ("return", Return),
        ("short", Short),
        ("signed", Signed),
        ("sizeof", Sizeof),
        ("static", Static),
        ("struct", Struct),
        ("switch", Switch),
        ("typedef", Typedef),
        ("union", Union),
        ("unsigned", Unsigned),
        ("void", Void),
        ("volatile", Volatile),
        ("while", While),
        ("_Bool", Bool),
        ("_Complex", Complex),
        ("_Imaginary", Imaginary),
        ("__thread", Thread),
        ("__extension__", Extension),
        ("__attribute__", Attribute),
        ("__typeof__", Typeof),
        ("typeof", Typeof),
        ("__alignof__", Alignof),
        ("__alignof", Alignof),
        ("_Alignof", Alignof),
        ("asm", Asm),
        ("__asm__", Asm),
        ("__func__", Func),
        ("__FUNCTION__", Func),
        ("__PRETTY_FUNCTION__", PrettyFunc),
        ("__builtin_va_list", BuiltinVaList),
        ("__builtin_offsetof", BuiltinOffsetof),
        ("__builtin_va_start", BuiltinVaStart),
        ("__builtin_va_arg", BuiltinVaArg),
        ("__builtin_va_end", BuiltinVaEnd),
        ("__builtin_expect", BuiltinExpect),
        ("__builtin_alloca", BuiltinAlloca),
        ("__builtin_nan", BuiltinNan),
        ("__builtin_nanf", BuiltinNanf),
        ("__builtin_nand", BuiltinNand),
        ("__builtin_constant_p", BuiltinConstantP),
        ("__builtin_prefetch", BuiltinPrefetch),
        ("__builtin_isgreater", BuiltinIsGreater),
        ("__builtin_isgreaterequal", BuiltinIsGreaterEqual),
        ("__builtin_isless", BuiltinIsLess),
        ("__builtin_islessequal", BuiltinIsLessEqual),
        ("__builtin_islessgreater", BuiltinIsLessGreater),
        ("__builtin_isunordered", BuiltinIsUnordered),
        ("__builtin_classify_type", BuiltinClassifyType),
    ]
}

/// A lexed token: kind plus source position.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub loc: Loc,
}

impl Token {
    pub fn new(kind: TokenKind, loc: Loc) -> Self {
        Token { kind, loc }
    }

    pub fn eof() -> Self {
        Token {
            kind: TokenKind::Eof,
            loc: Loc::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_tokens_have_spellings() {
        assert_eq!(TokenKind::While.spelling(), Some("while"));
        assert_eq!(TokenKind::Arrow.spelling(), Some("->"));
        assert_eq!(TokenKind::Ellipsis.spelling(), Some("..."));
    }

    #[test]
    fn payload_tokens_have_no_spelling() {
        let kind = TokenKind::Integer {
            value: 1,
            ty: AtomicKind::Int,
        };
        assert_eq!(kind.spelling(), None);
    }

    #[test]
    fn keyword_table_contains_all_c99_keywords() {
        let table = keywords();
        for kw in [
            "auto", "break", "case", "char", "const", "continue", "default", "do", "double",
            "else", "enum", "extern", "float", "for", "goto", "if", "inline", "int", "long",
            "register", "restrict", "return", "short", "signed", "sizeof", "static", "struct",
            "switch", "typedef", "union", "unsigned", "void", "volatile", "while", "_Bool",
        ] {
            assert!(
                table.iter().any(|(s, _)| *s == kw),
                "missing keyword {}",
                kw
            );
        }
    }

    #[test]
    fn describe_resolves_identifiers() {
        let mut interner = clef_base::Interner::new();
        let sym = interner.intern("counter");
        let kind = TokenKind::Identifier(sym);
        assert_eq!(kind.describe(&interner), "'counter'");
    }
}
