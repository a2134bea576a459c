//! The C lexer.
//!
//! Consumes preprocessed source text and produces [`Token`]s one at a
//! time.  The input is assumed to have gone through the preprocessor
//! already, so the only `#` lines handled here are linemarkers
//! (`# 42 "file.c"`), which redirect the reported positions, and
//! `#pragma`, which is skipped.
//!
//! The interesting classification work happens on constants:
//!
//! - integer constants pick their type from value and suffix following
//!   the C99 §6.4.4.1 candidate lists (octal/hex constants may fall
//!   over to an unsigned type, decimal ones never do);
//! - floating constants are typed `float`/`double`/`long double` by
//!   suffix;
//! - character constants become plain `int` tokens, `L'x'` becomes a
//!   `wchar_t`-typed one;
//! - adjacent narrow string literals are folded into a single token
//!   before the parser sees them.  Wide strings are not folded.
//!
//! Lexical errors are reported to the diagnostics sink and the lexer
//! resynchronizes at the next whitespace.

use crate::token::{keywords, Token, TokenKind};
use crate::types::AtomicKind;
use clef_base::{Diagnostics, FileId, Interner, Loc, Symbol};
use std::collections::HashMap;

pub struct Lexer<'src> {
    bytes: &'src [u8],
    pos: usize,
    file: FileId,
    line: u32,
    line_start: usize,
    at_line_start: bool,
    keywords: HashMap<Symbol, TokenKind>,
}

impl<'src> Lexer<'src> {
    /// Opens a character source under a display name.  All keywords are
    /// pre-interned so identifier classification is a single lookup.
    pub fn new(
        source: &'src str,
        display_name: &str,
        interner: &mut Interner,
        diags: &mut Diagnostics,
    ) -> Self {
        let mut keyword_map = HashMap::new();
        for (spelling, kind) in keywords() {
            keyword_map.insert(interner.intern(spelling), kind.clone());
        }
        Lexer {
            bytes: source.as_bytes(),
            pos: 0,
            file: diags.add_file(display_name),
            line: 1,
            line_start: 0,
            at_line_start: true,
            keywords: keyword_map,
        }
    }

    fn here(&self) -> Loc {
        Loc::new(
            self.file,
            self.line,
            (self.pos - self.line_start) as u32 + 1,
        )
    }

    fn peek(&self, offset: usize) -> u8 {
        *self.bytes.get(self.pos + offset).unwrap_or(&0)
    }

    fn current(&self) -> u8 {
        self.peek(0)
    }

    fn bump(&mut self) -> u8 {
        let c = self.current();
        self.pos += 1;
        if c == b'\n' {
            self.line += 1;
            self.line_start = self.pos;
            self.at_line_start = true;
        }
        c
    }

    fn at_eof(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    /// Produces the next token.  Returns an EOF token forever once the
    /// input is exhausted.
    pub fn next(&mut self, interner: &mut Interner, diags: &mut Diagnostics) -> Token {
        loop {
            self.skip_whitespace_and_comments(diags);
            let loc = self.here();
            if self.at_eof() {
                return Token::new(TokenKind::Eof, loc);
            }

            let c = self.current();
            if c == b'#' && self.at_line_start {
                self.read_line_directive(diags);
                continue;
            }
            self.at_line_start = false;

            if c == b'L' && (self.peek(1) == b'\'' || self.peek(1) == b'"') {
                self.bump();
                if self.current() == b'\'' {
                    return self.read_char_constant(loc, true, diags);
                }
                return self.read_wide_string(loc, diags);
            }
            if c.is_ascii_alphabetic() || c == b'_' {
                return self.read_identifier(loc, interner);
            }
            if c.is_ascii_digit() || (c == b'.' && self.peek(1).is_ascii_digit()) {
                return self.read_number(loc, diags);
            }
            if c == b'\'' {
                return self.read_char_constant(loc, false, diags);
            }
            if c == b'"' {
                return self.read_string(loc, diags);
            }

            if let Some(kind) = self.read_punctuator() {
                return Token::new(kind, loc);
            }

            diags.error(loc, format!("unknown character '{}'", c as char));
            self.bump();
        }
    }

    fn skip_whitespace_and_comments(&mut self, diags: &mut Diagnostics) {
        loop {
            match self.current() {
                b' ' | b'\t' | b'\r' | b'\n' | 0x0b | 0x0c if !self.at_eof() => {
                    self.bump();
                }
                b'/' if self.peek(1) == b'/' => {
                    while !self.at_eof() && self.current() != b'\n' {
                        self.bump();
                    }
                }
                b'/' if self.peek(1) == b'*' => {
                    let start = self.here();
                    self.bump();
                    self.bump();
                    loop {
                        if self.at_eof() {
                            diags.error(start, "unterminated comment");
                            break;
                        }
                        if self.current() == b'*' && self.peek(1) == b'/' {
                            self.bump();
                            self.bump();
                            break;
                        }
                        self.bump();
                    }
                }
                _ => break,
            }
        }
    }

    /// Handles `# <line> "<file>"` linemarkers and skips `#pragma` and
    /// any other directive that survived preprocessing.
    fn read_line_directive(&mut self, diags: &mut Diagnostics) {
        self.bump(); // '#'
        while matches!(self.current(), b' ' | b'\t') && !self.at_eof() {
            self.bump();
        }

        if self.current().is_ascii_digit() {
            let mut line: u32 = 0;
            while self.current().is_ascii_digit() {
                line = line.saturating_mul(10) + (self.bump() - b'0') as u32;
            }
            while matches!(self.current(), b' ' | b'\t') {
                self.bump();
            }
            let mut file = self.file;
            if self.current() == b'"' {
                self.bump();
                let start = self.pos;
                while !self.at_eof() && self.current() != b'"' && self.current() != b'\n' {
                    self.bump();
                }
                let name = String::from_utf8_lossy(&self.bytes[start..self.pos]).into_owned();
                if self.current() == b'"' {
                    self.bump();
                }
                file = diags.add_file(&name);
            }
            // flags after the file name are ignored
            while !self.at_eof() && self.current() != b'\n' {
                self.bump();
            }
            if !self.at_eof() {
                self.bump(); // newline
            }
            self.file = file;
            self.line = line;
            self.line_start = self.pos;
            self.at_line_start = true;
            return;
        }

        // '#pragma' and friends: skip the line
        while !self.at_eof() && self.current() != b'\n' {
            self.bump();
        }
    }

    fn read_identifier(&mut self, loc: Loc, interner: &mut Interner) -> Token {
        let start = self.pos;
        while self.current().is_ascii_alphanumeric() || self.current() == b'_' {
            self.bump();
        }
        let text = std::str::from_utf8(&self.bytes[start..self.pos]).unwrap_or("");
        let symbol = interner.intern(text);
        match self.keywords.get(&symbol) {
            Some(kind) => Token::new(kind.clone(), loc),
            None => Token::new(TokenKind::Identifier(symbol), loc),
        }
    }

    // ---- numbers ----

    fn read_number(&mut self, loc: Loc, diags: &mut Diagnostics) -> Token {
        if self.current() == b'0' && matches!(self.peek(1), b'x' | b'X') {
            return self.read_hex_number(loc, diags);
        }

        let start = self.pos;
        let mut is_float = self.current() == b'.';
        while self.current().is_ascii_digit() {
            self.bump();
        }
        if self.current() == b'.' {
            is_float = true;
            self.bump();
            while self.current().is_ascii_digit() {
                self.bump();
            }
        }
        if matches!(self.current(), b'e' | b'E') {
            is_float = true;
            self.bump();
            if matches!(self.current(), b'+' | b'-') {
                self.bump();
            }
            if !self.current().is_ascii_digit() {
                diags.error(self.here(), "exponent has no digits");
            }
            while self.current().is_ascii_digit() {
                self.bump();
            }
        }
        let text = std::str::from_utf8(&self.bytes[start..self.pos]).unwrap_or("0");

        if is_float {
            let value: f64 = text.parse().unwrap_or(0.0);
            let ty = self.read_float_suffix(diags);
            return Token::new(TokenKind::Float { value, ty }, loc);
        }

        let octal = text.starts_with('0') && text.len() > 1;
        let mut value: u128 = 0;
        let mut bad_octal = false;
        for digit in text.bytes() {
            let d = (digit - b'0') as u128;
            if octal {
                if d > 7 {
                    bad_octal = true;
                }
                value = value.saturating_mul(8).saturating_add(d);
            } else {
                value = value.saturating_mul(10).saturating_add(d);
            }
        }
        if bad_octal {
            diags.error(loc, "invalid digit in octal constant");
        }
        self.finish_integer(loc, value, !octal, diags)
    }

    fn read_hex_number(&mut self, loc: Loc, diags: &mut Diagnostics) -> Token {
        self.bump(); // 0
        self.bump(); // x
        let digits_start = self.pos;
        let mut value: u128 = 0;
        while self.current().is_ascii_hexdigit() {
            let d = (self.bump() as char).to_digit(16).unwrap() as u128;
            value = value.saturating_mul(16).saturating_add(d);
        }
        let n_digits = self.pos - digits_start;

        if matches!(self.current(), b'.' | b'p' | b'P') {
            return self.read_hex_float(loc, value, diags);
        }
        if n_digits == 0 {
            diags.error(loc, "invalid hexadecimal constant");
        }
        self.finish_integer(loc, value, false, diags)
    }

    /// Hexadecimal floating constant: mantissa already consumed up to
    /// an optional fraction, exponent is mandatory.
    fn read_hex_float(&mut self, loc: Loc, int_part: u128, diags: &mut Diagnostics) -> Token {
        let mut value = int_part as f64;
        if self.current() == b'.' {
            self.bump();
            let mut scale = 1.0 / 16.0;
            while self.current().is_ascii_hexdigit() {
                let d = (self.bump() as char).to_digit(16).unwrap();
                value += d as f64 * scale;
                scale /= 16.0;
            }
        }
        if matches!(self.current(), b'p' | b'P') {
            self.bump();
            let negative = match self.current() {
                b'-' => {
                    self.bump();
                    true
                }
                b'+' => {
                    self.bump();
                    false
                }
                _ => false,
            };
            let mut exp: i32 = 0;
            if !self.current().is_ascii_digit() {
                diags.error(self.here(), "exponent has no digits");
            }
            while self.current().is_ascii_digit() {
                exp = exp.saturating_mul(10) + (self.bump() - b'0') as i32;
            }
            if negative {
                exp = -exp;
            }
            value *= 2f64.powi(exp);
        } else {
            diags.error(self.here(), "hexadecimal floating constant requires an exponent");
        }
        let ty = self.read_float_suffix(diags);
        Token::new(TokenKind::Float { value, ty }, loc)
    }

    fn read_float_suffix(&mut self, diags: &mut Diagnostics) -> AtomicKind {
        match self.current() {
            b'f' | b'F' => {
                self.bump();
                AtomicKind::Float
            }
            b'l' | b'L' => {
                self.bump();
                AtomicKind::LongDouble
            }
            c if c.is_ascii_alphabetic() => {
                diags.error(self.here(), "invalid suffix on floating constant");
                while self.current().is_ascii_alphanumeric() {
                    self.bump();
                }
                AtomicKind::Double
            }
            _ => AtomicKind::Double,
        }
    }

    /// Applies the integer suffix and the C99 §6.4.4.1 candidate type
    /// lists.  `decimal` constants never flip to unsigned by value.
    fn finish_integer(
        &mut self,
        loc: Loc,
        value: u128,
        decimal: bool,
        diags: &mut Diagnostics,
    ) -> Token {
        let mut unsigned = false;
        let mut longs = 0u32;
        loop {
            match self.current() {
                b'u' | b'U' if !unsigned => {
                    unsigned = true;
                    self.bump();
                }
                b'l' | b'L' if longs < 2 => {
                    longs += 1;
                    self.bump();
                }
                c if c.is_ascii_alphanumeric() || c == b'_' => {
                    diags.error(self.here(), "invalid suffix on integer constant");
                    while self.current().is_ascii_alphanumeric() || self.current() == b'_' {
                        self.bump();
                    }
                    break;
                }
                _ => break,
            }
        }

        if value > u64::MAX as u128 {
            diags.error(loc, "integer constant is too large for its type");
            return Token::new(
                TokenKind::Integer {
                    value: 0,
                    ty: AtomicKind::ULongLong,
                },
                loc,
            );
        }
        let value = value as u64;

        use AtomicKind::*;
        let candidates: &[AtomicKind] = match (unsigned, longs, decimal) {
            (false, 0, true) => &[Int, Long, LongLong],
            (false, 0, false) => &[Int, UInt, Long, ULong, LongLong, ULongLong],
            (false, 1, true) => &[Long, LongLong],
            (false, 1, false) => &[Long, ULong, LongLong, ULongLong],
            (false, _, true) => &[LongLong],
            (false, _, false) => &[LongLong, ULongLong],
            (true, 0, _) => &[UInt, ULong, ULongLong],
            (true, 1, _) => &[ULong, ULongLong],
            (true, _, _) => &[ULongLong],
        };

        let fits = |kind: AtomicKind, v: u64| -> bool {
            match kind {
                Int => v <= i32::MAX as u64,
                UInt => v <= u32::MAX as u64,
                Long | LongLong => v <= i64::MAX as u64,
                ULong | ULongLong => true,
                _ => false,
            }
        };
        let ty = candidates
            .iter()
            .copied()
            .find(|k| fits(*k, value))
            .unwrap_or_else(|| {
                diags.warning(loc, "integer constant is so large that it is unsigned");
                ULongLong
            });

        Token::new(
            TokenKind::Integer {
                value: value as i64,
                ty,
            },
            loc,
        )
    }

    // ---- character and string constants ----

    /// One (possibly escaped) character of a character or string
    /// constant.  Returns `None` at an unescaped delimiter.
    fn read_escaped_char(&mut self, delimiter: u8, diags: &mut Diagnostics) -> Option<u32> {
        let c = self.current();
        if c == delimiter || c == b'\n' || self.at_eof() {
            return None;
        }
        self.bump();
        if c != b'\\' {
            return Some(c as u32);
        }

        let e = self.bump();
        let value = match e {
            b'n' => b'\n' as u32,
            b't' => b'\t' as u32,
            b'r' => b'\r' as u32,
            b'a' => 0x07,
            b'b' => 0x08,
            b'f' => 0x0c,
            b'v' => 0x0b,
            b'\\' => b'\\' as u32,
            b'\'' => b'\'' as u32,
            b'"' => b'"' as u32,
            b'?' => b'?' as u32,
            b'0'..=b'7' => {
                let mut v = (e - b'0') as u32;
                for _ in 0..2 {
                    if matches!(self.current(), b'0'..=b'7') {
                        v = v * 8 + (self.bump() - b'0') as u32;
                    }
                }
                v
            }
            b'x' => {
                let mut v: u32 = 0;
                let mut any = false;
                while self.current().is_ascii_hexdigit() {
                    v = v
                        .wrapping_mul(16)
                        .wrapping_add((self.bump() as char).to_digit(16).unwrap());
                    any = true;
                }
                if !any {
                    diags.error(self.here(), "\\x used with no following hex digits");
                }
                v
            }
            other => {
                diags.warning(self.here(), format!("unknown escape sequence '\\{}'", other as char));
                other as u32
            }
        };
        Some(value)
    }

    fn read_char_constant(&mut self, loc: Loc, wide: bool, diags: &mut Diagnostics) -> Token {
        self.bump(); // opening quote
        let mut value: i64 = 0;
        let mut count = 0;
        while let Some(c) = self.read_escaped_char(b'\'', diags) {
            value = (value << 8) | (c as i64 & 0xff);
            count += 1;
        }
        if self.current() == b'\'' {
            self.bump();
        } else {
            diags.error(loc, "unterminated character constant");
        }
        if count == 0 {
            diags.error(loc, "empty character constant");
        } else if count > 1 {
            diags.warning(loc, "multi-character character constant");
        }
        // wchar_t is int on this target, so wide constants type alike
        let _ = wide;
        let ty = AtomicKind::Int;
        Token::new(TokenKind::Integer { value, ty }, loc)
    }

    fn read_string_body(&mut self, loc: Loc, diags: &mut Diagnostics) -> Vec<u32> {
        self.bump(); // opening quote
        let mut content = Vec::new();
        while let Some(c) = self.read_escaped_char(b'"', diags) {
            content.push(c);
        }
        if self.current() == b'"' {
            self.bump();
        } else {
            diags.error(loc, "unterminated string literal");
        }
        content
    }

    /// Narrow string constant; adjacent narrow literals are folded
    /// here, before the parser ever sees them.
    fn read_string(&mut self, loc: Loc, diags: &mut Diagnostics) -> Token {
        let mut content: Vec<u8> = self
            .read_string_body(loc, diags)
            .into_iter()
            .map(|c| c as u8)
            .collect();

        loop {
            let saved = (self.pos, self.line, self.line_start, self.at_line_start);
            self.skip_whitespace_and_comments(diags);
            if self.current() == b'"' {
                let next_loc = self.here();
                content.extend(
                    self.read_string_body(next_loc, diags)
                        .into_iter()
                        .map(|c| c as u8),
                );
            } else {
                (self.pos, self.line, self.line_start, self.at_line_start) = saved;
                break;
            }
        }
        Token::new(TokenKind::StringLiteral(content), loc)
    }

    fn read_wide_string(&mut self, loc: Loc, diags: &mut Diagnostics) -> Token {
        let content = self.read_string_body(loc, diags);
        Token::new(TokenKind::WideStringLiteral(content), loc)
    }

    // ---- punctuators ----

    fn read_punctuator(&mut self) -> Option<TokenKind> {
        use TokenKind::*;
        let (kind, len) = match (self.current(), self.peek(1), self.peek(2)) {
            (b'.', b'.', b'.') => (Ellipsis, 3),
            (b'<', b'<', b'=') => (LessLessAssign, 3),
            (b'>', b'>', b'=') => (GreaterGreaterAssign, 3),
            (b'<', b'<', _) => (LessLess, 2),
            (b'>', b'>', _) => (GreaterGreater, 2),
            (b'<', b'=', _) => (LessEqual, 2),
            (b'>', b'=', _) => (GreaterEqual, 2),
            (b'=', b'=', _) => (EqualEqual, 2),
            (b'!', b'=', _) => (ExclaimEqual, 2),
            (b'+', b'+', _) => (PlusPlus, 2),
            (b'-', b'-', _) => (MinusMinus, 2),
            (b'-', b'>', _) => (Arrow, 2),
            (b'+', b'=', _) => (PlusAssign, 2),
            (b'-', b'=', _) => (MinusAssign, 2),
            (b'*', b'=', _) => (StarAssign, 2),
            (b'/', b'=', _) => (SlashAssign, 2),
            (b'%', b'=', _) => (PercentAssign, 2),
            (b'&', b'&', _) => (AmpAmp, 2),
            (b'|', b'|', _) => (PipePipe, 2),
            (b'&', b'=', _) => (AmpAssign, 2),
            (b'|', b'=', _) => (PipeAssign, 2),
            (b'^', b'=', _) => (CaretAssign, 2),
            (b'(', ..) => (LParen, 1),
            (b')', ..) => (RParen, 1),
            (b'[', ..) => (LBracket, 1),
            (b']', ..) => (RBracket, 1),
            (b'{', ..) => (LBrace, 1),
            (b'}', ..) => (RBrace, 1),
            (b';', ..) => (Semicolon, 1),
            (b',', ..) => (Comma, 1),
            (b':', ..) => (Colon, 1),
            (b'?', ..) => (Question, 1),
            (b'~', ..) => (Tilde, 1),
            (b'.', ..) => (Dot, 1),
            (b'<', ..) => (Less, 1),
            (b'>', ..) => (Greater, 1),
            (b'=', ..) => (Assign, 1),
            (b'!', ..) => (Exclaim, 1),
            (b'+', ..) => (Plus, 1),
            (b'-', ..) => (Minus, 1),
            (b'*', ..) => (Star, 1),
            (b'/', ..) => (Slash, 1),
            (b'%', ..) => (Percent, 1),
            (b'&', ..) => (Amp, 1),
            (b'|', ..) => (Pipe, 1),
            (b'^', ..) => (Caret, 1),
            _ => return None,
        };
        for _ in 0..len {
            self.bump();
        }
        Some(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex_all(source: &str) -> (Vec<Token>, Diagnostics, Interner) {
        let mut interner = Interner::new();
        let mut diags = Diagnostics::new();
        let mut lexer = Lexer::new(source, "test.c", &mut interner, &mut diags);
        let mut tokens = Vec::new();
        loop {
            let token = lexer.next(&mut interner, &mut diags);
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                break;
            }
        }
        (tokens, diags, interner)
    }

    fn kinds(source: &str) -> Vec<TokenKind> {
        lex_all(source).0.into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn keywords_and_identifiers_are_distinguished() {
        let (tokens, _, interner) = lex_all("while whilex");
        assert_eq!(tokens[0].kind, TokenKind::While);
        match &tokens[1].kind {
            TokenKind::Identifier(sym) => assert_eq!(interner.resolve(*sym), "whilex"),
            other => panic!("expected identifier, got {:?}", other),
        }
    }

    #[test]
    fn integer_constants_pick_types_by_value_and_suffix() {
        let expect = |src: &str, value: i64, ty: AtomicKind| match &kinds(src)[0] {
            TokenKind::Integer { value: v, ty: t } => {
                assert_eq!((*v, *t), (value, ty), "for {}", src);
            }
            other => panic!("expected integer for {}, got {:?}", src, other),
        };
        expect("42", 42, AtomicKind::Int);
        expect("42u", 42, AtomicKind::UInt);
        expect("42l", 42, AtomicKind::Long);
        expect("42ull", 42, AtomicKind::ULongLong);
        expect("2147483648", 2147483648, AtomicKind::Long);
        // hex constants may flip to unsigned, decimal ones do not
        expect("0x80000000", 0x80000000, AtomicKind::UInt);
        expect("0777", 0o777, AtomicKind::Int);
    }

    #[test]
    fn float_constants_pick_types_by_suffix() {
        match &kinds("1.5 2.5f 3.5l")[..] {
            [TokenKind::Float { ty: a, .. }, TokenKind::Float { ty: b, .. }, TokenKind::Float { ty: c, .. }, TokenKind::Eof] =>
            {
                assert_eq!(*a, AtomicKind::Double);
                assert_eq!(*b, AtomicKind::Float);
                assert_eq!(*c, AtomicKind::LongDouble);
            }
            other => panic!("unexpected tokens {:?}", other),
        }
    }

    #[test]
    fn character_constants_are_int_tokens() {
        match &kinds("'a'")[0] {
            TokenKind::Integer { value, ty } => {
                assert_eq!(*value, 'a' as i64);
                assert_eq!(*ty, AtomicKind::Int);
            }
            other => panic!("unexpected {:?}", other),
        }
        match &kinds("'\\n'")[0] {
            TokenKind::Integer { value, .. } => assert_eq!(*value, 10),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn adjacent_narrow_strings_are_concatenated() {
        match &kinds("\"foo\" \"bar\"")[0] {
            TokenKind::StringLiteral(bytes) => assert_eq!(bytes, b"foobar"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn string_concatenation_stops_at_non_strings() {
        let tokens = kinds("\"a\" \"b\" x");
        assert!(matches!(&tokens[0], TokenKind::StringLiteral(b) if b == b"ab"));
        assert!(matches!(&tokens[1], TokenKind::Identifier(_)));
    }

    #[test]
    fn wide_strings_are_not_concatenated() {
        let tokens = kinds("L\"a\" L\"b\"");
        assert!(matches!(&tokens[0], TokenKind::WideStringLiteral(v) if v == &vec![b'a' as u32]));
        assert!(matches!(&tokens[1], TokenKind::WideStringLiteral(_)));
    }

    #[test]
    fn string_escapes_produce_bytes() {
        match &kinds(r#""\t\x41\101""#)[0] {
            TokenKind::StringLiteral(bytes) => assert_eq!(bytes, b"\tAA"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn three_char_punctuators_lex_longest_first() {
        assert_eq!(
            kinds("<<= ... >>="),
            vec![
                TokenKind::LessLessAssign,
                TokenKind::Ellipsis,
                TokenKind::GreaterGreaterAssign,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn arrow_and_minus_are_distinguished() {
        let tokens = kinds("a->b - c");
        assert!(matches!(tokens[0], TokenKind::Identifier(_)));
        assert_eq!(tokens[1], TokenKind::Arrow);
        assert!(matches!(tokens[2], TokenKind::Identifier(_)));
        assert_eq!(tokens[3], TokenKind::Minus);
        assert!(matches!(tokens[4], TokenKind::Identifier(_)));
    }

    #[test]
    fn positions_track_lines_and_columns() {
        let (tokens, _, _) = lex_all("int\n  x;");
        assert_eq!(tokens[0].loc.line, 1);
        assert_eq!(tokens[0].loc.column, 1);
        assert_eq!(tokens[1].loc.line, 2);
        assert_eq!(tokens[1].loc.column, 3);
    }

    #[test]
    fn linemarkers_redirect_positions() {
        let (tokens, diags, _) = lex_all("# 10 \"orig.c\"\nint x;");
        assert_eq!(tokens[0].loc.line, 10);
        assert_eq!(diags.file_name(tokens[0].loc.file), "orig.c");
    }

    #[test]
    fn pragmas_are_skipped() {
        let tokens = kinds("#pragma pack(1)\nint");
        assert_eq!(tokens[0], TokenKind::Int);
    }

    #[test]
    fn comments_are_whitespace() {
        let tokens = kinds("int /* comment */ x // trailing\n;");
        assert_eq!(tokens.len(), 4); // int, x, ;, eof
    }

    #[test]
    fn unterminated_string_is_a_lexical_error() {
        let (_, diags, _) = lex_all("\"abc\nint");
        assert!(diags.has_errors());
    }

    #[test]
    fn bad_octal_digit_is_an_error() {
        let (_, diags, _) = lex_all("int x = 09;");
        assert!(diags.has_errors());
    }
}
