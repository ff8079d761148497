//! Tokenizing LC-3 assembly.
//!
//! This module turns source text into [`Token`]s with [`logos`].
//! Mnemonics are not recognized here: every word is an [`Token::Ident`]
//! and the parser decides whether it names an instruction or a label.
//!
//! Numeric literals of either base lex into one [`Token::Num`].
//! The literal only has to fit into a 16-bit word (signed or unsigned);
//! whether it fits the operand it is used for is checked later.

use logos::{Lexer, Logos};

/// A unit of LC-3 source code.
#[derive(Debug, Logos, PartialEq, Eq, Clone)]
#[logos(skip r"[ \t\r]+", error = LexErr)]
pub enum Token {
    // The numeric patterns are deliberately loose (`3Q` matches)
    // so that malformed literals are reported as one unit.

    /// A numeric literal (e.g., `9`, `#-14`, `x3000`, `x-1`)
    #[regex(r"\d\w*", lex_num)]
    #[regex(r"#-?\w*", lex_num)]
    #[regex(r"-\w*", lex_num)]
    #[regex(r"[Xx]-?[\dA-Fa-f]\w*", lex_num)]
    Num(i32),

    /// A register (`R0`-`R7`)
    #[regex(r"[Rr]\d+", lex_reg)]
    Reg(u8),

    /// A mnemonic or a label, exactly as written.
    #[regex(r"[A-Za-z_]\w*", |lx| lx.slice().to_string())]
    Ident(String),

    /// A directive, upper-cased and without its leading dot (e.g., `ORIG`)
    #[regex(r"\.[A-Za-z_]\w*", |lx| lx.slice()[1..].to_ascii_uppercase())]
    Directive(String),

    /// A string literal, with escapes already applied
    #[token("\"", lex_str)]
    Str(String),

    /// `:`, optionally after a label
    #[token(":")]
    Colon,

    /// `,`, between operands
    #[token(",")]
    Comma,

    /// `;` and the rest of its line
    #[regex(r";[^\n]*")]
    Comment,

    /// The end of a line
    #[token("\n")]
    NewLine
}
impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Num(n)       => write!(f, "#{n}"),
            Token::Reg(r)       => write!(f, "R{r}"),
            Token::Ident(id)    => f.write_str(id),
            Token::Directive(d) => write!(f, ".{d}"),
            Token::Str(s)       => write!(f, "{s:?}"),
            Token::Colon        => f.write_str(":"),
            Token::Comma        => f.write_str(","),
            Token::Comment      => f.write_str("comment"),
            Token::NewLine      => f.write_str("end of line"),
        }
    }
}

/// Errors raised while tokenizing source.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default, thiserror::Error)]
pub enum LexErr {
    /// A decimal literal contains something other than digits.
    #[error("invalid decimal literal")]
    InvalidNumeric,
    /// A hex literal contains something other than hex digits.
    #[error("invalid hex literal")]
    InvalidHex,
    /// A numeric literal has no digits (`#` or `#-`).
    #[error("numeric literal has no digits")]
    EmptyNumeric,
    /// A numeric literal does not fit in a word.
    #[error("numeric literal does not fit in 16 bits")]
    NumTooBig,
    /// A register other than `R0`-`R7`.
    #[error("invalid register")]
    InvalidReg,
    /// A string literal is missing its closing quote on the same line.
    #[error("unclosed string literal")]
    UnclosedStr,
    /// A string literal would not fit in memory.
    #[error("string literal is too long")]
    StrTooLong,
    /// A string literal contains a character outside of ASCII.
    #[error("string literal contains non-ASCII character {0:?}")]
    NonAsciiStr(char),
    /// A character which does not start any token.
    #[default]
    #[error("unrecognized symbol")]
    InvalidSymbol
}
impl crate::err::Error for LexErr {
    fn help(&self) -> Option<std::borrow::Cow<str>> {
        match self {
            LexErr::InvalidNumeric => Some("a decimal literal only consists of digits 0-9".into()),
            LexErr::InvalidHex     => Some("a hex literal starts with 'x' and consists of 0-9, A-F".into()),
            LexErr::EmptyNumeric   => Some("add digits after the '#'".into()),
            LexErr::NumTooBig      => Some(format!("literals must be in the range [{}, {}]", i16::MIN, u16::MAX).into()),
            LexErr::InvalidReg     => Some("registers are R0-R7".into()),
            LexErr::UnclosedStr    => Some("add a '\"' before the end of the line".into()),
            LexErr::StrTooLong     => Some(format!("string literals can have at most {} characters", u16::MAX - 1).into()),
            LexErr::NonAsciiStr(_) => Some("the simulator can only print ASCII characters".into()),
            LexErr::InvalidSymbol  => None,
        }
    }
}

fn lex_num(lx: &Lexer<'_, Token>) -> Result<i32, LexErr> {
    let src = lx.slice();
    let (radix, rest) = match src.strip_prefix(['x', 'X']) {
        Some(hex) => (16, hex),
        None => (10, src.strip_prefix('#').unwrap_or(src)),
    };
    let (negative, digits) = match rest.strip_prefix('-') {
        Some(digits) => (true, digits),
        None => (false, rest),
    };
    if digits.is_empty() {
        return Err(LexErr::EmptyNumeric);
    }
    if !digits.chars().all(|c| c.is_digit(radix)) {
        return Err(match radix {
            16 => LexErr::InvalidHex,
            _  => LexErr::InvalidNumeric,
        });
    }

    let magnitude = u32::from_str_radix(digits, radix)
        .map_err(|_| LexErr::NumTooBig)?;
    let value = match negative {
        true  => -i64::from(magnitude),
        false => i64::from(magnitude),
    };
    match value {
        -0x8000..=0xFFFF => Ok(value as i32),
        _ => Err(LexErr::NumTooBig),
    }
}

fn lex_reg(lx: &Lexer<'_, Token>) -> Result<u8, LexErr> {
    match lx.slice()[1..].parse::<u8>() {
        Ok(r @ 0..=7) => Ok(r),
        _ => Err(LexErr::InvalidReg),
    }
}

fn lex_str(lx: &mut Lexer<'_, Token>) -> Result<String, LexErr> {
    let rem = lx.remainder();
    let line_len = rem.find('\n').unwrap_or(rem.len());

    let mut buf = String::new();
    let mut chars = rem[..line_len].char_indices();
    let closed_at = loop {
        match chars.next() {
            None => break None,
            Some((i, '"')) => break Some(i),
            Some((_, '\\')) => match chars.next() {
                Some((_, 'n'))  => buf.push('\n'),
                Some((_, 'r'))  => buf.push('\r'),
                Some((_, 't'))  => buf.push('\t'),
                Some((_, '0'))  => buf.push('\0'),
                Some((_, '\\')) => buf.push('\\'),
                Some((_, '"'))  => buf.push('"'),
                Some((_, c)) => {
                    buf.push('\\');
                    buf.push(c);
                },
                None => break None,
            },
            Some((_, c)) => buf.push(c),
        }
    };

    match closed_at {
        Some(i) => lx.bump(i + 1),
        None => {
            lx.bump(line_len);
            return Err(LexErr::UnclosedStr);
        }
    }
    if let Some(c) = buf.chars().find(|c| !c.is_ascii()) {
        return Err(LexErr::NonAsciiStr(c));
    }
    match buf.len() < usize::from(u16::MAX) {
        true  => Ok(buf),
        false => Err(LexErr::StrTooLong),
    }
}

#[cfg(test)]
mod tests {
    use logos::Logos;

    use super::{LexErr, Token};

    fn lex(src: &str) -> Vec<Result<Token, LexErr>> {
        Token::lexer(src).collect()
    }
    fn ident(s: &str) -> Result<Token, LexErr> {
        Ok(Token::Ident(s.to_string()))
    }
    fn string(s: &str) -> Result<Token, LexErr> {
        Ok(Token::Str(s.to_string()))
    }

    #[test]
    fn test_numbers() {
        assert_eq!(lex("0 #15 -3 #-16 65535"), vec![
            Ok(Token::Num(0)),
            Ok(Token::Num(15)),
            Ok(Token::Num(-3)),
            Ok(Token::Num(-16)),
            Ok(Token::Num(65535)),
        ]);
        assert_eq!(lex("x3000 XFFFF xabcd x-1 x-8000"), vec![
            Ok(Token::Num(0x3000)),
            Ok(Token::Num(0xFFFF)),
            Ok(Token::Num(0xABCD)),
            Ok(Token::Num(-1)),
            Ok(Token::Num(-0x8000)),
        ]);
    }

    #[test]
    fn test_numbers_invalid() {
        assert_eq!(lex("65536"), vec![Err(LexErr::NumTooBig)]);
        assert_eq!(lex("-32769"), vec![Err(LexErr::NumTooBig)]);
        assert_eq!(lex("x10000"), vec![Err(LexErr::NumTooBig)]);
        assert_eq!(lex("99999999999999999999"), vec![Err(LexErr::NumTooBig)]);
        assert_eq!(lex("3Q"), vec![Err(LexErr::InvalidNumeric)]);
        assert_eq!(lex("#Q"), vec![Err(LexErr::InvalidNumeric)]);
        assert_eq!(lex("x0G"), vec![Err(LexErr::InvalidHex)]);
        assert_eq!(lex("#"), vec![Err(LexErr::EmptyNumeric)]);
        assert_eq!(lex("#-"), vec![Err(LexErr::EmptyNumeric)]);
    }

    #[test]
    fn test_regs_and_idents() {
        assert_eq!(lex("R0 r7 R8 ADD loop R2D2 x"), vec![
            Ok(Token::Reg(0)),
            Ok(Token::Reg(7)),
            Err(LexErr::InvalidReg),
            ident("ADD"),
            ident("loop"),
            ident("R2D2"),
            ident("x"),
        ]);
    }

    #[test]
    fn test_directives() {
        assert_eq!(lex(".orig .FILL .Stringz"), vec![
            Ok(Token::Directive("ORIG".to_string())),
            Ok(Token::Directive("FILL".to_string())),
            Ok(Token::Directive("STRINGZ".to_string())),
        ]);
    }

    #[test]
    fn test_strings() {
        assert_eq!(lex(r#""" "Hi!" "a;b""#), vec![string(""), string("Hi!"), string("a;b")]);
        assert_eq!(
            lex(r#""\n\t\\\"\0\e""#),
            vec![string("\n\t\\\"\0\\e")]
        );
    }

    #[test]
    fn test_strings_unclosed() {
        assert_eq!(lex(r#""abc"#), vec![Err(LexErr::UnclosedStr)]);
        // lexing resumes on the next line
        assert_eq!(lex("\"abc\nHALT"), vec![
            Err(LexErr::UnclosedStr),
            Ok(Token::NewLine),
            ident("HALT"),
        ]);
    }

    #[test]
    fn test_strings_non_ascii() {
        assert_eq!(lex("\"caf\u{e9}\""), vec![Err(LexErr::NonAsciiStr('\u{e9}'))]);
        assert_eq!(lex("\"\u{1F600}\" HALT"), vec![Err(LexErr::NonAsciiStr('\u{1F600}')), ident("HALT")]);
    }

    #[test]
    fn test_strings_too_long() {
        let long = "a".repeat(usize::from(u16::MAX) - 1);
        assert_eq!(lex(&format!("\"{long}\"")), vec![string(&long)]);
        let longer = "a".repeat(usize::from(u16::MAX));
        assert_eq!(lex(&format!("\"{longer}\"")), vec![Err(LexErr::StrTooLong)]);
    }

    #[test]
    fn test_punct() {
        assert_eq!(lex("LOOP: ADD R0, R0, #1 ; count\r\nHALT"), vec![
            ident("LOOP"),
            Ok(Token::Colon),
            ident("ADD"),
            Ok(Token::Reg(0)),
            Ok(Token::Comma),
            Ok(Token::Reg(0)),
            Ok(Token::Comma),
            Ok(Token::Num(1)),
            Ok(Token::Comment),
            Ok(Token::NewLine),
            ident("HALT"),
        ]);
    }

    #[test]
    fn test_invalid_symbols() {
        for c in ['!', '$', '%', '&', '(', ')', '*', '+', '/', '<', '=', '>', '?', '@', '[', ']', '{', '}', '|', '~', '`'] {
            let src = c.to_string();
            assert_eq!(Token::lexer(&src).next(), Some(Err(LexErr::InvalidSymbol)), "{c:?} should not lex");
        }
    }
}
