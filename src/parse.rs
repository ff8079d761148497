//! Parsing assembly source into an AST.
//!
//! The entry point is [`parse_ast`], which converts source text into
//! a list of [`Stmt`]s that the assembler can process.
//!
//! Source is processed one line at a time. A line has the form
//! ```text
//! [LABEL[:]] [MNEMONIC/DIRECTIVE OPERANDS...] [; comment]
//! ```
//! A label on a line with no statement names the next statement.

pub mod lex;

use logos::Logos;

use crate::ast::asm::{AsmInstr, Directive, Stmt, StmtKind};
use crate::ast::{CondCode, IOffset, ImmOrReg, Offset, OffsetNewErr, PCOffset, Reg};
use lex::{LexErr, Token};

/// Parses assembly source into a list of statements.
///
/// # Example
/// ```
/// use lc3_sim::parse::parse_ast;
///
/// let src = "
///     .orig x3000
///     LOOP: BRnzp LOOP
///     .end
/// ";
/// let ast = parse_ast(src).unwrap();
/// assert_eq!(ast.len(), 3);
/// assert_eq!(ast[1].labels, ["LOOP"]);
/// assert_eq!(ast[1].line, 3);
/// ```
pub fn parse_ast(src: &str) -> Result<Vec<Stmt>, ParseErr> {
    let mut parser = Parser::default();
    let mut line_tokens = vec![];

    for token in Token::lexer(src) {
        match token.map_err(|e| ParseErr::new(parser.line + 1, e.into()))? {
            Token::NewLine => {
                parser.push_line(&line_tokens)?;
                line_tokens.clear();
            },
            Token::Comment => {},
            token => line_tokens.push(token),
        }
    }
    parser.push_line(&line_tokens)?;
    parser.finish()
}

/// Kinds of errors that can occur while parsing.
///
/// See [`ParseErr`] for this error with its line.
#[derive(Debug, PartialEq, Eq, Clone, thiserror::Error)]
pub enum ParseErrKind {
    /// The line could not be tokenized.
    #[error("{0}")]
    Lex(#[from] LexErr),
    /// A token appeared where it does not belong, or a required one is missing.
    #[error("expected {expected}, found {found}")]
    Unexpected {
        /// What the parser was looking for.
        expected: &'static str,
        /// What it got instead.
        found: String
    },
    /// An identifier was used as a mnemonic but names no instruction.
    #[error("unknown instruction {0}")]
    UnknownInstr(String),
    /// A directive other than the supported ones.
    #[error("unknown directive .{0}")]
    UnknownDirective(String),
    /// A literal operand does not fit its field.
    #[error("{0}")]
    Offset(#[from] OffsetNewErr),
    /// A label appears after the last statement.
    #[error("label {0} does not name any statement")]
    DanglingLabel(String),
}

/// Error from parsing assembly source, with the line it occurred on.
#[derive(Debug, PartialEq, Eq, Clone, thiserror::Error)]
#[error("line {line}: {kind}")]
pub struct ParseErr {
    /// The 1-indexed line of the error.
    pub line: usize,
    /// What went wrong.
    pub kind: ParseErrKind
}
impl ParseErr {
    fn new(line: usize, kind: ParseErrKind) -> Self {
        ParseErr { line, kind }
    }
}
impl crate::err::Error for ParseErr {
    fn help(&self) -> Option<std::borrow::Cow<str>> {
        match &self.kind {
            ParseErrKind::Lex(e) => crate::err::Error::help(e),
            ParseErrKind::Unexpected { .. } => None,
            ParseErrKind::UnknownInstr(_) => Some("labels may only appear at the start of a line".into()),
            ParseErrKind::UnknownDirective(_) => Some("the supported directives are .ORIG, .FILL, .BLKW, .STRINGZ, and .END".into()),
            ParseErrKind::Offset(e) => crate::err::Error::help(e),
            ParseErrKind::DanglingLabel(_) => Some("move this label before a statement".into()),
        }
    }
}

/// Accumulates statements line by line.
#[derive(Default)]
struct Parser {
    stmts: Vec<Stmt>,
    pending_labels: Vec<String>,
    /// Line of the last pending label, for error reporting.
    pending_line: usize,
    /// The line currently being read (0 until the first line is pushed).
    line: usize,
}
impl Parser {
    fn push_line(&mut self, tokens: &[Token]) -> Result<(), ParseErr> {
        self.line += 1;
        let line = self.line;

        let mut cursor = Cursor { tokens, index: 0 };
        if let Some(label) = cursor.label() {
            self.pending_labels.push(label);
            self.pending_line = line;
        }

        let nucleus = cursor.nucleus()
            .and_then(|nucleus| cursor.finish().map(|()| nucleus))
            .map_err(|kind| ParseErr::new(line, kind))?;

        if let Some(nucleus) = nucleus {
            let labels = std::mem::take(&mut self.pending_labels);
            self.stmts.push(Stmt { labels, nucleus, line });
        }
        Ok(())
    }

    fn finish(mut self) -> Result<Vec<Stmt>, ParseErr> {
        match self.pending_labels.pop() {
            Some(label) => Err(ParseErr::new(self.pending_line, ParseErrKind::DanglingLabel(label))),
            None => Ok(self.stmts),
        }
    }
}

/// Reads the tokens of a single line.
struct Cursor<'t> {
    tokens: &'t [Token],
    index: usize
}
impl<'t> Cursor<'t> {
    fn peek(&self) -> Option<&'t Token> {
        self.tokens.get(self.index)
    }
    fn advance(&mut self) -> Option<&'t Token> {
        let token = self.peek();
        self.index += usize::from(token.is_some());
        token
    }
    fn unexpected(expected: &'static str, found: Option<&Token>) -> ParseErrKind {
        let found = match found {
            Some(t) => t.to_string(),
            None => String::from("end of line"),
        };
        ParseErrKind::Unexpected { expected, found }
    }

    /// Consumes a leading label (and its colon), if the line starts with one.
    fn label(&mut self) -> Option<String> {
        match self.peek()? {
            Token::Ident(id) if !is_mnemonic(&id.to_ascii_uppercase()) => {
                self.advance();
                if let Some(Token::Colon) = self.peek() {
                    self.advance();
                }
                Some(id.clone())
            },
            _ => None
        }
    }

    /// Reads the instruction or directive of the line, if there is one.
    fn nucleus(&mut self) -> Result<Option<StmtKind>, ParseErrKind> {
        match self.advance() {
            None => Ok(None),
            Some(Token::Ident(mnemonic)) => self.instr(mnemonic).map(|i| Some(StmtKind::Instr(i))),
            Some(Token::Directive(name)) => self.directive(name).map(|d| Some(StmtKind::Directive(d))),
            found => Err(Self::unexpected("instruction or directive", found)),
        }
    }

    fn finish(&self) -> Result<(), ParseErrKind> {
        match self.peek() {
            None => Ok(()),
            found => Err(Self::unexpected("end of line", found)),
        }
    }

    fn comma(&mut self) -> Result<(), ParseErrKind> {
        match self.advance() {
            Some(Token::Comma) => Ok(()),
            found => Err(Self::unexpected("comma", found)),
        }
    }
    fn reg(&mut self) -> Result<Reg, ParseErrKind> {
        match self.advance() {
            Some(&Token::Reg(r)) => Ok(Reg(r)),
            found => Err(Self::unexpected("register", found)),
        }
    }
    fn num(&mut self) -> Result<i32, ParseErrKind> {
        match self.advance() {
            Some(&Token::Num(n)) => Ok(n),
            found => Err(Self::unexpected("numeric literal", found)),
        }
    }
    fn imm<const N: u32>(&mut self) -> Result<IOffset<N>, ParseErrKind> {
        let n = self.num()?;
        let n = i16::try_from(n).map_err(|_| OffsetNewErr::CannotFitSigned(N))?;
        Ok(Offset::new(n)?)
    }
    fn uimm<const N: u32>(&mut self) -> Result<Offset<u16, N>, ParseErrKind> {
        let n = self.num()?;
        let n = u16::try_from(n).map_err(|_| OffsetNewErr::CannotFitUnsigned(N))?;
        Ok(Offset::new(n)?)
    }
    fn imm_or_reg<const N: u32>(&mut self) -> Result<ImmOrReg<N>, ParseErrKind> {
        match self.peek() {
            Some(Token::Reg(_)) => self.reg().map(ImmOrReg::Reg),
            Some(Token::Num(_)) => self.imm().map(ImmOrReg::Imm),
            found => Err(Self::unexpected("register or immediate", found)),
        }
    }
    fn pc_offset<const N: u32>(&mut self) -> Result<PCOffset<i16, N>, ParseErrKind> {
        match self.peek() {
            Some(Token::Ident(label)) => {
                self.advance();
                Ok(PCOffset::Label(label.clone()))
            },
            Some(Token::Num(_)) => self.imm().map(PCOffset::Offset),
            found => Err(Self::unexpected("label or offset", found)),
        }
    }

    /// `DR, SR1, SR2/imm5`
    fn alu_operands(&mut self) -> Result<(Reg, Reg, ImmOrReg<5>), ParseErrKind> {
        let dr = self.reg()?;
        self.comma()?;
        let sr1 = self.reg()?;
        self.comma()?;
        Ok((dr, sr1, self.imm_or_reg()?))
    }
    /// `R, PCoffset9`
    fn reg_pc_operands(&mut self) -> Result<(Reg, PCOffset<i16, 9>), ParseErrKind> {
        let r = self.reg()?;
        self.comma()?;
        Ok((r, self.pc_offset()?))
    }
    /// `R, BaseR, offset6`
    fn base_operands(&mut self) -> Result<(Reg, Reg, IOffset<6>), ParseErrKind> {
        let r = self.reg()?;
        self.comma()?;
        let br = self.reg()?;
        self.comma()?;
        Ok((r, br, self.imm()?))
    }

    fn instr(&mut self, mnemonic: &str) -> Result<AsmInstr, ParseErrKind> {
        let instr = match &*mnemonic.to_ascii_uppercase() {
            "ADD" => {
                let (dr, sr1, sr2) = self.alu_operands()?;
                AsmInstr::ADD(dr, sr1, sr2)
            },
            "AND" => {
                let (dr, sr1, sr2) = self.alu_operands()?;
                AsmInstr::AND(dr, sr1, sr2)
            },
            "NOT" => {
                let dr = self.reg()?;
                self.comma()?;
                AsmInstr::NOT(dr, self.reg()?)
            },
            "JMP"  => AsmInstr::JMP(self.reg()?),
            "JSR"  => AsmInstr::JSR(self.pc_offset()?),
            "JSRR" => AsmInstr::JSRR(self.reg()?),
            "LD"   => { let (r, off) = self.reg_pc_operands()?; AsmInstr::LD(r, off) },
            "LDI"  => { let (r, off) = self.reg_pc_operands()?; AsmInstr::LDI(r, off) },
            "LEA"  => { let (r, off) = self.reg_pc_operands()?; AsmInstr::LEA(r, off) },
            "ST"   => { let (r, off) = self.reg_pc_operands()?; AsmInstr::ST(r, off) },
            "STI"  => { let (r, off) = self.reg_pc_operands()?; AsmInstr::STI(r, off) },
            "LDR"  => { let (r, br, off) = self.base_operands()?; AsmInstr::LDR(r, br, off) },
            "STR"  => { let (r, br, off) = self.base_operands()?; AsmInstr::STR(r, br, off) },
            "TRAP"  => AsmInstr::TRAP(self.uimm()?),
            "RET"   => AsmInstr::RET,
            "RTI"   => AsmInstr::RTI,
            "NOP"   => AsmInstr::NOP,
            "GETC"  => AsmInstr::GETC,
            "OUT"   => AsmInstr::OUT,
            "PUTC"  => AsmInstr::PUTC,
            "PUTS"  => AsmInstr::PUTS,
            "IN"    => AsmInstr::IN,
            "PUTSP" => AsmInstr::PUTSP,
            "HALT"  => AsmInstr::HALT,
            m => match br_cond(m) {
                Some(cc) => AsmInstr::BR(cc, self.pc_offset()?),
                None => return Err(ParseErrKind::UnknownInstr(mnemonic.to_string())),
            }
        };

        Ok(instr)
    }

    fn directive(&mut self, name: &str) -> Result<Directive, ParseErrKind> {
        let directive = match name {
            "ORIG" => Directive::Orig(self.uimm()?),
            "FILL" => match self.advance() {
                Some(Token::Ident(label)) => Directive::Fill(PCOffset::Label(label.clone())),
                // negative values fill with their two's complement
                Some(&Token::Num(n)) => Directive::Fill(PCOffset::Offset(Offset::new_trunc(n as u16))),
                found => return Err(Self::unexpected("label or numeric literal", found)),
            },
            "BLKW" => Directive::Blkw(self.uimm()?),
            "STRINGZ" => match self.advance() {
                Some(Token::Str(s)) => Directive::Stringz(s.clone()),
                found => return Err(Self::unexpected("string literal", found)),
            },
            "END" => Directive::End,
            _ => return Err(ParseErrKind::UnknownDirective(name.to_string())),
        };

        Ok(directive)
    }
}

/// The condition code of a `BR` mnemonic (already upper-cased), if it is one.
///
/// Flags must appear in `NZP` order. A bare `BR` branches unconditionally.
fn br_cond(mnemonic: &str) -> Option<CondCode> {
    let mut flags = mnemonic.strip_prefix("BR")?;
    let mut cc = 0;
    for (flag, bit) in [('N', 0b100), ('Z', 0b010), ('P', 0b001)] {
        if let Some(rest) = flags.strip_prefix(flag) {
            cc |= bit;
            flags = rest;
        }
    }

    match (flags.is_empty(), cc) {
        (false, _) => None,
        (true, 0)  => Some(0b111),
        (true, cc) => Some(cc),
    }
}

fn is_mnemonic(upper: &str) -> bool {
    matches!(upper,
        "ADD" | "AND" | "NOT" | "JMP" | "JSR" | "JSRR" | "LD" | "LDI" | "LDR" | "LEA" |
        "ST" | "STI" | "STR" | "TRAP" | "RET" | "RTI" | "NOP" |
        "GETC" | "OUT" | "PUTC" | "PUTS" | "IN" | "PUTSP" | "HALT"
    ) || br_cond(upper).is_some()
}
