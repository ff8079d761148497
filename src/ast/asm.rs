//! Statements as written in assembly source.
//!
//! A source file parses into a list of [`Stmt`]s,
//! each of which is either an [`AsmInstr`] or a [`Directive`].

use super::{CondCode, IOffset, ImmOrReg, Offset, PCOffset, Reg, TrapVect8};

/// An instruction as written in assembly source.
///
/// Unlike [`SimInstr`](super::sim::SimInstr), this includes aliases
/// and allows PC offsets to be written as labels.
#[allow(missing_docs)]
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub enum AsmInstr {
    ADD(Reg, Reg, ImmOrReg<5>),
    AND(Reg, Reg, ImmOrReg<5>),
    BR(CondCode, PCOffset<i16, 9>),
    JMP(Reg),
    JSR(PCOffset<i16, 11>),
    JSRR(Reg),
    LD(Reg, PCOffset<i16, 9>),
    LDI(Reg, PCOffset<i16, 9>),
    LDR(Reg, Reg, IOffset<6>),
    LEA(Reg, PCOffset<i16, 9>),
    NOT(Reg, Reg),
    RET,
    RTI,
    ST(Reg, PCOffset<i16, 9>),
    STI(Reg, PCOffset<i16, 9>),
    STR(Reg, Reg, IOffset<6>),
    TRAP(TrapVect8),
    /// A `BR` which never branches.
    NOP,

    GETC,
    OUT,
    PUTC,
    PUTS,
    IN,
    PUTSP,
    HALT
}

/// An assembler directive.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub enum Directive {
    /// `.orig ADDR`: the address the program is loaded at.
    Orig(Offset<u16, 16>),
    /// `.fill VALUE`: one word holding a value or a label's address.
    Fill(PCOffset<u16, 16>),
    /// `.blkw N`: `N` zeroed words.
    Blkw(Offset<u16, 16>),
    /// `.stringz "STR"`: one word per byte of the string, then a zero word.
    Stringz(String),
    /// `.end`: the end of the program.
    End
}
impl Directive {
    /// The number of words this directive occupies in the object file.
    pub fn word_len(&self) -> u32 {
        match self {
            Directive::Orig(_)    => 0,
            Directive::Fill(_)    => 1,
            Directive::Blkw(n)    => u32::from(n.get()),
            Directive::Stringz(s) => s.len() as u32 + 1,
            Directive::End        => 0,
        }
    }
}

/// Either an instruction or a directive.
#[allow(missing_docs)]
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub enum StmtKind {
    Instr(AsmInstr),
    Directive(Directive)
}

/// A single statement of assembly source, along with any labels attached to it.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct Stmt {
    /// The labels naming this statement's address.
    ///
    /// A label on a line of its own attaches to the next statement.
    pub labels: Vec<String>,
    /// The instruction or directive.
    pub nucleus: StmtKind,
    /// The 1-indexed source line of the statement.
    pub line: usize
}
