//! Assembling assembly source ASTs into object files.
//!
//! This module is used to convert source ASTs (`Vec<`[`Stmt`]`>`) into object files
//! that can be executed by the simulator.
//!
//! The assembler module notably consists of:
//! - [`assemble`]: The main function which assembles the statements into an object file.
//! - [`SymbolTable`]: a struct holding the symbol table, which stores the address of each label after the first assembler pass
//! - [`ObjectFile`]: a struct holding the object file, which can be loaded into the simulator and executed
//!
//! A program consists of exactly one `.orig`/`.end` block,
//! since an object file only carries a single origin.
//!
//! [`Stmt`]: crate::ast::asm::Stmt

pub mod encoding;

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use crate::ast::asm::{AsmInstr, Directive, Stmt, StmtKind};
use crate::ast::sim::SimInstr;
use crate::ast::reg_consts::R7;
use crate::ast::{IOffset, ImmOrReg, Offset, OffsetNewErr, PCOffset};
use crate::sim::mem::MEM_SIZE;
use crate::sim::trap::TrapVect;
use crate::sim::SimErr;

/// Assembles an assembly source AST into an object file.
///
/// # Example
/// ```
/// use lc3_sim::parse::parse_ast;
/// use lc3_sim::asm::assemble;
///
/// let src = "
///     .orig x3000
///     LABEL: BR LABEL
///     .end
/// ";
/// let ast = parse_ast(src).unwrap();
///
/// let obj_file = assemble(ast).unwrap();
/// assert_eq!(obj_file.origin(), 0x3000);
/// assert_eq!(obj_file.words(), [0x0FFF]);
/// ```
pub fn assemble(ast: Vec<Stmt>) -> Result<ObjectFile, AsmErr> {
    let sym = SymbolTable::new(&ast)?;

    let mut words = Vec::with_capacity(sym.len as usize);
    let mut lc = sym.origin;
    for stmt in ast {
        let line = stmt.line;
        let at_line = |kind| AsmErr::new(kind, line);

        match stmt.nucleus {
            StmtKind::Instr(instr) => {
                let sim_instr = instr.into_sim_instr(lc.wrapping_add(1), &sym).map_err(at_line)?;
                words.push(sim_instr.encode());
            },
            StmtKind::Directive(directive) => {
                let len = directive.word_len();
                match directive {
                    Directive::Orig(_) | Directive::End => {},
                    Directive::Fill(PCOffset::Offset(value)) => words.push(value.get()),
                    Directive::Fill(PCOffset::Label(label)) => words.push(sym.resolve(&label).map_err(at_line)?),
                    Directive::Blkw(n) => words.resize(words.len() + usize::from(n.get()), 0),
                    Directive::Stringz(s) => {
                        words.extend(s.bytes().map(u16::from));
                        words.push(0);
                    },
                }
                lc = lc.wrapping_add(len as u16);
                continue;
            }
        }
        lc = lc.wrapping_add(1);
    }

    tracing::debug!(origin = sym.origin, len = words.len(), "assembled object file");
    ObjectFile::new(sym.origin, words)
        .map_err(|_| AsmErr::new(AsmErrKind::EmptyProgram, None))
}

/// Kinds of errors that can occur from assembling given assembly code.
///
/// See [`AsmErr`] for this error type with line information included.
#[derive(Debug, PartialEq, Eq, Hash, Clone, thiserror::Error)]
pub enum AsmErrKind {
    /// The program has no `.orig` (pass 1).
    #[error("program has no .orig directive")]
    NoOrig,
    /// There was a second `.orig` (pass 1).
    #[error("program has more than one .orig directive")]
    MultipleOrig,
    /// There was an `.orig` but no `.end` (pass 1).
    #[error(".orig directive was never closed")]
    UnclosedOrig,
    /// A statement appears before `.orig` or after `.end` (pass 1).
    #[error("statement is outside of the .orig/.end block")]
    OutsideOrig,
    /// A label was defined more than once (pass 1).
    #[error("label {0} was defined multiple times")]
    DuplicateLabel(String),
    /// The program runs past the end of memory (pass 1).
    #[error("program does not fit in memory")]
    ProgramTooLong,
    /// A label was used but never defined (pass 2).
    #[error("label {0} could not be found")]
    UndefinedLabel(String),
    /// The distance to a label does not fit the instruction's offset (pass 2).
    #[error("{0}")]
    OffsetNewErr(#[from] OffsetNewErr),
    /// The program assembled to no words at all.
    #[error("program is empty")]
    EmptyProgram,
}

/// Error from assembling given assembly code.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct AsmErr {
    /// What went wrong.
    pub kind: AsmErrKind,
    /// The source line of the statement at fault, if a single one is.
    pub line: Option<usize>
}
impl AsmErr {
    /// Creates a new [`AsmErr`].
    pub fn new(kind: AsmErrKind, line: impl Into<Option<usize>>) -> Self {
        AsmErr { kind, line: line.into() }
    }
}
impl std::fmt::Display for AsmErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.line {
            Some(line) => write!(f, "line {line}: {}", self.kind),
            None => self.kind.fmt(f),
        }
    }
}
impl std::error::Error for AsmErr {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            AsmErrKind::OffsetNewErr(e) => Some(e),
            _ => None
        }
    }
}
impl crate::err::Error for AsmErr {
    fn help(&self) -> Option<std::borrow::Cow<str>> {
        match &self.kind {
            AsmErrKind::NoOrig           => Some("start the program with .orig ADDR".into()),
            AsmErrKind::MultipleOrig     => Some("an object file holds a single block; merge the blocks into one".into()),
            AsmErrKind::UnclosedOrig     => Some("add an .end directive at the end of the program".into()),
            AsmErrKind::OutsideOrig      => Some("move this statement between .orig and .end".into()),
            AsmErrKind::DuplicateLabel(_) => Some("rename one of the labels".into()),
            AsmErrKind::ProgramTooLong   => Some("move the .orig to a lower address or shorten the program".into()),
            AsmErrKind::UndefinedLabel(_) => Some("check the spelling of the label".into()),
            AsmErrKind::OffsetNewErr(e)  => crate::err::Error::help(e),
            AsmErrKind::EmptyProgram     => Some("add at least one instruction or directive that takes space".into()),
        }
    }
}

/// The symbol table created in the first assembler pass,
/// mapping each label to its address.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct SymbolTable {
    origin: u16,
    /// Number of words in the program.
    len: u32,
    labels: HashMap<String, u16>
}
impl SymbolTable {
    /// Creates a new symbol table by running the first assembler pass over the statements.
    ///
    /// This checks the program's `.orig`/`.end` structure and assigns an address to every label.
    pub fn new(stmts: &[Stmt]) -> Result<Self, AsmErr> {
        let mut origin = None;
        let mut ended = false;
        let mut lc: u32 = 0;
        let mut labels = HashMap::new();

        for stmt in stmts {
            let err = |kind| AsmErr::new(kind, stmt.line);

            match &stmt.nucleus {
                StmtKind::Directive(Directive::Orig(addr)) => {
                    if origin.is_some() {
                        return Err(err(AsmErrKind::MultipleOrig));
                    }
                    if !stmt.labels.is_empty() {
                        return Err(err(AsmErrKind::OutsideOrig));
                    }
                    origin = Some(addr.get());
                    lc = u32::from(addr.get());
                },
                _ if origin.is_none() || ended => return Err(err(AsmErrKind::OutsideOrig)),
                StmtKind::Directive(Directive::End) => ended = true,
                _ => {}
            }

            // a label here would point past the end of memory
            if !stmt.labels.is_empty() && lc >= MEM_SIZE as u32 {
                return Err(err(AsmErrKind::ProgramTooLong));
            }
            for label in &stmt.labels {
                match labels.entry(label.clone()) {
                    Entry::Occupied(_) => return Err(err(AsmErrKind::DuplicateLabel(label.clone()))),
                    Entry::Vacant(e) => { e.insert(lc as u16); },
                }
            }

            lc += match &stmt.nucleus {
                StmtKind::Instr(_) => 1,
                StmtKind::Directive(d) => d.word_len(),
            };
            if lc > MEM_SIZE as u32 {
                return Err(err(AsmErrKind::ProgramTooLong));
            }
        }

        let Some(origin) = origin else {
            return Err(AsmErr::new(AsmErrKind::NoOrig, None));
        };
        if !ended {
            return Err(AsmErr::new(AsmErrKind::UnclosedOrig, None));
        }

        Ok(SymbolTable { origin, len: lc - u32::from(origin), labels })
    }

    /// Gets the address of a given label (if it exists).
    pub fn lookup_label(&self, label: &str) -> Option<u16> {
        self.labels.get(label).copied()
    }

    fn resolve(&self, label: &str) -> Result<u16, AsmErrKind> {
        self.lookup_label(label)
            .ok_or_else(|| AsmErrKind::UndefinedLabel(label.to_string()))
    }
}

/// Replaces a label with the offset from `pc` to it.
fn replace_pc_offset<const N: u32>(off: PCOffset<i16, N>, pc: u16, sym: &SymbolTable) -> Result<IOffset<N>, AsmErrKind> {
    match off {
        PCOffset::Offset(off) => Ok(off),
        PCOffset::Label(label) => {
            let addr = sym.resolve(&label)?;
            Ok(IOffset::new(addr.wrapping_sub(pc) as i16)?)
        },
    }
}

impl AsmInstr {
    /// Converts an ASM instruction into a simulator instruction ([`SimInstr`])
    /// by resolving labels and erasing aliases.
    ///
    /// Parameters:
    /// - `pc`: the incremented PC (the address after this instruction)
    /// - `sym`: The symbol table
    pub fn into_sim_instr(self, pc: u16, sym: &SymbolTable) -> Result<SimInstr, AsmErrKind> {
        let trap = |vect: TrapVect| SimInstr::TRAP(Offset::new_trunc(vect as u16));

        let instr = match self {
            AsmInstr::ADD(dr, sr1, sr2) => SimInstr::ADD(dr, sr1, sr2),
            AsmInstr::AND(dr, sr1, sr2) => SimInstr::AND(dr, sr1, sr2),
            AsmInstr::BR(cc, off)       => SimInstr::BR(cc, replace_pc_offset(off, pc, sym)?),
            AsmInstr::JMP(br)           => SimInstr::JMP(br),
            AsmInstr::JSR(off)          => SimInstr::JSR(ImmOrReg::Imm(replace_pc_offset(off, pc, sym)?)),
            AsmInstr::JSRR(br)          => SimInstr::JSR(ImmOrReg::Reg(br)),
            AsmInstr::LD(dr, off)       => SimInstr::LD(dr, replace_pc_offset(off, pc, sym)?),
            AsmInstr::LDI(dr, off)      => SimInstr::LDI(dr, replace_pc_offset(off, pc, sym)?),
            AsmInstr::LDR(dr, br, off)  => SimInstr::LDR(dr, br, off),
            AsmInstr::LEA(dr, off)      => SimInstr::LEA(dr, replace_pc_offset(off, pc, sym)?),
            AsmInstr::NOT(dr, sr)       => SimInstr::NOT(dr, sr),
            AsmInstr::RET               => SimInstr::JMP(R7),
            AsmInstr::RTI               => SimInstr::RTI,
            AsmInstr::ST(sr, off)       => SimInstr::ST(sr, replace_pc_offset(off, pc, sym)?),
            AsmInstr::STI(sr, off)      => SimInstr::STI(sr, replace_pc_offset(off, pc, sym)?),
            AsmInstr::STR(sr, br, off)  => SimInstr::STR(sr, br, off),
            AsmInstr::TRAP(vect)        => SimInstr::TRAP(vect),
            AsmInstr::NOP               => SimInstr::BR(0b000, Offset::new_trunc(0)),
            AsmInstr::GETC              => trap(TrapVect::GETC),
            AsmInstr::OUT               => trap(TrapVect::OUT),
            AsmInstr::PUTC              => trap(TrapVect::OUT),
            AsmInstr::PUTS              => trap(TrapVect::PUTS),
            AsmInstr::IN                => trap(TrapVect::IN),
            AsmInstr::PUTSP             => trap(TrapVect::PUTSP),
            AsmInstr::HALT              => trap(TrapVect::HALT),
        };

        Ok(instr)
    }
}

/// An object file.
///
/// This is the final product after assembly source code is fully assembled,
/// or what is read back from disk (see [`encoding`]).
/// This can be loaded in the simulator to run the assembled code.
///
/// Invariants:
/// - there is at least one word,
/// - the words fit in memory starting at the origin (`origin + len <= 0x10000`).
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ObjectFile {
    origin: u16,
    words: Vec<u16>
}
impl ObjectFile {
    /// Creates an object file which loads `words` starting at `origin`.
    ///
    /// This fails with [`SimErr::FileTooShort`] if there are no words
    /// and with [`SimErr::FileTooLong`] if they would run past the end of memory.
    pub fn new(origin: u16, words: Vec<u16>) -> Result<Self, SimErr> {
        if words.is_empty() {
            return Err(SimErr::FileTooShort);
        }
        if usize::from(origin) + words.len() > MEM_SIZE {
            return Err(SimErr::FileTooLong);
        }
        Ok(ObjectFile { origin, words })
    }

    /// The address the first word is loaded at.
    pub fn origin(&self) -> u16 {
        self.origin
    }

    /// The words of the program.
    pub fn words(&self) -> &[u16] {
        &self.words
    }

    /// The address one past the last word of the program.
    ///
    /// This can be `0x10000` if the program runs up to the end of memory.
    pub fn end(&self) -> u32 {
        u32::from(self.origin) + self.words.len() as u32
    }
}
