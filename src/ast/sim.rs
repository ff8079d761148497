//! Instructions as the simulator sees them.
//!
//! A [`SimInstr`] is produced from a machine word by [`SimInstr::decode`]
//! and converted back by [`SimInstr::encode`].
//! Aliases such as `RET` or `HALT` do not exist here; they are
//! lowered by the assembler into the instruction they stand for.

use crate::bits::{bit, bits};
use crate::sim::SimErr;

use super::{CondCode, IOffset, ImmOrReg, Reg, TrapVect8};

int_vect! {
    /// The instruction class of a word, held in its top 4 bits.
    ///
    /// `0b1101` is reserved and has no variant.
    #[allow(missing_docs)]
    pub enum Opcode {
        BR   = 0b0000,
        ADD  = 0b0001,
        LD   = 0b0010,
        ST   = 0b0011,
        JSR  = 0b0100,
        AND  = 0b0101,
        LDR  = 0b0110,
        STR  = 0b0111,
        RTI  = 0b1000,
        NOT  = 0b1001,
        LDI  = 0b1010,
        STI  = 0b1011,
        JMP  = 0b1100,
        LEA  = 0b1110,
        TRAP = 0b1111
    }
}

/// A decoded instruction.
///
/// Operands are listed in the order they appear in assembly.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum SimInstr {
    /// `BR{n,z,p} PCoffset9`
    BR(CondCode, IOffset<9>),
    /// `ADD DR, SR1, SR2/imm5`
    ADD(Reg, Reg, ImmOrReg<5>),
    /// `LD DR, PCoffset9`
    LD(Reg, IOffset<9>),
    /// `ST SR, PCoffset9`
    ST(Reg, IOffset<9>),
    /// `JSR PCoffset11` or `JSRR BaseR`
    JSR(ImmOrReg<11>),
    /// `AND DR, SR1, SR2/imm5`
    AND(Reg, Reg, ImmOrReg<5>),
    /// `LDR DR, BaseR, offset6`
    LDR(Reg, Reg, IOffset<6>),
    /// `STR SR, BaseR, offset6`
    STR(Reg, Reg, IOffset<6>),
    /// `RTI`
    RTI,
    /// `NOT DR, SR`
    NOT(Reg, Reg),
    /// `LDI DR, PCoffset9`
    LDI(Reg, IOffset<9>),
    /// `STI SR, PCoffset9`
    STI(Reg, IOffset<9>),
    /// `JMP BaseR`
    JMP(Reg),
    /// `LEA DR, PCoffset9`
    LEA(Reg, IOffset<9>),
    /// `TRAP trapvect8`
    TRAP(TrapVect8),
}

impl SimInstr {
    /// Gets the opcode of this instruction.
    pub fn opcode(&self) -> Opcode {
        match self {
            SimInstr::BR(..)   => Opcode::BR,
            SimInstr::ADD(..)  => Opcode::ADD,
            SimInstr::LD(..)   => Opcode::LD,
            SimInstr::ST(..)   => Opcode::ST,
            SimInstr::JSR(..)  => Opcode::JSR,
            SimInstr::AND(..)  => Opcode::AND,
            SimInstr::LDR(..)  => Opcode::LDR,
            SimInstr::STR(..)  => Opcode::STR,
            SimInstr::RTI      => Opcode::RTI,
            SimInstr::NOT(..)  => Opcode::NOT,
            SimInstr::LDI(..)  => Opcode::LDI,
            SimInstr::STI(..)  => Opcode::STI,
            SimInstr::JMP(..)  => Opcode::JMP,
            SimInstr::LEA(..)  => Opcode::LEA,
            SimInstr::TRAP(..) => Opcode::TRAP,
        }
    }

    /// Decodes a machine word into an instruction.
    ///
    /// This fails with [`SimErr::MalformedInstr`] if the opcode is reserved,
    /// and with [`SimErr::MalformedPadding`] if a field which must be fixed is not.
    /// The trap vector is not validated here.
    ///
    /// ```
    /// use lc3_sim::ast::sim::SimInstr;
    /// use lc3_sim::ast::reg_consts::{R0, R1};
    /// use lc3_sim::ast::{ImmOrReg, Offset};
    ///
    /// let instr = SimInstr::decode(0x1225).unwrap();
    /// assert_eq!(instr, SimInstr::ADD(R1, R0, ImmOrReg::Imm(Offset::new_trunc(5))));
    /// ```
    pub fn decode(word: u16) -> Result<Self, SimErr> {
        let opcode = Opcode::try_from(bits(word, 12, 4))
            .map_err(|op| SimErr::MalformedInstr(op as u8))?;

        let padding = |fixed: bool, expected: &'static str| match fixed {
            true  => Ok(()),
            false => Err(SimErr::MalformedPadding { opcode, expected }),
        };
        let dr = Reg::from_field(bits(word, 9, 3));
        let sr1 = Reg::from_field(bits(word, 6, 3));
        let off9 = || IOffset::<9>::from_field(bits(word, 0, 9));
        let off6 = || IOffset::<6>::from_field(bits(word, 0, 6));
        let alu_operand = || -> Result<ImmOrReg<5>, SimErr> {
            match bit(word, 5) {
                true => Ok(ImmOrReg::Imm(IOffset::from_field(bits(word, 0, 5)))),
                false => {
                    padding(bits(word, 3, 2) == 0, "bits [4:3] to be 0")?;
                    Ok(ImmOrReg::Reg(Reg::from_field(bits(word, 0, 3))))
                }
            }
        };

        let instr = match opcode {
            Opcode::BR  => SimInstr::BR(bits(word, 9, 3) as CondCode, off9()),
            Opcode::ADD => SimInstr::ADD(dr, sr1, alu_operand()?),
            Opcode::LD  => SimInstr::LD(dr, off9()),
            Opcode::ST  => SimInstr::ST(dr, off9()),
            Opcode::JSR => match bit(word, 11) {
                true => SimInstr::JSR(ImmOrReg::Imm(IOffset::from_field(bits(word, 0, 11)))),
                false => {
                    padding(bits(word, 9, 2) == 0, "bits [10:9] to be 0")?;
                    SimInstr::JSR(ImmOrReg::Reg(sr1))
                }
            },
            Opcode::AND => SimInstr::AND(dr, sr1, alu_operand()?),
            Opcode::LDR => SimInstr::LDR(dr, sr1, off6()),
            Opcode::STR => SimInstr::STR(dr, sr1, off6()),
            Opcode::RTI => SimInstr::RTI,
            Opcode::NOT => {
                padding(bits(word, 0, 5) == 0b11111, "bits [4:0] to be 1")?;
                SimInstr::NOT(dr, sr1)
            },
            Opcode::LDI => SimInstr::LDI(dr, off9()),
            Opcode::STI => SimInstr::STI(dr, off9()),
            Opcode::JMP => {
                padding(bits(word, 9, 3) == 0 && bits(word, 0, 6) == 0, "bits [11:9] and [5:0] to be 0")?;
                SimInstr::JMP(sr1)
            },
            Opcode::LEA => SimInstr::LEA(dr, off9()),
            Opcode::TRAP => {
                padding(bits(word, 8, 4) == 0, "bits [11:8] to be 0")?;
                SimInstr::TRAP(TrapVect8::new_trunc(bits(word, 0, 8)))
            },
        };

        Ok(instr)
    }

    /// Encodes this instruction into a machine word.
    ///
    /// Fixed fields are filled with their canonical values,
    /// so decoding the result yields the same instruction.
    pub fn encode(&self) -> u16 {
        let op = (self.opcode() as u16) << 12;
        let alu = |dr: Reg, sr1: Reg, sr2: ImmOrReg<5>| {
            let last = match sr2 {
                ImmOrReg::Imm(imm) => 0b1_00000 | imm.field(),
                ImmOrReg::Reg(r)   => u16::from(r),
            };
            u16::from(dr) << 9 | u16::from(sr1) << 6 | last
        };

        let operands = match *self {
            SimInstr::BR(cc, off)       => u16::from(cc & 0b111) << 9 | off.field(),
            SimInstr::ADD(dr, sr1, sr2) => alu(dr, sr1, sr2),
            SimInstr::LD(dr, off)       => u16::from(dr) << 9 | off.field(),
            SimInstr::ST(sr, off)       => u16::from(sr) << 9 | off.field(),
            SimInstr::JSR(ImmOrReg::Imm(off)) => 1 << 11 | off.field(),
            SimInstr::JSR(ImmOrReg::Reg(br))  => u16::from(br) << 6,
            SimInstr::AND(dr, sr1, sr2) => alu(dr, sr1, sr2),
            SimInstr::LDR(dr, br, off)  => u16::from(dr) << 9 | u16::from(br) << 6 | off.field(),
            SimInstr::STR(sr, br, off)  => u16::from(sr) << 9 | u16::from(br) << 6 | off.field(),
            SimInstr::RTI               => 0,
            SimInstr::NOT(dr, sr)       => u16::from(dr) << 9 | u16::from(sr) << 6 | 0b111111,
            SimInstr::LDI(dr, off)      => u16::from(dr) << 9 | off.field(),
            SimInstr::STI(sr, off)      => u16::from(sr) << 9 | off.field(),
            SimInstr::JMP(br)           => u16::from(br) << 6,
            SimInstr::LEA(dr, off)      => u16::from(dr) << 9 | off.field(),
            SimInstr::TRAP(vect)        => vect.get(),
        };

        op | operands
    }
}
