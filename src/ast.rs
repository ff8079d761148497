//! Operand types shared between assembly source and decoded instructions.
//!
//! These components are used to construct...
//! - [`asm::AsmInstr`] (an instruction as written in assembly source code),
//! - [`asm::Directive`] (an assembler directive),
//! - and [`sim::SimInstr`] (an instruction decoded from a machine word).

pub mod asm;
pub mod sim;

use std::fmt::Write as _;

use offset_base::OffsetBacking;

/// A register. Must be between 0 and 7.
///
/// This `Reg` struct can either be constructed by selecting a register from [`reg_consts`],
/// or by using [`Reg::try_from`].
///
/// ```text
/// ADD R1, R0, #5
///     ~~  ~~
/// LDR R2, R6, #-1
///     ~~  ~~
/// ```
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub struct Reg(pub(crate) u8);

/// Register constants!
pub mod reg_consts {
    use super::Reg;

    /// The 0th register in the register file.
    pub const R0: Reg = Reg(0);
    /// The 1st register in the register file.
    pub const R1: Reg = Reg(1);
    /// The 2nd register in the register file.
    pub const R2: Reg = Reg(2);
    /// The 3rd register in the register file.
    pub const R3: Reg = Reg(3);
    /// The 4th register in the register file.
    pub const R4: Reg = Reg(4);
    /// The 5th register in the register file.
    pub const R5: Reg = Reg(5);
    /// The 6th register in the register file (stack pointer by convention).
    pub const R6: Reg = Reg(6);
    /// The 7th register in the register file (return address).
    pub const R7: Reg = Reg(7);
}
impl Reg {
    /// Gets the register number of this [`Reg`]. This is always between 0 and 7.
    pub fn reg_no(self) -> u8 {
        self.0
    }

    /// Creates a register from the 3-bit field of an instruction word.
    pub(crate) fn from_field(field: u16) -> Self {
        Reg((field & 0b111) as u8)
    }
}
impl std::fmt::Display for Reg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "R{}", self.0)
    }
}
impl From<Reg> for usize {
    fn from(value: Reg) -> Self {
        usize::from(value.0)
    }
}
impl From<Reg> for u16 {
    fn from(value: Reg) -> Self {
        u16::from(value.0)
    }
}
impl TryFrom<u8> for Reg {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0..=7 => Ok(Reg(value)),
            _     => Err(value)
        }
    }
}

/// A condition code mask (used for `BR`), between 0 and 7.
///
/// | instruction   | code (bin) |
/// |---------------|------------|
/// | `NOP`         | `000`      |
/// | `BRn`         | `100`      |
/// | `BRz`         | `010`      |
/// | `BRnz`        | `110`      |
/// | `BRp`         | `001`      |
/// | `BRnp`        | `101`      |
/// | `BRzp`        | `011`      |
/// | `BR`, `BRnzp` | `111`      |
pub type CondCode = u8;

/// A signed offset or immediate of at most `N` bits.
///
/// `IOffset<5>` is `ADD`/`AND`'s imm5, `IOffset<6>` is `LDR`/`STR`'s offset6,
/// `IOffset<9>` is the PC offset of `BR`, `LD`, `ST`, `LDI`, `STI`, `LEA`,
/// and `IOffset<11>` is `JSR`'s PC offset.
pub type IOffset<const N: u32> = Offset<i16, N>;
/// An unsigned 8-bit trap vector (used for `TRAP`).
///
/// ```text
/// TRAP x25
///      ~~~
/// ```
pub type TrapVect8 = Offset<u16, 8>;

/// Either an immediate value or a register.
///
/// This is the last operand of `ADD` and `AND`, selected by bit 5 of the word,
/// and the target of `JSR`/`JSRR`, selected by bit 11.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum ImmOrReg<const N: u32> {
    #[allow(missing_docs)]
    Imm(IOffset<N>),
    #[allow(missing_docs)]
    Reg(Reg)
}
impl<const N: u32> std::fmt::Display for ImmOrReg<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImmOrReg::Imm(imm) => imm.fmt(f),
            ImmOrReg::Reg(reg) => reg.fmt(f),
        }
    }
}

/// A value which fits in `N` bits of an instruction word.
///
/// The signedness depends on the backing type:
/// - `Offset<i16, _>`: signed, sign-extended from bit `N - 1` (also aliased as [`IOffset`])
/// - `Offset<u16, _>`: unsigned, zero-extended
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub struct Offset<OFF, const N: u32>(OFF);

impl<OFF: std::fmt::Display, const N: u32> std::fmt::Display for Offset<OFF, N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_char('#')?;
        self.0.fmt(f)
    }
}
impl<OFF: std::fmt::UpperHex, const N: u32> std::fmt::UpperHex for Offset<OFF, N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_char('x')?;
        self.0.fmt(f)
    }
}

/// The errors that can result from calling [`Offset::new`].
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, thiserror::Error)]
pub enum OffsetNewErr {
    /// The provided offset cannot fit an unsigned integer of the given bitsize.
    #[error("value is too big for unsigned {0}-bit integer")]
    CannotFitUnsigned(u32),
    /// The provided offset cannot fit a signed integer of the given bitsize.
    #[error("value is too big for signed {0}-bit integer")]
    CannotFitSigned(u32)
}
impl crate::err::Error for OffsetNewErr {
    fn help(&self) -> Option<std::borrow::Cow<str>> {
        let help = match self {
            OffsetNewErr::CannotFitUnsigned(n) => format!("the range for an unsigned {n}-bit integer is [0, {}]", (1 << n) - 1),
            OffsetNewErr::CannotFitSigned(n) => format!("the range for a signed {n}-bit integer is [{}, {}]", (-1) << (n - 1), (1 << (n - 1)) - 1),
        };

        Some(help.into())
    }
}

mod offset_base {
    use super::OffsetNewErr;
    use crate::bits::{mask, sign_extend};

    /// Any type that could store a value for [`Offset`].
    ///
    /// [`Offset`]: super::Offset
    pub trait OffsetBacking: Copy + Eq {
        /// How many bits are contained within this backing.
        const BITS: u32;

        /// Keeps the low `bit_size` bits, extending them back to the full backing.
        fn truncate(self, bit_size: u32) -> Self;

        /// The error to raise if a value changes when truncated to `bit_size` bits.
        fn does_not_fit_error(bit_size: u32) -> OffsetNewErr;
    }

    impl OffsetBacking for u16 {
        const BITS: u32 = u16::BITS;

        fn truncate(self, bit_size: u32) -> Self {
            self & mask(bit_size)
        }
        fn does_not_fit_error(bit_size: u32) -> OffsetNewErr {
            OffsetNewErr::CannotFitUnsigned(bit_size)
        }
    }
    impl OffsetBacking for i16 {
        const BITS: u32 = i16::BITS;

        fn truncate(self, bit_size: u32) -> Self {
            sign_extend(self as u16 & mask(bit_size), bit_size)
        }
        fn does_not_fit_error(bit_size: u32) -> OffsetNewErr {
            OffsetNewErr::CannotFitSigned(bit_size)
        }
    }
}

impl<OFF: OffsetBacking, const N: u32> Offset<OFF, N> {
    /// Creates a new offset value.
    /// This must fit within `N` bits of the representation, otherwise an error is raised.
    ///
    /// # Examples
    ///
    /// ```
    /// # use lc3_sim::ast::Offset;
    /// #
    /// assert!(Offset::<i16, 5>::new(-16).is_ok());
    /// assert!(Offset::<i16, 5>::new(15).is_ok());
    /// assert!(Offset::<i16, 5>::new(16).is_err());
    ///
    /// assert!(Offset::<u16, 8>::new(0xFF).is_ok());
    /// assert!(Offset::<u16, 8>::new(0x100).is_err());
    /// ```
    ///
    /// # Panics
    ///
    /// This will panic if `N` is larger than the offset backing (e.g., for backing `u16`, larger than 16).
    pub fn new(n: OFF) -> Result<Self, OffsetNewErr> {
        assert!(N <= OFF::BITS, "bit size {N} exceeds size of backing ({})", OFF::BITS);
        match n == n.truncate(N) {
            true  => Ok(Offset(n)),
            false => Err(OFF::does_not_fit_error(N)),
        }
    }

    /// Creates a new offset from the first `N` bits of the value, discarding the rest.
    ///
    /// The field is sign-extended if the backing is signed
    /// and zero-extended if the backing is unsigned.
    ///
    /// ```
    /// # use lc3_sim::ast::Offset;
    /// #
    /// assert_eq!(Offset::<i16, 5>::new_trunc(0b11011).get(), -5);
    /// assert_eq!(Offset::<i16, 5>::new_trunc(0b01111).get(), 15);
    /// assert_eq!(Offset::<u16, 5>::new_trunc(32).get(), 0);
    /// ```
    ///
    /// # Panics
    ///
    /// This will panic if `N` is larger than the offset backing (e.g., for backing `u16`, larger than 16).
    pub fn new_trunc(n: OFF) -> Self {
        assert!(N <= OFF::BITS, "bit size {N} exceeds size of backing ({})", OFF::BITS);
        Self(n.truncate(N))
    }

    /// Gets the value of the offset.
    pub fn get(&self) -> OFF {
        self.0
    }
}
impl<const N: u32> IOffset<N> {
    /// Sign-extends an `N`-bit field of an instruction word.
    pub(crate) fn from_field(field: u16) -> Self {
        Self::new_trunc(field as i16)
    }
    /// The `N`-bit field this offset occupies in an instruction word.
    pub(crate) fn field(&self) -> u16 {
        self.0 as u16 & crate::bits::mask(N)
    }
}

/// An offset or a label.
///
/// This is used to represent operands which may be written as a label in assembly
/// (PC offsets of `BR`, `LD`, `JSR`, etc. and the value of `.FILL`).
///
/// The assembler replaces labels with a regular [`Offset`] in its second pass.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub enum PCOffset<OFF, const N: u32> {
    #[allow(missing_docs)]
    Offset(Offset<OFF, N>),
    #[allow(missing_docs)]
    Label(String)
}
impl<OFF, const N: u32> std::fmt::Display for PCOffset<OFF, N>
    where Offset<OFF, N>: std::fmt::Display
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PCOffset::Offset(off)  => off.fmt(f),
            PCOffset::Label(label) => label.fmt(f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{IOffset, Offset, OffsetNewErr, Reg};

    #[test]
    fn test_reg_try_from() {
        assert_eq!(Reg::try_from(7), Ok(Reg(7)));
        assert_eq!(Reg::try_from(8), Err(8));
        assert_eq!(Reg::from_field(0b1010), Reg(2));
    }

    #[test]
    fn test_offset_ranges() {
        assert_eq!(IOffset::<6>::new(-32).map(|o| o.get()), Ok(-32));
        assert_eq!(IOffset::<6>::new(32), Err(OffsetNewErr::CannotFitSigned(6)));
        assert_eq!(IOffset::<9>::new(-257), Err(OffsetNewErr::CannotFitSigned(9)));
        assert_eq!(Offset::<u16, 8>::new(0x25).map(|o| o.get()), Ok(0x25));
        assert_eq!(Offset::<u16, 16>::new(0xFFFF).map(|o| o.get()), Ok(0xFFFF));
    }

    #[test]
    fn test_offset_field_roundtrip() {
        let off = IOffset::<9>::from_field(0x1FE);
        assert_eq!(off.get(), -2);
        assert_eq!(off.field(), 0x1FE);

        let off = IOffset::<11>::from_field(0x3FF);
        assert_eq!(off.get(), 1023);
        assert_eq!(off.field(), 0x3FF);
    }
}
