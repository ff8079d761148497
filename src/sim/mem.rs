//! Memory handling for the LC-3 simulator.
//!
//! This module consists of:
//! - [`Mem`]: The memory, along with the bounds of the loaded program.
//! - [`RegFile`]: The register file.
//!
//! Memory outside of the loaded program is filled with sentinel words
//! ([`BEFORE_SENTINEL`] below the program, [`AFTER_SENTINEL`] above it),
//! which lets the simulator notice when execution runs off of the program.

use crate::asm::ObjectFile;
use crate::ast::Reg;

use super::SimErr;

/// The number of words in memory.
pub const MEM_SIZE: usize = 1 << 16;
/// The highest address a program may access.
///
/// Everything above this is the memory-mapped IO page (`xFE00`-`xFFFF`).
pub const MEMORY_USER_MAX: u16 = 0xFDFF;
/// The word filling memory below the loaded program.
pub const BEFORE_SENTINEL: u16 = 0xDDDD;
/// The word filling memory above the loaded program.
pub const AFTER_SENTINEL: u16 = 0xEEEE;

/// The half-open range `[start, end)` of memory filled by the loaded program.
///
/// `end` can be `0x10000` if the program runs up to the end of memory.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, Default)]
pub struct Bounds {
    /// The first address of the program (its origin).
    pub start: u16,
    /// One past the last address of the program.
    pub end: u32
}
impl Bounds {
    /// Whether the address was filled by the program.
    pub fn contains(&self, addr: u16) -> bool {
        u32::from(self.start) <= u32::from(addr) && u32::from(addr) < self.end
    }
}

/// Memory.
///
/// This can be addressed with any `u16` (16-bit address).
///
/// Note that this struct provides two methods of accessing memory:
/// - [`Mem::get_raw`] and [`Mem::get_raw_mut`]: direct access to memory values
/// - [`Mem::read`] and [`Mem::write`]: memory access as a program performs it
///
/// # `get_raw` and `get_raw_mut`
///
/// These simply access the memory value at the address, without any checks.
///
/// ```
/// use lc3_sim::sim::mem::Mem;
///
/// let mut mem = Mem::new();
/// *mem.get_raw_mut(0x0000) = 11;
/// assert_eq!(mem.get_raw(0x0000), 11);
/// ```
///
/// # `read` and `write`
///
/// In contrast, [`Mem::read`] and [`Mem::write`] only allow addresses
/// from the start of the loaded program up to [`MEMORY_USER_MAX`].
/// Anything lower raises [`SimErr::AddressTooLow`] and anything higher
/// raises [`SimErr::AddressTooHigh`].
///
/// ```
/// use lc3_sim::asm::ObjectFile;
/// use lc3_sim::sim::mem::Mem;
///
/// let mut mem = Mem::new();
/// mem.load(&ObjectFile::new(0x3000, vec![0x1234]).unwrap());
///
/// assert!(mem.write(0x2FFF, 0x9ABC).is_err());
/// assert!(mem.write(0x4000, 0x9ABC).is_ok());
/// assert!(mem.read(0xFE00).is_err());
/// assert_eq!(mem.read(0x4000).unwrap(), 0x9ABC);
/// ```
#[derive(Debug, Clone)]
pub struct Mem {
    data: Box<[u16; MEM_SIZE]>,
    bounds: Bounds
}
impl Mem {
    /// Creates a new memory with nothing loaded.
    pub fn new() -> Self {
        Self {
            data: vec![AFTER_SENTINEL; MEM_SIZE]
                .into_boxed_slice()
                .try_into()
                .unwrap_or_else(|_| unreachable!("vector should have had {MEM_SIZE} elements")),
            bounds: Bounds::default()
        }
    }

    /// Loads an object file into memory, replacing everything that was there.
    ///
    /// The object file's words are copied in starting at its origin,
    /// and all other memory is filled with sentinel words.
    pub fn load(&mut self, obj: &ObjectFile) {
        let start = usize::from(obj.origin());
        let end = start + obj.words().len();

        self.data[..start].fill(BEFORE_SENTINEL);
        self.data[start..end].copy_from_slice(obj.words());
        self.data[end..].fill(AFTER_SENTINEL);
        self.bounds = Bounds { start: obj.origin(), end: obj.end() };
    }

    /// The bounds of the loaded program.
    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// Checks that a program may access the given address.
    pub fn check(&self, addr: u16) -> Result<(), SimErr> {
        match addr {
            a if a < self.bounds.start => Err(SimErr::AddressTooLow(addr)),
            a if a > MEMORY_USER_MAX   => Err(SimErr::AddressTooHigh(addr)),
            _ => Ok(())
        }
    }

    /// Gets the word at the given address.
    ///
    /// This is **only** meant to be used to query the state of the memory,
    /// not to simulate a read. This does not perform any checks;
    /// [`Mem::read`] should be used to simulate a program's read.
    pub fn get_raw(&self, addr: u16) -> u16 {
        // Mem could implement Index<u16>, but it doesn't so that unchecked access is always explicit.
        self.data[usize::from(addr)]
    }

    /// Gets a mutable reference to the word at the given address.
    ///
    /// This is **only** meant to be used to edit the state of the memory,
    /// not to simulate a write. This does not perform any checks;
    /// [`Mem::write`] should be used to simulate a program's write.
    pub fn get_raw_mut(&mut self, addr: u16) -> &mut u16 {
        &mut self.data[usize::from(addr)]
    }

    /// Fallibly reads the word at the provided address, erroring if it is out of bounds.
    pub fn read(&self, addr: u16) -> Result<u16, SimErr> {
        self.check(addr)?;
        Ok(self.get_raw(addr))
    }

    /// Fallibly writes the word at the provided address, erroring if it is out of bounds.
    pub fn write(&mut self, addr: u16, data: u16) -> Result<(), SimErr> {
        self.check(addr)?;
        *self.get_raw_mut(addr) = data;
        Ok(())
    }
}
impl Default for Mem {
    fn default() -> Self {
        Self::new()
    }
}

/// The register file.
///
/// This struct can be indexed with a [`Reg`]
/// (which can be constructed using the [`crate::ast::reg_consts`] module or via [`Reg::try_from`]).
///
/// # Example
///
/// ```
/// use lc3_sim::sim::mem::RegFile;
/// use lc3_sim::ast::reg_consts::R0;
///
/// let mut reg = RegFile::new();
/// reg[R0] = 11;
/// assert_eq!(reg[R0], 11);
/// ```
#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct RegFile([u16; 8]);
impl RegFile {
    /// Creates a register file with every register zeroed.
    pub fn new() -> Self {
        Self([0; 8])
    }
}
impl std::ops::Index<Reg> for RegFile {
    type Output = u16;

    fn index(&self, index: Reg) -> &Self::Output {
        &self.0[usize::from(index)]
    }
}
impl std::ops::IndexMut<Reg> for RegFile {
    fn index_mut(&mut self, index: Reg) -> &mut Self::Output {
        &mut self.0[usize::from(index)]
    }
}

#[cfg(test)]
mod tests {
    use crate::asm::ObjectFile;
    use crate::sim::SimErr;

    use super::{Bounds, Mem, AFTER_SENTINEL, BEFORE_SENTINEL, MEMORY_USER_MAX};

    #[test]
    fn test_load() {
        let mut mem = Mem::new();
        mem.load(&ObjectFile::new(0x3000, vec![0x1234, 0x5678]).unwrap());

        assert_eq!(mem.get_raw(0x3000), 0x1234);
        assert_eq!(mem.get_raw(0x3001), 0x5678);
        assert_eq!(mem.bounds(), Bounds { start: 0x3000, end: 0x3002 });
        assert!(mem.bounds().contains(0x3001));
        assert!(!mem.bounds().contains(0x3002));

        assert!((0x0000..0x3000).all(|a| mem.get_raw(a) == BEFORE_SENTINEL));
        assert!((0x3002..=0xFFFF).all(|a| mem.get_raw(a) == AFTER_SENTINEL));
    }

    #[test]
    fn test_reload_replaces() {
        let mut mem = Mem::new();
        mem.load(&ObjectFile::new(0x3000, vec![1, 2, 3]).unwrap());
        mem.load(&ObjectFile::new(0x4000, vec![4]).unwrap());

        assert_eq!(mem.get_raw(0x3000), BEFORE_SENTINEL);
        assert_eq!(mem.get_raw(0x4000), 4);
        assert_eq!(mem.bounds(), Bounds { start: 0x4000, end: 0x4001 });
    }

    #[test]
    fn test_load_to_end_of_memory() {
        let mut mem = Mem::new();
        mem.load(&ObjectFile::new(0xFFFE, vec![7, 8]).unwrap());

        assert_eq!(mem.get_raw(0xFFFF), 8);
        assert_eq!(mem.bounds().end, 0x10000);
        assert!(mem.bounds().contains(0xFFFF));
    }

    #[test]
    fn test_checked_access() {
        let mut mem = Mem::new();
        mem.load(&ObjectFile::new(0x3000, vec![0]).unwrap());

        assert!(matches!(mem.read(0x2FFF), Err(SimErr::AddressTooLow(0x2FFF))));
        assert!(matches!(mem.read(MEMORY_USER_MAX + 1), Err(SimErr::AddressTooHigh(0xFE00))));
        assert!(matches!(mem.write(0xFFFF, 1), Err(SimErr::AddressTooHigh(0xFFFF))));
        assert_eq!(mem.read(MEMORY_USER_MAX).unwrap(), AFTER_SENTINEL);

        // failed writes leave memory alone
        assert_eq!(mem.get_raw(0xFFFF), AFTER_SENTINEL);
        mem.write(0x3000, 0xABCD).unwrap();
        assert_eq!(mem.get_raw(0x3000), 0xABCD);
    }
}
