//! Simulating and execution for LC-3 object files.
//!
//! This module is focused on executing fully assembled code (i.e., [`ObjectFile`]).
//!
//! This module consists of:
//! - [`Simulator`]: The struct that simulates assembled code.
//! - [`mem`]: The module handling memory and the registers.
//! - [`io`]: The module handling the console used by traps.
//! - [`trap`]: The module implementing the trap routines.
//!
//! # Usage
//!
//! To simulate some code, you need to instantiate a Simulator and load an object file to it:
//!
//! ```no_run
//! use lc3_sim::sim::Simulator;
//!
//! let mut simulator = Simulator::new(Default::default());
//! simulator.load_obj_path("program.obj").unwrap();
//! simulator.run().unwrap();
//! ```
//!
//! ## Flags
//!
//! Here, we define `simulator` to have the default flags.
//! We could also configure the simulator by editing the flags. For example,
//! if we wish to allow executing memory outside of the loaded program, we can edit the flags like so:
//!
//! ```no_run
//! # use lc3_sim::sim::{Simulator, SimFlags};
//! let mut simulator = Simulator::new(SimFlags { detect_unloaded: false, ..Default::default() });
//! ```
//!
//! All of the available flags can be found in [`SimFlags`].
//!
//! ## Execution
//!
//! Beyond the basic [`Simulator::run`] (which runs until halting),
//! there are also:
//! - [`Simulator::step_in`]: manual step-by-step simulation
//! - [`Simulator::run_while`], [`Simulator::run_with_limit`]: more advanced programmatic execution
//!
//! ```
//! use lc3_sim::parse::parse_ast;
//! use lc3_sim::asm::assemble;
//! use lc3_sim::sim::Simulator;
//! use lc3_sim::sim::io::BufferedConsole;
//! use lc3_sim::ast::reg_consts::R0;
//!
//! let src = "
//!     .orig x3000
//!     AND R0, R0, #0
//!     ADD R0, R0, #1
//!     ADD R0, R0, #1
//!     ADD R0, R0, #1
//!     HALT
//!     .end
//! ";
//! let ast = parse_ast(src).unwrap();
//! let obj_file = assemble(ast).unwrap();
//!
//! let mut sim = Simulator::new(Default::default());
//! sim.set_console(BufferedConsole::new());
//! sim.load_obj_file(&obj_file);
//!
//! // Running step by step:
//! sim.step_in().unwrap();
//! assert_eq!(sim.reg_file[R0], 0);
//! sim.step_in().unwrap();
//! assert_eq!(sim.reg_file[R0], 1);
//!
//! // Running the rest of the way:
//! sim.run().unwrap();
//! assert_eq!(sim.reg_file[R0], 3);
//! assert!(sim.hit_halt());
//! ```

pub mod io;
pub mod mem;
pub mod trap;

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::asm::ObjectFile;
use crate::ast::reg_consts::R7;
use crate::ast::sim::{Opcode, SimInstr};
use crate::ast::ImmOrReg;
use io::{Console, Terminal};
use mem::{Bounds, Mem, RegFile, AFTER_SENTINEL, BEFORE_SENTINEL};

/// Errors that can occur while loading or simulating an object file.
///
/// Every error stops the simulation.
/// Each kind maps to a distinct process exit status (see [`SimErr::code`]).
#[derive(Debug, thiserror::Error)]
pub enum SimErr {
    /// The object file could not be opened.
    #[error("could not open object file: {0}")]
    FileOpen(#[source] std::io::Error),
    /// The object file could not be read.
    #[error("could not read object file: {0}")]
    FileRead(#[source] std::io::Error),
    /// The object file has no origin or no words after it.
    #[error("object file is too short")]
    FileTooShort,
    /// The object file does not fit in memory or ends in half a word.
    #[error("object file is too long")]
    FileTooLong,
    /// Memory below the loaded program was accessed.
    #[error("address x{0:04X} is below the start of the program")]
    AddressTooLow(u16),
    /// Memory above the user region was accessed.
    #[error("address x{0:04X} is above user memory")]
    AddressTooHigh(u16),
    /// A field of the instruction which must be fixed is not.
    #[error("malformed {opcode} instruction: expected {expected}")]
    MalformedPadding {
        /// The instruction's opcode.
        opcode: Opcode,
        /// What the fixed field should look like.
        expected: &'static str
    },
    /// The instruction has the reserved opcode.
    #[error("illegal opcode {0:#06b}")]
    MalformedInstr(u8),
    /// `TRAP` was called with a vector that has no routine.
    #[error("unknown trap vector x{0:02X}")]
    MalformedTrap(u8),
    /// `RTI` was executed, which requires supervisor mode.
    #[error("RTI cannot be executed in user mode")]
    UnauthorizedInstr,
    /// A trap tried to print a character outside of ASCII.
    #[error("cannot print non-ASCII character x{0:04X}")]
    Unimplemented(u16),
    /// The console failed to read or write.
    #[error("console error: {0}")]
    Console(#[source] std::io::Error),
}
impl SimErr {
    /// The process exit status for this error.
    pub fn code(&self) -> u8 {
        match self {
            SimErr::FileOpen(_)             => 1,
            SimErr::FileRead(_)             => 2,
            SimErr::FileTooShort            => 3,
            SimErr::FileTooLong             => 4,
            SimErr::AddressTooLow(_)        => 5,
            SimErr::AddressTooHigh(_)       => 6,
            SimErr::MalformedPadding { .. } => 7,
            SimErr::MalformedInstr(_)       => 8,
            SimErr::MalformedTrap(_)        => 9,
            SimErr::UnauthorizedInstr       => 10,
            SimErr::Unimplemented(_)        => 11,
            SimErr::Console(_)              => 12,
        }
    }
}
impl crate::err::Error for SimErr {
    fn help(&self) -> Option<std::borrow::Cow<str>> {
        match self {
            SimErr::FileOpen(_) => Some("check that the path exists and is readable".into()),
            SimErr::FileRead(_) => None,
            SimErr::FileTooShort => Some("an object file is a big-endian origin word followed by at least one word".into()),
            SimErr::FileTooLong => Some("the program must end by xFFFF and consist of whole 16-bit words".into()),
            SimErr::AddressTooLow(_) => Some("programs can only access memory from their origin onward".into()),
            SimErr::AddressTooHigh(_) => Some(format!("programs can only access memory up to x{:04X}", mem::MEMORY_USER_MAX).into()),
            SimErr::MalformedPadding { .. } => None,
            SimErr::MalformedInstr(_) => Some("execution may have run into data; check for a missing HALT or branch".into()),
            SimErr::MalformedTrap(_) => Some("the trap vectors are x20 (GETC), x21 (OUT), x22 (PUTS), x23 (IN), x24 (PUTSP), and x25 (HALT)".into()),
            SimErr::UnauthorizedInstr => None,
            SimErr::Unimplemented(_) => Some("only characters x00-x7F can be printed".into()),
            SimErr::Console(_) => None,
        }
    }
}

/// Anything that can cause a step to abruptly fail to finish.
enum StepBreak {
    /// A halt was executed.
    Halt,
    /// A simulation error occurred.
    Err(SimErr),
}
impl From<SimErr> for StepBreak {
    fn from(value: SimErr) -> Self {
        Self::Err(value)
    }
}

/// Reason for why execution paused.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
enum PauseCondition {
    /// Program has not stopped yet.
    #[default]
    Ready,
    /// Program reached a halt.
    Halt,
    /// Program hit a tripwire condition.
    Tripwire,
    /// Program hit an error and did not pause successfully.
    Unsuccessful
}

/// Configuration flags for [`Simulator`].
///
/// These can be modified after the `Simulator` is created with [`Simulator::new`]
/// and their effects should still apply.
///
/// Read the field descriptions for more details.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct SimFlags {
    /// Whether to stop when executing a sentinel word (the fill of unloaded memory).
    ///
    /// Fetching [`BEFORE_SENTINEL`] raises [`SimErr::AddressTooLow`]
    /// and fetching [`AFTER_SENTINEL`] raises [`SimErr::AddressTooHigh`],
    /// wherever the word is.
    /// If disabled, those words are decoded like any other
    /// (`xEEEE` is `LEA R7, #238` and `xDDDD` has the reserved opcode).
    ///
    /// By default, this flag is `true`.
    pub detect_unloaded: bool,

    /// The prompt printed by the `IN` trap.
    ///
    /// By default, this is `"Input a character> "`.
    pub in_prompt: &'static str
}
impl Default for SimFlags {
    fn default() -> Self {
        Self {
            detect_unloaded: true,
            in_prompt: "Input a character> "
        }
    }
}

/// Executes assembled code.
#[derive(Debug)]
pub struct Simulator {
    // ------------------ SIMULATION STATE ------------------
    // Calling [`Simulator::load_obj_file`] resets these fields.

    /// The simulator's memory.
    ///
    /// Note that this is held in the heap, as it is too large for the stack.
    pub mem: Mem,

    /// The simulator's register file.
    pub reg_file: RegFile,

    /// The program counter.
    pub pc: u16,

    /// The stack pointer, set to the end of the loaded program.
    pub sp: u16,

    /// The frame pointer, set to the end of the loaded program.
    pub fp: u16,

    /// The condition code, laid out as `0bNZP`. Exactly one bit is set.
    cc: u8,

    /// The number of instructions successfully run since this `Simulator` was loaded.
    ///
    /// This can be set to 0 to reset the counter.
    pub instructions_run: u64,

    /// Indicates whether the PC has been incremented in the fetch stage yet.
    ///
    /// This is just used for error handling purposes.
    prefetch: bool,

    /// Indicates the reason why the last execution (via [`Simulator::run_while`] and adjacent)
    /// had paused.
    pause_condition: PauseCondition,

    // ------------------ CONFIG/DEBUG STATE ------------------
    // Calling [`Simulator::load_obj_file`] does not reset these fields.

    /// Configuration settings for the simulator.
    ///
    /// These are preserved between loads.
    ///
    /// See [`SimFlags`] for more details on what configuration
    /// settings are available.
    pub flags: SimFlags,

    /// The console traps read from and print to.
    terminal: Terminal,
}
impl Simulator {
    /// Creates a new simulator with the provided flags, without a loaded object file.
    ///
    /// The simulator uses the process's stdin and stdout until [`Simulator::set_console`] is called.
    pub fn new(flags: SimFlags) -> Self {
        Self {
            mem: Mem::new(),
            reg_file: RegFile::new(),
            pc: 0,
            sp: 0,
            fp: 0,
            cc: 0b010,
            instructions_run: 0,
            prefetch: false,
            pause_condition: Default::default(),
            flags,
            terminal: Terminal::default()
        }
    }

    /// Sets the console used by the `GETC`, `OUT`, `PUTS`, `IN`, and `PUTSP` traps.
    ///
    /// Output starts on a fresh line.
    pub fn set_console(&mut self, console: impl Console + 'static) {
        self.terminal = Terminal::new(console);
    }

    /// Loads an object file into this simulator, resetting the machine state.
    ///
    /// Execution starts at the object file's origin,
    /// and the stack and frame pointers are set to the end of the program.
    pub fn load_obj_file(&mut self, obj: &ObjectFile) {
        self.mem.load(obj);
        self.reg_file = RegFile::new();
        self.pc = obj.origin();
        self.sp = obj.end() as u16;
        self.fp = obj.end() as u16;
        self.cc = 0b010;
        self.instructions_run = 0;
        self.prefetch = false;
        self.pause_condition = Default::default();

        tracing::debug!(origin = obj.origin(), len = obj.words().len(), "loaded object file");
    }

    /// Reads an object file from disk and loads it into this simulator.
    ///
    /// This fails with [`SimErr::FileOpen`] if the file cannot be opened,
    /// and with any of the errors of [`ObjectFile::read_from`].
    pub fn load_obj_path(&mut self, path: impl AsRef<Path>) -> Result<(), SimErr> {
        let file = File::open(path).map_err(SimErr::FileOpen)?;
        let obj = ObjectFile::read_from(BufReader::new(file))?;
        self.load_obj_file(&obj);
        Ok(())
    }

    /// The bounds of the loaded program.
    pub fn region(&self) -> Bounds {
        self.mem.bounds()
    }

    /// The condition code, laid out as `0bNZP`.
    pub fn cc(&self) -> u8 {
        self.cc
    }

    /// Sets the condition code based on the result written to a register.
    fn set_cc(&mut self, result: u16) {
        self.cc = match (result as i16).cmp(&0) {
            std::cmp::Ordering::Less    => 0b100,
            std::cmp::Ordering::Equal   => 0b010,
            std::cmp::Ordering::Greater => 0b001,
        };
    }

    /// Reads memory the way a program does, failing if the address is not accessible.
    pub fn read_mem(&self, addr: u16) -> Result<u16, SimErr> {
        self.mem.read(addr)
    }

    /// Writes memory the way a program does, failing if the address is not accessible.
    pub fn write_mem(&mut self, addr: u16, data: u16) -> Result<(), SimErr> {
        self.mem.write(addr, data)
    }

    /// Gets the address of the instruction currently being (or last) executed.
    ///
    /// While an instruction executes, the PC already points to the next one.
    /// If an error occurred while fetching, this is the PC itself.
    pub fn prefetch_pc(&self) -> u16 {
        match self.prefetch {
            true  => self.pc,
            false => self.pc.wrapping_sub(1),
        }
    }

    /// Indicates whether the last execution of the simulator hit a HALT.
    pub fn hit_halt(&self) -> bool {
        matches!(self.pause_condition, PauseCondition::Halt)
    }

    /// Whether the simulator has stopped for good (by a HALT or an error).
    ///
    /// A stopped simulator does nothing until another object file is loaded.
    pub fn is_stopped(&self) -> bool {
        matches!(self.pause_condition, PauseCondition::Halt | PauseCondition::Unsuccessful)
    }

    /// Execute the program.
    ///
    /// This blocks until the program ends.
    /// If you would like to limit the maximum number of steps to execute, consider [`Simulator::run_with_limit`].
    pub fn run(&mut self) -> Result<(), SimErr> {
        self.run_while(|_| true)
    }

    /// Execute the program with a limit on how many steps to execute.
    ///
    /// This blocks until the program ends or until the number of steps to execute has been hit.
    /// If the limit was hit, [`Simulator::hit_halt`] is false.
    pub fn run_with_limit(&mut self, max_steps: u64) -> Result<(), SimErr> {
        let i = self.instructions_run;
        self.run_while(|sim| sim.instructions_run.wrapping_sub(i) < max_steps)
    }

    /// Runs until the tripwire condition returns false (or any of the typical breaks occur).
    ///
    /// The typical break conditions are:
    /// - `HALT` is executed
    /// - an error occurs
    pub fn run_while(&mut self, mut tripwire: impl FnMut(&mut Simulator) -> bool) -> Result<(), SimErr> {
        if self.is_stopped() {
            return Ok(());
        }

        // event loop
        // run until:
        // 1. the tripwire condition returns false
        // 2. a HALT or an error stops the program
        let result = loop {
            if !tripwire(self) {
                break Ok(PauseCondition::Tripwire);
            }

            match self.step() {
                Ok(()) => {},
                Err(StepBreak::Halt) => break Ok(PauseCondition::Halt),
                Err(StepBreak::Err(e)) => break Err(e)
            }
        };

        self.pause_condition = match &result {
            Ok(cond) => *cond,
            Err(_)   => PauseCondition::Unsuccessful,
        };
        result.map(|_| ())
    }

    /// Simulate one step, executing one instruction.
    pub fn step_in(&mut self) -> Result<(), SimErr> {
        let mut first = true;
        self.run_while(|_| std::mem::take(&mut first))?;

        // a single completed step is not a tripwire pause
        if self.pause_condition == PauseCondition::Tripwire {
            self.pause_condition = PauseCondition::Ready;
        }
        Ok(())
    }

    /// Checks that a fetched word is not the fill of unloaded memory.
    fn check_unloaded(&self, word: u16) -> Result<(), SimErr> {
        let addr = self.prefetch_pc();
        let err = match word {
            BEFORE_SENTINEL => SimErr::AddressTooLow(addr),
            AFTER_SENTINEL  => SimErr::AddressTooHigh(addr),
            _ => return Ok(()),
        };
        tracing::warn!(addr, word, "executed unloaded memory");
        Err(err)
    }

    /// Simulate one step, executing one instruction.
    ///
    /// This function is a library function and should be used when one step is needed.
    /// The difference between this function and [`Simulator::step_in`] is that this
    /// function can return [`StepBreak::Halt`] as an error,
    /// whereas `step_in` will ignore that error.
    fn step(&mut self) -> Result<(), StepBreak> {
        self.prefetch = true;
        let word = self.mem.read(self.pc)?;
        self.pc = self.pc.wrapping_add(1);
        self.prefetch = false;

        if self.flags.detect_unloaded {
            self.check_unloaded(word)?;
        }
        let instr = SimInstr::decode(word)?;
        tracing::trace!(pc = self.prefetch_pc(), word, ?instr, "executing");

        match instr {
            SimInstr::BR(cc, off) => {
                if cc & self.cc != 0 {
                    self.pc = self.pc.wrapping_add_signed(off.get());
                }
            },
            SimInstr::ADD(dr, sr1, sr2) => {
                let val1 = self.reg_file[sr1];
                let val2 = match sr2 {
                    ImmOrReg::Imm(i2) => i2.get() as u16,
                    ImmOrReg::Reg(r2) => self.reg_file[r2],
                };

                let result = val1.wrapping_add(val2);
                self.reg_file[dr] = result;
                self.set_cc(result);
            },
            SimInstr::LD(dr, off) => {
                let ea = self.pc.wrapping_add_signed(off.get());
                let val = self.mem.read(ea)?;
                self.reg_file[dr] = val;
                self.set_cc(val);
            },
            SimInstr::ST(sr, off) => {
                let ea = self.pc.wrapping_add_signed(off.get());
                self.mem.write(ea, self.reg_file[sr])?;
            },
            SimInstr::JSR(op) => {
                // R7 is written before the target is read,
                // so JSRR R7 jumps to the instruction after itself.
                self.reg_file[R7] = self.pc;
                self.pc = match op {
                    ImmOrReg::Imm(off) => self.pc.wrapping_add_signed(off.get()),
                    ImmOrReg::Reg(br)  => self.reg_file[br],
                };
            },
            SimInstr::AND(dr, sr1, sr2) => {
                let val1 = self.reg_file[sr1];
                let val2 = match sr2 {
                    // sign-extended like ADD's imm5, not zero-extended
                    ImmOrReg::Imm(i2) => i2.get() as u16,
                    ImmOrReg::Reg(r2) => self.reg_file[r2],
                };

                let result = val1 & val2;
                self.reg_file[dr] = result;
                self.set_cc(result);
            },
            SimInstr::LDR(dr, br, off) => {
                let ea = self.reg_file[br].wrapping_add_signed(off.get());
                let val = self.mem.read(ea)?;
                self.reg_file[dr] = val;
                self.set_cc(val);
            },
            SimInstr::STR(sr, br, off) => {
                let ea = self.reg_file[br].wrapping_add_signed(off.get());
                self.mem.write(ea, self.reg_file[sr])?;
            },
            SimInstr::RTI => return Err(SimErr::UnauthorizedInstr.into()),
            SimInstr::NOT(dr, sr) => {
                let result = !self.reg_file[sr];
                self.reg_file[dr] = result;
                self.set_cc(result);
            },
            SimInstr::LDI(dr, off) => {
                let shifted_pc = self.pc.wrapping_add_signed(off.get());
                let ea = self.mem.read(shifted_pc)?;
                let val = self.mem.read(ea)?;
                self.reg_file[dr] = val;
                self.set_cc(val);
            },
            SimInstr::STI(sr, off) => {
                // The source register holds a pointer to the value to store,
                // and the value is stored at the PC offset itself.
                let val = self.mem.read(self.reg_file[sr])?;
                let ea = self.pc.wrapping_add_signed(off.get());
                self.mem.write(ea, val)?;
            },
            SimInstr::JMP(br) => {
                self.pc = self.reg_file[br];
            },
            SimInstr::LEA(dr, off) => {
                self.reg_file[dr] = self.pc.wrapping_add_signed(off.get());
            },
            SimInstr::TRAP(vect) => self.handle_trap(vect)?,
        }

        self.instructions_run = self.instructions_run.wrapping_add(1);
        Ok(())
    }
}
impl Default for Simulator {
    fn default() -> Self {
        Self::new(Default::default())
    }
}

#[cfg(test)]
mod tests {
    use crate::asm::{assemble, ObjectFile};
    use crate::ast::reg_consts::{R0, R1, R2, R3, R7};
    use crate::parse::parse_ast;

    use super::io::BufferedConsole;
    use super::mem::{Bounds, AFTER_SENTINEL};
    use super::{SimErr, SimFlags, Simulator};

    fn load_words(origin: u16, words: &[u16]) -> Simulator {
        let mut sim = Simulator::new(SimFlags::default());
        sim.set_console(BufferedConsole::new());
        sim.load_obj_file(&ObjectFile::new(origin, words.to_vec()).unwrap());
        sim
    }
    fn load_src(src: &str) -> Simulator {
        let obj = assemble(parse_ast(src).unwrap()).unwrap();
        load_words(obj.origin(), obj.words())
    }

    #[test]
    fn test_load_state() {
        let sim = load_words(0x3000, &[0x1234, 0x5678]);
        assert_eq!(sim.pc, 0x3000);
        assert_eq!(sim.sp, 0x3002);
        assert_eq!(sim.fp, 0x3002);
        assert_eq!(sim.region(), Bounds { start: 0x3000, end: 0x3002 });
        assert_eq!(sim.cc(), 0b010);
        assert!(!sim.hit_halt());
    }

    #[test]
    fn test_add_imm() {
        let mut sim = load_words(0x3000, &[0x1225]); // ADD R1, R0, #5
        sim.reg_file[R0] = 3;
        sim.step_in().unwrap();
        assert_eq!(sim.reg_file[R1], 8);
        assert_eq!(sim.cc(), 0b001);
        assert_eq!(sim.instructions_run, 1);
    }

    #[test]
    fn test_and_not() {
        // AND R2, R1, R1; NOT R2, R2
        let mut sim = load_words(0x3000, &[0x5441, 0x94BF]);
        sim.reg_file[R1] = 0x00FF;
        sim.step_in().unwrap();
        sim.step_in().unwrap();
        assert_eq!(sim.reg_file[R2], 0xFF00);
        assert_eq!(sim.cc(), 0b100);
    }

    #[test]
    fn test_and_imm_sign_extends() {
        // AND R0, R0, #-2
        let mut sim = load_words(0x3000, &[0x503E]);
        sim.reg_file[R0] = 0xFFFF;
        sim.step_in().unwrap();
        assert_eq!(sim.reg_file[R0], 0xFFFE);

        // AND R0, R0, #-1 keeps every bit
        let mut sim = load_words(0x3000, &[0x503F]);
        sim.reg_file[R0] = 0xFFFF;
        sim.step_in().unwrap();
        assert_eq!(sim.reg_file[R0], 0xFFFF);
    }

    #[test]
    fn test_cc_exclusive() {
        let mut sim = load_src("
            .orig x3000
            AND R0, R0, #0
            ADD R0, R0, #-1
            ADD R0, R0, #1
            ADD R0, R0, #15
            NOT R1, R0
            LD R2, NEG
            LEA R4, NEG
            LDR R3, R4, #1
            LDI R3, PTR
            HALT
        NEG .fill x8000
        PTR .fill x3000
            .end
        ");

        let mut seen = vec![];
        while !sim.hit_halt() {
            sim.step_in().unwrap();
            assert_eq!(sim.cc().count_ones(), 1, "cc was {:03b}", sim.cc());
            seen.push(sim.cc());
        }
        assert_eq!(&seen[..9], [0b010, 0b100, 0b010, 0b001, 0b100, 0b100, 0b100, 0b001, 0b001]);
    }

    #[test]
    fn test_nop_word() {
        let mut sim = load_words(0x3000, &[0x0000, 0xF025]);
        sim.step_in().unwrap();
        assert_eq!(sim.pc, 0x3001);

        // BR with no flags set and a non-zero offset also never branches
        let mut sim = load_words(0x3000, &[0x0005, 0xF025]);
        sim.step_in().unwrap();
        assert_eq!(sim.pc, 0x3001);
    }

    #[test]
    fn test_branches() {
        let mut sim = load_src("
            .orig x3000
            AND R0, R0, #0
            BRp SKIP
            BRz TAKEN
        SKIP HALT
        TAKEN ADD R0, R0, #1
            BRnzp DONE
            ADD R0, R0, #1
        DONE HALT
            .end
        ");
        sim.run().unwrap();
        assert_eq!(sim.reg_file[R0], 1);
        assert_eq!(sim.prefetch_pc(), 0x3007);
    }

    #[test]
    fn test_halt() {
        let mut sim = load_words(0x3000, &[0xF025]);
        sim.run().unwrap();
        assert!(sim.hit_halt());
        assert_eq!(sim.instructions_run, 0);

        // halted simulators stay halted
        sim.step_in().unwrap();
        sim.run().unwrap();
        assert_eq!(sim.pc, 0x3001);
        assert!(sim.hit_halt());
    }

    #[test]
    fn test_subroutines() {
        let mut sim = load_src("
            .orig x3000
            JSR SUB
            LEA R2, SUB2
            JSRR R2
            HALT
        SUB ADD R0, R0, #1
            RET
        SUB2 ADD R0, R0, #2
            RET
            .end
        ");
        sim.run().unwrap();
        assert_eq!(sim.reg_file[R0], 3);
        assert_eq!(sim.reg_file[R7], 0x3003);
    }

    #[test]
    fn test_jsrr_r7() {
        // JSRR R7: R7 is set to the next instruction first, so this falls through.
        let mut sim = load_words(0x3000, &[0x41C0, 0xF025]);
        sim.reg_file[R7] = 0x5000;
        sim.step_in().unwrap();
        assert_eq!(sim.pc, 0x3001);
        assert_eq!(sim.reg_file[R7], 0x3001);
    }

    #[test]
    fn test_store_and_reload() {
        let mut sim = load_src("
            .orig x3000
            AND R0, R0, #0
            ADD R0, R0, #-7
            ST R0, SLOT
            LD R1, SLOT
            LEA R2, SLOT
            STR R1, R2, #1
            LDR R3, R2, #1
            HALT
        SLOT .blkw 2
            .end
        ");
        sim.run().unwrap();
        assert_eq!(sim.reg_file[R1], (-7i16) as u16);
        assert_eq!(sim.reg_file[R3], (-7i16) as u16);
        assert_eq!(sim.mem.get_raw(0x3008), (-7i16) as u16);
        assert_eq!(sim.mem.get_raw(0x3009), (-7i16) as u16);
    }

    #[test]
    fn test_sti_stores_through_source_pointer() {
        let mut sim = load_src("
            .orig x3000
            LEA R0, VALUE
            STI R0, DEST
            HALT
        VALUE .fill x1234
        DEST .fill #0
            .end
        ");
        sim.run().unwrap();
        // DEST receives mem[R0], not mem[mem[DEST]] = R0
        assert_eq!(sim.mem.get_raw(0x3004), 0x1234);
    }

    #[test]
    fn test_ldi_sti_out_of_window() {
        // LDI R0, #0 with pointer to x0000
        let mut sim = load_words(0x3000, &[0xA000, 0x0000]);
        assert!(matches!(sim.run(), Err(SimErr::AddressTooLow(0x0000))));
        assert_eq!(sim.reg_file[R0], 0);

        // STI R0, #1 with R0 pointing above user memory
        let mut sim = load_words(0x3000, &[0xB001, 0xF025, 0x0000]);
        sim.reg_file[R0] = 0xFE00;
        assert!(matches!(sim.run(), Err(SimErr::AddressTooHigh(0xFE00))));
        assert_eq!(sim.mem.get_raw(0x3002), 0x0000);

        // STI R0, #-3 with a valid pointer but a destination below the program
        let mut sim = load_words(0x3000, &[0xB1FD, 0xF025]);
        sim.reg_file[R0] = 0x3001;
        assert!(matches!(sim.run(), Err(SimErr::AddressTooLow(0x2FFE))));
    }

    #[test]
    fn test_pc_out_of_window() {
        let mut sim = load_words(0x3000, &[0xC000]); // JMP R0
        sim.reg_file[R0] = 0x1000;
        assert!(matches!(sim.run(), Err(SimErr::AddressTooLow(0x1000))));
        assert_eq!(sim.prefetch_pc(), 0x1000);

        let mut sim = load_words(0x3000, &[0xC000]);
        sim.reg_file[R0] = 0xFE00;
        assert!(matches!(sim.run(), Err(SimErr::AddressTooHigh(0xFE00))));
    }

    #[test]
    fn test_run_off_program() {
        let mut sim = load_words(0x3000, &[0x1021]); // ADD R0, R0, #1
        assert!(matches!(sim.run(), Err(SimErr::AddressTooHigh(0x3001))));
        assert_eq!(sim.reg_file[R0], 1);
        assert!(!sim.hit_halt());
        assert!(sim.is_stopped());

        // without the sentinel check, xEEEE is LEA R7, #238
        let mut sim = load_words(0x3000, &[0x1021]);
        sim.flags.detect_unloaded = false;
        sim.step_in().unwrap();
        sim.step_in().unwrap();
        assert_eq!(sim.mem.get_raw(0x3001), AFTER_SENTINEL);
        assert_eq!(sim.reg_file[R7], 0x3002 + 238);
    }

    #[test]
    fn test_sentinel_inside_program() {
        let mut sim = load_words(0x3000, &[0xEEEE, 0xF025]);
        assert!(matches!(sim.run(), Err(SimErr::AddressTooHigh(0x3000))));

        // xEEEE is LEA R7, #238
        let mut sim = load_words(0x3000, &[0xEEEE, 0xF025]);
        sim.flags.detect_unloaded = false;
        sim.run().unwrap();
        assert!(sim.hit_halt());
        assert_eq!(sim.reg_file[R7], 0x3001 + 238);
    }

    #[test]
    fn test_illegal_instrs() {
        let mut sim = load_words(0x3000, &[0x8000]);
        assert!(matches!(sim.run(), Err(SimErr::UnauthorizedInstr)));

        let mut sim = load_words(0x3000, &[0xD000]);
        assert!(matches!(sim.run(), Err(SimErr::MalformedInstr(0b1101))));

        let mut sim = load_words(0x3000, &[0x1008]);
        assert!(matches!(sim.run(), Err(SimErr::MalformedPadding { .. })));
        assert_eq!(sim.instructions_run, 0);
    }

    #[test]
    fn test_run_with_limit() {
        let mut sim = load_src("
            .orig x3000
        LOOP BR LOOP
            .end
        ");
        sim.run_with_limit(100).unwrap();
        assert_eq!(sim.instructions_run, 100);
        assert!(!sim.hit_halt());
        assert!(!sim.is_stopped());

        sim.run_with_limit(5).unwrap();
        assert_eq!(sim.instructions_run, 105);
    }

    #[test]
    fn test_error_codes() {
        let codes = [
            SimErr::FileOpen(std::io::ErrorKind::NotFound.into()).code(),
            SimErr::FileRead(std::io::ErrorKind::Other.into()).code(),
            SimErr::FileTooShort.code(),
            SimErr::FileTooLong.code(),
            SimErr::AddressTooLow(0).code(),
            SimErr::AddressTooHigh(0).code(),
            SimErr::MalformedPadding { opcode: crate::ast::sim::Opcode::NOT, expected: "" }.code(),
            SimErr::MalformedInstr(0).code(),
            SimErr::MalformedTrap(0).code(),
            SimErr::UnauthorizedInstr.code(),
            SimErr::Unimplemented(0).code(),
            SimErr::Console(std::io::ErrorKind::UnexpectedEof.into()).code(),
        ];
        assert_eq!(codes, [1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12]);
    }

    #[test]
    fn test_load_obj_path() {
        let obj = ObjectFile::new(0x3000, vec![0x5020, 0x1025, 0xF025]).unwrap();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        obj.write_to(&mut file).unwrap();

        let mut sim = Simulator::new(SimFlags::default());
        sim.set_console(BufferedConsole::new());
        sim.load_obj_path(file.path()).unwrap();
        sim.run().unwrap();
        assert_eq!(sim.reg_file[R0], 5);

        let missing = file.path().with_extension("missing");
        assert!(matches!(sim.load_obj_path(missing), Err(SimErr::FileOpen(_))));
    }
}
