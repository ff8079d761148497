//! The trap routines.
//!
//! The LC-3 has no operating system loaded here, so each `TRAP` vector
//! is handled directly by the simulator (see [`TrapVect`] for the available vectors).
//!
//! All trap output goes through the simulator's [`Terminal`](super::io::Terminal).
//! `PUTS`, `PUTSP`, and `IN` start their output on a fresh line,
//! and `HALT` finishes the output with a newline if it is needed.

use crate::ast::reg_consts::R0;
use crate::ast::TrapVect8;
use crate::bits::{high_byte, low_byte};

use super::{SimErr, Simulator, StepBreak};

int_vect! {
    /// The trap vectors which have a routine.
    #[allow(clippy::upper_case_acronyms)]
    pub enum TrapVect {
        /// Reads a character into `R0`, without echoing it.
        GETC  = 0x20,
        /// Prints the character in `R0`.
        OUT   = 0x21,
        /// Prints the string of one-character words starting at the address in `R0`.
        PUTS  = 0x22,
        /// Prompts for a character, echoes it, and reads it into `R0`.
        IN    = 0x23,
        /// Prints the string of two-character words starting at the address in `R0`.
        PUTSP = 0x24,
        /// Stops the program.
        HALT  = 0x25,
    }
}

fn console_err(e: std::io::Error) -> SimErr {
    SimErr::Console(e)
}

/// Checks that a character can be printed.
fn ascii(ch: u16) -> Result<u8, SimErr> {
    match u8::try_from(ch) {
        Ok(c) if c.is_ascii() => Ok(c),
        _ => Err(SimErr::Unimplemented(ch)),
    }
}

impl Simulator {
    /// Runs the trap routine for the given vector.
    ///
    /// `HALT` is reported as [`StepBreak::Halt`].
    pub(super) fn handle_trap(&mut self, vect: TrapVect8) -> Result<(), StepBreak> {
        let raw = vect.get();
        let vect = TrapVect::try_from(raw)
            .map_err(|v| SimErr::MalformedTrap(v as u8))?;
        tracing::trace!(%vect, "trap");

        match vect {
            TrapVect::GETC => {
                let ch = self.terminal.read_char().map_err(console_err)?;
                self.reg_file[R0] = u16::from(ch);
            },
            TrapVect::OUT => {
                let word = self.reg_file[R0];
                let ch = ascii(word & 0xFF).map_err(|_| SimErr::Unimplemented(word))?;
                self.terminal.print_char(ch).map_err(console_err)?;
            },
            TrapVect::PUTS => {
                self.terminal.print_on_new_line().map_err(console_err)?;

                let mut addr = self.reg_file[R0];
                loop {
                    let word = self.mem.read(addr)?;
                    if word == 0 { break; }

                    let ch = ascii(word)?;
                    self.terminal.print_char(ch).map_err(console_err)?;
                    addr = addr.wrapping_add(1);
                }
            },
            TrapVect::IN => {
                self.terminal.print_on_new_line().map_err(console_err)?;
                self.terminal.print_str(self.flags.in_prompt).map_err(console_err)?;

                let ch = self.terminal.read_char().map_err(console_err)?;
                self.terminal.print_char(ch).map_err(console_err)?;
                self.terminal.print_on_new_line().map_err(console_err)?;
                self.reg_file[R0] = u16::from(ch);
            },
            TrapVect::PUTSP => {
                self.terminal.print_on_new_line().map_err(console_err)?;

                let mut addr = self.reg_file[R0];
                'words: loop {
                    let word = self.mem.read(addr)?;
                    // the first character of a pair is in the low byte
                    for byte in [low_byte(word), high_byte(word)] {
                        if byte == 0 { break 'words; }

                        let ch = ascii(u16::from(byte))?;
                        self.terminal.print_char(ch).map_err(console_err)?;
                    }
                    addr = addr.wrapping_add(1);
                }
            },
            TrapVect::HALT => {
                self.terminal.print_on_new_line().map_err(console_err)?;
                tracing::debug!(instructions_run = self.instructions_run, "halted");
                return Err(StepBreak::Halt);
            },
        }

        Ok(())
    }
}
