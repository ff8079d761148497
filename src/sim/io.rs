//! Console IO for the simulator's traps.
//!
//! The interface for a console is defined with the [`Console`] trait.
//! The simulator wraps its console in a [`Terminal`], which tracks whether
//! output is at the start of a line.
//!
//! Besides those two key items, this module also includes:
//! - [`StdConsole`]: A `Console` backed by the process's stdin and stdout.
//! - [`BufferedConsole`]: A `Console` holding a buffered implementation for IO.
//! - [`RawModeGuard`]: A guard keeping the terminal in raw mode while it is alive.

use std::collections::VecDeque;
use std::io::{self, IsTerminal, Read, Stdin, Stdout, Write};
use std::sync::{Arc, RwLock, RwLockWriteGuard};

/// A character source and sink the simulator's traps can use.
pub trait Console {
    /// Reads a single byte, without waiting for a line to be entered and without echoing it.
    fn read_raw(&mut self) -> io::Result<u8>;

    /// Writes bytes to the output.
    fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()>;
}
impl dyn Console {} // assert Console is dyn safe

/// Keeps the terminal in raw mode until it is dropped.
///
/// In raw mode, input is available as soon as a key is pressed
/// and is not echoed back to the terminal.
///
/// Raw mode also stops the terminal from translating Enter (`\r`) into `\n`,
/// so [`StdConsole`] translates it back (see [`translate_raw_key`]).
pub struct RawModeGuard(());
impl RawModeGuard {
    /// Enters raw mode.
    pub fn enter() -> io::Result<Self> {
        crossterm::terminal::enable_raw_mode()?;
        Ok(Self(()))
    }
}
impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = crossterm::terminal::disable_raw_mode();
    }
}

/// Maps a key read in raw mode to the byte a line-buffered terminal would have delivered.
pub fn translate_raw_key(byte: u8) -> u8 {
    match byte {
        b'\r' => b'\n',
        b => b
    }
}

/// Console backed by stdin and stdout.
///
/// Raw mode is only entered while reading, and only if stdin is a terminal.
/// Output is flushed after every write.
pub struct StdConsole {
    stdin: Stdin,
    stdout: Stdout
}
impl StdConsole {
    /// Creates a new console over the process's stdin and stdout.
    pub fn new() -> Self {
        Self { stdin: io::stdin(), stdout: io::stdout() }
    }
}
impl Default for StdConsole {
    fn default() -> Self {
        Self::new()
    }
}
impl Console for StdConsole {
    fn read_raw(&mut self) -> io::Result<u8> {
        let is_terminal = self.stdin.is_terminal();
        let _guard = match is_terminal {
            true  => Some(RawModeGuard::enter()?),
            false => None,
        };

        let mut buf = [0];
        self.stdin.lock().read_exact(&mut buf)?;
        match is_terminal {
            true  => Ok(translate_raw_key(buf[0])),
            false => Ok(buf[0]),
        }
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        let mut out = self.stdout.lock();
        out.write_all(bytes)?;
        out.flush()
    }
}

/// Console that reads from an input buffer and writes to an output buffer.
///
/// The buffers can be accessed in code via [`BufferedConsole::get_input`] and [`BufferedConsole::get_output`].
/// Cloning this console shares the buffers, so a clone can be handed to the simulator
/// while the original is kept to feed input and inspect output.
///
/// Reading when the input buffer is empty fails with [`io::ErrorKind::UnexpectedEof`].
#[derive(Clone, Default)]
pub struct BufferedConsole {
    input: Arc<RwLock<VecDeque<u8>>>,
    output: Arc<RwLock<Vec<u8>>>
}
impl BufferedConsole {
    /// Creates a new console with empty buffers.
    pub fn new() -> Self {
        Self::default()
    }
    /// Creates a new console whose input buffer starts with the given bytes.
    pub fn with_input(input: impl AsRef<[u8]>) -> Self {
        let console = Self::new();
        console.lock_input().extend(input.as_ref());
        console
    }

    fn lock_input(&self) -> RwLockWriteGuard<'_, VecDeque<u8>> {
        self.input.write().unwrap_or_else(|e| e.into_inner())
    }
    fn lock_output(&self) -> RwLockWriteGuard<'_, Vec<u8>> {
        self.output.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Gets a reference to the input buffer.
    pub fn get_input(&self) -> &Arc<RwLock<VecDeque<u8>>> {
        &self.input
    }
    /// Gets a reference to the output buffer.
    pub fn get_output(&self) -> &Arc<RwLock<Vec<u8>>> {
        &self.output
    }
    /// Copies the output written so far, decoded lossily as UTF-8.
    pub fn output_string(&self) -> String {
        String::from_utf8_lossy(&self.lock_output()).into_owned()
    }
}
impl Console for BufferedConsole {
    fn read_raw(&mut self) -> io::Result<u8> {
        self.lock_input()
            .pop_front()
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "console input is exhausted"))
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.lock_output().extend_from_slice(bytes);
        Ok(())
    }
}

/// A console, along with whether its output is at the start of a line.
///
/// All trap output goes through this, so that traps which start their own line
/// (`PUTS`, `PUTSP`, `IN`) and the final newline after `HALT` know where the cursor is.
pub struct Terminal {
    console: Box<dyn Console>,
    on_new_line: bool
}
impl Terminal {
    /// Wraps a console. Output starts on a new line.
    pub fn new(console: impl Console + 'static) -> Self {
        Self { console: Box::new(console), on_new_line: true }
    }

    /// Whether output is at the start of a line.
    pub fn on_new_line(&self) -> bool {
        self.on_new_line
    }

    /// Prints a character. A carriage return is printed as a newline.
    pub fn print_char(&mut self, ch: u8) -> io::Result<()> {
        let ch = match ch {
            b'\r' => b'\n',
            c => c
        };
        self.console.write_bytes(&[ch])?;
        self.on_new_line = ch == b'\n';
        Ok(())
    }

    /// Prints a string verbatim.
    pub fn print_str(&mut self, s: &str) -> io::Result<()> {
        if let Some(&last) = s.as_bytes().last() {
            self.console.write_bytes(s.as_bytes())?;
            self.on_new_line = last == b'\n';
        }
        Ok(())
    }

    /// Moves output to the start of a line, printing a newline only if it is not already there.
    pub fn print_on_new_line(&mut self) -> io::Result<()> {
        match self.on_new_line {
            true  => Ok(()),
            false => self.print_char(b'\n'),
        }
    }

    /// Reads a single raw character.
    pub fn read_char(&mut self) -> io::Result<u8> {
        self.console.read_raw()
    }
}
impl Default for Terminal {
    fn default() -> Self {
        Self::new(StdConsole::new())
    }
}
impl std::fmt::Debug for Terminal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Terminal")
            .field("on_new_line", &self.on_new_line)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::io::ErrorKind;

    use super::{translate_raw_key, BufferedConsole, Console, Terminal};

    #[test]
    fn test_buffered_console() {
        let mut console = BufferedConsole::with_input("ab");
        assert_eq!(console.read_raw().unwrap(), b'a');
        assert_eq!(console.read_raw().unwrap(), b'b');
        assert_eq!(console.read_raw().unwrap_err().kind(), ErrorKind::UnexpectedEof);

        console.write_bytes(b"hi").unwrap();
        assert_eq!(console.output_string(), "hi");
    }

    #[test]
    fn test_buffered_console_shares_buffers() {
        let console = BufferedConsole::new();
        let mut clone = console.clone();
        clone.write_bytes(b"xyz").unwrap();
        assert_eq!(*console.get_output().read().unwrap(), b"xyz");

        console.get_input().write().unwrap().push_back(b'q');
        assert_eq!(clone.read_raw().unwrap(), b'q');
    }

    #[test]
    fn test_raw_enter_reads_as_newline() {
        assert_eq!(translate_raw_key(b'\r'), b'\n');
        assert_eq!(translate_raw_key(b'\n'), b'\n');
        assert_eq!(translate_raw_key(b'a'), b'a');
        assert_eq!(translate_raw_key(0x7F), 0x7F);
    }

    #[test]
    fn test_terminal_newline_tracking() {
        let console = BufferedConsole::new();
        let mut term = Terminal::new(console.clone());
        assert!(term.on_new_line());

        term.print_on_new_line().unwrap();
        assert_eq!(console.output_string(), "");

        term.print_char(b'A').unwrap();
        assert!(!term.on_new_line());
        term.print_on_new_line().unwrap();
        assert!(term.on_new_line());
        term.print_on_new_line().unwrap();
        assert_eq!(console.output_string(), "A\n");

        term.print_char(b'\r').unwrap();
        assert_eq!(console.output_string(), "A\n\n");
        assert!(term.on_new_line());

        term.print_str("prompt> ").unwrap();
        assert!(!term.on_new_line());
        term.print_str("").unwrap();
        assert!(!term.on_new_line());
    }
}
