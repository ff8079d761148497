//! An LC-3 object file simulator, with a small assembler to produce object files.
//!
//! The simulator loads a single object image (an origin word followed by the program's words)
//! into a flat 16-bit word-addressed memory and runs it until it executes `HALT`
//! or hits an error.
//!
//! # Usage
//!
//! To convert LC-3 source code to an object file, it must be parsed and assembled:
//! ```
//! use lc3_sim::parse::parse_ast;
//! use lc3_sim::asm::{assemble, ObjectFile};
//!
//! let code = "
//!     .orig x3000
//!     AND R0, R0, #0
//!     ADD R0, R0, #7
//!     HALT
//!     .end
//! ";
//! let ast = parse_ast(code).unwrap();
//! let obj_file: ObjectFile = assemble(ast).unwrap();
//! assert_eq!(obj_file.origin(), 0x3000);
//! assert_eq!(obj_file.words(), &[0x5020, 0x1027, 0xF025]);
//! ```
//!
//! Once an object file has been created, it can be executed with the simulator:
//! ```
//! # use lc3_sim::parse::parse_ast;
//! # use lc3_sim::asm::assemble;
//! # let obj_file = assemble(parse_ast(".orig x3000\nHALT\n.end").unwrap()).unwrap();
//! use lc3_sim::sim::Simulator;
//!
//! let mut simulator = Simulator::new(Default::default());
//! simulator.load_obj_file(&obj_file);
//! simulator.run().unwrap(); // <-- Result can be handled accordingly
//! assert!(simulator.hit_halt());
//! ```
//!
//! Object files can also be read from disk with [`sim::Simulator::load_obj_path`],
//! which reports the loader errors of [`sim::SimErr`].
#![warn(missing_docs)]

/// Declares a closed set of named integer codes,
/// convertible from a raw value through `TryFrom<u16>`.
///
/// Values outside of the set fail to convert,
/// so every `match` over the result still has to deal with the unknown case.
macro_rules! int_vect {
    ($(#[$m:meta])* $vis:vis enum $Type:ident { $($(#[$vm:meta])* $name:ident = $value:literal),+ $(,)? }) => {
        $(#[$m])*
        #[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
        $vis enum $Type {
            $($(#[$vm])* $name = $value),+
        }
        impl TryFrom<u16> for $Type {
            type Error = u16;

            fn try_from(value: u16) -> Result<Self, Self::Error> {
                match value {
                    $($value => Ok(Self::$name)),+,
                    v => Err(v)
                }
            }
        }
        impl std::fmt::Display for $Type {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(Self::$name => f.write_str(stringify!($name))),+
                }
            }
        }
    }
}

pub mod bits;
pub mod err;
pub mod ast;
pub mod parse;
pub mod asm;
pub mod sim;
