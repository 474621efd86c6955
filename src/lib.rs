// Assembling
mod air;
pub use air::Air;
mod error;
mod lexer;
pub mod literal;
mod parser;
pub use parser::AsmParser;
mod span;

// Running
mod alu;
mod mem;
pub use mem::{Ports, Registers, Rom, RomBuilder, UsageError, ROM_SIZE};
mod runtime;
pub use runtime::Cpu;

pub mod symbol;

pub mod env;

/// Amount of lines to show as context, each side of focus line (line containing span).
pub const DIAGNOSTIC_CONTEXT_LINES: usize = 4;

/// Assemble source text into a program image, resolving every label.
///
/// Nothing is returned unless the whole source assembles:
///
/// ```
/// let bytes = nybble::assemble("ldi a 5\nout a o0").unwrap();
/// assert_eq!(bytes, vec![0xC0, 0x05, 0xE0, 0x80]);
/// assert!(nybble::assemble("ldi a 5\nhlt").is_err());
/// ```
pub fn assemble(src: &str) -> miette::Result<Vec<u8>> {
    let mut air = AsmParser::new(src).parse()?;
    air.backpatch()?;
    air.emit()
}
