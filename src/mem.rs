//! Storage owned by the CPU: register file, I/O port bank and program store.

use std::fmt;

use log::debug;

use crate::symbol::{flag, FLAGS};

/// Size of the program store in bytes.
pub const ROM_SIZE: usize = 0x100;
/// Number of registers, including the flags register.
pub const REGISTER_COUNT: usize = 16;
/// Number of I/O ports, inputs and outputs together.
pub const PORT_COUNT: usize = 16;
/// First address of the output half of the port bank.
pub const FIRST_OUTPUT: u8 = 0x8;

/// Misuse of the storage types from outside the CPU.
#[derive(thiserror::Error, miette::Diagnostic, Clone, Copy, PartialEq, Eq, Debug)]
pub enum UsageError {
    #[error("port {0} is not an input port")]
    #[diagnostic(
        code(usage::not_an_input),
        help("only ports 0 through 7 (i0 to i7) can be driven from outside")
    )]
    NotAnInput(u8),

    #[error("port {0} is not an output port")]
    #[diagnostic(
        code(usage::not_an_output),
        help("only ports 8 through 15 (o0 to o7) can be observed from outside")
    )]
    NotAnOutput(u8),

    #[error("program is {0} bytes long but the program store holds 256")]
    #[diagnostic(code(usage::program_too_long))]
    ProgramTooLong(usize),
}

/// The 16 registers. Register 15 holds the flags.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Registers([u8; REGISTER_COUNT]);

impl Registers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a register. Only the low nibble of `reg` is used.
    #[inline]
    pub fn get(&self, reg: u8) -> u8 {
        self.0[(reg & 0xF) as usize]
    }

    /// Write a register. Only the low nibble of `reg` is used.
    #[inline]
    pub fn set(&mut self, reg: u8, val: u8) {
        self.0[(reg & 0xF) as usize] = val;
    }

    pub fn flags(&self) -> u8 {
        self.get(FLAGS)
    }

    /// OR `mask` into the flags register.
    pub fn raise_flags(&mut self, mask: u8) {
        self.0[FLAGS as usize] |= mask;
    }

    /// Clear the bits of `mask` in the flags register.
    pub fn clear_flags(&mut self, mask: u8) {
        self.0[FLAGS as usize] &= !mask;
    }

    pub fn zero(&self) -> bool {
        self.flags() & flag::ZERO != 0
    }

    pub fn carry(&self) -> bool {
        self.flags() & flag::CARRY != 0
    }

    pub fn sign(&self) -> bool {
        self.flags() & flag::SIGN != 0
    }

    pub fn iter(&self) -> impl Iterator<Item = u8> + '_ {
        self.0.iter().copied()
    }
}

impl fmt::Debug for Registers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.0.iter().map(|val| format!("{val:#04x}")))
            .finish()
    }
}

/// The 16 I/O ports.
///
/// Ports 0-7 are inputs and 8-15 outputs. The direction is only enforced on the external
/// accessors ([`Ports::set_input`], [`Ports::output`]); the CPU reads and writes any port.
#[derive(Clone, Default, PartialEq, Eq, Debug)]
pub struct Ports([u8; PORT_COUNT]);

impl Ports {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub(crate) fn get(&self, port: u8) -> u8 {
        self.0[(port & 0xF) as usize]
    }

    #[inline]
    pub(crate) fn set(&mut self, port: u8, val: u8) {
        self.0[(port & 0xF) as usize] = val;
    }

    /// Drive an input port from outside the CPU.
    pub fn set_input(&mut self, port: u8, val: u8) -> Result<(), UsageError> {
        if port >= FIRST_OUTPUT {
            return Err(UsageError::NotAnInput(port));
        }
        self.set(port, val);
        Ok(())
    }

    /// Observe an output port from outside the CPU.
    pub fn output(&self, port: u8) -> Result<u8, UsageError> {
        if !(FIRST_OUTPUT..PORT_COUNT as u8).contains(&port) {
            return Err(UsageError::NotAnOutput(port));
        }
        Ok(self.get(port))
    }

    /// The output half of the bank, `o0` first.
    pub fn outputs(&self) -> &[u8] {
        &self.0[FIRST_OUTPUT as usize..]
    }

    /// The input half of the bank, `i0` first.
    pub fn inputs(&self) -> &[u8] {
        &self.0[..FIRST_OUTPUT as usize]
    }
}

/// Program store during loading. Turn it into a [`Rom`] with [`RomBuilder::freeze`].
#[derive(Clone)]
pub struct RomBuilder {
    cells: [u8; ROM_SIZE],
}

impl RomBuilder {
    pub fn new() -> Self {
        RomBuilder {
            cells: [0; ROM_SIZE],
        }
    }

    /// Builder with `program` loaded starting at address 0.
    pub fn from_bytes(program: &[u8]) -> Result<Self, UsageError> {
        if program.len() > ROM_SIZE {
            return Err(UsageError::ProgramTooLong(program.len()));
        }
        let mut rom = Self::new();
        rom.cells[..program.len()].copy_from_slice(program);
        Ok(rom)
    }

    pub fn set(&mut self, addr: u8, val: u8) {
        self.cells[addr as usize] = val;
    }

    pub fn get(&self, addr: u8) -> u8 {
        self.cells[addr as usize]
    }

    /// Make the program store permanently read-only.
    ///
    /// The frozen store has no way to be written to:
    ///
    /// ```compile_fail
    /// use nybble::RomBuilder;
    ///
    /// let rom = RomBuilder::new().freeze();
    /// rom.set(0, 0x70);
    /// ```
    pub fn freeze(self) -> Rom {
        debug!("program store frozen");
        Rom { cells: self.cells }
    }
}

impl Default for RomBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Read-only program store.
#[derive(Clone, PartialEq, Eq)]
pub struct Rom {
    cells: [u8; ROM_SIZE],
}

impl Rom {
    /// Load and freeze `program` in one go.
    pub fn from_bytes(program: &[u8]) -> Result<Self, UsageError> {
        Ok(RomBuilder::from_bytes(program)?.freeze())
    }

    #[inline]
    pub fn get(&self, addr: u8) -> u8 {
        self.cells[addr as usize]
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.cells
    }
}

impl fmt::Debug for Rom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Trailing zeroes are just unused space
        let used = self
            .cells
            .iter()
            .rposition(|cell| *cell != 0)
            .map_or(0, |idx| idx + 1);
        f.debug_struct("Rom")
            .field("cells", &&self.cells[..used])
            .finish_non_exhaustive()
    }
}
