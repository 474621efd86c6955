//! Fixed vocabularies shared by the assembler and the decoder.
//!
//! Every name here maps to a 4-bit code. The assembler looks names up by string and packs the
//! codes into nibbles; the CPU unpacks the same nibbles. Both sides go through this module so
//! the encodings cannot drift apart.

use std::fmt;
use std::str::FromStr;

/// Index of the register that doubles as the flags register.
pub const FLAGS: u8 = 0xF;

/// Bit positions inside the flags register.
///
/// These line up with the `z`, `c` and `s` condition names, which select bits 0, 1 and 2 of
/// the flags register.
pub mod flag {
    pub const ZERO: u8 = 1 << 0;
    pub const CARRY: u8 = 1 << 1;
    pub const SIGN: u8 = 1 << 2;
}

/// Generates a nibble-coded name enum with `FromStr`, `Display` and nibble conversions.
macro_rules! nibble_names {
    (
        $(#[$meta:meta])*
        $name:ident { $( $variant:ident = $code:literal => $text:literal ),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
        pub enum $name {
            $( $variant = $code ),+
        }

        impl $name {
            pub const ALL: [$name; 16] = [ $( $name::$variant ),+ ];

            /// 4-bit code of this name.
            pub fn code(self) -> u8 {
                self as u8
            }

            /// Name with the given code. Only the low nibble is considered.
            pub fn from_nibble(nibble: u8) -> Self {
                Self::ALL[(nibble & 0xF) as usize]
            }

            pub fn as_str(self) -> &'static str {
                match self {
                    $( $name::$variant => $text ),+
                }
            }
        }

        impl FromStr for $name {
            type Err = ();

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $( $text => Ok($name::$variant), )+
                    _ => Err(()),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.pad(self.as_str())
            }
        }
    };
}

nibble_names! {
    /// One of the 16 CPU registers. `flags` is register 15.
    Register {
        A = 0x0 => "a",
        B = 0x1 => "b",
        C = 0x2 => "c",
        D = 0x3 => "d",
        E = 0x4 => "e",
        F = 0x5 => "f",
        G = 0x6 => "g",
        H = 0x7 => "h",
        I = 0x8 => "i",
        J = 0x9 => "j",
        K = 0xA => "k",
        L = 0xB => "l",
        M = 0xC => "m",
        N = 0xD => "n",
        O = 0xE => "o",
        Flags = 0xF => "flags",
    }
}

nibble_names! {
    /// One of the 16 I/O ports. `i*` ports are driven from outside, `o*` ports by the program.
    Port {
        I0 = 0x0 => "i0",
        I1 = 0x1 => "i1",
        I2 = 0x2 => "i2",
        I3 = 0x3 => "i3",
        I4 = 0x4 => "i4",
        I5 = 0x5 => "i5",
        I6 = 0x6 => "i6",
        I7 = 0x7 => "i7",
        O0 = 0x8 => "o0",
        O1 = 0x9 => "o1",
        O2 = 0xA => "o2",
        O3 = 0xB => "o3",
        O4 = 0xC => "o4",
        O5 = 0xD => "o5",
        O6 = 0xE => "o6",
        O7 = 0xF => "o7",
    }
}

nibble_names! {
    /// Bit tested by `bib`.
    ///
    /// Codes with the top bit clear select a bit of register `a`, codes with it set select a bit
    /// of the flags register.
    CondBit {
        A0 = 0x0 => "a0",
        A1 = 0x1 => "a1",
        A2 = 0x2 => "a2",
        A3 = 0x3 => "a3",
        A4 = 0x4 => "a4",
        A5 = 0x5 => "a5",
        A6 = 0x6 => "a6",
        A7 = 0x7 => "a7",
        Z = 0x8 => "z",
        C = 0x9 => "c",
        S = 0xA => "s",
        F3 = 0xB => "f3",
        F4 = 0xC => "f4",
        F5 = 0xD => "f5",
        F6 = 0xE => "f6",
        F7 = 0xF => "f7",
    }
}

impl Port {
    /// Whether the port belongs to the externally driven half.
    pub fn is_input(self) -> bool {
        self.code() < 0x8
    }
}

impl CondBit {
    /// Register the condition bit lives in.
    pub fn register(self) -> Register {
        if self.code() & 0x8 != 0 {
            Register::Flags
        } else {
            Register::A
        }
    }

    /// Bit index within [`CondBit::register`].
    pub fn bit(self) -> u8 {
        self.code() & 0x7
    }
}

/// Shape of the low nibble of an instruction's first byte.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum DestKind {
    None,
    Reg,
    Cond,
}

/// Shape of an instruction's second byte, if it has one.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SrcKind {
    None,
    Reg,
    RegPair,
    Label,
    Imm,
    Port,
}

impl SrcKind {
    /// Whether an instruction of this form occupies two bytes.
    pub fn has_operand_byte(self) -> bool {
        self != SrcKind::None
    }
}

impl fmt::Display for DestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DestKind::None => "nothing",
            DestKind::Reg => "register",
            DestKind::Cond => "condition bit",
        })
    }
}

impl fmt::Display for SrcKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SrcKind::None => "nothing",
            SrcKind::Reg => "register",
            SrcKind::RegPair => "register pair",
            SrcKind::Label => "label",
            SrcKind::Imm => "integer literal",
            SrcKind::Port => "port",
        })
    }
}

/// The 16 instructions, valued by their opcode nibble.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Opcode {
    Nop = 0x0,
    Add = 0x1,
    Sub = 0x2,
    And = 0x3,
    Or = 0x4,
    Nor = 0x5,
    Xor = 0x6,
    Inc = 0x7,
    Rolr = 0x8,
    Bib = 0x9,
    Jmp = 0xA,
    Mov = 0xB,
    Ldi = 0xC,
    In = 0xD,
    Out = 0xE,
    Rnv = 0xF,
}

/// Instruction table: mnemonic, opcode and operand forms.
const INSTR_TABLE: [(Opcode, &str, DestKind, SrcKind); 16] = [
    (Opcode::Nop, "nop", DestKind::None, SrcKind::None),
    (Opcode::Add, "add", DestKind::Reg, SrcKind::RegPair),
    (Opcode::Sub, "sub", DestKind::Reg, SrcKind::RegPair),
    (Opcode::And, "and", DestKind::Reg, SrcKind::RegPair),
    (Opcode::Or, "or", DestKind::Reg, SrcKind::RegPair),
    (Opcode::Nor, "nor", DestKind::Reg, SrcKind::RegPair),
    (Opcode::Xor, "xor", DestKind::Reg, SrcKind::RegPair),
    (Opcode::Inc, "inc", DestKind::Reg, SrcKind::None),
    (Opcode::Rolr, "rolr", DestKind::Reg, SrcKind::None),
    (Opcode::Bib, "bib", DestKind::Cond, SrcKind::Label),
    (Opcode::Jmp, "jmp", DestKind::None, SrcKind::Label),
    (Opcode::Mov, "mov", DestKind::Reg, SrcKind::Reg),
    (Opcode::Ldi, "ldi", DestKind::Reg, SrcKind::Imm),
    (Opcode::In, "in", DestKind::Reg, SrcKind::Port),
    (Opcode::Out, "out", DestKind::Reg, SrcKind::Port),
    (Opcode::Rnv, "rnv", DestKind::Reg, SrcKind::None),
];

impl Opcode {
    /// Decode the high nibble of an instruction byte.
    pub fn from_nibble(nibble: u8) -> Self {
        match nibble & 0xF {
            0x0 => Opcode::Nop,
            0x1 => Opcode::Add,
            0x2 => Opcode::Sub,
            0x3 => Opcode::And,
            0x4 => Opcode::Or,
            0x5 => Opcode::Nor,
            0x6 => Opcode::Xor,
            0x7 => Opcode::Inc,
            0x8 => Opcode::Rolr,
            0x9 => Opcode::Bib,
            0xA => Opcode::Jmp,
            0xB => Opcode::Mov,
            0xC => Opcode::Ldi,
            0xD => Opcode::In,
            0xE => Opcode::Out,
            0xF => Opcode::Rnv,
            other => unreachable!("opcode nibble {other:#x} is wider than 4 bits"),
        }
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn mnemonic(self) -> &'static str {
        INSTR_TABLE[self as usize].1
    }

    pub fn dest_kind(self) -> DestKind {
        INSTR_TABLE[self as usize].2
    }

    pub fn src_kind(self) -> SrcKind {
        INSTR_TABLE[self as usize].3
    }

    /// Encoded size in bytes.
    pub fn byte_len(self) -> usize {
        1 + self.src_kind().has_operand_byte() as usize
    }
}

impl FromStr for Opcode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        INSTR_TABLE
            .iter()
            .find(|(_, mnemonic, _, _)| *mnemonic == s)
            .map(|(op, _, _, _)| *op)
            .ok_or(())
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}
