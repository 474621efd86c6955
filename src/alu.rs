//! Arithmetic/logic operations over the register file.
//!
//! Operands are register indices. Flags are only ever raised here, with the single exception
//! of `rolr`, which also clears carry when the rotated-out bit is 0. Flag updates happen before
//! the result is stored, so an operation targeting `flags` overwrites its own flag update.

use rand::Rng;

use crate::mem::Registers;
use crate::symbol::flag;

#[inline]
fn raise_if(reg: &mut Registers, cond: bool, mask: u8) {
    if cond {
        reg.raise_flags(mask);
    }
}

/// `dest <- lhs + rhs`, raises carry on overflow.
pub fn add(reg: &mut Registers, dest: u8, lhs: u8, rhs: u8) {
    let sum = reg.get(lhs) as u16 + reg.get(rhs) as u16;
    raise_if(reg, sum > 0xFF, flag::CARRY);
    reg.set(dest, sum as u8);
}

/// `dest <- lhs - rhs`, raises sign on a negative and zero on a zero difference.
pub fn sub(reg: &mut Registers, dest: u8, lhs: u8, rhs: u8) {
    let diff = reg.get(lhs) as i16 - reg.get(rhs) as i16;
    raise_if(reg, diff < 0, flag::SIGN);
    raise_if(reg, diff == 0, flag::ZERO);
    reg.set(dest, diff as u8);
}

fn bitwise(reg: &mut Registers, dest: u8, lhs: u8, rhs: u8, op: fn(u8, u8) -> u8) {
    let res = op(reg.get(lhs), reg.get(rhs));
    raise_if(reg, res == 0, flag::ZERO);
    reg.set(dest, res);
}

pub fn and(reg: &mut Registers, dest: u8, lhs: u8, rhs: u8) {
    bitwise(reg, dest, lhs, rhs, |a, b| a & b)
}

pub fn or(reg: &mut Registers, dest: u8, lhs: u8, rhs: u8) {
    bitwise(reg, dest, lhs, rhs, |a, b| a | b)
}

pub fn nor(reg: &mut Registers, dest: u8, lhs: u8, rhs: u8) {
    bitwise(reg, dest, lhs, rhs, |a, b| !(a | b))
}

pub fn xor(reg: &mut Registers, dest: u8, lhs: u8, rhs: u8) {
    bitwise(reg, dest, lhs, rhs, |a, b| a ^ b)
}

/// `dest <- dest + 1`, raises carry when wrapping from 255.
pub fn inc(reg: &mut Registers, dest: u8) {
    let sum = reg.get(dest) as u16 + 1;
    raise_if(reg, sum > 0xFF, flag::CARRY);
    reg.set(dest, sum as u8);
}

/// Rotate `dest` right by one. Carry is set to the bit rotated out of position 0.
pub fn rolr(reg: &mut Registers, dest: u8) {
    let val = reg.get(dest);
    reg.set(dest, val.rotate_right(1));
    if val & 1 != 0 {
        reg.raise_flags(flag::CARRY);
    } else {
        reg.clear_flags(flag::CARRY);
    }
}

/// `dest <- random byte`
pub fn rnv<R: Rng + ?Sized>(reg: &mut Registers, dest: u8, rng: &mut R) {
    reg.set(dest, rng.gen());
}
