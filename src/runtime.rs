use log::trace;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::alu;
use crate::mem::{Ports, Registers, Rom, UsageError};
use crate::symbol::{CondBit, Opcode, Register};

/// Complete machine state during execution.
pub struct Cpu {
    /// Frozen program store
    rom: Rom,
    /// Program counter, wraps around the 256 byte store
    pc: u8,
    /// 16 registers, the last one being flags
    reg: Registers,
    /// 8 inputs followed by 8 outputs
    ports: Ports,
    /// Entropy source for `rnv`
    rng: StdRng,
}

impl Cpu {
    pub fn new(rom: Rom) -> Self {
        Self::with_rng(rom, StdRng::from_entropy())
    }

    /// CPU whose `rnv` produces the same sequence on every run.
    pub fn with_seed(rom: Rom, seed: u64) -> Self {
        Self::with_rng(rom, StdRng::seed_from_u64(seed))
    }

    fn with_rng(rom: Rom, rng: StdRng) -> Self {
        Cpu {
            rom,
            pc: 0,
            reg: Registers::new(),
            ports: Ports::new(),
            rng,
        }
    }

    const OP_TABLE: [fn(&mut Cpu, u8); 16] = [
        Self::nop,  // 0x0
        Self::add,  // 0x1
        Self::sub,  // 0x2
        Self::and,  // 0x3
        Self::or,   // 0x4
        Self::nor,  // 0x5
        Self::xor,  // 0x6
        Self::inc,  // 0x7
        Self::rolr, // 0x8
        Self::bib,  // 0x9
        Self::jmp,  // 0xA
        Self::mov,  // 0xB
        Self::ldi,  // 0xC
        Self::inp,  // 0xD
        Self::out,  // 0xE
        Self::rnv,  // 0xF
    ];

    /// Execute a single instruction.
    pub fn step(&mut self) {
        let addr = self.pc;
        let instr = self.fetch();
        let op = Opcode::from_nibble(instr >> 4);
        trace!("{addr:#04x}: {op} {:#x} (raw {instr:#04x})", instr & 0xF);
        Self::OP_TABLE[op as usize](self, instr & 0xF);
    }

    /// Execute `steps` instructions. There is no halt instruction, so this is the only bound.
    pub fn run(&mut self, steps: usize) {
        for _ in 0..steps {
            self.step();
        }
    }

    pub fn pc(&self) -> u8 {
        self.pc
    }

    pub fn registers(&self) -> &Registers {
        &self.reg
    }

    pub fn register(&self, reg: Register) -> u8 {
        self.reg.get(reg.code())
    }

    pub fn ports(&self) -> &Ports {
        &self.ports
    }

    pub fn rom(&self) -> &Rom {
        &self.rom
    }

    /// Drive input port `port` (0-7).
    pub fn set_input(&mut self, port: u8, val: u8) -> Result<(), UsageError> {
        self.ports.set_input(port, val)
    }

    /// Read output port `port` (8-15).
    pub fn output(&self, port: u8) -> Result<u8, UsageError> {
        self.ports.output(port)
    }

    /// Read the byte at PC and advance past it.
    #[inline]
    fn fetch(&mut self) -> u8 {
        let byte = self.rom.get(self.pc);
        self.pc = self.pc.wrapping_add(1);
        byte
    }

    /// Second byte split into its high and low nibbles.
    #[inline]
    fn fetch_pair(&mut self) -> (u8, u8) {
        let byte = self.fetch();
        (byte >> 4, byte & 0xF)
    }

    fn nop(&mut self, _operand: u8) {}

    fn add(&mut self, dest: u8) {
        let (lhs, rhs) = self.fetch_pair();
        alu::add(&mut self.reg, dest, lhs, rhs);
    }

    fn sub(&mut self, dest: u8) {
        let (lhs, rhs) = self.fetch_pair();
        alu::sub(&mut self.reg, dest, lhs, rhs);
    }

    fn and(&mut self, dest: u8) {
        let (lhs, rhs) = self.fetch_pair();
        alu::and(&mut self.reg, dest, lhs, rhs);
    }

    fn or(&mut self, dest: u8) {
        let (lhs, rhs) = self.fetch_pair();
        alu::or(&mut self.reg, dest, lhs, rhs);
    }

    fn nor(&mut self, dest: u8) {
        let (lhs, rhs) = self.fetch_pair();
        alu::nor(&mut self.reg, dest, lhs, rhs);
    }

    fn xor(&mut self, dest: u8) {
        let (lhs, rhs) = self.fetch_pair();
        alu::xor(&mut self.reg, dest, lhs, rhs);
    }

    fn inc(&mut self, dest: u8) {
        alu::inc(&mut self.reg, dest);
    }

    fn rolr(&mut self, dest: u8) {
        alu::rolr(&mut self.reg, dest);
    }

    fn bib(&mut self, cond: u8) {
        let target = self.fetch();
        let cond = CondBit::from_nibble(cond);
        if self.reg.get(cond.register().code()) & (1 << cond.bit()) != 0 {
            self.pc = target;
        }
    }

    fn jmp(&mut self, _operand: u8) {
        self.pc = self.fetch();
    }

    fn mov(&mut self, dest: u8) {
        let (src, _) = self.fetch_pair();
        let val = self.reg.get(src);
        self.reg.set(dest, val);
    }

    fn ldi(&mut self, dest: u8) {
        let val = self.fetch();
        self.reg.set(dest, val);
    }

    fn inp(&mut self, dest: u8) {
        let (port, _) = self.fetch_pair();
        let val = self.ports.get(port);
        self.reg.set(dest, val);
    }

    fn out(&mut self, src: u8) {
        let (port, _) = self.fetch_pair();
        let val = self.reg.get(src);
        self.ports.set(port, val);
    }

    fn rnv(&mut self, dest: u8) {
        alu::rnv(&mut self.reg, dest, &mut self.rng);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assemble;

    fn load(src: &str) -> Cpu {
        let bytes = assemble(src).unwrap();
        Cpu::with_seed(Rom::from_bytes(&bytes).unwrap(), 0)
    }

    fn run(src: &str, steps: usize) -> Cpu {
        let mut cpu = load(src);
        cpu.run(steps);
        cpu
    }

    #[test]
    fn end_to_end_add_out() {
        let cpu = run(
            r#"
            ldi a 5
            ldi b 3
            add c a b
            out o0 c
            "#,
            4,
        );
        assert_eq!(cpu.output(8), Ok(8));
        assert_eq!(cpu.register(Register::C), 8);
        assert_eq!(cpu.pc(), 8);
        assert_eq!(cpu.registers().flags(), 0);
    }

    #[test]
    fn nop_only_advances() {
        let cpu = run("nop\nnop", 2);
        assert_eq!(cpu.pc(), 2);
        assert_eq!(cpu.registers(), &Registers::new());
    }

    #[test]
    fn pc_wraps() {
        let mut cpu = Cpu::with_seed(Rom::from_bytes(&[]).unwrap(), 0);
        cpu.run(256);
        assert_eq!(cpu.pc(), 0);
        cpu.run(44);
        assert_eq!(cpu.pc(), 44);
    }

    #[test]
    fn add_carry() {
        let cpu = run("ldi a 200\nldi b 100\nadd c a b", 3);
        assert_eq!(cpu.register(Register::C), 44);
        assert!(cpu.registers().carry());
    }

    #[test]
    fn sub_sign() {
        let cpu = run("ldi a 3\nldi b 5\nsub c a b", 3);
        assert_eq!(cpu.register(Register::C), 254);
        assert!(cpu.registers().sign());
        assert!(!cpu.registers().zero());
    }

    #[test]
    fn bitwise() {
        let src = r#"
            ldi a 0b1100
            ldi b 0b1010
            and c a b
            or d a b
            nor e a b
            xor f a b
            xor g a a
        "#;
        let cpu = run(src, 7);
        assert_eq!(cpu.register(Register::C), 0b1000);
        assert_eq!(cpu.register(Register::D), 0b1110);
        assert_eq!(cpu.register(Register::E), 0b1111_0001);
        assert_eq!(cpu.register(Register::F), 0b0110);
        assert_eq!(cpu.register(Register::G), 0);
        assert!(cpu.registers().zero());
    }

    #[test]
    fn inc_and_rolr() {
        let cpu = run("inc a\ninc a\nrolr a", 2);
        assert_eq!(cpu.register(Register::A), 2);

        let cpu = run("ldi a 1\nrolr a", 2);
        assert_eq!(cpu.register(Register::A), 0x80);
        assert!(cpu.registers().carry());
    }

    #[test]
    fn mov_ldi() {
        let cpu = run("ldi b 0x7F\nmov a b\nldi flags 0b111", 3);
        assert_eq!(cpu.register(Register::A), 0x7F);
        assert_eq!(cpu.register(Register::B), 0x7F);
        assert!(cpu.registers().zero() && cpu.registers().carry() && cpu.registers().sign());
    }

    #[test]
    fn in_reads_port() {
        let mut cpu = load("in a i2");
        cpu.set_input(2, 0x42).unwrap();
        cpu.step();
        assert_eq!(cpu.register(Register::A), 0x42);
    }

    #[test]
    fn cpu_can_read_back_outputs() {
        let cpu = run("ldi a 9\nout a o7\nin b o7", 3);
        assert_eq!(cpu.output(15), Ok(9));
        assert_eq!(cpu.register(Register::B), 9);
    }

    #[test]
    fn jmp_forward() {
        let src = r#"
            jmp end
            ldi a 1
            : end
            nop
        "#;
        let cpu = run(src, 1);
        assert_eq!(cpu.pc(), 4);
        let cpu = run(src, 2);
        assert_eq!(cpu.register(Register::A), 0);
    }

    #[test]
    fn bib_register_a_bit() {
        let src = r#"
            ldi a 1
            bib a0 skip
            ldi b 9
            : skip
            nop
        "#;
        let cpu = run(src, 2);
        assert_eq!(cpu.pc(), 6);

        let src = r#"
            ldi a 2
            bib a0 skip
            ldi b 9
            : skip
            nop
        "#;
        let cpu = run(src, 3);
        assert_eq!(cpu.register(Register::B), 9);
        assert_eq!(cpu.pc(), 6);
    }

    #[test]
    fn bib_flag_bits() {
        let src = r#"
            ldi a 3
            ldi b 5
            sub c a b
            bib s negative
            nop
            : negative
            inc d
        "#;
        let cpu = run(src, 4);
        assert_eq!(cpu.pc(), 9);

        // Zero flag not set, falls through
        let cpu = run("bib z away\nnop\n: away", 1);
        assert_eq!(cpu.pc(), 2);
    }

    #[test]
    fn loop_counts_down() {
        let src = r#"
            ldi a 3
            ldi b 1
            : top
            sub a a b
            bib z done
            jmp top
            : done
            out a o1
        "#;
        let cpu = run(src, 2 + 3 * 2 + 2 + 1);
        assert_eq!(cpu.register(Register::A), 0);
        assert_eq!(cpu.output(9), Ok(0));
        assert_eq!(cpu.pc(), 12);
    }

    #[test]
    fn rnv_seeded() {
        let program = assemble("rnv a\nrnv b").unwrap();
        let mut first = Cpu::with_seed(Rom::from_bytes(&program).unwrap(), 42);
        let mut second = Cpu::with_seed(Rom::from_bytes(&program).unwrap(), 42);
        first.run(2);
        second.run(2);
        assert_eq!(first.registers(), second.registers());
        assert_eq!(first.registers().flags(), 0);
    }

    #[test]
    fn rnv_stores_draws() {
        let program = assemble("rnv a\nrnv b\nrnv c").unwrap();
        let mut cpu = Cpu::with_seed(Rom::from_bytes(&program).unwrap(), 42);
        cpu.run(3);
        let drawn = [Register::A, Register::B, Register::C].map(|reg| cpu.register(reg));
        assert_eq!(drawn, [0xA2, 0x63, 0x7D]);
        // Only the targeted registers change
        assert!(cpu.registers().iter().skip(3).all(|val| val == 0));
    }

    #[test]
    fn port_direction() {
        let mut cpu = load("");
        assert_eq!(cpu.set_input(9, 1), Err(UsageError::NotAnInput(9)));
        assert_eq!(cpu.output(3), Err(UsageError::NotAnOutput(3)));
        assert!(cpu.set_input(7, 1).is_ok());
        assert_eq!(cpu.output(8), Ok(0));
    }

    #[test]
    fn rom_is_readable_after_freeze() {
        let cpu = load("ldi a 0x2A");
        assert_eq!(&cpu.rom().as_bytes()[..3], &[0xC0, 0x2A, 0x00]);
    }
}
