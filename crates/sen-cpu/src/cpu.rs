//! 2A03 CPU core.
//!
//! Register file, addressing modes, instruction execution, and interrupt
//! servicing. Every bus cycle an instruction performs appears here as an
//! explicit [`CpuBus`] access, dummy reads included, so the cycle count and
//! bus traffic of each instruction fall out of the access sequence itself.

use std::cell::Cell;
use std::rc::Rc;

use log::info;

use crate::opcodes::{AddrMode, Opcode, OpcodeClass, OPCODE_TABLE};
use crate::status::Status;
use crate::trace::{ExecutedOpcode, OpcodeRing};
use crate::{vectors, CpuBus};

/// A shared interrupt request flag.
///
/// The PPU (NMI) and APU (IRQ) each hold a clone of a line and raise it; the
/// CPU samples and acknowledges it at instruction boundaries. Cloning
/// produces another handle to the same line.
#[derive(Debug, Clone, Default)]
pub struct InterruptLine(Rc<Cell<bool>>);

impl InterruptLine {
    /// Create a new, deasserted line.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Assert the line.
    pub fn raise(&self) {
        self.0.set(true);
    }

    /// Deassert the line.
    pub fn clear(&self) {
        self.0.set(false);
    }

    /// Current line state.
    #[must_use]
    pub fn pending(&self) -> bool {
        self.0.get()
    }
}

/// Add an increment to an address without letting the low byte carry into
/// the high byte. This is how the 6502 forms addresses before the
/// page-crossing fixup cycle.
#[inline]
#[must_use]
pub(crate) const fn non_page_crossing_add(value: u16, increment: u16) -> u16 {
    (value & 0xFF00) | (value.wrapping_add(increment) & 0x00FF)
}

/// Ricoh 2A03 CPU.
pub struct Cpu {
    /// Accumulator.
    pub a: u8,
    /// X index register.
    pub x: u8,
    /// Y index register.
    pub y: u8,
    /// Stack pointer (stack lives at `$0100 + s`).
    pub s: u8,
    /// Program counter.
    pub pc: u16,
    /// Status register.
    pub p: Status,

    nmi_line: InterruptLine,
    irq_line: InterruptLine,

    trace: OpcodeRing,
}

impl Cpu {
    /// Create a CPU in its power-up state, wired to the given interrupt
    /// lines. PC is loaded from the reset vector by [`Cpu::start`].
    #[must_use]
    pub fn new(nmi_line: InterruptLine, irq_line: InterruptLine) -> Self {
        Self {
            a: 0,
            x: 0,
            y: 0,
            s: 0xFD,
            pc: 0,
            p: Status::POWER_ON,
            nmi_line,
            irq_line,
            trace: OpcodeRing::new(),
        }
    }

    /// The executed-opcode history.
    #[must_use]
    pub fn executed_opcodes(&self) -> &OpcodeRing {
        &self.trace
    }

    /// Run the 7-cycle power-up sequence, leaving PC at the reset vector
    /// target.
    pub fn start(&mut self, bus: &mut impl CpuBus) {
        // Two throwaway reads, then the three suppressed stack pushes of the
        // reset sequence appear on the bus as reads.
        bus.read(0x0000);
        bus.read(0x0001);
        bus.read(0x0100 + u16::from(self.s));
        bus.read(0x0100 + u16::from(self.s.wrapping_sub(1)));
        bus.read(0x0100 + u16::from(self.s.wrapping_sub(2)));
        let pcl = bus.read(vectors::RESET);
        let pch = bus.read(vectors::RESET + 1);
        self.pc = u16::from_le_bytes([pcl, pch]);
        info!("starting execution at {:#06X}", self.pc);
    }

    /// Execute one instruction, servicing any pending interrupt first.
    pub fn step(&mut self, bus: &mut impl CpuBus) {
        self.check_interrupts(bus);

        let start_cycle = bus.cycles();
        let opcode_byte = self.fetch(bus);
        let opcode = OPCODE_TABLE[opcode_byte as usize];

        let mut executed = ExecutedOpcode {
            start_cycle,
            pc: self.pc.wrapping_sub(1),
            opcode: opcode_byte,
            arg1: 0,
            arg2: 0,
        };
        if opcode.length >= 2 {
            executed.arg1 = bus.raw_read(self.pc);
        }
        if opcode.length >= 3 {
            executed.arg2 = bus.raw_read(self.pc.wrapping_add(1));
        }
        self.trace.push(executed);

        self.execute(bus, opcode);
    }

    fn fetch(&mut self, bus: &mut impl CpuBus) -> u8 {
        let value = bus.read(self.pc);
        self.pc = self.pc.wrapping_add(1);
        value
    }

    /// Service NMI (edge, always) or IRQ (level, masked by I) before the
    /// next fetch. Either takes 7 cycles and is not recorded in the trace.
    fn check_interrupts(&mut self, bus: &mut impl CpuBus) {
        if self.nmi_line.pending() {
            self.nmi_line.clear();
            self.service_interrupt(bus, vectors::NMI);
        } else if self.irq_line.pending() && !self.p.contains(Status::I) {
            self.service_interrupt(bus, vectors::IRQ);
        }
    }

    fn service_interrupt(&mut self, bus: &mut impl CpuBus, vector: u16) {
        bus.read(self.pc);
        bus.read(self.pc);
        self.push(bus, (self.pc >> 8) as u8);
        self.push(bus, (self.pc & 0xFF) as u8);
        self.push(bus, self.p.to_stack_byte(false));
        self.p.insert(Status::I);
        let pcl = bus.read(vector);
        let pch = bus.read(vector.wrapping_add(1));
        self.pc = u16::from_le_bytes([pcl, pch]);
    }

    fn push(&mut self, bus: &mut impl CpuBus, value: u8) {
        bus.write(0x0100 + u16::from(self.s), value);
        self.s = self.s.wrapping_sub(1);
    }

    // =========================================================================
    // Addressing modes
    //
    // Each routine performs its bus cycles inline and returns the effective
    // address plus whether a page boundary was crossed during indexing.
    // =========================================================================

    fn absolute(&mut self, bus: &mut impl CpuBus) -> (u16, bool) {
        let low = self.fetch(bus);
        let high = self.fetch(bus);
        (u16::from_le_bytes([low, high]), false)
    }

    fn indirect(&mut self, bus: &mut impl CpuBus) -> (u16, bool) {
        let (pointer, _) = self.absolute(bus);
        // The high byte fetch wraps within the pointer's page.
        let low = bus.read(pointer);
        let high = bus.read(non_page_crossing_add(pointer, 1));
        (u16::from_le_bytes([low, high]), false)
    }

    fn zero_page(&mut self, bus: &mut impl CpuBus) -> (u16, bool) {
        (u16::from(self.fetch(bus)), false)
    }

    fn zero_page_indexed(&mut self, bus: &mut impl CpuBus, index: u8) -> (u16, bool) {
        let base = u16::from(self.fetch(bus));
        bus.read(base); // Dummy read at the un-indexed address
        (non_page_crossing_add(base, u16::from(index)), false)
    }

    fn absolute_indexed(&mut self, bus: &mut impl CpuBus, index: u8) -> (u16, bool) {
        let (base, _) = self.absolute(bus);
        let effective = base.wrapping_add(u16::from(index));
        let unfixed = non_page_crossing_add(base, u16::from(index));
        if effective == unfixed {
            (effective, false)
        } else {
            bus.read(unfixed); // Dummy read before the high-byte fixup
            (effective, true)
        }
    }

    fn indirect_x(&mut self, bus: &mut impl CpuBus) -> (u16, bool) {
        let operand = self.fetch(bus);
        bus.read(u16::from(operand)); // Dummy read while X is added
        let pointer = operand.wrapping_add(self.x);
        let low = bus.read(u16::from(pointer));
        let high = bus.read(u16::from(pointer.wrapping_add(1)));
        (u16::from_le_bytes([low, high]), false)
    }

    fn indirect_y(&mut self, bus: &mut impl CpuBus) -> (u16, bool) {
        let pointer = self.fetch(bus);
        let low = bus.read(u16::from(pointer));
        let high = bus.read(u16::from(pointer.wrapping_add(1)));
        let base = u16::from_le_bytes([low, high]);
        let effective = base.wrapping_add(u16::from(self.y));
        let unfixed = non_page_crossing_add(base, u16::from(self.y));
        // This read is the real access when no page is crossed; read-class
        // opcodes then consume the value with a raw re-read.
        bus.read(unfixed);
        (effective, effective != unfixed)
    }

    fn effective_address(&mut self, bus: &mut impl CpuBus, mode: AddrMode) -> (u16, bool) {
        match mode {
            AddrMode::Immediate => {
                let addr = self.pc;
                self.pc = self.pc.wrapping_add(1);
                (addr, false)
            }
            AddrMode::ZeroPage => self.zero_page(bus),
            AddrMode::ZeroPageX => self.zero_page_indexed(bus, self.x),
            AddrMode::ZeroPageY => self.zero_page_indexed(bus, self.y),
            AddrMode::Absolute => self.absolute(bus),
            AddrMode::AbsoluteX => self.absolute_indexed(bus, self.x),
            AddrMode::AbsoluteY => self.absolute_indexed(bus, self.y),
            AddrMode::Indirect => self.indirect(bus),
            AddrMode::IndirectX => self.indirect_x(bus),
            AddrMode::IndirectY => self.indirect_y(bus),
            AddrMode::Accumulator | AddrMode::Implied | AddrMode::Relative => {
                unreachable!("mode has no effective address")
            }
        }
    }

    /// Read the operand for a read-class opcode. `(ind),Y` without a page
    /// cross already read the operand during addressing, so only the clock
    /// must not advance again.
    fn read_operand(
        &mut self,
        bus: &mut impl CpuBus,
        mode: AddrMode,
        addr: u16,
        page_crossed: bool,
    ) -> u8 {
        if mode == AddrMode::IndirectY && !page_crossed {
            bus.raw_read(addr)
        } else {
            bus.read(addr)
        }
    }

    /// Dummy read paid by write-class and RMW opcodes on absolute-indexed
    /// modes when the addressing routine did not tick for a page cross.
    fn write_alignment_read(
        bus: &mut impl CpuBus,
        mode: AddrMode,
        addr: u16,
        page_crossed: bool,
    ) {
        if matches!(mode, AddrMode::AbsoluteX | AddrMode::AbsoluteY) && !page_crossed {
            bus.read(addr);
        }
    }

    // =========================================================================
    // Execution
    // =========================================================================

    fn execute(&mut self, bus: &mut impl CpuBus, opcode: Opcode) {
        use OpcodeClass as C;
        match opcode.class {
            C::Adc => self.adc(bus, opcode),
            C::And => self.logical(bus, opcode, |a, m| a & m),
            C::Asl => self.shift(bus, opcode, |_, v| (v << 1, v & 0x80 != 0)),
            C::Bcc => self.branch_on(bus, !self.p.contains(Status::C)),
            C::Bcs => self.branch_on(bus, self.p.contains(Status::C)),
            C::Beq => self.branch_on(bus, self.p.contains(Status::Z)),
            C::Bit => self.bit(bus, opcode),
            C::Bmi => self.branch_on(bus, self.p.contains(Status::N)),
            C::Bne => self.branch_on(bus, !self.p.contains(Status::Z)),
            C::Bpl => self.branch_on(bus, !self.p.contains(Status::N)),
            C::Brk => self.brk(bus),
            C::Bvc => self.branch_on(bus, !self.p.contains(Status::V)),
            C::Bvs => self.branch_on(bus, self.p.contains(Status::V)),
            C::Clc => self.flag_op(bus, Status::C, false),
            C::Cld => self.flag_op(bus, Status::D, false),
            C::Cli => self.flag_op(bus, Status::I, false),
            C::Clv => self.flag_op(bus, Status::V, false),
            C::Cmp => self.compare(bus, opcode, self.a),
            C::Cpx => self.compare(bus, opcode, self.x),
            C::Cpy => self.compare(bus, opcode, self.y),
            C::Dec => self.rmw(bus, opcode, |_, v| (v.wrapping_sub(1), None)),
            C::Dex => self.register_op(bus, |cpu| {
                cpu.x = cpu.x.wrapping_sub(1);
                cpu.p.set_zn(cpu.x);
            }),
            C::Dey => self.register_op(bus, |cpu| {
                cpu.y = cpu.y.wrapping_sub(1);
                cpu.p.set_zn(cpu.y);
            }),
            C::Eor => self.logical(bus, opcode, |a, m| a ^ m),
            C::Inc => self.rmw(bus, opcode, |_, v| (v.wrapping_add(1), None)),
            C::Inx => self.register_op(bus, |cpu| {
                cpu.x = cpu.x.wrapping_add(1);
                cpu.p.set_zn(cpu.x);
            }),
            C::Iny => self.register_op(bus, |cpu| {
                cpu.y = cpu.y.wrapping_add(1);
                cpu.p.set_zn(cpu.y);
            }),
            C::Jam => self.jam(bus),
            C::Jmp => {
                let (addr, _) = self.effective_address(bus, opcode.mode);
                self.pc = addr;
            }
            C::Jsr => self.jsr(bus),
            C::Lda => {
                let (addr, crossed) = self.effective_address(bus, opcode.mode);
                self.a = self.read_operand(bus, opcode.mode, addr, crossed);
                self.p.set_zn(self.a);
            }
            C::Ldx => {
                let (addr, crossed) = self.effective_address(bus, opcode.mode);
                self.x = self.read_operand(bus, opcode.mode, addr, crossed);
                self.p.set_zn(self.x);
            }
            C::Ldy => {
                let (addr, crossed) = self.effective_address(bus, opcode.mode);
                self.y = self.read_operand(bus, opcode.mode, addr, crossed);
                self.p.set_zn(self.y);
            }
            C::Lsr => self.shift(bus, opcode, |_, v| (v >> 1, v & 0x01 != 0)),
            C::Nop => self.nop(bus, opcode),
            C::Ora => self.logical(bus, opcode, |a, m| a | m),
            C::Pha => {
                bus.read(self.pc); // Discarded next-byte fetch
                self.push(bus, self.a);
            }
            C::Php => {
                bus.read(self.pc);
                self.push(bus, self.p.to_stack_byte(true));
            }
            C::Pla => {
                bus.read(self.pc);
                bus.read(0x0100 + u16::from(self.s)); // Dummy stack read
                self.s = self.s.wrapping_add(1);
                self.a = bus.read(0x0100 + u16::from(self.s));
                self.p.set_zn(self.a);
            }
            C::Plp => {
                bus.read(self.pc);
                bus.read(0x0100 + u16::from(self.s));
                self.s = self.s.wrapping_add(1);
                let value = bus.read(0x0100 + u16::from(self.s));
                self.p.pull_stack_byte(value);
            }
            C::Rol => self.shift(bus, opcode, |carry, v| {
                ((v << 1) | u8::from(carry), v & 0x80 != 0)
            }),
            C::Ror => self.shift(bus, opcode, |carry, v| {
                ((v >> 1) | (u8::from(carry) << 7), v & 0x01 != 0)
            }),
            C::Rti => self.rti(bus),
            C::Rts => self.rts(bus),
            C::Sbc => self.sbc(bus, opcode),
            C::Sec => self.flag_op(bus, Status::C, true),
            C::Sed => self.flag_op(bus, Status::D, true),
            C::Sei => self.flag_op(bus, Status::I, true),
            C::Sta => self.store(bus, opcode, self.a),
            C::Stx => self.store(bus, opcode, self.x),
            C::Sty => self.store(bus, opcode, self.y),
            C::Tax => self.register_op(bus, |cpu| {
                cpu.x = cpu.a;
                cpu.p.set_zn(cpu.x);
            }),
            C::Tay => self.register_op(bus, |cpu| {
                cpu.y = cpu.a;
                cpu.p.set_zn(cpu.y);
            }),
            C::Tsx => self.register_op(bus, |cpu| {
                cpu.x = cpu.s;
                cpu.p.set_zn(cpu.x);
            }),
            C::Txa => self.register_op(bus, |cpu| {
                cpu.a = cpu.x;
                cpu.p.set_zn(cpu.a);
            }),
            C::Txs => self.register_op(bus, |cpu| {
                cpu.s = cpu.x;
            }),
            C::Tya => self.register_op(bus, |cpu| {
                cpu.a = cpu.y;
                cpu.p.set_zn(cpu.a);
            }),
        }
    }

    fn adc(&mut self, bus: &mut impl CpuBus, opcode: Opcode) {
        let (addr, crossed) = self.effective_address(bus, opcode.mode);
        let operand = self.read_operand(bus, opcode.mode, addr, crossed);
        self.add_with_carry(operand);
    }

    fn sbc(&mut self, bus: &mut impl CpuBus, opcode: Opcode) {
        let (addr, crossed) = self.effective_address(bus, opcode.mode);
        let operand = self.read_operand(bus, opcode.mode, addr, crossed);
        // SBC is ADC with the operand's low bits inverted.
        self.add_with_carry(!operand);
    }

    fn add_with_carry(&mut self, operand: u8) {
        let carry = u16::from(self.p.contains(Status::C));
        let sum = u16::from(self.a) + u16::from(operand) + carry;
        let result = sum as u8;

        self.p.set(Status::C, sum > 0xFF);
        self.p.set(
            Status::V,
            (!(self.a ^ operand) & (self.a ^ result)) & 0x80 != 0,
        );
        self.a = result;
        self.p.set_zn(self.a);
    }

    fn logical(&mut self, bus: &mut impl CpuBus, opcode: Opcode, f: fn(u8, u8) -> u8) {
        let (addr, crossed) = self.effective_address(bus, opcode.mode);
        let operand = self.read_operand(bus, opcode.mode, addr, crossed);
        self.a = f(self.a, operand);
        self.p.set_zn(self.a);
    }

    fn compare(&mut self, bus: &mut impl CpuBus, opcode: Opcode, register: u8) {
        let (addr, crossed) = self.effective_address(bus, opcode.mode);
        let operand = self.read_operand(bus, opcode.mode, addr, crossed);
        let result = register.wrapping_sub(operand);
        self.p.set(Status::C, register >= operand);
        self.p.set_zn(result);
    }

    fn bit(&mut self, bus: &mut impl CpuBus, opcode: Opcode) {
        let (addr, _) = self.effective_address(bus, opcode.mode);
        let operand = bus.read(addr);
        self.p.set(Status::N, operand & 0x80 != 0);
        self.p.set(Status::V, operand & 0x40 != 0);
        self.p.set(Status::Z, operand & self.a == 0);
    }

    fn store(&mut self, bus: &mut impl CpuBus, opcode: Opcode, value: u8) {
        let (addr, crossed) = self.effective_address(bus, opcode.mode);
        Self::write_alignment_read(bus, opcode.mode, addr, crossed);
        bus.write(addr, value);
    }

    /// Shift/rotate family. The closure maps `(carry_in, value)` to
    /// `(result, carry_out)`.
    fn shift(&mut self, bus: &mut impl CpuBus, opcode: Opcode, f: fn(bool, u8) -> (u8, bool)) {
        if opcode.mode == AddrMode::Accumulator {
            bus.read(self.pc); // Discarded next-byte fetch
            let (result, carry_out) = f(self.p.contains(Status::C), self.a);
            self.a = result;
            self.p.set(Status::C, carry_out);
            self.p.set_zn(result);
        } else {
            self.rmw(bus, opcode, |p, v| {
                let (result, carry_out) = f(p.contains(Status::C), v);
                (result, Some(carry_out))
            });
        }
    }

    /// Read-modify-write skeleton: operand read, dummy write-back of the
    /// original value, then the final write. The closure returns the new
    /// value and an optional carry-out.
    fn rmw(
        &mut self,
        bus: &mut impl CpuBus,
        opcode: Opcode,
        f: impl FnOnce(&Status, u8) -> (u8, Option<bool>),
    ) {
        let (addr, crossed) = self.effective_address(bus, opcode.mode);
        Self::write_alignment_read(bus, opcode.mode, addr, crossed);
        let operand = bus.read(addr);
        bus.write(addr, operand); // Hardware writes the old value back first
        let (result, carry) = f(&self.p, operand);
        if let Some(carry) = carry {
            self.p.set(Status::C, carry);
        }
        self.p.set_zn(result);
        bus.write(addr, result);
    }

    fn nop(&mut self, bus: &mut impl CpuBus, opcode: Opcode) {
        if opcode.mode == AddrMode::Implied {
            bus.read(self.pc);
        } else {
            let (addr, crossed) = self.effective_address(bus, opcode.mode);
            self.read_operand(bus, opcode.mode, addr, crossed);
        }
    }

    fn jam(&mut self, bus: &mut impl CpuBus) {
        bus.read(self.pc);
        bus.read(self.pc);
        // Undo the fetch increment so the CPU stays wedged on this opcode.
        self.pc = self.pc.wrapping_sub(1);
    }

    fn flag_op(&mut self, bus: &mut impl CpuBus, flag: Status, value: bool) {
        self.p.set(flag, value);
        bus.read(self.pc);
    }

    fn register_op(&mut self, bus: &mut impl CpuBus, f: fn(&mut Self)) {
        bus.read(self.pc);
        f(self);
    }

    fn branch_on(&mut self, bus: &mut impl CpuBus, condition: bool) {
        let offset = self.fetch(bus) as i8;
        if !condition {
            return;
        }

        bus.read(self.pc); // Taken-branch cycle
        let target = self.pc.wrapping_add(offset as u16);
        let unfixed = non_page_crossing_add(self.pc, offset as u16);
        self.pc = unfixed;
        if target != unfixed {
            bus.read(unfixed); // Page-crossing fixup cycle
            self.pc = target;
        }
    }

    fn jsr(&mut self, bus: &mut impl CpuBus) {
        let low = self.fetch(bus);
        bus.read(0x0100 + u16::from(self.s)); // Internal stack cycle
        self.push(bus, (self.pc >> 8) as u8);
        self.push(bus, (self.pc & 0xFF) as u8);
        let high = self.fetch(bus);
        self.pc = u16::from_le_bytes([low, high]);
    }

    fn rts(&mut self, bus: &mut impl CpuBus) {
        bus.read(self.pc);
        bus.read(0x0100 + u16::from(self.s));
        self.s = self.s.wrapping_add(1);
        let low = bus.read(0x0100 + u16::from(self.s));
        self.s = self.s.wrapping_add(1);
        let high = bus.read(0x0100 + u16::from(self.s));
        self.pc = u16::from_le_bytes([low, high]);
        bus.read(self.pc); // Increment-PC cycle
        self.pc = self.pc.wrapping_add(1);
    }

    fn rti(&mut self, bus: &mut impl CpuBus) {
        bus.read(self.pc);
        bus.read(0x0100 + u16::from(self.s));
        self.s = self.s.wrapping_add(1);
        let value = bus.read(0x0100 + u16::from(self.s));
        self.p.pull_stack_byte(value);
        self.s = self.s.wrapping_add(1);
        let low = bus.read(0x0100 + u16::from(self.s));
        self.s = self.s.wrapping_add(1);
        let high = bus.read(0x0100 + u16::from(self.s));
        self.pc = u16::from_le_bytes([low, high]);
    }

    fn brk(&mut self, bus: &mut impl CpuBus) {
        self.fetch(bus); // Padding byte, discarded
        self.push(bus, (self.pc >> 8) as u8);
        self.push(bus, (self.pc & 0xFF) as u8);

        // A pending NMI hijacks the vector at push time.
        let vector = if self.nmi_line.pending() {
            self.nmi_line.clear();
            vectors::NMI
        } else {
            vectors::IRQ
        };

        self.push(bus, self.p.to_stack_byte(true));
        self.p.insert(Status::I);

        let pcl = bus.read(vector);
        let pch = bus.read(vector.wrapping_add(1));
        self.pc = u16::from_le_bytes([pcl, pch]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Flat 64 KiB bus that records every access for traffic assertions.
    struct FlatBus {
        memory: Vec<u8>,
        cycles: u64,
        accesses: Vec<(char, u16, u8)>,
    }

    impl FlatBus {
        fn new() -> Self {
            Self {
                memory: vec![0; 0x10000],
                cycles: 0,
                accesses: Vec::new(),
            }
        }

        fn load(&mut self, addr: u16, program: &[u8]) {
            for (i, &byte) in program.iter().enumerate() {
                self.memory[addr as usize + i] = byte;
            }
        }

        fn with_reset_vector(target: u16) -> Self {
            let mut bus = Self::new();
            bus.memory[0xFFFC] = (target & 0xFF) as u8;
            bus.memory[0xFFFD] = (target >> 8) as u8;
            bus
        }
    }

    impl CpuBus for FlatBus {
        fn tick(&mut self) {
            self.cycles += 1;
        }

        fn raw_read(&mut self, addr: u16) -> u8 {
            let value = self.memory[addr as usize];
            self.accesses.push(('r', addr, value));
            value
        }

        fn raw_write(&mut self, addr: u16, data: u8) {
            self.memory[addr as usize] = data;
            self.accesses.push(('w', addr, data));
        }

        fn cycles(&self) -> u64 {
            self.cycles
        }
    }

    fn started_cpu(bus: &mut FlatBus) -> Cpu {
        let mut cpu = Cpu::new(InterruptLine::new(), InterruptLine::new());
        cpu.start(bus);
        cpu
    }

    fn run_one(bus: &mut FlatBus, cpu: &mut Cpu) -> u64 {
        let before = bus.cycles;
        cpu.step(bus);
        bus.cycles - before
    }

    #[test]
    fn power_up_sequence() {
        let mut bus = FlatBus::with_reset_vector(0xC080);
        let cpu = started_cpu(&mut bus);
        assert_eq!(cpu.pc, 0xC080);
        assert_eq!(bus.cycles, 7);
        assert_eq!(cpu.s, 0xFD);
        assert_eq!(cpu.p.bits(), 0x34);
    }

    #[test]
    fn lda_immediate() {
        let mut bus = FlatBus::with_reset_vector(0x8000);
        bus.load(0x8000, &[0xA9, 0x42]);
        let mut cpu = started_cpu(&mut bus);

        let cycles = run_one(&mut bus, &mut cpu);
        assert_eq!(cpu.a, 0x42);
        assert_eq!(cpu.pc, 0x8002);
        assert_eq!(cycles, 2);
        assert!(!cpu.p.contains(Status::Z));
        assert!(!cpu.p.contains(Status::N));
    }

    #[test]
    fn lda_sets_zero_and_negative() {
        let mut bus = FlatBus::with_reset_vector(0x8000);
        bus.load(0x8000, &[0xA9, 0x00, 0xA9, 0x80]);
        let mut cpu = started_cpu(&mut bus);

        cpu.step(&mut bus);
        assert!(cpu.p.contains(Status::Z));
        cpu.step(&mut bus);
        assert!(cpu.p.contains(Status::N));
        assert!(!cpu.p.contains(Status::Z));
    }

    #[test]
    fn lda_absolute_x_page_cross_penalty() {
        let mut bus = FlatBus::with_reset_vector(0x8000);
        // LDA $80FF,X with X=1 crosses into $8100.
        bus.load(0x8000, &[0xA2, 0x01, 0xBD, 0xFF, 0x80]);
        bus.memory[0x8100] = 0x55;
        let mut cpu = started_cpu(&mut bus);

        cpu.step(&mut bus); // LDX
        let cycles = run_one(&mut bus, &mut cpu);
        assert_eq!(cpu.a, 0x55);
        assert_eq!(cycles, 5);

        // Same read without a cross costs 4.
        let mut bus = FlatBus::with_reset_vector(0x8000);
        bus.load(0x8000, &[0xA2, 0x01, 0xBD, 0x00, 0x80]);
        let mut cpu = started_cpu(&mut bus);
        cpu.step(&mut bus);
        assert_eq!(run_one(&mut bus, &mut cpu), 4);
    }

    #[test]
    fn sta_absolute_x_always_pays_dummy() {
        let mut bus = FlatBus::with_reset_vector(0x8000);
        bus.load(0x8000, &[0x9D, 0x00, 0x02]); // STA $0200,X with X=0
        let mut cpu = started_cpu(&mut bus);
        assert_eq!(run_one(&mut bus, &mut cpu), 5);
    }

    #[test]
    fn branch_cycle_costs() {
        // Not taken: 2 cycles.
        let mut bus = FlatBus::with_reset_vector(0x8000);
        bus.load(0x8000, &[0xF0, 0x05]); // BEQ +5 with Z=0
        let mut cpu = started_cpu(&mut bus);
        assert_eq!(run_one(&mut bus, &mut cpu), 2);
        assert_eq!(cpu.pc, 0x8002);

        // Taken, same page: 3 cycles.
        let mut bus = FlatBus::with_reset_vector(0x8000);
        bus.load(0x8000, &[0xA9, 0x00, 0xF0, 0x05]);
        let mut cpu = started_cpu(&mut bus);
        cpu.step(&mut bus);
        assert_eq!(run_one(&mut bus, &mut cpu), 3);
        assert_eq!(cpu.pc, 0x8009);

        // Taken, page crossed: 4 cycles.
        let mut bus = FlatBus::with_reset_vector(0x80F0);
        bus.load(0x80F0, &[0xA9, 0x00, 0xF0, 0x20]);
        let mut cpu = started_cpu(&mut bus);
        cpu.step(&mut bus);
        assert_eq!(run_one(&mut bus, &mut cpu), 4);
        assert_eq!(cpu.pc, 0x8114);
    }

    #[test]
    fn jmp_indirect_page_wrap_bug() {
        let mut bus = FlatBus::with_reset_vector(0x8000);
        bus.load(0x8000, &[0x6C, 0xFF, 0x02]); // JMP ($02FF)
        bus.memory[0x02FF] = 0x34;
        bus.memory[0x0200] = 0x12; // High byte from $0200, not $0300
        bus.memory[0x0300] = 0xEE;
        let mut cpu = started_cpu(&mut bus);

        let cycles = run_one(&mut bus, &mut cpu);
        assert_eq!(cpu.pc, 0x1234);
        assert_eq!(cycles, 5);
    }

    #[test]
    fn indirect_x_zero_page_wrap() {
        let mut bus = FlatBus::with_reset_vector(0x8000);
        // LDA ($FF,X) with X=0: pointer bytes come from $FF and $00.
        bus.load(0x8000, &[0xA1, 0xFF]);
        bus.memory[0x00FF] = 0x00;
        bus.memory[0x0000] = 0x04;
        bus.memory[0x0400] = 0x99;
        let mut cpu = started_cpu(&mut bus);

        let cycles = run_one(&mut bus, &mut cpu);
        assert_eq!(cpu.a, 0x99);
        assert_eq!(cycles, 6);
    }

    #[test]
    fn indirect_y_cycle_costs() {
        // No cross: 5 cycles.
        let mut bus = FlatBus::with_reset_vector(0x8000);
        bus.load(0x8000, &[0xB1, 0x10]); // LDA ($10),Y
        bus.memory[0x0010] = 0x00;
        bus.memory[0x0011] = 0x04;
        let mut cpu = started_cpu(&mut bus);
        cpu.y = 0x05;
        bus.memory[0x0405] = 0x77;
        assert_eq!(run_one(&mut bus, &mut cpu), 5);
        assert_eq!(cpu.a, 0x77);

        // Cross: 6 cycles.
        let mut bus = FlatBus::with_reset_vector(0x8000);
        bus.load(0x8000, &[0xB1, 0x10]);
        bus.memory[0x0010] = 0xFF;
        bus.memory[0x0011] = 0x04;
        let mut cpu = started_cpu(&mut bus);
        cpu.y = 0x02;
        bus.memory[0x0501] = 0x66;
        assert_eq!(run_one(&mut bus, &mut cpu), 6);
        assert_eq!(cpu.a, 0x66);
    }

    #[test]
    fn rmw_performs_dummy_write() {
        let mut bus = FlatBus::with_reset_vector(0x8000);
        bus.load(0x8000, &[0xE6, 0x10]); // INC $10
        bus.memory[0x0010] = 0x41;
        let mut cpu = started_cpu(&mut bus);

        bus.accesses.clear();
        let cycles = run_one(&mut bus, &mut cpu);
        assert_eq!(cycles, 5);
        assert_eq!(bus.memory[0x0010], 0x42);

        // Traffic: opcode, operand, read $10, dummy write $41, write $42.
        let writes: Vec<_> = bus
            .accesses
            .iter()
            .filter(|(kind, _, _)| *kind == 'w')
            .collect();
        assert_eq!(writes, vec![&('w', 0x0010, 0x41), &('w', 0x0010, 0x42)]);
    }

    #[test]
    fn asl_absolute_x_takes_seven() {
        let mut bus = FlatBus::with_reset_vector(0x8000);
        bus.load(0x8000, &[0x1E, 0x00, 0x02]); // ASL $0200,X
        bus.memory[0x0200] = 0x81;
        let mut cpu = started_cpu(&mut bus);

        assert_eq!(run_one(&mut bus, &mut cpu), 7);
        assert_eq!(bus.memory[0x0200], 0x02);
        assert!(cpu.p.contains(Status::C));
    }

    #[test]
    fn adc_overflow_and_carry() {
        let mut bus = FlatBus::with_reset_vector(0x8000);
        bus.load(0x8000, &[0xA9, 0x7F, 0x69, 0x01]); // LDA #$7F; ADC #$01
        let mut cpu = started_cpu(&mut bus);

        cpu.step(&mut bus);
        cpu.step(&mut bus);
        assert_eq!(cpu.a, 0x80);
        assert!(cpu.p.contains(Status::V));
        assert!(cpu.p.contains(Status::N));
        assert!(!cpu.p.contains(Status::C));
    }

    #[test]
    fn sbc_borrows_without_carry() {
        let mut bus = FlatBus::with_reset_vector(0x8000);
        bus.load(0x8000, &[0x38, 0xA9, 0x10, 0xE9, 0x20]); // SEC; LDA #$10; SBC #$20
        let mut cpu = started_cpu(&mut bus);

        cpu.step(&mut bus);
        cpu.step(&mut bus);
        cpu.step(&mut bus);
        assert_eq!(cpu.a, 0xF0);
        assert!(!cpu.p.contains(Status::C)); // Borrow happened
        assert!(cpu.p.contains(Status::N));
    }

    #[test]
    fn jsr_rts_round_trip() {
        let mut bus = FlatBus::with_reset_vector(0x8000);
        bus.load(0x8000, &[0x20, 0x10, 0x80]); // JSR $8010
        bus.memory[0x8010] = 0x60; // RTS
        let mut cpu = started_cpu(&mut bus);

        let jsr_cycles = run_one(&mut bus, &mut cpu);
        assert_eq!(cpu.pc, 0x8010);
        assert_eq!(jsr_cycles, 6);
        assert_eq!(cpu.s, 0xFB);

        let rts_cycles = run_one(&mut bus, &mut cpu);
        assert_eq!(cpu.pc, 0x8003);
        assert_eq!(rts_cycles, 6);
        assert_eq!(cpu.s, 0xFD);
    }

    #[test]
    fn php_pushes_b_and_u() {
        let mut bus = FlatBus::with_reset_vector(0x8000);
        bus.load(0x8000, &[0x08]); // PHP
        let mut cpu = started_cpu(&mut bus);

        cpu.step(&mut bus);
        assert_eq!(bus.memory[0x01FD], 0x34 | 0x30);
    }

    #[test]
    fn plp_ignores_b_and_u() {
        let mut bus = FlatBus::with_reset_vector(0x8000);
        bus.load(0x8000, &[0xA9, 0xCF, 0x48, 0x28]); // LDA #$CF; PHA; PLP
        let mut cpu = started_cpu(&mut bus);

        cpu.step(&mut bus);
        cpu.step(&mut bus);
        cpu.step(&mut bus);
        // All seven real flags from $CF, stack-only bits kept from power-on.
        assert_eq!(cpu.p.bits(), 0xCF | 0x30);
    }

    #[test]
    fn jam_wedges_in_place() {
        let mut bus = FlatBus::with_reset_vector(0x8000);
        bus.load(0x8000, &[0x02]); // JAM
        let mut cpu = started_cpu(&mut bus);

        for _ in 0..3 {
            let cycles = run_one(&mut bus, &mut cpu);
            assert_eq!(cycles, 3);
            assert_eq!(cpu.pc, 0x8000);
        }

        // The trace shows the repeated JAMs.
        let jams = cpu
            .executed_opcodes()
            .iter()
            .filter(|e| e.opcode == 0x02)
            .count();
        assert_eq!(jams, 3);
    }

    #[test]
    fn nmi_servicing_cost_and_flags() {
        let mut bus = FlatBus::with_reset_vector(0x8000);
        bus.memory[0x9000] = 0xEA; // Handler begins with NOP
        bus.memory[0xFFFA] = 0x00;
        bus.memory[0xFFFB] = 0x90;
        let nmi = InterruptLine::new();
        let mut cpu = Cpu::new(nmi.clone(), InterruptLine::new());
        cpu.start(&mut bus);

        nmi.raise();
        let before = bus.cycles;
        cpu.step(&mut bus); // 7 cycles of servicing + 2 for the handler NOP
        assert!(!nmi.pending());
        assert_eq!(bus.cycles - before, 9);
        assert_eq!(bus.memory[0x01FB] & 0x30, 0x20); // Pushed P has B clear
        assert!(cpu.p.contains(Status::I));
    }

    #[test]
    fn nmi_vector_and_stack_frame() {
        let mut bus = FlatBus::with_reset_vector(0x8000);
        bus.memory[0x9000] = 0xEA;
        bus.memory[0xFFFA] = 0x00;
        bus.memory[0xFFFB] = 0x90;
        let nmi = InterruptLine::new();
        let mut cpu = Cpu::new(nmi.clone(), InterruptLine::new());
        cpu.start(&mut bus);

        nmi.raise();
        cpu.step(&mut bus);
        // Return address $8000 on the stack, handler entered.
        assert_eq!(bus.memory[0x01FD], 0x80);
        assert_eq!(bus.memory[0x01FC], 0x00);
        assert_eq!(cpu.pc, 0x9001); // Past the handler's first NOP
    }

    #[test]
    fn irq_masked_by_i_flag() {
        let mut bus = FlatBus::with_reset_vector(0x8000);
        bus.load(0x8000, &[0xEA, 0x58, 0xEA]); // NOP; CLI; NOP
        bus.memory[0x9000] = 0xEA;
        bus.memory[0xFFFE] = 0x00;
        bus.memory[0xFFFF] = 0x90;
        let irq = InterruptLine::new();
        let mut cpu = Cpu::new(InterruptLine::new(), irq.clone());
        cpu.start(&mut bus);

        irq.raise();
        cpu.step(&mut bus); // I=1 at power-on, IRQ ignored
        assert_eq!(cpu.pc, 0x8001);

        cpu.step(&mut bus); // CLI
        cpu.step(&mut bus); // IRQ now serviced before the next instruction
        assert_eq!(cpu.pc, 0x9001);
        assert!(irq.pending()); // Level-triggered, not cleared by the CPU
    }

    #[test]
    fn brk_pushes_pc_plus_two_and_b() {
        let mut bus = FlatBus::with_reset_vector(0x8000);
        bus.load(0x8000, &[0x00]); // BRK
        bus.memory[0x9000] = 0xEA;
        bus.memory[0xFFFE] = 0x00;
        bus.memory[0xFFFF] = 0x90;
        let mut cpu = started_cpu(&mut bus);

        let cycles = run_one(&mut bus, &mut cpu);
        assert_eq!(cycles, 7);
        assert_eq!(cpu.pc, 0x9000);
        assert_eq!(bus.memory[0x01FD], 0x80);
        assert_eq!(bus.memory[0x01FC], 0x02); // PC+2
        assert_eq!(bus.memory[0x01FB] & 0x30, 0x30); // B set
        assert!(cpu.p.contains(Status::I));
    }

    #[test]
    fn brk_hijacked_by_nmi() {
        let mut bus = FlatBus::with_reset_vector(0x8000);
        bus.memory[0xFFFA] = 0x00;
        bus.memory[0xFFFB] = 0xA0;
        bus.memory[0xFFFE] = 0x00;
        bus.memory[0xFFFF] = 0x90;
        let nmi = InterruptLine::new();
        let mut cpu = Cpu::new(nmi.clone(), InterruptLine::new());
        cpu.start(&mut bus);

        // Model an NMI rising while BRK is already executing: the push
        // phase sees the line and redirects the vector fetch.
        nmi.raise();
        cpu.brk(&mut bus);
        assert_eq!(cpu.pc, 0xA000);
        assert!(!nmi.pending());
        // The pushed status still carries B=1, marking the BRK origin.
        assert_eq!(bus.memory[0x01FB] & 0x30, 0x30);
    }

    #[test]
    fn rti_restores_flags_and_pc() {
        let mut bus = FlatBus::with_reset_vector(0x8000);
        bus.load(0x8000, &[0x00]); // BRK
        bus.memory[0x9000] = 0x40; // RTI
        bus.memory[0xFFFE] = 0x00;
        bus.memory[0xFFFF] = 0x90;
        let mut cpu = started_cpu(&mut bus);

        cpu.step(&mut bus); // BRK
        let cycles = run_one(&mut bus, &mut cpu); // RTI
        assert_eq!(cycles, 6);
        assert_eq!(cpu.pc, 0x8002);
        assert_eq!(cpu.s, 0xFD);
    }

    #[test]
    fn trace_records_operands() {
        let mut bus = FlatBus::with_reset_vector(0x8000);
        bus.load(0x8000, &[0xAD, 0x34, 0x12]); // LDA $1234
        let mut cpu = started_cpu(&mut bus);

        let start_cycle = bus.cycles;
        cpu.step(&mut bus);
        let entry = *cpu.executed_opcodes().latest().unwrap();
        assert_eq!(entry.pc, 0x8000);
        assert_eq!(entry.opcode, 0xAD);
        assert_eq!(entry.arg1, 0x34);
        assert_eq!(entry.arg2, 0x12);
        assert_eq!(entry.start_cycle, start_cycle);
    }

    #[test]
    fn zero_page_x_wraps() {
        let mut bus = FlatBus::with_reset_vector(0x8000);
        bus.load(0x8000, &[0xB5, 0xFF]); // LDA $FF,X
        let mut cpu = started_cpu(&mut bus);
        cpu.x = 0x01;
        bus.memory[0x0000] = 0xAB;

        let cycles = run_one(&mut bus, &mut cpu);
        assert_eq!(cpu.a, 0xAB);
        assert_eq!(cycles, 4);
    }
}
