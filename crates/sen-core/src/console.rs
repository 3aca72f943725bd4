//! The engine: component assembly and drive loops.

use std::sync::Arc;

use sen_apu::AudioSink;
use sen_cpu::{Cpu, InterruptLine};
use sen_mappers::{build_cartridge, Rom, RomError};

use crate::bus::Bus;
use crate::controller::{ControllerKey, ControllerPort};
use crate::debugger::Debugger;

/// CPU cycles per NTSC frame, as budgeted by the frame drive loop.
pub const CYCLES_PER_FRAME: u64 = 29780;

/// The assembled console: CPU, bus (PPU, APU, cartridge, controllers), and
/// the two shared interrupt lines.
///
/// Drive it with [`Sen::step_opcode`], [`Sen::run_for_scanline`], or
/// [`Sen::run_for_frame`]; the first call performs the CPU's 7-cycle
/// power-up sequence.
pub struct Sen {
    pub(crate) cpu: Cpu,
    pub(crate) bus: Bus,
    running: bool,
    /// Cycles the last frame ran past its budget, repaid by the next one.
    carry_over_cycles: u64,
}

impl Sen {
    /// Build an engine from a ROM image and an audio sink.
    ///
    /// # Errors
    ///
    /// Any [`RomError`]: bad magic, truncated image, unsupported mapper or
    /// NES 2.0 feature. A failed construction is terminal; there is no
    /// partially-working engine to drive.
    pub fn new(rom_bytes: &[u8], sink: Arc<dyn AudioSink>) -> Result<Self, RomError> {
        let rom = Rom::parse(rom_bytes)?;
        let cartridge = build_cartridge(rom)?;

        let nmi_line = InterruptLine::new();
        let irq_line = InterruptLine::new();
        let bus = Bus::new(cartridge, nmi_line.clone(), irq_line.clone(), sink);
        let cpu = Cpu::new(nmi_line, irq_line);

        Ok(Self {
            cpu,
            bus,
            running: false,
            carry_over_cycles: 0,
        })
    }

    fn ensure_started(&mut self) {
        if !self.running {
            self.running = true;
            self.cpu.start(&mut self.bus);
        }
    }

    /// Execute one CPU instruction (servicing pending interrupts first).
    pub fn step_opcode(&mut self) {
        self.ensure_started();
        self.cpu.step(&mut self.bus);
    }

    /// Execute CPU instructions until the PPU moves to another scanline.
    pub fn run_for_scanline(&mut self) {
        self.ensure_started();
        let start_scanline = self.bus.ppu.scanline();
        self.cpu.step(&mut self.bus);
        while self.bus.ppu.scanline() == start_scanline {
            self.cpu.step(&mut self.bus);
        }
    }

    /// Execute CPU instructions for one frame's worth of cycles. An
    /// instruction that overshoots the budget shortens the next call, so
    /// frames do not drift over time.
    pub fn run_for_frame(&mut self) {
        self.ensure_started();
        let target = self.bus.cycles + CYCLES_PER_FRAME - self.carry_over_cycles;
        while self.bus.cycles < target {
            self.cpu.step(&mut self.bus);
        }
        self.carry_over_cycles = self.bus.cycles - target;
    }

    /// Execute CPU instructions until at least `cycles` more have elapsed.
    pub fn run_for_cycles(&mut self, cycles: u64) {
        self.ensure_started();
        let target = self.bus.cycles + cycles;
        while self.bus.cycles < target {
            self.cpu.step(&mut self.bus);
        }
    }

    /// Press a controller button.
    pub fn press(&mut self, port: ControllerPort, key: ControllerKey) {
        self.bus.controller.press(port, key);
    }

    /// Release a controller button.
    pub fn release(&mut self, port: ControllerPort, key: ControllerKey) {
        self.bus.controller.release(port, key);
    }

    /// The 256x240 framebuffer of palette indices (0-63).
    #[must_use]
    pub fn framebuffer(&self) -> &[u8] {
        self.bus.ppu.framebuffer()
    }

    /// The PPU's 32 bytes of palette RAM.
    #[must_use]
    pub fn palette_ram(&self) -> &[u8; 32] {
        self.bus.ppu.palette_ram()
    }

    /// Frames completed since power-on.
    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.bus.ppu.frame_count()
    }

    /// CPU cycles elapsed since power-on.
    #[must_use]
    pub fn cycles(&self) -> u64 {
        self.bus.cycles
    }

    /// Read-only diagnostic views of the machine.
    pub fn debugger(&mut self) -> Debugger<'_> {
        Debugger::new(self)
    }
}
