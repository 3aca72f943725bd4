//! System bus: CPU-space address decoding and component clocking.
//!
//! Every ticked access advances the PPU by three dots and the APU by one
//! step before the memory operation happens, so a CPU instruction's timing
//! is exactly the bus traffic it generates. Raw accesses decode the same
//! addresses without touching the clock.

use std::sync::Arc;

use log::debug;

use sen_apu::{Apu, AudioSink};
use sen_cpu::{CpuBus, InterruptLine};
use sen_mappers::Cartridge;
use sen_ppu::Ppu;

use crate::controller::Controller;

/// Internal RAM size: 2 KiB, mirrored four times.
const RAM_SIZE: usize = 0x800;

/// The NES system bus.
pub struct Bus {
    ram: [u8; RAM_SIZE],
    /// Picture processing unit.
    pub ppu: Ppu,
    /// Audio processing unit.
    pub apu: Apu,
    /// Controller ports.
    pub controller: Controller,
    /// The inserted cartridge.
    pub cartridge: Box<dyn Cartridge>,
    /// CPU cycles elapsed since power-on.
    pub cycles: u64,
}

impl Bus {
    /// Assemble the bus around a cartridge and the shared interrupt lines.
    #[must_use]
    pub fn new(
        cartridge: Box<dyn Cartridge>,
        nmi_line: InterruptLine,
        irq_line: InterruptLine,
        sink: Arc<dyn AudioSink>,
    ) -> Self {
        Self {
            // Uninitialized RAM reads back as 0xFF on many consoles.
            ram: [0xFF; RAM_SIZE],
            ppu: Ppu::new(nmi_line),
            apu: Apu::new(irq_line, sink),
            controller: Controller::default(),
            cartridge,
            cycles: 0,
        }
    }

    /// OAM DMA: one wait cycle (two from an odd cycle), then 256 read/write
    /// pairs funneled through `$2004`. The PPU and APU keep ticking
    /// underneath.
    fn oam_dma(&mut self, page: u8) {
        let started_odd = self.cycles % 2 == 1;
        self.tick();
        if started_odd {
            self.tick();
        }
        let base = u16::from(page) << 8;
        for offset in 0..256 {
            let data = self.read(base + offset);
            self.write(0x2004, data);
        }
    }
}

impl CpuBus for Bus {
    fn tick(&mut self) {
        self.cycles += 1;
        for _ in 0..3 {
            self.ppu.tick(self.cartridge.as_mut());
        }
        self.apu.tick(self.cycles);
        if let Some(addr) = self.apu.dmc_fetch_request() {
            let data = self.cartridge.cpu_read(self.cycles, addr);
            self.apu.dmc_provide_sample(data);
        }
    }

    fn raw_read(&mut self, addr: u16) -> u8 {
        match addr {
            0x0000..=0x1FFF => self.ram[usize::from(addr) % RAM_SIZE],
            0x2000..=0x3FFF => self.ppu.read_register(self.cartridge.as_mut(), addr),
            0x4015 => self.apu.read_status(),
            0x4016 | 0x4017 => self.controller.cpu_read(addr),
            0x4000..=0x4014 => {
                debug!("read from write-only IO address {addr:#06X}");
                0xFF
            }
            0x4018..=0x401F => {
                debug!("read from disabled CPU test address {addr:#06X}");
                0xFF
            }
            0x4020..=0xFFFF => self.cartridge.cpu_read(self.cycles, addr),
        }
    }

    fn raw_write(&mut self, addr: u16, data: u8) {
        match addr {
            0x0000..=0x1FFF => self.ram[usize::from(addr) % RAM_SIZE] = data,
            0x2000..=0x3FFF => {
                self.ppu.write_register(self.cartridge.as_mut(), addr, data);
            }
            0x4014 => self.oam_dma(data),
            0x4016 => self.controller.cpu_write(data),
            0x4000..=0x4013 | 0x4015 | 0x4017 => {
                self.apu.write_register(self.cycles, addr, data);
            }
            0x4018..=0x401F => {
                debug!("write to disabled CPU test address {addr:#06X} = {data:#04X}");
            }
            0x4020..=0xFFFF => self.cartridge.cpu_write(self.cycles, addr, data),
        }
    }

    fn cycles(&self) -> u64 {
        self.cycles
    }
}
