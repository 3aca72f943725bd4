//! Read-only diagnostic views over a running engine.
//!
//! Everything here is observational: snapshots copy state out, and the PPU
//! memory dump goes through the same decode paths the PPU itself uses, so
//! nothing the debugger does can disturb emulation other than the open-bus
//! effects any raw bus read has.

use sen_cpu::{CpuBus, OpcodeRing, Status};
use sen_ppu::{Scroll, Sprite};

use crate::console::Sen;

/// CPU register snapshot.
#[derive(Debug, Clone, Copy)]
pub struct CpuView {
    /// Accumulator.
    pub a: u8,
    /// X index.
    pub x: u8,
    /// Y index.
    pub y: u8,
    /// Stack pointer.
    pub s: u8,
    /// Program counter.
    pub pc: u16,
    /// Status register.
    pub p: Status,
    /// Cycles since power-on.
    pub cycles: u64,
}

/// PPU state snapshot.
#[derive(Debug, Clone, Copy)]
pub struct PpuView {
    /// Frames completed.
    pub frame_count: u64,
    /// Current scanline (0-261).
    pub scanline: u16,
    /// Current dot (0-340).
    pub dot: u16,
    /// Loopy registers: `v`, `t`, fine X, and the write toggle.
    pub scroll: Scroll,
    /// PPUCTRL bits.
    pub ppuctrl: u8,
    /// PPUMASK bits.
    pub ppumask: u8,
    /// PPUSTATUS bits.
    pub ppustatus: u8,
    /// OAMADDR.
    pub oamaddr: u8,
    /// Palette RAM.
    pub palettes: [u8; 32],
}

/// One OAM entry plus the pattern bytes of its tile.
#[derive(Debug, Clone, Copy)]
pub struct SpriteView {
    /// The decoded OAM entry.
    pub entry: Sprite,
    /// The 16 pattern bytes of the sprite's tile.
    pub tile: [u8; 16],
}

/// Diagnostic access to a [`Sen`] engine.
pub struct Debugger<'a> {
    sen: &'a mut Sen,
}

impl<'a> Debugger<'a> {
    pub(crate) fn new(sen: &'a mut Sen) -> Self {
        Self { sen }
    }

    /// CPU registers and cycle count.
    #[must_use]
    pub fn cpu_state(&self) -> CpuView {
        let cpu = &self.sen.cpu;
        CpuView {
            a: cpu.a,
            x: cpu.x,
            y: cpu.y,
            s: cpu.s,
            pc: cpu.pc,
            p: cpu.p,
            cycles: self.sen.bus.cycles,
        }
    }

    /// The last 30 executed opcodes, oldest first.
    #[must_use]
    pub fn executed_opcodes(&self) -> &OpcodeRing {
        self.sen.cpu.executed_opcodes()
    }

    /// PPU registers, counters, and palette RAM.
    #[must_use]
    pub fn ppu_state(&self) -> PpuView {
        let ppu = &self.sen.bus.ppu;
        let (ppuctrl, ppumask, ppustatus, oamaddr) = ppu.registers();
        PpuView {
            frame_count: ppu.frame_count(),
            scanline: ppu.scanline(),
            dot: ppu.dot(),
            scroll: ppu.scroll_state(),
            ppuctrl,
            ppumask,
            ppustatus,
            oamaddr,
            palettes: *ppu.palette_ram(),
        }
    }

    /// The framebuffer of palette indices.
    #[must_use]
    pub fn framebuffer(&self) -> &[u8] {
        self.sen.bus.ppu.framebuffer()
    }

    /// All 64 sprites with their tile pattern data.
    #[must_use]
    pub fn sprites(&self) -> Vec<SpriteView> {
        let ppu = &self.sen.bus.ppu;
        let chr = self.sen.bus.cartridge.chr();
        let sprite_table = if ppu.registers().0 & 0x08 != 0 { 0x1000 } else { 0x0000 };

        (0..64)
            .map(|index| {
                let entry = Sprite::from_oam(ppu.oam_bytes(), index);
                let mut tile = [0; 16];
                let base = sprite_table + usize::from(entry.tile_index) * 16;
                for (i, byte) in tile.iter_mut().enumerate() {
                    *byte = chr.read(base + i);
                }
                SpriteView { entry, tile }
            })
            .collect()
    }

    /// Copies of both pattern tables.
    #[must_use]
    pub fn pattern_tables(&self) -> (Vec<u8>, Vec<u8>) {
        let chr = self.sen.bus.cartridge.chr();
        let left = (0..0x1000).map(|i| chr.read(i)).collect();
        let right = (0x1000..0x2000).map(|i| chr.read(i)).collect();
        (left, right)
    }

    /// Dump the full 16 KiB PPU address space into `buffer`.
    pub fn load_ppu_memory(&mut self, buffer: &mut Vec<u8>) {
        buffer.clear();
        buffer.reserve(0x4000);
        for addr in 0..0x4000 {
            let byte = self
                .sen
                .bus
                .ppu
                .mem_read(self.sen.bus.cartridge.as_mut(), addr);
            buffer.push(byte);
        }
    }

    /// Raw CPU bus read (no clock advance).
    pub fn peek(&mut self, addr: u16) -> u8 {
        self.sen.bus.raw_read(addr)
    }
}
