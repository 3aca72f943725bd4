//! Mapper 0 (NROM).
//!
//! No banking at all: 16 or 32 KiB of PRG-ROM at `$8000-$FFFF` (the 16 KiB
//! variant mirrors into the upper half), CHR-ROM or 8 KiB CHR-RAM, and
//! mirroring fixed by the header.

use log::debug;

use crate::{Cartridge, ChrStorage, Mirroring, Rom};

/// NROM cartridge.
pub struct Nrom {
    prg_rom: Vec<u8>,
    chr: ChrStorage,
    mirroring: Mirroring,
}

impl Nrom {
    /// Build an NROM board from a parsed image.
    #[must_use]
    pub fn new(rom: Rom) -> Self {
        Self {
            prg_rom: rom.prg_rom,
            chr: ChrStorage::from_rom(rom.chr_rom),
            mirroring: rom.header.mirroring,
        }
    }
}

impl Cartridge for Nrom {
    fn cpu_read(&mut self, _cycle: u64, addr: u16) -> u8 {
        if addr >= 0x8000 {
            self.prg_rom[usize::from(addr - 0x8000) % self.prg_rom.len()]
        } else {
            debug!("NROM read from unmapped {addr:#06X}");
            0xFF
        }
    }

    fn cpu_write(&mut self, _cycle: u64, addr: u16, data: u8) {
        debug!("NROM write to ROM space {addr:#06X} = {data:#04X} ignored");
    }

    fn ppu_read(&mut self, addr: u16) -> u8 {
        self.chr.read(usize::from(addr & 0x1FFF))
    }

    fn ppu_write(&mut self, addr: u16, data: u8) {
        self.chr.write(usize::from(addr & 0x1FFF), data);
    }

    fn mirroring(&self) -> Mirroring {
        self.mirroring
    }

    fn chr(&self) -> &ChrStorage {
        &self.chr
    }
}
