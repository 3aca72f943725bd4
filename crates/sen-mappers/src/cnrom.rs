//! Mapper 3 (CNROM).
//!
//! CHR banking only: PRG is fixed like NROM, and writes to `$8000-$FFFF`
//! select which 8 KiB CHR bank the PPU sees.

use log::debug;

use crate::{Cartridge, ChrStorage, Mirroring, Rom};

const CHR_BANK_SIZE: usize = 8192;

/// CNROM cartridge.
pub struct Cnrom {
    prg_rom: Vec<u8>,
    chr: ChrStorage,
    mirroring: Mirroring,
    chr_bank: usize,
}

impl Cnrom {
    /// Build a CNROM board from a parsed image.
    #[must_use]
    pub fn new(rom: Rom) -> Self {
        Self {
            prg_rom: rom.prg_rom,
            chr: ChrStorage::from_rom(rom.chr_rom),
            mirroring: rom.header.mirroring,
            chr_bank: 0,
        }
    }
}

impl Cartridge for Cnrom {
    fn cpu_read(&mut self, _cycle: u64, addr: u16) -> u8 {
        if addr >= 0x8000 {
            self.prg_rom[usize::from(addr - 0x8000) % self.prg_rom.len()]
        } else {
            debug!("CNROM read from unmapped {addr:#06X}");
            0xFF
        }
    }

    fn cpu_write(&mut self, _cycle: u64, addr: u16, data: u8) {
        if addr >= 0x8000 {
            let banks = self.chr.len() / CHR_BANK_SIZE;
            self.chr_bank = usize::from(data & 0x03) % banks;
        }
    }

    fn ppu_read(&mut self, addr: u16) -> u8 {
        self.chr
            .read(self.chr_bank * CHR_BANK_SIZE + usize::from(addr & 0x1FFF))
    }

    fn ppu_write(&mut self, addr: u16, data: u8) {
        self.chr
            .write(self.chr_bank * CHR_BANK_SIZE + usize::from(addr & 0x1FFF), data);
    }

    fn mirroring(&self) -> Mirroring {
        self.mirroring
    }

    fn chr(&self) -> &ChrStorage {
        &self.chr
    }
}
