//! Mapper 2 (UxROM).
//!
//! PRG banking only: writes to `$8000-$FFFF` select the 16 KiB bank mapped
//! at `$8000`; the last bank is fixed at `$C000`. CHR is almost always RAM
//! on these boards.

use log::debug;

use crate::{Cartridge, ChrStorage, Mirroring, Rom};

const PRG_BANK_SIZE: usize = 16384;

/// UxROM cartridge.
pub struct Uxrom {
    prg_rom: Vec<u8>,
    chr: ChrStorage,
    mirroring: Mirroring,
    prg_bank: usize,
}

impl Uxrom {
    /// Build a UxROM board from a parsed image.
    #[must_use]
    pub fn new(rom: Rom) -> Self {
        Self {
            prg_rom: rom.prg_rom,
            chr: ChrStorage::from_rom(rom.chr_rom),
            mirroring: rom.header.mirroring,
            prg_bank: 0,
        }
    }

    fn bank_count(&self) -> usize {
        self.prg_rom.len() / PRG_BANK_SIZE
    }
}

impl Cartridge for Uxrom {
    fn cpu_read(&mut self, _cycle: u64, addr: u16) -> u8 {
        match addr {
            0x8000..=0xBFFF => {
                let base = self.prg_bank * PRG_BANK_SIZE;
                self.prg_rom[base + usize::from(addr - 0x8000)]
            }
            0xC000..=0xFFFF => {
                let base = (self.bank_count() - 1) * PRG_BANK_SIZE;
                self.prg_rom[base + usize::from(addr - 0xC000)]
            }
            _ => {
                debug!("UxROM read from unmapped {addr:#06X}");
                0xFF
            }
        }
    }

    fn cpu_write(&mut self, _cycle: u64, addr: u16, data: u8) {
        if addr >= 0x8000 {
            self.prg_bank = usize::from(data) % self.bank_count();
        }
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RomHeader;

    fn uxrom(banks: usize) -> Uxrom {
        let mut prg_rom = vec![0; banks * PRG_BANK_SIZE];
        for (bank, chunk) in prg_rom.chunks_mut(PRG_BANK_SIZE).enumerate() {
            chunk.fill(bank as u8);
        }
        Uxrom::new(Rom {
            header: RomHeader {
                prg_rom_size: prg_rom.len(),
                chr_rom_size: 0,
                mirroring: Mirroring::Vertical,
                mapper_number: 2,
                has_battery: false,
            },
            prg_rom,
            chr_rom: Vec::new(),
        })
    }

    #[test]
    fn powers_up_with_bank_zero_low_and_last_high() {
        let mut cart = uxrom(8);
        assert_eq!(cart.cpu_read(0, 0x8000), 0);
        assert_eq!(cart.cpu_read(0, 0xC000), 7);
    }

    #[test]
    fn bank_select_moves_low_window_only() {
        let mut cart = uxrom(8);
        cart.cpu_write(0, 0x8000, 3);
        assert_eq!(cart.cpu_read(0, 0x8000), 3);
        assert_eq!(cart.cpu_read(0, 0xBFFF), 3);
        assert_eq!(cart.cpu_read(0, 0xC000), 7);
    }

    #[test]
    fn bank_select_wraps_past_bank_count() {
        let mut cart = uxrom(4);
        cart.cpu_write(0, 0xFFFF, 6);
        assert_eq!(cart.cpu_read(0, 0x8000), 2);
    }
}
