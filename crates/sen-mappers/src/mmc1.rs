//! Mapper 1 (MMC1 / SxROM).
//!
//! Registers are loaded through a serial port: five writes to `$8000-$FFFF`
//! each contribute one bit (LSB first); the fifth write commits to the
//! register selected by the address. A write with bit 7 set resets the
//! shift register and locks PRG mode 3. The MMC1 ignores the second of two
//! writes on consecutive CPU cycles, which is what the 6502's double store
//! during read-modify-write instructions produces.

use log::debug;

use crate::{Cartridge, ChrStorage, Mirroring, Rom};

const PRG_BANK_SIZE: usize = 16384;
const CHR_BANK_SIZE: usize = 4096;
const PRG_RAM_SIZE: usize = 8192;

/// MMC1 cartridge.
pub struct Mmc1 {
    prg_rom: Vec<u8>,
    chr: ChrStorage,
    prg_ram: Vec<u8>,
    has_battery: bool,

    // Serial port
    shift: u8,
    shift_count: u8,
    last_write_cycle: Option<u64>,

    // Committed registers
    control: u8,
    chr_bank_0: u8,
    chr_bank_1: u8,
    prg_bank: u8,
}

impl Mmc1 {
    /// Build an MMC1 board from a parsed image.
    #[must_use]
    pub fn new(rom: Rom) -> Self {
        Self {
            prg_rom: rom.prg_rom,
            chr: ChrStorage::from_rom(rom.chr_rom),
            prg_ram: vec![0; PRG_RAM_SIZE],
            has_battery: rom.header.has_battery,
            shift: 0,
            shift_count: 0,
            last_write_cycle: None,
            control: 0x0C, // PRG mode 3 at power-on
            chr_bank_0: 0,
            chr_bank_1: 0,
            prg_bank: 0,
        }
    }

    /// Battery-backed PRG-RAM contents, when the board has a battery.
    #[must_use]
    pub fn battery_ram(&self) -> Option<&[u8]> {
        self.has_battery.then_some(self.prg_ram.as_slice())
    }

    fn prg_mode(&self) -> u8 {
        (self.control >> 2) & 0x03
    }

    fn chr_mode_4k(&self) -> bool {
        self.control & 0x10 != 0
    }

    fn prg_ram_enabled(&self) -> bool {
        self.prg_bank & 0x10 == 0
    }

    fn prg_bank_count(&self) -> usize {
        self.prg_rom.len() / PRG_BANK_SIZE
    }

    fn write_register(&mut self, addr: u16, value: u8) {
        match addr {
            0x8000..=0x9FFF => self.control = value,
            0xA000..=0xBFFF => self.chr_bank_0 = value,
            0xC000..=0xDFFF => self.chr_bank_1 = value,
            _ => self.prg_bank = value,
        }
        debug!("MMC1 register {addr:#06X} <- {value:#04X}");
    }

    fn prg_offset(&self, addr: u16) -> usize {
        let bank = usize::from(self.prg_bank & 0x0F);
        let last = self.prg_bank_count() - 1;
        let (bank_base, in_bank) = match (self.prg_mode(), addr) {
            // 32 KiB mode ignores the low bank bit.
            (0 | 1, _) => ((bank & !1) * PRG_BANK_SIZE, usize::from(addr - 0x8000)),
            (2, 0x8000..=0xBFFF) => (0, usize::from(addr - 0x8000)),
            (2, _) => (bank * PRG_BANK_SIZE, usize::from(addr - 0xC000)),
            (3, 0x8000..=0xBFFF) => (bank * PRG_BANK_SIZE, usize::from(addr - 0x8000)),
            _ => (last * PRG_BANK_SIZE, usize::from(addr - 0xC000)),
        };
        (bank_base + in_bank) % self.prg_rom.len()
    }

    fn chr_offset(&self, addr: u16) -> usize {
        let addr = usize::from(addr & 0x1FFF);
        if self.chr_mode_4k() {
            let bank = if addr < CHR_BANK_SIZE {
                usize::from(self.chr_bank_0)
            } else {
                usize::from(self.chr_bank_1)
            };
            bank * CHR_BANK_SIZE + (addr % CHR_BANK_SIZE)
        } else {
            usize::from(self.chr_bank_0 & !1) * CHR_BANK_SIZE + addr
        }
    }
}

impl Cartridge for Mmc1 {
    fn cpu_read(&mut self, _cycle: u64, addr: u16) -> u8 {
        match addr {
            0x6000..=0x7FFF if self.prg_ram_enabled() => {
                self.prg_ram[usize::from(addr - 0x6000)]
            }
            0x8000..=0xFFFF => self.prg_rom[self.prg_offset(addr)],
            _ => {
                debug!("MMC1 read from unmapped {addr:#06X}");
                0xFF
            }
        }
    }

    fn cpu_write(&mut self, cycle: u64, addr: u16, data: u8) {
        match addr {
            0x6000..=0x7FFF => {
                if self.prg_ram_enabled() {
                    self.prg_ram[usize::from(addr - 0x6000)] = data;
                }
            }
            0x8000..=0xFFFF => {
                // The second of two back-to-back writes never reaches the
                // serial port.
                let back_to_back = self.last_write_cycle == Some(cycle.wrapping_sub(1));
                self.last_write_cycle = Some(cycle);
                if back_to_back {
                    return;
                }

                if data & 0x80 != 0 {
                    self.shift = 0;
                    self.shift_count = 0;
                    self.control |= 0x0C;
                    return;
                }

                self.shift |= (data & 0x01) << self.shift_count;
                self.shift_count += 1;
                if self.shift_count == 5 {
                    let value = self.shift;
                    self.shift = 0;
                    self.shift_count = 0;
                    self.write_register(addr, value);
                }
            }
            _ => {}
        }
    }

    fn ppu_read(&mut self, addr: u16) -> u8 {
        self.chr.read(self.chr_offset(addr))
    }

    fn ppu_write(&mut self, addr: u16, data: u8) {
        let offset = self.chr_offset(addr);
        self.chr.write(offset, data);
    }

    fn mirroring(&self) -> Mirroring {
        match self.control & 0x03 {
            0 => Mirroring::SingleScreenLower,
            1 => Mirroring::SingleScreenUpper,
            2 => Mirroring::Vertical,
            _ => Mirroring::Horizontal,
        }
    }

    fn chr(&self) -> &ChrStorage {
        &self.chr
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RomHeader;

    fn mmc1(prg_banks: usize, chr_8k_banks: usize) -> Mmc1 {
        let mut prg_rom = vec![0; prg_banks * PRG_BANK_SIZE];
        for (bank, chunk) in prg_rom.chunks_mut(PRG_BANK_SIZE).enumerate() {
            chunk.fill(bank as u8);
        }
        let mut chr_rom = vec![0; chr_8k_banks * 8192];
        for (bank, chunk) in chr_rom.chunks_mut(CHR_BANK_SIZE).enumerate() {
            chunk.fill(bank as u8);
        }
        Mmc1::new(Rom {
            header: RomHeader {
                prg_rom_size: prg_rom.len(),
                chr_rom_size: chr_rom.len(),
                mirroring: Mirroring::Horizontal,
                mapper_number: 1,
                has_battery: true,
            },
            prg_rom,
            chr_rom,
        })
    }

    /// Clock five serial writes, far enough apart in time to all register.
    fn serial_write(cart: &mut Mmc1, cycle: &mut u64, addr: u16, value: u8) {
        for bit in 0..5 {
            cart.cpu_write(*cycle, addr, (value >> bit) & 0x01);
            *cycle += 10;
        }
    }

    #[test]
    fn powers_up_with_last_bank_fixed_high() {
        let mut cart = mmc1(8, 1);
        assert_eq!(cart.cpu_read(0, 0xC000), 7);
        assert_eq!(cart.cpu_read(0, 0x8000), 0);
    }

    #[test]
    fn prg_bank_switch_in_mode_three() {
        let mut cart = mmc1(8, 1);
        let mut cycle = 0;
        serial_write(&mut cart, &mut cycle, 0xE000, 5);
        assert_eq!(cart.cpu_read(0, 0x8000), 5);
        assert_eq!(cart.cpu_read(0, 0xC000), 7); // Still fixed
    }

    #[test]
    fn thirty_two_kib_prg_mode() {
        let mut cart = mmc1(8, 1);
        let mut cycle = 0;
        serial_write(&mut cart, &mut cycle, 0x8000, 0x00); // Control: 32K mode
        serial_write(&mut cart, &mut cycle, 0xE000, 3); // Bank pair 2/3
        assert_eq!(cart.cpu_read(0, 0x8000), 2);
        assert_eq!(cart.cpu_read(0, 0xC000), 3);
    }

    #[test]
    fn chr_4k_banks() {
        let mut cart = mmc1(2, 2);
        let mut cycle = 0;
        serial_write(&mut cart, &mut cycle, 0x8000, 0x1C); // CHR 4K mode
        serial_write(&mut cart, &mut cycle, 0xA000, 1);
        serial_write(&mut cart, &mut cycle, 0xC000, 3);
        assert_eq!(cart.ppu_read(0x0000), 1);
        assert_eq!(cart.ppu_read(0x1000), 3);
    }

    #[test]
    fn mirroring_control() {
        let mut cart = mmc1(2, 1);
        let mut cycle = 0;
        serial_write(&mut cart, &mut cycle, 0x8000, 0x02 | 0x0C);
        assert_eq!(cart.mirroring(), Mirroring::Vertical);
        serial_write(&mut cart, &mut cycle, 0x8000, 0x03 | 0x0C);
        assert_eq!(cart.mirroring(), Mirroring::Horizontal);
        serial_write(&mut cart, &mut cycle, 0x8000, 0x0C);
        assert_eq!(cart.mirroring(), Mirroring::SingleScreenLower);
    }

    #[test]
    fn reset_bit_clears_shift_and_locks_mode_three() {
        let mut cart = mmc1(8, 1);
        let mut cycle = 0;
        // Two bits in, then a reset write.
        cart.cpu_write(cycle, 0x8000, 1);
        cycle += 10;
        cart.cpu_write(cycle, 0x8000, 1);
        cycle += 10;
        cart.cpu_write(cycle, 0x8000, 0x80);
        cycle += 10;
        // A full serial sequence still works afterwards.
        serial_write(&mut cart, &mut cycle, 0xE000, 4);
        assert_eq!(cart.cpu_read(0, 0x8000), 4);
    }

    #[test]
    fn consecutive_cycle_write_is_ignored() {
        let mut cart = mmc1(8, 1);
        // Five writes on cycles n, n+1, ... — only the non-consecutive ones
        // shift in, so the register does not commit after five.
        for (i, cycle) in (100u64..105).enumerate() {
            cart.cpu_write(cycle, 0xE000, (5 >> i) & 0x01);
        }
        assert_eq!(cart.cpu_read(0, 0x8000), 0); // Nothing committed

        // Spaced writes commit normally once the port is reset.
        cart.cpu_write(150, 0xE000, 0x80);
        let mut cycle = 200;
        serial_write(&mut cart, &mut cycle, 0xE000, 5);
        assert_eq!(cart.cpu_read(0, 0x8000), 5);
    }

    #[test]
    fn prg_ram_read_write_and_battery() {
        let mut cart = mmc1(2, 1);
        cart.cpu_write(0, 0x6000, 0x42);
        assert_eq!(cart.cpu_read(2, 0x6000), 0x42);
        assert_eq!(cart.battery_ram().unwrap()[0], 0x42);
    }

    #[test]
    fn prg_ram_disable_bit() {
        let mut cart = mmc1(2, 1);
        cart.cpu_write(0, 0x6000, 0x42);
        let mut cycle = 10;
        serial_write(&mut cart, &mut cycle, 0xE000, 0x10); // RAM disable
        assert_eq!(cart.cpu_read(cycle, 0x6000), 0xFF);
    }
}
