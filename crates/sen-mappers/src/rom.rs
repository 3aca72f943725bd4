//! iNES / NES 2.0 ROM image parsing.
//!
//! ```text
//! Byte 0-3:  "NES\x1A"
//! Byte 4:    PRG-ROM size in 16 KiB units (LSB in NES 2.0)
//! Byte 5:    CHR-ROM size in 8 KiB units (LSB in NES 2.0)
//! Byte 6:    Flags 6  — mirroring, battery, trainer, four-screen, mapper low
//! Byte 7:    Flags 7  — NES 2.0 marker, mapper high
//! Byte 8:    Flags 8  — mapper bits 8-11 in NES 2.0
//! Byte 9:    Flags 9  — PRG/CHR size MSBs in NES 2.0
//! Byte 10-15: reserved / further NES 2.0 fields (unused here)
//! ```

use log::debug;

use crate::Mirroring;

/// Errors raised while building a cartridge from a ROM image. All of them
/// are fatal: the engine must not be driven after construction fails.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RomError {
    /// The image does not begin with `NES\x1A`.
    #[error("not an iNES image: bad magic bytes")]
    InvalidRomMagic,

    /// The image is shorter than its header claims.
    #[error("ROM image truncated: expected {expected} bytes, got {actual}")]
    TruncatedRom {
        /// Bytes the header promised.
        expected: usize,
        /// Bytes actually present.
        actual: usize,
    },

    /// The mapper is not implemented.
    #[error("unsupported mapper {0}")]
    UnsupportedMapper(u16),

    /// The image uses a NES 2.0 feature this core does not handle.
    #[error("unsupported NES 2.0 feature: {0}")]
    UnsupportedNes2Feature(&'static str),
}

/// Parsed ROM header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RomHeader {
    /// PRG-ROM size in bytes.
    pub prg_rom_size: usize,
    /// CHR-ROM size in bytes; 0 means the board carries CHR-RAM.
    pub chr_rom_size: usize,
    /// Hard-wired nametable mirroring.
    pub mirroring: Mirroring,
    /// Resolved mapper number.
    pub mapper_number: u16,
    /// Battery-backed PRG-RAM present.
    pub has_battery: bool,
}

/// A parsed ROM image: header plus the PRG and CHR sections.
#[derive(Debug, Clone)]
pub struct Rom {
    /// Parsed header.
    pub header: RomHeader,
    /// PRG-ROM bytes.
    pub prg_rom: Vec<u8>,
    /// CHR-ROM bytes; empty when the board uses CHR-RAM.
    pub chr_rom: Vec<u8>,
}

impl Rom {
    const MAGIC: [u8; 4] = [0x4E, 0x45, 0x53, 0x1A];
    const HEADER_LEN: usize = 16;
    const TRAINER_LEN: usize = 512;

    /// Parse a ROM image.
    ///
    /// # Errors
    ///
    /// See [`RomError`]. A 512-byte trainer, when flagged, is skipped.
    pub fn parse(data: &[u8]) -> Result<Self, RomError> {
        if data.len() < Self::HEADER_LEN || data[0..4] != Self::MAGIC {
            // A short file cannot even prove its magic bytes.
            if data.len() >= 4 && data[0..4] == Self::MAGIC {
                return Err(RomError::TruncatedRom {
                    expected: Self::HEADER_LEN,
                    actual: data.len(),
                });
            }
            return Err(RomError::InvalidRomMagic);
        }

        let flags6 = data[6];
        let flags7 = data[7];
        let nes2 = (flags7 & 0x0C) == 0x08;

        let mapper_number = if nes2 {
            u16::from(data[8] & 0x0F) << 8 | u16::from((flags7 & 0xF0) | (flags6 >> 4))
        } else {
            u16::from((flags7 & 0xF0) | (flags6 >> 4))
        };

        let (prg_banks, chr_banks) = if nes2 {
            let prg_msb = usize::from(data[9] & 0x0F);
            let chr_msb = usize::from(data[9] >> 4);
            if prg_msb == 0x0F || chr_msb == 0x0F {
                return Err(RomError::UnsupportedNes2Feature(
                    "exponent-multiplier ROM sizes",
                ));
            }
            (
                (prg_msb << 8) | usize::from(data[4]),
                (chr_msb << 8) | usize::from(data[5]),
            )
        } else {
            (usize::from(data[4]), usize::from(data[5]))
        };

        let prg_rom_size = prg_banks * 16384;
        let chr_rom_size = chr_banks * 8192;

        let mirroring = if flags6 & 0x08 != 0 {
            Mirroring::FourScreen
        } else if flags6 & 0x01 != 0 {
            Mirroring::Vertical
        } else {
            Mirroring::Horizontal
        };
        let has_battery = flags6 & 0x02 != 0;
        let has_trainer = flags6 & 0x04 != 0;

        let mut offset = Self::HEADER_LEN;
        if has_trainer {
            // The trainer carries code for long-dead copier hardware.
            offset += Self::TRAINER_LEN;
        }

        let expected = offset + prg_rom_size + chr_rom_size;
        if data.len() < expected {
            return Err(RomError::TruncatedRom {
                expected,
                actual: data.len(),
            });
        }

        let prg_rom = data[offset..offset + prg_rom_size].to_vec();
        offset += prg_rom_size;
        let chr_rom = data[offset..offset + chr_rom_size].to_vec();

        debug!(
            "parsed ROM: mapper {mapper_number}, {prg_rom_size} bytes PRG, \
             {chr_rom_size} bytes CHR, {mirroring:?} mirroring"
        );

        Ok(Self {
            header: RomHeader {
                prg_rom_size,
                chr_rom_size,
                mirroring,
                mapper_number,
                has_battery,
            },
            prg_rom,
            chr_rom,
        })
    }

    /// Number of 16 KiB PRG banks.
    #[must_use]
    pub fn prg_banks(&self) -> usize {
        self.prg_rom.len() / 16384
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(mapper: u8, prg_banks: u8, chr_banks: u8, flags6_extra: u8) -> Vec<u8> {
        let mut data = vec![
            0x4E,
            0x45,
            0x53,
            0x1A,
            prg_banks,
            chr_banks,
            (mapper << 4) | flags6_extra,
            mapper & 0xF0,
            0,
            0,
            0,
            0,
            0,
            0,
            0,
            0,
        ];
        data.extend(vec![0; usize::from(prg_banks) * 16384]);
        data.extend(vec![0; usize::from(chr_banks) * 8192]);
        data
    }

    #[test]
    fn parses_plain_ines() {
        let rom = Rom::parse(&image(0, 2, 1, 0x01)).unwrap();
        assert_eq!(rom.header.mapper_number, 0);
        assert_eq!(rom.header.prg_rom_size, 32768);
        assert_eq!(rom.header.chr_rom_size, 8192);
        assert_eq!(rom.header.mirroring, Mirroring::Vertical);
        assert!(!rom.header.has_battery);
    }

    #[test]
    fn rejects_bad_magic() {
        assert_eq!(Rom::parse(b"ROM!").unwrap_err(), RomError::InvalidRomMagic);
        assert_eq!(Rom::parse(&[]).unwrap_err(), RomError::InvalidRomMagic);
    }

    #[test]
    fn rejects_truncated_image() {
        let mut data = image(0, 2, 1, 0);
        data.truncate(5000);
        assert!(matches!(
            Rom::parse(&data).unwrap_err(),
            RomError::TruncatedRom { .. }
        ));
    }

    #[test]
    fn mapper_number_spans_both_nibbles() {
        let rom = Rom::parse(&image(0x41, 1, 1, 0)).unwrap();
        assert_eq!(rom.header.mapper_number, 0x41);
    }

    #[test]
    fn battery_and_four_screen_flags() {
        let rom = Rom::parse(&image(0, 1, 1, 0x0A)).unwrap();
        assert!(rom.header.has_battery);
        assert_eq!(rom.header.mirroring, Mirroring::FourScreen);
    }

    #[test]
    fn trainer_is_skipped() {
        let mut data = vec![0x4E, 0x45, 0x53, 0x1A, 1, 0, 0x04, 0, 0, 0, 0, 0, 0, 0, 0, 0];
        data.extend(vec![0xEE; 512]); // Trainer
        let mut prg = vec![0; 16384];
        prg[0] = 0xAB;
        data.extend(prg);

        let rom = Rom::parse(&data).unwrap();
        assert_eq!(rom.prg_rom[0], 0xAB);
    }

    #[test]
    fn nes2_detection_and_extended_mapper() {
        let mut data = image(0, 1, 1, 0);
        data[7] = 0x08; // NES 2.0 marker
        data[8] = 0x01; // Mapper bits 8-11
        let rom = Rom::parse(&data).unwrap();
        assert_eq!(rom.header.mapper_number, 0x100);
    }

    #[test]
    fn nes2_exponent_sizes_are_unsupported() {
        let mut data = image(0, 1, 1, 0);
        data[7] = 0x08;
        data[9] = 0x0F; // PRG MSB nibble 0xF selects exponent form
        assert!(matches!(
            Rom::parse(&data).unwrap_err(),
            RomError::UnsupportedNes2Feature(_)
        ));
    }

    #[test]
    fn chr_ram_board_has_empty_chr() {
        let rom = Rom::parse(&image(0, 1, 0, 0)).unwrap();
        assert!(rom.chr_rom.is_empty());
        assert_eq!(rom.header.chr_rom_size, 0);
    }
}
