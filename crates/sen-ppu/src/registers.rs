//! The PPU's three control/status registers.
//!
//! PPUCTRL and PPUMASK are write-only from the CPU side; PPUSTATUS is
//! read-only with read side effects handled by the PPU itself.

use bitflags::bitflags;

bitflags! {
    /// PPUCTRL (`$2000`), write-only.
    ///
    /// `VPHB SINN`: NMI enable, master/slave, sprite height, background
    /// table, sprite table, VRAM increment, base nametable.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct PpuCtrl: u8 {
        /// Base nametable bit 0 (also coarse-X bit 10 of `t`).
        const NAMETABLE_LO = 1 << 0;
        /// Base nametable bit 1 (also coarse-Y bit 11 of `t`).
        const NAMETABLE_HI = 1 << 1;
        /// PPUDATA address increment: 0 adds 1, 1 adds 32.
        const VRAM_INCREMENT = 1 << 2;
        /// Sprite pattern table for 8x8 sprites.
        const SPRITE_TABLE = 1 << 3;
        /// Background pattern table.
        const BACKGROUND_TABLE = 1 << 4;
        /// Sprite height: 0 is 8x8, 1 is 8x16.
        const TALL_SPRITES = 1 << 5;
        /// Master/slave select. Unused on a stock console.
        const MASTER_SLAVE = 1 << 6;
        /// Raise NMI at the start of vertical blank.
        const NMI_ENABLE = 1 << 7;
    }
}

impl PpuCtrl {
    /// Amount added to `v` after each PPUDATA access.
    #[inline]
    #[must_use]
    pub fn vram_step(self) -> u16 {
        if self.contains(Self::VRAM_INCREMENT) { 32 } else { 1 }
    }

    /// Background pattern table base address.
    #[inline]
    #[must_use]
    pub fn background_table(self) -> u16 {
        if self.contains(Self::BACKGROUND_TABLE) { 0x1000 } else { 0x0000 }
    }

    /// Sprite pattern table base address (8x8 mode; 8x16 sprites pick the
    /// table from the tile index instead).
    #[inline]
    #[must_use]
    pub fn sprite_table(self) -> u16 {
        if self.contains(Self::SPRITE_TABLE) { 0x1000 } else { 0x0000 }
    }

    /// Sprite height in scanlines.
    #[inline]
    #[must_use]
    pub fn sprite_height(self) -> u16 {
        if self.contains(Self::TALL_SPRITES) { 16 } else { 8 }
    }
}

bitflags! {
    /// PPUMASK (`$2001`), write-only.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct PpuMask: u8 {
        /// Greyscale: palette output is masked to the grey column.
        const GREYSCALE = 1 << 0;
        /// Show the background in the left 8 pixels.
        const BACKGROUND_LEFT = 1 << 1;
        /// Show sprites in the left 8 pixels.
        const SPRITES_LEFT = 1 << 2;
        /// Enable background rendering.
        const SHOW_BACKGROUND = 1 << 3;
        /// Enable sprite rendering.
        const SHOW_SPRITES = 1 << 4;
        /// Emphasize red.
        const EMPHASIZE_RED = 1 << 5;
        /// Emphasize green.
        const EMPHASIZE_GREEN = 1 << 6;
        /// Emphasize blue.
        const EMPHASIZE_BLUE = 1 << 7;
    }
}

impl PpuMask {
    /// True when either layer is enabled; gates the whole render pipeline.
    #[inline]
    #[must_use]
    pub fn rendering_enabled(self) -> bool {
        self.intersects(Self::SHOW_BACKGROUND | Self::SHOW_SPRITES)
    }
}

bitflags! {
    /// PPUSTATUS (`$2002`), read-only. The low five bits are open bus.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct PpuStatus: u8 {
        /// More than eight sprites were found on a scanline.
        const SPRITE_OVERFLOW = 1 << 5;
        /// An opaque sprite-0 pixel overlapped an opaque background pixel.
        const SPRITE_ZERO_HIT = 1 << 6;
        /// Vertical blank has started.
        const VBLANK = 1 << 7;
    }
}
