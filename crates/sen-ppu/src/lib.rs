//! Cycle-accurate Ricoh 2C02 PPU core for the Sen NES emulator.
//!
//! [`Ppu::tick`] advances exactly one dot through the 262x341 NTSC frame;
//! the bus calls it three times per CPU cycle. Rendering follows the
//! hardware pipeline: 16-bit background shift registers fed by an 8-dot
//! fetch cadence, secondary-OAM sprite selection for the next scanline, and
//! per-dot pixel multiplexing into a 256x240 palette-index framebuffer.

mod oam;
mod registers;
mod scroll;

pub use oam::{SecondaryOam, Sprite};
pub use registers::{PpuCtrl, PpuMask, PpuStatus};
pub use scroll::Scroll;

use sen_cpu::InterruptLine;
use sen_mappers::Cartridge;

/// Framebuffer width in pixels.
pub const WIDTH: usize = 256;
/// Framebuffer height in pixels.
pub const HEIGHT: usize = 240;

const DOTS_PER_SCANLINE: u16 = 341;
const SCANLINES_PER_FRAME: u16 = 262;
const VBLANK_SCANLINE: u16 = 241;
const PRE_RENDER_SCANLINE: u16 = 261;

/// One sprite staged for the current scanline, pattern bytes already
/// fetched (and pre-mirrored for horizontal flip).
#[derive(Debug, Clone, Copy, Default)]
struct SpriteUnit {
    sprite: Sprite,
    pattern_low: u8,
    pattern_high: u8,
    is_sprite_zero: bool,
}

/// Ricoh 2C02 PPU.
pub struct Ppu {
    ctrl: PpuCtrl,
    mask: PpuMask,
    status: PpuStatus,
    oam_addr: u8,
    scroll: Scroll,

    /// Last byte driven onto the register bus; reads of write-only
    /// registers reflect it.
    io_data_bus: u8,
    /// PPUDATA buffered byte.
    read_buffer: u8,

    /// Nametable RAM. Four-screen boards address all 4 KiB; every other
    /// mirroring mode folds into the first 2 KiB.
    nametable_ram: [u8; 0x1000],
    palette_ram: [u8; 32],
    oam: [u8; 256],
    secondary_oam: SecondaryOam,

    scanline: u16,
    dot: u16,
    frame: u64,
    odd_frame: bool,

    // Background pipeline
    tile_index: u8,
    attribute_bits: u8,
    pattern_latch_low: u8,
    pattern_latch_high: u8,
    pattern_shift_low: u16,
    pattern_shift_high: u16,
    attribute_shift_low: u16,
    attribute_shift_high: u16,

    // Sprite pipeline
    sprite_units: [SpriteUnit; 8],
    sprite_unit_count: u8,

    framebuffer: Vec<u8>,
    nmi_line: InterruptLine,
}

impl Ppu {
    /// Create a PPU wired to the given NMI line.
    #[must_use]
    pub fn new(nmi_line: InterruptLine) -> Self {
        Self {
            ctrl: PpuCtrl::empty(),
            mask: PpuMask::empty(),
            status: PpuStatus::empty(),
            oam_addr: 0,
            scroll: Scroll::default(),
            io_data_bus: 0,
            read_buffer: 0,
            nametable_ram: [0; 0x1000],
            palette_ram: [0; 32],
            oam: [0; 256],
            secondary_oam: SecondaryOam::default(),
            scanline: 0,
            dot: 0,
            frame: 0,
            odd_frame: false,
            tile_index: 0,
            attribute_bits: 0,
            pattern_latch_low: 0,
            pattern_latch_high: 0,
            pattern_shift_low: 0,
            pattern_shift_high: 0,
            attribute_shift_low: 0,
            attribute_shift_high: 0,
            sprite_units: [SpriteUnit::default(); 8],
            sprite_unit_count: 0,
            framebuffer: vec![0; WIDTH * HEIGHT],
            nmi_line,
        }
    }

    // =========================================================================
    // CPU-facing registers
    // =========================================================================

    /// Read a PPU register (`$2000-$2007`, pre-mirrored by the bus).
    pub fn read_register(&mut self, cart: &mut dyn Cartridge, addr: u16) -> u8 {
        match addr & 0x07 {
            // Write-only registers reflect the register bus.
            0 | 1 | 3 | 5 | 6 => self.io_data_bus,

            2 => {
                let value = (self.status.bits() & 0xE0) | (self.io_data_bus & 0x1F);
                self.status.remove(PpuStatus::VBLANK);
                self.scroll.reset_toggle();
                self.io_data_bus = value;
                value
            }

            4 => {
                let value = self.oam[usize::from(self.oam_addr)];
                self.io_data_bus = value;
                value
            }

            7 => {
                let addr = self.scroll.v & 0x3FFF;
                let value = if addr >= 0x3F00 {
                    // Palette reads bypass the buffer, which is refilled
                    // from the nametable byte underneath.
                    self.read_buffer = self.mem_read(cart, addr - 0x1000);
                    (self.palette_read(addr) & 0x3F) | (self.io_data_bus & 0xC0)
                } else {
                    let buffered = self.read_buffer;
                    self.read_buffer = self.mem_read(cart, addr);
                    buffered
                };
                self.scroll.step_vram(self.ctrl.vram_step());
                self.io_data_bus = value;
                value
            }

            _ => unreachable!(),
        }
    }

    /// Write a PPU register (`$2000-$2007`, pre-mirrored by the bus).
    pub fn write_register(&mut self, cart: &mut dyn Cartridge, addr: u16, data: u8) {
        self.io_data_bus = data;

        match addr & 0x07 {
            0 => {
                let had_nmi = self.ctrl.contains(PpuCtrl::NMI_ENABLE);
                self.ctrl = PpuCtrl::from_bits_truncate(data);
                self.scroll.write_control(data);
                // Enabling NMI during an ongoing vblank raises it at once.
                if !had_nmi
                    && self.ctrl.contains(PpuCtrl::NMI_ENABLE)
                    && self.status.contains(PpuStatus::VBLANK)
                {
                    self.nmi_line.raise();
                }
            }
            1 => self.mask = PpuMask::from_bits_truncate(data),
            2 => {} // PPUSTATUS is read-only
            3 => self.oam_addr = data,
            4 => {
                self.oam[usize::from(self.oam_addr)] = data;
                self.oam_addr = self.oam_addr.wrapping_add(1);
            }
            5 => self.scroll.write_scroll(data),
            6 => self.scroll.write_address(data),
            7 => {
                let addr = self.scroll.v & 0x3FFF;
                self.mem_write(cart, addr, data);
                self.scroll.step_vram(self.ctrl.vram_step());
            }
            _ => unreachable!(),
        }
    }

    // =========================================================================
    // PPU address space
    // =========================================================================

    fn nametable_index(cart: &dyn Cartridge, addr: u16) -> usize {
        usize::from(cart.mirroring().map_address(addr))
    }

    /// Read a byte of PPU address space.
    pub fn mem_read(&mut self, cart: &mut dyn Cartridge, addr: u16) -> u8 {
        let addr = addr & 0x3FFF;
        match addr {
            0x0000..=0x1FFF => cart.ppu_read(addr),
            0x2000..=0x3EFF => self.nametable_ram[Self::nametable_index(cart, addr)],
            _ => self.palette_read(addr),
        }
    }

    /// Write a byte of PPU address space.
    pub fn mem_write(&mut self, cart: &mut dyn Cartridge, addr: u16, data: u8) {
        let addr = addr & 0x3FFF;
        match addr {
            0x0000..=0x1FFF => cart.ppu_write(addr, data),
            0x2000..=0x3EFF => {
                self.nametable_ram[Self::nametable_index(cart, addr)] = data;
            }
            _ => self.palette_write(addr, data),
        }
    }

    /// `$3F10/$3F14/$3F18/$3F1C` alias their background counterparts.
    fn palette_index(addr: u16) -> usize {
        let index = usize::from(addr & 0x1F);
        if index >= 0x10 && index % 4 == 0 {
            index - 0x10
        } else {
            index
        }
    }

    fn palette_read(&self, addr: u16) -> u8 {
        self.palette_ram[Self::palette_index(addr)]
    }

    fn palette_write(&mut self, addr: u16, data: u8) {
        self.palette_ram[Self::palette_index(addr)] = data;
    }

    // =========================================================================
    // Dot clock
    // =========================================================================

    /// Advance one dot.
    pub fn tick(&mut self, cart: &mut dyn Cartridge) {
        match self.scanline {
            0..=239 => self.render_dot(cart, false),
            VBLANK_SCANLINE => {
                if self.dot == 1 {
                    self.status.insert(PpuStatus::VBLANK);
                    if self.ctrl.contains(PpuCtrl::NMI_ENABLE) {
                        self.nmi_line.raise();
                    }
                }
            }
            PRE_RENDER_SCANLINE => {
                if self.dot == 1 {
                    self.status.remove(
                        PpuStatus::VBLANK | PpuStatus::SPRITE_ZERO_HIT | PpuStatus::SPRITE_OVERFLOW,
                    );
                }
                self.render_dot(cart, true);
            }
            _ => {}
        }

        self.advance_dot();
    }

    fn advance_dot(&mut self) {
        // Odd frames drop the last pre-render dot while rendering.
        if self.scanline == PRE_RENDER_SCANLINE
            && self.dot == DOTS_PER_SCANLINE - 2
            && self.odd_frame
            && self.mask.rendering_enabled()
        {
            self.dot = 0;
            self.scanline = 0;
            self.end_frame();
            return;
        }

        self.dot += 1;
        if self.dot == DOTS_PER_SCANLINE {
            self.dot = 0;
            self.scanline += 1;
            if self.scanline == SCANLINES_PER_FRAME {
                self.scanline = 0;
                self.end_frame();
            }
        }
    }

    fn end_frame(&mut self) {
        self.frame += 1;
        self.odd_frame = !self.odd_frame;
        log::trace!("frame {} complete", self.frame);
    }

    /// One dot of a visible or pre-render scanline.
    fn render_dot(&mut self, cart: &mut dyn Cartridge, pre_render: bool) {
        if !self.mask.rendering_enabled() {
            // With rendering off, the background color still reaches the
            // screen on visible lines.
            if !pre_render && (1..=256).contains(&self.dot) {
                let index = self.palette_read(0x3F00) & self.greyscale_mask();
                self.set_pixel(usize::from(self.dot - 1), usize::from(self.scanline), index);
            }
            return;
        }

        match self.dot {
            1..=256 => {
                if !pre_render {
                    self.output_pixel();
                }
                self.fetch_background(cart);
                self.shift_background();
                if self.dot % 8 == 0 {
                    self.reload_background_shifters();
                    self.scroll.increment_coarse_x();
                }
                if self.dot == 256 {
                    self.scroll.increment_y();
                }
            }
            257..=320 => {
                if self.dot == 257 {
                    self.scroll.copy_horizontal();
                    self.evaluate_sprites();
                }
                if pre_render && (280..=304).contains(&self.dot) {
                    self.scroll.copy_vertical();
                }
                // Eight dots per sprite; the pattern bytes land on the last.
                if (self.dot - 257) % 8 == 7 {
                    let slot = usize::from((self.dot - 257) / 8);
                    self.fetch_sprite_pattern(cart, slot);
                }
            }
            321..=336 => {
                self.fetch_background(cart);
                self.shift_background();
                if self.dot % 8 == 0 {
                    self.reload_background_shifters();
                    self.scroll.increment_coarse_x();
                }
            }
            337 | 339 => {
                // Unused nametable fetches; some mappers watch the bus.
                let addr = self.scroll.tile_address();
                self.mem_read(cart, addr);
            }
            _ => {}
        }
    }

    fn fetch_background(&mut self, cart: &mut dyn Cartridge) {
        match self.dot % 8 {
            1 => {
                let addr = self.scroll.tile_address();
                self.tile_index = self.mem_read(cart, addr);
            }
            3 => {
                let addr = self.scroll.attribute_address();
                let attribute = self.mem_read(cart, addr);
                // Pick the 2-bit quadrant for the current tile.
                let shift =
                    ((self.scroll.coarse_y() & 0x02) << 1) | (self.scroll.coarse_x() & 0x02);
                self.attribute_bits = (attribute >> shift) & 0x03;
            }
            5 => {
                let addr = self.pattern_address();
                self.pattern_latch_low = self.mem_read(cart, addr);
            }
            7 => {
                let addr = self.pattern_address() + 8;
                self.pattern_latch_high = self.mem_read(cart, addr);
            }
            _ => {}
        }
    }

    fn pattern_address(&self) -> u16 {
        self.ctrl.background_table()
            + (u16::from(self.tile_index) << 4)
            + u16::from(self.scroll.fine_y())
    }

    fn shift_background(&mut self) {
        self.pattern_shift_low <<= 1;
        self.pattern_shift_high <<= 1;
        self.attribute_shift_low <<= 1;
        self.attribute_shift_high <<= 1;
    }

    fn reload_background_shifters(&mut self) {
        self.pattern_shift_low = (self.pattern_shift_low & 0xFF00) | u16::from(self.pattern_latch_low);
        self.pattern_shift_high =
            (self.pattern_shift_high & 0xFF00) | u16::from(self.pattern_latch_high);
        let low = if self.attribute_bits & 0x01 != 0 { 0xFF } else { 0x00 };
        let high = if self.attribute_bits & 0x02 != 0 { 0xFF } else { 0x00 };
        self.attribute_shift_low = (self.attribute_shift_low & 0xFF00) | low;
        self.attribute_shift_high = (self.attribute_shift_high & 0xFF00) | high;
    }

    /// Select the next scanline's sprites into the staging units.
    fn evaluate_sprites(&mut self) {
        let target = if self.scanline == PRE_RENDER_SCANLINE {
            0
        } else {
            self.scanline + 1
        };
        let overflowed =
            self.secondary_oam
                .evaluate(&self.oam, target, self.ctrl.sprite_height());
        if overflowed {
            self.status.insert(PpuStatus::SPRITE_OVERFLOW);
        }
        self.sprite_unit_count = 0;
    }

    fn fetch_sprite_pattern(&mut self, cart: &mut dyn Cartridge, slot: usize) {
        if slot >= self.secondary_oam.len() {
            return;
        }
        let sprite = self.secondary_oam.sprites()[slot];
        let target = if self.scanline == PRE_RENDER_SCANLINE {
            0
        } else {
            self.scanline + 1
        };

        let height = self.ctrl.sprite_height();
        let mut row = target - u16::from(sprite.y);
        if sprite.flip_vertical() {
            row = height - 1 - row;
        }

        let addr = if height == 16 {
            let table = u16::from(sprite.tile_index & 0x01) * 0x1000;
            let mut tile = u16::from(sprite.tile_index & 0xFE);
            if row >= 8 {
                tile += 1;
                row -= 8;
            }
            table + (tile << 4) + row
        } else {
            self.ctrl.sprite_table() + (u16::from(sprite.tile_index) << 4) + row
        };

        let mut pattern_low = self.mem_read(cart, addr);
        let mut pattern_high = self.mem_read(cart, addr + 8);
        if sprite.flip_horizontal() {
            pattern_low = pattern_low.reverse_bits();
            pattern_high = pattern_high.reverse_bits();
        }

        self.sprite_units[usize::from(self.sprite_unit_count)] = SpriteUnit {
            sprite,
            pattern_low,
            pattern_high,
            is_sprite_zero: slot == 0 && self.secondary_oam.sprite_zero_present,
        };
        self.sprite_unit_count += 1;
    }

    /// Background pixel from the shifters: `(pattern, palette)`.
    fn background_pixel(&self, x: u16) -> (u8, u8) {
        if !self.mask.contains(PpuMask::SHOW_BACKGROUND)
            || (x < 8 && !self.mask.contains(PpuMask::BACKGROUND_LEFT))
        {
            return (0, 0);
        }
        let select = 0x8000 >> self.scroll.fine_x;
        let low = u8::from(self.pattern_shift_low & select != 0);
        let high = u8::from(self.pattern_shift_high & select != 0);
        let attr_low = u8::from(self.attribute_shift_low & select != 0);
        let attr_high = u8::from(self.attribute_shift_high & select != 0);
        ((high << 1) | low, (attr_high << 1) | attr_low)
    }

    /// First opaque sprite pixel at `x`: `(pattern, palette, behind, zero)`.
    fn sprite_pixel(&self, x: u16) -> Option<(u8, u8, bool, bool)> {
        if !self.mask.contains(PpuMask::SHOW_SPRITES)
            || (x < 8 && !self.mask.contains(PpuMask::SPRITES_LEFT))
        {
            return None;
        }
        for unit in &self.sprite_units[..usize::from(self.sprite_unit_count)] {
            let offset = x.wrapping_sub(u16::from(unit.sprite.x));
            if offset >= 8 {
                continue;
            }
            let bit = 7 - offset;
            let low = (unit.pattern_low >> bit) & 0x01;
            let high = (unit.pattern_high >> bit) & 0x01;
            let pattern = (high << 1) | low;
            if pattern != 0 {
                return Some((
                    pattern,
                    unit.sprite.palette(),
                    unit.sprite.behind_background(),
                    unit.is_sprite_zero,
                ));
            }
        }
        None
    }

    fn greyscale_mask(&self) -> u8 {
        if self.mask.contains(PpuMask::GREYSCALE) { 0x30 } else { 0x3F }
    }

    fn output_pixel(&mut self) {
        let x = self.dot - 1;
        let y = self.scanline;

        let (bg_pattern, bg_palette) = self.background_pixel(x);
        let sprite = self.sprite_pixel(x);

        let palette_addr = match (bg_pattern, sprite) {
            (0, None) => 0x3F00,
            (0, Some((pattern, palette, ..))) => {
                0x3F10 + (u16::from(palette) << 2) + u16::from(pattern)
            }
            (_, None) => 0x3F00 + (u16::from(bg_palette) << 2) + u16::from(bg_pattern),
            (_, Some((pattern, palette, behind, is_zero))) => {
                if is_zero && x < 255 {
                    self.status.insert(PpuStatus::SPRITE_ZERO_HIT);
                }
                if behind {
                    0x3F00 + (u16::from(bg_palette) << 2) + u16::from(bg_pattern)
                } else {
                    0x3F10 + (u16::from(palette) << 2) + u16::from(pattern)
                }
            }
        };

        let index = self.palette_read(palette_addr) & self.greyscale_mask();
        self.set_pixel(usize::from(x), usize::from(y), index);
    }

    fn set_pixel(&mut self, x: usize, y: usize, index: u8) {
        self.framebuffer[y * WIDTH + x] = index;
    }

    // =========================================================================
    // Observers
    // =========================================================================

    /// The 256x240 framebuffer of palette indices (0-63).
    #[must_use]
    pub fn framebuffer(&self) -> &[u8] {
        &self.framebuffer
    }

    /// The 32 bytes of palette RAM.
    #[must_use]
    pub fn palette_ram(&self) -> &[u8; 32] {
        &self.palette_ram
    }

    /// Raw OAM bytes.
    #[must_use]
    pub fn oam_bytes(&self) -> &[u8; 256] {
        &self.oam
    }

    /// Current scanline (0-261).
    #[must_use]
    pub fn scanline(&self) -> u16 {
        self.scanline
    }

    /// Current dot within the scanline (0-340).
    #[must_use]
    pub fn dot(&self) -> u16 {
        self.dot
    }

    /// Completed frames since power-on.
    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.frame
    }

    /// Register file snapshot for the debugger:
    /// `(ctrl, mask, status, oam_addr)`.
    #[must_use]
    pub fn registers(&self) -> (u8, u8, u8, u8) {
        (
            self.ctrl.bits(),
            self.mask.bits(),
            self.status.bits(),
            self.oam_addr,
        )
    }

    /// Loopy register snapshot.
    #[must_use]
    pub fn scroll_state(&self) -> Scroll {
        self.scroll
    }
}
