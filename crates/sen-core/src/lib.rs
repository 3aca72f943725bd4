//! Sen NES emulation core.
//!
//! Assembles the 2A03 CPU, 2C02 PPU, 2A03 APU, controllers, and a cartridge
//! into a console behind three drive calls:
//!
//! - [`Sen::step_opcode`] — one CPU instruction,
//! - [`Sen::run_for_scanline`] — until the PPU changes scanline,
//! - [`Sen::run_for_frame`] — one frame's worth of CPU cycles, with
//!   overshoot carried into the next call.
//!
//! Per emulated frame the engine produces a 256x240 framebuffer of NES
//! palette indices ([`Sen::framebuffer`]) and one audio sample per CPU
//! cycle pushed into the caller's [`AudioSink`]. Everything is
//! deterministic: same ROM plus same cycle-keyed input yields bit-identical
//! output.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use sen_core::{SampleBuffer, Sen};
//!
//! let rom = std::fs::read("game.nes").expect("failed to read ROM");
//! let audio = Arc::new(SampleBuffer::new());
//! let mut sen = Sen::new(&rom, audio.clone()).expect("bad ROM");
//!
//! sen.run_for_frame();
//! let frame = sen.framebuffer(); // 256 * 240 palette indices
//! ```

mod audio;
mod bus;
mod console;
mod controller;
mod debugger;

pub use audio::{AudioSink, SampleBuffer};
pub use bus::Bus;
pub use console::{Sen, CYCLES_PER_FRAME};
pub use controller::{Controller, ControllerKey, ControllerPort};
pub use debugger::{CpuView, Debugger, PpuView, SpriteView};

pub use sen_cpu::{ExecutedOpcode, OpcodeRing, Status};
pub use sen_mappers::{Mirroring, RomError};
