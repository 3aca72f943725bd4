//! Ricoh 2A03 APU core for the Sen NES emulator.
//!
//! Five channels (two pulses, triangle, noise, DMC), a frame counter, and a
//! non-linear mixer. [`Apu::tick`] runs once per CPU cycle and pushes one
//! mixed sample to the [`AudioSink`]; the host resamples to its device rate.
//!
//! The frame counter raises the shared IRQ line; the DMC requests sample
//! bytes from PRG space through [`Apu::dmc_fetch_request`], answered by the
//! bus between cycles.

mod dmc;
mod envelope;
mod frame_counter;
mod length_counter;
mod mixer;
mod noise;
mod pulse;
mod sweep;
mod triangle;

pub use dmc::Dmc;
pub use envelope::Envelope;
pub use frame_counter::{FrameClock, FrameCounter, StepMode};
pub use length_counter::LengthCounter;
pub use mixer::mix;
pub use noise::Noise;
pub use pulse::Pulse;
pub use sweep::{PulseLane, Sweep};
pub use triangle::Triangle;

use std::sync::Arc;

use sen_cpu::InterruptLine;

/// Destination for mixed samples, one per CPU cycle.
///
/// Implementations must tolerate a consumer pulling from another thread;
/// the engine only ever pushes.
pub trait AudioSink: Send + Sync {
    /// Append one sample.
    fn push_sample(&self, sample: f32);

    /// Drop all buffered samples.
    fn clear(&self);
}

/// Ricoh 2A03 APU.
pub struct Apu {
    pulse1: Pulse,
    pulse2: Pulse,
    triangle: Triangle,
    noise: Noise,
    dmc: Dmc,

    frame_counter: FrameCounter,
    frame_irq: bool,
    irq_line: InterruptLine,

    sink: Arc<dyn AudioSink>,
    odd_cycle: bool,
}

impl Apu {
    /// An APU wired to the shared IRQ line, pushing into `sink`.
    #[must_use]
    pub fn new(irq_line: InterruptLine, sink: Arc<dyn AudioSink>) -> Self {
        Self {
            pulse1: Pulse::new(PulseLane::One),
            pulse2: Pulse::new(PulseLane::Two),
            triangle: Triangle::default(),
            noise: Noise::default(),
            dmc: Dmc::default(),
            frame_counter: FrameCounter::new(0),
            frame_irq: false,
            irq_line,
            sink,
            odd_cycle: false,
        }
    }

    /// Advance one CPU cycle and emit a sample.
    pub fn tick(&mut self, cycle: u64) {
        let clock = self.frame_counter.tick(cycle);
        self.apply_frame_clock(clock);

        // The triangle, noise, and DMC timers run at CPU rate (the noise
        // and DMC period tables are given in CPU cycles); the pulse timers
        // at half of it.
        self.triangle.clock_timer();
        self.noise.clock_timer();
        self.dmc.clock_timer();
        self.odd_cycle = !self.odd_cycle;
        if self.odd_cycle {
            self.pulse1.clock_timer();
            self.pulse2.clock_timer();
        }

        self.update_irq_line();

        self.sink.push_sample(mixer::mix(
            self.pulse1.output(),
            self.pulse2.output(),
            self.triangle.output(),
            self.noise.output(),
            self.dmc.output(),
        ));
    }

    fn apply_frame_clock(&mut self, clock: FrameClock) {
        if clock.quarter {
            self.pulse1.clock_envelope();
            self.pulse2.clock_envelope();
            self.noise.clock_envelope();
            self.triangle.clock_linear_counter();
        }
        if clock.half {
            self.pulse1.clock_length_and_sweep();
            self.pulse2.clock_length_and_sweep();
            self.triangle.clock_length();
            self.noise.clock_length();
        }
        if clock.irq {
            self.frame_irq = true;
        }
    }

    /// The APU is the only IRQ source in the core, so it owns the line.
    fn update_irq_line(&self) {
        if self.frame_irq || self.dmc.irq_flag {
            self.irq_line.raise();
        } else {
            self.irq_line.clear();
        }
    }

    /// Register write (`$4000-$4013`, `$4015`, `$4017`).
    pub fn write_register(&mut self, cycle: u64, addr: u16, data: u8) {
        match addr {
            0x4000..=0x4003 => self.pulse1.write_register(addr & 0x03, data),
            0x4004..=0x4007 => self.pulse2.write_register(addr & 0x03, data),
            0x4008..=0x400B => self.triangle.write_register(addr & 0x03, data),
            0x400C..=0x400F => self.noise.write_register(addr & 0x03, data),
            0x4010..=0x4013 => self.dmc.write_register(addr & 0x03, data),
            0x4015 => self.write_enable(data),
            0x4017 => {
                let clock = self.frame_counter.write_control(cycle, data);
                self.apply_frame_clock(clock);
                if self.frame_counter.irq_inhibited() {
                    self.frame_irq = false;
                    self.update_irq_line();
                }
            }
            _ => log::debug!("APU write to unhandled {addr:#06X} = {data:#04X}"),
        }
    }

    fn write_enable(&mut self, data: u8) {
        self.pulse1.set_enabled(data & 0x01 != 0);
        self.pulse2.set_enabled(data & 0x02 != 0);
        self.triangle.set_enabled(data & 0x04 != 0);
        self.noise.set_enabled(data & 0x08 != 0);
        self.dmc.set_enabled(data & 0x10 != 0);
        self.dmc.irq_flag = false;
        self.update_irq_line();
    }

    /// `$4015` read: channel length status plus the two IRQ flags. Reading
    /// acknowledges the frame IRQ.
    pub fn read_status(&mut self) -> u8 {
        let mut value = 0;
        if self.pulse1.active() {
            value |= 0x01;
        }
        if self.pulse2.active() {
            value |= 0x02;
        }
        if self.triangle.active() {
            value |= 0x04;
        }
        if self.noise.active() {
            value |= 0x08;
        }
        if self.dmc.active() {
            value |= 0x10;
        }
        if self.frame_irq {
            value |= 0x40;
        }
        if self.dmc.irq_flag {
            value |= 0x80;
        }

        self.frame_irq = false;
        self.update_irq_line();
        value
    }

    /// `$4015` without the read side effect, for the debugger.
    #[must_use]
    pub fn peek_status(&self) -> u8 {
        let mut value = 0;
        for (bit, active) in [
            (0x01, self.pulse1.active()),
            (0x02, self.pulse2.active()),
            (0x04, self.triangle.active()),
            (0x08, self.noise.active()),
            (0x10, self.dmc.active()),
            (0x40, self.frame_irq),
            (0x80, self.dmc.irq_flag),
        ] {
            if active {
                value |= bit;
            }
        }
        value
    }

    /// PRG address the DMC wants read, if its buffer is empty.
    #[must_use]
    pub fn dmc_fetch_request(&self) -> Option<u16> {
        self.dmc.fetch_request()
    }

    /// Answer a [`Apu::dmc_fetch_request`] with the fetched byte.
    pub fn dmc_provide_sample(&mut self, data: u8) {
        self.dmc.provide_sample(data);
        self.update_irq_line();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct CountingSink {
        samples: Mutex<Vec<f32>>,
    }

    impl AudioSink for CountingSink {
        fn push_sample(&self, sample: f32) {
            self.samples.lock().unwrap().push(sample);
        }

        fn clear(&self) {
            self.samples.lock().unwrap().clear();
        }
    }

    fn apu_with_sink() -> (Apu, Arc<CountingSink>, InterruptLine) {
        let sink = Arc::new(CountingSink::default());
        let irq = InterruptLine::new();
        (Apu::new(irq.clone(), sink.clone()), sink, irq)
    }

    fn run(apu: &mut Apu, from: u64, count: u64) {
        for cycle in from..from + count {
            apu.tick(cycle);
        }
    }

    #[test]
    fn one_sample_per_cycle() {
        let (mut apu, sink, _) = apu_with_sink();
        run(&mut apu, 1, 1000);
        assert_eq!(sink.samples.lock().unwrap().len(), 1000);
    }

    #[test]
    fn frame_irq_fires_in_four_step_mode() {
        let (mut apu, _, irq) = apu_with_sink();
        run(&mut apu, 1, 29827);
        assert!(!irq.pending());
        run(&mut apu, 29828, 1);
        assert!(irq.pending());
    }

    #[test]
    fn status_read_acknowledges_frame_irq() {
        let (mut apu, _, irq) = apu_with_sink();
        run(&mut apu, 1, 29830);
        assert!(irq.pending());

        let status = apu.read_status();
        assert_eq!(status & 0x40, 0x40);
        assert!(!irq.pending());
        assert_eq!(apu.read_status() & 0x40, 0);
    }

    #[test]
    fn five_step_mode_never_raises_irq() {
        let (mut apu, _, irq) = apu_with_sink();
        apu.write_register(0, 0x4017, 0x80);
        run(&mut apu, 1, 40_000);
        assert!(!irq.pending());
    }

    #[test]
    fn irq_inhibit_acknowledges_pending_irq() {
        let (mut apu, _, irq) = apu_with_sink();
        run(&mut apu, 1, 29830);
        assert!(irq.pending());
        apu.write_register(29831, 0x4017, 0x40);
        assert!(!irq.pending());
    }

    #[test]
    fn disabling_a_channel_zeroes_its_length() {
        let (mut apu, _, _) = apu_with_sink();
        apu.write_register(0, 0x4015, 0x01); // Enable pulse 1
        apu.write_register(0, 0x4000, 0x30);
        apu.write_register(0, 0x4003, 0x08); // Length index 1 = 254
        assert_eq!(apu.read_status() & 0x01, 0x01);

        apu.write_register(0, 0x4015, 0x00);
        assert_eq!(apu.read_status() & 0x01, 0x00);
    }

    #[test]
    fn length_counters_expire_over_frames() {
        let (mut apu, _, _) = apu_with_sink();
        apu.write_register(0, 0x4015, 0x01);
        apu.write_register(0, 0x4000, 0x10); // Constant volume, no halt
        apu.write_register(0, 0x4003, 0x18); // Length index 3 = 2
        assert_eq!(apu.read_status() & 0x01, 0x01);

        // Two half-frame clocks (14913 and 29829) drain a length of 2.
        run(&mut apu, 1, 29829);
        assert_eq!(apu.read_status() & 0x01, 0x00);
    }

    #[test]
    fn dmc_fetch_cycle() {
        let (mut apu, _, _) = apu_with_sink();
        apu.write_register(0, 0x4012, 0x00);
        apu.write_register(0, 0x4013, 0x00); // 1 byte at $C000
        apu.write_register(0, 0x4015, 0x10);

        let addr = apu.dmc_fetch_request().expect("reader wants a byte");
        assert_eq!(addr, 0xC000);
        apu.dmc_provide_sample(0x55);
        assert!(apu.dmc_fetch_request().is_none());
    }

    #[test]
    fn mixed_output_reflects_dmc_level() {
        let (mut apu, sink, _) = apu_with_sink();
        apu.write_register(0, 0x4011, 64);
        run(&mut apu, 1, 1);
        let sample = *sink.samples.lock().unwrap().last().unwrap();
        assert!((sample - 0.00335 * 64.0).abs() < 1e-4);
    }
}
