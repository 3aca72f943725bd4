//! Frame counter: the low-frequency sequencer driving envelopes, length
//! counters, and sweeps.
//!
//! The counter is anchored to an absolute CPU cycle rather than run off an
//! accumulating divider, because the IRQ must appear on three exact cycles
//! (29828-29830 into the frame) and the frame period restarts at the last
//! of them.

/// Sequencer mode, selected by bit 7 of `$4017`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StepMode {
    /// Four steps per frame, with an IRQ at the end.
    #[default]
    FourStep,
    /// Five steps per frame, no IRQ.
    FiveStep,
}

/// What a frame-counter tick asks the channels to do.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameClock {
    /// Clock envelopes and the triangle's linear counter.
    pub quarter: bool,
    /// Clock length counters and sweeps.
    pub half: bool,
    /// Assert the frame IRQ.
    pub irq: bool,
}

/// Frame counter state.
#[derive(Debug, Clone, Copy)]
pub struct FrameCounter {
    mode: StepMode,
    irq_inhibit: bool,
    /// CPU cycle at which the current frame period began.
    anchor: u64,
}

impl FrameCounter {
    /// A four-step counter anchored at `cycle`.
    #[must_use]
    pub const fn new(cycle: u64) -> Self {
        Self {
            mode: StepMode::FourStep,
            irq_inhibit: false,
            anchor: cycle,
        }
    }

    /// Current mode.
    #[must_use]
    pub const fn mode(&self) -> StepMode {
        self.mode
    }

    /// `$4017` write: pick the mode, set IRQ inhibit, and restart the
    /// frame. Five-step mode clocks everything immediately.
    pub fn write_control(&mut self, cycle: u64, data: u8) -> FrameClock {
        self.mode = if data & 0x80 != 0 {
            StepMode::FiveStep
        } else {
            StepMode::FourStep
        };
        self.irq_inhibit = data & 0x40 != 0;
        self.anchor = cycle;

        if self.mode == StepMode::FiveStep {
            FrameClock { quarter: true, half: true, irq: false }
        } else {
            FrameClock::default()
        }
    }

    /// True when IRQ generation is inhibited.
    #[must_use]
    pub const fn irq_inhibited(&self) -> bool {
        self.irq_inhibit
    }

    /// Advance to `cycle` (called once per CPU cycle).
    pub fn tick(&mut self, cycle: u64) -> FrameClock {
        let offset = cycle - self.anchor;
        let irq = !self.irq_inhibit;

        match self.mode {
            StepMode::FourStep => match offset {
                7457 | 22371 => FrameClock { quarter: true, ..FrameClock::default() },
                14913 => FrameClock { quarter: true, half: true, irq: false },
                29828 => FrameClock { irq, ..FrameClock::default() },
                29829 => FrameClock { quarter: true, half: true, irq },
                29830 => {
                    self.anchor = cycle;
                    FrameClock { irq, ..FrameClock::default() }
                }
                _ => FrameClock::default(),
            },
            StepMode::FiveStep => match offset {
                7457 | 22371 | 37281 => {
                    FrameClock { quarter: true, half: true, irq: false }
                }
                14913 | 29829 => FrameClock { quarter: true, ..FrameClock::default() },
                37282 => {
                    self.anchor = cycle;
                    FrameClock::default()
                }
                _ => FrameClock::default(),
            },
        }
    }
}
