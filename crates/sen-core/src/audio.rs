//! Audio sample plumbing.
//!
//! The APU pushes one sample per CPU cycle through the [`AudioSink`] trait;
//! [`SampleBuffer`] is the stock implementation, a locked queue an audio
//! thread can drain at its own pace.

use std::collections::VecDeque;
use std::sync::Mutex;

pub use sen_apu::AudioSink;

/// Thread-safe FIFO of mixed samples.
#[derive(Debug, Default)]
pub struct SampleBuffer {
    samples: Mutex<VecDeque<f32>>,
}

impl SampleBuffer {
    /// An empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of buffered samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.lock().expect("sample buffer poisoned").len()
    }

    /// True when no samples are buffered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Pull up to `max` samples into `out`, returning how many were moved.
    pub fn drain_into(&self, out: &mut Vec<f32>, max: usize) -> usize {
        let mut samples = self.samples.lock().expect("sample buffer poisoned");
        let count = max.min(samples.len());
        out.extend(samples.drain(..count));
        count
    }
}

impl AudioSink for SampleBuffer {
    fn push_sample(&self, sample: f32) {
        self.samples
            .lock()
            .expect("sample buffer poisoned")
            .push_back(sample);
    }

    fn clear(&self) {
        self.samples.lock().expect("sample buffer poisoned").clear();
    }
}
