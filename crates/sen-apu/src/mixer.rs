//! Non-linear channel mixer.
//!
//! Linear approximation of the 2A03's resistor network: the two pulses mix
//! through one tap, triangle/noise/DMC through the other.

/// Mix the five channel levels into one sample in roughly `[0, 1)`.
#[must_use]
pub fn mix(pulse1: u8, pulse2: u8, triangle: u8, noise: u8, dmc: u8) -> f32 {
    let pulse_sum = f32::from(pulse1) + f32::from(pulse2);
    let pulse_out = if pulse_sum == 0.0 {
        0.0
    } else {
        95.88 / (8128.0 / pulse_sum + 100.0)
    };

    let tnd_out =
        0.00851 * f32::from(triangle) + 0.00494 * f32::from(noise) + 0.00335 * f32::from(dmc);

    pulse_out + tnd_out
}
