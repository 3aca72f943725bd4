//! CPU status register (P) flags.
//!
//! ```text
//! 7  6  5  4  3  2  1  0
//! N  V  U  B  D  I  Z  C
//! │  │  │  │  │  │  │  └─ Carry
//! │  │  │  │  │  │  └──── Zero
//! │  │  │  │  │  └─────── Interrupt Disable
//! │  │  │  │  └────────── Decimal (no effect on the 2A03, but writable)
//! │  │  │  └───────────── Break (1 when pushed by PHP/BRK, 0 by NMI/IRQ)
//! │  │  └──────────────── Unused (always 1 when pushed)
//! │  └─────────────────── Overflow
//! └────────────────────── Negative
//! ```

use bitflags::bitflags;

bitflags! {
    /// CPU status register flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Status: u8 {
        /// Carry flag.
        const C = 1 << 0;
        /// Zero flag.
        const Z = 1 << 1;
        /// Interrupt disable flag. Masks IRQ; NMI is unaffected.
        const I = 1 << 2;
        /// Decimal flag. The 2A03 has no BCD unit, so this is inert.
        const D = 1 << 3;
        /// Break flag. Only exists on the stack copy of P.
        const B = 1 << 4;
        /// Unused flag. Always 1 on the stack copy of P.
        const U = 1 << 5;
        /// Overflow flag.
        const V = 1 << 6;
        /// Negative flag.
        const N = 1 << 7;
    }
}

impl Status {
    /// Power-up value of P: I set plus both stack-only bits (0x34).
    pub const POWER_ON: Self = Self::I.union(Self::B).union(Self::U);

    /// Set or clear the Zero and Negative flags from a result byte.
    #[inline]
    pub fn set_zn(&mut self, value: u8) {
        self.set(Self::Z, value == 0);
        self.set(Self::N, value & 0x80 != 0);
    }

    /// Byte to push on the stack. U is always set; B per the push source
    /// (true for PHP/BRK, false for NMI/IRQ entry).
    #[inline]
    #[must_use]
    pub const fn to_stack_byte(self, brk: bool) -> u8 {
        let bits = self.bits() | Self::U.bits();
        if brk { bits | Self::B.bits() } else { bits & !Self::B.bits() }
    }

    /// Restore P from a byte pulled off the stack, preserving the current
    /// B and U bits (PLP and RTI ignore them).
    #[inline]
    pub fn pull_stack_byte(&mut self, value: u8) {
        let keep = self.bits() & 0x30;
        *self = Self::from_bits_truncate((value & 0xCF) | keep);
    }
}
