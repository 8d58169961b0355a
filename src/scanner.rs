//! Printable-byte classification and the frequency histogram.
//!
//! A byte is printable when its value lies in the inclusive range [32,126].
//! The server keeps two histograms over that range: a session histogram
//! owned by one transaction, and the global histogram that only successful
//! transactions merge into. Scanning is pure byte arithmetic with no I/O.

use std::fmt;

/// Lowest printable byte value (space).
pub const PRINTABLE_MIN: u8 = 32;
/// Highest printable byte value (tilde).
pub const PRINTABLE_MAX: u8 = 126;
/// Number of distinct printable byte values.
pub const PRINTABLE_SPAN: usize = (PRINTABLE_MAX - PRINTABLE_MIN) as usize + 1;

/// Returns true for bytes in the printable range.
#[inline]
pub fn is_printable(byte: u8) -> bool {
    (PRINTABLE_MIN..=PRINTABLE_MAX).contains(&byte)
}

/// Per-character occurrence counts over the printable range.
///
/// Slot `i` counts byte value `i + 32`. Counts saturate rather than wrap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Histogram {
    counts: [u32; PRINTABLE_SPAN],
}

// Derived Default is unavailable for arrays longer than 32 elements.
impl Default for Histogram {
    fn default() -> Self {
        Self {
            counts: [0; PRINTABLE_SPAN],
        }
    }
}

impl Histogram {
    /// Create an empty histogram.
    pub fn new() -> Self {
        Self::default()
    }

    /// Occurrence count for a byte value; zero for unprintable bytes.
    pub fn count_for(&self, byte: u8) -> u32 {
        if is_printable(byte) {
            self.counts[(byte - PRINTABLE_MIN) as usize]
        } else {
            0
        }
    }

    /// Scan a buffer, tallying every printable byte into this histogram.
    ///
    /// Returns the number of printable bytes seen in `buf`.
    pub fn scan(&mut self, buf: &[u8]) -> u32 {
        let mut printable = 0u32;
        for &byte in buf {
            if is_printable(byte) {
                printable += 1;
                let slot = (byte - PRINTABLE_MIN) as usize;
                self.counts[slot] = self.counts[slot].saturating_add(1);
            }
        }
        printable
    }

    /// Add another histogram's counts into this one, element-wise.
    pub fn merge(&mut self, other: &Histogram) {
        for (total, session) in self.counts.iter_mut().zip(other.counts.iter()) {
            *total = total.saturating_add(*session);
        }
    }

    /// Sum of all counts.
    pub fn total(&self) -> u64 {
        self.counts.iter().map(|&c| u64::from(c)).sum()
    }
}

/// The shutdown report: one line per printable byte value, ascending.
impl fmt::Display for Histogram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (slot, count) in self.counts.iter().enumerate() {
            let ch = (slot as u8 + PRINTABLE_MIN) as char;
            writeln!(f, "char '{ch}' : {count} times")?;
        }
        Ok(())
    }
}

/// Count printable bytes in a buffer without touching any histogram.
///
/// Client-side variant of [`Histogram::scan`]; used as the reference oracle
/// in tests as well.
pub fn count_printable(buf: &[u8]) -> u32 {
    buf.iter().filter(|&&b| is_printable(b)).count() as u32
}
