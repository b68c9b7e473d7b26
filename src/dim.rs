// -*- coding: utf-8 -*-
// Copyright (C) 2025 Michael Büsch <m@bues.ch>
// SPDX-License-Identifier: Apache-2.0 OR MIT

/// Dim values at or below this never fire the triac.
pub const AC_DIM_MIN_PERCENT: u8 = 20;
/// Dim values at or above this never switch the triac off.
pub const AC_DIM_MAX_PERCENT: u8 = 95;

/// Number of discrete brightness steps per mains half-wave.
const STEPS: u32 = 100;

/// How the applied dim value follows the requested one.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Transition {
    /// Apply the requested value at the next compare match.
    Jump,
    /// Move one percent towards the requested value per compare match.
    Step,
}

/// Timer clock and mains configuration of the phase delay timers.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct PhaseTiming {
    /// CPU clock frequency, in Hz.
    pub clock_hz: u32,
    /// Timer clock prescaler.
    pub prescaler: u32,
    /// Mains frequency, in Hz.
    pub mains_hz: u32,
    /// Largest value the compare register can hold.
    pub max_compare: u16,
}

impl PhaseTiming {
    pub const fn new(clock_hz: u32, prescaler: u32, mains_hz: u32, max_compare: u16) -> Self {
        Self {
            clock_hz,
            prescaler,
            mains_hz,
            max_compare,
        }
    }

    /// Converts `off_steps * clock_hz` into timer ticks.
    const fn divisor(&self) -> u32 {
        // 100 steps per half-wave. Two half-waves per mains period.
        self.prescaler * STEPS * 2 * self.mains_hz
    }

    /// Convert a 0..=100 dim percentage into the phase delay
    /// compare value, counted in timer ticks from the zero crossing.
    ///
    /// Results above `max_compare` saturate.
    pub const fn compare_value(&self, dim: u8) -> u16 {
        let dim = if dim < 100 { dim } else { 100 };
        let off_steps = (100 - dim) as u32;
        let value = match off_steps.checked_mul(self.clock_hz) {
            Some(num) => num / self.divisor(),
            None => u32::MAX,
        };
        if value > self.max_compare as u32 {
            self.max_compare
        } else {
            value as u16
        }
    }

    /// Half-wave duration in timer ticks.
    pub const fn halfwave_ticks(&self) -> u32 {
        self.clock_hz / (self.prescaler * 2 * self.mains_hz)
    }

    /// Check that a full half-wave fits into the compare register
    /// and that no intermediate value overflows.
    pub const fn fits(&self) -> bool {
        STEPS.checked_mul(self.clock_hz).is_some()
            && self.halfwave_ticks() <= self.max_compare as u32
            && self.halfwave_ticks() >= STEPS
    }
}

/// Dimmer behavior configuration.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct DimmerConfig {
    /// Dim values at or below this never fire the triac.
    pub min_percent: u8,
    /// Dim values at or above this keep the triac on for the whole half-wave.
    pub max_percent: u8,
    pub transition: Transition,
    /// Number of consecutive dropped zero crossings before the
    /// zero crossing handler forces a resync. 0 disables the resync.
    pub overrun_limit: u8,
}

impl DimmerConfig {
    pub const DEFAULT: DimmerConfig = DimmerConfig {
        min_percent: AC_DIM_MIN_PERCENT,
        max_percent: AC_DIM_MAX_PERCENT,
        transition: Transition::Jump,
        overrun_limit: 0,
    };

    /// The off rail. The triac never fires.
    pub const fn off(&self) -> u8 {
        self.min_percent.saturating_sub(1)
    }

    /// The full-on rail. The triac never switches off.
    pub const fn full(&self) -> u8 {
        if self.max_percent < 100 {
            self.max_percent + 1
        } else {
            100
        }
    }

    /// Clamp a requested percentage onto 0..=100 and collapse
    /// everything beyond the rails onto the rail values.
    pub const fn clamp_request(&self, percent: u8) -> u8 {
        if percent <= self.min_percent {
            self.off()
        } else if percent >= self.max_percent {
            self.full()
        } else {
            percent
        }
    }

    /// Whether the triac is fired at the compare match.
    pub const fn fires(&self, dim: u8) -> bool {
        dim > self.min_percent
    }

    /// Whether the triac is switched off at the zero crossing.
    pub const fn switches_off(&self, dim: u8) -> bool {
        dim < self.max_percent
    }
}

impl Default for DimmerConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[cfg(test)]
mod test {
    use super::*;

    // 1 MHz, prescaler 64, 50 Hz: 156.25 ticks per half-wave.
    const TIMING: PhaseTiming = PhaseTiming::new(1_000_000, 64, 50, 0xFF);

    #[test]
    fn test_compare_value() {
        assert_eq!(TIMING.compare_value(0), 156);
        assert_eq!(TIMING.compare_value(100), 0);
        assert_eq!(TIMING.compare_value(80), 31);
        assert_eq!(TIMING.compare_value(50), 78);
        assert_eq!(TIMING.compare_value(19), 126);
        assert_eq!(TIMING.compare_value(96), 6);
        // Clamped to 100 %.
        assert_eq!(TIMING.compare_value(101), 0);
        assert_eq!(TIMING.compare_value(255), 0);
    }

    #[test]
    fn test_compare_value_monotonic() {
        let mut prev = TIMING.compare_value(0);
        for dim in 1..=100 {
            let value = TIMING.compare_value(dim);
            assert!(value <= prev, "dim {dim}: {value} > {prev}");
            prev = value;
        }
    }

    #[test]
    fn test_compare_value_formula() {
        // 50 Hz reduces to prescaler * 10000 as divisor.
        for (clock_hz, prescaler) in [(1_000_000, 64), (8_000_000, 1024), (16_000_000, 1024)] {
            let timing = PhaseTiming::new(clock_hz, prescaler, 50, 0xFFFF);
            for dim in 0..=100_u8 {
                let expected = ((100 - dim as u32) * clock_hz) / (prescaler * 10000);
                assert_eq!(timing.compare_value(dim) as u32, expected);
            }
        }
    }

    #[test]
    fn test_compare_value_60hz() {
        let timing = PhaseTiming::new(1_000_000, 64, 60, 0xFF);
        assert_eq!(timing.halfwave_ticks(), 130);
        assert_eq!(timing.compare_value(0), 130);
        assert_eq!(timing.compare_value(100), 0);
    }

    #[test]
    fn test_saturation() {
        // 8 MHz with prescaler 64 needs 1250 ticks per half-wave.
        let timing = PhaseTiming::new(8_000_000, 64, 50, 0xFF);
        assert!(!timing.fits());
        assert_eq!(timing.compare_value(0), 0xFF);
        assert_eq!(timing.compare_value(100), 0);

        let timing = PhaseTiming::new(8_000_000, 64, 50, 0xFFFF);
        assert!(timing.fits());
        assert_eq!(timing.compare_value(0), 1250);

        // Multiplication overflow saturates, too.
        let timing = PhaseTiming::new(u32::MAX, 1, 50, 0xFFFF);
        assert!(!timing.fits());
        assert_eq!(timing.compare_value(0), 0xFFFF);

        assert!(TIMING.fits());
    }

    #[test]
    fn test_rails() {
        let conf = DimmerConfig::DEFAULT;
        assert_eq!(conf.off(), 19);
        assert_eq!(conf.full(), 96);

        assert_eq!(conf.clamp_request(0), 19);
        assert_eq!(conf.clamp_request(20), 19);
        assert_eq!(conf.clamp_request(21), 21);
        assert_eq!(conf.clamp_request(94), 94);
        assert_eq!(conf.clamp_request(95), 96);
        assert_eq!(conf.clamp_request(100), 96);
        assert_eq!(conf.clamp_request(200), 96);

        assert!(!conf.fires(20));
        assert!(!conf.fires(conf.off()));
        assert!(conf.fires(21));
        assert!(conf.switches_off(94));
        assert!(!conf.switches_off(95));
        assert!(!conf.switches_off(conf.full()));
    }
}

// vim: ts=4 sw=4 expandtab
