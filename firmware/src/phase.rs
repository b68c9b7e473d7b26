// -*- coding: utf-8 -*-
// Copyright (C) 2025 Michael Büsch <m@bues.ch>
// SPDX-License-Identifier: Apache-2.0 OR MIT

#![allow(unused_unsafe)]

use crate::{
    hw::mcu,
    mutex::{LazyMainInit, MainInitCtx},
    ports::{BIT_GATE0, BIT_GATE1, PORTB},
};
use triacdim::{Dimmer, DimmerConfig, IrqCtx, MainCtx, PhaseHw, PhaseTiming, Transition};

pub const CLOCK_HZ: u32 = 1_000_000;
pub const MAINS_HZ: u32 = 50;
const TC0_PS: u32 = 64;

/// Timer 0 at 1 MHz / 64 runs 156 ticks per 50 Hz half-wave.
pub const TIMING: PhaseTiming = PhaseTiming::new(CLOCK_HZ, TC0_PS, MAINS_HZ, 0xFF);
const _: () = assert!(TIMING.fits());

/// PB1 is the debug pin with the debug feature.
pub const LIGHTS: usize = if cfg!(feature = "debug") { 1 } else { 2 };
const GATE_BITS: [usize; 2] = [BIT_GATE0, BIT_GATE1];

const CONFIG: DimmerConfig = DimmerConfig {
    transition: if cfg!(feature = "fade") {
        Transition::Step
    } else {
        Transition::Jump
    },
    // About 80 ms without compare match.
    overrun_limit: 8,
    ..DimmerConfig::DEFAULT
};

pub static DIMMER: Dimmer<LIGHTS> = Dimmer::new(TIMING, CONFIG);

const TIMSK_OCIE0A: u8 = 1 << 4;
const TIMSK_OCIE0B: u8 = 1 << 3;
const TIFR_OCF0A: u8 = 1 << 4;
const TIFR_OCF0B: u8 = 1 << 3;
const TCCR0B_CS_64: u8 = 0x03;

#[allow(non_snake_case)]
pub struct Tc0 {
    pub TC0: mcu::TC0,
}

// SAFETY: Is initialized when constructing the MainCtx.
pub static TC0: LazyMainInit<Tc0> = unsafe { LazyMainInit::uninit() };

impl Tc0 {
    #[rustfmt::skip]
    pub fn setup(&self, _: &MainInitCtx) {
        let timsk = if LIGHTS > 1 {
            TIMSK_OCIE0A | TIMSK_OCIE0B
        } else {
            TIMSK_OCIE0A
        };

        // SAFETY: Called with interrupts disabled. Ensured by &MainInitCtx.
        //         The values are valid timer configurations.
        unsafe {
            // Normal mode. Compare outputs disconnected.
            self.TC0.tccr0a().write(|w| w.bits(0));
            self.TC0.tcnt0().write(|w| w.bits(0));
            self.TC0.ocr0a().write(|w| w.bits(0xFF));
            self.TC0.ocr0b().write(|w| w.bits(0xFF));
            self.TC0.tifr().write(|w| w.bits(TIFR_OCF0A | TIFR_OCF0B));
            self.TC0.timsk().write(|w| w.bits(timsk));
            self.TC0.tccr0b().write(|w| w.bits(TCCR0B_CS_64));
        }
    }
}

/// Triac gates on PORTB and the timer 0 compare units.
struct PhaseOut;

impl PhaseHw for PhaseOut {
    #[inline(always)]
    fn set_gate(&mut self, channel: usize, on: bool) {
        if let Some(&bit) = GATE_BITS[..LIGHTS].get(channel) {
            PORTB.set(bit, on);
        }
    }

    #[inline(always)]
    fn set_compare(&mut self, channel: usize, value: u16) {
        let value = value.min(0xFF) as u8;
        // SAFETY: All values are valid compare values.
        unsafe {
            match channel {
                0 => {
                    TC0.TC0.ocr0a().write(|w| w.bits(value));
                }
                1 => {
                    TC0.TC0.ocr0b().write(|w| w.bits(value));
                }
                _ => (),
            }
        }
    }

    #[inline(always)]
    fn reset_counters(&mut self) {
        // SAFETY: All values are valid counter values.
        unsafe { TC0.TC0.tcnt0().write(|w| w.bits(0)) };
    }
}

pub fn phase_init(m: &MainCtx) {
    DIMMER.init(m, &mut PhaseOut);
}

pub fn zero_cross(c: &IrqCtx<'_>) {
    DIMMER.zero_cross(c, &mut PhaseOut);
}

pub fn irq_handler_timer0_compa(c: &IrqCtx<'_>) {
    DIMMER.compare_match(c, 0, &mut PhaseOut);
}

pub fn irq_handler_timer0_compb(c: &IrqCtx<'_>) {
    DIMMER.compare_match(c, 1, &mut PhaseOut);
}

// vim: ts=4 sw=4 expandtab
