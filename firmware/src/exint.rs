// -*- coding: utf-8 -*-
// Copyright (C) 2025 Michael Büsch <m@bues.ch>
// SPDX-License-Identifier: Apache-2.0 OR MIT

#![allow(unused_unsafe)]

use crate::{
    hw::mcu,
    mutex::{LazyMainInit, MainInitCtx},
    phase,
    ports::{BIT_ZERO_CROSS, PORTB},
};
use triacdim::IrqCtx;

#[allow(non_snake_case)]
pub struct ExInt {
    pub EXINT: mcu::EXINT,
}

// SAFETY: Is initialized when constructing the MainCtx.
pub static EXINT: LazyMainInit<ExInt> = unsafe { LazyMainInit::uninit() };

const PCINT_ENA_0: bool = false;
const PCINT_ENA_1: bool = false;
const PCINT_ENA_2: bool = false;
const PCINT_ENA_3: bool = true; // PB3: Zero crossing detector.
const PCINT_ENA_4: bool = false;
const PCINT_ENA_5: bool = false;

const GIMSK_PCIE: u8 = 1 << 5;
const GIFR_PCIF: u8 = 1 << 5;

impl ExInt {
    #[allow(clippy::identity_op)]
    pub fn setup(&self, _: &MainInitCtx) {
        // SAFETY: Called with interrupts disabled. Ensured by &MainInitCtx.
        //         All bit patterns are valid mask values.
        unsafe {
            self.EXINT.pcmsk().write(|w| {
                w.bits(
                    ((PCINT_ENA_0 as u8) << 0)
                        | ((PCINT_ENA_1 as u8) << 1)
                        | ((PCINT_ENA_2 as u8) << 2)
                        | ((PCINT_ENA_3 as u8) << 3)
                        | ((PCINT_ENA_4 as u8) << 4)
                        | ((PCINT_ENA_5 as u8) << 5),
                )
            });
            self.EXINT.gifr().write(|w| w.bits(GIFR_PCIF));
            self.EXINT.gimsk().write(|w| w.bits(GIMSK_PCIE));
        }
    }
}

pub fn irq_handler_pcint(c: &IrqCtx<'_>) {
    // The pin change interrupt fires on both edges.
    // The detector pulse starts at the zero crossing.
    if PORTB.get(BIT_ZERO_CROSS) {
        phase::zero_cross(c);
    }
}

// vim: ts=4 sw=4 expandtab
