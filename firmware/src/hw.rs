// -*- coding: utf-8 -*-
// Copyright (C) 2025 Michael Büsch <m@bues.ch>
// SPDX-License-Identifier: Apache-2.0 OR MIT

pub use attiny::{self as mcu, Peripherals};
pub use avr_device::attiny85 as attiny;
pub use avr_device::interrupt;

use triacdim::IrqCtx;

macro_rules! define_isr {
    ($name:ident, $handler:path) => {
        #[avr_device::interrupt(attiny85)]
        fn $name() {
            // SAFETY: We are inside of an interrupt handler.
            // Therefore, it is safe to construct an `IrqCtx`.
            let c = unsafe { IrqCtx::new() };
            $handler(&c);
        }
    };
}

define_isr!(PCINT0, crate::exint::irq_handler_pcint);
define_isr!(TIMER0_COMPA, crate::phase::irq_handler_timer0_compa);
define_isr!(TIMER0_COMPB, crate::phase::irq_handler_timer0_compb);
define_isr!(USI_START, crate::usi::irq_handler_usi_start);
define_isr!(USI_OVF, crate::usi::irq_handler_usi_ovf);

/// Do nothing for the duration of 3 CPU cycles.
#[cfg(feature = "debug")]
#[inline(always)]
#[rustfmt::skip]
pub fn nop3() {
    // SAFETY: The asm code only burns cycles.
    unsafe {
        core::arch::asm!(
            "rjmp 1",
            "1: nop",
            options(preserves_flags)
        )
    }
}

// vim: ts=4 sw=4 expandtab
