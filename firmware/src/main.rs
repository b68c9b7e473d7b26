// -*- coding: utf-8 -*-
// Copyright (C) 2025 Michael Büsch <m@bues.ch>
// SPDX-License-Identifier: Apache-2.0 OR MIT

#![no_std]
#![no_main]
#![feature(abi_avr_interrupt)]
#![feature(asm_experimental_arch)]

#[cfg(feature = "debug")]
mod debug;
mod exint;
mod hw;
mod mutex;
mod phase;
mod ports;
mod usi;

use crate::{
    exint::{EXINT, ExInt},
    hw::{Peripherals, interrupt, mcu},
    mutex::{MainInitCtx, main_ctx_with_init, unwrap_option},
    phase::{DIMMER, TC0, Tc0, phase_init},
    ports::{PORTB, PortB},
    usi::{SLAVE, USI, Usi, UsiHw, usi_init},
};
use triacdim::{I2cPacketSource, PacketSource, PollLimit};

/// Empty receive polls per main loop iteration.
/// Must stay well below the watchdog timeout.
const POLL_LIMIT: u32 = 200;

fn wdt_init() {
    // SAFETY: The asm code only accesses the WDT registers
    //         which are not accessed from anywhere else in the program.
    unsafe {
        // Enable WDT with timeout 32 ms
        core::arch::asm!(
            "ldi {tmp}, 0x18", // WDCE=1, WDE=1
            "out {WDTCR}, {tmp}",
            "ldi {tmp}, 0x09", // WDCE=0, WDE=1, WDP2=0, WDP1=0, WDP0=1
            "out {WDTCR}, {tmp}",
            tmp = out(reg_upper) _,
            WDTCR = const 0x21,
            options(nostack, preserves_flags)
        );
    }
}

fn wdt_poke(_wp: &mcu::WDT) {
    avr_device::asm::wdr();
}

#[avr_device::entry]
fn main() -> ! {
    wdt_init();

    let dp = unwrap_option(Peripherals::take());

    let init_static_vars = |c: &MainInitCtx| {
        PORTB.init(c, PortB { PORTB: dp.PORTB });
        PORTB.setup(c);
        TC0.init(c, Tc0 { TC0: dp.TC0 });
        TC0.setup(c);
        USI.init(c, Usi { USI: dp.USI });
        USI.setup(c);
        EXINT.init(c, ExInt { EXINT: dp.EXINT });
        EXINT.setup(c);
    };

    // SAFETY:
    // This is the context handle for the main() function.
    // Holding a reference to this object proves that the holder
    // is running in main() context.
    let m = unsafe { main_ctx_with_init(init_static_vars) };

    phase_init(&m);
    usi_init(&m);

    // SAFETY: This must be after construction of MainCtx
    //         and after initialization of static MainInit variables.
    unsafe { interrupt::enable() };

    let mut source = I2cPacketSource::new(&SLAVE, UsiHw);
    #[cfg(feature = "debug")]
    let mut plot = debug::DebugPlot::new();

    loop {
        // A transaction that is still running when the limit runs out
        // is resumed in the next iteration.
        if let Some(packet) = source.next_packet(&m, &mut PollLimit(POLL_LIMIT)) {
            // Packets for lights we don't have are dropped.
            DIMMER.apply(&m, packet);
        }

        #[cfg(feature = "debug")]
        plot.run(&m);

        wdt_poke(&dp.WDT);
    }
}

// vim: ts=4 sw=4 expandtab
