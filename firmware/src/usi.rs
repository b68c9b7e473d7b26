// -*- coding: utf-8 -*-
// Copyright (C) 2025 Michael Büsch <m@bues.ch>
// SPDX-License-Identifier: Apache-2.0 OR MIT

#![allow(unused_unsafe)]

use crate::{
    hw::mcu,
    mutex::{LazyMainInit, MainInitCtx},
    ports::{BIT_SCL, BIT_SDA, PORTB},
};
use triacdim::{IrqCtx, MainCtx, UsiI2cSlave, UsiPort};

pub const I2C_ADDRESS: u8 = 0x6A;

pub static SLAVE: UsiI2cSlave = UsiI2cSlave::new(I2C_ADDRESS);

// USICR
const USISIE: u8 = 1 << 7;
const USIOIE: u8 = 1 << 6;
const USIWM1: u8 = 1 << 5;
const USIWM0: u8 = 1 << 4;
const USICS1: u8 = 1 << 3;

// USISR
const USISIF: u8 = 1 << 7;
const USIOIF: u8 = 1 << 6;
const USIPF: u8 = 1 << 5;
const USIDC: u8 = 1 << 4;
const USICNT_MASK: u8 = 0x0F;

/// Clear all flags. Count 8 bits (16 edges).
const USISR_BYTE: u8 = USISIF | USIOIF | USIPF | USIDC;
/// Keep the start flag. Count 1 bit (2 edges).
const USISR_ACK: u8 = USIOIF | USIPF | USIDC | 0x0E;
/// Keep the start flag. Count 8 bits.
const USISR_DATA: u8 = USIOIF | USIPF | USIDC;

/// Two-wire mode, start interrupt, shift on positive SCL edge.
const USICR_START: u8 = USISIE | USIWM1 | USICS1;
/// Like [USICR_START], plus overflow interrupt and SCL hold on overflow.
const USICR_OVF: u8 = USISIE | USIOIE | USIWM1 | USIWM0 | USICS1;

#[allow(non_snake_case)]
pub struct Usi {
    pub USI: mcu::USI,
}

// SAFETY: Is initialized when constructing the MainCtx.
pub static USI: LazyMainInit<Usi> = unsafe { LazyMainInit::uninit() };

impl Usi {
    pub fn setup(&self, _: &MainInitCtx) {
        // SAFETY: Called with interrupts disabled. Ensured by &MainInitCtx.
        unsafe { self.USI.usidr().write(|w| w.bits(0xFF)) };
    }
}

/// The USI registers plus the SDA/SCL port pins.
pub struct UsiHw;

impl UsiPort for UsiHw {
    #[inline(always)]
    fn release_sda(&mut self) {
        PORTB.input(BIT_SDA);
    }

    #[inline(always)]
    fn await_start(&mut self) -> bool {
        loop {
            if !PORTB.get(BIT_SCL) {
                return false;
            }
            if PORTB.get(BIT_SDA) {
                return true;
            }
        }
    }

    #[inline(always)]
    fn listen_start(&mut self) {
        // SAFETY: Valid USI configuration.
        unsafe {
            USI.USI.usicr().write(|w| w.bits(USICR_START));
            USI.USI.usisr().write(|w| w.bits(USISR_BYTE));
        }
    }

    #[inline(always)]
    fn listen_address(&mut self) {
        // SAFETY: Valid USI configuration.
        unsafe {
            USI.USI.usicr().write(|w| w.bits(USICR_OVF));
            USI.USI.usisr().write(|w| w.bits(USISR_BYTE));
        }
    }

    #[inline(always)]
    fn data(&self) -> u8 {
        USI.USI.usidr().read().bits()
    }

    #[inline(always)]
    fn send_ack(&mut self) {
        // SAFETY: Valid USI data and status values.
        unsafe { USI.USI.usidr().write(|w| w.bits(0)) };
        PORTB.output(BIT_SDA);
        // SAFETY: Valid USI status value.
        unsafe { USI.USI.usisr().write(|w| w.bits(USISR_ACK)) };
    }

    #[inline(always)]
    fn receive_byte(&mut self) {
        PORTB.input(BIT_SDA);
        // SAFETY: Valid USI status value.
        unsafe { USI.USI.usisr().write(|w| w.bits(USISR_DATA)) };
    }

    #[inline(always)]
    fn take_stop(&mut self) -> bool {
        let usisr = USI.USI.usisr().read().bits();
        if usisr & USIPF == 0 {
            return false;
        }
        // Only clear the stop flag. Keep the counter value.
        // SCL is idle after a stop, so the counter can't move meanwhile.
        // SAFETY: Valid USI status value.
        unsafe { USI.USI.usisr().write(|w| w.bits(USIPF | (usisr & USICNT_MASK))) };
        true
    }
}

pub fn usi_init(m: &MainCtx) {
    SLAVE.init(m, &mut UsiHw);
}

pub fn irq_handler_usi_start(c: &IrqCtx<'_>) {
    SLAVE.on_start(c, &mut UsiHw);
}

pub fn irq_handler_usi_ovf(c: &IrqCtx<'_>) {
    SLAVE.on_overflow(c, &mut UsiHw);
}

// vim: ts=4 sw=4 expandtab
