// -*- coding: utf-8 -*-
// Copyright (C) 2025 Michael Büsch <m@bues.ch>
// SPDX-License-Identifier: Apache-2.0 OR MIT

#![allow(unused_unsafe)]

use crate::{
    hw::{interrupt, mcu},
    mutex::{LazyMainInit, MainInitCtx},
};

pub const BIT_SDA: usize = 0;
pub const BIT_GATE1: usize = 1;
#[allow(dead_code)]
pub const BIT_DEBUG: usize = 1;
pub const BIT_SCL: usize = 2;
pub const BIT_ZERO_CROSS: usize = 3;
pub const BIT_GATE0: usize = 4;

#[allow(non_snake_case)]
pub struct PortB {
    pub PORTB: mcu::PORTB,
}

// SAFETY: Is initialized when constructing the MainCtx.
pub static PORTB: LazyMainInit<PortB> = unsafe { LazyMainInit::uninit() };

impl PortB {
    #[inline(always)]
    pub fn get(&self, bit: usize) -> bool {
        self.PORTB.pinb().read().bits() & (1 << bit) != 0
    }

    /// Set the output level of a pin.
    /// This is a read-modify-write shared by all contexts.
    #[inline(always)]
    pub fn set(&self, bit: usize, value: bool) {
        interrupt::free(|_| {
            // SAFETY: All bit patterns are valid port values.
            self.PORTB.portb().modify(|r, w| unsafe {
                if value {
                    w.bits(r.bits() | (1 << bit))
                } else {
                    w.bits(r.bits() & !(1 << bit))
                }
            });
        });
    }

    #[inline(always)]
    pub fn output(&self, bit: usize) {
        interrupt::free(|_| {
            // SAFETY: All bit patterns are valid direction values.
            self.PORTB
                .ddrb()
                .modify(|r, w| unsafe { w.bits(r.bits() | (1 << bit)) });
        });
    }

    #[inline(always)]
    pub fn input(&self, bit: usize) {
        interrupt::free(|_| {
            // SAFETY: All bit patterns are valid direction values.
            self.PORTB
                .ddrb()
                .modify(|r, w| unsafe { w.bits(r.bits() & !(1 << bit)) });
        });
    }
}

fn pin_input(_bit: usize) -> u8 {
    0
}
fn pin_output(bit: usize) -> u8 {
    1 << bit
}
fn pin_low(_bit: usize) -> u8 {
    0
}
fn pin_high(bit: usize) -> u8 {
    1 << bit
}
fn pin_floating(_bit: usize) -> u8 {
    0
}

impl PortB {
    pub fn setup(&self, _: &MainInitCtx) {
        // SAFETY: Called with interrupts disabled. Ensured by &MainInitCtx.
        unsafe {
            self.PORTB.portb().write(|w| {
                w.bits(
                    pin_high(BIT_SDA) | // I2C SDA, USI drives it low via USIDR
                    pin_low(BIT_GATE1) | // triac gate 1 or debug
                    pin_high(BIT_SCL) | // I2C SCL, USI clock hold
                    pin_floating(BIT_ZERO_CROSS) | // zero crossing detector
                    pin_low(BIT_GATE0) | // triac gate 0
                    pin_floating(5), // RESET
                )
            });
            self.PORTB.ddrb().write(|w| {
                w.bits(
                    pin_input(BIT_SDA) | // I2C SDA
                    pin_output(BIT_GATE1) | // triac gate 1 or debug
                    pin_output(BIT_SCL) | // I2C SCL
                    pin_input(BIT_ZERO_CROSS) | // zero crossing detector
                    pin_output(BIT_GATE0) | // triac gate 0
                    pin_input(5), // RESET
                )
            });
        }
    }
}

// vim: ts=4 sw=4 expandtab
