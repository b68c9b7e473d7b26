// -*- coding: utf-8 -*-
// Copyright (C) 2025 Michael Büsch <m@bues.ch>
// SPDX-License-Identifier: Apache-2.0 OR MIT

use core::cell::Cell;
use critical_section::Mutex;

#[derive(Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum Debug {
    /// Zero crossings dropped by the overrun guard.
    ZcMissed,
    /// Forced resynchronizations after too many dropped zero crossings.
    ZcResync,
    /// Complete packets received.
    RxPackets,
    /// Packets dropped due to an invalid light index.
    RxDropped,
    /// Transactions that ended before a full packet arrived.
    RxShort,
}

const NRVALUES: usize = 5;

static VALUES: Mutex<[Cell<u16>; NRVALUES]> = Mutex::new([
    Cell::new(0),
    Cell::new(0),
    Cell::new(0),
    Cell::new(0),
    Cell::new(0),
]);

impl Debug {
    pub const COUNT: usize = NRVALUES;

    /// Get the debug id by table index.
    pub const fn from_index(index: usize) -> Option<Debug> {
        match index {
            0 => Some(Debug::ZcMissed),
            1 => Some(Debug::ZcResync),
            2 => Some(Debug::RxPackets),
            3 => Some(Debug::RxDropped),
            4 => Some(Debug::RxShort),
            _ => None,
        }
    }

    pub fn log_u16(&self, value: u16) {
        critical_section::with(|cs| {
            let id = *self as usize;
            let values = VALUES.borrow(cs);
            if id < values.len() {
                values[id].set(value);
            }
        });
    }

    pub fn log_u8(&self, value: u8) {
        self.log_u16(value.into());
    }

    /// Increment the debug value. Saturates at 0xFFFF.
    pub fn inc(&self) {
        critical_section::with(|cs| {
            let id = *self as usize;
            let values = VALUES.borrow(cs);
            if id < values.len() {
                values[id].set(values[id].get().saturating_add(1));
            }
        });
    }

    pub fn get(&self) -> u16 {
        critical_section::with(|cs| {
            let id = *self as usize;
            VALUES.borrow(cs).get(id).map_or(0xFFFF, |v| v.get())
        })
    }
}


// vim: ts=4 sw=4 expandtab
