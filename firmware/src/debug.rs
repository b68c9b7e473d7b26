// -*- coding: utf-8 -*-
// Copyright (C) 2025 Michael Büsch <m@bues.ch>
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Debug value plotter.
//!
//! Each main loop iteration plots one `(id, value)` pair on the debug pin
//! as 3 bytes, MSB first: id, value low byte, value high byte.
//! Readable with a scope or a logic analyzer.

use crate::{
    hw::nop3,
    ports::{BIT_DEBUG, PORTB},
};
use avr_stack::estimate_unused_stack_space;
use triacdim::{Debug, MainCtx};

/// Debug id of the free stack space.
const ID_STACK: u8 = 0xFE;

/// Bit time in units of [nop3].
const BIT_DELAY: u8 = 4;

fn plot_u8(value: u8) {
    for bit in (0..8).rev() {
        PORTB.set(BIT_DEBUG, value & (1 << bit) != 0);
        for _ in 0..BIT_DELAY {
            nop3();
        }
    }
    PORTB.set(BIT_DEBUG, false);
}

fn plot(id: u8, value: u16) {
    plot_u8(id);
    plot_u8(value as u8);
    plot_u8((value >> 8) as u8);
}

pub struct DebugPlot {
    index: usize,
    min_stack: u16,
}

impl DebugPlot {
    pub const fn new() -> Self {
        Self {
            index: 0,
            min_stack: u16::MAX,
        }
    }

    pub fn run(&mut self, _m: &MainCtx) {
        self.min_stack = self.min_stack.min(estimate_unused_stack_space());

        if let Some(id) = Debug::from_index(self.index) {
            plot(id as u8, id.get());
            self.index += 1;
        } else {
            plot(ID_STACK, self.min_stack);
            self.index = 0;
        }
    }
}

// vim: ts=4 sw=4 expandtab
