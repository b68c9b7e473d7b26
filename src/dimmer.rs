// -*- coding: utf-8 -*-
// Copyright (C) 2025 Michael Büsch <m@bues.ch>
// SPDX-License-Identifier: Apache-2.0 OR MIT

use crate::{
    context::{IrqCtx, MainCtx},
    debug::Debug,
    dim::{DimmerConfig, PhaseTiming, Transition},
    packet::Packet,
};
use core::cell::Cell;
use critical_section::Mutex;

/// Triac gate outputs and phase delay timers.
pub trait PhaseHw {
    /// Drive the triac gate of `channel`. `true` = triac on.
    fn set_gate(&mut self, channel: usize, on: bool);

    /// Program the compare match threshold of `channel`.
    fn set_compare(&mut self, channel: usize, value: u16);

    /// Restart all phase delay counters from zero.
    fn reset_counters(&mut self);
}

/// Per channel state, shared between the zero crossing ISR,
/// the compare match ISR and the packet consumer.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct ChannelState {
    /// Set at the zero crossing. Cleared at the first compare match after it.
    pub zero_cross_pending: bool,
    /// The dim value the hardware is currently driving.
    pub applied_dim: u8,
    /// The latest dim value received from the bus.
    pub requested_dim: u8,
}

impl ChannelState {
    const ZERO: ChannelState = ChannelState {
        zero_cross_pending: false,
        applied_dim: 0,
        requested_dim: 0,
    };
}

/// Result of a zero crossing event.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum ZeroCross {
    /// A new half-wave has been started.
    Accepted,
    /// At least one channel did not have its compare match since
    /// the previous zero crossing. The edge has been ignored.
    Dropped,
    /// Too many consecutive edges have been dropped.
    /// A new half-wave has been started regardless.
    Resynced,
}

pub struct Dimmer<const N: usize> {
    timing: PhaseTiming,
    config: DimmerConfig,
    channels: [Mutex<Cell<ChannelState>>; N],
    missed: Mutex<Cell<u16>>,
    missed_in_row: Mutex<Cell<u8>>,
    resyncs: Mutex<Cell<u16>>,
}

impl<const N: usize> Dimmer<N> {
    pub const fn new(timing: PhaseTiming, config: DimmerConfig) -> Self {
        Self {
            timing,
            config,
            channels: [const { Mutex::new(Cell::new(ChannelState::ZERO)) }; N],
            missed: Mutex::new(Cell::new(0)),
            missed_in_row: Mutex::new(Cell::new(0)),
            resyncs: Mutex::new(Cell::new(0)),
        }
    }

    pub const fn timing(&self) -> &PhaseTiming {
        &self.timing
    }

    pub const fn config(&self) -> &DimmerConfig {
        &self.config
    }

    /// Switch all channels off and program the matching compare values.
    /// Must be called before the interrupts are enabled.
    pub fn init(&self, _m: &MainCtx, hw: &mut impl PhaseHw) {
        let off = self.config.off();
        let compare = self.timing.compare_value(off);
        critical_section::with(|cs| {
            for (i, chan) in self.channels.iter().enumerate() {
                chan.borrow(cs).set(ChannelState {
                    zero_cross_pending: false,
                    applied_dim: off,
                    requested_dim: off,
                });
                hw.set_gate(i, false);
                hw.set_compare(i, compare);
            }
        });
    }

    /// Mains zero crossing interrupt.
    pub fn zero_cross(&self, c: &IrqCtx<'_>, hw: &mut impl PhaseHw) -> ZeroCross {
        let cs = c.cs();

        let mut ret = ZeroCross::Accepted;

        // All channels must have seen their compare match
        // since the previous zero crossing.
        let overrun = self
            .channels
            .iter()
            .any(|chan| chan.borrow(cs).get().zero_cross_pending);
        if overrun {
            let in_row = self.missed_in_row.borrow(cs).get().saturating_add(1);
            let limit = self.config.overrun_limit;
            if limit == 0 || in_row <= limit {
                self.missed_in_row.borrow(cs).set(in_row);
                let missed = self.missed.borrow(cs).get().saturating_add(1);
                self.missed.borrow(cs).set(missed);
                Debug::ZcMissed.log_u16(missed);
                return ZeroCross::Dropped;
            }
            let resyncs = self.resyncs.borrow(cs).get().saturating_add(1);
            self.resyncs.borrow(cs).set(resyncs);
            Debug::ZcResync.log_u16(resyncs);
            ret = ZeroCross::Resynced;
        }
        self.missed_in_row.borrow(cs).set(0);

        for (i, chan) in self.channels.iter().enumerate() {
            let chan = chan.borrow(cs);
            let mut state = chan.get();
            state.zero_cross_pending = true;
            chan.set(state);

            // The triac has to go off at least once per half-wave.
            if self.config.switches_off(state.applied_dim) {
                hw.set_gate(i, false);
            }
        }

        hw.reset_counters();

        ret
    }

    /// Phase delay timer compare match interrupt of `channel`.
    pub fn compare_match(&self, c: &IrqCtx<'_>, channel: usize, hw: &mut impl PhaseHw) {
        let cs = c.cs();
        let Some(chan) = self.channels.get(channel) else {
            return;
        };
        let chan = chan.borrow(cs);
        let mut state = chan.get();

        // Fire decision for the current half-wave.
        // This must use the dim value that has been scheduled for this half-wave.
        if state.zero_cross_pending {
            state.zero_cross_pending = false;
            if self.config.fires(state.applied_dim) {
                hw.set_gate(channel, true);
            }
        }

        // Schedule the next half-wave.
        if state.applied_dim != state.requested_dim {
            state.applied_dim = match self.config.transition {
                Transition::Jump => state.requested_dim,
                Transition::Step if state.applied_dim < state.requested_dim => {
                    state.applied_dim + 1
                }
                Transition::Step => state.applied_dim - 1,
            };
            hw.set_compare(channel, self.timing.compare_value(state.applied_dim));
        }

        chan.set(state);
    }

    /// Request a new dim percentage for `channel`.
    ///
    /// Returns `false`, if the channel does not exist.
    pub fn request(&self, _m: &MainCtx, channel: usize, percent: u8) -> bool {
        let Some(chan) = self.channels.get(channel) else {
            return false;
        };
        let dim = self.config.clamp_request(percent);
        critical_section::with(|cs| {
            let chan = chan.borrow(cs);
            let mut state = chan.get();
            state.requested_dim = dim;
            chan.set(state);
        });
        true
    }

    /// Apply a received packet.
    ///
    /// Packets for non-existing lights are dropped and `false` is returned.
    pub fn apply(&self, m: &MainCtx, packet: Packet) -> bool {
        let ok = self.request(m, packet.light_index as usize, packet.dim_percent);
        if ok {
            Debug::RxPackets.inc();
        } else {
            Debug::RxDropped.inc();
        }
        ok
    }

    pub fn state(&self, channel: usize) -> Option<ChannelState> {
        let chan = self.channels.get(channel)?;
        Some(critical_section::with(|cs| chan.borrow(cs).get()))
    }

    /// Number of zero crossings dropped by the overrun guard.
    pub fn missed_zero_crossings(&self) -> u16 {
        critical_section::with(|cs| self.missed.borrow(cs).get())
    }

    /// Number of forced resynchronizations.
    pub fn resyncs(&self) -> u16 {
        critical_section::with(|cs| self.resyncs.borrow(cs).get())
    }
}


// vim: ts=4 sw=4 expandtab
