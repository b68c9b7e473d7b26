// -*- coding: utf-8 -*-
// Copyright (C) 2025 Michael Büsch <m@bues.ch>
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! I2C slave receiver on top of the USI shift register.
//!
//! The USI only provides a shift register, a 4 bit clock edge counter
//! and start condition detection. The protocol is driven entirely
//! by the start condition and the counter overflow interrupts.
//! The bus master is slowed down by the USI holding SCL low
//! after each counter overflow until the ISR has re-armed the counter.

use crate::context::{IrqCtx, MainCtx};
use core::cell::Cell;
use critical_section::Mutex;

/// USI register level operations needed by the I2C slave.
pub trait UsiPort {
    /// Switch SDA to input (released, pulled up by the bus).
    fn release_sda(&mut self);

    /// Wait for the start condition to complete (SCL going low).
    ///
    /// Returns `true`, if SDA went high while SCL was still high.
    /// That is a stop condition instead of a start condition.
    fn await_start(&mut self) -> bool;

    /// Only detect start conditions. No counter overflow interrupt.
    /// Clears all pending USI flags.
    fn listen_start(&mut self);

    /// Detect start conditions and count the 8 address bits.
    /// SCL is held low on counter overflow.
    fn listen_address(&mut self);

    /// Get the content of the shift register.
    fn data(&self) -> u8;

    /// Pull SDA low for one clock and overflow after that clock.
    fn send_ack(&mut self);

    /// Release SDA and overflow after 8 received bits.
    fn receive_byte(&mut self);

    /// Returns `true` and clears the flag, if a stop condition
    /// has been seen since the last ACK or start.
    /// Called from main context with interrupts disabled.
    fn take_stop(&mut self) -> bool;
}

/// Protocol state of the slave.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum UsiState {
    /// Not addressed. Waiting for a start condition.
    Idle,
    /// Receiving the address byte.
    CheckAddress,
    /// Sending the ACK bit.
    RecvDataWait,
    /// Receiving a data byte.
    RecvDataAckSend,
}

/// Status of the receive byte handoff to main context.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum RxStatus {
    /// We are addressed. No byte is waiting.
    Pending,
    /// A byte is waiting to be picked up by main context.
    Received,
    /// No transaction for us is running.
    Terminated,
}

/// Idle policy while waiting for received bytes.
pub trait Idle {
    /// Called on every poll without news.
    /// Returns `false` to cancel the reception.
    fn idle(&mut self) -> bool;
}

impl<F: FnMut() -> bool> Idle for F {
    fn idle(&mut self) -> bool {
        self()
    }
}

/// Wait forever.
pub struct Forever;

impl Idle for Forever {
    fn idle(&mut self) -> bool {
        core::hint::spin_loop();
        true
    }
}

/// Cancel after the given number of empty polls.
pub struct PollLimit(pub u32);

impl Idle for PollLimit {
    fn idle(&mut self) -> bool {
        if self.0 == 0 {
            false
        } else {
            self.0 -= 1;
            true
        }
    }
}

enum Poll {
    /// No transaction for us.
    Idle,
    /// Addressed, waiting for the next byte.
    Active(u8),
    /// A byte has been picked up.
    Byte(u8, u8),
    /// The transaction we were receiving from has ended.
    Ended,
}

pub struct UsiI2cSlave {
    address: u8,
    state: Mutex<Cell<UsiState>>,
    status: Mutex<Cell<RxStatus>>,
    data: Mutex<Cell<u8>>,
    /// Incremented on every address match.
    generation: Mutex<Cell<u8>>,
    /// The current transaction has already filled a whole buffer.
    /// Cleared on address match.
    done: Mutex<Cell<bool>>,
    /// Generation and length of a cancelled reception.
    resume: Mutex<Cell<Option<(u8, usize)>>>,
}

impl UsiI2cSlave {
    /// Create a slave with the 7 bit `address`.
    pub const fn new(address: u8) -> Self {
        Self {
            address,
            state: Mutex::new(Cell::new(UsiState::Idle)),
            status: Mutex::new(Cell::new(RxStatus::Terminated)),
            data: Mutex::new(Cell::new(0)),
            generation: Mutex::new(Cell::new(0)),
            done: Mutex::new(Cell::new(false)),
            resume: Mutex::new(Cell::new(None)),
        }
    }

    pub const fn address(&self) -> u8 {
        self.address
    }

    /// Configure the USI as an idle slave.
    /// Must be called before the interrupts are enabled.
    pub fn init(&self, _m: &MainCtx, port: &mut impl UsiPort) {
        critical_section::with(|cs| {
            self.state.borrow(cs).set(UsiState::Idle);
            self.status.borrow(cs).set(RxStatus::Terminated);
        });
        port.release_sda();
        port.listen_start();
    }

    pub fn state(&self) -> UsiState {
        critical_section::with(|cs| self.state.borrow(cs).get())
    }

    pub fn status(&self) -> RxStatus {
        critical_section::with(|cs| self.status.borrow(cs).get())
    }

    /// USI start condition interrupt.
    pub fn on_start(&self, c: &IrqCtx<'_>, port: &mut impl UsiPort) {
        let cs = c.cs();

        self.state.borrow(cs).set(UsiState::CheckAddress);
        port.release_sda();

        if port.await_start() {
            // This was a stop condition.
            self.state.borrow(cs).set(UsiState::Idle);
            port.listen_start();
        } else {
            port.listen_address();
        }

        self.status.borrow(cs).set(RxStatus::Terminated);
    }

    /// USI counter overflow interrupt.
    pub fn on_overflow(&self, c: &IrqCtx<'_>, port: &mut impl UsiPort) {
        let cs = c.cs();
        let state = self.state.borrow(cs);
        let status = self.status.borrow(cs);

        match state.get() {
            UsiState::Idle => {
                port.listen_start();
            }
            UsiState::CheckAddress => {
                // The lowest bit is the R/W flag.
                if port.data() >> 1 == self.address {
                    port.send_ack();
                    let generation = self.generation.borrow(cs);
                    generation.set(generation.get().wrapping_add(1));
                    self.done.borrow(cs).set(false);
                    status.set(RxStatus::Pending);
                    state.set(UsiState::RecvDataWait);
                } else {
                    // Not for us.
                    port.listen_start();
                    state.set(UsiState::Idle);
                }
            }
            UsiState::RecvDataWait => {
                if status.get() == RxStatus::Terminated {
                    // The master ended the transaction.
                    // Main context marks a stop condition only,
                    // the USI is re-armed here.
                    port.release_sda();
                    port.listen_start();
                    state.set(UsiState::Idle);
                } else {
                    port.receive_byte();
                    state.set(UsiState::RecvDataAckSend);
                }
            }
            UsiState::RecvDataAckSend => {
                if status.get() == RxStatus::Pending {
                    self.data.borrow(cs).set(port.data());
                    status.set(RxStatus::Received);
                }
                port.send_ack();
                state.set(UsiState::RecvDataWait);
            }
        }
    }

    fn poll(&self, port: &mut impl UsiPort, current: Option<u8>) -> Poll {
        critical_section::with(|cs| {
            let status = self.status.borrow(cs);
            let generation = self.generation.borrow(cs).get();

            // There is no stop condition interrupt.
            if status.get() == RxStatus::Pending && port.take_stop() {
                status.set(RxStatus::Terminated);
            }

            if let Some(current) = current {
                if current != generation || status.get() == RxStatus::Terminated {
                    return Poll::Ended;
                }
            } else if status.get() == RxStatus::Terminated || self.done.borrow(cs).get() {
                // Excess bytes of an already completed transaction are dropped.
                if status.get() == RxStatus::Received {
                    status.set(RxStatus::Pending);
                }
                return Poll::Idle;
            }

            match status.get() {
                RxStatus::Received => {
                    status.set(RxStatus::Pending);
                    Poll::Byte(generation, self.data.borrow(cs).get())
                }
                RxStatus::Pending | RxStatus::Terminated => Poll::Active(generation),
            }
        })
    }

    /// Receive up to `buf.len()` bytes of one transaction.
    ///
    /// Returns the number of received bytes. This is less than `buf.len()`,
    /// if the transaction has been terminated early.
    /// Returns `None`, if `idle` cancelled the reception.
    ///
    /// A reception cancelled in the middle of a transaction is resumed
    /// by the next call. The bytes received so far stay in `buf`,
    /// so the next call must get the same buffer.
    pub fn receive_packet(
        &self,
        _m: &MainCtx,
        port: &mut impl UsiPort,
        buf: &mut [u8],
        idle: &mut impl Idle,
    ) -> Option<usize> {
        let (mut current, mut len) = match self.take_resume() {
            Some((generation, len)) => (Some(generation), len.min(buf.len())),
            None => (None, 0),
        };

        while len < buf.len() {
            match self.poll(port, current) {
                Poll::Byte(generation, data) => {
                    current = Some(generation);
                    buf[len] = data;
                    len += 1;
                }
                Poll::Active(generation) => {
                    current = Some(generation);
                    if !idle.idle() {
                        self.set_resume(generation, len);
                        return None;
                    }
                }
                Poll::Idle => {
                    if !idle.idle() {
                        return None;
                    }
                }
                Poll::Ended => {
                    return Some(len);
                }
            }
        }

        if let Some(current) = current {
            self.finish(current);
        }
        Some(len)
    }

    fn take_resume(&self) -> Option<(u8, usize)> {
        critical_section::with(|cs| self.resume.borrow(cs).take())
    }

    fn set_resume(&self, generation: u8, len: usize) {
        critical_section::with(|cs| self.resume.borrow(cs).set(Some((generation, len))));
    }

    /// Drop the rest of transaction `generation`, if it is still running.
    fn finish(&self, generation: u8) {
        critical_section::with(|cs| {
            if self.generation.borrow(cs).get() == generation {
                self.done.borrow(cs).set(true);
            }
        });
    }
}


// vim: ts=4 sw=4 expandtab
