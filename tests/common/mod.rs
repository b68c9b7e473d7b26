// -*- coding: utf-8 -*-
// Copyright (C) 2025 Michael Büsch <m@bues.ch>
// SPDX-License-Identifier: Apache-2.0 OR MIT

#![allow(dead_code)]

use std::{
    cell::{RefCell, RefMut},
    collections::VecDeque,
    rc::Rc,
};
use triacdim::{IrqCtx, MainCtx, UsiI2cSlave, UsiPort};

pub fn main_ctx() -> MainCtx {
    // SAFETY: Tests run in main context.
    unsafe { MainCtx::new() }
}

pub fn irq_ctx() -> IrqCtx<'static> {
    // SAFETY: The simulated interrupts never run concurrently.
    unsafe { IrqCtx::new() }
}

/// USI registers in two-wire mode with external clock on both SCL edges.
#[derive(Default)]
pub struct UsiRegs {
    /// USIDR
    pub dr: u8,
    /// 4 bit edge counter.
    pub cnt: u8,
    /// Counter overflow interrupt enabled.
    pub oie: bool,
    /// SDA data direction: output.
    pub sda_out: bool,
    /// USIPF
    pub pf: bool,
}

impl UsiRegs {
    /// SDA level as driven by the USI. `true` = released.
    pub fn sda(&self) -> bool {
        !self.sda_out || self.dr & 0x80 != 0
    }
}

/// Shared handle to the USI registers.
/// Used from the simulated interrupts and from main context.
#[derive(Clone, Default)]
pub struct UsiModel(Rc<RefCell<UsiRegs>>);

impl UsiModel {
    pub fn regs(&self) -> RefMut<'_, UsiRegs> {
        self.0.borrow_mut()
    }
}

impl UsiPort for UsiModel {
    fn release_sda(&mut self) {
        self.regs().sda_out = false;
    }

    fn await_start(&mut self) -> bool {
        false
    }

    fn listen_start(&mut self) {
        let mut r = self.regs();
        r.oie = false;
        r.cnt = 0;
        r.pf = false;
    }

    fn listen_address(&mut self) {
        let mut r = self.regs();
        r.oie = true;
        r.cnt = 0;
        r.pf = false;
    }

    fn data(&self) -> u8 {
        self.0.borrow().dr
    }

    fn send_ack(&mut self) {
        let mut r = self.regs();
        r.dr = 0;
        r.sda_out = true;
        r.cnt = 14;
        r.pf = false;
    }

    fn receive_byte(&mut self) {
        let mut r = self.regs();
        r.sda_out = false;
        r.cnt = 0;
        r.pf = false;
    }

    fn take_stop(&mut self) -> bool {
        std::mem::take(&mut self.regs().pf)
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
enum BusEvent {
    Start,
    /// One SCL clock with the master driving SDA.
    Clock(bool),
    /// One SCL clock with SDA released by the master.
    AckClock,
    Stop,
}

/// I2C bus master writing to a USI slave, one SCL clock per step.
pub struct I2cBus<'a> {
    slave: &'a UsiI2cSlave,
    pub usi: UsiModel,
    events: VecDeque<BusEvent>,
    /// Sampled ACK bits. `true` = acknowledged.
    pub acks: Vec<bool>,
}

impl<'a> I2cBus<'a> {
    pub fn new(slave: &'a UsiI2cSlave) -> Self {
        let mut usi = UsiModel::default();
        slave.init(&main_ctx(), &mut usi);
        Self {
            slave,
            usi,
            events: VecDeque::new(),
            acks: Vec::new(),
        }
    }

    /// Main context handle to the USI.
    pub fn port(&self) -> UsiModel {
        self.usi.clone()
    }

    /// Queue a complete write transaction.
    pub fn write(&mut self, address: u8, data: &[u8]) {
        self.events.push_back(BusEvent::Start);
        for byte in std::iter::once(address << 1).chain(data.iter().copied()) {
            for bit in (0..8).rev() {
                self.events.push_back(BusEvent::Clock(byte & (1 << bit) != 0));
            }
            self.events.push_back(BusEvent::AckClock);
        }
        self.events.push_back(BusEvent::Stop);
    }

    pub fn is_idle(&self) -> bool {
        self.events.is_empty()
    }

    fn edge(&mut self, rising: bool, sda: bool) {
        let overflow = {
            let mut r = self.usi.regs();
            if rising {
                r.dr = (r.dr << 1) | sda as u8;
            }
            r.cnt = (r.cnt + 1) & 0xF;
            r.cnt == 0 && r.oie
        };
        if overflow {
            self.slave.on_overflow(&irq_ctx(), &mut self.usi);
        }
    }

    /// Run the next bus event. Returns `false`, if nothing is queued.
    pub fn step(&mut self) -> bool {
        let Some(event) = self.events.pop_front() else {
            return false;
        };
        match event {
            BusEvent::Start => {
                self.slave.on_start(&irq_ctx(), &mut self.usi);
            }
            BusEvent::Clock(bit) => {
                let sda = bit && self.usi.regs().sda();
                self.edge(true, sda);
                self.edge(false, sda);
            }
            BusEvent::AckClock => {
                let sda = self.usi.regs().sda();
                self.acks.push(!sda);
                self.edge(true, sda);
                self.edge(false, sda);
            }
            BusEvent::Stop => {
                // No interrupt. Only the flag is set.
                self.usi.regs().pf = true;
            }
        }
        true
    }
}

// vim: ts=4 sw=4 expandtab
