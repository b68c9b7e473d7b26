// -*- coding: utf-8 -*-
// Copyright (C) 2025 Michael Büsch <m@bues.ch>
// SPDX-License-Identifier: Apache-2.0 OR MIT

use crate::{
    context::MainCtx,
    debug::Debug,
    usi_i2c::{Idle, UsiI2cSlave, UsiPort},
};

/// Number of payload bytes of a packet.
pub const PACKET_SIZE: usize = 2;

/// Frame start byte on byte stream links.
pub const PACKET_HEADER: u8 = 0xA0;

/// A dim request for one light.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Packet {
    pub light_index: u8,
    pub dim_percent: u8,
}

impl Packet {
    pub const fn from_bytes(bytes: [u8; PACKET_SIZE]) -> Self {
        Self {
            light_index: bytes[0],
            dim_percent: bytes[1],
        }
    }
}

/// Something that delivers dim request packets.
pub trait PacketSource {
    /// Wait for the next complete packet.
    /// Returns `None`, if `idle` cancelled waiting.
    fn next_packet(&mut self, m: &MainCtx, idle: &mut impl Idle) -> Option<Packet>;
}

/// Packets from I2C write transactions.
pub struct I2cPacketSource<'a, P> {
    slave: &'a UsiI2cSlave,
    port: P,
    /// Kept across cancelled receptions.
    buf: [u8; PACKET_SIZE],
}

impl<'a, P: UsiPort> I2cPacketSource<'a, P> {
    pub const fn new(slave: &'a UsiI2cSlave, port: P) -> Self {
        Self {
            slave,
            port,
            buf: [0; PACKET_SIZE],
        }
    }
}

impl<P: UsiPort> PacketSource for I2cPacketSource<'_, P> {
    fn next_packet(&mut self, m: &MainCtx, idle: &mut impl Idle) -> Option<Packet> {
        loop {
            let len = self
                .slave
                .receive_packet(m, &mut self.port, &mut self.buf, idle)?;
            if len == PACKET_SIZE {
                return Some(Packet::from_bytes(self.buf));
            }
            if len > 0 {
                Debug::RxShort.inc();
            }
        }
    }
}

/// Non-blocking byte stream.
pub trait ByteRead {
    fn read_byte(&mut self) -> Option<u8>;
}

/// Splits a byte stream into `[PACKET_HEADER, light_index, dim_percent]` frames.
///
/// Bytes are discarded until a header byte shows up.
#[derive(Default)]
pub struct HeaderFramer {
    buf: [u8; PACKET_SIZE],
    len: Option<usize>,
}

impl HeaderFramer {
    pub const fn new() -> Self {
        Self {
            buf: [0; PACKET_SIZE],
            len: None,
        }
    }

    /// Feed one byte into the framer.
    /// Returns the packet, if this byte completed a frame.
    pub fn push(&mut self, byte: u8) -> Option<Packet> {
        match self.len {
            None => {
                if byte == PACKET_HEADER {
                    self.len = Some(0);
                }
                None
            }
            Some(len) => {
                self.buf[len] = byte;
                if len + 1 == PACKET_SIZE {
                    self.len = None;
                    Some(Packet::from_bytes(self.buf))
                } else {
                    self.len = Some(len + 1);
                    None
                }
            }
        }
    }

    /// Drop a partially received frame.
    pub fn reset(&mut self) {
        self.len = None;
    }
}

/// Packets from a framed byte stream, such as a UART.
pub struct UartPacketSource<R> {
    reader: R,
    framer: HeaderFramer,
}

impl<R: ByteRead> UartPacketSource<R> {
    pub const fn new(reader: R) -> Self {
        Self {
            reader,
            framer: HeaderFramer::new(),
        }
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R: ByteRead> PacketSource for UartPacketSource<R> {
    fn next_packet(&mut self, _m: &MainCtx, idle: &mut impl Idle) -> Option<Packet> {
        loop {
            if let Some(byte) = self.reader.read_byte() {
                if let Some(packet) = self.framer.push(byte) {
                    return Some(packet);
                }
            } else if !idle.idle() {
                return None;
            }
        }
    }
}


// vim: ts=4 sw=4 expandtab
