// -*- coding: utf-8 -*-
// Copyright (C) 2025 Michael Büsch <m@bues.ch>
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Zero-cross synchronized triac phase-control dimmer.
//!
//! This crate holds the platform independent part of the dimmer firmware:
//! The mains zero-cross handler, the per-channel compare-match state machine,
//! the dim to phase delay translation and the USI based I2C slave receiver.
//! All hardware access goes through the narrow [PhaseHw] and [UsiPort] traits.

#![no_std]

mod context;
mod debug;
mod dim;
mod dimmer;
mod packet;
mod usi_i2c;

pub use crate::{
    context::{IrqCtx, MainCtx},
    debug::Debug,
    dim::{AC_DIM_MAX_PERCENT, AC_DIM_MIN_PERCENT, DimmerConfig, PhaseTiming, Transition},
    dimmer::{ChannelState, Dimmer, PhaseHw, ZeroCross},
    packet::{
        ByteRead, HeaderFramer, I2cPacketSource, PACKET_HEADER, PACKET_SIZE, Packet, PacketSource,
        UartPacketSource,
    },
    usi_i2c::{Forever, Idle, PollLimit, RxStatus, UsiI2cSlave, UsiPort, UsiState},
};

// vim: ts=4 sw=4 expandtab
