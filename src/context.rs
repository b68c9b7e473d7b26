// -*- coding: utf-8 -*-
// Copyright (C) 2025 Michael Büsch <m@bues.ch>
// SPDX-License-Identifier: Apache-2.0 OR MIT

use critical_section::CriticalSection;

/// Interrupt context handle.
///
/// Holding a reference to this object proves that the holder
/// is running in interrupt context with interrupts disabled.
pub struct IrqCtx<'cs>(CriticalSection<'cs>);

impl<'cs> IrqCtx<'cs> {
    /// Create a new interrupt context.
    ///
    /// # SAFETY
    ///
    /// This may only be called from an ISR.
    /// All ISRs that touch dimmer state must run on the same,
    /// non-nesting interrupt priority level.
    #[inline(always)]
    pub unsafe fn new() -> Self {
        // SAFETY: Interrupts are disabled while an ISR runs and ISRs don't nest.
        let cs = unsafe { CriticalSection::new() };
        fence();
        Self(cs)
    }

    /// Get the `CriticalSection` that belongs to this context.
    #[inline(always)]
    pub fn cs(&self) -> CriticalSection<'cs> {
        self.0
    }
}

impl Drop for IrqCtx<'_> {
    #[inline(always)]
    fn drop(&mut self) {
        fence();
    }
}

/// Main context handle.
///
/// Holding a reference to this object proves that the holder
/// is running in main() context.
/// Interrupts may be enabled. Every access to IRQ shared data
/// from main() context opens a critical section.
pub struct MainCtx(());

impl MainCtx {
    /// Create the main context.
    ///
    /// # SAFETY
    ///
    /// This may only be called from `main()` and only once.
    #[inline(always)]
    pub unsafe fn new() -> Self {
        fence();
        Self(())
    }
}

/// Optimization and reordering fence.
#[inline(always)]
pub fn fence() {
    core::sync::atomic::compiler_fence(core::sync::atomic::Ordering::SeqCst);
}

// vim: ts=4 sw=4 expandtab
