// -*- coding: utf-8 -*-
// Copyright (C) 2025 Michael Büsch <m@bues.ch>
// SPDX-License-Identifier: Apache-2.0 OR MIT

use core::{cell::UnsafeCell, mem::MaybeUninit, ops::Deref};
use triacdim::MainCtx;

/// Main context initialization marker.
///
/// This marker does not have a pub constructor.
/// It is only created by [main_ctx_with_init].
pub struct MainInitCtx(());

/// Create the [MainCtx] and initialize the static variables before that.
///
/// # SAFETY
///
/// This may only be called once from `main()` with interrupts disabled.
#[inline(always)]
pub unsafe fn main_ctx_with_init<F: FnOnce(&MainInitCtx)>(f: F) -> MainCtx {
    f(&MainInitCtx(()));
    // SAFETY: We are in main() and this is the only MainCtx.
    unsafe { MainCtx::new() }
}

/// Lazy initialization of static variables.
pub struct LazyMainInit<T>(UnsafeCell<MaybeUninit<T>>);

impl<T> LazyMainInit<T> {
    /// # SAFETY
    ///
    /// It must be ensured that the returned instance is initialized
    /// with a call to [Self::init] during construction of the [MainCtx].
    /// See [main_ctx_with_init].
    ///
    /// Using this object in any way before initializing it will
    /// result in Undefined Behavior.
    #[inline(always)]
    pub const unsafe fn uninit() -> Self {
        Self(UnsafeCell::new(MaybeUninit::uninit()))
    }

    #[inline(always)]
    pub fn init(&self, _m: &MainInitCtx, inner: T) {
        // SAFETY: Interrupts are still disabled. Nobody else accesses the cell.
        unsafe { *self.0.get() = MaybeUninit::new(inner) };
    }
}

impl<T> Deref for LazyMainInit<T> {
    type Target = T;

    #[inline(always)]
    fn deref(&self) -> &T {
        // SAFETY: the `Self::uninit` safety contract ensures that `Self::init` is called before us.
        unsafe { (*self.0.get()).assume_init_ref() }
    }
}

// SAFETY: The content is only written once before interrupts are enabled.
//         After that it is only accessed through shared references.
unsafe impl<T> Sync for LazyMainInit<T> {}

/// Cheaper Option::unwrap() alternative.
///
/// This is cheaper, because it doesn't call into the panic unwind path.
/// Therefore, it does not impose caller-saves overhead onto the calling function.
#[inline(always)]
pub fn unwrap_option<T>(value: Option<T>) -> T {
    match value {
        Some(value) => value,
        None => reset_system(),
    }
}

/// Reset the system.
#[inline(always)]
#[allow(clippy::empty_loop)]
pub fn reset_system() -> ! {
    loop {
        // Wait for the watchdog timer to trigger and reset the system.
        // No interrupt handler pokes the watchdog.
    }
}

#[inline(always)]
#[panic_handler]
fn panic(_: &core::panic::PanicInfo) -> ! {
    reset_system();
}

// vim: ts=4 sw=4 expandtab
