// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! ARMv8-M architecture support
//!
//! Drivers for the architecturally defined isolation blocks of a
//! Cortex-M33 secure image: the secure MPU and the NVIC target-state and
//! priority registers. Barrier helpers fall back to compiler fences off
//! target so the encoding logic can be tested on the host.

pub mod mpu;
pub mod nvic;

pub use mpu::{Armv8mMpu, MpuAccess, MpuRegionConfig, Shareability};
pub use nvic::Nvic;

/// Data Synchronization Barrier
#[inline]
pub fn dsb() {
    cfg_if::cfg_if! {
        if #[cfg(target_arch = "arm")] {
            // SAFETY: DSB SY only waits for outstanding memory transactions to
            // complete. It has no other architectural effect.
            unsafe {
                core::arch::asm!("dsb sy", options(nomem, nostack));
            }
        } else {
            core::sync::atomic::compiler_fence(core::sync::atomic::Ordering::SeqCst);
        }
    }
}

/// Instruction Synchronization Barrier
#[inline]
pub fn isb() {
    cfg_if::cfg_if! {
        if #[cfg(target_arch = "arm")] {
            // SAFETY: ISB SY flushes the pipeline so that subsequent fetches see
            // the new MPU configuration. It has no other effect.
            unsafe {
                core::arch::asm!("isb sy", options(nomem, nostack));
            }
        } else {
            core::sync::atomic::compiler_fence(core::sync::atomic::Ordering::SeqCst);
        }
    }
}

/// System control block registers used by the boot hooks
pub mod scb {
    /// System Handler Control and State Register
    pub const SHCSR: u32 = 0xE000_ED24;
    /// Application Interrupt and Reset Control Register
    pub const AIRCR: u32 = 0xE000_ED0C;
    /// Secure vector table offset register for the non-secure state
    pub const VTOR_NS: u32 = 0xE002_ED08;

    /// MemManage fault enable
    pub const SHCSR_MEMFAULTENA: u32 = 1 << 16;
    /// BusFault enable
    pub const SHCSR_BUSFAULTENA: u32 = 1 << 17;
    /// UsageFault enable
    pub const SHCSR_USGFAULTENA: u32 = 1 << 18;
    /// SecureFault enable
    pub const SHCSR_SECUREFAULTENA: u32 = 1 << 19;

    /// Key that must accompany every AIRCR write
    pub const AIRCR_VECTKEY: u32 = 0x05FA << 16;
    /// Mask of the key field
    pub const AIRCR_VECTKEY_MASK: u32 = 0xFFFF << 16;
    /// Only secure code may request a system reset
    pub const AIRCR_SYSRESETREQS: u32 = 1 << 3;
    /// Request a system reset
    pub const AIRCR_SYSRESETREQ: u32 = 1 << 2;
}

/// Memory-mapped register access utilities
pub(crate) mod registers {
    use core::ptr::{read_volatile, write_volatile};

    /// Read a 32-bit register
    ///
    /// # Safety
    /// The address must be a valid memory-mapped register.
    #[inline]
    pub unsafe fn read_reg(addr: u32) -> u32 {
        read_volatile(addr as *const u32)
    }

    /// Write a 32-bit register
    ///
    /// # Safety
    /// The address must be a valid memory-mapped register.
    #[inline]
    pub unsafe fn write_reg(addr: u32, value: u32) {
        write_volatile(addr as *mut u32, value);
    }

    /// Write an 8-bit register
    ///
    /// # Safety
    /// The address must be a valid byte-addressable register.
    #[inline]
    pub unsafe fn write_reg8(addr: u32, value: u8) {
        write_volatile(addr as *mut u8, value);
    }

    /// Modify a 32-bit register (read-modify-write)
    ///
    /// # Safety
    /// The address must be a valid memory-mapped register.
    #[inline]
    pub unsafe fn modify_reg<F>(addr: u32, f: F)
    where
        F: FnOnce(u32) -> u32,
    {
        let value = read_reg(addr);
        write_reg(addr, f(value));
    }
}
