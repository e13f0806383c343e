// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Fatal path for the SPM
//!
//! Every condition that means the isolation model cannot be trusted ends
//! here. There is no unwinding on the target:
//! - Interrupts are masked
//! - Fault registers and the reason code are captured
//! - A system reset is requested
//!
//! On the host the same entry point raises a Rust panic carrying the
//! formatted reason, so tests can observe fatal outcomes.

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use q_spm_common::Error;

// =============================================================================
// Panic State
// =============================================================================

/// Magic value marking a valid [`PanicState`]
pub const PANIC_MAGIC: u32 = 0x5350_4D21;

/// Reason code of the most recent fatal error (0 when none)
static LAST_REASON: AtomicU32 = AtomicU32::new(0);

/// Set once an isolation violation has been reported
static VIOLATION: AtomicBool = AtomicBool::new(false);

/// SCB register addresses (ARM Cortex-M)
#[cfg(target_arch = "arm")]
mod scb {
    /// Configurable Fault Status Register
    pub const CFSR: u32 = 0xE000_ED28;
    /// Hard Fault Status Register
    pub const HFSR: u32 = 0xE000_ED2C;
    /// Application Interrupt and Reset Control Register
    pub const AIRCR: u32 = 0xE000_ED0C;
}

/// Captured state for post-mortem debugging
#[derive(Clone, Copy, Debug)]
#[repr(C)]
pub struct PanicState {
    /// [`PANIC_MAGIC`] if valid
    pub magic: u32,
    /// Error code of the fatal reason
    pub reason: u32,
    /// Stack pointer at time of panic
    pub sp: u32,
    /// Link register (return address)
    pub lr: u32,
    /// Configurable Fault Status Register
    pub cfsr: u32,
    /// Hard Fault Status Register
    pub hfsr: u32,
}

impl PanicState {
    /// Create an empty (invalid) panic state
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            magic: 0,
            reason: 0,
            sp: 0,
            lr: 0,
            cfsr: 0,
            hfsr: 0,
        }
    }

    /// Check if the state was written by [`spm_panic`]
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.magic == PANIC_MAGIC
    }
}

/// Last captured state, kept in RAM for an attached debugger
#[cfg(target_arch = "arm")]
static mut PANIC_RECORD: PanicState = PanicState::empty();

/// Capture fault registers and CPU state
#[cfg(target_arch = "arm")]
fn capture_panic_state(reason: Error) -> PanicState {
    let sp: u32;
    let lr: u32;
    // SAFETY: Reading SP and LR has no side effects.
    unsafe {
        core::arch::asm!("mov {}, sp", out(reg) sp, options(nomem, nostack));
        core::arch::asm!("mov {}, lr", out(reg) lr, options(nomem, nostack));
    }

    // SAFETY: CFSR and HFSR are architecturally defined SCB registers;
    // reading them has no side effects.
    let cfsr = unsafe { core::ptr::read_volatile(scb::CFSR as *const u32) };
    let hfsr = unsafe { core::ptr::read_volatile(scb::HFSR as *const u32) };

    PanicState {
        magic: PANIC_MAGIC,
        reason: u32::from(reason.code()),
        sp,
        lr,
        cfsr,
        hfsr,
    }
}

/// Capture panic state on the host: only the reason is meaningful
#[cfg(not(target_arch = "arm"))]
fn capture_panic_state(reason: Error) -> PanicState {
    PanicState {
        magic: PANIC_MAGIC,
        reason: u32::from(reason.code()),
        ..PanicState::empty()
    }
}

/// Trigger a system reset via SCB AIRCR
#[cfg(target_arch = "arm")]
fn trigger_system_reset() -> ! {
    // AIRCR key (0x05FA) + SYSRESETREQ (bit 2)
    const AIRCR_RESET: u32 = 0x05FA_0004;
    // SAFETY: AIRCR with VECTKEY and SYSRESETREQ requests a reset. The DSBs
    // drain outstanding writes, including the panic record.
    unsafe {
        core::arch::asm!("dsb sy", options(nomem, nostack));
        core::ptr::write_volatile(scb::AIRCR as *mut u32, AIRCR_RESET);
        core::arch::asm!("dsb sy", options(nomem, nostack));
    }
    loop {
        core::hint::spin_loop();
    }
}

// =============================================================================
// Public API
// =============================================================================

/// Halt the SPM for good
///
/// Never returns. On the target the system is reset; on the host this
/// panics with `"spm panic: <reason>"`.
#[cfg(target_arch = "arm")]
pub fn spm_panic(reason: Error) -> ! {
    // SAFETY: CPSID I masks interrupts so no handler observes half-built
    // isolation state. Always valid in privileged mode.
    unsafe {
        core::arch::asm!("cpsid i", options(nomem, nostack));
    }

    LAST_REASON.store(u32::from(reason.code()), Ordering::SeqCst);
    let state = capture_panic_state(reason);
    // SAFETY: Interrupts are masked and this path never returns, so there
    // is no concurrent access to the record.
    unsafe {
        core::ptr::write_volatile(core::ptr::addr_of_mut!(PANIC_RECORD), state);
    }

    trigger_system_reset()
}

/// Halt the SPM for good
///
/// Never returns. On the target the system is reset; on the host this
/// panics with `"spm panic: <reason>"`.
#[cfg(not(target_arch = "arm"))]
pub fn spm_panic(reason: Error) -> ! {
    LAST_REASON.store(u32::from(reason.code()), Ordering::SeqCst);
    let state = capture_panic_state(reason);
    panic!("spm panic: {} (reason {:#06x})", reason, state.reason)
}

/// Terminal handler for isolation violations
///
/// Latches the violation and takes the fatal path.
pub fn access_violation(reason: Error) -> ! {
    VIOLATION.store(true, Ordering::SeqCst);
    spm_panic(reason)
}

/// Check whether an isolation violation was reported
#[must_use]
pub fn violation_latched() -> bool {
    VIOLATION.load(Ordering::SeqCst)
}

/// Code of the most recent fatal reason, 0 if none
#[must_use]
pub fn last_reason_code() -> u32 {
    LAST_REASON.load(Ordering::SeqCst)
}

/// Last captured panic state
#[cfg(target_arch = "arm")]
#[must_use]
pub fn last_panic_state() -> PanicState {
    // SAFETY: Only written on the fatal path with interrupts masked.
    unsafe { core::ptr::read_volatile(core::ptr::addr_of!(PANIC_RECORD)) }
}

/// Panic handler for bare-metal images
#[cfg(all(target_os = "none", feature = "panic-handler"))]
#[panic_handler]
fn panic(_info: &core::panic::PanicInfo) -> ! {
    spm_panic(Error::InternalError)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panic_state_size() {
        assert_eq!(core::mem::size_of::<PanicState>(), 24);
    }

    #[test]
    fn test_empty_state_invalid() {
        assert!(!PanicState::empty().is_valid());
    }

    #[test]
    fn test_capture_panic_state() {
        let state = capture_panic_state(Error::BadPartitionMagic);
        assert!(state.is_valid());
        assert_eq!(state.reason, 0x0104);
        assert_eq!(state.sp, 0);
    }

    #[test]
    #[should_panic(expected = "spm panic: [0x0107] partition pool exhausted")]
    fn test_spm_panic_host() {
        spm_panic(Error::PartitionPoolExhausted);
    }

    #[test]
    #[should_panic(expected = "MPC fault")]
    fn test_access_violation_latches() {
        access_violation(Error::MpcFault);
    }
}
