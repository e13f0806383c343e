// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! SIE-200 memory protection controllers
//!
//! The block lookup tables are programmed by the boot loader. The SPM only
//! enables and acknowledges the violation interrupt.

use crate::armv8m::registers::{read_reg, write_reg};

/// Interrupt status
const MPC_INT_STAT: u32 = 0x20;
/// Interrupt clear
const MPC_INT_CLEAR: u32 = 0x24;
/// Interrupt enable
const MPC_INT_EN: u32 = 0x28;

const MPC_INT_BIT: u32 = 1 << 0;

/// One SIE-200 MPC instance
pub struct Sie200Mpc {
    base: u32,
}

impl Sie200Mpc {
    /// Driver for the MPC at `base`
    #[must_use]
    pub const fn new(base: u32) -> Self {
        Self { base }
    }

    /// Enable the violation interrupt
    pub fn enable_interrupt(&mut self) {
        // SAFETY: INT_EN only gates interrupt delivery for this MPC.
        unsafe { write_reg(self.base + MPC_INT_EN, MPC_INT_BIT) };
    }

    /// Acknowledge a violation
    pub fn clear_interrupt(&mut self) {
        // SAFETY: INT_CLEAR is write-one-to-clear.
        unsafe { write_reg(self.base + MPC_INT_CLEAR, MPC_INT_BIT) };
    }

    /// Check whether a violation is latched
    #[must_use]
    pub fn interrupt_raised(&self) -> bool {
        // SAFETY: INT_STAT is read-only.
        unsafe { read_reg(self.base + MPC_INT_STAT) & MPC_INT_BIT != 0 }
    }
}
