// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! SSE-200 peripheral protection controllers
//!
//! All PPCs of the subsystem are programmed through the secure privilege
//! control block (SPCTRL). Each bank has one non-secure access register
//! (bit set = non-secure) and one secure unprivileged access register
//! (bit set = unprivileged secure code may access).

use super::addresses::SPCTRL_BASE;
use crate::armv8m::registers::{modify_reg, write_reg};
use crate::error::{HalError, HalResult};
use crate::platform::PpcBank;

// =============================================================================
// SPCTRL Register Offsets
// =============================================================================

/// Secure PPC interrupt status
const SECPPCINTSTAT: u32 = 0x20;
/// Secure PPC interrupt clear
const SECPPCINTCLR: u32 = 0x24;
/// Secure PPC interrupt enable
const SECPPCINTEN: u32 = 0x28;

/// SECPPCINT bits for APB PPC0/1, APB expansion PPC0-3 and AHB expansion PPC0-3
pub const PPC_INT_MASK: u32 = 0b11 | (0xF << 4) | (0xF << 20);

/// SPCTRL-based PPC driver
pub struct Spctrl {
    base: u32,
}

impl Spctrl {
    /// Driver for the secure alias of SPCTRL
    #[must_use]
    pub const fn new() -> Self {
        Self { base: SPCTRL_BASE }
    }

    fn bit(loc: u8) -> HalResult<u32> {
        if loc >= 32 {
            return Err(HalError::InvalidPpcLocation);
        }
        Ok(1 << loc)
    }

    /// Make a slot secure-only
    pub fn configure_to_secure(&mut self, bank: PpcBank, loc: u8) -> HalResult<()> {
        let bit = Self::bit(loc)?;
        // SAFETY: The NS access register only gates the addressed slot; loc
        // was bounds-checked.
        unsafe { modify_reg(self.base + bank.ns_offset(), |v| v & !bit) };
        Ok(())
    }

    /// Make a slot non-secure accessible
    pub fn configure_to_non_secure(&mut self, bank: PpcBank, loc: u8) -> HalResult<()> {
        let bit = Self::bit(loc)?;
        // SAFETY: See `configure_to_secure`.
        unsafe { modify_reg(self.base + bank.ns_offset(), |v| v | bit) };
        Ok(())
    }

    /// Admit secure unprivileged access to a slot
    pub fn en_secure_unpriv(&mut self, bank: PpcBank, loc: u8) -> HalResult<()> {
        let bit = Self::bit(loc)?;
        // SAFETY: The SP access register only gates the addressed slot.
        unsafe { modify_reg(self.base + bank.sp_offset(), |v| v | bit) };
        Ok(())
    }

    /// Restrict a slot to secure privileged access
    pub fn clr_secure_unpriv(&mut self, bank: PpcBank, loc: u8) -> HalResult<()> {
        let bit = Self::bit(loc)?;
        // SAFETY: See `en_secure_unpriv`.
        unsafe { modify_reg(self.base + bank.sp_offset(), |v| v & !bit) };
        Ok(())
    }

    /// Enable violation interrupts on every bank
    pub fn enable_irq(&mut self) {
        // SAFETY: SECPPCINTEN only routes PPC violations to the PPC line.
        unsafe { write_reg(self.base + SECPPCINTEN, PPC_INT_MASK) };
    }

    /// Clear every pending violation flag
    pub fn clear_irq(&mut self) {
        // SAFETY: SECPPCINTCLR is write-one-to-clear.
        unsafe { write_reg(self.base + SECPPCINTCLR, PPC_INT_MASK) };
    }

    /// Raw violation status
    #[must_use]
    pub fn irq_status(&self) -> u32 {
        // SAFETY: SECPPCINTSTAT is read-only.
        unsafe { crate::armv8m::registers::read_reg(self.base + SECPPCINTSTAT) }
    }
}

impl Default for Spctrl {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int_mask() {
        assert_eq!(PPC_INT_MASK, 0x00F0_00F3);
    }

    #[test]
    fn test_loc_bounds() {
        assert_eq!(Spctrl::bit(31), Ok(1 << 31));
        assert_eq!(Spctrl::bit(32), Err(HalError::InvalidPpcLocation));
    }
}
