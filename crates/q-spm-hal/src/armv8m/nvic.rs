// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! NVIC driver for the secure state
//!
//! Besides enable, pending and priority control, the secure NVIC owns the
//! ITNS (Interrupt Target Non-secure) registers that decide which world a
//! line is delivered to.

use q_spm_common::{IrqLine, IrqTargetState};

use super::registers::{read_reg, write_reg, write_reg8};
use crate::error::{HalError, HalResult};
use crate::traits::NvicInterface;

/// Interrupt Set-Enable Registers
const ISER_BASE: u32 = 0xE000_E100;
/// Interrupt Clear-Enable Registers
const ICER_BASE: u32 = 0xE000_E180;
/// Interrupt Clear-Pending Registers
const ICPR_BASE: u32 = 0xE000_E280;
/// Interrupt Target Non-secure Registers
const ITNS_BASE: u32 = 0xE000_E380;
/// Interrupt Priority Registers (byte addressable)
const IPR_BASE: u32 = 0xE000_E400;

/// Maximum external lines on ARMv8-M mainline
pub const MAX_IRQS: u16 = 480;

/// Shift an 8-bit priority down to the implemented width
///
/// The hardware only implements the top `prio_bits` bits of each priority
/// byte, so the value is right-aligned before being written.
#[must_use]
pub const fn quantize_priority(priority: u8, prio_bits: u8) -> u8 {
    if prio_bits >= 8 {
        priority
    } else {
        priority >> (8 - prio_bits)
    }
}

/// Left-align a quantized priority into the IPR byte
#[must_use]
pub const fn ipr_byte(quantized: u8, prio_bits: u8) -> u8 {
    if prio_bits >= 8 {
        quantized
    } else {
        quantized << (8 - prio_bits)
    }
}

/// Secure NVIC driver
pub struct Nvic {
    num_lines: u16,
    prio_bits: u8,
}

impl Nvic {
    /// Create a driver for `num_lines` external lines
    #[must_use]
    pub const fn new(num_lines: u16, prio_bits: u8) -> Self {
        Self {
            num_lines: if num_lines > MAX_IRQS { MAX_IRQS } else { num_lines },
            prio_bits,
        }
    }

    fn check(&self, line: IrqLine) -> HalResult<()> {
        if line.0 >= self.num_lines {
            return Err(HalError::InvalidIrqLine);
        }
        Ok(())
    }

    #[allow(clippy::cast_possible_truncation)]
    fn reg(base: u32, line: IrqLine) -> u32 {
        base + (line.word() as u32) * 4
    }
}

impl NvicInterface for Nvic {
    fn nvic_prio_bits(&self) -> u8 {
        self.prio_bits
    }

    fn nvic_set_target_state(&mut self, line: IrqLine, state: IrqTargetState) -> HalResult<IrqTargetState> {
        self.check(line)?;
        let addr = Self::reg(ITNS_BASE, line);
        // SAFETY: ITNS is only writable from the secure state, which is where
        // this driver runs. The line was bounds-checked above.
        let itns = unsafe {
            let current = read_reg(addr);
            let next = match state {
                IrqTargetState::Secure => current & !line.bit(),
                IrqTargetState::NonSecure => current | line.bit(),
            };
            write_reg(addr, next);
            read_reg(addr)
        };
        super::dsb();
        super::isb();
        Ok(IrqTargetState::from_itns(itns & line.bit() != 0))
    }

    fn nvic_enable_irq(&mut self, line: IrqLine) -> HalResult<()> {
        self.check(line)?;
        // SAFETY: ISER is write-one-to-set; other lines are unaffected.
        unsafe { write_reg(Self::reg(ISER_BASE, line), line.bit()) };
        Ok(())
    }

    fn nvic_disable_irq(&mut self, line: IrqLine) -> HalResult<()> {
        self.check(line)?;
        // SAFETY: ICER is write-one-to-clear; other lines are unaffected.
        unsafe { write_reg(Self::reg(ICER_BASE, line), line.bit()) };
        super::dsb();
        super::isb();
        Ok(())
    }

    fn nvic_clear_pending_irq(&mut self, line: IrqLine) -> HalResult<()> {
        self.check(line)?;
        // SAFETY: ICPR is write-one-to-clear; other lines are unaffected.
        unsafe { write_reg(Self::reg(ICPR_BASE, line), line.bit()) };
        Ok(())
    }

    fn nvic_set_priority(&mut self, line: IrqLine, quantized: u8) -> HalResult<()> {
        self.check(line)?;
        // SAFETY: IPR is byte addressable, one byte per line.
        unsafe { write_reg8(IPR_BASE + u32::from(line.0), ipr_byte(quantized, self.prio_bits)) };
        Ok(())
    }
}
