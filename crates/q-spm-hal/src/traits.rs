// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! HAL trait definitions
//!
//! Every isolation-relevant hardware operation the SPM performs goes
//! through one of these traits. Methods are prefixed with the unit they
//! drive so a single platform type can implement all of them.

use q_spm_common::config::DebugAuth;
use q_spm_common::{IrqLine, IrqTargetState};

use crate::armv8m::mpu::MpuRegionConfig;
use crate::error::HalResult;
use crate::platform::{PlatformData, PpcBank};

/// ARMv8-M memory protection unit
pub trait MpuInterface {
    /// Number of implemented regions
    fn mpu_region_count(&self) -> u8;

    /// Turn the MPU off
    fn mpu_disable(&mut self) -> HalResult<()>;

    /// Turn the MPU on
    ///
    /// `privdef` gives privileged code the default memory map outside any
    /// region; `hfnmi` keeps the MPU active in HardFault and NMI handlers.
    fn mpu_enable(&mut self, privdef: bool, hfnmi: bool) -> HalResult<()>;

    /// Program and enable one region
    fn mpu_region_enable(&mut self, config: &MpuRegionConfig) -> HalResult<()>;

    /// Disable one region
    fn mpu_region_disable(&mut self, region: u8) -> HalResult<()>;
}

/// Peripheral protection controller
pub trait PpcInterface {
    /// Make a peripheral secure-only
    fn ppc_configure_to_secure(&mut self, bank: PpcBank, loc: u8) -> HalResult<()>;

    /// Make a peripheral non-secure accessible
    fn ppc_configure_to_non_secure(&mut self, bank: PpcBank, loc: u8) -> HalResult<()>;

    /// Let secure unprivileged code reach a peripheral
    fn ppc_en_secure_unpriv(&mut self, bank: PpcBank, loc: u8) -> HalResult<()>;

    /// Restrict a peripheral to secure privileged code
    fn ppc_clr_secure_unpriv(&mut self, bank: PpcBank, loc: u8) -> HalResult<()>;

    /// Clear the PPC violation interrupt flag
    fn ppc_clear_irq(&mut self);

    /// Interrupt line the PPC raises on a violation
    fn ppc_irq_line(&self) -> IrqLine;
}

/// Memory protection controller
///
/// The SPM never reprograms MPC block tables; it only acknowledges
/// violations.
pub trait MpcInterface {
    /// Clear the MPC violation interrupt flag
    fn mpc_clear_interrupt(&mut self);

    /// Interrupt line the MPC raises on a violation
    fn mpc_irq_line(&self) -> IrqLine;
}

/// Nested vectored interrupt controller
pub trait NvicInterface {
    /// Implemented priority bits
    fn nvic_prio_bits(&self) -> u8;

    /// Route a line to a security state
    ///
    /// Returns the state the hardware reports after the write, which may
    /// differ from the request when the line is not retargetable.
    fn nvic_set_target_state(&mut self, line: IrqLine, state: IrqTargetState) -> HalResult<IrqTargetState>;

    /// Enable a line
    fn nvic_enable_irq(&mut self, line: IrqLine) -> HalResult<()>;

    /// Disable a line
    fn nvic_disable_irq(&mut self, line: IrqLine) -> HalResult<()>;

    /// Clear a pending line
    fn nvic_clear_pending_irq(&mut self, line: IrqLine) -> HalResult<()>;

    /// Write an already-quantized priority
    fn nvic_set_priority(&mut self, line: IrqLine, quantized: u8) -> HalResult<()>;
}

/// Platform boot hooks and non-secure handoff
pub trait BootInterface {
    /// Enable SecureFault, UsageFault, BusFault and MemManage
    fn enable_fault_handlers(&mut self) -> HalResult<()>;

    /// Restrict system reset requests to the secure state
    fn system_reset_cfg(&mut self) -> HalResult<()>;

    /// Apply the debug authentication policy
    fn init_debug(&mut self, auth: DebugAuth) -> HalResult<()>;

    /// Route the platform's default interrupt set
    fn nvic_interrupt_target_state_cfg(&mut self) -> HalResult<()>;

    /// Enable the isolation fault interrupts
    fn nvic_interrupt_enable(&mut self) -> HalResult<()>;

    /// Read back isolation registers and confirm they hold what was written
    fn verify_isolation_hw(&mut self) -> HalResult<()>;

    /// Resolve a platform-data reference carried by an MMIO asset
    fn platform_data(&self, reference: u32) -> Option<PlatformData>;

    /// Start of the non-secure image, which is also its vector table
    fn ns_code_start(&self) -> u32;

    /// Read a word of the non-secure image
    fn read_ns_word(&self, addr: u32) -> HalResult<u32>;
}

/// Everything the SPM needs from a platform
pub trait SpmPlatform: MpuInterface + PpcInterface + MpcInterface + NvicInterface + BootInterface {}

impl<T> SpmPlatform for T where T: MpuInterface + PpcInterface + MpcInterface + NvicInterface + BootInterface {}
