// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Simulated isolation hardware
//!
//! [`SimPlatform`] models the register state the SPM programs on a
//! Cortex-M33 + SSE-200 system: MPU region table and control, PPC
//! secure/unprivileged bits, MPC/PPC interrupt flags, NVIC target state,
//! enable, pending and priority. Every mutating call is appended to an
//! event trace so tests can assert on ordering, and individual operations
//! can be made to fail to exercise the error paths.

use heapless::Vec;
use q_spm_common::config::DebugAuth;
use q_spm_common::{IrqLine, IrqTargetState};

use crate::armv8m::mpu::{MpuRegionConfig, ctrl_value};
use crate::armv8m::nvic::quantize_priority;
use crate::error::{HalError, HalResult};
use crate::platform::{PlatformData, PpcBank};
use crate::traits::{BootInterface, MpcInterface, MpuInterface, NvicInterface, PpcInterface};

/// Maximum MPU regions the model can hold
pub const SIM_MAX_REGIONS: usize = 16;

/// External interrupt lines modelled
pub const SIM_IRQ_LINES: u16 = 128;

const SIM_IRQ_WORDS: usize = (SIM_IRQ_LINES / 32) as usize;

/// Trace capacity; later events are dropped
pub const SIM_TRACE_LEN: usize = 256;

/// MPC violation line (matches AN521)
pub const SIM_MPC_IRQ: IrqLine = IrqLine(9);

/// PPC violation line (matches AN521)
pub const SIM_PPC_IRQ: IrqLine = IrqLine(10);

/// Default start of the simulated non-secure image
pub const SIM_NS_CODE_START: u32 = 0x0020_0000;

/// One observable hardware operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimEvent {
    /// MPU turned off
    MpuDisable,
    /// MPU turned on
    MpuEnable {
        /// PRIVDEFENA requested
        privdef: bool,
        /// HFNMIENA requested
        hfnmi: bool,
    },
    /// Region programmed and enabled
    MpuRegionEnable(u8),
    /// Region disabled
    MpuRegionDisable(u8),
    /// PPC slot made secure-only
    PpcSecure(PpcBank, u8),
    /// PPC slot made non-secure accessible
    PpcNonSecure(PpcBank, u8),
    /// Secure unprivileged access granted
    PpcUnprivEnabled(PpcBank, u8),
    /// Secure unprivileged access removed
    PpcUnprivCleared(PpcBank, u8),
    /// PPC interrupt flag cleared
    PpcIrqCleared,
    /// MPC interrupt flag cleared
    MpcIrqCleared,
    /// Line target state written
    TargetState(IrqLine, IrqTargetState),
    /// Line enabled
    IrqEnabled(IrqLine),
    /// Line disabled
    IrqDisabled(IrqLine),
    /// Line pending bit cleared
    PendingCleared(IrqLine),
    /// Line priority written (quantized value)
    Priority(IrqLine, u8),
    /// Fault exceptions enabled
    FaultHandlersEnabled,
    /// Reset request restricted to secure
    SystemResetConfigured,
    /// Debug policy applied
    DebugInitialized(DebugAuth),
    /// Default interrupt routing applied
    DefaultTargetsRouted,
    /// Isolation fault interrupts enabled
    FaultIrqsEnabled,
    /// Isolation readback performed
    IsolationVerified,
}

/// Operations that can be forced to fail
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimFaults {
    /// `mpu_disable` fails
    pub mpu_disable: bool,
    /// `mpu_region_enable` fails
    pub mpu_region_enable: bool,
    /// `mpu_enable` fails
    pub mpu_enable: bool,
    /// Every PPC configuration call fails
    pub ppc: bool,
    /// `verify_isolation_hw` fails
    pub verify_isolation: bool,
    /// Every boot hook except the isolation readback fails
    pub boot_hooks: bool,
    /// `nvic_clear_pending_irq` fails
    pub clear_pending: bool,
}

/// In-memory isolation hardware
pub struct SimPlatform {
    region_count: u8,
    regions: [Option<MpuRegionConfig>; SIM_MAX_REGIONS],
    mpu_ctrl: u32,
    ppc_ns: [u32; PpcBank::COUNT],
    ppc_sp: [u32; PpcBank::COUNT],
    ppc_irq: bool,
    mpc_irq: bool,
    itns: [u32; SIM_IRQ_WORDS],
    locked_ns: [u32; SIM_IRQ_WORDS],
    enabled: [u32; SIM_IRQ_WORDS],
    pending: [u32; SIM_IRQ_WORDS],
    priority: [u8; SIM_IRQ_LINES as usize],
    prio_bits: u8,
    debug: Option<DebugAuth>,
    platform_data: Vec<(u32, PlatformData), 16>,
    ns_code_start: u32,
    ns_words: Vec<(u32, u32), 16>,
    trace: Vec<SimEvent, SIM_TRACE_LEN>,
    /// Operations forced to fail
    pub faults: SimFaults,
}

impl SimPlatform {
    /// Create a model with 8 MPU regions and 3 priority bits
    #[must_use]
    pub fn new() -> Self {
        Self {
            region_count: 8,
            regions: [None; SIM_MAX_REGIONS],
            mpu_ctrl: 0,
            ppc_ns: [0; PpcBank::COUNT],
            ppc_sp: [0; PpcBank::COUNT],
            ppc_irq: false,
            mpc_irq: false,
            itns: [0; SIM_IRQ_WORDS],
            locked_ns: [0; SIM_IRQ_WORDS],
            enabled: [0; SIM_IRQ_WORDS],
            pending: [0; SIM_IRQ_WORDS],
            priority: [0; SIM_IRQ_LINES as usize],
            prio_bits: 3,
            debug: None,
            platform_data: Vec::new(),
            ns_code_start: SIM_NS_CODE_START,
            ns_words: Vec::new(),
            trace: Vec::new(),
            faults: SimFaults::default(),
        }
    }

    /// Register a platform-data record under `reference`
    #[must_use]
    pub fn with_platform_data(mut self, reference: u32, data: PlatformData) -> Self {
        let _ = self.platform_data.push((reference, data));
        self
    }

    /// Set the number of implemented MPU regions
    #[must_use]
    pub fn with_region_count(mut self, count: u8) -> Self {
        self.region_count = count.min(SIM_MAX_REGIONS as u8);
        self
    }

    /// Lay out a non-secure vector table at `start`
    #[must_use]
    pub fn with_ns_image(mut self, start: u32, msp: u32, reset: u32) -> Self {
        self.ns_code_start = start;
        self.ns_words.clear();
        let _ = self.ns_words.push((start, msp));
        let _ = self.ns_words.push((start + 4, reset));
        self
    }

    /// Make a line read back non-secure whatever is written
    #[must_use]
    pub fn with_locked_non_secure(mut self, line: IrqLine) -> Self {
        if line.0 < SIM_IRQ_LINES {
            self.locked_ns[line.word()] |= line.bit();
            self.itns[line.word()] |= line.bit();
        }
        self
    }

    fn record(&mut self, event: SimEvent) {
        let _ = self.trace.push(event);
    }

    fn check_line(line: IrqLine) -> HalResult<()> {
        if line.0 >= SIM_IRQ_LINES {
            return Err(HalError::InvalidIrqLine);
        }
        Ok(())
    }

    fn check_loc(loc: u8) -> HalResult<u32> {
        if loc >= 32 {
            return Err(HalError::InvalidPpcLocation);
        }
        Ok(1 << loc)
    }

    fn hook(&mut self, event: SimEvent) -> HalResult<()> {
        if self.faults.boot_hooks {
            return Err(HalError::HardwareFault);
        }
        self.record(event);
        Ok(())
    }

    // =========================================================================
    // Fault Injection
    // =========================================================================

    /// Trip the MPC: set its flag and pend its line
    pub fn raise_mpc_fault(&mut self) {
        self.mpc_irq = true;
        self.pending[SIM_MPC_IRQ.word()] |= SIM_MPC_IRQ.bit();
    }

    /// Trip the PPC: set its flag and pend its line
    pub fn raise_ppc_fault(&mut self) {
        self.ppc_irq = true;
        self.pending[SIM_PPC_IRQ.word()] |= SIM_PPC_IRQ.bit();
    }

    /// Pend an arbitrary line
    pub fn set_pending(&mut self, line: IrqLine) {
        if line.0 < SIM_IRQ_LINES {
            self.pending[line.word()] |= line.bit();
        }
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    /// Recorded operations, oldest first
    #[must_use]
    pub fn events(&self) -> &[SimEvent] {
        &self.trace
    }

    /// Number of recorded operations matching `pred`
    pub fn count(&self, pred: impl Fn(&SimEvent) -> bool) -> usize {
        self.trace.iter().filter(|e| pred(*e)).count()
    }

    /// Position of the first event equal to `event`
    #[must_use]
    pub fn position(&self, event: SimEvent) -> Option<usize> {
        self.trace.iter().position(|e| *e == event)
    }

    /// Region currently enabled at `region`
    #[must_use]
    pub fn region(&self, region: u8) -> Option<MpuRegionConfig> {
        self.regions.get(usize::from(region)).copied().flatten()
    }

    /// Raw MPU_CTRL value
    #[must_use]
    pub const fn mpu_ctrl(&self) -> u32 {
        self.mpu_ctrl
    }

    /// Check if the MPU is on
    #[must_use]
    pub const fn mpu_enabled(&self) -> bool {
        self.mpu_ctrl & 1 != 0
    }

    /// Check if a PPC slot is secure-only
    #[must_use]
    pub fn ppc_is_secure(&self, bank: PpcBank, loc: u8) -> bool {
        loc < 32 && self.ppc_ns[bank.index()] & (1 << loc) == 0
    }

    /// Check if a PPC slot admits secure unprivileged access
    #[must_use]
    pub fn ppc_unpriv_allowed(&self, bank: PpcBank, loc: u8) -> bool {
        loc < 32 && self.ppc_sp[bank.index()] & (1 << loc) != 0
    }

    /// Check if the PPC violation flag is raised
    #[must_use]
    pub const fn ppc_irq_raised(&self) -> bool {
        self.ppc_irq
    }

    /// Check if the MPC violation flag is raised
    #[must_use]
    pub const fn mpc_irq_raised(&self) -> bool {
        self.mpc_irq
    }

    /// Target state of a line as the hardware reports it
    #[must_use]
    pub fn target_state(&self, line: IrqLine) -> IrqTargetState {
        IrqTargetState::from_itns(self.itns[line.word()] & line.bit() != 0)
    }

    /// Check if a line is enabled
    #[must_use]
    pub fn is_enabled(&self, line: IrqLine) -> bool {
        self.enabled[line.word()] & line.bit() != 0
    }

    /// Check if a line is pending
    #[must_use]
    pub fn is_pending(&self, line: IrqLine) -> bool {
        self.pending[line.word()] & line.bit() != 0
    }

    /// Quantized priority of a line
    #[must_use]
    pub fn priority(&self, line: IrqLine) -> u8 {
        self.priority[line.index()]
    }

    /// Debug policy applied, if any
    #[must_use]
    pub const fn debug_policy(&self) -> Option<DebugAuth> {
        self.debug
    }
}

impl Default for SimPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl MpuInterface for SimPlatform {
    fn mpu_region_count(&self) -> u8 {
        self.region_count
    }

    fn mpu_disable(&mut self) -> HalResult<()> {
        if self.faults.mpu_disable {
            return Err(HalError::HardwareFault);
        }
        self.mpu_ctrl = 0;
        self.record(SimEvent::MpuDisable);
        Ok(())
    }

    fn mpu_enable(&mut self, privdef: bool, hfnmi: bool) -> HalResult<()> {
        if self.faults.mpu_enable {
            return Err(HalError::HardwareFault);
        }
        self.mpu_ctrl = ctrl_value(privdef, hfnmi);
        self.record(SimEvent::MpuEnable { privdef, hfnmi });
        Ok(())
    }

    fn mpu_region_enable(&mut self, config: &MpuRegionConfig) -> HalResult<()> {
        if self.faults.mpu_region_enable {
            return Err(HalError::HardwareFault);
        }
        config.validate(self.region_count)?;
        self.regions[usize::from(config.region)] = Some(*config);
        self.record(SimEvent::MpuRegionEnable(config.region));
        Ok(())
    }

    fn mpu_region_disable(&mut self, region: u8) -> HalResult<()> {
        if region >= self.region_count {
            return Err(HalError::InvalidRegion);
        }
        self.regions[usize::from(region)] = None;
        self.record(SimEvent::MpuRegionDisable(region));
        Ok(())
    }
}

impl PpcInterface for SimPlatform {
    fn ppc_configure_to_secure(&mut self, bank: PpcBank, loc: u8) -> HalResult<()> {
        if self.faults.ppc {
            return Err(HalError::HardwareFault);
        }
        let bit = Self::check_loc(loc)?;
        self.ppc_ns[bank.index()] &= !bit;
        self.record(SimEvent::PpcSecure(bank, loc));
        Ok(())
    }

    fn ppc_configure_to_non_secure(&mut self, bank: PpcBank, loc: u8) -> HalResult<()> {
        if self.faults.ppc {
            return Err(HalError::HardwareFault);
        }
        let bit = Self::check_loc(loc)?;
        self.ppc_ns[bank.index()] |= bit;
        self.record(SimEvent::PpcNonSecure(bank, loc));
        Ok(())
    }

    fn ppc_en_secure_unpriv(&mut self, bank: PpcBank, loc: u8) -> HalResult<()> {
        if self.faults.ppc {
            return Err(HalError::HardwareFault);
        }
        let bit = Self::check_loc(loc)?;
        self.ppc_sp[bank.index()] |= bit;
        self.record(SimEvent::PpcUnprivEnabled(bank, loc));
        Ok(())
    }

    fn ppc_clr_secure_unpriv(&mut self, bank: PpcBank, loc: u8) -> HalResult<()> {
        if self.faults.ppc {
            return Err(HalError::HardwareFault);
        }
        let bit = Self::check_loc(loc)?;
        self.ppc_sp[bank.index()] &= !bit;
        self.record(SimEvent::PpcUnprivCleared(bank, loc));
        Ok(())
    }

    fn ppc_clear_irq(&mut self) {
        self.ppc_irq = false;
        self.record(SimEvent::PpcIrqCleared);
    }

    fn ppc_irq_line(&self) -> IrqLine {
        SIM_PPC_IRQ
    }
}

impl MpcInterface for SimPlatform {
    fn mpc_clear_interrupt(&mut self) {
        self.mpc_irq = false;
        self.record(SimEvent::MpcIrqCleared);
    }

    fn mpc_irq_line(&self) -> IrqLine {
        SIM_MPC_IRQ
    }
}

impl NvicInterface for SimPlatform {
    fn nvic_prio_bits(&self) -> u8 {
        self.prio_bits
    }

    fn nvic_set_target_state(&mut self, line: IrqLine, state: IrqTargetState) -> HalResult<IrqTargetState> {
        Self::check_line(line)?;
        let word = line.word();
        match state {
            IrqTargetState::Secure => self.itns[word] &= !line.bit(),
            IrqTargetState::NonSecure => self.itns[word] |= line.bit(),
        }
        self.itns[word] |= self.locked_ns[word];
        self.record(SimEvent::TargetState(line, state));
        Ok(self.target_state(line))
    }

    fn nvic_enable_irq(&mut self, line: IrqLine) -> HalResult<()> {
        Self::check_line(line)?;
        self.enabled[line.word()] |= line.bit();
        self.record(SimEvent::IrqEnabled(line));
        Ok(())
    }

    fn nvic_disable_irq(&mut self, line: IrqLine) -> HalResult<()> {
        Self::check_line(line)?;
        self.enabled[line.word()] &= !line.bit();
        self.record(SimEvent::IrqDisabled(line));
        Ok(())
    }

    fn nvic_clear_pending_irq(&mut self, line: IrqLine) -> HalResult<()> {
        if self.faults.clear_pending {
            return Err(HalError::HardwareFault);
        }
        Self::check_line(line)?;
        self.pending[line.word()] &= !line.bit();
        self.record(SimEvent::PendingCleared(line));
        Ok(())
    }

    fn nvic_set_priority(&mut self, line: IrqLine, quantized: u8) -> HalResult<()> {
        Self::check_line(line)?;
        // Bits above the implemented width are not stored.
        let value = quantized & quantize_priority(0xFF, self.prio_bits);
        self.priority[line.index()] = value;
        self.record(SimEvent::Priority(line, value));
        Ok(())
    }
}

impl BootInterface for SimPlatform {
    fn enable_fault_handlers(&mut self) -> HalResult<()> {
        self.hook(SimEvent::FaultHandlersEnabled)
    }

    fn system_reset_cfg(&mut self) -> HalResult<()> {
        self.hook(SimEvent::SystemResetConfigured)
    }

    fn init_debug(&mut self, auth: DebugAuth) -> HalResult<()> {
        self.hook(SimEvent::DebugInitialized(auth))?;
        self.debug = Some(auth);
        Ok(())
    }

    fn nvic_interrupt_target_state_cfg(&mut self) -> HalResult<()> {
        self.hook(SimEvent::DefaultTargetsRouted)?;
        self.itns = [u32::MAX; SIM_IRQ_WORDS];
        for line in [SIM_MPC_IRQ, SIM_PPC_IRQ] {
            self.itns[line.word()] &= !line.bit();
        }
        for (word, locked) in self.itns.iter_mut().zip(self.locked_ns.iter()) {
            *word |= *locked;
        }
        Ok(())
    }

    fn nvic_interrupt_enable(&mut self) -> HalResult<()> {
        self.hook(SimEvent::FaultIrqsEnabled)?;
        for line in [SIM_MPC_IRQ, SIM_PPC_IRQ] {
            self.enabled[line.word()] |= line.bit();
        }
        Ok(())
    }

    fn verify_isolation_hw(&mut self) -> HalResult<()> {
        if self.faults.verify_isolation {
            return Err(HalError::VerifyFailed);
        }
        let any_region = self.regions.iter().any(Option::is_some);
        if any_region && !self.mpu_enabled() {
            return Err(HalError::VerifyFailed);
        }
        self.record(SimEvent::IsolationVerified);
        Ok(())
    }

    fn platform_data(&self, reference: u32) -> Option<PlatformData> {
        self.platform_data
            .iter()
            .find(|(r, _)| *r == reference)
            .map(|(_, d)| *d)
    }

    fn ns_code_start(&self) -> u32 {
        self.ns_code_start
    }

    fn read_ns_word(&self, addr: u32) -> HalResult<u32> {
        self.ns_words
            .iter()
            .find(|(a, _)| *a == addr)
            .map(|(_, w)| *w)
            .ok_or(HalError::InvalidParameter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locked_line_stays_non_secure() {
        let mut sim = SimPlatform::new().with_locked_non_secure(IrqLine(40));
        let state = sim.nvic_set_target_state(IrqLine(40), IrqTargetState::Secure);
        assert_eq!(state, Ok(IrqTargetState::NonSecure));
        let state = sim.nvic_set_target_state(IrqLine(41), IrqTargetState::Secure);
        assert_eq!(state, Ok(IrqTargetState::Secure));
    }

    #[test]
    fn test_default_routing_keeps_fault_lines_secure() {
        let mut sim = SimPlatform::new();
        assert_eq!(sim.nvic_interrupt_target_state_cfg(), Ok(()));
        assert_eq!(sim.target_state(SIM_MPC_IRQ), IrqTargetState::Secure);
        assert_eq!(sim.target_state(SIM_PPC_IRQ), IrqTargetState::Secure);
        assert_eq!(sim.target_state(IrqLine(20)), IrqTargetState::NonSecure);
    }

    #[test]
    fn test_priority_truncated_to_width() {
        let mut sim = SimPlatform::new();
        assert_eq!(sim.nvic_set_priority(IrqLine(3), 0xFF), Ok(()));
        assert_eq!(sim.priority(IrqLine(3)), 0x7);
    }

    #[test]
    fn test_region_validation_applies() {
        let mut sim = SimPlatform::new().with_region_count(4);
        let cfg = MpuRegionConfig::peripheral(5, 0x4000_0000, 0x4000_0FFF);
        assert_eq!(sim.mpu_region_enable(&cfg), Err(HalError::InvalidRegion));
        assert!(sim.events().is_empty());
    }
}
