// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Interrupt routing and fault surface
//!
//! Routing decides which security state handles each interrupt line and
//! at which priority. The fault surface handles MPC and PPC violation
//! interrupts: both acknowledge the controller, clear the pending line,
//! log a diagnostic and end in the access-violation handler, which never
//! returns.
//!
//! The platform boot hooks are exposed here as verified calls.

use q_spm_common::config::DebugAuth;
use q_spm_common::log::LogBuffer;
use q_spm_common::{log_error, Error, IrqLine, IrqTargetState, Result};
use q_spm_hal::armv8m::nvic::quantize_priority;
use q_spm_hal::{BootInterface, MpcInterface, NvicInterface, PpcInterface};

use crate::fih::FihPolicy;
use crate::ldinf::IrqInfo;
use crate::panic::{access_violation, spm_panic};

// =============================================================================
// Routing
// =============================================================================

/// Set the target state of `line`
///
/// Returns the state read back from hardware, which differs from `state`
/// when the line cannot be retargeted.
pub fn set_irq_target_state<H: NvicInterface>(
    hw: &mut H,
    line: IrqLine,
    state: IrqTargetState,
) -> Result<IrqTargetState> {
    Ok(hw.nvic_set_target_state(line, state)?)
}

/// Set the priority of a secure line
///
/// `priority` uses the full 8-bit scale and is quantized to the
/// implemented priority bits.
pub fn set_secure_irq_priority<H: NvicInterface>(hw: &mut H, line: IrqLine, priority: u8) -> Result<()> {
    let quantized = quantize_priority(priority, hw.nvic_prio_bits());
    Ok(hw.nvic_set_priority(line, quantized)?)
}

/// Clear the pending state of `line`
pub fn clear_pending_irq<H: NvicInterface>(hw: &mut H, line: IrqLine) -> Result<()> {
    Ok(hw.nvic_clear_pending_irq(line)?)
}

/// Enable `line`
pub fn enable_irq<H: NvicInterface>(hw: &mut H, line: IrqLine) -> Result<()> {
    Ok(hw.nvic_enable_irq(line)?)
}

/// Disable `line`
pub fn disable_irq<H: NvicInterface>(hw: &mut H, line: IrqLine) -> Result<()> {
    Ok(hw.nvic_disable_irq(line)?)
}

/// Route an interrupt owned by a partition to the secure state
///
/// The line is targeted secure, given its priority and cleared. It stays
/// disabled until the owning partition enables it.
pub fn route_partition_irq<H: NvicInterface>(hw: &mut H, irq: &IrqInfo) -> Result<IrqLine> {
    let line = irq.line().ok_or(Error::InvalidIrqLine)?;

    if set_irq_target_state(hw, line, IrqTargetState::Secure)? != IrqTargetState::Secure {
        return Err(Error::IrqRetargetRefused);
    }
    set_secure_irq_priority(hw, line, irq.priority)?;
    clear_pending_irq(hw, line)?;

    Ok(line)
}

// =============================================================================
// Boot Hooks
// =============================================================================

/// Enable the configurable fault exceptions
pub fn enable_fault_handlers<F: FihPolicy, H: BootInterface>(hw: &mut H) -> F::Rc {
    F::call(|| hw.enable_fault_handlers())
}

/// Restrict system reset requests to the secure state
pub fn system_reset_cfg<F: FihPolicy, H: BootInterface>(hw: &mut H) -> F::Rc {
    F::call(|| hw.system_reset_cfg())
}

/// Apply the debug authentication policy
pub fn init_debug<F: FihPolicy, H: BootInterface>(hw: &mut H, auth: DebugAuth) -> F::Rc {
    F::call(|| hw.init_debug(auth))
}

/// Route every line to non-secure except the SPM's own fault lines
pub fn nvic_interrupt_target_state_cfg<F: FihPolicy, H: BootInterface>(hw: &mut H) -> F::Rc {
    F::call(|| hw.nvic_interrupt_target_state_cfg())
}

/// Enable the MPC and PPC violation interrupts
pub fn nvic_interrupt_enable<F: FihPolicy, H: BootInterface>(hw: &mut H) -> F::Rc {
    F::call(|| hw.nvic_interrupt_enable())
}

/// Read back the isolation hardware state
///
/// Under a hardened policy a failed check is fatal.
pub fn verify_isolation_hw<F: FihPolicy, H: BootInterface>(hw: &mut H) -> F::Rc {
    let rc = F::call(|| hw.verify_isolation_hw());
    if F::HARDENED && !F::is_success(rc) {
        spm_panic(Error::IsolationSelfCheckFailed);
    }
    rc
}

// =============================================================================
// Fault Surface
// =============================================================================

/// MPC violation handler
pub fn mpc_fault_handler<H>(hw: &mut H, log: &mut LogBuffer) -> !
where
    H: MpcInterface + NvicInterface,
{
    hw.mpc_clear_interrupt();
    let line = hw.mpc_irq_line();
    if let Err(err) = hw.nvic_clear_pending_irq(line) {
        log_error!(log, "fault", "MPC irq {}: clear pending failed: {}", line.0, err);
    }

    log_error!(log, "fault", "Oops... MPC fault!!!");
    access_violation(Error::MpcFault)
}

/// PPC violation handler
pub fn ppc_fault_handler<H>(hw: &mut H, log: &mut LogBuffer) -> !
where
    H: PpcInterface + NvicInterface,
{
    hw.ppc_clear_irq();
    let line = hw.ppc_irq_line();
    if let Err(err) = hw.nvic_clear_pending_irq(line) {
        log_error!(log, "fault", "PPC irq {}: clear pending failed: {}", line.0, err);
    }

    log_error!(log, "fault", "Oops... PPC fault!!!");
    access_violation(Error::PpcFault)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fih::{Hardened, PlatStatus, Unhardened};
    use q_spm_common::Signals;
    use q_spm_hal::sim::{SimEvent, SimPlatform};

    #[test]
    fn test_target_state_idempotent() {
        let mut sim = SimPlatform::new();
        let line = IrqLine(40);
        let first = set_irq_target_state(&mut sim, line, IrqTargetState::Secure);
        let second = set_irq_target_state(&mut sim, line, IrqTargetState::Secure);
        assert_eq!(first, Ok(IrqTargetState::Secure));
        assert_eq!(first, second);
    }

    #[test]
    fn test_locked_line_reports_actual_state() {
        let line = IrqLine(41);
        let mut sim = SimPlatform::new().with_locked_non_secure(line);
        assert_eq!(
            set_irq_target_state(&mut sim, line, IrqTargetState::Secure),
            Ok(IrqTargetState::NonSecure)
        );
    }

    #[test]
    fn test_priority_quantized() {
        let mut sim = SimPlatform::new();
        let line = IrqLine(12);
        set_secure_irq_priority(&mut sim, line, 0xE0).unwrap();
        assert!(sim.events().contains(&SimEvent::Priority(line, 0x7)));
    }

    #[test]
    fn test_route_refused() {
        let line = IrqLine(20);
        let mut sim = SimPlatform::new().with_locked_non_secure(line);
        let irq = IrqInfo { source: 20, signal: Signals::from_bits(1 << 4), priority: 0x40 };
        assert_eq!(route_partition_irq(&mut sim, &irq), Err(Error::IrqRetargetRefused));
    }

    #[test]
    fn test_route_out_of_range() {
        let mut sim = SimPlatform::new();
        let irq = IrqInfo { source: 200, signal: Signals::EMPTY, priority: 0 };
        assert_eq!(route_partition_irq(&mut sim, &irq), Err(Error::InvalidIrqLine));
    }

    #[test]
    fn test_hooks_under_both_policies() {
        let mut sim = SimPlatform::new();
        assert_eq!(enable_fault_handlers::<Unhardened, _>(&mut sim), PlatStatus::Success);
        assert!(Hardened::is_success(system_reset_cfg::<Hardened, _>(&mut sim)));

        sim.faults.boot_hooks = true;
        assert_eq!(init_debug::<Unhardened, _>(&mut sim, DebugAuth::Full), PlatStatus::SystemError);
        assert!(!Hardened::is_success(nvic_interrupt_enable::<Hardened, _>(&mut sim)));
    }

    #[test]
    fn test_self_check_reported_when_unhardened() {
        let mut sim = SimPlatform::new();
        sim.faults.verify_isolation = true;
        assert_eq!(verify_isolation_hw::<Unhardened, _>(&mut sim), PlatStatus::SystemError);
    }

    #[test]
    #[should_panic(expected = "isolation hardware self-check failed")]
    fn test_self_check_fatal_when_hardened() {
        let mut sim = SimPlatform::new();
        sim.faults.verify_isolation = true;
        let _ = verify_isolation_hw::<Hardened, _>(&mut sim);
    }
}
