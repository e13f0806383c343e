// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! SPM boot sequence
//!
//! ```text
//! Uninitialized -> TableLoading -> PartitionsLoaded
//!               -> IsolationConfigured -> Armed
//!
//! any state --(MPC/PPC fault)--> Violation
//! ```
//!
//! Everything runs on one thread before any partition executes. `Armed`
//! is the steady state; `Violation` is terminal.

use core::fmt;

use q_spm_common::log::LogBuffer;
use q_spm_common::{log_debug, log_error, log_info, Error, PartitionIndex, Result, SpmConfig};
use q_spm_hal::{BootInterface, MpcInterface, NvicInterface, PpcInterface, SpmPlatform};

use crate::fih::FihPolicy;
use crate::irq;
use crate::isolation::IsolationConfigurator;
use crate::ldinf::DescriptorTable;
use crate::load::StaticLoader;
use crate::panic::spm_panic;
use crate::partition::ServiceList;
use crate::stateless::StatelessTable;

/// Log module tag
const MODULE: &str = "spm";

// =============================================================================
// State Machine
// =============================================================================

/// SPM lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpmState {
    /// Nothing loaded
    Uninitialized,
    /// Walking the descriptor table
    TableLoading,
    /// All partitions and services loaded
    PartitionsLoaded,
    /// MPU and PPC programmed for every partition
    IsolationConfigured,
    /// Interrupts routed, boot hooks run
    Armed,
    /// Isolation violation reported
    Violation,
}

impl SpmState {
    /// Check whether `self -> to` is a legal transition
    #[must_use]
    pub const fn can_transition_to(self, to: Self) -> bool {
        matches!(
            (self, to),
            (Self::Uninitialized, Self::TableLoading)
                | (Self::TableLoading, Self::PartitionsLoaded)
                | (Self::PartitionsLoaded, Self::IsolationConfigured)
                | (Self::IsolationConfigured, Self::Armed)
        ) || (matches!(to, Self::Violation) && !matches!(self, Self::Violation))
    }

    /// Name for logs
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Uninitialized => "UNINITIALIZED",
            Self::TableLoading => "TABLE_LOADING",
            Self::PartitionsLoaded => "PARTITIONS_LOADED",
            Self::IsolationConfigured => "ISOLATION_CONFIGURED",
            Self::Armed => "ARMED",
            Self::Violation => "VIOLATION",
        }
    }
}

impl fmt::Display for SpmState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the non-secure image starts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NsEntry {
    /// Non-secure vector table
    pub vtor: u32,
    /// Initial non-secure main stack pointer
    pub msp: u32,
    /// Non-secure reset handler
    pub reset: u32,
}

// =============================================================================
// SPM
// =============================================================================

/// Secure partition manager core
///
/// Owns the loader, the service list and the isolation configurator. A
/// given instance boots at most once.
pub struct Spm<'t, const P: usize, const S: usize, const K: usize> {
    state: SpmState,
    loader: StaticLoader<'t, P, S, K>,
    services: ServiceList<P>,
    isolation: IsolationConfigurator,
    log: LogBuffer,
}

impl<'t, const P: usize, const S: usize, const K: usize> Spm<'t, P, S, K> {
    /// Create an SPM over `table`
    #[must_use]
    pub fn new(config: SpmConfig, table: DescriptorTable<'t>, stateless: StatelessTable<K>) -> Self {
        Self {
            state: SpmState::Uninitialized,
            loader: StaticLoader::new(table, config.framework_version, stateless),
            services: ServiceList::new(),
            isolation: IsolationConfigurator::new(config),
            log: LogBuffer::new(),
        }
    }

    /// Current state
    #[must_use]
    pub const fn state(&self) -> SpmState {
        self.state
    }

    /// Loader and the pools it built
    #[must_use]
    pub const fn loader(&self) -> &StaticLoader<'t, P, S, K> {
        &self.loader
    }

    /// Partition-spanning service list
    #[must_use]
    pub const fn services(&self) -> &ServiceList<P> {
        &self.services
    }

    /// Isolation configurator
    #[must_use]
    pub const fn isolation(&self) -> &IsolationConfigurator {
        &self.isolation
    }

    /// Boot trace
    #[must_use]
    pub const fn log(&self) -> &LogBuffer {
        &self.log
    }

    /// Mutable boot trace, e.g. to change the level
    pub fn log_mut(&mut self) -> &mut LogBuffer {
        &mut self.log
    }

    fn transition(&mut self, to: SpmState) {
        if !self.state.can_transition_to(to) {
            log_error!(self.log, MODULE, "illegal transition {} -> {}", self.state, to);
            spm_panic(Error::InvalidStateTransition);
        }
        log_info!(self.log, MODULE, "{} -> {}", self.state, to);
        self.state = to;
    }

    /// Run the whole boot sequence
    ///
    /// Every failure is fatal. Calling this a second time is fatal.
    pub fn boot<F: FihPolicy, H: SpmPlatform>(&mut self, hw: &mut H) {
        self.transition(SpmState::TableLoading);
        self.load_partitions();
        self.transition(SpmState::PartitionsLoaded);

        self.configure_isolation::<F, H>(hw);
        self.transition(SpmState::IsolationConfigured);

        self.route_interrupts::<F, H>(hw);
        self.transition(SpmState::Armed);
    }

    fn load_partitions(&mut self) {
        while let Some(index) = self.loader.load_next_partition() {
            self.loader.load_services_for(index, &mut self.services);
            if let Some(partition) = self.loader.partition(index) {
                log_info!(
                    self.log,
                    MODULE,
                    "partition {} loaded: {} services, signals {:?}",
                    partition.load_info().pid(),
                    partition.service_count(),
                    partition.signals_allowed()
                );
            }
        }
        log_info!(
            self.log,
            MODULE,
            "{} partitions, {} services",
            self.loader.partition_cursor(),
            self.loader.service_cursor()
        );
    }

    fn configure_isolation<F: FihPolicy, H: SpmPlatform>(&mut self, hw: &mut H) {
        for i in 0..self.loader.partition_cursor() {
            let index = PartitionIndex(i);
            let Some(partition) = self.loader.partitions_mut().get_mut(i) else {
                spm_panic(Error::InvalidPartitionIndex)
            };
            let privilege = self.isolation.classify(partition);
            let ldinf = *partition.load_info();
            log_debug!(self.log, MODULE, "partition {}: {:?}", ldinf.pid(), privilege);

            for reference in ldinf.assets().filter_map(|asset| asset.platform_ref()) {
                let data = hw.platform_data(reference);
                let rc = self.isolation.configure_default_isolation::<F, H>(
                    hw,
                    self.loader.partitions_mut(),
                    index,
                    data.as_ref(),
                );
                if !F::is_success(rc) {
                    log_error!(
                        self.log,
                        MODULE,
                        "partition {}: isolation for peripheral {} failed: {}",
                        ldinf.pid(),
                        reference,
                        F::status(rc)
                    );
                    spm_panic(Error::IsolationSetupFailed);
                }
            }
        }
        log_info!(
            self.log,
            MODULE,
            "isolation configured, {} peripheral regions",
            self.isolation.periph_regions_used()
        );
    }

    fn route_interrupts<F: FihPolicy, H: SpmPlatform>(&mut self, hw: &mut H) {
        F::require(irq::nvic_interrupt_target_state_cfg::<F, H>(hw), Error::BootHookFailed);

        for partition in self.loader.partitions() {
            for info in partition.load_info().irqs() {
                match irq::route_partition_irq(hw, &info) {
                    Ok(line) => log_debug!(self.log, MODULE, "irq {} -> secure", line.0),
                    Err(err) => {
                        log_error!(self.log, MODULE, "irq {}: {}", info.source, err);
                        spm_panic(err);
                    }
                }
            }
        }

        let debug_auth = self.isolation.config().debug_auth;
        F::require(irq::enable_fault_handlers::<F, H>(hw), Error::BootHookFailed);
        F::require(irq::system_reset_cfg::<F, H>(hw), Error::BootHookFailed);
        F::require(irq::init_debug::<F, H>(hw, debug_auth), Error::BootHookFailed);
        F::require(irq::nvic_interrupt_enable::<F, H>(hw), Error::BootHookFailed);
        log_info!(self.log, MODULE, "boot hooks done");

        if F::HARDENED {
            let _ = irq::verify_isolation_hw::<F, H>(hw);
            log_info!(self.log, MODULE, "isolation hardware verified");
        }
    }

    /// Where to hand control to the non-secure image
    ///
    /// Only available once armed.
    pub fn ns_entry<H: BootInterface>(&self, hw: &H) -> Result<NsEntry> {
        if self.state != SpmState::Armed {
            return Err(Error::InvalidStateTransition);
        }
        let vtor = hw.ns_code_start();
        Ok(NsEntry {
            vtor,
            msp: hw.read_ns_word(vtor)?,
            reset: hw.read_ns_word(vtor.wrapping_add(4))?,
        })
    }

    /// Entry point for the MPC violation interrupt
    pub fn handle_mpc_fault<H: MpcInterface + NvicInterface>(&mut self, hw: &mut H) -> ! {
        self.enter_violation();
        irq::mpc_fault_handler(hw, &mut self.log)
    }

    /// Entry point for the PPC violation interrupt
    pub fn handle_ppc_fault<H: PpcInterface + NvicInterface>(&mut self, hw: &mut H) -> ! {
        self.enter_violation();
        irq::ppc_fault_handler(hw, &mut self.log)
    }

    fn enter_violation(&mut self) {
        if self.state != SpmState::Violation {
            self.transition(SpmState::Violation);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_transitions() {
        use SpmState::*;
        assert!(Uninitialized.can_transition_to(TableLoading));
        assert!(TableLoading.can_transition_to(PartitionsLoaded));
        assert!(PartitionsLoaded.can_transition_to(IsolationConfigured));
        assert!(IsolationConfigured.can_transition_to(Armed));
        assert!(!Armed.can_transition_to(TableLoading));
        assert!(!Uninitialized.can_transition_to(Armed));
        assert!(!TableLoading.can_transition_to(TableLoading));
    }

    #[test]
    fn test_violation_is_terminal() {
        use SpmState::*;
        assert!(Armed.can_transition_to(Violation));
        assert!(TableLoading.can_transition_to(Violation));
        assert!(!Violation.can_transition_to(Violation));
        assert!(!Violation.can_transition_to(Armed));
    }

    #[test]
    fn test_state_names() {
        assert_eq!(SpmState::IsolationConfigured.as_str(), "ISOLATION_CONFIGURED");
        assert_eq!(SpmState::Armed.as_str(), "ARMED");
    }
}
