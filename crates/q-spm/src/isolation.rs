// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Isolation configurator
//!
//! Enforces each partition's privilege level on the peripherals it owns:
//! unprivileged partitions get a peripheral MPU region from a small fixed
//! window, and the peripheral's PPC slot is made secure with unprivileged
//! access granted or withheld to match the partition.
//!
//! Peripheral regions are handed out linearly and never returned. Running
//! out is reported, not skipped: weaker isolation for later partitions is
//! not an option.

use q_spm_common::{PartitionIndex, Privilege, SpmConfig};
use q_spm_hal::armv8m::mpu::MpuRegionConfig;
use q_spm_hal::{MpuInterface, PlatformData, PpcInterface, PpcTarget};

use crate::fih::{FihPolicy, PlatStatus};
use crate::partition::Partition;

/// Per-partition isolation setup
#[derive(Debug, Clone)]
pub struct IsolationConfigurator {
    config: SpmConfig,
    periph_used: u8,
}

impl IsolationConfigurator {
    /// Create a configurator with no peripheral region assigned
    #[must_use]
    pub const fn new(config: SpmConfig) -> Self {
        Self {
            config,
            periph_used: 0,
        }
    }

    /// Active configuration
    #[must_use]
    pub const fn config(&self) -> &SpmConfig {
        &self.config
    }

    /// Peripheral regions assigned so far
    #[must_use]
    pub const fn periph_regions_used(&self) -> u8 {
        self.periph_used
    }

    /// Record the privilege `partition` runs with
    pub fn classify(&self, partition: &mut Partition<'_>) -> Privilege {
        let privilege = self
            .config
            .isolation_level
            .privilege_for(partition.load_info().is_psa_rot());
        partition.set_privilege(privilege);
        privilege
    }

    /// Program MPU and PPC for one peripheral of partition `index`
    ///
    /// Missing platform data or an unknown partition yields
    /// [`PlatStatus::InvalidInput`] before any hardware access. A full
    /// peripheral region window yields [`PlatStatus::MaxValue`]. Any failing
    /// hardware call yields [`PlatStatus::SystemError`] and stops the
    /// sequence.
    pub fn configure_default_isolation<F, H>(
        &mut self,
        hw: &mut H,
        partitions: &mut [Partition<'_>],
        index: PartitionIndex,
        platform_data: Option<&PlatformData>,
    ) -> F::Rc
    where
        F: FihPolicy,
        H: MpuInterface + PpcInterface,
    {
        let Some(data) = platform_data else {
            return F::encode(PlatStatus::InvalidInput);
        };
        let Some(partition) = partitions.get_mut(index.0) else {
            return F::encode(PlatStatus::InvalidInput);
        };
        let privilege = match partition.privilege() {
            Some(privilege) => privilege,
            None => self.classify(partition),
        };

        if self.config.partition_regions_enabled() && !privilege.is_privileged() {
            let Some(region) = self.config.periph_regions.region(self.periph_used) else {
                return F::encode(PlatStatus::MaxValue);
            };

            let region_cfg = MpuRegionConfig::peripheral(region, data.periph_start, data.periph_limit);

            let rc = F::call(|| hw.mpu_disable());
            if !F::is_success(rc) {
                return F::encode(PlatStatus::SystemError);
            }
            let rc = F::call(|| hw.mpu_region_enable(&region_cfg));
            if !F::is_success(rc) {
                return F::encode(PlatStatus::SystemError);
            }
            let rc = F::call(|| hw.mpu_enable(true, true));
            if !F::is_success(rc) {
                return F::encode(PlatStatus::SystemError);
            }

            self.periph_used += 1;
            if !partition.push_region(region) {
                return F::encode(PlatStatus::SystemError);
            }
        }

        if let PpcTarget::Location { bank, loc } = data.ppc {
            let rc = F::call(|| hw.ppc_configure_to_secure(bank, loc));
            if !F::is_success(rc) {
                return F::encode(PlatStatus::SystemError);
            }

            let rc = if privilege.is_privileged() {
                F::call(|| hw.ppc_clr_secure_unpriv(bank, loc))
            } else {
                F::call(|| hw.ppc_en_secure_unpriv(bank, loc))
            };
            if !F::is_success(rc) {
                return F::encode(PlatStatus::SystemError);
            }
        }

        F::encode(PlatStatus::Success)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fih::Unhardened;
    use q_spm_common::IsolationLevel;
    use q_spm_hal::sim::SimPlatform;

    #[test]
    fn test_missing_platform_data() {
        let mut iso = IsolationConfigurator::new(SpmConfig::DEFAULT);
        let mut sim = SimPlatform::new();
        let rc = iso.configure_default_isolation::<Unhardened, _>(&mut sim, &mut [], PartitionIndex(0), None);
        assert_eq!(rc, PlatStatus::InvalidInput);
        assert!(sim.events().is_empty());
    }

    #[test]
    fn test_unknown_partition() {
        let mut iso = IsolationConfigurator::new(SpmConfig::for_level(IsolationLevel::Level3));
        let mut sim = SimPlatform::new();
        let data = PlatformData::unguarded(0x4000_0000, 0x4000_0FFF);
        let rc = iso.configure_default_isolation::<Unhardened, _>(
            &mut sim,
            &mut [],
            PartitionIndex(3),
            Some(&data),
        );
        assert_eq!(rc, PlatStatus::InvalidInput);
        assert_eq!(iso.periph_regions_used(), 0);
    }
}
