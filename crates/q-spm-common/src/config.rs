// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! SPM configuration
//!
//! All configuration is fixed at build time. The SPM never reads tunables
//! from the non-secure side or from partitions.

use crate::constants::{
    MPU_MAX_REGIONS, NVIC_PRIO_BITS, PARTITION_REGION_PERIPH_MAX_NUM, PARTITION_REGION_PERIPH_START,
};
use crate::types::IsolationLevel;
use crate::version::FrameworkVersion;

/// Top-level SPM configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpmConfig {
    /// Isolation level the image was built for
    pub isolation_level: IsolationLevel,
    /// Program per-partition MPU regions
    pub memory_protection: bool,
    /// Newest framework version a partition may declare
    pub framework_version: FrameworkVersion,
    /// MPU regions reserved for partition peripherals
    pub periph_regions: PeriphRegionWindow,
    /// Implemented NVIC priority bits
    pub nvic_prio_bits: u8,
    /// Debug authentication policy applied by `init_debug`
    pub debug_auth: DebugAuth,
}

impl SpmConfig {
    /// Level 2 with memory protection on
    pub const DEFAULT: Self = Self::for_level(IsolationLevel::Level2);

    /// Default configuration for an isolation level
    #[must_use]
    pub const fn for_level(isolation_level: IsolationLevel) -> Self {
        Self {
            isolation_level,
            memory_protection: true,
            framework_version: FrameworkVersion::SUPPORTED,
            periph_regions: PeriphRegionWindow::DEFAULT,
            nvic_prio_bits: NVIC_PRIO_BITS,
            debug_auth: DebugAuth::DEFAULT,
        }
    }

    /// Same configuration with memory protection switched
    #[must_use]
    pub const fn with_memory_protection(mut self, enabled: bool) -> Self {
        self.memory_protection = enabled;
        self
    }

    /// Same configuration with a different peripheral region window
    #[must_use]
    pub const fn with_periph_regions(mut self, window: PeriphRegionWindow) -> Self {
        self.periph_regions = window;
        self
    }

    /// Check if unprivileged partitions get their own peripheral regions
    #[must_use]
    pub const fn partition_regions_enabled(&self) -> bool {
        self.memory_protection && self.isolation_level.requires_partition_regions()
    }
}

impl Default for SpmConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Contiguous run of MPU region numbers for partition peripherals
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriphRegionWindow {
    /// First region number
    pub start: u8,
    /// Number of regions in the window
    pub count: u8,
}

impl PeriphRegionWindow {
    /// Regions 5 and 6
    pub const DEFAULT: Self = Self {
        start: PARTITION_REGION_PERIPH_START,
        count: PARTITION_REGION_PERIPH_MAX_NUM,
    };

    /// Region number for the `slot`-th assignment, if inside the window
    ///
    /// Region numbers past the architectural MPU limit are never handed out.
    #[must_use]
    pub const fn region(&self, slot: u8) -> Option<u8> {
        if slot >= self.count {
            return None;
        }
        match self.start.checked_add(slot) {
            Some(region) if region < MPU_MAX_REGIONS => Some(region),
            _ => None,
        }
    }
}

/// Debug authentication policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugAuth {
    /// Leave the platform's reset values in place
    Unchanged,
    /// Allow non-secure debug only
    NonSecureOnly,
    /// Allow full debug
    Full,
    /// Disable all debug
    Disabled,
}

impl DebugAuth {
    /// Platform reset values
    pub const DEFAULT: Self = Self::Unchanged;
}

impl Default for DebugAuth {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level1_has_no_partition_regions() {
        let config = SpmConfig::for_level(IsolationLevel::Level1);
        assert!(!config.partition_regions_enabled());
    }

    #[test]
    fn test_memory_protection_gate() {
        let config = SpmConfig::DEFAULT;
        assert!(config.partition_regions_enabled());
        assert!(!config.with_memory_protection(false).partition_regions_enabled());
    }

    #[test]
    fn test_region_window() {
        let window = PeriphRegionWindow::DEFAULT;
        assert_eq!(window.region(0), Some(5));
        assert_eq!(window.region(1), Some(6));
        assert_eq!(window.region(2), None);
    }

    #[test]
    fn test_region_window_near_limit() {
        let high = PeriphRegionWindow { start: 250, count: 10 };
        assert_eq!(high.region(0), None);
        assert_eq!(high.region(9), None);

        let tail = PeriphRegionWindow { start: 14, count: 4 };
        assert_eq!(tail.region(0), Some(14));
        assert_eq!(tail.region(1), Some(15));
        assert_eq!(tail.region(2), None);
        assert_eq!(tail.region(u8::MAX), None);
    }
}
