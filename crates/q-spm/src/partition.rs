// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Runtime partition and service objects
//!
//! Services refer to their partition by pool index. The partition-spanning
//! service list is an explicit list of per-partition runs instead of
//! intrusive links.

use core::ops::Range;

use heapless::Vec;
use q_spm_common::constants::MAX_REGIONS_PER_PARTITION;
use q_spm_common::{PartitionIndex, Privilege, ServiceIndex, Signals};

use crate::ldinf::{PartitionLoadInfo, ServiceLoadInfo};

// =============================================================================
// Partition
// =============================================================================

/// A loaded partition
#[derive(Debug, Clone)]
pub struct Partition<'t> {
    ldinf: PartitionLoadInfo<'t>,
    signals_allowed: Signals,
    services: Range<usize>,
    services_loaded: bool,
    privilege: Option<Privilege>,
    mpu_regions: Vec<u8, MAX_REGIONS_PER_PARTITION>,
}

impl<'t> Partition<'t> {
    pub(crate) fn new(ldinf: PartitionLoadInfo<'t>) -> Self {
        Self {
            ldinf,
            signals_allowed: Signals::EMPTY,
            services: 0..0,
            services_loaded: false,
            privilege: None,
            mpu_regions: Vec::new(),
        }
    }

    /// Descriptor record
    #[must_use]
    pub const fn load_info(&self) -> &PartitionLoadInfo<'t> {
        &self.ldinf
    }

    /// Union of the signals of every owned service
    #[must_use]
    pub const fn signals_allowed(&self) -> Signals {
        self.signals_allowed
    }

    /// Owned services in descriptor order
    pub fn services(&self) -> impl Iterator<Item = ServiceIndex> {
        self.services.clone().map(ServiceIndex)
    }

    /// Number of owned services
    #[must_use]
    pub fn service_count(&self) -> usize {
        self.services.len()
    }

    /// Check whether the service run has been loaded
    #[must_use]
    pub const fn services_loaded(&self) -> bool {
        self.services_loaded
    }

    /// Privilege classification, once isolation is configured
    #[must_use]
    pub const fn privilege(&self) -> Option<Privilege> {
        self.privilege
    }

    /// Peripheral MPU regions assigned to this partition
    #[must_use]
    pub fn mpu_regions(&self) -> &[u8] {
        &self.mpu_regions
    }

    pub(crate) fn fold_signal(&mut self, signal: Signals) {
        self.signals_allowed |= signal;
    }

    pub(crate) fn set_services(&mut self, services: Range<usize>) {
        self.services = services;
        self.services_loaded = true;
    }

    pub(crate) fn set_privilege(&mut self, privilege: Privilege) {
        self.privilege = Some(privilege);
    }

    pub(crate) fn push_region(&mut self, region: u8) -> bool {
        self.mpu_regions.push(region).is_ok()
    }
}

// =============================================================================
// Service
// =============================================================================

/// Connection handles open on a service
///
/// Maintained by the IPC runtime; loading leaves it empty.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectionList {
    head: Option<u32>,
}

impl ConnectionList {
    /// Empty list
    pub const EMPTY: Self = Self { head: None };

    /// Check for an empty list
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.head.is_none()
    }
}

/// A loaded service
#[derive(Debug, Clone)]
pub struct Service<'t> {
    ldinf: ServiceLoadInfo<'t>,
    partition: PartitionIndex,
    handles: ConnectionList,
}

impl<'t> Service<'t> {
    pub(crate) const fn new(ldinf: ServiceLoadInfo<'t>, partition: PartitionIndex) -> Self {
        Self {
            ldinf,
            partition,
            handles: ConnectionList::EMPTY,
        }
    }

    /// Descriptor record
    #[must_use]
    pub const fn load_info(&self) -> &ServiceLoadInfo<'t> {
        &self.ldinf
    }

    /// Owning partition
    #[must_use]
    pub const fn partition(&self) -> PartitionIndex {
        self.partition
    }

    /// Open connection handles
    #[must_use]
    pub const fn handles(&self) -> &ConnectionList {
        &self.handles
    }
}

// =============================================================================
// Service List
// =============================================================================

/// Partition-spanning list of loaded services
///
/// The first service ever loaded stays the head. Every later run is linked
/// right after the head, so iteration yields the head, then the most
/// recently loaded partition's services, then older ones. Within one
/// partition services keep descriptor order.
#[derive(Debug, Clone, Default)]
pub struct ServiceList<const P: usize> {
    runs: Vec<Range<usize>, P>,
}

impl<const P: usize> ServiceList<P> {
    /// Create an empty list
    #[must_use]
    pub const fn new() -> Self {
        Self { runs: Vec::new() }
    }

    /// Append one partition's run of services
    pub(crate) fn push_run(&mut self, run: Range<usize>) -> bool {
        self.runs.push(run).is_ok()
    }

    /// First service ever loaded
    #[must_use]
    pub fn head(&self) -> Option<ServiceIndex> {
        self.runs.first().map(|run| ServiceIndex(run.start))
    }

    /// Total number of services
    #[must_use]
    pub fn len(&self) -> usize {
        self.runs.iter().map(ExactSizeIterator::len).sum()
    }

    /// Check for an empty list
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Services in list order
    pub fn iter(&self) -> impl Iterator<Item = ServiceIndex> + '_ {
        let rest = self.runs.iter().enumerate().rev().flat_map(|(i, run)| {
            // the head leads the list, skip it inside its own run
            let start = if i == 0 { run.start + 1 } else { run.start };
            (start..run.end).map(ServiceIndex)
        });
        self.head().into_iter().chain(rest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_list_order() {
        let mut list: ServiceList<4> = ServiceList::new();
        assert!(list.is_empty());
        assert_eq!(list.head(), None);

        assert!(list.push_run(0..2));
        assert!(list.push_run(2..4));
        assert_eq!(list.len(), 4);
        assert_eq!(list.head(), Some(ServiceIndex(0)));

        let order: heapless::Vec<usize, 4> = list.iter().map(|s| s.0).collect();
        assert_eq!(order.as_slice(), &[0, 2, 3, 1]);
    }

    #[test]
    fn test_service_list_head_is_stable() {
        let mut list: ServiceList<4> = ServiceList::new();
        assert!(list.push_run(0..1));
        assert_eq!(list.head(), Some(ServiceIndex(0)));
        assert!(list.push_run(1..3));
        assert!(list.push_run(3..4));
        assert_eq!(list.head(), Some(ServiceIndex(0)));
        assert_eq!(list.iter().count(), list.len());
    }

    #[test]
    fn test_service_list_capacity() {
        let mut list: ServiceList<1> = ServiceList::new();
        assert!(list.push_run(0..2));
        assert!(!list.push_run(2..3));
    }

    #[test]
    fn test_connection_list_empty() {
        assert!(ConnectionList::EMPTY.is_empty());
        assert_eq!(ConnectionList::default(), ConnectionList::EMPTY);
    }
}
