// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Static loader
//!
//! Walks the descriptor table one partition record at a time and turns
//! each record into pool objects. The table is trusted by construction, so
//! every validation failure means the image does not match its own build
//! metadata and takes the fatal path. Running out of table is the only
//! non-fatal outcome.

use q_spm_common::constants::PARTITION_LOAD_INFO_SIZE;
use q_spm_common::{Error, FrameworkVersion, PartitionIndex, ServiceIndex};

use crate::ldinf::{DescriptorTable, PartitionFlags, PartitionLoadInfo, RecordCounts};
use crate::panic::spm_panic;
use crate::partition::{Partition, Service, ServiceList};
use crate::pool::Pool;
use crate::stateless::StatelessTable;

/// Builds the partition and service pools from the descriptor table
///
/// `P` and `S` are the partition and service pool sizes, `K` the number of
/// reserved stateless slots.
pub struct StaticLoader<'t, const P: usize, const S: usize, const K: usize> {
    table: DescriptorTable<'t>,
    cursor: usize,
    exhausted: bool,
    supported: FrameworkVersion,
    partitions: Pool<Partition<'t>, P>,
    services: Pool<Service<'t>, S>,
    stateless: StatelessTable<K>,
}

impl<'t, const P: usize, const S: usize, const K: usize> StaticLoader<'t, P, S, K> {
    /// Create a loader positioned at the start of `table`
    #[must_use]
    pub const fn new(
        table: DescriptorTable<'t>,
        supported: FrameworkVersion,
        stateless: StatelessTable<K>,
    ) -> Self {
        Self {
            table,
            cursor: 0,
            exhausted: false,
            supported,
            partitions: Pool::new(),
            services: Pool::new(),
            stateless,
        }
    }

    /// Load the next partition record
    ///
    /// Returns `None` once fewer bytes than one header remain; after that
    /// every call returns `None`. Corruption, an unsupported framework
    /// version, a non-IPC partition and a full partition pool are fatal.
    pub fn load_next_partition(&mut self) -> Option<PartitionIndex> {
        if self.exhausted {
            return None;
        }

        let remaining = self.table.remaining(self.cursor);
        if remaining.len() < PARTITION_LOAD_INFO_SIZE {
            self.exhausted = true;
            return None;
        }

        let size = match RecordCounts::read(remaining).total_size() {
            Some(size) => size as usize,
            None => spm_panic(Error::LoadInfoSizeOverflow),
        };
        let Some(record) = remaining.get(..size) else {
            spm_panic(Error::LoadInfoOutOfBounds)
        };
        let Some(ldinf) = PartitionLoadInfo::new(record) else {
            spm_panic(Error::InternalError)
        };

        if !ldinf.magic_ok() {
            spm_panic(Error::BadPartitionMagic);
        }
        if !ldinf.framework_version().is_compatible_with(self.supported) {
            spm_panic(Error::UnsupportedFrameworkVersion);
        }
        if !ldinf.flags().contains(PartitionFlags::IPC) {
            spm_panic(Error::NotIpcPartition);
        }

        let index = match self.partitions.alloc(Partition::new(ldinf)) {
            Ok(index) => index,
            Err(_) => spm_panic(Error::PartitionPoolExhausted),
        };
        self.cursor += size;

        Some(PartitionIndex(index))
    }

    /// Load the services of a freshly loaded partition
    ///
    /// Allocates one contiguous run of service slots, folds every service's
    /// signal into the partition's allowed signals, binds stateless
    /// services to their reserved slot and appends the run to `list`.
    /// Loading the same partition's services twice is fatal.
    pub fn load_services_for(&mut self, index: PartitionIndex, list: &mut ServiceList<P>) {
        let Some(partition) = self.partitions.get_mut(index.0) else {
            spm_panic(Error::InvalidPartitionIndex)
        };
        if partition.services_loaded() {
            spm_panic(Error::ServicesAlreadyLoaded);
        }
        let ldinf = *partition.load_info();

        let count = ldinf.nservices();
        if count == 0 {
            let first = self.services.cursor();
            partition.set_services(first..first);
            return;
        }
        if count > self.services.capacity()
            || self.services.cursor() > self.services.capacity()
            || count > self.services.remaining()
        {
            spm_panic(Error::ServicePoolExhausted);
        }

        let first = self.services.cursor();
        for i in 0..count {
            let Some(info) = ldinf.service(i) else {
                spm_panic(Error::InternalError)
            };
            let slot = first + i;

            if self.services.alloc(Service::new(info, index)).is_err() {
                spm_panic(Error::ServicePoolExhausted);
            }

            if info.is_stateless() && self.stateless.bind(info.sid(), ServiceIndex(slot)).is_none() {
                spm_panic(Error::StatelessSlotMissing);
            }

            if let Some(partition) = self.partitions.get_mut(index.0) {
                partition.fold_signal(info.signal());
            }
        }

        let run = first..first + count;
        if let Some(partition) = self.partitions.get_mut(index.0) {
            partition.set_services(run.clone());
        }
        if !list.push_run(run) {
            spm_panic(Error::InternalError);
        }
    }

    /// Load every remaining partition and its services
    ///
    /// Returns the number of partitions loaded by this call.
    pub fn load_all(&mut self, list: &mut ServiceList<P>) -> usize {
        let mut loaded = 0;
        while let Some(index) = self.load_next_partition() {
            self.load_services_for(index, list);
            loaded += 1;
        }
        loaded
    }

    /// Loaded partitions in table order
    #[must_use]
    pub fn partitions(&self) -> &[Partition<'t>] {
        self.partitions.as_slice()
    }

    /// Loaded partitions, for the isolation configurator
    ///
    /// Only the privilege and region fields can be written through this.
    pub fn partitions_mut(&mut self) -> &mut [Partition<'t>] {
        self.partitions.as_mut_slice()
    }

    /// Partition at `index`
    #[must_use]
    pub fn partition(&self, index: PartitionIndex) -> Option<&Partition<'t>> {
        self.partitions.get(index.0)
    }

    /// Loaded services in allocation order
    #[must_use]
    pub fn services(&self) -> &[Service<'t>] {
        self.services.as_slice()
    }

    /// Service at `index`
    #[must_use]
    pub fn service(&self, index: ServiceIndex) -> Option<&Service<'t>> {
        self.services.get(index.0)
    }

    /// Stateless service reference table
    #[must_use]
    pub const fn stateless(&self) -> &StatelessTable<K> {
        &self.stateless
    }

    /// Partition pool cursor
    #[must_use]
    pub fn partition_cursor(&self) -> usize {
        self.partitions.cursor()
    }

    /// Service pool cursor
    #[must_use]
    pub fn service_cursor(&self) -> usize {
        self.services.cursor()
    }

    /// Byte offset of the next record in the table
    #[must_use]
    pub const fn table_cursor(&self) -> usize {
        self.cursor
    }

    /// Check whether the table has been fully consumed
    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        self.exhausted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Loader<'t> = StaticLoader<'t, 2, 4, 2>;

    #[test]
    fn test_empty_table_is_exhausted() {
        let mut loader = Loader::new(
            DescriptorTable::new(&[]),
            FrameworkVersion::SUPPORTED,
            StatelessTable::empty(),
        );
        let mut list = ServiceList::new();
        assert_eq!(loader.load_next_partition(), None);
        assert!(loader.is_exhausted());
        assert_eq!(loader.load_all(&mut list), 0);
        assert_eq!(loader.partition_cursor(), 0);
    }

    #[test]
    fn test_short_tail_is_exhausted() {
        let tail = [0u8; PARTITION_LOAD_INFO_SIZE - 1];
        let mut loader = Loader::new(
            DescriptorTable::new(&tail),
            FrameworkVersion::SUPPORTED,
            StatelessTable::empty(),
        );
        assert_eq!(loader.load_next_partition(), None);
        assert_eq!(loader.table_cursor(), 0);
    }

    #[test]
    #[should_panic(expected = "invalid partition index")]
    fn test_services_for_unknown_partition() {
        let mut loader = Loader::new(
            DescriptorTable::new(&[]),
            FrameworkVersion::SUPPORTED,
            StatelessTable::empty(),
        );
        let mut list = ServiceList::new();
        loader.load_services_for(PartitionIndex(0), &mut list);
    }
}
