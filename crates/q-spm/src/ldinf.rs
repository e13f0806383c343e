// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Descriptor table views
//!
//! The descriptor table is generated at build time and linked into the
//! secure image. It is never copied: runtime objects hold typed views
//! borrowing directly from it. Every view is constructed over a slice whose
//! length was checked against the record's declared size, so accessors
//! never read past the table's bound.
//!
//! Layout of one partition record (little-endian words):
//!
//! ```text
//! +--------------------------+
//! | partition header (40 B)  |
//! | service records  (20 B)* |
//! | dependency SIDs  (4 B)*  |
//! | assets           (12 B)* |
//! | irqs             (12 B)* |
//! +--------------------------+
//! ```

use core::fmt;

use bitflags::bitflags;
use q_spm_common::constants::{
    ASSET_ATTR_MMIO, ASSET_ATTR_READ_ONLY, ASSET_ATTR_READ_WRITE, ASSET_SIZE, DEPENDENCY_SIZE,
    IRQ_INFO_SIZE, PARTITION_FLAG_IPC, PARTITION_FLAG_PRIORITY_MASK, PARTITION_FLAG_PSA_ROT,
    PARTITION_INFO_MAGIC, PARTITION_INFO_MAGIC_MASK, PARTITION_LOAD_INFO_SIZE,
    SERVICE_FLAG_NS_ACCESSIBLE, SERVICE_FLAG_STATELESS, SERVICE_FLAG_VERSION_STRICT,
    SERVICE_LOAD_INFO_SIZE,
};
use q_spm_common::{Error, FrameworkVersion, IrqLine, PartitionId, Sid, Signals};

use crate::panic::spm_panic;

/// Read a little-endian word at `offset`
///
/// Views only call this on offsets inside their checked length; an
/// out-of-range read yields 0 instead of touching memory.
fn le32(raw: &[u8], offset: usize) -> u32 {
    match raw.get(offset..offset + 4) {
        Some(&[a, b, c, d]) => u32::from_le_bytes([a, b, c, d]),
        _ => 0,
    }
}

// =============================================================================
// Descriptor Table
// =============================================================================

/// The read-only descriptor table region
#[derive(Clone, Copy)]
pub struct DescriptorTable<'t> {
    bytes: &'t [u8],
}

impl<'t> DescriptorTable<'t> {
    /// Wrap an in-memory table
    #[must_use]
    pub const fn new(bytes: &'t [u8]) -> Self {
        Self { bytes }
    }

    /// Wrap the region between two linker symbols
    ///
    /// An end below the start is fatal.
    ///
    /// # Safety
    ///
    /// `start..end` must be readable for `'t` and must not be written while
    /// the table is in use.
    pub unsafe fn from_linker_region(start: *const u8, end: *const u8) -> Self {
        let len = (end as usize)
            .checked_sub(start as usize)
            .unwrap_or_else(|| spm_panic(Error::InvalidTableRegion));
        // SAFETY: The caller guarantees the region is readable and immutable
        // for 't; len was derived from the same two symbols.
        let bytes = unsafe { core::slice::from_raw_parts(start, len) };
        Self { bytes }
    }

    /// Table length in bytes
    #[must_use]
    pub const fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Check for an empty table
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Bytes from `offset` to the end of the table
    #[must_use]
    pub fn remaining(&self, offset: usize) -> &'t [u8] {
        self.bytes.get(offset..).unwrap_or(&[])
    }
}

impl fmt::Debug for DescriptorTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DescriptorTable({} bytes)", self.bytes.len())
    }
}

// =============================================================================
// Flags
// =============================================================================

bitflags! {
    /// Partition flags (priority bits excluded)
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PartitionFlags: u32 {
        /// Partition belongs to the PSA root of trust
        const PSA_ROT = PARTITION_FLAG_PSA_ROT;
        /// Partition uses the IPC model
        const IPC = PARTITION_FLAG_IPC;
    }
}

bitflags! {
    /// Service flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ServiceFlags: u32 {
        /// Callable from the non-secure side
        const NS_ACCESSIBLE = SERVICE_FLAG_NS_ACCESSIBLE;
        /// Dispatched through a reserved stateless slot
        const STATELESS = SERVICE_FLAG_STATELESS;
        /// Version must match exactly
        const VERSION_STRICT = SERVICE_FLAG_VERSION_STRICT;
    }
}

bitflags! {
    /// Asset attributes
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct AssetAttr: u32 {
        /// Read-only memory
        const READ_ONLY = ASSET_ATTR_READ_ONLY;
        /// Read-write memory
        const READ_WRITE = ASSET_ATTR_READ_WRITE;
        /// Peripheral named by a platform-data reference
        const MMIO = ASSET_ATTR_MMIO;
    }
}

// =============================================================================
// Partition Load Info
// =============================================================================

/// Header counts needed to size a partition record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordCounts {
    /// Service records
    pub nservices: u32,
    /// Dependency SIDs
    pub ndeps: u32,
    /// Asset records
    pub nassets: u32,
    /// IRQ records
    pub nirqs: u32,
}

impl RecordCounts {
    /// Read the counts from a header
    ///
    /// `header` must hold at least [`PARTITION_LOAD_INFO_SIZE`] bytes.
    #[must_use]
    pub fn read(header: &[u8]) -> Self {
        Self {
            ndeps: le32(header, 24),
            nservices: le32(header, 28),
            nassets: le32(header, 32),
            nirqs: le32(header, 36),
        }
    }

    /// Declared record size, `None` on overflow
    ///
    /// Computed in 32-bit arithmetic, the width of the target address space.
    #[must_use]
    pub fn total_size(&self) -> Option<u32> {
        let sizes = [
            (self.nservices, SERVICE_LOAD_INFO_SIZE),
            (self.ndeps, DEPENDENCY_SIZE),
            (self.nassets, ASSET_SIZE),
            (self.nirqs, IRQ_INFO_SIZE),
        ];
        sizes
            .iter()
            .try_fold(PARTITION_LOAD_INFO_SIZE as u32, |acc, &(count, size)| {
                count.checked_mul(size as u32)?.checked_add(acc)
            })
    }
}

/// View of one validated partition record
#[derive(Clone, Copy)]
pub struct PartitionLoadInfo<'t> {
    raw: &'t [u8],
    counts: RecordCounts,
}

impl<'t> PartitionLoadInfo<'t> {
    /// Build a view over exactly one record
    ///
    /// Returns `None` unless `raw` has exactly the declared size.
    #[must_use]
    pub fn new(raw: &'t [u8]) -> Option<Self> {
        if raw.len() < PARTITION_LOAD_INFO_SIZE {
            return None;
        }
        let counts = RecordCounts::read(raw);
        let size = counts.total_size()?;
        if usize::try_from(size).ok()? != raw.len() {
            return None;
        }
        Some(Self { raw, counts })
    }

    /// Raw `psa_ff_ver` word
    #[must_use]
    pub fn psa_ff_ver(&self) -> u32 {
        le32(self.raw, 0)
    }

    /// Check the magic tag
    #[must_use]
    pub fn magic_ok(&self) -> bool {
        self.psa_ff_ver() & PARTITION_INFO_MAGIC_MASK == PARTITION_INFO_MAGIC
    }

    /// Framework version the partition was built against
    #[must_use]
    pub fn framework_version(&self) -> FrameworkVersion {
        FrameworkVersion::from_psa_ff_ver(self.psa_ff_ver())
    }

    /// Partition ID
    #[must_use]
    pub fn pid(&self) -> PartitionId {
        PartitionId(le32(self.raw, 4))
    }

    /// Raw flags word
    #[must_use]
    pub fn raw_flags(&self) -> u32 {
        le32(self.raw, 8)
    }

    /// Partition flags
    #[must_use]
    pub fn flags(&self) -> PartitionFlags {
        PartitionFlags::from_bits_truncate(self.raw_flags())
    }

    /// Scheduling priority
    #[must_use]
    pub fn priority(&self) -> u8 {
        (self.raw_flags() & PARTITION_FLAG_PRIORITY_MASK) as u8
    }

    /// Check for a PSA-RoT partition
    #[must_use]
    pub fn is_psa_rot(&self) -> bool {
        self.flags().contains(PartitionFlags::PSA_ROT)
    }

    /// Entry point
    #[must_use]
    pub fn entry(&self) -> u32 {
        le32(self.raw, 12)
    }

    /// Stack size in bytes
    #[must_use]
    pub fn stack_size(&self) -> u32 {
        le32(self.raw, 16)
    }

    /// Heap size in bytes
    #[must_use]
    pub fn heap_size(&self) -> u32 {
        le32(self.raw, 20)
    }

    /// Record counts
    #[must_use]
    pub const fn counts(&self) -> RecordCounts {
        self.counts
    }

    /// Number of services
    #[must_use]
    pub const fn nservices(&self) -> usize {
        self.counts.nservices as usize
    }

    /// Record size in bytes
    #[must_use]
    pub const fn load_size(&self) -> usize {
        self.raw.len()
    }

    fn services_offset(&self) -> usize {
        PARTITION_LOAD_INFO_SIZE
    }

    fn deps_offset(&self) -> usize {
        self.services_offset() + self.nservices() * SERVICE_LOAD_INFO_SIZE
    }

    fn assets_offset(&self) -> usize {
        self.deps_offset() + self.counts.ndeps as usize * DEPENDENCY_SIZE
    }

    fn irqs_offset(&self) -> usize {
        self.assets_offset() + self.counts.nassets as usize * ASSET_SIZE
    }

    fn slice(&self, base: usize, index: usize, size: usize) -> Option<&'t [u8]> {
        let start = base + index * size;
        self.raw.get(start..start + size)
    }

    /// Service record `index`
    #[must_use]
    pub fn service(&self, index: usize) -> Option<ServiceLoadInfo<'t>> {
        if index >= self.nservices() {
            return None;
        }
        self.slice(self.services_offset(), index, SERVICE_LOAD_INFO_SIZE)
            .map(|raw| ServiceLoadInfo { raw })
    }

    /// Service records in descriptor order
    pub fn services(&self) -> impl Iterator<Item = ServiceLoadInfo<'t>> + '_ {
        (0..self.nservices()).filter_map(move |i| self.service(i))
    }

    /// Dependency SIDs
    pub fn dependencies(&self) -> impl Iterator<Item = Sid> + '_ {
        let base = self.deps_offset();
        (0..self.counts.ndeps as usize).map(move |i| Sid(le32(self.raw, base + i * DEPENDENCY_SIZE)))
    }

    /// Asset records
    pub fn assets(&self) -> impl Iterator<Item = Asset> + '_ {
        let base = self.assets_offset();
        (0..self.counts.nassets as usize)
            .filter_map(move |i| self.slice(base, i, ASSET_SIZE))
            .map(Asset::read)
    }

    /// IRQ records
    pub fn irqs(&self) -> impl Iterator<Item = IrqInfo> + '_ {
        let base = self.irqs_offset();
        (0..self.counts.nirqs as usize)
            .filter_map(move |i| self.slice(base, i, IRQ_INFO_SIZE))
            .map(IrqInfo::read)
    }
}

impl fmt::Debug for PartitionLoadInfo<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PartitionLoadInfo")
            .field("pid", &self.pid())
            .field("version", &self.framework_version())
            .field("flags", &self.flags())
            .field("counts", &self.counts)
            .finish()
    }
}

// =============================================================================
// Service Load Info
// =============================================================================

/// View of one service record
#[derive(Clone, Copy)]
pub struct ServiceLoadInfo<'t> {
    raw: &'t [u8],
}

impl ServiceLoadInfo<'_> {
    /// String ID of the service name
    #[must_use]
    pub fn name_strid(&self) -> u32 {
        le32(self.raw, 0)
    }

    /// Service ID
    #[must_use]
    pub fn sid(&self) -> Sid {
        Sid(le32(self.raw, 4))
    }

    /// Signal raised for this service
    #[must_use]
    pub fn signal(&self) -> Signals {
        Signals::from_bits(le32(self.raw, 8))
    }

    /// Service flags
    #[must_use]
    pub fn flags(&self) -> ServiceFlags {
        ServiceFlags::from_bits_truncate(le32(self.raw, 12))
    }

    /// Check for a stateless service
    #[must_use]
    pub fn is_stateless(&self) -> bool {
        self.flags().contains(ServiceFlags::STATELESS)
    }

    /// Service version
    #[must_use]
    pub fn version(&self) -> u32 {
        le32(self.raw, 16)
    }
}

impl fmt::Debug for ServiceLoadInfo<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceLoadInfo")
            .field("sid", &self.sid())
            .field("signal", &self.signal())
            .field("flags", &self.flags())
            .finish()
    }
}

// =============================================================================
// Assets and IRQs
// =============================================================================

/// Decoded asset record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Asset {
    /// Start address, or platform-data reference for MMIO assets
    pub start: u32,
    /// Limit address
    pub limit: u32,
    /// Attributes
    pub attr: AssetAttr,
}

impl Asset {
    fn read(raw: &[u8]) -> Self {
        Self {
            start: le32(raw, 0),
            limit: le32(raw, 4),
            attr: AssetAttr::from_bits_truncate(le32(raw, 8)),
        }
    }

    /// Platform-data reference of an MMIO asset
    #[must_use]
    pub fn platform_ref(&self) -> Option<u32> {
        self.attr.contains(AssetAttr::MMIO).then_some(self.start)
    }
}

/// Decoded IRQ record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IrqInfo {
    /// Raw interrupt source
    pub source: u32,
    /// Signal raised for the interrupt
    pub signal: Signals,
    /// Requested priority (0 highest)
    pub priority: u8,
}

impl IrqInfo {
    fn read(raw: &[u8]) -> Self {
        Self {
            source: le32(raw, 0),
            signal: Signals::from_bits(le32(raw, 4)),
            priority: (le32(raw, 8) & 0xFF) as u8,
        }
    }

    /// Interrupt line, if the source fits one
    #[must_use]
    pub fn line(&self) -> Option<IrqLine> {
        u16::try_from(self.source).ok().map(IrqLine)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(nservices: u32, nassets: u32) -> [u8; 40] {
        let words = [
            PARTITION_INFO_MAGIC | 0x0101,
            7,
            PARTITION_FLAG_IPC | PARTITION_FLAG_PSA_ROT | 0x20,
            0x1000_0401,
            0x400,
            0,
            0,
            nservices,
            nassets,
            0,
        ];
        let mut out = [0u8; 40];
        for (chunk, word) in out.chunks_exact_mut(4).zip(words) {
            chunk.copy_from_slice(&word.to_le_bytes());
        }
        out
    }

    #[test]
    fn test_total_size() {
        let counts = RecordCounts { nservices: 2, ndeps: 1, nassets: 1, nirqs: 1 };
        assert_eq!(counts.total_size(), Some(40 + 40 + 4 + 12 + 12));
    }

    #[test]
    fn test_total_size_overflow() {
        let counts = RecordCounts { nservices: 0x1000_0000, ndeps: 0, nassets: 0, nirqs: 0 };
        assert_eq!(counts.total_size(), None);
        let counts = RecordCounts { nservices: 0, ndeps: u32::MAX / 4, nassets: 0, nirqs: 0 };
        assert_eq!(counts.total_size(), None);
    }

    #[test]
    fn test_header_fields() {
        let raw = header(0, 0);
        let info = PartitionLoadInfo::new(&raw).expect("valid record");
        assert!(info.magic_ok());
        assert_eq!(info.framework_version(), FrameworkVersion::new(1, 1));
        assert_eq!(info.pid(), PartitionId(7));
        assert_eq!(info.priority(), 0x20);
        assert!(info.is_psa_rot());
        assert!(info.flags().contains(PartitionFlags::IPC));
        assert_eq!(info.entry(), 0x1000_0401);
        assert_eq!(info.stack_size(), 0x400);
        assert_eq!(info.load_size(), 40);
        assert!(info.service(0).is_none());
    }

    #[test]
    fn test_view_requires_exact_length() {
        let raw = header(1, 0);
        assert!(PartitionLoadInfo::new(&raw).is_none());
        assert!(PartitionLoadInfo::new(&raw[..39]).is_none());
    }

    #[test]
    fn test_mmio_asset_reference() {
        let mmio = Asset { start: 3, limit: 0, attr: AssetAttr::MMIO };
        let ram = Asset { start: 0x2000_0000, limit: 0x2000_0FFF, attr: AssetAttr::READ_WRITE };
        assert_eq!(mmio.platform_ref(), Some(3));
        assert_eq!(ram.platform_ref(), None);
    }

    #[test]
    fn test_irq_line_range() {
        let irq = IrqInfo { source: 0x1_0000, signal: Signals::EMPTY, priority: 0 };
        assert_eq!(irq.line(), None);
        let irq = IrqInfo { source: 33, signal: Signals::EMPTY, priority: 0 };
        assert_eq!(irq.line(), Some(IrqLine(33)));
    }

    #[test]
    fn test_linker_region() {
        let raw = header(0, 0);
        let range = raw.as_ptr_range();
        // SAFETY: Both pointers delimit `raw`, which outlives the table.
        let table = unsafe { DescriptorTable::from_linker_region(range.start, range.end) };
        assert_eq!(table.len(), 40);
        assert_eq!(table.remaining(40).len(), 0);
        assert_eq!(table.remaining(100).len(), 0);
    }

    #[test]
    #[should_panic(expected = "descriptor table region invalid")]
    fn test_inverted_linker_region() {
        let raw = header(0, 0);
        let range = raw.as_ptr_range();
        // SAFETY: The inverted region is rejected before any read.
        let _ = unsafe { DescriptorTable::from_linker_region(range.end, range.start) };
    }
}
