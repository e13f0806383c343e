// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Stateless service reference table
//!
//! Stateless services are reached through a slot reserved for their SID at
//! build time. Loading binds each slot to the live service; a stateless
//! service without a slot is a build error and fatal.
//!
//! Handle layout:
//!
//! | Bits   | Field                      |
//! |--------|----------------------------|
//! | 30     | stateless indicator        |
//! | 8..15  | service version            |
//! | 0..4   | slot index + 1             |

use q_spm_common::constants::{
    STATELESS_HANDLE_INDEX_MASK, STATELESS_HANDLE_INDICATOR, STATELESS_HANDLE_NUM_LIMIT,
    STATELESS_HANDLE_VERSION_MASK, STATELESS_HANDLE_VERSION_SHIFT,
};
use q_spm_common::{ServiceIndex, Sid};

/// One reserved slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatelessSlot {
    sid: Option<Sid>,
    service: Option<ServiceIndex>,
}

impl StatelessSlot {
    const UNUSED: Self = Self {
        sid: None,
        service: None,
    };

    /// Reserved SID
    #[must_use]
    pub const fn sid(&self) -> Option<Sid> {
        self.sid
    }

    /// Bound service
    #[must_use]
    pub const fn service(&self) -> Option<ServiceIndex> {
        self.service
    }
}

/// Decoded stateless handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatelessHandle {
    /// Slot in the table
    pub slot: usize,
    /// Requested service version
    pub version: u8,
}

impl StatelessHandle {
    /// Decode a raw handle
    #[must_use]
    pub fn decode(handle: u32) -> Option<Self> {
        if handle & STATELESS_HANDLE_INDICATOR == 0 {
            return None;
        }
        let index = (handle & STATELESS_HANDLE_INDEX_MASK) as usize;
        let slot = index.checked_sub(1)?;
        let version = (handle >> STATELESS_HANDLE_VERSION_SHIFT) & STATELESS_HANDLE_VERSION_MASK;
        Some(Self {
            slot,
            version: version as u8,
        })
    }

    /// Encode as a raw handle
    #[must_use]
    pub fn encode(&self) -> u32 {
        STATELESS_HANDLE_INDICATOR
            | (u32::from(self.version) << STATELESS_HANDLE_VERSION_SHIFT)
            | ((self.slot as u32 + 1) & STATELESS_HANDLE_INDEX_MASK)
    }
}

/// Fixed table of reserved stateless slots
#[derive(Debug, Clone)]
pub struct StatelessTable<const K: usize = STATELESS_HANDLE_NUM_LIMIT> {
    slots: [StatelessSlot; K],
}

impl<const K: usize> StatelessTable<K> {
    /// Table with no reserved slots
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            slots: [StatelessSlot::UNUSED; K],
        }
    }

    /// Reserve slots for `sids`, in order
    ///
    /// SIDs beyond the table capacity are ignored.
    #[must_use]
    pub fn from_sids(sids: &[Sid]) -> Self {
        let mut table = Self::empty();
        for (slot, sid) in table.slots.iter_mut().zip(sids) {
            slot.sid = Some(*sid);
        }
        table
    }

    /// Bind the first slot reserved for `sid` to `service`
    ///
    /// Returns the slot number, or `None` if no slot matches.
    pub fn bind(&mut self, sid: Sid, service: ServiceIndex) -> Option<usize> {
        let (slot, entry) = self
            .slots
            .iter_mut()
            .enumerate()
            .find(|(_, entry)| entry.sid == Some(sid))?;
        entry.service = Some(service);
        Some(slot)
    }

    /// Slot `slot`
    #[must_use]
    pub fn slot(&self, slot: usize) -> Option<&StatelessSlot> {
        self.slots.get(slot)
    }

    /// Service bound to `slot`
    #[must_use]
    pub fn resolve(&self, slot: usize) -> Option<ServiceIndex> {
        self.slots.get(slot).and_then(|entry| entry.service)
    }

    /// Service addressed by a raw stateless handle
    #[must_use]
    pub fn resolve_handle(&self, handle: u32) -> Option<(ServiceIndex, u8)> {
        let decoded = StatelessHandle::decode(handle)?;
        let service = self.resolve(decoded.slot)?;
        Some((service, decoded.version))
    }

    /// Number of bound slots
    #[must_use]
    pub fn bound(&self) -> usize {
        self.slots.iter().filter(|entry| entry.service.is_some()).count()
    }
}

impl<const K: usize> Default for StatelessTable<K> {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_first_match() {
        let mut table: StatelessTable<4> = StatelessTable::from_sids(&[Sid(0x10), Sid(0x20)]);
        assert_eq!(table.bind(Sid(0x20), ServiceIndex(3)), Some(1));
        assert_eq!(table.resolve(1), Some(ServiceIndex(3)));
        assert_eq!(table.resolve(0), None);
        assert_eq!(table.bind(Sid(0x30), ServiceIndex(4)), None);
        assert_eq!(table.bound(), 1);
    }

    #[test]
    fn test_handle_decode() {
        let handle = STATELESS_HANDLE_INDICATOR | (2 << 8) | 3;
        assert_eq!(
            StatelessHandle::decode(handle),
            Some(StatelessHandle { slot: 2, version: 2 })
        );
        assert_eq!(StatelessHandle::decode(3), None);
        assert_eq!(StatelessHandle::decode(STATELESS_HANDLE_INDICATOR), None);
    }

    #[test]
    fn test_handle_encode() {
        let handle = StatelessHandle { slot: 0, version: 1 };
        assert_eq!(handle.encode(), 0x4000_0101);
        assert_eq!(StatelessHandle::decode(handle.encode()), Some(handle));
    }

    #[test]
    fn test_resolve_handle() {
        let mut table: StatelessTable<2> = StatelessTable::from_sids(&[Sid(0x55)]);
        table.bind(Sid(0x55), ServiceIndex(7));
        let handle = StatelessHandle { slot: 0, version: 1 }.encode();
        assert_eq!(table.resolve_handle(handle), Some((ServiceIndex(7), 1)));
        let unbound = StatelessHandle { slot: 1, version: 1 }.encode();
        assert_eq!(table.resolve_handle(unbound), None);
    }
}
