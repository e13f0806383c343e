// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Per-peripheral platform resource descriptors
//!
//! An MMIO asset in the descriptor table does not carry an address. It
//! carries a platform-data reference that the platform resolves to the
//! peripheral's address window and the PPC slot guarding it.

/// Peripheral protection controller bank
///
/// Bank naming follows the SSE-200 secure privilege control block. The
/// discriminant order matches the layout of the non-secure access
/// registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PpcBank {
    /// AHB PPC 0
    Ahb0,
    /// AHB expansion PPC 0
    AhbExp0,
    /// AHB expansion PPC 1
    AhbExp1,
    /// AHB expansion PPC 2
    AhbExp2,
    /// AHB expansion PPC 3
    AhbExp3,
    /// APB PPC 0
    Apb0,
    /// APB PPC 1
    Apb1,
    /// APB expansion PPC 0
    ApbExp0,
    /// APB expansion PPC 1
    ApbExp1,
    /// APB expansion PPC 2
    ApbExp2,
    /// APB expansion PPC 3
    ApbExp3,
}

impl PpcBank {
    /// Number of banks
    pub const COUNT: usize = 11;

    /// All banks in register order
    pub const ALL: [Self; Self::COUNT] = [
        Self::Ahb0,
        Self::AhbExp0,
        Self::AhbExp1,
        Self::AhbExp2,
        Self::AhbExp3,
        Self::Apb0,
        Self::Apb1,
        Self::ApbExp0,
        Self::ApbExp1,
        Self::ApbExp2,
        Self::ApbExp3,
    ];

    /// Dense index for per-bank state tables
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Offset of the bank's non-secure access register within SPCTRL
    #[must_use]
    pub const fn ns_offset(self) -> u32 {
        match self {
            Self::Ahb0 => 0x50,
            Self::AhbExp0 => 0x60,
            Self::AhbExp1 => 0x64,
            Self::AhbExp2 => 0x68,
            Self::AhbExp3 => 0x6C,
            Self::Apb0 => 0x70,
            Self::Apb1 => 0x74,
            Self::ApbExp0 => 0x80,
            Self::ApbExp1 => 0x84,
            Self::ApbExp2 => 0x88,
            Self::ApbExp3 => 0x8C,
        }
    }

    /// Offset of the bank's secure unprivileged access register
    ///
    /// The secure unprivileged block mirrors the non-secure block 0x40
    /// bytes higher.
    #[must_use]
    pub const fn sp_offset(self) -> u32 {
        self.ns_offset() + 0x40
    }

    /// Decode the bank number used by the build tooling
    #[must_use]
    pub const fn from_raw(raw: u8) -> Option<Self> {
        if (raw as usize) < Self::COUNT {
            Some(Self::ALL[raw as usize])
        } else {
            None
        }
    }
}

/// PPC slot that gates a peripheral
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PpcTarget {
    /// The peripheral is not behind a configurable PPC slot
    DoNotConfigure,
    /// Bank and bit position within the bank
    Location {
        /// Bank
        bank: PpcBank,
        /// Bit position in the bank's registers
        loc: u8,
    },
}

/// Platform resource descriptor for one peripheral
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlatformData {
    /// First byte of the peripheral window
    pub periph_start: u32,
    /// Last byte of the peripheral window
    pub periph_limit: u32,
    /// PPC slot for the window
    pub ppc: PpcTarget,
}

impl PlatformData {
    /// Descriptor for a peripheral behind a PPC slot
    #[must_use]
    pub const fn new(periph_start: u32, periph_limit: u32, bank: PpcBank, loc: u8) -> Self {
        Self {
            periph_start,
            periph_limit,
            ppc: PpcTarget::Location { bank, loc },
        }
    }

    /// Descriptor for a peripheral the PPC does not gate
    #[must_use]
    pub const fn unguarded(periph_start: u32, periph_limit: u32) -> Self {
        Self {
            periph_start,
            periph_limit,
            ppc: PpcTarget::DoNotConfigure,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bank_offsets() {
        assert_eq!(PpcBank::Apb0.ns_offset(), 0x70);
        assert_eq!(PpcBank::Apb0.sp_offset(), 0xB0);
        assert_eq!(PpcBank::ApbExp2.sp_offset(), 0xC8);
    }

    #[test]
    fn test_bank_from_raw() {
        assert_eq!(PpcBank::from_raw(0), Some(PpcBank::Ahb0));
        assert_eq!(PpcBank::from_raw(10), Some(PpcBank::ApbExp3));
        assert_eq!(PpcBank::from_raw(11), None);
        for bank in PpcBank::ALL {
            assert_eq!(PpcBank::from_raw(bank.index() as u8), Some(bank));
        }
    }
}
