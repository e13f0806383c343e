// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Common types for the Qbitel SPM
//!
//! Identifiers read from the descriptor table, pool handles, and the
//! isolation vocabulary shared by the loader and the hardware layer.

use core::fmt;
use core::ops::{BitOr, BitOrAssign};

/// Service identifier
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Sid(pub u32);

impl Sid {
    /// Raw SID value
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for Sid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sid({:#010x})", self.0)
    }
}

impl fmt::Display for Sid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

/// Partition identifier as declared in the descriptor table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PartitionId(pub u32);

impl fmt::Display for PartitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Signal bitmask
///
/// A partition's allowed signals are the union of the masks of the
/// services it owns.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Signals(u32);

impl Signals {
    /// No signals
    pub const EMPTY: Self = Self(0);

    /// Create a mask from raw bits
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Raw bits
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Check if no signal is set
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Check if every signal in `other` is also set here
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for Signals {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for Signals {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for Signals {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signals({:#x})", self.0)
    }
}

/// Privilege a partition executes with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Privilege {
    /// Privileged thread mode
    Privileged,
    /// Unprivileged thread mode
    Unprivileged,
}

impl Privilege {
    /// Check if this is the privileged level
    #[must_use]
    pub const fn is_privileged(self) -> bool {
        matches!(self, Self::Privileged)
    }
}

/// Isolation level the image was built for
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum IsolationLevel {
    /// SPE isolated from NSPE only
    Level1 = 1,
    /// PSA-RoT additionally isolated from App-RoT
    Level2 = 2,
    /// Every partition isolated from every other
    Level3 = 3,
}

impl IsolationLevel {
    /// Create from the numeric level
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Level1),
            2 => Some(Self::Level2),
            3 => Some(Self::Level3),
            _ => None,
        }
    }

    /// Check if partitions get their own peripheral MPU regions
    #[must_use]
    pub const fn requires_partition_regions(self) -> bool {
        !matches!(self, Self::Level1)
    }

    /// Privilege assigned to a partition at this level
    #[must_use]
    pub const fn privilege_for(self, psa_rot: bool) -> Privilege {
        match self {
            Self::Level1 => Privilege::Privileged,
            Self::Level2 | Self::Level3 => {
                if psa_rot {
                    Privilege::Privileged
                } else {
                    Privilege::Unprivileged
                }
            }
        }
    }
}

/// Security state an interrupt line targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IrqTargetState {
    /// Line is handled by the secure world
    Secure,
    /// Line is handled by the non-secure world
    NonSecure,
}

impl IrqTargetState {
    /// Decode an ITNS bit (set means non-secure)
    #[must_use]
    pub const fn from_itns(bit: bool) -> Self {
        if bit {
            Self::NonSecure
        } else {
            Self::Secure
        }
    }
}

/// External interrupt line number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IrqLine(pub u16);

impl IrqLine {
    /// Line number as an index
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// ITNS/ISER word holding this line
    #[must_use]
    pub const fn word(self) -> usize {
        (self.0 / 32) as usize
    }

    /// Bit within [`Self::word`]
    #[must_use]
    pub const fn bit(self) -> u32 {
        1 << (self.0 % 32)
    }
}

/// Handle of a loaded partition in the partition pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PartitionIndex(pub usize);

/// Handle of a loaded service in the service pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ServiceIndex(pub usize);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signals_union() {
        let mut s = Signals::EMPTY;
        s |= Signals::from_bits(0x2);
        s |= Signals::from_bits(0x4);
        assert_eq!(s.bits(), 0x6);
        assert!(s.contains(Signals::from_bits(0x4)));
        assert!(!s.contains(Signals::from_bits(0x1)));
    }

    #[test]
    fn test_privilege_by_level() {
        assert_eq!(IsolationLevel::Level1.privilege_for(false), Privilege::Privileged);
        assert_eq!(IsolationLevel::Level2.privilege_for(true), Privilege::Privileged);
        assert_eq!(IsolationLevel::Level2.privilege_for(false), Privilege::Unprivileged);
        assert_eq!(IsolationLevel::Level3.privilege_for(false), Privilege::Unprivileged);
        assert!(!IsolationLevel::Level1.requires_partition_regions());
        assert!(IsolationLevel::Level3.requires_partition_regions());
    }

    #[test]
    fn test_irq_line_word_bit() {
        let line = IrqLine(41);
        assert_eq!(line.word(), 1);
        assert_eq!(line.bit(), 1 << 9);
    }
}
