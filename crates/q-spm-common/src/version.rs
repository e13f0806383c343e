// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Framework version handling
//!
//! A partition records the framework version it was built against in the
//! low half of `psa_ff_ver`. The loader refuses partitions built for a
//! newer framework than the one it implements.

use core::cmp::Ordering;
use core::fmt;

use crate::constants::PARTITION_INFO_VERSION_MASK;

/// Framework version as packed by the build tooling (major in the high
/// byte, minor in the low byte)
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FrameworkVersion {
    /// Major version
    pub major: u8,
    /// Minor version
    pub minor: u8,
}

impl FrameworkVersion {
    /// Framework version 1.1, the newest this SPM understands
    pub const SUPPORTED: Self = Self::new(1, 1);

    /// Create a new version
    #[must_use]
    pub const fn new(major: u8, minor: u8) -> Self {
        Self { major, minor }
    }

    /// Decode from the packed 16-bit form
    #[must_use]
    pub const fn from_raw(raw: u16) -> Self {
        Self {
            major: (raw >> 8) as u8,
            minor: (raw & 0xFF) as u8,
        }
    }

    /// Extract from a `psa_ff_ver` word
    #[must_use]
    pub const fn from_psa_ff_ver(word: u32) -> Self {
        Self::from_raw((word & PARTITION_INFO_VERSION_MASK) as u16)
    }

    /// Packed 16-bit form
    #[must_use]
    pub const fn as_raw(self) -> u16 {
        ((self.major as u16) << 8) | self.minor as u16
    }

    /// Check whether a partition built for `self` may run on `supported`
    #[must_use]
    pub const fn is_compatible_with(self, supported: Self) -> bool {
        self.as_raw() <= supported.as_raw()
    }
}

impl PartialOrd for FrameworkVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FrameworkVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_raw().cmp(&other.as_raw())
    }
}

impl fmt::Debug for FrameworkVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FrameworkVersion({}.{})", self.major, self.minor)
    }
}

impl fmt::Display for FrameworkVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_round_trip() {
        assert_eq!(FrameworkVersion::SUPPORTED.as_raw(), 0x0101);
        assert_eq!(FrameworkVersion::from_raw(0x0203), FrameworkVersion::new(2, 3));
    }

    #[test]
    fn test_from_word_ignores_magic() {
        assert_eq!(
            FrameworkVersion::from_psa_ff_ver(0x5F5F_0100),
            FrameworkVersion::new(1, 0)
        );
    }

    #[test]
    fn test_compatibility() {
        let supported = FrameworkVersion::SUPPORTED;
        assert!(FrameworkVersion::new(1, 0).is_compatible_with(supported));
        assert!(FrameworkVersion::new(1, 1).is_compatible_with(supported));
        assert!(!FrameworkVersion::new(1, 2).is_compatible_with(supported));
        assert!(!FrameworkVersion::new(2, 0).is_compatible_with(supported));
    }
}
