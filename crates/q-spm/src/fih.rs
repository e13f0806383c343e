// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Verified calls
//!
//! Hardware configuration calls made while building isolation are wrapped
//! in a [`FihPolicy`]. Call sites are the same under both policies:
//!
//! ```rust,ignore
//! let rc = P::call(|| hw.mpu_disable());
//! if !P::is_success(rc) {
//!     return P::encode(PlatStatus::SystemError);
//! }
//! ```
//!
//! [`Hardened`] carries every status as a [`FihInt`], a value stored next
//! to its masked complement. Every use validates the pair and comparisons
//! are made twice in constant time, so a single glitched register or
//! skipped branch is detected and taken to the fatal path.
//! [`Unhardened`] passes a plain [`PlatStatus`] around.

use core::fmt;

use q_spm_common::Error;
use q_spm_hal::HalResult;
use subtle::ConstantTimeEq;

use crate::panic::spm_panic;

// =============================================================================
// Platform Status
// =============================================================================

/// Enum-coded platform result
///
/// Discriminants are far apart in Hamming distance so that a single bit
/// flip cannot turn one status into another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum PlatStatus {
    /// Operation succeeded
    Success = 0,
    /// Underlying hardware call failed
    SystemError = 0x3A5C,
    /// Fixed resource exhausted
    MaxValue = 0x55A3,
    /// Caller supplied invalid input
    InvalidInput = 0xA3AA,
    /// Operation not supported on this platform
    Unsupported = 0xA5C3,
    /// Operation not permitted
    NotPermitted = 0xC35A,
}

impl PlatStatus {
    /// Every status
    pub const ALL: [Self; 6] = [
        Self::Success,
        Self::SystemError,
        Self::MaxValue,
        Self::InvalidInput,
        Self::Unsupported,
        Self::NotPermitted,
    ];

    /// Raw discriminant
    #[must_use]
    pub const fn raw(self) -> i32 {
        self as i32
    }

    /// Decode a raw discriminant
    #[must_use]
    pub fn from_raw(raw: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.raw() == raw)
    }

    /// Check for success
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}

impl fmt::Display for PlatStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Success => "success",
            Self::SystemError => "system error",
            Self::MaxValue => "resource exhausted",
            Self::InvalidInput => "invalid input",
            Self::Unsupported => "unsupported",
            Self::NotPermitted => "not permitted",
        };
        f.write_str(name)
    }
}

// =============================================================================
// Hardened Integer
// =============================================================================

/// Mask combined with every hardened value
pub const FIH_MASK_VALUE: i32 = 0x0A5C_35A3;

/// Value stored together with its masked complement
#[derive(Clone, Copy)]
pub struct FihInt {
    val: i32,
    msk: i32,
}

impl FihInt {
    /// Encoded success
    pub const SUCCESS: Self = Self::encode(0);

    /// Encode a value
    #[must_use]
    pub const fn encode(val: i32) -> Self {
        Self {
            val,
            msk: val ^ FIH_MASK_VALUE,
        }
    }

    /// Build from raw halves, as read back from storage
    #[must_use]
    pub const fn from_parts(val: i32, msk: i32) -> Self {
        Self { val, msk }
    }

    /// Check the pair without taking the fatal path
    #[must_use]
    pub const fn is_consistent(self) -> bool {
        self.val ^ self.msk == FIH_MASK_VALUE
    }

    /// Validated value
    ///
    /// An inconsistent pair is fatal.
    #[must_use]
    pub fn decode(self) -> i32 {
        if !self.is_consistent() {
            spm_panic(Error::FaultInjectionDetected);
        }
        self.val
    }

    /// Constant-time equality over both halves
    ///
    /// Both pairs are validated first. The value and mask comparisons must
    /// agree; a disagreement is fatal.
    #[must_use]
    pub fn ct_equals(self, other: Self) -> bool {
        let a = self.decode();
        let b = other.decode();

        let by_value = bool::from(a.ct_eq(&b));
        let by_mask = bool::from(self.msk.ct_eq(&other.msk));
        if by_value != by_mask {
            spm_panic(Error::FaultInjectionDetected);
        }
        by_value
    }
}

impl fmt::Debug for FihInt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FihInt({:#x}, mask {:#x})", self.val, self.msk)
    }
}

// =============================================================================
// Policies
// =============================================================================

/// Verified-call policy
pub trait FihPolicy {
    /// Status token carried between calls
    type Rc: Copy + fmt::Debug;

    /// Whether redundant verification is performed
    const HARDENED: bool;

    /// Encode a status
    fn encode(status: PlatStatus) -> Self::Rc;

    /// Decode a token back to a status
    fn status(rc: Self::Rc) -> PlatStatus;

    /// Check a token for success
    fn is_success(rc: Self::Rc) -> bool;

    /// Run one hardware call and map its outcome
    fn call<F>(op: F) -> Self::Rc
    where
        F: FnOnce() -> HalResult<()>,
    {
        match op() {
            Ok(()) => Self::encode(PlatStatus::Success),
            Err(_) => Self::encode(PlatStatus::SystemError),
        }
    }

    /// Take the fatal path unless `rc` is a success
    fn require(rc: Self::Rc, reason: Error) {
        if !Self::is_success(rc) {
            spm_panic(reason);
        }
    }
}

/// Fault-injection hardened policy
#[derive(Debug, Clone, Copy)]
pub struct Hardened;

impl FihPolicy for Hardened {
    type Rc = FihInt;

    const HARDENED: bool = true;

    fn encode(status: PlatStatus) -> FihInt {
        FihInt::encode(status.raw())
    }

    fn status(rc: FihInt) -> PlatStatus {
        match PlatStatus::from_raw(rc.decode()) {
            Some(status) => status,
            None => spm_panic(Error::FaultInjectionDetected),
        }
    }

    fn is_success(rc: FihInt) -> bool {
        rc.ct_equals(FihInt::SUCCESS)
    }
}

/// Plain enum-returning policy
#[derive(Debug, Clone, Copy)]
pub struct Unhardened;

impl FihPolicy for Unhardened {
    type Rc = PlatStatus;

    const HARDENED: bool = false;

    fn encode(status: PlatStatus) -> PlatStatus {
        status
    }

    fn status(rc: PlatStatus) -> PlatStatus {
        rc
    }

    fn is_success(rc: PlatStatus) -> bool {
        rc.is_success()
    }
}

cfg_if::cfg_if! {
    if #[cfg(feature = "fih-profile-on")] {
        /// Policy selected by the build profile
        pub type DefaultPolicy = Hardened;
    } else {
        /// Policy selected by the build profile
        pub type DefaultPolicy = Unhardened;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use q_spm_hal::HalError;

    #[test]
    fn test_status_round_trip() {
        for status in PlatStatus::ALL {
            assert_eq!(PlatStatus::from_raw(status.raw()), Some(status));
        }
        assert_eq!(PlatStatus::from_raw(1), None);
    }

    #[test]
    fn test_fih_int_consistency() {
        let rc = FihInt::encode(PlatStatus::MaxValue.raw());
        assert!(rc.is_consistent());
        assert_eq!(rc.decode(), 0x55A3);
        assert!(!FihInt::from_parts(0, 0).is_consistent());
    }

    #[test]
    fn test_fih_int_ct_equals() {
        assert!(FihInt::SUCCESS.ct_equals(FihInt::encode(0)));
        assert!(!FihInt::SUCCESS.ct_equals(FihInt::encode(PlatStatus::SystemError.raw())));
    }

    #[test]
    #[should_panic(expected = "fault injection detected")]
    fn test_glitched_value_is_fatal() {
        // Value forced to success while the mask still encodes an error
        let glitched = FihInt::from_parts(0, PlatStatus::SystemError.raw() ^ FIH_MASK_VALUE);
        let _ = Hardened::is_success(glitched);
    }

    #[test]
    fn test_policies_agree() {
        let ok = || -> HalResult<()> { Ok(()) };
        let fail = || -> HalResult<()> { Err(HalError::HardwareFault) };

        assert!(Hardened::is_success(Hardened::call(ok)));
        assert!(Unhardened::is_success(Unhardened::call(ok)));
        assert_eq!(Hardened::status(Hardened::call(fail)), PlatStatus::SystemError);
        assert_eq!(Unhardened::status(Unhardened::call(fail)), PlatStatus::SystemError);
    }
}
