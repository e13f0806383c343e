// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! HAL error types

use core::fmt;

/// HAL error type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HalError {
    /// Hardware not initialized
    NotInitialized,
    /// Invalid parameter
    InvalidParameter,
    /// MPU region number outside the implemented range
    InvalidRegion,
    /// Region base or limit not on a 32-byte boundary
    InvalidAlignment,
    /// Region limit below its base
    InvalidRange,
    /// PPC bank or location does not exist
    InvalidPpcLocation,
    /// Interrupt line outside the implemented range
    InvalidIrqLine,
    /// Register did not read back the written value
    VerifyFailed,
    /// Hardware busy
    Busy,
    /// Operation not supported
    NotSupported,
    /// Hardware fault detected
    HardwareFault,
}

impl HalError {
    /// Get error code
    #[must_use]
    pub const fn code(&self) -> u16 {
        match self {
            Self::NotInitialized => 0x0801,
            Self::InvalidParameter => 0x08F0,
            Self::InvalidRegion => 0x0810,
            Self::InvalidAlignment => 0x0811,
            Self::InvalidRange => 0x0812,
            Self::InvalidPpcLocation => 0x0820,
            Self::InvalidIrqLine => 0x0830,
            Self::VerifyFailed => 0x08C2,
            Self::Busy => 0x08F2,
            Self::NotSupported => 0x08FF,
            Self::HardwareFault => 0x08D0,
        }
    }

    /// Get error description
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::NotInitialized => "not initialized",
            Self::InvalidParameter => "invalid parameter",
            Self::InvalidRegion => "invalid MPU region",
            Self::InvalidAlignment => "MPU region not 32-byte aligned",
            Self::InvalidRange => "MPU region limit below base",
            Self::InvalidPpcLocation => "invalid PPC bank or location",
            Self::InvalidIrqLine => "invalid IRQ line",
            Self::VerifyFailed => "register readback mismatch",
            Self::Busy => "busy",
            Self::NotSupported => "not supported",
            Self::HardwareFault => "hardware fault detected",
        }
    }
}

impl fmt::Display for HalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[0x{:04X}] {}", self.code(), self.description())
    }
}

impl From<HalError> for q_spm_common::Error {
    fn from(e: HalError) -> Self {
        match e {
            HalError::InvalidRegion | HalError::InvalidAlignment | HalError::InvalidRange => {
                Self::MpuConfigFailed
            }
            HalError::InvalidPpcLocation => Self::PpcConfigFailed,
            HalError::InvalidIrqLine => Self::InvalidIrqLine,
            HalError::VerifyFailed => Self::IsolationSelfCheckFailed,
            HalError::InvalidParameter => Self::InvalidParameter,
            HalError::NotSupported => Self::NotSupported,
            HalError::NotInitialized | HalError::Busy | HalError::HardwareFault => {
                Self::HardwareFault
            }
        }
    }
}

/// HAL Result type
pub type HalResult<T> = Result<T, HalError>;
