// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Error types for the Qbitel secure partition manager
//!
//! This module defines the unified error type used throughout the SPM.
//! Most of these values never travel back to a caller: a corrupted
//! descriptor table or an exhausted pool is handed straight to the fatal
//! path, and the error only serves as the recorded panic reason.

use core::fmt;

/// Result type alias for SPM operations
pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for the SPM
///
/// Each variant maps to a stable 16-bit code so that a panic reason
/// persisted across reset can be decoded by tooling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    // =========================================================================
    // Descriptor Table / Loader Errors (0x01xx)
    // =========================================================================
    /// Descriptor table region is malformed (limit below base)
    InvalidTableRegion,
    /// Declared load info size overflows address arithmetic
    LoadInfoSizeOverflow,
    /// Declared load info size runs past the end of the table
    LoadInfoOutOfBounds,
    /// Partition load info magic mismatch
    BadPartitionMagic,
    /// Partition was built for a newer framework version
    UnsupportedFrameworkVersion,
    /// Partition is not IPC capable
    NotIpcPartition,
    /// Partition pool is exhausted
    PartitionPoolExhausted,
    /// Service pool is exhausted
    ServicePoolExhausted,
    /// Stateless service has no reserved slot
    StatelessSlotMissing,
    /// Partition index does not refer to a loaded partition
    InvalidPartitionIndex,
    /// Services of a partition were already loaded
    ServicesAlreadyLoaded,

    // =========================================================================
    // Isolation Errors (0x02xx)
    // =========================================================================
    /// Platform data descriptor missing
    InvalidPlatformData,
    /// All peripheral MPU regions are already assigned
    PeripheralRegionsExhausted,
    /// MPU programming failed
    MpuConfigFailed,
    /// Peripheral protection controller programming failed
    PpcConfigFailed,
    /// Isolation setup for a partition did not succeed
    IsolationSetupFailed,

    // =========================================================================
    // Interrupt Errors (0x03xx)
    // =========================================================================
    /// Interrupt line number out of range
    InvalidIrqLine,
    /// Interrupt line could not be targeted to the secure state
    IrqRetargetRefused,

    // =========================================================================
    // Boot Errors (0x04xx)
    // =========================================================================
    /// Boot state machine transition not permitted
    InvalidStateTransition,
    /// A platform boot hook reported failure
    BootHookFailed,
    /// Isolation hardware self-check failed
    IsolationSelfCheckFailed,
    /// Verified-call value was tampered with
    FaultInjectionDetected,

    // =========================================================================
    // Isolation Violation Errors (0x05xx)
    // =========================================================================
    /// Memory protection controller tripped
    MpcFault,
    /// Peripheral protection controller tripped
    PpcFault,

    // =========================================================================
    // General Errors (0xFFxx)
    // =========================================================================
    /// Invalid parameter provided
    InvalidParameter,
    /// Operation not supported on this platform
    NotSupported,
    /// Hardware reported a fault
    HardwareFault,
    /// Internal error (should not occur)
    InternalError,
}

impl Error {
    /// Get the error code for this error
    ///
    /// Error codes are organized by category:
    /// - 0x01xx: Descriptor table / loader errors
    /// - 0x02xx: Isolation errors
    /// - 0x03xx: Interrupt errors
    /// - 0x04xx: Boot errors
    /// - 0x05xx: Isolation violations
    /// - 0xFFxx: General errors
    #[must_use]
    pub const fn code(&self) -> u16 {
        match self {
            // Loader errors (0x01xx)
            Self::InvalidTableRegion => 0x0101,
            Self::LoadInfoSizeOverflow => 0x0102,
            Self::LoadInfoOutOfBounds => 0x0103,
            Self::BadPartitionMagic => 0x0104,
            Self::UnsupportedFrameworkVersion => 0x0105,
            Self::NotIpcPartition => 0x0106,
            Self::PartitionPoolExhausted => 0x0107,
            Self::ServicePoolExhausted => 0x0108,
            Self::StatelessSlotMissing => 0x0109,
            Self::InvalidPartitionIndex => 0x010A,
            Self::ServicesAlreadyLoaded => 0x010B,

            // Isolation errors (0x02xx)
            Self::InvalidPlatformData => 0x0201,
            Self::PeripheralRegionsExhausted => 0x0202,
            Self::MpuConfigFailed => 0x0203,
            Self::PpcConfigFailed => 0x0204,
            Self::IsolationSetupFailed => 0x0205,

            // Interrupt errors (0x03xx)
            Self::InvalidIrqLine => 0x0301,
            Self::IrqRetargetRefused => 0x0302,

            // Boot errors (0x04xx)
            Self::InvalidStateTransition => 0x0401,
            Self::BootHookFailed => 0x0402,
            Self::IsolationSelfCheckFailed => 0x0403,
            Self::FaultInjectionDetected => 0x0404,

            // Violations (0x05xx)
            Self::MpcFault => 0x0501,
            Self::PpcFault => 0x0502,

            // General errors (0xFFxx)
            Self::InvalidParameter => 0xFF01,
            Self::NotSupported => 0xFF02,
            Self::HardwareFault => 0xFF03,
            Self::InternalError => 0xFFFF,
        }
    }

    /// Check if this is a security-critical error
    ///
    /// Security errors indicate the isolation model cannot be trusted,
    /// as opposed to a caller handing in bad input.
    #[must_use]
    pub const fn is_security_error(&self) -> bool {
        matches!(
            self,
            Self::LoadInfoSizeOverflow
                | Self::LoadInfoOutOfBounds
                | Self::BadPartitionMagic
                | Self::IsolationSelfCheckFailed
                | Self::FaultInjectionDetected
                | Self::IrqRetargetRefused
                | Self::MpcFault
                | Self::PpcFault
        )
    }

    /// Check if this error is reported to the caller instead of halting
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::InvalidPlatformData | Self::InvalidParameter)
    }

    /// Get a short description of the error
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::InvalidTableRegion => "descriptor table region invalid",
            Self::LoadInfoSizeOverflow => "load info size overflows address space",
            Self::LoadInfoOutOfBounds => "load info exceeds descriptor table bound",
            Self::BadPartitionMagic => "partition load info magic mismatch",
            Self::UnsupportedFrameworkVersion => "unsupported framework version",
            Self::NotIpcPartition => "partition is not IPC capable",
            Self::PartitionPoolExhausted => "partition pool exhausted",
            Self::ServicePoolExhausted => "service pool exhausted",
            Self::StatelessSlotMissing => "stateless service has no reserved slot",
            Self::InvalidPartitionIndex => "invalid partition index",
            Self::ServicesAlreadyLoaded => "partition services already loaded",
            Self::InvalidPlatformData => "platform data missing",
            Self::PeripheralRegionsExhausted => "peripheral MPU regions exhausted",
            Self::MpuConfigFailed => "MPU configuration failed",
            Self::PpcConfigFailed => "PPC configuration failed",
            Self::IsolationSetupFailed => "partition isolation setup failed",
            Self::InvalidIrqLine => "invalid IRQ line",
            Self::IrqRetargetRefused => "IRQ line refused secure target state",
            Self::InvalidStateTransition => "invalid SPM state transition",
            Self::BootHookFailed => "platform boot hook failed",
            Self::IsolationSelfCheckFailed => "isolation hardware self-check failed",
            Self::FaultInjectionDetected => "fault injection detected",
            Self::MpcFault => "MPC fault",
            Self::PpcFault => "PPC fault",
            Self::InvalidParameter => "invalid parameter",
            Self::NotSupported => "not supported",
            Self::HardwareFault => "hardware fault",
            Self::InternalError => "internal error",
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[0x{:04X}] {}", self.code(), self.description())
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "[0x{:04X}] {}", self.code(), self.description());
    }
}
