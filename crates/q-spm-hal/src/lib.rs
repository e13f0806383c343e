// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Hardware Abstraction Layer for the Qbitel SPM
//!
//! The SPM programs four pieces of isolation hardware during boot. This
//! crate hides each behind a trait so the partition manager can be driven
//! against real silicon or against an in-memory model:
//!
//! - **MPU**: ARMv8-M protection unit (region table, enable policy)
//! - **PPC**: peripheral protection controller (secure and privilege gating)
//! - **MPC**: memory protection controller (fault reporting only)
//! - **NVIC**: interrupt target state, enable, pending and priority
//!
//! Platform boot hooks (fault enables, reset policy, debug, NS handoff)
//! live behind [`BootInterface`].
//!
//! # Platforms
//!
//! - **AN521** (`an521` feature): Arm MPS2+ with the SSE-200 subsystem
//! - **Simulated** (`sim` module, always built): register model for host tests

#![no_std]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod traits;
pub mod platform;
pub mod armv8m;
pub mod sim;

#[cfg(feature = "an521")]
pub mod an521;

// Re-export main traits
pub use traits::*;
pub use error::{HalError, HalResult};
pub use platform::{PlatformData, PpcBank, PpcTarget};

/// Platform identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    /// Arm MPS2+ AN521 (Cortex-M33, SSE-200)
    An521,
    /// Host simulation
    Simulated,
}

impl Platform {
    /// Get the platform selected at build time
    #[must_use]
    pub const fn current() -> Self {
        cfg_if::cfg_if! {
            if #[cfg(feature = "an521")] {
                Self::An521
            } else {
                Self::Simulated
            }
        }
    }

    /// Check if the platform has real isolation hardware behind it
    #[must_use]
    pub const fn has_isolation_hw(&self) -> bool {
        matches!(self, Self::An521)
    }

    /// Implemented NVIC priority bits
    #[must_use]
    pub const fn nvic_prio_bits(&self) -> u8 {
        match self {
            Self::An521 | Self::Simulated => 3,
        }
    }
}
