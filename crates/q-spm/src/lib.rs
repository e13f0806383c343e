// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Qbitel Secure Partition Manager
//!
//! The trust-boundary core of a TrustZone-M secure partition manager:
//! - Static loading of partitions and services from the build-time
//!   descriptor table into fixed pools
//! - Per-partition isolation setup on the MPU and the peripheral protection
//!   controllers
//! - Secure interrupt routing and the isolation fault surface
//!
//! # Architecture
//!
//! The SPM runs once, single-threaded, before any partition executes:
//!
//! ```text
//! descriptor table ──> StaticLoader ──> Partition / Service pools
//!                                            │
//!                      IsolationConfigurator ┤ (MPU, PPC)
//!                                            │
//!                      interrupt routing ────┘ (NVIC, boot hooks)
//! ```
//!
//! Every failure while establishing isolation is fatal and ends in
//! [`panic::spm_panic`].
//!
//! # Usage
//!
//! ```rust,ignore
//! use q_spm::{DefaultPolicy, DefaultSpm, DescriptorTable, StatelessTable};
//! use q_spm_common::SpmConfig;
//!
//! let table = unsafe { DescriptorTable::from_linker_region(start, end) };
//! let mut spm = DefaultSpm::new(SpmConfig::DEFAULT, table, StatelessTable::from_sids(&STATELESS_SIDS));
//! spm.boot::<DefaultPolicy, _>(&mut platform);
//! let ns = spm.ns_entry(&platform)?;
//! ```

#![no_std]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod boot;
pub mod fih;
pub mod irq;
pub mod isolation;
pub mod ldinf;
pub mod load;
pub mod panic;
pub mod partition;
pub mod pool;
pub mod stateless;

pub use boot::{NsEntry, Spm, SpmState};
pub use fih::{DefaultPolicy, FihInt, FihPolicy, Hardened, PlatStatus, Unhardened};
pub use isolation::IsolationConfigurator;
pub use ldinf::{DescriptorTable, PartitionLoadInfo, ServiceLoadInfo};
pub use load::StaticLoader;
pub use panic::spm_panic;
pub use partition::{Partition, Service, ServiceList};
pub use stateless::{StatelessHandle, StatelessTable};

use q_spm_common::constants::{
    DEFAULT_PARTITION_POOL_SIZE, DEFAULT_SERVICE_POOL_SIZE, STATELESS_HANDLE_NUM_LIMIT,
};

/// SPM with the default pool sizes
pub type DefaultSpm<'t> =
    Spm<'t, DEFAULT_PARTITION_POOL_SIZE, DEFAULT_SERVICE_POOL_SIZE, STATELESS_HANDLE_NUM_LIMIT>;

/// Loader with the default pool sizes
pub type DefaultLoader<'t> =
    StaticLoader<'t, DEFAULT_PARTITION_POOL_SIZE, DEFAULT_SERVICE_POOL_SIZE, STATELESS_HANDLE_NUM_LIMIT>;
