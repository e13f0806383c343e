// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Layout constants for the SPM descriptor table and runtime pools
//!
//! The descriptor table is emitted by the build tooling; every value here
//! must match what that tooling writes.

// =============================================================================
// Partition Load Info
// =============================================================================

/// Mask selecting the magic half of `psa_ff_ver`
pub const PARTITION_INFO_MAGIC_MASK: u32 = 0xFFFF_0000;

/// Expected magic after masking
pub const PARTITION_INFO_MAGIC: u32 = 0x5F5F_0000;

/// Mask selecting the framework version half of `psa_ff_ver`
pub const PARTITION_INFO_VERSION_MASK: u32 = 0x0000_FFFF;

/// Size of the fixed partition load info header in bytes
pub const PARTITION_LOAD_INFO_SIZE: usize = 40;

/// Partition flag bits 0..7 carry the scheduling priority
pub const PARTITION_FLAG_PRIORITY_MASK: u32 = 0x0000_00FF;

/// Partition belongs to the PSA root of trust
pub const PARTITION_FLAG_PSA_ROT: u32 = 1 << 8;

/// Partition uses the IPC model
pub const PARTITION_FLAG_IPC: u32 = 1 << 9;

// =============================================================================
// Trailing Records
// =============================================================================

/// Size of one service load info record in bytes
pub const SERVICE_LOAD_INFO_SIZE: usize = 20;

/// Size of one dependency record in bytes
pub const DEPENDENCY_SIZE: usize = 4;

/// Size of one asset record in bytes
pub const ASSET_SIZE: usize = 12;

/// Size of one IRQ record in bytes
pub const IRQ_INFO_SIZE: usize = 12;

/// Service may be connected to from the non-secure world
pub const SERVICE_FLAG_NS_ACCESSIBLE: u32 = 1 << 8;

/// Service is stateless and owns a reserved dispatch slot
pub const SERVICE_FLAG_STATELESS: u32 = 1 << 9;

/// Service requires an exact version match
pub const SERVICE_FLAG_VERSION_STRICT: u32 = 1 << 10;

/// Asset is read-only memory
pub const ASSET_ATTR_READ_ONLY: u32 = 1 << 0;

/// Asset is read-write memory
pub const ASSET_ATTR_READ_WRITE: u32 = 1 << 1;

/// Asset is a peripheral; its start field references platform data
pub const ASSET_ATTR_MMIO: u32 = 1 << 2;

// =============================================================================
// Stateless Handles
// =============================================================================

/// Number of reserved stateless dispatch slots
pub const STATELESS_HANDLE_NUM_LIMIT: usize = 32;

/// Indicator bit marking a handle as stateless
pub const STATELESS_HANDLE_INDICATOR: u32 = 1 << 30;

/// Mask of the slot index field
pub const STATELESS_HANDLE_INDEX_MASK: u32 = 0x1F;

/// Shift of the service version field
pub const STATELESS_HANDLE_VERSION_SHIFT: u32 = 8;

/// Mask of the service version field after shifting
pub const STATELESS_HANDLE_VERSION_MASK: u32 = 0xFF;

// =============================================================================
// Pools
// =============================================================================

/// Default partition pool capacity
pub const DEFAULT_PARTITION_POOL_SIZE: usize = 8;

/// Default service pool capacity
pub const DEFAULT_SERVICE_POOL_SIZE: usize = 32;

/// MPU regions a single partition may hold
///
/// ARMv8-M implements at most 16 regions, so a partition can hold every
/// region of the peripheral window.
pub const MAX_REGIONS_PER_PARTITION: usize = MPU_MAX_REGIONS as usize;

// =============================================================================
// Isolation
// =============================================================================

/// Architectural upper bound on ARMv8-M MPU regions
pub const MPU_MAX_REGIONS: u8 = 16;

/// First MPU region number handed out to partition peripherals
pub const PARTITION_REGION_PERIPH_START: u8 = 5;

/// Number of MPU regions handed out to partition peripherals
pub const PARTITION_REGION_PERIPH_MAX_NUM: u8 = 2;

/// MAIR attribute index used for device memory
pub const MPU_ATTR_DEVICE_INDEX: u8 = 0;

/// Implemented NVIC priority bits on Cortex-M33 reference designs
pub const NVIC_PRIO_BITS: u8 = 3;
