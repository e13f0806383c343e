// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! ARMv8-M Memory Protection Unit
//!
//! The ARMv8-M PMSA replaces the ARMv7-M size/subregion encoding with a
//! base/limit pair at 32-byte granularity, and moves memory type into the
//! MAIR attribute registers.
//!
//! # Register Layout
//!
//! | Register | Fields                                           |
//! |----------|--------------------------------------------------|
//! | RBAR     | BASE[31:5] SH[4:3] AP[2:1] XN[0]                 |
//! | RLAR     | LIMIT[31:5] AttrIndx[3:1] EN[0]                  |
//! | MAIR0    | Attr0[7:0] Attr1[15:8] Attr2[23:16] Attr3[31:24] |

use super::registers::{read_reg, write_reg};
use crate::error::{HalError, HalResult};
use crate::traits::MpuInterface;

// ============================================================================
// MPU Register Definitions (secure MPU)
// ============================================================================

/// MPU base address
const MPU_BASE: u32 = 0xE000_ED90;

/// MPU Type Register
const MPU_TYPE: u32 = MPU_BASE;

/// MPU Control Register
const MPU_CTRL: u32 = MPU_BASE + 0x04;

/// MPU Region Number Register
const MPU_RNR: u32 = MPU_BASE + 0x08;

/// MPU Region Base Address Register
const MPU_RBAR: u32 = MPU_BASE + 0x0C;

/// MPU Region Limit Address Register
const MPU_RLAR: u32 = MPU_BASE + 0x10;

/// MPU Memory Attribute Indirection Register 0
const MPU_MAIR0: u32 = MPU_BASE + 0x30;

// MPU_CTRL bits
const MPU_CTRL_ENABLE: u32 = 1 << 0;
const MPU_CTRL_HFNMIENA: u32 = 1 << 1;
const MPU_CTRL_PRIVDEFENA: u32 = 1 << 2;

// RBAR / RLAR fields
const ADDR_MASK: u32 = !0x1F;
const RBAR_SH_SHIFT: u32 = 3;
const RBAR_AP_SHIFT: u32 = 1;
const RBAR_XN: u32 = 1 << 0;
const RLAR_ATTR_SHIFT: u32 = 1;
const RLAR_EN: u32 = 1 << 0;

/// MAIR encoding for Device-nGnRE
pub const MAIR_DEVICE_NGNRE: u8 = 0x04;

/// MAIR encoding for Normal memory, write-back, read/write allocate
pub const MAIR_NORMAL_WB: u8 = 0xFF;

/// Attribute index holding [`MAIR_DEVICE_NGNRE`]
pub const ATTR_INDEX_DEVICE: u8 = 0;

/// Attribute index holding [`MAIR_NORMAL_WB`]
pub const ATTR_INDEX_NORMAL: u8 = 1;

/// Access permission field (RBAR.AP)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MpuAccess {
    /// Read-write, privileged code only
    RwPrivOnly = 0b00,
    /// Read-write, any privilege
    RwPrivUnpriv = 0b01,
    /// Read-only, privileged code only
    RoPrivOnly = 0b10,
    /// Read-only, any privilege
    RoPrivUnpriv = 0b11,
}

impl MpuAccess {
    /// Check if unprivileged code can reach the region
    #[must_use]
    pub const fn unprivileged_allowed(self) -> bool {
        matches!(self, Self::RwPrivUnpriv | Self::RoPrivUnpriv)
    }
}

/// Shareability field (RBAR.SH)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Shareability {
    /// Non-shareable
    None = 0b00,
    /// Outer shareable
    Outer = 0b10,
    /// Inner shareable
    Inner = 0b11,
}

/// Configuration of one MPU region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MpuRegionConfig {
    /// Region number
    pub region: u8,
    /// First byte, 32-byte aligned
    pub base: u32,
    /// Last byte, low five bits all ones
    pub limit: u32,
    /// MAIR attribute index
    pub attr_index: u8,
    /// Access permissions
    pub access: MpuAccess,
    /// Shareability
    pub shareability: Shareability,
    /// Forbid instruction fetch
    pub execute_never: bool,
}

impl MpuRegionConfig {
    /// Peripheral window reachable from both privilege levels
    ///
    /// Device memory, read-write, non-shareable, execute-never.
    #[must_use]
    pub const fn peripheral(region: u8, base: u32, limit: u32) -> Self {
        Self {
            region,
            base,
            limit,
            attr_index: ATTR_INDEX_DEVICE,
            access: MpuAccess::RwPrivUnpriv,
            shareability: Shareability::None,
            execute_never: true,
        }
    }

    /// Set access permissions
    #[must_use]
    pub const fn with_access(mut self, access: MpuAccess) -> Self {
        self.access = access;
        self
    }

    /// Set instruction fetch policy
    #[must_use]
    pub const fn with_execute_never(mut self, xn: bool) -> Self {
        self.execute_never = xn;
        self
    }

    /// Check the region against the hardware's constraints
    ///
    /// # Errors
    ///
    /// Returns an error if the region number is not implemented, either
    /// bound is off the 32-byte grid, or the limit is below the base.
    pub fn validate(&self, region_count: u8) -> HalResult<()> {
        if self.region >= region_count {
            return Err(HalError::InvalidRegion);
        }
        if self.base & !ADDR_MASK != 0 || self.limit & !ADDR_MASK != !ADDR_MASK {
            return Err(HalError::InvalidAlignment);
        }
        if self.limit < self.base {
            return Err(HalError::InvalidRange);
        }
        if self.attr_index > 7 {
            return Err(HalError::InvalidParameter);
        }
        Ok(())
    }

    /// RBAR value for this region
    #[must_use]
    pub const fn rbar(&self) -> u32 {
        let mut rbar = self.base & ADDR_MASK;
        rbar |= (self.shareability as u32) << RBAR_SH_SHIFT;
        rbar |= (self.access as u32) << RBAR_AP_SHIFT;
        if self.execute_never {
            rbar |= RBAR_XN;
        }
        rbar
    }

    /// RLAR value for this region, with the enable bit set
    #[must_use]
    pub const fn rlar(&self) -> u32 {
        (self.limit & ADDR_MASK) | (((self.attr_index & 0x7) as u32) << RLAR_ATTR_SHIFT) | RLAR_EN
    }
}

/// CTRL value for an enable request
#[must_use]
pub const fn ctrl_value(privdef: bool, hfnmi: bool) -> u32 {
    let mut ctrl = MPU_CTRL_ENABLE;
    if privdef {
        ctrl |= MPU_CTRL_PRIVDEFENA;
    }
    if hfnmi {
        ctrl |= MPU_CTRL_HFNMIENA;
    }
    ctrl
}

/// Secure MPU driver
pub struct Armv8mMpu {
    num_regions: u8,
}

impl Armv8mMpu {
    /// Create an uninitialized driver
    #[must_use]
    pub const fn new() -> Self {
        Self { num_regions: 0 }
    }

    /// Detect the region count and load the MAIR attributes
    ///
    /// # Errors
    ///
    /// Returns `NotSupported` if no MPU regions are implemented.
    pub fn init(&mut self) -> HalResult<()> {
        // SAFETY: MPU_TYPE is an architecturally defined read-only register.
        let mpu_type = unsafe { read_reg(MPU_TYPE) };
        let dregion = ((mpu_type >> 8) & 0xFF) as u8;
        if dregion == 0 {
            return Err(HalError::NotSupported);
        }
        self.num_regions = dregion;

        let mair = u32::from(MAIR_DEVICE_NGNRE) | (u32::from(MAIR_NORMAL_WB) << 8);
        // SAFETY: MAIR0 only holds memory type encodings; no region refers to
        // an index before the MPU is enabled.
        unsafe { write_reg(MPU_MAIR0, mair) };
        Ok(())
    }
}

impl Default for Armv8mMpu {
    fn default() -> Self {
        Self::new()
    }
}

impl MpuInterface for Armv8mMpu {
    fn mpu_region_count(&self) -> u8 {
        self.num_regions
    }

    fn mpu_disable(&mut self) -> HalResult<()> {
        super::dsb();
        // SAFETY: Writing 0 to MPU_CTRL disables the MPU. Boot code runs
        // privileged with the default map, so no access faults result.
        unsafe { write_reg(MPU_CTRL, 0) };
        super::dsb();
        super::isb();
        Ok(())
    }

    fn mpu_enable(&mut self, privdef: bool, hfnmi: bool) -> HalResult<()> {
        if self.num_regions == 0 {
            return Err(HalError::NotInitialized);
        }
        // SAFETY: MPU_CTRL is the architecturally defined control register.
        unsafe { write_reg(MPU_CTRL, ctrl_value(privdef, hfnmi)) };
        super::dsb();
        super::isb();
        Ok(())
    }

    fn mpu_region_enable(&mut self, config: &MpuRegionConfig) -> HalResult<()> {
        config.validate(self.num_regions)?;
        // SAFETY: RNR/RBAR/RLAR select and program one region. The region
        // number and bounds were validated above.
        unsafe {
            write_reg(MPU_RNR, u32::from(config.region));
            write_reg(MPU_RBAR, config.rbar());
            write_reg(MPU_RLAR, config.rlar());
        }
        super::dsb();
        super::isb();
        Ok(())
    }

    fn mpu_region_disable(&mut self, region: u8) -> HalResult<()> {
        if region >= self.num_regions {
            return Err(HalError::InvalidRegion);
        }
        // SAFETY: Clearing RLAR.EN disables the selected region. The region
        // number is bounds-checked above.
        unsafe {
            write_reg(MPU_RNR, u32::from(region));
            write_reg(MPU_RLAR, 0);
        }
        super::dsb();
        super::isb();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peripheral_region_encoding() {
        let cfg = MpuRegionConfig::peripheral(5, 0x5010_0000, 0x5010_0FFF);
        // base | SH=00 | AP=01 | XN
        assert_eq!(cfg.rbar(), 0x5010_0000 | (0b01 << 1) | 1);
        // limit | AttrIndx=0 | EN
        assert_eq!(cfg.rlar(), 0x5010_0FE0 | 1);
    }

    #[test]
    fn test_privileged_read_only_encoding() {
        let cfg = MpuRegionConfig::peripheral(1, 0x1000_0000, 0x1000_001F)
            .with_access(MpuAccess::RoPrivOnly)
            .with_execute_never(false);
        assert_eq!(cfg.rbar(), 0x1000_0000 | (0b10 << 1));
        assert!(!cfg.access.unprivileged_allowed());
    }

    #[test]
    fn test_validation() {
        let ok = MpuRegionConfig::peripheral(5, 0x4000_0000, 0x4000_0FFF);
        assert_eq!(ok.validate(8), Ok(()));
        assert_eq!(ok.validate(5), Err(HalError::InvalidRegion));

        let misaligned = MpuRegionConfig::peripheral(5, 0x4000_0004, 0x4000_0FFF);
        assert_eq!(misaligned.validate(8), Err(HalError::InvalidAlignment));

        let bad_limit = MpuRegionConfig::peripheral(5, 0x4000_0000, 0x4000_0FF0);
        assert_eq!(bad_limit.validate(8), Err(HalError::InvalidAlignment));

        let inverted = MpuRegionConfig::peripheral(5, 0x4000_1000, 0x4000_0FFF);
        assert_eq!(inverted.validate(8), Err(HalError::InvalidRange));
    }

    #[test]
    fn test_ctrl_value() {
        assert_eq!(ctrl_value(true, true), 0b111);
        assert_eq!(ctrl_value(false, false), 0b001);
    }
}
