// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Arm MPS2+ AN521 platform
//!
//! AN521 is a Cortex-M33 based SSE-200 subsystem on the MPS2+ FPGA board.
//!
//! # Isolation Hardware
//!
//! - **Secure MPU**: 8 regions, regions 5 and 6 reserved for partition peripherals
//! - **SPCTRL**: all PPC banks, violation interrupt on line 10
//! - **SIE-200 MPCs**: SSRAM1..3, violation interrupt on line 9
//!
//! # Memory Map (secure aliases)
//!
//! - Code SRAM (ZBT SSRAM1): 0x1000_0000
//! - Non-secure image: 0x0010_0000 + 0x80000 (non-secure alias)
//! - Peripherals: 0x5000_0000 - 0x5FFF_FFFF

pub mod mpc;
pub mod ppc;

pub use mpc::Sie200Mpc;
pub use ppc::Spctrl;

use q_spm_common::config::DebugAuth;
use q_spm_common::{IrqLine, IrqTargetState};

use crate::armv8m::mpu::{Armv8mMpu, MpuRegionConfig};
use crate::armv8m::nvic::Nvic;
use crate::armv8m::registers::{modify_reg, read_reg, write_reg};
use crate::armv8m::scb;
use crate::error::{HalError, HalResult};
use crate::platform::{PlatformData, PpcBank};
use crate::traits::{BootInterface, MpcInterface, MpuInterface, NvicInterface, PpcInterface};

/// MPC violation line
pub const MPC_IRQ: IrqLine = IrqLine(9);

/// PPC violation line
pub const PPC_IRQ: IrqLine = IrqLine(10);

/// External interrupt lines on AN521
pub const IRQ_LINES: u16 = 124;

/// Implemented priority bits
pub const NVIC_PRIO_BITS: u8 = 3;

/// Peripheral base addresses (secure aliases)
pub mod addresses {
    /// Secure privilege control block
    pub const SPCTRL_BASE: u32 = 0x5008_0000;
    /// SSE-200 system control (debug authentication)
    pub const SYSCTRL_BASE: u32 = 0x5002_1000;
    /// MPC guarding ZBT SSRAM1
    pub const MPC_SSRAM1_BASE: u32 = 0x5800_7000;
    /// MPC guarding ZBT SSRAM2
    pub const MPC_SSRAM2_BASE: u32 = 0x5800_8000;
    /// MPC guarding ZBT SSRAM3
    pub const MPC_SSRAM3_BASE: u32 = 0x5800_9000;
    /// Non-secure image start (non-secure alias of SSRAM1 + 512 KiB)
    pub const NS_CODE_START: u32 = 0x0008_0000;
}

// SYSCTRL debug authentication registers
const SECDBGSET: u32 = addresses::SYSCTRL_BASE + 0x04;
const SECDBGCLR: u32 = addresses::SYSCTRL_BASE + 0x08;

const DBG_DBGEN: u32 = 0b11;
const DBG_NIDEN: u32 = 0b11 << 2;
const DBG_SPIDEN: u32 = 0b11 << 4;
const DBG_SPNIDEN: u32 = 0b11 << 6;
const DBG_SEL_ALL: u32 = 0b1010_1010;

/// Secure MPU control register, read back by the isolation self-check
const MPU_CTRL: u32 = 0xE000_ED94;

/// Platform-data references understood by [`An521::platform_data`]
pub mod periph {
    /// CMSDK timer 0
    pub const TIMER0: u32 = 0;
    /// CMSDK timer 1
    pub const TIMER1: u32 = 1;
    /// FPGA system control and I/O
    pub const FPGA_IO: u32 = 2;
    /// FPGA serial communication controller
    pub const FPGA_SCC: u32 = 3;
    /// Audio I2S
    pub const FPGA_AUDIO: u32 = 4;
}

const PLATFORM_DATA: [PlatformData; 5] = [
    PlatformData::new(0x5000_0000, 0x5000_0FFF, PpcBank::Apb0, 0),
    PlatformData::new(0x5000_1000, 0x5000_1FFF, PpcBank::Apb0, 1),
    PlatformData::new(0x5030_2000, 0x5030_2FFF, PpcBank::ApbExp2, 2),
    PlatformData::new(0x5030_0000, 0x5030_0FFF, PpcBank::ApbExp2, 0),
    PlatformData::new(0x5030_1000, 0x5030_1FFF, PpcBank::ApbExp2, 1),
];

/// AN521 platform instance
pub struct An521 {
    /// Secure MPU
    pub mpu: Armv8mMpu,
    /// Secure NVIC
    pub nvic: Nvic,
    /// PPC controller
    pub ppc: Spctrl,
    /// MPCs guarding the code and data SRAMs
    pub mpcs: [Sie200Mpc; 3],
}

impl An521 {
    /// Create an uninitialized platform
    #[must_use]
    pub const fn new() -> Self {
        Self {
            mpu: Armv8mMpu::new(),
            nvic: Nvic::new(IRQ_LINES, NVIC_PRIO_BITS),
            ppc: Spctrl::new(),
            mpcs: [
                Sie200Mpc::new(addresses::MPC_SSRAM1_BASE),
                Sie200Mpc::new(addresses::MPC_SSRAM2_BASE),
                Sie200Mpc::new(addresses::MPC_SSRAM3_BASE),
            ],
        }
    }

    /// Probe the MPU
    ///
    /// # Errors
    ///
    /// Returns `NotSupported` if the secure MPU has no regions.
    pub fn init(&mut self) -> HalResult<()> {
        self.mpu.init()
    }
}

impl Default for An521 {
    fn default() -> Self {
        Self::new()
    }
}

impl MpuInterface for An521 {
    fn mpu_region_count(&self) -> u8 {
        self.mpu.mpu_region_count()
    }

    fn mpu_disable(&mut self) -> HalResult<()> {
        self.mpu.mpu_disable()
    }

    fn mpu_enable(&mut self, privdef: bool, hfnmi: bool) -> HalResult<()> {
        self.mpu.mpu_enable(privdef, hfnmi)
    }

    fn mpu_region_enable(&mut self, config: &MpuRegionConfig) -> HalResult<()> {
        self.mpu.mpu_region_enable(config)
    }

    fn mpu_region_disable(&mut self, region: u8) -> HalResult<()> {
        self.mpu.mpu_region_disable(region)
    }
}

impl PpcInterface for An521 {
    fn ppc_configure_to_secure(&mut self, bank: PpcBank, loc: u8) -> HalResult<()> {
        self.ppc.configure_to_secure(bank, loc)
    }

    fn ppc_configure_to_non_secure(&mut self, bank: PpcBank, loc: u8) -> HalResult<()> {
        self.ppc.configure_to_non_secure(bank, loc)
    }

    fn ppc_en_secure_unpriv(&mut self, bank: PpcBank, loc: u8) -> HalResult<()> {
        self.ppc.en_secure_unpriv(bank, loc)
    }

    fn ppc_clr_secure_unpriv(&mut self, bank: PpcBank, loc: u8) -> HalResult<()> {
        self.ppc.clr_secure_unpriv(bank, loc)
    }

    fn ppc_clear_irq(&mut self) {
        self.ppc.clear_irq();
    }

    fn ppc_irq_line(&self) -> IrqLine {
        PPC_IRQ
    }
}

impl MpcInterface for An521 {
    fn mpc_clear_interrupt(&mut self) {
        for mpc in &mut self.mpcs {
            mpc.clear_interrupt();
        }
    }

    fn mpc_irq_line(&self) -> IrqLine {
        MPC_IRQ
    }
}

impl NvicInterface for An521 {
    fn nvic_prio_bits(&self) -> u8 {
        self.nvic.nvic_prio_bits()
    }

    fn nvic_set_target_state(&mut self, line: IrqLine, state: IrqTargetState) -> HalResult<IrqTargetState> {
        self.nvic.nvic_set_target_state(line, state)
    }

    fn nvic_enable_irq(&mut self, line: IrqLine) -> HalResult<()> {
        self.nvic.nvic_enable_irq(line)
    }

    fn nvic_disable_irq(&mut self, line: IrqLine) -> HalResult<()> {
        self.nvic.nvic_disable_irq(line)
    }

    fn nvic_clear_pending_irq(&mut self, line: IrqLine) -> HalResult<()> {
        self.nvic.nvic_clear_pending_irq(line)
    }

    fn nvic_set_priority(&mut self, line: IrqLine, quantized: u8) -> HalResult<()> {
        self.nvic.nvic_set_priority(line, quantized)
    }
}

impl BootInterface for An521 {
    fn enable_fault_handlers(&mut self) -> HalResult<()> {
        let faults = scb::SHCSR_MEMFAULTENA
            | scb::SHCSR_BUSFAULTENA
            | scb::SHCSR_USGFAULTENA
            | scb::SHCSR_SECUREFAULTENA;
        // SAFETY: SHCSR enable bits only unmask the configurable fault
        // exceptions; their handlers are part of the secure vector table.
        unsafe { modify_reg(scb::SHCSR, |v| v | faults) };
        Ok(())
    }

    fn system_reset_cfg(&mut self) -> HalResult<()> {
        // SAFETY: AIRCR writes must carry VECTKEY. Only SYSRESETREQS is
        // changed; the other fields are written back unchanged.
        unsafe {
            modify_reg(scb::AIRCR, |v| {
                (v & !scb::AIRCR_VECTKEY_MASK) | scb::AIRCR_VECTKEY | scb::AIRCR_SYSRESETREQS
            });
        }
        Ok(())
    }

    fn init_debug(&mut self, auth: DebugAuth) -> HalResult<()> {
        let (set, clr) = match auth {
            DebugAuth::Unchanged => return Ok(()),
            DebugAuth::NonSecureOnly => (DBG_DBGEN | DBG_NIDEN, DBG_SPIDEN | DBG_SPNIDEN),
            DebugAuth::Full => (DBG_DBGEN | DBG_NIDEN | DBG_SPIDEN | DBG_SPNIDEN, 0),
            DebugAuth::Disabled => (0, DBG_DBGEN | DBG_NIDEN | DBG_SPIDEN | DBG_SPNIDEN),
        };
        // SAFETY: SECDBGSET/SECDBGCLR are write-one-to-set/clear and only
        // affect debug authentication signals.
        unsafe {
            write_reg(SECDBGCLR, clr & !DBG_SEL_ALL);
            write_reg(SECDBGSET, set | DBG_SEL_ALL);
        }
        Ok(())
    }

    fn nvic_interrupt_target_state_cfg(&mut self) -> HalResult<()> {
        for n in 0..IRQ_LINES {
            let line = IrqLine(n);
            let state = if line == MPC_IRQ || line == PPC_IRQ {
                IrqTargetState::Secure
            } else {
                IrqTargetState::NonSecure
            };
            self.nvic.nvic_set_target_state(line, state)?;
        }
        Ok(())
    }

    fn nvic_interrupt_enable(&mut self) -> HalResult<()> {
        for mpc in &mut self.mpcs {
            mpc.enable_interrupt();
        }
        self.ppc.enable_irq();
        self.nvic.nvic_enable_irq(MPC_IRQ)?;
        self.nvic.nvic_enable_irq(PPC_IRQ)
    }

    fn verify_isolation_hw(&mut self) -> HalResult<()> {
        // SAFETY: Read-only accesses to architecturally defined registers.
        let (ctrl, shcsr, aircr) = unsafe { (read_reg(MPU_CTRL), read_reg(scb::SHCSR), read_reg(scb::AIRCR)) };
        let faults = scb::SHCSR_MEMFAULTENA | scb::SHCSR_BUSFAULTENA | scb::SHCSR_SECUREFAULTENA;
        if ctrl & 1 == 0 || shcsr & faults != faults || aircr & scb::AIRCR_SYSRESETREQS == 0 {
            return Err(HalError::VerifyFailed);
        }
        Ok(())
    }

    fn platform_data(&self, reference: u32) -> Option<PlatformData> {
        PLATFORM_DATA.get(reference as usize).copied()
    }

    fn ns_code_start(&self) -> u32 {
        addresses::NS_CODE_START
    }

    fn read_ns_word(&self, addr: u32) -> HalResult<u32> {
        if addr % 4 != 0 {
            return Err(HalError::InvalidParameter);
        }
        // SAFETY: The non-secure image is readable from the secure state and
        // the address is word aligned.
        Ok(unsafe { read_reg(addr) })
    }
}
