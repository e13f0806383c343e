// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Integration tests for q-spm-hal
//!
//! Exercises the simulated platform through the HAL traits the SPM uses.

#![cfg(test)]

mod platform_tests {
    use q_spm_hal::Platform;

    #[test]
    fn test_current_platform() {
        let platform = Platform::current();
        if cfg!(feature = "an521") {
            assert_eq!(platform, Platform::An521);
        } else {
            assert_eq!(platform, Platform::Simulated);
            assert!(!platform.has_isolation_hw());
        }
        assert_eq!(platform.nvic_prio_bits(), 3);
    }
}

mod error_tests {
    use q_spm_common::Error;
    use q_spm_hal::HalError;

    #[test]
    fn test_hal_error_conversion() {
        assert_eq!(Error::from(HalError::InvalidAlignment), Error::MpuConfigFailed);
        assert_eq!(Error::from(HalError::InvalidPpcLocation), Error::PpcConfigFailed);
        assert_eq!(Error::from(HalError::VerifyFailed), Error::IsolationSelfCheckFailed);
        assert_eq!(Error::from(HalError::Busy), Error::HardwareFault);
    }

    #[test]
    fn test_hal_error_display() {
        assert_eq!(HalError::InvalidIrqLine.to_string(), "[0x0830] invalid IRQ line");
    }
}

mod mpu_tests {
    use q_spm_hal::armv8m::mpu::{MpuAccess, MpuRegionConfig};
    use q_spm_hal::sim::{SimEvent, SimPlatform};
    use q_spm_hal::MpuInterface;

    #[test]
    fn test_disable_program_enable_sequence() {
        let mut sim = SimPlatform::new();
        let cfg = MpuRegionConfig::peripheral(5, 0x5000_0000, 0x5000_0FFF);

        assert_eq!(sim.mpu_disable(), Ok(()));
        assert_eq!(sim.mpu_region_enable(&cfg), Ok(()));
        assert_eq!(sim.mpu_enable(true, true), Ok(()));

        assert_eq!(
            sim.events(),
            &[
                SimEvent::MpuDisable,
                SimEvent::MpuRegionEnable(5),
                SimEvent::MpuEnable { privdef: true, hfnmi: true },
            ]
        );
        assert!(sim.mpu_enabled());
        assert_eq!(sim.mpu_ctrl(), 0b111);
        let region = sim.region(5).expect("region 5 programmed");
        assert_eq!(region.access, MpuAccess::RwPrivUnpriv);
        assert!(region.execute_never);
    }

    #[test]
    fn test_region_disable() {
        let mut sim = SimPlatform::new();
        let cfg = MpuRegionConfig::peripheral(6, 0x5000_1000, 0x5000_1FFF);
        sim.mpu_region_enable(&cfg).unwrap();
        sim.mpu_region_disable(6).unwrap();
        assert!(sim.region(6).is_none());
    }

    #[test]
    fn test_injected_failure_leaves_state() {
        let mut sim = SimPlatform::new();
        sim.faults.mpu_region_enable = true;
        let cfg = MpuRegionConfig::peripheral(5, 0x5000_0000, 0x5000_0FFF);
        assert!(sim.mpu_region_enable(&cfg).is_err());
        assert!(sim.region(5).is_none());
    }
}

mod ppc_tests {
    use q_spm_hal::sim::SimPlatform;
    use q_spm_hal::{HalError, PpcBank, PpcInterface};

    #[test]
    fn test_secure_and_unpriv_bits() {
        let mut sim = SimPlatform::new();
        sim.ppc_configure_to_non_secure(PpcBank::Apb0, 3).unwrap();
        assert!(!sim.ppc_is_secure(PpcBank::Apb0, 3));

        sim.ppc_configure_to_secure(PpcBank::Apb0, 3).unwrap();
        assert!(sim.ppc_is_secure(PpcBank::Apb0, 3));

        sim.ppc_en_secure_unpriv(PpcBank::Apb0, 3).unwrap();
        assert!(sim.ppc_unpriv_allowed(PpcBank::Apb0, 3));
        assert!(!sim.ppc_unpriv_allowed(PpcBank::Apb1, 3));

        sim.ppc_clr_secure_unpriv(PpcBank::Apb0, 3).unwrap();
        assert!(!sim.ppc_unpriv_allowed(PpcBank::Apb0, 3));
    }

    #[test]
    fn test_location_out_of_range() {
        let mut sim = SimPlatform::new();
        assert_eq!(
            sim.ppc_configure_to_secure(PpcBank::Ahb0, 32),
            Err(HalError::InvalidPpcLocation)
        );
    }

    #[test]
    fn test_fault_flag_cleared() {
        let mut sim = SimPlatform::new();
        sim.raise_ppc_fault();
        assert!(sim.ppc_irq_raised());
        sim.ppc_clear_irq();
        assert!(!sim.ppc_irq_raised());
    }
}

mod nvic_tests {
    use q_spm_common::{IrqLine, IrqTargetState};
    use q_spm_hal::sim::{SimPlatform, SIM_IRQ_LINES};
    use q_spm_hal::{HalError, NvicInterface};

    #[test]
    fn test_target_state_reported_from_hardware() {
        let mut sim = SimPlatform::new();
        let line = IrqLine(17);
        assert_eq!(sim.nvic_set_target_state(line, IrqTargetState::NonSecure), Ok(IrqTargetState::NonSecure));
        assert_eq!(sim.nvic_set_target_state(line, IrqTargetState::Secure), Ok(IrqTargetState::Secure));
        assert_eq!(sim.target_state(line), IrqTargetState::Secure);
    }

    #[test]
    fn test_enable_pending() {
        let mut sim = SimPlatform::new();
        let line = IrqLine(70);
        sim.set_pending(line);
        assert!(sim.is_pending(line));
        sim.nvic_clear_pending_irq(line).unwrap();
        assert!(!sim.is_pending(line));

        sim.nvic_enable_irq(line).unwrap();
        assert!(sim.is_enabled(line));
        sim.nvic_disable_irq(line).unwrap();
        assert!(!sim.is_enabled(line));
    }

    #[test]
    fn test_line_out_of_range() {
        let mut sim = SimPlatform::new();
        assert_eq!(
            sim.nvic_enable_irq(IrqLine(SIM_IRQ_LINES)),
            Err(HalError::InvalidIrqLine)
        );
    }
}

mod boot_tests {
    use q_spm_common::config::DebugAuth;
    use q_spm_hal::armv8m::mpu::MpuRegionConfig;
    use q_spm_hal::sim::{SimPlatform, SIM_MPC_IRQ, SIM_PPC_IRQ};
    use q_spm_hal::{BootInterface, HalError, MpuInterface, PlatformData, PpcBank, PpcTarget};

    #[test]
    fn test_platform_data_lookup() {
        let timer = PlatformData::new(0x5000_0000, 0x5000_0FFF, PpcBank::Apb0, 0);
        let sim = SimPlatform::new().with_platform_data(7, timer);
        assert_eq!(sim.platform_data(7), Some(timer));
        assert_eq!(sim.platform_data(8), None);
        assert_eq!(
            PlatformData::unguarded(0x4000_0000, 0x4000_0FFF).ppc,
            PpcTarget::DoNotConfigure
        );
    }

    #[test]
    fn test_ns_vector_words() {
        let sim = SimPlatform::new().with_ns_image(0x0020_0000, 0x2000_8000, 0x0020_0401);
        assert_eq!(sim.ns_code_start(), 0x0020_0000);
        assert_eq!(sim.read_ns_word(0x0020_0000), Ok(0x2000_8000));
        assert_eq!(sim.read_ns_word(0x0020_0004), Ok(0x0020_0401));
        assert_eq!(sim.read_ns_word(0x0020_0008), Err(HalError::InvalidParameter));
    }

    #[test]
    fn test_fault_irqs_enabled() {
        let mut sim = SimPlatform::new();
        sim.nvic_interrupt_enable().unwrap();
        assert!(sim.is_enabled(SIM_MPC_IRQ));
        assert!(sim.is_enabled(SIM_PPC_IRQ));
    }

    #[test]
    fn test_debug_policy_recorded() {
        let mut sim = SimPlatform::new();
        sim.init_debug(DebugAuth::NonSecureOnly).unwrap();
        assert_eq!(sim.debug_policy(), Some(DebugAuth::NonSecureOnly));
    }

    #[test]
    fn test_hooks_fail_when_injected() {
        let mut sim = SimPlatform::new();
        sim.faults.boot_hooks = true;
        assert_eq!(sim.enable_fault_handlers(), Err(HalError::HardwareFault));
        assert_eq!(sim.system_reset_cfg(), Err(HalError::HardwareFault));
        assert!(sim.events().is_empty());
    }

    #[test]
    fn test_verify_isolation_detects_disabled_mpu() {
        let mut sim = SimPlatform::new();
        assert_eq!(sim.verify_isolation_hw(), Ok(()));

        let cfg = MpuRegionConfig::peripheral(5, 0x5000_0000, 0x5000_0FFF);
        sim.mpu_region_enable(&cfg).unwrap();
        assert_eq!(sim.verify_isolation_hw(), Err(HalError::VerifyFailed));

        sim.mpu_enable(true, true).unwrap();
        assert_eq!(sim.verify_isolation_hw(), Ok(()));
    }
}
