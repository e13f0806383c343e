// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Integration tests for q-spm-common
//!
//! Error codes, configuration, version gating and trace logging.

#![cfg(test)]

mod errors_tests {
    use q_spm_common::Error;
    use std::collections::HashSet;

    const ALL: &[Error] = &[
        Error::InvalidTableRegion,
        Error::LoadInfoSizeOverflow,
        Error::LoadInfoOutOfBounds,
        Error::BadPartitionMagic,
        Error::UnsupportedFrameworkVersion,
        Error::NotIpcPartition,
        Error::PartitionPoolExhausted,
        Error::ServicePoolExhausted,
        Error::StatelessSlotMissing,
        Error::InvalidPartitionIndex,
        Error::ServicesAlreadyLoaded,
        Error::InvalidPlatformData,
        Error::PeripheralRegionsExhausted,
        Error::MpuConfigFailed,
        Error::PpcConfigFailed,
        Error::IsolationSetupFailed,
        Error::InvalidIrqLine,
        Error::IrqRetargetRefused,
        Error::InvalidStateTransition,
        Error::BootHookFailed,
        Error::IsolationSelfCheckFailed,
        Error::FaultInjectionDetected,
        Error::MpcFault,
        Error::PpcFault,
        Error::InvalidParameter,
        Error::NotSupported,
        Error::HardwareFault,
        Error::InternalError,
    ];

    #[test]
    fn test_codes_unique() {
        let codes: HashSet<u16> = ALL.iter().map(Error::code).collect();
        assert_eq!(codes.len(), ALL.len());
    }

    #[test]
    fn test_code_categories() {
        assert_eq!(Error::BadPartitionMagic.code() >> 8, 0x01);
        assert_eq!(Error::PeripheralRegionsExhausted.code() >> 8, 0x02);
        assert_eq!(Error::IrqRetargetRefused.code() >> 8, 0x03);
        assert_eq!(Error::FaultInjectionDetected.code() >> 8, 0x04);
        assert_eq!(Error::MpcFault.code() >> 8, 0x05);
        assert_eq!(Error::InternalError.code(), 0xFFFF);
    }

    #[test]
    fn test_display_format() {
        let text = Error::BadPartitionMagic.to_string();
        assert_eq!(text, "[0x0104] partition load info magic mismatch");
    }

    #[test]
    fn test_security_classification() {
        assert!(Error::MpcFault.is_security_error());
        assert!(Error::LoadInfoOutOfBounds.is_security_error());
        assert!(!Error::InvalidPlatformData.is_security_error());
        assert!(Error::InvalidPlatformData.is_recoverable());
        assert!(!Error::PartitionPoolExhausted.is_recoverable());
    }
}

mod config_tests {
    use q_spm_common::config::{DebugAuth, PeriphRegionWindow};
    use q_spm_common::{FrameworkVersion, IsolationLevel, SpmConfig};

    #[test]
    fn test_default_config() {
        let config = SpmConfig::default();
        assert_eq!(config.isolation_level, IsolationLevel::Level2);
        assert!(config.memory_protection);
        assert_eq!(config.framework_version, FrameworkVersion::SUPPORTED);
        assert_eq!(config.periph_regions, PeriphRegionWindow::DEFAULT);
        assert_eq!(config.nvic_prio_bits, 3);
        assert_eq!(config.debug_auth, DebugAuth::Unchanged);
    }

    #[test]
    fn test_narrow_window() {
        let config = SpmConfig::for_level(IsolationLevel::Level3)
            .with_periph_regions(PeriphRegionWindow { start: 4, count: 1 });
        assert_eq!(config.periph_regions.region(0), Some(4));
        assert_eq!(config.periph_regions.region(1), None);
    }

    #[test]
    fn test_level_from_u8() {
        assert_eq!(IsolationLevel::from_u8(3), Some(IsolationLevel::Level3));
        assert_eq!(IsolationLevel::from_u8(0), None);
        assert_eq!(IsolationLevel::from_u8(4), None);
    }
}

mod version_tests {
    use q_spm_common::constants::PARTITION_INFO_MAGIC;
    use q_spm_common::FrameworkVersion;

    #[test]
    fn test_version_above_supported_rejected() {
        let word = PARTITION_INFO_MAGIC | 0x0102;
        let declared = FrameworkVersion::from_psa_ff_ver(word);
        assert!(!declared.is_compatible_with(FrameworkVersion::SUPPORTED));
        assert!(declared > FrameworkVersion::SUPPORTED);
    }

    #[test]
    fn test_display() {
        assert_eq!(FrameworkVersion::new(1, 1).to_string(), "1.1");
    }
}

mod log_tests {
    use q_spm_common::log::{LogBuffer, LogLevel};
    use q_spm_common::{log_debug, log_error, log_info, log_warn};

    #[test]
    fn test_sequence_numbers_monotonic() {
        let mut buf = LogBuffer::new();
        buf.set_min_level(LogLevel::Debug);
        log_info!(buf, "boot", "state {}", "TableLoading");
        log_debug!(buf, "load", "pid {}", 256);
        log_warn!(buf, "irq", "line {} stays non-secure", 7);
        log_error!(buf, "fault", "PPC fault");

        let seqs: Vec<u32> = buf.iter().map(|e| e.seq).collect();
        assert_eq!(seqs, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_entry_display() {
        let mut buf = LogBuffer::new();
        log_info!(buf, "boot", "armed");
        let line = buf.last().map(ToString::to_string);
        assert_eq!(line.as_deref(), Some("#0000 I [boot] armed"));
    }

    #[test]
    fn test_filtered_entries_not_numbered() {
        let mut buf = LogBuffer::new();
        log_debug!(buf, "load", "dropped");
        log_info!(buf, "boot", "kept");
        assert_eq!(buf.recorded(), 1);
        assert_eq!(buf.last().map(|e| e.seq), Some(0));
    }
}
