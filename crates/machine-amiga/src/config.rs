//! Machine configuration.
//!
//! [`AmigaConfig`] is checked once by [`AmigaConfig::validate`] before a
//! machine is built. Individual options can be changed later through
//! [`crate::Amiga::configure`], which validates the raw value first.

use commodore_agnus_ocs::{BlitterAccuracy, BlitterConfig};
use commodore_buster::ZorroManager;
use emu_core::ConfigError;
use mos_cia_8520::{CiaConfig, CiaRevision};
use peripheral_amiga_rtc::{RtcConfig, RtcModel};
use serde::{Deserialize, Serialize};

use crate::AmigaError;

/// Chip RAM sizes Agnus can address, in KB.
pub const CHIP_RAM_SIZES_KB: [usize; 4] = [256, 512, 1024, 2048];
/// Slow RAM sizes that fit below the RTC at $DC0000, in KB.
pub const SLOW_RAM_SIZES_KB: [usize; 5] = [0, 256, 512, 1024, 1536];
/// Accepted Kickstart image lengths in bytes.
pub const KICKSTART_SIZES: [usize; 2] = [256 * 1024, 512 * 1024];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AmigaConfig {
    pub chip_ram_kb: usize,
    pub slow_ram_kb: usize,
    /// Zorro II Fast RAM board size, 0 for none.
    pub fast_ram_kb: usize,
    /// Raw Kickstart image. Empty leaves $F80000 unmapped.
    #[serde(skip)]
    pub kickstart: Vec<u8>,
    pub cia: CiaConfig,
    pub rtc: RtcConfig,
    pub blitter: BlitterConfig,
}

impl Default for AmigaConfig {
    fn default() -> Self {
        Self {
            chip_ram_kb: 512,
            slow_ram_kb: 0,
            fast_ram_kb: 0,
            kickstart: Vec::new(),
            cia: CiaConfig::default(),
            rtc: RtcConfig::default(),
            blitter: BlitterConfig::default(),
        }
    }
}

impl AmigaConfig {
    #[must_use]
    pub fn with_kickstart(mut self, rom: Vec<u8>) -> Self {
        self.kickstart = rom;
        self
    }

    pub fn validate(&self) -> Result<(), AmigaError> {
        check_chip_ram(self.chip_ram_kb)?;
        check_slow_ram(self.slow_ram_kb)?;
        check_fast_ram(self.fast_ram_kb)?;
        if !self.kickstart.is_empty() && !KICKSTART_SIZES.contains(&self.kickstart.len()) {
            return Err(AmigaError::RomSize(self.kickstart.len()));
        }
        Ok(())
    }

    /// Current value of one option in its raw integer form.
    #[must_use]
    pub fn get(&self, option: ConfigOption) -> i64 {
        match option {
            ConfigOption::ChipRam => self.chip_ram_kb as i64,
            ConfigOption::SlowRam => self.slow_ram_kb as i64,
            ConfigOption::FastRam => self.fast_ram_kb as i64,
            ConfigOption::CiaRevision => self.cia.revision as i64,
            ConfigOption::RtcModel => self.rtc.model as i64,
            ConfigOption::BlitterAccuracy => self.blitter.accuracy as i64,
        }
    }
}

/// Options a host may change on a running machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConfigOption {
    ChipRam,
    SlowRam,
    FastRam,
    CiaRevision,
    RtcModel,
    BlitterAccuracy,
}

impl ConfigOption {
    pub const ALL: [ConfigOption; 6] = [
        ConfigOption::ChipRam,
        ConfigOption::SlowRam,
        ConfigOption::FastRam,
        ConfigOption::CiaRevision,
        ConfigOption::RtcModel,
        ConfigOption::BlitterAccuracy,
    ];

    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            ConfigOption::ChipRam => "memory.chip_ram",
            ConfigOption::SlowRam => "memory.slow_ram",
            ConfigOption::FastRam => "memory.fast_ram",
            ConfigOption::CiaRevision => "cia.revision",
            ConfigOption::RtcModel => "rtc.model",
            ConfigOption::BlitterAccuracy => "blitter.accuracy",
        }
    }

    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|option| option.key() == key)
    }

    /// Whether `value` would be accepted for this option.
    #[must_use]
    pub fn is_valid(self, value: i64) -> bool {
        match self {
            ConfigOption::ChipRam => kb(self, value).and_then(check_chip_ram).is_ok(),
            ConfigOption::SlowRam => kb(self, value).and_then(check_slow_ram).is_ok(),
            ConfigOption::FastRam => kb(self, value).and_then(check_fast_ram).is_ok(),
            ConfigOption::CiaRevision => CiaRevision::is_valid(value),
            ConfigOption::RtcModel => RtcModel::is_valid(value),
            ConfigOption::BlitterAccuracy => BlitterAccuracy::is_valid(value),
        }
    }

    /// Whether changing this option rebuilds memory and power-cycles the
    /// machine.
    #[must_use]
    pub fn needs_power_cycle(self) -> bool {
        matches!(self, ConfigOption::ChipRam | ConfigOption::SlowRam | ConfigOption::FastRam)
    }
}

/// Convert a raw option value to a KB count.
pub(crate) fn kb(option: ConfigOption, value: i64) -> Result<usize, ConfigError> {
    usize::try_from(value).map_err(|_| ConfigError::InvalidValue { option: option.key(), value })
}

pub(crate) fn check_chip_ram(kb: usize) -> Result<usize, ConfigError> {
    if CHIP_RAM_SIZES_KB.contains(&kb) {
        Ok(kb)
    } else {
        Err(ConfigError::InvalidSize { what: "chip RAM", size: kb })
    }
}

pub(crate) fn check_slow_ram(kb: usize) -> Result<usize, ConfigError> {
    if SLOW_RAM_SIZES_KB.contains(&kb) {
        Ok(kb)
    } else {
        Err(ConfigError::InvalidSize { what: "slow RAM", size: kb })
    }
}

pub(crate) fn check_fast_ram(kb: usize) -> Result<usize, ConfigError> {
    if ZorroManager::is_valid_size(kb) {
        Ok(kb)
    } else {
        Err(ConfigError::InvalidSize { what: "fast RAM", size: kb })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_a_stock_a500() {
        let config = AmigaConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.get(ConfigOption::ChipRam), 512);
        assert_eq!(config.get(ConfigOption::BlitterAccuracy), 2);
        assert_eq!(config.get(ConfigOption::RtcModel), 1);
    }

    #[test]
    fn odd_rom_sizes_are_rejected() {
        let config = AmigaConfig::default().with_kickstart(vec![0; 1000]);
        assert_eq!(config.validate(), Err(AmigaError::RomSize(1000)));
        let config = AmigaConfig::default().with_kickstart(vec![0; 512 * 1024]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn ram_sizes_are_checked() {
        let config = AmigaConfig { chip_ram_kb: 300, ..AmigaConfig::default() };
        assert_eq!(
            config.validate(),
            Err(AmigaError::Config(ConfigError::InvalidSize { what: "chip RAM", size: 300 }))
        );
        assert!(ConfigOption::FastRam.is_valid(8192));
        assert!(!ConfigOption::FastRam.is_valid(100));
        assert!(!ConfigOption::SlowRam.is_valid(-1));
    }

    #[test]
    fn keys_round_trip() {
        for option in ConfigOption::ALL {
            assert_eq!(ConfigOption::from_key(option.key()), Some(option));
        }
        assert_eq!(ConfigOption::from_key("denise.revision"), None);
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let config: AmigaConfig =
            serde_json::from_str(r#"{ "fast_ram_kb": 2048, "cia": { "revision": "Plcc8520" } }"#)
                .expect("parse");
        assert_eq!(config.fast_ram_kb, 2048);
        assert_eq!(config.chip_ram_kb, 512);
        assert_eq!(config.cia.revision, CiaRevision::Plcc8520);
    }
}
