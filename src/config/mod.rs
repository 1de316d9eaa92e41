//! Slicing-engine configuration: the four knobs that bear on the core's
//! own behaviour, with a small preset layer over explicit fields.

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SlicerError};

/// Coarse timeout/verbosity presets a caller can start from before
/// overriding individual fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Preset {
    /// Short budgets, silent — suited to CI runs over many small tests.
    Fast,
    /// Generous budgets, full per-step tracing — suited to investigating
    /// a single slow or misbehaving slice.
    Thorough,
}

impl Preset {
    fn max_test_time_ms(self) -> u64 {
        match self {
            Preset::Fast => 5_000,
            Preset::Thorough => 60_000,
        }
    }

    fn max_slicing_time_ms(self) -> u64 {
        match self {
            Preset::Fast => 2_000,
            Preset::Thorough => 30_000,
        }
    }

    fn debug_output(self) -> u8 {
        match self {
            Preset::Fast => 0,
            Preset::Thorough => 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlicingConfig {
    pub max_test_time_ms: u64,
    pub max_slicing_time_ms: u64,
    /// 0 = silent, 1 = per-assertion summary, 2 = per-step state dump.
    pub debug_output: u8,
    /// Names treated as assertion calls in addition to the harness's
    /// built-in detection.
    pub custom_assertions: Vec<String>,
}

impl SlicingConfig {
    pub fn from_preset(preset: Preset) -> Self {
        Self {
            max_test_time_ms: preset.max_test_time_ms(),
            max_slicing_time_ms: preset.max_slicing_time_ms(),
            debug_output: preset.debug_output(),
            custom_assertions: Vec::new(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_slicing_time_ms == 0 {
            return Err(SlicerError::configuration("max_slicing_time_ms must be greater than zero"));
        }
        if self.max_test_time_ms == 0 {
            return Err(SlicerError::configuration("max_test_time_ms must be greater than zero"));
        }
        if self.debug_output > 2 {
            return Err(SlicerError::configuration(format!("debug_output must be 0..=2, got {}", self.debug_output)));
        }
        Ok(())
    }
}

impl Default for SlicingConfig {
    fn default() -> Self {
        Self::from_preset(Preset::Fast)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_slicing_budget_is_rejected() {
        let mut config = SlicingConfig::default();
        config.max_slicing_time_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn thorough_preset_enables_full_tracing() {
        let config = SlicingConfig::from_preset(Preset::Thorough);
        assert_eq!(config.debug_output, 2);
        assert!(config.max_slicing_time_ms > SlicingConfig::from_preset(Preset::Fast).max_slicing_time_ms);
    }
}
