//! Scanner factory: converts a `ScannerConfig` into a runtime provider.

use super::pivot::{PivotBreakout, DEFAULT_LOOKBACK, MAX_LOOKBACK};
use super::CandidateProvider;
use crate::engine::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Scanner selection plus its numeric parameters.
///
/// Uses `BTreeMap` for deterministic key ordering during serialization → hashing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScannerConfig {
    #[serde(rename = "type")]
    pub scanner_type: String,
    #[serde(default)]
    pub params: BTreeMap<String, f64>,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            scanner_type: "pivot_breakout".to_string(),
            params: BTreeMap::new(),
        }
    }
}

fn param_usize(
    config: &ScannerConfig,
    name: &str,
    default: usize,
    max: usize,
) -> Result<usize, ConfigError> {
    match config.params.get(name) {
        None => Ok(default),
        Some(&v) if v.is_finite() && v >= 1.0 && v <= max as f64 && v.fract() == 0.0 => {
            Ok(v as usize)
        }
        Some(&v) => Err(ConfigError::InvalidParameter {
            name: format!("scanner.params.{name}"),
            reason: format!("expected an integer in 1..={max}, got {v}"),
        }),
    }
}

/// Every key in `params` must be one the scanner reads.
fn reject_unknown_params(config: &ScannerConfig, known: &[&str]) -> Result<(), ConfigError> {
    match config.params.keys().find(|k| !known.contains(&k.as_str())) {
        Some(key) => Err(ConfigError::InvalidParameter {
            name: format!("scanner.params.{key}"),
            reason: format!(
                "unknown parameter for scanner `{}` (expected one of: {})",
                config.scanner_type,
                known.join(", ")
            ),
        }),
        None => Ok(()),
    }
}

/// Build the provider named by `config.scanner_type`.
pub fn create_provider(config: &ScannerConfig) -> Result<Box<dyn CandidateProvider>, ConfigError> {
    match config.scanner_type.as_str() {
        "pivot_breakout" => {
            reject_unknown_params(config, &["lookback"])?;
            let lookback = param_usize(config, "lookback", DEFAULT_LOOKBACK, MAX_LOOKBACK)?;
            Ok(Box::new(PivotBreakout::new(lookback)))
        }
        other => Err(ConfigError::UnknownScanner(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_builds_pivot_breakout() {
        let provider = create_provider(&ScannerConfig::default()).unwrap();
        assert_eq!(provider.name(), "pivot_breakout");
        assert_eq!(provider.params().get("lookback"), Some(&20.0));
    }

    #[test]
    fn unknown_scanner_is_config_error() {
        let config = ScannerConfig {
            scanner_type: "moon_phase".into(),
            params: BTreeMap::new(),
        };
        assert!(matches!(
            create_provider(&config),
            Err(ConfigError::UnknownScanner(ref s)) if s == "moon_phase"
        ));
    }

    #[test]
    fn fractional_lookback_is_rejected() {
        let mut config = ScannerConfig::default();
        config.params.insert("lookback".into(), 2.5);
        assert!(matches!(
            create_provider(&config),
            Err(ConfigError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn oversized_lookback_is_rejected() {
        for huge in [1e300, (MAX_LOOKBACK + 1) as f64] {
            let mut config = ScannerConfig::default();
            config.params.insert("lookback".into(), huge);
            assert!(matches!(
                create_provider(&config),
                Err(ConfigError::InvalidParameter { ref name, .. }) if name == "scanner.params.lookback"
            ));
        }

        let mut config = ScannerConfig::default();
        config.params.insert("lookback".into(), MAX_LOOKBACK as f64);
        assert!(create_provider(&config).is_ok());
    }

    #[test]
    fn misspelled_param_is_rejected() {
        let mut config = ScannerConfig::default();
        config.params.insert("lookbak".into(), 10.0);
        assert!(matches!(
            create_provider(&config),
            Err(ConfigError::InvalidParameter { ref name, .. }) if name == "scanner.params.lookbak"
        ));
    }
}
