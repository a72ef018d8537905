// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scan configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CodescanError, Result};

/// Smallest tile edge the region pyramid descends to.
pub const DEFAULT_MIN_TILE: u32 = 200;

/// Settings for one processing run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Number of pages processed concurrently. Also the decoder pool capacity.
    pub parallelism: usize,
    /// The region pyramid stops once a tile edge would drop below this.
    pub min_tile: u32,
    pub engine: EngineConfig,
    pub cleanup: CleanupConfig,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            parallelism: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            min_tile: DEFAULT_MIN_TILE,
            engine: EngineConfig::default(),
            cleanup: CleanupConfig::default(),
        }
    }
}

impl ScanConfig {
    /// Load settings from a JSON file. Missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&data)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.parallelism == 0 {
            return Err(CodescanError::Config(
                "parallelism must be at least 1".to_string(),
            ));
        }
        if self.min_tile == 0 {
            return Err(CodescanError::Config(
                "min_tile must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.cleanup.black_threshold) {
            return Err(CodescanError::Config(format!(
                "cleanup.black_threshold must be within 0..=1, got {}",
                self.cleanup.black_threshold
            )));
        }
        Ok(())
    }
}

/// Decoding engine tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Spend more time looking for symbols in each bitmap.
    pub try_harder: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { try_harder: true }
    }
}

/// External deskew/despeckle tool settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanupConfig {
    /// Run the cleanup pass before region scanning.
    pub enabled: bool,
    /// Program name (looked up on `PATH`) or explicit path.
    pub program: String,
    /// Brightness ratio below which a pixel counts as black (0..=1).
    pub black_threshold: f32,
    /// The tool is killed after this many seconds.
    pub timeout_secs: u64,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            program: "unpaper".to_string(),
            black_threshold: 0.5,
            timeout_secs: 120,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = ScanConfig::default();
        assert!(config.parallelism >= 1);
        assert_eq!(config.min_tile, 200);
        assert_eq!(config.cleanup.program, "unpaper");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("codescan.json");
        std::fs::write(&path, r#"{"parallelism": 3, "cleanup": {"enabled": false}}"#).unwrap();

        let config = ScanConfig::load(&path).unwrap();
        assert_eq!(config.parallelism, 3);
        assert!(!config.cleanup.enabled);
        assert_eq!(config.cleanup.program, "unpaper");
        assert!(config.engine.try_harder);
    }

    #[test]
    fn zero_parallelism_rejected() {
        let config = ScanConfig {
            parallelism: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(CodescanError::Config(_))));
    }

    #[test]
    fn malformed_json_is_serialization_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{parallelism").unwrap();
        assert!(matches!(
            ScanConfig::load(&path),
            Err(CodescanError::Serialization(_))
        ));
    }
}
