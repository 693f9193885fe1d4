// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pipeline configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Persistent settings for the conversion pipeline.
///
/// Page geometry and the luminance cutoff are compile-time policy and are
/// deliberately absent here; only the knobs the original tooling exposed to
/// operators are configurable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// JPEG quality (1-100) for lossy saves.
    pub jpeg_quality: u8,
    /// Skip re-composition for pages that already match the canonical size.
    pub skip_standard_pages: bool,
    /// Directory for scoped working copies; `None` uses the system temp dir.
    pub temp_dir: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            jpeg_quality: 90,
            skip_standard_pages: true,
            temp_dir: None,
        }
    }
}

impl PipelineConfig {
    /// Load configuration from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write configuration to a JSON file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let raw = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), raw)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.jpeg_quality, 90);
        assert!(config.skip_standard_pages);
        assert!(config.temp_dir.is_none());
    }

    #[test]
    fn json_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.json");

        let mut config = PipelineConfig::default();
        config.jpeg_quality = 75;
        config.save(&path).unwrap();

        let loaded = PipelineConfig::load(&path).unwrap();
        assert_eq!(loaded.jpeg_quality, 75);
        assert!(loaded.skip_standard_pages);
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let err = PipelineConfig::load("/nonexistent/pipeline.json").unwrap_err();
        assert!(matches!(err, crate::error::MonowerkError::Io(_)));
    }
}
