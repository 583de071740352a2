use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::layout::LayoutThresholds;
use crate::segment::{MarkerPatterns, WindowConfig};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineProfile {
    pub layout: LayoutThresholds,
    pub markers: MarkerPatterns,
    pub windows: WindowConfig,
}

impl PipelineProfile {
    pub fn load(path: &Path) -> Result<Self> {
        let raw =
            fs::read(path).with_context(|| format!("failed to read profile {}", path.display()))?;
        serde_json::from_slice(&raw)
            .with_context(|| format!("failed to parse profile {}", path.display()))
    }

    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_profile_keeps_remaining_defaults() {
        let profile: PipelineProfile = serde_json::from_str(
            r#"{ "layout": { "header_top": 120.0 }, "windows": { "max_tokens": 256 } }"#,
        )
        .expect("parse profile");

        assert_eq!(profile.layout.header_top, 120.0);
        assert_eq!(
            profile.layout.watermark_phrase,
            LayoutThresholds::default().watermark_phrase
        );
        assert_eq!(profile.windows.max_tokens, 256);
        assert_eq!(profile.windows.overlap_tokens, 50);
        assert_eq!(profile.markers, MarkerPatterns::default());
    }

    #[test]
    fn load_reads_profile_from_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("profile.json");
        fs::write(&path, r#"{ "markers": { "ruling": "DISPOSITIVO" } }"#).expect("write profile");

        let profile = PipelineProfile::load_or_default(Some(&path)).expect("load profile");
        assert_eq!(profile.markers.ruling, "DISPOSITIVO");

        let fallback = PipelineProfile::load_or_default(None).expect("default profile");
        assert_eq!(fallback, PipelineProfile::default());
    }
}
