//! Dataset profiles: the per-run constants threaded through the pipeline.

use crate::mosaic::StackOrder;
use crate::normalize::NormalizeParams;
use crate::{DemError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Samples per side of a 1 arc-second SRTM tile.
pub const SRTM1_TILE_SIDE: usize = 3601;

/// Samples per side of a 3 arc-second SRTM tile.
pub const SRTM3_TILE_SIDE: usize = 1201;

/// Output side of a Cities: Skylines heightmap.
pub const DEFAULT_OUTPUT_SIDE: usize = 1081;

/// AWS Open Data SRTM 1" tiles, gzip compressed.
const SKADI_URL: &str = "https://s3.amazonaws.com/elevation-tiles-prod/skadi/{lat}/{name}.hgt.gz";

/// USGS SRTM Water Body Data shapefiles, zip compressed.
const SWBD_URL: &str = "https://dds.cr.usgs.gov/srtm/version2_1/SWBD/SWBD{lon_half}/{water_name}.zip";

/// USGS SRTM 3" tiles for Eurasia, zip compressed.
const SRTM3_EURASIA_URL: &str = "https://dds.cr.usgs.gov/srtm/version2_1/SRTM3/Eurasia/{name}.hgt.zip";

fn default_extent_km() -> f64 {
    crate::bbox::DEFAULT_EXTENT_KM
}

/// Immutable configuration for one heightmap run.
///
/// Profiles are normally one of the presets ([`DatasetProfile::srtm1`],
/// [`DatasetProfile::srtm3`]) or loaded from YAML:
///
/// ```yaml
/// name: custom
/// tile_side: 3601
/// output_side: 1081
/// sea_level: 40.0
/// height_scale: 64.0
/// seabed: -20.0
/// smoothing_sigma: 2.0
/// elevation_url: "https://example.org/{lat}/{name}.hgt.gz"
/// water_url: null
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetProfile {
    /// Short name used in logs.
    pub name: String,
    /// Samples per side of one elevation tile.
    pub tile_side: usize,
    /// Side of the generated heightmap in pixels.
    pub output_side: usize,
    /// Offset added to every elevation before scaling (meters).
    pub sea_level: f32,
    /// Multiplier applied after the sea-level offset.
    pub height_scale: f32,
    /// Elevation burned into water-covered cells (meters).
    pub seabed: f32,
    /// Gaussian smoothing radius in output pixels. `None` disables smoothing.
    #[serde(default)]
    pub smoothing_sigma: Option<f64>,
    /// Elevation tile URL template.
    pub elevation_url: String,
    /// Water-boundary archive URL template. `None` disables water masking.
    #[serde(default)]
    pub water_url: Option<String>,
    /// Replacement for samples that are exactly zero (ocean in SRTM3 data).
    #[serde(default)]
    pub zero_elevation_value: Option<f32>,
    /// Vertical stitching convention.
    #[serde(default)]
    pub stack_order: StackOrder,
    /// Ground extent used when the caller does not give one.
    #[serde(default = "default_extent_km")]
    pub default_extent_km: f64,
}

impl Default for DatasetProfile {
    fn default() -> Self {
        Self::srtm1()
    }
}

impl DatasetProfile {
    /// 1 arc-second SRTM from AWS with SWBD water masking.
    pub fn srtm1() -> Self {
        Self {
            name: "srtm1".to_string(),
            tile_side: SRTM1_TILE_SIDE,
            output_side: DEFAULT_OUTPUT_SIDE,
            sea_level: 40.0,
            height_scale: 64.0,
            seabed: -20.0,
            smoothing_sigma: Some(2.0),
            elevation_url: SKADI_URL.to_string(),
            water_url: Some(SWBD_URL.to_string()),
            zero_elevation_value: None,
            stack_order: StackOrder::NorthUp,
            default_extent_km: default_extent_km(),
        }
    }

    /// 3 arc-second SRTM (Eurasia) without a water archive.
    ///
    /// Ocean is encoded as exactly zero in this dataset and is pushed
    /// below sea level instead.
    pub fn srtm3() -> Self {
        Self {
            name: "srtm3".to_string(),
            tile_side: SRTM3_TILE_SIDE,
            output_side: DEFAULT_OUTPUT_SIDE,
            sea_level: 43.0,
            height_scale: 64.0,
            seabed: -20.0,
            smoothing_sigma: Some(1.0),
            elevation_url: SRTM3_EURASIA_URL.to_string(),
            water_url: None,
            zero_elevation_value: Some(-10.0),
            stack_order: StackOrder::NorthUp,
            default_extent_km: default_extent_km(),
        }
    }

    /// Look up a preset by name.
    pub fn preset(name: &str) -> Option<Self> {
        match name {
            "srtm1" => Some(Self::srtm1()),
            "srtm3" => Some(Self::srtm3()),
            _ => None,
        }
    }

    /// Parse and validate a profile from YAML text.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let profile: Self = serde_yaml::from_str(yaml)?;
        profile.validate()?;
        Ok(profile)
    }

    /// Load and validate a profile from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    /// Check that every constant is usable.
    pub fn validate(&self) -> Result<()> {
        if self.tile_side < 2 {
            return Err(DemError::InvalidProfile(format!(
                "tile_side must be at least 2, got {}",
                self.tile_side
            )));
        }
        if self.output_side == 0 {
            return Err(DemError::InvalidProfile("output_side must be positive".to_string()));
        }
        for (field, value) in [
            ("sea_level", self.sea_level),
            ("height_scale", self.height_scale),
            ("seabed", self.seabed),
        ] {
            if !value.is_finite() {
                return Err(DemError::InvalidProfile(format!("{} must be finite", field)));
            }
        }
        if let Some(sigma) = self.smoothing_sigma {
            if !sigma.is_finite() || sigma < 0.0 {
                return Err(DemError::InvalidProfile(format!(
                    "smoothing_sigma must be a non-negative number, got {}",
                    sigma
                )));
            }
        }
        if self.elevation_url.trim().is_empty() {
            return Err(DemError::InvalidProfile("elevation_url is empty".to_string()));
        }
        if !self.default_extent_km.is_finite() || self.default_extent_km <= 0.0 {
            return Err(DemError::InvalidProfile(format!(
                "default_extent_km must be positive, got {}",
                self.default_extent_km
            )));
        }
        Ok(())
    }

    /// Normalization constants derived from this profile.
    pub fn normalize_params(&self) -> NormalizeParams {
        NormalizeParams {
            output_side: self.output_side,
            sea_level: self.sea_level,
            height_scale: self.height_scale,
            smoothing_sigma: self.smoothing_sigma,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_are_valid() {
        DatasetProfile::srtm1().validate().unwrap();
        DatasetProfile::srtm3().validate().unwrap();
        assert_eq!(DatasetProfile::preset("srtm3").unwrap().tile_side, 1201);
        assert!(DatasetProfile::preset("srtm90").is_none());
    }

    #[test]
    fn test_yaml_defaults() {
        let yaml = r#"
name: tiny
tile_side: 4
output_side: 2
sea_level: 0.0
height_scale: 1.0
seabed: -20.0
elevation_url: "http://localhost/{name}.hgt"
"#;
        let profile = DatasetProfile::from_yaml_str(yaml).unwrap();
        assert_eq!(profile.smoothing_sigma, None);
        assert_eq!(profile.water_url, None);
        assert_eq!(profile.stack_order, StackOrder::NorthUp);
        assert_eq!(profile.default_extent_km, 18.0);
    }

    #[test]
    fn test_yaml_stack_order_override() {
        let yaml = r#"
name: flipped
tile_side: 1201
output_side: 1081
sea_level: 43.0
height_scale: 64.0
seabed: -20.0
elevation_url: "http://localhost/{name}.hgt"
stack_order: south_up
"#;
        let profile = DatasetProfile::from_yaml_str(yaml).unwrap();
        assert_eq!(profile.stack_order, StackOrder::SouthUp);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut profile = DatasetProfile::srtm1();
        profile.tile_side = 1;
        assert!(matches!(profile.validate(), Err(DemError::InvalidProfile(_))));

        let mut profile = DatasetProfile::srtm1();
        profile.smoothing_sigma = Some(-1.0);
        assert!(profile.validate().is_err());

        let mut profile = DatasetProfile::srtm1();
        profile.height_scale = f32::NAN;
        assert!(profile.validate().is_err());

        assert!(matches!(
            DatasetProfile::from_yaml_str("name: [unclosed"),
            Err(DemError::ProfileParse(_))
        ));
    }
}
