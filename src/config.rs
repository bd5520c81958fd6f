//! Survey configuration loaded from YAML

use crate::core::hammer::HammerParams;
use crate::types::HammerResult;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

fn default_name_field() -> String {
    "Name".to_string()
}

fn default_elevation_field() -> Option<String> {
    Some("Elevation".to_string())
}

/// Processing parameters plus the attribute layout of the station layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurveyConfig {
    #[serde(flatten)]
    pub hammer: HammerParams,
    /// Station name attribute
    #[serde(default = "default_name_field")]
    pub name_field: String,
    /// Station elevation attribute; `None` reads no elevation attribute
    #[serde(default = "default_elevation_field")]
    pub elevation_field: Option<String>,
    /// Point layer to read; first layer of the dataset when unset
    #[serde(default)]
    pub station_layer: Option<String>,
}

impl Default for SurveyConfig {
    fn default() -> Self {
        Self {
            hammer: HammerParams::default(),
            name_field: default_name_field(),
            elevation_field: default_elevation_field(),
            station_layer: None,
        }
    }
}

impl SurveyConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> HammerResult<Self> {
        let path_ref = path.as_ref();
        log::info!("Reading survey config: {}", path_ref.display());
        let contents = fs::read_to_string(path_ref)?;
        Self::from_yaml(&contents)
    }

    pub fn from_yaml(contents: &str) -> HammerResult<Self> {
        let config: SurveyConfig = serde_yaml::from_str(contents)?;
        config.hammer.validate()?;
        Ok(config)
    }

    /// Single-ring configuration from the three classic parameters
    pub fn from_args(inner_radius: f64, outer_radius: f64, num_compartments: usize) -> HammerResult<Self> {
        Ok(Self {
            hammer: HammerParams::single_ring(inner_radius, outer_radius, num_compartments)?,
            ..Self::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::hammer::{DifferenceMode, ElevationSource};
    use crate::core::selection::DemSelection;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn config_from_args_produces_single_ring() {
        let cfg = SurveyConfig::from_args(53.3, 170.1, 6).unwrap();
        assert_eq!(cfg.hammer.rings.len(), 1);
        assert_eq!(cfg.hammer.rings[0].num_compartments, 6);
        assert_eq!(cfg.name_field, "Name");
        assert!(SurveyConfig::from_args(10.0, 5.0, 6).is_err());
    }

    #[test]
    fn config_load_reads_yaml() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(
            b"rings:\n  - inner_radius: 2\n    outer_radius: 16.6\n    num_compartments: 4\n\
              dem_selection: finest_resolution\n\
              difference_mode: absolute\n\
              elevation_source: attribute_or_dem\n\
              round_decimals: 1\n\
              name_field: Station\n",
        )
        .unwrap();
        let path = temp.into_temp_path();
        let cfg = SurveyConfig::load(&path).unwrap();

        assert_eq!(cfg.hammer.rings.len(), 1);
        assert_eq!(cfg.hammer.rings[0].inner_radius, 2.0);
        assert_eq!(cfg.hammer.dem_selection, DemSelection::FinestResolution);
        assert_eq!(cfg.hammer.difference_mode, DifferenceMode::Absolute);
        assert_eq!(cfg.hammer.elevation_source, ElevationSource::AttributeOrDem);
        assert_eq!(cfg.hammer.round_decimals, Some(1));
        assert_eq!(cfg.hammer.arc_step_deg, 1.0);
        assert_eq!(cfg.name_field, "Station");
        assert_eq!(cfg.elevation_field.as_deref(), Some("Elevation"));
    }

    #[test]
    fn config_defaults_to_standard_zones() {
        let cfg = SurveyConfig::from_yaml("station_layer: points\n").unwrap();
        assert_eq!(cfg.hammer.rings.len(), 3);
        assert_eq!(cfg.station_layer.as_deref(), Some("points"));
    }

    #[test]
    fn config_rejects_invalid_ring() {
        let yaml = "rings:\n  - inner_radius: 20\n    outer_radius: 10\n    num_compartments: 4\n";
        assert!(SurveyConfig::from_yaml(yaml).is_err());
    }
}
