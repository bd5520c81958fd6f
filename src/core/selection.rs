use crate::core::sampling::DemSample;
use crate::core::sector::SectorPolygon;
use crate::types::{DemRaster, HammerResult, Station};
use serde::{Deserialize, Serialize};

/// Policy for choosing among several DEM layers for one sector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DemSelection {
    /// First layer, in input order, that yields at least one pixel
    #[default]
    FirstWithPixels,
    /// First layer whose extent contains the sector centroid
    FirstCoveringCentroid,
    /// First layer whose extent contains the station, for all its sectors
    FirstCoveringStation,
    /// Finest cell size among the layers that yield pixels
    FinestResolution,
}

/// Sample chosen for a sector and the layer it came from
#[derive(Debug, Clone, Copy)]
pub struct SelectedSample<'a> {
    pub dem: Option<&'a DemRaster>,
    pub sample: DemSample,
}

impl<'a> SelectedSample<'a> {
    fn none() -> Self {
        Self {
            dem: None,
            sample: DemSample::empty(),
        }
    }
}

impl DemSelection {
    /// Pick a layer for `polygon` and return its sample.
    ///
    /// `sample` performs the actual accumulation so the caller decides
    /// which quantity is averaged.
    pub fn select<'a, F>(
        &self,
        station: &Station,
        polygon: &SectorPolygon,
        dems: &'a [DemRaster],
        sample: F,
    ) -> HammerResult<SelectedSample<'a>>
    where
        F: Fn(&SectorPolygon, &DemRaster) -> HammerResult<DemSample>,
    {
        match self {
            DemSelection::FirstWithPixels => {
                for dem in dems {
                    let s = sample(polygon, dem)?;
                    if !s.is_empty() {
                        return Ok(SelectedSample { dem: Some(dem), sample: s });
                    }
                }
                Ok(SelectedSample::none())
            }
            DemSelection::FirstCoveringCentroid => {
                let (x, y) = polygon.centroid();
                Self::first_covering(dems, x, y, polygon, sample)
            }
            DemSelection::FirstCoveringStation => {
                Self::first_covering(dems, station.easting, station.northing, polygon, sample)
            }
            DemSelection::FinestResolution => {
                let mut best = SelectedSample::none();
                let mut best_area = f64::INFINITY;
                for dem in dems {
                    let s = sample(polygon, dem)?;
                    let area = dem.transform.cell_area();
                    if !s.is_empty() && area < best_area {
                        best = SelectedSample { dem: Some(dem), sample: s };
                        best_area = area;
                    }
                }
                Ok(best)
            }
        }
    }

    fn first_covering<'a, F>(
        dems: &'a [DemRaster],
        x: f64,
        y: f64,
        polygon: &SectorPolygon,
        sample: F,
    ) -> HammerResult<SelectedSample<'a>>
    where
        F: Fn(&SectorPolygon, &DemRaster) -> HammerResult<DemSample>,
    {
        match dems.iter().find(|dem| dem.extent().contains(x, y)) {
            Some(dem) => Ok(SelectedSample {
                dem: Some(dem),
                sample: sample(polygon, dem)?,
            }),
            None => Ok(SelectedSample::none()),
        }
    }
}

impl std::fmt::Display for DemSelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DemSelection::FirstWithPixels => "first_with_pixels",
            DemSelection::FirstCoveringCentroid => "first_covering_centroid",
            DemSelection::FirstCoveringStation => "first_covering_station",
            DemSelection::FinestResolution => "finest_resolution",
        };
        write!(f, "{}", name)
    }
}
