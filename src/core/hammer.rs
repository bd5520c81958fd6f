use crate::core::sampling::{sample_dem, sample_dem_with, DemSample};
use crate::core::selection::DemSelection;
use crate::core::sector::{self, SectorPolygon, DEFAULT_ARC_STEP_DEG};
use crate::types::{DemRaster, HammerError, HammerResult, RingSpec, Station};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Largest accepted `round_decimals`
pub const MAX_ROUND_DECIMALS: u32 = 15;

/// How pixel elevations are compared with the station elevation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DifferenceMode {
    /// (mean(z) - S) / 2
    #[default]
    Signed,
    /// mean(|z - S|) / 2
    Absolute,
}

/// Where the station elevation comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElevationSource {
    /// Station attribute only
    #[default]
    Attribute,
    /// Cell of the first DEM covering the station
    Dem,
    /// Attribute, falling back to the DEM when absent
    AttributeOrDem,
}

/// Parameters for Hammer-zone sampling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HammerParams {
    /// Rings processed for every station, in output order
    pub rings: Vec<RingSpec>,
    /// Maximum angular step between arc vertices (degrees)
    pub arc_step_deg: f64,
    pub dem_selection: DemSelection,
    pub difference_mode: DifferenceMode,
    pub elevation_source: ElevationSource,
    /// Round half-differences to this many decimals
    pub round_decimals: Option<u32>,
}

impl Default for HammerParams {
    fn default() -> Self {
        Self {
            // Hammer zones B, C and D (2-16.6 m, 16.6-53.3 m, 53.3-170.1 m)
            rings: vec![
                RingSpec { inner_radius: 2.0, outer_radius: 16.6, num_compartments: 4 },
                RingSpec { inner_radius: 16.6, outer_radius: 53.3, num_compartments: 6 },
                RingSpec { inner_radius: 53.3, outer_radius: 170.1, num_compartments: 6 },
            ],
            arc_step_deg: DEFAULT_ARC_STEP_DEG,
            dem_selection: DemSelection::default(),
            difference_mode: DifferenceMode::default(),
            elevation_source: ElevationSource::default(),
            round_decimals: None,
        }
    }
}

impl HammerParams {
    /// Parameters for a single ring with default strategies
    pub fn single_ring(inner_radius: f64, outer_radius: f64, num_compartments: usize) -> HammerResult<Self> {
        Ok(Self {
            rings: vec![RingSpec::new(inner_radius, outer_radius, num_compartments)?],
            ..Self::default()
        })
    }

    pub fn validate(&self) -> HammerResult<()> {
        if self.rings.is_empty() {
            return Err(HammerError::InvalidParameter("no rings configured".to_string()));
        }
        validate_rings(&self.rings)?;
        if !(self.arc_step_deg > 0.0 && self.arc_step_deg <= 90.0) {
            return Err(HammerError::InvalidParameter(format!(
                "arc step must be in (0, 90] degrees, got {}",
                self.arc_step_deg
            )));
        }
        if let Some(decimals) = self.round_decimals {
            if decimals > MAX_ROUND_DECIMALS {
                return Err(HammerError::InvalidParameter(format!(
                    "round_decimals must be at most {}, got {}",
                    MAX_ROUND_DECIMALS, decimals
                )));
            }
        }
        Ok(())
    }
}

/// Validate each ring and reject rings whose output names collide.
///
/// Radii are rounded to whole meters in layer and column names, so two
/// rings with the same rounded radii would overwrite each other.
pub fn validate_rings(rings: &[RingSpec]) -> HammerResult<()> {
    let mut layers = HashSet::with_capacity(rings.len());
    for ring in rings {
        ring.validate()?;
        let layer = ring.layer_name();
        if !layers.insert(layer.clone()) {
            return Err(HammerError::InvalidParameter(format!(
                "ring {} maps to output layer {} which is already used by another ring",
                ring, layer
            )));
        }
    }
    Ok(())
}

/// Result for one (station, ring, compartment)
#[derive(Debug, Clone, PartialEq)]
pub struct SectorRecord {
    /// Position of the station in the processed station list
    pub station_index: usize,
    pub station_name: String,
    pub ring: RingSpec,
    /// Compartment index in `[0, num_compartments)`
    pub index: usize,
    /// Halved mean elevation difference, `None` when it cannot be computed
    pub half_difference: Option<f64>,
    pub pixel_count: usize,
    /// DEM layer the pixels were taken from
    pub dem_name: Option<String>,
    pub polygon: SectorPolygon,
}

impl SectorRecord {
    /// 1-based partition number used in output layers and column names
    pub fn partition(&self) -> usize {
        self.index + 1
    }

    pub fn field_name(&self) -> String {
        self.ring.field_name(self.index)
    }
}

/// Hammer's halved elevation difference for one compartment
pub fn compute_elevation_difference(station_elevation: f64, mean_elevation: f64) -> f64 {
    (mean_elevation - station_elevation) / 2.0
}

fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// Ring-sector averaging processor
#[derive(Debug, Clone)]
pub struct RingSectorAverager {
    params: HammerParams,
}

impl RingSectorAverager {
    /// Create a new averager after validating its parameters
    pub fn new(params: HammerParams) -> HammerResult<Self> {
        params.validate()?;
        Ok(Self { params })
    }

    /// Averager over the standard inner Hammer zones
    pub fn standard() -> Self {
        Self {
            params: HammerParams::default(),
        }
    }

    pub fn params(&self) -> &HammerParams {
        &self.params
    }

    pub fn generate_sector_polygon(
        &self,
        station: &Station,
        ring: &RingSpec,
        index: usize,
    ) -> HammerResult<SectorPolygon> {
        sector::generate_sector_polygon(station, ring, index, self.params.arc_step_deg)
    }

    /// Station elevation according to the configured source
    pub fn station_elevation(&self, station: &Station, dems: &[DemRaster]) -> Option<f64> {
        let from_dem = || {
            dems.iter()
                .find_map(|dem| dem.elevation_at(station.easting, station.northing))
        };
        match self.params.elevation_source {
            ElevationSource::Attribute => station.valid_elevation(),
            ElevationSource::Dem => from_dem(),
            ElevationSource::AttributeOrDem => station.valid_elevation().or_else(from_dem),
        }
    }

    /// Generate, sample and reduce a single compartment
    pub fn process_sector(
        &self,
        station_index: usize,
        station: &Station,
        station_elevation: Option<f64>,
        ring: &RingSpec,
        index: usize,
        dems: &[DemRaster],
    ) -> HammerResult<SectorRecord> {
        let polygon = self.generate_sector_polygon(station, ring, index)?;

        let (selected_dem, sample, half_difference) =
            match (self.params.difference_mode, station_elevation) {
                (DifferenceMode::Absolute, Some(s)) => {
                    let chosen = self.params.dem_selection.select(
                        station,
                        &polygon,
                        dems,
                        |p, d| sample_dem_with(p, d, |z| (z - s).abs()),
                    )?;
                    let half = chosen.sample.mean.map(|m| m / 2.0);
                    (chosen.dem, chosen.sample, half)
                }
                (_, s) => {
                    let chosen = self
                        .params
                        .dem_selection
                        .select(station, &polygon, dems, sample_dem)?;
                    let half = match (s, chosen.sample.mean) {
                        (Some(s), Some(mean)) => Some(compute_elevation_difference(s, mean)),
                        _ => None,
                    };
                    (chosen.dem, chosen.sample, half)
                }
            };

        let half_difference = match self.params.round_decimals {
            Some(d) => half_difference.map(|v| round_to(v, d)),
            None => half_difference,
        };

        Self::log_sector(station, ring, index, &sample, half_difference);

        Ok(SectorRecord {
            station_index,
            station_name: station.name.clone(),
            ring: *ring,
            index,
            half_difference,
            pixel_count: sample.pixel_count,
            dem_name: selected_dem.map(|d| d.name.clone()),
            polygon,
        })
    }

    fn log_sector(
        station: &Station,
        ring: &RingSpec,
        index: usize,
        sample: &DemSample,
        half_difference: Option<f64>,
    ) {
        if sample.is_empty() {
            log::debug!(
                "Station {}: partition {}/{} of ring {} has no DEM pixels",
                station.name,
                index + 1,
                ring.num_compartments,
                ring
            );
        } else {
            log::debug!(
                "Station {}: partition {}/{} of ring {} -> {:?} from {} pixels",
                station.name,
                index + 1,
                ring.num_compartments,
                ring,
                half_difference,
                sample.pixel_count
            );
        }
    }

    /// All compartments of `rings` for the station at `station_index`
    pub fn process_station(
        &self,
        station_index: usize,
        station: &Station,
        rings: &[RingSpec],
        dems: &[DemRaster],
    ) -> HammerResult<Vec<SectorRecord>> {
        let elevation = self.station_elevation(station, dems);
        if elevation.is_none() {
            log::warn!(
                "Could not obtain an elevation for station {}; its results will be null",
                station.name
            );
        }

        let mut records = Vec::with_capacity(rings.iter().map(|r| r.num_compartments).sum());
        for ring in rings {
            for index in 0..ring.num_compartments {
                records.push(self.process_sector(station_index, station, elevation, ring, index, dems)?);
            }
        }
        Ok(records)
    }

    /// Process every station over the configured rings
    pub fn process(&self, stations: &[Station], dems: &[DemRaster]) -> HammerResult<Vec<SectorRecord>> {
        self.process_rings(stations, &self.params.rings, dems)
    }

    /// Process every station over `rings`.
    ///
    /// Records are ordered by station, then ring, then compartment index.
    pub fn process_rings(
        &self,
        stations: &[Station],
        rings: &[RingSpec],
        dems: &[DemRaster],
    ) -> HammerResult<Vec<SectorRecord>> {
        if dems.is_empty() {
            return Err(HammerError::MissingDem(
                "at least one DEM layer is required".to_string(),
            ));
        }
        validate_rings(rings)?;
        if let Some(dem) = dems.iter().find(|d| !d.transform.is_north_up()) {
            return Err(HammerError::InvalidFormat(format!(
                "DEM '{}' has a rotated geotransform, which is not supported",
                dem.name
            )));
        }

        log::info!(
            "Processing {} stations over {} rings with {} DEM layers ({})",
            stations.len(),
            rings.len(),
            dems.len(),
            self.params.dem_selection
        );

        let per_station = self.map_stations(stations, rings, dems);
        let records: Vec<SectorRecord> = per_station
            .into_iter()
            .collect::<HammerResult<Vec<_>>>()?
            .into_iter()
            .flatten()
            .collect();

        let empty = records.iter().filter(|r| r.pixel_count == 0).count();
        log::info!(
            "Computed {} sector records ({} without DEM coverage)",
            records.len(),
            empty
        );
        Ok(records)
    }

    #[cfg(feature = "parallel")]
    fn map_stations(
        &self,
        stations: &[Station],
        rings: &[RingSpec],
        dems: &[DemRaster],
    ) -> Vec<HammerResult<Vec<SectorRecord>>> {
        use rayon::prelude::*;

        stations
            .par_iter()
            .enumerate()
            .map(|(i, station)| self.process_station(i, station, rings, dems))
            .collect()
    }

    #[cfg(not(feature = "parallel"))]
    fn map_stations(
        &self,
        stations: &[Station],
        rings: &[RingSpec],
        dems: &[DemRaster],
    ) -> Vec<HammerResult<Vec<SectorRecord>>> {
        stations
            .iter()
            .enumerate()
            .map(|(i, station)| self.process_station(i, station, rings, dems))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CoordinateSystem, GeoTransform};
    use approx::assert_relative_eq;
    use ndarray::Array2;

    fn constant_dem(name: &str, value: f32) -> DemRaster {
        DemRaster::new(
            name,
            Array2::from_elem((200, 200), value),
            GeoTransform::from_gdal([499_900.0, 1.0, 0.0, 4_500_100.0, 0.0, -1.0]),
            None,
            CoordinateSystem::Projected { epsg: 32630 },
        )
    }

    fn averager(inner: f64, outer: f64, n: usize) -> RingSectorAverager {
        RingSectorAverager::new(HammerParams::single_ring(inner, outer, n).unwrap()).unwrap()
    }

    #[test]
    fn test_compute_elevation_difference() {
        assert_eq!(compute_elevation_difference(100.0, 120.0), 10.0);
        assert_eq!(compute_elevation_difference(100.0, 80.0), -10.0);
        assert_eq!(compute_elevation_difference(50.0, 50.0), 0.0);
    }

    #[test]
    fn test_params_validation() {
        assert!(HammerParams::default().validate().is_ok());
        let mut params = HammerParams::default();
        params.rings.clear();
        assert!(RingSectorAverager::new(params).is_err());

        let mut params = HammerParams::default();
        params.arc_step_deg = 0.0;
        assert!(RingSectorAverager::new(params).is_err());

        let mut params = HammerParams::default();
        params.round_decimals = Some(MAX_ROUND_DECIMALS);
        assert!(params.validate().is_ok());
        params.round_decimals = Some(309);
        assert!(matches!(params.validate(), Err(HammerError::InvalidParameter(_))));
    }

    #[test]
    fn test_rings_with_colliding_names_are_rejected() {
        let ring = |inner, outer, n| RingSpec::new(inner, outer, n).unwrap();

        // 2.4 and 2 both round to "2"
        let params = HammerParams {
            rings: vec![ring(2.0, 16.6, 4), ring(2.4, 16.6, 4)],
            ..HammerParams::default()
        };
        assert!(matches!(params.validate(), Err(HammerError::InvalidParameter(_))));

        // Same radii, different compartment count: same layer name
        let params = HammerParams {
            rings: vec![ring(16.6, 53.3, 6), ring(16.6, 53.3, 4)],
            ..HammerParams::default()
        };
        assert!(RingSectorAverager::new(params).is_err());

        let duplicated = vec![ring(2.0, 16.6, 4), ring(2.0, 16.6, 4)];
        let dems = vec![constant_dem("dem", 1.0)];
        let stations = vec![Station::new("P", 500_000.0, 4_500_000.0, Some(0.0))];
        assert!(matches!(
            RingSectorAverager::standard().process_rings(&stations, &duplicated, &dems),
            Err(HammerError::InvalidParameter(_))
        ));

        assert!(validate_rings(&[ring(2.0, 16.6, 4), ring(16.6, 53.3, 6)]).is_ok());
    }

    #[test]
    fn test_constant_dem_gives_exact_half_difference() {
        let stations = vec![Station::new("P1", 500_000.0, 4_500_000.0, Some(100.0))];
        let dems = vec![constant_dem("dem", 120.0)];
        let records = averager(10.0, 20.0, 4).process(&stations, &dems).unwrap();

        assert_eq!(records.len(), 4);
        for (i, record) in records.iter().enumerate() {
            assert_eq!(record.index, i);
            assert_eq!(record.half_difference, Some(10.0));
            assert!(record.pixel_count > 0);
            assert_eq!(record.dem_name.as_deref(), Some("dem"));
        }
    }

    #[test]
    fn test_missing_elevation_yields_null_results() {
        let stations = vec![
            Station::new("NoZ", 500_000.0, 4_500_000.0, None),
            Station::new("Z", 500_010.0, 4_500_010.0, Some(90.0)),
        ];
        let dems = vec![constant_dem("dem", 120.0)];
        let records = averager(2.0, 16.6, 4).process(&stations, &dems).unwrap();

        assert_eq!(records.len(), 8);
        assert!(records[..4].iter().all(|r| r.half_difference.is_none()));
        assert!(records[..4].iter().all(|r| r.pixel_count > 0));
        assert!(records[4..].iter().all(|r| r.half_difference == Some(15.0)));
    }

    #[test]
    fn test_elevation_from_dem() {
        let mut params = HammerParams::single_ring(2.0, 16.6, 4).unwrap();
        params.elevation_source = ElevationSource::AttributeOrDem;
        let averager = RingSectorAverager::new(params).unwrap();

        let station = Station::new("NoZ", 500_000.0, 4_500_000.0, None);
        let dems = vec![constant_dem("dem", 120.0)];
        assert_eq!(averager.station_elevation(&station, &dems), Some(120.0));

        let records = averager.process(&[station], &dems).unwrap();
        assert!(records.iter().all(|r| r.half_difference == Some(0.0)));
    }

    #[test]
    fn test_absolute_mode_and_rounding() {
        // West half at 90 m, east half at 110.3 m, station at 100 m
        let data = Array2::from_shape_fn((200, 200), |(_, c)| if c < 100 { 90.0 } else { 110.3 });
        let dems = vec![DemRaster::new(
            "split",
            data,
            GeoTransform::from_gdal([499_900.0, 1.0, 0.0, 4_500_100.0, 0.0, -1.0]),
            None,
            CoordinateSystem::Unspecified,
        )];
        let stations = vec![Station::new("P", 500_000.0, 4_500_000.0, Some(100.0))];

        let mut params = HammerParams::single_ring(10.0, 20.0, 2).unwrap();
        params.difference_mode = DifferenceMode::Absolute;
        params.round_decimals = Some(1);
        let records = RingSectorAverager::new(params).unwrap().process(&stations, &dems).unwrap();

        // Compartment 0 spans 0-180 degrees (north), compartment 1 the south
        for record in &records {
            let half = record.half_difference.unwrap();
            assert!(half > 5.0 && half < 5.2, "unexpected half difference {}", half);
            assert_relative_eq!(half * 10.0, (half * 10.0).round(), epsilon = 1e-9);
        }
    }

    #[test]
    fn test_no_dem_is_fatal() {
        let stations = vec![Station::new("P", 0.0, 0.0, Some(0.0))];
        let result = averager(2.0, 16.6, 4).process(&stations, &[]);
        assert!(matches!(result, Err(HammerError::MissingDem(_))));
    }

    #[test]
    fn test_empty_station_list_yields_no_records() {
        let dems = vec![constant_dem("dem", 1.0)];
        let records = RingSectorAverager::standard().process(&[], &dems).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_record_order_and_naming() {
        let stations = vec![
            Station::new("A", 500_000.0, 4_500_000.0, Some(100.0)),
            Station::new("B", 500_005.0, 4_500_000.0, Some(100.0)),
        ];
        let dems = vec![constant_dem("dem", 100.0)];
        let averager = RingSectorAverager::new(HammerParams {
            rings: vec![RingSpec::new(2.0, 16.6, 4).unwrap(), RingSpec::new(16.6, 53.3, 6).unwrap()],
            ..HammerParams::default()
        })
        .unwrap();

        let records = averager.process(&stations, &dems).unwrap();
        assert_eq!(records.len(), 20);
        assert_eq!(records[0].station_name, "A");
        assert_eq!(records[0].field_name(), "2_17_4.1");
        assert_eq!(records[4].field_name(), "17_53_6.1");
        assert_eq!(records[9].partition(), 6);
        assert_eq!(records[10].station_name, "B");
        assert!(records[..10].iter().all(|r| r.station_index == 0));
        assert!(records[10..].iter().all(|r| r.station_index == 1));
    }
}
