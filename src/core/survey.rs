use crate::core::hammer::{RingSectorAverager, SectorRecord};
use crate::core::table::StationTable;
use crate::io::{DemSource, ResultSink, StationSource};
use crate::types::{CoordinateSystem, DemRaster, HammerError, HammerResult, StationSet};

/// Counts reported at the end of a survey run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunSummary {
    pub stations: usize,
    pub rings: usize,
    pub records: usize,
    /// Sectors without a single DEM pixel
    pub empty_sectors: usize,
    /// Records without a half-difference value
    pub null_results: usize,
}

/// Fail unless stations and DEMs share one projected coordinate system.
///
/// Sources without a spatial reference are accepted with a warning.
pub fn check_coordinate_systems(stations: &StationSet, dems: &[DemRaster]) -> HammerResult<()> {
    let station_crs = stations.coordinate_system;
    match station_crs {
        CoordinateSystem::Geographic => {
            return Err(HammerError::CoordinateSystem(
                "station layer must use a projected (e.g. UTM) coordinate system".to_string(),
            ))
        }
        CoordinateSystem::Unspecified => {
            log::warn!("Station layer has no spatial reference; assuming projected meters")
        }
        CoordinateSystem::Projected { .. } => {}
    }

    for dem in dems {
        match (dem.coordinate_system, station_crs) {
            (CoordinateSystem::Geographic, _) => {
                return Err(HammerError::CoordinateSystem(format!(
                    "DEM '{}' must use a projected (e.g. UTM) coordinate system",
                    dem.name
                )))
            }
            (CoordinateSystem::Projected { epsg: a }, CoordinateSystem::Projected { epsg: b }) if a != b => {
                return Err(HammerError::CoordinateSystem(format!(
                    "DEM '{}' is in EPSG:{} but the stations are in EPSG:{}",
                    dem.name, a, b
                )))
            }
            (CoordinateSystem::Unspecified, _) => {
                log::warn!("DEM '{}' has no spatial reference; assuming it matches the stations", dem.name)
            }
            _ => {}
        }
    }
    Ok(())
}

/// Read inputs, process every configured ring and hand results to `sink`
pub fn run_survey<S, D, K>(
    stations: &S,
    dems: &D,
    averager: &RingSectorAverager,
    sink: &mut K,
) -> HammerResult<RunSummary>
where
    S: StationSource + ?Sized,
    D: DemSource + ?Sized,
    K: ResultSink + ?Sized,
{
    let station_set = stations.read_stations()?;
    if station_set.stations.is_empty() {
        return Err(HammerError::NoStations("the station layer has no point features".to_string()));
    }

    let dem_layers = dems.read_dems()?;
    if dem_layers.is_empty() {
        return Err(HammerError::MissingDem("no DEM layers found".to_string()));
    }
    log::info!(
        "The following DEM layers were found: {:?}",
        dem_layers.iter().map(|d| d.name.as_str()).collect::<Vec<_>>()
    );

    check_coordinate_systems(&station_set, &dem_layers)?;
    sink.set_coordinate_system(station_set.coordinate_system)?;

    let rings = &averager.params().rings;
    let records = averager.process(&station_set.stations, &dem_layers)?;

    for ring in rings {
        let ring_records: Vec<SectorRecord> = records
            .iter()
            .filter(|r| r.ring == *ring)
            .cloned()
            .collect();
        sink.write_ring(ring, &ring_records)?;
    }

    let table = StationTable::build(&station_set, rings, &records);
    sink.write_station_table(&table)?;

    let summary = RunSummary {
        stations: station_set.stations.len(),
        rings: rings.len(),
        records: records.len(),
        empty_sectors: records.iter().filter(|r| r.pixel_count == 0).count(),
        null_results: records.iter().filter(|r| r.half_difference.is_none()).count(),
    };
    log::info!("Survey complete: {:?}", summary);
    Ok(summary)
}
