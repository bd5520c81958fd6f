//! I/O modules for reading stations and DEMs and writing results

pub mod dem;
pub mod output;
pub mod stations;

pub use dem::{DemDirectory, DemReader};
pub use output::{write_station_table_csv, GeoPackageSink, MemorySink};
pub use stations::OgrStationReader;

use crate::core::hammer::SectorRecord;
use crate::core::table::StationTable;
use crate::types::{CoordinateSystem, DemRaster, HammerResult, RingSpec, StationSet};
use gdal::spatial_ref::SpatialRef;

/// Provider of survey stations
pub trait StationSource {
    fn read_stations(&self) -> HammerResult<StationSet>;
}

/// Provider of DEM rasters, in priority order
pub trait DemSource {
    fn read_dems(&self) -> HammerResult<Vec<DemRaster>>;
}

/// Consumer of processing results
pub trait ResultSink {
    /// Called once before any write with the CRS of the stations
    fn set_coordinate_system(&mut self, _crs: CoordinateSystem) -> HammerResult<()> {
        Ok(())
    }

    /// Sector records of one ring (Output 2)
    fn write_ring(&mut self, ring: &RingSpec, records: &[SectorRecord]) -> HammerResult<()>;

    /// Station attributes with one column per compartment (Output 1)
    fn write_station_table(&mut self, table: &StationTable) -> HammerResult<()>;
}

impl StationSource for StationSet {
    fn read_stations(&self) -> HammerResult<StationSet> {
        Ok(self.clone())
    }
}

impl DemSource for Vec<DemRaster> {
    fn read_dems(&self) -> HammerResult<Vec<DemRaster>> {
        Ok(self.clone())
    }
}

/// Classify a GDAL spatial reference
pub(crate) fn coordinate_system_of(srs: &SpatialRef) -> CoordinateSystem {
    if srs.is_projected() {
        let code = srs.auth_code().or_else(|_| {
            let mut identified = srs.clone();
            identified.auto_identify_epsg()?;
            identified.auth_code()
        });
        match code {
            Ok(epsg) if epsg > 0 => CoordinateSystem::Projected { epsg: epsg as u32 },
            _ => {
                log::warn!("Projected spatial reference without an EPSG code");
                CoordinateSystem::Unspecified
            }
        }
    } else if srs.is_geographic() {
        CoordinateSystem::Geographic
    } else {
        CoordinateSystem::Unspecified
    }
}
